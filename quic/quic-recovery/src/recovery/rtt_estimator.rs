// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use crate::{
    frame::{ack_elicitation::AckElicitation, Ack, AckRanges},
    recovery::Settings,
    time::Timestamp,
    transport::AckSettings,
};
use core::{
    cmp::{max, min},
    time::Duration,
};

/// RTT samples outside of this range are reported as implausible
const SANE_RTT_RANGE: core::ops::RangeInclusive<Duration> =
    Duration::from_millis(1)..=Duration::from_secs(2);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RttEstimator {
    /// Latest RTT sample, adjusted for the peer's ack delay
    latest_rtt: Duration,
    /// The minimum value observed over the lifetime of the connection
    min_rtt: Duration,
    /// An exponentially-weighted moving average
    smoothed_rtt: Duration,
    /// The variance in the observed RTT samples
    rttvar: Duration,
    /// The largest ack delay the peer has reported for an ack-eliciting packet
    max_ack_delay: Duration,
    granularity: Duration,
    initial_rtt: Duration,
}

impl RttEstimator {
    pub fn new(settings: &Settings) -> Self {
        Self {
            latest_rtt: Duration::ZERO,
            min_rtt: Duration::MAX,
            smoothed_rtt: Duration::ZERO,
            rttvar: Duration::ZERO,
            max_ack_delay: Duration::ZERO,
            granularity: settings.granularity(),
            initial_rtt: settings.initial_rtt(),
        }
    }

    /// Gets the latest round trip time sample
    #[inline]
    pub fn latest_rtt(&self) -> Duration {
        self.latest_rtt
    }

    /// Gets the weighted average round trip time
    #[inline]
    pub fn smoothed_rtt(&self) -> Duration {
        self.smoothed_rtt
    }

    /// Gets the minimum round trip time, or `Duration::MAX` before the first sample
    #[inline]
    pub fn min_rtt(&self) -> Duration {
        self.min_rtt
    }

    /// Gets the variance in observed round trip time samples
    #[inline]
    pub fn rttvar(&self) -> Duration {
        self.rttvar
    }

    #[inline]
    pub fn max_ack_delay(&self) -> Duration {
        self.max_ack_delay
    }

    #[inline]
    pub fn granularity(&self) -> Duration {
        self.granularity
    }

    /// Returns true once at least one RTT sample has been taken
    #[inline]
    pub fn has_sample(&self) -> bool {
        !self.smoothed_rtt.is_zero()
    }

    /// Returns the smoothed RTT, or the configured initial RTT before the first sample
    #[inline]
    pub fn smoothed_rtt_or_initial(&self) -> Duration {
        if self.has_sample() {
            self.smoothed_rtt
        } else {
            self.initial_rtt
        }
    }

    #[inline]
    fn rttvar_or_initial(&self) -> Duration {
        if self.has_sample() {
            self.rttvar
        } else {
            self.initial_rtt / 2
        }
    }

    /// Updates the estimate with the acknowledgement of a packet sent at `time_sent`
    pub fn update_rtt<A: AckRanges>(
        &mut self,
        frame: &Ack<A>,
        ack_settings: AckSettings,
        time_sent: Timestamp,
        ack_elicitation: AckElicitation,
        now: Timestamp,
    ) {
        self.latest_rtt = now.saturating_duration_since(time_sent);
        self.min_rtt = min(self.min_rtt, self.latest_rtt);

        let ack_delay = frame.ack_delay(ack_settings);

        //= https://www.rfc-editor.org/rfc/rfc9002#section-5.3
        //# *  MUST NOT subtract the acknowledgment delay from the RTT sample if
        //#    the resulting value is smaller than the min_rtt.
        if self.latest_rtt - self.min_rtt > ack_delay {
            self.latest_rtt -= ack_delay;
        }

        if ack_elicitation.is_ack_eliciting() {
            self.max_ack_delay = max(self.max_ack_delay, ack_delay);
        }

        if !self.has_sample() {
            //= https://www.rfc-editor.org/rfc/rfc9002#section-5.3
            //# On the first RTT sample after initialization, smoothed_rtt and rttvar
            //# are set as follows:
            //#
            //# smoothed_rtt = latest_rtt
            //# rttvar = latest_rtt / 2
            self.smoothed_rtt = self.latest_rtt;
            self.rttvar = self.latest_rtt / 2;
        } else {
            //= https://www.rfc-editor.org/rfc/rfc9002#section-5.3
            //# rttvar_sample = abs(smoothed_rtt - adjusted_rtt)
            //# rttvar = 3/4 * rttvar + 1/4 * rttvar_sample
            //# smoothed_rtt = 7/8 * smoothed_rtt + 1/8 * adjusted_rtt
            let rttvar_sample = abs_difference(self.smoothed_rtt, self.latest_rtt);
            self.rttvar = (self.rttvar.saturating_mul(3) / 4).saturating_add(rttvar_sample / 4);
            self.smoothed_rtt =
                (self.smoothed_rtt.saturating_mul(7) / 8).saturating_add(self.latest_rtt / 8);
        }

        if !SANE_RTT_RANGE.contains(&self.latest_rtt) {
            tracing::warn!(latest_rtt = ?self.latest_rtt, "implausible rtt sample");
        }
        if max_ack_delay_is_implausible(self.max_ack_delay) {
            tracing::warn!(max_ack_delay = ?self.max_ack_delay, "implausible max ack delay");
        }
    }

    //= https://www.rfc-editor.org/rfc/rfc9002#section-6.2.1
    //# PTO = smoothed_rtt + max(4*rttvar, kGranularity) + max_ack_delay

    /// Returns the probe timeout period, backed off by `pto_count`
    pub fn pto_period(&self, pto_count: u32) -> Duration {
        let period = self
            .smoothed_rtt_or_initial()
            .saturating_add(max(self.granularity, self.rttvar_or_initial().saturating_mul(4)))
            .saturating_add(self.max_ack_delay);
        backoff(period, pto_count)
    }

    /// Returns the handshake retransmission period, backed off by `crypto_count`
    pub fn crypto_retransmission_period(&self, crypto_count: u32) -> Duration {
        let period = max(self.smoothed_rtt_or_initial().saturating_mul(2), self.granularity);
        backoff(period, crypto_count)
    }

    /// Returns the time a packet may be reordered before it is considered lost
    pub fn loss_delay(&self, time_threshold: f32) -> Duration {
        //= https://www.rfc-editor.org/rfc/rfc9002#section-6.1.2
        //# max(kTimeThreshold * max(smoothed_rtt, latest_rtt), kGranularity)
        let rtt = max(self.latest_rtt, self.smoothed_rtt);
        let rtt = if rtt.is_zero() { self.initial_rtt } else { rtt };
        max(scale(rtt, time_threshold), self.granularity)
    }

    //= https://www.rfc-editor.org/rfc/rfc9002#section-7.6.1
    //# (smoothed_rtt + max(4*rttvar, kGranularity) + max_ack_delay) *
    //#     kPersistentCongestionThreshold

    /// Returns the period of losses that constitutes persistent congestion
    pub fn persistent_congestion_period(&self, threshold: u32) -> Duration {
        backoff(self.pto_period(0), threshold.saturating_sub(1))
    }
}

/// Multiplies `duration` by `2^count`, saturating on overflow
#[inline]
pub(crate) fn backoff(duration: Duration, count: u32) -> Duration {
    1u32.checked_shl(count)
        .and_then(|factor| duration.checked_mul(factor))
        .unwrap_or(Duration::MAX)
}

/// Multiplies `duration` by `factor` with nanosecond precision, saturating on overflow
#[inline]
pub(crate) fn scale(duration: Duration, factor: f32) -> Duration {
    let nanos = duration.as_nanos() as f64 * factor as f64;
    Duration::from_nanos(nanos as u64)
}

#[inline]
fn max_ack_delay_is_implausible(delay: Duration) -> bool {
    delay > *SANE_RTT_RANGE.end()
}

#[inline]
fn abs_difference(a: Duration, b: Duration) -> Duration {
    if a > b {
        a - b
    } else {
        b - a
    }
}
