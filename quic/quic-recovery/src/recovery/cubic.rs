// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use crate::{
    recovery::{congestion_controller::WindowGrowth, RttEstimator, Settings},
    time::Timestamp,
};
use core::time::Duration;
use num_traits::Float as _;


/// Bounds the growth of a single ack to half the current window
//= https://www.rfc-editor.org/rfc/rfc9438#section-4.2
//# the congestion window
//# increase is limited to 1.5 times the current congestion window
const MAX_TARGET_FACTOR: f32 = 1.5;

/// The increment divisor used once the window is at or above the cubic target
const PLATEAU_COUNT_FACTOR: f32 = 100.0;

/// Window growth following the CUBIC function, in units of datagrams.
///
/// A congestion epoch starts on the first congestion avoidance ack after a
/// congestion event. The curve is anchored at that point and grows towards the
/// window size at the time of the last loss.
#[derive(Clone, Debug, PartialEq)]
pub struct Cubic {
    max_datagram_size: f32,
    c: f32,
    beta: f32,
    fast_convergence: bool,
    tcp_friendliness: bool,
    /// The window size, in datagrams, just before the last reduction
    w_last_max: f32,
    epoch_start: Option<Timestamp>,
    /// The time the curve takes to return to `origin_point`
    k: Duration,
    origin_point: f32,
    /// The window a Reno flow would have reached in this epoch
    w_est: f32,
}

impl Cubic {
    pub fn new(settings: &Settings) -> Self {
        Self {
            max_datagram_size: settings.max_datagram_size() as f32,
            c: settings.cubic_c(),
            beta: settings.cubic_beta(),
            fast_convergence: settings.cubic_fast_convergence(),
            tcp_friendliness: settings.cubic_tcp_friendliness(),
            w_last_max: 0.0,
            epoch_start: None,
            k: Duration::ZERO,
            origin_point: 0.0,
            w_est: 0.0,
        }
    }

    #[inline]
    pub fn w_last_max(&self) -> f32 {
        self.w_last_max
    }

    #[inline]
    pub fn epoch_start(&self) -> Option<Timestamp> {
        self.epoch_start
    }

    #[inline]
    pub fn k(&self) -> Duration {
        self.k
    }

    #[inline]
    pub fn origin_point(&self) -> f32 {
        self.origin_point
    }

    //= https://www.rfc-editor.org/rfc/rfc8312#section-4.1
    //# CUBIC uses the following window increase function:
    //#
    //#    W_cubic(t) = C*(t-K)^3 + W_max (Eq. 1)

    /// Returns the cubic window, in datagrams, `t` after the start of the epoch
    #[inline]
    pub fn w_cubic(&self, t: Duration) -> f32 {
        let offset = t.as_secs_f32() - self.k.as_secs_f32();
        self.c * offset.powi(3) + self.origin_point
    }

    #[inline]
    fn to_datagrams(&self, bytes: u32) -> f32 {
        bytes as f32 / self.max_datagram_size
    }

    fn start_epoch(&mut self, cwnd: f32, now: Timestamp) {
        self.epoch_start = Some(now);

        if cwnd < self.w_last_max {
            //= https://www.rfc-editor.org/rfc/rfc8312#section-4.1
            //#    K = cubic_root(W_max*(1-beta_cubic)/C) (Eq. 2)
            let k = ((self.w_last_max - cwnd) / self.c).cbrt();
            self.k = Duration::try_from_secs_f32(k.max(0.0)).unwrap_or(Duration::MAX);
            self.origin_point = self.w_last_max;
        } else {
            self.k = Duration::ZERO;
            self.origin_point = cwnd;
        }

        self.w_est = cwnd;

        tracing::debug!(
            k = ?self.k,
            origin_point = self.origin_point,
            "cubic epoch started"
        );
    }
}

impl WindowGrowth for Cubic {
    fn on_congestion_avoidance_ack(
        &mut self,
        congestion_window: u32,
        acked_bytes: u32,
        rtt_estimator: &RttEstimator,
        now: Timestamp,
    ) -> u32 {
        let cwnd = self.to_datagrams(congestion_window);
        ensure!(cwnd > 0.0, 0);

        let epoch_start = match self.epoch_start {
            Some(epoch_start) => epoch_start,
            None => {
                self.start_epoch(cwnd, now);
                now
            }
        };

        let min_rtt = match rtt_estimator.min_rtt() {
            Duration::MAX => Duration::ZERO,
            min_rtt => min_rtt,
        };

        // target the window one rtt from now
        let t = (now + min_rtt).saturating_duration_since(epoch_start);
        let target = self.w_cubic(t).min(cwnd * MAX_TARGET_FACTOR);

        let mut count = if target > cwnd {
            cwnd / (target - cwnd)
        } else {
            PLATEAU_COUNT_FACTOR * cwnd
        };

        //= https://www.rfc-editor.org/rfc/rfc8312#section-4.2
        //# W_est(t) = W_max*beta_cubic +
        //#             [3*(1-beta_cubic)/(1+beta_cubic)] * (t/RTT) (Eq. 4)
        if self.tcp_friendliness {
            let alpha = 3.0 * (1.0 - self.beta) / (1.0 + self.beta);
            self.w_est += alpha * self.to_datagrams(acked_bytes) / cwnd;

            if self.w_est > cwnd {
                count = count.min(cwnd / (self.w_est - cwnd));
            }
        }

        ensure!(count > 0.0, 0);

        (acked_bytes as f32 / count) as u32
    }

    //= https://www.rfc-editor.org/rfc/rfc8312#section-4.6
    //#    if (W_max < W_last_max){ // should we make room for others
    //#       W_last_max = W_max;             // remember the last W_max
    //#       W_max = W_max*(1.0+beta_cubic)/2.0; // further reduce W_max
    //#    } else {
    //#       W_last_max = W_max              // remember the last W_max
    //#    }
    fn on_congestion_event(&mut self, congestion_window: u32, _now: Timestamp) -> u32 {
        let cwnd = self.to_datagrams(congestion_window);

        if self.fast_convergence && cwnd < self.w_last_max {
            self.w_last_max = cwnd * (1.0 + self.beta) / 2.0;
        } else {
            self.w_last_max = cwnd;
        }

        self.epoch_start = None;

        (congestion_window as f32 * self.beta) as u32
    }

    fn reset(&mut self) {
        self.w_last_max = 0.0;
        self.epoch_start = None;
        self.k = Duration::ZERO;
        self.origin_point = 0.0;
        self.w_est = 0.0;
    }
}
