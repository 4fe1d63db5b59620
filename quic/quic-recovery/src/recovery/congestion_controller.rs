// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use crate::{
    counter::Counter,
    recovery::{persistent_congestion, RttEstimator, SentPacketInfo, Settings},
    time::Timestamp,
};
use core::fmt;

#[cfg(test)]
mod tests;

/// The growth rule applied once the window reaches the slow start threshold.
///
/// All other state (bytes in flight, slow start, recovery epochs) is shared by
/// [`CongestionController`] so implementations only describe how the window moves.
pub trait WindowGrowth: fmt::Debug {
    /// Returns the number of bytes to grow the window by for `acked_bytes`
    /// acknowledged in congestion avoidance
    fn on_congestion_avoidance_ack(
        &mut self,
        congestion_window: u32,
        acked_bytes: u32,
        rtt_estimator: &RttEstimator,
        now: Timestamp,
    ) -> u32;

    /// Returns the window to use after a congestion event, before the floor is applied
    fn on_congestion_event(&mut self, congestion_window: u32, now: Timestamp) -> u32;

    /// Forgets any accumulated growth state
    fn reset(&mut self);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    SlowStart,
    CongestionAvoidance,
    Recovery,
}

/// Gates the amount of unacknowledged data in flight.
///
/// The recovery epoch is marked by the time the last congestion event happened. A
/// packet sent at or before that time belongs to the epoch and its loss or
/// acknowledgement does not move the window.
#[derive(Clone, Debug)]
pub struct CongestionController<G> {
    growth: G,
    congestion_window: u32,
    bytes_in_flight: Counter<u32>,
    slow_start_threshold: u32,
    //= https://www.rfc-editor.org/rfc/rfc9002#appendix-B.2
    //# congestion_recovery_start_time:  The time the current recovery period
    //#    started due to the detection of loss or ECN.  When a packet sent
    //#    after this time is acknowledged, the sender exits congestion
    //#    recovery.
    recovery_start_time: Option<Timestamp>,
    in_recovery: bool,
    initial_window: u32,
    minimum_window: u32,
    persistent_congestion_threshold: u32,
}

impl<G: WindowGrowth> CongestionController<G> {
    pub fn new(settings: &Settings, growth: G) -> Self {
        Self {
            growth,
            congestion_window: settings.initial_window(),
            bytes_in_flight: Counter::default(),
            //= https://www.rfc-editor.org/rfc/rfc9002#section-7.3.1
            //# A NewReno sender is in slow start any time the congestion window is
            //# below the slow start threshold.  A sender begins in slow start
            //# because the slow start threshold is initialized to an infinite
            //# value.
            slow_start_threshold: u32::MAX,
            recovery_start_time: None,
            in_recovery: false,
            initial_window: settings.initial_window(),
            minimum_window: settings.minimum_window(),
            persistent_congestion_threshold: settings.persistent_congestion_threshold(),
        }
    }

    /// Counts a packet the loss detector started tracking
    #[inline]
    pub fn on_packet_sent<P>(&mut self, info: &SentPacketInfo<P>) {
        ensure!(info.in_flight);
        self.bytes_in_flight += info.sent_bytes as u32;
    }

    pub fn on_packet_acked<P>(
        &mut self,
        info: &SentPacketInfo<P>,
        rtt_estimator: &RttEstimator,
        now: Timestamp,
    ) {
        ensure!(info.in_flight);
        self.bytes_in_flight -= info.sent_bytes as u32;

        //= https://www.rfc-editor.org/rfc/rfc9002#section-7.3.2
        //# A recovery period ends and the sender enters congestion avoidance
        //# when a packet sent during the recovery period is acknowledged.
        if self.is_in_recovery_epoch(info.time_sent) {
            return;
        }

        if self.in_recovery {
            self.in_recovery = false;
            tracing::debug!(
                congestion_window = self.congestion_window,
                "recovery exited"
            );
        }

        let acked_bytes = info.sent_bytes as u32;

        if self.is_in_slow_start() {
            //= https://www.rfc-editor.org/rfc/rfc9002#section-7.3.1
            //# While a sender is in slow start, the congestion window
            //# increases by the number of bytes acknowledged when each
            //# acknowledgment is processed.
            self.congestion_window = self.congestion_window.saturating_add(acked_bytes);

            if !self.is_in_slow_start() {
                tracing::debug!(
                    congestion_window = self.congestion_window,
                    slow_start_threshold = self.slow_start_threshold,
                    "slow start exited"
                );
            }
        } else {
            let increment = self.growth.on_congestion_avoidance_ack(
                self.congestion_window,
                acked_bytes,
                rtt_estimator,
                now,
            );
            self.congestion_window = self.congestion_window.saturating_add(increment);
        }
    }

    /// Processes a batch of packets declared lost by a single detection pass
    pub fn on_packets_lost<'a, P: 'a, I>(
        &mut self,
        lost: I,
        rtt_estimator: &RttEstimator,
        now: Timestamp,
    ) where
        I: IntoIterator<Item = &'a SentPacketInfo<P>>,
    {
        let mut largest_time_sent: Option<Timestamp> = None;
        let mut calculator = persistent_congestion::Calculator::new();

        for info in lost {
            if !info.in_flight {
                continue;
            }

            self.bytes_in_flight -= info.sent_bytes as u32;
            largest_time_sent = Some(
                largest_time_sent.map_or(info.time_sent, |time| time.max(info.time_sent)),
            );
            calculator.on_lost_packet(info);
        }

        let Some(largest_time_sent) = largest_time_sent else {
            return;
        };

        self.on_congestion_event(largest_time_sent, now);

        //= https://www.rfc-editor.org/rfc/rfc9002#section-7.6.2
        //# When persistent congestion is declared, the sender's congestion
        //# window MUST be reduced to the minimum congestion window
        //# (kMinimumWindow), similar to a TCP sender's response on an RTO
        if calculator
            .is_persistent_congestion(rtt_estimator, self.persistent_congestion_threshold)
        {
            tracing::debug!(
                duration = ?calculator.duration(),
                "persistent congestion"
            );
            self.congestion_window = self.minimum_window;
            self.growth.reset();
        }
    }

    //= https://www.rfc-editor.org/rfc/rfc9002#section-7.1
    //# If a path has been validated to support Explicit Congestion
    //# Notification (ECN) [RFC3168] [RFC8311], QUIC treats a Congestion
    //# Experienced (CE) codepoint in the IP header as a signal of
    //# congestion.

    /// Reacts to a congestion signal that did not remove any packets.
    ///
    /// `time_sent` is the send time of the packet that carried the signal.
    #[inline]
    pub fn on_explicit_congestion(&mut self, time_sent: Timestamp, now: Timestamp) {
        self.on_congestion_event(time_sent, now);
    }

    /// Stops counting a packet that was removed from tracking without being acked or lost
    #[inline]
    pub fn on_packet_discarded<P>(&mut self, info: &SentPacketInfo<P>) {
        ensure!(info.in_flight);
        self.bytes_in_flight -= info.sent_bytes as u32;
    }

    fn on_congestion_event(&mut self, time_sent: Timestamp, now: Timestamp) {
        //= https://www.rfc-editor.org/rfc/rfc9002#section-7.3.2
        //# The sender MUST exit slow start and enter a recovery period when a
        //# packet is lost or when the ECN-CE count reported by its peer
        //# increases.
        //#
        //# On entering a recovery period, a sender MUST set the slow start
        //# threshold to half the value of the congestion window when loss is
        //# detected.

        // only one reduction per epoch
        ensure!(!self.is_in_recovery_epoch(time_sent));

        self.recovery_start_time = Some(now);
        self.in_recovery = true;

        let reduced = self
            .growth
            .on_congestion_event(self.congestion_window, now)
            .max(self.minimum_window);

        tracing::debug!(
            previous = self.congestion_window,
            congestion_window = reduced,
            "recovery entered"
        );

        self.congestion_window = reduced;
        self.slow_start_threshold = reduced;
    }

    /// Returns the controller to its initial state.
    ///
    /// Bytes in flight are expected to have been released already.
    pub fn reset(&mut self) {
        if *self.bytes_in_flight != 0 {
            tracing::error!(
                bytes_in_flight = *self.bytes_in_flight,
                "congestion controller reset with bytes in flight"
            );
        }

        self.bytes_in_flight.reset();
        self.congestion_window = self.initial_window;
        self.slow_start_threshold = u32::MAX;
        self.recovery_start_time = None;
        self.in_recovery = false;
        self.growth.reset();
    }
}

impl<G> CongestionController<G> {
    #[inline]
    pub fn congestion_window(&self) -> u32 {
        self.congestion_window
    }

    #[inline]
    pub fn bytes_in_flight(&self) -> u32 {
        *self.bytes_in_flight
    }

    #[inline]
    pub fn slow_start_threshold(&self) -> u32 {
        self.slow_start_threshold
    }

    #[inline]
    pub fn minimum_window(&self) -> u32 {
        self.minimum_window
    }

    /// Returns true if no more congestion controlled packets may be released
    #[inline]
    pub fn is_congestion_limited(&self) -> bool {
        *self.bytes_in_flight >= self.congestion_window
    }

    #[inline]
    pub fn is_in_slow_start(&self) -> bool {
        self.congestion_window < self.slow_start_threshold
    }

    /// Returns true until a packet sent after the last congestion event is acknowledged
    #[inline]
    pub fn is_in_recovery(&self) -> bool {
        self.in_recovery
    }

    #[inline]
    pub fn state(&self) -> State {
        if self.in_recovery {
            State::Recovery
        } else if self.is_in_slow_start() {
            State::SlowStart
        } else {
            State::CongestionAvoidance
        }
    }

    #[inline]
    pub fn growth(&self) -> &G {
        &self.growth
    }

    #[inline]
    fn is_in_recovery_epoch(&self, time_sent: Timestamp) -> bool {
        self.recovery_start_time.is_some_and(|start| time_sent <= start)
    }
}
