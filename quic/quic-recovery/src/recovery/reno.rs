// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use crate::{
    recovery::{congestion_controller::WindowGrowth, RttEstimator, Settings},
    time::Timestamp,
};

/// Additive increase, multiplicative decrease
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Reno {
    max_datagram_size: u32,
    loss_reduction_factor: f32,
}

impl Reno {
    pub fn new(settings: &Settings) -> Self {
        Self {
            max_datagram_size: settings.max_datagram_size() as u32,
            loss_reduction_factor: settings.loss_reduction_factor(),
        }
    }
}

impl WindowGrowth for Reno {
    //= https://www.rfc-editor.org/rfc/rfc9002#section-7.3.3
    //# Implementations MAY use a
    //# different approach such as increasing the
    //# congestion window by the maximum datagram size for each congestion
    //# window of bytes acknowledged.
    #[inline]
    fn on_congestion_avoidance_ack(
        &mut self,
        congestion_window: u32,
        acked_bytes: u32,
        _rtt_estimator: &RttEstimator,
        _now: Timestamp,
    ) -> u32 {
        ensure!(congestion_window > 0, 0);
        let increment =
            self.max_datagram_size as u64 * acked_bytes as u64 / congestion_window as u64;
        increment.min(u32::MAX as u64) as u32
    }

    #[inline]
    fn on_congestion_event(&mut self, congestion_window: u32, _now: Timestamp) -> u32 {
        (congestion_window as f32 * self.loss_reduction_factor) as u32
    }

    #[inline]
    fn reset(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::time::Duration;

    fn now() -> Timestamp {
        Timestamp::from_duration(Duration::from_secs(1))
    }

    #[test]
    fn additive_increase_test() {
        let settings = Settings::default();
        let rtt = RttEstimator::new(&settings);
        let mut reno = Reno::new(&settings);

        // a full window of acks grows the window by one datagram
        assert_eq!(reno.on_congestion_avoidance_ack(12_000, 12_000, &rtt, now()), 1200);
        assert_eq!(reno.on_congestion_avoidance_ack(12_000, 1200, &rtt, now()), 120);
        assert_eq!(reno.on_congestion_avoidance_ack(0, 1200, &rtt, now()), 0);
    }

    #[test]
    fn multiplicative_decrease_test() {
        let mut reno = Reno::new(&Settings::default());
        assert_eq!(reno.on_congestion_event(20_000, now()), 10_000);

        let settings = Settings::default().with_loss_reduction_factor(0.8).unwrap();
        let mut reno = Reno::new(&settings);
        assert_eq!(reno.on_congestion_event(10_000, now()), 8_000);
    }
}
