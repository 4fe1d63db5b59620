// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use crate::{
    recovery::{RttEstimator, SentPacketInfo},
    time::Timestamp,
};
use core::time::Duration;

/// Measures the span of send times covered by a batch of lost packets
#[derive(Debug, Default)]
pub struct Calculator {
    earliest: Option<Timestamp>,
    latest: Option<Timestamp>,
    count: usize,
}

impl Calculator {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Called for each packet declared lost in the batch
    #[inline]
    pub fn on_lost_packet<P>(&mut self, info: &SentPacketInfo<P>) {
        //= https://www.rfc-editor.org/rfc/rfc9002#section-7.6.2
        //# These two packets MUST be ack-eliciting, since a receiver is required
        //# to acknowledge only ack-eliciting packets within its maximum
        //# acknowledgment delay; see Section 13.2 of [QUIC-TRANSPORT].
        ensure!(info.ack_elicitation.is_ack_eliciting());

        let time_sent = info.time_sent;
        self.earliest = Some(self.earliest.map_or(time_sent, |t| t.min(time_sent)));
        self.latest = Some(self.latest.map_or(time_sent, |t| t.max(time_sent)));
        self.count += 1;
    }

    /// Returns the time between the first and last lost packet
    #[inline]
    pub fn duration(&self) -> Duration {
        match (self.earliest, self.latest) {
            (Some(earliest), Some(latest)) => latest.saturating_duration_since(earliest),
            _ => Duration::ZERO,
        }
    }

    //= https://www.rfc-editor.org/rfc/rfc9002#section-7.6.2
    //# A sender establishes persistent congestion after the receipt of an
    //# acknowledgment if two packets that are ack-eliciting are declared
    //# lost, and:
    //#
    //# *  the duration between the send times of these two packets exceeds
    //#    the persistent congestion duration (Section 7.6.1);

    /// Returns true if the losses span at least the persistent congestion period
    pub fn is_persistent_congestion(&self, rtt_estimator: &RttEstimator, threshold: u32) -> bool {
        //= https://www.rfc-editor.org/rfc/rfc9002#section-7.6.2
        //# The persistent congestion period SHOULD NOT start until there is at
        //# least one RTT sample.
        ensure!(rtt_estimator.has_sample(), false);
        ensure!(self.count >= 2, false);

        self.duration() >= rtt_estimator.persistent_congestion_period(threshold)
    }
}
