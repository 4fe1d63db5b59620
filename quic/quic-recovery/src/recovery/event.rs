// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use crate::{
    packet::number::PacketNumber,
    recovery::{RttEstimator, SentPacketInfo},
    time::Timestamp,
};
use alloc::vec::Vec;

/// A packet declared lost, along with its packet number
pub type LostPacket<P> = (PacketNumber, SentPacketInfo<P>);

/// Receives the signals produced by the [`LossDetector`](super::LossDetector).
///
/// Every method has an empty default so consumers only implement what they need.
/// Records removed from tracking are passed by value; the subscriber decides
/// whether to keep the packet.
pub trait Subscriber<P> {
    /// An in-flight packet started being tracked
    #[inline]
    fn on_packet_sent(&mut self, packet_number: PacketNumber, info: &SentPacketInfo<P>) {
        let _ = (packet_number, info);
    }

    /// An in-flight packet was acknowledged for the first time
    #[inline]
    fn on_packet_acked(
        &mut self,
        packet_number: PacketNumber,
        info: SentPacketInfo<P>,
        rtt_estimator: &RttEstimator,
        now: Timestamp,
    ) {
        let _ = (packet_number, info, rtt_estimator, now);
    }

    /// One or more in-flight packets were declared lost by a single detection pass
    #[inline]
    fn on_packets_lost(
        &mut self,
        lost: Vec<LostPacket<P>>,
        rtt_estimator: &RttEstimator,
        now: Timestamp,
    ) {
        let _ = (lost, rtt_estimator, now);
    }

    /// A packet was removed from tracking so its frames can be sent again under a
    /// new packet number
    #[inline]
    fn on_retransmit_packet(
        &mut self,
        packet_number: PacketNumber,
        info: SentPacketInfo<P>,
        now: Timestamp,
    ) {
        let _ = (packet_number, info, now);
    }

    /// A packet was removed from tracking without being acknowledged, lost or
    /// retransmitted, which happens when the loss detector is reset
    #[inline]
    fn on_packet_discarded(&mut self, packet_number: PacketNumber, info: SentPacketInfo<P>) {
        let _ = (packet_number, info);
    }
}

impl<P> Subscriber<P> for () {}
