// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use crate::{
    frame::{Ack, AckRanges},
    packet::number::{
        PacketNumber, PacketNumberSpace, PacketNumbers, SpaceMap, TruncatedPacketNumber,
    },
    recovery::{
        congestion_controller::WindowGrowth,
        event::{LostPacket, Subscriber},
        sender::Gate,
        CongestionController, LossDetector, RttEstimator, SentPacketInfo, Settings,
    },
    time::Timestamp,
    transmission::{Packet, Transmit},
    transport::{AckDelayExponent, AckSettings},
};
use alloc::vec::Vec;


/// Loss recovery for a single connection.
///
/// Owns the packet number spaces, the loss detector, the congestion controller and
/// the queue of packets waiting for congestion window. Every operation that may open
/// the window drains the queue into `Transmit`.
#[derive(Debug)]
pub struct Manager<P, G> {
    packet_numbers: SpaceMap<PacketNumbers>,
    loss_detector: LossDetector<P>,
    congestion_controller: CongestionController<G>,
    gate: Gate<P>,
}

impl<P: Packet, G: WindowGrowth> Manager<P, G> {
    pub fn new(settings: &Settings, growth: G) -> Self {
        Self {
            packet_numbers: SpaceMap::new(PacketNumbers::new),
            loss_detector: LossDetector::new(settings),
            congestion_controller: CongestionController::new(settings, growth),
            gate: Gate::default(),
        }
    }

    /// Queues packets for transmission and sends as many as the window allows
    pub fn enqueue<I, T>(&mut self, packets: I, now: Timestamp, tx: &mut T) -> usize
    where
        I: IntoIterator<Item = P>,
        T: Transmit<P>,
    {
        self.gate.enqueue(packets);
        self.drain(now, tx)
    }

    /// Releases queued packets while the congestion window allows it.
    ///
    /// Packet numbers are assigned as packets leave the queue. Returns the number of
    /// packets handed to `tx`.
    pub fn drain<T: Transmit<P>>(&mut self, now: Timestamp, tx: &mut T) -> usize {
        let mut released = 0;

        while let Some(mut packet) = self.gate.release(&self.congestion_controller) {
            let Some(space) = packet.packet_type().packet_number_space() else {
                packet.set_packet_number(None);
                tx.transmit(&packet, now);
                released += 1;
                continue;
            };

            let packet_numbers = &mut self.packet_numbers[space];
            if packet_numbers.is_exhausted() {
                tracing::error!(
                    space = ?space,
                    "packet number space exhausted; the connection must be closed"
                );
                self.gate.requeue([packet]);
                break;
            }

            let packet_number = packet_numbers.next();
            packet.set_packet_number(Some(packet_number));
            tx.transmit(&packet, now);
            released += 1;

            let mut signals = Signals::new(&mut self.congestion_controller);
            self.loss_detector.on_packet_sent(packet, now, &mut signals);
            self.gate.requeue(signals.retransmissions);
        }

        released
    }

    /// Records a packet number that was successfully received from the peer
    #[inline]
    pub fn on_packet_received(&mut self, packet_number: PacketNumber) {
        self.packet_numbers[packet_number.space()].set_highest_received(packet_number);
    }

    /// Expands a truncated packet number from a received packet header
    #[inline]
    pub fn decode_packet_number(&self, truncated: TruncatedPacketNumber) -> Option<PacketNumber> {
        self.packet_numbers[truncated.space()].decode(truncated)
    }

    pub fn on_ack_received<A, T>(&mut self, frame: &Ack<A>, now: Timestamp, tx: &mut T) -> usize
    where
        A: AckRanges,
        T: Transmit<P>,
    {
        let mut signals = Signals::new(&mut self.congestion_controller);
        self.loss_detector.on_ack_received(frame, now, &mut signals);
        self.gate.requeue(signals.retransmissions);

        self.drain(now, tx)
    }

    /// Runs the loss detection alarm if it has expired
    pub fn on_timeout<T: Transmit<P>>(&mut self, now: Timestamp, tx: &mut T) -> usize {
        let mut signals = Signals::new(&mut self.congestion_controller);
        self.loss_detector.on_timeout(now, &mut signals);
        self.gate.requeue(signals.retransmissions);

        self.drain(now, tx)
    }

    /// Applies the ack delay exponent from the peer's transport parameters
    #[inline]
    pub fn on_transport_parameters(&mut self, ack_delay_exponent: AckDelayExponent) {
        self.loss_detector
            .on_ack_settings(AckSettings::new(ack_delay_exponent));
    }

    /// Forgets every sent packet after a Version Negotiation or Retry.
    ///
    /// Packet numbers keep increasing and queued packets stay queued.
    pub fn reset(&mut self) {
        let mut signals = Signals::new(&mut self.congestion_controller);
        self.loss_detector.reset(&mut signals);
        debug_assert!(signals.retransmissions.is_empty());
    }

    /// Stops all recovery activity for the connection
    pub fn close(&mut self) {
        self.reset();
        self.gate.clear();
        self.congestion_controller.reset();
        tracing::debug!("recovery closed");
    }
}

impl<P, G> Manager<P, G> {
    /// Returns the time `on_timeout` should be called, if any
    #[inline]
    pub fn next_expiration(&self) -> Option<Timestamp> {
        self.loss_detector.next_expiration()
    }

    #[inline]
    pub fn loss_detector(&self) -> &LossDetector<P> {
        &self.loss_detector
    }

    #[inline]
    pub fn congestion_controller(&self) -> &CongestionController<G> {
        &self.congestion_controller
    }

    /// Gives access to the congestion controller for signals that don't come from
    /// the loss detector, such as ECN feedback
    #[inline]
    pub fn congestion_controller_mut(&mut self) -> &mut CongestionController<G> {
        &mut self.congestion_controller
    }

    #[inline]
    pub fn packet_numbers(&self, space: PacketNumberSpace) -> &PacketNumbers {
        &self.packet_numbers[space]
    }

    #[inline]
    pub fn queued(&self) -> usize {
        self.gate.len()
    }
}

/// Routes loss detector signals to the congestion controller and collects the
/// packets that need to be sent again
struct Signals<'a, P, G> {
    congestion_controller: &'a mut CongestionController<G>,
    retransmissions: Vec<P>,
}

impl<'a, P, G> Signals<'a, P, G> {
    #[inline]
    fn new(congestion_controller: &'a mut CongestionController<G>) -> Self {
        Self {
            congestion_controller,
            retransmissions: Vec::new(),
        }
    }
}

impl<P: Packet, G: WindowGrowth> Subscriber<P> for Signals<'_, P, G> {
    #[inline]
    fn on_packet_sent(&mut self, _packet_number: PacketNumber, info: &SentPacketInfo<P>) {
        self.congestion_controller.on_packet_sent(info);
    }

    #[inline]
    fn on_packet_acked(
        &mut self,
        _packet_number: PacketNumber,
        info: SentPacketInfo<P>,
        rtt_estimator: &RttEstimator,
        now: Timestamp,
    ) {
        self.congestion_controller
            .on_packet_acked(&info, rtt_estimator, now);
    }

    fn on_packets_lost(
        &mut self,
        lost: Vec<LostPacket<P>>,
        rtt_estimator: &RttEstimator,
        now: Timestamp,
    ) {
        self.congestion_controller
            .on_packets_lost(lost.iter().map(|(_, info)| info), rtt_estimator, now);

        // the frames in lost ack-eliciting packets are sent again in new packets
        self.retransmissions.extend(
            lost.into_iter()
                .filter(|(_, info)| info.ack_elicitation.is_ack_eliciting())
                .map(|(_, info)| info.packet),
        );
    }

    #[inline]
    fn on_retransmit_packet(
        &mut self,
        _packet_number: PacketNumber,
        info: SentPacketInfo<P>,
        _now: Timestamp,
    ) {
        self.congestion_controller.on_packet_discarded(&info);
        self.retransmissions.push(info.packet);
    }

    #[inline]
    fn on_packet_discarded(&mut self, _packet_number: PacketNumber, info: SentPacketInfo<P>) {
        self.congestion_controller.on_packet_discarded(&info);
    }
}
