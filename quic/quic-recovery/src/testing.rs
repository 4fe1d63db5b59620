// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use crate::{
    frame::ack_elicitation::AckElicitation,
    packet::{number::PacketNumber, PacketType},
    recovery::{event::Subscriber, RttEstimator, SentPacketInfo},
    time::Timestamp,
    transmission::Packet,
};
use std::sync::Once;

pub fn init_tracing() {
    if cfg!(any(miri, fuzzing)) {
        return;
    }

    static TRACING: Once = Once::new();

    // make sure this only gets initialized once
    TRACING.call_once(|| {
        let format = tracing_subscriber::fmt::format().compact();

        let default_level = if cfg!(debug_assertions) {
            tracing::Level::DEBUG
        } else {
            tracing::Level::WARN
        };

        let env_filter = tracing_subscriber::EnvFilter::builder()
            .with_default_directive(default_level.into())
            .with_env_var("QUIC_LOG")
            .from_env_lossy();

        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .event_format(format)
            .with_test_writer()
            .try_init();
    });
}

/// A packet with fixed properties, identified by `id` across retransmissions
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestPacket {
    pub id: u64,
    pub packet_type: PacketType,
    pub size: u16,
    pub ack_elicitation: AckElicitation,
    pub in_flight: bool,
    pub crypto: bool,
    pub packet_number: Option<PacketNumber>,
}

impl TestPacket {
    pub fn new(packet_type: PacketType, size: u16) -> Self {
        Self {
            id: 0,
            packet_type,
            size,
            ack_elicitation: AckElicitation::Eliciting,
            in_flight: true,
            crypto: false,
            packet_number: None,
        }
    }

    /// An Initial packet carrying CRYPTO frames
    pub fn initial(size: u16) -> Self {
        Self::new(PacketType::Initial, size).with_crypto(true)
    }

    /// A Handshake packet carrying CRYPTO frames
    pub fn handshake(size: u16) -> Self {
        Self::new(PacketType::Handshake, size).with_crypto(true)
    }

    /// A 1-RTT packet carrying ack-eliciting frames
    pub fn application(size: u16) -> Self {
        Self::new(PacketType::OneRtt, size)
    }

    /// A packet only carrying ACK frames
    pub fn ack_only(packet_type: PacketType, size: u16) -> Self {
        Self {
            ack_elicitation: AckElicitation::NonEliciting,
            in_flight: false,
            ..Self::new(packet_type, size)
        }
    }

    pub fn with_id(mut self, id: u64) -> Self {
        self.id = id;
        self
    }

    pub fn with_crypto(mut self, crypto: bool) -> Self {
        self.crypto = crypto;
        self
    }
}

impl Packet for TestPacket {
    fn packet_type(&self) -> PacketType {
        self.packet_type
    }

    fn size(&self) -> u16 {
        self.size
    }

    fn ack_elicitation(&self) -> AckElicitation {
        self.ack_elicitation
    }

    fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    fn contains_crypto_data(&self) -> bool {
        self.crypto
    }

    fn packet_number(&self) -> Option<PacketNumber> {
        self.packet_number
    }

    fn set_packet_number(&mut self, packet_number: Option<PacketNumber>) {
        self.packet_number = packet_number;
    }
}

/// Records every signal emitted by the loss detector
#[derive(Debug, Default)]
pub struct Events<P> {
    pub sent: Vec<PacketNumber>,
    pub acked: Vec<(PacketNumber, SentPacketInfo<P>)>,
    pub lost: Vec<Vec<(PacketNumber, SentPacketInfo<P>)>>,
    pub retransmitted: Vec<(PacketNumber, SentPacketInfo<P>)>,
    pub discarded: Vec<(PacketNumber, SentPacketInfo<P>)>,
}

impl<P> Events<P> {
    pub fn new() -> Self {
        Self {
            sent: Vec::new(),
            acked: Vec::new(),
            lost: Vec::new(),
            retransmitted: Vec::new(),
            discarded: Vec::new(),
        }
    }

    /// Returns the packet numbers declared lost across every detection pass
    pub fn lost_packet_numbers(&self) -> Vec<u64> {
        self.lost
            .iter()
            .flatten()
            .map(|(packet_number, _)| packet_number.as_u64())
            .collect()
    }

    pub fn acked_packet_numbers(&self) -> Vec<u64> {
        self.acked
            .iter()
            .map(|(packet_number, _)| packet_number.as_u64())
            .collect()
    }

    pub fn retransmitted_packet_numbers(&self) -> Vec<u64> {
        self.retransmitted
            .iter()
            .map(|(packet_number, _)| packet_number.as_u64())
            .collect()
    }
}

impl<P> Subscriber<P> for Events<P> {
    fn on_packet_sent(&mut self, packet_number: PacketNumber, _info: &SentPacketInfo<P>) {
        self.sent.push(packet_number);
    }

    fn on_packet_acked(
        &mut self,
        packet_number: PacketNumber,
        info: SentPacketInfo<P>,
        _rtt_estimator: &RttEstimator,
        _now: Timestamp,
    ) {
        self.acked.push((packet_number, info));
    }

    fn on_packets_lost(
        &mut self,
        lost: Vec<(PacketNumber, SentPacketInfo<P>)>,
        _rtt_estimator: &RttEstimator,
        _now: Timestamp,
    ) {
        self.lost.push(lost);
    }

    fn on_retransmit_packet(
        &mut self,
        packet_number: PacketNumber,
        info: SentPacketInfo<P>,
        _now: Timestamp,
    ) {
        self.retransmitted.push((packet_number, info));
    }

    fn on_packet_discarded(&mut self, packet_number: PacketNumber, info: SentPacketInfo<P>) {
        self.discarded.push((packet_number, info));
    }
}
