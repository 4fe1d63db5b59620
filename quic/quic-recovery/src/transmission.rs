// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! The boundary between recovery and the packet pipeline

use crate::{
    frame::ack_elicitation::AckElicitation,
    packet::{number::PacketNumber, PacketType},
    time::Timestamp,
};

/// An outgoing packet, as seen by loss recovery.
///
/// Packets are built by the caller. Recovery assigns the packet number when the
/// packet is released for transmission and keeps ownership of the packet until it
/// is acknowledged, declared lost or handed back for retransmission.
pub trait Packet {
    fn packet_type(&self) -> PacketType;

    /// The number of bytes sent in the packet, not including UDP or IP overhead
    fn size(&self) -> u16;

    fn ack_elicitation(&self) -> AckElicitation;

    //= https://www.rfc-editor.org/rfc/rfc9002#section-2
    //# In-flight packets:  Packets are considered in flight when they are
    //#    ack-eliciting or contain a PADDING frame, and they have been sent
    //#    but are not acknowledged, declared lost, or abandoned along with
    //#    old keys.

    /// Returns true if the packet counts towards bytes in flight
    fn is_in_flight(&self) -> bool;

    /// Returns true if the packet carries CRYPTO frames
    fn contains_crypto_data(&self) -> bool;

    fn packet_number(&self) -> Option<PacketNumber>;

    fn set_packet_number(&mut self, packet_number: Option<PacketNumber>);
}

/// The next stage of the send pipeline
pub trait Transmit<P> {
    /// Sends the packet. The packet number has already been assigned.
    fn transmit(&mut self, packet: &P, now: Timestamp);
}

impl<P, F: FnMut(&P, Timestamp)> Transmit<P> for F {
    #[inline]
    fn transmit(&mut self, packet: &P, now: Timestamp) {
        (self)(packet, now)
    }
}
