// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use crate::{
    frame::ack_elicitation::AckElicitation,
    packet::number::{PacketNumber, PacketNumberSpace},
    time::Timestamp,
    transmission::Packet,
};
use alloc::collections::{
    btree_map::{self, Entry},
    BTreeMap,
};
use core::ops::RangeBounds;

//= https://www.rfc-editor.org/rfc/rfc9002#appendix-A.1.1
//# packet_number:  The packet number of the sent packet.
//#
//# ack_eliciting:  A boolean that indicates whether a packet is ack-
//#    eliciting.  If true, it is expected that an acknowledgment will
//#    be received, though the peer could delay sending the ACK frame
//#    containing it by up to the max_ack_delay.
//#
//# in_flight:  A boolean that indicates whether the packet counts toward
//#    bytes in flight.
//#
//# sent_bytes:  The number of bytes sent in the packet, not including
//#    UDP or IP overhead, but including QUIC framing overhead.
//#
//# time_sent:  The time the packet was sent.

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentPacketInfo<P> {
    /// The packet, kept for retransmission
    pub packet: P,
    pub time_sent: Timestamp,
    pub sent_bytes: u16,
    pub ack_elicitation: AckElicitation,
    pub in_flight: bool,
    pub contains_crypto_data: bool,
}

impl<P: Packet> SentPacketInfo<P> {
    pub fn new(packet: P, time_sent: Timestamp) -> Self {
        Self {
            time_sent,
            sent_bytes: packet.size(),
            ack_elicitation: packet.ack_elicitation(),
            in_flight: packet.is_in_flight(),
            contains_crypto_data: packet.contains_crypto_data(),
            packet,
        }
    }
}

impl<P> SentPacketInfo<P> {
    /// Returns true if the packet is counted by the ack-eliciting outstanding counter
    #[inline]
    pub fn is_outstanding_ack_eliciting(&self) -> bool {
        self.in_flight && self.ack_elicitation.is_ack_eliciting()
    }

    /// Returns true if the packet is counted by the crypto outstanding counter
    #[inline]
    pub fn is_outstanding_crypto(&self) -> bool {
        self.in_flight && self.contains_crypto_data
    }
}

/// The sent packets awaiting acknowledgement in a single packet number space,
/// ordered by packet number
#[derive(Clone, Debug)]
pub struct SentPackets<P> {
    space: PacketNumberSpace,
    sent_packets: BTreeMap<PacketNumber, SentPacketInfo<P>>,
}

impl<P> SentPackets<P> {
    pub fn new(space: PacketNumberSpace) -> Self {
        Self {
            space,
            sent_packets: BTreeMap::new(),
        }
    }

    /// Inserts the given `sent_packet_info`.
    ///
    /// A packet number is never tracked twice. If one is already present the
    /// existing entry is kept and the rejected info is handed back.
    pub fn insert(
        &mut self,
        packet_number: PacketNumber,
        sent_packet_info: SentPacketInfo<P>,
    ) -> Result<(), SentPacketInfo<P>> {
        self.space.assert_eq(packet_number.space());

        match self.sent_packets.entry(packet_number) {
            Entry::Vacant(entry) => {
                entry.insert(sent_packet_info);
                Ok(())
            }
            Entry::Occupied(_) => {
                tracing::error!(
                    space = ?self.space,
                    packet_number = %packet_number,
                    "packet number is already tracked"
                );
                Err(sent_packet_info)
            }
        }
    }

    /// Returns a reference to the `SentPacketInfo` associated with the given `packet_number`
    #[inline]
    pub fn get(&self, packet_number: PacketNumber) -> Option<&SentPacketInfo<P>> {
        self.sent_packets.get(&packet_number)
    }

    /// Removes the `SentPacketInfo` associated with the given `packet_number`.
    ///
    /// Removing a packet number that isn't tracked indicates an accounting error
    /// by the caller and is logged.
    pub fn remove(&mut self, packet_number: PacketNumber) -> Option<SentPacketInfo<P>> {
        let info = self.sent_packets.remove(&packet_number);

        if info.is_none() {
            tracing::error!(
                space = ?self.space,
                packet_number = %packet_number,
                "removed a packet number that was never tracked"
            );
        }

        info
    }

    /// Returns the tracked packets within `range`, in ascending order
    pub fn range<R: RangeBounds<PacketNumber>>(
        &self,
        range: R,
    ) -> btree_map::Range<'_, PacketNumber, SentPacketInfo<P>> {
        self.sent_packets.range(range)
    }

    /// Gets an iterator over the sent packet entries, sorted by PacketNumber
    #[inline]
    pub fn iter(&self) -> btree_map::Iter<'_, PacketNumber, SentPacketInfo<P>> {
        self.sent_packets.iter()
    }

    /// Returns true if there are no pending sent packets
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sent_packets.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.sent_packets.len()
    }

    /// Removes every entry, returning them in packet number order
    pub fn take_all(&mut self) -> btree_map::IntoIter<PacketNumber, SentPacketInfo<P>> {
        core::mem::take(&mut self.sent_packets).into_iter()
    }
}
