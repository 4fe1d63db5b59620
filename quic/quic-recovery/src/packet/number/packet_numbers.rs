// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use crate::packet::number::{PacketNumber, PacketNumberSpace, TruncatedPacketNumber};

/// Packet number bookkeeping for a single packet number space.
///
/// Issues outgoing packet numbers and tracks the highest packet number received
/// from the peer, which is needed to expand truncated packet numbers.
#[derive(Clone, Debug)]
pub struct PacketNumbers {
    space: PacketNumberSpace,
    pub(super) next_to_send: PacketNumber,
    exhausted: bool,
    highest_received: Option<PacketNumber>,
}

impl PacketNumbers {
    pub fn new(space: PacketNumberSpace) -> Self {
        Self {
            space,
            next_to_send: PacketNumber::zero(space),
            exhausted: false,
            highest_received: None,
        }
    }

    #[inline]
    pub fn space(&self) -> PacketNumberSpace {
        self.space
    }

    //= https://www.rfc-editor.org/rfc/rfc9000#section-12.3
    //# A QUIC endpoint MUST NOT reuse a packet number within the same packet
    //# number space in one connection.  If the packet number for sending
    //# reaches 2^62 - 1, the sender MUST close the connection without
    //# sending a CONNECTION_CLOSE frame or any further packets

    /// Returns a fresh packet number, greater than any previously returned
    pub fn next(&mut self) -> PacketNumber {
        let packet_number = self.next_to_send;

        match packet_number.next() {
            Some(next) => self.next_to_send = next,
            None if self.exhausted => {
                tracing::error!(space = ?self.space, "packet number space exhausted");
            }
            None => self.exhausted = true,
        }

        packet_number
    }

    /// Returns true once every packet number in the space has been issued
    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    #[inline]
    pub fn highest_received(&self) -> Option<PacketNumber> {
        self.highest_received
    }

    /// Records the largest packet number successfully processed from the peer
    pub fn set_highest_received(&mut self, packet_number: PacketNumber) {
        self.space.assert_eq(packet_number.space());

        if let Some(highest) = self.highest_received {
            if packet_number <= highest {
                tracing::error!(
                    space = ?self.space,
                    highest = %highest,
                    packet_number = %packet_number,
                    "highest received packet number must increase"
                );
                return;
            }
        }

        self.highest_received = Some(packet_number);
    }

    /// Expands a truncated packet number received in this space
    pub fn decode(&self, truncated: TruncatedPacketNumber) -> Option<PacketNumber> {
        match self.highest_received {
            Some(highest) => truncated.expand(highest),
            None => truncated.expand_initial(),
        }
    }
}
