// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use crate::packet::number::{
    decode_packet_number, packet_number::PacketNumber, packet_number_len::PacketNumberLen,
    packet_number_space::PacketNumberSpace,
};

/// A truncated packet number, which is derived from the largest acknowledged packet number
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TruncatedPacketNumber {
    space: PacketNumberSpace,
    value: u32,
    len: PacketNumberLen,
}

#[allow(clippy::len_without_is_empty)]
impl TruncatedPacketNumber {
    /// Creates a `TruncatedPacketNumber` from the low bits of `value`
    #[inline]
    pub fn new(space: PacketNumberSpace, value: u64, len: PacketNumberLen) -> Self {
        Self {
            space,
            value: (value & len.mask()) as u32,
            len,
        }
    }

    /// Returns the space for the given `TruncatedPacketNumber`
    #[inline]
    pub const fn space(self) -> PacketNumberSpace {
        self.space
    }

    #[inline]
    pub const fn len(self) -> PacketNumberLen {
        self.len
    }

    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.value as u64
    }

    /// Expands the `TruncatedPacketNumber` into a `PacketNumber`, relative to the
    /// largest packet number received so far
    #[inline]
    pub fn expand(self, largest_packet_number: PacketNumber) -> Option<PacketNumber> {
        let expected = largest_packet_number.as_u64().checked_add(1)?;
        decode_packet_number(self.space, expected, self)
    }

    /// Expands the `TruncatedPacketNumber` when nothing has been received in the space yet
    #[inline]
    pub(crate) fn expand_initial(self) -> Option<PacketNumber> {
        decode_packet_number(self.space, 0, self)
    }
}
