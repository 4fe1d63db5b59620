// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use crate::packet::number::{
    derive_truncation_range, packet_number_space::PacketNumberSpace,
    truncated_packet_number::TruncatedPacketNumber,
};
use core::{cmp::Ordering, fmt};

/// A fully-decoded packet number in a given space.
///
/// Packet numbers are immutable values. Advancing a sequence always produces a new
/// `PacketNumber`; nothing hands out references to a shared counter.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PacketNumber {
    space: PacketNumberSpace,
    value: u64,
}

impl PartialOrd for PacketNumber {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PacketNumber {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.space.assert_eq(other.space);
        self.value.cmp(&other.value)
    }
}

impl fmt::Debug for PacketNumber {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("PacketNumber")
            .field(&self.space)
            .field(&self.value)
            .finish()
    }
}

impl fmt::Display for PacketNumber {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.value.fmt(f)
    }
}

impl PacketNumber {
    /// The largest value a packet number can hold
    pub const MAX_VALUE: u64 = (1 << 62) - 1;

    /// The first packet number in a space
    #[inline]
    pub(crate) const fn zero(space: PacketNumberSpace) -> Self {
        Self { space, value: 0 }
    }

    #[inline]
    pub(crate) fn new(space: PacketNumberSpace, value: u64) -> Option<Self> {
        ensure!(value <= Self::MAX_VALUE, None);
        Some(Self { space, value })
    }

    /// Returns the `PacketNumberSpace` for the given `PacketNumber`
    #[inline]
    pub fn space(self) -> PacketNumberSpace {
        self.space
    }

    /// Returns the numeric value of the packet number.
    ///
    /// Note: this removes the corresponding `PacketNumberSpace`, so any math
    /// performed with the result must not mix values from different spaces.
    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.value
    }

    /// Truncates the `PacketNumber` into a `TruncatedPacketNumber` based on
    /// the largest acknowledged packet number
    #[inline]
    pub fn truncate(
        self,
        largest_acknowledged_packet_number: Self,
    ) -> Option<TruncatedPacketNumber> {
        let len = derive_truncation_range(largest_acknowledged_packet_number, self)?;
        Some(TruncatedPacketNumber::new(self.space, self.value, len))
    }

    /// Compute the next packet number in the space. If the packet number has
    /// exceeded the maximum value allowed `None` will be returned.
    #[inline]
    pub fn next(self) -> Option<Self> {
        Self::new(self.space, self.value.checked_add(1)?)
    }

    /// Compute the prev packet number in the space. If the packet number has
    /// underflowed `None` will be returned.
    #[inline]
    pub fn prev(self) -> Option<Self> {
        Self::new(self.space, self.value.checked_sub(1)?)
    }

    /// Computes the distance between this packet number and the given packet number,
    /// returning None if overflow occurred.
    #[inline]
    pub fn checked_distance(self, rhs: PacketNumber) -> Option<u64> {
        self.space.assert_eq(rhs.space);
        self.value.checked_sub(rhs.value)
    }

    /// Returns the packet number `count` positions before this one, if it exists
    #[inline]
    pub fn checked_sub(self, count: u64) -> Option<Self> {
        Self::new(self.space, self.value.checked_sub(count)?)
    }
}

#[cfg(any(test, feature = "generator"))]
mod generator {
    use super::*;
    use bolero_generator::{driver::Driver, TypeGenerator, ValueGenerator};

    impl TypeGenerator for PacketNumber {
        fn generate<D: Driver>(driver: &mut D) -> Option<Self> {
            let space = PacketNumberSpace::generate(driver)?;
            let value = (0..=PacketNumber::MAX_VALUE).generate(driver)?;
            PacketNumber::new(space, value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_prev_test() {
        let space = PacketNumberSpace::Handshake;
        let pn = space.new_packet_number(7).unwrap();

        assert_eq!(pn.next().unwrap().as_u64(), 8);
        assert_eq!(pn.prev().unwrap().as_u64(), 6);
        assert_eq!(pn.next().unwrap().space(), space);
        assert!(space.new_packet_number(0).unwrap().prev().is_none());
    }

    #[test]
    fn max_value_test() {
        let space = PacketNumberSpace::ApplicationData;
        let max = space.new_packet_number(PacketNumber::MAX_VALUE).unwrap();

        assert!(max.next().is_none());
        assert!(space.new_packet_number(PacketNumber::MAX_VALUE + 1).is_none());
    }

    #[test]
    fn distance_test() {
        let space = PacketNumberSpace::Initial;
        let a = space.new_packet_number(100).unwrap();
        let b = space.new_packet_number(97).unwrap();

        assert_eq!(a.checked_distance(b), Some(3));
        assert_eq!(b.checked_distance(a), None);
        assert_eq!(a.checked_sub(3), Some(b));
        assert_eq!(b.checked_sub(98), None);
    }
}
