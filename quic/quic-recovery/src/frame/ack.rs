// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use crate::{
    packet::{number::PacketNumberSpace, EncryptionLevel},
    transport::AckSettings,
};
use core::{iter, ops::RangeInclusive, slice, time::Duration};

//= https://www.rfc-editor.org/rfc/rfc9000#section-19.3
//# Receivers send ACK frames (types 0x02 and 0x03) to inform senders of
//# packets they have received and processed.

/// The parts of a received ACK frame that recovery depends on.
///
/// Parsing the frame off the wire is the responsibility of the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ack<AckRanges> {
    /// The encoded ACK Delay field, before scaling by the ack delay exponent
    pub ack_delay: u64,

    /// The protection level of the packet that carried the frame
    pub encryption_level: EncryptionLevel,

    /// The acknowledged packet numbers
    pub ack_ranges: AckRanges,
}

impl<A: AckRanges> Ack<A> {
    /// Decodes the ACK Delay field with the peer's ack delay exponent
    #[inline]
    pub fn ack_delay(&self, settings: AckSettings) -> Duration {
        settings.decode_ack_delay(self.ack_delay)
    }

    /// Returns the space the acknowledged packet numbers belong to
    #[inline]
    pub fn packet_number_space(&self) -> PacketNumberSpace {
        self.encryption_level.packet_number_space()
    }

    //= https://www.rfc-editor.org/rfc/rfc9000#section-19.3
    //# Largest Acknowledged:  A variable-length integer representing the
    //#    largest packet number the peer is acknowledging

    #[inline]
    pub fn largest_acknowledged(&self) -> Option<u64> {
        self.ack_ranges.largest_acknowledged()
    }

    #[inline]
    pub fn ack_ranges(&self) -> A::Iter {
        self.ack_ranges.ack_ranges()
    }
}

/// A source of acknowledged packet number ranges
pub trait AckRanges {
    type Iter: Iterator<Item = RangeInclusive<u64>>;

    fn ack_ranges(&self) -> Self::Iter;

    /// Returns the largest packet number in any of the ranges.
    ///
    /// Empty ranges are ignored.
    fn largest_acknowledged(&self) -> Option<u64> {
        self.ack_ranges()
            .filter(|range| !range.is_empty())
            .map(|range| *range.end())
            .max()
    }
}

impl<'a> AckRanges for &'a [RangeInclusive<u64>] {
    type Iter = iter::Cloned<slice::Iter<'a, RangeInclusive<u64>>>;

    #[inline]
    fn ack_ranges(&self) -> Self::Iter {
        self.iter().cloned()
    }
}

impl AckRanges for RangeInclusive<u64> {
    type Iter = iter::Once<RangeInclusive<u64>>;

    #[inline]
    fn ack_ranges(&self) -> Self::Iter {
        iter::once(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::AckDelayExponent;

    #[test]
    fn largest_acknowledged_test() {
        let ranges = [8..=10, 1..=3, 20..=4];
        let frame = Ack {
            ack_delay: 0,
            encryption_level: EncryptionLevel::OneRtt,
            ack_ranges: &ranges[..],
        };

        assert_eq!(frame.largest_acknowledged(), Some(10));
        assert_eq!(
            frame.packet_number_space(),
            PacketNumberSpace::ApplicationData
        );

        let empty: &[RangeInclusive<u64>] = &[];
        assert_eq!(empty.largest_acknowledged(), None);
    }

    #[test]
    fn ack_delay_test() {
        let frame = Ack {
            ack_delay: 1_000,
            encryption_level: EncryptionLevel::Handshake,
            ack_ranges: 0..=0,
        };

        assert_eq!(
            frame.ack_delay(AckSettings::default()),
            Duration::from_micros(8_000)
        );

        let settings = AckSettings::new(AckDelayExponent::new(0).unwrap());
        assert_eq!(frame.ack_delay(settings), Duration::from_micros(1_000));
    }
}
