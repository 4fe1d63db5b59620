// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

#[cfg(any(test, feature = "generator"))]
use bolero_generator::prelude::*;

//= https://www.rfc-editor.org/rfc/rfc9000#section-17.1
//# When present in long or short packet headers, they are encoded in 1
//# to 4 bytes.

/// The number of bytes used to encode a truncated packet number
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(any(test, feature = "generator"), derive(TypeGenerator))]
pub enum PacketNumberLen {
    U8,
    U16,
    U24,
    U32,
}

impl PacketNumberLen {
    /// Returns the smallest encoding able to represent `range` distinct values
    #[inline]
    pub fn for_range(range: u64) -> Option<Self> {
        Some(match range {
            r if r < 1 << 8 => Self::U8,
            r if r < 1 << 16 => Self::U16,
            r if r < 1 << 24 => Self::U24,
            r if r < 1 << 32 => Self::U32,
            _ => return None,
        })
    }

    /// Returns the encoded length in bytes
    #[inline]
    pub const fn bytesize(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 => 2,
            Self::U24 => 3,
            Self::U32 => 4,
        }
    }

    #[inline]
    pub const fn bitsize(self) -> usize {
        self.bytesize() * 8
    }

    /// Returns the mask for the bits retained by the encoding
    #[inline]
    pub const fn mask(self) -> u64 {
        (1u64 << self.bitsize()) - 1
    }
}
