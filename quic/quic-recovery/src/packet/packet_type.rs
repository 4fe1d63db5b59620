// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use crate::packet::number::PacketNumberSpace;

#[cfg(any(test, feature = "generator"))]
use bolero_generator::prelude::*;

/// The type of a QUIC packet, as indicated by its header
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(any(test, feature = "generator"), derive(TypeGenerator))]
pub enum PacketType {
    VersionNegotiation,
    Initial,
    ZeroRtt,
    Handshake,
    Retry,
    /// Short header packet
    OneRtt,
}

impl PacketType {
    //= https://www.rfc-editor.org/rfc/rfc9000#section-12.3
    //# *  Initial space: All Initial packets (Section 17.2.2) are in this
    //#    space.
    //#
    //# *  Handshake space: All Handshake packets (Section 17.2.4) are in
    //#    this space.
    //#
    //# *  Application data space: All 0-RTT (Section 17.2.3) and 1-RTT
    //#    (Section 17.3.1) packets are in this space.

    //= https://www.rfc-editor.org/rfc/rfc9000#section-12.3
    //# Version Negotiation (Section 17.2.1) and Retry (Section 17.2.5)
    //# packets do not include a packet number.

    /// Returns the packet number space for the packet type, if it has one
    #[inline]
    pub fn packet_number_space(self) -> Option<PacketNumberSpace> {
        match self {
            Self::Initial => Some(PacketNumberSpace::Initial),
            Self::Handshake => Some(PacketNumberSpace::Handshake),
            Self::ZeroRtt | Self::OneRtt => Some(PacketNumberSpace::ApplicationData),
            Self::VersionNegotiation | Self::Retry => None,
        }
    }

    /// Returns the encryption level used to protect the packet type, if any
    #[inline]
    pub fn encryption_level(self) -> Option<EncryptionLevel> {
        match self {
            Self::Initial => Some(EncryptionLevel::Initial),
            Self::ZeroRtt => Some(EncryptionLevel::ZeroRtt),
            Self::Handshake => Some(EncryptionLevel::Handshake),
            Self::OneRtt => Some(EncryptionLevel::OneRtt),
            Self::VersionNegotiation | Self::Retry => None,
        }
    }
}

/// The packet protection level an ACK frame was received at
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(any(test, feature = "generator"), derive(TypeGenerator))]
pub enum EncryptionLevel {
    Initial,
    ZeroRtt,
    Handshake,
    OneRtt,
}

impl EncryptionLevel {
    /// Returns the packet number space that is protected by the encryption level
    #[inline]
    pub fn packet_number_space(self) -> PacketNumberSpace {
        match self {
            Self::Initial => PacketNumberSpace::Initial,
            Self::Handshake => PacketNumberSpace::Handshake,
            Self::ZeroRtt | Self::OneRtt => PacketNumberSpace::ApplicationData,
        }
    }
}
