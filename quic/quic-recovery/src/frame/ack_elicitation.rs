// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

#[cfg(any(test, feature = "generator"))]
use bolero_generator::prelude::*;
use core::ops::{BitOr, BitOrAssign};

//= https://www.rfc-editor.org/rfc/rfc9002#section-2
//# Ack-eliciting packets:  Packets that contain ack-eliciting frames
//#    elicit an ACK from the receiver within the maximum acknowledgement
//#    delay and are called ack-eliciting packets.

/// Describes if a frame or packet requires an ACK from the peer
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(any(test, feature = "generator"), derive(TypeGenerator))]
pub enum AckElicitation {
    #[default]
    NonEliciting,
    Eliciting,
}

impl AckElicitation {
    /// Returns true if the `AckElicitation` is set to `Eliciting`
    #[inline]
    pub fn is_ack_eliciting(self) -> bool {
        matches!(self, Self::Eliciting)
    }
}

impl From<bool> for AckElicitation {
    #[inline]
    fn from(eliciting: bool) -> Self {
        if eliciting {
            Self::Eliciting
        } else {
            Self::NonEliciting
        }
    }
}

impl BitOr<AckElicitation> for AckElicitation {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        (self.is_ack_eliciting() || rhs.is_ack_eliciting()).into()
    }
}

impl BitOrAssign<AckElicitation> for AckElicitation {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        *self = *self | rhs;
    }
}
