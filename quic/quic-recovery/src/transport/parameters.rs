// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use core::time::Duration;

/// Returned when a configuration or transport parameter value is out of range
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ValidationError(pub(crate) &'static str);

//= https://www.rfc-editor.org/rfc/rfc9000#section-18.2
//# ack_delay_exponent (0x0a):  The acknowledgment delay exponent is an
//#    integer value indicating an exponent used to decode the ACK Delay
//#    field in the ACK frame (Section 19.3).  If this value is absent, a
//#    default value of 3 is assumed (indicating a multiplier of 8).
//#    Values above 20 are invalid.

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AckDelayExponent(u8);

impl AckDelayExponent {
    pub const RECOMMENDED: Self = Self(3);
    pub const MAX: Self = Self(20);

    pub fn new(value: u8) -> Result<Self, ValidationError> {
        if value > Self::MAX.0 {
            return Err(ValidationError(
                "ack_delay_exponent cannot be greater than 20",
            ));
        }
        Ok(Self(value))
    }

    #[inline]
    pub fn as_u8(self) -> u8 {
        self.0
    }
}

impl Default for AckDelayExponent {
    fn default() -> Self {
        Self::RECOMMENDED
    }
}

impl TryFrom<u8> for AckDelayExponent {
    type Error = ValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// The settings needed to interpret a peer's ACK Delay field.
///
/// Until the peer's transport parameters are known, the default exponent is used.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AckSettings {
    pub ack_delay_exponent: AckDelayExponent,
}

//= https://www.rfc-editor.org/rfc/rfc9000#section-19.3
//# The value of the ACK Delay
//# field is scaled by multiplying the encoded value by 2 to the power
//# of the value of the ack_delay_exponent transport parameter set by
//# the sender of the ACK frame; see Section 18.2.

impl AckSettings {
    pub const fn new(ack_delay_exponent: AckDelayExponent) -> Self {
        Self { ack_delay_exponent }
    }

    /// Decodes the peer's `Ack Delay` field
    pub fn decode_ack_delay(&self, delay: u64) -> Duration {
        let micros = delay
            .checked_mul(self.scale())
            .unwrap_or(u64::MAX);
        Duration::from_micros(micros)
    }

    #[inline]
    fn scale(&self) -> u64 {
        1 << self.ack_delay_exponent.0
    }
}
