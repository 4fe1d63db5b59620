// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use crate::transport::ValidationError;
use core::time::Duration;

//= https://www.rfc-editor.org/rfc/rfc9002#section-6.1.1
//# The RECOMMENDED initial value for the packet reordering threshold
//# (kPacketThreshold) is 3, based on best practices for TCP loss
//# detection [RFC5681] [RFC6675].
pub const K_PACKET_THRESHOLD: u64 = 3;

//= https://www.rfc-editor.org/rfc/rfc9002#section-6.1.2
//# The RECOMMENDED time threshold (kTimeThreshold), expressed as an
//# RTT multiplier, is 9/8.
pub const K_TIME_THRESHOLD: f32 = 9.0 / 8.0;

//= https://www.rfc-editor.org/rfc/rfc9002#section-6.1.2
//# The RECOMMENDED value of the
//# timer granularity (kGranularity) is 1 millisecond.
pub const K_GRANULARITY: Duration = Duration::from_millis(1);

//= https://www.rfc-editor.org/rfc/rfc9002#section-6.2.2
//# When no previous RTT is available, the initial RTT
//# SHOULD be set to 333 milliseconds.
pub const DEFAULT_INITIAL_RTT: Duration = Duration::from_millis(333);

//= https://www.rfc-editor.org/rfc/rfc9000#section-14
//# A client MUST expand the payload of all UDP datagrams carrying
//# Initial packets to at least the smallest allowed maximum datagram
//# size of 1200 bytes
pub const MINIMUM_MAX_DATAGRAM_SIZE: u16 = 1200;

pub const DEFAULT_INITIAL_WINDOW: u32 = 14720;

//= https://www.rfc-editor.org/rfc/rfc9002#section-7.2
//# The RECOMMENDED value is 2 * max_datagram_size.
const MINIMUM_WINDOW_PACKETS: u32 = 2;

//= https://www.rfc-editor.org/rfc/rfc9002#section-7.3.2
//# The RECOMMENDED value is 0.5.
pub const K_LOSS_REDUCTION_FACTOR: f32 = 0.5;

pub const K_PERSISTENT_CONGESTION_THRESHOLD: u32 = 2;

//= https://www.rfc-editor.org/rfc/rfc8312#section-5.1
//# Therefore, C SHOULD be set to 0.4.
pub const CUBIC_C: f32 = 0.4;

//= https://www.rfc-editor.org/rfc/rfc8312#section-4.5
//# Parameter beta_cubic SHOULD be set to 0.7.
pub const CUBIC_BETA: f32 = 0.7;

macro_rules! setter {
    (
        $(#[doc = $doc:expr])*
        $name:ident,
        $field:ident,
        $inner:ty,
        |$this:ident, $value:ident| $validate:expr
    ) => {
        $(#[doc = $doc])*
        pub fn $name(mut self, $value: $inner) -> Result<Self, ValidationError> {
            {
                #[allow(unused_variables)]
                let $this = &self;
                $validate?;
            }
            self.$field = $value;
            Ok(self)
        }
    };
}

#[inline]
fn check(cond: bool, message: &'static str) -> Result<(), ValidationError> {
    if cond {
        Ok(())
    } else {
        Err(ValidationError(message))
    }
}

/// Loss recovery and congestion control configuration
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Settings {
    pub(crate) max_datagram_size: u16,
    pub(crate) initial_window: u32,
    pub(crate) loss_reduction_factor: f32,
    pub(crate) packet_threshold: u64,
    pub(crate) time_threshold: f32,
    pub(crate) granularity: Duration,
    pub(crate) initial_rtt: Duration,
    pub(crate) persistent_congestion_threshold: u32,
    pub(crate) cubic_c: f32,
    pub(crate) cubic_beta: f32,
    pub(crate) cubic_fast_convergence: bool,
    pub(crate) cubic_tcp_friendliness: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self::RECOMMENDED
    }
}

impl Settings {
    pub const RECOMMENDED: Self = Self {
        max_datagram_size: MINIMUM_MAX_DATAGRAM_SIZE,
        initial_window: DEFAULT_INITIAL_WINDOW,
        loss_reduction_factor: K_LOSS_REDUCTION_FACTOR,
        packet_threshold: K_PACKET_THRESHOLD,
        time_threshold: K_TIME_THRESHOLD,
        granularity: K_GRANULARITY,
        initial_rtt: DEFAULT_INITIAL_RTT,
        persistent_congestion_threshold: K_PERSISTENT_CONGESTION_THRESHOLD,
        cubic_c: CUBIC_C,
        cubic_beta: CUBIC_BETA,
        cubic_fast_convergence: true,
        cubic_tcp_friendliness: true,
    };

    setter!(
        /// Sets the maximum datagram size used for window calculations
        with_max_datagram_size,
        max_datagram_size,
        u16,
        |this, value| check(
            value >= MINIMUM_MAX_DATAGRAM_SIZE,
            "max_datagram_size must be at least 1200",
        )
        .and(check(
            this.initial_window >= MINIMUM_WINDOW_PACKETS * value as u32,
            "initial_window must be at least 2 * max_datagram_size",
        ))
    );
    setter!(
        with_initial_window,
        initial_window,
        u32,
        |this, value| check(
            value >= this.minimum_window(),
            "initial_window must be at least 2 * max_datagram_size",
        )
    );
    setter!(
        with_loss_reduction_factor,
        loss_reduction_factor,
        f32,
        |this, value| check(
            value > 0.0 && value < 1.0,
            "loss_reduction_factor must be between 0 and 1",
        )
    );
    setter!(
        /// Sets the reordering threshold, in packets, before a packet is declared lost
        with_packet_threshold,
        packet_threshold,
        u64,
        |this, value| check(value >= 1, "packet_threshold must be at least 1")
    );
    setter!(
        /// Sets the reordering threshold, as an RTT multiplier
        with_time_threshold,
        time_threshold,
        f32,
        |this, value| check(value >= 1.0, "time_threshold must be at least 1")
    );
    setter!(
        with_granularity,
        granularity,
        Duration,
        |this, value| check(!value.is_zero(), "granularity must be non-zero")
    );
    setter!(
        /// Sets the RTT assumed before the first sample is taken
        with_initial_rtt,
        initial_rtt,
        Duration,
        |this, value| check(!value.is_zero(), "initial_rtt must be non-zero")
    );
    setter!(
        with_persistent_congestion_threshold,
        persistent_congestion_threshold,
        u32,
        |this, value| check(
            (1..32).contains(&value),
            "persistent_congestion_threshold must be between 1 and 31",
        )
    );
    setter!(
        with_cubic_c,
        cubic_c,
        f32,
        |this, value| check(value > 0.0, "cubic_c must be positive")
    );
    setter!(
        with_cubic_beta,
        cubic_beta,
        f32,
        |this, value| check(
            value > 0.0 && value < 1.0,
            "cubic_beta must be between 0 and 1",
        )
    );
    setter!(
        with_cubic_fast_convergence,
        cubic_fast_convergence,
        bool,
        |this, value| Ok::<(), ValidationError>(())
    );
    setter!(
        with_cubic_tcp_friendliness,
        cubic_tcp_friendliness,
        bool,
        |this, value| Ok::<(), ValidationError>(())
    );

    #[inline]
    pub fn max_datagram_size(&self) -> u16 {
        self.max_datagram_size
    }

    #[inline]
    pub fn initial_window(&self) -> u32 {
        self.initial_window
    }

    /// The smallest value the congestion window will be reduced to
    #[inline]
    pub fn minimum_window(&self) -> u32 {
        MINIMUM_WINDOW_PACKETS * self.max_datagram_size as u32
    }

    #[inline]
    pub fn loss_reduction_factor(&self) -> f32 {
        self.loss_reduction_factor
    }

    #[inline]
    pub fn packet_threshold(&self) -> u64 {
        self.packet_threshold
    }

    #[inline]
    pub fn time_threshold(&self) -> f32 {
        self.time_threshold
    }

    #[inline]
    pub fn granularity(&self) -> Duration {
        self.granularity
    }

    #[inline]
    pub fn initial_rtt(&self) -> Duration {
        self.initial_rtt
    }

    #[inline]
    pub fn persistent_congestion_threshold(&self) -> u32 {
        self.persistent_congestion_threshold
    }

    #[inline]
    pub fn cubic_c(&self) -> f32 {
        self.cubic_c
    }

    #[inline]
    pub fn cubic_beta(&self) -> f32 {
        self.cubic_beta
    }

    #[inline]
    pub fn cubic_fast_convergence(&self) -> bool {
        self.cubic_fast_convergence
    }

    #[inline]
    pub fn cubic_tcp_friendliness(&self) -> bool {
        self.cubic_tcp_friendliness
    }
}
