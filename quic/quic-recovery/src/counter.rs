// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use core::{fmt, ops};
use num_traits::{Bounded, CheckedAdd, CheckedSub, Zero};

/// A non-negative counter that clamps instead of wrapping.
///
/// Overflow and underflow indicate an accounting defect in the caller, so both are
/// logged at error level and trip a debug assertion. In release builds the value
/// saturates at the nearest bound.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Counter<T>(T);

impl<T: fmt::Debug> fmt::Debug for Counter<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl<T> Counter<T> {
    #[inline]
    pub const fn new(value: T) -> Self {
        Self(value)
    }
}

impl<T> Counter<T>
where
    T: Copy + fmt::Debug + Bounded + Zero + CheckedAdd + CheckedSub,
{
    /// Sets the counter back to zero
    #[inline]
    pub fn reset(&mut self) {
        self.0 = T::zero();
    }

    #[inline]
    fn saturating_add(&mut self, rhs: T) {
        self.0 = match self.0.checked_add(&rhs) {
            Some(value) => value,
            None => {
                tracing::error!(value = ?self.0, rhs = ?rhs, "counter overflow");
                debug_assert!(false, "counter overflow: {:?} + {:?}", self.0, rhs);
                T::max_value()
            }
        };
    }

    #[inline]
    fn saturating_sub(&mut self, rhs: T) {
        self.0 = match self.0.checked_sub(&rhs) {
            Some(value) => value,
            None => {
                tracing::error!(value = ?self.0, rhs = ?rhs, "counter underflow");
                debug_assert!(false, "counter underflow: {:?} - {:?}", self.0, rhs);
                T::zero()
            }
        };
    }
}

impl<T> ops::Deref for Counter<T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> ops::AddAssign<T> for Counter<T>
where
    T: Copy + fmt::Debug + Bounded + Zero + CheckedAdd + CheckedSub,
{
    #[inline]
    fn add_assign(&mut self, rhs: T) {
        self.saturating_add(rhs);
    }
}

impl<T> ops::SubAssign<T> for Counter<T>
where
    T: Copy + fmt::Debug + Bounded + Zero + CheckedAdd + CheckedSub,
{
    #[inline]
    fn sub_assign(&mut self, rhs: T) {
        self.saturating_sub(rhs);
    }
}
