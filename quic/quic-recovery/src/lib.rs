// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(any(test, feature = "std")), no_std)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[macro_use]
mod macros;

pub mod counter;
pub mod frame;
pub mod packet;
#[cfg(feature = "alloc")]
pub mod recovery;
pub mod time;
pub mod transmission;
pub mod transport;

#[cfg(any(test, feature = "testing"))]
pub mod testing;
