// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

pub mod ack;
pub mod ack_elicitation;

pub use ack::{Ack, AckRanges};
