// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

pub mod number;

mod packet_type;
pub use packet_type::{EncryptionLevel, PacketType};
