// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

pub mod congestion_controller;
pub mod cubic;
pub mod event;
pub mod loss_detector;
pub mod manager;
pub mod persistent_congestion;
pub mod reno;
mod rtt_estimator;
pub mod sender;
mod sent_packets;
mod settings;

pub use congestion_controller::{CongestionController, WindowGrowth};
pub use cubic::Cubic;
pub use loss_detector::{AlarmMode, LossDetector};
pub use manager::Manager;
pub use reno::Reno;
pub use rtt_estimator::RttEstimator;
pub use sent_packets::{SentPacketInfo, SentPackets};
pub use settings::*;
