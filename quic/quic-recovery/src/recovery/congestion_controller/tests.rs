// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use super::*;
use crate::{
    frame::{ack_elicitation::AckElicitation, Ack},
    packet::EncryptionLevel,
    recovery::Reno,
    testing::TestPacket,
    transport::AckSettings,
};
use bolero::{check, generator::*};
use core::time::Duration;

fn t(millis: u64) -> Timestamp {
    Timestamp::from_duration(Duration::from_secs(1) + Duration::from_millis(millis))
}

fn sent(size: u16, millis: u64) -> SentPacketInfo<TestPacket> {
    SentPacketInfo::new(TestPacket::application(size), t(millis))
}

fn controller(settings: &Settings) -> CongestionController<Reno> {
    CongestionController::new(settings, Reno::new(settings))
}

fn rtt_sample(settings: &Settings, millis: u64) -> RttEstimator {
    let mut rtt = RttEstimator::new(settings);
    let frame = Ack {
        ack_delay: 0,
        encryption_level: EncryptionLevel::OneRtt,
        ack_ranges: 0..=0,
    };
    rtt.update_rtt(
        &frame,
        AckSettings::default(),
        t(0),
        AckElicitation::Eliciting,
        t(millis),
    );
    rtt
}

#[test]
fn slow_start_test() {
    let settings = Settings::default();
    let rtt = RttEstimator::new(&settings);
    let mut cc = controller(&settings);
    assert_eq!(cc.congestion_window(), 14720);
    assert_eq!(cc.state(), State::SlowStart);

    let packets = [sent(1200, 0), sent(1200, 0), sent(1200, 0)];
    for info in &packets {
        cc.on_packet_sent(info);
    }
    assert_eq!(cc.bytes_in_flight(), 3600);

    for info in &packets {
        cc.on_packet_acked(info, &rtt, t(50));
    }

    assert_eq!(cc.congestion_window(), 14720 + 3600);
    assert_eq!(cc.bytes_in_flight(), 0);
}

#[test]
fn loss_reduces_window_test() {
    let settings = Settings::default().with_initial_window(20_000).unwrap();
    let rtt = RttEstimator::new(&settings);
    let mut cc = controller(&settings);

    let packets = [sent(1200, 0), sent(1200, 1), sent(1200, 2)];
    for info in &packets {
        cc.on_packet_sent(info);
    }

    cc.on_packets_lost([&packets[0]], &rtt, t(10));
    assert_eq!(cc.congestion_window(), 10_000);
    assert_eq!(cc.slow_start_threshold(), 10_000);
    assert_eq!(cc.bytes_in_flight(), 2400);
    assert_eq!(cc.state(), State::Recovery);

    // packets sent before the epoch started don't reduce the window again
    cc.on_packets_lost([&packets[1]], &rtt, t(20));
    assert_eq!(cc.congestion_window(), 10_000);
    assert_eq!(cc.bytes_in_flight(), 1200);

    // nor do they grow it
    cc.on_packet_acked(&packets[2], &rtt, t(30));
    assert_eq!(cc.congestion_window(), 10_000);
    assert!(cc.is_in_recovery());
}

#[test]
fn recovery_exit_test() {
    let settings = Settings::default().with_initial_window(20_000).unwrap();
    let rtt = RttEstimator::new(&settings);
    let mut cc = controller(&settings);

    let lost = sent(1200, 0);
    cc.on_packet_sent(&lost);
    cc.on_packets_lost([&lost], &rtt, t(10));
    assert!(cc.is_in_recovery());

    let after = sent(1200, 11);
    cc.on_packet_sent(&after);
    cc.on_packet_acked(&after, &rtt, t(60));

    assert!(!cc.is_in_recovery());
    assert!(!cc.is_in_slow_start());
    assert_eq!(cc.state(), State::CongestionAvoidance);
    // 1200 * 1200 / 10000
    assert_eq!(cc.congestion_window(), 10_144);

    // a later loss starts a new epoch
    let next = sent(1200, 61);
    cc.on_packet_sent(&next);
    cc.on_packets_lost([&next], &rtt, t(70));
    assert_eq!(cc.congestion_window(), 5072);
}

#[test]
fn minimum_window_test() {
    let settings = Settings::default();
    let rtt = RttEstimator::new(&settings);
    let mut cc = controller(&settings);

    for epoch in 0..10 {
        let lost = sent(1200, epoch * 10);
        cc.on_packet_sent(&lost);
        cc.on_packets_lost([&lost], &rtt, t(epoch * 10 + 5));
        assert!(cc.congestion_window() >= 2400);
    }

    assert_eq!(cc.congestion_window(), 2400);
}

#[test]
fn persistent_congestion_test() {
    let settings = Settings::default();
    // 50 + 4 * 25, doubled
    let rtt = rtt_sample(&settings, 50);
    let mut cc = controller(&settings);

    let first = sent(1200, 100);
    let last = sent(1200, 400);
    cc.on_packet_sent(&first);
    cc.on_packet_sent(&last);

    cc.on_packets_lost([&first, &last], &rtt, t(500));
    assert_eq!(cc.congestion_window(), cc.minimum_window());
    assert_eq!(cc.bytes_in_flight(), 0);
}

#[test]
fn short_loss_burst_test() {
    let settings = Settings::default();
    let rtt = rtt_sample(&settings, 50);
    let mut cc = controller(&settings);

    let first = sent(1200, 100);
    let last = sent(1200, 399);
    cc.on_packet_sent(&first);
    cc.on_packet_sent(&last);

    cc.on_packets_lost([&first, &last], &rtt, t(500));
    assert_eq!(cc.congestion_window(), 7360);
}

#[test]
fn explicit_congestion_test() {
    let settings = Settings::default();
    let mut cc = controller(&settings);

    let info = sent(1200, 0);
    cc.on_packet_sent(&info);
    cc.on_explicit_congestion(info.time_sent, t(10));

    assert_eq!(cc.congestion_window(), 7360);
    assert_eq!(cc.bytes_in_flight(), 1200);
    assert!(cc.is_in_recovery());
}

#[test]
fn not_in_flight_test() {
    let settings = Settings::default();
    let rtt = RttEstimator::new(&settings);
    let mut cc = controller(&settings);

    let mut info = sent(1200, 0);
    info.in_flight = false;

    cc.on_packet_sent(&info);
    assert_eq!(cc.bytes_in_flight(), 0);

    cc.on_packets_lost([&info], &rtt, t(10));
    assert_eq!(cc.congestion_window(), 14720);
    assert!(!cc.is_in_recovery());
}

#[test]
fn discard_and_reset_test() {
    let settings = Settings::default();
    let rtt = RttEstimator::new(&settings);
    let mut cc = controller(&settings);

    let packets = [sent(1000, 0), sent(1000, 0)];
    for info in &packets {
        cc.on_packet_sent(info);
    }

    cc.on_packet_discarded(&packets[0]);
    assert_eq!(cc.bytes_in_flight(), 1000);

    cc.on_packets_lost([&packets[1]], &rtt, t(5));
    assert_eq!(cc.bytes_in_flight(), 0);

    cc.reset();
    assert_eq!(cc.congestion_window(), 14720);
    assert_eq!(cc.slow_start_threshold(), u32::MAX);
    assert_eq!(cc.state(), State::SlowStart);
}

#[test]
fn gate_test() {
    let settings = Settings::default();
    let mut cc = controller(&settings);

    let mut in_flight = 0;
    while !cc.is_congestion_limited() {
        cc.on_packet_sent(&sent(1200, 0));
        in_flight += 1200;
    }

    // the last packet may overshoot the window
    assert_eq!(in_flight, 15600);
    assert_eq!(cc.bytes_in_flight(), 15600);
}

#[derive(Clone, Copy, Debug, TypeGenerator)]
enum Operation {
    Send { size: u16 },
    Ack { index: u16 },
    Lose { index: u16, count: u8 },
    Discard { index: u16 },
    Congestion,
    Advance { millis: u8 },
}

#[test]
fn conservation_test() {
    check!()
        .with_type::<Vec<Operation>>()
        .for_each(|operations| {
            let settings = Settings::default();
            let rtt = rtt_sample(&settings, 20);
            let mut cc = controller(&settings);
            let mut outstanding: Vec<SentPacketInfo<TestPacket>> = Vec::new();
            let mut millis = 0;

            for operation in operations.iter().copied() {
                let now = t(millis);
                match operation {
                    Operation::Send { size } => {
                        let info = sent(size % 1500, millis);
                        cc.on_packet_sent(&info);
                        outstanding.push(info);
                    }
                    Operation::Ack { index } if !outstanding.is_empty() => {
                        let info = outstanding.remove(index as usize % outstanding.len());
                        cc.on_packet_acked(&info, &rtt, now);
                    }
                    Operation::Lose { index, count } if !outstanding.is_empty() => {
                        let start = index as usize % outstanding.len();
                        let end = (start + count as usize).min(outstanding.len());
                        let lost: Vec<_> = outstanding.drain(start..end).collect();
                        cc.on_packets_lost(&lost, &rtt, now);
                    }
                    Operation::Discard { index } if !outstanding.is_empty() => {
                        let info = outstanding.remove(index as usize % outstanding.len());
                        cc.on_packet_discarded(&info);
                    }
                    Operation::Congestion => {
                        cc.on_explicit_congestion(now, now);
                    }
                    Operation::Advance { millis: delta } => {
                        millis += delta as u64;
                    }
                    _ => {}
                }

                let expected: u32 = outstanding.iter().map(|info| info.sent_bytes as u32).sum();
                assert_eq!(cc.bytes_in_flight(), expected);
                assert!(cc.congestion_window() >= cc.minimum_window());
            }
        });
}
