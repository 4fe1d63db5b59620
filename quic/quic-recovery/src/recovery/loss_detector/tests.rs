// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use super::*;
use crate::{
    packet::{EncryptionLevel, PacketType},
    testing::{init_tracing, Events, TestPacket},
};
use core::ops::RangeInclusive;

fn t0() -> Timestamp {
    Timestamp::from_duration(Duration::from_secs(1))
}

fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

fn numbered(mut packet: TestPacket, value: u64) -> TestPacket {
    let space = packet.packet_type.packet_number_space().unwrap();
    packet.packet_number = space.new_packet_number(value);
    packet.id = value;
    packet
}

fn ack(level: EncryptionLevel, range: RangeInclusive<u64>) -> Ack<RangeInclusive<u64>> {
    Ack {
        ack_delay: 0,
        encryption_level: level,
        ack_ranges: range,
    }
}

fn send_application(
    detector: &mut LossDetector<TestPacket>,
    events: &mut Events<TestPacket>,
    range: RangeInclusive<u64>,
    now: Timestamp,
) {
    for value in range {
        detector.on_packet_sent(numbered(TestPacket::application(1200), value), now, events);
    }
}

fn application_packet_numbers(detector: &LossDetector<TestPacket>) -> Vec<u64> {
    detector
        .sent_packets(PacketNumberSpace::ApplicationData)
        .iter()
        .map(|(packet_number, _)| packet_number.as_u64())
        .collect()
}

#[test]
fn packet_threshold_test() {
    init_tracing();
    let mut detector = LossDetector::new(&Settings::default());
    let mut events = Events::new();

    send_application(&mut detector, &mut events, 95..=100, t0());
    assert_eq!(events.sent.len(), 6);

    let now = t0() + ms(10);
    detector.on_ack_received(&ack(EncryptionLevel::OneRtt, 99..=100), now, &mut events);

    assert_eq!(events.acked_packet_numbers(), [99, 100]);
    // 100 - 3 = 97 and everything before it is lost
    assert_eq!(events.lost_packet_numbers(), [95, 96, 97]);
    assert_eq!(application_packet_numbers(&detector), [98]);
    assert_eq!(detector.ack_eliciting_outstanding(PacketNumberSpace::ApplicationData), 1);
    assert_eq!(
        detector.largest_acked(PacketNumberSpace::ApplicationData),
        PacketNumberSpace::ApplicationData.new_packet_number(100)
    );
}

#[test]
fn time_threshold_test() {
    let mut detector = LossDetector::new(&Settings::default());
    let mut events = Events::new();

    send_application(&mut detector, &mut events, 98..=100, t0());
    detector.on_ack_received(
        &ack(EncryptionLevel::OneRtt, 99..=100),
        t0() + ms(10),
        &mut events,
    );

    // 98 is within the packet threshold and only 10ms old
    assert!(events.lost.is_empty());

    // 9/8 * 10ms
    let loss_time = t0() + Duration::from_micros(11_250);
    assert_eq!(
        detector.loss_time(PacketNumberSpace::ApplicationData),
        Some(loss_time)
    );
    assert_eq!(
        detector.alarm_mode(),
        AlarmMode::TimeThreshold {
            space: PacketNumberSpace::ApplicationData,
            loss_time,
        }
    );
    assert_eq!(detector.next_expiration(), Some(loss_time));

    // firing early does nothing
    detector.on_timeout(loss_time - Duration::from_micros(1), &mut events);
    assert!(events.lost.is_empty());

    detector.on_timeout(loss_time, &mut events);
    assert_eq!(events.lost_packet_numbers(), [98]);
    assert_eq!(detector.loss_time(PacketNumberSpace::ApplicationData), None);
    assert_eq!(detector.alarm_mode(), AlarmMode::Idle);
    assert_eq!(detector.next_expiration(), None);
}

#[test]
fn duplicate_ack_test() {
    let mut detector = LossDetector::new(&Settings::default());
    let mut events = Events::new();

    send_application(&mut detector, &mut events, 0..=2, t0());
    detector.on_ack_received(&ack(EncryptionLevel::OneRtt, 0..=1), t0() + ms(10), &mut events);
    assert_eq!(events.acked_packet_numbers(), [0, 1]);

    let rtt = *detector.rtt_estimator();
    let expiration = detector.next_expiration().unwrap();
    detector.on_timeout(expiration, &mut events);
    assert_eq!(detector.pto_count(), 1);
    assert_eq!(events.retransmitted_packet_numbers(), [2]);

    // nothing new is acknowledged so the backoff is kept
    detector.on_ack_received(&ack(EncryptionLevel::OneRtt, 0..=1), expiration + ms(5), &mut events);
    assert_eq!(events.acked_packet_numbers(), [0, 1]);
    assert!(events.lost.is_empty());
    assert_eq!(detector.pto_count(), 1);
    assert_eq!(*detector.rtt_estimator(), rtt);

    // a packet handed back for retransmission can't be acknowledged any more
    detector.on_ack_received(&ack(EncryptionLevel::OneRtt, 2..=2), expiration + ms(6), &mut events);
    assert_eq!(events.acked_packet_numbers(), [0, 1]);
}

#[test]
fn untracked_packets_test() {
    let mut detector = LossDetector::new(&Settings::default());
    let mut events = Events::new();

    // no packet number space
    detector.on_packet_sent(TestPacket::new(PacketType::Retry, 100), t0(), &mut events);
    // no packet number
    detector.on_packet_sent(TestPacket::application(100), t0(), &mut events);
    // packet number from another space
    let mut mismatched = TestPacket::application(100);
    mismatched.packet_number = PacketNumberSpace::Initial.new_packet_number(0);
    detector.on_packet_sent(mismatched, t0(), &mut events);

    assert!(events.sent.is_empty());
    for space in PacketNumberSpace::ALL {
        assert!(detector.sent_packets(space).is_empty());
    }
    assert_eq!(detector.alarm_mode(), AlarmMode::Idle);
    assert_eq!(detector.next_expiration(), None);
}

#[test]
fn duplicate_packet_number_test() {
    let mut detector = LossDetector::new(&Settings::default());
    let mut events = Events::new();

    send_application(&mut detector, &mut events, 0..=0, t0());
    send_application(&mut detector, &mut events, 0..=0, t0() + ms(1));

    assert_eq!(events.sent.len(), 1);
    assert_eq!(detector.ack_eliciting_outstanding(PacketNumberSpace::ApplicationData), 1);
    assert_eq!(
        detector
            .sent_packets(PacketNumberSpace::ApplicationData)
            .iter()
            .next()
            .map(|(_, info)| info.time_sent),
        Some(t0())
    );
}

#[test]
fn not_in_flight_test() {
    let mut detector = LossDetector::new(&Settings::default());
    let mut events = Events::new();

    let packet = numbered(TestPacket::ack_only(PacketType::OneRtt, 50), 0);
    detector.on_packet_sent(packet, t0(), &mut events);

    assert_eq!(detector.sent_packets(PacketNumberSpace::ApplicationData).len(), 1);
    assert_eq!(detector.ack_eliciting_outstanding(PacketNumberSpace::ApplicationData), 0);
    assert!(events.sent.is_empty());
    assert_eq!(detector.alarm_mode(), AlarmMode::Idle);

    detector.on_ack_received(&ack(EncryptionLevel::OneRtt, 0..=0), t0() + ms(20), &mut events);
    assert!(events.acked.is_empty());
    assert!(detector.sent_packets(PacketNumberSpace::ApplicationData).is_empty());
    // non-eliciting packets still produce rtt samples
    assert_eq!(detector.rtt_estimator().latest_rtt(), ms(20));
}

#[test]
fn alarm_mode_priority_test() {
    let mut detector = LossDetector::new(&Settings::default());
    let mut events = Events::new();
    assert_eq!(detector.alarm_mode(), AlarmMode::Idle);

    for value in 0..=1 {
        detector.on_packet_sent(numbered(TestPacket::initial(1200), value), t0(), &mut events);
    }
    assert_eq!(detector.alarm_mode(), AlarmMode::CryptoRetransmission);

    detector.on_ack_received(&ack(EncryptionLevel::Initial, 1..=1), t0() + ms(10), &mut events);

    // packet 0 still carries crypto data but the time threshold wins
    assert_eq!(detector.crypto_outstanding(PacketNumberSpace::Initial), 1);
    let loss_time = t0() + Duration::from_micros(11_250);
    assert_eq!(
        detector.alarm_mode(),
        AlarmMode::TimeThreshold {
            space: PacketNumberSpace::Initial,
            loss_time,
        }
    );

    detector.on_timeout(loss_time, &mut events);
    assert_eq!(events.lost_packet_numbers(), [0]);
    assert_eq!(detector.alarm_mode(), AlarmMode::Idle);

    detector.on_packet_sent(
        numbered(TestPacket::application(1200), 0),
        loss_time,
        &mut events,
    );
    assert_eq!(detector.alarm_mode(), AlarmMode::Probe);

    detector.on_packet_sent(numbered(TestPacket::handshake(1200), 0), loss_time, &mut events);
    assert_eq!(detector.alarm_mode(), AlarmMode::CryptoRetransmission);
}

#[test]
fn pto_backoff_test() {
    let mut detector = LossDetector::new(&Settings::default());
    let mut events = Events::new();

    // establish a 50ms rtt with 25ms of variance
    send_application(&mut detector, &mut events, 0..=0, t0());
    let t1 = t0() + ms(50);
    detector.on_ack_received(&ack(EncryptionLevel::OneRtt, 0..=0), t1, &mut events);
    assert_eq!(detector.alarm_mode(), AlarmMode::Idle);

    send_application(&mut detector, &mut events, 1..=6, t1);
    assert_eq!(detector.alarm_mode(), AlarmMode::Probe);
    assert_eq!(detector.alarm_duration(), Some(ms(150)));
    assert_eq!(detector.next_expiration(), Some(t1 + ms(150)));

    detector.on_timeout(t1 + ms(150), &mut events);
    assert_eq!(detector.pto_count(), 1);
    assert_eq!(detector.alarm_duration(), Some(ms(300)));
    assert_eq!(detector.next_expiration(), Some(t1 + ms(300)));

    detector.on_timeout(t1 + ms(300), &mut events);
    assert_eq!(detector.pto_count(), 2);
    assert_eq!(detector.alarm_duration(), Some(ms(600)));

    // each probe hands back at most two packets, oldest first
    assert_eq!(events.retransmitted_packet_numbers(), [1, 2, 3, 4]);
    assert_eq!(application_packet_numbers(&detector), [5, 6]);

    detector.on_ack_received(&ack(EncryptionLevel::OneRtt, 5..=5), t1 + ms(400), &mut events);
    assert_eq!(detector.pto_count(), 0);
    assert_eq!(
        detector.alarm_duration(),
        Some(detector.rtt_estimator().pto_period(0))
    );
    assert_eq!(application_packet_numbers(&detector), [6]);
}

#[test]
fn crypto_retransmission_test() {
    let mut detector = LossDetector::new(&Settings::default());
    let mut events = Events::new();

    detector.on_packet_sent(numbered(TestPacket::initial(1200), 0), t0(), &mut events);
    detector.on_packet_sent(numbered(TestPacket::handshake(1200), 0), t0(), &mut events);
    detector.on_packet_sent(numbered(TestPacket::application(1200), 0), t0(), &mut events);

    assert_eq!(detector.alarm_mode(), AlarmMode::CryptoRetransmission);
    // 2 * 333ms without an rtt sample
    assert_eq!(detector.alarm_duration(), Some(ms(666)));

    detector.on_timeout(t0() + ms(666), &mut events);
    assert_eq!(detector.crypto_count(), 1);

    let spaces: Vec<_> = events
        .retransmitted
        .iter()
        .map(|(packet_number, _)| packet_number.space())
        .collect();
    assert_eq!(
        spaces,
        [PacketNumberSpace::Initial, PacketNumberSpace::Handshake]
    );
    assert_eq!(detector.crypto_outstanding(PacketNumberSpace::Initial), 0);
    assert_eq!(detector.crypto_outstanding(PacketNumberSpace::Handshake), 0);

    // only the application data remains, so the probe timeout takes over
    assert_eq!(detector.alarm_mode(), AlarmMode::Probe);
    // 333ms + 4 * 166.5ms
    assert_eq!(detector.alarm_duration(), Some(ms(999)));
}

#[test]
fn probe_order_test() {
    let mut detector = LossDetector::new(&Settings::default());
    let mut events = Events::new();

    send_application(&mut detector, &mut events, 0..=1, t0());
    detector.on_packet_sent(
        numbered(TestPacket::new(PacketType::Handshake, 1200), 0),
        t0(),
        &mut events,
    );
    assert_eq!(detector.alarm_mode(), AlarmMode::Probe);

    let expiration = detector.next_expiration().unwrap();
    detector.on_timeout(expiration, &mut events);

    let probes: Vec<_> = events
        .retransmitted
        .iter()
        .map(|(packet_number, _)| (packet_number.space(), packet_number.as_u64()))
        .collect();
    assert_eq!(
        probes,
        [
            (PacketNumberSpace::Handshake, 0),
            (PacketNumberSpace::ApplicationData, 0)
        ]
    );
    assert_eq!(application_packet_numbers(&detector), [1]);
}

#[test]
fn probes_skip_packets_not_in_flight_test() {
    let mut detector = LossDetector::new(&Settings::default());
    let mut events = Events::new();

    let mut untracked = numbered(TestPacket::initial(1200).with_crypto(false), 0);
    untracked.in_flight = false;
    detector.on_packet_sent(untracked, t0(), &mut events);
    send_application(&mut detector, &mut events, 0..=2, t0());
    assert_eq!(detector.alarm_mode(), AlarmMode::Probe);

    let expiration = detector.next_expiration().unwrap();
    detector.on_timeout(expiration, &mut events);

    // both probes go to packets the outstanding counter knows about
    let probes: Vec<_> = events
        .retransmitted
        .iter()
        .map(|(packet_number, info)| {
            (
                packet_number.space(),
                packet_number.as_u64(),
                info.in_flight,
            )
        })
        .collect();
    assert_eq!(
        probes,
        [
            (PacketNumberSpace::ApplicationData, 0, true),
            (PacketNumberSpace::ApplicationData, 1, true)
        ]
    );
    assert_eq!(application_packet_numbers(&detector), [2]);
    assert_eq!(detector.ack_eliciting_outstanding(PacketNumberSpace::ApplicationData), 1);
    assert_eq!(detector.sent_packets(PacketNumberSpace::Initial).len(), 1);
}

#[test]
fn overlapping_ack_ranges_test() {
    init_tracing();
    let mut detector = LossDetector::new(&Settings::default());
    let mut events = Events::new();

    send_application(&mut detector, &mut events, 1..=7, t0());

    let ranges = [3..=7, 1..=5];
    let frame = Ack {
        ack_delay: 0,
        encryption_level: EncryptionLevel::OneRtt,
        ack_ranges: &ranges[..],
    };
    detector.on_ack_received(&frame, t0() + ms(10), &mut events);

    // each packet is acked once, in packet number order
    assert_eq!(events.acked_packet_numbers(), [1, 2, 3, 4, 5, 6, 7]);
    assert!(events.lost_packet_numbers().is_empty());
    assert!(application_packet_numbers(&detector).is_empty());
    assert_eq!(detector.ack_eliciting_outstanding(PacketNumberSpace::ApplicationData), 0);
    assert_eq!(detector.alarm_mode(), AlarmMode::Idle);
}

#[test]
fn reset_test() {
    let mut detector = LossDetector::new(&Settings::default());
    let mut events = Events::new();

    send_application(&mut detector, &mut events, 0..=0, t0());
    detector.on_ack_received(&ack(EncryptionLevel::OneRtt, 0..=0), t0() + ms(50), &mut events);
    let rtt = *detector.rtt_estimator();

    detector.on_packet_sent(numbered(TestPacket::initial(1200), 0), t0(), &mut events);
    send_application(&mut detector, &mut events, 1..=2, t0() + ms(50));
    assert!(detector.next_expiration().is_some());

    detector.reset(&mut events);

    assert_eq!(events.discarded.len(), 3);
    for space in PacketNumberSpace::ALL {
        assert!(detector.sent_packets(space).is_empty());
        assert_eq!(detector.largest_acked(space), None);
        assert_eq!(detector.ack_eliciting_outstanding(space), 0);
    }
    assert_eq!(detector.next_expiration(), None);
    assert_eq!(detector.alarm_mode(), AlarmMode::Idle);
    assert_eq!(*detector.rtt_estimator(), rtt);
}

#[test]
fn outstanding_counters_test() {
    bolero::check!()
        .with_type::<Vec<(bool, u8)>>()
        .for_each(|ops| {
            let mut detector = LossDetector::new(&Settings::default());
            let mut next = 0;
            let mut now = t0();

            for (send, count) in ops.iter().copied() {
                now += ms(1);
                if send {
                    for _ in 0..count % 8 {
                        detector.on_packet_sent(
                            numbered(TestPacket::application(1200), next),
                            now,
                            &mut (),
                        );
                        next += 1;
                    }
                } else if next > 0 {
                    let largest = count as u64 % next;
                    detector.on_ack_received(
                        &ack(EncryptionLevel::OneRtt, largest.saturating_sub(2)..=largest),
                        now,
                        &mut (),
                    );
                }

                let tracked = detector
                    .sent_packets(PacketNumberSpace::ApplicationData)
                    .len() as u32;
                assert_eq!(
                    detector.ack_eliciting_outstanding(PacketNumberSpace::ApplicationData),
                    tracked
                );
                assert_eq!(tracked == 0, detector.alarm_mode() == AlarmMode::Idle);
            }
        });
}
