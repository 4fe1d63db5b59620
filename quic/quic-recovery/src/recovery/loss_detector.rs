// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use crate::{
    counter::Counter,
    frame::{Ack, AckRanges},
    packet::number::{PacketNumber, PacketNumberSpace, SpaceMap},
    recovery::{
        event::{LostPacket, Subscriber},
        RttEstimator, SentPacketInfo, SentPackets, Settings,
    },
    time::{Timer, Timestamp},
    transmission::Packet,
    transport::AckSettings,
};
use alloc::vec::Vec;
use core::time::Duration;

#[cfg(test)]
mod tests;

/// The number of ack-eliciting packets sent when the probe timeout expires
//= https://www.rfc-editor.org/rfc/rfc9002#section-6.2.4
//# When a PTO timer expires, a sender MUST send at least one ack-
//# eliciting packet in the packet number space as a probe.  An endpoint
//# MAY send up to two full-sized datagrams containing ack-eliciting
//# packets
const PROBE_PACKETS: usize = 2;

/// The action the loss detection alarm performs when it fires.
///
/// The mode is derived from the current state every time it is needed; it is
/// never stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlarmMode {
    /// No ack-eliciting packets are outstanding
    Idle,
    /// A packet in the space will cross the time threshold at the given time
    TimeThreshold {
        space: PacketNumberSpace,
        loss_time: Timestamp,
    },
    /// Handshake data is outstanding
    CryptoRetransmission,
    /// Probe timeout
    Probe,
}

#[derive(Debug)]
struct Space<P> {
    sent_packets: SentPackets<P>,
    largest_acked: Option<PacketNumber>,
    //= https://www.rfc-editor.org/rfc/rfc9002#appendix-A.3
    //# loss_time[kPacketNumberSpace]:  The time at which the next packet in
    //#    that packet number space can be considered lost based on exceeding
    //#    the reordering window in time.
    loss_time: Option<Timestamp>,
    ack_eliciting_outstanding: Counter<u32>,
    crypto_outstanding: Counter<u32>,
}

impl<P> Space<P> {
    fn new(space: PacketNumberSpace) -> Self {
        Self {
            sent_packets: SentPackets::new(space),
            largest_acked: None,
            loss_time: None,
            ack_eliciting_outstanding: Counter::default(),
            crypto_outstanding: Counter::default(),
        }
    }

    /// Removes a record and releases it from the outstanding counters
    fn remove(&mut self, packet_number: PacketNumber) -> Option<SentPacketInfo<P>> {
        let info = self.sent_packets.remove(packet_number)?;

        if info.is_outstanding_ack_eliciting() {
            self.ack_eliciting_outstanding -= 1;
        }
        if info.is_outstanding_crypto() {
            self.crypto_outstanding -= 1;
        }

        Some(info)
    }
}

/// Tracks sent packets in every packet number space and decides when they are lost
/// or need to be retransmitted.
///
/// A single alarm covers all spaces. The owner reads [`Self::next_expiration`] and
/// calls [`Self::on_timeout`] once it is reached.
#[derive(Debug)]
pub struct LossDetector<P> {
    spaces: SpaceMap<Space<P>>,
    rtt_estimator: RttEstimator,
    ack_settings: AckSettings,
    packet_threshold: u64,
    time_threshold: f32,
    //= https://www.rfc-editor.org/rfc/rfc9002#appendix-A.3
    //# pto_count:  The number of times a PTO has been sent without receiving
    //#    an acknowledgment.
    pto_count: u32,
    crypto_count: u32,
    time_of_last_ack_eliciting_packet: Option<Timestamp>,
    time_of_last_crypto_packet: Option<Timestamp>,
    timer: Timer,
    alarm_duration: Option<Duration>,
}

impl<P: Packet> LossDetector<P> {
    pub fn new(settings: &Settings) -> Self {
        Self {
            spaces: SpaceMap::new(Space::new),
            rtt_estimator: RttEstimator::new(settings),
            ack_settings: AckSettings::default(),
            packet_threshold: settings.packet_threshold(),
            time_threshold: settings.time_threshold(),
            pto_count: 0,
            crypto_count: 0,
            time_of_last_ack_eliciting_packet: None,
            time_of_last_crypto_packet: None,
            timer: Timer::default(),
            alarm_duration: None,
        }
    }

    /// Applies the ack delay exponent from the peer's transport parameters
    #[inline]
    pub fn on_ack_settings(&mut self, ack_settings: AckSettings) {
        self.ack_settings = ack_settings;
    }

    /// Starts tracking a packet that was just sent.
    ///
    /// The packet number must already be assigned. Packets without a packet number
    /// space (Version Negotiation and Retry) are not tracked.
    pub fn on_packet_sent<S: Subscriber<P>>(
        &mut self,
        packet: P,
        now: Timestamp,
        subscriber: &mut S,
    ) {
        let packet_type = packet.packet_type();
        let Some(space) = packet_type.packet_number_space() else {
            tracing::trace!(?packet_type, "packet type has no packet number space");
            return;
        };

        let Some(packet_number) = packet.packet_number() else {
            tracing::error!(?packet_type, "sent packet has no packet number");
            return;
        };

        if packet_number.space() != space {
            tracing::error!(
                ?packet_type,
                packet_number = ?packet_number,
                "packet number does not belong to the packet type's space"
            );
            return;
        }

        let info = SentPacketInfo::new(packet, now);
        let in_flight = info.in_flight;
        let ack_eliciting = info.is_outstanding_ack_eliciting();
        let crypto = info.is_outstanding_crypto();

        let state = &mut self.spaces[space];
        if state.sent_packets.insert(packet_number, info).is_err() {
            return;
        }

        tracing::trace!(
            space = ?space,
            packet_number = %packet_number,
            in_flight,
            ack_eliciting,
            crypto,
            "packet sent"
        );

        ensure!(in_flight);

        if ack_eliciting {
            state.ack_eliciting_outstanding += 1;
            self.time_of_last_ack_eliciting_packet = Some(now);
        }
        if crypto {
            state.crypto_outstanding += 1;
            self.time_of_last_crypto_packet = Some(now);
        }

        if let Some(info) = self.spaces[space].sent_packets.get(packet_number) {
            subscriber.on_packet_sent(packet_number, info);
        }

        self.set_loss_detection_alarm(now);
    }

    /// Processes a received ACK frame
    pub fn on_ack_received<A: AckRanges, S: Subscriber<P>>(
        &mut self,
        frame: &Ack<A>,
        now: Timestamp,
        subscriber: &mut S,
    ) {
        let space = frame.packet_number_space();

        let Some(largest_acknowledged) = frame
            .largest_acknowledged()
            .and_then(|value| space.new_packet_number(value))
        else {
            tracing::debug!(space = ?space, "ack frame has no valid ranges");
            return;
        };

        let state = &mut self.spaces[space];
        state.largest_acked = Some(
            state
                .largest_acked
                .map_or(largest_acknowledged, |largest| largest.max(largest_acknowledged)),
        );

        //= https://www.rfc-editor.org/rfc/rfc9002#section-5.1
        //# To avoid generating multiple RTT samples for a single packet, an ACK
        //# frame SHOULD NOT be used to update RTT estimates if it does not newly
        //# acknowledge the largest acknowledged packet.
        if let Some(info) = state.sent_packets.get(largest_acknowledged) {
            let time_sent = info.time_sent;
            let ack_elicitation = info.ack_elicitation;
            self.rtt_estimator
                .update_rtt(frame, self.ack_settings, time_sent, ack_elicitation, now);
        }

        let mut newly_acked = Vec::new();
        for range in frame.ack_ranges() {
            let (start, end) = range.into_inner();
            let Some(start) = space.new_packet_number(start) else {
                continue;
            };
            let end = end.min(PacketNumber::MAX_VALUE);
            let Some(end) = space.new_packet_number(end) else {
                continue;
            };
            if start > end {
                continue;
            }

            newly_acked.extend(
                self.spaces[space]
                    .sent_packets
                    .range(start..=end)
                    .map(|(packet_number, _)| *packet_number),
            );
        }

        // overlapping ranges would otherwise ack the same packet twice
        newly_acked.sort_unstable();
        newly_acked.dedup();

        for packet_number in newly_acked.iter().copied() {
            self.on_sent_packet_acked(packet_number, now, subscriber);
        }

        self.detect_lost_packets(space, now, subscriber);

        // a duplicate or stale ack does not say anything about the path
        if !newly_acked.is_empty() {
            self.crypto_count = 0;
            self.pto_count = 0;
        }

        self.set_loss_detection_alarm(now);
    }

    fn on_sent_packet_acked<S: Subscriber<P>>(
        &mut self,
        packet_number: PacketNumber,
        now: Timestamp,
        subscriber: &mut S,
    ) {
        let Some(info) = self.spaces[packet_number.space()].remove(packet_number) else {
            return;
        };

        tracing::trace!(
            space = ?packet_number.space(),
            packet_number = %packet_number,
            "packet acked"
        );

        if info.in_flight {
            subscriber.on_packet_acked(packet_number, info, &self.rtt_estimator, now);
        }
    }

    //= https://www.rfc-editor.org/rfc/rfc9002#section-6.1
    //# A packet is declared lost if it meets all of the following
    //# conditions:
    //#
    //# *  The packet is unacknowledged, in flight, and was sent prior to an
    //#    acknowledged packet.
    //#
    //# *  The packet was sent kPacketThreshold packets before an
    //#    acknowledged packet (Section 6.1.1), or it was sent long enough in
    //#    the past (Section 6.1.2).

    /// Declares packets in `space` lost based on the packet and time thresholds
    pub fn detect_lost_packets<S: Subscriber<P>>(
        &mut self,
        space: PacketNumberSpace,
        now: Timestamp,
        subscriber: &mut S,
    ) {
        let state = &mut self.spaces[space];
        state.loss_time = None;

        let Some(largest_acked) = state.largest_acked else {
            return;
        };

        let loss_delay = self.rtt_estimator.loss_delay(self.time_threshold);
        let lost_send_time = now.checked_sub(loss_delay);
        let lost_packet_number = largest_acked.checked_sub(self.packet_threshold);

        let mut lost_packet_numbers = Vec::new();
        let mut loss_time: Option<Timestamp> = None;

        for (packet_number, info) in state.sent_packets.range(..=largest_acked) {
            let time_lost = lost_send_time.is_some_and(|cutoff| info.time_sent <= cutoff);
            let reordered_lost = lost_packet_number.is_some_and(|cutoff| *packet_number <= cutoff);

            if time_lost || reordered_lost {
                lost_packet_numbers.push(*packet_number);
            } else {
                let packet_loss_time = info.time_sent + loss_delay;
                loss_time = Some(loss_time.map_or(packet_loss_time, |t| t.min(packet_loss_time)));
            }
        }

        state.loss_time = loss_time;

        let mut lost: Vec<LostPacket<P>> = Vec::new();
        for packet_number in lost_packet_numbers {
            if let Some(info) = state.remove(packet_number) {
                if info.in_flight {
                    lost.push((packet_number, info));
                }
            }
        }

        ensure!(!lost.is_empty());

        tracing::debug!(
            space = ?space,
            count = lost.len(),
            largest_acked = %largest_acked,
            "packets lost"
        );

        subscriber.on_packets_lost(lost, &self.rtt_estimator, now);
    }

    /// Returns the action the alarm would take if it fired now
    pub fn alarm_mode(&self) -> AlarmMode {
        let outstanding = self
            .spaces
            .iter()
            .any(|(_, state)| *state.ack_eliciting_outstanding > 0);

        if !outstanding {
            return AlarmMode::Idle;
        }

        // the first space wins ties so the order is deterministic
        let mut earliest: Option<(PacketNumberSpace, Timestamp)> = None;
        for (space, state) in self.spaces.iter() {
            if let Some(loss_time) = state.loss_time {
                if earliest.map_or(true, |(_, earliest)| loss_time < earliest) {
                    earliest = Some((space, loss_time));
                }
            }
        }

        if let Some((space, loss_time)) = earliest {
            return AlarmMode::TimeThreshold { space, loss_time };
        }

        let crypto_outstanding = self
            .spaces
            .iter()
            .any(|(_, state)| *state.crypto_outstanding > 0);

        if crypto_outstanding {
            AlarmMode::CryptoRetransmission
        } else {
            AlarmMode::Probe
        }
    }

    /// Arms the single loss detection alarm according to the current mode
    pub fn set_loss_detection_alarm(&mut self, now: Timestamp) {
        let last_ack_eliciting = self.time_of_last_ack_eliciting_packet.unwrap_or(now);

        let (base, duration) = match self.alarm_mode() {
            AlarmMode::Idle => {
                self.timer.cancel();
                self.alarm_duration = None;
                return;
            }
            AlarmMode::TimeThreshold { loss_time, .. } => (
                last_ack_eliciting,
                loss_time.saturating_duration_since(last_ack_eliciting),
            ),
            AlarmMode::CryptoRetransmission => (
                self.time_of_last_crypto_packet.unwrap_or(now),
                self.rtt_estimator
                    .crypto_retransmission_period(self.crypto_count),
            ),
            AlarmMode::Probe => (
                last_ack_eliciting,
                self.rtt_estimator.pto_period(self.pto_count),
            ),
        };

        self.timer.set(base + duration);
        self.alarm_duration = Some(duration);
    }

    /// Runs the alarm if it has expired
    pub fn on_timeout<S: Subscriber<P>>(&mut self, now: Timestamp, subscriber: &mut S) {
        ensure!(self.timer.poll_expiration(now).is_ready());

        let mode = self.alarm_mode();
        tracing::debug!(?mode, "loss detection alarm fired");

        match mode {
            AlarmMode::Idle => {}
            AlarmMode::TimeThreshold { space, .. } => {
                self.detect_lost_packets(space, now, subscriber);
            }
            AlarmMode::CryptoRetransmission => {
                self.retransmit_crypto_packets(now, subscriber);
                self.crypto_count = self.crypto_count.saturating_add(1);
            }
            AlarmMode::Probe => {
                self.send_probe_packets(now, subscriber);
                self.pto_count = self.pto_count.saturating_add(1);
            }
        }

        self.set_loss_detection_alarm(now);
    }

    /// Hands every outstanding packet carrying CRYPTO frames back for retransmission
    fn retransmit_crypto_packets<S: Subscriber<P>>(&mut self, now: Timestamp, subscriber: &mut S) {
        for space in PacketNumberSpace::ALL {
            let crypto_packets: Vec<PacketNumber> = self.spaces[space]
                .sent_packets
                .iter()
                .filter(|(_, info)| info.contains_crypto_data)
                .map(|(packet_number, _)| *packet_number)
                .collect();

            for packet_number in crypto_packets {
                self.retransmit(packet_number, now, subscriber);
            }
        }
    }

    /// Hands the oldest outstanding ack-eliciting packets back for retransmission as probes
    fn send_probe_packets<S: Subscriber<P>>(&mut self, now: Timestamp, subscriber: &mut S) {
        let probes: Vec<PacketNumber> = PacketNumberSpace::ALL
            .into_iter()
            .flat_map(|space| {
                self.spaces[space]
                    .sent_packets
                    .iter()
                    .filter(|(_, info)| info.is_outstanding_ack_eliciting())
                    .map(|(packet_number, _)| *packet_number)
            })
            .take(PROBE_PACKETS)
            .collect();

        for packet_number in probes {
            self.retransmit(packet_number, now, subscriber);
        }
    }

    fn retransmit<S: Subscriber<P>>(
        &mut self,
        packet_number: PacketNumber,
        now: Timestamp,
        subscriber: &mut S,
    ) {
        let Some(info) = self.spaces[packet_number.space()].remove(packet_number) else {
            return;
        };

        tracing::debug!(
            space = ?packet_number.space(),
            packet_number = %packet_number,
            "retransmitting packet"
        );

        if info.ack_elicitation.is_ack_eliciting() {
            subscriber.on_retransmit_packet(packet_number, info, now);
        } else {
            subscriber.on_packet_discarded(packet_number, info);
        }
    }

    /// Stops tracking every packet and disarms the alarm.
    ///
    /// The RTT estimate survives the reset.
    pub fn reset<S: Subscriber<P>>(&mut self, subscriber: &mut S) {
        for (space, state) in self.spaces.iter_mut() {
            for (packet_number, info) in state.sent_packets.take_all() {
                subscriber.on_packet_discarded(packet_number, info);
            }
            *state = Space::new(space);
        }

        self.pto_count = 0;
        self.crypto_count = 0;
        self.time_of_last_ack_eliciting_packet = None;
        self.time_of_last_crypto_packet = None;
        self.timer.cancel();
        self.alarm_duration = None;

        tracing::debug!("loss detector reset");
    }
}

impl<P> LossDetector<P> {
    #[inline]
    pub fn rtt_estimator(&self) -> &RttEstimator {
        &self.rtt_estimator
    }

    #[inline]
    pub fn ack_settings(&self) -> AckSettings {
        self.ack_settings
    }

    /// Returns the time the alarm expires, if it is armed
    #[inline]
    pub fn next_expiration(&self) -> Option<Timestamp> {
        self.timer.expiration()
    }

    /// Returns the duration the alarm was last armed with
    #[inline]
    pub fn alarm_duration(&self) -> Option<Duration> {
        self.alarm_duration
    }

    #[inline]
    pub fn pto_count(&self) -> u32 {
        self.pto_count
    }

    #[inline]
    pub fn crypto_count(&self) -> u32 {
        self.crypto_count
    }

    #[inline]
    pub fn largest_acked(&self, space: PacketNumberSpace) -> Option<PacketNumber> {
        self.spaces[space].largest_acked
    }

    #[inline]
    pub fn loss_time(&self, space: PacketNumberSpace) -> Option<Timestamp> {
        self.spaces[space].loss_time
    }

    #[inline]
    pub fn sent_packets(&self, space: PacketNumberSpace) -> &SentPackets<P> {
        &self.spaces[space].sent_packets
    }

    #[inline]
    pub fn ack_eliciting_outstanding(&self, space: PacketNumberSpace) -> u32 {
        *self.spaces[space].ack_eliciting_outstanding
    }

    #[inline]
    pub fn crypto_outstanding(&self, space: PacketNumberSpace) -> u32 {
        *self.spaces[space].crypto_outstanding
    }
}
