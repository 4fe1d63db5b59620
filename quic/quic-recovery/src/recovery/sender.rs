// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use crate::{recovery::CongestionController, transmission::Packet};
use alloc::collections::VecDeque;

/// Holds packets until the congestion window allows them to be sent.
///
/// Packets leave in order. A congestion controlled packet at the head blocks the
/// packets behind it.
#[derive(Debug)]
pub struct Gate<P> {
    queue: VecDeque<P>,
}

impl<P> Default for Gate<P> {
    fn default() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }
}

impl<P> Gate<P> {
    #[inline]
    pub fn clear(&mut self) {
        self.queue.clear();
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &P> {
        self.queue.iter()
    }
}

impl<P: Packet> Gate<P> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends packets to the back of the queue
    #[inline]
    pub fn enqueue<I: IntoIterator<Item = P>>(&mut self, packets: I) {
        self.queue.extend(packets);
    }

    /// Puts packets back at the head of the queue, keeping their relative order
    pub fn requeue<I>(&mut self, packets: I)
    where
        I: IntoIterator<Item = P>,
        I::IntoIter: DoubleEndedIterator,
    {
        for mut packet in packets.into_iter().rev() {
            packet.set_packet_number(None);
            self.queue.push_front(packet);
        }
    }

    /// Removes the head of the queue if the window allows it.
    ///
    /// Packets that don't count towards bytes in flight are always released.
    pub fn release<G>(&mut self, congestion_controller: &CongestionController<G>) -> Option<P> {
        let head = self.queue.front()?;

        if head.is_in_flight() && congestion_controller.is_congestion_limited() {
            tracing::trace!(
                bytes_in_flight = congestion_controller.bytes_in_flight(),
                congestion_window = congestion_controller.congestion_window(),
                queued = self.queue.len(),
                "congestion limited"
            );
            return None;
        }

        self.queue.pop_front()
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        packet::{number::PacketNumberSpace, PacketType},
        recovery::{Reno, SentPacketInfo, Settings},
        testing::TestPacket,
        time::testing as time,
    };

    fn controller() -> CongestionController<Reno> {
        let settings = Settings::default();
        CongestionController::new(&settings, Reno::new(&settings))
    }

    // the queue accessors are available without a `Packet` bound
    fn queue_state<P>(gate: &Gate<P>) -> (usize, bool) {
        (gate.len(), gate.is_empty())
    }

    fn fill(cc: &mut CongestionController<Reno>) {
        while !cc.is_congestion_limited() {
            cc.on_packet_sent(&SentPacketInfo::new(TestPacket::application(1200), time::now()));
        }
    }

    #[test]
    fn release_in_order_test() {
        let cc = controller();
        let mut gate = Gate::new();
        gate.enqueue((0..3).map(|id| TestPacket::application(1200).with_id(id)));

        let released: Vec<_> = core::iter::from_fn(|| gate.release(&cc))
            .map(|packet| packet.id)
            .collect();
        assert_eq!(released, [0, 1, 2]);
        assert!(gate.is_empty());
    }

    #[test]
    fn congestion_limited_test() {
        let mut cc = controller();
        fill(&mut cc);

        let mut gate = Gate::new();
        gate.enqueue([
            TestPacket::application(1200).with_id(0),
            TestPacket::ack_only(PacketType::OneRtt, 50).with_id(1),
        ]);

        // the ack-only packet is stuck behind the congestion controlled head
        assert!(gate.release(&cc).is_none());
        assert_eq!(gate.len(), 2);

        gate.requeue([TestPacket::ack_only(PacketType::OneRtt, 50).with_id(2)]);
        assert_eq!(gate.release(&cc).map(|packet| packet.id), Some(2));
        assert!(gate.release(&cc).is_none());
    }

    #[test]
    fn requeue_test() {
        let mut gate = Gate::new();
        gate.enqueue([TestPacket::application(1200).with_id(3)]);

        let mut retransmissions = Vec::new();
        for id in 1..=2 {
            let mut packet = TestPacket::application(1200).with_id(id);
            packet.packet_number = PacketNumberSpace::ApplicationData.new_packet_number(id);
            retransmissions.push(packet);
        }
        gate.requeue(retransmissions);

        let contents: Vec<_> = gate
            .iter()
            .map(|packet| (packet.id, packet.packet_number))
            .collect();
        assert_eq!(contents, [(1, None), (2, None), (3, None)]);
        assert_eq!(queue_state(&gate), (3, false));

        gate.clear();
        assert_eq!(queue_state(&gate), (0, true));
        assert_eq!(queue_state(&Gate::<u64>::default()), (0, true));
    }
}
