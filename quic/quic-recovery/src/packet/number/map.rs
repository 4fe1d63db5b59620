// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use crate::packet::number::PacketNumberSpace;
use core::ops::{Index, IndexMut};

/// Holds one value per packet number space
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SpaceMap<T> {
    initial: T,
    handshake: T,
    application_data: T,
}

impl<T> SpaceMap<T> {
    #[inline]
    pub fn new(mut f: impl FnMut(PacketNumberSpace) -> T) -> Self {
        Self {
            initial: f(PacketNumberSpace::Initial),
            handshake: f(PacketNumberSpace::Handshake),
            application_data: f(PacketNumberSpace::ApplicationData),
        }
    }

    /// Iterates over the values in `Initial`, `Handshake`, `ApplicationData` order
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (PacketNumberSpace, &T)> {
        [
            (PacketNumberSpace::Initial, &self.initial),
            (PacketNumberSpace::Handshake, &self.handshake),
            (PacketNumberSpace::ApplicationData, &self.application_data),
        ]
        .into_iter()
    }

    /// Iterates mutably over the values in `Initial`, `Handshake`, `ApplicationData` order
    #[inline]
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (PacketNumberSpace, &mut T)> {
        [
            (PacketNumberSpace::Initial, &mut self.initial),
            (PacketNumberSpace::Handshake, &mut self.handshake),
            (PacketNumberSpace::ApplicationData, &mut self.application_data),
        ]
        .into_iter()
    }
}

impl<T> Index<PacketNumberSpace> for SpaceMap<T> {
    type Output = T;

    #[inline]
    fn index(&self, space: PacketNumberSpace) -> &T {
        match space {
            PacketNumberSpace::Initial => &self.initial,
            PacketNumberSpace::Handshake => &self.handshake,
            PacketNumberSpace::ApplicationData => &self.application_data,
        }
    }
}

impl<T> IndexMut<PacketNumberSpace> for SpaceMap<T> {
    #[inline]
    fn index_mut(&mut self, space: PacketNumberSpace) -> &mut T {
        match space {
            PacketNumberSpace::Initial => &mut self.initial,
            PacketNumberSpace::Handshake => &mut self.handshake,
            PacketNumberSpace::ApplicationData => &mut self.application_data,
        }
    }
}
