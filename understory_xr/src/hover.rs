// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Hover state: which objects each hand's ray is currently over.
//!
//! ## Model
//!
//! There is one map per [`Handedness`], from object to the intersection that put it
//! there. An object is present exactly while a ray from a controller of that
//! handedness hits it or one of its descendants. The map is the frame engine's memory
//! between frames: an entry missing from the next frame's hit set is blurred.
//!
//! Only [`InteractionManager::update_frame`](crate::frame::InteractionManager::update_frame)
//! writes to it. Everything else reads.
//!
//! Iteration order over a map is unspecified; in particular blur order across
//! distinct objects in one frame is not defined.

use alloc::vec::Vec;
use core::hash::Hash;

use hashbrown::HashMap;

use crate::types::{Handedness, Intersection};

/// Ray length used when nothing is hovered.
pub const DEFAULT_RAY_LENGTH: f32 = 1.0;

/// Offset subtracted from the hovered distance when sizing a visible ray, so the
/// ray ends just short of the surface.
pub const RAY_SURFACE_OFFSET: f32 = 0.01;

/// Hovered objects of one handedness, with the intersection that produced each.
pub type HoverMap<K> = HashMap<K, Intersection<K>>;

/// Per-handedness hover maps.
#[derive(Clone, Debug)]
pub struct HoverState<K> {
    left: HoverMap<K>,
    right: HoverMap<K>,
    none: HoverMap<K>,
}

impl<K: Copy + Eq + Hash> Default for HoverState<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Copy + Eq + Hash> HoverState<K> {
    /// Create empty hover state.
    pub fn new() -> Self {
        Self {
            left: HashMap::new(),
            right: HashMap::new(),
            none: HashMap::new(),
        }
    }

    /// The hover map for `handedness`.
    pub fn map(&self, handedness: Handedness) -> &HoverMap<K> {
        match handedness {
            Handedness::Left => &self.left,
            Handedness::Right => &self.right,
            Handedness::None => &self.none,
        }
    }

    pub(crate) fn map_mut(&mut self, handedness: Handedness) -> &mut HoverMap<K> {
        match handedness {
            Handedness::Left => &mut self.left,
            Handedness::Right => &mut self.right,
            Handedness::None => &mut self.none,
        }
    }

    /// Returns true if `object` is hovered by `handedness`.
    pub fn is_hovered(&self, handedness: Handedness, object: &K) -> bool {
        self.map(handedness).contains_key(object)
    }

    /// The intersection currently associated with a hovered object.
    pub fn intersection(&self, handedness: Handedness, object: &K) -> Option<&Intersection<K>> {
        self.map(handedness).get(object)
    }

    /// Hovered objects for `handedness`, in unspecified order.
    pub fn hovered(&self, handedness: Handedness) -> impl Iterator<Item = K> + '_ {
        self.map(handedness).keys().copied()
    }

    /// Distinct intersections behind the current hover set, nearest first.
    ///
    /// An intersection shared by a hit object and its ancestors appears once.
    pub fn distinct_intersections(&self, handedness: Handedness) -> Vec<Intersection<K>> {
        let mut out: Vec<Intersection<K>> = Vec::new();
        for hit in self.map(handedness).values() {
            if !out.contains(hit) {
                out.push(*hit);
            }
        }
        out.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        out
    }

    /// Length for a visible pointer ray of `handedness`.
    ///
    /// The nearest hovered distance minus [`RAY_SURFACE_OFFSET`], or
    /// [`DEFAULT_RAY_LENGTH`] minus the offset when nothing is hovered.
    /// Handedness `None` always uses the default.
    pub fn ray_length(&self, handedness: Handedness) -> f32 {
        let nearest = match handedness {
            Handedness::None => None,
            h => self
                .map(h)
                .values()
                .map(|i| i.distance)
                .min_by(f32::total_cmp),
        };
        nearest.unwrap_or(DEFAULT_RAY_LENGTH) - RAY_SURFACE_OFFSET
    }

    /// Forget everything hovered by `handedness` without firing blur handlers.
    ///
    /// Returns the objects that were dropped.
    pub fn clear(&mut self, handedness: Handedness) -> Vec<K> {
        self.map_mut(handedness).drain().map(|(k, _)| k).collect()
    }
}
