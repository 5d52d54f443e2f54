// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Controller registry: fixed device slots and the live list of connected controllers.
//!
//! ## Lifecycle
//!
//! One [`Controller`] is created per device slot up front, each with three scene
//! attachment points ([`ControllerNodes`]). A controller joins the connected list when
//! the runtime reports a device for its slot and leaves it on disconnect. Handedness
//! belongs to the connected device, not to the slot, and may change across reconnects;
//! always read it through [`Controller::handedness`].

use alloc::vec::Vec;
use glam::{Affine3A, Vec3};

use crate::types::{Handedness, InputSource, Ray};

/// Errors from controller slot operations.
#[derive(Copy, Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum ControllerError {
    /// No controller was created for this device slot.
    #[error("no controller slot {0}")]
    UnknownSlot(u32),
}

/// Scene attachment points owned by a controller slot.
///
/// Visuals are attached as children of these nodes.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct ControllerNodes<K> {
    /// Target-ray space; rays originate here.
    pub controller: K,
    /// Grip space, for held models.
    pub grip: K,
    /// Hand space, for tracked hand skeletons.
    pub hand: K,
}

/// One physical input device slot.
#[derive(Clone, Debug)]
pub struct Controller<K> {
    id: u32,
    pose: Affine3A,
    input_source: Option<InputSource>,
    nodes: ControllerNodes<K>,
}

impl<K: Copy> Controller<K> {
    /// Create a disconnected controller for device slot `id`.
    pub fn new(id: u32, nodes: ControllerNodes<K>) -> Self {
        Self {
            id,
            pose: Affine3A::IDENTITY,
            input_source: None,
            nodes,
        }
    }

    /// Device slot index.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// World-space pose of the target-ray space.
    pub fn pose(&self) -> Affine3A {
        self.pose
    }

    /// The connected device, if any.
    pub fn input_source(&self) -> Option<&InputSource> {
        self.input_source.as_ref()
    }

    /// Handedness of the connected device; `None` when nothing is connected.
    pub fn handedness(&self) -> Option<Handedness> {
        self.input_source.map(|s| s.handedness)
    }

    /// Whether the connected device is a tracked hand.
    pub fn is_hand(&self) -> bool {
        self.input_source.is_some_and(|s| s.hand)
    }

    /// Attachment points.
    pub fn nodes(&self) -> ControllerNodes<K> {
        self.nodes
    }

    /// Target-ray attachment node.
    pub fn controller_node(&self) -> K {
        self.nodes.controller
    }

    /// Grip attachment node.
    pub fn grip_node(&self) -> K {
        self.nodes.grip
    }

    /// Hand attachment node.
    pub fn hand_node(&self) -> K {
        self.nodes.hand
    }

    /// The pointing ray for the current pose.
    ///
    /// Origin is the pose translation; direction is local `-Z` rotated by the pose
    /// rotation, ignoring scale. Recomputed on every call.
    pub fn ray(&self) -> Ray {
        let (_, rotation, translation) = self.pose.to_scale_rotation_translation();
        Ray {
            origin: translation,
            direction: (rotation * Vec3::NEG_Z).normalize_or_zero(),
        }
    }
}

/// All controller slots plus the connected subset.
#[derive(Clone, Debug)]
pub struct ControllerRegistry<K> {
    slots: Vec<Controller<K>>,
    // Slot ids in connection order.
    connected: Vec<u32>,
}

impl<K: Copy + Eq> ControllerRegistry<K> {
    /// Create one controller per entry of `nodes`; slot ids are assigned `0..n`.
    pub fn new(nodes: impl IntoIterator<Item = ControllerNodes<K>>) -> Self {
        let slots = nodes
            .into_iter()
            .zip(0_u32..)
            .map(|(n, id)| Controller::new(id, n))
            .collect();
        Self {
            slots,
            connected: Vec::new(),
        }
    }

    /// Number of device slots.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Controller for slot `id`, connected or not.
    pub fn get(&self, id: u32) -> Option<&Controller<K>> {
        self.slots.get(id as usize)
    }

    fn get_mut(&mut self, id: u32) -> Result<&mut Controller<K>, ControllerError> {
        self.slots
            .get_mut(id as usize)
            .ok_or(ControllerError::UnknownSlot(id))
    }

    /// Bind a device to slot `id` and add it to the connected list.
    ///
    /// Connecting an already connected slot replaces its input source in place.
    pub fn connect(&mut self, id: u32, source: InputSource) -> Result<(), ControllerError> {
        self.get_mut(id)?.input_source = Some(source);
        if !self.connected.contains(&id) {
            self.connected.push(id);
        }
        tracing::debug!(id, handedness = source.handedness.as_str(), "controller connected");
        Ok(())
    }

    /// Unbind the device from slot `id` and drop it from the connected list.
    pub fn disconnect(&mut self, id: u32) -> Result<(), ControllerError> {
        self.get_mut(id)?.input_source = None;
        self.connected.retain(|c| *c != id);
        tracing::debug!(id, "controller disconnected");
        Ok(())
    }

    /// Replace the descriptor of slot `id` without touching the connected list.
    ///
    /// With `None` a connected controller has no handedness, and the frame engine and
    /// router skip it until a descriptor is set again.
    pub fn set_input_source(
        &mut self,
        id: u32,
        source: Option<InputSource>,
    ) -> Result<(), ControllerError> {
        self.get_mut(id)?.input_source = source;
        Ok(())
    }

    /// Update the world pose of slot `id`.
    pub fn set_pose(&mut self, id: u32, pose: Affine3A) -> Result<(), ControllerError> {
        self.get_mut(id)?.pose = pose;
        Ok(())
    }

    /// Returns true if slot `id` is currently connected.
    pub fn is_connected(&self, id: u32) -> bool {
        self.connected.contains(&id)
    }

    /// Connected controllers in connection order.
    pub fn iter_connected(&self) -> impl Iterator<Item = &Controller<K>> + '_ {
        self.connected.iter().filter_map(|id| self.get(*id))
    }

    /// Number of connected controllers.
    pub fn connected_len(&self) -> usize {
        self.connected.len()
    }

    /// The first connected controller currently bearing `handedness`.
    pub fn by_handedness(&self, handedness: Handedness) -> Option<&Controller<K>> {
        self.iter_connected()
            .find(|c| c.handedness() == Some(handedness))
    }
}
