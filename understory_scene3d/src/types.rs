// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public types for the scene tree: node identifiers, flags, bounds, rays and local data.

use glam::{Affine3A, Vec3};

/// Identifier for a node in the tree.
///
/// This is a small, copyable handle that stays stable across updates but becomes
/// invalid when the underlying slot is reused.
/// It consists of a slot index and a generation counter.
///
/// ## Semantics
///
/// - On insert, a fresh slot is allocated with generation `1`.
/// - On remove, the slot is freed; any existing `NodeId` that pointed to that slot is now stale.
/// - On reuse of a freed slot, its generation is incremented, producing a new, distinct `NodeId`.
///
/// Use [`Tree::is_alive`](crate::Tree::is_alive) to check whether a `NodeId` still refers to a live node.
/// Stale `NodeId`s never alias a different live node because the generation must match.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct NodeId(pub(crate) u32, pub(crate) u32);

impl NodeId {
    pub(crate) const fn new(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }
}

bitflags::bitflags! {
    /// Node flags controlling visibility and picking.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct NodeFlags: u8 {
        /// Node is visible (participates in rendering and ray queries).
        const VISIBLE  = 0b0000_0001;
        /// Node is pickable (participates in ray picking).
        const PICKABLE = 0b0000_0010;
    }
}

impl Default for NodeFlags {
    fn default() -> Self {
        Self::VISIBLE | Self::PICKABLE
    }
}

/// Axis-aligned box in a node's local space.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb3 {
    /// Minimum corner.
    pub min: Vec3,
    /// Maximum corner.
    pub max: Vec3,
}

impl Aabb3 {
    /// Create a box from two corners, normalizing their order per axis.
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Create a box centered on `center` with full extents `size`.
    pub fn from_center_size(center: Vec3, size: Vec3) -> Self {
        let half = size.abs() * 0.5;
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Unit cube centered on the origin.
    pub fn unit() -> Self {
        Self::from_center_size(Vec3::ZERO, Vec3::ONE)
    }

    /// Returns true if `p` lies inside or on the boundary.
    pub fn contains(&self, p: Vec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    /// Smallest box containing both `self` and `other`.
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }
}

/// A world-space ray.
///
/// `direction` is expected to be normalized so that hit distances are in world units.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Ray {
    /// Ray origin.
    pub origin: Vec3,
    /// Unit direction.
    pub direction: Vec3,
}

impl Ray {
    /// Create a ray, normalizing `direction`.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    /// Point at distance `t` along the ray.
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Local data for a node.
#[derive(Clone, Debug)]
pub struct LocalNode {
    /// Local geometry bounds. `None` for pure grouping nodes, which are never hit
    /// themselves but still parent hittable descendants.
    pub local_bounds: Option<Aabb3>,
    /// Local transform relative to parent space.
    pub local_transform: Affine3A,
    /// Visibility and picking flags.
    pub flags: NodeFlags,
}

impl Default for LocalNode {
    fn default() -> Self {
        Self {
            local_bounds: None,
            local_transform: Affine3A::IDENTITY,
            flags: NodeFlags::default(),
        }
    }
}

impl LocalNode {
    /// A grouping node with a local transform and no geometry.
    pub fn group(local_transform: Affine3A) -> Self {
        Self {
            local_transform,
            ..Self::default()
        }
    }

    /// A node with box geometry and a local transform.
    pub fn boxed(local_bounds: Aabb3, local_transform: Affine3A) -> Self {
        Self {
            local_bounds: Some(local_bounds),
            local_transform,
            ..Self::default()
        }
    }
}

/// A single ray hit produced by [`Tree::raycast`](crate::Tree::raycast).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RayHit {
    /// The node whose geometry was hit.
    pub node: NodeId,
    /// World-space distance from the ray origin.
    pub distance: f32,
    /// World-space hit point.
    pub point: Vec3,
    /// World-space normal of the face that was hit.
    pub normal: Vec3,
}

/// Filters applied during ray queries.
///
/// Used by [`Tree::raycast`](crate::Tree::raycast).
#[derive(Clone, Copy, Debug, Default)]
pub struct QueryFilter {
    /// If true, only consider nodes marked [`NodeFlags::VISIBLE`].
    pub visible_only: bool,
    /// If true, only consider nodes marked [`NodeFlags::PICKABLE`].
    pub pickable_only: bool,
}

impl QueryFilter {
    /// Filter that admits visible, pickable nodes only.
    pub const PICKING: Self = Self {
        visible_only: true,
        pickable_only: true,
    };

    pub(crate) fn admits(self, flags: NodeFlags) -> bool {
        if self.visible_only && !flags.contains(NodeFlags::VISIBLE) {
            return false;
        }
        if self.pickable_only && !flags.contains(NodeFlags::PICKABLE) {
            return false;
        }
        true
    }
}
