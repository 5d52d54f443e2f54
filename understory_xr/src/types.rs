// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Core types: handedness, input sources, rays, intersections, and the host scene seams.
//!
//! ## Overview
//!
//! The interaction engine never owns a scene graph. It talks to the host through
//! [`ParentLookup`] (ancestor walks) and [`RayIntersect`] (ray queries), and lets the
//! host reshape each frame's raw hits through an [`IntersectionFilter`].

use alloc::vec::Vec;
use glam::Vec3;

/// Which hand an input source is held in.
///
/// Mirrors WebXR's `XRHandedness`. `None` is a resolved value (for example a gaze
/// or screen input) and is distinct from a controller that has no input source at all.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Handedness {
    /// Left hand.
    Left,
    /// Right hand.
    Right,
    /// No particular hand.
    None,
}

impl Handedness {
    /// All handedness values.
    pub const ALL: [Self; 3] = [Self::Left, Self::Right, Self::None];

    /// The WebXR string for this handedness.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::None => "none",
        }
    }
}

/// Descriptor of the physical device currently bound to a controller slot.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct InputSource {
    /// Hand the device is associated with.
    pub handedness: Handedness,
    /// Whether this source is a tracked hand rather than a held controller.
    pub hand: bool,
}

impl InputSource {
    /// A held controller.
    pub fn controller(handedness: Handedness) -> Self {
        Self {
            handedness,
            hand: false,
        }
    }

    /// A tracked hand.
    pub fn hand(handedness: Handedness) -> Self {
        Self {
            handedness,
            hand: true,
        }
    }
}

/// A world-space ray.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Ray {
    /// Ray origin.
    pub origin: Vec3,
    /// Unit direction.
    pub direction: Vec3,
}

/// A single ray/object intersection reported by the host.
///
/// The same record is stored in hover state and handed to every handler that the
/// hit triggers, including handlers on the hit object's ancestors.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Intersection<K> {
    /// The object whose geometry was hit.
    pub object: K,
    /// Distance from the ray origin in world units.
    pub distance: f32,
    /// World-space hit point.
    pub point: Vec3,
    /// World-space normal of the face that was hit, when known.
    pub normal: Option<Vec3>,
}

/// Look up the parent of an object to walk from a hit outward to the root.
///
/// Callers must ensure ancestry is acyclic.
pub trait ParentLookup<K> {
    /// Returns the parent of `node`, or `None` if `node` is a root or no longer exists.
    fn parent_of(&self, node: &K) -> Option<K>;
}

/// A no-op parent provider: every object is its own root.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoParent;

impl<K> ParentLookup<K> for NoParent {
    #[inline]
    fn parent_of(&self, _node: &K) -> Option<K> {
        None
    }
}

/// The host's ray-intersection primitive.
pub trait RayIntersect<K> {
    /// Intersect `ray` with `candidates` (and their descendants when `recursive`).
    ///
    /// Results must be ordered by ascending distance.
    fn intersect_ray(&self, ray: &Ray, candidates: &[K], recursive: bool) -> Vec<Intersection<K>>;
}

/// Reshape a controller's raw, distance-ordered intersections for one frame.
///
/// Implemented for closures `Fn(Vec<Intersection<K>>) -> Vec<Intersection<K>>`,
/// so a custom sort or filter can be injected directly.
pub trait IntersectionFilter<K> {
    /// Returns the intersections that should drive hover, move and blur this frame.
    fn filter(&self, intersections: Vec<Intersection<K>>) -> Vec<Intersection<K>>;
}

/// Default strategy: keep only the nearest intersection.
#[derive(Copy, Clone, Debug, Default)]
pub struct NearestHit;

impl<K> IntersectionFilter<K> for NearestHit {
    fn filter(&self, intersections: Vec<Intersection<K>>) -> Vec<Intersection<K>> {
        let mut best: Option<Intersection<K>> = None;
        for hit in intersections {
            match &best {
                Some(b) if b.distance <= hit.distance => {}
                _ => best = Some(hit),
            }
        }
        best.into_iter().collect()
    }
}

impl<K, F> IntersectionFilter<K> for F
where
    F: Fn(Vec<Intersection<K>>) -> Vec<Intersection<K>>,
{
    fn filter(&self, intersections: Vec<Intersection<K>>) -> Vec<Intersection<K>> {
        self(intersections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn hit(object: u32, distance: f32) -> Intersection<u32> {
        Intersection {
            object,
            distance,
            point: Vec3::ZERO,
            normal: None,
        }
    }

    #[test]
    fn nearest_hit_keeps_one() {
        let out = NearestHit.filter(vec![hit(1, 0.5), hit(2, 1.0), hit(3, 2.0)]);
        assert_eq!(out, vec![hit(1, 0.5)]);
    }

    #[test]
    fn nearest_hit_prefers_first_on_ties_and_tolerates_disorder() {
        let out = NearestHit.filter(vec![hit(4, 3.0), hit(5, 1.0), hit(6, 1.0)]);
        assert_eq!(out, vec![hit(5, 1.0)]);
    }

    #[test]
    fn nearest_hit_on_empty_is_empty() {
        assert!(IntersectionFilter::<u32>::filter(&NearestHit, Vec::new()).is_empty());
    }

    #[test]
    fn closures_are_filters() {
        let keep_all = |v: Vec<Intersection<u32>>| v;
        let out = keep_all.filter(vec![hit(1, 0.5), hit(2, 1.0)]);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn handedness_strings() {
        let names: Vec<&str> = Handedness::ALL.iter().map(|h| h.as_str()).collect();
        assert_eq!(names, vec!["left", "right", "none"]);
    }
}
