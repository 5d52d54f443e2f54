// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Scene3D: a glam-native 3D scene tree with ray picking.
//!
//! Understory Scene3D is the spatial half of an XR interaction stack.
//!
//! - Represents a hierarchy of nodes with local transforms, optional box geometry, and flags.
//! - Provides ray queries against a set of candidate nodes (optionally including their descendants).
//! - Supports batched updates with a [`Tree::commit`] step that refreshes cached world transforms.
//!
//! ## Where this fits
//!
//! The scene tree owns structure and geometry only.
//! Interaction state (which nodes are hovered, which handlers run) lives in `understory_xr`,
//! which consumes this crate through small lookup traits.
//!
//! ## Geometry model
//!
//! A node either has a local axis-aligned box ([`LocalNode::local_bounds`]) or is a pure group.
//! Rays are tested against each box in the node's local space, so rotated and scaled boxes are
//! exact rather than conservative. Groups are never hit themselves.
//!
//! ## API overview
//!
//! - [`Tree`]: container managing nodes and cached world transforms.
//! - [`LocalNode`]: per-node local data (bounds, transform, flags).
//! - [`NodeFlags`]: visibility and picking controls.
//! - [`NodeId`]: generational handle of a node.
//! - [`QueryFilter`]: restricts ray results (visible/pickable).
//!
//! Key operations:
//! - [`Tree::insert`](Tree::insert) → [`NodeId`], [`Tree::remove`](Tree::remove), [`Tree::reparent`](Tree::reparent)
//! - [`Tree::set_local_transform`](Tree::set_local_transform)
//! - [`Tree::commit`](Tree::commit): updates world transforms.
//! - [`Tree::raycast`](Tree::raycast) and [`Tree::ancestors`](Tree::ancestors).
//!
//! ### Minimal usage
//!
//! ```
//! use understory_scene3d::{Aabb3, LocalNode, QueryFilter, Ray, Tree};
//! use glam::{Affine3A, Vec3};
//!
//! let mut tree = Tree::new();
//! let group = tree.insert(None, LocalNode::default());
//! let cube = tree.insert(
//!     Some(group),
//!     LocalNode::boxed(Aabb3::unit(), Affine3A::from_translation(Vec3::new(0.0, 0.0, -2.0))),
//! );
//! let _ = tree.commit();
//!
//! let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);
//! let hits = tree.raycast(&ray, &[group], true, QueryFilter::PICKING);
//! assert_eq!(hits[0].node, cube);
//! assert!((hits[0].distance - 1.5).abs() < 1e-5);
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod tree;
mod types;
mod util;

pub use tree::Tree;
pub use types::{Aabb3, LocalNode, NodeFlags, NodeId, QueryFilter, Ray, RayHit};
