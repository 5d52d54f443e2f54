// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Adapter for Understory Scene3D.
//!
//! ## Feature
//!
//! Enable with `scene3d_adapter`.
//!
//! ## Notes
//!
//! [`Tree`] implements [`RayIntersect`] and [`ParentLookup`] for [`NodeId`] keys, so
//! an `XrState<NodeId>` can be driven straight from a scene tree. Ray queries use
//! [`QueryFilter::PICKING`]: hidden or non-pickable nodes are never hit, though they
//! still appear as ancestors of a hit.
//!
//! The helpers read world transforms as of the last [`Tree::commit`]; commit after
//! moving things and before [`InteractionManager::update_frame`](crate::frame::InteractionManager::update_frame).

use alloc::vec::Vec;

use glam::Affine3A;
use understory_scene3d::{LocalNode, NodeId, QueryFilter, Tree};

use crate::controller::ControllerNodes;
use crate::store::XrState;
use crate::types::{Intersection, ParentLookup, Ray, RayIntersect};

impl ParentLookup<NodeId> for Tree {
    fn parent_of(&self, node: &NodeId) -> Option<NodeId> {
        self.parent(*node)
    }
}

impl RayIntersect<NodeId> for Tree {
    fn intersect_ray(
        &self,
        ray: &Ray,
        candidates: &[NodeId],
        recursive: bool,
    ) -> Vec<Intersection<NodeId>> {
        let ray = understory_scene3d::Ray::new(ray.origin, ray.direction);
        self.raycast(&ray, candidates, recursive, QueryFilter::PICKING)
            .into_iter()
            .map(|hit| Intersection {
                object: hit.node,
                distance: hit.distance,
                point: hit.point,
                normal: Some(hit.normal),
            })
            .collect()
    }
}

/// Create attachment nodes for `count` controller slots under `player`.
///
/// Each slot gets three geometry-free group nodes (target ray, grip, hand) that
/// visuals can be parented to. Pass the result to
/// [`XrState::new`](crate::store::XrState::new).
pub fn spawn_controllers(
    tree: &mut Tree,
    player: Option<NodeId>,
    count: u32,
) -> Vec<ControllerNodes<NodeId>> {
    (0..count)
        .map(|_| ControllerNodes {
            controller: tree.insert(player, LocalNode::group(Affine3A::IDENTITY)),
            grip: tree.insert(player, LocalNode::group(Affine3A::IDENTITY)),
            hand: tree.insert(player, LocalNode::group(Affine3A::IDENTITY)),
        })
        .collect()
}

/// Place every controller's target-ray node at its world pose.
///
/// Disconnected controllers are left where they are. Returns the number of nodes
/// moved; commit afterwards.
pub fn sync_controller_poses(state: &XrState<NodeId>, tree: &mut Tree) -> usize {
    let mut moved = 0;
    for controller in state.controllers().iter_connected() {
        if set_world_transform(tree, controller.controller_node(), controller.pose()) {
            moved += 1;
        }
    }
    moved
}

/// Pre-multiply `delta` onto `node`'s world transform, e.g. a
/// [`RayGrab`](crate::grab::RayGrab) update.
///
/// Returns false for stale nodes.
pub fn apply_world_delta(tree: &mut Tree, node: NodeId, delta: Affine3A) -> bool {
    match tree.world_transform(node) {
        Some(world) => set_world_transform(tree, node, delta * world),
        None => false,
    }
}

fn set_world_transform(tree: &mut Tree, node: NodeId, world: Affine3A) -> bool {
    if !tree.is_alive(node) {
        return false;
    }
    let parent_world = tree
        .parent(node)
        .and_then(|p| tree.world_transform(p))
        .unwrap_or(Affine3A::IDENTITY);
    tree.set_local_transform(node, parent_world.inverse() * world);
    true
}
