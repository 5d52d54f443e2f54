// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Core tree implementation: structure, updates, queries.

use alloc::vec;
use alloc::vec::Vec;
use glam::{Affine3A, Vec3};

use crate::types::{Aabb3, LocalNode, NodeFlags, NodeId, QueryFilter, Ray, RayHit};
use crate::util::{ray_aabb, transform_aabb};

/// Determinants below this are treated as degenerate (zero scale) and never hit.
const MIN_DETERMINANT: f32 = 1e-12;

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

/// Top-level scene tree.
pub struct Tree {
    nodes: Vec<Option<Node>>, // slots
    generations: Vec<u32>,    // last generation per slot (persists across frees)
    free_list: Vec<usize>,
    epoch: u64,
}

impl core::fmt::Debug for Tree {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let total = self.nodes.len();
        let alive = self.nodes.iter().filter(|n| n.is_some()).count();
        let free = self.free_list.len();
        f.debug_struct("Tree")
            .field("nodes_total", &total)
            .field("nodes_alive", &alive)
            .field("free_list", &free)
            .field("epoch", &self.epoch)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Debug)]
struct Node {
    generation: u32,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    local: LocalNode,
    world_transform: Affine3A,
    dirty: bool,
}

impl Node {
    fn new(generation: u32, local: LocalNode) -> Self {
        Self {
            generation,
            parent: None,
            children: Vec::new(),
            local,
            world_transform: Affine3A::IDENTITY,
            dirty: true,
        }
    }
}

impl Tree {
    /// Create a new empty tree.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            generations: Vec::new(),
            free_list: Vec::new(),
            epoch: 0,
        }
    }

    /// Number of successful [`Tree::commit`] calls so far.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Insert a new node as a child of `parent` (or as a root if `None`).
    ///
    /// A stale `parent` inserts the node as a root.
    pub fn insert(&mut self, parent: Option<NodeId>, local: LocalNode) -> NodeId {
        let (idx, generation) = if let Some(idx) = self.free_list.pop() {
            // Exhausted slots are never put back on the free list.
            let generation = self.generations[idx] + 1;
            self.generations[idx] = generation;
            self.nodes[idx] = Some(Node::new(generation, local));
            #[allow(
                clippy::cast_possible_truncation,
                reason = "NodeId uses 32-bit indices by design."
            )]
            (idx as u32, generation)
        } else {
            let generation = 1_u32;
            self.nodes.push(Some(Node::new(generation, local)));
            self.generations.push(generation);
            #[allow(
                clippy::cast_possible_truncation,
                reason = "NodeId uses 32-bit indices by design."
            )]
            ((self.nodes.len() - 1) as u32, generation)
        };
        let id = NodeId::new(idx, generation);
        if let Some(p) = parent.filter(|p| self.is_alive(*p)) {
            self.link_parent(id, p);
        }
        id
    }

    /// Remove a node (and its subtree) from the tree.
    pub fn remove(&mut self, id: NodeId) {
        let Some(node) = self.node(id) else {
            return;
        };
        let parent = node.parent;
        let children = node.children.clone();
        if let Some(parent) = parent {
            self.unlink_parent(id, parent);
        }
        for child in children {
            self.remove(child);
        }
        self.nodes[id.idx()] = None;
        if self.generations[id.idx()] < u32::MAX {
            self.free_list.push(id.idx());
        }
    }

    /// Reparent `id` under `new_parent` (or make it a root).
    ///
    /// Reparenting a node under itself or one of its descendants is ignored.
    pub fn reparent(&mut self, id: NodeId, new_parent: Option<NodeId>) {
        if !self.is_alive(id) {
            return;
        }
        if let Some(p) = new_parent {
            if !self.is_alive(p) || self.ancestors(p).any(|a| a == id) {
                return;
            }
        }
        if let Some(parent) = self.node(id).and_then(|n| n.parent) {
            self.unlink_parent(id, parent);
        }
        if let Some(p) = new_parent {
            self.link_parent(id, p);
        }
        self.mark_subtree_dirty(id);
    }

    /// Update local transform.
    pub fn set_local_transform(&mut self, id: NodeId, tf: Affine3A) {
        if let Some(n) = self.node_mut(id) {
            n.local.local_transform = tf;
            n.dirty = true;
        }
    }

    /// Update local bounds.
    pub fn set_local_bounds(&mut self, id: NodeId, bounds: Option<Aabb3>) {
        if let Some(n) = self.node_mut(id) {
            n.local.local_bounds = bounds;
        }
    }

    /// Update node flags.
    pub fn set_flags(&mut self, id: NodeId, flags: NodeFlags) {
        if let Some(n) = self.node_mut(id) {
            n.local.flags = flags;
        }
    }

    /// Returns true if `id` refers to a live node.
    pub fn is_alive(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    /// Parent of `id`, or `None` for roots and stale ids.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)?.parent
    }

    /// Children of `id` in insertion order; empty for stale ids.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Iterate `id`'s ancestors, nearest first (excluding `id`).
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        core::iter::successors(self.parent(id), move |p| self.parent(*p))
    }

    /// Local data of a live node.
    pub fn local(&self, id: NodeId) -> Option<&LocalNode> {
        self.node(id).map(|n| &n.local)
    }

    /// World transform as of the last [`Tree::commit`].
    pub fn world_transform(&self, id: NodeId) -> Option<Affine3A> {
        self.node(id).map(|n| n.world_transform)
    }

    /// Conservative world-space AABB of a node's geometry as of the last commit.
    pub fn world_bounds(&self, id: NodeId) -> Option<Aabb3> {
        let n = self.node(id)?;
        n.local
            .local_bounds
            .map(|b| transform_aabb(n.world_transform, b))
    }

    /// Propagate local transforms into cached world transforms.
    ///
    /// Returns the number of nodes whose world transform was recomputed.
    pub fn commit(&mut self) -> usize {
        self.epoch = self.epoch.wrapping_add(1);
        let roots: Vec<NodeId> = self
            .nodes
            .iter()
            .enumerate()
            .filter_map(|(i, n)| match n {
                Some(n) if n.parent.is_none() =>
                {
                    #[allow(
                        clippy::cast_possible_truncation,
                        reason = "NodeId uses 32-bit indices by design."
                    )]
                    Some(NodeId::new(i as u32, n.generation))
                }
                _ => None,
            })
            .collect();

        let mut updated = 0;
        for root in roots {
            updated += self.update_world_recursive(root, Affine3A::IDENTITY, false);
        }
        updated
    }

    /// Cast `ray` against `candidates` (and, if `recursive`, their descendants).
    ///
    /// Each node is tested at most once even if it is reachable from several
    /// candidates. Results are ordered by ascending distance; equal distances keep
    /// traversal order. Honors [`QueryFilter`] per node.
    pub fn raycast(
        &self,
        ray: &Ray,
        candidates: &[NodeId],
        recursive: bool,
        filter: QueryFilter,
    ) -> Vec<RayHit> {
        let mut visited = vec![false; self.nodes.len()];
        let mut stack: Vec<NodeId> = candidates.iter().rev().copied().collect();
        let mut hits = Vec::new();
        while let Some(id) = stack.pop() {
            let Some(node) = self.node(id) else {
                continue;
            };
            if core::mem::replace(&mut visited[id.idx()], true) {
                continue;
            }
            if filter.admits(node.local.flags) {
                if let Some(hit) = Self::hit_node(id, node, ray) {
                    hits.push(hit);
                }
            }
            if recursive {
                stack.extend(node.children.iter().rev().copied());
            }
        }
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }

    /// Root-to-node path (inclusive); empty for stale ids.
    pub fn path_to_root(&self, id: NodeId) -> Vec<NodeId> {
        if !self.is_alive(id) {
            return Vec::new();
        }
        let mut out: Vec<NodeId> = core::iter::once(id).chain(self.ancestors(id)).collect();
        out.reverse();
        out
    }

    // --- internals ---

    fn hit_node(id: NodeId, node: &Node, ray: &Ray) -> Option<RayHit> {
        let bounds = node.local.local_bounds?;
        let world = node.world_transform;
        if world.matrix3.determinant().abs() < MIN_DETERMINANT {
            return None;
        }
        let inv = world.inverse();
        let local_origin = inv.transform_point3(ray.origin);
        let local_dir = inv.transform_vector3(ray.direction);
        let (t, local_normal) = ray_aabb(local_origin, local_dir, &bounds)?;
        let point = world.transform_point3(local_origin + local_dir * t);
        // Normals transform by the inverse transpose.
        let normal = inv
            .matrix3
            .transpose()
            .mul_vec3(local_normal)
            .normalize_or_zero();
        Some(RayHit {
            node: id,
            distance: (point - ray.origin).length(),
            point,
            normal,
        })
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        let n = self.nodes.get(id.idx())?.as_ref()?;
        (n.generation == id.1).then_some(n)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        let n = self.nodes.get_mut(id.idx())?.as_mut()?;
        if n.generation != id.1 {
            return None;
        }
        Some(n)
    }

    fn mark_subtree_dirty(&mut self, id: NodeId) {
        let children = match self.node_mut(id) {
            Some(n) => {
                n.dirty = true;
                n.children.clone()
            }
            None => return,
        };
        for c in children {
            self.mark_subtree_dirty(c);
        }
    }

    fn link_parent(&mut self, id: NodeId, parent: NodeId) {
        if let Some(p) = self.node_mut(parent) {
            p.children.push(id);
        }
        if let Some(n) = self.node_mut(id) {
            n.parent = Some(parent);
        }
    }

    fn unlink_parent(&mut self, id: NodeId, parent: NodeId) {
        if let Some(p) = self.node_mut(parent) {
            p.children.retain(|c| *c != id);
        }
        if let Some(n) = self.node_mut(id) {
            n.parent = None;
        }
    }

    fn update_world_recursive(&mut self, id: NodeId, parent_tf: Affine3A, force: bool) -> usize {
        let Some(node) = self.node_mut(id) else {
            return 0;
        };
        let recompute = force || node.dirty;
        let mut updated = 0;
        if recompute {
            node.world_transform = parent_tf * node.local.local_transform;
            node.dirty = false;
            updated += 1;
        }
        let world = node.world_transform;
        let children = node.children.clone();
        for child in children {
            updated += self.update_world_recursive(child, world, recompute);
        }
        updated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::f32::consts::FRAC_PI_2;

    fn unit_box_at(tree: &mut Tree, parent: Option<NodeId>, at: Vec3) -> NodeId {
        tree.insert(
            parent,
            LocalNode::boxed(Aabb3::unit(), Affine3A::from_translation(at)),
        )
    }

    fn forward_ray() -> Ray {
        Ray::new(Vec3::new(0.0, 0.0, 10.0), Vec3::NEG_Z)
    }

    #[test]
    fn insert_and_raycast_nearest_first() {
        let mut tree = Tree::new();
        let root = tree.insert(None, LocalNode::default());
        let far = unit_box_at(&mut tree, Some(root), Vec3::new(0.0, 0.0, -5.0));
        let near = unit_box_at(&mut tree, Some(root), Vec3::ZERO);
        let _ = tree.commit();

        let hits = tree.raycast(&forward_ray(), &[root], true, QueryFilter::PICKING);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].node, near);
        assert_eq!(hits[1].node, far);
        assert!((hits[0].distance - 9.5).abs() < 1e-5);
        assert!((hits[0].point.z - 0.5).abs() < 1e-5);
        assert_eq!(hits[0].normal, Vec3::Z);
    }

    #[test]
    fn non_recursive_ignores_descendants() {
        let mut tree = Tree::new();
        let group = tree.insert(None, LocalNode::default());
        let _child = unit_box_at(&mut tree, Some(group), Vec3::ZERO);
        let _ = tree.commit();

        assert!(
            tree.raycast(&forward_ray(), &[group], false, QueryFilter::PICKING)
                .is_empty()
        );
        assert_eq!(
            tree.raycast(&forward_ray(), &[group], true, QueryFilter::PICKING)
                .len(),
            1
        );
    }

    #[test]
    fn overlapping_candidates_are_tested_once() {
        let mut tree = Tree::new();
        let group = tree.insert(None, LocalNode::default());
        let child = unit_box_at(&mut tree, Some(group), Vec3::ZERO);
        let _ = tree.commit();

        let hits = tree.raycast(&forward_ray(), &[group, child], true, QueryFilter::PICKING);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].node, child);
    }

    #[test]
    fn parent_transform_moves_children() {
        let mut tree = Tree::new();
        let group = tree.insert(None, LocalNode::default());
        let child = unit_box_at(&mut tree, Some(group), Vec3::ZERO);
        let _ = tree.commit();

        tree.set_local_transform(group, Affine3A::from_translation(Vec3::new(5.0, 0.0, 0.0)));
        let updated = tree.commit();
        assert_eq!(updated, 2, "group and its child are recomputed");
        assert!(
            tree.raycast(&forward_ray(), &[group], true, QueryFilter::PICKING)
                .is_empty()
        );
        let moved = Ray::new(Vec3::new(5.0, 0.0, 10.0), Vec3::NEG_Z);
        let hits = tree.raycast(&moved, &[group], true, QueryFilter::PICKING);
        assert_eq!(hits.first().map(|h| h.node), Some(child));
    }

    #[test]
    fn rotated_and_scaled_boxes_report_world_distance() {
        let mut tree = Tree::new();
        let n = tree.insert(
            None,
            LocalNode::boxed(
                Aabb3::unit(),
                Affine3A::from_scale_rotation_translation(
                    Vec3::splat(2.0),
                    glam::Quat::from_rotation_y(FRAC_PI_2),
                    Vec3::ZERO,
                ),
            ),
        );
        let _ = tree.commit();
        let hits = tree.raycast(&forward_ray(), &[n], false, QueryFilter::PICKING);
        assert_eq!(hits.len(), 1);
        assert!((hits[0].distance - 9.0).abs() < 1e-4, "scaled face at z = 1");
        assert!((hits[0].normal - Vec3::Z).length() < 1e-4);
    }

    #[test]
    fn filter_skips_hidden_and_unpickable() {
        let mut tree = Tree::new();
        let a = unit_box_at(&mut tree, None, Vec3::ZERO);
        let b = unit_box_at(&mut tree, None, Vec3::new(0.0, 0.0, -3.0));
        let _ = tree.commit();
        tree.set_flags(a, NodeFlags::VISIBLE);

        let hits = tree.raycast(&forward_ray(), &[a, b], false, QueryFilter::PICKING);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].node, b);

        let all = tree.raycast(&forward_ray(), &[a, b], false, QueryFilter::default());
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn zero_scale_is_never_hit() {
        let mut tree = Tree::new();
        let n = tree.insert(
            None,
            LocalNode::boxed(Aabb3::unit(), Affine3A::from_scale(Vec3::ZERO)),
        );
        let _ = tree.commit();
        assert!(
            tree.raycast(&forward_ray(), &[n], false, QueryFilter::PICKING)
                .is_empty()
        );
    }

    #[test]
    fn remove_frees_subtree_and_invalidates_ids() {
        let mut tree = Tree::new();
        let root = tree.insert(None, LocalNode::default());
        let child = unit_box_at(&mut tree, Some(root), Vec3::ZERO);
        let _ = tree.commit();

        tree.remove(root);
        assert!(!tree.is_alive(root));
        assert!(!tree.is_alive(child));
        assert!(
            tree.raycast(&forward_ray(), &[root, child], true, QueryFilter::PICKING)
                .is_empty()
        );

        // Slot reuse yields a fresh generation; stale ids stay dead.
        let reused = tree.insert(None, LocalNode::default());
        assert_ne!(reused, root);
        assert_ne!(reused, child);
        assert!(tree.is_alive(reused));
        assert!(!tree.is_alive(root) && !tree.is_alive(child));
    }

    #[test]
    fn reparent_updates_paths_and_rejects_cycles() {
        let mut tree = Tree::new();
        let a = tree.insert(None, LocalNode::default());
        let b = tree.insert(None, LocalNode::group(Affine3A::from_translation(Vec3::X)));
        let leaf = unit_box_at(&mut tree, Some(a), Vec3::ZERO);
        let _ = tree.commit();

        tree.reparent(leaf, Some(b));
        let _ = tree.commit();
        assert_eq!(tree.path_to_root(leaf), vec![b, leaf]);
        assert!(tree.children(a).is_empty());
        let wt = tree.world_transform(leaf).unwrap();
        assert_eq!(Vec3::from(wt.translation), Vec3::X);

        // b under its own descendant is ignored.
        tree.reparent(b, Some(leaf));
        assert_eq!(tree.parent(b), None);
    }

    #[test]
    fn ancestors_are_nearest_first() {
        let mut tree = Tree::new();
        let g = tree.insert(None, LocalNode::default());
        let p = tree.insert(Some(g), LocalNode::default());
        let c = tree.insert(Some(p), LocalNode::default());
        let chain: Vec<NodeId> = tree.ancestors(c).collect();
        assert_eq!(chain, vec![p, g]);
        assert_eq!(tree.path_to_root(c), vec![g, p, c]);
    }

    #[test]
    fn world_bounds_follow_transform() {
        let mut tree = Tree::new();
        let n = unit_box_at(&mut tree, None, Vec3::new(0.0, 2.0, 0.0));
        let _ = tree.commit();
        let b = tree.world_bounds(n).unwrap();
        assert!(b.contains(Vec3::new(0.0, 2.0, 0.0)));
        assert!(!b.contains(Vec3::ZERO));
        let group = tree.insert(None, LocalNode::default());
        assert!(tree.world_bounds(group).is_none());
    }

    #[test]
    fn exhausted_slot_is_retired() {
        let mut tree = Tree::new();
        let a = tree.insert(None, LocalNode::default());
        tree.generations[a.idx()] = u32::MAX - 1;
        tree.remove(a);
        let b = tree.insert(None, LocalNode::default());
        assert_eq!(b.idx(), a.idx(), "slot reused once more");
        assert!(!tree.is_alive(a));

        tree.remove(b);
        let c = tree.insert(None, LocalNode::default());
        assert_ne!(c.idx(), b.idx(), "slot at the last generation is not reused");
        assert!(!tree.is_alive(b));
        assert!(tree.is_alive(c));
    }
}
