// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-frame raycast and hover diff.
//!
//! ## Overview
//!
//! [`InteractionManager::update_frame`] runs once per rendered frame. For each
//! connected controller with a resolved handedness it:
//!
//! 1. Builds the controller's ray from its current pose.
//! 2. Intersects it with every object that has a registration, descendants included.
//! 3. Reshapes the hits through the [`IntersectionFilter`] (nearest only by default).
//! 4. Walks each hit outward through its ancestors, innermost first. Each ancestor
//!    gets `Hover` if it registered for it and was not hovered yet, then `Move`
//!    unconditionally, and is recorded in the hover map and this frame's hit set.
//! 5. Blurs every object left in the hover map that is not in the hit set.
//!
//! Controllers without an input source are skipped and touch no hover state.
//! With nothing registered the whole frame is a no-op.
//!
//! Controllers sharing a handedness share one hover map, so each one's pass diffs
//! against what the previous one left behind.

use alloc::vec::Vec;
use core::fmt::Debug;
use core::hash::Hash;

use hashbrown::HashSet;

use crate::controller::Controller;
use crate::hover::HoverMap;
use crate::interaction::{
    HandlerFailure, InteractionEvent, InteractionKind, InteractionRegistry, invoke,
};
use crate::store::XrState;
use crate::types::{Handedness, Intersection, IntersectionFilter, NearestHit, ParentLookup, RayIntersect};

/// Outcome of one [`InteractionManager::update_frame`] call.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameReport<K> {
    /// Controllers that were raycast.
    pub processed: usize,
    /// Connected controllers skipped for lack of a handedness.
    pub skipped: usize,
    /// Objects that entered hover, in firing order.
    pub hovered: Vec<(Handedness, K)>,
    /// Objects that left hover, in firing order.
    pub blurred: Vec<(Handedness, K)>,
    /// Handlers that returned an error.
    pub failures: Vec<HandlerFailure<K>>,
}

impl<K> Default for FrameReport<K> {
    fn default() -> Self {
        Self {
            processed: 0,
            skipped: 0,
            hovered: Vec::new(),
            blurred: Vec::new(),
            failures: Vec::new(),
        }
    }
}

/// The interaction engine: frame diffing here, discrete routing in
/// [`router`](crate::router).
///
/// Holds only the intersection strategy. All state lives in [`XrState`].
pub struct InteractionManager<K, F = NearestHit> {
    pub(crate) filter: F,
    _phantom: core::marker::PhantomData<fn() -> K>,
}

impl<K, F: Debug> Debug for InteractionManager<K, F> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InteractionManager")
            .field("filter", &self.filter)
            .finish_non_exhaustive()
    }
}

impl<K> Default for InteractionManager<K, NearestHit> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> InteractionManager<K, NearestHit> {
    /// Create a manager that keeps only the nearest hit per controller.
    pub fn new() -> Self {
        Self::with_filter(NearestHit)
    }
}

impl<K, F> InteractionManager<K, F> {
    /// Create a manager with a custom intersection filter/sort.
    pub fn with_filter(filter: F) -> Self {
        Self {
            filter,
            _phantom: core::marker::PhantomData,
        }
    }

    /// The intersection strategy.
    pub fn filter(&self) -> &F {
        &self.filter
    }
}

impl<K, F> InteractionManager<K, F>
where
    K: Copy + Eq + Hash + Debug + 'static,
    F: IntersectionFilter<K>,
{
    /// Raycast every connected controller and fire hover, move and blur handlers.
    pub fn update_frame<S>(&self, state: &mut XrState<K>, scene: &S) -> FrameReport<K>
    where
        S: RayIntersect<K> + ParentLookup<K>,
    {
        let mut report = FrameReport::default();
        if state.interactions.is_empty() {
            return report;
        }
        let candidates = state.interactions.objects();
        let XrState {
            controllers,
            interactions,
            hover,
            ..
        } = state;

        for controller in controllers.iter_connected() {
            let Some(handedness) = controller.handedness() else {
                tracing::debug!(id = controller.id(), "controller without handedness skipped");
                report.skipped += 1;
                continue;
            };
            report.processed += 1;

            let ray = controller.ray();
            let raw = scene.intersect_ray(&ray, &candidates, true);
            let intersections = self.filter.filter(raw);
            diff_controller(
                controller,
                handedness,
                &intersections,
                scene,
                interactions,
                hover.map_mut(handedness),
                &mut report,
            );
        }
        report
    }
}

fn diff_controller<K, P>(
    controller: &Controller<K>,
    handedness: Handedness,
    intersections: &[Intersection<K>],
    parents: &P,
    interactions: &InteractionRegistry<K>,
    map: &mut HoverMap<K>,
    report: &mut FrameReport<K>,
) where
    K: Copy + Eq + Hash + Debug + 'static,
    P: ParentLookup<K>,
{
    let mut hits: HashSet<K> = HashSet::new();

    for intersection in intersections {
        let event = InteractionEvent {
            target: controller,
            intersection: Some(intersection),
            intersections,
        };
        let mut node = Some(intersection.object);
        while let Some(object) = node {
            if interactions.has(&object, InteractionKind::Hover) && !map.contains_key(&object) {
                tracing::trace!(?object, handedness = handedness.as_str(), "hover");
                let handlers = interactions.get(&object, InteractionKind::Hover);
                invoke(&handlers, object, InteractionKind::Hover, &event, &mut report.failures);
                report.hovered.push((handedness, object));
            }
            let handlers = interactions.get(&object, InteractionKind::Move);
            invoke(&handlers, object, InteractionKind::Move, &event, &mut report.failures);
            map.insert(object, *intersection);
            hits.insert(object);
            node = parents.parent_of(&object);
        }
    }

    let stale: Vec<K> = map.keys().filter(|k| !hits.contains(*k)).copied().collect();
    blur(controller, handedness, stale, intersections, interactions, map, report);
}

/// Drop `objects` from `map` and fire their blur handlers.
pub(crate) fn blur<K>(
    controller: &Controller<K>,
    handedness: Handedness,
    objects: Vec<K>,
    intersections: &[Intersection<K>],
    interactions: &InteractionRegistry<K>,
    map: &mut HoverMap<K>,
    report: &mut FrameReport<K>,
) where
    K: Copy + Eq + Hash + Debug + 'static,
{
    let event = InteractionEvent {
        target: controller,
        intersection: None,
        intersections,
    };
    for object in objects {
        map.remove(&object);
        tracing::trace!(?object, handedness = handedness.as_str(), "blur");
        let handlers = interactions.get(&object, InteractionKind::Blur);
        invoke(&handlers, object, InteractionKind::Blur, &event, &mut report.failures);
        report.blurred.push((handedness, object));
    }
}
