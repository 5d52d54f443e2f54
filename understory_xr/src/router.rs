// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Discrete event routing.
//!
//! ## Overview
//!
//! [`InteractionManager::handle_event`] takes a raw [`ControllerEvent`], delivers it
//! to raw subscribers, and then, for the six discrete input kinds, routes it through
//! the hover state of the originating controller's handedness.
//!
//! ## Dispatch rule
//!
//! Every object known to the registry is visited, hovered or not:
//!
//! - Hovered: its handlers for the matching kind run with that object's hover
//!   intersection, plus the distinct intersections behind the whole hover set.
//! - Not hovered: for `select` its `SelectMissed` handlers run, for `squeeze` its
//!   `SqueezeMissed` handlers run, with no intersection. Start and end kinds have no
//!   missed counterpart.
//!
//! An event whose controller slot is unknown, or whose controller has no
//! handedness, fires no interaction handlers.

use alloc::vec::Vec;
use core::fmt::Debug;
use core::hash::Hash;

use crate::events::ControllerEvent;
use crate::frame::InteractionManager;
use crate::interaction::{HandlerFailure, InteractionEvent, invoke};
use crate::store::XrState;

/// Outcome of one [`InteractionManager::handle_event`] call.
#[derive(Clone, Debug, PartialEq)]
pub struct DispatchReport<K> {
    /// Raw subscriber callbacks invoked.
    pub notified: usize,
    /// Interaction handlers invoked.
    pub delivered: usize,
    /// True when the event could not be routed (unknown slot or no handedness).
    pub dropped: bool,
    /// Handlers that returned an error.
    pub failures: Vec<HandlerFailure<K>>,
}

impl<K> Default for DispatchReport<K> {
    fn default() -> Self {
        Self {
            notified: 0,
            delivered: 0,
            dropped: false,
            failures: Vec::new(),
        }
    }
}

impl<K, F> InteractionManager<K, F>
where
    K: Copy + Eq + Hash + Debug + 'static,
{
    /// Route one raw controller event.
    pub fn handle_event(&self, state: &XrState<K>, event: ControllerEvent) -> DispatchReport<K> {
        let mut report = DispatchReport::default();
        let Some(controller) = state.controllers.get(event.controller) else {
            tracing::debug!(id = event.controller, kind = event.kind.as_str(), "event for unknown controller dropped");
            report.dropped = true;
            return report;
        };
        report.notified = state.events.emit(event.kind, controller);

        let Some(kind) = event.kind.interaction() else {
            return report;
        };
        let Some(handedness) = controller.handedness() else {
            tracing::debug!(id = controller.id(), kind = kind.name(), "event without handedness dropped");
            report.dropped = true;
            return report;
        };

        let hovered = state.hover.map(handedness);
        let intersections = state.hover.distinct_intersections(handedness);
        for object in state.interactions.objects() {
            if let Some(intersection) = hovered.get(&object) {
                let payload = InteractionEvent {
                    target: controller,
                    intersection: Some(intersection),
                    intersections: &intersections,
                };
                let handlers = state.interactions.get(&object, kind);
                report.delivered += invoke(&handlers, object, kind, &payload, &mut report.failures);
            } else if let Some(missed) = kind.missed() {
                let payload = InteractionEvent {
                    target: controller,
                    intersection: None,
                    intersections: &intersections,
                };
                let handlers = state.interactions.get(&object, missed);
                report.delivered +=
                    invoke(&handlers, object, missed, &payload, &mut report.failures);
            }
        }
        report
    }
}
