// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory XR: a deterministic, `no_std` interaction engine for XR controllers.
//!
//! ## Overview
//!
//! This crate turns tracked controllers and their discrete input events into
//! per-object interaction callbacks: hover, blur, move, select, squeeze, and the
//! "missed" fallbacks for select and squeeze.
//! It does not own a scene graph. The host supplies ray intersection and parent
//! lookup through [`RayIntersect`] and [`ParentLookup`]; the optional
//! `scene3d_adapter` feature implements both for `understory_scene3d`.
//!
//! ## Pieces
//!
//! - [`controller`]: device slots, poses, input sources, the connected list.
//! - [`interaction`]: the registry of handlers per object and [`InteractionKind`].
//! - [`hover`]: per-handedness hover maps, the memory between frames.
//! - [`frame`]: [`InteractionManager::update_frame`], the raycast and hover/blur diff.
//! - [`router`]: [`InteractionManager::handle_event`], select/squeeze routing.
//! - [`events`]: raw controller event subscriptions with handedness filters.
//! - [`store`]: [`XrState`], the context object all of the above operate on.
//! - [`session`]: session lifecycle rules over an [`XrRuntime`](session::XrRuntime).
//! - [`grab`]: drag objects with the selecting controller.
//!
//! ## Workflow
//!
//! 1) Create an [`XrState`] with one [`ControllerNodes`](controller::ControllerNodes)
//!    per device slot, and register handlers through [`XrState::interactions`].
//! 2) Forward device connect/disconnect to [`XrState::connect_controller`] and
//!    [`XrState::disconnect_controller`].
//! 3) Each frame, update poses with [`XrState::set_controller_pose`] and call
//!    [`InteractionManager::update_frame`].
//! 4) Forward select/squeeze events to [`InteractionManager::handle_event`].
//!
//! Handlers never abort a frame. A handler returning an error is logged with
//! `tracing` and reported in the returned [`FrameReport`](frame::FrameReport) or
//! [`DispatchReport`](router::DispatchReport).
//!
//! ## Example
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use glam::Vec3;
//! use understory_xr::controller::ControllerNodes;
//! use understory_xr::events::{ControllerEvent, ControllerEventKind};
//! use understory_xr::interaction::{Handler, InteractionEvent, InteractionKind};
//! use understory_xr::{
//!     Handedness, InputSource, InteractionManager, Intersection, ParentLookup, Ray, RayIntersect, XrState,
//! };
//!
//! // One object, 2 units in front of the origin.
//! struct Wall;
//! impl RayIntersect<u32> for Wall {
//!     fn intersect_ray(&self, ray: &Ray, candidates: &[u32], _recursive: bool) -> Vec<Intersection<u32>> {
//!         if !candidates.contains(&1) || ray.direction.z >= 0.0 {
//!             return Vec::new();
//!         }
//!         let distance = 2.0 / -ray.direction.z;
//!         vec![Intersection { object: 1, distance, point: ray.origin + ray.direction * distance, normal: Some(Vec3::Z) }]
//!     }
//! }
//! impl ParentLookup<u32> for Wall {
//!     fn parent_of(&self, _node: &u32) -> Option<u32> {
//!         None
//!     }
//! }
//!
//! let mut state = XrState::new([ControllerNodes { controller: 100, grip: 101, hand: 102 }]);
//! let log = Rc::new(RefCell::new(Vec::new()));
//! for kind in [InteractionKind::Hover, InteractionKind::Select] {
//!     let log = Rc::clone(&log);
//!     state.interactions().add(1, kind, Handler::new(move |_e: &InteractionEvent<'_, u32>| {
//!         log.borrow_mut().push(kind.name());
//!     }));
//! }
//! state.connect_controller(0, InputSource::controller(Handedness::Right)).unwrap();
//!
//! let manager = InteractionManager::new();
//! manager.update_frame(&mut state, &Wall);
//! manager.handle_event(&state, ControllerEvent::new(ControllerEventKind::Select, 0));
//! assert_eq!(*log.borrow(), ["onHover", "onSelect"]);
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

pub mod adapters;
pub mod controller;
pub mod events;
pub mod frame;
pub mod grab;
pub mod hover;
pub mod interaction;
pub mod router;
pub mod session;
pub mod store;
pub mod types;

pub use frame::InteractionManager;
pub use interaction::InteractionKind;
pub use store::{XrConfig, XrState};
pub use types::{
    Handedness, InputSource, Intersection, IntersectionFilter, NearestHit, NoParent, ParentLookup,
    Ray, RayIntersect,
};
