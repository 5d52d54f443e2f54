// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Ray grab: drag an object with the controller that selected it.
//!
//! A grab starts on `SelectStart` and ends on `SelectEnd` from the same controller.
//! While held, [`RayGrab::update`] yields a delta each frame,
//! `controller_world * previous_inverse`, to be pre-multiplied onto the grabbed
//! object's world transform.
//!
//! ```
//! use glam::{Affine3A, Vec3};
//! use understory_xr::controller::{ControllerNodes, ControllerRegistry};
//! use understory_xr::grab::RayGrab;
//! use understory_xr::{Handedness, InputSource};
//!
//! let mut controllers = ControllerRegistry::new([ControllerNodes { controller: 0_u32, grip: 1, hand: 2 }]);
//! controllers.connect(0, InputSource::controller(Handedness::Right)).unwrap();
//! let mut grab = RayGrab::new();
//! grab.begin(controllers.get(0).unwrap());
//!
//! controllers.set_pose(0, Affine3A::from_translation(Vec3::X)).unwrap();
//! let delta = grab.update(&controllers).unwrap();
//! assert_eq!(delta.translation, Vec3::X.into());
//! ```

use alloc::rc::Rc;
use core::cell::RefCell;
use core::hash::Hash;

use glam::Affine3A;

use crate::controller::{Controller, ControllerRegistry};
use crate::interaction::{Handler, InteractionEvent, InteractionKind, Interactive};

/// Grab state for one object.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RayGrab {
    grabbing: Option<u32>,
    previous_inverse: Affine3A,
}

impl Default for RayGrab {
    fn default() -> Self {
        Self::new()
    }
}

impl RayGrab {
    /// Not grabbed.
    pub fn new() -> Self {
        Self {
            grabbing: None,
            previous_inverse: Affine3A::IDENTITY,
        }
    }

    /// Slot of the controller holding the object.
    pub fn grabbing(&self) -> Option<u32> {
        self.grabbing
    }

    /// Start following `controller`, replacing any current grab.
    pub fn begin<K: Copy>(&mut self, controller: &Controller<K>) {
        self.grabbing = Some(controller.id());
        self.previous_inverse = controller.pose().inverse();
    }

    /// Release if `controller` is the one holding the object.
    ///
    /// Returns whether the grab ended.
    pub fn end<K: Copy>(&mut self, controller: &Controller<K>) -> bool {
        if self.grabbing == Some(controller.id()) {
            self.grabbing = None;
            true
        } else {
            false
        }
    }

    /// Delta since the previous call, or `None` when not grabbed.
    ///
    /// A grabbing controller that has disconnected yields nothing but keeps the grab.
    pub fn update<K: Copy + Eq>(&mut self, controllers: &ControllerRegistry<K>) -> Option<Affine3A> {
        let id = self.grabbing?;
        if !controllers.is_connected(id) {
            return None;
        }
        let pose = controllers.get(id)?.pose();
        let delta = pose * self.previous_inverse;
        self.previous_inverse = pose.inverse();
        Some(delta)
    }

    /// An [`Interactive`] whose select start/end handlers drive `grab`.
    ///
    /// `extra` is merged in, with its own select start/end handlers chained after the
    /// grab bookkeeping.
    pub fn interactive<K>(grab: &Rc<RefCell<Self>>, extra: Interactive<K>) -> Interactive<K>
    where
        K: Copy + Eq + Hash + 'static,
    {
        let on_start = extra.handler(InteractionKind::SelectStart).cloned();
        let on_end = extra.handler(InteractionKind::SelectEnd).cloned();

        let g = Rc::clone(grab);
        let start = Handler::new(move |e: &InteractionEvent<'_, K>| {
            g.borrow_mut().begin(e.target);
            match &on_start {
                Some(h) => h.call(e),
                None => Ok(()),
            }
        });
        let g = Rc::clone(grab);
        let end = Handler::new(move |e: &InteractionEvent<'_, K>| {
            g.borrow_mut().end(e.target);
            match &on_end {
                Some(h) => h.call(e),
                None => Ok(()),
            }
        });
        extra
            .with(InteractionKind::SelectStart, start)
            .with(InteractionKind::SelectEnd, end)
    }
}
