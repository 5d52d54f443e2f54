// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-session state store.
//!
//! [`XrState`] is the one context object passed to the frame engine and the router.
//! It owns the controller slots, the raw event subscribers, the interaction registry
//! handle, the hover maps, and the session-level flags the lifecycle glue maintains.
//! Create one per active XR context.

use alloc::vec::Vec;
use core::fmt::Debug;
use core::hash::Hash;

use glam::Affine3A;

use crate::controller::{Controller, ControllerError, ControllerNodes, ControllerRegistry};
use crate::events::{ControllerEventKind, ControllerEvents};
use crate::frame::{FrameReport, blur};
use crate::hover::HoverState;
use crate::interaction::InteractionRegistry;
use crate::session::{ReferenceSpaceType, SessionHandle, Visibility};
use crate::types::{Handedness, InputSource};

/// Code-level configuration applied with [`XrState::apply_config`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct XrConfig {
    /// Foveated rendering level, `0.0` (off) to `1.0` (maximum). Clamped.
    pub foveation: f32,
    /// Target display refresh rate, if any.
    pub frame_rate: Option<f32>,
    /// Reference space requested for new sessions.
    pub reference_space: ReferenceSpaceType,
}

impl Default for XrConfig {
    fn default() -> Self {
        Self {
            foveation: 0.0,
            frame_rate: None,
            reference_space: ReferenceSpaceType::LocalFloor,
        }
    }
}

/// Shared state for one XR context.
#[derive(Debug)]
pub struct XrState<K> {
    pub(crate) controllers: ControllerRegistry<K>,
    pub(crate) events: ControllerEvents<K>,
    pub(crate) interactions: InteractionRegistry<K>,
    pub(crate) hover: HoverState<K>,
    pub(crate) is_presenting: bool,
    pub(crate) is_hand_tracking: bool,
    pub(crate) foveation: f32,
    pub(crate) frame_rate: Option<f32>,
    pub(crate) reference_space: ReferenceSpaceType,
    pub(crate) session: Option<SessionHandle>,
    pub(crate) visibility: Visibility,
}

impl<K> XrState<K> {
    /// Whether a session is presenting to the display.
    pub fn is_presenting(&self) -> bool {
        self.is_presenting
    }

    /// Whether any current input source is a tracked hand.
    pub fn is_hand_tracking(&self) -> bool {
        self.is_hand_tracking
    }

    /// Current foveation level.
    pub fn foveation(&self) -> f32 {
        self.foveation
    }

    /// Configured target frame rate.
    pub fn frame_rate(&self) -> Option<f32> {
        self.frame_rate
    }

    /// Reference space for new sessions.
    pub fn reference_space(&self) -> ReferenceSpaceType {
        self.reference_space
    }

    /// The running session, if any.
    pub fn session(&self) -> Option<SessionHandle> {
        self.session
    }

    /// Last reported visibility.
    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    /// Apply configuration. Foveation is clamped to `[0, 1]`.
    ///
    /// A new frame rate only reaches the runtime through
    /// [`SessionManager::apply_frame_rate`](crate::session::SessionManager::apply_frame_rate).
    pub fn apply_config(&mut self, config: &XrConfig) {
        self.foveation = if config.foveation.is_nan() {
            0.0
        } else {
            config.foveation.clamp(0.0, 1.0)
        };
        self.frame_rate = config.frame_rate;
        self.reference_space = config.reference_space;
    }

    /// The runtime began presenting.
    pub fn on_session_start(&mut self) {
        self.is_presenting = true;
    }

    /// The runtime ended the session.
    pub fn on_session_end(&mut self) {
        self.is_presenting = false;
        self.session = None;
    }

    /// The set of input sources changed.
    pub fn on_input_sources_change(&mut self, sources: &[InputSource]) {
        self.is_hand_tracking = sources.iter().any(|s| s.hand);
    }

    /// The session's visibility changed.
    pub fn on_visibility_change(&mut self, visibility: Visibility) {
        self.visibility = visibility;
    }
}

impl<K: Copy + Eq + Hash + 'static> XrState<K> {
    /// Create state with one controller per entry of `slots`.
    pub fn new(slots: impl IntoIterator<Item = ControllerNodes<K>>) -> Self {
        Self::with_registry(slots, InteractionRegistry::new())
    }

    /// Like [`XrState::new`], sharing an existing interaction registry.
    pub fn with_registry(
        slots: impl IntoIterator<Item = ControllerNodes<K>>,
        interactions: InteractionRegistry<K>,
    ) -> Self {
        let config = XrConfig::default();
        Self {
            controllers: ControllerRegistry::new(slots),
            events: ControllerEvents::new(),
            interactions,
            hover: HoverState::new(),
            is_presenting: false,
            is_hand_tracking: false,
            foveation: config.foveation,
            frame_rate: config.frame_rate,
            reference_space: config.reference_space,
            session: None,
            visibility: Visibility::Visible,
        }
    }

    /// Controller slots and the connected list.
    pub fn controllers(&self) -> &ControllerRegistry<K> {
        &self.controllers
    }

    /// The connected controller currently bearing `handedness`.
    pub fn controller(&self, handedness: Handedness) -> Option<&Controller<K>> {
        self.controllers.by_handedness(handedness)
    }

    /// Raw controller event subscribers.
    pub fn events(&self) -> &ControllerEvents<K> {
        &self.events
    }

    /// The interaction registry. Clone it to keep a handle inside handlers.
    pub fn interactions(&self) -> &InteractionRegistry<K> {
        &self.interactions
    }

    /// Hover maps as of the last completed frame.
    pub fn hover(&self) -> &HoverState<K> {
        &self.hover
    }

    /// Bind a device to slot `id` and notify `connected` subscribers.
    pub fn connect_controller(&mut self, id: u32, source: InputSource) -> Result<(), ControllerError> {
        self.controllers.connect(id, source)?;
        if let Some(controller) = self.controllers.get(id) {
            self.events.emit(ControllerEventKind::Connected, controller);
        }
        Ok(())
    }

    /// Replace the input source descriptor of slot `id` in place.
    pub fn set_input_source(
        &mut self,
        id: u32,
        source: Option<InputSource>,
    ) -> Result<(), ControllerError> {
        self.controllers.set_input_source(id, source)
    }

    /// Update the world pose of slot `id`; call once per frame before the frame engine.
    pub fn set_controller_pose(&mut self, id: u32, pose: Affine3A) -> Result<(), ControllerError> {
        self.controllers.set_pose(id, pose)
    }
}

impl<K: Copy + Eq + Hash + Debug + 'static> XrState<K> {
    /// Notify `disconnected` subscribers, blur what the controller was hovering, then
    /// unbind the device from slot `id`.
    ///
    /// Subscribers and blur handlers still see the departing input source. When
    /// another connected controller shares the handedness, the hover map is left to
    /// that controller's next frame. The returned report lists the blurred objects
    /// and any failing handlers.
    pub fn disconnect_controller(&mut self, id: u32) -> Result<FrameReport<K>, ControllerError> {
        let controller = self
            .controllers
            .get(id)
            .ok_or(ControllerError::UnknownSlot(id))?;
        self.events.emit(ControllerEventKind::Disconnected, controller);

        let mut report = FrameReport::default();
        if let Some(handedness) = controller.handedness() {
            let shared = self
                .controllers
                .iter_connected()
                .any(|c| c.id() != id && c.handedness() == Some(handedness));
            if self.controllers.is_connected(id) && !shared {
                let map = self.hover.map_mut(handedness);
                let objects: Vec<K> = map.keys().copied().collect();
                blur(
                    controller,
                    handedness,
                    objects,
                    &[],
                    &self.interactions,
                    map,
                    &mut report,
                );
            }
        }
        self.controllers.disconnect(id)?;
        Ok(report)
    }
}
