// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Session lifecycle: modes, reference spaces, and the start/stop/toggle glue.
//!
//! The XR runtime itself is abstracted as [`XrRuntime`]. [`SessionManager`] enforces
//! the lifecycle rules on top of it and records the outcome in [`XrState`]:
//!
//! - Starting while a session is active, or stopping with none active, logs a warning
//!   and changes nothing.
//! - An unsupported mode is reported as [`SessionError::Unsupported`].
//! - A rejected frame-rate request is logged and otherwise ignored.

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::store::XrState;

/// Kind of XR session.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum SessionMode {
    /// Rendered into the page, no headset.
    Inline,
    /// Fully immersive virtual reality.
    ImmersiveVr,
    /// Passthrough augmented reality.
    ImmersiveAr,
}

impl SessionMode {
    /// WebXR mode string.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Inline => "inline",
            Self::ImmersiveVr => "immersive-vr",
            Self::ImmersiveAr => "immersive-ar",
        }
    }
}

/// Reference space requested for tracking.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum ReferenceSpaceType {
    /// Head-locked.
    Viewer,
    /// Seated, origin at the initial head position.
    Local,
    /// Standing, origin on the floor.
    #[default]
    LocalFloor,
    /// Room-scale with known bounds.
    BoundedFloor,
    /// Unbounded world-scale tracking.
    Unbounded,
}

impl ReferenceSpaceType {
    /// WebXR reference space (and feature) string.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Viewer => "viewer",
            Self::Local => "local",
            Self::LocalFloor => "local-floor",
            Self::BoundedFloor => "bounded-floor",
            Self::Unbounded => "unbounded",
        }
    }
}

/// Features requested when creating a session.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SessionInit {
    /// Features the session must provide.
    pub required_features: Vec<String>,
    /// Features the session should provide if it can.
    pub optional_features: Vec<String>,
}

/// Build the options passed to the runtime for a new session.
///
/// The configured reference space is appended to `optional_features`; duplicates are
/// dropped, keeping the first occurrence. Without either input there are no options.
pub fn session_options(
    reference_space: Option<ReferenceSpaceType>,
    init: Option<&SessionInit>,
) -> Option<SessionInit> {
    match (reference_space, init) {
        (None, None) => None,
        (None, Some(init)) => Some(init.clone()),
        (Some(space), init) => {
            let mut options = init.cloned().unwrap_or_default();
            options.optional_features.push(space.as_str().to_string());
            let mut seen: Vec<String> = Vec::with_capacity(options.optional_features.len());
            options.optional_features.retain(|f| {
                if seen.contains(f) {
                    false
                } else {
                    seen.push(f.clone());
                    true
                }
            });
            Some(options)
        }
    }
}

/// Opaque handle to a runtime session.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct SessionHandle(pub u64);

/// Page visibility of a running session.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum Visibility {
    /// Rendering and receiving input.
    #[default]
    Visible,
    /// Visible but not focused (e.g. a system overlay is up).
    VisibleBlurred,
    /// Not visible.
    Hidden,
}

/// Failures reported by the runtime or by the lifecycle rules.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum SessionError {
    /// The runtime does not support this mode.
    #[error("{} sessions are not supported", .0.as_str())]
    Unsupported(SessionMode),
    /// XR requires a secure context.
    #[error("XR requires a secure (https) context")]
    InsecureContext,
    /// Blocked by a permissions or security policy.
    #[error("XR blocked by security policy")]
    SecurityBlocked,
    /// Any other runtime failure.
    #[error("XR runtime error: {0}")]
    Runtime(String),
}

/// The device/session API the lifecycle glue drives.
pub trait XrRuntime {
    /// Whether `mode` can be started.
    fn is_session_supported(&self, mode: SessionMode) -> Result<bool, SessionError>;

    /// Create a session.
    fn request_session(
        &mut self,
        mode: SessionMode,
        options: Option<&SessionInit>,
    ) -> Result<SessionHandle, SessionError>;

    /// End a session.
    fn end_session(&mut self, session: SessionHandle) -> Result<(), SessionError>;

    /// Ask the runtime for a display refresh rate.
    fn update_target_frame_rate(
        &mut self,
        session: SessionHandle,
        rate: f32,
    ) -> Result<(), SessionError>;
}

/// Restrictions on [`SessionManager::toggle`].
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct ToggleOptions {
    /// Never end a running session.
    pub enter_only: bool,
    /// Never start a new session.
    pub exit_only: bool,
}

/// What a lifecycle call did.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SessionTransition {
    /// A session was started.
    Started(SessionHandle),
    /// The running session was ended.
    Stopped,
    /// Nothing changed.
    Unchanged,
}

/// Lifecycle rules over an [`XrRuntime`].
#[derive(Debug)]
pub struct SessionManager<R> {
    runtime: R,
}

impl<R: XrRuntime> SessionManager<R> {
    /// Wrap a runtime.
    pub fn new(runtime: R) -> Self {
        Self { runtime }
    }

    /// The wrapped runtime.
    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    /// Mutable access to the wrapped runtime.
    pub fn runtime_mut(&mut self) -> &mut R {
        &mut self.runtime
    }

    /// Unwrap.
    pub fn into_runtime(self) -> R {
        self.runtime
    }

    /// Start a `mode` session unless one is already running.
    pub fn start<K>(
        &mut self,
        state: &mut XrState<K>,
        mode: SessionMode,
        init: Option<&SessionInit>,
    ) -> Result<SessionTransition, SessionError> {
        if state.session.is_some() {
            tracing::warn!("session already started, stop it first");
            return Ok(SessionTransition::Unchanged);
        }
        if !self.runtime.is_session_supported(mode)? {
            return Err(SessionError::Unsupported(mode));
        }
        let options = session_options(Some(state.reference_space), init);
        let handle = self.runtime.request_session(mode, options.as_ref())?;
        tracing::debug!(mode = mode.as_str(), ?handle, "session started");
        state.session = Some(handle);
        self.apply_frame_rate(state);
        Ok(SessionTransition::Started(handle))
    }

    /// End the running session, if any.
    pub fn stop<K>(&mut self, state: &mut XrState<K>) -> Result<SessionTransition, SessionError> {
        let Some(handle) = state.session else {
            tracing::warn!("no session to stop, start one first");
            return Ok(SessionTransition::Unchanged);
        };
        self.runtime.end_session(handle)?;
        tracing::debug!(?handle, "session stopped");
        state.session = None;
        Ok(SessionTransition::Stopped)
    }

    /// Stop a running session or start a new one, subject to `options`.
    pub fn toggle<K>(
        &mut self,
        state: &mut XrState<K>,
        mode: SessionMode,
        init: Option<&SessionInit>,
        options: ToggleOptions,
    ) -> Result<SessionTransition, SessionError> {
        match state.session {
            Some(_) if options.enter_only => Ok(SessionTransition::Unchanged),
            None if options.exit_only => Ok(SessionTransition::Unchanged),
            Some(_) => self.stop(state),
            None => self.start(state, mode, init),
        }
    }

    /// Forward the configured frame rate to the running session.
    ///
    /// Returns whether the runtime accepted it. Rejections are logged only.
    pub fn apply_frame_rate<K>(&mut self, state: &XrState<K>) -> bool {
        let (Some(session), Some(rate)) = (state.session, state.frame_rate) else {
            return false;
        };
        match self.runtime.update_target_frame_rate(session, rate) {
            Ok(()) => true,
            Err(error) => {
                tracing::debug!(rate, %error, "frame rate not configurable");
                false
            }
        }
    }
}
