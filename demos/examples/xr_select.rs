// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Session lifecycle plus select/squeeze routing with missed fallbacks.
//!
//! A stand-in runtime starts an immersive session. Two controllers connect; the
//! left one points at a button, the right one at nothing. Selecting with each shows
//! the hovered and the missed path, and a raw subscription filtered to the right
//! hand sees only right-hand events.
//!
//! Run:
//! - `RUST_LOG=debug cargo run -p understory_demos --example xr_select`

use std::cell::RefCell;
use std::rc::Rc;

use glam::{Affine3A, Vec3};
use understory_scene3d::{Aabb3, LocalNode, NodeId, Tree};
use understory_xr::adapters::scene3d::spawn_controllers;
use understory_xr::events::{ControllerEvent, ControllerEventKind};
use understory_xr::interaction::{Handler, InteractionEvent, InteractionKind, Interactive};
use understory_xr::session::{
    SessionError, SessionHandle, SessionInit, SessionManager, SessionMode, SessionTransition,
    ToggleOptions, XrRuntime,
};
use understory_xr::{Handedness, InputSource, InteractionManager, XrConfig, XrState};

/// Supports VR only and refuses frame-rate changes.
#[derive(Debug, Default)]
struct DemoRuntime {
    sessions: u64,
}

impl XrRuntime for DemoRuntime {
    fn is_session_supported(&self, mode: SessionMode) -> Result<bool, SessionError> {
        Ok(mode != SessionMode::ImmersiveAr)
    }

    fn request_session(
        &mut self,
        mode: SessionMode,
        options: Option<&SessionInit>,
    ) -> Result<SessionHandle, SessionError> {
        self.sessions += 1;
        tracing::info!(mode = mode.as_str(), ?options, "runtime: request session");
        Ok(SessionHandle(self.sessions))
    }

    fn end_session(&mut self, session: SessionHandle) -> Result<(), SessionError> {
        tracing::info!(?session, "runtime: end session");
        Ok(())
    }

    fn update_target_frame_rate(
        &mut self,
        _session: SessionHandle,
        _rate: f32,
    ) -> Result<(), SessionError> {
        Err(SessionError::Runtime("fixed refresh rate".into()))
    }
}

fn main() {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let mut tree = Tree::new();
    let button = tree.insert(
        None,
        LocalNode::boxed(
            Aabb3::from_center_size(Vec3::ZERO, Vec3::new(0.4, 0.2, 0.1)),
            Affine3A::from_translation(Vec3::new(-1.0, 0.0, -2.0)),
        ),
    );
    let slots = spawn_controllers(&mut tree, None, 2);
    let _ = tree.commit();

    let mut state: XrState<NodeId> = XrState::new(slots);
    state.apply_config(&XrConfig {
        foveation: 0.5,
        frame_rate: Some(120.0),
        ..XrConfig::default()
    });

    let mut sessions = SessionManager::new(DemoRuntime::default());
    let init = SessionInit {
        optional_features: vec!["hand-tracking".into()],
        ..SessionInit::default()
    };
    assert_eq!(
        sessions.start(&mut state, SessionMode::ImmersiveAr, Some(&init)),
        Err(SessionError::Unsupported(SessionMode::ImmersiveAr))
    );
    let started = sessions
        .toggle(&mut state, SessionMode::ImmersiveVr, Some(&init), ToggleOptions::default())
        .unwrap();
    assert_eq!(started, SessionTransition::Started(SessionHandle(1)));
    state.on_session_start();
    // The rejected frame rate is not an error.
    assert_eq!(state.frame_rate(), Some(120.0));

    let log: Rc<RefCell<Vec<String>>> = Rc::default();
    let record = |label: &'static str| {
        let log = Rc::clone(&log);
        Handler::new(move |e: &InteractionEvent<'_, NodeId>| {
            log.borrow_mut().push(format!(
                "{label} from {:?} (intersection: {})",
                e.target.handedness(),
                e.intersection.is_some()
            ));
        })
    };
    let mount = Interactive::new()
        .with(InteractionKind::Select, record("select"))
        .with(InteractionKind::SelectMissed, record("select missed"))
        .with(InteractionKind::SqueezeMissed, record("squeeze missed"))
        .mount(state.interactions(), button);

    let raw_right = Rc::new(RefCell::new(0));
    let r = Rc::clone(&raw_right);
    state
        .events()
        .subscribe(ControllerEventKind::Select, Some(Handedness::Right), move |_| {
            *r.borrow_mut() += 1;
        });

    state
        .connect_controller(0, InputSource::controller(Handedness::Left))
        .unwrap();
    state
        .connect_controller(1, InputSource::hand(Handedness::Right))
        .unwrap();
    state.on_input_sources_change(&[
        InputSource::controller(Handedness::Left),
        InputSource::hand(Handedness::Right),
    ]);
    state
        .set_controller_pose(0, Affine3A::from_translation(Vec3::new(-1.0, 0.0, 0.0)))
        .unwrap();
    state
        .set_controller_pose(1, Affine3A::from_translation(Vec3::new(1.0, 0.0, 0.0)))
        .unwrap();

    let manager = InteractionManager::new();
    manager.update_frame(&mut state, &tree);

    for event in [
        ControllerEvent::new(ControllerEventKind::Select, 0),
        ControllerEvent::new(ControllerEventKind::Select, 1),
        ControllerEvent::new(ControllerEventKind::Squeeze, 1),
        ControllerEvent::new(ControllerEventKind::SelectStart, 1),
    ] {
        let report = manager.handle_event(&state, event);
        println!(
            "{} on slot {}: {} handler(s), {} raw",
            event.kind.as_str(),
            event.controller,
            report.delivered,
            report.notified
        );
    }
    for line in log.borrow().iter() {
        println!("  {line}");
    }
    assert_eq!(
        *log.borrow(),
        vec![
            "select from Some(Left) (intersection: true)".to_string(),
            "select missed from Some(Right) (intersection: false)".to_string(),
            "squeeze missed from Some(Right) (intersection: false)".to_string(),
        ]
    );
    assert_eq!(*raw_right.borrow(), 1);
    assert!(state.is_hand_tracking());

    mount.unmount(state.interactions());
    assert!(!state.interactions().has(&button, InteractionKind::Select));

    assert_eq!(sessions.stop(&mut state).unwrap(), SessionTransition::Stopped);
    state.on_session_end();
    assert!(!state.is_presenting());
    // Stopping twice only warns.
    assert_eq!(sessions.stop(&mut state).unwrap(), SessionTransition::Unchanged);
}
