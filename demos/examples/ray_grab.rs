// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Drag a box with the controller that selected it.
//!
//! The box follows the grabbing controller until that controller releases it;
//! a release from the other hand is ignored.
//!
//! Run:
//! - `cargo run -p understory_demos --example ray_grab`

use std::cell::RefCell;
use std::rc::Rc;

use glam::{Affine3A, Quat, Vec3};
use understory_scene3d::{Aabb3, LocalNode, Tree};
use understory_xr::adapters::scene3d::{apply_world_delta, spawn_controllers};
use understory_xr::events::{ControllerEvent, ControllerEventKind};
use understory_xr::grab::RayGrab;
use understory_xr::interaction::Interactive;
use understory_xr::{Handedness, InputSource, InteractionManager, XrState};

fn main() {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let mut tree = Tree::new();
    let cube = tree.insert(
        None,
        LocalNode::boxed(
            Aabb3::unit(),
            Affine3A::from_translation(Vec3::new(0.0, 0.0, -3.0)),
        ),
    );
    let slots = spawn_controllers(&mut tree, None, 2);
    let _ = tree.commit();

    let mut state = XrState::new(slots);
    let grab = Rc::new(RefCell::new(RayGrab::new()));
    let _mount = RayGrab::interactive(&grab, Interactive::new()).mount(state.interactions(), cube);

    state
        .connect_controller(0, InputSource::controller(Handedness::Right))
        .unwrap();
    state
        .connect_controller(1, InputSource::controller(Handedness::Left))
        .unwrap();
    state
        .set_controller_pose(1, Affine3A::from_translation(Vec3::new(-2.0, 0.0, 0.0)))
        .unwrap();

    let manager = InteractionManager::new();
    manager.update_frame(&mut state, &tree);
    manager.handle_event(&state, ControllerEvent::new(ControllerEventKind::SelectStart, 0));
    assert_eq!(grab.borrow().grabbing(), Some(0));

    // Swing the right controller a quarter turn to the left, in steps.
    for step in 1..=4_u8 {
        let yaw = core::f32::consts::FRAC_PI_8 * f32::from(step);
        state
            .set_controller_pose(0, Affine3A::from_quat(Quat::from_rotation_y(yaw)))
            .unwrap();
        if let Some(delta) = grab.borrow_mut().update(state.controllers()) {
            apply_world_delta(&mut tree, cube, delta);
        }
        let _ = tree.commit();
        let at = tree.world_transform(cube).unwrap().translation;
        println!("step {step}: cube at ({:+.2}, {:+.2}, {:+.2})", at.x, at.y, at.z);
    }

    // The other hand cannot release it.
    manager.handle_event(&state, ControllerEvent::new(ControllerEventKind::SelectEnd, 1));
    assert_eq!(grab.borrow().grabbing(), Some(0));
    manager.handle_event(&state, ControllerEvent::new(ControllerEventKind::SelectEnd, 0));
    assert_eq!(grab.borrow().grabbing(), None);

    let at = Vec3::from(tree.world_transform(cube).unwrap().translation);
    assert!((at - Vec3::new(-3.0, 0.0, 0.0)).length() < 1e-4);
}
