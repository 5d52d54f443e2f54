// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Hover, move and blur from a controller ray sweeping over a small scene.
//!
//! A table holds two cups. The table and one cup register hover and blur; the
//! other cup only registers move. Hovering a cup also hovers the table, child first.
//!
//! Run:
//! - `RUST_LOG=trace cargo run -p understory_demos --example xr_hover`

use std::cell::RefCell;
use std::rc::Rc;

use glam::{Affine3A, Quat, Vec3};
use understory_scene3d::{Aabb3, LocalNode, NodeId, Tree};
use understory_xr::adapters::scene3d::{spawn_controllers, sync_controller_poses};
use understory_xr::interaction::{Handler, InteractionEvent, InteractionKind};
use understory_xr::{Handedness, InputSource, InteractionManager, XrState};

fn main() {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let mut tree = Tree::new();
    let player = tree.insert(None, LocalNode::group(Affine3A::IDENTITY));
    let table = tree.insert(
        None,
        LocalNode::group(Affine3A::from_translation(Vec3::new(0.0, 0.0, -3.0))),
    );
    let left_cup = tree.insert(
        Some(table),
        LocalNode::boxed(
            Aabb3::from_center_size(Vec3::ZERO, Vec3::splat(0.3)),
            Affine3A::from_translation(Vec3::new(-0.5, 0.0, 0.0)),
        ),
    );
    let right_cup = tree.insert(
        Some(table),
        LocalNode::boxed(
            Aabb3::from_center_size(Vec3::ZERO, Vec3::splat(0.3)),
            Affine3A::from_translation(Vec3::new(0.5, 0.0, 0.0)),
        ),
    );
    let slots = spawn_controllers(&mut tree, Some(player), 2);
    let _ = tree.commit();

    let names = [(table, "table"), (left_cup, "left cup"), (right_cup, "right cup")];
    let name_of = move |n: NodeId| {
        names
            .iter()
            .find(|(id, _)| *id == n)
            .map_or("?", |(_, name)| *name)
    };

    let mut state = XrState::new(slots);
    let log: Rc<RefCell<Vec<String>>> = Rc::default();
    let record = |kind: InteractionKind| {
        let log = Rc::clone(&log);
        Handler::new(move |e: &InteractionEvent<'_, NodeId>| {
            let object = e.intersection.map(|i| i.object);
            log.borrow_mut()
                .push(format!("{} (hit {:?})", kind.name(), object.map(name_of)));
        })
    };
    for node in [table, left_cup] {
        state.interactions().add(node, InteractionKind::Hover, record(InteractionKind::Hover));
        state.interactions().add(node, InteractionKind::Blur, record(InteractionKind::Blur));
    }
    state
        .interactions()
        .add(right_cup, InteractionKind::Move, record(InteractionKind::Move));

    state
        .connect_controller(0, InputSource::controller(Handedness::Right))
        .unwrap();

    let manager = InteractionManager::new();
    // Aim at the left cup, then the right cup, then away.
    let yaws = [0.165_f32, -0.165, 1.2];
    let mut frames = Vec::new();
    for yaw in yaws {
        state
            .set_controller_pose(0, Affine3A::from_quat(Quat::from_rotation_y(yaw)))
            .unwrap();
        sync_controller_poses(&state, &mut tree);
        let _ = tree.commit();
        let report = manager.update_frame(&mut state, &tree);
        println!(
            "yaw {yaw:+.3}: hovered {:?}, blurred {:?}, ray length {:.2}",
            report.hovered.iter().map(|(_, n)| name_of(*n)).collect::<Vec<_>>(),
            report.blurred.iter().map(|(_, n)| name_of(*n)).collect::<Vec<_>>(),
            state.hover().ray_length(Handedness::Right),
        );
        frames.push(report);
    }

    for line in log.borrow().iter() {
        println!("  {line}");
    }

    assert_eq!(
        frames[0].hovered,
        vec![(Handedness::Right, left_cup), (Handedness::Right, table)]
    );
    // The table stays hovered through the right cup, so only the left cup blurs.
    assert_eq!(frames[1].blurred, vec![(Handedness::Right, left_cup)]);
    assert!(frames[1].hovered.is_empty());
    assert_eq!(frames[2].blurred.len(), 2);
    assert_eq!(state.hover().hovered(Handedness::Right).count(), 0);
}
