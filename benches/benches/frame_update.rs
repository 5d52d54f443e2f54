// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use glam::{Affine3A, Quat, Vec3};
use understory_scene3d::{Aabb3, LocalNode, NodeId, Tree};
use understory_xr::adapters::scene3d::spawn_controllers;
use understory_xr::events::{ControllerEvent, ControllerEventKind};
use understory_xr::interaction::{Handler, InteractionEvent, InteractionKind};
use understory_xr::{Handedness, InputSource, InteractionManager, XrState};

/// An `n` x `n` wall of unit cubes 4 units in front of the origin, grouped by row.
fn gen_wall(n: usize) -> (Tree, Vec<NodeId>) {
    let mut tree = Tree::new();
    let mut cubes = Vec::with_capacity(n * n);
    let half = n as f32 * 0.75;
    for y in 0..n {
        let row = tree.insert(None, LocalNode::group(Affine3A::IDENTITY));
        for x in 0..n {
            let center = Vec3::new(x as f32 * 1.5 - half, y as f32 * 1.5 - half, -4.0);
            cubes.push(tree.insert(
                Some(row),
                LocalNode::boxed(Aabb3::unit(), Affine3A::from_translation(center)),
            ));
        }
    }
    let _ = tree.commit();
    (tree, cubes)
}

fn gen_state(tree: &mut Tree, cubes: &[NodeId]) -> XrState<NodeId> {
    let slots = spawn_controllers(tree, None, 2);
    let _ = tree.commit();
    let mut state = XrState::new(slots);
    let noop: Handler<NodeId> = Handler::new(|e: &InteractionEvent<'_, NodeId>| {
        black_box(e.intersection);
    });
    for cube in cubes {
        for kind in [
            InteractionKind::Hover,
            InteractionKind::Blur,
            InteractionKind::Move,
            InteractionKind::Select,
            InteractionKind::SelectMissed,
        ] {
            state.interactions().add(*cube, kind, noop.clone());
        }
    }
    state
        .connect_controller(0, InputSource::controller(Handedness::Left))
        .unwrap();
    state
        .connect_controller(1, InputSource::controller(Handedness::Right))
        .unwrap();
    state
}

/// Poses that sweep both rays across the wall, so most frames hover and blur.
fn sweep(step: usize) -> (Affine3A, Affine3A) {
    let angle = (step % 32) as f32 / 32.0 - 0.5;
    (
        Affine3A::from_rotation_translation(Quat::from_rotation_y(angle), Vec3::new(-0.5, 0.0, 0.0)),
        Affine3A::from_rotation_translation(Quat::from_rotation_x(angle), Vec3::new(0.5, 0.0, 0.0)),
    )
}

fn bench_update_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("update_frame");
    for &n in &[8_usize, 32] {
        group.throughput(Throughput::Elements((n * n) as u64));
        group.bench_function(format!("sweep_two_controllers_n{}", n), |b| {
            b.iter_batched(
                || {
                    let (mut tree, cubes) = gen_wall(n);
                    let state = gen_state(&mut tree, &cubes);
                    (tree, state)
                },
                |(tree, mut state)| {
                    let manager = InteractionManager::new();
                    for step in 0..32 {
                        let (left, right) = sweep(step);
                        state.set_controller_pose(0, left).unwrap();
                        state.set_controller_pose(1, right).unwrap();
                        black_box(manager.update_frame(&mut state, &tree));
                    }
                },
                BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

fn bench_handle_event(c: &mut Criterion) {
    let mut group = c.benchmark_group("handle_event");
    for &n in &[8_usize, 32] {
        let (mut tree, cubes) = gen_wall(n);
        let mut state = gen_state(&mut tree, &cubes);
        let manager = InteractionManager::new();
        manager.update_frame(&mut state, &tree);
        group.throughput(Throughput::Elements((n * n) as u64));
        group.bench_function(format!("select_n{}", n), |b| {
            b.iter(|| {
                black_box(manager.handle_event(
                    &state,
                    ControllerEvent::new(ControllerEventKind::Select, 0),
                ))
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_update_frame, bench_handle_event);
criterion_main!(benches);
