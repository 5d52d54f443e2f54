// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use glam::{Affine3A, Vec3};

use crate::types::Aabb3;

/// Transform an axis-aligned box by an affine and return a conservative
/// axis-aligned bounding box in the target space.
pub(crate) fn transform_aabb(affine: Affine3A, b: Aabb3) -> Aabb3 {
    let mut out: Option<Aabb3> = None;
    for i in 0..8_u8 {
        let corner = Vec3::new(
            if i & 1 == 0 { b.min.x } else { b.max.x },
            if i & 2 == 0 { b.min.y } else { b.max.y },
            if i & 4 == 0 { b.min.z } else { b.max.z },
        );
        let p = affine.transform_point3(corner);
        out = Some(match out {
            None => Aabb3 { min: p, max: p },
            Some(acc) => Aabb3 {
                min: acc.min.min(p),
                max: acc.max.max(p),
            },
        });
    }
    out.unwrap_or(b)
}

/// Slab test of a (not necessarily normalized) ray against a box.
///
/// Returns the ray parameter of the nearest hit at or in front of the origin
/// and the outward normal of the face that was crossed. When the origin lies
/// inside the box the exit face is reported.
pub(crate) fn ray_aabb(origin: Vec3, dir: Vec3, b: &Aabb3) -> Option<(f32, Vec3)> {
    let mut t_enter = f32::NEG_INFINITY;
    let mut t_exit = f32::INFINITY;
    let mut enter_normal = Vec3::ZERO;
    let mut exit_normal = Vec3::ZERO;
    for axis in 0..3 {
        let o = origin[axis];
        let d = dir[axis];
        let (lo, hi) = (b.min[axis], b.max[axis]);
        if d.abs() <= f32::EPSILON {
            if o < lo || o > hi {
                return None;
            }
            continue;
        }
        let inv = 1.0 / d;
        let (mut t0, mut t1) = ((lo - o) * inv, (hi - o) * inv);
        // Normal of the face crossed first along this axis faces against the ray.
        let mut n0 = Vec3::ZERO;
        n0[axis] = -d.signum();
        let mut n1 = Vec3::ZERO;
        n1[axis] = d.signum();
        if t0 > t1 {
            core::mem::swap(&mut t0, &mut t1);
        }
        if t0 > t_enter {
            t_enter = t0;
            enter_normal = n0;
        }
        if t1 < t_exit {
            t_exit = t1;
            exit_normal = n1;
        }
        if t_enter > t_exit {
            return None;
        }
    }
    if t_exit < 0.0 {
        return None;
    }
    if t_enter >= 0.0 {
        Some((t_enter, enter_normal))
    } else {
        Some((t_exit, exit_normal))
    }
}
