//! Smoothing kernels and small vector helpers shared by the stages.
//!
//! All distances passed in are at simulation scale (metres).

use glam::Vec3;
use pcisph_core::{KernelCoefficients, ParticleKind, SceneBounds};

/// Whether a position `w` tag marks a boundary particle.
#[inline]
pub fn is_boundary(tag: f32) -> bool {
    ParticleKind::from_tag(tag) == Some(ParticleKind::Boundary)
}

/// Poly6 weight for squared distance `r2`; zero outside the support.
#[inline]
pub fn poly6(c: &KernelCoefficients, r2: f32) -> f32 {
    if r2 >= c.h2 {
        return 0.0;
    }
    let d = c.h2 - r2;
    c.poly6 * d * d * d
}

/// Magnitude factor of the spiky gradient at distance `r`. Negative
/// inside the support, zero outside.
#[inline]
pub fn spiky_gradient(c: &KernelCoefficients, r: f32) -> f32 {
    if r >= c.h {
        return 0.0;
    }
    let d = c.h - r;
    c.spiky_gradient * d * d
}

/// Viscosity Laplacian at distance `r`.
#[inline]
pub fn viscosity_laplacian(c: &KernelCoefficients, r: f32) -> f32 {
    if r >= c.h {
        return 0.0;
    }
    c.viscosity_laplacian * (c.h - r)
}

/// Density a particle contributes to itself.
#[inline]
pub fn self_density(c: &KernelCoefficients, mass: f32) -> f32 {
    mass * poly6(c, 0.0)
}

/// `xyz` of element `i` of a stride-4 buffer.
#[inline]
pub fn load3(flat: &[f32], i: usize) -> Vec3 {
    Vec3::new(flat[i * 4], flat[i * 4 + 1], flat[i * 4 + 2])
}

/// Write `v` into the first three lanes of a stride-4 chunk.
#[inline]
pub fn store3(chunk: &mut [f32], v: Vec3) {
    chunk[0] = v.x;
    chunk[1] = v.y;
    chunk[2] = v.z;
}

/// Clamp a position into `bounds`.
#[inline]
pub fn clamp_position(p: Vec3, bounds: &SceneBounds) -> Vec3 {
    p.clamp(Vec3::from(bounds.min), Vec3::from(bounds.max))
}

/// Clamp `p` into `bounds`; on every violated axis the velocity
/// component is reversed and scaled by `damping`.
#[inline]
pub fn reflect(p: Vec3, v: Vec3, bounds: &SceneBounds, damping: f32) -> (Vec3, Vec3) {
    let mut p = p.to_array();
    let mut v = v.to_array();
    for axis in 0..3 {
        if p[axis] < bounds.min[axis] {
            p[axis] = bounds.min[axis];
            v[axis] = -v[axis] * damping;
        } else if p[axis] > bounds.max[axis] {
            p[axis] = bounds.max[axis];
            v[axis] = -v[axis] * damping;
        }
    }
    (Vec3::from(p), Vec3::from(v))
}
