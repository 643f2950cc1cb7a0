//! GGX microfacet helpers shared by the materials.
//!
//! Roughness is the artist-facing parameter; the distribution width is
//! `alpha = roughness²`, floored so a perfectly smooth surface never divides
//! by zero. The same alpha drives evaluation and importance sampling.

use crate::Color;
use ember_math::Vec3;
use std::f32::consts::PI;

/// Floor for dot products used as divisors.
pub(crate) const DOT_FLOOR: f32 = 1e-4;

/// Smallest GGX width. Below this `D` near the peak is lost to f32 rounding
/// and sampled and evaluated densities disagree.
const MIN_ALPHA: f32 = 1e-2;

/// GGX width parameter for a roughness value.
#[inline]
pub fn alpha(roughness: f32) -> f32 {
    (roughness * roughness).max(MIN_ALPHA)
}

/// GGX/Trowbridge-Reitz normal distribution `D`.
#[inline]
pub fn distribution_ggx(n_dot_h: f32, roughness: f32) -> f32 {
    let a = alpha(roughness);
    let a2 = a * a;
    let n_dot_h = n_dot_h.max(0.0);
    let denom = n_dot_h * n_dot_h * (a2 - 1.0) + 1.0;
    a2 / (PI * denom * denom)
}

/// Schlick weight `(1 - cos)^5`.
#[inline]
fn schlick_weight(cos_theta: f32) -> f32 {
    let x = (1.0 - cos_theta).clamp(0.0, 1.0);
    let x2 = x * x;
    x2 * x2 * x
}

/// Schlick Fresnel with a coloured reflectance at normal incidence.
#[inline]
pub fn fresnel_schlick(cos_theta: f32, f0: Color) -> Color {
    f0 + (Color::ONE - f0) * schlick_weight(cos_theta)
}

/// Schlick Fresnel for a scalar reflectance at normal incidence.
#[inline]
pub fn fresnel_schlick_scalar(cos_theta: f32, r0: f32) -> f32 {
    r0 + (1.0 - r0) * schlick_weight(cos_theta)
}

/// Reflectance at normal incidence between two media.
#[inline]
pub fn dielectric_r0(eta_i: f32, eta_t: f32) -> f32 {
    let r = (eta_i - eta_t) / (eta_i + eta_t);
    r * r
}

/// Single-direction Schlick-GGX masking term.
#[inline]
pub fn geometry_schlick_ggx(n_dot_x: f32, roughness: f32) -> f32 {
    let r = roughness + 1.0;
    let k = r * r / 8.0;
    let n_dot_x = n_dot_x.abs();
    n_dot_x / (n_dot_x * (1.0 - k) + k)
}

/// Smith masking-shadowing `G` from the view and light terms.
#[inline]
pub fn geometry_smith(n_dot_v: f32, n_dot_l: f32, roughness: f32) -> f32 {
    geometry_schlick_ggx(n_dot_v, roughness) * geometry_schlick_ggx(n_dot_l, roughness)
}

/// Importance-sample a GGX half-vector around `n` from two uniform numbers.
///
/// The density of the returned vector is `D(n·h) * (n·h)`.
pub fn sample_ggx(n: Vec3, roughness: f32, u1: f32, u2: f32) -> Vec3 {
    let a = alpha(roughness);
    let a2 = a * a;

    let cos_theta = ((1.0 - u1) / (1.0 + (a2 - 1.0) * u1)).max(0.0).sqrt();
    let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
    let phi = 2.0 * PI * u2;

    let (tangent, bitangent) = orthonormal_basis(n);
    (tangent * (sin_theta * phi.cos()) + bitangent * (sin_theta * phi.sin()) + n * cos_theta)
        .normalize()
}

/// Build a tangent frame around a unit normal.
pub fn orthonormal_basis(n: Vec3) -> (Vec3, Vec3) {
    // Any axis not parallel to n will do
    let helper = if n.z.abs() < 0.999 { Vec3::Z } else { Vec3::X };
    let tangent = helper.cross(n).normalize();
    let bitangent = n.cross(tangent);
    (tangent, bitangent)
}

/// Reflect a vector about a surface normal.
#[inline]
pub fn reflect(v: Vec3, n: Vec3) -> Vec3 {
    v - 2.0 * v.dot(n) * n
}

/// Refract unit vector `v` through a surface with normal `n` facing against
/// it, with `eta = eta_i / eta_t`. `None` means total internal reflection.
#[inline]
pub fn refract(v: Vec3, n: Vec3, eta: f32) -> Option<Vec3> {
    let cos_i = (-v).dot(n).min(1.0);
    let sin2_t = eta * eta * (1.0 - cos_i * cos_i).max(0.0);
    if sin2_t > 1.0 {
        return None;
    }
    let cos_t = (1.0 - sin2_t).sqrt();
    Some(eta * v + (eta * cos_i - cos_t) * n)
}
