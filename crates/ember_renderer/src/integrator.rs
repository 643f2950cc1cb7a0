//! Path tracing integrator.
//!
//! Follows one camera path through the scene, weighting each bounce by
//! `brdf * |cos| / pdf`, and reports how the path ended.

use crate::{Color, HitInfo, Material, RenderSettings, Scene};
use ember_math::{Ray, Vec3};
use rand::Rng;

/// Offset for shadow ray origins along the surface normal.
pub const SHADOW_BIAS: f32 = 0.001;

/// Smallest sampling density used as a divisor.
const PDF_FLOOR: f32 = 1e-5;

/// Sky colour straight up.
const SKY_ZENITH: Color = Color::new(0.6, 0.7, 0.9);

/// Why a path stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathEnd {
    /// Left the scene and picked up the sky or background
    Miss,
    /// Hit an emissive surface
    Emitted,
    /// The material declined to scatter
    Absorbed,
    /// Used every allowed bounce
    DepthExhausted,
    /// Throughput dropped below the configured cutoff
    ThroughputCutoff,
}

/// Radiance estimate for one camera path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathSample {
    pub radiance: Color,
    /// Number of scattering events along the path
    pub bounces: u32,
    pub end: PathEnd,
}

/// Procedural sky: white at the horizon blending to blue overhead.
pub fn sky_colour(direction: Vec3) -> Color {
    let unit = direction.try_normalize().unwrap_or(Vec3::Y);
    let t = 0.5 * (unit.y + 1.0);
    Color::ONE * (1.0 - t) + SKY_ZENITH * t
}

/// Trace one path starting with `ray`.
pub fn trace_path(
    scene: &Scene,
    ray: Ray,
    settings: &RenderSettings,
    rng: &mut impl Rng,
) -> PathSample {
    let mut radiance = Color::ZERO;
    let mut throughput = Color::ONE;
    let mut ray = ray;

    for bounce in 0..settings.ray_depth {
        let hit = scene.trace_ray(&ray);
        if !hit.did_hit() {
            let background = if settings.skybox {
                sky_colour(ray.direction)
            } else {
                scene.background()
            };
            radiance += throughput * background;
            return PathSample {
                radiance,
                bounces: bounce,
                end: PathEnd::Miss,
            };
        }

        let material = &scene.materials()[hit.material];

        let emitted = material.emitted();
        if emitted != Color::ZERO {
            radiance += throughput * emitted;
            return PathSample {
                radiance,
                bounces: bounce,
                end: PathEnd::Emitted,
            };
        }

        let view = -ray.direction;
        if settings.direct_lighting && material.receives_direct_light() {
            radiance += throughput * direct_lighting(scene, material, &hit, view);
        }

        let Some(scatter) = material.scatter(&ray, &hit, rng) else {
            return PathSample {
                radiance,
                bounces: bounce,
                end: PathEnd::Absorbed,
            };
        };

        let light = scatter.ray.direction;
        let brdf = material.brdf(view, light, hit.normal);
        throughput *= brdf * hit.normal.dot(light).abs() / scatter.pdf.max(PDF_FLOOR);
        ray = scatter.ray;

        // Flat cutoff; surviving paths are not reweighted
        if settings.throughput_cutoff > 0.0 && throughput.max_element() < settings.throughput_cutoff
        {
            return PathSample {
                radiance,
                bounces: bounce + 1,
                end: PathEnd::ThroughputCutoff,
            };
        }
    }

    PathSample {
        radiance,
        bounces: settings.ray_depth,
        end: PathEnd::DepthExhausted,
    }
}

/// Unoccluded contribution of every scene light at a hit.
fn direct_lighting(scene: &Scene, material: &Material, hit: &HitInfo, view: Vec3) -> Color {
    let origin = hit.position + hit.normal * SHADOW_BIAS;

    scene.lights().iter().fold(Color::ZERO, |total, light| {
        let l = light.direction_from(hit.position);
        let n_dot_l = hit.normal.dot(l);
        if n_dot_l <= 0.0 {
            return total;
        }

        let shadow = Ray::new(origin, l);
        if scene.is_occluded(&shadow, light.distance_from(origin)) {
            return total;
        }

        total + material.brdf(view, l, hit.normal) * n_dot_l * light.radiance_at(hit.position)
    })
}
