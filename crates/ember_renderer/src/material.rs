//! Surface materials: scattering, BRDF evaluation and emission.
//!
//! The material set is closed, so a [`Material`] is one struct with a
//! [`MaterialKind`] tag rather than a trait object. Every sampling call takes
//! its random source explicitly so materials can be shared across render
//! threads.

use crate::brdf::{
    dielectric_r0, distribution_ggx, fresnel_schlick, fresnel_schlick_scalar, geometry_smith,
    reflect, refract, sample_ggx, DOT_FLOOR,
};
use crate::{Color, HitInfo};
use ember_math::{Ray, Vec3};
use rand::Rng;
use rand_distr::{Distribution, UnitSphere};
use std::f32::consts::PI;

/// Distance a scattered ray starts off the surface.
const SURFACE_OFFSET: f32 = 1e-4;

/// Floor for the refraction Jacobian denominator near grazing angles.
const REFRACTION_DENOM_FLOOR: f32 = 1e-4;

/// Per-variant material parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MaterialKind {
    /// Lambertian
    Diffuse,
    /// GGX microfacet conductor
    Metal,
    /// Rough glass with Fresnel-weighted reflection and refraction
    Dielectric { refractive_index: f32 },
    /// Light source; never scatters
    Emissive { strength: f32 },
}

/// A surface material.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    /// Albedo, specular tint, or emission colour depending on the kind
    pub base_colour: Color,
    /// Microfacet roughness. Zero is allowed; the GGX width is floored.
    pub roughness: f32,
    pub kind: MaterialKind,
}

/// A sampled continuation of a path.
#[derive(Debug, Clone, Copy)]
pub struct Scatter {
    pub ray: Ray,
    /// Solid-angle density of `ray.direction`
    pub pdf: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self::diffuse(Color::splat(0.8))
    }
}

impl Material {
    pub fn diffuse(albedo: Color) -> Self {
        Self {
            base_colour: albedo,
            roughness: 1.0,
            kind: MaterialKind::Diffuse,
        }
    }

    pub fn metal(colour: Color, roughness: f32) -> Self {
        Self {
            base_colour: colour,
            roughness,
            kind: MaterialKind::Metal,
        }
    }

    pub fn dielectric(tint: Color, roughness: f32, refractive_index: f32) -> Self {
        Self {
            base_colour: tint,
            roughness,
            kind: MaterialKind::Dielectric { refractive_index },
        }
    }

    pub fn emissive(colour: Color, strength: f32) -> Self {
        Self {
            base_colour: colour,
            roughness: 1.0,
            kind: MaterialKind::Emissive { strength },
        }
    }

    /// Radiance emitted by the surface.
    pub fn emitted(&self) -> Color {
        match self.kind {
            MaterialKind::Emissive { strength } => self.base_colour * strength,
            _ => Color::ZERO,
        }
    }

    /// True for surfaces that should receive explicit light samples.
    ///
    /// Glass is excluded: its transmission lobe cannot be reached by a
    /// shadow ray toward a delta light.
    pub fn receives_direct_light(&self) -> bool {
        matches!(self.kind, MaterialKind::Diffuse | MaterialKind::Metal)
    }

    /// Sample an outgoing ray, or `None` if the path is absorbed.
    pub fn scatter(&self, ray: &Ray, hit: &HitInfo, rng: &mut impl Rng) -> Option<Scatter> {
        match self.kind {
            MaterialKind::Diffuse => Some(self.scatter_diffuse(ray, hit, rng)),
            MaterialKind::Metal => self.scatter_metal(ray, hit, rng),
            MaterialKind::Dielectric { refractive_index } => {
                self.scatter_dielectric(ray, hit, refractive_index, rng)
            }
            MaterialKind::Emissive { .. } => None,
        }
    }

    /// BRDF value for light arriving along `light` and leaving along `view`.
    ///
    /// Both directions point away from the surface; `normal` is the outward
    /// geometric normal.
    pub fn brdf(&self, view: Vec3, light: Vec3, normal: Vec3) -> Color {
        match self.kind {
            MaterialKind::Diffuse => {
                if normal.dot(light) * normal.dot(view) <= 0.0 {
                    Color::ZERO
                } else {
                    self.base_colour / PI
                }
            }
            MaterialKind::Metal => self.brdf_metal(view, light, normal),
            MaterialKind::Dielectric { refractive_index } => {
                self.brdf_dielectric(view, light, normal, refractive_index)
            }
            MaterialKind::Emissive { .. } => Color::ZERO,
        }
    }

    fn scatter_diffuse(&self, ray: &Ray, hit: &HitInfo, rng: &mut impl Rng) -> Scatter {
        let n = face_forward(hit.normal, ray.direction);
        let offset = Vec3::from_array(UnitSphere.sample(rng));
        let mut direction = n + offset;

        // Catch degenerate scatter direction
        if direction.length_squared() < 1e-6 {
            direction = n;
        }
        let direction = direction.normalize();

        Scatter {
            ray: Ray::new(hit.position + n * SURFACE_OFFSET, direction),
            pdf: n.dot(direction).max(0.0) / PI,
        }
    }

    fn scatter_metal(&self, ray: &Ray, hit: &HitInfo, rng: &mut impl Rng) -> Option<Scatter> {
        let d = ray.direction.normalize();
        let n = face_forward(hit.normal, d);

        let h = sample_ggx(n, self.roughness, rng.gen(), rng.gen());
        let l = reflect(d, h);
        if n.dot(l) <= 0.0 {
            return None;
        }

        let n_dot_h = n.dot(h).max(DOT_FLOOR);
        let v_dot_h = (-d).dot(h).max(DOT_FLOOR);
        let pdf = distribution_ggx(n_dot_h, self.roughness) * n_dot_h / (4.0 * v_dot_h);

        Some(Scatter {
            ray: Ray::new(hit.position + n * SURFACE_OFFSET, l),
            pdf,
        })
    }

    fn brdf_metal(&self, view: Vec3, light: Vec3, normal: Vec3) -> Color {
        let normal = face_forward(normal, -view);
        let n_dot_v = normal.dot(view);
        let n_dot_l = normal.dot(light);
        if n_dot_v <= 0.0 || n_dot_l <= 0.0 {
            return Color::ZERO;
        }

        let h = (view + light).normalize();
        let d = distribution_ggx(normal.dot(h), self.roughness);
        let f = fresnel_schlick(view.dot(h).max(0.0), self.base_colour);
        let g = geometry_smith(n_dot_v, n_dot_l, self.roughness);

        d * f * g / (4.0 * n_dot_v.max(DOT_FLOOR) * n_dot_l.max(DOT_FLOOR))
    }

    fn scatter_dielectric(
        &self,
        ray: &Ray,
        hit: &HitInfo,
        refractive_index: f32,
        rng: &mut impl Rng,
    ) -> Option<Scatter> {
        let d = ray.direction.normalize();
        let v = -d;
        let interface = Interface::new(v, hit.normal, refractive_index);
        let n = interface.normal;

        let mut h = sample_ggx(n, self.roughness, rng.gen(), rng.gen());
        if v.dot(h) <= 0.0 {
            h = n;
        }
        let v_dot_h = v.dot(h).max(DOT_FLOOR);
        let n_dot_h = n.dot(h).max(DOT_FLOOR);
        let d_term = distribution_ggx(n_dot_h, self.roughness);

        let refracted = refract(d, h, interface.eta());
        let fresnel = interface.fresnel(v_dot_h, refracted.is_some());

        if rng.gen::<f32>() < fresnel {
            let l = reflect(d, h);
            if n.dot(l) <= 0.0 {
                return None;
            }
            let pdf = fresnel * d_term * n_dot_h / (4.0 * v_dot_h);
            return Some(Scatter {
                ray: Ray::new(hit.position + n * SURFACE_OFFSET, l),
                pdf,
            });
        }

        let l = refracted?.normalize();
        if n.dot(l) >= 0.0 {
            return None;
        }
        let l_dot_h = l.dot(h);
        let denom = interface.refraction_denominator(v_dot_h, l_dot_h);
        let pdf = (1.0 - fresnel) * d_term * n_dot_h * interface.eta_t * interface.eta_t
            * l_dot_h.abs()
            / denom;

        Some(Scatter {
            ray: Ray::new(hit.position - n * SURFACE_OFFSET, l),
            pdf,
        })
    }

    fn brdf_dielectric(
        &self,
        view: Vec3,
        light: Vec3,
        normal: Vec3,
        refractive_index: f32,
    ) -> Color {
        let interface = Interface::new(view, normal, refractive_index);
        let n = interface.normal;
        let n_dot_v = n.dot(view);
        let n_dot_l = n.dot(light);
        if n_dot_v <= 0.0 || n_dot_l == 0.0 {
            return Color::ZERO;
        }

        if n_dot_l > 0.0 {
            // Reflection lobe
            let h = (view + light).normalize();
            let v_dot_h = view.dot(h).max(DOT_FLOOR);
            let tir = refract(-view, h, interface.eta()).is_none();
            let fresnel = interface.fresnel(v_dot_h, !tir);

            let d = distribution_ggx(n.dot(h), self.roughness);
            let g = geometry_smith(n_dot_v, n_dot_l, self.roughness);
            return self.base_colour * (fresnel * d * g)
                / (4.0 * n_dot_v.max(DOT_FLOOR) * n_dot_l.max(DOT_FLOOR));
        }

        // Transmission lobe, generalized half-vector
        let mut h = -(interface.eta_i * view + interface.eta_t * light);
        if h.length_squared() < 1e-12 {
            return Color::ZERO;
        }
        h = h.normalize();
        if h.dot(n) < 0.0 {
            h = -h;
        }

        let v_dot_h = view.dot(h);
        let l_dot_h = light.dot(h);
        if v_dot_h <= 0.0 || l_dot_h >= 0.0 {
            return Color::ZERO;
        }
        if refract(-view, h, interface.eta()).is_none() {
            return Color::ZERO;
        }
        let fresnel = interface.fresnel(v_dot_h, true);

        let d = distribution_ggx(n.dot(h), self.roughness);
        let g = geometry_smith(n_dot_v, n_dot_l, self.roughness);
        let denom = interface.refraction_denominator(v_dot_h, l_dot_h);

        let value = v_dot_h * l_dot_h.abs() * interface.eta_t * interface.eta_t
            * (1.0 - fresnel)
            * d
            * g
            / (n_dot_v.max(DOT_FLOOR) * n_dot_l.abs().max(DOT_FLOOR) * denom);
        self.base_colour * value
    }
}

/// Flip `normal` to face against `incoming`. Opaque surfaces shade the
/// side the ray arrived from.
#[inline]
fn face_forward(normal: Vec3, incoming: Vec3) -> Vec3 {
    if normal.dot(incoming) > 0.0 {
        -normal
    } else {
        normal
    }
}

/// Which side of a dielectric boundary the view is on.
struct Interface {
    /// Surface normal flipped to the view side
    normal: Vec3,
    eta_i: f32,
    eta_t: f32,
}

impl Interface {
    fn new(view: Vec3, outward: Vec3, refractive_index: f32) -> Self {
        if view.dot(outward) >= 0.0 {
            Self {
                normal: outward,
                eta_i: 1.0,
                eta_t: refractive_index,
            }
        } else {
            Self {
                normal: -outward,
                eta_i: refractive_index,
                eta_t: 1.0,
            }
        }
    }

    #[inline]
    fn eta(&self) -> f32 {
        self.eta_i / self.eta_t
    }

    /// Reflected fraction; one under total internal reflection.
    #[inline]
    fn fresnel(&self, v_dot_h: f32, can_refract: bool) -> f32 {
        if can_refract {
            fresnel_schlick_scalar(v_dot_h, dielectric_r0(self.eta_i, self.eta_t))
        } else {
            1.0
        }
    }

    /// Squared `eta_i (v·h) + eta_t (l·h)`, floored.
    #[inline]
    fn refraction_denominator(&self, v_dot_h: f32, l_dot_h: f32) -> f32 {
        let denom = self.eta_i * v_dot_h + self.eta_t * l_dot_h;
        (denom * denom).max(REFRACTION_DENOM_FLOOR)
    }
}
