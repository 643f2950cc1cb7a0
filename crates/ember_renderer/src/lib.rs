//! ember renderer - progressive CPU path tracing
//!
//! A Monte Carlo path tracer that refines an image frame by frame:
//! a 7-slab BVH for nearest-hit queries, a GGX microfacet material model,
//! and a per-pixel accumulation buffer rendered in parallel with rayon.
//!
//! The host owns the window, the UI and the camera controls. It talks to
//! the renderer through [`Scene`] edits, a [`RayCamera`], a
//! [`RenderSettings`] value passed to every [`Renderer::render`] call, and
//! the resolved RGBA8 image.

mod brdf;
mod bvh;
mod camera;
mod error;
mod hit;
mod integrator;
mod light;
mod material;
mod primitive;
mod renderer;
mod scene;
mod settings;

pub use bvh::{Bvh, BvhNode, BvhStats};
pub use camera::{Camera, RayCamera};
pub use error::{Result, SceneError};
pub use hit::{HitInfo, HIT_EPSILON};
pub use integrator::{sky_colour, trace_path, PathEnd, PathSample};
pub use light::{Light, LightKind};
pub use material::{Material, MaterialKind, Scatter};
pub use primitive::{Primitive, Shape};
pub use renderer::{color_to_rgba, FrameStats, Renderer};
pub use scene::Scene;
pub use settings::RenderSettings;

/// Re-export Vec3 and common math types from ember_math
pub use ember_math::{Extent, PlaneSet, Ray, Vec3};

/// Color type alias (linear RGB radiance)
pub type Color = Vec3;

/// Per-thread generator used for all sampling.
pub type SampleRng = rand_xoshiro::Xoshiro256Plus;
