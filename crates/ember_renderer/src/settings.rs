//! Per-frame render settings.

use serde::{Deserialize, Serialize};

/// Options the host passes to every [`Renderer::render`](crate::Renderer::render)
/// call. Any change from the previous frame restarts accumulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Average samples across frames instead of showing each frame alone
    pub accumulate: bool,
    /// Procedural sky gradient on miss instead of the scene background
    pub skybox: bool,
    /// Maximum number of surface interactions per path
    pub ray_depth: u32,
    /// Paths whose throughput falls below this in every channel stop early.
    /// Zero disables the cutoff.
    pub throughput_cutoff: f32,
    /// Sample scene lights explicitly at each diffuse or metal hit
    pub direct_lighting: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            accumulate: true,
            skybox: true,
            ray_depth: 5,
            throughput_cutoff: 0.01,
            direct_lighting: true,
        }
    }
}

impl RenderSettings {
    /// Upper bound on `ray_depth`.
    pub const MAX_RAY_DEPTH: u32 = 64;

    /// Settings with out-of-range values pulled back into range.
    ///
    /// `throughput_cutoff` is clamped to `[0, 1]` (non-finite becomes zero)
    /// and `ray_depth` to [`Self::MAX_RAY_DEPTH`]. Each adjustment logs a
    /// warning.
    pub fn clamped(mut self) -> Self {
        if !self.throughput_cutoff.is_finite() {
            log::warn!(
                "throughput_cutoff {} is not finite, using 0",
                self.throughput_cutoff
            );
            self.throughput_cutoff = 0.0;
        } else if !(0.0..=1.0).contains(&self.throughput_cutoff) {
            let cutoff = self.throughput_cutoff.clamp(0.0, 1.0);
            log::warn!(
                "throughput_cutoff {} out of range, clamped to {}",
                self.throughput_cutoff,
                cutoff
            );
            self.throughput_cutoff = cutoff;
        }

        if self.ray_depth > Self::MAX_RAY_DEPTH {
            log::warn!(
                "ray_depth {} clamped to {}",
                self.ray_depth,
                Self::MAX_RAY_DEPTH
            );
            self.ray_depth = Self::MAX_RAY_DEPTH;
        }
        self
    }
}
