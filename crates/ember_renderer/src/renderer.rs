//! Progressive renderer.
//!
//! Each [`Renderer::render`] call traces one path per pixel, adds it to a
//! per-pixel accumulator, and resolves `accumulator / frame_index` into an
//! RGBA8 image. Rows are traced in parallel with rayon; every row seeds its
//! own generator, so a frame is reproducible for a given renderer seed.
//!
//! Accumulation restarts (frame index back to 1, accumulator cleared) when
//! the scene revision, the camera revision or the settings differ from the
//! previous frame, on resize, on [`Renderer::reset_frame_index`], and on
//! every frame while `accumulate` is off.

use crate::{integrator::trace_path, Color, RayCamera, RenderSettings, SampleRng, Scene};
use ember_math::Ray;
use rand::SeedableRng;
use rayon::prelude::*;
use std::time::{Duration, Instant};

/// Timing and progress for one rendered frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameStats {
    /// Number of samples averaged into the image after this frame
    pub frame_index: u32,
    pub duration: Duration,
    /// Camera paths traced this frame
    pub paths: u64,
}

/// What the previous frame was rendered against.
#[derive(Debug, Clone, PartialEq)]
struct FrameInputs {
    scene_revision: u64,
    camera_revision: u64,
    settings: RenderSettings,
}

pub struct Renderer {
    width: u32,
    height: u32,
    accumulation: Vec<Color>,
    image: Vec<[u8; 4]>,

    /// Index of the next frame; 1 means the accumulator is about to restart
    frame_index: u32,
    /// Samples currently in the accumulator
    sample_count: u32,
    /// Total frames rendered, used to decorrelate seeds across frames
    frames_rendered: u64,
    seed: u64,

    last_inputs: Option<FrameInputs>,
    last_stats: Option<FrameStats>,
}

impl Renderer {
    /// Create an empty renderer. Call [`Renderer::on_resize`] before rendering.
    pub fn new(seed: u64) -> Self {
        Self {
            width: 0,
            height: 0,
            accumulation: Vec::new(),
            image: Vec::new(),
            frame_index: 1,
            sample_count: 0,
            frames_rendered: 0,
            seed,
            last_inputs: None,
            last_stats: None,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Index the next frame will be rendered as.
    pub fn frame_index(&self) -> u32 {
        self.frame_index
    }

    /// Number of frames averaged into the current image.
    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    pub fn last_frame_stats(&self) -> Option<FrameStats> {
        self.last_stats
    }

    /// Resolved image, row-major from the top-left pixel.
    pub fn image(&self) -> &[[u8; 4]] {
        &self.image
    }

    /// Resolved image as tightly packed RGBA8 bytes.
    pub fn image_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.image)
    }

    /// Resize the output. A no-op if the size is unchanged.
    pub fn on_resize(&mut self, width: u32, height: u32) {
        if width == self.width && height == self.height {
            return;
        }
        log::info!("Renderer resized to {}x{}", width, height);

        let pixels = width as usize * height as usize;
        self.width = width;
        self.height = height;
        self.accumulation = vec![Color::ZERO; pixels];
        self.image = vec![[0, 0, 0, 255]; pixels];
        self.reset_frame_index();
    }

    /// Restart accumulation on the next frame.
    pub fn reset_frame_index(&mut self) {
        self.frame_index = 1;
    }

    /// Render one progressive frame.
    pub fn render(
        &mut self,
        scene: &Scene,
        camera: &impl RayCamera,
        settings: &RenderSettings,
    ) -> FrameStats {
        let inputs = FrameInputs {
            scene_revision: scene.revision(),
            camera_revision: camera.revision(),
            settings: settings.clone(),
        };
        if self.last_inputs.as_ref() != Some(&inputs) {
            if let Some(previous) = &self.last_inputs {
                log::debug!("Accumulation reset: {}", reset_cause(previous, &inputs));
            }
            self.frame_index = 1;
            self.last_inputs = Some(inputs);
        }

        if self.frame_index == 1 {
            self.accumulation.fill(Color::ZERO);
        }

        let start = Instant::now();
        let frame_index = self.frame_index;
        let width = self.width as usize;
        let frame_seed = splitmix64(self.seed ^ splitmix64(self.frames_rendered));
        let origin = camera.position();

        if width > 0 {
            self.accumulation
                .par_chunks_mut(width)
                .zip(self.image.par_chunks_mut(width))
                .enumerate()
                .for_each(|(y, (accumulation_row, image_row))| {
                    let mut rng = SampleRng::seed_from_u64(splitmix64(frame_seed ^ y as u64));

                    for (x, (accumulated, pixel)) in accumulation_row
                        .iter_mut()
                        .zip(image_row.iter_mut())
                        .enumerate()
                    {
                        let ray = Ray::new(origin, camera.ray_direction(x as u32, y as u32));
                        let sample = trace_path(scene, ray, settings, &mut rng);

                        // A lone NaN would poison the pixel for the rest of the sequence
                        if sample.radiance.is_finite() {
                            *accumulated += sample.radiance;
                        }
                        *pixel = color_to_rgba(*accumulated / frame_index as f32);
                    }
                });
        }

        let stats = FrameStats {
            frame_index,
            duration: start.elapsed(),
            paths: self.accumulation.len() as u64,
        };
        log::debug!(
            "Frame {} rendered in {:.2}ms",
            stats.frame_index,
            stats.duration.as_secs_f64() * 1000.0
        );

        self.sample_count = frame_index;
        self.frames_rendered += 1;
        self.frame_index = if settings.accumulate {
            frame_index + 1
        } else {
            1
        };
        self.last_stats = Some(stats);

        stats
    }
}

fn reset_cause(previous: &FrameInputs, current: &FrameInputs) -> &'static str {
    if previous.scene_revision != current.scene_revision {
        "scene edited"
    } else if previous.camera_revision != current.camera_revision {
        "camera changed"
    } else {
        "settings changed"
    }
}

/// Clamp a linear colour to [0, 1] and convert to 8-bit RGBA.
pub fn color_to_rgba(color: Color) -> [u8; 4] {
    let r = (255.0 * color.x.clamp(0.0, 1.0)) as u8;
    let g = (255.0 * color.y.clamp(0.0, 1.0)) as u8;
    let b = (255.0 * color.z.clamp(0.0, 1.0)) as u8;
    [r, g, b, 255]
}

/// SplitMix64 finalizer, used to derive independent generator seeds.
fn splitmix64(x: u64) -> u64 {
    let mut z = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
