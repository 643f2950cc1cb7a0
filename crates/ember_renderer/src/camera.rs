//! Pinhole camera supplying per-pixel primary ray directions.
//!
//! The renderer only ever sees the [`RayCamera`] trait; projection math lives
//! here. [`Camera`] caches one direction per pixel and recomputes the cache
//! when it moves or the viewport changes size.

use ember_math::{Mat4, Vec3, Vec4};

/// What the renderer needs from a camera.
pub trait RayCamera: Sync {
    /// Origin of every primary ray.
    fn position(&self) -> Vec3;

    /// Unit direction through pixel `(x, y)`; `(0, 0)` is the top-left pixel.
    fn ray_direction(&self, x: u32, y: u32) -> Vec3;

    /// Counter that changes whenever the camera moves or is resized.
    fn revision(&self) -> u64;
}

#[derive(Debug, Clone)]
pub struct Camera {
    /// Vertical field of view in degrees
    vertical_fov: f32,
    near_clip: f32,
    far_clip: f32,

    position: Vec3,
    forward: Vec3,

    width: u32,
    height: u32,

    inverse_projection: Mat4,
    inverse_view: Mat4,
    ray_directions: Vec<Vec3>,
    revision: u64,
}

impl Camera {
    /// Create a camera at `(0, 0, 6)` looking down -Z. Call
    /// [`Camera::on_resize`] before rendering.
    pub fn new(vertical_fov: f32, near_clip: f32, far_clip: f32) -> Self {
        let mut camera = Self {
            vertical_fov,
            near_clip,
            far_clip,
            position: Vec3::new(0.0, 0.0, 6.0),
            forward: Vec3::NEG_Z,
            width: 0,
            height: 0,
            inverse_projection: Mat4::IDENTITY,
            inverse_view: Mat4::IDENTITY,
            ray_directions: Vec::new(),
            revision: 0,
        };
        camera.recalculate_view();
        camera
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn forward(&self) -> Vec3 {
        self.forward
    }

    pub fn vertical_fov(&self) -> f32 {
        self.vertical_fov
    }

    /// Resize the viewport. A no-op if the size is unchanged.
    pub fn on_resize(&mut self, width: u32, height: u32) {
        if width == self.width && height == self.height {
            return;
        }
        self.width = width;
        self.height = height;

        self.recalculate_projection();
        self.recalculate_ray_directions();
        self.touch();
    }

    pub fn set_vertical_fov(&mut self, degrees: f32) {
        if degrees == self.vertical_fov {
            return;
        }
        self.vertical_fov = degrees;
        self.recalculate_projection();
        self.recalculate_ray_directions();
        self.touch();
    }

    /// Place the camera at `position` looking along `forward`.
    pub fn set_view(&mut self, position: Vec3, forward: Vec3) {
        let forward = forward.try_normalize().unwrap_or(self.forward);
        if position == self.position && forward == self.forward {
            return;
        }
        self.position = position;
        self.forward = forward;

        self.recalculate_view();
        self.recalculate_ray_directions();
        self.touch();
    }

    pub fn look_at(&mut self, position: Vec3, target: Vec3) {
        self.set_view(position, target - position);
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    fn recalculate_projection(&mut self) {
        if self.width == 0 || self.height == 0 {
            return;
        }
        let aspect = self.width as f32 / self.height as f32;
        let projection = Mat4::perspective_rh(
            self.vertical_fov.to_radians(),
            aspect,
            self.near_clip,
            self.far_clip,
        );
        self.inverse_projection = projection.inverse();
    }

    fn recalculate_view(&mut self) {
        // look_at_rh degenerates when looking straight along the up axis
        let up = if self.forward.y.abs() > 0.999 { Vec3::Z } else { Vec3::Y };
        let view = Mat4::look_at_rh(self.position, self.position + self.forward, up);
        self.inverse_view = view.inverse();
    }

    fn recalculate_ray_directions(&mut self) {
        let (width, height) = (self.width as usize, self.height as usize);
        self.ray_directions.clear();
        self.ray_directions.reserve(width * height);

        for y in 0..height {
            for x in 0..width {
                // Pixel centre in normalized device coordinates, +y up
                let ndc_x = (x as f32 + 0.5) / width as f32 * 2.0 - 1.0;
                let ndc_y = 1.0 - (y as f32 + 0.5) / height as f32 * 2.0;

                let target = self.inverse_projection * Vec4::new(ndc_x, ndc_y, 1.0, 1.0);
                let local = (target.truncate() / target.w).normalize();
                let direction = (self.inverse_view * local.extend(0.0)).truncate();
                self.ray_directions.push(direction.normalize());
            }
        }
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(45.0, 0.1, 100.0)
    }
}

impl RayCamera for Camera {
    fn position(&self) -> Vec3 {
        self.position
    }

    fn ray_direction(&self, x: u32, y: u32) -> Vec3 {
        let index = y as usize * self.width as usize + x as usize;
        self.ray_directions
            .get(index)
            .copied()
            .unwrap_or(self.forward)
    }

    fn revision(&self) -> u64 {
        self.revision
    }
}
