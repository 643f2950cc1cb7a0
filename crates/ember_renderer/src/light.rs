//! Delta lights sampled explicitly by the integrator.

use crate::Color;
use ember_math::Vec3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightKind {
    /// Omnidirectional light at a point, falling off with distance squared
    Point { position: Vec3 },
    /// Light arriving from infinitely far away along `direction`
    Distant { direction: Vec3 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub kind: LightKind,
    pub colour: Color,
    pub intensity: f32,
}

impl Light {
    pub fn point(position: Vec3, colour: Color, intensity: f32) -> Self {
        Self {
            kind: LightKind::Point { position },
            colour,
            intensity,
        }
    }

    /// A distant light shining along `direction`.
    pub fn distant(direction: Vec3, colour: Color, intensity: f32) -> Self {
        Self {
            kind: LightKind::Distant {
                direction: direction.try_normalize().unwrap_or(Vec3::NEG_Y),
            },
            colour,
            intensity,
        }
    }

    /// Unit vector from `point` toward the light.
    pub fn direction_from(&self, point: Vec3) -> Vec3 {
        match self.kind {
            LightKind::Point { position } => (position - point).try_normalize().unwrap_or(Vec3::Y),
            LightKind::Distant { direction } => -direction,
        }
    }

    /// Distance a shadow ray from `point` must travel to reach the light.
    pub fn distance_from(&self, point: Vec3) -> f32 {
        match self.kind {
            LightKind::Point { position } => position.distance(point),
            LightKind::Distant { .. } => f32::INFINITY,
        }
    }

    /// Radiance arriving at `point`, ignoring occlusion.
    pub fn radiance_at(&self, point: Vec3) -> Color {
        let emitted = self.colour * self.intensity;
        match self.kind {
            LightKind::Point { position } => {
                let d2 = position.distance_squared(point);
                if d2 > 0.0 {
                    emitted / d2
                } else {
                    Color::ZERO
                }
            }
            LightKind::Distant { .. } => emitted,
        }
    }
}
