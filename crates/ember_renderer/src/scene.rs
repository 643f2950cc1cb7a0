//! Scene container: primitives, materials, lights and the BVH over them.
//!
//! Every edit goes through a method here so the BVH can never go stale:
//! structural edits rebuild it synchronously before returning. Each edit
//! also bumps [`Scene::revision`], which the renderer watches to restart
//! accumulation.

use crate::{Bvh, Color, HitInfo, Light, Material, Primitive, Result, SceneError};
use ember_math::{Ray, Vec3};

#[derive(Debug, Clone)]
pub struct Scene {
    primitives: Vec<Primitive>,
    materials: Vec<Material>,
    lights: Vec<Light>,
    background: Color,
    bvh: Bvh,
    revision: u64,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    /// An empty scene with a black background.
    pub fn new() -> Self {
        Self {
            primitives: Vec::new(),
            materials: Vec::new(),
            lights: Vec::new(),
            background: Color::ZERO,
            bvh: Bvh::default(),
            revision: 0,
        }
    }

    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    pub fn background(&self) -> Color {
        self.background
    }

    pub fn bvh(&self) -> &Bvh {
        &self.bvh
    }

    /// Counter bumped by every edit.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    fn rebuild(&mut self) {
        self.bvh = Bvh::build(&self.primitives);
        self.touch();

        let stats = self.bvh.stats();
        log::info!(
            "Rebuilt BVH: {} primitives, {} nodes, {} leaves, depth {}",
            self.primitives.len(),
            stats.nodes,
            stats.leaves,
            stats.max_depth
        );
    }

    fn check_primitive(&self, primitive: &Primitive) -> Result<()> {
        primitive.validate()?;
        if primitive.material >= self.materials.len() {
            return Err(SceneError::MaterialOutOfRange {
                index: primitive.material,
                len: self.materials.len(),
            });
        }
        Ok(())
    }

    fn check_primitive_index(&self, index: usize) -> Result<()> {
        if index >= self.primitives.len() {
            return Err(SceneError::PrimitiveOutOfRange {
                index,
                len: self.primitives.len(),
            });
        }
        Ok(())
    }

    // Materials

    /// Add a material and return its index.
    pub fn add_material(&mut self, material: Material) -> usize {
        self.materials.push(material);
        self.touch();
        self.materials.len() - 1
    }

    pub fn material(&self, index: usize) -> Option<&Material> {
        self.materials.get(index)
    }

    /// Mutable access to a material. Counts as an edit even if the caller
    /// ends up changing nothing.
    pub fn material_mut(&mut self, index: usize) -> Option<&mut Material> {
        if index < self.materials.len() {
            self.touch();
        }
        self.materials.get_mut(index)
    }

    /// Remove an unreferenced material. Primitives using later materials are
    /// re-pointed at the shifted indices.
    pub fn remove_material(&mut self, index: usize) -> Result<Material> {
        if index >= self.materials.len() {
            return Err(SceneError::MaterialOutOfRange {
                index,
                len: self.materials.len(),
            });
        }
        if self.primitives.iter().any(|p| p.material == index) {
            return Err(SceneError::MaterialInUse { index });
        }

        let removed = self.materials.remove(index);
        for primitive in &mut self.primitives {
            if primitive.material > index {
                primitive.material -= 1;
            }
        }
        self.touch();
        Ok(removed)
    }

    // Primitives

    /// Add a primitive and return its index.
    pub fn add_primitive(&mut self, primitive: Primitive) -> Result<usize> {
        self.check_primitive(&primitive)?;
        self.primitives.push(primitive);
        self.rebuild();
        Ok(self.primitives.len() - 1)
    }

    pub fn add_sphere(&mut self, position: Vec3, radius: f32, material: usize) -> Result<usize> {
        self.add_primitive(Primitive::sphere(position, radius, material))
    }

    /// Replace a primitive (move, resize or re-material it).
    pub fn set_primitive(&mut self, index: usize, primitive: Primitive) -> Result<()> {
        self.check_primitive_index(index)?;
        self.check_primitive(&primitive)?;
        self.primitives[index] = primitive;
        self.rebuild();
        Ok(())
    }

    /// Remove a primitive. Later primitives shift down by one.
    pub fn remove_primitive(&mut self, index: usize) -> Result<Primitive> {
        self.check_primitive_index(index)?;
        let removed = self.primitives.remove(index);
        self.rebuild();
        Ok(removed)
    }

    /// Apply a batch of primitive edits with a single rebuild.
    ///
    /// If any primitive is invalid afterwards, the whole batch is rolled back
    /// and the first error is returned.
    pub fn edit_primitives<R>(&mut self, edit: impl FnOnce(&mut Vec<Primitive>) -> R) -> Result<R> {
        let previous = self.primitives.clone();
        let result = edit(&mut self.primitives);

        if let Some(err) = self
            .primitives
            .iter()
            .find_map(|p| self.check_primitive(p).err())
        {
            self.primitives = previous;
            return Err(err);
        }

        self.rebuild();
        Ok(result)
    }

    // Lights and background

    pub fn add_light(&mut self, light: Light) -> usize {
        self.lights.push(light);
        self.touch();
        self.lights.len() - 1
    }

    /// Mutable access to the light list. Counts as an edit.
    pub fn lights_mut(&mut self) -> &mut Vec<Light> {
        self.touch();
        &mut self.lights
    }

    pub fn set_background(&mut self, colour: Color) {
        if colour != self.background {
            self.background = colour;
            self.touch();
        }
    }

    // Queries

    /// Nearest hit along `ray`, or [`HitInfo::MISS`].
    pub fn trace_ray(&self, ray: &Ray) -> HitInfo {
        let Some((index, distance)) =
            self.bvh.nearest_hit(&self.primitives, ray, f32::INFINITY)
        else {
            return HitInfo::MISS;
        };

        let primitive = &self.primitives[index];
        debug_assert!(
            primitive.material < self.materials.len(),
            "primitive {index} references missing material {}",
            primitive.material
        );

        let position = ray.at(distance);
        HitInfo {
            distance,
            position,
            normal: primitive.normal(position),
            primitive: index,
            material: primitive.material,
        }
    }

    /// True if anything lies along `ray` closer than `max_distance`.
    pub fn is_occluded(&self, ray: &Ray, max_distance: f32) -> bool {
        self.bvh.any_hit(&self.primitives, ray, max_distance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene_with_sphere() -> Scene {
        let mut scene = Scene::new();
        let material = scene.add_material(Material::diffuse(Color::splat(0.5)));
        scene
            .add_sphere(Vec3::new(0.0, 0.0, -5.0), 1.0, material)
            .unwrap();
        scene
    }

    #[test]
    fn test_empty_scene_misses() {
        let scene = Scene::new();
        let hit = scene.trace_ray(&Ray::new(Vec3::ZERO, Vec3::NEG_Z));
        assert!(!hit.did_hit());
        assert!(hit.distance < 0.0);
        assert!(!scene.is_occluded(&Ray::new(Vec3::ZERO, Vec3::NEG_Z), f32::INFINITY));
    }

    #[test]
    fn test_trace_ray_fills_hit() {
        let scene = scene_with_sphere();
        let hit = scene.trace_ray(&Ray::new(Vec3::ZERO, Vec3::NEG_Z));

        assert!(hit.did_hit());
        assert_eq!(hit.distance, 4.0);
        assert!((hit.position - Vec3::new(0.0, 0.0, -4.0)).length() < 1e-5);
        assert!((hit.normal - Vec3::Z).length() < 1e-5);
        assert_eq!(hit.primitive, 0);
        assert_eq!(hit.material, 0);
    }

    #[test]
    fn test_add_primitive_rejects_bad_material() {
        let mut scene = Scene::new();
        let err = scene.add_sphere(Vec3::ZERO, 1.0, 3).unwrap_err();
        assert_eq!(err, SceneError::MaterialOutOfRange { index: 3, len: 0 });
        assert!(scene.primitives().is_empty());
    }

    #[test]
    fn test_add_primitive_rejects_bad_shape() {
        let mut scene = Scene::new();
        let material = scene.add_material(Material::default());
        assert!(matches!(
            scene.add_sphere(Vec3::ZERO, -1.0, material),
            Err(SceneError::InvalidShape(_))
        ));
    }

    #[test]
    fn test_edits_bump_revision() {
        let mut scene = scene_with_sphere();
        let mut revision = scene.revision();

        scene.set_primitive(0, Primitive::sphere(Vec3::new(0.0, 0.0, -10.0), 1.0, 0)).unwrap();
        assert!(scene.revision() > revision);
        revision = scene.revision();

        scene.material_mut(0).unwrap().base_colour = Color::ONE;
        assert!(scene.revision() > revision);
        revision = scene.revision();

        scene.set_background(Color::ONE);
        assert!(scene.revision() > revision);
        revision = scene.revision();

        // Unchanged background is not an edit
        scene.set_background(Color::ONE);
        assert_eq!(scene.revision(), revision);
    }

    #[test]
    fn test_moved_primitive_is_found_at_new_position() {
        let mut scene = scene_with_sphere();
        scene.set_primitive(0, Primitive::sphere(Vec3::new(0.0, 0.0, -10.0), 1.0, 0)).unwrap();

        let hit = scene.trace_ray(&Ray::new(Vec3::ZERO, Vec3::NEG_Z));
        assert!((hit.distance - 9.0).abs() < 1e-5);
    }

    #[test]
    fn test_remove_primitive() {
        let mut scene = scene_with_sphere();
        assert_eq!(
            scene.remove_primitive(4).unwrap_err(),
            SceneError::PrimitiveOutOfRange { index: 4, len: 1 }
        );

        scene.remove_primitive(0).unwrap();
        assert!(scene.bvh().is_empty());
        assert!(!scene.trace_ray(&Ray::new(Vec3::ZERO, Vec3::NEG_Z)).did_hit());
    }

    #[test]
    fn test_remove_material() {
        let mut scene = Scene::new();
        let unused = scene.add_material(Material::default());
        let used = scene.add_material(Material::metal(Color::ONE, 0.3));
        scene.add_sphere(Vec3::ZERO, 1.0, used).unwrap();

        assert_eq!(
            scene.remove_material(used).unwrap_err(),
            SceneError::MaterialInUse { index: used }
        );

        scene.remove_material(unused).unwrap();
        assert_eq!(scene.primitives()[0].material, 0);
        assert_eq!(scene.materials()[0].kind, crate::MaterialKind::Metal);
    }

    #[test]
    fn test_edit_primitives_batch() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut scene = scene_with_sphere();
        let added = scene
            .edit_primitives(|prims| {
                for i in 0..10 {
                    prims.push(Primitive::sphere(Vec3::new(i as f32 * 3.0, 0.0, -20.0), 1.0, 0));
                }
                prims.len()
            })
            .unwrap();
        assert_eq!(added, 11);
        assert_eq!(scene.primitives().len(), 11);

        let hit = scene.trace_ray(&Ray::new(Vec3::new(9.0, 0.0, 0.0), Vec3::NEG_Z));
        assert!((hit.distance - 19.0).abs() < 1e-4);
    }

    #[test]
    fn test_edit_primitives_rolls_back() {
        let mut scene = scene_with_sphere();
        let revision = scene.revision();

        let result = scene.edit_primitives(|prims| {
            prims.clear();
            prims.push(Primitive::sphere(Vec3::ZERO, 1.0, 7));
        });

        assert!(result.is_err());
        assert_eq!(scene.primitives().len(), 1);
        assert_eq!(scene.revision(), revision);
        assert!(scene.trace_ray(&Ray::new(Vec3::ZERO, Vec3::NEG_Z)).did_hit());
    }

    #[test]
    fn test_is_occluded_limits_distance() {
        let scene = scene_with_sphere();
        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);
        assert!(scene.is_occluded(&ray, 10.0));
        assert!(!scene.is_occluded(&ray, 3.0));
    }

    #[test]
    fn test_lights() {
        let mut scene = Scene::new();
        let revision = scene.revision();
        scene.add_light(Light::point(Vec3::Y, Color::ONE, 1.0));
        assert_eq!(scene.lights().len(), 1);
        assert!(scene.revision() > revision);

        scene.lights_mut().clear();
        assert!(scene.lights().is_empty());
    }
}
