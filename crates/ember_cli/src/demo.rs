//! The built-in demo scene.

use ember_math::Vec3;
use ember_renderer::{Color, Light, Material, Primitive, SampleRng, Scene};
use rand::{Rng, SeedableRng};

/// Ground plane, three feature spheres, a lamp, and a field of small random
/// spheres laid out from `seed`.
pub fn demo_scene(seed: u64, background: Color) -> ember_renderer::Result<Scene> {
    let mut scene = Scene::new();
    scene.set_background(background);

    let ground = scene.add_material(Material::diffuse(Color::new(0.5, 0.5, 0.5)));
    let glass = scene.add_material(Material::dielectric(Color::ONE, 0.02, 1.5));
    let clay = scene.add_material(Material::diffuse(Color::new(0.4, 0.2, 0.1)));
    let steel = scene.add_material(Material::metal(Color::new(0.7, 0.6, 0.5), 0.15));
    let lamp = scene.add_material(Material::emissive(Color::new(1.0, 0.85, 0.6), 6.0));

    let mut rng = SampleRng::seed_from_u64(seed);
    let mut primitives = vec![
        Primitive::sphere(Vec3::new(0.0, -1000.0, 0.0), 1000.0, ground),
        Primitive::sphere(Vec3::new(0.0, 1.0, 0.0), 1.0, glass),
        Primitive::sphere(Vec3::new(-4.0, 1.0, 0.0), 1.0, clay),
        Primitive::sphere(Vec3::new(4.0, 1.0, 0.0), 1.0, steel),
        Primitive::sphere(Vec3::new(0.0, 3.2, -2.0), 0.4, lamp),
    ];

    for a in -5..5 {
        for b in -5..5 {
            let center = Vec3::new(
                a as f32 + 0.9 * rng.gen::<f32>(),
                0.2,
                b as f32 + 0.9 * rng.gen::<f32>(),
            );
            if (center - Vec3::new(4.0, 0.2, 0.0)).length() <= 0.9
                || (center - Vec3::new(0.0, 0.2, 0.0)).length() <= 0.9
                || (center - Vec3::new(-4.0, 0.2, 0.0)).length() <= 0.9
            {
                continue;
            }

            let choose: f32 = rng.gen();
            let material = if choose < 0.8 {
                let albedo = Color::new(
                    rng.gen::<f32>() * rng.gen::<f32>(),
                    rng.gen::<f32>() * rng.gen::<f32>(),
                    rng.gen::<f32>() * rng.gen::<f32>(),
                );
                Material::diffuse(albedo)
            } else if choose < 0.95 {
                let colour = Color::new(
                    0.5 + 0.5 * rng.gen::<f32>(),
                    0.5 + 0.5 * rng.gen::<f32>(),
                    0.5 + 0.5 * rng.gen::<f32>(),
                );
                Material::metal(colour, 0.05 + 0.5 * rng.gen::<f32>())
            } else {
                Material::dielectric(Color::ONE, 0.02, 1.5)
            };

            let index = scene.add_material(material);
            primitives.push(Primitive::sphere(center, 0.2, index));
        }
    }

    scene.edit_primitives(|prims| prims.extend(primitives))?;

    scene.add_light(Light::point(Vec3::new(0.0, 6.0, 4.0), Color::ONE, 40.0));
    scene.add_light(Light::distant(
        Vec3::new(-1.0, -2.0, -0.5),
        Color::new(1.0, 0.95, 0.85),
        0.8,
    ));

    log::info!(
        "Demo scene: {} primitives, {} materials, {} lights",
        scene.primitives().len(),
        scene.materials().len(),
        scene.lights().len()
    );
    Ok(scene)
}
