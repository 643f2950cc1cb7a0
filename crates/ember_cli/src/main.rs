//! ember: render the demo scene progressively and write a PNG.
//!
//! Usage:
//!   ember [--config FILE] [--width W] [--height H] [--frames N] [--seed S]
//!         [--output out.png] [--no-accumulate] [--no-skybox] [--ray-depth D]

mod config;
mod demo;

use anyhow::{Context, Result};
use clap::Parser;
use config::{Args, CliConfig};
use ember_math::Vec3;
use ember_renderer::{Camera, Color, Renderer};
use std::path::Path;
use std::time::Instant;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = CliConfig::resolve(&args)?;
    log::info!(
        "Rendering {}x{}, {} frames, settings {:?}",
        config.width,
        config.height,
        config.frames,
        config.settings
    );

    let scene = demo::demo_scene(config.seed, Color::from(config.background))
        .context("failed to build demo scene")?;

    let mut camera = Camera::new(30.0, 0.1, 100.0);
    camera.on_resize(config.width, config.height);
    camera.look_at(Vec3::new(13.0, 2.0, 3.0), Vec3::ZERO);

    let mut renderer = Renderer::new(config.seed);
    renderer.on_resize(config.width, config.height);

    let start = Instant::now();
    for frame in 1..=config.frames {
        let stats = renderer.render(&scene, &camera, &config.settings);
        if frame % 16 == 0 || frame == config.frames {
            log::info!(
                "Frame {}/{}: {} samples/pixel, {:.1}ms",
                frame,
                config.frames,
                stats.frame_index,
                stats.duration.as_secs_f64() * 1000.0
            );
        }
    }
    log::info!(
        "Rendered {} frames in {:.2}s",
        config.frames,
        start.elapsed().as_secs_f64()
    );

    save_png(&renderer, &args.output)?;
    log::info!("Saved {}", args.output.display());

    Ok(())
}

fn save_png(renderer: &Renderer, path: &Path) -> Result<()> {
    image::save_buffer(
        path,
        renderer.image_bytes(),
        renderer.width(),
        renderer.height(),
        image::ColorType::Rgba8,
    )
    .with_context(|| format!("failed to write {}", path.display()))
}
