//! Command-line arguments and the optional JSON config file.

use anyhow::{bail, Context, Result};
use clap::Parser;
use ember_renderer::RenderSettings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Render the ember demo scene progressively and save it as a PNG.
#[derive(Parser, Debug)]
#[command(name = "ember", version, about)]
pub struct Args {
    /// JSON file with render settings; flags override its values
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Image width in pixels
    #[arg(long)]
    pub width: Option<u32>,

    /// Image height in pixels
    #[arg(long)]
    pub height: Option<u32>,

    /// Number of progressive frames to render
    #[arg(long)]
    pub frames: Option<u32>,

    /// Seed for the sampler and the demo scene layout
    #[arg(long)]
    pub seed: Option<u64>,

    /// Output PNG path
    #[arg(short, long, default_value = "ember.png")]
    pub output: PathBuf,

    /// Show only the last frame instead of averaging frames
    #[arg(long)]
    pub no_accumulate: bool,

    /// Use the flat background colour instead of the sky gradient
    #[arg(long)]
    pub no_skybox: bool,

    /// Maximum bounces per path
    #[arg(long)]
    pub ray_depth: Option<u32>,
}

/// Everything needed for a render, as stored in a config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub settings: RenderSettings,
    pub width: u32,
    pub height: u32,
    pub frames: u32,
    pub seed: u64,
    /// Linear RGB seen on a miss when the sky is off
    pub background: [f32; 3],
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            settings: RenderSettings::default(),
            width: 640,
            height: 360,
            frames: 64,
            seed: 0,
            background: [0.05, 0.05, 0.08],
        }
    }
}

impl CliConfig {
    /// Read a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Build the effective config: defaults, then the config file, then flags.
    pub fn resolve(args: &Args) -> Result<Self> {
        let mut config = match &args.config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply(args);
        config.settings = config.settings.clamped();
        config.validate()?;
        Ok(config)
    }

    fn apply(&mut self, args: &Args) {
        if let Some(width) = args.width {
            self.width = width;
        }
        if let Some(height) = args.height {
            self.height = height;
        }
        if let Some(frames) = args.frames {
            self.frames = frames;
        }
        if let Some(seed) = args.seed {
            self.seed = seed;
        }
        if let Some(depth) = args.ray_depth {
            self.settings.ray_depth = depth;
        }
        if args.no_accumulate {
            self.settings.accumulate = false;
        }
        if args.no_skybox {
            self.settings.skybox = false;
        }
    }

    fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            bail!("image size must be non-zero, got {}x{}", self.width, self.height);
        }
        if self.frames == 0 {
            bail!("at least one frame is required");
        }
        Ok(())
    }
}
