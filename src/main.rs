use bezier_rasterizer::core::rasterizer::Concurrency;
use bezier_rasterizer::error::Result;
use bezier_rasterizer::io::config::Config;
use bezier_rasterizer::io::image::{frame_path, save_canvas};
use bezier_rasterizer::pipeline::renderer::RenderEngine;
use clap::Parser;
use log::{error, info};
use std::time::Instant;

/// Renders a bicubic Bézier patch (or an OBJ mesh) to PNG.
#[derive(Parser, Debug)]
#[command(name = "bezier-rasterizer")]
#[command(about = "Software rasterizer for Bézier surfaces")]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,

    /// Control point file (16 lines of `x y z`)
    #[arg(short = 'p', long, value_name = "FILE")]
    control_points: Option<String>,

    /// OBJ mesh rendered instead of the Bézier patch
    #[arg(short, long, value_name = "FILE")]
    mesh: Option<String>,

    #[arg(short, long, value_name = "FILE")]
    texture: Option<String>,

    #[arg(short, long, value_name = "FILE")]
    normal_map: Option<String>,

    #[arg(short = 'l', long)]
    tessellation: Option<u32>,

    #[arg(short, long)]
    frames: Option<usize>,

    /// Output PNG; numbered per frame when rendering several
    #[arg(short, long, value_name = "FILE")]
    output: Option<String>,

    #[arg(long)]
    width: Option<usize>,

    #[arg(long)]
    height: Option<usize>,

    /// Wireframe and vertex markers instead of shading
    #[arg(long)]
    debug: bool,

    #[arg(long, value_enum)]
    concurrency: Option<CliConcurrency>,

    /// Save every frame, not just the last
    #[arg(long)]
    save_all: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum CliConcurrency {
    Sequential,
    Tiled,
    PerTriangle,
}

impl From<CliConcurrency> for Concurrency {
    fn from(value: CliConcurrency) -> Self {
        match value {
            CliConcurrency::Sequential => Concurrency::Sequential,
            CliConcurrency::Tiled => Concurrency::Tiled,
            CliConcurrency::PerTriangle => Concurrency::PerTriangle,
        }
    }
}

impl Cli {
    fn into_config(self) -> Result<(Config, bool)> {
        let mut config = match &self.config {
            Some(path) => {
                info!("Loading config: {path}");
                Config::load(path)?
            }
            None => {
                info!("Using default settings");
                Config::default()
            }
        };

        let surface = &mut config.surface;
        if self.control_points.is_some() {
            surface.control_points = self.control_points;
        }
        if self.mesh.is_some() {
            surface.mesh = self.mesh;
        }
        if self.texture.is_some() {
            surface.texture = self.texture;
        }
        if self.normal_map.is_some() {
            surface.normal_map = self.normal_map;
        }
        if let Some(level) = self.tessellation {
            surface.tessellation_level = level;
        }
        if let Some(frames) = self.frames {
            config.animation.frames = frames;
        }
        if let Some(output) = self.output {
            config.animation.output = output;
        }
        if let Some(width) = self.width {
            config.canvas.width = width;
        }
        if let Some(height) = self.height {
            config.canvas.height = height;
        }
        if let Some(concurrency) = self.concurrency {
            config.render.concurrency = concurrency.into();
        }
        config.render.debug_draw |= self.debug;

        Ok((config, self.save_all))
    }
}

fn run(cli: Cli) -> Result<()> {
    let (config, save_all) = cli.into_config()?;
    let frames = config.animation.frames.max(1);
    let step = config.animation.rotation_step;
    let output = config.animation.output.clone();

    let mut engine = RenderEngine::from_config(config)?;
    info!(
        "Rendering {frames} frame(s) at {}x{}",
        engine.canvas().width(),
        engine.canvas().height()
    );

    for frame in 0..frames {
        let start = Instant::now();
        if frame > 0 {
            engine.rotate(step[0], step[1], step[2]);
        }
        engine.render_frame();
        info!("Frame {frame} rendered in {:?}", start.elapsed());

        if save_all && frames > 1 {
            save_canvas(engine.canvas(), frame_path(&output, frame))?;
        }
    }

    if !save_all || frames == 1 {
        save_canvas(engine.canvas(), &output)?;
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run(Cli::parse()) {
        error!("{e}");
        std::process::exit(1);
    }
}
