// SPDX-License-Identifier: CEPL-1.0
#![deny(unsafe_op_in_unsafe_fn)]
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use ember_core::{init_tracing, init_tracing_at};
use ember_platform::PlatformWindow;
use ember_render::StopAfter;
use ember_render_vk::EngineConfig;
use tracing::{error, info, Level};

mod config;

use config::{load_cfg, resolve, Overrides};

#[derive(Parser, Debug)]
#[command(author, version, about = "Draws one triangle with Vulkan", long_about = None)]
struct Args {
    /// Config file; missing means built-in defaults
    #[arg(long, default_value = "ember.toml")]
    config: PathBuf,

    /// Directory holding triangle.vert.spv and triangle.frag.spv
    #[arg(long)]
    shader_dir: Option<PathBuf>,

    /// Close the window after presenting this many frames
    #[arg(long)]
    frames: Option<u64>,

    /// Do not enable VK_LAYER_KHRONOS_validation
    #[arg(long)]
    no_validation: bool,

    /// Log at debug level, ignoring RUST_LOG
    #[arg(short, long)]
    verbose: bool,
}

fn run(title: &str, engine: &EngineConfig, frames: Option<u64>) -> Result<u64> {
    let window = PlatformWindow::open(title, engine.size).context("opening the window")?;

    let presented = match frames {
        Some(limit) => {
            info!("stopping after {limit} frame(s)");
            let mut window = StopAfter::new(window, limit);
            ember_render_vk::run(&mut window, engine)
        }
        None => {
            let mut window = window;
            ember_render_vk::run(&mut window, engine)
        }
    }
    .context("vulkan renderer")?;

    Ok(presented)
}

fn main() -> ExitCode {
    let args = Args::parse();
    if args.verbose {
        init_tracing_at(Level::DEBUG);
    } else {
        init_tracing();
    }

    let cfg = load_cfg(&args.config);
    let overrides = Overrides {
        shader_dir: args.shader_dir.clone(),
        no_validation: args.no_validation,
    };
    let (title, engine) = resolve(&cfg, &overrides);
    info!(
        "{}x{}, validation {}, shaders in {}",
        engine.size.width,
        engine.size.height,
        if engine.validation { "on" } else { "off" },
        engine
            .shaders
            .vertex
            .parent()
            .map(|p| p.display().to_string())
            .unwrap_or_default()
    );

    match run(&title, &engine, args.frames) {
        Ok(frames) => {
            info!("exited cleanly after {frames} frame(s)");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
