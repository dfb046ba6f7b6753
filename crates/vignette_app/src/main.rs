// SPDX-License-Identifier: MIT OR Apache-2.0
//! Vignette - a falling cube drawing
//!
//! Renders a cube that drops and bounces while rotating upright:
//! - Renderer and camera configured from a RON file
//! - Scene graph drawn with wgpu
//! - Pausable, reversible tween timeline
//! - Debug control panel and frame statistics in egui
//!
//! ## Usage
//!
//! `vignette [CONFIG.ron]`. Without an argument the path is read from
//! `VIGNETTE_CONFIG`; without either the built-in defaults are used.

mod app;
mod camera;
mod config;
mod control_panel;
mod cube_drawing;
mod drawing;
mod math;
mod metrics;
mod renderer;
mod scene;
mod stats;

use app::VignetteApp;
use config::DrawingConfig;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_DIRECTIVES: &str = "vignette=debug,wgpu=warn,naga=warn";

fn main() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_DIRECTIVES));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Vignette v{}", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = match DrawingConfig::load_or_default(config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load config: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = VignetteApp::run(config) {
        tracing::error!("Vignette crashed: {e}");
        std::process::exit(1);
    }
}
