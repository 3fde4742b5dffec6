use ::rand as external_rand;
use clap::Parser;
use external_rand::rngs::StdRng;
use external_rand::SeedableRng;

mod config;
mod field;
mod growth;
mod hypha;
mod point_bin;
mod simulation;
mod spawn;
mod types;

use config::*;
use simulation::Simulation;

#[cfg(feature = "ui")]
mod controls;
#[cfg(feature = "ui")]
mod visualization;

mod api;

#[cfg(feature = "ui")]
use macroquad::prelude::{get_frame_time, next_frame, Conf};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Run in headless mode (HTTP API server)
    #[arg(long)]
    headless: bool,

    /// Port for headless API server
    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// Configuration file path (YAML or JSON). If not specified, searches for config.yaml, config.yml, or config.json in current directory.
    #[arg(short, long)]
    config: Option<String>,

    /// Seed for the random generator; a fixed seed replays the same growth
    #[arg(long)]
    seed: Option<u64>,
}

fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => {
            log::info!("Using seed {}", seed);
            StdRng::seed_from_u64(seed)
        }
        None => StdRng::from_entropy(),
    }
}

#[cfg(not(feature = "ui"))]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Headless mode only
    init_logging();
    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;
    headless_main(args.port, config, make_rng(args.seed)).await
}

#[cfg(feature = "ui")]
#[macroquad::main(window_conf)]
async fn main() {
    init_logging();
    let args = Args::parse();

    // Load configuration
    let config = match load_config(args.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            log::error!("Error loading config: {}", e);
            std::process::exit(1);
        }
    };
    let rng = make_rng(args.seed);

    if args.headless {
        // Run headless mode even with UI feature enabled
        let rt = match tokio::runtime::Runtime::new() {
            Ok(rt) => rt,
            Err(e) => {
                log::error!("Failed to start runtime: {}", e);
                std::process::exit(1);
            }
        };
        rt.block_on(async {
            if let Err(e) = headless_main(args.port, config, rng).await {
                log::error!("Error running headless mode: {}", e);
                std::process::exit(1);
            }
        });
    } else {
        ui_main(config, rng).await;
    }
}

/// Load configuration from file or use default
fn load_config(config_path: Option<&str>) -> Result<SimulationConfig, ConfigError> {
    if let Some(path) = config_path {
        let config = SimulationConfig::from_file(path)?;
        log::info!("Loaded config from {}", path);
        Ok(config)
    } else {
        Ok(SimulationConfig::from_default_paths())
    }
}

#[cfg(feature = "ui")]
async fn ui_main(config: SimulationConfig, mut rng: StdRng) {
    use controls::{handle_controls, ControlAction};
    use visualization::{
        clear_world, domain_camera, draw_gradients, draw_help_popup, draw_resources,
        draw_segments, draw_stats_and_help, reset_camera, set_world_camera,
    };

    let mut sim = Simulation::with_config(&mut rng, config);
    let camera = domain_camera(&sim.config);

    loop {
        if handle_controls(&mut sim, &mut rng, &camera) == ControlAction::Quit {
            break;
        }

        set_world_camera(&camera);
        clear_world();
        draw_segments(sim.segments());
        if sim.gradients_visible {
            draw_gradients(&sim.colony.tips, sim.config.gradient_overlay_length);
        }
        draw_resources(&sim.colony.resources);

        reset_camera();

        sim.advance(&mut rng, get_frame_time());

        draw_stats_and_help(&sim.stats(), sim.paused, sim.speed_multiplier);
        if sim.help_popup_visible {
            draw_help_popup();
        }

        if sim.take_screenshot {
            sim.take_screenshot = false;
            let timestamp = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or_default();
            let filename = format!("mycofield_screenshot_{}.png", timestamp);

            match visualization::capture_screenshot(&filename) {
                Ok(_) => log::info!("Screenshot saved: {}", filename),
                Err(e) => log::error!("Failed to save screenshot {}: {}", filename, e),
            }
        }

        next_frame().await;
    }
}

#[cfg(feature = "ui")]
fn window_conf() -> Conf {
    // Runs before the logger is up, so load messages here are dropped and
    // reported once by main. Errors fall back to the default size.
    let args = Args::parse();
    let config = load_config(args.config.as_deref()).unwrap_or_default();
    Conf {
        window_title: "Hyphal Growth Simulation".to_owned(),
        window_width: config.domain_width as i32,
        window_height: config.domain_height as i32,
        ..Default::default()
    }
}

/// Headless mode - runs HTTP API server
async fn headless_main(
    port: u16,
    config: SimulationConfig,
    mut rng: StdRng,
) -> Result<(), Box<dyn std::error::Error>> {
    use api::run_server;
    use api::ApiState;

    let sim = Simulation::with_config(&mut rng, config);
    let api_state = ApiState::new(sim, rng);

    run_server(api_state, port).await?;

    Ok(())
}
