//! Headless host loop: builds a world from CLI flags and steps it at a
//! fixed timestep, logging periodic summaries.

use anyhow::{Context, Result, ensure};
use clap::Parser;
use tracing::info;

use astromine_core::{SimConfig, World};

#[derive(Debug, Parser)]
#[command(
    name = "astromine",
    version,
    about = "Deterministic steering-agent mining simulation"
)]
struct Cli {
    /// RNG seed for a reproducible run. Omit to seed from entropy.
    #[arg(long)]
    seed: Option<u64>,

    /// Number of simulation ticks to run.
    #[arg(long, default_value_t = 3_600)]
    ticks: u64,

    /// Fixed timestep in seconds.
    #[arg(long, default_value_t = 1.0 / 60.0)]
    dt: f32,

    /// Asteroid population target.
    #[arg(long)]
    asteroids: Option<usize>,

    /// Drill ship population target.
    #[arg(long)]
    ships: Option<usize>,

    /// Planets placed when the world boots.
    #[arg(long)]
    planets: Option<usize>,

    /// Wanderers placed when the world boots.
    #[arg(long)]
    wanderers: Option<usize>,

    /// Ticks between logged status summaries. Zero disables them.
    #[arg(long, default_value_t = 300)]
    report_every: u64,
}

impl Cli {
    fn build_config(&self) -> SimConfig {
        let mut config = SimConfig {
            rng_seed: self.seed,
            ..SimConfig::default()
        };
        if let Some(asteroids) = self.asteroids {
            config.asteroid_target = asteroids;
        }
        if let Some(ships) = self.ships {
            config.ship_target = ships;
        }
        if let Some(planets) = self.planets {
            config.planet_initial = planets;
            config.planet_limit = config.planet_limit.max(planets);
        }
        if let Some(wanderers) = self.wanderers {
            config.wanderer_initial = wanderers;
        }
        config
    }
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    ensure!(cli.dt > 0.0, "timestep must be positive, got {}", cli.dt);

    let config = cli.build_config();
    let mut world = World::new(config).context("world bootstrap failed")?;
    info!(
        seed = ?world.config().rng_seed,
        ticks = cli.ticks,
        dt = cli.dt,
        asteroids = world.config().asteroid_target,
        ships = world.config().ship_target,
        planets = world.config().planet_initial,
        "starting simulation"
    );

    for _ in 0..cli.ticks {
        let summary = world.step(cli.dt);
        if cli.report_every > 0 && summary.tick.0 % cli.report_every == 0 {
            info!(
                tick = summary.tick.0,
                asteroids = summary.asteroids,
                ships = summary.ships,
                planets = summary.planets,
                wanderers = summary.wanderers,
                spawned = summary.spawned,
                despawned = summary.despawned,
                delivered = summary.total_delivered,
                "status"
            );
        }
    }

    info!(
        ticks = world.tick().0,
        delivered = world.total_delivered(),
        agents = world.agent_count(),
        "simulation complete"
    );
    Ok(())
}
