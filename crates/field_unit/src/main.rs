//! Field unit binary: runs the dispatch loop against a live backend and lets
//! the operator drive rides from the console.

mod console;
mod logging;

use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use bevy_ecs::prelude::World;
use clap::Parser;
use field_core::backend::HttpBackend;
use field_core::command::{PendingCommands, HELP_TEXT};
use field_core::config::FieldUnitConfig;
use field_core::ecs::VehicleId;
use field_core::runner::{build_field_unit, field_schedule, initialize_field_unit, run_tick};
use field_core::telemetry::OperatorNotices;

use crate::console::Console;
use crate::logging::init_logging;

#[derive(Parser, Debug)]
#[command(name = "field_unit", about = "Ride dispatch field unit")]
struct Cli {
    /// JSON config file; defaults apply when omitted
    #[arg(long, env = "FIELD_UNIT_CONFIG")]
    config: Option<PathBuf>,
    /// Backend base URL including the API prefix
    #[arg(long, env = "FIELD_UNIT_BACKEND_URL")]
    backend_url: Option<String>,
    #[arg(long, env = "FIELD_UNIT_VEHICLE_ID")]
    vehicle_id: Option<String>,
    /// Host tick period in milliseconds
    #[arg(long)]
    tick_ms: Option<u64>,
}

impl Cli {
    fn load_config(&self) -> Result<FieldUnitConfig> {
        let mut config = match &self.config {
            Some(path) => FieldUnitConfig::from_json_file(path)
                .with_context(|| format!("loading config from {}", path.display()))?,
            None => FieldUnitConfig::default(),
        };
        if let Some(url) = &self.backend_url {
            config.backend.base_url = url.clone();
        }
        if let Some(id) = &self.vehicle_id {
            config.vehicle.vehicle_id = VehicleId(id.clone());
        }
        if let Some(tick_ms) = self.tick_ms {
            config.tick_ms = tick_ms;
        }
        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

fn print_notices(world: &mut World) {
    for notice in world.resource_mut::<OperatorNotices>().drain() {
        println!("{notice}");
    }
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let config = cli.load_config()?;

    let backend = HttpBackend::new(&config.backend).context("building backend client")?;
    log::info!(
        "field unit {} starting against {}",
        config.vehicle.vehicle_id,
        config.backend.base_url
    );

    let mut world = World::new();
    build_field_unit(&mut world, &config, Box::new(backend));
    if let Err(err) = initialize_field_unit(&mut world) {
        log::warn!("continuing unregistered: {err}");
    }
    print_notices(&mut world);
    println!("{HELP_TEXT}");

    let console = Console::spawn().context("starting console")?;
    let mut schedule = field_schedule();
    let tick = Duration::from_millis(config.tick_ms);
    let mut last = Instant::now();

    loop {
        {
            let mut pending = world.resource_mut::<PendingCommands>();
            for command in console.drain() {
                pending.push(command);
            }
        }

        let now = Instant::now();
        let elapsed_ms = now.duration_since(last).as_millis() as u64;
        last = now;
        run_tick(&mut world, &mut schedule, elapsed_ms);
        print_notices(&mut world);

        thread::sleep(tick);
    }
}
