// Local modules
mod can_simulator;
mod cli;
use cli::Cli;
mod runner;
use runner::RunOptions;
mod settings;
use settings::Settings;
mod sim_transport;
use sim_transport::SimBus;

// Internal crates
use bridge::{Bridge, SharedBridge};
use common::*;

// Platform-specific dependencies
use anyhow::{anyhow, ensure, Result};
use clap::Parser;
#[allow(unused_imports)]
use log::{debug, info, warn};

fn apply_overrides(cli: &Cli, config: &mut GatewayConfig) -> Result<()> {
    if let Some(v) = cli.inverter {
        config.inverter_upgrade =
            InverterUpgrade::try_from(v).map_err(|v| anyhow!("unknown inverter upgrade {}", v))?;
    }
    if let Some(v) = cli.vehicle {
        config.vehicle =
            VehicleProfile::try_from(v).map_err(|v| anyhow!("unknown vehicle profile {}", v))?;
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    stderrlog::new()
        .verbosity(match cli.verbose {
            0 => log::LevelFilter::Info,
            1 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        })
        .show_module_names(true)
        .module(module_path!())
        .module("common")
        .module("bridge")
        .init()?;

    ensure!(
        (0.0..=1.0).contains(&cli.busy_probability),
        "busy probability must be within 0..1"
    );

    let settings = Settings::load(cli.config.as_deref())?;
    let mut config = settings.to_config()?;
    apply_overrides(&cli, &mut config)?;
    info!("-!- gateway config: {:?}", config);

    let pairing = config.pairing();
    let mut bridge = Bridge::new(config).map_err(|e| anyhow!("{}", e))?;
    bridge.set_frame_logging(cli.log_can);
    let shared = SharedBridge::new(bridge);
    let bus = SimBus::new(cli.busy_probability);
    let opts = RunOptions {
        duration_ms: cli.duration_ms,
        fast: cli.fast,
        charging: cli.charging,
    };
    runner::run(&shared, &bus, pairing, &opts)?;

    let bridge = shared.into_inner();
    info!("-!- {:?}", bridge.stats());
    for channel in pairing.enabled() {
        let q = bridge.queue(channel);
        info!(
            "{} tx queue: {} pending, {} dropped, {} not ready",
            channel,
            q.pending(),
            q.dropped(),
            q.not_ready()
        );
    }
    info!("-!- vehicle state: {:?}", bridge.state());
    bus.log_summary();

    Ok(())
}
