use clap::Parser;
use std::path::PathBuf;

/// Runs the Leaf inverter upgrade gateway against simulated VCM and inverter
/// traffic.
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Cli {
    /// Gateway settings (TOML). Built-in defaults are used without one.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Simulated time to run for
    #[arg(short, long, default_value_t = 2000)]
    pub duration_ms: u64,

    /// Run as fast as possible instead of in real time
    #[arg(long)]
    pub fast: bool,

    /// More output per occurrence (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log every received frame as <channel>|<id>|<data>
    #[arg(long)]
    pub log_can: bool,

    /// Probability that a transmit mailbox refuses a frame
    #[arg(long, default_value_t = 0.0)]
    pub busy_probability: f64,

    /// Override the inverter upgrade (0 = 110 kW, 1 = 160 kW, 2 = disabled)
    #[arg(long)]
    pub inverter: Option<u8>,

    /// Override the vehicle profile (0..4)
    #[arg(long)]
    pub vehicle: Option<u8>,

    /// Start in slow (AC) charging instead of driving
    #[arg(long)]
    pub charging: bool,
}
