use clap::Parser;

use crate::duration::parse_duration;

#[derive(clap::ValueEnum, Clone, Debug, Default, PartialEq)]
pub enum SummaryFormat {
    Text,
    Json,
    Csv,
    #[default]
    None,
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = "Ping utility guarded by a heartbeat watchdog", author, name = "watchping")]
pub struct Args {
    /// Pause between two echo requests (e.g. 1s, 500ms)
    #[arg(short, long, default_value = "1s", value_parser = parse_duration)]
    pub interval: std::time::Duration,

    /// Time to wait for an echo reply before reporting a timeout
    #[arg(short = 'w', long, default_value = "1s", value_parser = parse_duration)]
    pub timeout: std::time::Duration,

    /// Number of echo requests to send (default infinite)
    #[arg(short, long)]
    pub count: Option<u32>,

    /// Payload carried by every echo request
    #[arg(short, long, default_value = "Hello world")]
    pub payload: String,

    /// Address or name of target host
    #[arg()]
    pub target: String,

    /// Local TCP port of the heartbeat watchdog
    #[arg(long, default_value_t = 3000)]
    pub watchdog_port: u16,

    /// Number of silent watchdog ticks before the probe is declared stalled
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..))]
    pub watchdog_budget: u32,

    /// Length of one watchdog tick
    #[arg(long, default_value = "1s", value_parser = parse_duration)]
    pub watchdog_tick: std::time::Duration,

    /// Statistics printed when the probe stops
    #[arg(long, default_value = "none")]
    pub summary: SummaryFormat,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}
