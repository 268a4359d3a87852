#[cfg(not(target_os = "linux"))]
compile_error!("watchping needs raw ICMP sockets, which are only implemented for Linux");

use std::net::{IpAddr, Ipv4Addr};
use std::process::ExitCode;
use std::sync::mpsc;

use clap::Parser;
use watchping::args::{Args, SummaryFormat};
use watchping::display::ClassicDisplay;
use watchping::engine::{process_identifier, PingEngine, PingSession, ProbeOutcome};
use watchping::error::ProbeError;
use watchping::heartbeat::HeartbeatSender;
use watchping::ping::IcmpSocket;
use watchping::settings::Settings;
use watchping::summary::Summary;
use watchping::watchdog::WatchdogMonitor;

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new().filter_level(level).parse_default_env().init();
}

fn resolve(host: &str) -> Result<Ipv4Addr, ProbeError> {
    let addrs = dns_lookup::lookup_host(host).map_err(|source| ProbeError::Resolve {
        host: host.to_owned(),
        source,
    })?;
    addrs
        .into_iter()
        .find_map(|addr| match addr {
            IpAddr::V4(v4) => Some(v4),
            IpAddr::V6(_) => None,
        })
        .ok_or_else(|| ProbeError::NoIpv4Address(host.to_owned()))
}

fn print_summary(summary: &Summary, format: &SummaryFormat) -> Result<(), ProbeError> {
    let output_error = |err: &dyn std::fmt::Display| ProbeError::Output(std::io::Error::other(err.to_string()));
    match format {
        SummaryFormat::Text => print!("{}", summary.as_text().map_err(|e| output_error(&e))?),
        SummaryFormat::Json => println!("{}", summary.as_json().map_err(|e| output_error(&e))?),
        SummaryFormat::Csv => println!("{}", summary.as_csv().map_err(|e| output_error(&e))?),
        SummaryFormat::None => {}
    }
    Ok(())
}

fn run(args: &Args) -> Result<ProbeOutcome, ProbeError> {
    let settings = Settings::from(args);
    let target = resolve(&args.target)?;
    log::debug!("resolved {} to {}", args.target, target);

    let monitor = WatchdogMonitor::bind(settings.watchdog.addr)?;
    let heartbeat_addr = monitor.local_addr();
    let watchdog = monitor.spawn(settings.watchdog.budget, settings.watchdog.tick)?;

    let socket = IcmpSocket::new(target).map_err(ProbeError::SocketCreation)?;
    let heartbeat = HeartbeatSender::connect(heartbeat_addr).map_err(ProbeError::Heartbeat)?;

    let (cancel_tx, cancel_rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        // the probe may already be shutting down
        let _ = cancel_tx.send(());
    })?;

    let session = PingSession::new(args.target.as_str(), target, process_identifier());
    let mut engine = PingEngine::new(session, socket, heartbeat, settings.probe);
    let mut handler = (ClassicDisplay::stdout(), Summary::new());
    let result = engine.run(&watchdog, &cancel_rx, &mut handler);

    // closes the raw socket and the heartbeat connection
    drop(engine);
    match watchdog.shutdown() {
        Ok(outcome) => log::debug!("watchdog stopped: {:?}", outcome),
        Err(err) => log::warn!("{}", err),
    }

    let outcome = result?;
    print_summary(&handler.1, &args.summary)?;
    Ok(outcome)
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let _ = err.print();
            // --help and --version are not failures
            return if err.use_stderr() { ExitCode::from(1) } else { ExitCode::SUCCESS };
        }
    };
    init_logging(args.verbose);

    match run(&args) {
        Ok(ProbeOutcome::LivenessLost) => ExitCode::from(2),
        Ok(ProbeOutcome::Interrupted) | Ok(ProbeOutcome::Completed) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::from(1)
        }
    }
}
