mod config;
mod dispmanx;
mod error;
mod lifecycle;
mod logging;
mod mirror;
mod session;
mod utils;

use anyhow::Context;
use clap::Parser;
use config::{Cli, Config};
use dispmanx::BcmHost;
use lifecycle::{Lifecycle, RunFlag};
use mirror::FramePacer;
use session::DisplaySession;
use std::path::Path;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = Config::from_cli(cli);
    let program = program_name();

    // Nothing is logged before this point, so failures go to the terminal.
    let mut lifecycle = match Lifecycle::start(&config) {
        Ok(lifecycle) => lifecycle,
        Err(e) => {
            eprintln!("{}: {:#}", program, e);
            return ExitCode::FAILURE;
        }
    };

    let _log = match logging::init(&program, lifecycle.is_daemon(), config.log_level) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{}: {:#}", program, e);
            return ExitCode::FAILURE;
        }
    };

    log::info!("Starting raspi2raspi v{}", env!("CARGO_PKG_VERSION"));
    log::debug!("Configuration: {:?}", config);
    if config.pidfile.is_some() && !config.daemon {
        log::warn!("--pidfile is only used with --daemon, ignoring");
    }

    // Once daemonized stderr is gone, so this waits for the logger.
    let status = match lifecycle.write_pid().and_then(|()| run(&config)) {
        Ok(frames) => {
            log::debug!("Mirrored {} frames", frames);
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{:#}", e);
            ExitCode::FAILURE
        }
    };

    log::info!("exiting");
    status
}

fn run(config: &Config) -> anyhow::Result<u64> {
    let running = RunFlag::new();
    lifecycle::install_signal_handlers(&running)?;

    let host = BcmHost::init().context("initialising VideoCore host interface")?;
    let mut session = DisplaySession::open(&host, config.source, config.destination)?;
    log::debug!(
        "Image buffer: {} bytes, pitch {}",
        session.image_len(),
        session.pitch()
    );
    let pacer = FramePacer::new(config.frame_interval());

    mirror::run(&mut session, &pacer, &running)
}

fn program_name() -> String {
    std::env::args()
        .next()
        .as_deref()
        .and_then(|arg| Path::new(arg).file_name())
        .and_then(|name| name.to_str())
        .map(str::to_owned)
        .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_owned())
}
