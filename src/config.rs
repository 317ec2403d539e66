use clap::Parser;
use std::num::NonZeroU32;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_SOURCE_DISPLAY: u32 = 0;
pub const DEFAULT_DESTINATION_DISPLAY: u32 = 5;
pub const DEFAULT_FPS: i64 = 10;

#[derive(Debug, Clone)]
pub struct Config {
    pub source: u32,
    pub destination: u32,
    /// Target frames per second, `None` when the loop runs uncapped.
    pub fps: Option<NonZeroU32>,
    pub daemon: bool,
    pub pidfile: Option<PathBuf>,
    pub log_level: log::LevelFilter,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: DEFAULT_SOURCE_DISPLAY,
            destination: DEFAULT_DESTINATION_DISPLAY,
            fps: NonZeroU32::new(DEFAULT_FPS as u32),
            daemon: false,
            pidfile: None,
            log_level: log::LevelFilter::Info,
        }
    }
}

#[derive(Parser)]
#[command(name = "raspi2raspi")]
#[command(about = "Mirror one Raspberry Pi display onto another", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Raspberry Pi display number to copy from
    #[arg(short, long, value_name = "NUMBER", default_value_t = DEFAULT_SOURCE_DISPLAY)]
    pub source: u32,

    /// Raspberry Pi display number to copy to
    #[arg(short, long, value_name = "NUMBER", default_value_t = DEFAULT_DESTINATION_DISPLAY)]
    pub destination: u32,

    /// Desired frames per second (0 or less runs as fast as possible)
    #[arg(short, long, default_value_t = DEFAULT_FPS, allow_negative_numbers = true)]
    pub fps: i64,

    /// Start in the background as a daemon
    #[arg(short = 'D', long)]
    pub daemon: bool,

    /// Create and lock PID file (if being run as a daemon)
    #[arg(short, long, value_name = "PIDFILE")]
    pub pidfile: Option<PathBuf>,

    /// Quiet mode
    #[arg(short, long)]
    pub quiet: bool,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    pub fn from_cli(cli: Cli) -> Self {
        let mut config = Config::default();
        config.source = cli.source;
        config.destination = cli.destination;
        config.fps = if cli.fps > 0 {
            NonZeroU32::new(u32::try_from(cli.fps).unwrap_or(u32::MAX))
        } else {
            None
        };
        config.daemon = cli.daemon;
        config.pidfile = cli.pidfile;
        config.log_level = if cli.quiet {
            log::LevelFilter::Error
        } else if cli.verbose {
            log::LevelFilter::Trace
        } else {
            log::LevelFilter::Info
        };
        config
    }

    /// Time budget for one mirror iteration.
    pub fn frame_interval(&self) -> Option<Duration> {
        self.fps
            .map(|fps| Duration::from_micros(1_000_000 / u64::from(fps.get())))
    }
}
