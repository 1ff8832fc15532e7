//! perfect-putt CLI: replay sessions, decode packets, inspect the radio layout.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use perfect_putt::core::PuttConfig;
use perfect_putt::replay::{run_scenario, to_hex, Scenario};
use perfect_putt::telemetry::{
    advertising_payload, service_layout, TelemetryPacket, SERVICE_UUID,
};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "perfect-putt")]
#[command(about = "Host tools for the putting trainer: scenario replay and telemetry decoding")]
#[command(version)]
struct Cli {
    /// Log verbosity on stderr.
    #[arg(long, value_enum, global = true, default_value_t = LogLevel::Warn)]
    log_level: LogLevel,

    /// One JSON object per log line (`tracing` builds only).
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a scenario through the control loop and print the JSON report.
    Simulate {
        /// Scenario file (JSON).
        #[arg(long)]
        scenario: PathBuf,

        /// Config file (JSON). Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print only the accumulated counters.
        #[arg(long)]
        summary: bool,
    },

    /// Decode one telemetry packet given as hex.
    Decode {
        /// Packet bytes, e.g. 0000803f0201.
        hex: String,
    },

    /// Print the default config as JSON.
    DefaultConfig,

    /// Print the advertising payload as hex.
    Advertise {
        /// Device name; the configured default when omitted.
        #[arg(long)]
        name: Option<String>,
    },

    /// Print the service and channel table as JSON.
    Layout,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level.into(), cli.log_json)?;

    match cli.command {
        Commands::Simulate {
            scenario,
            config,
            summary,
        } => run_simulate(scenario, config, summary),
        Commands::Decode { hex } => run_decode(&hex),
        Commands::DefaultConfig => {
            println!("{}", serde_json::to_string_pretty(&PuttConfig::default())?);
            Ok(())
        }
        Commands::Advertise { name } => {
            let name = name.unwrap_or_else(|| PuttConfig::default().telemetry.device_name);
            println!("{}", to_hex(&advertising_payload(&name)));
            Ok(())
        }
        Commands::Layout => {
            let layout = serde_json::json!({
                "service": SERVICE_UUID,
                "channels": service_layout(),
            });
            println!("{}", serde_json::to_string_pretty(&layout)?);
            Ok(())
        }
    }
}

/// Stderr logging; with the `tracing` feature `log` records are bridged into
/// a `tracing` subscriber and `RUST_LOG` overrides `--log-level`.
fn init_logging(level: LevelFilter, json: bool) -> CliResult<()> {
    #[cfg(feature = "tracing")]
    perfect_putt::core::init_tracing(level, json)?;
    #[cfg(not(feature = "tracing"))]
    {
        perfect_putt::core::init_with_level(level)?;
        if json {
            log::warn!("--log-json needs the `tracing` feature; using plain text");
        }
    }
    Ok(())
}

fn run_simulate(scenario: PathBuf, config: Option<PathBuf>, summary: bool) -> CliResult<()> {
    let config = match config {
        Some(path) => PuttConfig::load_json(&path)
            .map_err(|e| format!("config {}: {e}", path.display()))?,
        None => PuttConfig::default(),
    };
    let scenario = Scenario::load_json(&scenario)
        .map_err(|e| format!("scenario {}: {e}", scenario.display()))?;
    let report = run_scenario(config, &scenario)?;
    if summary {
        println!("{}", serde_json::to_string_pretty(&report.stats)?);
    } else {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}

fn run_decode(hex: &str) -> CliResult<()> {
    let bytes = parse_hex(hex)?;
    let packet = TelemetryPacket::decode(&bytes)?;
    println!("{}", serde_json::to_string_pretty(&packet)?);
    Ok(())
}

/// Accepts an optional `0x` prefix and ` `, `:` or `_` separators.
fn parse_hex(s: &str) -> CliResult<Vec<u8>> {
    let s = s.trim();
    let s = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    let digits: Vec<u8> = s
        .bytes()
        .filter(|b| !matches!(b, b' ' | b':' | b'_'))
        .collect();
    if digits.len() % 2 != 0 {
        return Err(format!("odd number of hex digits in '{s}'").into());
    }
    digits
        .chunks(2)
        .map(|pair| -> CliResult<u8> {
            let text = std::str::from_utf8(pair)?;
            Ok(u8::from_str_radix(text, 16)?)
        })
        .collect()
}
