use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

fn parse_duration(input: &str) -> Result<Duration, String> {
    let s = input.trim();
    if s.is_empty() {
        return Err("duration cannot be empty (expected e.g. 10s, 250ms, 1m)".to_string());
    }
    humantime::parse_duration(s)
        .map_err(|e| format!("invalid duration '{s}' ({e}; expected e.g. 10s, 250ms, 1m)"))
}

/// `DURATION:TARGET`, e.g. `30s:5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageArg {
    pub duration: Duration,
    pub target: u64,
}

fn parse_stage(input: &str) -> Result<StageArg, String> {
    let (duration, target) = input
        .trim()
        .rsplit_once(':')
        .ok_or_else(|| format!("invalid stage '{input}' (expected DURATION:TARGET, e.g. 30s:5)"))?;
    let duration = parse_duration(duration)?;
    let target = target
        .trim()
        .parse::<u64>()
        .map_err(|_| format!("invalid stage target in '{input}' (expected a non-negative integer)"))?;
    Ok(StageArg { duration, target })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Progress bar on stderr and a text summary on stdout.
    HumanReadable,
    /// NDJSON progress lines and a JSON summary on stdout.
    Json,
}

#[derive(Debug, Parser)]
#[command(
    name = "stampede",
    author,
    version,
    about = "Staged-ramp load generator with thresholds",
    long_about = "stampede drives a ramping number of virtual users against a service, records request metrics, and judges the run against thresholds.\n\nWithout a config file the built-in ticket stress profile is used.",
    after_help = "Examples:\n  stampede run\n  stampede run stress.yaml\n  stampede run --base-url http://localhost:8080 --stage 10s:5 --stage 20s:0\n  stampede run stress.yaml --output json\n\nExit codes: 0 pass, 11 thresholds failed, 30 invalid input, 40 runtime error."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a staged load test
    #[command(
        long_about = "Run the ticket scenario through the configured stages.\n\nCLI flags override values from the config file; `BASE_URL` overrides `baseUrl`."
    )]
    Run(RunArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// YAML config file (defaults to the built-in ticket stress profile)
    pub config: Option<PathBuf>,

    /// Target service base URL
    #[arg(long, env = "BASE_URL")]
    pub base_url: Option<String>,

    /// Relative path for the JSON summary export
    #[arg(long, value_name = "PATH")]
    pub summary_export: Option<String>,

    /// How often the VU target is recomputed (e.g. 1s, 250ms)
    #[arg(long, value_parser = parse_duration)]
    pub control_interval: Option<Duration>,

    /// Replace the configured stages (repeatable, DURATION:TARGET)
    #[arg(long = "stage", value_name = "DURATION:TARGET", value_parser = parse_stage)]
    pub stages: Vec<StageArg>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::HumanReadable)]
    pub output: OutputFormat,
}
