#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that replays scripted host sessions against the
//! rotation pilot and prints the side effects it requests.

mod scenario;
mod sink;

use std::{
    collections::BTreeMap,
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::Parser;
use rotation_assist_core::CameraProjection;
use rotation_assist_pilot::{dispatch, InputState, Pilot, PilotConfig, TickInput};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use scenario::{Scenario, ScenarioTerrain};
use sink::ConsoleSink;

/// Replays a scripted host session against the rotation pilot.
#[derive(Debug, Parser)]
#[command(name = "rotation-assist", version, about, long_about = None)]
struct Cli {
    /// Pilot configuration (TOML). Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Scripted host session (TOML).
    #[arg(long)]
    scenario: PathBuf,

    /// Additionally write logs to this file.
    #[arg(long)]
    log_file: Option<PathBuf>,
}

/// Entry point for the rotation assist command-line interface.
fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = setup_logging(cli.log_file.as_deref())?;

    let config = load_config(cli.config.as_deref())?;
    let scenario = Scenario::load(&cli.scenario)?;
    run(config, &scenario)
}

/// Installs a stderr subscriber and, when requested, a file writer.
///
/// The returned guard flushes the file writer when dropped.
fn setup_logging(log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let file_name = path
                .file_name()
                .with_context(|| format!("log file path {} has no file name", path.display()))?;
            let directory = path
                .parent()
                .filter(|parent| !parent.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            fs::create_dir_all(directory).with_context(|| {
                format!("failed to create log directory {}", directory.display())
            })?;

            let appender = tracing_appender::rolling::never(directory, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .init();

    if let Some(path) = log_file {
        tracing::info!("Log file: {}", path.display());
    }
    Ok(guard)
}

/// Loads and validates the pilot configuration.
fn load_config(path: Option<&Path>) -> Result<PilotConfig> {
    let Some(path) = path else {
        tracing::info!("no configuration provided; using defaults");
        return Ok(PilotConfig::default());
    };

    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read configuration at {}", path.display()))?;
    let config: PilotConfig = toml::from_str(&contents)
        .with_context(|| format!("failed to parse configuration at {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("invalid configuration at {}", path.display()))?;

    tracing::info!(
        rules = config.skill_rules.rules.len(),
        "loaded configuration from {}",
        path.display()
    );
    Ok(config)
}

/// Drives the pilot through every scripted tick.
fn run(config: PilotConfig, scenario: &Scenario) -> Result<()> {
    let mut pilot = Pilot::new(config, ScenarioTerrain::default());
    let mut sink = ConsoleSink::new(io::stdout().lock());
    let camera = scenario.camera().map(|camera| camera as &dyn CameraProjection);

    let mut firings: BTreeMap<String, usize> = BTreeMap::new();
    let mut paused = 0_usize;
    let mut failures = 0_usize;
    let ticks = scenario.ticks();

    for (index, tick) in ticks.iter().enumerate() {
        if let Some(entry) = &tick.entered {
            *pilot.terrain_mut() = entry.terrain.clone();
            pilot.on_area_changed();
            tracing::info!(area = %entry.name, "entered area");
        }

        let keys = InputState::from_keys(&pilot.config().aim_assist, &tick.held, &tick.pressed);
        let input = TickInput {
            dt: tick.dt,
            host: tick.host,
            input: keys,
            window: tick.window,
            cursor: tick.cursor,
            player: tick.player.as_ref(),
            entities: &tick.entities,
            skill_bar: &tick.skill_bar,
            camera,
        };
        let outcome = pilot.on_tick(&input);

        sink.describe(index, &outcome)
            .context("failed to write tick summary")?;
        let report = dispatch(&outcome, &mut sink);
        failures += report.failures.len();

        if outcome.is_paused() {
            paused += 1;
        }
        if let Some(fired) = &outcome.fired {
            *firings.entry(fired.skill_name.clone()).or_default() += 1;
        }
    }

    drop(sink);
    let mut out = io::stdout().lock();
    writeln!(
        out,
        "{} ticks, {paused} paused, {failures} dispatch failures",
        ticks.len()
    )?;
    for (skill, count) in &firings {
        writeln!(out, "  {skill}: {count}")?;
    }
    if !pilot.skill_bar().is_empty() {
        let labels: Vec<_> = pilot
            .skill_bar()
            .iter()
            .map(|entry| entry.label.as_str())
            .collect();
        writeln!(out, "skill bar: {}", labels.join(", "))?;
    }
    Ok(())
}
