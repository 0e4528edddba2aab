//! Headless runner: populate a level, replay an input script, print the
//! final level state as JSON.
//!
//! ```text
//! ninelives-headless <level.json> [--constants c.json] [--inputs frames.json] [--ticks N]
//! ```
//!
//! The input script is a JSON array of input frames, one per tick. Without
//! `--ticks`, the run lasts as long as the script (or 60 idle ticks without
//! one). Ticks past the end of the script get idle input.

use std::path::PathBuf;

use anyhow::{anyhow, bail, Context};
use ninelives_engine::prelude::*;
use tracing::info;

const DEFAULT_TICKS: u64 = 60;

// ---------------------------------------------------------------------------
// Arguments
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct Args {
    level: PathBuf,
    constants: Option<PathBuf>,
    inputs: Option<PathBuf>,
    ticks: Option<u64>,
}

fn parse_args(mut raw: impl Iterator<Item = String>) -> anyhow::Result<Args> {
    let mut args = Args::default();
    let mut level = None;
    while let Some(arg) = raw.next() {
        match arg.as_str() {
            "--constants" => args.constants = Some(value(&mut raw, &arg)?.into()),
            "--inputs" => args.inputs = Some(value(&mut raw, &arg)?.into()),
            "--ticks" => {
                let ticks = value(&mut raw, &arg)?;
                args.ticks = Some(ticks.parse().with_context(|| format!("invalid tick count '{ticks}'"))?);
            }
            flag if flag.starts_with("--") => bail!("unknown option '{flag}'"),
            path if level.is_none() => level = Some(PathBuf::from(path)),
            extra => bail!("unexpected argument '{extra}'"),
        }
    }
    args.level = level.ok_or_else(|| {
        anyhow!("usage: ninelives-headless <level.json> [--constants c.json] [--inputs frames.json] [--ticks N]")
    })?;
    Ok(args)
}

fn value(raw: &mut impl Iterator<Item = String>, flag: &str) -> anyhow::Result<String> {
    raw.next().ok_or_else(|| anyhow!("{flag} needs a value"))
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = parse_args(std::env::args().skip(1))?;

    let data = LevelData::from_path(&args.level)
        .with_context(|| format!("loading level {}", args.level.display()))?;
    let constants = match &args.constants {
        Some(path) => GameConstants::from_path(path).with_context(|| format!("loading constants {}", path.display()))?,
        None => GameConstants::default(),
    };
    let frames: Vec<InputFrame> = match &args.inputs {
        Some(path) => {
            let json = std::fs::read_to_string(path).with_context(|| format!("reading inputs {}", path.display()))?;
            serde_json::from_str(&json).with_context(|| format!("parsing inputs {}", path.display()))?
        }
        None => Vec::new(),
    };
    let ticks = args.ticks.unwrap_or(if frames.is_empty() {
        DEFAULT_TICKS
    } else {
        frames.len() as u64
    });

    let config = TickConfig {
        headless: true,
        ..Default::default()
    };
    let mut game = Game::new(data, constants, config).context("populating level")?;
    info!(ticks, frames = frames.len(), "replaying");

    let idle = InputFrame::default();
    let mut deaths = 0u32;
    for tick in 0..ticks {
        let input = usize::try_from(tick).ok().and_then(|i| frames.get(i)).unwrap_or(&idle);
        let lives = game.level().lives();
        let report = game.tick(input);
        if game.level().lives() < lives || report.repopulated {
            deaths += 1;
            info!(tick, lives = game.level().lives(), "cat died");
        }
        if game.level().is_complete() {
            info!(tick, "level complete");
            break;
        }
        if game.level().is_returning() {
            info!(tick, "returned to the previous level");
            break;
        }
    }

    info!(
        ticks = game.tick_count(),
        sim_time = game.sim_time(),
        deaths,
        lives = game.level().lives(),
        "run finished"
    );
    let state = game.level().capture_state();
    println!("{}", state.to_json().context("serializing level state")?);
    Ok(())
}
