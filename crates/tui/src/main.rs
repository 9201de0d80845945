mod input;
mod renderer;

use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result, bail};
use laneview_core::EngineConfig;
use laneview_protocol::TimelineDocument;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "Usage: laneview <timeline.json> [--config <config.json>]";

#[derive(Debug, PartialEq)]
struct Args {
    timeline: PathBuf,
    config: Option<PathBuf>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args> {
    let mut timeline = None;
    let mut config = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let path = args.next().context("--config needs a file")?;
                config = Some(PathBuf::from(path));
            }
            flag if flag.starts_with("--") => bail!("unknown option {flag}\n{USAGE}"),
            _ if timeline.is_none() => timeline = Some(PathBuf::from(&arg)),
            _ => bail!("unexpected argument {arg}\n{USAGE}"),
        }
    }
    let timeline = timeline.context(USAGE)?;
    Ok(Args { timeline, config })
}

/// Geometry in terminal cells: one cell per sub-row, a label row per lane.
fn terminal_config() -> EngineConfig {
    EngineConfig {
        overscan_px: 8.0,
        vertical_overscan_px: 0.0,
        row_height_px: 1.0,
        lane_header_px: 1.0,
        lane_gap_px: 0.0,
        hit_tolerance_px: 1.0,
        ..EngineConfig::default()
    }
}

/// Log to the file named by `LANEVIEW_LOG`; the terminal itself is taken.
fn init_logging() -> Result<()> {
    let Ok(path) = std::env::var("LANEVIEW_LOG") else {
        return Ok(());
    };
    let file = File::create(&path).with_context(|| format!("creating log file {path}"))?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("laneview=debug,laneview_core=debug,warn")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let args = parse_args(std::env::args().skip(1))?;
    init_logging()?;

    let config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            EngineConfig::from_json(&text).with_context(|| format!("loading {}", path.display()))?
        }
        None => terminal_config(),
    };

    let data = std::fs::read(&args.timeline)
        .with_context(|| format!("reading {}", args.timeline.display()))?;
    let doc: TimelineDocument = serde_json::from_slice(&data)
        .with_context(|| format!("parsing {}", args.timeline.display()))?;
    tracing::info!(
        lanes = doc.lanes.len(),
        items = doc.items.len(),
        "loaded {}",
        args.timeline.display()
    );

    renderer::run(&doc, config)
}
