mod utils;

use anyhow::{Context, Result};
use chrono::Datelike;
use clap::{Parser, Subcommand};
use indicatif::ParallelProgressIterator;
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::{thread, time::Duration};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use signal_timing_plan::rows::{split_pages, tokenize_pages};
use signal_timing_plan::{
    ClockTime, Day, Graphic, GraphicsByType, PhaseDescriptor, TimingTables, compute_phase,
    correlate_graphics_with, parse_timing_table_with, read_config,
};
use utils::{progress_bar_for_count, read_json_file, write_json_file};

#[derive(Parser)]
#[command(about = "Signal timing plan parser and phase clock")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse the timing tables out of extracted plan text and tag its phase diagrams.
    Extract {
        /// Text dumps of the plan; form feeds separate pages.
        #[clap(long, required = true, num_args = 1..)]
        text: Vec<String>,
        /// Directory holding one sub-directory of images per page: `<dir>/1/`, `<dir>/2/`, ...
        #[clap(long)]
        graphics_dir: Option<String>,
        #[clap(long, default_value = "./config")]
        config_dir: String,
        #[clap(long)]
        output_directory: String,
    },
    /// Show the active phase for a parsed plan.
    Phase {
        /// `timing_plan.json` written by `extract`.
        #[clap(long)]
        tables: String,
        /// Query time as HH:MM:SS, local time when omitted.
        #[clap(long)]
        time: Option<ClockTime>,
        #[clap(long)]
        day: Option<Day>,
        /// Follow the local clock, printing once per second this many times.
        #[clap(long, conflicts_with_all = ["time", "day"])]
        ticks: Option<u32>,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Extraction {
    #[serde(flatten)]
    tables: TimingTables,
    images: GraphicsByType,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PhaseReport {
    time: String,
    day: Day,
    #[serde(flatten)]
    phase: PhaseDescriptor,
    /// Phases as numbered on the plan, starting at 1.
    display_number: Option<u32>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match args.command {
        Command::Extract {
            text,
            graphics_dir,
            config_dir,
            output_directory,
        } => extract(&text, graphics_dir.as_deref(), &config_dir, &output_directory),
        Command::Phase {
            tables,
            time,
            day,
            ticks,
        } => phase(&tables, time, day, ticks),
    }
}

fn extract(
    text_paths: &[String],
    graphics_dir: Option<&str>,
    config_dir: &str,
    output_directory: &str,
) -> Result<()> {
    let config = read_config(config_dir)?;

    let mut pages: Vec<String> = Vec::new();
    for path in text_paths {
        let raw_text = fs_err::read_to_string(path)?.replace('\r', "");
        pages.extend(split_pages(&raw_text).into_iter().map(str::to_string));
    }
    info!("Number of pages: {}", pages.len());

    let rows = tokenize_pages(&pages);
    let tables = parse_timing_table_with(&rows, &config);
    info!(
        "Timing types: {}, schedule entries: {}",
        tables.timing_map.len(),
        tables.schedule_map.entry_count()
    );

    let images = match graphics_dir {
        Some(dir) => {
            let graphics = read_graphics(Path::new(dir), pages.len())?;
            GraphicsByType::from_tagged(correlate_graphics_with(&pages, graphics, &config))
        }
        None => GraphicsByType::default(),
    };
    info!("Graphics: {}", images.len());

    write_json_file("timing_plan", output_directory, Extraction { tables, images })
}

/// Reads `<dir>/<page>/*` for every page, files in name order.
fn read_graphics(dir: &Path, page_count: usize) -> Result<Vec<Vec<Graphic>>> {
    let progress = progress_bar_for_count(page_count);
    (1..=page_count)
        .into_par_iter()
        .progress_with(progress)
        .map(|page| read_page_graphics(&dir.join(page.to_string())))
        .collect()
}

fn read_page_graphics(page_dir: &Path) -> Result<Vec<Graphic>> {
    if !page_dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut paths = fs_err::read_dir(page_dir)?
        .map(|entry| entry.map(|entry| entry.path()))
        .collect::<Result<Vec<PathBuf>, _>>()?;
    paths.retain(|path| path.is_file());
    paths.sort();
    paths
        .iter()
        .map(|path| -> Result<Graphic> { Ok(Graphic::opaque(fs_err::read(path)?)) })
        .collect()
}

fn phase(
    tables_path: &str,
    time: Option<ClockTime>,
    day: Option<Day>,
    ticks: Option<u32>,
) -> Result<()> {
    let tables: TimingTables = read_json_file(tables_path)
        .with_context(|| format!("Failed to load timing tables from {tables_path}"))?;
    if tables.schedule_map.entry_count() == 0 {
        warn!("{tables_path} has no schedule entries, every query is indeterminate");
    }

    let ticks = ticks.unwrap_or(1);
    for tick in 0..ticks {
        if tick > 0 {
            thread::sleep(Duration::from_secs(1));
        }
        let now = chrono::Local::now().naive_local();
        let time = time.unwrap_or_else(|| ClockTime::from_chrono(now.time()));
        let day = day.unwrap_or_else(|| Day::from_chrono(now.weekday()));

        let phase = compute_phase(&time, day, &tables.timing_map, &tables.schedule_map);
        let report = PhaseReport {
            time: time.to_string(),
            day,
            display_number: u32::try_from(phase.phase_index + 1).ok().filter(|n| *n > 0),
            phase,
        };
        println!("{}", serde_json::to_string(&report)?);
    }
    Ok(())
}
