use anyhow::{Context, Result};
use fs_err::File;
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Serialize, de::DeserializeOwned};
use std::io::{BufReader, BufWriter, Write};
use tracing::info;

/// Creates a progress bar for monitoring function progress.
pub fn progress_bar_for_count(count: usize) -> ProgressBar {
    let style = ProgressStyle::with_template(
        "[{elapsed_precise}] [{wide_bar:.cyan/blue}] {human_pos}/{human_len} ({per_sec}, {eta})",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar());
    ProgressBar::new(count as u64).with_style(style)
}

pub fn write_json_file<T: Serialize>(
    file_name: &str,
    output_directory: &str,
    data: T,
) -> Result<()> {
    let path = format!("{output_directory}/{file_name}.json");
    info!("Writing to {path}");
    let file = File::create(&path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &data)
        .with_context(|| format!("Failed to serialize {path}"))?;
    writer.flush()?;
    Ok(())
}

pub fn read_json_file<T: DeserializeOwned>(path: &str) -> Result<T> {
    let file = File::open(path)?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("{path} is not a timing plan written by `extract`"))
}
