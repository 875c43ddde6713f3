use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use tracing::{debug, info};

use crate::cancel::Cancellation;
use crate::models::{Key, Track};

const COLUMN_COUNT: usize = 5;
const HEADER: [&str; COLUMN_COUNT] = ["Title", "Artist", "BPM", "Energy", "Key"];

/// Read tracks from a CSV file with columns title, artist, bpm, energy, key.
///
/// A header row is optional: the first row is skipped when its numeric and
/// key columns do not parse.
pub fn load_tracks(path: &Path, cancel: &Cancellation) -> Result<Vec<Track>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_path(path)
        .with_context(|| format!("open input {}", path.display()))?;

    let mut tracks = Vec::new();
    for (row, result) in reader.records().enumerate() {
        cancel.check()?;

        let record = result.with_context(|| format!("read line {}", row + 1))?;
        let line = record.position().map_or(row as u64 + 1, |p| p.line());

        if record.len() < COLUMN_COUNT {
            bail!(
                "line {line}: expected {COLUMN_COUNT} columns but got {}",
                record.len()
            );
        }

        if row == 0 && !looks_like_data(&record) {
            debug!("skipping header row in {}", path.display());
            continue;
        }

        let track = parse_record(&record).with_context(|| format!("line {line}"))?;
        tracks.push(track);
    }

    info!("loaded {} tracks from {}", tracks.len(), path.display());
    Ok(tracks)
}

/// Write tracks with a header row, creating parent directories as needed
pub fn save_tracks(path: &Path, tracks: &[Track]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).context("create output directory")?;
    }

    let mut writer = WriterBuilder::new()
        .from_path(path)
        .with_context(|| format!("create output {}", path.display()))?;

    writer.write_record(HEADER).context("write header")?;
    for track in tracks {
        writer
            .write_record([
                track.title.as_str(),
                track.artist.as_str(),
                track.bpm.to_string().as_str(),
                track.energy.to_string().as_str(),
                track.key.to_string().as_str(),
            ])
            .context("write row")?;
    }
    writer.flush().context("flush output")?;

    info!("wrote {} tracks to {}", tracks.len(), path.display());
    Ok(())
}

fn looks_like_data(record: &StringRecord) -> bool {
    record[2].parse::<f64>().is_ok()
        && record[3].parse::<i64>().is_ok()
        && record[4].parse::<Key>().is_ok()
}

fn parse_record(record: &StringRecord) -> Result<Track> {
    let bpm: f64 = record[2]
        .parse()
        .map_err(|e| anyhow!("invalid bpm {:?}: {e}", &record[2]))?;

    let energy: i64 = record[3]
        .parse()
        .map_err(|e| anyhow!("invalid energy {:?}: {e}", &record[3]))?;
    if !(0..=100).contains(&energy) {
        bail!("energy out of range: {energy}");
    }

    let key: Key = record[4].parse()?;

    Ok(Track::new(&record[0], &record[1], bpm, energy as u8, key))
}
