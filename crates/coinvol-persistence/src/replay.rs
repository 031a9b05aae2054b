//! Journal replay.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use coinvol_core::{PriceObservation, UnixSeconds};
use tracing::{debug, info, warn};

use crate::error::PersistenceResult;
use crate::journal::{day_of, parse_file_day};

/// Read back every journaled observation with `now - window <= time <= now`.
///
/// Only files whose day can overlap the window are opened. Unparsable lines
/// (for example a line cut short by a crash) are skipped. A missing
/// directory yields an empty history.
pub fn replay_window(
    dir: impl AsRef<Path>,
    now: UnixSeconds,
    window_secs: i64,
) -> PersistenceResult<Vec<PriceObservation>> {
    let dir = dir.as_ref();
    if !dir.exists() {
        debug!(dir = %dir.display(), "No journal directory, nothing to replay");
        return Ok(Vec::new());
    }

    let from = now.saturating_sub(window_secs.max(0));
    let first_day = day_of(from)?;
    let last_day = day_of(now)?;

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(day) = name.to_str().and_then(parse_file_day) else {
            continue;
        };
        if day >= first_day && day <= last_day {
            files.push((day, entry.path()));
        }
    }
    files.sort();

    let mut observations = Vec::new();
    let mut skipped = 0usize;
    for (_, path) in &files {
        let reader = BufReader::new(File::open(path)?);
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<PriceObservation>(&line) {
                Ok(obs) if obs.time >= from && obs.time <= now => observations.push(obs),
                Ok(_) => {}
                Err(e) => {
                    skipped += 1;
                    warn!(
                        path = %path.display(),
                        line = index + 1,
                        error = %e,
                        "Skipping unreadable journal line"
                    );
                }
            }
        }
    }
    observations.sort_by_key(|obs| obs.time);

    info!(
        files = files.len(),
        observations = observations.len(),
        skipped,
        "Replayed observation journal"
    );
    Ok(observations)
}
