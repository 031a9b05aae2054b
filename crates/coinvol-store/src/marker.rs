//! Batch marker cell.
//!
//! Single-writer, multi-reader pointer to the most recent ingestion batch.
//! The marker only moves forward: publishing an older capture time is
//! rejected instead of silently regressing what readers consider "latest".

use coinvol_core::{BatchMarker, UnixSeconds};
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};

#[derive(Default)]
pub struct BatchMarkerCell {
    current: RwLock<Option<BatchMarker>>,
}

impl BatchMarkerCell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish `time` as the latest batch.
    ///
    /// - no marker, or `time` newer than the current one: advances and bumps
    ///   the version
    /// - same `time`: unchanged (re-running a cycle is a no-op)
    /// - older `time`: `StoreError::MarkerRegression`
    pub fn publish(&self, time: UnixSeconds) -> StoreResult<BatchMarker> {
        let mut current = self.current.write();
        let next = match *current {
            None => BatchMarker::new(time, 1),
            Some(marker) if time > marker.time => BatchMarker::new(time, marker.version + 1),
            Some(marker) if time == marker.time => {
                debug!(time, version = marker.version, "Batch marker unchanged");
                return Ok(marker);
            }
            Some(marker) => {
                return Err(StoreError::MarkerRegression {
                    current: marker.time,
                    attempted: time,
                });
            }
        };
        *current = Some(next);
        info!(time = next.time, version = next.version, "Batch marker advanced");
        Ok(next)
    }

    /// Current marker, `None` before the first ingestion cycle.
    pub fn current(&self) -> Option<BatchMarker> {
        *self.current.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_cell_has_no_marker() {
        assert!(BatchMarkerCell::new().current().is_none());
    }

    #[test]
    fn test_publish_advances_version() {
        let cell = BatchMarkerCell::new();
        assert_eq!(cell.publish(1000).unwrap(), BatchMarker::new(1000, 1));
        assert_eq!(cell.publish(1060).unwrap(), BatchMarker::new(1060, 2));
        assert_eq!(cell.current(), Some(BatchMarker::new(1060, 2)));
    }

    #[test]
    fn test_republish_same_time_is_noop() {
        let cell = BatchMarkerCell::new();
        cell.publish(1000).unwrap();
        assert_eq!(cell.publish(1000).unwrap(), BatchMarker::new(1000, 1));
    }

    #[test]
    fn test_regression_rejected() {
        let cell = BatchMarkerCell::new();
        cell.publish(1060).unwrap();

        let err = cell.publish(1000).unwrap_err();
        assert!(matches!(
            err,
            StoreError::MarkerRegression {
                current: 1060,
                attempted: 1000
            }
        ));
        assert_eq!(cell.current().unwrap().time, 1060);
    }
}
