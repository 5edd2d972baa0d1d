use crate::common::types::SyncError;
use crate::influx_client::{InfluxClient, SUMMARY_MEASUREMENT, WORKOUT_MEASUREMENT};
use std::collections::HashSet;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Wipe both measurements and import everything.
    Reset,
    /// Import only workouts without a summary point.
    Incremental,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilePlan {
    pub to_process: Vec<String>,
    pub existing: usize,
    /// The existing-id query failed and everything was queued again.
    pub degraded: bool,
}

/// Source ids without a summary in the store, in source order.
pub fn pending_workouts(source_ids: &[String], existing: &HashSet<String>) -> Vec<String> {
    source_ids
        .iter()
        .filter(|id| !existing.contains(*id))
        .cloned()
        .collect()
}

pub async fn reconcile(
    influx: &InfluxClient,
    source_ids: &[String],
    mode: SyncMode,
    abort_on_error: bool,
) -> Result<ReconcilePlan, SyncError> {
    match mode {
        SyncMode::Reset => {
            info!("--reset flag detected. Clearing all existing data.");
            for measurement in [WORKOUT_MEASUREMENT, SUMMARY_MEASUREMENT] {
                influx
                    .delete_measurement(measurement)
                    .await
                    .map_err(SyncError::Reset)?;
            }
            info!("All existing workout data deleted.");

            Ok(ReconcilePlan {
                to_process: source_ids.to_vec(),
                existing: 0,
                degraded: false,
            })
        }
        SyncMode::Incremental => {
            let (existing, degraded) =
                match influx.tag_values(SUMMARY_MEASUREMENT, "workout_id").await {
                    Ok(existing) => (existing, false),
                    Err(e) if abort_on_error => return Err(SyncError::Reconcile(e)),
                    Err(e) => {
                        // Summary presence is the only dedup key, so this reimports
                        // (and duplicates) every workout already in the store.
                        error!(
                            "Error querying InfluxDB for existing workout IDs, reprocessing all {} workouts: {}",
                            source_ids.len(),
                            e
                        );
                        (HashSet::new(), true)
                    }
                };

            info!("Found {} existing workout IDs in InfluxDB.", existing.len());

            Ok(ReconcilePlan {
                to_process: pending_workouts(source_ids, &existing),
                existing: existing.len(),
                degraded,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_pending_preserves_source_order() {
        let source = ids(&["c", "a", "d", "b"]);
        let existing = HashSet::from(["a".to_string(), "b".to_string()]);
        assert_eq!(pending_workouts(&source, &existing), ids(&["c", "d"]));
    }

    #[test]
    fn test_pending_ignores_ids_only_in_store() {
        let source = ids(&["a"]);
        let existing = HashSet::from(["a".to_string(), "zombie".to_string()]);
        assert!(pending_workouts(&source, &existing).is_empty());
    }

    #[test]
    fn test_pending_with_empty_store_is_full_list() {
        let source = ids(&["a", "b"]);
        assert_eq!(pending_workouts(&source, &HashSet::new()), source);
    }
}
