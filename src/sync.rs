use crate::common::metrics;
use crate::common::types::SyncError;
use crate::config::Config;
use crate::influx_client::InfluxClient;
use crate::reconcile::{SyncMode, reconcile};
use crate::ryot_client::RyotClient;
use crate::sink::WorkoutWriter;
use function_timer::time;
use tracing::{error, info, warn};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub source_workouts: usize,
    pub existing_workouts: usize,
    pub pending_workouts: usize,
    pub workouts_written: usize,
    pub workouts_skipped: usize,
    pub summary_points: usize,
    pub set_points: usize,
    /// Existing ids could not be read, so already-stored workouts were written again.
    pub reconcile_degraded: bool,
    pub dry_run: bool,
}

pub struct SyncJob {
    config: Config,
    ryot: RyotClient,
}

impl SyncJob {
    pub fn new(config: Config, ryot: RyotClient) -> Self {
        Self { config, ryot }
    }

    #[time("sync_workouts_duration")]
    pub async fn sync_workouts(&self, mode: SyncMode) -> Result<SyncReport, SyncError> {
        info!("Starting workout data fetching...");

        let source_ids = match self.ryot.workout_ids().await {
            Ok(ids) => ids,
            Err(e) => {
                error!("Failed to list workouts: {}", e);
                Vec::new()
            }
        };

        let mut report = SyncReport {
            source_workouts: source_ids.len(),
            dry_run: self.config.dry_run,
            ..SyncReport::default()
        };
        metrics::set_source_workouts_count(source_ids.len() as u64);

        let Some(first_id) = source_ids.first() else {
            warn!("No workout IDs found from source or error fetching them.");
            return Ok(report);
        };

        info!("Found {} workout IDs from source.", source_ids.len());

        if self.config.dry_run {
            info!("DRY RUN: No data will be written to InfluxDB.");
            self.print_sample(first_id).await?;
            return Ok(report);
        }

        info!("--- Processing and Writing to InfluxDB ---");

        // The session lives for this block only and is dropped on every exit path.
        let influx = InfluxClient::connect(&self.config.influx, self.config.http_timeout)
            .map_err(SyncError::Connect)?;

        let result = self.process(&influx, &source_ids, mode, &mut report).await;
        if let Err(e) = &result {
            error!(
                "Sync aborted after {} of {} workout(s) written: {}",
                report.workouts_written, report.pending_workouts, e
            );
        }
        result?;

        report.log();
        Ok(report)
    }

    async fn process(
        &self,
        influx: &InfluxClient,
        source_ids: &[String],
        mode: SyncMode,
        report: &mut SyncReport,
    ) -> Result<(), SyncError> {
        let plan = reconcile(
            influx,
            source_ids,
            mode,
            self.config.abort_on_reconcile_error,
        )
        .await?;

        report.existing_workouts = plan.existing;
        report.pending_workouts = plan.to_process.len();
        report.reconcile_degraded = plan.degraded;
        metrics::set_pending_workouts_count(plan.to_process.len() as u64);

        if plan.to_process.is_empty() {
            info!("No new workouts to import.");
            return Ok(());
        }

        info!(
            "Found {} new workouts to import. Fetching details...",
            plan.to_process.len()
        );

        let writer = WorkoutWriter::new(&self.ryot, influx);

        for workout_id in &plan.to_process {
            let workout = match self.ryot.workout_details(workout_id).await {
                Ok(Some(workout)) => workout,
                Ok(None) => {
                    warn!("Could not fetch details for workout ID: {}", workout_id);
                    report.workouts_skipped += 1;
                    metrics::increment_workouts_skipped(1);
                    continue;
                }
                Err(e) if e.is_decode() => {
                    return Err(SyncError::MalformedWorkout {
                        workout_id: workout_id.clone(),
                        source: e,
                    });
                }
                Err(e) => {
                    warn!("Skipping workout {}: {}", workout_id, e);
                    report.workouts_skipped += 1;
                    metrics::increment_workouts_skipped(1);
                    continue;
                }
            };

            let written =
                writer
                    .write_workout(&workout)
                    .await
                    .map_err(|source| SyncError::Write {
                        workout_id: workout_id.clone(),
                        source,
                    })?;

            report.workouts_written += 1;
            report.summary_points += written.summaries;
            report.set_points += written.sets;
            metrics::increment_workouts_written(1);
        }

        Ok(())
    }

    async fn print_sample(&self, workout_id: &str) -> Result<(), SyncError> {
        match self.ryot.workout_details(workout_id).await {
            Ok(Some(workout)) => {
                info!(
                    "Sample workout details for {} ({} exercises, {} sets):",
                    workout_id,
                    workout.exercises.len(),
                    workout.set_count()
                );
                println!("{}", serde_json::to_string_pretty(&workout)?);
            }
            Ok(None) => warn!("Could not fetch details for workout ID: {}", workout_id),
            Err(e) => warn!("Could not fetch details for workout ID {}: {}", workout_id, e),
        }
        Ok(())
    }
}

impl SyncReport {
    fn log(&self) {
        info!(
            source = self.source_workouts,
            existing = self.existing_workouts,
            written = self.workouts_written,
            skipped = self.workouts_skipped,
            summary_points = self.summary_points,
            set_points = self.set_points,
            reconcile_degraded = self.reconcile_degraded,
            "{} workout(s) successfully written to InfluxDB.",
            self.workouts_written
        );
        if self.reconcile_degraded {
            warn!("Existing workout IDs could not be read; already-imported workouts may now be duplicated.");
        }
    }
}
