use crate::common::metrics;
use crate::common::types::SinkResult;
use crate::influx_client::{InfluxClient, SUMMARY_MEASUREMENT, WORKOUT_MEASUREMENT};
use crate::line_protocol::Point;
use crate::ryot_client::RyotClient;
use crate::workout::{Exercise, Workout};
use tracing::{debug, warn};

/// Point counts for one written workout.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WrittenPoints {
    pub summaries: usize,
    pub sets: usize,
}

pub fn summary_point(workout: &Workout) -> Point {
    Point::new(SUMMARY_MEASUREMENT, workout.start_time)
        .tag("workout_id", &workout.id)
        .tag("workout_name", &workout.name)
        .field("duration", workout.duration)
}

/// One point per set, stamped at the end of the workout.
pub fn set_points(workout: &Workout, exercise: &Exercise, muscles: &[String]) -> Vec<Point> {
    let muscles = muscles.join(",");

    exercise
        .sets
        .iter()
        .map(|set| {
            Point::new(WORKOUT_MEASUREMENT, workout.end_time)
                .tag("workout_id", &workout.id)
                .tag("workout_name", &workout.name)
                .tag("exercise_name", &exercise.slug)
                .tag("muscles", &muscles)
                .field("reps", set.reps)
                .field("weight", set.weight)
                .field("volume", set.volume)
                .field("set_number", f64::from(set.position))
                .field("workout_duration", workout.duration)
        })
        .collect()
}

/// Writes workouts point by point: the summary first, then each exercise's
/// sets in order. Muscle labels are looked up per exercise, uncached.
pub struct WorkoutWriter<'a> {
    ryot: &'a RyotClient,
    influx: &'a InfluxClient,
}

impl<'a> WorkoutWriter<'a> {
    pub fn new(ryot: &'a RyotClient, influx: &'a InfluxClient) -> Self {
        Self { ryot, influx }
    }

    pub async fn write_workout(&self, workout: &Workout) -> SinkResult<WrittenPoints> {
        let mut written = WrittenPoints::default();

        self.influx.write_point(&summary_point(workout)).await?;
        written.summaries += 1;

        for exercise in &workout.exercises {
            let muscles = self.muscles_for(exercise).await;

            for point in set_points(workout, exercise, &muscles) {
                self.influx.write_point(&point).await?;
                written.sets += 1;
            }
        }

        debug!(
            "Wrote workout {} ({} set points)",
            workout.id, written.sets
        );
        metrics::increment_sets_written(written.sets as u64);

        Ok(written)
    }

    async fn muscles_for(&self, exercise: &Exercise) -> Vec<String> {
        match self.ryot.exercise_muscles(&exercise.id).await {
            Ok(muscles) => muscles,
            Err(e) => {
                warn!(
                    "Could not fetch muscles for exercise {}, writing without them: {}",
                    exercise.id, e
                );
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workout::WorkoutSet;
    use chrono::{TimeZone, Utc};

    fn bench_workout() -> Workout {
        Workout {
            id: "wkt_1".to_string(),
            name: "Push Day".to_string(),
            duration: 3600.0,
            start_time: Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap(),
            end_time: Utc.with_ymd_and_hms(2024, 3, 1, 11, 0, 0).unwrap(),
            exercises: vec![Exercise {
                id: "Bench Press_reps_and_weight_usr_1".to_string(),
                slug: "bench_press".to_string(),
                sets: vec![
                    WorkoutSet::new(1, Some(10.0), Some(100.0)),
                    WorkoutSet::new(2, Some(8.0), Some(110.0)),
                ],
            }],
        }
    }

    #[test]
    fn test_summary_point_uses_start_time() {
        let workout = bench_workout();
        let point = summary_point(&workout);
        assert_eq!(point.measurement(), SUMMARY_MEASUREMENT);
        assert_eq!(point.tag_value("workout_id"), Some("wkt_1"));
        assert_eq!(point.tag_value("workout_name"), Some("Push Day"));
        assert_eq!(point.field_value("duration"), Some(3600.0));
        assert_eq!(point.timestamp(), workout.start_time);
    }

    #[test]
    fn test_set_points_for_two_sets() {
        let workout = bench_workout();
        let muscles = vec!["chest".to_string(), "triceps".to_string()];
        let points = set_points(&workout, &workout.exercises[0], &muscles);

        assert_eq!(points.len(), 2);
        assert_eq!(points[0].field_value("set_number"), Some(1.0));
        assert_eq!(points[0].field_value("volume"), Some(1000.0));
        assert_eq!(points[1].field_value("set_number"), Some(2.0));
        assert_eq!(points[1].field_value("volume"), Some(880.0));

        for point in &points {
            assert_eq!(point.measurement(), WORKOUT_MEASUREMENT);
            assert_eq!(point.tag_value("exercise_name"), Some("bench_press"));
            assert_eq!(point.tag_value("muscles"), Some("chest,triceps"));
            assert_eq!(point.field_value("workout_duration"), Some(3600.0));
            assert_eq!(point.timestamp(), workout.end_time);
        }
    }

    #[test]
    fn test_set_points_omit_empty_muscles() {
        let workout = bench_workout();
        let points = set_points(&workout, &workout.exercises[0], &[]);
        assert!(points.iter().all(|p| p.tag_value("muscles").is_none()));
    }

    #[test]
    fn test_exercise_without_sets_has_no_points() {
        let mut workout = bench_workout();
        workout.exercises[0].sets.clear();
        assert!(set_points(&workout, &workout.exercises[0], &[]).is_empty());
    }
}
