//! Workout model as decoded from the Ryot API.
//!
//! Ryot hands numbers back either as JSON numbers or as decimal strings
//! depending on the field, so every numeric value goes through
//! [`deserialize_number`] and ends up as an `f64`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Marker Ryot puts between the exercise name and the user-specific suffix of
/// custom exercise ids.
pub const EXERCISE_ID_MARKER: &str = "_reps_and_weight_usr_";

#[derive(Debug, Clone, Serialize)]
pub struct Workout {
    pub id: String,
    pub name: String,
    pub duration: f64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub exercises: Vec<Exercise>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Exercise {
    pub id: String,
    pub slug: String,
    pub sets: Vec<WorkoutSet>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WorkoutSet {
    /// 1-based position within the exercise.
    pub position: u32,
    pub reps: f64,
    pub weight: f64,
    pub volume: f64,
}

impl WorkoutSet {
    pub fn new(position: u32, reps: Option<f64>, weight: Option<f64>) -> Self {
        let reps = reps.unwrap_or(0.0);
        let weight = weight.unwrap_or(0.0);
        Self {
            position,
            reps,
            weight,
            volume: reps * weight,
        }
    }
}

impl Workout {
    /// Builds a workout from the `details` object of `userWorkoutDetails`.
    /// The id comes from the workout list, which is what gets tagged.
    pub fn from_details(id: &str, details: WorkoutDetails) -> Self {
        let exercises = details
            .information
            .and_then(|info| info.exercises)
            .unwrap_or_default()
            .into_iter()
            .map(Exercise::from_details)
            .collect();

        Self {
            id: id.to_string(),
            name: details.name,
            duration: details.duration,
            start_time: details.start_time,
            end_time: details.end_time,
            exercises,
        }
    }

    pub fn set_count(&self) -> usize {
        self.exercises.iter().map(|e| e.sets.len()).sum()
    }
}

impl Exercise {
    fn from_details(details: ExerciseDetails) -> Self {
        let sets = details
            .sets
            .unwrap_or_default()
            .into_iter()
            .zip(1u32..)
            .map(|(set, position)| {
                let stat = set.statistic.unwrap_or_default();
                WorkoutSet::new(position, stat.reps, stat.weight)
            })
            .collect();

        Self {
            slug: exercise_slug(&details.id),
            id: details.id,
            sets,
        }
    }
}

/// Wire shape of `userWorkoutDetails.details`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutDetails {
    pub name: String,
    #[serde(deserialize_with = "deserialize_number")]
    pub duration: f64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub information: Option<WorkoutInformation>,
}

#[derive(Debug, Deserialize)]
pub struct WorkoutInformation {
    #[serde(default)]
    pub exercises: Option<Vec<ExerciseDetails>>,
}

#[derive(Debug, Deserialize)]
pub struct ExerciseDetails {
    pub id: String,
    #[serde(default)]
    pub sets: Option<Vec<SetDetails>>,
}

#[derive(Debug, Deserialize)]
pub struct SetDetails {
    #[serde(default)]
    pub statistic: Option<SetStatistic>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SetStatistic {
    #[serde(default, deserialize_with = "deserialize_optional_number")]
    pub reps: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_optional_number")]
    pub weight: Option<f64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberLike {
    Number(f64),
    Text(String),
}

impl NumberLike {
    fn into_f64<E: serde::de::Error>(self) -> Result<f64, E> {
        match self {
            NumberLike::Number(n) => Ok(n),
            NumberLike::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| E::custom(format!("expected a number, got {s:?}"))),
        }
    }
}

fn deserialize_number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    NumberLike::deserialize(deserializer)?.into_f64()
}

fn deserialize_optional_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<NumberLike>::deserialize(deserializer)?
        .map(NumberLike::into_f64)
        .transpose()
}

/// Tag-safe exercise name: the part of the id before [`EXERCISE_ID_MARKER`],
/// slugified.
pub fn exercise_slug(exercise_id: &str) -> String {
    let name = exercise_id
        .split(EXERCISE_ID_MARKER)
        .next()
        .unwrap_or(exercise_id);
    slugify(name)
}

pub fn slugify(text: &str) -> String {
    let kept: String = text
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-' || c.is_whitespace())
        .collect();
    kept.trim().to_lowercase().replace(' ', "_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn details(value: serde_json::Value) -> WorkoutDetails {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_exercise_slug_strips_user_suffix() {
        assert_eq!(
            exercise_slug("Bench Press (Barbell)_reps_and_weight_usr_01HXYZ"),
            "bench_press_barbell"
        );
        assert_eq!(
            exercise_slug("Bench Press (Barbell)_reps_and_weight_usr_02ABCD"),
            exercise_slug("Bench Press (Barbell)_reps_and_weight_usr_01HXYZ")
        );
    }

    #[test]
    fn test_exercise_slug_without_marker() {
        assert_eq!(exercise_slug("  Pull-Up!  "), "pull-up");
        assert_eq!(exercise_slug("Farmer's Walk"), "farmers_walk");
    }

    #[test]
    fn test_set_defaults_missing_values_to_zero() {
        let set = WorkoutSet::new(1, None, Some(50.0));
        assert_eq!(set.reps, 0.0);
        assert_eq!(set.weight, 50.0);
        assert_eq!(set.volume, 0.0);

        let set = WorkoutSet::new(2, Some(12.0), None);
        assert_eq!(set.weight, 0.0);
        assert_eq!(set.volume, 0.0);
    }

    #[test]
    fn test_decodes_string_and_number_values() {
        let raw = details(json!({
            "id": "wkt_1",
            "name": "Push Day",
            "duration": "3600",
            "startTime": "2024-03-01T10:00:00.000Z",
            "endTime": "2024-03-01T11:00:00+00:00",
            "information": {
                "exercises": [{
                    "id": "Squat_reps_and_weight_usr_1",
                    "sets": [
                        {"statistic": {"reps": "5", "weight": 100}},
                        {"statistic": {"reps": 5, "weight": null}},
                        {"statistic": {}}
                    ]
                }]
            }
        }));

        let workout = Workout::from_details("wkt_1", raw);
        assert_eq!(workout.duration, 3600.0);
        assert_eq!(workout.set_count(), 3);

        let sets = &workout.exercises[0].sets;
        assert_eq!(sets[0], WorkoutSet::new(1, Some(5.0), Some(100.0)));
        assert_eq!(sets[1].volume, 0.0);
        assert_eq!(sets[2].position, 3);
        assert_eq!(workout.exercises[0].slug, "squat");
    }

    #[test]
    fn test_missing_information_yields_no_exercises() {
        let raw = details(json!({
            "name": "Rest",
            "duration": 60,
            "startTime": "2024-03-01T10:00:00Z",
            "endTime": "2024-03-01T10:01:00Z",
            "information": {}
        }));
        assert!(Workout::from_details("wkt_2", raw).exercises.is_empty());
    }

    #[test]
    fn test_missing_duration_is_a_decode_error() {
        let result = serde_json::from_value::<WorkoutDetails>(json!({
            "name": "Broken",
            "startTime": "2024-03-01T10:00:00Z",
            "endTime": "2024-03-01T10:01:00Z"
        }));
        assert!(result.unwrap_err().to_string().contains("duration"));
    }

    #[test]
    fn test_non_numeric_reps_is_rejected() {
        let result = serde_json::from_value::<SetStatistic>(json!({"reps": "lots"}));
        assert!(result.is_err());
    }
}
