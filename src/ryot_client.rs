use crate::common::metrics;
use crate::common::types::{SourceError, SourceResult};
use crate::workout::{Workout, WorkoutDetails};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, error};

const WORKOUT_LIST_QUERY: &str = r#"
query {
  userWorkoutsList(input: {search: {query: ""}}) {
    response {
      items
    }
  }
}
"#;

const WORKOUT_DETAILS_QUERY: &str = r#"
query ($workoutId: String!) {
  userWorkoutDetails(workoutId: $workoutId) {
    details {
      id
      name
      duration
      startTime
      endTime
      information {
        exercises {
          id
          sets {
            statistic {
              reps
              weight
            }
          }
        }
      }
    }
  }
}
"#;

const EXERCISE_DETAILS_QUERY: &str = r#"
query ($exerciseId: String!) {
  exerciseDetails(exerciseId: $exerciseId) {
    muscles
  }
}
"#;

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<Value>,
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WorkoutListData {
    user_workouts_list: Option<WorkoutList>,
}

#[derive(Debug, Deserialize)]
struct WorkoutList {
    response: WorkoutListResponse,
}

#[derive(Debug, Deserialize)]
struct WorkoutListResponse {
    items: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WorkoutDetailsData {
    user_workout_details: Option<WorkoutDetailsWrapper>,
}

#[derive(Debug, Deserialize)]
struct WorkoutDetailsWrapper {
    details: WorkoutDetails,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExerciseDetailsData {
    exercise_details: Option<ExerciseMuscles>,
}

#[derive(Debug, Deserialize)]
struct ExerciseMuscles {
    #[serde(default)]
    muscles: Option<Vec<String>>,
}

/// Client for the Ryot GraphQL API. One request per call, no retries.
pub struct RyotClient {
    client: reqwest::Client,
    endpoint: String,
    auth_header: String,
}

impl RyotClient {
    pub fn new(endpoint: &str, auth_token: &str, timeout: Duration) -> SourceResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            auth_header: format!("Bearer {auth_token}"),
        })
    }

    /// All workout ids known to Ryot, in the order the API returns them.
    pub async fn workout_ids(&self) -> SourceResult<Vec<String>> {
        let data: Option<WorkoutListData> =
            self.query(WORKOUT_LIST_QUERY, None, "workout list").await?;
        Ok(data
            .and_then(|data| data.user_workouts_list)
            .map(|list| list.response.items)
            .unwrap_or_default())
    }

    /// `Ok(None)` when Ryot has no details for the id.
    pub async fn workout_details(&self, workout_id: &str) -> SourceResult<Option<Workout>> {
        let data: Option<WorkoutDetailsData> = self
            .query(
                WORKOUT_DETAILS_QUERY,
                Some(json!({ "workoutId": workout_id })),
                &format!("details of workout {workout_id}"),
            )
            .await?;

        Ok(data
            .and_then(|data| data.user_workout_details)
            .map(|wrapper| Workout::from_details(workout_id, wrapper.details)))
    }

    pub async fn exercise_muscles(&self, exercise_id: &str) -> SourceResult<Vec<String>> {
        let data: Option<ExerciseDetailsData> = self
            .query(
                EXERCISE_DETAILS_QUERY,
                Some(json!({ "exerciseId": exercise_id })),
                &format!("details of exercise {exercise_id}"),
            )
            .await?;

        Ok(data
            .and_then(|data| data.exercise_details)
            .and_then(|details| details.muscles)
            .unwrap_or_default())
    }

    /// Sends one GraphQL document. `Ok(None)` when the response carries no `data`.
    async fn query<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: Option<Value>,
        context: &str,
    ) -> SourceResult<Option<T>> {
        let mut payload = json!({ "query": query });
        if let Some(variables) = variables {
            payload["variables"] = variables;
        }

        debug!("Querying Ryot for {}", context);

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", &self.auth_header)
            .header("Content-Type", "application/json")
            .body(payload.to_string())
            .send()
            .await
            .inspect_err(|e| {
                metrics::increment_ryot_api_failure();
                error!("Error fetching {} from Ryot: {}", context, e);
            })?;

        let status = response.status();
        let body = response.text().await.inspect_err(|e| {
            metrics::increment_ryot_api_failure();
            error!("Error reading {} response from Ryot: {}", context, e);
        })?;

        if !status.is_success() {
            metrics::increment_ryot_api_failure();
            error!("Ryot returned HTTP {} for {}: {}", status, context, body);
            return Err(SourceError::Http { status, body });
        }

        let envelope: GraphQlResponse = serde_json::from_str(&body).map_err(|e| {
            metrics::increment_ryot_api_failure();
            error!("Ryot returned a non-GraphQL body for {}: {}", context, e);
            SourceError::InvalidBody(e)
        })?;

        if let Some(errors) = envelope.errors.filter(|errors| !errors.is_empty()) {
            metrics::increment_ryot_api_failure();
            error!("GraphQL API Error for {}: {}", context, body);
            return Err(SourceError::GraphQl(
                errors.into_iter().map(|e| e.message).collect(),
            ));
        }

        metrics::increment_ryot_api_success();

        let Some(data) = envelope.data.filter(|data| !data.is_null()) else {
            return Ok(None);
        };

        serde_json::from_value(data)
            .map(Some)
            .map_err(|source| SourceError::Decode {
                context: context.to_string(),
                source,
            })
    }
}
