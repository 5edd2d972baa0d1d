use crate::common::metrics;
use crate::common::types::{SinkError, SinkResult};
use crate::config::InfluxConfig;
use crate::line_protocol::Point;
use serde_json::json;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, error, info};

pub const WORKOUT_MEASUREMENT: &str = "workouts";
pub const SUMMARY_MEASUREMENT: &str = "workout_summary";

// Bounds of the delete predicate; the delete API has no open-ended range.
const TIME_RANGE_START: &str = "1970-01-01T00:00:00Z";
const TIME_RANGE_STOP: &str = "2100-01-01T00:00:00Z";

/// Session against the InfluxDB v2 HTTP API for one bucket.
pub struct InfluxClient {
    client: reqwest::Client,
    url: String,
    org: String,
    bucket: String,
    auth_header: String,
}

impl InfluxClient {
    pub fn connect(config: &InfluxConfig, timeout: Duration) -> SinkResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        debug!("Opened InfluxDB session to {} (bucket {})", config.url, config.bucket);

        Ok(Self {
            client,
            url: config.url.trim_end_matches('/').to_string(),
            org: config.org.clone(),
            bucket: config.bucket.clone(),
            auth_header: format!("Token {}", config.token),
        })
    }

    /// Writes a single point synchronously.
    pub async fn write_point(&self, point: &Point) -> SinkResult<()> {
        let line = point
            .to_line()
            .inspect_err(|_e| metrics::increment_influx_write_failure())?;

        let response = self
            .client
            .post(format!("{}/api/v2/write", self.url))
            .query(&[
                ("org", self.org.as_str()),
                ("bucket", self.bucket.as_str()),
                ("precision", "ns"),
            ])
            .header("Authorization", &self.auth_header)
            .header("Content-Type", "text/plain; charset=utf-8")
            .body(line)
            .send()
            .await
            .inspect_err(|_e| metrics::increment_influx_write_failure())?;

        check_status(response)
            .await
            .inspect_err(|_e| metrics::increment_influx_write_failure())?;

        metrics::increment_influx_write_success();
        Ok(())
    }

    /// Deletes every point of `measurement` in the bucket.
    pub async fn delete_measurement(&self, measurement: &str) -> SinkResult<()> {
        info!("Deleting all existing data from '{}' measurement...", measurement);

        let body = json!({
            "start": TIME_RANGE_START,
            "stop": TIME_RANGE_STOP,
            "predicate": format!("_measurement=\"{measurement}\""),
        });

        let response = self
            .client
            .post(format!("{}/api/v2/delete", self.url))
            .query(&[("org", self.org.as_str()), ("bucket", self.bucket.as_str())])
            .header("Authorization", &self.auth_header)
            .header("Content-Type", "application/json")
            .body(body.to_string())
            .send()
            .await
            .inspect_err(|_e| metrics::increment_influx_delete_failure())?;

        check_status(response)
            .await
            .inspect_err(|_e| metrics::increment_influx_delete_failure())?;

        metrics::increment_influx_delete_success();
        Ok(())
    }

    /// Distinct values of `tag` across all points of `measurement`.
    pub async fn tag_values(&self, measurement: &str, tag: &str) -> SinkResult<HashSet<String>> {
        let flux = format!(
            "import \"influxdata/influxdb/schema\"\n\
             schema.tagValues(bucket: {}, tag: {}, predicate: (r) => r._measurement == {}, start: {TIME_RANGE_START})",
            flux_string(&self.bucket),
            flux_string(tag),
            flux_string(measurement),
        );

        let body = json!({
            "query": flux,
            "type": "flux",
            "dialect": {
                "header": true,
                "delimiter": ",",
                "annotations": [],
            },
        });

        let response = self
            .client
            .post(format!("{}/api/v2/query", self.url))
            .query(&[("org", self.org.as_str())])
            .header("Authorization", &self.auth_header)
            .header("Content-Type", "application/json")
            .header("Accept", "application/csv")
            .body(body.to_string())
            .send()
            .await
            .inspect_err(|_e| metrics::increment_influx_query_failure())?;

        let csv = check_status(response)
            .await
            .inspect_err(|_e| metrics::increment_influx_query_failure())?;

        let values = parse_tag_values(&csv)
            .inspect_err(|_e| metrics::increment_influx_query_failure())?;

        metrics::increment_influx_query_success();
        Ok(values)
    }
}

async fn check_status(response: reqwest::Response) -> SinkResult<String> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        error!("InfluxDB returned HTTP {}: {}", status, body);
        return Err(SinkError::Http { status, body });
    }

    Ok(body)
}

fn flux_string(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Reads the `_value` column out of a Flux CSV response. Tables may repeat
/// their header row; blank separator lines are skipped by the reader. An
/// `error,reference` table fails the whole query, even after partial results.
fn parse_tag_values(csv: &str) -> SinkResult<HashSet<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(csv.as_bytes());

    let mut value_column: Option<usize> = None;
    let mut error_column: Option<usize> = None;
    let mut values = HashSet::new();

    for record in reader.records() {
        let record = record?;

        let has = |name: &str| record.iter().any(|f| f == name);

        if has("table") && has("_value") {
            value_column = record.iter().position(|f| f == "_value");
            error_column = None;
            continue;
        }
        if has("error") && has("reference") {
            error_column = record.iter().position(|f| f == "error");
            value_column = None;
            continue;
        }

        if let Some(idx) = error_column {
            let message = record.get(idx).unwrap_or_default().to_string();
            return Err(SinkError::QueryFailed(message));
        }

        let idx = value_column.ok_or(SinkError::MissingColumn("_value"))?;
        if let Some(value) = record.get(idx).filter(|v| !v.is_empty()) {
            values.insert(value.to_string());
        }
    }

    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tag_values_single_table() {
        let csv = ",result,table,_value\r\n,_result,0,wkt_1\r\n,_result,0,wkt_2\r\n";
        let values = parse_tag_values(csv).unwrap();
        assert_eq!(
            values,
            HashSet::from(["wkt_1".to_string(), "wkt_2".to_string()])
        );
    }

    #[test]
    fn test_parse_tag_values_repeated_headers() {
        let csv = ",result,table,_value\r\n,_result,0,a\r\n\r\n,result,table,_value\r\n,_result,1,b\r\n,_result,1,a\r\n";
        let values = parse_tag_values(csv).unwrap();
        assert_eq!(values.len(), 2);
        assert!(values.contains("b"));
    }

    #[test]
    fn test_parse_tag_values_empty_body() {
        assert!(parse_tag_values("").unwrap().is_empty());
        assert!(parse_tag_values("\r\n").unwrap().is_empty());
    }

    #[test]
    fn test_parse_tag_values_reports_flux_error() {
        let csv = "error,reference\r\nbucket not found,\r\n";
        match parse_tag_values(csv) {
            Err(SinkError::QueryFailed(message)) => assert_eq!(message, "bucket not found"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_parse_tag_values_reports_error_after_partial_results() {
        let csv = ",result,table,_value\r\n,_result,0,w1\r\n\r\n,error,reference\r\n,query terminated: memory limit,\r\n";
        match parse_tag_values(csv) {
            Err(SinkError::QueryFailed(message)) => {
                assert_eq!(message, "query terminated: memory limit")
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_parse_tag_values_without_value_column() {
        let csv = ",result,table,workout_id\r\n,_result,0,a\r\n";
        assert!(matches!(
            parse_tag_values(csv),
            Err(SinkError::MissingColumn("_value"))
        ));
    }

    #[test]
    fn test_flux_string_escapes_quotes() {
        assert_eq!(flux_string("my \"bucket\""), "\"my \\\"bucket\\\"\"");
    }
}
