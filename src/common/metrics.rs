use metrics::{counter, gauge};

/// Error/Reliability Metrics - Success/Failure pairs
pub fn increment_ryot_api_success() {
    counter!("ryot_api_total", "result" => "success").increment(1);
}

pub fn increment_ryot_api_failure() {
    counter!("ryot_api_total", "result" => "failure").increment(1);
}

pub fn increment_influx_write_success() {
    counter!("influx_write_total", "result" => "success").increment(1);
}

pub fn increment_influx_write_failure() {
    counter!("influx_write_total", "result" => "failure").increment(1);
}

pub fn increment_influx_delete_success() {
    counter!("influx_delete_total", "result" => "success").increment(1);
}

pub fn increment_influx_delete_failure() {
    counter!("influx_delete_total", "result" => "failure").increment(1);
}

pub fn increment_influx_query_success() {
    counter!("influx_query_total", "result" => "success").increment(1);
}

pub fn increment_influx_query_failure() {
    counter!("influx_query_total", "result" => "failure").increment(1);
}

/// Business Logic Metrics
pub fn increment_workouts_written(count: u64) {
    counter!("workouts_written").increment(count);
}

pub fn increment_workouts_skipped(count: u64) {
    counter!("workouts_skipped").increment(count);
}

pub fn increment_sets_written(count: u64) {
    counter!("sets_written").increment(count);
}

pub fn set_source_workouts_count(count: u64) {
    gauge!("source_workouts_count").set(count as f64);
}

pub fn set_pending_workouts_count(count: u64) {
    gauge!("pending_workouts_count").set(count as f64);
}
