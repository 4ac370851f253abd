//! Metrics collection and exposition.
//!
//! # Metrics
//! - `rotator_ticks_total` (counter): ticks by task and outcome
//! - `rotator_probes_total` (counter): probes by service and result
//! - `rotator_rotations_total` (counter): node switches by group
//! - `rotator_store_errors_total` (counter): failed statistics writes
//! - `rotator_node_score` (gauge): score of the node a rotation picked
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade and is a no-op until an
//!   exporter is installed
//! - The Prometheus exporter is opt-in

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Prometheus exporter listening");
    Ok(())
}

pub fn record_tick(task: &str, outcome: &'static str) {
    metrics::counter!("rotator_ticks_total", "task" => task.to_owned(), "outcome" => outcome)
        .increment(1);
}

pub fn record_probe(service: &str, result: &'static str) {
    metrics::counter!("rotator_probes_total", "service" => service.to_owned(), "result" => result)
        .increment(1);
}

pub fn record_rotation(group: &str) {
    metrics::counter!("rotator_rotations_total", "group" => group.to_owned()).increment(1);
}

pub fn record_store_error() {
    metrics::counter!("rotator_store_errors_total").increment(1);
}

pub fn record_node_score(group: &str, service: &str, node: &str, score: f64) {
    metrics::gauge!(
        "rotator_node_score",
        "group" => group.to_owned(),
        "service" => service.to_owned(),
        "node" => node.to_owned()
    )
    .set(score);
}
