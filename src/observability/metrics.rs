//! Metrics collection and exposition.
//!
//! # Metrics
//! - `resolverd_queries_total` (counter): processed datagrams by outcome
//! - `resolverd_query_duration_seconds` (histogram): receive-to-finish latency
//! - `resolverd_datagram_bytes` (histogram): inbound datagram sizes

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record one processed datagram.
pub fn record_query(outcome: &'static str, bytes: usize, started: Instant) {
    ::metrics::counter!("resolverd_queries_total", "outcome" => outcome).increment(1);
    ::metrics::histogram!("resolverd_query_duration_seconds")
        .record(started.elapsed().as_secs_f64());
    ::metrics::histogram!("resolverd_datagram_bytes").record(bytes as f64);
}
