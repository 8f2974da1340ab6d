//! Metrics collection and exposition.
//!
//! # Metrics
//! - `somnolence_requests_total` (counter): requests by method, status, route
//! - `somnolence_request_duration_seconds` (histogram): latency distribution
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed
//! - Unresolved requests are labelled with route `none`

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

pub const REQUESTS_TOTAL: &str = "somnolence_requests_total";
pub const REQUEST_DURATION_SECONDS: &str = "somnolence_request_duration_seconds";

/// Install the Prometheus exporter, serving scrapes on `addr`.
/// Must be called from within a tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(
            address = %addr,
            error = %e,
            "Failed to install metrics exporter"
        ),
    }
}

/// Record one finished request.
pub fn record_request(method: &str, status: u16, route: &str, start: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("status", status.to_string()),
        ("route", route.to_string()),
    ];
    counter!(REQUESTS_TOTAL, &labels).increment(1);
    histogram!(REQUEST_DURATION_SECONDS, &labels).record(start.elapsed().as_secs_f64());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_request_labels() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            record_request("GET", 200, "hello___GET", Instant::now());
            record_request("GET", 404, "none", Instant::now());
        });

        let rendered = handle.render();
        assert!(rendered.contains(REQUESTS_TOTAL));
        assert!(rendered.contains(r#"route="hello___GET""#));
        assert!(rendered.contains(r#"status="404""#));
        assert!(rendered.contains(REQUEST_DURATION_SECONDS));
    }
}
