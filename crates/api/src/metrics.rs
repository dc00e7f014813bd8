//! Client metrics
//!
//! Recorded through the `metrics` facade; nothing is exported unless the host
//! application installs a recorder.
//!
//! - `api_client_requests_total` (counter): labels `method`, `status`
//! - `api_client_transport_errors_total` (counter): label `error_type`
//! - `api_client_token_refresh_total` (counter): label `outcome`
//! - `api_client_unauthenticated_total` (counter)

/// Record a completed HTTP exchange (any status).
pub fn record_request(method: &str, status: u16) {
    metrics::counter!(
        "api_client_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record a request that never got a response.
pub fn record_transport_error(timeout: bool) {
    let error_type = if timeout { "timeout" } else { "connection" };
    metrics::counter!("api_client_transport_errors_total", "error_type" => error_type)
        .increment(1);
}

/// Record a refresh attempt. `outcome` is one of `success`, `rejected`,
/// `failed` or `reused` (single-flight caller that found a fresh token).
pub fn record_refresh(outcome: &'static str) {
    metrics::counter!("api_client_token_refresh_total", "outcome" => outcome).increment(1);
}

/// Record a session that ended without recovery.
pub fn record_unauthenticated() {
    metrics::counter!("api_client_unauthenticated_total").increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle, PrometheusRecorder};

    #[test]
    fn record_functions_do_not_panic_without_recorder() {
        record_request("GET", 200);
        record_transport_error(true);
        record_refresh("success");
        record_unauthenticated();
    }

    /// Isolated recorder/handle pair; avoids the global recorder singleton.
    fn isolated_recorder() -> (PrometheusRecorder, PrometheusHandle) {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        (recorder, handle)
    }

    #[test]
    fn record_request_carries_labels() {
        let (recorder, handle) = isolated_recorder();
        let _guard = metrics::set_default_local_recorder(&recorder);

        record_request("GET", 200);
        record_request("POST", 401);

        let output = handle.render();
        assert!(output.contains("api_client_requests_total"));
        assert!(output.contains("method=\"GET\""));
        assert!(output.contains("status=\"401\""));
    }

    #[test]
    fn refresh_and_session_counters_render() {
        let (recorder, handle) = isolated_recorder();
        let _guard = metrics::set_default_local_recorder(&recorder);

        record_refresh("success");
        record_refresh("rejected");
        record_transport_error(false);
        record_unauthenticated();

        let output = handle.render();
        assert!(output.contains("outcome=\"success\""));
        assert!(output.contains("outcome=\"rejected\""));
        assert!(output.contains("error_type=\"connection\""));
        assert!(output.contains("api_client_unauthenticated_total"));
    }
}
