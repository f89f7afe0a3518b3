//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use lazy_static::lazy_static;
use prometheus::{HistogramOpts, IntCounter, IntCounterVec, Opts, Registry};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // Sign-in metrics
    pub static ref LOGINS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("linkgate_logins_total", "Total number of sign-in attempts reaching the callback"),
        &["outcome"]
    ).expect("metric can be created");
    pub static ref SESSIONS_REVOKED_TOTAL: IntCounter = IntCounter::new(
        "linkgate_sessions_revoked_total",
        "Total number of sessions cleared via logout"
    ).expect("metric can be created");

    // Upstream (OAuth provider) metrics
    pub static ref UPSTREAM_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("linkgate_upstream_requests_total", "Total number of requests to the OAuth provider"),
        &["endpoint", "status"]
    ).expect("metric can be created");
    pub static ref UPSTREAM_REQUEST_DURATION_SECONDS: prometheus::HistogramVec = prometheus::HistogramVec::new(
        HistogramOpts::new(
            "linkgate_upstream_request_duration_seconds",
            "OAuth provider request duration in seconds"
        ).buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["endpoint"]
    ).expect("metric can be created");

    // Error metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("linkgate_errors_total", "Total number of errors"),
        &["error_type", "endpoint"]
    ).expect("metric can be created");
}

/// Initialize metrics registry.
pub fn init_metrics() {
    REGISTRY
        .register(Box::new(LOGINS_TOTAL.clone()))
        .expect("LOGINS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(SESSIONS_REVOKED_TOTAL.clone()))
        .expect("SESSIONS_REVOKED_TOTAL can be registered");
    REGISTRY
        .register(Box::new(UPSTREAM_REQUESTS_TOTAL.clone()))
        .expect("UPSTREAM_REQUESTS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(UPSTREAM_REQUEST_DURATION_SECONDS.clone()))
        .expect("UPSTREAM_REQUEST_DURATION_SECONDS can be registered");
    REGISTRY
        .register(Box::new(ERRORS_TOTAL.clone()))
        .expect("ERRORS_TOTAL can be registered");

    tracing::info!("Metrics registry initialized");
}
