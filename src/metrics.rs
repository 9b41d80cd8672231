use actix_web::HttpResponse;
use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounterVec, IntGauge, Opts, TextEncoder};

static DISPATCHES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "notify_service_dispatches_total",
            "Notification dispatches by mode and outcome",
        ),
        &["mode", "outcome"],
    )
    .expect("failed to create notify_service_dispatches_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register notify_service_dispatches_total");
    counter
});

static OPEN_CONNECTIONS: Lazy<IntGauge> = Lazy::new(|| {
    let gauge = IntGauge::new(
        "notify_service_open_connections",
        "WebSocket connections currently open",
    )
    .expect("failed to create notify_service_open_connections");
    prometheus::default_registry()
        .register(Box::new(gauge.clone()))
        .expect("failed to register notify_service_open_connections");
    gauge
});

static REGISTERED_USERS: Lazy<IntGauge> = Lazy::new(|| {
    let gauge = IntGauge::new(
        "notify_service_registered_users",
        "Users with a live connection binding",
    )
    .expect("failed to create notify_service_registered_users");
    prometheus::default_registry()
        .register(Box::new(gauge.clone()))
        .expect("failed to register notify_service_registered_users");
    gauge
});

pub fn record_dispatch(mode: &str, outcome: &str) {
    DISPATCHES_TOTAL.with_label_values(&[mode, outcome]).inc();
}

pub fn set_open_connections(count: usize) {
    OPEN_CONNECTIONS.set(count as i64);
}

pub fn set_registered_users(count: usize) {
    REGISTERED_USERS.set(count as i64);
}

pub async fn serve_metrics() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return HttpResponse::InternalServerError().body(err.to_string());
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}
