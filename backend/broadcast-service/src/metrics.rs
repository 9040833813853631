use std::rc::Rc;
use std::time::{Duration, Instant};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpResponse,
};
use futures::future::{ready, LocalBoxFuture, Ready};
use once_cell::sync::Lazy;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, TextEncoder,
};

static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "broadcast_service_http_requests_total",
            "Total HTTP requests handled by broadcast-service",
        ),
        &["method", "path", "status"],
    )
    .expect("failed to create broadcast_service_http_requests_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register broadcast_service_http_requests_total");
    counter
});

static HTTP_REQUEST_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    let histogram = HistogramVec::new(
        HistogramOpts::new(
            "broadcast_service_http_request_duration_seconds",
            "HTTP request latency for broadcast-service",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5,
        ]),
        &["method", "path", "status"],
    )
    .expect("failed to create broadcast_service_http_request_duration_seconds");
    prometheus::default_registry()
        .register(Box::new(histogram.clone()))
        .expect("failed to register broadcast_service_http_request_duration_seconds");
    histogram
});

static WEBHOOK_EVENTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "broadcast_service_webhook_events_total",
            "Provider webhook deliveries by event type and outcome",
        ),
        &["event", "outcome"],
    )
    .expect("failed to create broadcast_service_webhook_events_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register broadcast_service_webhook_events_total");
    counter
});

static PROVIDER_CALLS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "broadcast_service_provider_calls_total",
            "Calls to the streaming provider by operation and result",
        ),
        &["operation", "result"],
    )
    .expect("failed to create broadcast_service_provider_calls_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register broadcast_service_provider_calls_total");
    counter
});

static DEGRADED_SESSIONS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    let counter = IntCounter::new(
        "broadcast_service_degraded_sessions_total",
        "Sessions created with local fallback credentials",
    )
    .expect("failed to create broadcast_service_degraded_sessions_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register broadcast_service_degraded_sessions_total");
    counter
});

static STUCK_RECORDINGS_FAILED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    let counter = IntCounter::new(
        "broadcast_service_stuck_recordings_failed_total",
        "Unfinished recordings failed by the stuck-recording sweep",
    )
    .expect("failed to create broadcast_service_stuck_recordings_failed_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register broadcast_service_stuck_recordings_failed_total");
    counter
});

pub fn observe_http_request(method: &str, path: &str, status: u16, elapsed: Duration) {
    let status_label = status.to_string();
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status_label])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path, &status_label])
        .observe(elapsed.as_secs_f64());
}

pub fn record_webhook_event(event: &str, outcome: &str) {
    WEBHOOK_EVENTS_TOTAL.with_label_values(&[event, outcome]).inc();
}

pub fn record_provider_call(operation: &str, ok: bool) {
    let result = if ok { "ok" } else { "error" };
    PROVIDER_CALLS_TOTAL
        .with_label_values(&[operation, result])
        .inc();
}

pub fn record_degraded_session() {
    DEGRADED_SESSIONS_TOTAL.inc();
}

pub fn record_stuck_recordings_failed(count: usize) {
    STUCK_RECORDINGS_FAILED_TOTAL.inc_by(count as u64);
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

pub struct MetricsMiddleware;

impl<S, B> Transform<S, ServiceRequest> for MetricsMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = MetricsMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(MetricsMiddlewareService {
            service: Rc::new(service),
        }))
    }
}

pub struct MetricsMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for MetricsMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let method = req.method().to_string();
        let start = Instant::now();

        Box::pin(async move {
            let result = service.call(req).await;
            let elapsed = start.elapsed();
            match &result {
                Ok(response) => {
                    // Route template keeps label cardinality bounded
                    let path = response
                        .request()
                        .match_pattern()
                        .unwrap_or_else(|| "unmatched".to_string());
                    observe_http_request(&method, &path, response.status().as_u16(), elapsed);
                }
                Err(_) => {
                    observe_http_request(&method, "unmatched", 500, elapsed);
                }
            }
            result
        })
    }
}
