//! OpenTelemetry trace export
//!
//! Enabled when `OTEL_EXPORTER_OTLP_ENDPOINT` is set; the exporter reads the endpoint
//! from the environment itself.

use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{runtime, trace as sdktrace, Resource};
use tracing::Subscriber;
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::registry::LookupSpan;

use crate::error::{Error, Result};

pub const SERVICE_NAME: &str = "kube-awi-operator";

/// Environment variable that switches trace export on
pub const OTLP_ENDPOINT_ENV: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";

pub fn otel_enabled() -> bool {
    std::env::var(OTLP_ENDPOINT_ENV).is_ok()
}

/// Build the tracing layer exporting spans over OTLP/gRPC.
///
/// `_subscriber` only pins the subscriber type the layer is stacked on.
pub fn init_telemetry<S>(_subscriber: &S) -> Result<OpenTelemetryLayer<S, sdktrace::Tracer>>
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    let mut exporter = opentelemetry_otlp::new_exporter().tonic();
    if let Ok(endpoint) = std::env::var(OTLP_ENDPOINT_ENV) {
        exporter = exporter.with_endpoint(endpoint);
    }

    let tracer = opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(exporter)
        .with_trace_config(sdktrace::config().with_resource(Resource::new(vec![
            KeyValue::new("service.name", SERVICE_NAME),
            KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
        ])))
        .install_batch(runtime::Tokio)
        .map_err(|e| Error::ConfigError(format!("failed to install OTLP pipeline: {}", e)))?;

    Ok(tracing_opentelemetry::layer().with_tracer(tracer))
}

/// Flush and stop the global tracer provider
pub fn shutdown_telemetry() {
    opentelemetry::global::shutdown_tracer_provider();
}
