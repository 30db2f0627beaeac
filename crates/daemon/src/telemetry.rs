//! Telemetry setup for OpenTelemetry integration

use anyhow::Result;
use tracing::Subscriber;
use tracing_subscriber::registry::LookupSpan;

const DEFAULT_SERVICE_NAME: &str = "waitline";

/// OpenTelemetry layer, if configured
///
/// # Environment Variables
///
/// - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint (e.g., http://localhost:4317)
/// - `OTEL_SERVICE_NAME`: Service name (default: waitline)
///
/// Returns `None` when no endpoint is set. Logging is not initialized yet when
/// this runs, so notices go to stderr.
#[cfg(feature = "telemetry")]
pub fn layer<S>() -> Result<Option<impl tracing_subscriber::Layer<S>>>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    use opentelemetry::trace::TracerProvider as _;
    use opentelemetry_otlp::WithExportConfig;

    let Ok(endpoint) = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT") else {
        return Ok(None);
    };
    let service_name =
        std::env::var("OTEL_SERVICE_NAME").unwrap_or_else(|_| DEFAULT_SERVICE_NAME.to_string());

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&endpoint)
        .build()?;
    let provider = opentelemetry_sdk::trace::TracerProvider::builder()
        .with_batch_exporter(exporter, opentelemetry_sdk::runtime::Tokio)
        .build();
    let tracer = provider.tracer(service_name.clone());
    opentelemetry::global::set_tracer_provider(provider);

    eprintln!(
        "OpenTelemetry export enabled (service {}, endpoint {})",
        service_name, endpoint
    );
    Ok(Some(tracing_opentelemetry::layer().with_tracer(tracer)))
}

#[cfg(not(feature = "telemetry"))]
pub fn layer<S>() -> Result<Option<tracing_subscriber::layer::Identity>>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    if std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").is_ok() {
        eprintln!("OpenTelemetry endpoint set but feature 'telemetry' not enabled");
        eprintln!("Rebuild with: cargo build --features telemetry");
    }
    Ok(None)
}

/// Flush pending spans on shutdown
pub fn shutdown() {
    #[cfg(feature = "telemetry")]
    opentelemetry::global::shutdown_tracer_provider();
}
