use opentelemetry::trace::TracerProvider as _;
use opentelemetry::KeyValue;
use opentelemetry_otlp::{WithExportConfig, WithHttpConfig};
use opentelemetry_sdk::trace::TracerProvider;
use opentelemetry_sdk::Resource;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Keeps the OTLP exporter alive; flushes and shuts it down on drop.
#[derive(Debug, Default)]
pub struct TelemetryGuard {
    provider: Option<TracerProvider>,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.provider.take() {
            if let Err(err) = provider.shutdown() {
                eprintln!("failed to shut down tracer provider: {err}");
            }
        }
    }
}

/// Install the global tracing subscriber.
///
/// Log lines go to stderr so command output on stdout stays clean. The filter
/// comes from `RUST_LOG` and defaults to `info`. When `otlp_endpoint` is set,
/// spans are additionally exported over OTLP/HTTP (the exporter appends
/// `/v1/traces`), with `otlp_token` sent as a bearer token.
pub fn init_tracing(
    service_name: &str,
    otlp_endpoint: Option<&str>,
    otlp_token: Option<&str>,
) -> TelemetryGuard {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let Some(endpoint) = otlp_endpoint else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .init();
        return TelemetryGuard::default();
    };

    let mut headers = std::collections::HashMap::new();
    if let Some(token) = otlp_token.filter(|t| !t.is_empty()) {
        headers.insert("Authorization".to_string(), format!("Bearer {token}"));
    }

    let exporter = match opentelemetry_otlp::SpanExporter::builder()
        .with_http()
        .with_endpoint(endpoint)
        .with_headers(headers)
        .build()
    {
        Ok(exporter) => exporter,
        Err(err) => {
            eprintln!("failed to create OTLP exporter: {err}, logging to stderr only");
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer)
                .init();
            return TelemetryGuard::default();
        }
    };

    let provider = TracerProvider::builder()
        .with_batch_exporter(exporter, opentelemetry_sdk::runtime::Tokio)
        .with_resource(Resource::new([KeyValue::new(
            "service.name",
            service_name.to_string(),
        )]))
        .build();

    let otel_layer =
        tracing_opentelemetry::layer().with_tracer(provider.tracer(service_name.to_string()));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .with(otel_layer)
        .init();

    tracing::info!(endpoint, service_name, "OTLP tracing enabled");
    TelemetryGuard {
        provider: Some(provider),
    }
}
