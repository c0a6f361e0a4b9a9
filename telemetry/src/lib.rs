use opentelemetry::trace::{TraceContextExt, TraceError, TracerProvider as _};
use opentelemetry::{global, KeyValue};
use opentelemetry_otlp::{SpanExporterBuilder, WithExportConfig};
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::{Config, TracerProvider};
use opentelemetry_sdk::{runtime, Resource};
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::subscriber::set_global_default;
use tracing::{level_filters::LevelFilter, Span, Subscriber};
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_log::LogTracer;
use tracing_opentelemetry::OpenTelemetrySpanExt;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{layer::SubscriberExt, EnvFilter, Registry};

#[derive(Deserialize, Clone)]
pub struct TelemetrySettings {
    /// OTLP/HTTP endpoint. Leave empty to keep spans in-process.
    pub otlp_endpoint: String,
    pub honeycomb_api_key: Secret<String>,
    pub dataset_name: String,
}

/// Compose multiple layers into a tracing subscriber.
pub fn get_subscriber<Sink>(
    name: String,
    env_filter: String,
    sink: Sink,
    config: &TelemetrySettings,
    trace_provider: &TracerProvider,
) -> impl Subscriber + Send + Sync
where
    Sink: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(env_filter));
    let formatting_layer = BunyanFormattingLayer::new(name, sink);

    Registry::default()
        .with(env_filter)
        .with(JsonStorageLayer)
        .with(formatting_layer)
        .with(
            tracing_opentelemetry::layer()
                .with_tracer(trace_provider.tracer(config.dataset_name.clone())),
        )
        .with(LevelFilter::DEBUG)
}

/// Install `subscriber` as the global default. Calling this more than once is a no-op.
pub fn init_subscriber(subscriber: impl Subscriber + Send + Sync) {
    let _ = LogTracer::init();
    global::set_text_map_propagator(TraceContextPropagator::new());

    let _ = set_global_default(subscriber);
}

pub fn init_tracer(trace_config: &TelemetrySettings) -> Result<TracerProvider, TraceError> {
    let resource_config = Config::default().with_resource(Resource::new(vec![KeyValue::new(
        opentelemetry_semantic_conventions::resource::SERVICE_NAME.to_string(),
        trace_config.dataset_name.clone(),
    )]));

    if trace_config.otlp_endpoint.is_empty() {
        return Ok(TracerProvider::builder()
            .with_config(resource_config)
            .build());
    }

    let mut headers = HashMap::new();
    if !trace_config.honeycomb_api_key.expose_secret().is_empty() {
        headers.insert(
            "x-honeycomb-dataset".to_string(),
            trace_config.dataset_name.clone(),
        );
        headers.insert(
            "x-honeycomb-team".to_string(),
            trace_config.honeycomb_api_key.expose_secret().clone(),
        );
    }

    let span_exporter = opentelemetry_otlp::new_exporter()
        .http()
        .with_endpoint(trace_config.otlp_endpoint.clone())
        .with_http_client(reqwest::Client::default())
        .with_headers(headers)
        .with_timeout(std::time::Duration::from_secs(2));

    Ok(TracerProvider::builder()
        .with_config(resource_config)
        .with_batch_exporter(
            SpanExporterBuilder::Http(span_exporter).build_span_exporter()?,
            runtime::Tokio,
        )
        .build())
}

/// Trace and span id of the current span, hex encoded, if it carries a valid
/// OpenTelemetry context.
pub fn get_trace_and_span_id() -> Option<(String, String)> {
    let context = Span::current().context();
    let span_context = context.span().span_context().clone();

    if span_context.is_valid() {
        Some((
            span_context.trace_id().to_string(),
            span_context.span_id().to_string(),
        ))
    } else {
        None
    }
}
