use opentelemetry::KeyValue;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::{SpanExporter, WithExportConfig};
use opentelemetry_sdk::{Resource, runtime, trace as sdktrace};
use opentelemetry_semantic_conventions::resource::SERVICE_NAME;
use tracing::{Subscriber, subscriber::set_global_default};
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_log::LogTracer;
use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt};

/// Builds the bunyan JSON subscriber, optionally exporting spans over OTLP.
///
/// `RUST_LOG` wins over `env_filter` when set. Exporter construction failures
/// downgrade to local logging only.
pub fn get_subscriber<Sink>(
    name: String,
    env_filter: String,
    otlp_endpoint: Option<&str>,
    sink: Sink,
) -> impl Subscriber + Send + Sync
where
    Sink: for<'a> tracing_subscriber::fmt::MakeWriter<'a> + Sync + Send + 'static,
{
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(env_filter));

    let telemetry_layer = otlp_endpoint.and_then(|endpoint| {
        let exporter = match SpanExporter::builder()
            .with_tonic()
            .with_endpoint(endpoint)
            .build()
        {
            Ok(exporter) => exporter,
            Err(e) => {
                eprintln!("failed to create OTLP exporter, spans stay local: {e}");
                return None;
            }
        };

        let resource = Resource::new(vec![KeyValue::new(SERVICE_NAME, name.clone())]);
        let tracer_provider = sdktrace::TracerProvider::builder()
            .with_batch_exporter(exporter, runtime::Tokio)
            .with_resource(resource)
            .build();
        let tracer = tracer_provider.tracer("qrlink-tracer");
        opentelemetry::global::set_tracer_provider(tracer_provider);

        Some(tracing_opentelemetry::layer().with_tracer(tracer))
    });

    Registry::default()
        .with(env_filter)
        .with(telemetry_layer)
        .with(JsonStorageLayer)
        .with(BunyanFormattingLayer::new(name, sink))
}

pub fn init_subscriber(subscriber: impl Subscriber + Send + Sync) -> anyhow::Result<()> {
    LogTracer::init()?;
    set_global_default(subscriber)?;
    Ok(())
}

/// Flushes pending spans before exit.
pub fn shutdown() {
    opentelemetry::global::shutdown_tracer_provider();
}
