use opentelemetry::{global, trace::TracerProvider, KeyValue};
use opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{logs::SdkLoggerProvider, trace::SdkTracerProvider, Resource};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Providers that must be flushed before the process exits.
pub struct Telemetry {
    otel: Option<(SdkTracerProvider, SdkLoggerProvider)>,
}

impl Telemetry {
    pub fn shutdown(self) {
        if let Some((tracer_provider, log_provider)) = self.otel {
            if let Err(e) = tracer_provider.shutdown() {
                eprintln!("failed to flush traces: {e}");
            }

            if let Err(e) = log_provider.shutdown() {
                eprintln!("failed to flush logs: {e}");
            }
        }
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy()
}

/// Logs go to stderr so they do not interleave with console output.
/// Spans and logs are also exported over OTLP when `OTEL_EXPORTER_OTLP_ENDPOINT` is set.
pub fn init_telemetry() -> anyhow::Result<Telemetry> {
    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let Ok(otlp_endpoint) = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT") else {
        Registry::default()
            .with(env_filter())
            .with(fmt_layer)
            .try_init()?;

        return Ok(Telemetry { otel: None });
    };

    let service_name =
        std::env::var("OTEL_SERVICE_NAME").unwrap_or_else(|_| "quotesync".to_string());

    let resource = Resource::builder()
        .with_service_name(service_name)
        .with_attribute(KeyValue::new(
            "service.version",
            crate::constants::version::get_version(),
        ))
        .build();

    let span_exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&otlp_endpoint)
        .build()?;

    let log_exporter = opentelemetry_otlp::LogExporter::builder()
        .with_tonic()
        .with_endpoint(&otlp_endpoint)
        .build()?;

    let tracer_provider = SdkTracerProvider::builder()
        .with_resource(resource.clone())
        .with_batch_exporter(span_exporter)
        .build();

    let log_provider = SdkLoggerProvider::builder()
        .with_resource(resource)
        .with_batch_exporter(log_exporter)
        .build();

    global::set_tracer_provider(tracer_provider.clone());

    let tracer_layer = tracing_opentelemetry::layer().with_tracer(tracer_provider.tracer("quotesync"));
    let logger_layer = OpenTelemetryTracingBridge::new(&log_provider);

    Registry::default()
        .with(env_filter())
        .with(fmt_layer)
        .with(tracer_layer)
        .with(logger_layer)
        .try_init()?;

    tracing::info!(endpoint = %otlp_endpoint, "exporting telemetry over OTLP");

    Ok(Telemetry {
        otel: Some((tracer_provider, log_provider)),
    })
}
