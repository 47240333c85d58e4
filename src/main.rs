use qrlink::{
    configuration::get_configuration,
    startup,
    telemetry::{self, get_subscriber, init_subscriber},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = get_configuration()?;

    let subscriber = get_subscriber(
        "qrlink".into(),
        cfg.telemetry.log_filter.clone(),
        cfg.telemetry.otlp_endpoint.as_deref(),
        std::io::stdout,
    );
    init_subscriber(subscriber)?;

    let result = startup::run(cfg).await;
    if let Err(e) = &result {
        tracing::error!("Server exited with error: {:?}", e);
    }
    telemetry::shutdown();
    result
}
