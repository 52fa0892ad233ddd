use tracing_subscriber::{EnvFilter, layer::SubscriberExt};

#[derive(Debug, Clone, Copy, Default, Hash, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

/// Installs the global subscriber. Logs go to stderr, filtered by `RUST_LOG` (default `info`).
pub fn setup_logging(log_format: LogFormat) -> anyhow::Result<()> {
    let env_filter = match std::env::var("RUST_LOG") {
        Ok(directive) => match EnvFilter::builder().parse(&directive) {
            Ok(env_filter) => env_filter,
            Err(err) => {
                eprintln!("invalid log filter {directive:?}: {err}");
                eprintln!("falling back to default logging");
                EnvFilter::new("info")
            }
        },
        Err(_) => EnvFilter::new("info"),
    };

    let fmt_layer_compact = tracing_subscriber::fmt::Layer::new()
        .compact()
        .with_writer(std::io::stderr);
    let fmt_layer_json = tracing_subscriber::fmt::Layer::new()
        .json()
        .with_writer(std::io::stderr);

    let subscriber = tracing_subscriber::registry()
        .with((log_format == LogFormat::Compact).then_some(fmt_layer_compact))
        .with((log_format == LogFormat::Json).then_some(fmt_layer_json))
        .with(env_filter);
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
