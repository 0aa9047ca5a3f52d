use tracing_subscriber::util::SubscriberInitExt;

mod api;
mod backoff;
pub(crate) mod cache;
pub(crate) mod config;
pub(crate) mod hn_api;
pub(crate) mod stories;

#[derive(Debug, Clone, clap::Parser)]
#[command(version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "false")]
    #[arg(help = "Log to console")]
    log_to_console: bool,

    #[arg(long)]
    #[arg(help = "Address to listen on, overrides LISTEN_ADDR")]
    listen_addr: Option<std::net::SocketAddr>,
}

async fn serve(args: Args, config: &'static config::Config) -> anyhow::Result<()> {
    let client = reqwest::Client::builder()
        .timeout(config.upstream.request_timeout)
        .build()?;

    let aggregator = stories::Aggregator::new(
        hn_api::HnClient::new(client, &config.upstream),
        cache::stories_cache(&config.aggregator),
        config.aggregator.clone(),
    );

    let app = api::create_router(api::AppState {
        aggregator: std::sync::Arc::new(aggregator),
    });

    let addr = args.listen_addr.unwrap_or(config.listen_addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to address {addr}: {e}"))?;

    tracing::info!(addr = %addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error =? e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use tracing_subscriber::layer::Layer;
    use tracing_subscriber::layer::SubscriberExt;

    use clap::Parser;
    let args = Args::parse();

    let config = config::config()?;

    let file_appender = tracing_appender::rolling::daily("./log", "best_stories.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer();
    let file_layer = file_layer
        .with_writer(non_blocking)
        .json()
        .with_filter(tracing::level_filters::LevelFilter::INFO)
        .boxed();

    let pretty_layer = tracing_subscriber::fmt::layer()
        .with_file(true)
        .with_line_number(true)
        .with_writer(std::io::stdout)
        .with_filter(tracing::level_filters::LevelFilter::INFO)
        .boxed();

    let registry = tracing_subscriber::registry().with(file_layer);

    if config.log_to_console || args.log_to_console {
        registry.with(pretty_layer).init();
    } else {
        registry.init();
    };

    tracing::info!(
        config =? config,
        args =? args,
        "Starting best stories service"
    );

    match serve(args, config).await {
        Ok(()) => {
            tracing::info!("Best stories service stopped");
            Ok(())
        }
        Err(e) => {
            tracing::error!(error =? e, "Best stories service failed");
            Err(e)
        }
    }
}
