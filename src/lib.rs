pub mod client;
pub mod config;

use std::sync::Arc;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use client::{ClientError, HttpTransport, JobController, MetadataClient, TokioScheduler};
use config::ClientConfig;

/// Console logging, filtered by `RUST_LOG`
pub fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,reqwest=warn,hyper=warn"));

    // A second init (tests, embedding apps) keeps the first subscriber
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .try_init();
}

/// Metadata client and job controller sharing one HTTP transport
pub fn build_clients(config: &ClientConfig) -> Result<(MetadataClient, JobController), ClientError> {
    config.validate()?;
    let transport = Arc::new(
        HttpTransport::new(config.base_url.trim(), &config.network)
            .map_err(|e| ClientError::Config(e.to_string()))?,
    );
    let scheme = config.scheme.build();
    tracing::info!(
        "[Http] Backend {} ({} scheme, polling every {:?})",
        transport.base_url(),
        config.scheme,
        config.poll_policy().interval
    );

    let metadata = MetadataClient::new(transport.clone(), scheme.clone());
    let jobs = JobController::new(transport, scheme, Arc::new(TokioScheduler), config.poll_policy());
    Ok((metadata, jobs))
}
