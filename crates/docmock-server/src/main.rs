use clap::Parser;
use docmock::config::ServerConfig;
use docmock::MockServer;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Serve mock responses for every operation of a RAML or Swagger/OpenAPI specification
#[derive(Parser, Debug)]
#[command(name = "docmock")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Specification file (RAML or Swagger/OpenAPI, YAML or JSON)
    #[arg(short, long, env = "DOCMOCK_SPEC", conflicts_with = "spec_url")]
    spec: Option<PathBuf>,

    /// Specification served over HTTP(S)
    #[arg(long, env = "DOCMOCK_SPEC_URL")]
    spec_url: Option<String>,

    /// Configuration file (YAML); flags override its values
    #[arg(short, long, env = "DOCMOCK_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long, env = "DOCMOCK_HOST")]
    host: Option<String>,

    /// Listening port; 0 picks a free one
    #[arg(short, long, env = "DOCMOCK_PORT")]
    port: Option<u16>,

    /// Response override file (JSON)
    #[arg(short, long, env = "DOCMOCK_RESPONSES")]
    responses: Option<PathBuf>,

    /// Directory bodyFileName entries are resolved against
    #[arg(long, env = "DOCMOCK_FILES_ROOT")]
    files_root: Option<PathBuf>,

    /// Directory of <path>/response.<ext> files
    #[arg(long, env = "DOCMOCK_RESPONSE_DIR")]
    response_dir: Option<PathBuf>,
}

impl Args {
    fn into_config(self) -> anyhow::Result<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::from_file(path)?,
            None => ServerConfig::default(),
        };
        if self.spec.is_some() || self.spec_url.is_some() {
            config.spec = self.spec;
            config.spec_url = self.spec_url;
        }
        config.host = self.host.unwrap_or(config.host);
        config.port = self.port.unwrap_or(config.port);
        config.responses = self.responses.or(config.responses);
        config.files_root = self.files_root.or(config.files_root);
        config.response_dir = self.response_dir.or(config.response_dir);
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("docmock=info")),
        )
        .init();

    let config = Args::parse().into_config()?;
    info!("Starting docmock {}", env!("CARGO_PKG_VERSION"));

    let (server, engine) = MockServer::launch(&config).await?;
    info!(
        "Serving {} operation(s) on {}",
        server.registry().len(),
        engine.base_url()
    );

    tokio::signal::ctrl_c().await?;
    info!("Received shutdown signal");
    server.shutdown();
    Ok(())
}
