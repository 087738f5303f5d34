use anyhow::Context;
use clap::Parser;
use http_expect::{init_tracing, MockConfig, MockServer, TracingSink};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;

/// Serve the expectations of a config file until interrupted, then report
/// which of them were met.
#[derive(Parser, Debug)]
#[command(name = "http-expect")]
#[command(author, version, about)]
struct Args {
    /// Path to the YAML expectation file
    #[arg(short, long)]
    config: PathBuf,

    /// Port to listen on, overriding the config file
    #[arg(short, long)]
    port: Option<u16>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, env = "HTTP_EXPECT_LOG", default_value = "info")]
    log: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();
    init_tracing(&args.log);

    let mut config = MockConfig::from_file(&args.config)?;
    if let Some(port) = args.port {
        config.port = port;
    }

    let server = MockServer::start_with(&config)
        .await
        .context("failed to start mock server")?;
    println!("{}", server.uri());
    info!(
        "Serving {} expectation(s) from {}",
        config.expectations.len(),
        args.config.display()
    );

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;

    if server.registry().assert_expectations(&TracingSink) {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
