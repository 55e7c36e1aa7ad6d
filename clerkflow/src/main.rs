use clap::Parser;
use clerkflow::{Application, Config, clerk::ClerkClient, clerk::client::is_auth_failure, telemetry};

/// Wait for shutdown signal (SIGTERM or Ctrl+C)
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c().await.expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down gracefully...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down gracefully...");
        },
    }
}

/// `--check-credentials`: one authenticated call against the Clerk API.
async fn check_credentials(config: &Config) -> anyhow::Result<()> {
    if config.clerk.secret_key.is_empty() {
        anyhow::bail!("No Clerk secret key configured (set clerk.secret_key or CLERK_SECRET_KEY)");
    }

    let client = ClerkClient::new(&config.clerk)?;
    match client.test_credentials().await {
        Ok(()) => {
            println!("Clerk credentials are valid.");
            Ok(())
        }
        Err(e) if is_auth_failure(&e) => anyhow::bail!("Clerk rejected the secret key: {}", e.user_message()),
        Err(e) => anyhow::bail!("Could not reach the Clerk API: {}", e.user_message()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before anything else that might build a TLS client
    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    let args = clerkflow::config::Args::parse();

    let config = Config::load(&args)?;

    // If --validate flag is set, exit successfully after config validation
    if args.validate {
        println!("Configuration is valid.");
        return Ok(());
    }

    if args.check_credentials {
        return check_credentials(&config).await;
    }

    telemetry::init_telemetry(config.enable_otel_export)?;

    tracing::debug!("{:?}", args);

    // Run the application with graceful shutdown on SIGTERM/Ctrl+C
    let shutdown = shutdown_signal();
    Application::new(config).await?.serve(shutdown).await
}
