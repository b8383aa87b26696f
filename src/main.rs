use std::sync::Arc;

use anyhow::Context;

use contact_intake::config::IntakeConfig;
use contact_intake::routes;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = Arc::new(IntakeConfig::from_env().context("Invalid configuration")?);

    eprintln!("📬 Contact Intake v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Contact API: http://0.0.0.0:{}/api/contact", config.port);
    eprintln!(
        "   Rate limit: {} per {}s",
        config.rate_limit,
        config.rate_window.as_secs()
    );
    eprintln!(
        "   Confirmation: {}",
        if config.send_confirmation { "enabled" } else { "disabled" }
    );

    match config.credentials() {
        Ok(creds) => eprintln!(
            "   SMTP: {}:{} as {}\n",
            config.smtp_host, config.smtp_port, creds.username
        ),
        Err(e) => tracing::error!(error = %e, "Missing email configuration; submissions will fail"),
    }

    routes::serve(config).await?;

    Ok(())
}
