//! Entry point for the Caracara example runner.

use anyhow::Context;
use caracara_client::Client;
use caracara_examples::{Cli, ExampleContext, ExamplesConfig, logging, programs};
use clap::Parser;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = ExamplesConfig::load(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    let (profile_name, profile) = config.select_profile(cli.profile.as_deref())?;

    logging::init_logging(profile.logging.as_ref())?;
    info!("Using the {} profile", profile_name);

    let falcon = profile.falcon()?;
    let client = Client::new(falcon.client_config()).context("failed to create the Falcon client")?;

    let (module, example) = cli.module.settings_key();
    let settings = config.example_settings(profile, module, example);
    let ctx = ExampleContext::new(client, settings);

    info!("Running the {} {} example", module, example);
    let result = programs::run(cli.module, &ctx).await;

    if let Err(e) = ctx.client.close().await {
        warn!("Failed to revoke the API token: {}", e);
    }

    result.with_context(|| format!("{module} {example} failed"))?;
    info!("Finished in {:.3} seconds", ctx.elapsed());
    Ok(())
}
