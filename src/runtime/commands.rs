//! One-shot CLI commands

use anyhow::{Context, Result};
use colored::Colorize;

use crate::config::StaticConfig;
use crate::runtime::startup::prepare_services;
use crate::services::CodeSettings;

const DEFAULT_CONFIG_OUTPUT: &str = "config.example.toml";

pub fn generate_config(output_path: Option<&str>) -> Result<()> {
    let path = output_path.unwrap_or(DEFAULT_CONFIG_OUTPUT);
    StaticConfig::default()
        .save_to_file(path)
        .map_err(|e| anyhow::anyhow!("Failed to write {}: {}", path, e))?;

    println!(
        "{} Example configuration written to {}",
        "✓".bold().green(),
        path.cyan()
    );
    Ok(())
}

pub async fn issue_coupon(
    campaign_id: i64,
    influencer_id: Option<i64>,
    prefix: Option<String>,
    length: Option<usize>,
) -> Result<()> {
    let services = prepare_services().await?;
    let settings = CodeSettings {
        prefix,
        length,
        ..Default::default()
    };

    let coupon = services
        .code_issuer
        .issue_coupon(campaign_id, influencer_id, settings)
        .await
        .context("Failed to issue coupon")?;

    println!(
        "{} Issued coupon {} for campaign {}",
        "✓".bold().green(),
        coupon.code.magenta(),
        campaign_id
    );
    Ok(())
}

pub async fn issue_link(
    campaign_id: i64,
    influencer_id: Option<i64>,
    destination_url: &str,
) -> Result<()> {
    let services = prepare_services().await?;

    let link = services
        .code_issuer
        .issue_tracking_link(campaign_id, influencer_id, destination_url)
        .await
        .context("Failed to issue tracking link")?;

    let redirect_prefix = crate::config::get_config().server.redirect_prefix.clone();
    println!(
        "{} Issued tracking link {}/{} -> {}",
        "✓".bold().green(),
        redirect_prefix,
        link.short_code.cyan(),
        link.destination_url.blue().underline()
    );
    Ok(())
}
