use clap::Parser;

use attributor::cli::{Cli, Commands};
use attributor::config::{get_config, init_config_from};
use attributor::runtime::{commands, run_server};
use attributor::system::logging::init_logging;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_config_from(cli.config.as_deref().unwrap_or("config.toml"));

    // generate-config 不需要日志和数据库
    if let Commands::GenerateConfig { output_path } = cli.command_or_default() {
        if let Err(e) = commands::generate_config(output_path.as_deref()) {
            eprintln!("{:#}", e);
            std::process::exit(1);
        }
        return;
    }

    let config = get_config();
    let log_guard = match init_logging(&config.logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {:#}", e);
            std::process::exit(1);
        }
    };

    let result = match cli.command_or_default() {
        Commands::Serve => run_server().await,
        Commands::IssueCoupon {
            campaign,
            influencer,
            prefix,
            length,
        } => commands::issue_coupon(*campaign, *influencer, prefix.clone(), *length).await,
        Commands::IssueLink {
            campaign,
            influencer,
            url,
        } => commands::issue_link(*campaign, *influencer, url).await,
        Commands::GenerateConfig { .. } => Ok(()),
    };

    if let Err(e) = result {
        tracing::error!("{:#}", e);
        eprintln!("{:#}", e);
        // exit 不会执行析构，先刷新日志
        drop(log_guard);
        std::process::exit(1);
    }
    drop(log_guard);
}
