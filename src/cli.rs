//! CLI definition using clap

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "attributor")]
#[command(version)]
#[command(about = "Influencer attribution and analytics engine", long_about = None)]
pub struct Cli {
    /// Path to config.toml
    #[arg(long, short = 'c', global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve,

    /// Generate example configuration file
    GenerateConfig {
        /// Output path (default: config.example.toml)
        output_path: Option<String>,
    },

    /// Issue a coupon code for a campaign
    IssueCoupon {
        #[arg(long)]
        campaign: i64,

        #[arg(long)]
        influencer: Option<i64>,

        /// Code prefix (uppercased)
        #[arg(long)]
        prefix: Option<String>,

        /// Length of the random part
        #[arg(long)]
        length: Option<usize>,
    },

    /// Issue a tracking link for a campaign
    IssueLink {
        #[arg(long)]
        campaign: i64,

        #[arg(long)]
        influencer: Option<i64>,

        /// Destination URL (http or https)
        #[arg(long)]
        url: String,
    },
}

impl Cli {
    /// 未指定子命令时启动服务器
    pub fn command_or_default(&self) -> &Commands {
        self.command.as_ref().unwrap_or(&Commands::Serve)
    }
}
