use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use adgen_core::image::{ImageOptions, ImageQuality, ImageSize, ImageStyle};
use adgen_worker::commands;
use adgen_worker::config::WorkerConfig;

#[derive(Debug, Parser)]
#[command(name = "adgen-worker", version, about = "Generate ad images and publish paused ads")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate and publish every job in a JSON jobs file.
    Run {
        /// File holding one job object or an array of jobs.
        jobs: PathBuf,
    },
    /// Check credentials, permissions, and page access.
    Check,
    /// Generate a single image.
    Generate {
        #[arg(long)]
        prompt: String,
        /// Save the image here.
        #[arg(long)]
        out: Option<PathBuf>,
        #[arg(long, default_value = "1024x1024")]
        size: ImageSize,
        #[arg(long, default_value = "standard")]
        quality: ImageQuality,
        #[arg(long, default_value = "vivid")]
        style: ImageStyle,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = WorkerConfig::from_env()?;
    tracing::debug!(?config, "Loaded configuration");

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received; stopping after the current step");
            on_signal.cancel();
        }
    });

    match cli.command {
        Command::Run { jobs } => {
            let summary = commands::run(&config, &jobs, &cancel).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
            anyhow::ensure!(summary.failed == 0, "{} job(s) failed", summary.failed);
        }
        Command::Check => {
            let report = commands::check(&config).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            anyhow::ensure!(report.is_healthy(), "diagnostics found problems");
        }
        Command::Generate {
            prompt,
            out,
            size,
            quality,
            style,
        } => {
            let options = ImageOptions {
                size,
                quality,
                style,
            };
            let image = commands::generate(&config, &prompt, options, out.as_deref()).await?;
            println!("{}", serde_json::to_string_pretty(&image)?);
        }
    }

    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "adgen_worker=info,adgen_pipeline=info,adgen_adplatform=info,adgen_imagegen=info".into()
    });
    let registry = tracing_subscriber::registry().with(filter);

    if std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json")) {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
