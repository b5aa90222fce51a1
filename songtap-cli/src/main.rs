mod capture;
mod cli;
mod config;
mod error;

use crate::{
    capture::FrameSource,
    cli::{Args, Commands},
    config::{AppConfig, Overrides},
    error::{AppError, Result},
};
use clap::Parser;
use songtap_engine::{HttpFetcher, Ownership, Session};
use std::process;
use tracing::{error, info};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(e) = run(args).await {
        error!("Application error: {}", e);
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    init_logging(args.verbose, args.quiet)?;

    let mut config = AppConfig::load(args.config.as_deref())?;

    match args.command {
        Commands::Devices => {
            for (name, desc) in capture::list_devices()? {
                match desc {
                    Some(desc) => println!("{name}\t{desc}"),
                    None => println!("{name}"),
                }
            }
        }

        Commands::Listen {
            device,
            filter,
            output_dir,
            delay,
        } => {
            config.apply(Overrides {
                device,
                filter,
                output_dir,
                delay,
            });
            let source = FrameSource::live(&config.capture)?;
            println!("Listening on {}: {}", source.origin, source.filter);
            process_frames(&config, source).await?;
        }

        Commands::Replay {
            file,
            filter,
            output_dir,
            delay,
        } => {
            config.apply(Overrides {
                device: None,
                filter: None,
                output_dir,
                delay,
            });
            let source =
                FrameSource::file(&file, filter.as_deref(), config.capture.channel_capacity)?;
            info!(file = %source.origin, "Replaying capture");
            process_frames(&config, source).await?;
        }
    }

    Ok(())
}

/// Feed every captured frame through one session until the source ends or Ctrl-C.
async fn process_frames(config: &AppConfig, mut source: FrameSource) -> Result<()> {
    let fetcher = HttpFetcher::new(config.engine.downloader_config(), Ownership::from_env())?;
    let mut session = Session::from_config(&config.engine, source.layout, fetcher)?;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            frame = source.frames.recv() => match frame {
                Some(frame) => {
                    session.handle_frame(&frame).await;
                }
                None => break,
            },
            result = &mut shutdown => {
                result?;
                info!("Interrupted, stopping capture");
                break;
            }
        }
    }

    let captured = source.finish().await?;
    info!(captured, stats = %session.stats(), "Session finished");
    Ok(())
}

fn init_logging(verbose: bool, quiet: bool) -> Result<()> {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        default_filter()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_level(verbose))
        .try_init()
        .map_err(|e| AppError::Logging(e.to_string()))
}

/// `RUST_LOG` when set and valid, `info` otherwise.
fn default_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}
