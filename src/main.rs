use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;
use tracing::{debug, info};

mod args;
mod auth;
mod cfg;
mod commands;
mod drive;
mod error;
mod job;
mod local;
mod progress;
mod reconcile;

use args::{Args, Command};
use auth::GoogleAuth;
use error::C2gError;
use job::{ConvertOptions, SystemBrowser};
use progress::Progress;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logging
    init_logging(&args.log_level);

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            let code = e.downcast_ref::<C2gError>().map_or(1, C2gError::exit_code);
            debug!("Exiting with status {}: {:?}", code, e);
            ExitCode::from(code)
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let auth = GoogleAuth::from_home();

    match args.command {
        Command::Init { login } => commands::init(login).await,
        Command::Login { status: true } => commands::status(&auth).await,
        Command::Login { status: false } => commands::login(&auth).await,
        Command::Logout => commands::logout(&auth),
        Command::Convert {
            config_file_path,
            dry_run,
            browse,
        } => {
            let opts = ConvertOptions {
                config_file_path,
                dry_run,
                browse,
            };
            let summary = {
                let mut progress = Progress::stdout();
                job::run_convert(&opts, &auth, &SystemBrowser, &mut progress).await?
            };
            for file in &summary.files {
                info!(
                    "{}: {:?} sheet={:?} backup={:?}",
                    file.basename, file.action, file.sheet_id, file.backup_id
                );
            }
            if let Some(url) = &summary.opened_url {
                debug!("Opened {}", url);
            }
            info!("Processed {} file(s)", summary.files.len());
            Ok(())
        }
    }
}

fn init_logging(level: &str) {
    let filter = match level {
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_max_level(filter)
        .with_writer(std::io::stderr)
        .init();
}
