use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "c2g")]
#[command(about = "Convert local CSV files into Google Sheets files")]
#[command(version)]
pub struct Args {
    /// Log level
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a config file in the current directory
    Init {
        /// Log in to Google Drive after writing the config file
        #[arg(long)]
        login: bool,
    },

    /// Log in to Google Drive
    Login {
        /// Show the current login state instead of logging in
        #[arg(long)]
        status: bool,
    },

    /// Log out by deleting the stored token
    Logout,

    /// Convert local CSV files into Google Sheets files based on the config file
    Convert {
        /// Path to the config file (defaults to c2g.config.json in the current directory)
        #[arg(long, value_name = "PATH")]
        config_file_path: Option<PathBuf>,

        /// Show what would be converted without touching Google Drive
        #[arg(long)]
        dry_run: bool,

        /// Open the target Google Drive folder in the browser when done
        #[arg(long)]
        browse: bool,
    },
}
