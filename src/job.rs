use std::io::{self, Write};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::auth::Authorizer;
use crate::cfg::{drive_folder_url, resolve_config_path, Cfg};
use crate::drive::{CreateRequest, Media, RemoteStore, UpdateRequest, SPREADSHEET_MIME_TYPE};
use crate::error::C2gError;
use crate::local::{csv_shape, list_local_csv_files, LocalCsvEntry};
use crate::progress::Progress;
use crate::reconcile::{build_entries, list_existing_spreadsheets, BackupFolder};

#[derive(Debug, Clone, Default)]
pub struct ConvertOptions {
    pub config_file_path: Option<PathBuf>,
    pub dry_run: bool,
    pub browse: bool,
}

/// Opens URLs for the user. Failures are reported, never fatal.
pub trait Browser {
    fn open(&self, url: &str) -> io::Result<()>;
}

pub struct SystemBrowser;

impl Browser for SystemBrowser {
    fn open(&self, url: &str) -> io::Result<()> {
        open::that(url)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Created,
    Updated,
    /// Dry run; nothing was sent.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutcome {
    pub basename: String,
    pub action: Action,
    pub sheet_id: Option<String>,
    pub backup_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConvertSummary {
    pub files: Vec<FileOutcome>,
    pub opened_url: Option<String>,
}

pub async fn run_convert<A, B, W>(
    opts: &ConvertOptions,
    auth: &A,
    browser: &B,
    progress: &mut Progress<W>,
) -> Result<ConvertSummary, C2gError>
where
    A: Authorizer,
    B: Browser,
    W: Write,
{
    info!("Starting conversion (dry_run={})", opts.dry_run);

    if !opts.dry_run && !auth.is_authorized()? {
        return Err(C2gError::NotAuthorized);
    }

    let config_path = resolve_config_path(opts.config_file_path.as_deref());
    let cfg = Cfg::load(&config_path)?;

    let csv_files = list_local_csv_files(&cfg.source_dir)?;
    if csv_files.is_empty() {
        return Err(C2gError::NoCsvFilesFound);
    }

    let settings = format!(
        "Converting local CSV to Google Sheet with the following settings:\n  {}",
        cfg.settings_summary()
    );
    let mut summary = if opts.dry_run {
        progress.line(format!(
            "Running on dry-run mode. No actual changes will be made.\n\n{}",
            settings
        ));
        let entries = build_entries(csv_files, &[])?;
        preview_files(&entries, progress)
    } else {
        progress.line(settings);
        // No spinner while the login flow may prompt on the terminal.
        info!("Authorizing");
        let store = auth.authorize().await?;
        convert_files(&store, &cfg, csv_files, progress).await?
    };

    if opts.browse {
        let url = drive_folder_url(&cfg.target_drive_folder_id);
        progress.line(format!("Opening {} on your browser...", url));
        if let Err(e) = browser.open(&url) {
            warn!("Failed to open browser: {}", e);
        }
        summary.opened_url = Some(url);
    }

    info!("Conversion finished for {} file(s)", summary.files.len());
    Ok(summary)
}

fn processing_line(entry: &LocalCsvEntry) -> String {
    format!(
        "Processing {} (existing Google Sheets file: {})",
        entry.basename,
        entry.matched_remote_id.as_deref().unwrap_or("none")
    )
}

fn preview_files<W: Write>(
    entries: &[LocalCsvEntry],
    progress: &mut Progress<W>,
) -> ConvertSummary {
    let mut summary = ConvertSummary::default();
    for entry in entries {
        let mut line = processing_line(entry);
        match csv_shape(&entry.full_path) {
            Ok(shape) => line.push_str(&format!(
                " [{} rows x {} columns]",
                shape.rows, shape.columns
            )),
            Err(e) => warn!("Could not read {}: {}", entry.full_path.display(), e),
        }
        progress.line(line);
        progress.line(format!("Done: {}", entry.basename));

        summary.files.push(FileOutcome {
            basename: entry.basename.clone(),
            action: Action::Skipped,
            sheet_id: None,
            backup_id: None,
        });
    }
    summary
}

async fn convert_files<S: RemoteStore, W: Write>(
    store: &S,
    cfg: &Cfg,
    csv_files: Vec<PathBuf>,
    progress: &mut Progress<W>,
) -> Result<ConvertSummary, C2gError> {
    progress.spin("Looking up existing Google Sheets files...");
    let existing = list_existing_spreadsheets(store, cfg).await?;
    let entries = build_entries(csv_files, &existing)?;

    let backup_folder_id = BackupFolder::new().resolve(store, cfg).await?;

    let mut summary = ConvertSummary::default();
    for entry in &entries {
        progress.line(processing_line(entry));
        progress.spin(format!("Converting {}...", entry.basename));

        let bytes = tokio::fs::read(&entry.full_path)
            .await
            .map_err(|source| C2gError::ReadFile {
                path: entry.full_path.clone(),
                source,
            })?;
        debug!("Read {} bytes from {}", bytes.len(), entry.full_path.display());

        let (action, sheet_id) = match entry
            .matched_remote_id
            .as_deref()
            .filter(|_| cfg.update_existing_google_sheets)
        {
            Some(id) => {
                store
                    .update_file(UpdateRequest {
                        file_id: id.to_string(),
                        shared_drive: cfg.target_is_shared_drive,
                        media: csv_media(bytes.clone()),
                    })
                    .await?;
                info!("Updated Google Sheets file {} from {}", id, entry.basename);
                (Action::Updated, Some(id.to_string()))
            }
            None => {
                let id = store
                    .create_file(CreateRequest {
                        name: entry.name.clone(),
                        mime_type: SPREADSHEET_MIME_TYPE.to_string(),
                        parents: vec![cfg.drive_parent_id().to_string()],
                        shared_drive: cfg.target_is_shared_drive,
                        media: Some(csv_media(bytes.clone())),
                    })
                    .await?;
                info!("Created Google Sheets file {:?} from {}", id, entry.basename);
                (Action::Created, id)
            }
        };

        let backup_id = match backup_folder_id.as_deref() {
            Some(folder_id) if cfg.save_original_files_to_drive => {
                let id = store
                    .create_file(CreateRequest {
                        name: entry.basename.clone(),
                        mime_type: mime::TEXT_CSV.to_string(),
                        parents: vec![folder_id.to_string()],
                        shared_drive: cfg.target_is_shared_drive,
                        media: Some(csv_media(bytes)),
                    })
                    .await?;
                debug!("Saved original {} as {:?}", entry.basename, id);
                id
            }
            _ => None,
        };

        progress.line(format!("Done: {}", entry.basename));
        summary.files.push(FileOutcome {
            basename: entry.basename.clone(),
            action,
            sheet_id,
            backup_id,
        });
    }
    Ok(summary)
}

fn csv_media(bytes: Vec<u8>) -> Media {
    Media {
        bytes,
        mime_type: mime::TEXT_CSV,
    }
}
