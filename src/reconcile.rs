use tracing::{debug, info};

use crate::cfg::Cfg;
use crate::drive::{
    CreateRequest, ListRequest, RemoteFileRef, RemoteStore, FOLDER_MIME_TYPE,
    SPREADSHEET_MIME_TYPE,
};
use crate::error::C2gError;
use crate::local::LocalCsvEntry;

pub const BACKUP_FOLDER_NAME: &str = "csv";

/// Every non-trashed spreadsheet directly inside the target folder, across all
/// result pages. Empty without any remote call when updating is disabled.
pub async fn list_existing_spreadsheets<S: RemoteStore>(
    store: &S,
    cfg: &Cfg,
) -> Result<Vec<RemoteFileRef>, C2gError> {
    if !cfg.update_existing_google_sheets {
        debug!("Updating existing sheets is disabled, skipping remote listing");
        return Ok(Vec::new());
    }

    let mut request = ListRequest {
        query: format!(
            "'{}' in parents and mimeType = '{}' and trashed = false",
            cfg.drive_parent_id(),
            SPREADSHEET_MIME_TYPE
        ),
        fields: "nextPageToken, files(id, name)",
        page_token: None,
        shared_drive: cfg.target_is_shared_drive,
    };
    let mut existing = Vec::new();
    let mut pages = 0usize;
    loop {
        let page = store.list_files(&request).await?;
        pages += 1;
        existing.extend(page.files);
        match page.next_page_token {
            Some(token) => request.page_token = Some(token),
            None => break,
        }
    }

    info!(
        "Found {} existing Google Sheets files in {} page(s)",
        existing.len(),
        pages
    );
    Ok(existing)
}

/// Id of the remote spreadsheet named exactly `local_name`.
///
/// More than one spreadsheet with that name is an error rather than a guess.
/// A single match without an id counts as no match.
pub fn match_id<'a>(
    local_name: &str,
    remote: &'a [RemoteFileRef],
) -> Result<Option<&'a str>, C2gError> {
    let mut matches = remote.iter().filter(|f| f.name == local_name);
    let Some(first) = matches.next() else {
        return Ok(None);
    };
    let extra = matches.count();
    if extra > 0 {
        return Err(C2gError::AmbiguousMatch {
            name: local_name.to_string(),
            count: extra + 1,
        });
    }
    Ok(first.id.as_deref())
}

/// Pair each local file with the remote spreadsheet it should overwrite, if any.
pub fn build_entries(
    paths: Vec<std::path::PathBuf>,
    remote: &[RemoteFileRef],
) -> Result<Vec<LocalCsvEntry>, C2gError> {
    paths
        .into_iter()
        .map(|path| {
            let mut entry = LocalCsvEntry::from_path(path);
            entry.matched_remote_id = match_id(&entry.name, remote)?.map(str::to_string);
            Ok(entry)
        })
        .collect()
}

/// Finds or creates the `csv` folder that receives copies of the original
/// files. The outcome is cached, so later calls in the same run make no
/// remote requests.
#[derive(Debug, Default)]
pub struct BackupFolder {
    resolved: Option<Option<String>>,
}

impl BackupFolder {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn resolve<S: RemoteStore>(
        &mut self,
        store: &S,
        cfg: &Cfg,
    ) -> Result<Option<String>, C2gError> {
        if let Some(resolved) = &self.resolved {
            return Ok(resolved.clone());
        }
        let resolved = resolve_backup_folder_id(store, cfg).await?;
        self.resolved = Some(resolved.clone());
        Ok(resolved)
    }
}

async fn resolve_backup_folder_id<S: RemoteStore>(
    store: &S,
    cfg: &Cfg,
) -> Result<Option<String>, C2gError> {
    if !cfg.save_original_files_to_drive {
        return Ok(None);
    }

    let request = ListRequest {
        query: format!(
            "name = '{}' and '{}' in parents and mimeType = '{}' and trashed = false",
            BACKUP_FOLDER_NAME,
            cfg.drive_parent_id(),
            FOLDER_MIME_TYPE
        ),
        fields: "files(id, name)",
        page_token: None,
        shared_drive: cfg.target_is_shared_drive,
    };
    let page = store.list_files(&request).await?;
    if let Some(id) = page.files.into_iter().next().and_then(|f| f.id) {
        info!("Using existing {} folder: {}", BACKUP_FOLDER_NAME, id);
        return Ok(Some(id));
    }

    // The target is always declared as parent, including `root`.
    let id = store
        .create_file(CreateRequest {
            name: BACKUP_FOLDER_NAME.to_string(),
            mime_type: FOLDER_MIME_TYPE.to_string(),
            parents: vec![cfg.drive_parent_id().to_string()],
            shared_drive: cfg.target_is_shared_drive,
            media: None,
        })
        .await?
        .filter(|id| !id.is_empty())
        .ok_or(C2gError::FolderCreationFailed)?;

    info!("Created {} folder: {}", BACKUP_FOLDER_NAME, id);
    Ok(Some(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drive::fake::{file, FakeStore};
    use std::path::PathBuf;

    fn cfg(update: bool, save: bool) -> Cfg {
        Cfg {
            source_dir: PathBuf::from("."),
            target_drive_folder_id: "TargetDriveFolderId12345".to_string(),
            target_is_shared_drive: true,
            update_existing_google_sheets: update,
            save_original_files_to_drive: save,
        }
    }

    #[test]
    fn match_by_exact_name() {
        let refs = vec![file(Some("12345"), "file1"), file(None, "file2")];
        assert_eq!(match_id("file1", &refs).unwrap(), Some("12345"));
        assert_eq!(match_id("file2", &refs).unwrap(), None);
        assert_eq!(match_id("file99", &refs).unwrap(), None);
        assert_eq!(match_id("FILE1", &refs).unwrap(), None);
        assert_eq!(match_id("anything", &[]).unwrap(), None);
    }

    #[test]
    fn duplicate_names_are_ambiguous() {
        let refs = vec![
            file(Some("a"), "report"),
            file(Some("b"), "other"),
            file(Some("c"), "report"),
        ];
        match match_id("report", &refs) {
            Err(C2gError::AmbiguousMatch { name, count }) => {
                assert_eq!(name, "report");
                assert_eq!(count, 2);
            }
            other => panic!("expected ambiguous match, got {other:?}"),
        }
        assert_eq!(match_id("other", &refs).unwrap(), Some("b"));
    }

    #[test]
    fn entries_carry_matched_ids() {
        let refs = vec![file(Some("12345"), "file1")];
        let entries = build_entries(
            vec![PathBuf::from("/d/file1.csv"), PathBuf::from("/d/file2.CSV")],
            &refs,
        )
        .unwrap();
        assert_eq!(entries[0].matched_remote_id.as_deref(), Some("12345"));
        assert_eq!(entries[1].name, "file2");
        assert_eq!(entries[1].matched_remote_id, None);
    }

    #[tokio::test]
    async fn listing_is_skipped_when_not_updating() {
        let store = FakeStore::new();
        let found = list_existing_spreadsheets(&store, &cfg(false, false))
            .await
            .unwrap();
        assert!(found.is_empty());
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn listing_follows_page_tokens_in_order() {
        let store = FakeStore::new();
        store.push_page(
            vec![file(Some("1"), "one"), file(Some("2"), "two")],
            Some("next-page"),
        );
        store.push_page(vec![file(Some("3"), "three")], None);

        let found = list_existing_spreadsheets(&store, &cfg(true, false))
            .await
            .unwrap();
        let names: Vec<_> = found.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["one", "two", "three"]);

        let lists = store.lists();
        assert_eq!(lists.len(), 2);
        assert_eq!(lists[0].page_token, None);
        assert_eq!(lists[1].page_token.as_deref(), Some("next-page"));
        assert!(lists[0].shared_drive);
        assert_eq!(
            lists[0].query,
            "'TargetDriveFolderId12345' in parents and mimeType = \
             'application/vnd.google-apps.spreadsheet' and trashed = false"
        );
    }

    #[tokio::test]
    async fn no_backup_folder_when_not_saving_originals() {
        let store = FakeStore::new();
        let mut folder = BackupFolder::new();
        assert_eq!(folder.resolve(&store, &cfg(false, false)).await.unwrap(), None);
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn existing_backup_folder_is_reused() {
        let store = FakeStore::new();
        store.push_page(vec![file(Some("csv-folder"), "csv")], None);

        let mut folder = BackupFolder::new();
        let id = folder.resolve(&store, &cfg(false, true)).await.unwrap();
        assert_eq!(id.as_deref(), Some("csv-folder"));
        assert!(store.creates().is_empty());
        assert!(store.lists()[0].query.starts_with("name = 'csv' and"));
    }

    #[tokio::test]
    async fn missing_backup_folder_is_created_once() {
        let store = FakeStore::new();
        store.push_page(vec![], None);
        store.push_created_id(Some("new-folder"));

        let mut folder = BackupFolder::new();
        let config = cfg(false, true);
        let first = folder.resolve(&store, &config).await.unwrap();
        let second = folder.resolve(&store, &config).await.unwrap();
        assert_eq!(first.as_deref(), Some("new-folder"));
        assert_eq!(second, first);

        assert_eq!(store.lists().len(), 1);
        let creates = store.creates();
        assert_eq!(creates.len(), 1);
        assert_eq!(creates[0].name, "csv");
        assert_eq!(creates[0].mime_type, FOLDER_MIME_TYPE);
        assert_eq!(creates[0].parents, vec!["TargetDriveFolderId12345"]);
        assert!(creates[0].media.is_none());
    }

    #[tokio::test]
    async fn folder_listed_without_id_triggers_creation() {
        let store = FakeStore::new();
        store.push_page(vec![file(None, "csv")], None);
        store.push_created_id(Some("fresh"));

        let mut folder = BackupFolder::new();
        let id = folder.resolve(&store, &cfg(false, true)).await.unwrap();
        assert_eq!(id.as_deref(), Some("fresh"));
        assert_eq!(store.creates().len(), 1);
    }

    #[tokio::test]
    async fn root_target_is_declared_as_parent() {
        let store = FakeStore::new();
        store.push_page(vec![], None);
        let mut config = cfg(false, true);
        config.target_drive_folder_id = "root".to_string();

        BackupFolder::new().resolve(&store, &config).await.unwrap();
        assert_eq!(store.creates()[0].parents, vec!["root"]);
    }

    #[tokio::test]
    async fn creation_without_id_fails() {
        let store = FakeStore::new();
        store.push_page(vec![], None);
        store.push_created_id(None);

        let err = BackupFolder::new()
            .resolve(&store, &cfg(false, true))
            .await
            .unwrap_err();
        assert!(matches!(err, C2gError::FolderCreationFailed));
    }
}
