use google_drive3::api::{File, Scope};
use google_drive3::DriveHub;
use mime::Mime;
use std::io::Cursor;
use tracing::debug;

use crate::error::C2gError;

pub const SPREADSHEET_MIME_TYPE: &str = "application/vnd.google-apps.spreadsheet";
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

pub type Hub = DriveHub<hyper_rustls::HttpsConnector<hyper::client::HttpConnector>>;

/// An existing file or folder found by a listing call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RemoteFileRef {
    pub id: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilePage {
    pub files: Vec<RemoteFileRef>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRequest {
    pub query: String,
    pub fields: &'static str,
    pub page_token: Option<String>,
    pub shared_drive: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Media {
    pub bytes: Vec<u8>,
    pub mime_type: Mime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateRequest {
    pub name: String,
    pub mime_type: String,
    pub parents: Vec<String>,
    pub shared_drive: bool,
    pub media: Option<Media>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateRequest {
    pub file_id: String,
    pub shared_drive: bool,
    pub media: Media,
}

/// The three Drive calls a conversion needs.
#[allow(async_fn_in_trait)]
pub trait RemoteStore {
    async fn list_files(&self, request: &ListRequest) -> Result<FilePage, C2gError>;

    /// Returns the id of the new file, if the service reported one.
    async fn create_file(&self, request: CreateRequest) -> Result<Option<String>, C2gError>;

    async fn update_file(&self, request: UpdateRequest) -> Result<(), C2gError>;
}

pub struct GoogleDrive {
    hub: Hub,
}

impl GoogleDrive {
    pub fn new(hub: Hub) -> Self {
        Self { hub }
    }

    /// Email address of the signed-in account. Any failure yields `None`.
    pub async fn user_email(&self) -> Option<String> {
        let result = self
            .hub
            .about()
            .get()
            .param("fields", "user(emailAddress)")
            .add_scope(Scope::Full)
            .doit()
            .await;

        match result {
            Ok((_, about)) => about.user.and_then(|user| user.email_address),
            Err(e) => {
                debug!("Could not look up the current user: {}", e);
                None
            }
        }
    }
}

impl RemoteStore for GoogleDrive {
    async fn list_files(&self, request: &ListRequest) -> Result<FilePage, C2gError> {
        debug!("Listing files: q={} page_token={:?}", request.query, request.page_token);

        let mut call = self
            .hub
            .files()
            .list()
            .q(&request.query)
            .param("fields", request.fields)
            .supports_all_drives(request.shared_drive)
            .include_items_from_all_drives(request.shared_drive)
            .add_scope(Scope::Full);
        if let Some(token) = request.page_token.as_deref() {
            call = call.page_token(token);
        }

        let (_, list) = call
            .doit()
            .await
            .map_err(|e| C2gError::remote("list files", e))?;

        let files = list
            .files
            .unwrap_or_default()
            .into_iter()
            .map(|f| RemoteFileRef {
                id: f.id,
                name: f.name.unwrap_or_default(),
            })
            .collect();
        Ok(FilePage {
            files,
            next_page_token: list.next_page_token,
        })
    }

    async fn create_file(&self, request: CreateRequest) -> Result<Option<String>, C2gError> {
        debug!("Creating {} ({}) in {:?}", request.name, request.mime_type, request.parents);

        let metadata = File {
            name: Some(request.name),
            mime_type: Some(request.mime_type.clone()),
            parents: Some(request.parents),
            ..Default::default()
        };
        // Folders are created through the same multipart upload with an empty body.
        let (bytes, media_type) = match request.media {
            Some(media) => (media.bytes, media.mime_type),
            None => (
                Vec::new(),
                request
                    .mime_type
                    .parse::<Mime>()
                    .map_err(|e| C2gError::remote("create file", e))?,
            ),
        };

        let (_, file) = self
            .hub
            .files()
            .create(metadata)
            .supports_all_drives(request.shared_drive)
            .add_scope(Scope::Full)
            .upload(Cursor::new(bytes), media_type)
            .await
            .map_err(|e| C2gError::remote("create file", e))?;
        Ok(file.id)
    }

    async fn update_file(&self, request: UpdateRequest) -> Result<(), C2gError> {
        debug!("Updating {}", request.file_id);

        self.hub
            .files()
            .update(File::default(), &request.file_id)
            .supports_all_drives(request.shared_drive)
            .add_scope(Scope::Full)
            .upload(Cursor::new(request.media.bytes), request.media.mime_type)
            .await
            .map_err(|e| C2gError::remote("update file", e))?;
        Ok(())
    }
}
