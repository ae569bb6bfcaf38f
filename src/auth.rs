use google_drive3::DriveHub;
use std::future::Future;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use tracing::{debug, info, warn};
use yup_oauth2::authenticator_delegate::InstalledFlowDelegate;
use yup_oauth2::{InstalledFlowAuthenticator, InstalledFlowReturnMethod};

use crate::drive::{GoogleDrive, RemoteStore};
use crate::error::C2gError;

pub const CREDENTIALS_FILE_NAME: &str = "c2g.creds.json";
pub const TOKEN_FILE_NAME: &str = ".c2grc.json";

const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";

/// Access to the remote store on behalf of the user.
#[allow(async_fn_in_trait)]
pub trait Authorizer {
    type Store: RemoteStore;

    /// Whether a stored token exists. Fails when the OAuth client
    /// credentials are missing altogether.
    fn is_authorized(&self) -> Result<bool, C2gError>;

    /// Load the stored token, or run the interactive login when there is none.
    async fn authorize(&self) -> Result<Self::Store, C2gError>;
}

#[derive(Debug, Clone)]
pub struct GoogleAuth {
    pub credentials_path: PathBuf,
    pub token_path: PathBuf,
}

impl GoogleAuth {
    /// Credentials and token cache live in the user's home directory.
    pub fn from_home() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::in_dir(&home)
    }

    pub fn in_dir(dir: &Path) -> Self {
        Self {
            credentials_path: dir.join(CREDENTIALS_FILE_NAME),
            token_path: dir.join(TOKEN_FILE_NAME),
        }
    }

    /// Delete the token cache. Returns `false` if there was nothing to delete.
    pub fn logout(&self) -> Result<bool, C2gError> {
        match std::fs::remove_file(&self.token_path) {
            Ok(()) => {
                info!("Removed token cache {}", self.token_path.display());
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(C2gError::RemoveToken {
                path: self.token_path.clone(),
                source,
            }),
        }
    }
}

impl Authorizer for GoogleAuth {
    type Store = GoogleDrive;

    fn is_authorized(&self) -> Result<bool, C2gError> {
        if !self.credentials_path.exists() {
            return Err(C2gError::CredentialsNotFound(self.credentials_path.clone()));
        }
        Ok(self.token_path.exists())
    }

    async fn authorize(&self) -> Result<GoogleDrive, C2gError> {
        info!("Initializing Google Drive authentication");

        let secret = yup_oauth2::read_application_secret(&self.credentials_path)
            .await
            .map_err(|source| C2gError::InvalidCredentials {
                path: self.credentials_path.clone(),
                source,
            })?;

        let auth = InstalledFlowAuthenticator::builder(
            secret,
            InstalledFlowReturnMethod::HTTPRedirect,
        )
        .persist_tokens_to_disk(self.token_path.clone())
        .flow_delegate(Box::new(BrowserFlowDelegate))
        .build()
        .await
        .map_err(|e| C2gError::Auth(Box::new(e)))?;

        // Requesting a token up front runs the consent flow now rather than
        // in the middle of the first Drive call.
        auth.token(&[DRIVE_SCOPE])
            .await
            .map_err(|e| C2gError::Auth(Box::new(e)))?;
        debug!("Token available, cached at {}", self.token_path.display());

        let client = hyper::Client::builder().build(
            hyper_rustls::HttpsConnectorBuilder::new()
                .with_webpki_roots()
                .https_or_http()
                .enable_http1()
                .build(),
        );
        Ok(GoogleDrive::new(DriveHub::new(client, auth)))
    }
}

/// Opens the consent page in the default browser and prints its URL in case
/// that fails.
struct BrowserFlowDelegate;

impl InstalledFlowDelegate for BrowserFlowDelegate {
    fn present_user_url<'a>(
        &'a self,
        url: &'a str,
        need_code: bool,
    ) -> Pin<Box<dyn Future<Output = Result<String, String>> + Send + 'a>> {
        Box::pin(async move {
            println!("Please visit this URL to authorize c2g:\n{}", url);
            if let Err(e) = open::that(url) {
                warn!("Failed to open browser: {}", e);
            }
            if !need_code {
                return Ok(String::new());
            }

            print!("Enter the verification code: ");
            io::stdout().flush().map_err(|e| e.to_string())?;
            let mut code = String::new();
            io::stdin()
                .read_line(&mut code)
                .map_err(|e| e.to_string())?;
            Ok(code.trim().to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn missing_credentials_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let auth = GoogleAuth::in_dir(dir.path());
        assert!(matches!(
            auth.is_authorized(),
            Err(C2gError::CredentialsNotFound(_))
        ));
    }

    #[test]
    fn authorized_once_token_exists() {
        let dir = tempfile::tempdir().unwrap();
        let auth = GoogleAuth::in_dir(dir.path());
        fs::write(&auth.credentials_path, "{}").unwrap();
        assert!(!auth.is_authorized().unwrap());

        fs::write(&auth.token_path, "[]").unwrap();
        assert!(auth.is_authorized().unwrap());
    }

    #[test]
    fn logout_removes_token() {
        let dir = tempfile::tempdir().unwrap();
        let auth = GoogleAuth::in_dir(dir.path());
        fs::write(&auth.token_path, "[]").unwrap();

        assert!(auth.logout().unwrap());
        assert!(!auth.token_path.exists());
        assert!(!auth.logout().unwrap());
    }

    #[test]
    fn failed_token_removal_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let auth = GoogleAuth::in_dir(dir.path());
        fs::create_dir(&auth.token_path).unwrap();

        match auth.logout() {
            Err(C2gError::RemoveToken { path, .. }) => assert_eq!(path, auth.token_path),
            other => panic!("expected a removal error, got {other:?}"),
        }
        assert!(auth.token_path.exists());
    }

    #[tokio::test]
    async fn unreadable_credentials_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let auth = GoogleAuth::in_dir(dir.path());
        fs::write(&auth.credentials_path, "not json").unwrap();
        assert!(matches!(
            auth.authorize().await,
            Err(C2gError::InvalidCredentials { .. })
        ));
    }
}
