use anyhow::Result;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::auth::{Authorizer, GoogleAuth};
use crate::cfg::{Cfg, CONFIG_FILE_NAME};
use crate::error::C2gError;

/// Line-oriented questions over any reader/writer pair.
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn read_answer(&mut self, question: &str) -> Result<String, C2gError> {
        write!(self.output, "{} ", question).map_err(C2gError::Prompt)?;
        self.output.flush().map_err(C2gError::Prompt)?;
        let mut answer = String::new();
        let read = self.input.read_line(&mut answer).map_err(C2gError::Prompt)?;
        if read == 0 {
            return Err(C2gError::Prompt(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "input closed before an answer was given",
            )));
        }
        Ok(answer.trim().to_string())
    }

    fn say(&mut self, text: &str) -> Result<(), C2gError> {
        writeln!(self.output, "{}", text).map_err(C2gError::Prompt)
    }

    /// Ask until `validate` accepts the answer. An empty answer means `default`.
    pub fn text(
        &mut self,
        question: &str,
        default: &str,
        validate: impl Fn(&str) -> Result<(), &'static str>,
    ) -> Result<String, C2gError> {
        loop {
            let answer = self.read_answer(&format!("{} ({})", question, default))?;
            let answer = if answer.is_empty() {
                default.to_string()
            } else {
                answer
            };
            match validate(&answer) {
                Ok(()) => return Ok(answer),
                Err(message) => self.say(message)?,
            }
        }
    }

    pub fn confirm(&mut self, question: &str, default: bool) -> Result<bool, C2gError> {
        let hint = if default { "(Y/n)" } else { "(y/N)" };
        loop {
            let answer = self.read_answer(&format!("{} {}", question, hint))?;
            match answer.to_ascii_lowercase().as_str() {
                "" => return Ok(default),
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => self.say("Please answer y or n.")?,
            }
        }
    }
}

fn ask_config<R: BufRead, W: Write>(prompter: &mut Prompter<R, W>) -> Result<Cfg, C2gError> {
    let defaults = Cfg::default();

    let source_dir = prompter.text(
        "Enter the full path of the folder in which your CSV files are located.",
        &defaults.source_dir.to_string_lossy(),
        |answer| {
            if Path::new(answer).exists() {
                Ok(())
            } else {
                Err("Please enter a valid path.")
            }
        },
    )?;
    let target_drive_folder_id = prompter.text(
        "Enter the ID of the Google Drive folder to which you want to upload your CSV files.",
        &defaults.target_drive_folder_id,
        |answer| {
            if answer.is_empty() {
                Err("Please enter a valid ID. If you want to target the root folder in My Drive, enter \"root\".")
            } else {
                Ok(())
            }
        },
    )?;
    let target_is_shared_drive = prompter.confirm(
        "Is the target folder a Shared Drive?",
        defaults.target_is_shared_drive,
    )?;
    let update_existing_google_sheets = prompter.confirm(
        "Do you want to update existing Google Sheets files?",
        defaults.update_existing_google_sheets,
    )?;
    let save_original_files_to_drive = prompter.confirm(
        "Do you want to save the original CSV files to Google Drive?",
        defaults.save_original_files_to_drive,
    )?;

    Ok(Cfg {
        source_dir: PathBuf::from(source_dir),
        target_drive_folder_id,
        target_is_shared_drive,
        update_existing_google_sheets,
        save_original_files_to_drive,
    })
}

/// Write `c2g.config.json` into `dir` from the user's answers. Returns the
/// path written, or `None` when the user kept an existing file.
pub fn init_config<R: BufRead, W: Write>(
    dir: &Path,
    prompter: &mut Prompter<R, W>,
) -> Result<Option<PathBuf>, C2gError> {
    let path = dir.join(CONFIG_FILE_NAME);
    if path.exists()
        && !prompter.confirm(
            "A config file already exists in this directory. Do you want to overwrite it?",
            false,
        )?
    {
        prompter.say("No changes were made.")?;
        return Ok(None);
    }

    let cfg = ask_config(prompter)?;
    cfg.save(&path)?;
    Ok(Some(path))
}

pub async fn init(login_after: bool) -> Result<()> {
    let dir = std::env::current_dir()?;
    let written = {
        let stdin = std::io::stdin();
        let mut prompter = Prompter::new(stdin.lock(), std::io::stdout());
        init_config(&dir, &mut prompter)?
    };
    if let Some(path) = written {
        println!("Created {}", path.display());
    }

    if login_after {
        let auth = GoogleAuth::from_home();
        status(&auth).await?;
        if !auth.is_authorized()? {
            println!("Logging in...");
            login(&auth).await?;
        }
    }
    Ok(())
}

fn logged_in_as(email: Option<String>) -> String {
    format!(
        "You are logged in as {}.",
        email.as_deref().unwrap_or("UNKNOWN")
    )
}

pub async fn status(auth: &GoogleAuth) -> Result<()> {
    if auth.is_authorized()? {
        let drive = auth.authorize().await?;
        println!("{}", logged_in_as(drive.user_email().await));
    } else {
        println!("You are not logged in.");
    }
    Ok(())
}

pub async fn login(auth: &GoogleAuth) -> Result<()> {
    let drive = auth.authorize().await?;
    let email = drive.user_email().await;
    info!("Logged in as {:?}", email);
    println!("{}", logged_in_as(email));
    Ok(())
}

pub fn logout(auth: &GoogleAuth) -> Result<()> {
    if auth.logout()? {
        println!("You have been logged out.");
    } else {
        println!("You are not logged in.");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Cursor;

    fn prompter(answers: &str) -> Prompter<Cursor<Vec<u8>>, Vec<u8>> {
        Prompter::new(Cursor::new(answers.as_bytes().to_vec()), Vec::new())
    }

    #[test]
    fn init_writes_answers() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().to_str().unwrap();
        let mut p = prompter(&format!("{source}\nfolder-42\ny\nn\nyes\n"));

        let path = init_config(dir.path(), &mut p).unwrap().unwrap();
        let cfg = Cfg::load(&path).unwrap();
        assert_eq!(cfg.source_dir, dir.path());
        assert_eq!(cfg.target_drive_folder_id, "folder-42");
        assert!(cfg.target_is_shared_drive);
        assert!(!cfg.update_existing_google_sheets);
        assert!(cfg.save_original_files_to_drive);
    }

    #[test]
    fn invalid_answers_are_asked_again() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().to_str().unwrap();
        let mut p = prompter(&format!("/no/such/dir\n{source}\n\n\nmaybe\n\n\n"));

        let path = init_config(dir.path(), &mut p).unwrap().unwrap();
        let cfg = Cfg::load(&path).unwrap();
        assert_eq!(cfg.target_drive_folder_id, "root");
        assert!(!cfg.target_is_shared_drive);

        let transcript = String::from_utf8(p.output).unwrap();
        assert!(transcript.contains("Please enter a valid path."));
        assert!(transcript.contains("Please answer y or n."));
    }

    #[test]
    fn existing_config_is_kept_unless_confirmed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "{}").unwrap();

        let mut p = prompter("\n");
        assert_eq!(init_config(dir.path(), &mut p).unwrap(), None);
        assert_eq!(fs::read_to_string(&path).unwrap(), "{}");
        assert!(String::from_utf8(p.output).unwrap().contains("No changes were made."));
    }

    #[test]
    fn closed_input_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut p = prompter("");
        assert!(matches!(
            init_config(dir.path(), &mut p),
            Err(C2gError::Prompt(_))
        ));
    }

    #[test]
    fn logged_in_message_falls_back_to_unknown() {
        assert_eq!(
            logged_in_as(Some("me@example.com".into())),
            "You are logged in as me@example.com."
        );
        assert_eq!(logged_in_as(None), "You are logged in as UNKNOWN.");
    }
}
