use std::{
  fs, io,
  path::{Path, PathBuf},
};

use thiserror::Error;
use tracing::debug;

use super::session::SsoSession;

/// Errors raised while locating or reading cached SSO sessions
#[derive(Debug, Error)]
pub enum SessionError {
  #[error("unable to determine home directory")]
  HomeDirNotFound,

  #[error("SSO cache directory does not exist: {}", path.display())]
  CacheDirMissing { path: PathBuf },

  #[error("no SSO cache files found")]
  NoCacheFiles,

  #[error("no valid SSO session found")]
  NoValidSession,

  #[error("not a session file (no access token)")]
  NotASession,

  #[error("failed to read SSO cache: {0}")]
  Read(#[from] io::Error),

  #[error("failed to parse session JSON: {0}")]
  Parse(#[from] serde_json::Error),
}

/// Read-only view over the AWS SSO cache directory
///
/// `aws sso login` owns the files in this directory; the store never creates,
/// mutates, or deletes them.
#[derive(Debug)]
pub struct SessionStore {
  cache_dir: PathBuf,
}

impl SessionStore {
  /// Store over the default cache location, `<home>/.aws/sso/cache`
  pub fn new() -> Result<Self, SessionError> {
    let home = dirs::home_dir().ok_or(SessionError::HomeDirNotFound)?;
    Ok(Self::with_dir(home.join(".aws").join("sso").join("cache")))
  }

  /// Store over an explicit cache directory
  pub fn with_dir<P: Into<PathBuf>>(cache_dir: P) -> Self {
    Self {
      cache_dir: cache_dir.into(),
    }
  }

  pub fn cache_dir(&self) -> &Path {
    &self.cache_dir
  }

  /// All `*.json` files in the cache directory
  ///
  /// An existing directory without any JSON files yields an empty list, not
  /// an error.
  pub fn session_files(&self) -> Result<Vec<PathBuf>, SessionError> {
    if !self.cache_dir.is_dir() {
      return Err(SessionError::CacheDirMissing {
        path: self.cache_dir.clone(),
      });
    }

    let files = fs::read_dir(&self.cache_dir)?
      .filter_map(|entry| entry.ok().map(|entry| entry.path()))
      .filter(|path| path.extension().map_or(false, |ext| ext == "json"))
      .collect();

    Ok(files)
  }

  /// Search the cache for an unexpired session
  ///
  /// Files that fail to load (malformed JSON, client registrations) are
  /// skipped. Files are visited in directory-listing order; when several hold
  /// valid sessions, which one wins is not guaranteed.
  pub fn find_valid_session(&self) -> Result<SsoSession, SessionError> {
    let files = self.session_files()?;
    if files.is_empty() {
      return Err(SessionError::NoCacheFiles);
    }

    for file in &files {
      let session = match load_session(file) {
        Ok(session) => session,
        Err(_) => continue,
      };

      if session.is_valid() {
        debug!("Valid SSO session in {} (expires at {})", file.display(), session.expires_at);
        return Ok(session);
      }
    }

    Err(SessionError::NoValidSession)
  }
}

/// Load and parse a single SSO session file
///
/// Client registration files share the cache directory but carry no access
/// token; they are rejected as [`SessionError::NotASession`]
pub fn load_session<P: AsRef<Path>>(path: P) -> Result<SsoSession, SessionError> {
  let data = fs::read_to_string(path)?;
  let session: SsoSession = serde_json::from_str(&data)?;

  if session.access_token.is_empty() {
    return Err(SessionError::NotASession);
  }

  Ok(session)
}

#[cfg(test)]
mod tests {
  use chrono::{Duration, Utc};
  use tempfile::TempDir;

  use super::*;

  const CLIENT_REGISTRATION: &str = r#"{"clientId": "client-123", "clientSecret": "secret-456", "expiresAt": "2999-12-31T23:59:59Z"}"#;

  fn write_file(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path
  }

  fn session_json(access_token: &str, offset: Duration) -> String {
    format!(
      r#"{{"startUrl": "https://example.awsapps.com/start", "region": "us-east-1", "accessToken": "{access_token}", "expiresAt": "{}"}}"#,
      (Utc::now() + offset).to_rfc3339()
    )
  }

  #[test]
  fn it_lists_only_json_files() {
    let dir = TempDir::new().unwrap();
    write_file(&dir, "d033e22ae348aeb5660fc2140aec35850c4da997.json", "{}");
    write_file(&dir, "botocore-client-id-us-east-1.json", "{}");
    write_file(&dir, "notes.txt", "text");
    write_file(&dir, "data.xml", "<xml/>");

    let files = SessionStore::with_dir(dir.path()).session_files().unwrap();
    assert_eq!(files.len(), 2);
    assert!(files.iter().all(|file| file.extension().map_or(false, |ext| ext == "json")));
  }

  #[test]
  fn it_lists_nothing_in_a_directory_without_json() {
    let dir = TempDir::new().unwrap();
    write_file(&dir, "notes.txt", "text");

    let files = SessionStore::with_dir(dir.path()).session_files().unwrap();
    assert!(files.is_empty());
  }

  #[test]
  fn it_errors_when_the_cache_dir_is_missing() {
    let dir = TempDir::new().unwrap();
    let store = SessionStore::with_dir(dir.path().join("missing"));

    assert!(matches!(store.session_files(), Err(SessionError::CacheDirMissing { .. })));
  }

  #[test]
  fn it_loads_a_session_with_an_access_token() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "session.json", &session_json("valid-token-123", Duration::hours(1)));

    let session = load_session(&path).unwrap();
    assert_eq!(session.access_token, "valid-token-123");
    assert_eq!(session.start_url, "https://example.awsapps.com/start");
    assert!(session.is_valid());
  }

  #[test]
  fn it_rejects_client_registration_files() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "botocore-client-id-us-east-1.json", CLIENT_REGISTRATION);

    assert!(matches!(load_session(&path), Err(SessionError::NotASession)));
  }

  #[test]
  fn it_rejects_malformed_json() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "broken.json", "{not json");

    assert!(matches!(load_session(&path), Err(SessionError::Parse(_))));
  }

  #[test]
  fn it_rejects_an_unreadable_file() {
    let dir = TempDir::new().unwrap();

    assert!(matches!(
      load_session(dir.path().join("absent.json")),
      Err(SessionError::Read(_))
    ));
  }

  #[test]
  fn it_finds_a_valid_session_among_registrations() {
    let dir = TempDir::new().unwrap();
    write_file(&dir, "botocore-client-id-us-east-1.json", CLIENT_REGISTRATION);
    write_file(&dir, "session.json", &session_json("valid-token-123", Duration::hours(1)));

    let store = SessionStore::with_dir(dir.path());
    let session = store.find_valid_session().unwrap();
    assert_eq!(session.access_token, "valid-token-123");
  }

  #[test]
  fn it_skips_expired_sessions_for_a_valid_one() {
    let dir = TempDir::new().unwrap();
    write_file(&dir, "expired.json", &session_json("expired-token", Duration::hours(-1)));
    write_file(&dir, "fresh.json", &session_json("fresh-token", Duration::hours(8)));

    let store = SessionStore::with_dir(dir.path());
    let session = store.find_valid_session().unwrap();
    assert_eq!(session.access_token, "fresh-token");
  }

  #[test]
  fn it_fails_when_all_sessions_are_expired() {
    let dir = TempDir::new().unwrap();
    write_file(&dir, "expired.json", &session_json("expired-token", Duration::hours(-1)));

    let store = SessionStore::with_dir(dir.path());
    assert!(matches!(store.find_valid_session(), Err(SessionError::NoValidSession)));
  }

  #[test]
  fn it_fails_when_only_registrations_exist() {
    let dir = TempDir::new().unwrap();
    write_file(&dir, "botocore-client-id-us-east-1.json", CLIENT_REGISTRATION);

    let store = SessionStore::with_dir(dir.path());
    assert!(matches!(store.find_valid_session(), Err(SessionError::NoValidSession)));
  }

  #[test]
  fn it_fails_when_the_directory_is_empty() {
    let dir = TempDir::new().unwrap();

    let store = SessionStore::with_dir(dir.path());
    assert!(matches!(store.find_valid_session(), Err(SessionError::NoCacheFiles)));
  }

  #[test]
  fn it_fails_when_the_directory_is_missing() {
    let dir = TempDir::new().unwrap();

    let store = SessionStore::with_dir(dir.path().join("missing"));
    assert!(matches!(store.find_valid_session(), Err(SessionError::CacheDirMissing { .. })));
  }
}
