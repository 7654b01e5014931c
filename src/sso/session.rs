use chrono::{DateTime, Utc};
use serde::Deserialize;

/// A cached AWS SSO session as written by `aws sso login`
///
/// Files in the SSO cache directory hold either a session like this one or a
/// client registration from the device-registration step. Registration files
/// carry no access token, which is how the two are told apart.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SsoSession {
  /// SSO portal URL the session was created against
  pub start_url: String,

  /// Region of the SSO session
  pub region: String,

  /// Bearer access token; empty in client registration files
  pub access_token: String,

  /// Expiry instant as an RFC 3339 timestamp
  pub expires_at: String,
}

impl SsoSession {
  /// Whether the session is unexpired
  ///
  /// An `expires_at` that fails to parse as RFC 3339 (including the empty
  /// string) means the session is not valid; it is never an error.
  pub fn is_valid(&self) -> bool {
    match DateTime::parse_from_rfc3339(&self.expires_at) {
      Ok(expires_at) => Utc::now() < expires_at.with_timezone(&Utc),
      Err(_) => false,
    }
  }
}
