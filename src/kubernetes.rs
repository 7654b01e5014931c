use std::io::{self, Write};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// API version kubectl expects from a client-go credential plugin
pub const API_VERSION: &str = "client.authentication.k8s.io/v1beta1";

/// Kind of the emitted credential object
pub const KIND: &str = "ExecCredential";

#[derive(Debug, Error)]
pub enum CredentialError {
  #[error("failed to serialize credential: {0}")]
  Serialize(#[from] serde_json::Error),

  #[error("failed to write credential: {0}")]
  Write(#[from] io::Error),
}

/// Credential object consumed by kubectl over stdout
///
/// <https://kubernetes.io/docs/reference/access-authn-authz/authentication/#input-and-output-formats>
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecCredential {
  /// APIVersion defines the versioned schema of this representation of an object
  api_version: String,

  /// Kind is a string value representing the REST resource this object represents
  kind: String,

  /// Status carries the bearer token and its expiry
  status: ExecCredentialStatus,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExecCredentialStatus {
  /// Bearer token presented to the API server
  token: String,

  /// Expiry of the token as an RFC 3339 timestamp; omitted when empty
  #[serde(default, skip_serializing_if = "String::is_empty")]
  expiration_timestamp: String,
}

impl ExecCredential {
  /// Wrap a bearer token and its expiry in the fixed exec-credential schema
  pub fn new<T: Into<String>>(token: T, expiration: DateTime<Utc>) -> Self {
    ExecCredential {
      api_version: API_VERSION.to_owned(),
      kind: KIND.to_owned(),
      status: ExecCredentialStatus {
        token: token.into(),
        expiration_timestamp: expiration.to_rfc3339_opts(SecondsFormat::Secs, true),
      },
    }
  }

  pub fn token(&self) -> &str {
    &self.status.token
  }

  pub fn expiration_timestamp(&self) -> &str {
    &self.status.expiration_timestamp
  }

  /// Serialize with stable field order and two-space indentation, plus a
  /// trailing newline
  pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), CredentialError> {
    serde_json::to_writer_pretty(&mut *writer, self)?;
    writer.write_all(b"\n")?;
    Ok(())
  }

  /// Write the credential to stdout
  ///
  /// stdout is reserved for this one object; everything else the tool emits
  /// goes to stderr
  pub fn print(&self) -> Result<(), CredentialError> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    self.write_to(&mut handle)?;
    handle.flush()?;

    Ok(())
  }
}
