use std::io;

use thiserror::Error;

/// Main error type for pubsync.
///
/// Record errors signal a caller bug (a reference to something the host does
/// not know about). Adapter errors come from the remote index and are never
/// retried. Config errors prevent the sync engine from being built at all.
#[derive(Debug, Error)]
pub enum Error {
   /// A publication, submission, journal or section reference could not be
   /// resolved.
   #[error("invalid {kind} reference: {id}")]
   InvalidRecord { kind: &'static str, id: String },

   /// The remote search index rejected or failed a request.
   #[error("search index error: {0}")]
   Adapter(#[from] AdapterError),

   /// Settings are missing or unusable.
   #[error("config error: {0}")]
   Config(#[from] ConfigError),

   /// I/O error while reading the catalog or a galley file.
   #[error("io error: {0}")]
   Io(#[from] io::Error),

   /// JSON serialization or deserialization error occurred.
   #[error("json error: {0}")]
   Json(#[from] serde_json::Error),

   /// TOML serialization error occurred.
   #[error("toml error: {0}")]
   Toml(#[from] toml::ser::Error),

   /// Figment could not extract the layered configuration.
   #[error("settings error: {0}")]
   Figment(#[from] Box<figment::Error>),
}

impl Error {
   pub fn invalid_record(kind: &'static str, id: impl ToString) -> Self {
      Self::InvalidRecord { kind, id: id.to_string() }
   }

   pub const fn exit_code(&self) -> i32 {
      match self {
         Self::Config(_) | Self::Figment(_) => 2,
         Self::InvalidRecord { .. } => 3,
         Self::Adapter(_) => 4,
         _ => 1,
      }
   }
}

impl From<figment::Error> for Error {
   fn from(e: figment::Error) -> Self {
      Self::Figment(Box::new(e))
   }
}

/// Errors surfaced by a search index adapter.
#[derive(Debug, Error)]
pub enum AdapterError {
   /// HTTP request failed (network error, timeout, etc.).
   #[error("request failed: {0}")]
   Request(#[from] reqwest::Error),

   /// The service answered with a non-success status.
   #[error("{op} failed with HTTP {status}: {body}")]
   Status { op: &'static str, status: u16, body: String },

   /// The response body could not be interpreted.
   #[error("failed to decode {op} response: {reason}")]
   Decode { op: &'static str, reason: String },

   /// An endpoint URL could not be built from the configured host.
   #[error("invalid endpoint: {0}")]
   Endpoint(String),

   /// Injected or simulated failure from an in-process index.
   #[error("{0}")]
   Unavailable(String),
}

/// Errors raised while loading or validating settings.
#[derive(Debug, Error)]
pub enum ConfigError {
   /// A required setting is empty.
   #[error("missing setting: {0}")]
   MissingSetting(&'static str),

   /// A setting has a value the adapter cannot use.
   #[error("invalid setting: {0}")]
   InvalidSetting(String),
}

/// Standard result type using [`enum@Error`] as the default error type
pub type Result<T, E = Error> = std::result::Result<T, E>;
