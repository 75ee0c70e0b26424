//! Typed action payloads.
//!
//! On the wire an action is `{"type": "<action type>", "data": {...}}`. The
//! `data` object is validated against the action type when it is decoded, so
//! a malformed `fs_write` is rejected when the action is added to a plan rather
//! than when the plan runs. Unknown action types are kept as
//! [`ActionPayload::Reserved`] and executed as no-ops.

use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::PayloadError;

/// Action type of [`ActionPayload::FsWrite`].
pub const FS_WRITE: &str = "fs_write";
/// Action type of [`ActionPayload::FsDelete`].
pub const FS_DELETE: &str = "fs_delete";
/// Action type of [`ActionPayload::FsMove`].
pub const FS_MOVE: &str = "fs_move";
/// Action type of [`ActionPayload::DbInsert`].
pub const DB_INSERT: &str = "db_insert";

/// How `fs_write` content is encoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentEncoding {
    /// Content is the literal UTF-8 text to write.
    #[default]
    Utf8,
    /// Content is standard base64 of the bytes to write.
    Base64,
}

/// What an action does.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionPayload {
    /// Create or overwrite a file.
    FsWrite {
        /// Target file.
        path: PathBuf,
        /// Content, encoded per `encoding`.
        content: String,
        /// Content encoding.
        encoding: ContentEncoding,
    },
    /// Delete a file. A missing file is a no-op.
    FsDelete {
        /// Target file.
        path: PathBuf,
    },
    /// Move a file, replacing any existing destination.
    FsMove {
        /// Existing file.
        source: PathBuf,
        /// New location.
        dest: PathBuf,
    },
    /// Record insertion handled outside the filesystem; a no-op here.
    DbInsert(Value),
    /// Any other action type; carried through and executed as a no-op.
    Reserved {
        /// The declared action type.
        action_type: String,
        /// The raw data.
        data: Value,
    },
}

#[derive(Deserialize)]
struct FsWriteData {
    path: PathBuf,
    content: String,
    #[serde(default)]
    encoding: ContentEncoding,
}

#[derive(Deserialize)]
struct FsDeleteData {
    path: PathBuf,
}

#[derive(Deserialize)]
struct FsMoveData {
    #[serde(alias = "from")]
    source: PathBuf,
    #[serde(alias = "to", alias = "destination")]
    dest: PathBuf,
}

fn parse<T: serde::de::DeserializeOwned>(action_type: &str, data: Value) -> Result<T, PayloadError> {
    serde_json::from_value(data).map_err(|e| invalid(action_type, e.to_string()))
}

fn invalid(action_type: &str, message: impl Into<String>) -> PayloadError {
    PayloadError::Invalid {
        action_type: action_type.to_string(),
        message: message.into(),
    }
}

fn require_path(action_type: &str, field: &str, path: &Path) -> Result<(), PayloadError> {
    if path.as_os_str().is_empty() {
        return Err(invalid(action_type, format!("{field} must not be empty")));
    }
    Ok(())
}

impl ActionPayload {
    /// Decode and validate `data` for `action_type`.
    ///
    /// # Errors
    ///
    /// Returns [`PayloadError`] if a known action type's data is missing
    /// fields, has empty paths, or (for base64 writes) does not decode.
    pub fn decode(action_type: &str, data: Value) -> Result<Self, PayloadError> {
        match action_type {
            FS_WRITE => {
                let d: FsWriteData = parse(action_type, data)?;
                require_path(action_type, "path", &d.path)?;
                if d.encoding == ContentEncoding::Base64 {
                    BASE64
                        .decode(&d.content)
                        .map_err(|e| PayloadError::Encoding(e.to_string()))?;
                }
                Ok(Self::FsWrite {
                    path: d.path,
                    content: d.content,
                    encoding: d.encoding,
                })
            },
            FS_DELETE => {
                let d: FsDeleteData = parse(action_type, data)?;
                require_path(action_type, "path", &d.path)?;
                Ok(Self::FsDelete { path: d.path })
            },
            FS_MOVE => {
                let d: FsMoveData = parse(action_type, data)?;
                require_path(action_type, "source", &d.source)?;
                require_path(action_type, "dest", &d.dest)?;
                Ok(Self::FsMove {
                    source: d.source,
                    dest: d.dest,
                })
            },
            DB_INSERT => Ok(Self::DbInsert(data)),
            "" => Err(invalid(action_type, "action type must not be empty")),
            other => Ok(Self::Reserved {
                action_type: other.to_string(),
                data,
            }),
        }
    }

    /// UTF-8 text write.
    #[must_use]
    pub fn write(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Self::FsWrite {
            path: path.into(),
            content: content.into(),
            encoding: ContentEncoding::Utf8,
        }
    }

    /// File deletion.
    #[must_use]
    pub fn delete(path: impl Into<PathBuf>) -> Self {
        Self::FsDelete { path: path.into() }
    }

    /// File move.
    #[must_use]
    pub fn move_file(source: impl Into<PathBuf>, dest: impl Into<PathBuf>) -> Self {
        Self::FsMove {
            source: source.into(),
            dest: dest.into(),
        }
    }

    /// The action type string.
    #[must_use]
    pub fn action_type(&self) -> &str {
        match self {
            Self::FsWrite { .. } => FS_WRITE,
            Self::FsDelete { .. } => FS_DELETE,
            Self::FsMove { .. } => FS_MOVE,
            Self::DbInsert(_) => DB_INSERT,
            Self::Reserved { action_type, .. } => action_type,
        }
    }

    /// Whether executing this payload touches the filesystem.
    #[must_use]
    pub fn is_filesystem(&self) -> bool {
        matches!(
            self,
            Self::FsWrite { .. } | Self::FsDelete { .. } | Self::FsMove { .. }
        )
    }

    /// The data object as it appears on the wire.
    #[must_use]
    pub fn data(&self) -> Value {
        match self {
            Self::FsWrite {
                path,
                content,
                encoding,
            } => json!({ "path": path, "content": content, "encoding": encoding }),
            Self::FsDelete { path } => json!({ "path": path }),
            Self::FsMove { source, dest } => json!({ "source": source, "dest": dest }),
            Self::DbInsert(data) | Self::Reserved { data, .. } => data.clone(),
        }
    }
}

/// Bytes of an `fs_write` payload's content.
pub(crate) fn write_bytes(content: &str, encoding: ContentEncoding) -> Result<Vec<u8>, PayloadError> {
    match encoding {
        ContentEncoding::Utf8 => Ok(content.as_bytes().to_vec()),
        ContentEncoding::Base64 => BASE64
            .decode(content)
            .map_err(|e| PayloadError::Encoding(e.to_string())),
    }
}

#[derive(Serialize, Deserialize)]
struct WirePayload {
    #[serde(rename = "type")]
    action_type: String,
    #[serde(default)]
    data: Value,
}

impl Serialize for ActionPayload {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        WirePayload {
            action_type: self.action_type().to_string(),
            data: self.data(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ActionPayload {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = WirePayload::deserialize(deserializer)?;
        Self::decode(&wire.action_type, wire.data).map_err(serde::de::Error::custom)
    }
}
