//! Core types for par2guard: newtype ids, scan/DB record shapes, run statistics.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Unique identifier for a `FileRecord` row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(pub i64);

/// Unique identifier for a `RunRecord` row.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub i64);

macro_rules! id_newtype {
    ($ty:ident) => {
        impl $ty {
            /// Create a new id from a raw `i64`.
            pub fn new(id: i64) -> Self {
                Self(id)
            }

            /// Get the inner `i64` value.
            pub fn get(&self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $ty {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$ty> for i64 {
            fn from(id: $ty) -> Self {
                id.0
            }
        }

        impl PartialEq<i64> for $ty {
            fn eq(&self, other: &i64) -> bool {
                self.0 == *other
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $ty {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                Ok(Self(s.parse()?))
            }
        }

        impl sqlx::Type<sqlx::Sqlite> for $ty {
            fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
                <i64 as sqlx::Type<sqlx::Sqlite>>::type_info()
            }

            fn compatible(ty: &sqlx::sqlite::SqliteTypeInfo) -> bool {
                <i64 as sqlx::Type<sqlx::Sqlite>>::compatible(ty)
            }
        }

        impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for $ty {
            fn encode_by_ref(
                &self,
                buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
            ) -> std::result::Result<
                sqlx::encode::IsNull,
                Box<dyn std::error::Error + Send + Sync>,
            > {
                <i64 as sqlx::Encode<'q, sqlx::Sqlite>>::encode_by_ref(&self.0, buf)
            }
        }

        impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for $ty {
            fn decode(
                value: sqlx::sqlite::SqliteValueRef<'r>,
            ) -> std::result::Result<Self, Box<dyn std::error::Error + Send + Sync>> {
                let id = <i64 as sqlx::Decode<'r, sqlx::Sqlite>>::decode(value)?;
                Ok(Self(id))
            }
        }
    };
}

id_newtype!(FileId);
id_newtype!(RunId);

/// Status of a tracked file, persisted as TEXT in the manifest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    /// Parity exists and the last verification (if any) was clean.
    Ok,
    /// Parity verification found the file's content damaged.
    Damaged,
    /// The file is present but filtered below `MIN_FILE_SIZE`; parity retained.
    Truncated,
    /// A repair run restored the file; pending re-verification.
    Repaired,
}

impl FileStatus {
    /// The on-disk string representation, matching the Python original's literal values.
    pub fn as_str(self) -> &'static str {
        match self {
            FileStatus::Ok => "ok",
            FileStatus::Damaged => "damaged",
            FileStatus::Truncated => "truncated",
            FileStatus::Repaired => "repaired",
        }
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "ok" => Ok(FileStatus::Ok),
            "damaged" => Ok(FileStatus::Damaged),
            "truncated" => Ok(FileStatus::Truncated),
            "repaired" => Ok(FileStatus::Repaired),
            other => Err(format!("unknown file status: {other}")),
        }
    }
}

impl sqlx::Type<sqlx::Sqlite> for FileStatus {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <String as sqlx::Type<sqlx::Sqlite>>::type_info()
    }

    fn compatible(ty: &sqlx::sqlite::SqliteTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Sqlite>>::compatible(ty)
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for FileStatus {
    fn encode_by_ref(
        &self,
        buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
    ) -> std::result::Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        <&str as sqlx::Encode<'q, sqlx::Sqlite>>::encode_by_ref(&self.as_str(), buf)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for FileStatus {
    fn decode(
        value: sqlx::sqlite::SqliteValueRef<'r>,
    ) -> std::result::Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let s = <String as sqlx::Decode<'r, sqlx::Sqlite>>::decode(value)?;
        Ok(s.parse()?)
    }
}

/// A file observed by the scanner, before it is reconciled against the manifest.
#[derive(Clone, Debug)]
pub struct FileInfo {
    /// Absolute path on disk.
    pub abs_path: PathBuf,
    /// Immediate subdirectory of the data root this file lives under.
    pub data_root: String,
    /// Path relative to `data_root`, using `/`-joined components.
    pub rel_path: String,
    /// Size in bytes, as observed by `stat`.
    pub size: u64,
    /// Modification time in nanoseconds since the Unix epoch.
    pub mtime_ns: i128,
}

/// A persisted record of a tracked file, one row of the `files` table.
#[derive(Clone, Debug, sqlx::FromRow)]
pub struct FileRecord {
    /// Surrogate primary key.
    pub id: FileId,
    /// Data-root label this file belongs to.
    pub data_root: String,
    /// Path relative to `data_root`.
    pub rel_path: String,
    /// Size in bytes at last observation.
    pub file_size: i64,
    /// Modification time in nanoseconds at last observation.
    pub mtime_ns: i64,
    /// Lowercase hex SHA-256 of the file's content.
    pub content_hash: String,
    /// Derived parity base filename: `content_hash[:16] + ".par2"`.
    pub par2_name: String,
    /// Current lifecycle status.
    pub status: FileStatus,
    /// ISO-8601 creation timestamp.
    pub created_at: String,
    /// ISO-8601 last-update timestamp.
    pub updated_at: String,
    /// ISO-8601 timestamp of the last successful verification, if any.
    pub verified_at: Option<String>,
}

/// A persisted record of one reconcile/verify/repair run, one row of the `runs` table.
#[derive(Clone, Debug, Default, sqlx::FromRow)]
pub struct RunRecord {
    /// Surrogate primary key.
    pub id: RunId,
    /// ISO-8601 start timestamp.
    pub started_at: String,
    /// ISO-8601 finish timestamp, absent while the run is open.
    pub finished_at: Option<String>,
    /// Number of files observed by the scanner.
    pub files_scanned: i64,
    /// Number of new parity artifacts created.
    pub files_created: i64,
    /// Number of verification attempts made.
    pub files_verified: i64,
    /// Number of files found damaged.
    pub files_damaged: i64,
    /// Number of files successfully repaired.
    pub files_repaired: i64,
    /// Number of files matched as moved/renamed.
    pub files_moved: i64,
    /// Number of manifest rows removed (true deletions + exclusions).
    pub files_deleted: i64,
    /// Number of files present on disk but filtered below `MIN_FILE_SIZE`.
    pub files_truncated: i64,
    /// Number of parity artifacts re-created after being found missing.
    pub parity_recreated: i64,
    /// Number of orphan parity artifacts removed by the sweep phase.
    pub orphan_parity_cleaned: i64,
    /// Newline-joined per-file error strings, if any.
    pub errors: Option<String>,
}

/// Result of one `par2.verify` invocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VerifyOutcome {
    /// Content matches the stored parity.
    Ok,
    /// Content does not match the stored parity.
    Damaged,
    /// No parity artifact exists for this hash.
    MissingParity,
    /// The verifier failed in a way that isn't a content judgment (nonzero/timeout).
    Error,
}

/// Mutable accumulator for one run's outcome, mirrored 1:1 into a `RunRecord`:
/// every counter here has a matching column in the `runs` table.
#[derive(Clone, Debug, Default, Serialize)]
pub struct RunStats {
    /// Number of files observed by the scanner.
    pub files_scanned: u64,
    /// Number of new parity artifacts created (new files + true modifications).
    pub files_created: u64,
    /// Number of verification attempts made.
    pub files_verified: u64,
    /// Number of files found damaged by verification.
    pub files_damaged: u64,
    /// Number of files successfully repaired by a `repair` run.
    pub files_repaired: u64,
    /// Number of files matched as moved/renamed by content hash.
    pub files_moved: u64,
    /// Number of manifest rows removed (true deletions + exclusions).
    pub files_deleted: u64,
    /// Number of files present on disk but filtered below `MIN_FILE_SIZE`.
    pub files_truncated: u64,
    /// Number of parity artifacts re-created after being found missing.
    pub parity_recreated: u64,
    /// Number of orphan parity artifacts removed by the sweep phase.
    pub orphan_parity_cleaned: u64,
    /// Per-file error descriptions accumulated during the run.
    pub errors: Vec<String>,
}

impl RunStats {
    /// Newline-joined error text, or `None` if no errors were recorded — matches the
    /// `runs.errors` column format used by the manifest.
    pub fn errors_joined(&self) -> Option<String> {
        if self.errors.is_empty() {
            None
        } else {
            Some(self.errors.join("\n"))
        }
    }
}
