use std::fmt;
use std::path::{Path, PathBuf};

use storage::Storage;

#[derive(Debug)]
pub enum TargetError {
    InvalidDbUrl { raw: String },
    MissingBank,
}

impl fmt::Display for TargetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            TargetError::MissingBank => {
                write!(f, "a question bank is required (--bank or EXAM_BANK_PATH)")
            }
        }
    }
}

impl std::error::Error for TargetError {}

/// Where progress documents live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageTarget {
    Memory,
    JsonDir(PathBuf),
    Sqlite(String),
}

impl StorageTarget {
    pub fn parse(raw: &str) -> Result<Self, TargetError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(TargetError::InvalidDbUrl { raw: raw.to_owned() });
        }
        if trimmed == "memory" {
            return Ok(Self::Memory);
        }
        if let Some(dir) = trimmed.strip_prefix("dir:") {
            if dir.is_empty() {
                return Err(TargetError::InvalidDbUrl { raw: raw.to_owned() });
            }
            return Ok(Self::JsonDir(absolute(Path::new(dir))));
        }
        Ok(Self::Sqlite(normalize_sqlite_url(trimmed)))
    }

    /// Open the backend, creating the database file or directory if needed.
    pub async fn open(&self) -> Result<Storage, Box<dyn std::error::Error>> {
        match self {
            Self::Memory => Ok(Storage::in_memory()),
            Self::JsonDir(root) => {
                tokio::fs::create_dir_all(root).await?;
                Ok(Storage::json_dir(root.clone()))
            }
            Self::Sqlite(url) => {
                // Open + migrate SQLite here so core/services stay storage-agnostic.
                prepare_sqlite_file(url)?;
                Ok(Storage::sqlite(url).await?)
            }
        }
    }
}

impl fmt::Display for StorageTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => f.write_str("memory"),
            Self::JsonDir(root) => write!(f, "dir:{}", root.display()),
            Self::Sqlite(url) => f.write_str(url),
        }
    }
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    }
}

fn normalize_sqlite_url(raw: &str) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw.to_owned();
    }

    let path_str = raw.strip_prefix("sqlite:").unwrap_or(raw);
    format!("sqlite://{}", absolute(Path::new(path_str)).display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let invalid = || TargetError::InvalidDbUrl {
        raw: db_url.to_owned(),
    };
    let path = db_url.strip_prefix("sqlite://").ok_or_else(invalid)?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(invalid().into());
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_and_prefixes_select_backend() {
        assert_eq!(StorageTarget::parse("memory").unwrap(), StorageTarget::Memory);
        assert_eq!(
            StorageTarget::parse("dir:/var/lib/exam").unwrap(),
            StorageTarget::JsonDir(PathBuf::from("/var/lib/exam"))
        );
        assert_eq!(
            StorageTarget::parse("sqlite:///tmp/p.sqlite3").unwrap(),
            StorageTarget::Sqlite("sqlite:///tmp/p.sqlite3".into())
        );
        assert_eq!(
            StorageTarget::parse("sqlite::memory:").unwrap(),
            StorageTarget::Sqlite("sqlite::memory:".into())
        );
    }

    #[test]
    fn relative_sqlite_paths_become_absolute() {
        let Ok(StorageTarget::Sqlite(url)) = StorageTarget::parse("sqlite:data/p.sqlite3") else {
            panic!("expected sqlite target");
        };
        let path = url.strip_prefix("sqlite://").unwrap();
        assert!(Path::new(path).is_absolute());
        assert!(path.ends_with("data/p.sqlite3"));
    }

    #[test]
    fn blank_values_are_rejected() {
        assert!(matches!(
            StorageTarget::parse("  "),
            Err(TargetError::InvalidDbUrl { .. })
        ));
        assert!(matches!(
            StorageTarget::parse("dir:"),
            Err(TargetError::InvalidDbUrl { .. })
        ));
    }

    #[test]
    fn sqlite_file_is_created_with_parents() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("nested").join("p.sqlite3");
        let url = format!("sqlite://{}?mode=rwc", file.display());

        prepare_sqlite_file(&url).unwrap();
        assert!(file.exists());
        assert!(prepare_sqlite_file("sqlite://").is_err());
    }
}
