use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::config::ConfigError;
use crate::document::DocumentError;

/// 自定义错误类型
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Could not load file, multiple session directories were found: {}", format_paths(.0))]
    ConflictingSession(Vec<PathBuf>),

    #[error("Invalid action {0:?}, expected \"open\" or \"save\"")]
    InvalidAction(String),

    #[error("Identifier {0:?} cannot be used as a file name")]
    UnsafeIdentifier(String),

    #[error("Failed to launch editor '{program}': {source}")]
    EditorLaunch {
        program: String,
        source: std::io::Error,
    },

    #[error("Editor '{program}' did not exit within {}s", .timeout.as_secs())]
    EditorTimedOut { program: String, timeout: Duration },

    #[error("Failed to read {}: {source}", .path.display())]
    ReadContent {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

fn format_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|path| path.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// 由内容文件名推导节点标识：去掉扩展名，空格替换为下划线
pub fn identifier_from_file_name(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    if stem.is_empty() {
        return None;
    }
    Some(stem.replace(' ', "_"))
}

/// 标识能否安全地作为会话目录中的文件名
pub fn is_safe_identifier(identifier: &str) -> bool {
    !identifier.is_empty()
        && identifier != "."
        && identifier != ".."
        && !identifier.contains(['/', '\\', '\0'])
}

/// 创建文件备份
pub fn create_backup(file_path: &Path) -> Result<PathBuf, SyncError> {
    if !file_path.exists() {
        return Err(SyncError::IoError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "file to back up does not exist",
        )));
    }

    let timestamp = chrono::Local::now().format("%Y-%m-%d-%H-%M-%S");
    let backup_path = file_path.with_extension(format!("{}.bak", timestamp));

    std::fs::copy(file_path, &backup_path)?;

    Ok(backup_path)
}
