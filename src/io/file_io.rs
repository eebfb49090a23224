/// 文件系统上的文档读写
///
/// 写入先落到同目录下的临时文件，再整体改名到目标路径，
/// 失败时不会留下只写了一半的输出文档。
use std::io::Write;
use std::path::Path;

use log::debug;
use tempfile::NamedTempFile;

use super::traits::{DocumentReader, DocumentWriter, RawDocument};
use crate::utils::SyncError;

#[derive(Debug, Clone, Copy, Default)]
pub struct FileDocumentReader;

impl DocumentReader for FileDocumentReader {
    fn read(&self, path: &Path) -> Result<RawDocument, SyncError> {
        let bytes = std::fs::read(path).map_err(|source| SyncError::ReadContent {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("read {} ({} bytes)", path.display(), bytes.len());
        Ok(RawDocument { bytes })
    }
}

/// 原子替换目标文件的写入器
#[derive(Debug, Clone, Copy, Default)]
pub struct AtomicDocumentWriter;

impl DocumentWriter for AtomicDocumentWriter {
    fn write(&self, data: &RawDocument, path: &Path) -> Result<(), SyncError> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let mut staged = NamedTempFile::new_in(dir)?;
        staged.write_all(&data.bytes)?;
        staged.as_file().sync_all()?;
        staged.persist(path).map_err(|e| e.error)?;

        debug!("wrote {} ({} bytes)", path.display(), data.bytes.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_input_names_the_path() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing.svg");

        match FileDocumentReader.read(&missing) {
            Err(SyncError::ReadContent { path, .. }) => assert_eq!(path, missing),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_write_replaces_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("drawing.svg");
        std::fs::write(&target, "<svg><old/></svg>").unwrap();

        AtomicDocumentWriter
            .write(&RawDocument::new("<svg/>"), &target)
            .unwrap();

        assert_eq!(FileDocumentReader.read(&target).unwrap().bytes, b"<svg/>");
        // 临时文件已改名，目录中只剩目标文件
        let entries = std::fs::read_dir(temp_dir.path()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn test_write_creates_parent_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("nested").join("out.svg");

        AtomicDocumentWriter
            .write(&RawDocument::new("<svg/>"), &target)
            .unwrap();

        assert!(target.is_file());
    }
}
