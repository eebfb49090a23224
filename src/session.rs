/// 会话目录
///
/// 每次 open 创建一个唯一命名的临时目录，每个内嵌节点对应一个
/// `<identifier>.js` / `<identifier>.css` 文件，另有一份只写的
/// `output_preview.<ext>` 文档快照。save 读取后可整体删除。
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::content::ContentKind;
use crate::utils::{is_safe_identifier, SyncError};

/// 预览文件名（不含扩展名）
pub const PREVIEW_FILE_STEM: &str = "output_preview";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDir {
    path: PathBuf,
}

impl SessionDir {
    /// 创建新的会话目录
    ///
    /// # 参数
    /// * `prefix` - 目录名前缀
    /// * `root` - 父目录，`None` 时使用系统临时目录
    pub fn create(prefix: &str, root: Option<&Path>) -> Result<Self, SyncError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(prefix);
        let dir = match root {
            Some(root) => builder.tempdir_in(root)?,
            None => builder.tempdir()?,
        };

        // 目录需要在进程退出后保留，供下一次 save 读取
        let path = dir.keep();
        debug!("created session directory {}", path.display());
        Ok(Self { path })
    }

    /// 引用已存在的会话目录；目录不存在时返回 `None`
    pub fn existing(path: impl Into<PathBuf>) -> Option<Self> {
        let path = path.into();
        path.is_dir().then_some(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 写入标记属性的值
    pub fn marker_value(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }

    /// 内容文件路径；标识不能作为文件名时报错
    pub fn content_path(&self, kind: ContentKind, identifier: &str) -> Result<PathBuf, SyncError> {
        if !is_safe_identifier(identifier) {
            return Err(SyncError::UnsafeIdentifier(identifier.to_string()));
        }
        Ok(self.path.join(kind.file_name(identifier)))
    }

    /// 写入内容文件
    pub fn write_content(
        &self,
        kind: ContentKind,
        identifier: &str,
        text: &str,
    ) -> Result<PathBuf, SyncError> {
        let path = self.content_path(kind, identifier)?;
        fs::write(&path, text)?;
        debug!("wrote {} ({} bytes)", path.display(), text.len());
        Ok(path)
    }

    /// 写入文档预览快照
    pub fn write_preview(&self, extension: &str, xml: &str) -> Result<PathBuf, SyncError> {
        let path = self
            .path
            .join(format!("{}.{}", PREVIEW_FILE_STEM, extension));
        fs::write(&path, xml)?;
        Ok(path)
    }

    /// 列出目录下（不递归）指定种类的内容文件，按文件名排序
    pub fn content_files(&self, kind: ContentKind) -> Result<Vec<PathBuf>, SyncError> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.path)? {
            let path = entry?.path();
            let matches_kind = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext == kind.extension());
            if matches_kind && path.is_file() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// 递归删除会话目录
    pub fn remove(self) -> Result<(), SyncError> {
        fs::remove_dir_all(&self.path)?;
        debug!("removed session directory {}", self.path.display());
        Ok(())
    }
}
