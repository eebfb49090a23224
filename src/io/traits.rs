/// IO 抽象层 - trait 定义
///
/// 该模块定义了文档读写的抽象接口，支持依赖注入和测试 mock。
use std::path::Path;

use crate::utils::SyncError;

/// 文档原始数据
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDocument {
    /// 文档的原始字节数据
    pub bytes: Vec<u8>,
}

impl RawDocument {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self { bytes: bytes.into() }
    }
}

/// 文档读取 trait
///
/// # 职责
/// - 从文件系统读取文档的原始字节数据
/// - 不负责解析，仅负责 IO
pub trait DocumentReader {
    /// 读取文档的原始数据
    ///
    /// # 参数
    /// * `path` - 文件路径
    fn read(&self, path: &Path) -> Result<RawDocument, SyncError>;
}

/// 文档写入 trait
///
/// # 职责
/// - 将序列化后的数据写入文件系统
/// - 不负责序列化，仅负责 IO
pub trait DocumentWriter {
    /// 写入文档数据
    ///
    /// # 参数
    /// * `data` - 要写入的原始数据
    /// * `path` - 目标文件路径
    fn write(&self, data: &RawDocument, path: &Path) -> Result<(), SyncError>;
}
