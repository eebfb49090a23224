/// IO 抽象层模块
///
/// 宿主应用的单文件转换约定：读入一个文档，产出一个文档。
/// 该模块提供文档读写的抽象接口，支持依赖注入和测试 mock。
///
/// # 架构设计
///
/// - **traits**: 定义 Reader/Writer trait 接口
/// - **file_io**: 文件系统实现（原子写入）
///
/// # 使用示例
///
/// ```rust,ignore
/// use svg_script_editor::io::{DocumentReader, FileDocumentReader};
///
/// let reader = FileDocumentReader;
/// let raw = reader.read(Path::new("drawing.svg"))?;
/// ```
pub mod traits;
pub mod file_io;

// === 导出 trait 定义 ===
pub use traits::{DocumentReader, DocumentWriter, RawDocument};

// === 导出文件系统实现 ===
pub use file_io::{AtomicDocumentWriter, FileDocumentReader};
