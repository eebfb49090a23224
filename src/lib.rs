pub mod config;
pub mod content;
pub mod document;
pub mod io;
pub mod launcher;
pub mod session;
pub mod sync;
pub mod utils;

// 重新导出主要结构
pub use config::Config;
pub use content::{ContentFile, ContentKind};
pub use document::{Document, DocumentError, Element, Node};
pub use launcher::{EditorExit, EditorLauncher, ProcessLauncher};
pub use session::SessionDir;
pub use sync::{Action, InactiveReason, OpenReport, SaveOutcome, SyncController, SyncOutcome};
pub use utils::SyncError;

// 常量定义
pub const SUPPORTED_EXTENSIONS: &[&str] = &["svg"];
