use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_TEMPDIR_PREFIX: &str = "inkscape-vscode-";
pub const DEFAULT_COMMAND: &str = "code";
pub const DEFAULT_COMMAND_OPTION: &str = "-n";
pub const DEFAULT_MARKER_ATTRIBUTE: &str = "editor-session-dir";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 会话目录名前缀
    pub tempdir_prefix: String,

    /// 会话目录的父目录（未设置时使用系统临时目录）
    pub tempdir_root: Option<PathBuf>,

    /// 编辑器程序
    pub command: String,

    /// 位于会话目录参数之前的编辑器选项
    pub command_option: String,

    /// 等待编辑器的最长秒数，超时后结束进程（未设置时一直等待）
    pub editor_timeout_secs: Option<u64>,

    /// 标记节点正在某个会话目录中编辑的属性
    pub marker_attribute: String,

    /// save 时去掉写回节点上的标记属性
    pub remove_marker_attribute: bool,

    /// save 成功后删除会话目录
    pub remove_session_dir: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tempdir_prefix: DEFAULT_TEMPDIR_PREFIX.to_string(),
            tempdir_root: None,
            command: DEFAULT_COMMAND.to_string(),
            command_option: DEFAULT_COMMAND_OPTION.to_string(),
            editor_timeout_secs: None,
            marker_attribute: DEFAULT_MARKER_ATTRIBUTE.to_string(),
            remove_marker_attribute: true,
            remove_session_dir: true,
        }
    }
}

impl Config {
    /// 配置文件路径（~/.config/svg-script-editor/config.toml）
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("svg-script-editor").join("config.toml"))
    }

    /// 从默认位置加载配置，文件不存在时返回默认配置
    pub fn load() -> Result<Self, ConfigError> {
        match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Config::default()),
        }
    }

    /// 从指定路径加载配置
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    pub fn editor_timeout(&self) -> Option<Duration> {
        self.editor_timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Parse(#[from] toml::de::Error),
}
