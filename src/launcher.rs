/// 外部编辑器启动
///
/// 以子进程方式打开会话目录并阻塞等待其退出，可选超时。
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::Duration;

use log::{info, warn};
use wait_timeout::ChildExt;

use crate::config::Config;
use crate::utils::SyncError;

/// 编辑器进程的退出信息
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditorExit {
    /// 被信号终止时为 `None`
    pub code: Option<i32>,
}

impl EditorExit {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// 在外部编辑器中打开会话目录，直到编辑器关闭才返回
pub trait EditorLauncher {
    fn launch(&self, dir: &Path) -> Result<EditorExit, SyncError>;
}

/// 以子进程启动编辑器：`<program> <options...> <dir>`
///
/// 不经过 shell，配置中的程序名和选项不会被当作 shell 语法解释。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessLauncher {
    program: String,
    options: Vec<String>,
    timeout: Option<Duration>,
}

impl ProcessLauncher {
    /// `option` 按空白拆分为多个参数
    pub fn new(program: impl Into<String>, option: &str) -> Self {
        Self {
            program: program.into(),
            options: option.split_whitespace().map(str::to_string).collect(),
            timeout: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.command.clone(), &config.command_option)
            .with_timeout(config.editor_timeout())
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }
}

impl EditorLauncher for ProcessLauncher {
    fn launch(&self, dir: &Path) -> Result<EditorExit, SyncError> {
        info!(
            "launching editor: {} {} {}",
            self.program,
            self.options.join(" "),
            dir.display()
        );

        // 标准输出用于输出文档，编辑器的输出改写到标准错误
        let mut child = Command::new(&self.program)
            .args(&self.options)
            .arg(dir)
            .stdout(Stdio::from(std::io::stderr()))
            .spawn()
            .map_err(|source| SyncError::EditorLaunch {
                program: self.program.clone(),
                source,
            })?;

        let status = match self.timeout {
            None => child.wait()?,
            Some(timeout) => wait_or_kill(&mut child, timeout)?.ok_or_else(|| {
                SyncError::EditorTimedOut {
                    program: self.program.clone(),
                    timeout,
                }
            })?,
        };

        let exit = EditorExit {
            code: status.code(),
        };
        match exit.code {
            Some(0) => info!("editor exited"),
            Some(code) => warn!("editor '{}' exited with code {}", self.program, code),
            None => warn!("editor '{}' was terminated by a signal", self.program),
        }
        Ok(exit)
    }
}

/// 等待子进程退出；超时则结束并回收子进程，返回 `None`
fn wait_or_kill(child: &mut Child, timeout: Duration) -> std::io::Result<Option<ExitStatus>> {
    match child.wait_timeout(timeout) {
        Ok(Some(status)) => Ok(Some(status)),
        Ok(None) => {
            let _ = child.kill();
            child.wait()?;
            Ok(None)
        }
        Err(error) => {
            let _ = child.kill();
            Err(error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;
    use tempfile::TempDir;

    #[test]
    fn test_option_is_split_into_arguments() {
        let launcher = ProcessLauncher::new("code", "-n  --wait");
        assert_eq!(launcher.options(), ["-n", "--wait"]);

        let launcher = ProcessLauncher::new("vim", "");
        assert!(launcher.options().is_empty());
    }

    #[test]
    fn test_from_config() {
        let config = Config {
            command: "subl".to_string(),
            command_option: "-w".to_string(),
            editor_timeout_secs: Some(5),
            ..Config::default()
        };
        let launcher = ProcessLauncher::from_config(&config);
        assert_eq!(launcher.program(), "subl");
        assert_eq!(launcher.options(), ["-w"]);
        assert_eq!(launcher.timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_missing_program_is_launch_error() {
        let dir = TempDir::new().unwrap();
        let launcher = ProcessLauncher::new("definitely-not-an-editor-4242", "-n");

        let result = launcher.launch(dir.path());
        assert!(matches!(result, Err(SyncError::EditorLaunch { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_exit_code_is_reported() {
        let dir = TempDir::new().unwrap();

        let exit = ProcessLauncher::new("true", "").launch(dir.path()).unwrap();
        assert!(exit.success());

        let exit = ProcessLauncher::new("false", "").launch(dir.path()).unwrap();
        assert_eq!(exit.code, Some(1));
    }

    #[cfg(unix)]
    #[test]
    fn test_fast_editor_finishes_within_timeout() {
        let dir = TempDir::new().unwrap();
        let launcher = ProcessLauncher::new("true", "").with_timeout(Some(Duration::from_secs(10)));

        let exit = launcher.launch(dir.path()).unwrap();
        assert!(exit.success());
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_kills_editor() {
        let dir = TempDir::new().unwrap();
        // 会话目录作为 $0 传入，被忽略
        let launcher = ProcessLauncher {
            program: "sh".to_string(),
            options: vec!["-c".to_string(), "sleep 30".to_string()],
            timeout: Some(Duration::from_millis(200)),
        };
        let started = Instant::now();
        let result = launcher.launch(dir.path());

        assert!(matches!(result, Err(SyncError::EditorTimedOut { .. })));
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
