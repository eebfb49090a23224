use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use log::{info, warn};
use std::io::Write;
use std::path::{Path, PathBuf};

use svg_script_editor::io::{
    AtomicDocumentWriter, DocumentReader, DocumentWriter, FileDocumentReader, RawDocument,
};
use svg_script_editor::sync::DEFAULT_PREVIEW_EXTENSION;
use svg_script_editor::utils::create_backup;
use svg_script_editor::{Action, Config, ProcessLauncher, SyncController, SUPPORTED_EXTENSIONS};

#[derive(Parser)]
#[command(name = "svg_script_editor")]
#[command(about = "用外部编辑器编辑 SVG 文档中内嵌的 <script>/<style> 内容")]
#[command(version)]
struct Cli {
    /// 输入 SVG 文件路径
    input: PathBuf,

    /// 执行的动作：open（导出并打开编辑器）或 save（读回并写入文档）
    #[arg(long)]
    action: String,

    /// 输出文件路径（默认写到标准输出）
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// 覆盖已存在的输出文件前先创建带时间戳的备份
    #[arg(long)]
    backup: bool,

    /// 会话临时目录名前缀
    #[arg(long)]
    editor_tempdir_prefix: Option<String>,

    /// 编辑器程序
    #[arg(long)]
    command: Option<String>,

    /// 传给编辑器的选项（位于目录参数之前）
    #[arg(long, allow_hyphen_values = true)]
    command_option: Option<String>,

    /// save 时去掉节点上的会话标记属性
    #[arg(long, action = ArgAction::Set)]
    remove_data_attribute: Option<bool>,

    /// save 成功后删除会话临时目录
    #[arg(long, action = ArgAction::Set)]
    remove_editor_tempdir: Option<bool>,

    /// 等待编辑器退出的最长秒数
    #[arg(long, value_name = "SECS")]
    editor_timeout: Option<u64>,

    /// 配置文件路径
    #[arg(long)]
    config: Option<PathBuf>,

    /// 宿主传入的页签参数（忽略）
    #[arg(long, hide = true)]
    tab: Option<String>,

    /// 宿主传入的选中对象 id（忽略）
    #[arg(long, hide = true, action = ArgAction::Append)]
    id: Vec<String>,

    /// 静默模式(仅输出错误)
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// 输出调试日志
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);
    log::debug!("ignoring host arguments tab={:?} id={:?}", cli.tab, cli.id);

    let action: Action = cli.action.parse()?;
    validate_input(&cli.input)?;
    let config = load_config(&cli)?;

    let input = FileDocumentReader.read(&cli.input)?;

    let launcher = ProcessLauncher::from_config(&config);
    let controller = SyncController::new(config, launcher)
        .with_preview_extension(preview_extension(&cli.input));

    let outcome = controller
        .run(action, &input)
        .with_context(|| format!("{:?} failed for {}", action, cli.input.display()))?;

    emit_output(&cli, &outcome.output)?;
    outcome.finish().context("failed to remove session directory")?;

    Ok(())
}

/// 日志写到标准错误；RUST_LOG 优先
fn init_logging(cli: &Cli) {
    let level = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

/// 验证输入文件
fn validate_input(input: &Path) -> Result<()> {
    if !input.is_file() {
        anyhow::bail!("input file does not exist: {}", input.display());
    }

    let extension = input
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase());

    if !SUPPORTED_EXTENSIONS.iter().any(|&ext| Some(ext) == extension.as_deref()) {
        warn!("{} does not look like an SVG file", input.display());
    }

    Ok(())
}

/// 配置文件 + 命令行覆盖
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => Config::load().context("failed to load config")?,
    };

    if let Some(prefix) = &cli.editor_tempdir_prefix {
        config.tempdir_prefix = prefix.clone();
    }
    if let Some(command) = &cli.command {
        config.command = command.clone();
    }
    if let Some(option) = &cli.command_option {
        config.command_option = option.clone();
    }
    if let Some(remove) = cli.remove_data_attribute {
        config.remove_marker_attribute = remove;
    }
    if let Some(remove) = cli.remove_editor_tempdir {
        config.remove_session_dir = remove;
    }
    if let Some(secs) = cli.editor_timeout {
        config.editor_timeout_secs = Some(secs);
    }

    Ok(config)
}

fn preview_extension(input: &Path) -> String {
    input
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .unwrap_or(DEFAULT_PREVIEW_EXTENSION)
        .to_string()
}

/// 写出结果文档：--output 指定的文件或标准输出
fn emit_output(cli: &Cli, output: &RawDocument) -> Result<()> {
    match &cli.output {
        Some(path) => {
            if cli.backup && path.exists() {
                let backup = create_backup(path)
                    .with_context(|| format!("failed to back up {}", path.display()))?;
                info!("backed up {} to {}", path.display(), backup.display());
            }
            AtomicDocumentWriter
                .write(output, path)
                .with_context(|| format!("failed to write {}", path.display()))?;
        }
        None => {
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(&output.bytes)
                .and_then(|_| handle.flush())
                .context("failed to write document to stdout")?;
        }
    }
    Ok(())
}
