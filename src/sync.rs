/// 同步控制器
///
/// 两个互斥的单次流程：
///
/// - **open**: 把内嵌的 `<script>`/`<style>` 导出到新的会话目录，
///   给节点加上标记属性，写入预览快照，阻塞等待外部编辑器退出
/// - **save**: 根据标记属性找到会话目录，把 `.js`/`.css` 文件内容
///   以 CDATA 写回对应节点，可选地去掉标记并删除会话目录
///
/// 所有修改都在内存中的文档树上完成，输出只在全部步骤成功后生成。
use std::borrow::Cow;
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::{debug, info, warn};

use crate::config::Config;
use crate::content::{ContentFile, ContentKind};
use crate::document::{Document, ElementPath};
use crate::io::RawDocument;
use crate::launcher::{EditorExit, EditorLauncher};
use crate::session::SessionDir;
use crate::utils::{identifier_from_file_name, SyncError};

/// 预览文件的默认扩展名
pub const DEFAULT_PREVIEW_EXTENSION: &str = "svg";

/// 执行的动作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Open,
    Save,
}

impl FromStr for Action {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(Action::Open),
            "save" => Ok(Action::Save),
            _ => Err(SyncError::InvalidAction(s.to_string())),
        }
    }
}

/// open 的结果
#[derive(Debug)]
pub struct OpenReport {
    /// 已加上标记属性的文档
    pub document: Document,
    pub session: SessionDir,
    /// 导出的内容文件（含新建节点的占位文件）
    pub exported: Vec<ContentFile>,
    pub preview_path: PathBuf,
    pub editor_exit: EditorExit,
}

/// save 找不到可用会话的原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InactiveReason {
    /// 文档中没有任何标记属性
    NoMarker,
    /// 标记指向的目录已不存在
    MissingDirectory(PathBuf),
}

/// save 的结果
#[derive(Debug)]
pub enum SaveOutcome {
    Updated {
        document: Document,
        session: SessionDir,
        imported: Vec<ContentFile>,
    },
    /// 无事可做，调用方应原样返回输入文档
    NoActiveSession(InactiveReason),
}

/// 一次调用的最终产出
///
/// 输出写出之后再调用 [`SyncOutcome::finish`] 删除会话目录。
#[derive(Debug)]
pub struct SyncOutcome {
    pub output: RawDocument,
    cleanup: Option<SessionDir>,
}

impl SyncOutcome {
    /// 待删除的会话目录
    pub fn pending_cleanup(&self) -> Option<&Path> {
        self.cleanup.as_ref().map(SessionDir::path)
    }

    pub fn finish(self) -> Result<(), SyncError> {
        if let Some(session) = self.cleanup {
            let path = session.path().to_path_buf();
            session.remove()?;
            info!("removed session directory {}", path.display());
        }
        Ok(())
    }
}

pub struct SyncController<L: EditorLauncher> {
    config: Config,
    launcher: L,
    preview_extension: String,
}

impl<L: EditorLauncher> SyncController<L> {
    pub fn new(config: Config, launcher: L) -> Self {
        Self {
            config,
            launcher,
            preview_extension: DEFAULT_PREVIEW_EXTENSION.to_string(),
        }
    }

    /// 预览文件扩展名，通常取输入文档的扩展名
    pub fn with_preview_extension(mut self, extension: impl Into<String>) -> Self {
        self.preview_extension = extension.into();
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// 按动作处理输入文档
    pub fn run(&self, action: Action, input: &RawDocument) -> Result<SyncOutcome, SyncError> {
        let document = Document::from_bytes(&input.bytes)?;
        match action {
            Action::Open => {
                let report = self.open(document)?;
                Ok(SyncOutcome {
                    output: RawDocument::new(report.document.to_bytes()),
                    cleanup: None,
                })
            }
            Action::Save => match self.save(document)? {
                SaveOutcome::Updated {
                    document, session, ..
                } => Ok(SyncOutcome {
                    output: RawDocument::new(document.to_bytes()),
                    cleanup: self.config.remove_session_dir.then_some(session),
                }),
                SaveOutcome::NoActiveSession(_) => Ok(SyncOutcome {
                    output: input.clone(),
                    cleanup: None,
                }),
            },
        }
    }

    /// 导出内嵌内容并打开编辑器
    pub fn open(&self, mut document: Document) -> Result<OpenReport, SyncError> {
        let session = SessionDir::create(
            &self.config.tempdir_prefix,
            self.config.tempdir_root.as_deref(),
        )?;
        info!("opened session directory {}", session.path().display());

        let mut exported = Vec::new();
        for kind in ContentKind::ALL {
            exported.extend(self.export_kind(&mut document, &session, kind)?);
        }

        let preview_path =
            session.write_preview(&self.preview_extension, &document.to_xml_string())?;

        let editor_exit = self.launcher.launch(session.path()).map_err(|e| {
            warn!(
                "editor did not finish, session files left in {}",
                session.path().display()
            );
            e
        })?;

        Ok(OpenReport {
            document,
            session,
            exported,
            preview_path,
            editor_exit,
        })
    }

    fn export_kind(
        &self,
        document: &mut Document,
        session: &SessionDir,
        kind: ContentKind,
    ) -> Result<Vec<ContentFile>, SyncError> {
        let marker = self.config.marker_attribute.as_str();
        let marker_value = session.marker_value();
        let paths = document.find_paths(|element| kind.is_embedded(element));

        if paths.is_empty() {
            let identifier = next_identifier(document, kind.tag_name());
            let mut element = document.root().new_like(kind.tag_name());
            element.set_attribute("id", &identifier);
            element.set_attribute(marker, &marker_value);

            let path = session.write_content(kind, &identifier, kind.placeholder())?;
            document.root_mut().append_child(element);
            info!("no embedded {} found, created {}", kind, identifier);
            return Ok(vec![ContentFile::new(kind, identifier, path)]);
        }

        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            let identifier = ensure_identifier(document, &path, kind);
            let Some(element) = document.element_mut(&path) else {
                continue;
            };

            let text = element.text_content()?;
            element.set_attribute(marker, &marker_value);

            let contents = if text.is_empty() {
                kind.placeholder()
            } else {
                text.as_str()
            };
            let file = session.write_content(kind, &identifier, contents)?;
            files.push(ContentFile::new(kind, identifier, file));
        }
        Ok(files)
    }

    /// 读回会话目录中的内容并写入文档
    pub fn save(&self, mut document: Document) -> Result<SaveOutcome, SyncError> {
        let marker = self.config.marker_attribute.as_str();

        let dirs: BTreeSet<String> = document
            .elements()
            .into_iter()
            .filter_map(|element| element.attribute(marker).map(Cow::into_owned))
            .collect();

        if dirs.len() > 1 {
            return Err(SyncError::ConflictingSession(
                dirs.into_iter().map(PathBuf::from).collect(),
            ));
        }

        let Some(dir) = dirs.into_iter().next().filter(|dir| !dir.is_empty()) else {
            warn!("No scripts were found.");
            return Ok(SaveOutcome::NoActiveSession(InactiveReason::NoMarker));
        };
        let Some(session) = SessionDir::existing(&dir) else {
            warn!("No scripts were found. Session directory {} no longer exists.", dir);
            return Ok(SaveOutcome::NoActiveSession(
                InactiveReason::MissingDirectory(PathBuf::from(dir)),
            ));
        };

        // 先读取全部文件，任何一个读取失败都不改动文档
        let mut pending = Vec::new();
        for kind in ContentKind::ALL {
            for path in session.content_files(kind)? {
                let Some(identifier) = identifier_from_file_name(&path) else {
                    continue;
                };
                let text = fs::read_to_string(&path).map_err(|source| SyncError::ReadContent {
                    path: path.clone(),
                    source,
                })?;
                pending.push((ContentFile::new(kind, identifier, path), text));
            }
        }

        let mut imported = Vec::with_capacity(pending.len());
        for (file, text) in pending {
            let path = locate_or_append(&mut document, file.kind, &file.identifier);
            let Some(element) = document.element_mut(&path) else {
                continue;
            };

            element.set_cdata(text);
            if self.config.remove_marker_attribute {
                element.remove_attribute(marker);
            }
            debug!(
                "imported {} into <{} id=\"{}\">",
                file.path.display(),
                file.kind,
                file.identifier
            );
            imported.push(file);
        }

        info!(
            "saved {} file(s) from session directory {}",
            imported.len(),
            session.path().display()
        );
        Ok(SaveOutcome::Updated {
            document,
            session,
            imported,
        })
    }
}

/// 节点已有 id 时直接使用，否则生成一个并写回节点
fn ensure_identifier(document: &mut Document, path: &[usize], kind: ContentKind) -> String {
    if let Some(id) = document.element(path).and_then(|element| element.id()) {
        return id.into_owned();
    }
    let identifier = next_identifier(document, kind.tag_name());
    if let Some(element) = document.element_mut(path) {
        element.set_attribute("id", &identifier);
    }
    identifier
}

/// `<prefix><n>`，n 取文档中尚未使用的最小正整数
fn next_identifier(document: &Document, prefix: &str) -> String {
    let used: HashSet<String> = document
        .elements()
        .into_iter()
        .filter_map(|element| element.id().map(Cow::into_owned))
        .collect();

    (1..)
        .map(|n| format!("{}{}", prefix, n))
        .find(|candidate| !used.contains(candidate))
        .unwrap_or_else(|| prefix.to_string())
}

/// 查找指定种类和 id 的节点；找不到时在根元素末尾新建
fn locate_or_append(document: &mut Document, kind: ContentKind, identifier: &str) -> ElementPath {
    let found = document.find_paths(|element| {
        kind.matches(element) && element.id().as_deref() == Some(identifier)
    });
    if let Some(path) = found.into_iter().next() {
        return path;
    }

    let mut element = document.root().new_like(kind.tag_name());
    element.set_attribute("id", identifier);
    let index = document.root_mut().append_child(element);
    debug!("created <{} id=\"{}\">", kind, identifier);
    vec![index]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use tempfile::TempDir;

    /// 记录被打开的目录，不启动任何进程
    #[derive(Default)]
    struct RecordingLauncher {
        opened: RefCell<Vec<PathBuf>>,
    }

    impl EditorLauncher for RecordingLauncher {
        fn launch(&self, dir: &Path) -> Result<EditorExit, SyncError> {
            self.opened.borrow_mut().push(dir.to_path_buf());
            Ok(EditorExit { code: Some(0) })
        }
    }

    /// 编辑器程序不存在
    struct MissingEditor;

    impl EditorLauncher for MissingEditor {
        fn launch(&self, _dir: &Path) -> Result<EditorExit, SyncError> {
            Err(SyncError::EditorLaunch {
                program: "missing-editor".to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
            })
        }
    }

    fn controller(root: &TempDir) -> SyncController<RecordingLauncher> {
        let config = Config {
            tempdir_prefix: "test-".to_string(),
            tempdir_root: Some(root.path().to_path_buf()),
            ..Config::default()
        };
        SyncController::new(config, RecordingLauncher::default())
    }

    #[test]
    fn test_action_parsing() {
        assert_eq!("open".parse::<Action>().unwrap(), Action::Open);
        assert_eq!(" Save ".parse::<Action>().unwrap(), Action::Save);
        assert!(matches!(
            "close".parse::<Action>(),
            Err(SyncError::InvalidAction(action)) if action == "close"
        ));
        assert!("".parse::<Action>().is_err());
    }

    #[test]
    fn test_next_identifier_skips_used_ids() {
        let doc = Document::parse(r#"<svg><g id="script1"/><g id="script2"/></svg>"#).unwrap();
        assert_eq!(next_identifier(&doc, "script"), "script3");
        assert_eq!(next_identifier(&doc, "style"), "style1");
    }

    #[test]
    fn test_open_generates_missing_ids() {
        let root = TempDir::new().unwrap();
        let ctrl = controller(&root);
        let doc = Document::parse(
            r#"<svg xmlns="http://www.w3.org/2000/svg"><script>a()</script><style>rect{}</style></svg>"#,
        )
        .unwrap();

        let report = ctrl.open(doc).unwrap();
        let ids: Vec<_> = report.exported.iter().map(|f| f.identifier.as_str()).collect();
        assert_eq!(ids, vec!["script1", "style1"]);
        assert_eq!(
            fs::read_to_string(report.session.path().join("script1.js")).unwrap(),
            "a()"
        );
        assert_eq!(ctrl.launcher.opened.borrow().as_slice(), [report.session.path()]);
    }

    #[test]
    fn test_open_skips_linked_scripts() {
        let root = TempDir::new().unwrap();
        let ctrl = controller(&root);
        let doc = Document::parse(
            r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink"><script id="lib" xlink:href="lib.js"/></svg>"#,
        )
        .unwrap();

        let report = ctrl.open(doc).unwrap();

        let lib = report.document.find_paths(|el| el.id().as_deref() == Some("lib"));
        let lib = report.document.element(&lib[0]).unwrap();
        assert!(!lib.has_attribute("editor-session-dir"));
        assert!(!report.session.path().join("lib.js").exists());
        // 外链脚本不算内嵌脚本，仍会新建一个
        assert!(report.session.path().join("script1.js").exists());
    }

    #[test]
    fn test_open_rejects_unsafe_identifier() {
        let root = TempDir::new().unwrap();
        let ctrl = controller(&root);
        let doc = Document::parse(r#"<svg><script id="../evil">x</script></svg>"#).unwrap();

        assert!(matches!(ctrl.open(doc), Err(SyncError::UnsafeIdentifier(_))));
        assert!(ctrl.launcher.opened.borrow().is_empty());
    }

    #[test]
    fn test_editor_launch_failure_keeps_session_files() {
        let root = TempDir::new().unwrap();
        let config = Config {
            tempdir_prefix: "test-".to_string(),
            tempdir_root: Some(root.path().to_path_buf()),
            ..Config::default()
        };
        let ctrl = SyncController::new(config, MissingEditor);
        let input = RawDocument::new(
            r#"<svg xmlns="http://www.w3.org/2000/svg"><script>a()</script><style>rect{}</style></svg>"#,
        );

        let result = ctrl.run(Action::Open, &input);
        assert!(matches!(result, Err(SyncError::EditorLaunch { .. })));

        let sessions: Vec<_> = fs::read_dir(root.path())
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect();
        assert_eq!(sessions.len(), 1);
        let session = &sessions[0];
        assert!(session
            .file_name()
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("test-"));
        assert_eq!(fs::read_to_string(session.join("script1.js")).unwrap(), "a()");
        assert_eq!(fs::read_to_string(session.join("style1.css")).unwrap(), "rect{}");
    }

    #[test]
    fn test_save_without_marker_is_noop() {
        let root = TempDir::new().unwrap();
        let ctrl = controller(&root);
        let input = RawDocument::new("<svg>\n<script id='s'>keep</script></svg>");

        let outcome = ctrl.run(Action::Save, &input).unwrap();
        assert_eq!(outcome.output, input);
        assert!(outcome.pending_cleanup().is_none());
    }

    #[test]
    fn test_save_with_missing_directory_is_noop() {
        let root = TempDir::new().unwrap();
        let ctrl = controller(&root);
        let missing = root.path().join("gone");
        let doc = Document::parse(&format!(
            r#"<svg><script id="s" editor-session-dir="{}"/></svg>"#,
            missing.display()
        ))
        .unwrap();

        match ctrl.save(doc).unwrap() {
            SaveOutcome::NoActiveSession(InactiveReason::MissingDirectory(dir)) => {
                assert_eq!(dir, missing)
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_save_keeps_marker_when_configured() {
        let root = TempDir::new().unwrap();
        let config = Config {
            tempdir_prefix: "test-".to_string(),
            tempdir_root: Some(root.path().to_path_buf()),
            remove_marker_attribute: false,
            remove_session_dir: false,
            ..Config::default()
        };
        let ctrl = SyncController::new(config, RecordingLauncher::default());

        let opened = ctrl
            .run(Action::Open, &RawDocument::new("<svg/>"))
            .unwrap();
        let saved = ctrl.run(Action::Save, &opened.output).unwrap();
        assert!(saved.pending_cleanup().is_none());

        let doc = Document::from_bytes(&saved.output.bytes).unwrap();
        let marked = doc.find_paths(|el| el.has_attribute("editor-session-dir"));
        assert_eq!(marked.len(), 2);
        saved.finish().unwrap();
    }
}
