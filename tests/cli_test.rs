//! 命令行测试
//!
//! 以宿主应用的调用方式运行可执行文件：open 写出带标记的文档，
//! save 读回内容并删除会话目录。编辑器用 `true` 代替。
#![cfg(unix)]

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use svg_script_editor::Document;
use tempfile::TempDir;

const DRAWING: &str = r#"<svg xmlns="http://www.w3.org/2000/svg"><script id="script1">alert(1)</script></svg>"#;

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_svg_script_editor"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run svg_script_editor")
}

fn write_config(dir: &Path) -> String {
    let sessions = dir.join("sessions");
    fs::create_dir(&sessions).unwrap();
    let config = dir.join("config.toml");
    fs::write(
        &config,
        format!(
            "tempdir_root = \"{}\"\ncommand = \"true\"\ncommand_option = \"\"\n",
            sessions.display()
        ),
    )
    .unwrap();
    config.to_str().unwrap().to_string()
}

#[test]
fn test_open_and_save_through_cli() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(temp_dir.path());
    let input = temp_dir.path().join("drawing.svg");
    fs::write(&input, DRAWING).unwrap();

    let opened = run(&[
        input.to_str().unwrap(),
        "--action=open",
        "--config",
        &config,
        "--editor-tempdir-prefix=cli-",
        "--tab=editor",
        "--id=layer1",
    ]);
    assert!(opened.status.success(), "{}", String::from_utf8_lossy(&opened.stderr));

    let opened_doc = Document::from_bytes(&opened.stdout).unwrap();
    let marked = opened_doc.find_paths(|el| el.has_attribute("editor-session-dir"));
    assert_eq!(marked.len(), 2);
    let session_dir = opened_doc
        .element(&marked[0])
        .unwrap()
        .attribute("editor-session-dir")
        .unwrap()
        .into_owned();
    assert!(Path::new(&session_dir).join("script1.js").is_file());
    assert!(Path::new(&session_dir).join("output_preview.svg").is_file());

    fs::write(Path::new(&session_dir).join("script1.js"), "alert(2)").unwrap();
    let opened_path = temp_dir.path().join("opened.svg");
    fs::write(&opened_path, &opened.stdout).unwrap();
    let saved_path = temp_dir.path().join("saved.svg");

    let saved = run(&[
        opened_path.to_str().unwrap(),
        "--action=save",
        "--config",
        &config,
        "--remove-data-attribute=true",
        "--output",
        saved_path.to_str().unwrap(),
    ]);
    assert!(saved.status.success(), "{}", String::from_utf8_lossy(&saved.stderr));
    assert!(saved.stdout.is_empty());

    let saved_xml = fs::read_to_string(&saved_path).unwrap();
    assert!(saved_xml.contains("<![CDATA[alert(2)]]>"));
    assert!(!saved_xml.contains("editor-session-dir"));
    assert!(!Path::new(&session_dir).exists());
}

#[test]
fn test_save_without_session_echoes_input() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(temp_dir.path());
    let input = temp_dir.path().join("drawing.svg");
    fs::write(&input, DRAWING).unwrap();

    let saved = run(&[input.to_str().unwrap(), "--action=save", "--config", &config]);

    assert!(saved.status.success());
    assert_eq!(saved.stdout, DRAWING.as_bytes());
    assert!(String::from_utf8_lossy(&saved.stderr).contains("No scripts were found."));
}

#[test]
fn test_invalid_action_fails() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(temp_dir.path());
    let input = temp_dir.path().join("drawing.svg");
    fs::write(&input, DRAWING).unwrap();

    let result = run(&[input.to_str().unwrap(), "--action=close", "--config", &config]);

    assert!(!result.status.success());
    assert!(result.stdout.is_empty());
    assert!(String::from_utf8_lossy(&result.stderr).contains("Invalid action"));
}
