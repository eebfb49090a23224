use std::fmt;
use std::path::PathBuf;

use crate::document::Element;

/// 内嵌内容的种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    /// `<script>`，导出为 `.js`
    Script,
    /// `<style>`，导出为 `.css`
    Style,
}

impl ContentKind {
    /// 处理顺序：先脚本后样式
    pub const ALL: [ContentKind; 2] = [ContentKind::Script, ContentKind::Style];

    pub fn tag_name(self) -> &'static str {
        match self {
            ContentKind::Script => "script",
            ContentKind::Style => "style",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ContentKind::Script => "js",
            ContentKind::Style => "css",
        }
    }

    /// 节点内容为空时写入临时文件的占位注释
    pub fn placeholder(self) -> &'static str {
        match self {
            ContentKind::Script => "// Created by svg_script_editor.\n",
            ContentKind::Style => "/* Created by svg_script_editor. */",
        }
    }

    /// 元素是否属于该种类（不论内嵌还是外链）
    pub fn matches(self, element: &Element) -> bool {
        element.is_svg() && element.local_name() == self.tag_name()
    }

    /// 元素是否为真正内嵌的内容（没有 `href` / `xlink:href` 外链）
    pub fn is_embedded(self, element: &Element) -> bool {
        self.matches(element) && !element.has_attribute_local("href")
    }

    /// `<identifier>.<ext>`
    pub fn file_name(self, identifier: &str) -> String {
        format!("{}.{}", identifier, self.extension())
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag_name())
    }
}

/// 会话目录中与某个节点对应的内容文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentFile {
    pub kind: ContentKind,
    pub identifier: String,
    pub path: PathBuf,
}

impl ContentFile {
    pub fn new(kind: ContentKind, identifier: impl Into<String>, path: PathBuf) -> Self {
        Self {
            kind,
            identifier: identifier.into(),
            path,
        }
    }
}
