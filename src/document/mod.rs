/// 文档树模块
///
/// 将宿主文档（SVG）解析为可修改的元素树，并以缩进格式、UTF-8 编码、
/// 带 XML 声明的形式重新序列化。
///
/// # 架构设计
///
/// - **node**: `Element` / `Node` / `Attribute` 数据结构
/// - **parser**: 基于 quick-xml 事件流构建元素树
/// - **writer**: 元素树的格式化输出
///
/// 属性值和文本保存为源文本中的转义形式，未被修改的部分按原样写回。
///
/// # 使用示例
///
/// ```rust,ignore
/// use svg_script_editor::Document;
///
/// let mut doc = Document::parse(r#"<svg xmlns="http://www.w3.org/2000/svg"/>"#)?;
/// doc.root_mut().set_attribute("width", "10");
/// println!("{}", doc.to_xml_string());
/// ```
mod node;
mod parser;
mod writer;


use thiserror::Error;

pub use node::{Attribute, Element, Node, SVG_NAMESPACE};
pub use writer::XML_DECLARATION;

/// 元素在树中的位置：从根元素出发，逐层的 `children` 下标
pub type ElementPath = Vec<usize>;

/// 文档解析错误
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("XML attribute error: {0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),

    #[error("Invalid UTF-8 in document: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("Invalid escape sequence: {0}")]
    Escape(String),

    #[error("Document has no root element")]
    MissingRoot,

    #[error("Document has more than one root element")]
    MultipleRoots,

    #[error("Element <{0}> is never closed")]
    UnclosedElement(String),

    #[error("Unexpected text outside the root element: {0:?}")]
    StrayText(String),
}

/// 完整的文档：根元素及其前后的注释、处理指令、DOCTYPE
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// 根元素之前的节点
    pub prolog: Vec<Node>,
    /// 根元素
    pub root: Element,
    /// 根元素之后的节点
    pub epilog: Vec<Node>,
}

impl Document {
    /// 解析 XML 文本
    pub fn parse(input: &str) -> Result<Self, DocumentError> {
        parser::parse(input)
    }

    /// 解析 UTF-8 字节（允许 BOM）
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DocumentError> {
        let text = std::str::from_utf8(bytes)?;
        Self::parse(text)
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Element {
        &mut self.root
    }

    /// 按文档顺序（先序）查找满足条件的元素，返回其路径
    ///
    /// 根元素自身的路径为空。
    pub fn find_paths<F>(&self, predicate: F) -> Vec<ElementPath>
    where
        F: Fn(&Element) -> bool,
    {
        let mut found = Vec::new();
        let mut current = Vec::new();
        collect_paths(&self.root, &predicate, &mut current, &mut found);
        found
    }

    /// 按路径获取元素
    pub fn element(&self, path: &[usize]) -> Option<&Element> {
        let mut element = &self.root;
        for &index in path {
            match element.children.get(index) {
                Some(Node::Element(child)) => element = child,
                _ => return None,
            }
        }
        Some(element)
    }

    /// 按路径获取可变元素
    pub fn element_mut(&mut self, path: &[usize]) -> Option<&mut Element> {
        let mut element = &mut self.root;
        for &index in path {
            match element.children.get_mut(index) {
                Some(Node::Element(child)) => element = child,
                _ => return None,
            }
        }
        Some(element)
    }

    /// 按文档顺序列出全部元素（含根元素）
    pub fn elements(&self) -> Vec<&Element> {
        let mut all = Vec::new();
        collect_elements(&self.root, &mut all);
        all
    }

    /// 序列化为带 XML 声明的缩进文本
    pub fn to_xml_string(&self) -> String {
        writer::write_document(self)
    }

    /// 序列化为 UTF-8 字节
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_xml_string().into_bytes()
    }
}

fn collect_paths<F>(
    element: &Element,
    predicate: &F,
    current: &mut ElementPath,
    found: &mut Vec<ElementPath>,
) where
    F: Fn(&Element) -> bool,
{
    if predicate(element) {
        found.push(current.clone());
    }
    for (index, child) in element.children.iter().enumerate() {
        if let Node::Element(child) = child {
            current.push(index);
            collect_paths(child, predicate, current, found);
            current.pop();
        }
    }
}

fn collect_elements<'a>(element: &'a Element, all: &mut Vec<&'a Element>) {
    all.push(element);
    for child in element.child_elements() {
        collect_elements(child, all);
    }
}
