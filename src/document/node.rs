use std::borrow::Cow;

use quick_xml::escape::{escape, unescape};

use super::DocumentError;

/// SVG 命名空间
pub const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";

/// 元素属性
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// 限定名（可能带前缀，如 `xlink:href`）
    pub name: String,
    /// 转义形式的属性值，不含引号
    pub raw_value: String,
}

impl Attribute {
    pub fn local_name(&self) -> &str {
        local_part(&self.name)
    }

    /// 反转义后的属性值
    pub fn value(&self) -> Result<Cow<'_, str>, DocumentError> {
        unescape(&self.raw_value).map_err(|e| DocumentError::Escape(e.to_string()))
    }
}

/// 树中的节点
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    /// 转义形式的文本
    Text(String),
    /// CDATA 段内容（原样）
    CData(String),
    Comment(String),
    ProcessingInstruction(String),
    DocType(String),
}

/// XML 元素
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// 限定名（可能带前缀）
    pub name: String,
    /// 解析得到的命名空间 URI
    pub namespace: Option<String>,
    /// 按源文档顺序排列的属性
    pub attributes: Vec<Attribute>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>, namespace: Option<String>) -> Self {
        Self {
            name: name.into(),
            namespace,
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// 创建与当前元素同前缀、同命名空间的新元素
    pub fn new_like(&self, local_name: &str) -> Self {
        let name = match self.prefix() {
            Some(prefix) => format!("{}:{}", prefix, local_name),
            None => local_name.to_string(),
        };
        Self::new(name, self.namespace.clone())
    }

    pub fn local_name(&self) -> &str {
        local_part(&self.name)
    }

    pub fn prefix(&self) -> Option<&str> {
        self.name.split_once(':').map(|(prefix, _)| prefix)
    }

    /// 是否为 SVG 元素（SVG 命名空间，或文档未声明命名空间）
    pub fn is_svg(&self) -> bool {
        matches!(self.namespace.as_deref(), None | Some(SVG_NAMESPACE))
    }

    /// 读取属性值（反转义失败时返回原始文本）
    pub fn attribute(&self, name: &str) -> Option<Cow<'_, str>> {
        self.attributes
            .iter()
            .find(|attr| attr.name == name)
            .map(|attr| attr.value().unwrap_or(Cow::Borrowed(attr.raw_value.as_str())))
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.iter().any(|attr| attr.name == name)
    }

    /// 是否存在指定本地名的属性（忽略前缀）
    pub fn has_attribute_local(&self, local_name: &str) -> bool {
        self.attributes
            .iter()
            .any(|attr| attr.local_name() == local_name)
    }

    /// 设置属性；已存在时原位替换，保持属性顺序
    pub fn set_attribute(&mut self, name: &str, value: &str) {
        let raw_value = escape(value).into_owned();
        match self.attributes.iter_mut().find(|attr| attr.name == name) {
            Some(attr) => attr.raw_value = raw_value,
            None => self.attributes.push(Attribute {
                name: name.to_string(),
                raw_value,
            }),
        }
    }

    /// 删除属性，返回被删除的原始值
    pub fn remove_attribute(&mut self, name: &str) -> Option<String> {
        let index = self.attributes.iter().position(|attr| attr.name == name)?;
        Some(self.attributes.remove(index).raw_value)
    }

    pub fn id(&self) -> Option<Cow<'_, str>> {
        self.attribute("id")
    }

    /// 直接子节点中的文本与 CDATA 内容拼接
    pub fn text_content(&self) -> Result<String, DocumentError> {
        let mut text = String::new();
        for child in &self.children {
            match child {
                Node::Text(raw) => {
                    let unescaped =
                        unescape(raw).map_err(|e| DocumentError::Escape(e.to_string()))?;
                    text.push_str(&unescaped);
                }
                Node::CData(data) => text.push_str(data),
                _ => {}
            }
        }
        Ok(text)
    }

    /// 以单个 CDATA 段替换全部子节点，内容不做实体转义
    pub fn set_cdata(&mut self, text: impl Into<String>) {
        self.children = vec![Node::CData(text.into())];
    }

    /// 追加子元素，返回其在 `children` 中的下标
    pub fn append_child(&mut self, child: Element) -> usize {
        self.children.push(Node::Element(child));
        self.children.len() - 1
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|child| match child {
            Node::Element(element) => Some(element),
            _ => None,
        })
    }
}

pub(super) fn local_part(name: &str) -> &str {
    name.split_once(':').map_or(name, |(_, local)| local)
}
