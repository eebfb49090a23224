/// 元素树的格式化输出
///
/// 只含元素/注释/处理指令的元素按层级缩进；
/// 含任何文本（包括空白）或 CDATA 的元素按原样输出，不改动已有排版。
use super::node::{Attribute, Element, Node};
use super::Document;

pub const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

const INDENT: &str = "  ";

pub(super) fn write_document(document: &Document) -> String {
    let mut out = String::with_capacity(4096);
    out.push_str(XML_DECLARATION);
    out.push('\n');

    for node in &document.prolog {
        write_node(&mut out, node, 0, true);
        out.push('\n');
    }

    write_element(&mut out, &document.root, 0, true);
    out.push('\n');

    for node in &document.epilog {
        write_node(&mut out, node, 0, true);
        out.push('\n');
    }

    out
}

fn write_element(out: &mut String, element: &Element, depth: usize, pretty: bool) {
    out.push('<');
    out.push_str(&element.name);
    for attr in &element.attributes {
        write_attribute(out, attr);
    }

    if element.children.is_empty() {
        out.push_str("/>");
        return;
    }
    out.push('>');

    if pretty && is_indentable(element) {
        for child in &element.children {
            out.push('\n');
            push_indent(out, depth + 1);
            write_node(out, child, depth + 1, true);
        }
        out.push('\n');
        push_indent(out, depth);
    } else {
        for child in &element.children {
            write_node(out, child, depth + 1, false);
        }
    }

    out.push_str("</");
    out.push_str(&element.name);
    out.push('>');
}

fn write_node(out: &mut String, node: &Node, depth: usize, pretty: bool) {
    match node {
        Node::Element(element) => write_element(out, element, depth, pretty),
        Node::Text(raw) => out.push_str(raw),
        Node::CData(data) => write_cdata(out, data),
        Node::Comment(raw) => {
            out.push_str("<!--");
            out.push_str(raw);
            out.push_str("-->");
        }
        Node::ProcessingInstruction(raw) => {
            out.push_str("<?");
            out.push_str(raw);
            out.push_str("?>");
        }
        Node::DocType(raw) => {
            out.push_str("<!DOCTYPE ");
            out.push_str(raw);
            out.push('>');
        }
    }
}

fn write_attribute(out: &mut String, attr: &Attribute) {
    // 源文档中用单引号包裹且含双引号的值保持单引号
    let quote = if attr.raw_value.contains('"') { '\'' } else { '"' };
    out.push(' ');
    out.push_str(&attr.name);
    out.push('=');
    out.push(quote);
    out.push_str(&attr.raw_value);
    out.push(quote);
}

/// `]]>` 拆到两个相邻的 CDATA 段中
fn write_cdata(out: &mut String, data: &str) {
    out.push_str("<![CDATA[");
    out.push_str(&data.replace("]]>", "]]]]><![CDATA[>"));
    out.push_str("]]>");
}

fn is_indentable(element: &Element) -> bool {
    let has_markup = element.children.iter().any(|child| {
        matches!(
            child,
            Node::Element(_) | Node::Comment(_) | Node::ProcessingInstruction(_)
        )
    });
    // 任何文本子节点（包括空白）都可能有意义，例如 xml:space="preserve"
    let has_text = element
        .children
        .iter()
        .any(|child| matches!(child, Node::Text(_) | Node::CData(_)));
    has_markup && !has_text
}

fn push_indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
}
