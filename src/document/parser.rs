/// 基于 quick-xml 事件流的元素树构建
use std::borrow::Cow;
use std::collections::HashMap;

use quick_xml::escape::{escape, resolve_predefined_entity, unescape_with};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::node::{Attribute, Element, Node};
use super::{Document, DocumentError};

/// 单个元素上声明的命名空间（前缀, URI）
type Declarations = Vec<(Option<String>, String)>;

/// DOCTYPE 内部子集声明的实体（名称 -> 替换文本）
type Entities = HashMap<String, String>;

pub(super) fn parse(input: &str) -> Result<Document, DocumentError> {
    let input = input.strip_prefix('\u{feff}').unwrap_or(input);
    let mut reader = Reader::from_str(input);

    let mut prolog = Vec::new();
    let mut epilog = Vec::new();
    let mut root: Option<Element> = None;
    let mut stack: Vec<Element> = Vec::new();
    let mut scopes: Vec<Declarations> = Vec::new();
    let mut entities = Entities::new();

    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                let (element, declared) = open_element(&start, &scopes, &entities)?;
                scopes.push(declared);
                stack.push(element);
            }
            Event::Empty(start) => {
                let (element, _) = open_element(&start, &scopes, &entities)?;
                attach(element, &mut stack, &mut root)?;
            }
            Event::End(_) => {
                scopes.pop();
                if let Some(element) = stack.pop() {
                    attach(element, &mut stack, &mut root)?;
                }
            }
            Event::Text(text) => {
                let raw = std::str::from_utf8(&text)?;
                match stack.last_mut() {
                    Some(parent) => {
                        let raw = expand_entities(raw, &entities)?;
                        parent.children.push(Node::Text(raw.into_owned()));
                    }
                    None if raw.trim().is_empty() => {}
                    None => return Err(DocumentError::StrayText(raw.trim().to_string())),
                }
            }
            Event::CData(data) => {
                let content = std::str::from_utf8(&data)?.to_string();
                match stack.last_mut() {
                    Some(parent) => parent.children.push(Node::CData(content)),
                    None => return Err(DocumentError::StrayText(content)),
                }
            }
            Event::Comment(comment) => {
                let node = Node::Comment(std::str::from_utf8(&comment)?.to_string());
                push_misc(node, &mut stack, &root, &mut prolog, &mut epilog);
            }
            Event::PI(instruction) => {
                let raw = std::str::from_utf8(&instruction)?;
                let node = Node::ProcessingInstruction(raw.to_string());
                push_misc(node, &mut stack, &root, &mut prolog, &mut epilog);
            }
            Event::DocType(doctype) => {
                let raw = std::str::from_utf8(&doctype)?;
                entities.extend(internal_entities(raw));
                let node = Node::DocType(raw.to_string());
                push_misc(node, &mut stack, &root, &mut prolog, &mut epilog);
            }
            // 输出时总是写入新的 UTF-8 声明
            Event::Decl(_) => {}
            Event::Eof => break,
        }
    }

    if let Some(open) = stack.last() {
        return Err(DocumentError::UnclosedElement(open.name.clone()));
    }

    let root = root.ok_or(DocumentError::MissingRoot)?;
    Ok(Document {
        prolog,
        root,
        epilog,
    })
}

fn open_element(
    start: &BytesStart<'_>,
    scopes: &[Declarations],
    entities: &Entities,
) -> Result<(Element, Declarations), DocumentError> {
    let name = std::str::from_utf8(start.name().as_ref())?.to_string();

    let mut attributes = Vec::new();
    let mut declared = Declarations::new();
    for attr in start.attributes() {
        let attr = attr?;
        let key = std::str::from_utf8(attr.key.as_ref())?.to_string();
        let raw_value = expand_entities(std::str::from_utf8(&attr.value)?, entities)?.into_owned();

        if key == "xmlns" || key.starts_with("xmlns:") {
            let uri = unescape_with(&raw_value, |name| resolve_entity(name, entities))
                .map_err(|e| DocumentError::Escape(e.to_string()))?
                .into_owned();
            let prefix = key.strip_prefix("xmlns:").map(str::to_string);
            declared.push((prefix, uri));
        }

        attributes.push(Attribute { name: key, raw_value });
    }

    let prefix = name.split_once(':').map(|(prefix, _)| prefix);
    let namespace = resolve_namespace(prefix, &declared, scopes);

    let element = Element {
        name,
        namespace,
        attributes,
        children: Vec::new(),
    };
    Ok((element, declared))
}

/// 由内向外查找前缀对应的命名空间；`xmlns=""` 取消默认命名空间
fn resolve_namespace(
    prefix: Option<&str>,
    declared: &Declarations,
    scopes: &[Declarations],
) -> Option<String> {
    std::iter::once(declared)
        .chain(scopes.iter().rev())
        .flat_map(|scope| scope.iter())
        .find(|(declared_prefix, _)| declared_prefix.as_deref() == prefix)
        .map(|(_, uri)| uri.clone())
        .filter(|uri| !uri.is_empty())
}

fn resolve_entity<'a>(name: &str, entities: &'a Entities) -> Option<&'a str> {
    entities
        .get(name)
        .map(String::as_str)
        .or_else(|| resolve_predefined_entity(name))
}

/// 把引用了内部实体的原始文本展开并重新转义，其他文本保持原样
fn expand_entities<'a>(raw: &'a str, entities: &Entities) -> Result<Cow<'a, str>, DocumentError> {
    let references_internal = entities
        .keys()
        .any(|name| raw.contains(&format!("&{};", name)));
    if !references_internal {
        return Ok(Cow::Borrowed(raw));
    }

    let text = unescape_with(raw, |name| resolve_entity(name, entities))
        .map_err(|e| DocumentError::Escape(e.to_string()))?;
    Ok(Cow::Owned(escape(text.as_ref()).into_owned()))
}

/// 从 DOCTYPE 内容中取出 `<!ENTITY name "value">` 声明
///
/// 参数实体（`%`）和外部实体（SYSTEM/PUBLIC）不展开。
fn internal_entities(doctype: &str) -> Entities {
    let mut entities = Entities::new();
    let mut rest = doctype;

    while let Some(start) = rest.find("<!ENTITY") {
        rest = rest[start + "<!ENTITY".len()..].trim_start();
        if rest.starts_with('%') {
            continue;
        }

        let name_end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        let name = &rest[..name_end];
        rest = rest[name_end..].trim_start();

        let Some(quote) = rest.chars().next().filter(|c| *c == '"' || *c == '\'') else {
            continue;
        };
        let Some(value_end) = rest[1..].find(quote) else {
            break;
        };
        // 首次声明优先
        entities
            .entry(name.to_string())
            .or_insert_with(|| rest[1..1 + value_end].to_string());
        rest = &rest[1 + value_end + 1..];
    }
    entities
}

fn attach(
    element: Element,
    stack: &mut [Element],
    root: &mut Option<Element>,
) -> Result<(), DocumentError> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(Node::Element(element));
        return Ok(());
    }
    if root.is_some() {
        return Err(DocumentError::MultipleRoots);
    }
    *root = Some(element);
    Ok(())
}

fn push_misc(
    node: Node,
    stack: &mut [Element],
    root: &Option<Element>,
    prolog: &mut Vec<Node>,
    epilog: &mut Vec<Node>,
) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None if root.is_none() => prolog.push(node),
        None => epilog.push(node),
    }
}
