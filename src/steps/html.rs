//! Summaries of HTML error pages.
//!
//! When a request fails with an HTML page the full body is rarely useful, so
//! the failure report lists the headings, alert boxes and form errors found
//! in the parsed document instead.

use html5ever::{parse_document, tendril::TendrilSink};
use markup5ever_rcdom::{Handle, NodeData, RcDom};

const INDENT: &str = "    ";

/// Summarise an HTML page as one line per interesting element.
///
/// Lines follow document order within each group: `h1` headings, `h2`
/// headings, `.alert` boxes, the first label and error of each `.has-error`
/// form group, then every list item inside a `.help-block`. Entities are
/// decoded and surrounding whitespace is trimmed.
pub(crate) fn summarise(html: &str) -> Vec<String> {
    let dom = parse_document(RcDom::default(), Default::default()).one(html);
    let elements = descendants(&dom.document);
    let mut lines = Vec::new();

    let groups = [
        ("h1", Selector::Tag("h1")),
        ("h2", Selector::Tag("h2")),
        (".alert", Selector::Class("alert")),
    ];
    for (label, selector) in groups {
        lines.extend(
            elements
                .iter()
                .filter(|node| selector.matches(node))
                .map(|node| format!("{INDENT}{label}: {}", text_of(node).trim())),
        );
    }

    for group in elements.iter().filter(|node| Selector::Class("has-error").matches(node)) {
        if let Some(line) = field_error(group) {
            lines.push(line);
        }
    }

    for block in elements.iter().filter(|node| Selector::Class("help-block").matches(node)) {
        lines.extend(
            descendants(block)
                .iter()
                .filter(|node| Selector::Tag("li").matches(node))
                .map(|item| format!("{INDENT}Global error: {}", text_of(item).trim())),
        );
    }
    lines
}

/// `<for>: <error>` for the first labelled field of a `.has-error` group.
fn field_error(group: &Handle) -> Option<String> {
    let inside = descendants(group);
    let field = inside
        .iter()
        .filter(|node| Selector::Tag("label").matches(node))
        .find_map(|label| attribute(label, "for"))?;
    let error = inside
        .iter()
        .filter(|node| Selector::Tag("ul").matches(node))
        .flat_map(descendants)
        .find(|node| Selector::Tag("li").matches(node))?;
    Some(format!("{INDENT}{field}: {}", text_of(&error).trim()))
}

#[derive(Clone, Copy, Debug)]
enum Selector<'a> {
    Tag(&'a str),
    Class(&'a str),
}

impl Selector<'_> {
    fn matches(self, node: &Handle) -> bool {
        let NodeData::Element { name, .. } = &node.data else {
            return false;
        };
        match self {
            Self::Tag(tag) => (*name.local).eq_ignore_ascii_case(tag),
            Self::Class(class) => attribute(node, "class")
                .is_some_and(|classes| classes.split_whitespace().any(|item| item == class)),
        }
    }
}

fn attribute(node: &Handle, wanted: &str) -> Option<String> {
    let NodeData::Element { attrs, .. } = &node.data else {
        return None;
    };
    attrs
        .borrow()
        .iter()
        .find(|attr| &*attr.name.local == wanted)
        .map(|attr| attr.value.to_string())
}

/// Every element and text node below `node`, in document order.
fn descendants(node: &Handle) -> Vec<Handle> {
    let mut found = Vec::new();
    let mut stack: Vec<Handle> = node.children.borrow().iter().rev().cloned().collect();
    while let Some(current) = stack.pop() {
        stack.extend(current.children.borrow().iter().rev().cloned());
        found.push(current);
    }
    found
}

fn text_of(node: &Handle) -> String {
    descendants(node)
        .iter()
        .filter_map(|child| match &child.data {
            NodeData::Text { contents } => Some(contents.borrow().to_string()),
            _ => None,
        })
        .collect()
}
