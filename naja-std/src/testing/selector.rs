//! Compound CSS selectors for [`MemoryDom`](super::MemoryDom).
//!
//! Supported: `*`, `tag`, `#id`, `.class`, `[attr]`, `[attr="v"]`,
//! `[attr^="v"]`, `:not(simple)` and comma-separated lists. Combinators are
//! not; a compound that fails to parse matches nothing.

use super::html::Element;

#[derive(Debug, Clone, PartialEq)]
enum Simple {
    Any,
    Tag(String),
    Id(String),
    Class(String),
    Attribute(String, Match),
    Not(Box<Simple>),
}

#[derive(Debug, Clone, PartialEq)]
enum Match {
    Exists,
    Equals(String),
    Prefix(String),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Selector(Vec<Vec<Simple>>);

impl Selector {
    pub fn parse(input: &str) -> Self {
        Self(input.split(',').filter_map(parse_compound).collect())
    }

    pub fn matches(&self, element: &Element) -> bool {
        self.0
            .iter()
            .any(|compound| compound.iter().all(|simple| simple.matches(element)))
    }
}

impl Simple {
    fn matches(&self, element: &Element) -> bool {
        match self {
            Simple::Any => true,
            Simple::Tag(tag) => element.tag == *tag,
            Simple::Id(id) => element.attribute("id") == Some(id.as_str()),
            Simple::Class(class) => element
                .attribute("class")
                .is_some_and(|classes| classes.split_whitespace().any(|c| c == class)),
            Simple::Attribute(name, rule) => match (element.attribute(name), rule) {
                (None, _) => false,
                (Some(_), Match::Exists) => true,
                (Some(value), Match::Equals(expected)) => value == expected,
                (Some(value), Match::Prefix(prefix)) => value.starts_with(prefix.as_str()),
            },
            Simple::Not(inner) => !inner.matches(element),
        }
    }
}

fn parse_compound(input: &str) -> Option<Vec<Simple>> {
    let mut rest = input.trim();
    if rest.is_empty() {
        return None;
    }
    let mut compound = Vec::new();
    while !rest.is_empty() {
        let (simple, tail) = parse_simple(rest)?;
        compound.push(simple);
        rest = tail;
    }
    Some(compound)
}

fn parse_simple(input: &str) -> Option<(Simple, &str)> {
    if let Some(rest) = input.strip_prefix(":not(") {
        let close = rest.find(')')?;
        let (simple, leftover) = parse_simple(rest[..close].trim())?;
        if !leftover.is_empty() {
            return None;
        }
        return Some((Simple::Not(Box::new(simple)), &rest[close + 1..]));
    }
    if let Some(rest) = input.strip_prefix('[') {
        let close = closing_bracket(rest)?;
        return Some((parse_attribute(&rest[..close])?, &rest[close + 1..]));
    }
    if let Some(rest) = input.strip_prefix('*') {
        return Some((Simple::Any, rest));
    }
    if let Some(rest) = input.strip_prefix('#') {
        let (name, tail) = split_ident(rest)?;
        return Some((Simple::Id(name.to_owned()), tail));
    }
    if let Some(rest) = input.strip_prefix('.') {
        let (name, tail) = split_ident(rest)?;
        return Some((Simple::Class(name.to_owned()), tail));
    }
    let (name, tail) = split_ident(input)?;
    Some((Simple::Tag(name.to_ascii_lowercase()), tail))
}

fn parse_attribute(body: &str) -> Option<Simple> {
    let (name, rule) = if let Some((name, value)) = body.split_once("^=") {
        (name, Match::Prefix(unquote(value)))
    } else if let Some((name, value)) = body.split_once('=') {
        (name, Match::Equals(unquote(value)))
    } else {
        (body, Match::Exists)
    };
    let name = name.trim();
    (!name.is_empty()).then(|| Simple::Attribute(name.to_ascii_lowercase(), rule))
}

fn closing_bracket(input: &str) -> Option<usize> {
    let mut quote = None;
    for (index, c) in input.char_indices() {
        match (quote, c) {
            (None, '"' | '\'') => quote = Some(c),
            (Some(q), _) if c == q => quote = None,
            (None, ']') => return Some(index),
            _ => {}
        }
    }
    None
}

fn split_ident(input: &str) -> Option<(&str, &str)> {
    let end = input
        .find(|c: char| !(c.is_alphanumeric() || c == '-' || c == '_'))
        .unwrap_or(input.len());
    (end > 0).then(|| input.split_at(end))
}

fn unquote(value: &str) -> String {
    let value = value.trim();
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
        .unwrap_or(value)
        .to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(tag: &str, attributes: &[(&str, &str)]) -> Element {
        Element {
            tag: tag.into(),
            attributes: attributes
                .iter()
                .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
                .collect(),
            children: Vec::new(),
            parent: None,
        }
    }

    #[test]
    fn test_link_selector() {
        let selector = Selector::parse("a[href]:not([download]).ajax");
        assert!(selector.matches(&element("a", &[("href", "/"), ("class", "btn ajax")])));
        assert!(!selector.matches(&element("a", &[("href", "/"), ("class", "ajax"), ("download", "")])));
        assert!(!selector.matches(&element("a", &[("class", "ajax")])));
        assert!(!selector.matches(&element("span", &[("href", "/"), ("class", "ajax")])));
    }

    #[test]
    fn test_prefix_and_lists() {
        let selector = Selector::parse(r#"[id^="snippet-"], form"#);
        assert!(selector.matches(&element("div", &[("id", "snippet-content")])));
        assert!(selector.matches(&element("form", &[])));
        assert!(!selector.matches(&element("div", &[("id", "content")])));
    }

    #[test]
    fn test_quoted_bracket_in_value() {
        let selector = Selector::parse(r#"[data-x="a]b"]"#);
        assert!(selector.matches(&element("p", &[("data-x", "a]b")])));
    }

    #[test]
    fn test_combinators_match_nothing() {
        let selector = Selector::parse("div p");
        assert!(!selector.matches(&element("p", &[])));
    }
}
