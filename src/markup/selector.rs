use std::fmt::{Display, Formatter};
use std::str::FromStr;

use super::{Markup, NodeId};

/// A parsed CSS selector.
///
/// Supports type, universal, `#id`, `.class`, `[attr]` and `[attr=value]`
/// simple selectors, compound forms, the descendant combinator and
/// comma-separated lists.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Selector {
    source: String,
    alternatives: Vec<ComplexSelector>,
}

#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum SelectorError {
    #[error("selector is empty")]
    Empty,
    #[error("unexpected `{found}` at offset {offset} in selector `{selector}`")]
    Unexpected {
        selector: String,
        found: char,
        offset: usize,
    },
    #[error("selector `{0}` ends unexpectedly")]
    UnexpectedEnd(String),
}

#[derive(Clone, Debug, Eq, PartialEq)]
struct ComplexSelector {
    // Left to right; each step is a descendant of the previous one.
    compounds: Vec<CompoundSelector>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
struct CompoundSelector {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attributes: Vec<AttributeMatch>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
struct AttributeMatch {
    name: String,
    value: Option<String>,
}

impl Selector {
    pub fn parse(source: &str) -> Result<Self, SelectorError> {
        let alternatives = Parser::new(source).selector_list()?;
        Ok(Self {
            source: source.trim().to_string(),
            alternatives,
        })
    }

    /// Selector matching elements that carry `class`.
    pub fn class(class: &str) -> Result<Self, SelectorError> {
        Self::parse(&format!(".{}", class.trim()))
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches<M>(&self, markup: &M, node: NodeId) -> bool
    where
        M: Markup + ?Sized,
    {
        self.alternatives
            .iter()
            .any(|complex| complex.matches(markup, node))
    }
}

impl FromStr for Selector {
    type Err = SelectorError;

    fn from_str(source: &str) -> Result<Self, Self::Err> {
        Self::parse(source)
    }
}

impl Display for Selector {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

impl ComplexSelector {
    fn matches<M>(&self, markup: &M, node: NodeId) -> bool
    where
        M: Markup + ?Sized,
    {
        let Some((subject, ancestors)) = self.compounds.split_last() else {
            return false;
        };
        if !subject.matches(markup, node) {
            return false;
        }

        let mut remaining = ancestors.iter().rev().peekable();
        let mut current = markup.parent(node);
        while let Some(compound) = remaining.peek() {
            let Some(candidate) = current else {
                return false;
            };
            if compound.matches(markup, candidate) {
                remaining.next();
            }
            current = markup.parent(candidate);
        }
        true
    }
}

impl CompoundSelector {
    fn matches<M>(&self, markup: &M, node: NodeId) -> bool
    where
        M: Markup + ?Sized,
    {
        let Some(tag) = markup.tag(node) else {
            return false;
        };
        if let Some(expected) = &self.tag
            && !tag.eq_ignore_ascii_case(expected)
        {
            return false;
        }
        if let Some(id) = &self.id
            && markup.attribute(node, "id") != Some(id.as_str())
        {
            return false;
        }
        if !self
            .classes
            .iter()
            .all(|class| markup.has_class(node, class))
        {
            return false;
        }
        self.attributes.iter().all(|attribute| {
            match (markup.attribute(node, &attribute.name), &attribute.value) {
                (Some(_), None) => true,
                (Some(actual), Some(expected)) => actual == expected,
                (None, _) => false,
            }
        })
    }
}

struct Parser<'a> {
    source: &'a str,
    chars: Vec<(usize, char)>,
    cursor: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().collect(),
            cursor: 0,
        }
    }

    fn selector_list(&mut self) -> Result<Vec<ComplexSelector>, SelectorError> {
        let mut alternatives = Vec::new();
        loop {
            self.skip_whitespace();
            alternatives.push(self.complex()?);
            self.skip_whitespace();
            match self.peek() {
                None => break,
                Some(',') => self.advance(),
                Some(found) => return Err(self.unexpected(found)),
            }
        }
        Ok(alternatives)
    }

    fn complex(&mut self) -> Result<ComplexSelector, SelectorError> {
        let mut compounds = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                None | Some(',') => break,
                Some(_) => compounds.push(self.compound()?),
            }
        }
        if compounds.is_empty() {
            return Err(SelectorError::Empty);
        }
        Ok(ComplexSelector { compounds })
    }

    fn compound(&mut self) -> Result<CompoundSelector, SelectorError> {
        let mut compound = CompoundSelector::default();
        let mut consumed = false;

        match self.peek() {
            Some('*') => {
                self.advance();
                consumed = true;
            }
            Some(c) if is_ident_char(c) => {
                compound.tag = Some(self.ident()?.to_ascii_lowercase());
                consumed = true;
            }
            _ => {}
        }

        loop {
            match self.peek() {
                Some('.') => {
                    self.advance();
                    compound.classes.push(self.ident()?);
                }
                Some('#') => {
                    self.advance();
                    compound.id = Some(self.ident()?);
                }
                Some('[') => {
                    self.advance();
                    compound.attributes.push(self.attribute()?);
                }
                _ => break,
            }
            consumed = true;
        }

        if consumed {
            Ok(compound)
        } else {
            Err(self.unexpected_here())
        }
    }

    fn attribute(&mut self) -> Result<AttributeMatch, SelectorError> {
        self.skip_whitespace();
        let name = self.ident()?;
        self.skip_whitespace();
        let value = match self.peek() {
            Some(']') => None,
            Some('=') => {
                self.advance();
                self.skip_whitespace();
                let value = match self.peek() {
                    Some(quote @ ('"' | '\'')) => self.quoted(quote)?,
                    _ => self.ident()?,
                };
                self.skip_whitespace();
                Some(value)
            }
            _ => return Err(self.unexpected_here()),
        };
        match self.peek() {
            Some(']') => {
                self.advance();
                Ok(AttributeMatch { name, value })
            }
            _ => Err(self.unexpected_here()),
        }
    }

    fn quoted(&mut self, quote: char) -> Result<String, SelectorError> {
        self.advance();
        let mut value = String::new();
        loop {
            match self.peek() {
                Some(c) if c == quote => {
                    self.advance();
                    return Ok(value);
                }
                Some(c) => {
                    value.push(c);
                    self.advance();
                }
                None => return Err(SelectorError::UnexpectedEnd(self.source.to_string())),
            }
        }
    }

    fn ident(&mut self) -> Result<String, SelectorError> {
        let mut ident = String::new();
        while let Some(c) = self.peek()
            && is_ident_char(c)
        {
            ident.push(c);
            self.advance();
        }
        if ident.is_empty() {
            return Err(self.unexpected_here());
        }
        Ok(ident)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.advance();
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.cursor).map(|(_, c)| *c)
    }

    fn advance(&mut self) {
        self.cursor += 1;
    }

    fn unexpected_here(&self) -> SelectorError {
        match self.peek() {
            Some(found) => self.unexpected(found),
            None if self.source.trim().is_empty() => SelectorError::Empty,
            None => SelectorError::UnexpectedEnd(self.source.to_string()),
        }
    }

    fn unexpected(&self, found: char) -> SelectorError {
        SelectorError::Unexpected {
            selector: self.source.to_string(),
            found,
            offset: self
                .chars
                .get(self.cursor)
                .map(|(offset, _)| *offset)
                .unwrap_or(self.source.len()),
        }
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::Document;

    #[test]
    fn parses_compound_and_list_selectors() {
        let selector = Selector::parse("input.card[name=number], select").expect("valid selector");
        assert_eq!(selector.alternatives.len(), 2);
        assert_eq!(
            selector.alternatives[0].compounds[0],
            CompoundSelector {
                tag: Some("input".into()),
                id: None,
                classes: vec!["card".into()],
                attributes: vec![AttributeMatch {
                    name: "name".into(),
                    value: Some("number".into()),
                }],
            }
        );
        assert_eq!(selector.to_string(), "input.card[name=number], select");
    }

    #[test]
    fn rejects_malformed_selectors() {
        assert_eq!(Selector::parse("   "), Err(SelectorError::Empty));
        assert!(matches!(
            Selector::parse("input > select"),
            Err(SelectorError::Unexpected { found: '>', .. })
        ));
        assert!(matches!(
            Selector::parse("[name='card"),
            Err(SelectorError::UnexpectedEnd(_))
        ));
        assert_eq!(Selector::parse("a,"), Err(SelectorError::Empty));
    }

    #[test]
    fn descendant_combinator_walks_ancestors() {
        let mut doc = Document::new();
        let form = doc.append_element(doc.root(), "form", &[("name", "checkout")]);
        let group = doc.append_element(form, "fieldset", &[("class", "billing")]);
        let wrapper = doc.append_element(group, "div", &[]);
        let card = doc.append_element(wrapper, "input", &[("name", "card"), ("class", "x")]);
        let outside = doc.append_element(form, "input", &[("name", "email")]);

        let selector = Selector::parse(".billing input").expect("valid selector");
        assert!(selector.matches(&doc, card));
        assert!(!selector.matches(&doc, outside));

        let quoted = Selector::parse("form [ name = \"card\" ].x").expect("valid selector");
        assert!(quoted.matches(&doc, card));
        assert!(!quoted.matches(&doc, outside));
    }

    #[test]
    fn id_and_universal_selectors() {
        let mut doc = Document::new();
        let div = doc.append_element(doc.root(), "div", &[("id", "banner")]);
        let text = doc.append_text(div, "hello");

        assert!(Selector::parse("#banner").expect("valid").matches(&doc, div));
        assert!(Selector::parse("*").expect("valid").matches(&doc, div));
        assert!(!Selector::parse("*").expect("valid").matches(&doc, text));
        assert!(Selector::class("banner").is_ok());
        assert!(Selector::class("").is_err());
    }
}
