//! A small CSS selector engine.
//!
//! Supported: `*`, type, `#id`, `.class`, `[attr]`, `[attr=v]`, `[attr~=v]`,
//! `[attr^=v]`, `[attr$=v]`, `[attr*=v]`, descendant and child (`>`)
//! combinators, and comma-separated lists. Matching never walks out of the
//! shadow tree the element lives in.

use std::fmt;

use compact_str::CompactString;
use smallvec::SmallVec;

use crate::error::{HideError, HideResult};

use super::document::{Document, ElementData, NodeId};

// =============================================================================
// AST
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttrOp {
    Exists,
    Equals,
    Includes,
    Prefix,
    Suffix,
    Substring,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttrSelector {
    name: CompactString,
    op: AttrOp,
    value: CompactString,
}

impl AttrSelector {
    fn matches(&self, elem: &ElementData) -> bool {
        let Some(actual) = elem.attr(&self.name) else {
            return false;
        };
        let expected = self.value.as_str();
        match self.op {
            AttrOp::Exists => true,
            AttrOp::Equals => actual == expected,
            AttrOp::Includes => actual.split_ascii_whitespace().any(|w| w == expected),
            AttrOp::Prefix => !expected.is_empty() && actual.starts_with(expected),
            AttrOp::Suffix => !expected.is_empty() && actual.ends_with(expected),
            AttrOp::Substring => !expected.is_empty() && actual.contains(expected),
        }
    }
}

/// One compound selector, e.g. `div.ad[data-x]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<CompactString>,
    ids: SmallVec<[CompactString; 1]>,
    classes: SmallVec<[CompactString; 2]>,
    attrs: SmallVec<[AttrSelector; 1]>,
}

impl Compound {
    fn matches(&self, elem: &ElementData) -> bool {
        self.tag.as_ref().is_none_or(|t| *t == elem.tag)
            && self.ids.iter().all(|id| elem.attr("id") == Some(id.as_str()))
            && self.classes.iter().all(|c| elem.classes().any(|have| have == c.as_str()))
            && self.attrs.iter().all(|a| a.matches(elem))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

/// Compounds left to right; the combinator links a compound to the one before it.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Complex {
    parts: Vec<(Combinator, Compound)>,
}

impl Complex {
    fn matches(&self, doc: &Document, node: NodeId) -> bool {
        self.matches_from(doc, node, self.parts.len() - 1)
    }

    fn matches_from(&self, doc: &Document, node: NodeId, index: usize) -> bool {
        let (combinator, compound) = &self.parts[index];
        let Some(elem) = doc.element(node) else {
            return false;
        };
        if !compound.matches(elem) {
            return false;
        }
        if index == 0 {
            return true;
        }
        match combinator {
            Combinator::Child => {
                parent_element(doc, node).is_some_and(|p| self.matches_from(doc, p, index - 1))
            }
            Combinator::Descendant => {
                let mut current = parent_element(doc, node);
                while let Some(ancestor) = current {
                    if self.matches_from(doc, ancestor, index - 1) {
                        return true;
                    }
                    current = parent_element(doc, ancestor);
                }
                false
            }
        }
    }
}

/// Parent if it is an element; stops at the document and shadow roots.
pub(crate) fn parent_element(doc: &Document, node: NodeId) -> Option<NodeId> {
    doc.parent(node).filter(|&p| doc.is_element(p))
}

// =============================================================================
// SelectorList
// =============================================================================

/// A parsed, comma-separated selector list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorList {
    source: CompactString,
    selectors: SmallVec<[Complex; 1]>,
}

impl SelectorList {
    /// Parse selector text.
    pub fn parse(source: &str) -> HideResult<Self> {
        let mut parser = Parser::new(source);
        let mut selectors = SmallVec::new();
        loop {
            parser.skip_ws();
            selectors.push(parser.complex()?);
            parser.skip_ws();
            match parser.peek() {
                None => break,
                Some(',') => parser.bump(),
                Some(_) => return Err(parser.error("unexpected character")),
            }
        }
        Ok(Self {
            source: source.into(),
            selectors,
        })
    }

    /// Original selector text.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether element `node` matches any selector in the list.
    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        self.selectors.iter().any(|s| s.matches(doc, node))
    }
}

impl fmt::Display for SelectorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

// =============================================================================
// Parser
// =============================================================================

struct Parser<'a> {
    source: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.chars().collect(),
            pos: 0,
        }
    }

    fn error(&self, reason: &'static str) -> HideError {
        HideError::invalid_selector(self.source, reason)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) {
        self.pos += 1;
    }

    fn skip_ws(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
        self.pos > start
    }

    fn expect(&mut self, c: char, reason: &'static str) -> HideResult<()> {
        if self.peek() == Some(c) {
            self.bump();
            Ok(())
        } else {
            Err(self.error(reason))
        }
    }

    fn ident(&mut self) -> HideResult<CompactString> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || c == '-' || c == '_' || !c.is_ascii())
        {
            self.bump();
        }
        if self.pos == start {
            return Err(self.error("expected identifier"));
        }
        Ok(self.chars[start..self.pos].iter().copied().collect())
    }

    fn complex(&mut self) -> HideResult<Complex> {
        let mut parts = vec![(Combinator::Descendant, self.compound()?)];
        loop {
            let had_ws = self.skip_ws();
            match self.peek() {
                None | Some(',') => break,
                Some('>') => {
                    self.bump();
                    self.skip_ws();
                    parts.push((Combinator::Child, self.compound()?));
                }
                Some(_) if had_ws => parts.push((Combinator::Descendant, self.compound()?)),
                Some(_) => return Err(self.error("unexpected character")),
            }
        }
        Ok(Complex { parts })
    }

    fn compound(&mut self) -> HideResult<Compound> {
        let mut compound = Compound::default();
        let mut any = false;

        match self.peek() {
            Some('*') => {
                self.bump();
                any = true;
            }
            Some(c) if c.is_alphabetic() => {
                compound.tag = Some(self.ident()?.to_ascii_lowercase().into());
                any = true;
            }
            _ => {}
        }

        loop {
            match self.peek() {
                Some('#') => {
                    self.bump();
                    compound.ids.push(self.ident()?);
                }
                Some('.') => {
                    self.bump();
                    compound.classes.push(self.ident()?);
                }
                Some('[') => {
                    self.bump();
                    compound.attrs.push(self.attribute()?);
                }
                _ => break,
            }
            any = true;
        }

        if any {
            Ok(compound)
        } else {
            Err(self.error("expected selector"))
        }
    }

    fn attribute(&mut self) -> HideResult<AttrSelector> {
        self.skip_ws();
        let name = self.ident()?;
        self.skip_ws();

        let op = match self.peek() {
            Some(']') => {
                self.bump();
                return Ok(AttrSelector {
                    name,
                    op: AttrOp::Exists,
                    value: CompactString::default(),
                });
            }
            Some('=') => AttrOp::Equals,
            Some(c) => {
                let op = match c {
                    '~' => AttrOp::Includes,
                    '^' => AttrOp::Prefix,
                    '$' => AttrOp::Suffix,
                    '*' => AttrOp::Substring,
                    _ => return Err(self.error("unknown attribute operator")),
                };
                self.bump();
                op
            }
            None => return Err(self.error("unterminated attribute selector")),
        };
        self.expect('=', "expected '='")?;
        self.skip_ws();

        let value = match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.bump();
                let start = self.pos;
                while self.peek().is_some_and(|c| c != quote) {
                    self.bump();
                }
                let value: CompactString = self.chars[start..self.pos].iter().copied().collect();
                self.expect(quote, "unterminated string")?;
                value
            }
            _ => self.ident()?,
        };
        self.skip_ws();
        self.expect(']', "unterminated attribute selector")?;

        Ok(AttrSelector { name, op, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build() -> (Document, NodeId, NodeId, NodeId) {
        // <div id="main" class="feed wide"><section class="ad"><img src="x.png" alt="banner ad"></section></div>
        let mut doc = Document::new();
        let div = doc.create_element("div");
        let section = doc.create_element("section");
        let img = doc.create_element("img");
        doc.append_child(doc.root(), div).unwrap();
        doc.append_child(div, section).unwrap();
        doc.append_child(section, img).unwrap();
        doc.set_attr(div, "id", "main").unwrap();
        doc.set_attr(div, "class", "feed wide").unwrap();
        doc.set_attr(section, "class", "ad").unwrap();
        doc.set_attr(img, "src", "x.png").unwrap();
        doc.set_attr(img, "alt", "banner ad").unwrap();
        (doc, div, section, img)
    }

    fn matches(doc: &Document, node: NodeId, selector: &str) -> bool {
        SelectorList::parse(selector).unwrap().matches(doc, node)
    }

    #[test]
    fn test_simple_selectors() {
        let (doc, div, section, img) = build();
        assert!(matches(&doc, img, "img"));
        assert!(matches(&doc, img, "IMG"));
        assert!(matches(&doc, img, "*"));
        assert!(matches(&doc, div, "#main"));
        assert!(matches(&doc, div, "div.feed.wide"));
        assert!(!matches(&doc, div, ".feed.narrow"));
        assert!(matches(&doc, section, ".ad"));
        assert!(!matches(&doc, section, "div"));
    }

    #[test]
    fn test_attribute_selectors() {
        let (doc, _, _, img) = build();
        assert!(matches(&doc, img, "[src]"));
        assert!(matches(&doc, img, "[src=\"x.png\"]"));
        assert!(matches(&doc, img, "[src='x.png']"));
        assert!(matches(&doc, img, "[ alt ~= ad ]"));
        assert!(matches(&doc, img, "[src^=x]"));
        assert!(matches(&doc, img, "[src$='.png']"));
        assert!(matches(&doc, img, "[alt*=ner]"));
        assert!(!matches(&doc, img, "[alt=banner]"));
        assert!(!matches(&doc, img, "[title]"));
    }

    #[test]
    fn test_combinators() {
        let (doc, _, _, img) = build();
        assert!(matches(&doc, img, "div img"));
        assert!(matches(&doc, img, "#main .ad > img"));
        assert!(matches(&doc, img, "section>img"));
        assert!(!matches(&doc, img, "div > img"));
        assert!(matches(&doc, img, "p, div > section > img"));
    }

    #[test]
    fn test_shadow_boundary() {
        let (mut doc, div, _, _) = build();
        let shadow = doc.attach_shadow(div).unwrap();
        let inner = doc.create_element("img");
        doc.append_child(shadow, inner).unwrap();
        assert!(matches(&doc, inner, "img"));
        assert!(!matches(&doc, inner, "div img"));
    }

    #[test]
    fn test_query_all() {
        let (doc, _, _, img) = build();
        let list = SelectorList::parse("img, .nothing").unwrap();
        assert_eq!(doc.query_all(&list), vec![img]);
        assert_eq!(list.to_string(), "img, .nothing");
    }

    #[test]
    fn test_parse_errors() {
        for bad in ["", "div[", "div[x", "[x=]", "[x|=y]", "a >", "a,", "#", "div!"] {
            assert!(SelectorList::parse(bad).is_err(), "{bad:?} should not parse");
        }
    }
}
