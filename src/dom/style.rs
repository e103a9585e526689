//! Inline `style` attribute parsing and serialization.

use std::fmt;

use compact_str::CompactString;
use cssparser::{
    AtRuleParser, BasicParseErrorKind, CowRcStr, DeclarationParser, ParseError, Parser,
    ParserInput, ParserState, QualifiedRuleParser, RuleBodyItemParser, RuleBodyParser,
};

/// One `name: value [!important]` declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub name: CompactString,
    pub value: CompactString,
    pub important: bool,
}

/// Declarations of an element's `style` attribute, in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InlineStyle {
    declarations: Vec<Declaration>,
}

/// Split a trailing `! important` off a raw value.
fn split_important(raw: &str) -> (&str, bool) {
    let value = raw.trim();
    match value.rfind('!') {
        Some(pos) if value[pos + 1..].trim().eq_ignore_ascii_case("important") => {
            (value[..pos].trim_end(), true)
        }
        _ => (value, false),
    }
}

/// Declaration list parser for `style` attributes; nested rules are rejected.
struct StyleAttrParser;

impl<'i> DeclarationParser<'i> for StyleAttrParser {
    type Declaration = Declaration;
    type Error = ();

    fn parse_value<'t>(
        &mut self,
        name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
        _decl_start: &ParserState,
    ) -> Result<Self::Declaration, ParseError<'i, Self::Error>> {
        let start = input.position();
        // Blocks, functions and strings come back as single tokens, so a `;`
        // inside `url(...)` or quotes never ends the declaration.
        while input.next_including_whitespace_and_comments().is_ok() {}
        let (value, important) = split_important(input.slice_from(start));
        Ok(Declaration {
            name: name.to_ascii_lowercase().into(),
            value: value.into(),
            important,
        })
    }
}

impl<'i> AtRuleParser<'i> for StyleAttrParser {
    type Prelude = ();
    type AtRule = Declaration;
    type Error = ();
}

impl<'i> QualifiedRuleParser<'i> for StyleAttrParser {
    type Prelude = ();
    type QualifiedRule = Declaration;
    type Error = ();

    fn parse_prelude<'t>(
        &mut self,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Prelude, ParseError<'i, Self::Error>> {
        Err(input.new_error(BasicParseErrorKind::QualifiedRuleInvalid))
    }
}

impl RuleBodyItemParser<'_, Declaration, ()> for StyleAttrParser {
    fn parse_declarations(&self) -> bool {
        true
    }

    fn parse_qualified(&self) -> bool {
        false
    }
}

impl InlineStyle {
    /// Parse a `style` attribute. Malformed declarations are dropped.
    pub fn parse(text: &str) -> Self {
        let mut input = ParserInput::new(text);
        let mut parser = Parser::new(&mut input);
        let mut items = StyleAttrParser;
        let declarations = RuleBodyParser::new(&mut parser, &mut items)
            .flatten()
            .filter(|d| !d.value.is_empty())
            .collect();
        Self { declarations }
    }

    pub fn get(&self, name: &str) -> Option<&Declaration> {
        self.declarations.iter().rev().find(|d| d.name == name)
    }

    /// Set a property, replacing every earlier declaration of it.
    pub fn set(&mut self, name: &str, value: &str, important: bool) {
        self.declarations.retain(|d| d.name != name);
        self.declarations.push(Declaration {
            name: name.into(),
            value: value.into(),
            important,
        });
    }

    /// `display: none !important` is in effect.
    pub fn is_hidden(&self) -> bool {
        self.get("display")
            .is_some_and(|d| d.important && d.value.eq_ignore_ascii_case("none"))
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }
}

impl fmt::Display for InlineStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, d) in self.declarations.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}: {}", d.name, d.value)?;
            if d.important {
                f.write_str(" !important")?;
            }
            f.write_str(";")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_serialize() {
        let style = InlineStyle::parse("color: red; DISPLAY : block ! important;; junk");
        assert_eq!(style.get("color").unwrap().value, "red");
        let display = style.get("display").unwrap();
        assert_eq!(display.value, "block");
        assert!(display.important);
        assert_eq!(style.to_string(), "color: red; display: block !important;");
    }

    #[test]
    fn test_set_replaces() {
        let mut style = InlineStyle::parse("display: block; display: flex");
        assert!(!style.is_hidden());
        style.set("display", "none", true);
        assert!(style.is_hidden());
        assert_eq!(style.to_string(), "display: none !important;");
    }

    #[test]
    fn test_semicolons_inside_values() {
        let mut style = InlineStyle::parse(
            "background: url(data:image/png;base64,AAAA); content: \"a;b\"; color: red",
        );
        assert_eq!(style.get("background").unwrap().value, "url(data:image/png;base64,AAAA)");
        assert_eq!(style.get("content").unwrap().value, "\"a;b\"");
        assert_eq!(style.get("color").unwrap().value, "red");

        style.set("display", "none", true);
        assert_eq!(
            style.to_string(),
            "background: url(data:image/png;base64,AAAA); content: \"a;b\"; color: red; display: none !important;"
        );
    }

    #[test]
    fn test_not_important_is_not_hidden() {
        assert!(!InlineStyle::parse("display: none").is_hidden());
        assert!(InlineStyle::parse("display:none!important").is_hidden());
        assert!(InlineStyle::parse("").is_empty());
    }
}
