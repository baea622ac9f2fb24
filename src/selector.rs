//! The selector subset components and fixtures need: type, `#id`, `.class`,
//! `[attr]`, `[attr=value]`, `:not(...)`, the descendant and `>` combinators,
//! and comma groups.

use crate::dom::{Dom, ElementData, NodeId};
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
enum AttrTest {
    Present(String),
    Equals(String, String),
}

/// Everything one element has to satisfy on its own.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrTest>,
    negations: Vec<SelectorList>,
}

impl Compound {
    fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    fn matches(&self, dom: &Dom, node: NodeId, element: &ElementData) -> bool {
        self.tag.as_deref().is_none_or(|tag| element.tag == tag)
            && self.id.as_deref().is_none_or(|id| element.attr("id") == Some(id))
            && self.classes.iter().all(|class| element.has_class(class))
            && self.attrs.iter().all(|test| match test {
                AttrTest::Present(name) => element.attr(name).is_some(),
                AttrTest::Equals(name, value) => element.attr(name) == Some(value.as_str()),
            })
            && self.negations.iter().all(|list| !list.matches(dom, node))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

/// One comma-separated alternative, stored right to left: `subject` is the
/// element being tested, `context[0]` its nearest required relative.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Complex {
    subject: Compound,
    context: Vec<(Combinator, Compound)>,
}

impl Complex {
    fn matches(&self, dom: &Dom, node: NodeId) -> bool {
        compound_matches(dom, node, &self.subject) && context_matches(dom, node, &self.context)
    }
}

fn compound_matches(dom: &Dom, node: NodeId, compound: &Compound) -> bool {
    dom.element(node)
        .is_some_and(|element| compound.matches(dom, node, element))
}

/// Tries every ancestor that fits the next step before giving up on it, so
/// `.page > section p` finds the outer section even when an inner one also
/// matches `section`.
fn context_matches(dom: &Dom, node: NodeId, context: &[(Combinator, Compound)]) -> bool {
    let Some(((combinator, compound), rest)) = context.split_first() else {
        return true;
    };
    let fits = |candidate: NodeId| {
        compound_matches(dom, candidate, compound) && context_matches(dom, candidate, rest)
    };
    match combinator {
        Combinator::Child => dom.parent(node).is_some_and(fits),
        Combinator::Descendant => dom.ancestors(node).any(fits),
    }
}

/// A parsed, comma-separated selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SelectorList(Vec<Complex>);

impl SelectorList {
    pub(crate) fn parse(selector: &str) -> Result<Self> {
        let mut parser = Parser {
            source: selector,
            rest: selector,
        };
        let list = parser.list()?;
        if !parser.rest.is_empty() {
            return Err(parser.unsupported());
        }
        Ok(list)
    }

    pub(crate) fn matches(&self, dom: &Dom, node: NodeId) -> bool {
        self.0.iter().any(|complex| complex.matches(dom, node))
    }
}

struct Parser<'a> {
    source: &'a str,
    rest: &'a str,
}

impl Parser<'_> {
    fn unsupported(&self) -> Error {
        Error::UnsupportedSelector(self.source.to_string())
    }

    fn peek(&self) -> Option<char> {
        self.rest.chars().next()
    }

    fn bump(&mut self) {
        if let Some(ch) = self.peek() {
            self.rest = &self.rest[ch.len_utf8()..];
        }
    }

    fn eat(&mut self, expected: char) -> bool {
        let found = self.peek() == Some(expected);
        if found {
            self.bump();
        }
        found
    }

    fn expect(&mut self, expected: char) -> Result<()> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.unsupported())
        }
    }

    /// Returns whether any whitespace was skipped.
    fn skip_whitespace(&mut self) -> bool {
        let trimmed = self.rest.trim_start();
        let skipped = trimmed.len() != self.rest.len();
        self.rest = trimmed;
        skipped
    }

    fn ident(&mut self) -> Result<String> {
        let end = self
            .rest
            .find(|ch: char| !(ch.is_ascii_alphanumeric() || ch == '-' || ch == '_'))
            .unwrap_or(self.rest.len());
        if end == 0 {
            return Err(self.unsupported());
        }
        let (ident, rest) = self.rest.split_at(end);
        self.rest = rest;
        Ok(ident.to_string())
    }

    /// Comma groups up to the end of input or an unmatched `)`.
    fn list(&mut self) -> Result<SelectorList> {
        let mut alternatives = Vec::new();
        loop {
            self.skip_whitespace();
            alternatives.push(self.complex()?);
            self.skip_whitespace();
            if !self.eat(',') {
                return Ok(SelectorList(alternatives));
            }
        }
    }

    fn complex(&mut self) -> Result<Complex> {
        let mut compounds = vec![self.compound()?];
        let mut combinators = Vec::new();
        loop {
            let spaced = self.skip_whitespace();
            let combinator = match self.peek() {
                Some('>') => {
                    self.bump();
                    self.skip_whitespace();
                    Combinator::Child
                }
                Some(ch) if spaced && ch != ',' && ch != ')' => Combinator::Descendant,
                _ => break,
            };
            combinators.push(combinator);
            compounds.push(self.compound()?);
        }

        let subject = compounds.pop().ok_or_else(|| self.unsupported())?;
        let context = combinators
            .into_iter()
            .rev()
            .zip(compounds.into_iter().rev())
            .collect();
        Ok(Complex { subject, context })
    }

    fn compound(&mut self) -> Result<Compound> {
        let mut compound = Compound::default();
        while let Some(ch) = self.peek() {
            match ch {
                '#' => {
                    self.bump();
                    let id = self.ident()?;
                    if compound.id.replace(id).is_some() {
                        return Err(self.unsupported());
                    }
                }
                '.' => {
                    self.bump();
                    compound.classes.push(self.ident()?);
                }
                '[' => {
                    self.bump();
                    compound.attrs.push(self.attr_test()?);
                }
                ':' => {
                    self.bump();
                    if self.ident()? != "not" {
                        return Err(self.unsupported());
                    }
                    self.expect('(')?;
                    compound.negations.push(self.list()?);
                    self.expect(')')?;
                }
                _ if compound.is_empty() && (ch.is_ascii_alphanumeric() || ch == '_') => {
                    compound.tag = Some(self.ident()?.to_ascii_lowercase());
                }
                _ => break,
            }
        }
        if compound.is_empty() {
            return Err(self.unsupported());
        }
        Ok(compound)
    }

    /// The part after `[`, through the closing `]`.
    fn attr_test(&mut self) -> Result<AttrTest> {
        self.skip_whitespace();
        let name = self.ident()?.to_ascii_lowercase();
        self.skip_whitespace();
        if self.eat(']') {
            return Ok(AttrTest::Present(name));
        }
        self.expect('=')?;
        self.skip_whitespace();
        let value = match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.bump();
                let end = self.rest.find(quote).ok_or_else(|| self.unsupported())?;
                let value = self.rest[..end].to_string();
                self.rest = &self.rest[end + quote.len_utf8()..];
                value
            }
            _ => self.ident()?,
        };
        self.skip_whitespace();
        self.expect(']')?;
        Ok(AttrTest::Equals(name, value))
    }
}
