//! The chunk mini-language.
//!
//! A chunk is a space-separated record of tokens, each either a bare value
//! or a `slot:value` pair. Values may be:
//!
//! - a literal token (`park`)
//! - a negated literal (`!park`)
//! - the unbound wildcard `?`, optionally with exclusions (`?!park!bank`)
//! - a bound-variable reference `?name`, optionally with exclusions
//!   (`?place!park`); unresolved references degrade to the wildcard
//!
//! Every accepted input shape is normalized into [`Chunk`] at the boundary
//! before any algebra runs.

use crate::error::{MemoryError, MemoryResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Caller-supplied map resolving `?name` references to literal values.
pub type Bindings = HashMap<String, String>;

/// The value part of a chunk element.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueExpr {
    /// A plain token.
    Literal(String),
    /// A `!`-prefixed token: bound with the negated vector on write, and
    /// contributing negated evidence to queries.
    Negated(String),
    /// The unbound wildcard, with any `!`-listed matching exclusions.
    Placeholder { exclude: Vec<String> },
    /// A `?name` reference, resolved against [`Bindings`] before encoding.
    Variable { name: String, exclude: Vec<String> },
}

impl ValueExpr {
    /// The un-negated token name, when this expression names one.
    pub fn token(&self) -> Option<&str> {
        match self {
            ValueExpr::Literal(t) | ValueExpr::Negated(t) => Some(t),
            _ => None,
        }
    }

    /// True for the wildcard (after resolution).
    pub fn is_placeholder(&self) -> bool {
        matches!(self, ValueExpr::Placeholder { .. })
    }
}

/// One `slot:value` pair or bare value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    pub slot: Option<String>,
    pub value: ValueExpr,
}

/// A parsed record: the unit of both storage and query.
///
/// Invariant: either every element carries a slot or none does.
///
/// # Examples
///
/// ```
/// use holomem::Chunk;
///
/// let chunk: Chunk = "do:count from:3 to:?".parse().unwrap();
/// assert!(chunk.is_slotted());
/// assert_eq!(chunk.placeholder_count(), 1);
/// assert_eq!(chunk.to_string(), "do:count from:3 to:?");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    elements: Vec<Element>,
}

impl Chunk {
    /// Parse a chunk from its textual form.
    pub fn parse(text: &str) -> MemoryResult<Chunk> {
        let mut elements = Vec::new();
        for token in text.split_whitespace() {
            elements.push(parse_token(token)?);
        }
        if elements.is_empty() {
            return Err(MemoryError::EmptyChunk);
        }
        let slotted = elements[0].slot.is_some();
        if elements.iter().any(|e| e.slot.is_some() != slotted) {
            return Err(MemoryError::MixedFormat);
        }
        Ok(Chunk { elements })
    }

    /// The record's elements in order.
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// Record length.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// True for the (unrepresentable) empty record.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Whether the record uses slot:value pairs.
    pub fn is_slotted(&self) -> bool {
        self.elements[0].slot.is_some()
    }

    /// Number of wildcard positions.
    pub fn placeholder_count(&self) -> usize {
        self.elements
            .iter()
            .filter(|e| e.value.is_placeholder())
            .count()
    }

    /// Position of the first wildcard, if any.
    pub fn placeholder_position(&self) -> Option<usize> {
        self.elements.iter().position(|e| e.value.is_placeholder())
    }

    /// Resolve every `?name` reference against `bindings`.
    ///
    /// Bound names become literals; unresolved names degrade to the
    /// wildcard, keeping their exclusions.
    pub fn resolve(&self, bindings: &Bindings) -> Chunk {
        let elements = self
            .elements
            .iter()
            .map(|e| {
                let value = match &e.value {
                    ValueExpr::Variable { name, exclude } => match bindings.get(name) {
                        Some(v) => ValueExpr::Literal(v.clone()),
                        None => ValueExpr::Placeholder {
                            exclude: exclude.clone(),
                        },
                    },
                    other => other.clone(),
                };
                Element {
                    slot: e.slot.clone(),
                    value,
                }
            })
            .collect();
        Chunk { elements }
    }

    /// Replace the wildcard with a literal value (the retrieved token).
    pub fn substitute_placeholder(&self, value: &str) -> Chunk {
        let elements = self
            .elements
            .iter()
            .map(|e| {
                let v = match &e.value {
                    ValueExpr::Placeholder { .. } => ValueExpr::Literal(value.to_string()),
                    other => other.clone(),
                };
                Element {
                    slot: e.slot.clone(),
                    value: v,
                }
            })
            .collect();
        Chunk { elements }
    }
}

impl FromStr for Chunk {
    type Err = MemoryError;

    fn from_str(s: &str) -> MemoryResult<Chunk> {
        Chunk::parse(s)
    }
}

impl fmt::Display for ValueExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueExpr::Literal(t) => write!(f, "{t}"),
            ValueExpr::Negated(t) => write!(f, "!{t}"),
            ValueExpr::Placeholder { exclude } => {
                write!(f, "?")?;
                for e in exclude {
                    write!(f, "!{e}")?;
                }
                Ok(())
            }
            ValueExpr::Variable { name, exclude } => {
                write!(f, "?{name}")?;
                for e in exclude {
                    write!(f, "!{e}")?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.slot {
            Some(slot) => write!(f, "{slot}:{}", self.value),
            None => write!(f, "{}", self.value),
        }
    }
}

impl fmt::Display for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.elements.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{e}")?;
        }
        Ok(())
    }
}

/// Input shapes accepted by the store entry points.
///
/// Both a chunk's textual form and an already-parsed [`Chunk`] normalize to
/// the same canonical representation.
pub enum ChunkInput<'a> {
    Text(&'a str),
    Parsed(Chunk),
}

impl<'a> From<&'a str> for ChunkInput<'a> {
    fn from(text: &'a str) -> Self {
        ChunkInput::Text(text)
    }
}

impl From<Chunk> for ChunkInput<'_> {
    fn from(chunk: Chunk) -> Self {
        ChunkInput::Parsed(chunk)
    }
}

impl<'a> From<&'a Chunk> for ChunkInput<'a> {
    fn from(chunk: &'a Chunk) -> Self {
        ChunkInput::Parsed(chunk.clone())
    }
}

impl ChunkInput<'_> {
    /// Normalize to a canonical, binding-resolved [`Chunk`].
    pub fn normalize(self, bindings: &Bindings) -> MemoryResult<Chunk> {
        let chunk = match self {
            ChunkInput::Text(text) => Chunk::parse(text)?,
            ChunkInput::Parsed(chunk) => chunk,
        };
        Ok(chunk.resolve(bindings))
    }
}

fn parse_token(token: &str) -> MemoryResult<Element> {
    let bad = || MemoryError::BadToken(token.to_string());

    let (slot, rest) = match token.split_once(':') {
        Some((slot, rest)) => {
            if slot.is_empty() || slot.contains(':') || rest.contains(':') {
                return Err(bad());
            }
            (Some(slot.to_string()), rest)
        }
        None => (None, token),
    };

    if rest.is_empty() {
        return Err(bad());
    }

    let value = if let Some(negated) = rest.strip_prefix('!') {
        if negated.is_empty() || negated.starts_with('!') || negated.starts_with('?') {
            return Err(bad());
        }
        ValueExpr::Negated(negated.to_string())
    } else if let Some(rest) = rest.strip_prefix('?') {
        let mut parts = rest.split('!');
        let name = parts.next().unwrap_or("");
        let mut exclude = Vec::new();
        for part in parts {
            if part.is_empty() {
                return Err(bad());
            }
            exclude.push(part.to_string());
        }
        if name.is_empty() {
            ValueExpr::Placeholder { exclude }
        } else {
            ValueExpr::Variable {
                name: name.to_string(),
                exclude,
            }
        }
    } else {
        ValueExpr::Literal(rest.to_string())
    };

    Ok(Element { slot, value })
}
