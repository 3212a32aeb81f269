//! The inferred-type representation.
//!
//! A [`Union`] is a flat, ordered set of [`Atomic`] parts. Equality of parts
//! is structural, but most of the analyzer compares types by their rendered
//! form, so `Display` is part of the contract: two unions that render the
//! same string are the same type.

use std::fmt;

use rustc_hash::FxHashSet;
use smallvec::{smallvec, SmallVec};

/// One indivisible part of a union.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Atomic {
    Int,
    Float,
    String,
    Bool,
    /// The literal `false`, kept distinct from `bool` so falsy narrowing can
    /// remove it.
    False,
    Null,
    Void,
    Mixed,
    /// `object` with no known class.
    Object,
    /// The bottom element, only seen as the parameter of a fresh array.
    Empty,
    /// `array` with unknown contents.
    Array,
    /// A class or interface by fully qualified name.
    Named(String),
    /// A parameterized container, in practice always `array<...>`.
    Generic {
        name: String,
        params: Vec<Union>,
        /// Set when the container came from an empty literal or an
        /// auto-vivified dimension, so the first element assignment may
        /// replace the parameters instead of widening them.
        is_empty: bool,
    },
}

impl Atomic {
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Atomic::Int | Atomic::Float | Atomic::String | Atomic::Bool | Atomic::False
        )
    }

    fn parse(part: &str) -> Atomic {
        if let Some(open) = part.find('<') {
            let name = part[..open].trim().to_owned();
            let inner = part[open + 1..].trim_end_matches('>');
            let params = split_generic_params(inner)
                .into_iter()
                .map(Union::parse)
                .collect();
            return Atomic::Generic {
                name,
                params,
                is_empty: false,
            };
        }
        match part {
            "int" | "integer" => Atomic::Int,
            "float" | "double" => Atomic::Float,
            "string" => Atomic::String,
            "bool" | "boolean" | "true" => Atomic::Bool,
            "false" => Atomic::False,
            "null" => Atomic::Null,
            "void" => Atomic::Void,
            "mixed" => Atomic::Mixed,
            "object" => Atomic::Object,
            "array" => Atomic::Array,
            "empty" => Atomic::Empty,
            other => Atomic::Named(other.to_owned()),
        }
    }
}

impl fmt::Display for Atomic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Atomic::Int => f.write_str("int"),
            Atomic::Float => f.write_str("float"),
            Atomic::String => f.write_str("string"),
            Atomic::Bool => f.write_str("bool"),
            Atomic::False => f.write_str("false"),
            Atomic::Null => f.write_str("null"),
            Atomic::Void => f.write_str("void"),
            Atomic::Mixed => f.write_str("mixed"),
            Atomic::Object => f.write_str("object"),
            Atomic::Empty => f.write_str("empty"),
            Atomic::Array => f.write_str("array"),
            Atomic::Named(name) => f.write_str(name),
            Atomic::Generic { name, params, .. } => {
                write!(f, "{name}<")?;
                for (i, param) in params.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{param}")?;
                }
                f.write_str(">")
            }
        }
    }
}

/// A union of atomic parts. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Union {
    pub types: SmallVec<[Atomic; 2]>,
}

impl Union {
    pub fn of(atomic: Atomic) -> Union {
        Union {
            types: smallvec![atomic],
        }
    }

    pub fn mixed() -> Union {
        Union::of(Atomic::Mixed)
    }

    pub fn int() -> Union {
        Union::of(Atomic::Int)
    }

    pub fn float() -> Union {
        Union::of(Atomic::Float)
    }

    pub fn string() -> Union {
        Union::of(Atomic::String)
    }

    pub fn bool() -> Union {
        Union::of(Atomic::Bool)
    }

    pub fn null() -> Union {
        Union::of(Atomic::Null)
    }

    pub fn void() -> Union {
        Union::of(Atomic::Void)
    }

    pub fn array() -> Union {
        Union::of(Atomic::Array)
    }

    pub fn named(name: impl Into<String>) -> Union {
        Union::of(Atomic::Named(name.into()))
    }

    /// The type of `[]` and of a freshly vivified dimension: an array that
    /// may still have its parameters replaced by the first real assignment.
    pub fn empty_array() -> Union {
        Union::of(Atomic::Generic {
            name: "array".to_owned(),
            params: vec![Union::of(Atomic::Empty)],
            is_empty: true,
        })
    }

    /// Parses a `|`-separated type string. Unknown words become class
    /// references; an empty string is `mixed`.
    pub fn parse(text: &str) -> Union {
        let mut types: SmallVec<[Atomic; 2]> = SmallVec::new();
        for part in split_union_parts(text) {
            let part = part.trim().trim_start_matches('\\');
            if part.is_empty() {
                continue;
            }
            types.push(Atomic::parse(part));
        }
        if types.is_empty() {
            return Union::mixed();
        }
        Union { types }
    }

    /// Unions two types. `mixed` absorbs everything; otherwise parts are
    /// merged with duplicates (by rendered form) dropped.
    pub fn combine(&self, other: &Union) -> Union {
        if self.is_mixed() || other.is_mixed() {
            return Union::mixed();
        }
        let mut seen = FxHashSet::default();
        let mut types: SmallVec<[Atomic; 2]> = SmallVec::new();
        for atomic in self.types.iter().chain(other.types.iter()) {
            if seen.insert(atomic.to_string()) {
                types.push(atomic.clone());
            }
        }
        Union { types }
    }

    pub fn is_mixed(&self) -> bool {
        self.types.iter().any(|t| matches!(t, Atomic::Mixed))
    }

    pub fn is_null(&self) -> bool {
        self.types.len() == 1 && matches!(self.types[0], Atomic::Null)
    }

    pub fn is_nullable(&self) -> bool {
        self.types.iter().any(|t| matches!(t, Atomic::Null))
    }

    pub fn is_void(&self) -> bool {
        self.types.len() == 1 && matches!(self.types[0], Atomic::Void)
    }
}

impl fmt::Display for Union {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, atomic) in self.types.iter().enumerate() {
            if i > 0 {
                f.write_str("|")?;
            }
            write!(f, "{atomic}")?;
        }
        Ok(())
    }
}

/// Splits on `|` at angle-bracket depth zero, so `array<int|string>` stays
/// one part.
fn split_union_parts(text: &str) -> Vec<&str> {
    split_at_depth_zero(text, '|')
}

/// Splits generic parameters on top-level commas.
fn split_generic_params(text: &str) -> Vec<&str> {
    split_at_depth_zero(text, ',')
}

fn split_at_depth_zero(text: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (i, c) in text.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            c if c == separator && depth == 0 => {
                parts.push(&text[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}
