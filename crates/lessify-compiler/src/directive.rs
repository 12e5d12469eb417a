//! First-line directive parsing.
//!
//! A Less file may start with a line comment carrying compile options:
//!
//! ```text
//! // out: build/app, sourceMap: true, autoprefixer: last 2 versions
//! ```
//!
//! Only the first line is considered. A first line that is not such a comment
//! yields an empty set of directives; parsing never fails.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Serialize, Serializer};

/// `//`, at least one whitespace character, then the option list.
static DIRECTIVE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*//\s+(.+)").expect("directive pattern is valid")
});

/// A directive value after literal coercion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectiveValue {
    Bool(bool),
    Null,
    Undefined,
    Int(u64),
    Str(String),
}

impl DirectiveValue {
    /// Coerces the closed literal set `true | false | undefined | null | [0-9]+`
    /// into typed values; everything else stays a string.
    pub fn from_literal(text: &str) -> Self {
        match text {
            "true" => Self::Bool(true),
            "false" => Self::Bool(false),
            "null" => Self::Null,
            "undefined" => Self::Undefined,
            digits if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) => {
                digits
                    .parse()
                    .map(Self::Int)
                    .unwrap_or_else(|_| Self::Str(digits.to_string()))
            }
            other => Self::Str(other.to_string()),
        }
    }

    /// JavaScript truthiness: `false`, `null`, `undefined`, `0` and `""` are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Null | Self::Undefined => false,
            Self::Int(n) => *n != 0,
            Self::Str(s) => !s.is_empty(),
        }
    }

    /// Explicit `null` or `false`, as opposed to merely falsy.
    pub fn is_null_or_false(&self) -> bool {
        matches!(self, Self::Null | Self::Bool(false))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for DirectiveValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Null => f.write_str("null"),
            Self::Undefined => f.write_str("undefined"),
            Self::Int(n) => write!(f, "{}", n),
            Self::Str(s) => f.write_str(s),
        }
    }
}

impl Serialize for DirectiveValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Null | Self::Undefined => serializer.serialize_none(),
            Self::Int(n) => serializer.serialize_u64(*n),
            Self::Str(s) => serializer.serialize_str(s),
        }
    }
}

/// Option name to value, as found in a directive line.
///
/// Keys are matched case-sensitively. Unknown keys are kept so they can be
/// handed to the compilation service untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Directives {
    entries: BTreeMap<String, DirectiveValue>,
}

impl Directives {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&DirectiveValue> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: DirectiveValue) -> Option<DirectiveValue> {
        self.entries.insert(key.into(), value)
    }

    pub fn remove(&mut self, key: &str) -> Option<DirectiveValue> {
        self.entries.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Whether `key` is present with a truthy value.
    pub fn is_truthy(&self, key: &str) -> bool {
        self.get(key).is_some_and(DirectiveValue::is_truthy)
    }

    /// The value of `key` if present and truthy.
    pub fn truthy(&self, key: &str) -> Option<&DirectiveValue> {
        self.get(key).filter(|v| v.is_truthy())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DirectiveValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, DirectiveValue)> for Directives {
    fn from_iter<I: IntoIterator<Item = (K, DirectiveValue)>>(iter: I) -> Self {
        let mut directives = Directives::new();
        for (key, value) in iter {
            directives.insert(key, value);
        }
        directives
    }
}

/// Extracts the directives from the first line of `content`.
pub fn parse_directives(content: &str) -> Directives {
    let first_line = content.split('\n').next().unwrap_or_default();

    let mut directives = Directives::new();
    let Some(captures) = DIRECTIVE_LINE.captures(first_line) else {
        return directives;
    };

    for item in captures[1].split(',') {
        // Items without a colon carry no value
        let Some((key, value)) = item.split_once(':') else {
            continue;
        };
        directives.insert(key.trim(), DirectiveValue::from_literal(value.trim()));
    }

    directives
}
