//! Field selectors: the query language over decoded [`Metadata`].
//!
//! Clients ask for metadata with path-shaped expressions such as
//! `$..Image.Make`. Only a closed grammar is accepted: every selector is a
//! plain lookup of at most two names, so evaluating one can never do more
//! than read the metadata map:
//!
//! ```text
//! selector  := prefix? path
//! prefix    := "$.." | "$."
//! path      := segment | segment "." segment
//! segment   := [A-Za-z0-9_]{1,64}
//! ```
//!
//! | Expression | Matches |
//! |---|---|
//! | `$..Image.Make`, `$.Image.Make`, `Image.Make` | `Make` in the `Image` namespace |
//! | `$..Make`, `Make` | `Make` in every namespace, in namespace order |
//! | `$..GPSInfo`, `GPSInfo` | the whole `GPSInfo` namespace as an object |
//!
//! Anything else (filters, brackets, wildcards, scripts) is rejected before
//! evaluation.
//!
//! ## Result mapping
//!
//! [`extract`] evaluates a list of expressions and collects the non-empty
//! results under the expression's last dotted segment. Two expressions that
//! share a trailing segment collide: the later one wins.

use crate::metadata::{Metadata, Namespace};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Longest accepted expression, prefix included.
pub const MAX_EXPRESSION_LEN: usize = 160;
/// Longest accepted namespace or field name.
pub const MAX_SEGMENT_LEN: usize = 64;
/// Most expressions accepted in one request.
pub const MAX_SELECTORS: usize = 64;

/// Field names clients commonly send that differ from the EXIF
/// tag names kamadak-exif reports.
const FIELD_ALIASES: &[(&str, &str)] = &[
    ("ImageHeight", "ImageLength"),
    ("ISO", "PhotographicSensitivity"),
    ("ExifTag", "ExifIFDPointer"),
    ("GPSTag", "GPSInfoIFDPointer"),
];

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SelectorError {
    #[error("empty query expression")]
    Empty,
    #[error("query expression exceeds {MAX_EXPRESSION_LEN} bytes")]
    TooLong,
    #[error("invalid query expression '{0}': only Namespace.Field lookups are supported")]
    Syntax(String),
    #[error("unknown namespace '{0}'")]
    UnknownNamespace(String),
    #[error("too many query expressions ({0}, at most {MAX_SELECTORS})")]
    TooMany(usize),
}

/// Field→matches mapping produced by [`extract`].
pub type ExtractedData = BTreeMap<String, Vec<Value>>;

/// What a selector points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// One field inside one namespace.
    Field { namespace: Namespace, field: String },
    /// A field name looked up in every namespace.
    AnyNamespace { field: String },
    /// A whole namespace.
    Namespace(Namespace),
}

/// A parsed, validated selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    key: String,
    target: Target,
}

impl Selector {
    /// Parse one expression. See the [module docs](self) for the grammar.
    pub fn parse(expression: &str) -> Result<Self, SelectorError> {
        if expression.is_empty() {
            return Err(SelectorError::Empty);
        }
        if expression.len() > MAX_EXPRESSION_LEN {
            return Err(SelectorError::TooLong);
        }

        let path = expression
            .strip_prefix("$..")
            .or_else(|| expression.strip_prefix("$."))
            .unwrap_or(expression);

        let segments: Vec<&str> = path.split('.').collect();
        if segments.len() > 2 || !segments.iter().all(|s| is_segment(s)) {
            return Err(SelectorError::Syntax(expression.to_string()));
        }

        let target = match segments.as_slice() {
            [namespace, field] => {
                let namespace = Namespace::from_name(namespace)
                    .ok_or_else(|| SelectorError::UnknownNamespace(namespace.to_string()))?;
                Target::Field {
                    namespace,
                    field: resolve_alias(field).to_string(),
                }
            }
            [name] => match Namespace::from_name(name) {
                Some(namespace) => Target::Namespace(namespace),
                None => Target::AnyNamespace {
                    field: resolve_alias(name).to_string(),
                },
            },
            _ => return Err(SelectorError::Syntax(expression.to_string())),
        };

        let key = segments
            .last()
            .map(|s| s.to_string())
            .ok_or_else(|| SelectorError::Syntax(expression.to_string()))?;

        Ok(Self { key, target })
    }

    /// Result key: the expression's last dotted segment, as written.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    /// All values this selector matches. Empty when nothing matches.
    pub fn evaluate(&self, metadata: &Metadata) -> Vec<Value> {
        match &self.target {
            Target::Field { namespace, field } => {
                metadata.get(*namespace, field).cloned().into_iter().collect()
            }
            Target::AnyNamespace { field } => metadata
                .namespaces()
                .filter_map(|(_, fields)| fields.get(field).cloned())
                .collect(),
            Target::Namespace(namespace) => metadata
                .namespace(*namespace)
                .map(|fields| {
                    Value::Object(
                        fields
                            .iter()
                            .map(|(k, v)| (k.clone(), v.clone()))
                            .collect(),
                    )
                })
                .into_iter()
                .collect(),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            Target::Field { namespace, field } => write!(f, "$..{namespace}.{field}"),
            Target::AnyNamespace { field } => write!(f, "$..{field}"),
            Target::Namespace(namespace) => write!(f, "$..{namespace}"),
        }
    }
}

fn is_segment(s: &str) -> bool {
    !s.is_empty()
        && s.len() <= MAX_SEGMENT_LEN
        && s.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

fn resolve_alias(field: &str) -> &str {
    FIELD_ALIASES
        .iter()
        .find(|(alias, _)| *alias == field)
        .map(|(_, tag)| *tag)
        .unwrap_or(field)
}

/// Parse every expression, failing on the first invalid one.
pub fn parse_all<S: AsRef<str>>(expressions: &[S]) -> Result<Vec<Selector>, SelectorError> {
    if expressions.len() > MAX_SELECTORS {
        return Err(SelectorError::TooMany(expressions.len()));
    }
    expressions
        .iter()
        .map(|e| Selector::parse(e.as_ref()))
        .collect()
}

/// Evaluate selectors against metadata and build the result mapping.
///
/// Empty results are left out; a later selector with the same key replaces
/// an earlier one.
pub fn extract(metadata: &Metadata, selectors: &[Selector]) -> ExtractedData {
    let mut extracted = ExtractedData::new();
    for selector in selectors {
        let matches = selector.evaluate(metadata);
        if !matches.is_empty() {
            extracted.insert(selector.key().to_string(), matches);
        }
    }
    extracted
}
