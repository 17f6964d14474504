//! # Raw header model
//!
//! FITS-like flat keyword/value metadata as read from a raw file.
//!
//! A [`RawHeader`] keeps its cards in insertion order and looks keywords up
//! case-insensitively (keywords are stored upper-cased). Multi-extension files are
//! reduced to one effective header with [`effective_header`] before translation.
//!
//! ## See also
//! ------------
//! * [`cards`] – Parser for `KEY = value / comment` card text.
//! * [`sections`] – Parser for IRAF `[x1:x2,y1:y2]` section strings.
pub mod cards;
pub mod sections;

use std::fmt;

use ahash::AHashMap;

/// A scalar or array header value.
#[derive(Debug, Clone, PartialEq)]
pub enum HeaderValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Array(Vec<HeaderValue>),
    /// Keyword present without a value.
    Undefined,
}

impl HeaderValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            HeaderValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric view of the value. Numeric strings are accepted since some
    /// instruments write numbers as FITS strings.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            HeaderValue::Float(f) => Some(*f),
            HeaderValue::Int(i) => Some(*i as f64),
            HeaderValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            HeaderValue::Int(i) => Some(*i),
            HeaderValue::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            HeaderValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            HeaderValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// `true` when the value carries information (not undefined, not an empty string).
    pub fn is_defined(&self) -> bool {
        match self {
            HeaderValue::Undefined => false,
            HeaderValue::String(s) => !s.trim().is_empty(),
            HeaderValue::Float(f) => !f.is_nan(),
            _ => true,
        }
    }
}

impl fmt::Display for HeaderValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderValue::String(s) => write!(f, "{s}"),
            HeaderValue::Int(i) => write!(f, "{i}"),
            HeaderValue::Float(v) => write!(f, "{v}"),
            HeaderValue::Bool(b) => write!(f, "{}", if *b { "T" } else { "F" }),
            HeaderValue::Array(values) => {
                write!(f, "[")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
            HeaderValue::Undefined => Ok(()),
        }
    }
}

impl From<&str> for HeaderValue {
    fn from(s: &str) -> Self {
        HeaderValue::String(s.to_string())
    }
}

impl From<String> for HeaderValue {
    fn from(s: String) -> Self {
        HeaderValue::String(s)
    }
}

impl From<i64> for HeaderValue {
    fn from(i: i64) -> Self {
        HeaderValue::Int(i)
    }
}

impl From<i32> for HeaderValue {
    fn from(i: i32) -> Self {
        HeaderValue::Int(i as i64)
    }
}

impl From<f64> for HeaderValue {
    fn from(v: f64) -> Self {
        HeaderValue::Float(v)
    }
}

impl From<bool> for HeaderValue {
    fn from(b: bool) -> Self {
        HeaderValue::Bool(b)
    }
}

/// Ordered, case-insensitive keyword → value mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawHeader {
    cards: Vec<(String, HeaderValue)>,
    index: AHashMap<String, usize>,
}

impl RawHeader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a keyword. A replaced keyword keeps its original position.
    pub fn insert(&mut self, key: &str, value: impl Into<HeaderValue>) {
        let key = key.trim().to_uppercase();
        let value = value.into();
        match self.index.get(&key) {
            Some(&pos) => self.cards[pos].1 = value,
            None => {
                self.index.insert(key.clone(), self.cards.len());
                self.cards.push((key, value));
            }
        }
    }

    /// Builder-style [`insert`](RawHeader::insert).
    pub fn with(mut self, key: &str, value: impl Into<HeaderValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&HeaderValue> {
        self.index
            .get(&key.trim().to_uppercase())
            .map(|&pos| &self.cards[pos].1)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(&key.trim().to_uppercase())
    }

    /// `true` if the keyword exists and holds a defined value.
    pub fn is_key_ok(&self, key: &str) -> bool {
        self.get(key).is_some_and(HeaderValue::is_defined)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(HeaderValue::as_str)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(HeaderValue::as_f64)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(HeaderValue::as_i64)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(HeaderValue::as_bool)
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Cards in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &HeaderValue)> {
        self.cards.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: AsRef<str>, V: Into<HeaderValue>> FromIterator<(K, V)> for RawHeader {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut header = RawHeader::new();
        for (k, v) in iter {
            header.insert(k.as_ref(), v);
        }
        header
    }
}

/// Merge two headers with overwrite semantics: every card of `extension` replaces
/// or extends the cards of `primary`.
pub fn merge_headers(primary: &RawHeader, extension: &RawHeader) -> RawHeader {
    let mut merged = primary.clone();
    for (key, value) in extension.iter() {
        merged.insert(key, value.clone());
    }
    merged
}

/// Reduce a primary header and an extension header to the header used for translation.
///
/// `INHERIT = F` in the extension (or the primary when the extension does not say)
/// disables inheritance and the extension is used alone. In every other case the
/// headers are merged with [`merge_headers`], extension values taking precedence.
pub fn effective_header(primary: &RawHeader, extension: &RawHeader) -> RawHeader {
    let inherit = extension
        .get_bool("INHERIT")
        .or_else(|| primary.get_bool("INHERIT"))
        .unwrap_or(true);

    if inherit {
        merge_headers(primary, extension)
    } else {
        extension.clone()
    }
}
