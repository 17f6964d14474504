//! # Fallback resolution
//!
//! Pure helpers used by the header normalizer when a field may come from several
//! keywords. Candidates are tried in order; the first one present with a usable
//! value wins. Nothing here fails: an unresolved field is reported as
//! [`Resolution::Missing`] (or replaced by the caller's default) and the caller
//! decides whether that is fatal.
//!
//! Taking any path other than the first candidate is recorded once per call in the
//! supplied [`Diagnostics`].
use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    diagnostics::{DiagnosticKind, Diagnostics},
    header::{HeaderValue, RawHeader},
};

/// File name extensions removed before looking for a trailing number.
const FILE_EXTENSIONS: [&str; 3] = ["fits", "gz", "fz"];

static TRAILING_DIGITS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)$").expect("trailing digits regex"));

/// Outcome of trying a list of candidate keywords.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution<T> {
    /// The first candidate provided the value.
    Primary(T),
    /// A later candidate provided the value.
    Fallback { key: &'static str, value: T },
    /// No candidate provided a usable value.
    Missing,
}

impl<T> Resolution<T> {
    pub fn value(self) -> Option<T> {
        match self {
            Resolution::Primary(v) | Resolution::Fallback { value: v, .. } => Some(v),
            Resolution::Missing => None,
        }
    }
}

/// Try `candidates` in order, converting each defined value with `extract`.
/// A value that `extract` rejects counts as absent.
pub fn resolve_with<T>(
    header: &RawHeader,
    candidates: &[&'static str],
    extract: impl Fn(&HeaderValue) -> Option<T>,
) -> Resolution<T> {
    for (i, key) in candidates.iter().enumerate() {
        let value = header
            .get(key)
            .filter(|v| v.is_defined())
            .and_then(&extract);
        if let Some(value) = value {
            return if i == 0 {
                Resolution::Primary(value)
            } else {
                Resolution::Fallback { key, value }
            };
        }
    }
    Resolution::Missing
}

/// [`resolve_with`] followed by the fallback policy: a secondary source or the
/// `default` is recorded in `diags` (once), and the value is always returned.
pub fn resolve_or<T: std::fmt::Debug>(
    header: &RawHeader,
    candidates: &[&'static str],
    field: &'static str,
    default: T,
    extract: impl Fn(&HeaderValue) -> Option<T>,
    diags: &mut Diagnostics,
) -> T {
    match resolve_with(header, candidates, extract) {
        Resolution::Primary(value) => value,
        Resolution::Fallback { key, value } => {
            diags.warn(
                field,
                DiagnosticKind::Fallback,
                format!("{} not usable, using {key}", candidates[0]),
            );
            value
        }
        Resolution::Missing => {
            diags.warn(
                field,
                DiagnosticKind::Default,
                format!("none of {candidates:?} found, assuming {default:?}"),
            );
            default
        }
    }
}

/// First candidate present as a string.
pub fn first_str<'h>(header: &'h RawHeader, candidates: &[&'static str]) -> Option<&'h str> {
    candidates
        .iter()
        .filter_map(|key| header.get(key))
        .filter(|v| v.is_defined())
        .find_map(HeaderValue::as_str)
}

/// Strip known file extensions (`.fits`, `.fits.gz`, `.fz`, ...) from a name.
pub fn strip_extensions(name: &str) -> &str {
    let mut stem = name;
    while let Some((head, ext)) = stem.rsplit_once('.') {
        if FILE_EXTENSIONS.contains(&ext.to_lowercase().as_str()) {
            stem = head;
        } else {
            break;
        }
    }
    stem
}

/// File name without directory and without its last extension
/// (`/data/ts8/E2V-CCD250-179_bias.fits` → `E2V-CCD250-179_bias`).
pub fn file_stem(path: &str) -> &str {
    let name = path.trim().rsplit('/').next().unwrap_or_default();
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    }
}

/// Number formed by the final run of digits of a file-like name, after removing
/// file extensions (`AT-O-20180816-00008.fits` → `8`).
pub fn trailing_number(name: &str) -> Option<u32> {
    TRAILING_DIGITS
        .captures(strip_extensions(name.trim()))
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}
