//! # FITS-style header cards
//!
//! Parse header text made of `KEY = value / comment` cards into a [`RawHeader`].
//!
//! Supported value forms:
//! - quoted strings `'text'` (`''` is an escaped quote, trailing blanks are dropped),
//! - logicals `T` / `F`,
//! - integers and floats (`D` exponents accepted),
//! - nothing at all, stored as [`HeaderValue::Undefined`].
//!
//! `HIERARCH A B = value` stores the keyword `A B`. `COMMENT`, `HISTORY`, `END`
//! and blank cards are ignored. Cards are read line by line and are not required
//! to be padded to 80 columns.
use nom::{
    branch::alt,
    bytes::complete::{tag, take_till},
    character::complete::{char, multispace0, multispace1, none_of},
    combinator::{map, opt},
    multi::many0,
    sequence::{preceded, terminated},
    IResult, Parser,
};
use thiserror::Error;

use super::{HeaderValue, RawHeader};

#[derive(Error, Debug, PartialEq)]
pub enum HeaderCardError {
    #[error("line {line}: no value indicator in card '{card}'")]
    MissingValueIndicator { line: usize, card: String },
    #[error("line {line}: empty keyword in card '{card}'")]
    EmptyKeyword { line: usize, card: String },
    #[error("line {line}: unable to read value of card '{card}'")]
    InvalidValue { line: usize, card: String },
}

enum CardValue<'a> {
    Quoted(String),
    Bare(&'a str),
}

fn quoted_string(input: &str) -> IResult<&str, String> {
    map(
        preceded(
            char('\''),
            terminated(
                many0(alt((map(tag("''"), |_| '\''), none_of("'")))),
                char('\''),
            ),
        ),
        |chars: Vec<char>| chars.into_iter().collect::<String>().trim_end().to_string(),
    )
    .parse(input)
}

fn card_keyword(input: &str) -> IResult<&str, &str> {
    preceded(
        opt(terminated(tag("HIERARCH"), multispace1)),
        terminated(take_till(|c| c == '='), char('=')),
    )
    .parse(input)
}

fn card_value(input: &str) -> IResult<&str, CardValue<'_>> {
    preceded(
        multispace0,
        alt((
            map(quoted_string, CardValue::Quoted),
            map(take_till(|c| c == '/'), |s: &str| CardValue::Bare(s.trim())),
        )),
    )
    .parse(input)
}

fn bare_value(text: &str) -> Option<HeaderValue> {
    match text {
        "" => Some(HeaderValue::Undefined),
        "T" => Some(HeaderValue::Bool(true)),
        "F" => Some(HeaderValue::Bool(false)),
        _ => text
            .parse::<i64>()
            .map(HeaderValue::Int)
            .ok()
            .or_else(|| {
                text.replace(['D', 'd'], "E")
                    .parse::<f64>()
                    .map(HeaderValue::Float)
                    .ok()
            }),
    }
}

fn is_commentary(card: &str) -> bool {
    let trimmed = card.trim();
    trimmed.is_empty()
        || trimmed == "END"
        || trimmed.starts_with("COMMENT")
        || trimmed.starts_with("HISTORY")
}

/// Parse one card. Commentary cards give `Ok(None)`.
pub fn parse_card(line: usize, card: &str) -> Result<Option<(String, HeaderValue)>, HeaderCardError> {
    if is_commentary(card) {
        return Ok(None);
    }

    let (rest, keyword) =
        card_keyword(card.trim_start()).map_err(|_| HeaderCardError::MissingValueIndicator {
            line,
            card: card.to_string(),
        })?;

    let keyword = keyword.trim();
    if keyword.is_empty() {
        return Err(HeaderCardError::EmptyKeyword {
            line,
            card: card.to_string(),
        });
    }

    let invalid = || HeaderCardError::InvalidValue {
        line,
        card: card.to_string(),
    };

    let (_, value) = card_value(rest).map_err(|_| invalid())?;
    let value = match value {
        CardValue::Quoted(s) => HeaderValue::String(s),
        CardValue::Bare(text) => bare_value(text).ok_or_else(invalid)?,
    };

    Ok(Some((keyword.to_string(), value)))
}

impl RawHeader {
    /// Build a header from card text, one card per line.
    ///
    /// Return
    /// ----------
    /// * The parsed header, or the first [`HeaderCardError`] met.
    pub fn from_cards(text: &str) -> Result<RawHeader, HeaderCardError> {
        let mut header = RawHeader::new();
        for (i, card) in text.lines().enumerate() {
            if let Some((key, value)) = parse_card(i + 1, card)? {
                header.insert(&key, value);
            }
        }
        Ok(header)
    }
}
