//! # IRAF section strings
//!
//! `DETSEC`, `DATASEC` and `BIASSEC` cards describe rectangles as
//! `[x1:x2,y1:y2]`: 1-based, inclusive, with `x1 > x2` (or `y1 > y2`) meaning the
//! axis is read in reverse. [`IrafSection`] keeps the raw bounds and converts to a
//! 0-based [`BBox`].
use std::str::FromStr;

use nom::{
    character::complete::{char, multispace0, u64 as dec_u64},
    combinator::all_consuming,
    sequence::{delimited, separated_pair},
    IResult, Parser,
};
use thiserror::Error;

use crate::assembly::geometry::BBox;

#[derive(Error, Debug, PartialEq)]
pub enum SectionError {
    #[error("malformed section '{0}'")]
    Malformed(String),
    #[error("section '{0}' uses a zero index, sections are 1-based")]
    ZeroIndex(String),
}

/// Parsed `[x1:x2,y1:y2]` bounds, 1-based and inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IrafSection {
    pub x: (u64, u64),
    pub y: (u64, u64),
}

impl IrafSection {
    /// 0-based bounding box covered by the section.
    pub fn bbox(&self) -> BBox {
        let x0 = self.x.0.min(self.x.1) - 1;
        let y0 = self.y.0.min(self.y.1) - 1;
        BBox::new(
            x0 as usize,
            y0 as usize,
            (self.x.0.abs_diff(self.x.1) + 1) as usize,
            (self.y.0.abs_diff(self.y.1) + 1) as usize,
        )
    }

    pub fn flip_x(&self) -> bool {
        self.x.0 > self.x.1
    }

    pub fn flip_y(&self) -> bool {
        self.y.0 > self.y.1
    }
}

fn axis_range(input: &str) -> IResult<&str, (u64, u64)> {
    separated_pair(
        delimited(multispace0, dec_u64, multispace0),
        char(':'),
        delimited(multispace0, dec_u64, multispace0),
    )
    .parse(input)
}

fn section(input: &str) -> IResult<&str, ((u64, u64), (u64, u64))> {
    delimited(
        char('['),
        separated_pair(axis_range, char(','), axis_range),
        char(']'),
    )
    .parse(input)
}

impl FromStr for IrafSection {
    type Err = SectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (_, (x, y)) = all_consuming(section)
            .parse(s.trim())
            .map_err(|_| SectionError::Malformed(s.to_string()))?;

        if [x.0, x.1, y.0, y.1].contains(&0) {
            return Err(SectionError::ZeroIndex(s.to_string()));
        }
        Ok(IrafSection { x, y })
    }
}
