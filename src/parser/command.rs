//! Lexical SQL command classification
//!
//! Only the leading keyword of each `;`-separated statement is inspected.

use super::common::{identifier, keyword};
use nom::{
    branch::alt,
    bytes::complete::{tag, take_until},
    character::complete::{char, multispace1, not_line_ending},
    combinator::value,
    multi::many0,
    sequence::{delimited, preceded},
    IResult,
};
use std::ops::BitOr;

/// Flag set of command kinds found in a piece of SQL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SqlCommandType(u8);

impl SqlCommandType {
    pub const UNKNOWN: Self = Self(0);
    pub const SELECT: Self = Self(1);
    pub const INSERT: Self = Self(1 << 1);
    pub const UPDATE: Self = Self(1 << 2);
    pub const DELETE: Self = Self(1 << 3);

    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    #[must_use]
    pub const fn is_select(self) -> bool {
        self.contains(Self::SELECT)
    }

    #[must_use]
    pub const fn is_unknown(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for SqlCommandType {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Whitespace, `-- line` comments, `/* block */` comments and opening parens
fn skip_noise(input: &str) -> IResult<&str, ()> {
    value(
        (),
        many0(alt((
            value((), multispace1),
            value((), preceded(tag("--"), not_line_ending)),
            value((), delimited(tag("/*"), take_until("*/"), tag("*/"))),
            value((), char('(')),
        ))),
    )(input)
}

fn leading_command(input: &str) -> IResult<&str, SqlCommandType> {
    preceded(
        skip_noise,
        alt((
            value(SqlCommandType::SELECT, keyword("select")),
            value(SqlCommandType::INSERT, keyword("insert")),
            value(SqlCommandType::UPDATE, keyword("update")),
            value(SqlCommandType::DELETE, keyword("delete")),
            value(SqlCommandType::INSERT, keyword("replace")),
        )),
    )(input)
}

fn classify_one(statement: &str) -> SqlCommandType {
    if let Ok((_, kind)) = leading_command(statement) {
        return kind;
    }
    // WITH ... : the first data-modifying verb wins, otherwise it is a query
    let Ok((body, _)) = preceded(skip_noise, keyword("with"))(statement) else {
        return SqlCommandType::UNKNOWN;
    };
    let mut words = body
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|w| identifier(w).is_ok());
    words
        .find_map(|w| match w.to_lowercase().as_str() {
            "insert" => Some(SqlCommandType::INSERT),
            "update" => Some(SqlCommandType::UPDATE),
            "delete" => Some(SqlCommandType::DELETE),
            _ => None,
        })
        .unwrap_or(SqlCommandType::SELECT)
}

/// Split on `;` outside of quoted strings
fn split_statements(sql: &str) -> Vec<&str> {
    let mut statements = Vec::new();
    let mut in_quote = false;
    let mut start = 0;
    for (i, c) in sql.char_indices() {
        match c {
            '\'' => in_quote = !in_quote,
            ';' if !in_quote => {
                statements.push(&sql[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    statements.push(&sql[start..]);
    statements.into_iter().filter(|s| !s.trim().is_empty()).collect()
}

pub struct SqlCommandAnalyzer;

impl SqlCommandAnalyzer {
    #[must_use]
    pub fn analyse(sql: &str) -> SqlCommandType {
        split_statements(sql)
            .into_iter()
            .map(classify_one)
            .fold(SqlCommandType::UNKNOWN, BitOr::bitor)
    }
}
