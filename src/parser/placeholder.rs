//! Placeholder scanning for SQL text
//!
//! Splits SQL into literal runs and named placeholders (`:id`, `@user.name`).
//! Quoted strings, `::` casts and doubled prefixes (`@@ROWCOUNT`) stay literal.

use super::common::is_ident_char;
use nom::{
    branch::alt,
    bytes::complete::{is_not, tag, take_while},
    character::complete::{char, satisfy},
    combinator::recognize,
    multi::many0,
    sequence::{delimited, pair},
    IResult,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    Text(&'a str),
    Param { prefix: char, name: &'a str },
}

fn quoted(input: &str) -> IResult<&str, &str> {
    recognize(delimited(
        char('\''),
        many0(alt((tag("''"), is_not("'")))),
        char('\''),
    ))(input)
}

fn placeholder<'a>(input: &'a str, prefixes: &str) -> IResult<&'a str, (char, &'a str)> {
    pair(
        satisfy(|c| prefixes.contains(c)),
        recognize(pair(
            satisfy(|c: char| c.is_alphabetic() || c == '_'),
            take_while(|c: char| is_ident_char(c) || c == '.'),
        )),
    )(input)
}

/// Split `sql` into segments; concatenating them reproduces the input
pub fn scan<'a>(sql: &'a str, prefixes: &str) -> Vec<Segment<'a>> {
    let mut segments = Vec::new();
    let mut rest = sql;

    while !rest.is_empty() {
        if let Ok((remaining, literal)) = quoted(rest) {
            segments.push(Segment::Text(literal));
            rest = remaining;
            continue;
        }

        let mut chars = rest.chars();
        let first = chars.next().unwrap_or_default();
        let second = chars.next();

        // "::" casts and doubled prefixes are never placeholders
        if (first == ':' || prefixes.contains(first)) && second == Some(first) {
            let len = first.len_utf8() * 2;
            segments.push(Segment::Text(&rest[..len]));
            rest = &rest[len..];
            continue;
        }

        if let Ok((remaining, (prefix, name))) = placeholder(rest, prefixes) {
            // A trailing dot belongs to the SQL, not to the path
            let trimmed = name.trim_end_matches('.');
            let consumed = prefix.len_utf8() + trimmed.len();
            segments.push(Segment::Param { prefix, name: trimmed });
            rest = if trimmed.len() == name.len() { remaining } else { &rest[consumed..] };
            continue;
        }

        let run = rest
            .char_indices()
            .skip(1)
            .find(|(_, c)| *c == '\'' || *c == ':' || prefixes.contains(*c))
            .map_or(rest.len(), |(i, _)| i);
        segments.push(Segment::Text(&rest[..run]));
        rest = &rest[run..];
    }

    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params<'a>(segments: &[Segment<'a>]) -> Vec<&'a str> {
        segments
            .iter()
            .filter_map(|s| match s {
                Segment::Param { name, .. } => Some(*name),
                Segment::Text(_) => None,
            })
            .collect()
    }

    fn rebuild(segments: &[Segment<'_>]) -> String {
        segments
            .iter()
            .map(|s| match s {
                Segment::Text(t) => (*t).to_string(),
                Segment::Param { prefix, name } => format!("{prefix}{name}"),
            })
            .collect()
    }

    #[test]
    fn test_scan_named_params() {
        let sql = "SELECT * FROM t WHERE id=:id AND name = @user.name";
        let segments = scan(sql, ":@?");
        assert_eq!(params(&segments), vec!["id", "user.name"]);
        assert_eq!(rebuild(&segments), sql);
    }

    #[test]
    fn test_scan_skips_literals_and_casts() {
        let sql = "SELECT ':nope', created::date, @@ROWCOUNT FROM t WHERE a = ?a";
        let segments = scan(sql, ":@?");
        assert_eq!(params(&segments), vec!["a"]);
        assert_eq!(rebuild(&segments), sql);
    }

    #[test]
    fn test_trailing_dot_and_bare_prefix() {
        let sql = "x = :id. AND y = ? AND z = @";
        let segments = scan(sql, ":@?");
        assert_eq!(params(&segments), vec!["id"]);
        assert_eq!(rebuild(&segments), sql);
    }

    #[test]
    fn test_custom_prefixes() {
        let segments = scan("a = #a AND b = :b", "#");
        assert_eq!(params(&segments), vec!["a"]);
    }
}
