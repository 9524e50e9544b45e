use crate::core::Value;
use rust_decimal::Decimal;
use std::str::FromStr;
use nom::{
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_while},
    character::complete::{alpha1, char, digit1, multispace0, none_of, satisfy},
    combinator::{map, map_res, not, opt, peek, recognize, value as constant, verify},
    multi::many0,
    sequence::{delimited, pair, terminated, tuple},
    IResult,
};

pub fn ws<'a, F, O>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

pub fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

pub fn identifier(input: &str) -> IResult<&str, String> {
    map(
        recognize(pair(
            alt((alpha1, tag("_"))),
            take_while(is_ident_char),
        )),
        |s: &str| s.to_string(),
    )(input)
}

/// Case-insensitive keyword that does not run into a longer identifier
pub fn keyword<'a>(kw: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    terminated(tag_no_case(kw), not(peek(satisfy(is_ident_char))))
}

/// Identifier that is not a reserved word of the test-expression grammar
pub fn non_keyword_identifier(input: &str) -> IResult<&str, String> {
    verify(identifier, |s: &String| {
        let lower = s.to_lowercase();
        !matches!(
            lower.as_str(),
            "and" | "or" | "not" | "null" | "true" | "false" | "eq" | "neq" | "gt" | "gte" | "lt" | "lte"
        )
    })(input)
}

/// Dotted member path such as `order.customer.id`
pub fn dotted_path(input: &str) -> IResult<&str, String> {
    map(
        recognize(pair(
            non_keyword_identifier,
            many0(pair(char('.'), identifier)),
        )),
        |s: &str| s.to_string(),
    )(input)
}

/// Quoted string: single or double quotes, a doubled quote escapes itself; may be empty
pub fn string_literal(input: &str) -> IResult<&str, String> {
    alt((
        map(
            delimited(
                char('\''),
                many0(alt((constant('\'', tag("''")), none_of("'")))),
                char('\''),
            ),
            |chars: Vec<char>| chars.into_iter().collect(),
        ),
        map(
            delimited(
                char('"'),
                many0(alt((constant('"', tag("\"\"")), none_of("\"")))),
                char('"'),
            ),
            |chars: Vec<char>| chars.into_iter().collect(),
        ),
    ))(input)
}

/// Literal values usable in test expressions
pub fn value(input: &str) -> IResult<&str, Value> {
    alt((
        map(keyword("null"), |_| Value::Null),
        map(keyword("true"), |_| Value::Boolean(true)),
        map(keyword("false"), |_| Value::Boolean(false)),
        map(string_literal, Value::Text),

        // Numeric with decimal point - Decimal first for exact comparisons
        map_res(
            recognize(tuple((
                opt(char('-')),
                digit1,
                char('.'),
                digit1,
            ))),
            |s: &str| -> Result<Value, String> {
                if let Ok(d) = Decimal::from_str(s) {
                    Ok(Value::Numeric(d))
                } else {
                    Ok(Value::Real(s.parse().map_err(|e| format!("{e:?}"))?))
                }
            }
        ),

        map_res(
            recognize(pair(opt(char('-')), digit1)),
            |s: &str| s.parse::<i64>().map(Value::Integer),
        ),
    ))(input)
}
