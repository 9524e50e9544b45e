//! Test expressions used by conditional tags
//!
//! Grammar (lowest precedence first):
//!   or      := and (("or" | "||") and)*
//!   and     := unary (("and" | "&&") unary)*
//!   unary   := ("!" | "not") unary | compare
//!   compare := operand (op operand)?
//!   operand := "(" or ")" | literal | dotted-path

use super::common::{dotted_path, keyword, value, ws};
use crate::core::Value;
use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::char,
    combinator::{all_consuming, map, not, opt},
    multi::fold_many0,
    sequence::{delimited, pair, preceded, terminated},
    IResult,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Gt,
    Lt,
    Ge,
    Le,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Path(String),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Compare(Box<Expr>, CompareOp, Box<Expr>),
}

/// Parse a complete test expression
pub fn parse_test(input: &str) -> Result<Expr, String> {
    if input.trim().is_empty() {
        return Err("empty expression".to_string());
    }
    match all_consuming(ws(or_expr))(input) {
        Ok((_, expr)) => Ok(expr),
        Err(nom::Err::Error(e) | nom::Err::Failure(e)) => {
            Err(format!("unexpected input at '{}'", e.input))
        }
        Err(nom::Err::Incomplete(_)) => Err("incomplete expression".to_string()),
    }
}

fn or_expr(input: &str) -> IResult<&str, Expr> {
    let (input, first) = and_expr(input)?;
    fold_many0(
        preceded(ws(alt((tag("||"), keyword("or")))), and_expr),
        move || first.clone(),
        |acc, rhs| Expr::Or(Box::new(acc), Box::new(rhs)),
    )(input)
}

fn and_expr(input: &str) -> IResult<&str, Expr> {
    let (input, first) = unary_expr(input)?;
    fold_many0(
        preceded(ws(alt((tag("&&"), keyword("and")))), unary_expr),
        move || first.clone(),
        |acc, rhs| Expr::And(Box::new(acc), Box::new(rhs)),
    )(input)
}

fn unary_expr(input: &str) -> IResult<&str, Expr> {
    alt((
        map(
            preceded(
                ws(alt((terminated(tag("!"), not(char('='))), keyword("not")))),
                unary_expr,
            ),
            |inner| Expr::Not(Box::new(inner)),
        ),
        compare_expr,
    ))(input)
}

fn compare_expr(input: &str) -> IResult<&str, Expr> {
    map(
        pair(operand, opt(pair(ws(compare_op), operand))),
        |(lhs, rhs)| match rhs {
            Some((op, rhs)) => Expr::Compare(Box::new(lhs), op, Box::new(rhs)),
            None => lhs,
        },
    )(input)
}

fn compare_op(input: &str) -> IResult<&str, CompareOp> {
    alt((
        map(tag("=="), |_| CompareOp::Eq),
        map(tag("!="), |_| CompareOp::NotEq),
        map(tag("<>"), |_| CompareOp::NotEq),
        map(tag(">="), |_| CompareOp::Ge),
        map(tag("<="), |_| CompareOp::Le),
        map(tag(">"), |_| CompareOp::Gt),
        map(tag("<"), |_| CompareOp::Lt),
        map(tag("="), |_| CompareOp::Eq),
        map(keyword("eq"), |_| CompareOp::Eq),
        map(keyword("neq"), |_| CompareOp::NotEq),
        map(keyword("gte"), |_| CompareOp::Ge),
        map(keyword("lte"), |_| CompareOp::Le),
        map(keyword("gt"), |_| CompareOp::Gt),
        map(keyword("lt"), |_| CompareOp::Lt),
    ))(input)
}

fn operand(input: &str) -> IResult<&str, Expr> {
    ws(alt((
        delimited(char('('), ws(or_expr), char(')')),
        map(value, Expr::Literal),
        map(dotted_path, Expr::Path),
    )))(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(p: &str) -> Box<Expr> {
        Box::new(Expr::Path(p.to_string()))
    }

    #[test]
    fn test_bare_path() {
        assert_eq!(parse_test("id").unwrap(), Expr::Path("id".to_string()));
        assert_eq!(parse_test(" user.name ").unwrap(), Expr::Path("user.name".to_string()));
    }

    #[test]
    fn test_comparison_with_literal() {
        assert_eq!(
            parse_test("id != null").unwrap(),
            Expr::Compare(path("id"), CompareOp::NotEq, Box::new(Expr::Literal(Value::Null)))
        );
        assert_eq!(
            parse_test("age gte 18").unwrap(),
            Expr::Compare(path("age"), CompareOp::Ge, Box::new(Expr::Literal(Value::Integer(18))))
        );
    }

    #[test]
    fn test_precedence() {
        // and binds tighter than or
        let expr = parse_test("a or b and c").unwrap();
        assert_eq!(
            expr,
            Expr::Or(path("a"), Box::new(Expr::And(path("b"), path("c"))))
        );
        let expr = parse_test("!(a || b)").unwrap();
        assert_eq!(expr, Expr::Not(Box::new(Expr::Or(path("a"), path("b")))));
    }

    #[test]
    fn test_path_to_path() {
        assert_eq!(
            parse_test("min <= max").unwrap(),
            Expr::Compare(path("min"), CompareOp::Le, path("max"))
        );
    }

    #[test]
    fn test_malformed() {
        assert!(parse_test("").is_err());
        assert!(parse_test("id ==").is_err());
        assert!(parse_test("(a and b").is_err());
        assert!(parse_test("a b").is_err());
    }
}
