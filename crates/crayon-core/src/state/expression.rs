//! Expression language for computed bindings.
//!
//! Expressions are parsed once, when the store is built, and evaluated
//! against the current values each time a plain binding changes.
//!
//! ```text
//! expr    := or ('?' expr ':' expr)?
//! or      := and ('||' and)*
//! and     := eq ('&&' eq)*
//! eq      := cmp (('==' | '!=') cmp)*
//! cmp     := sum (('<' | '<=' | '>' | '>=') sum)*
//! sum     := product (('+' | '-') product)*
//! product := unary (('*' | '/' | '%') unary)*
//! unary   := ('!' | '-') unary | atom
//! atom    := number | string | true | false | null | identifier | '(' expr ')'
//! ```
//!
//! `+` adds numbers and concatenates when either side is a string.

use crate::value::{DynamicValue, ValueMap};
use chumsky::{pratt::*, prelude::*};
use std::collections::BTreeSet;
use thiserror::Error;

type Extra<'src> = extra::Err<Rich<'src, char>>;

/// Expression parse and evaluation errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExpressionError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Unknown identifier '{0}'")]
    UnknownIdentifier(String),

    #[error("Cannot apply '{op}' to {left} and {right}")]
    TypeMismatch {
        op: &'static str,
        left: &'static str,
        right: &'static str,
    },

    #[error("Cannot apply '{op}' to {operand}")]
    InvalidOperand {
        op: &'static str,
        operand: &'static str,
    },

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Integer overflow in '{0}'")]
    Overflow(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinaryOp {
    fn symbol(self) -> &'static str {
        match self {
            Self::Or => "||",
            Self::And => "&&",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Rem => "%",
        }
    }
}

/// Parsed expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(DynamicValue),
    Ident(String),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Conditional(Box<Expr>, Box<Expr>, Box<Expr>),
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary(op, Box::new(left), Box::new(right))
}

fn op<'src>(symbol: &'src str) -> impl Parser<'src, &'src str, &'src str, Extra<'src>> + Clone {
    just(symbol).padded()
}

fn parser<'src>() -> impl Parser<'src, &'src str, Expr, Extra<'src>> {
    recursive(|expr| {
        let number = text::int(10)
            .then(just('.').then(text::digits(10)).or_not())
            .to_slice()
            .try_map(|s: &str, span| {
                if s.contains('.') {
                    s.parse::<f64>()
                        .map(DynamicValue::Float)
                        .map_err(|e| Rich::custom(span, e.to_string()))
                } else {
                    s.parse::<i64>()
                        .map(DynamicValue::Int)
                        .map_err(|e| Rich::custom(span, e.to_string()))
                }
            })
            .map(Expr::Literal)
            .labelled("number");

        let single_quoted = just('\'')
            .ignore_then(none_of("'").repeated().to_slice())
            .then_ignore(just('\''));
        let double_quoted = just('"')
            .ignore_then(none_of("\"").repeated().to_slice())
            .then_ignore(just('"'));
        let string = single_quoted
            .or(double_quoted)
            .map(|s: &str| Expr::Literal(DynamicValue::from(s)))
            .labelled("string");

        let word = text::ascii::ident().map(|s: &str| match s {
            "true" => Expr::Literal(DynamicValue::Bool(true)),
            "false" => Expr::Literal(DynamicValue::Bool(false)),
            "null" => Expr::Literal(DynamicValue::Null),
            _ => Expr::Ident(s.to_string()),
        });

        let atom = number
            .or(string)
            .or(word)
            .or(expr
                .clone()
                .delimited_by(just('(').padded(), just(')').padded()))
            .padded();

        let operators = atom.pratt((
            prefix(7, op("!"), |_, rhs, _| Expr::Unary(UnaryOp::Not, Box::new(rhs))),
            prefix(7, op("-"), |_, rhs, _| Expr::Unary(UnaryOp::Neg, Box::new(rhs))),
            infix(left(6), op("*"), |l, _, r, _| binary(BinaryOp::Mul, l, r)),
            infix(left(6), op("/"), |l, _, r, _| binary(BinaryOp::Div, l, r)),
            infix(left(6), op("%"), |l, _, r, _| binary(BinaryOp::Rem, l, r)),
            infix(left(5), op("+"), |l, _, r, _| binary(BinaryOp::Add, l, r)),
            infix(left(5), op("-"), |l, _, r, _| binary(BinaryOp::Sub, l, r)),
            infix(left(4), op("<="), |l, _, r, _| binary(BinaryOp::Le, l, r)),
            infix(left(4), op(">="), |l, _, r, _| binary(BinaryOp::Ge, l, r)),
            infix(left(4), op("<"), |l, _, r, _| binary(BinaryOp::Lt, l, r)),
            infix(left(4), op(">"), |l, _, r, _| binary(BinaryOp::Gt, l, r)),
            infix(left(3), op("=="), |l, _, r, _| binary(BinaryOp::Eq, l, r)),
            infix(left(3), op("!="), |l, _, r, _| binary(BinaryOp::Ne, l, r)),
            infix(left(2), op("&&"), |l, _, r, _| binary(BinaryOp::And, l, r)),
            infix(left(1), op("||"), |l, _, r, _| binary(BinaryOp::Or, l, r)),
        ));

        operators
            .then(
                just('?')
                    .padded()
                    .ignore_then(expr.clone())
                    .then_ignore(just(':').padded())
                    .then(expr)
                    .or_not(),
            )
            .map(|(cond, branches)| match branches {
                Some((then, otherwise)) => {
                    Expr::Conditional(Box::new(cond), Box::new(then), Box::new(otherwise))
                }
                None => cond,
            })
    })
    .then_ignore(end())
}

impl Expr {
    /// Parse an expression
    pub fn parse(source: &str) -> Result<Expr, ExpressionError> {
        parser().parse(source).into_result().map_err(|errors| {
            ExpressionError::Parse(
                errors
                    .iter()
                    .map(|e| e.to_string())
                    .collect::<Vec<_>>()
                    .join("; "),
            )
        })
    }

    /// Identifiers the expression reads
    pub fn identifiers(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_identifiers(&mut out);
        out
    }

    fn collect_identifiers(&self, out: &mut BTreeSet<String>) {
        match self {
            Self::Literal(_) => {}
            Self::Ident(name) => {
                out.insert(name.clone());
            }
            Self::Unary(_, operand) => operand.collect_identifiers(out),
            Self::Binary(_, left, right) => {
                left.collect_identifiers(out);
                right.collect_identifiers(out);
            }
            Self::Conditional(cond, then, otherwise) => {
                cond.collect_identifiers(out);
                then.collect_identifiers(out);
                otherwise.collect_identifiers(out);
            }
        }
    }

    /// Evaluate against the current store values
    pub fn evaluate(&self, values: &ValueMap) -> Result<DynamicValue, ExpressionError> {
        match self {
            Self::Literal(value) => Ok(value.clone()),
            Self::Ident(name) => values
                .get(name)
                .cloned()
                .ok_or_else(|| ExpressionError::UnknownIdentifier(name.clone())),
            Self::Unary(UnaryOp::Not, operand) => {
                Ok(DynamicValue::Bool(!operand.evaluate(values)?.is_truthy()))
            }
            Self::Unary(UnaryOp::Neg, operand) => match operand.evaluate(values)? {
                DynamicValue::Int(i) => i
                    .checked_neg()
                    .map(DynamicValue::Int)
                    .ok_or(ExpressionError::Overflow("-")),
                DynamicValue::Float(f) => Ok(DynamicValue::Float(-f)),
                other => Err(ExpressionError::InvalidOperand {
                    op: "-",
                    operand: other.kind_name(),
                }),
            },
            Self::Binary(BinaryOp::And, left, right) => {
                let result = left.evaluate(values)?.is_truthy() && right.evaluate(values)?.is_truthy();
                Ok(DynamicValue::Bool(result))
            }
            Self::Binary(BinaryOp::Or, left, right) => {
                let result = left.evaluate(values)?.is_truthy() || right.evaluate(values)?.is_truthy();
                Ok(DynamicValue::Bool(result))
            }
            Self::Binary(op, left, right) => {
                apply_binary(*op, left.evaluate(values)?, right.evaluate(values)?)
            }
            Self::Conditional(cond, then, otherwise) => {
                if cond.evaluate(values)?.is_truthy() {
                    then.evaluate(values)
                } else {
                    otherwise.evaluate(values)
                }
            }
        }
    }
}

fn apply_binary(
    op: BinaryOp,
    left: DynamicValue,
    right: DynamicValue,
) -> Result<DynamicValue, ExpressionError> {
    use DynamicValue::{Float, Int, String as Str};

    let mismatch = |l: &DynamicValue, r: &DynamicValue| ExpressionError::TypeMismatch {
        op: op.symbol(),
        left: l.kind_name(),
        right: r.kind_name(),
    };

    match op {
        BinaryOp::Eq => Ok(DynamicValue::Bool(left.loose_eq(&right))),
        BinaryOp::Ne => Ok(DynamicValue::Bool(!left.loose_eq(&right))),

        BinaryOp::Add => match (&left, &right) {
            (Int(a), Int(b)) => a.checked_add(*b).map(Int).ok_or(ExpressionError::Overflow("+")),
            (Str(_), _) | (_, Str(_)) => Ok(Str(format!(
                "{}{}",
                left.to_display_string(),
                right.to_display_string()
            ))),
            _ => float_op(&left, &right, |a, b| a + b).ok_or_else(|| mismatch(&left, &right)),
        },
        BinaryOp::Sub => match (&left, &right) {
            (Int(a), Int(b)) => a.checked_sub(*b).map(Int).ok_or(ExpressionError::Overflow("-")),
            _ => float_op(&left, &right, |a, b| a - b).ok_or_else(|| mismatch(&left, &right)),
        },
        BinaryOp::Mul => match (&left, &right) {
            (Int(a), Int(b)) => a.checked_mul(*b).map(Int).ok_or(ExpressionError::Overflow("*")),
            _ => float_op(&left, &right, |a, b| a * b).ok_or_else(|| mismatch(&left, &right)),
        },
        BinaryOp::Div => {
            if !left.is_number() || !right.is_number() {
                return Err(mismatch(&left, &right));
            }
            if right.as_f64() == Some(0.0) {
                return Err(ExpressionError::DivisionByZero);
            }
            match (&left, &right) {
                (Int(a), Int(b)) if a.checked_rem(*b) == Some(0) => {
                    a.checked_div(*b).map(Int).ok_or(ExpressionError::Overflow("/"))
                }
                _ => float_op(&left, &right, |a, b| a / b).ok_or_else(|| mismatch(&left, &right)),
            }
        }
        BinaryOp::Rem => {
            if !left.is_number() || !right.is_number() {
                return Err(mismatch(&left, &right));
            }
            if right.as_f64() == Some(0.0) {
                return Err(ExpressionError::DivisionByZero);
            }
            match (&left, &right) {
                (Int(a), Int(b)) => a.checked_rem(*b).map(Int).ok_or(ExpressionError::Overflow("%")),
                _ => float_op(&left, &right, |a, b| a % b).ok_or_else(|| mismatch(&left, &right)),
            }
        }

        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = match (&left, &right) {
                (Str(a), Str(b)) => Some(a.cmp(b)),
                _ => match (left.as_f64(), right.as_f64()) {
                    (Some(a), Some(b)) => a.partial_cmp(&b),
                    _ => return Err(mismatch(&left, &right)),
                },
            };
            let Some(ordering) = ordering else {
                return Ok(DynamicValue::Bool(false));
            };
            let result = match op {
                BinaryOp::Lt => ordering.is_lt(),
                BinaryOp::Le => ordering.is_le(),
                BinaryOp::Gt => ordering.is_gt(),
                _ => ordering.is_ge(),
            };
            Ok(DynamicValue::Bool(result))
        }

        BinaryOp::And | BinaryOp::Or => Ok(DynamicValue::Bool(match op {
            BinaryOp::And => left.is_truthy() && right.is_truthy(),
            _ => left.is_truthy() || right.is_truthy(),
        })),
    }
}

fn float_op(
    left: &DynamicValue,
    right: &DynamicValue,
    f: impl Fn(f64, f64) -> f64,
) -> Option<DynamicValue> {
    Some(DynamicValue::Float(f(left.as_f64()?, right.as_f64()?)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn values() -> ValueMap {
        let mut map = ValueMap::new();
        map.insert("price".into(), DynamicValue::Int(12));
        map.insert("qty".into(), DynamicValue::Int(3));
        map.insert("rate".into(), DynamicValue::Float(0.5));
        map.insert("name".into(), DynamicValue::from("bob"));
        map.insert("agreed".into(), DynamicValue::Bool(true));
        map
    }

    fn eval(source: &str) -> Result<DynamicValue, ExpressionError> {
        Expr::parse(source)?.evaluate(&values())
    }

    #[test_case("price * qty", DynamicValue::Int(36) ; "int product")]
    #[test_case("price * rate", DynamicValue::Float(6.0) ; "mixed product")]
    #[test_case("1 + 2 * 3", DynamicValue::Int(7) ; "precedence")]
    #[test_case("(1 + 2) * 3", DynamicValue::Int(9) ; "parentheses")]
    #[test_case("7 / 2", DynamicValue::Float(3.5) ; "inexact division")]
    #[test_case("8 / 2", DynamicValue::Int(4) ; "exact division")]
    #[test_case("7 % 4", DynamicValue::Int(3) ; "remainder")]
    #[test_case("-qty + 1", DynamicValue::Int(-2) ; "negation")]
    #[test_case("10 - 2 - 3", DynamicValue::Int(5) ; "left associative")]
    #[test_case("'Hello, ' + name", DynamicValue::from("Hello, bob") ; "concatenation")]
    #[test_case("\"n=\" + qty", DynamicValue::from("n=3") ; "number concatenation")]
    #[test_case("qty >= 3 && agreed", DynamicValue::Bool(true) ; "logic")]
    #[test_case("!agreed || price < 10", DynamicValue::Bool(false) ; "negated logic")]
    #[test_case("price == 12.0", DynamicValue::Bool(true) ; "loose equality")]
    #[test_case("name != 'bob'", DynamicValue::Bool(false) ; "inequality")]
    #[test_case("qty > 2 ? 'many' : 'few'", DynamicValue::from("many") ; "ternary")]
    #[test_case("null == null", DynamicValue::Bool(true) ; "null literal")]
    #[test_case("1.25", DynamicValue::Float(1.25) ; "float literal")]
    fn test_evaluate(source: &str, expected: DynamicValue) {
        assert_eq!(eval(source).unwrap(), expected);
    }

    #[test]
    fn test_identifiers() {
        let expr = Expr::parse("agreed ? price * qty : fallback").unwrap();
        let ids: Vec<_> = expr.identifiers().into_iter().collect();
        assert_eq!(ids, vec!["agreed", "fallback", "price", "qty"]);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(Expr::parse("price *"), Err(ExpressionError::Parse(_))));
        assert!(matches!(Expr::parse("(1 + 2"), Err(ExpressionError::Parse(_))));
        assert!(matches!(Expr::parse(""), Err(ExpressionError::Parse(_))));
    }

    #[test]
    fn test_evaluation_errors() {
        assert_eq!(
            eval("missing + 1"),
            Err(ExpressionError::UnknownIdentifier("missing".into()))
        );
        assert_eq!(eval("qty / 0"), Err(ExpressionError::DivisionByZero));
        assert!(matches!(
            eval("name * 2"),
            Err(ExpressionError::TypeMismatch { op: "*", .. })
        ));
        assert!(matches!(eval("-name"), Err(ExpressionError::InvalidOperand { .. })));
    }

    #[test]
    fn test_short_circuit_skips_unknown_identifier() {
        assert_eq!(eval("agreed || missing").unwrap(), DynamicValue::Bool(true));
    }
}
