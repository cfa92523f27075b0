//! # Path Expressions
//!
//! A compact JMESPath subset used to pull fields out of decoded player
//! responses. Expressions are parsed with `nom` into a list of steps and then
//! evaluated against a `serde_json::Value`.
//!
//! ## Supported Syntax
//!
//! | Form | Meaning |
//! |------|---------|
//! | `status.volume` | nested field access |
//! | `"#text"` | quoted field name |
//! | `items[0]`, `items[-1]` | array index |
//! | `items[]` | flatten and project the rest over each element |
//! | `items[?text=='Albums']` | keep elements whose field equals the literal, then project |
//! | `status.[song, album]` | multi-select list |
//! | `art[].{"id": artistid, "name": "#text"}` | multi-select hash |
//!
//! Single XML children decode to objects rather than one-element arrays, so
//! `[]` and filters treat a lone object as a list of one.

use nom::branch::alt;
use nom::bytes::complete::{tag, take_while, take_while1};
use nom::character::complete::{char, digit1, multispace0};
use nom::combinator::{all_consuming, map, map_res, opt, recognize, value};
use nom::multi::{many0, separated_list1};
use nom::sequence::{delimited, pair, preceded, separated_pair, tuple};
use nom::{Finish, IResult};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("cannot parse path expression `{expr}` near `{near}`")]
pub struct PathError {
    pub expr: String,
    pub near: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    Field(String),
    Index(i64),
    Flatten,
    Filter { field: String, literal: String },
    List(Vec<Vec<Step>>),
    Hash(Vec<(String, Vec<Step>)>),
}

/// A compiled path expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathExpr {
    source: String,
    steps: Vec<Step>,
}

impl PathExpr {
    /// Compile `source`.
    ///
    /// # Errors
    ///
    /// [`PathError`] pointing at the first character that could not be parsed.
    pub fn compile(source: &str) -> Result<Self, PathError> {
        let trimmed = source.trim();
        match all_consuming(delimited(ws, steps, ws))(trimmed).finish() {
            Ok((_, steps)) => Ok(Self {
                source: source.to_string(),
                steps,
            }),
            Err(e) => Err(PathError {
                expr: source.to_string(),
                near: e.input.chars().take(16).collect(),
            }),
        }
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate against `value`. `None` means the expression matched nothing.
    #[must_use]
    pub fn search(&self, value: &Value) -> Option<Value> {
        match eval(&self.steps, value) {
            Value::Null => None,
            found => Some(found),
        }
    }
}

impl FromStr for PathExpr {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::compile(s)
    }
}

impl fmt::Display for PathExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Compile and evaluate in one go.
///
/// # Errors
///
/// [`PathError`] if `expr` does not compile.
pub fn search(expr: &str, value: &Value) -> Result<Option<Value>, PathError> {
    Ok(PathExpr::compile(expr)?.search(value))
}

// ---------------------------------------------------------------------------
// Parsing

fn ws(input: &str) -> IResult<&str, &str> {
    multispace0(input)
}

fn identifier(input: &str) -> IResult<&str, String> {
    alt((
        map(
            delimited(char('"'), take_while(|c: char| c != '"'), char('"')),
            str::to_string,
        ),
        map(
            take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_'),
            str::to_string,
        ),
    ))(input)
}

fn literal(input: &str) -> IResult<&str, String> {
    map(
        delimited(char('\''), take_while(|c: char| c != '\''), char('\'')),
        str::to_string,
    )(input)
}

fn integer(input: &str) -> IResult<&str, i64> {
    map_res(recognize(pair(opt(char('-')), digit1)), |s: &str| s.parse::<i64>())(input)
}

fn comma(input: &str) -> IResult<&str, char> {
    delimited(ws, char(','), ws)(input)
}

fn multi_list(input: &str) -> IResult<&str, Step> {
    map(
        delimited(
            pair(char('['), ws),
            separated_list1(comma, steps),
            pair(ws, char(']')),
        ),
        Step::List,
    )(input)
}

fn multi_hash(input: &str) -> IResult<&str, Step> {
    map(
        delimited(
            pair(char('{'), ws),
            separated_list1(
                comma,
                separated_pair(identifier, delimited(ws, char(':'), ws), steps),
            ),
            pair(ws, char('}')),
        ),
        Step::Hash,
    )(input)
}

fn bracket(input: &str) -> IResult<&str, Step> {
    alt((
        value(Step::Flatten, tag("[]")),
        map(delimited(pair(char('['), ws), integer, pair(ws, char(']'))), Step::Index),
        map(
            delimited(
                tag("[?"),
                tuple((ws, identifier, ws, tag("=="), ws, literal, ws)),
                char(']'),
            ),
            |(_, field, _, _, _, literal, _)| Step::Filter { field, literal },
        ),
    ))(input)
}

fn head(input: &str) -> IResult<&str, Step> {
    alt((multi_hash, multi_list, map(identifier, Step::Field)))(input)
}

fn tail(input: &str) -> IResult<&str, Step> {
    alt((preceded(char('.'), head), bracket))(input)
}

fn steps(input: &str) -> IResult<&str, Vec<Step>> {
    let (input, first) = head(input)?;
    let (input, rest) = many0(tail)(input)?;
    let mut all = Vec::with_capacity(rest.len() + 1);
    all.push(first);
    all.extend(rest);
    Ok((input, all))
}

// ---------------------------------------------------------------------------
// Evaluation

fn as_items(value: &Value) -> Option<Vec<&Value>> {
    match value {
        Value::Null => None,
        Value::Array(items) => Some(items.iter().collect()),
        other => Some(vec![other]),
    }
}

/// Apply `rest` to each item. A later `[]` ends the projection and flattens
/// the collected results instead of each item's.
fn project<'v>(items: impl Iterator<Item = &'v Value>, rest: &[Step]) -> Value {
    let end = rest
        .iter()
        .position(|step| matches!(step, Step::Flatten))
        .unwrap_or(rest.len());
    let (inner, outer) = rest.split_at(end);
    let projected = Value::Array(
        items
            .map(|item| eval(inner, item))
            .filter(|found| !found.is_null())
            .collect(),
    );
    eval(outer, &projected)
}

fn eval(steps: &[Step], current: &Value) -> Value {
    let Some((step, rest)) = steps.split_first() else {
        return current.clone();
    };

    match step {
        Step::Field(name) => current.get(name).map_or(Value::Null, |next| eval(rest, next)),
        Step::Index(index) => {
            let Value::Array(items) = current else {
                return Value::Null;
            };
            let len = i64::try_from(items.len()).unwrap_or(i64::MAX);
            let position = if *index < 0 { len + index } else { *index };
            usize::try_from(position)
                .ok()
                .and_then(|p| items.get(p))
                .map_or(Value::Null, |next| eval(rest, next))
        }
        Step::Flatten => {
            let Some(items) = as_items(current) else {
                return Value::Null;
            };
            let flat = items.into_iter().flat_map(|item| match item {
                Value::Array(inner) => inner.iter().collect::<Vec<_>>(),
                other => vec![other],
            });
            project(flat, rest)
        }
        Step::Filter { field, literal } => {
            let Some(items) = as_items(current) else {
                return Value::Null;
            };
            let kept = items
                .into_iter()
                .filter(|item| item.get(field).and_then(Value::as_str) == Some(literal.as_str()));
            project(kept, rest)
        }
        Step::List(paths) => {
            if current.is_null() {
                return Value::Null;
            }
            let list = Value::Array(paths.iter().map(|path| eval(path, current)).collect());
            eval(rest, &list)
        }
        Step::Hash(pairs) => {
            if current.is_null() {
                return Value::Null;
            }
            let object: Map<String, Value> = pairs
                .iter()
                .map(|(key, path)| (key.clone(), eval(path, current)))
                .collect();
            eval(rest, &Value::Object(object))
        }
    }
}
