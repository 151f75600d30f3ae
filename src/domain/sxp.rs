//! S-expression values and their text notation.
//!
//! Lists print as `(a b c)`. Atoms print bare when they consist of safe
//! characters only, otherwise double-quoted with backslash escapes.
//! Both `"..."` and `'...'` quoting are accepted when parsing.

use std::fmt;

use nom::branch::alt;
use nom::bytes::complete::take_while1;
use nom::character::complete::{char, multispace0};
use nom::combinator::{all_consuming, map};
use nom::error::{Error as NomError, ErrorKind, ParseError};
use nom::multi::many0;
use nom::sequence::{delimited, preceded};
use nom::{IResult, Parser};
use tracing::instrument;

use crate::domain::ConvertError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sxp {
    Atom(String),
    List(Vec<Sxp>),
}

impl Sxp {
    pub fn atom(s: impl Into<String>) -> Self {
        Sxp::Atom(s.into())
    }

    pub fn list(items: impl IntoIterator<Item = Sxp>) -> Self {
        Sxp::List(items.into_iter().collect())
    }

    /// Name of a list: its leading atom, if any.
    pub fn name(&self) -> Option<&str> {
        match self {
            Sxp::List(items) => match items.first() {
                Some(Sxp::Atom(name)) => Some(name),
                _ => None,
            },
            Sxp::Atom(_) => None,
        }
    }

    /// First `(name value ...)` child with the given name.
    pub fn child(&self, name: &str) -> Option<&Sxp> {
        match self {
            Sxp::List(items) => items.iter().skip(1).find(|c| c.name() == Some(name)),
            Sxp::Atom(_) => None,
        }
    }

    /// Value of `(name value)`, when the value is an atom.
    pub fn child_value(&self, name: &str) -> Option<&str> {
        match self.child(name)? {
            Sxp::List(items) => match items.get(1) {
                Some(Sxp::Atom(v)) => Some(v),
                _ => None,
            },
            Sxp::Atom(_) => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Sxp::Atom(s) => s.is_empty(),
            Sxp::List(items) => items.is_empty(),
        }
    }
}

fn is_atom_char(c: char) -> bool {
    !(c.is_whitespace() || matches!(c, '(' | ')' | '"' | '\'' | '\\'))
}

fn write_atom(f: &mut fmt::Formatter<'_>, atom: &str) -> fmt::Result {
    if !atom.is_empty() && atom.chars().all(is_atom_char) {
        return f.write_str(atom);
    }
    f.write_str("\"")?;
    for c in atom.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            '\r' => f.write_str("\\r")?,
            c => write!(f, "{}", c)?,
        }
    }
    f.write_str("\"")
}

impl fmt::Display for Sxp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sxp::Atom(atom) => write_atom(f, atom),
            Sxp::List(items) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str(")")
            }
        }
    }
}

/// A combinator that takes a parser `inner` and produces a parser that also consumes both leading and
/// trailing whitespace, returning the output of `inner`.
fn ws<'a, F, O, E: ParseError<&'a str>>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O, E>
where
    F: Parser<&'a str, O, E>,
{
    delimited(multispace0, inner, multispace0)
}

fn bare_atom(input: &str) -> IResult<&str, Sxp> {
    map(take_while1(is_atom_char), |s: &str| Sxp::atom(s))(input)
}

// Quoted string with backslash escapes; either quote char opens, the same one closes.
fn quoted(input: &str) -> IResult<&str, Sxp> {
    let mut chars = input.char_indices();
    let quote = match chars.next() {
        Some((_, q @ ('"' | '\''))) => q,
        _ => return Err(nom::Err::Error(NomError::new(input, ErrorKind::Char))),
    };
    let mut out = String::new();
    while let Some((i, c)) = chars.next() {
        if c == quote {
            return Ok((&input[i + c.len_utf8()..], Sxp::Atom(out)));
        }
        if c == '\\' {
            match chars.next() {
                Some((_, 'n')) => out.push('\n'),
                Some((_, 't')) => out.push('\t'),
                Some((_, 'r')) => out.push('\r'),
                Some((_, escaped)) => out.push(escaped),
                None => break,
            }
        } else {
            out.push(c);
        }
    }
    // Unterminated string: no alternative can succeed from here.
    Err(nom::Err::Failure(NomError::new(input, ErrorKind::Eof)))
}

fn list(input: &str) -> IResult<&str, Sxp> {
    map(
        delimited(char('('), many0(expr), preceded(multispace0, char(')'))),
        Sxp::List,
    )(input)
}

fn expr(input: &str) -> IResult<&str, Sxp> {
    ws(alt((list, quoted, bare_atom)))(input)
}

/// Parse exactly one s-expression, surrounded by optional whitespace.
#[instrument(level = "trace")]
pub fn parse(text: &str) -> Result<Sxp, ConvertError> {
    all_consuming(expr)(text)
        .map(|(_, sxp)| sxp)
        .map_err(|e| ConvertError::Sxp {
            text: text.to_string(),
            message: e.to_string(),
        })
}
