//! S-expression parsing from text.
//!
//! The parser emits [`Lval`] trees directly: a program is a sequence of
//! expressions collected into a root S-expression, so `+ 1 2` on a REPL
//! line reads as `(+ 1 2)` and a blank or comment-only line reads as `()`.

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{take_while, take_while1},
    character::complete::{char, multispace1},
    combinator::{opt, recognize, value},
    error::ErrorKind,
    multi::many0,
    sequence::{pair, terminated},
};

use crate::ast::{Lval, NumberType, is_symbol_char, is_valid_symbol};
use crate::{MAX_PARSE_DEPTH, ParseError, ParseErrorKind};

/// Convert nom parsing errors to a structured ParseError
fn parse_error(input: &str, error: nom::Err<nom::error::Error<&str>>) -> ParseError {
    match error {
        nom::Err::Error(e) | nom::Err::Failure(e) => {
            if e.code == ErrorKind::TooLarge {
                return ParseError::new(
                    ParseErrorKind::TooDeeplyNested,
                    format!("expression too deeply nested (max depth: {MAX_PARSE_DEPTH})"),
                );
            }
            let position = input.len().saturating_sub(e.input.len());
            ParseError::new(
                ParseErrorKind::InvalidSyntax,
                format!("invalid syntax near '{}'", snippet(input, position)),
            )
        }
        nom::Err::Incomplete(_) => {
            ParseError::new(ParseErrorKind::Incomplete, "incomplete input")
        }
    }
}

/// A short excerpt of the input starting at `position`, for error messages
fn snippet(input: &str, position: usize) -> String {
    input.chars().skip(position).take(20).collect()
}

/// Skip whitespace and `;` line comments
fn ws(input: &str) -> IResult<&str, ()> {
    value(
        (),
        many0(alt((value((), multispace1), comment))),
    )
    .parse(input)
}

fn comment(input: &str) -> IResult<&str, ()> {
    value((), pair(char(';'), take_while(|c| c != '\n'))).parse(input)
}

/// Parse a decimal number
///
/// A digit run flowing straight into symbol characters (e.g. `123abc`) is
/// not a number token; rejecting it here lets the symbol parser report the
/// invalid lexeme instead. A literal that overflows 64 bits is still a
/// number token, but reads as the `Invalid Number!` error value.
fn parse_number(input: &str) -> IResult<&str, Lval> {
    let (rest, number_str) = recognize(pair(
        opt(char('-')),
        take_while1(|c: char| c.is_ascii_digit()),
    ))
    .parse(input)?;

    if rest.chars().next().is_some_and(is_symbol_char) {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            ErrorKind::Digit,
        )));
    }

    match number_str.parse::<NumberType>() {
        Ok(n) => Ok((rest, Lval::Num(n))),
        Err(_) => Ok((rest, Lval::err("Invalid Number!"))),
    }
}

/// Parse a symbol (identifier)
fn parse_symbol(input: &str) -> IResult<&str, Lval> {
    let (remaining, candidate) = take_while1(is_symbol_char).parse(input)?;

    if is_valid_symbol(candidate) {
        Ok((remaining, Lval::Sym(candidate.into())))
    } else {
        Err(nom::Err::Error(nom::error::Error::new(
            input,
            ErrorKind::Alpha,
        )))
    }
}

/// Parse a string literal with C-style escapes
fn parse_string(input: &str) -> IResult<&str, Lval> {
    let (mut remaining, _) = char('"').parse(input)?;
    let mut chars = Vec::new();

    loop {
        let mut char_iter = remaining.chars();
        match char_iter.next() {
            Some('"') => {
                return Ok((char_iter.as_str(), Lval::Str(chars.into_iter().collect())));
            }
            Some('\\') => {
                match char_iter.next() {
                    Some('n') => chars.push('\n'),
                    Some('t') => chars.push('\t'),
                    Some('r') => chars.push('\r'),
                    Some('\\') => chars.push('\\'),
                    Some('"') => chars.push('"'),
                    // Unknown or unterminated escape sequence
                    _ => {
                        return Err(nom::Err::Error(nom::error::Error::new(
                            remaining,
                            ErrorKind::Char,
                        )));
                    }
                }
                remaining = char_iter.as_str();
            }
            Some(ch) => {
                chars.push(ch);
                remaining = char_iter.as_str();
            }
            None => {
                // End of input without a closing quote
                return Err(nom::Err::Error(nom::error::Error::new(
                    remaining,
                    ErrorKind::Char,
                )));
            }
        }
    }
}

fn parse_sexpr(input: &str, depth: usize) -> IResult<&str, Lval> {
    let (input, _) = char('(').parse(input)?;
    let (input, cells) = parse_seq(input, depth)?;
    let (input, _) = ws(input)?;
    let (input, _) = char(')').parse(input)?;
    Ok((input, Lval::Sexpr(cells)))
}

fn parse_qexpr(input: &str, depth: usize) -> IResult<&str, Lval> {
    let (input, _) = char('{').parse(input)?;
    let (input, cells) = parse_seq(input, depth)?;
    let (input, _) = ws(input)?;
    let (input, _) = char('}').parse(input)?;
    Ok((input, Lval::Qexpr(cells)))
}

/// Parse a whitespace-separated sequence of expressions
fn parse_seq(input: &str, depth: usize) -> IResult<&str, Vec<Lval>> {
    many0(|i| parse_expr(i, depth + 1)).parse(input)
}

fn parse_expr(input: &str, depth: usize) -> IResult<&str, Lval> {
    if depth >= MAX_PARSE_DEPTH {
        // Failure, not Error: aborts the whole parse instead of backtracking
        return Err(nom::Err::Failure(nom::error::Error::new(
            input,
            ErrorKind::TooLarge,
        )));
    }
    let (input, _) = ws(input)?;
    alt((
        |i| parse_sexpr(i, depth),
        |i| parse_qexpr(i, depth),
        parse_number,
        parse_string,
        parse_symbol,
    ))
    .parse(input)
}

/// Parse a complete program: a sequence of expressions wrapped in a root
/// S-expression. Empty and comment-only input parses to `()`.
pub fn parse_program(input: &str) -> Result<Lval, ParseError> {
    match terminated(|i| parse_seq(i, 0), ws).parse(input) {
        Ok(("", cells)) => Ok(Lval::Sexpr(cells)),
        Ok((remaining, _)) => {
            let position = input.len().saturating_sub(remaining.len());
            Err(ParseError::new(
                ParseErrorKind::TrailingContent,
                format!("unexpected input near '{}'", snippet(input, position)),
            ))
        }
        Err(e) => Err(parse_error(input, e)),
    }
}
