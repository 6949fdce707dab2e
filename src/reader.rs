use std::iter::Peekable;

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_till1, take_while},
    multi::many0,
    sequence::{preceded, terminated},
};

use crate::Error;
use crate::ast::{NumberType, Value};
use crate::stack::ensure_sufficient_stack;

/// Characters that always form a token of their own
const PUNCTUATION: &[char] = &['(', ')', '\''];

/// Token stream consumed from the front by the reader
pub type Tokens<'a> = Peekable<std::vec::IntoIter<&'a str>>;

fn whitespace(input: &str) -> IResult<&str, &str> {
    take_while(char::is_whitespace).parse(input)
}

fn punctuation(input: &str) -> IResult<&str, &str> {
    alt((tag("("), tag(")"), tag("'"))).parse(input)
}

/// Any run of characters up to whitespace or punctuation
fn atom(input: &str) -> IResult<&str, &str> {
    take_till1(|c: char| c.is_whitespace() || PUNCTUATION.contains(&c)).parse(input)
}

fn token(input: &str) -> IResult<&str, &str> {
    preceded(whitespace, alt((punctuation, atom))).parse(input)
}

/// Split raw text into tokens.
///
/// `(`, `)` and `'` are tokens on their own wherever they appear; everything else is
/// split on whitespace. There are no comments, strings or escapes, and `-5` is a
/// single token that the reader classifies as a symbol.
pub fn tokenize(input: &str) -> Vec<&str> {
    match terminated(many0(token), whitespace).parse(input) {
        Ok((_, tokens)) => tokens,
        // many0 stops at the first token it cannot read, which only happens at the
        // end of the input
        Err(_) => Vec::new(),
    }
}

/// Read one expression from the front of `tokens`.
pub fn read(tokens: &mut Tokens<'_>) -> Result<Value, Error> {
    ensure_sufficient_stack(|| read_expr(tokens))
}

fn read_expr(tokens: &mut Tokens<'_>) -> Result<Value, Error> {
    match tokens.next().ok_or(Error::UnexpectedEndOfInput)? {
        "'" => Ok(read(tokens)?.quoted()),
        "(" => read_list(tokens),
        ")" => Err(Error::ParseUnexpectedClose),
        atom => read_atom(atom),
    }
}

/// Read list elements up to and including the matching `)`
fn read_list(tokens: &mut Tokens<'_>) -> Result<Value, Error> {
    let mut items = Vec::new();
    loop {
        match tokens.peek() {
            None => return Err(Error::UnexpectedEndOfInput),
            Some(&")") => {
                tokens.next();
                return Ok(Value::list(items));
            }
            Some(_) => items.push(read(tokens)?),
        }
    }
}

/// Classify an atom: a leading digit makes a number, `T`/`NIL` a boolean, anything
/// else a symbol
fn read_atom(token: &str) -> Result<Value, Error> {
    if token.starts_with(|c: char| c.is_ascii_digit()) {
        return token
            .parse::<NumberType>()
            .map(Value::number)
            .map_err(|_| Error::InvalidNumber(token.to_owned()));
    }
    Ok(match token {
        "T" => Value::T,
        "NIL" => Value::NIL,
        _ => Value::symbol(token),
    })
}

/// Parse the first expression of `input`, ignoring anything after it.
pub fn parse(input: &str) -> Result<Value, Error> {
    let mut tokens = tokenize(input).into_iter().peekable();
    read(&mut tokens)
}
