// Copyright 2018-2024 the Deno authors. MIT license.

//! Splits a command line into an argument vector.
//!
//! Quoting follows the usual shell rules for single quotes, double quotes
//! and backslash escapes. Nothing is ever expanded: `$VAR`, backticks and
//! shell operators such as `;` or `|` are kept as literal characters, so a
//! command line can never cause a second command to run.
//!
//! This differs from go-shellwords style splitters, which stop at the first
//! unquoted `;`, `&`, `|`, `<` or `>` and silently drop the rest of the
//! line (`echo a; echo b` becomes `["echo", "a"]`). Here the same input
//! yields `["echo", "a;", "echo", "b"]`.

use monch::*;
use thiserror::Error;

/// Error produced when a command line has malformed quoting or escaping.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}\n  {excerpt}\n  ~")]
pub struct TokenizeError {
  message: String,
  excerpt: String,
}

impl TokenizeError {
  /// Short description of what went wrong, without the input excerpt.
  pub fn message(&self) -> &str {
    &self.message
  }
}

fn error_for_failure(e: ParseErrorFailure<'_>) -> TokenizeError {
  TokenizeError {
    message: e.message.to_string(),
    // truncate the output to prevent wrapping in the console
    excerpt: e.input.chars().take(60).collect::<String>(),
  }
}

/// Tokenizes `input` into its words.
///
/// Whitespace-only input yields an empty vector; it is up to the caller to
/// decide whether that is an error.
pub fn tokenize(input: &str) -> Result<Vec<String>, TokenizeError> {
  match parse_tokens(input) {
    Ok((rest, tokens)) => {
      if rest.is_empty() {
        Ok(tokens)
      } else {
        Err(error_for_failure(fail_for_trailing_input(rest)))
      }
    }
    Err(ParseError::Backtrace) => {
      Err(error_for_failure(fail_for_trailing_input(input)))
    }
    Err(ParseError::Failure(e)) => Err(error_for_failure(e)),
  }
}

fn parse_tokens(input: &str) -> ParseResult<'_, Vec<String>> {
  preceded(skip_whitespace, many0(terminated(parse_token, skip_whitespace)))(
    input,
  )
}

fn parse_token(input: &str) -> ParseResult<'_, String> {
  enum TokenPart<'a> {
    Char(char),
    Quoted(&'a str),
    Owned(String),
  }

  // Quoted and unquoted parts that touch each other form a single token.
  let (input, parts) = many1(or(
    map(parse_escaped_char, TokenPart::Char),
    or(
      map(parse_single_quoted_string, TokenPart::Quoted),
      or(
        map(parse_double_quoted_string, TokenPart::Owned),
        map(if_true(next_char, |&c| is_word_char(c)), TokenPart::Char),
      ),
    ),
  ))(input)?;

  let mut token = String::new();
  for part in parts {
    match part {
      TokenPart::Char(c) => token.push(c),
      TokenPart::Quoted(text) => token.push_str(text),
      TokenPart::Owned(text) => token.push_str(&text),
    }
  }
  Ok((input, token))
}

fn parse_escaped_char(input: &str) -> ParseResult<'_, char> {
  with_failure_input(
    input,
    preceded(
      ch('\\'),
      assert_exists(next_char, "Expected character to escape."),
    ),
  )(input)
}

fn parse_single_quoted_string(input: &str) -> ParseResult<'_, &str> {
  // single quoted strings are taken verbatim and cannot contain a single quote
  delimited(
    ch('\''),
    take_while(|c| c != '\''),
    with_failure_input(
      input,
      assert_exists(ch('\''), "Expected closing single quote."),
    ),
  )(input)
}

fn parse_double_quoted_string(input: &str) -> ParseResult<'_, String> {
  delimited(
    ch('"'),
    map(
      many0(or(
        parse_escaped_char,
        if_true(next_char, |&c| c != '"' && c != '\\'),
      )),
      |chars| chars.into_iter().collect::<String>(),
    ),
    with_failure_input(
      input,
      assert_exists(ch('"'), "Expected closing double quote."),
    ),
  )(input)
}

fn is_word_char(c: char) -> bool {
  !c.is_whitespace() && !matches!(c, '\'' | '"' | '\\')
}

fn fail_for_trailing_input(input: &str) -> ParseErrorFailure<'_> {
  ParseErrorFailure::new(input, "Unexpected character.")
}
