/*!
  Line-level tokenizing shared by every opcode.

  A line is a separator-delimited list of fields followed by an optional comment:

    13, copy, output_0_1_3 (2), c_0_1_3 (0), 0   # comment

  The tokenizer does not know about opcodes and does not validate counts; that is left to the
  opcode parsers, which know the expected count from the `IsaSpec`. The small grammars for the
  pieces of a token (an operand with its bank annotation, a bundle identifier) live here too.
*/

use std::fmt::{Display, Formatter};

use nom::{
  bytes::complete::{take_till, take_till1},
  character::complete::{char as one_char, digit1, space0},
  combinator::{all_consuming, map_res, opt, rest},
  multi::separated_list1,
  sequence::{delimited, pair, preceded},
  IResult,
};

use crate::error::{AsmError, Result};

#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub struct Syntax {
  pub separator: char,
  pub comment_marker: char,
}

pub const DEFAULT_SYNTAX: Syntax = Syntax { separator: ',', comment_marker: '#' };

/// An operand as written in a P-ISA line: a variable name and its suggested bank.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Operand {
  pub name: String,
  pub bank: Option<u32>,
}

impl Operand {
  pub fn new(name: &str, bank: Option<u32>) -> Operand {
    Operand { name: name.to_string(), bank }
  }
}

impl Display for Operand {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self.bank {
      Some(bank) => write!(f, "{} ({})", self.name, bank),
      None       => write!(f, "{}", self.name)
    }
  }
}

pub fn tokenize(line: &str) -> (Vec<String>, String) {
  tokenize_with(line, DEFAULT_SYNTAX)
}

/// Splits `line` into trimmed tokens and the trimmed comment text (empty if there is none).
pub fn tokenize_with(line: &str, syntax: Syntax) -> (Vec<String>, String) {
  let Syntax { separator, comment_marker } = syntax;

  let split: IResult<&str, (&str, Option<&str>)> =
    pair(
      take_till(|c: char| c == comment_marker),
      opt(preceded(one_char(comment_marker), rest))
    )(line);
  let (body, comment) = match split {
    Ok((_, (body, comment))) => (body, comment.unwrap_or("")),
    Err(_) => (line, "")
  };

  if body.trim().is_empty() {
    return (vec![], comment.trim().to_string());
  }

  let fields: IResult<&str, Vec<&str>> =
    separated_list1(one_char(separator), take_till(|c: char| c == separator))(body);
  let tokens = match fields {
    Ok((_, fields)) => fields.iter().map(|field| field.trim().to_string()).collect(),
    Err(_) => vec![body.trim().to_string()]
  };

  (tokens, comment.trim().to_string())
}

fn uint(input: &str) -> IResult<&str, u32> {
  map_res(digit1, |digits: &str| digits.parse::<u32>())(input)
}

fn operand(input: &str) -> IResult<&str, (&str, Option<u32>)> {
  pair(
    take_till1(|c: char| c.is_whitespace() || c == '(' || c == ')'),
    opt(preceded(
      space0,
      delimited(
        pair(one_char('('), space0),
        uint,
        pair(space0, one_char(')'))
      )
    ))
  )(input)
}

/// Parses `name (bank)` or a bare `name`.
pub fn parse_operand(token: &str) -> Result<Operand> {
  match all_consuming(delimited(space0, operand, space0))(token) {
    Ok((_, (name, bank))) => Ok(Operand::new(name, bank)),
    Err(_) => Err(AsmError::InvalidToken { what: "operand", token: token.to_string() })
  }
}

/// Parses a bundle identifier of the form `F<index>`.
pub fn parse_bundle(token: &str) -> Result<u32> {
  match all_consuming(preceded(one_char('F'), uint))(token) {
    Ok((_, bundle)) => Ok(bundle),
    Err(_) => Err(AsmError::InvalidToken { what: "bundle", token: token.to_string() })
  }
}

pub fn parse_uint(what: &'static str, token: &str) -> Result<u32> {
  match all_consuming(uint)(token) {
    Ok((_, value)) => Ok(value),
    Err(_) => Err(AsmError::InvalidToken { what, token: token.to_string() })
  }
}

/// Checks that the mnemonic at `position` is `expected`. A mismatch means the line was routed to the
/// wrong opcode parser.
pub fn expect_mnemonic(tokens: &[String], position: usize, expected: &'static str) -> Result<()> {
  match tokens.get(position) {
    Some(found) if found == expected => Ok(()),
    found => Err(AsmError::MnemonicMismatch {
      expected,
      found: found.cloned().unwrap_or_default()
    })
  }
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn tokens_and_comment(){
    let (tokens, comment) = tokenize("13, copy, output_0_1_3 (2), c_0_1_3 (0), 0 # keep me ");
    assert_eq!(tokens, vec!["13", "copy", "output_0_1_3 (2)", "c_0_1_3 (0)", "0"]);
    assert_eq!(comment, "keep me");
  }

  #[test]
  fn no_comment(){
    let (tokens, comment) = tokenize("5, cload, reg0, varA");
    assert_eq!(tokens.len(), 4);
    assert_eq!(comment, "");
  }

  #[test]
  fn comment_only_and_blank(){
    assert_eq!(tokenize("   # just a note"), (vec![], "just a note".to_string()));
    assert_eq!(tokenize(""), (vec![], String::new()));
  }

  #[test]
  fn empty_fields_are_kept(){
    let (tokens, _) = tokenize("1, sub, ,");
    assert_eq!(tokens, vec!["1", "sub", "", ""]);
  }

  #[test]
  fn custom_syntax(){
    let syntax = Syntax { separator: ';', comment_marker: '%' };
    let (tokens, comment) = tokenize_with("a; b, c % note", syntax);
    assert_eq!(tokens, vec!["a", "b, c"]);
    assert_eq!(comment, "note");
  }

  #[test]
  fn operands(){
    assert_eq!(parse_operand("output_0_1_3 (2)").unwrap(), Operand::new("output_0_1_3", Some(2)));
    assert_eq!(parse_operand("c_0_1_3(0)").unwrap(), Operand::new("c_0_1_3", Some(0)));
    assert_eq!(parse_operand("x ( 12 )").unwrap(), Operand::new("x", Some(12)));
    assert_eq!(parse_operand("bare").unwrap(), Operand::new("bare", None));
    assert!(parse_operand("x (a)").is_err());
    assert!(parse_operand("x y").is_err());
    assert!(parse_operand("").is_err());
  }

  #[test]
  fn bundles(){
    assert_eq!(parse_bundle("F12").unwrap(), 12);
    assert!(parse_bundle("12").is_err());
    assert!(parse_bundle("F").is_err());
  }

  #[test]
  fn mnemonic_check(){
    let (tokens, _) = tokenize("13, copy, a (0), b (1), 0");
    assert!(expect_mnemonic(&tokens, 1, "copy").is_ok());
    let err = expect_mnemonic(&tokens, 1, "sub").unwrap_err();
    assert!(err.is_assertion());
    assert!(expect_mnemonic(&tokens[..1], 1, "copy").is_err());
  }

}
