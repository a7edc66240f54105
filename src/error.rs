/*!
  Errors raised while parsing, constructing, and emitting instructions.

  Variants fall in three groups. Structural problems with a line (too few or too many tokens)
  only become errors when the `IsaSpec` policy is `Fail`. Construction violations reject a single
  instruction. Assertions flag a broken contract, e.g. a line handed to the wrong opcode parser or
  an instance whose shape changed after construction.
*/

use thiserror::Error;

use crate::instructions::Opcode;

pub type Result<T> = std::result::Result<T, AsmError>;

#[derive(Error, Debug)]
pub enum AsmError {
  // Structural //
  #[error("instruction \"{opcode}\": expected {expected} tokens, found {found}")]
  TokenCount { opcode: Opcode, expected: usize, found: usize },

  // Construction violations //
  #[error("instruction \"{opcode}\": expected {expected} {role} operands, but {found} received")]
  WrongArity { opcode: Opcode, role: &'static str, expected: usize, found: usize },

  #[error("instruction \"{opcode}\": source and destination cannot be the same variable `{name}`")]
  Aliasing { opcode: Opcode, name: String },

  #[error("instruction \"{opcode}\": extra formatting arguments not supported: {args:?}")]
  UnsupportedArguments { opcode: Opcode, args: Vec<String> },

  #[error("instruction \"{opcode}\": expected {expected} tokens, but {found} received")]
  InvalidTokenCount { opcode: Opcode, expected: usize, found: usize },

  #[error("instruction \"{opcode}\": missing {role} operand in slot {slot}")]
  MissingOperand { opcode: Opcode, role: &'static str, slot: usize },

  #[error("instruction \"{opcode}\" has no {format} encoding")]
  UnsupportedFormat { opcode: Opcode, format: &'static str },

  // Assertions //
  #[error("expected mnemonic \"{expected}\", found \"{found}\"")]
  MnemonicMismatch { expected: &'static str, found: String },

  #[error("instruction \"{opcode}\" changed shape after construction: {detail}")]
  EmitArity { opcode: Opcode, detail: String },

  // Input and configuration //
  #[error("invalid {what} token `{token}`")]
  InvalidToken { what: &'static str, token: String },

  #[error("unknown opcode \"{0}\"")]
  UnknownOpcode(String),

  #[error("opcode \"{0}\" has no ISA specification binding")]
  UnboundOpcode(Opcode),

  #[error("unresolved variable `{0}`")]
  UnresolvedVariable(String),

  #[error("ISA configuration: {0}")]
  Config(#[from] serde_json::Error),

  #[error("line {line}: {source}")]
  AtLine { line: usize, #[source] source: Box<AsmError> },
}

impl AsmError {
  /// Programmer-error class: the caller broke the protocol rather than feeding bad input.
  pub fn is_assertion(&self) -> bool {
    match self {
      AsmError::MnemonicMismatch { .. } | AsmError::EmitArity { .. } => true,
      AsmError::AtLine { source, .. } => source.is_assertion(),
      _ => false
    }
  }

  pub(crate) fn at_line(self, line: usize) -> AsmError {
    AsmError::AtLine { line, source: Box::new(self) }
  }
}


/// A token-count mismatch tolerated under the `Warn` policy. The line still parses on a
/// best-effort basis.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum TokenCountWarning {
  Missing { opcode: Opcode, expected: usize, found: usize },
  Extra   { opcode: Opcode, expected: usize, found: usize },
}

impl std::fmt::Display for TokenCountWarning {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      TokenCountWarning::Missing { opcode, expected, found } => {
        write!(f, "Not enough tokens detected for instruction \"{}\" (expected {}, found {})",
               opcode, expected, found)
      }
      TokenCountWarning::Extra { opcode, expected, found } => {
        write!(f, "Extra tokens detected for instruction \"{}\" (expected {}, found {})",
               opcode, expected, found)
      }
    }
  }
}
