/*!
  Memory-movement instructions: transfers between HBM, the scratchpad, and the register file.

  These are built directly from their raw token list, because one operand slot changes meaning over
  the pipeline while keeping its position. Before linking it holds a variable name; afterwards the
  linker overwrites it with the numeric address the variable was placed at:

    5, cload, reg0, varA      // as assembled
    5, cload, reg0, 0x2000    // after `set_source("0x2000")`

  The layout shared by the family is `<line>, <mnemonic>, <dest>, <source>`. Only the total token
  count comes from the `IsaSpec`. Tokens past the declared count are kept verbatim (and reported
  through the `TokenCountPolicy`); a line with fewer tokens than its layout needs is rejected.
*/

use std::fmt::{Display, Formatter};

use super::opcode::{Family, Opcode};
use super::tokenizer::{expect_mnemonic, tokenize};
use super::xinst::{append_comment, check_extra_args};
use crate::error::{AsmError, Result, TokenCountWarning};
use crate::isa::{Encoding, IsaSpec};

const LINE_TOKEN: usize = 0;
const MNEMONIC_TOKEN: usize = 1;
const DEST_TOKEN: usize = 2;
const SOURCE_TOKEN: usize = 3;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CInstruction {
  opcode: Opcode,
  tokens: Vec<String>,
  /// Declared count at construction time, kept for the emission check.
  required_tokens: usize,
  throughput: u32,
  latency: u32,
  comment: String,
  warnings: Vec<TokenCountWarning>,
}

impl CInstruction {

  pub fn new(isa: &IsaSpec, opcode: Opcode, tokens: Vec<String>, comment: &str)
    -> Result<CInstruction>
  {
    if opcode.family() != Family::MemoryMovement {
      return Err(AsmError::UnsupportedFormat { opcode, format: "memory-movement" });
    }
    let entry = isa.describe(opcode)?;
    let required_tokens = entry.num_tokens.max(SOURCE_TOKEN + 1);

    if tokens.len() < required_tokens {
      return Err(AsmError::InvalidTokenCount { opcode, expected: required_tokens, found: tokens.len() });
    }
    expect_mnemonic(&tokens, MNEMONIC_TOKEN, opcode.asm_name())?;
    let warnings = isa.check_token_count(opcode, Encoding::Asm, tokens.len())?.into_iter().collect();

    Ok(CInstruction {
      opcode,
      tokens,
      required_tokens,
      throughput: entry.default_throughput,
      latency: entry.default_latency,
      comment: comment.to_string(),
      warnings
    })
  }

  pub fn from_asm_line(isa: &IsaSpec, opcode: Opcode, line: &str) -> Result<CInstruction> {
    let (tokens, comment) = tokenize(line);
    CInstruction::new(isa, opcode, tokens, &comment)
  }

  // region Accessors

  pub fn opcode(&self) -> Opcode {
    self.opcode
  }

  pub fn name(&self) -> &'static str {
    self.opcode.name()
  }

  pub fn tokens(&self) -> &[String] {
    &self.tokens
  }

  pub fn line_number(&self) -> &str {
    &self.tokens[LINE_TOKEN]
  }

  /// The linker renumbers lines when it concatenates kernels.
  pub fn set_line_number(&mut self, line: u64) {
    self.tokens[LINE_TOKEN] = line.to_string();
  }

  pub fn dest(&self) -> &str {
    &self.tokens[DEST_TOKEN]
  }

  pub fn set_dest(&mut self, value: &str) {
    self.tokens[DEST_TOKEN] = value.to_string();
  }

  /// A variable name while the value is still logical, an address once placement is resolved.
  pub fn source(&self) -> &str {
    &self.tokens[SOURCE_TOKEN]
  }

  pub fn set_source(&mut self, value: &str) {
    self.tokens[SOURCE_TOKEN] = value.to_string();
  }

  pub fn throughput(&self) -> u32 {
    self.throughput
  }

  pub fn latency(&self) -> u32 {
    self.latency
  }

  pub fn comment(&self) -> &str {
    &self.comment
  }

  pub fn warnings(&self) -> &[TokenCountWarning] {
    &self.warnings
  }

  // endregion

  fn check_shape(&self) -> Result<()> {
    if self.tokens.len() < self.required_tokens {
      return Err(AsmError::EmitArity {
        opcode: self.opcode,
        detail: format!("{} tokens, expected {}", self.tokens.len(), self.required_tokens)
      });
    }
    if self.tokens[MNEMONIC_TOKEN] != self.opcode.asm_name() {
      return Err(AsmError::EmitArity {
        opcode: self.opcode,
        detail: format!("mnemonic token is `{}`", self.tokens[MNEMONIC_TOKEN])
      });
    }
    Ok(())
  }

  pub fn to_asm_format(&self, extra_args: &[&str]) -> Result<String> {
    self.check_shape()?;
    check_extra_args(self.opcode, extra_args)?;
    Ok(append_comment(self.tokens.join(", "), &self.comment))
  }

  /// Memory-movement instructions only exist in the hardware encoding.
  pub fn to_pisa_format(&self, extra_args: &[&str]) -> Result<String> {
    self.check_shape()?;
    check_extra_args(self.opcode, extra_args)?;
    Err(AsmError::UnsupportedFormat { opcode: self.opcode, format: "P-ISA" })
  }

}

impl Display for CInstruction {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", append_comment(self.tokens.join(", "), &self.comment))
  }
}
