/*!
  The instruction object model.

  Two families share one protocol (parse from text, construct with validation, emit in either
  encoding):

    `XInstruction`  execution family, fixed operand counts, immutable
    `CInstruction`  memory-movement family, raw token list with named, mutable slots

  `Instruction` wraps both so a driver can handle a listing without caring which family a line
  belongs to. The opcode of a line is found from its mnemonic token; every concrete opcode is a
  variant of the closed `Opcode` catalog.
*/

mod cinst;
mod opcode;
mod tokenizer;
mod xinst;

pub use cinst::CInstruction;
pub use opcode::{Family, Opcode};
pub use tokenizer::{
  parse_bundle, parse_operand, tokenize, tokenize_with, Operand, Syntax, DEFAULT_SYNTAX
};
pub use xinst::{parse_asm_line, parse_pisa_line, AsmRecord, PisaRecord, XInstruction, XParams};

use std::fmt::{Display, Formatter};

#[cfg(feature = "trace_translation")]
use tracing::trace;
use tracing::debug;

use crate::error::{AsmError, Result, TokenCountWarning};
use crate::isa::IsaSpec;
use crate::variable::VariableRegistry;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Instruction {
  X(XInstruction),
  C(CInstruction),
}

fn mnemonic_at(tokens: &[String], position: usize, line: &str) -> Result<String> {
  tokens.get(position)
        .cloned()
        .ok_or_else(|| AsmError::UnknownOpcode(line.trim().to_string()))
}

impl Instruction {

  /// Parses and builds one P-ISA line. Only execution opcodes appear in P-ISA kernels.
  pub fn from_pisa_line(
    isa      : &IsaSpec,
    registry : &mut dyn VariableRegistry,
    id       : u64,
    line     : &str
  ) -> Result<Instruction>
  {
    let (tokens, _) = tokenize(line);
    let mnemonic = mnemonic_at(&tokens, 1, line)?;
    let opcode = Opcode::from_pisa_name(&mnemonic).ok_or(AsmError::UnknownOpcode(mnemonic))?;

    let record = parse_pisa_line(isa, opcode, line)?;
    Ok(Instruction::X(XInstruction::from_pisa_record(isa, registry, opcode, id, &record)?))
  }

  /**
    Parses and builds one ASM-ISA line of either family. Memory-movement lines carry their mnemonic
    in the second token, execution lines in the third, after the bundle and info tokens.
  */
  pub fn from_asm_line(
    isa      : &IsaSpec,
    registry : &mut dyn VariableRegistry,
    line     : &str
  ) -> Result<Instruction>
  {
    let (tokens, _) = tokenize(line);

    let second = mnemonic_at(&tokens, 1, line)?;
    if let Some(opcode) = Opcode::from_asm_name(&second) {
      if opcode.family() == Family::MemoryMovement {
        return Ok(Instruction::C(CInstruction::from_asm_line(isa, opcode, line)?));
      }
    }

    let third = mnemonic_at(&tokens, 2, line)?;
    match Opcode::from_asm_name(&third) {
      Some(opcode) if opcode.family() == Family::Execution => {
        let record = parse_asm_line(isa, opcode, line)?;
        Ok(Instruction::X(XInstruction::from_asm_record(isa, registry, opcode, &record)?))
      }
      _ => Err(AsmError::UnknownOpcode(third))
    }
  }

  pub fn opcode(&self) -> Opcode {
    match self {
      Instruction::X(inst) => inst.opcode(),
      Instruction::C(inst) => inst.opcode(),
    }
  }

  pub fn family(&self) -> Family {
    self.opcode().family()
  }

  pub fn comment(&self) -> &str {
    match self {
      Instruction::X(inst) => inst.comment(),
      Instruction::C(inst) => inst.comment(),
    }
  }

  pub fn throughput(&self) -> u32 {
    match self {
      Instruction::X(inst) => inst.throughput(),
      Instruction::C(inst) => inst.throughput(),
    }
  }

  pub fn latency(&self) -> u32 {
    match self {
      Instruction::X(inst) => inst.latency(),
      Instruction::C(inst) => inst.latency(),
    }
  }

  /// Token-count diagnostics reported while parsing the source line.
  pub fn warnings(&self) -> &[TokenCountWarning] {
    match self {
      Instruction::X(inst) => inst.warnings(),
      Instruction::C(inst) => inst.warnings(),
    }
  }

  pub fn to_pisa_format(&self, extra_args: &[&str]) -> Result<String> {
    match self {
      Instruction::X(inst) => inst.to_pisa_format(extra_args),
      Instruction::C(inst) => inst.to_pisa_format(extra_args),
    }
  }

  pub fn to_asm_format(&self, extra_args: &[&str]) -> Result<String> {
    match self {
      Instruction::X(inst) => inst.to_asm_format(extra_args),
      Instruction::C(inst) => inst.to_asm_format(extra_args),
    }
  }

}

/// Writes the ASM-ISA line.
impl Display for Instruction {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      Instruction::X(inst) => write!(f, "{}", inst.asm_line()),
      Instruction::C(inst) => write!(f, "{}", inst),
    }
  }
}

/// The output of `translate_kernel`.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Translation {
  pub lines: Vec<String>,
  /// Token-count diagnostics paired with the 1-based kernel line they came from.
  pub warnings: Vec<(usize, TokenCountWarning)>,
}

/**
  Translates a P-ISA listing into ASM-ISA lines. Blank and comment-only lines are skipped;
  instruction ids follow the order of the remaining lines. Errors and warnings carry the 1-based
  line number.
*/
pub fn translate_kernel(isa: &IsaSpec, registry: &mut dyn VariableRegistry, text: &str)
  -> Result<Translation>
{
  let mut output = Translation::default();
  let mut next_id: u64 = 0;

  for (index, line) in text.lines().enumerate() {
    let (tokens, _) = tokenize(line);
    if tokens.is_empty() {
      continue;
    }

    let inst = Instruction::from_pisa_line(isa, registry, next_id, line)
      .map_err(|e| e.at_line(index + 1))?;
    let asm = inst.to_asm_format(&[]).map_err(|e| e.at_line(index + 1))?;
    #[cfg(feature = "trace_translation")]
    trace!("{} => {}", line.trim(), asm);

    output.warnings.extend(inst.warnings().iter().map(|warning| (index + 1, *warning)));
    output.lines.push(asm);
    next_id += 1;
  }

  debug!(
    "translated {} instructions with {} warnings",
    output.lines.len(), output.warnings.len()
  );
  Ok(output)
}
