/*!
  Execution-family instructions: fixed-arity compute over register-resident variables.

  The two encodings of an execution instruction are

    P-ISA    N, <pisa_name>, dst (bank), ..., src (bank), ..., residual [# comment]
    ASM-ISA  F<bundle>, <id>, <asm_name>, dst, ..., src, ... [, residual] [, other ...] [# comment]

  Operand slots are sliced out of the token list using the opcode's fixed destination and source
  counts. Opcodes such as `xstore` have no destinations at all. The total token count of each
  encoding comes from the `IsaSpec`; lines that are short or long are handled by its
  `TokenCountPolicy`, and the resulting warnings stay attached to the instruction. When a line is short, the missing operand slots are `None` in the
  parsed record so the absence survives until construction, which rejects it.

  Instances are immutable once built.
*/

use std::fmt::{Display, Formatter};

use tracing::debug;

use super::opcode::{Family, Opcode};
use super::tokenizer::{expect_mnemonic, parse_bundle, parse_operand, parse_uint, tokenize, Operand};
use crate::error::{AsmError, Result, TokenCountWarning};
use crate::isa::{Encoding, IsaSpec};
use crate::variable::{VarRef, VariableRegistry};

/// Index of the first operand token in a P-ISA line.
const PISA_PARAMS_START: usize = 2;
/// Index of the first operand token in an ASM-ISA line.
const ASM_PARAMS_START: usize = 3;

/// Fields recovered from a P-ISA line.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct PisaRecord {
  /// Leading field of the line: the ring size `N = log2(PMD)`.
  pub n: u32,
  pub op_name: String,
  pub dests: Vec<Option<Operand>>,
  pub sources: Vec<Option<Operand>>,
  /// Reserved trailing field. Required to exist, never interpreted here.
  pub residual: Option<String>,
  pub comment: String,
  pub warnings: Vec<TokenCountWarning>,
}

/// Fields recovered from an ASM-ISA line.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct AsmRecord {
  pub bundle: u32,
  pub info: String,
  pub op_name: String,
  pub dests: Vec<Option<String>>,
  pub sources: Vec<Option<String>>,
  /// Every token after the operands, in order. For sub/add the first one is the residual.
  pub other: Vec<String>,
  pub comment: String,
  pub warnings: Vec<TokenCountWarning>,
}

/// Arguments to `XInstruction::new`. Timings left as `None` take the opcode defaults.
#[derive(Clone, Debug, Default)]
pub struct XParams {
  pub id: u64,
  pub ring_size: u32,
  pub bundle: u32,
  pub dests: Vec<VarRef>,
  pub sources: Vec<VarRef>,
  pub residual: Option<String>,
  /// Trailing ASM-ISA tokens carried through verbatim.
  pub other: Vec<String>,
  pub throughput: Option<u32>,
  pub latency: Option<u32>,
  pub comment: String,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct XInstruction {
  opcode: Opcode,
  id: u64,
  ring_size: u32,
  bundle: u32,
  dests: Vec<VarRef>,
  sources: Vec<VarRef>,
  residual: Option<String>,
  other: Vec<String>,
  throughput: u32,
  latency: u32,
  comment: String,
  warnings: Vec<TokenCountWarning>,
}

/// Destination and source counts of an execution opcode.
fn fixed_arity(opcode: Opcode, format: &'static str) -> Result<(usize, usize)> {
  match (opcode.family(), opcode.num_dests(), opcode.num_sources()) {
    (Family::Execution, Some(dests), Some(sources)) => Ok((dests, sources)),
    _ => Err(AsmError::UnsupportedFormat { opcode, format })
  }
}

fn check_operands(opcode: Opcode, role: &'static str, expected: usize, operands: &[VarRef])
  -> Result<()>
{
  match operands.len() == expected {
    true  => Ok(()),
    false => Err(AsmError::WrongArity { opcode, role, expected, found: operands.len() })
  }
}

pub(crate) fn check_extra_args(opcode: Opcode, extra_args: &[&str]) -> Result<()> {
  match extra_args.is_empty() {
    true  => Ok(()),
    false => Err(AsmError::UnsupportedArguments {
      opcode,
      args: extra_args.iter().map(|arg| arg.to_string()).collect()
    })
  }
}

pub(crate) fn append_comment(mut line: String, comment: &str) -> String {
  if !comment.is_empty() {
    line.push_str(" # ");
    line.push_str(comment);
  }
  line
}

/// Collects `count` slots starting at `start`, `None` where the line ran out of tokens.
fn slots<T, F>(tokens: &[String], start: usize, count: usize, parse: F) -> Result<Vec<Option<T>>>
  where F: Fn(&str) -> Result<T>
{
  (start..start + count)
    .map(|index| tokens.get(index).map(|token| parse(token.as_str())).transpose())
    .collect()
}

fn require<T: Clone>(opcode: Opcode, role: &'static str, slots: &[Option<T>]) -> Result<Vec<T>> {
  slots.iter()
       .enumerate()
       .map(|(slot, value)| value.clone().ok_or(AsmError::MissingOperand { opcode, role, slot }))
       .collect()
}

/**
  Parses a P-ISA line for `opcode`.

  Example line: `13, copy, output_0_1_3 (2), c_0_1_3 (0), 0`
*/
pub fn parse_pisa_line(isa: &IsaSpec, opcode: Opcode, line: &str) -> Result<PisaRecord> {
  let (num_dests, num_sources) = fixed_arity(opcode, "P-ISA")?;
  let pisa_name = opcode.pisa_name().ok_or(AsmError::UnsupportedFormat { opcode, format: "P-ISA" })?;

  let (tokens, comment) = tokenize(line);
  expect_mnemonic(&tokens, 1, pisa_name)?;
  let warnings: Vec<TokenCountWarning> =
    isa.check_token_count(opcode, Encoding::Pisa, tokens.len())?.into_iter().collect();

  let params_end = PISA_PARAMS_START + num_dests + num_sources;
  let record = PisaRecord {
    n: parse_uint("ring size", &tokens[0])?,
    op_name: tokens[1].clone(),
    dests: slots(&tokens, PISA_PARAMS_START, num_dests, parse_operand)?,
    sources: slots(&tokens, PISA_PARAMS_START + num_dests, num_sources, parse_operand)?,
    residual: tokens.get(params_end).cloned(),
    comment,
    warnings
  };
  debug!("parsed P-ISA \"{}\": {:?}", opcode, record);
  Ok(record)
}

/**
  Parses an ASM-ISA line for `opcode`, the direction used by the linker.

  Example lines: `F3, 12, sub, d, a, b, 0` and `F3, 13, xstore, d`
*/
pub fn parse_asm_line(isa: &IsaSpec, opcode: Opcode, line: &str) -> Result<AsmRecord> {
  let (num_dests, num_sources) = fixed_arity(opcode, "ASM-ISA")?;

  let (tokens, comment) = tokenize(line);
  expect_mnemonic(&tokens, 2, opcode.asm_name())?;
  let warnings: Vec<TokenCountWarning> =
    isa.check_token_count(opcode, Encoding::Asm, tokens.len())?.into_iter().collect();

  let name = |token: &str| -> Result<String> { Ok(token.to_string()) };
  let params_end = ASM_PARAMS_START + num_dests + num_sources;
  let record = AsmRecord {
    bundle: parse_bundle(&tokens[0])?,
    info: tokens[1].clone(),
    op_name: tokens[2].clone(),
    dests: slots(&tokens, ASM_PARAMS_START, num_dests, name)?,
    sources: slots(&tokens, ASM_PARAMS_START + num_dests, num_sources, name)?,
    other: tokens.get(params_end..).map(<[String]>::to_vec).unwrap_or_default(),
    comment,
    warnings
  };
  debug!("parsed ASM-ISA \"{}\": {:?}", opcode, record);
  Ok(record)
}

impl XInstruction {

  pub fn new(isa: &IsaSpec, opcode: Opcode, params: XParams) -> Result<XInstruction> {
    let (num_dests, num_sources) = fixed_arity(opcode, "execution")?;
    let entry = isa.describe(opcode)?;

    check_operands(opcode, "destination", num_dests, &params.dests)?;
    check_operands(opcode, "source", num_sources, &params.sources)?;

    if opcode.forbids_aliasing() {
      let aliased = params.dests.iter().find(
        |dst| params.sources.iter().any(|src| src.name == dst.name)
      );
      if let Some(dst) = aliased {
        return Err(AsmError::Aliasing { opcode, name: dst.name.to_string() });
      }
    }

    Ok(XInstruction {
      opcode,
      id: params.id,
      ring_size: match opcode.uses_ring_size() {
        true  => params.ring_size,
        false => 0
      },
      bundle: params.bundle,
      dests: params.dests,
      sources: params.sources,
      residual: params.residual,
      other: params.other,
      throughput: params.throughput.unwrap_or(entry.default_throughput),
      latency: params.latency.unwrap_or(entry.default_latency),
      comment: params.comment,
      warnings: Vec::new(),
    })
  }

  /// Builds an instruction from a parsed P-ISA line, resolving operand names through `registry`.
  pub fn from_pisa_record(
    isa      : &IsaSpec,
    registry : &mut dyn VariableRegistry,
    opcode   : Opcode,
    id       : u64,
    record   : &PisaRecord
  ) -> Result<XInstruction>
  {
    let pisa_name = opcode.pisa_name().ok_or(AsmError::UnsupportedFormat { opcode, format: "P-ISA" })?;
    if record.op_name != pisa_name {
      return Err(AsmError::MnemonicMismatch { expected: pisa_name, found: record.op_name.clone() });
    }

    let mut resolve = |operands: Vec<Operand>| -> Result<Vec<VarRef>> {
      operands.iter().map(|op| registry.resolve(&op.name, op.bank)).collect()
    };
    let dests   = resolve(require(opcode, "destination", &record.dests)?)?;
    let sources = resolve(require(opcode, "source", &record.sources)?)?;

    let mut inst = XInstruction::new(isa, opcode, XParams {
      id,
      ring_size: record.n,
      dests,
      sources,
      residual: record.residual.clone(),
      comment: record.comment.clone(),
      ..XParams::default()
    })?;
    inst.warnings = record.warnings.clone();
    Ok(inst)
  }

  /// Builds an instruction from a parsed ASM-ISA line. The info token is read back as the id.
  pub fn from_asm_record(
    isa      : &IsaSpec,
    registry : &mut dyn VariableRegistry,
    opcode   : Opcode,
    record   : &AsmRecord
  ) -> Result<XInstruction>
  {
    if record.op_name != opcode.asm_name() {
      return Err(AsmError::MnemonicMismatch {
        expected: opcode.asm_name(),
        found: record.op_name.clone()
      });
    }

    let mut resolve = |names: Vec<String>| -> Result<Vec<VarRef>> {
      names.iter().map(|name| registry.resolve(name, None)).collect()
    };
    let dests   = resolve(require(opcode, "destination", &record.dests)?)?;
    let sources = resolve(require(opcode, "source", &record.sources)?)?;

    let mut other = record.other.clone();
    let residual = match opcode.emits_residual() && !other.is_empty() {
      true  => Some(other.remove(0)),
      false => None
    };

    let mut inst = XInstruction::new(isa, opcode, XParams {
      id: parse_uint("info", &record.info)? as u64,
      bundle: record.bundle,
      dests,
      sources,
      residual,
      other,
      comment: record.comment.clone(),
      ..XParams::default()
    })?;
    inst.warnings = record.warnings.clone();
    Ok(inst)
  }

  // region Accessors

  pub fn opcode(&self) -> Opcode {
    self.opcode
  }

  pub fn name(&self) -> &'static str {
    self.opcode.name()
  }

  pub fn id(&self) -> u64 {
    self.id
  }

  pub fn ring_size(&self) -> u32 {
    self.ring_size
  }

  pub fn bundle(&self) -> u32 {
    self.bundle
  }

  pub fn dests(&self) -> &[VarRef] {
    &self.dests
  }

  pub fn sources(&self) -> &[VarRef] {
    &self.sources
  }

  pub fn residual(&self) -> Option<&str> {
    self.residual.as_deref()
  }

  pub fn other(&self) -> &[String] {
    &self.other
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

  /// Token-count diagnostics from the line this instruction was parsed from.
  pub fn warnings(&self) -> &[TokenCountWarning] {
    &self.warnings
  }

  // endregion

  // region Emission

  /// Operand counts must still match the opcode. Fails if the shape was changed behind the
  /// constructor's back.
  fn check_shape(&self) -> Result<()> {
    let (num_dests, num_sources) = fixed_arity(self.opcode, "execution")?;
    match self.dests.len() == num_dests && self.sources.len() == num_sources {
      true  => Ok(()),
      false => Err(AsmError::EmitArity {
        opcode: self.opcode,
        detail: format!(
          "{} destinations and {} sources, expected {} and {}",
          self.dests.len(), self.sources.len(), num_dests, num_sources
        )
      })
    }
  }

  /// Trailing `other` tokens only exist in ASM-ISA and are not written here.
  pub fn to_pisa_format(&self, extra_args: &[&str]) -> Result<String> {
    self.check_shape()?;
    check_extra_args(self.opcode, extra_args)?;
    let pisa_name =
      self.opcode.pisa_name().ok_or(AsmError::UnsupportedFormat { opcode: self.opcode, format: "P-ISA" })?;

    let mut fields = vec![self.ring_size.to_string(), pisa_name.to_string()];
    fields.extend(self.dests.iter().chain(self.sources.iter()).map(|var| var.to_string()));
    fields.extend(self.residual.iter().cloned());

    Ok(append_comment(fields.join(", "), &self.comment))
  }

  pub fn to_asm_format(&self, extra_args: &[&str]) -> Result<String> {
    self.check_shape()?;
    check_extra_args(self.opcode, extra_args)?;
    Ok(self.asm_line())
  }

  /// The ASM-ISA line without the shape checks.
  pub(crate) fn asm_line(&self) -> String {
    let mut fields = vec![
      format!("F{}", self.bundle),
      self.id.to_string(),
      self.opcode.asm_name().to_string()
    ];
    fields.extend(self.dests.iter().chain(self.sources.iter()).map(|var| var.name.to_string()));
    if self.opcode.emits_residual() {
      fields.extend(self.residual.iter().cloned());
    }
    fields.extend(self.other.iter().cloned());

    append_comment(fields.join(", "), &self.comment)
  }

  // endregion
}

impl Display for XInstruction {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    let names = |vars: &[VarRef]| {
      vars.iter().map(|v| v.name.to_string()).collect::<Vec<String>>().join(", ")
    };
    write!(
      f,
      "<{}({})>(id={}, dst=[{}], src=[{}], throughput={}, latency={})",
      self.opcode, self.opcode.asm_name(), self.id,
      names(&self.dests), names(&self.sources), self.throughput, self.latency
    )
  }
}
