/*!
  The opcode catalog.

  Every concrete instruction kind is a variant of `Opcode`. A variant only declares facts: its
  names in each textual format, its operand counts (execution family) or nothing but a token
  count (memory-movement family, supplied by the `IsaSpec`), and any extra construction-time rule.
  Parsing, validation, and rendering live in `xinst` and `cinst` and are shared by every variant.

  Three names exist per opcode and they need not agree:

    canonical  `Display`/`FromStr`, also the key in the ISA configuration
    P-ISA      the mnemonic in portable kernel listings (`copy`)
    ASM-ISA    the mnemonic emitted for the hardware (`move`)
*/

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{Display as StrumDisplay, EnumIter, EnumString, IntoStaticStr};

#[derive(Clone, Copy, Eq, PartialEq, Debug, Hash)]
pub enum Family {
  /// Fixed-arity compute over register-resident variables.
  Execution,
  /// Transfers between memory tiers, built from raw tokens.
  MemoryMovement,
}

#[derive(
  StrumDisplay, IntoStaticStr, EnumString, EnumIter, Serialize, Deserialize,
  Clone,        Copy,          Eq,         PartialEq, Ord,       PartialOrd,  Debug, Hash
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Opcode {
  // Execution family //
  Copy,   // N, copy, dst (bank), src (bank), res
  Sub,    // N, sub, dst (bank), src0 (bank), src1 (bank), res
  Add,    // N, add, dst (bank), src0 (bank), src1 (bank), res
  XStore, // F<bundle>, id, xstore, src, other...

  // Memory-movement family //
  CLoad,  // line, cload, dst_register, src_spad
  MLoad,  // line, mload, dst_spad, src_hbm
  MStore, // line, mstore, dst_hbm, src_spad
}

impl Opcode {

  pub fn family(&self) -> Family {
    match self {
      Opcode::Copy | Opcode::Sub | Opcode::Add | Opcode::XStore => Family::Execution,
      Opcode::CLoad | Opcode::MLoad | Opcode::MStore => Family::MemoryMovement,
    }
  }

  /// Canonical name.
  pub fn name(&self) -> &'static str {
    self.into()
  }

  /// Mnemonic in P-ISA kernel listings. Memory-movement opcodes and `xstore` only exist in ASM-ISA.
  pub fn pisa_name(&self) -> Option<&'static str> {
    match self {
      Opcode::Copy => Some("copy"),
      Opcode::Sub  => Some("sub"),
      Opcode::Add  => Some("add"),
      _            => None
    }
  }

  /// Mnemonic in the hardware encoding.
  pub fn asm_name(&self) -> &'static str {
    match self {
      Opcode::Copy   => "move",
      Opcode::Sub    => "sub",
      Opcode::Add    => "add",
      Opcode::XStore => "xstore",
      Opcode::CLoad  => "cload",
      Opcode::MLoad  => "mload",
      Opcode::MStore => "mstore",
    }
  }

  /// Fixed destination count, `None` for the token-based memory-movement family.
  pub fn num_dests(&self) -> Option<usize> {
    match self {
      Opcode::XStore                          => Some(0),
      Opcode::Copy | Opcode::Sub | Opcode::Add => Some(1),
      _                                       => None
    }
  }

  /// Fixed source count, `None` for the token-based memory-movement family.
  pub fn num_sources(&self) -> Option<usize> {
    match self {
      Opcode::Copy | Opcode::XStore => Some(1),
      Opcode::Sub | Opcode::Add    => Some(2),
      _                            => None
    }
  }

  /// Source and destination must name different variables.
  pub fn forbids_aliasing(&self) -> bool {
    *self == Opcode::Copy
  }

  /// Whether the ring size `N` means anything for this opcode. When it does not, it is stored as 0.
  pub fn uses_ring_size(&self) -> bool {
    matches!(self, Opcode::Sub | Opcode::Add)
  }

  /// Whether the residual field is carried into the ASM-ISA line.
  pub fn emits_residual(&self) -> bool {
    matches!(self, Opcode::Sub | Opcode::Add)
  }

  /**
    Token count of an ASM-ISA line as this crate lays it out: bundle, id, mnemonic, the operands,
    and the residual where one is carried. `None` for the memory-movement family, whose count
    comes from the `IsaSpec` alone.
  */
  pub fn asm_layout_tokens(&self) -> Option<usize> {
    let dests = self.num_dests()?;
    let sources = self.num_sources()?;
    Some(3 + dests + sources + usize::from(self.emits_residual()))
  }

  pub fn from_pisa_name(name: &str) -> Option<Opcode> {
    Opcode::iter().find(|op| op.pisa_name() == Some(name))
  }

  pub fn from_asm_name(name: &str) -> Option<Opcode> {
    Opcode::iter().find(|op| op.asm_name() == name)
  }

}
