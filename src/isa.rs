/*!
  The ISA specification binding: per-opcode structural parameters.

  An `IsaSpec` is built once during startup, either programmatically or from the JSON produced by
  the external ISA configuration loader, and is then passed by reference to every parse and
  construct call. Nothing reads it through global state, so tests can run side by side with
  different configurations.

  Destination and source counts of execution opcodes are fixed by the opcode itself. Binding an
  entry always normalizes them to the opcode's declared values, so the table only really
  configures the token counts and the default timings.

  Each encoding is checked against its own count. `num_tokens` is the count the ISA configuration
  declares; it governs P-ISA lines and memory-movement lines. ASM-ISA lines of the execution family
  are checked against `num_asm_tokens`, which defaults to the layout the emitter writes, so every
  emitted line parses back under any policy.
*/

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use lazy_static::lazy_static;
use prettytable::{format as TableFormat, row, Table};
use serde::{Deserialize, Serialize};
use strum_macros::Display as StrumDisplay;
use tracing::{debug, warn};

use crate::error::{AsmError, Result, TokenCountWarning};
use crate::instructions::Opcode;

/// What to do when a line has more or fewer tokens than its opcode declares.
#[derive(Clone, Copy, Eq, PartialEq, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenCountPolicy {
  Ignore,
  /// Log and report the mismatch but keep going. Tolerated while kernels are being brought up.
  #[default]
  Warn,
  Fail,
}

/// The two textual encodings of an instruction.
#[derive(StrumDisplay, Clone, Copy, Eq, PartialEq, Debug, Hash)]
pub enum Encoding {
  #[strum(serialize = "P-ISA")]
  Pisa,
  #[strum(serialize = "ASM-ISA")]
  Asm,
}

#[derive(Clone, Copy, Eq, PartialEq, Debug, Serialize, Deserialize)]
pub struct IsaEntry {
  pub num_tokens: usize,
  /// Overrides the ASM-ISA count of an execution opcode.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub num_asm_tokens: Option<usize>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub num_dests: Option<usize>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub num_sources: Option<usize>,
  #[serde(default = "default_timing")]
  pub default_throughput: u32,
  #[serde(default = "default_timing")]
  pub default_latency: u32,
}

fn default_timing() -> u32 {
  1
}

impl IsaEntry {
  /// An entry with the opcode's fixed operand counts and unit timings.
  pub fn for_opcode(opcode: Opcode, num_tokens: usize) -> IsaEntry {
    IsaEntry {
      num_tokens,
      num_asm_tokens: None,
      num_dests: opcode.num_dests(),
      num_sources: opcode.num_sources(),
      default_throughput: default_timing(),
      default_latency: default_timing(),
    }
  }

  /// Expected token count of a line of `opcode` in `encoding`.
  pub fn expected_tokens(&self, opcode: Opcode, encoding: Encoding) -> usize {
    match encoding {
      Encoding::Pisa => self.num_tokens,
      Encoding::Asm  => self.num_asm_tokens
                            .or_else(|| opcode.asm_layout_tokens())
                            .unwrap_or(self.num_tokens)
    }
  }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct IsaSpec {
  #[serde(default)]
  policy: TokenCountPolicy,
  entries: BTreeMap<Opcode, IsaEntry>,
}

impl IsaSpec {

  pub fn new(policy: TokenCountPolicy) -> IsaSpec {
    IsaSpec {
      policy,
      entries: BTreeMap::new()
    }
  }

  pub fn policy(&self) -> TokenCountPolicy {
    self.policy
  }

  pub fn set_policy(&mut self, policy: TokenCountPolicy) {
    self.policy = policy;
  }

  /// Sets the declared number of tokens in one line of `opcode`, counting the leading field, the
  /// mnemonic, the operands, and any trailing residual. P-ISA and memory-movement lines are checked
  /// against it. Creates the entry if needed.
  pub fn set_token_count(&mut self, opcode: Opcode, num_tokens: usize) {
    self.entries
        .entry(opcode)
        .and_modify(|entry| entry.num_tokens = num_tokens)
        .or_insert_with(|| IsaEntry::for_opcode(opcode, num_tokens));
  }

  /// Overrides the ASM-ISA token count of an already bound execution opcode.
  pub fn set_asm_token_count(&mut self, opcode: Opcode, num_tokens: usize) -> Result<()> {
    let entry = self.entries.get_mut(&opcode).ok_or(AsmError::UnboundOpcode(opcode))?;
    entry.num_asm_tokens = Some(num_tokens);
    Ok(())
  }

  pub fn set_timing(&mut self, opcode: Opcode, throughput: u32, latency: u32) -> Result<()> {
    let entry = self.entries.get_mut(&opcode).ok_or(AsmError::UnboundOpcode(opcode))?;
    entry.default_throughput = throughput;
    entry.default_latency    = latency;
    Ok(())
  }

  /// Binds (or rebinds) the full entry for `opcode`.
  pub fn bind(&mut self, opcode: Opcode, mut entry: IsaEntry) {
    let declared = (opcode.num_dests(), opcode.num_sources());
    let given    = (entry.num_dests, entry.num_sources);
    // Omitted counts are filled in silently; contradicting ones are overridden loudly.
    if given != (None, None) && given != declared {
      warn!(
        "ISA entry for \"{}\" declares {:?} dests and {:?} sources; using the opcode's {:?} and {:?}",
        opcode, given.0, given.1, declared.0, declared.1
      );
    }
    entry.num_dests   = declared.0;
    entry.num_sources = declared.1;
    debug!("binding \"{}\": {:?}", opcode, entry);
    self.entries.insert(opcode, entry);
  }

  pub fn describe(&self, opcode: Opcode) -> Result<&IsaEntry> {
    self.entries.get(&opcode).ok_or(AsmError::UnboundOpcode(opcode))
  }

  pub fn num_tokens(&self, opcode: Opcode, encoding: Encoding) -> Result<usize> {
    self.describe(opcode).map(|entry| entry.expected_tokens(opcode, encoding))
  }

  pub fn entries(&self) -> impl Iterator<Item = (&Opcode, &IsaEntry)> {
    self.entries.iter()
  }

  /**
    Applies the token-count policy to a line of `found` tokens in `encoding`. Returns the warning
    to report, if any, or an error when the policy is `Fail`.
  */
  pub fn check_token_count(&self, opcode: Opcode, encoding: Encoding, found: usize)
    -> Result<Option<TokenCountWarning>>
  {
    let expected = self.num_tokens(opcode, encoding)?;
    let warning =
      match found {
        n if n < expected => TokenCountWarning::Missing { opcode, expected, found },
        n if n > expected => TokenCountWarning::Extra { opcode, expected, found },
        _ => return Ok(None)
      };

    match self.policy {
      TokenCountPolicy::Ignore => Ok(None),
      TokenCountPolicy::Warn => {
        warn!("{}", warning);
        Ok(Some(warning))
      }
      TokenCountPolicy::Fail => Err(AsmError::TokenCount { opcode, expected, found }),
    }
  }

  pub fn from_json(text: &str) -> Result<IsaSpec> {
    let parsed: IsaSpec = serde_json::from_str(text)?;
    let mut spec = IsaSpec::new(parsed.policy);
    for (opcode, entry) in parsed.entries {
      spec.bind(opcode, entry);
    }
    Ok(spec)
  }

  pub fn to_json(&self) -> Result<String> {
    Ok(serde_json::to_string_pretty(self)?)
  }

}

fn fmt_count(count: Option<usize>) -> String {
  match count {
    Some(n) => n.to_string(),
    None    => "-".to_string()
  }
}

impl Display for IsaSpec {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    let mut table = Table::new();

    table.set_format(*TABLE_DISPLAY_FORMAT);
    table.set_titles(row![
      ubl->"Opcode", ubl->"P-ISA", ubl->"ASM-ISA", ubr->"Tokens", ubr->"ASM tokens",
      ubr->"Dests", ubr->"Sources", ubr->"Throughput", ubr->"Latency"
    ]);

    for (opcode, entry) in self.entries.iter() {
      table.add_row(row![
        opcode.name(),
        opcode.pisa_name().unwrap_or("-"),
        opcode.asm_name(),
        r->entry.num_tokens,
        r->entry.expected_tokens(*opcode, Encoding::Asm),
        r->fmt_count(entry.num_dests),
        r->fmt_count(entry.num_sources),
        r->entry.default_throughput,
        r->entry.default_latency
      ]);
    }

    write!(f, "Token count policy: {:?}\n{}", self.policy, table)
  }
}


lazy_static! {
  static ref TABLE_DISPLAY_FORMAT: TableFormat::TableFormat =
    TableFormat::FormatBuilder::new()
      .column_separator('│')
      .borders(' ')
      .separator(
        TableFormat::LinePosition::Title,
        TableFormat::LineSeparator::new('─', '┼', ' ', ' ')
      )
      .padding(1, 1)
      .build();
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn token_count_creates_entry(){
    let mut isa = IsaSpec::default();
    assert!(matches!(isa.describe(Opcode::Sub), Err(AsmError::UnboundOpcode(Opcode::Sub))));

    isa.set_token_count(Opcode::Sub, 7);
    let entry = isa.describe(Opcode::Sub).unwrap();
    assert_eq!(entry.num_tokens, 7);
    assert_eq!(entry.num_dests, Some(1));
    assert_eq!(entry.num_sources, Some(2));
    assert_eq!(entry.default_throughput, 1);
  }

  #[test]
  fn rebinding_overwrites(){
    let mut isa = IsaSpec::default();
    isa.set_token_count(Opcode::Copy, 6);
    isa.set_timing(Opcode::Copy, 2, 5).unwrap();
    isa.set_token_count(Opcode::Copy, 5);

    let entry = isa.describe(Opcode::Copy).unwrap();
    assert_eq!(entry.num_tokens, 5);
    assert_eq!(entry.default_latency, 5);
  }

  #[test]
  fn timing_requires_binding(){
    let mut isa = IsaSpec::default();
    assert!(isa.set_timing(Opcode::CLoad, 1, 4).is_err());
  }

  #[test]
  fn bind_normalizes_counts(){
    let mut isa = IsaSpec::default();
    let mut entry = IsaEntry::for_opcode(Opcode::Add, 7);
    entry.num_sources = Some(3);
    isa.bind(Opcode::Add, entry);
    assert_eq!(isa.describe(Opcode::Add).unwrap().num_sources, Some(2));
  }

  #[test]
  fn policy_applied_to_counts(){
    let mut isa = IsaSpec::new(TokenCountPolicy::Warn);
    isa.set_token_count(Opcode::Copy, 6);

    assert_eq!(isa.check_token_count(Opcode::Copy, Encoding::Pisa, 6).unwrap(), None);
    assert!(matches!(
      isa.check_token_count(Opcode::Copy, Encoding::Pisa, 5).unwrap(),
      Some(TokenCountWarning::Missing { expected: 6, found: 5, .. })
    ));
    assert!(matches!(
      isa.check_token_count(Opcode::Copy, Encoding::Pisa, 7).unwrap(),
      Some(TokenCountWarning::Extra { expected: 6, found: 7, .. })
    ));

    isa.set_policy(TokenCountPolicy::Ignore);
    assert_eq!(isa.check_token_count(Opcode::Copy, Encoding::Pisa, 5).unwrap(), None);

    isa.set_policy(TokenCountPolicy::Fail);
    assert!(matches!(
      isa.check_token_count(Opcode::Copy, Encoding::Pisa, 5),
      Err(AsmError::TokenCount { expected: 6, found: 5, .. })
    ));
  }

  #[test]
  fn each_encoding_has_its_own_count(){
    let mut isa = IsaSpec::new(TokenCountPolicy::Fail);
    isa.set_token_count(Opcode::Copy, 6);
    isa.set_token_count(Opcode::CLoad, 4);

    // `move` lines are written as bundle, id, mnemonic, dst, src.
    assert_eq!(isa.num_tokens(Opcode::Copy, Encoding::Pisa).unwrap(), 6);
    assert_eq!(isa.num_tokens(Opcode::Copy, Encoding::Asm).unwrap(), 5);
    assert_eq!(isa.check_token_count(Opcode::Copy, Encoding::Asm, 5).unwrap(), None);
    assert_eq!(isa.num_tokens(Opcode::CLoad, Encoding::Asm).unwrap(), 4);

    isa.set_asm_token_count(Opcode::Copy, 6).unwrap();
    assert!(isa.check_token_count(Opcode::Copy, Encoding::Asm, 5).is_err());
    assert!(isa.set_asm_token_count(Opcode::Add, 7).is_err());
  }

  #[test]
  fn json_configuration(){
    let text = r#"{
      "policy": "fail",
      "entries": {
        "copy":  { "num_tokens": 6, "default_throughput": 1, "default_latency": 6 },
        "cload": { "num_tokens": 4, "default_latency": 4 }
      }
    }"#;
    let isa = IsaSpec::from_json(text).unwrap();

    assert_eq!(isa.policy(), TokenCountPolicy::Fail);
    let copy = isa.describe(Opcode::Copy).unwrap();
    assert_eq!(copy.num_dests, Some(1));
    assert_eq!(copy.num_sources, Some(1));
    assert_eq!(copy.default_latency, 6);
    let cload = isa.describe(Opcode::CLoad).unwrap();
    assert_eq!(cload.num_dests, None);
    assert_eq!(cload.default_throughput, 1);

    let dumped = IsaSpec::from_json(&isa.to_json().unwrap()).unwrap();
    assert_eq!(dumped.describe(Opcode::Copy).unwrap(), copy);
    assert_eq!(dumped.describe(Opcode::CLoad).unwrap(), cload);
  }

  #[test]
  fn bad_json_is_a_config_error(){
    assert!(matches!(IsaSpec::from_json("{ \"entries\": { \"mul\": {} } }"), Err(AsmError::Config(_))));
  }

  #[test]
  fn table_lists_bound_opcodes(){
    let mut isa = IsaSpec::default();
    isa.set_token_count(Opcode::Copy, 6);
    let text = format!("{}", isa);
    assert!(text.contains("move"));
    assert!(text.contains("copy"));
    assert!(!text.contains("mstore"));
  }

}
