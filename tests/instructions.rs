use hec_asm::instructions::{parse_pisa_line, Operand};
use hec_asm::{
  AsmError, CInstruction, Instruction, IsaSpec, Opcode, TokenCountPolicy, TokenCountWarning,
  Variable, VarRef, VariableTable, XInstruction, XParams,
};
use test_case::test_case;

fn isa(policy: TokenCountPolicy) -> IsaSpec {
  let mut isa = IsaSpec::new(policy);
  isa.set_token_count(Opcode::Copy, 6);
  isa.set_token_count(Opcode::Sub, 7);
  isa.set_token_count(Opcode::Add, 7);
  isa.set_token_count(Opcode::CLoad, 4);
  isa.set_token_count(Opcode::MLoad, 4);
  isa.set_token_count(Opcode::MStore, 4);
  isa.set_token_count(Opcode::XStore, 4);
  isa
}

/// P-ISA token counts matching the lines as written, so nothing warns under `Fail`.
fn isa_with_pisa_counts() -> IsaSpec {
  let mut isa = IsaSpec::new(TokenCountPolicy::Fail);
  isa.set_token_count(Opcode::Copy, 5);
  isa.set_token_count(Opcode::Sub, 6);
  isa
}

fn vars(prefix: &str, count: usize) -> Vec<VarRef> {
  (0..count).map(|i| Variable::shared(&format!("{}{}", prefix, i), Some(i as u32))).collect()
}

fn names(vars: &[VarRef]) -> Vec<String> {
  vars.iter().map(|v| v.name.to_string()).collect()
}

#[test]
fn construction_fields_read_back(){
  let mut isa = isa(TokenCountPolicy::Warn);
  isa.set_timing(Opcode::Add, 2, 8).unwrap();

  let dests = vars("d", 1);
  let sources = vars("s", 2);
  let inst = XInstruction::new(&isa, Opcode::Add, XParams {
    id: 31,
    ring_size: 14,
    dests: dests.clone(),
    sources: sources.clone(),
    throughput: Some(3),
    latency: Some(11),
    comment: "accumulate".to_string(),
    ..XParams::default()
  }).unwrap();

  assert_eq!(inst.id(), 31);
  assert_eq!(inst.ring_size(), 14);
  assert_eq!(inst.dests(), &dests[..]);
  assert_eq!(inst.sources(), &sources[..]);
  assert_eq!(inst.throughput(), 3);
  assert_eq!(inst.latency(), 11);
  assert_eq!(inst.comment(), "accumulate");

  let defaulted = XInstruction::new(&isa, Opcode::Add, XParams {
    dests,
    sources,
    ..XParams::default()
  }).unwrap();
  assert_eq!((defaulted.throughput(), defaulted.latency()), (2, 8));
  assert_eq!(defaulted.comment(), "");
}

#[test_case(Opcode::Copy, 0, 1)]
#[test_case(Opcode::Copy, 2, 1)]
#[test_case(Opcode::Copy, 1, 0)]
#[test_case(Opcode::Copy, 1, 2)]
#[test_case(Opcode::Sub,  0, 2)]
#[test_case(Opcode::Sub,  2, 2)]
#[test_case(Opcode::Sub,  1, 1)]
#[test_case(Opcode::Sub,  1, 3)]
#[test_case(Opcode::Add,  1, 0)]
#[test_case(Opcode::Add,  3, 2)]
fn arity_is_enforced(opcode: Opcode, num_dests: usize, num_sources: usize){
  let isa = isa(TokenCountPolicy::Warn);
  let result = XInstruction::new(&isa, opcode, XParams {
    dests: vars("d", num_dests),
    sources: vars("s", num_sources),
    ..XParams::default()
  });
  assert!(matches!(result, Err(AsmError::WrongArity { .. })));
}

#[test_case(Opcode::CLoad, &["5", "cload", "reg0"])]
#[test_case(Opcode::MLoad, &["5", "mload"])]
#[test_case(Opcode::MStore, &[])]
fn token_arity_is_enforced(opcode: Opcode, tokens: &[&str]){
  let isa = isa(TokenCountPolicy::Warn);
  let tokens = tokens.iter().map(|t| t.to_string()).collect();
  assert!(matches!(
    CInstruction::new(&isa, opcode, tokens, ""),
    Err(AsmError::InvalidTokenCount { .. })
  ));
}

#[test]
fn copy_aliasing(){
  let isa = isa(TokenCountPolicy::Warn);
  let same = XInstruction::new(&isa, Opcode::Copy, XParams {
    dests: vec![Variable::shared("x", Some(0))],
    sources: vec![Variable::shared("x", Some(1))],
    ..XParams::default()
  });
  assert!(matches!(same, Err(AsmError::Aliasing { .. })));

  let different = XInstruction::new(&isa, Opcode::Copy, XParams {
    dests: vec![Variable::shared("x", Some(0))],
    sources: vec![Variable::shared("y", Some(1))],
    ..XParams::default()
  });
  assert!(different.is_ok());
}

#[test]
fn one_token_short_or_long(){
  let isa = isa(TokenCountPolicy::Warn);

  let short = parse_pisa_line(&isa, Opcode::Sub, "13, sub, d (0), a (1), b (2)").unwrap();
  assert!(matches!(short.warnings[..], [TokenCountWarning::Missing { expected: 7, found: 5, .. }]));
  assert_eq!(short.dests, vec![Some(Operand::new("d", Some(0)))]);
  assert_eq!(short.residual, None);

  let missing_source = parse_pisa_line(&isa, Opcode::Add, "13, add, d (0), a (1)").unwrap();
  assert_eq!(missing_source.sources, vec![Some(Operand::new("a", Some(1))), None]);

  let long = parse_pisa_line(&isa, Opcode::Copy, "13, copy, o (2), c (0), 0, extra, more").unwrap();
  assert!(matches!(long.warnings[..], [TokenCountWarning::Extra { expected: 6, found: 7, .. }]));
  assert_eq!(long.residual.as_deref(), Some("0"));
  assert_eq!(long.sources, vec![Some(Operand::new("c", Some(0)))]);
}

#[test]
fn policies(){
  let line = "13, sub, d (0), a (1), b (2)";

  let ignored = parse_pisa_line(&isa(TokenCountPolicy::Ignore), Opcode::Sub, line).unwrap();
  assert!(ignored.warnings.is_empty());

  let failed = parse_pisa_line(&isa(TokenCountPolicy::Fail), Opcode::Sub, line);
  assert!(matches!(failed, Err(AsmError::TokenCount { opcode: Opcode::Sub, expected: 7, found: 5 })));
}

#[test]
fn copy_line_scenario(){
  let isa = isa(TokenCountPolicy::Warn);
  let line = "13, copy, output_0_1_3 (2), c_0_1_3 (0), 0";

  let record = parse_pisa_line(&isa, Opcode::Copy, line).unwrap();
  assert_eq!(record.n, 13);
  assert_eq!(record.op_name, "copy");
  assert_eq!(record.dests, vec![Some(Operand::new("output_0_1_3", Some(2)))]);
  assert_eq!(record.sources, vec![Some(Operand::new("c_0_1_3", Some(0)))]);
  assert_eq!(record.comment, "");

  let mut table = VariableTable::new();
  let inst = Instruction::from_pisa_line(&isa, &mut table, 13, line).unwrap();
  let asm = inst.to_asm_format(&[]).unwrap();
  assert_eq!(asm.split(", ").nth(2), Some("move"));

  let aliased = "13, copy, c_0_1_3 (2), c_0_1_3 (0), 0";
  assert!(matches!(
    Instruction::from_pisa_line(&isa, &mut table, 14, aliased),
    Err(AsmError::Aliasing { .. })
  ));
}

#[test]
fn sub_scenario(){
  let isa = isa(TokenCountPolicy::Warn);
  let entry = isa.describe(Opcode::Sub).unwrap();
  assert_eq!((entry.num_tokens, entry.num_dests, entry.num_sources), (7, Some(1), Some(2)));

  let short = XInstruction::new(&isa, Opcode::Sub, XParams {
    dests: vars("d", 1),
    sources: vars("s", 1),
    ..XParams::default()
  });
  assert!(short.is_err());

  let inst = XInstruction::new(&isa, Opcode::Sub, XParams {
    id: 2,
    ring_size: 13,
    dests: vars("d", 1),
    sources: vars("s", 2),
    residual: Some("0".to_string()),
    ..XParams::default()
  }).unwrap();

  let pisa = inst.to_pisa_format(&[]).unwrap();
  let asm = inst.to_asm_format(&[]).unwrap();
  assert_eq!(pisa, "13, sub, d0 (0), s0 (0), s1 (1), 0");
  assert_eq!(asm, "F0, 2, sub, d0, s0, s1, 0");
  for name in names(inst.dests()).iter().chain(names(inst.sources()).iter()) {
    assert!(pisa.contains(name.as_str()));
    assert!(asm.contains(name.as_str()));
  }
}

#[test]
fn cload_scenario(){
  let isa = isa(TokenCountPolicy::Warn);
  let tokens = ["5", "cload", "reg0", "varA"].iter().map(|t| t.to_string()).collect();
  let mut cload = CInstruction::new(&isa, Opcode::CLoad, tokens, "").unwrap();
  assert_eq!(cload.source(), "varA");

  cload.set_source("0x2000");
  let asm = cload.to_asm_format(&[]).unwrap();
  assert_eq!(asm, "5, cload, reg0, 0x2000");
  assert_eq!(asm.split(", ").nth(3), Some("0x2000"));
}

#[test]
fn asm_listing_round_trip(){
  let isa = isa(TokenCountPolicy::Warn);
  let mut table = VariableTable::new();
  let listing = [
    "0, mload, 0, ct0",
    "1, cload, r0b1, 0",
    "F0, 3, sub, t, a, b, 0 # diff",
    "F1, 4, move, out, t",
    "F1, 5, xstore, out",
    "2, mstore, out_hbm, 1",
  ];
  for line in listing.iter() {
    let inst = Instruction::from_asm_line(&isa, &mut table, line).unwrap();
    assert_eq!(&inst.to_asm_format(&[]).unwrap(), line);
  }
}

#[test]
fn emitted_lines_read_back_under_fail(){
  let isa = isa(TokenCountPolicy::Fail);
  let mut table = VariableTable::new();

  let kernel = "13, copy, out (2), t (1), 0";
  let pisa_isa = isa_with_pisa_counts();
  let translation = hec_asm::translate_kernel(&pisa_isa, &mut table, kernel).unwrap();
  assert_eq!(translation.lines, vec!["F0, 0, move, out, t".to_string()]);

  let mut lines = translation.lines.clone();
  lines.push("F3, 1, sub, d, a, b, 0".to_string());
  for line in lines.iter() {
    let inst = Instruction::from_asm_line(&isa, &mut table, line).unwrap();
    assert!(inst.warnings().is_empty());
    assert_eq!(&inst.to_asm_format(&[]).unwrap(), line);
  }
}

#[test]
fn store_line_scenario(){
  let isa = isa(TokenCountPolicy::Warn);
  let mut table = VariableTable::new();
  let line = "F0, 6, xstore, c_0_1_3, 2 # drain";

  let inst = Instruction::from_asm_line(&isa, &mut table, line).unwrap();
  assert_eq!(inst.opcode(), Opcode::XStore);
  assert!(matches!(inst.warnings(), [TokenCountWarning::Extra { expected: 4, found: 5, .. }]));
  assert_eq!(inst.to_asm_format(&[]).unwrap(), line);
  assert!(inst.to_pisa_format(&[]).is_err());

  let built = XInstruction::new(&isa, Opcode::XStore, XParams {
    id: 6,
    sources: vars("c", 1),
    other: vec!["2".to_string()],
    ..XParams::default()
  }).unwrap();
  assert_eq!(built.to_asm_format(&[]).unwrap(), "F0, 6, xstore, c0, 2");
  assert!(XInstruction::new(&isa, Opcode::XStore, XParams {
    dests: vars("d", 1),
    sources: vars("c", 1),
    ..XParams::default()
  }).is_err());
}

#[test]
fn configuration_round_trip(){
  let mut isa = isa(TokenCountPolicy::Fail);
  isa.set_timing(Opcode::Sub, 1, 6).unwrap();
  let reloaded = IsaSpec::from_json(&isa.to_json().unwrap()).unwrap();

  assert_eq!(reloaded.policy(), TokenCountPolicy::Fail);
  for (opcode, entry) in isa.entries() {
    assert_eq!(reloaded.describe(*opcode).unwrap(), entry);
  }
}
