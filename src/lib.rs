/*!
  Instruction definitions for an assembler targeting a homomorphic-encryption accelerator.

  Kernels arrive in P-ISA, a portable listing of polynomial operations over named variables, and
  leave in ASM-ISA, the encoding the accelerator's instruction streams expect. This crate owns the
  instruction object model between the two: tokenizing lines, validating them against an
  `IsaSpec`, building instructions whose operands are shared `Variable`s, and emitting either
  encoding. Scheduling, register allocation, and file handling belong to the driver.

  ```ignore
  let mut isa = IsaSpec::default();
  isa.set_token_count(Opcode::Copy, 6);

  let mut variables = VariableTable::new();
  let inst = Instruction::from_pisa_line(&isa, &mut variables, 0, "13, copy, out (2), c (0), 0")?;
  assert_eq!(inst.to_asm_format(&[])?, "F0, 0, move, out, c");
  ```
*/

pub mod error;
pub mod instructions;
pub mod isa;
pub mod variable;

pub use error::{AsmError, Result, TokenCountWarning};
pub use instructions::{
  translate_kernel, CInstruction, Instruction, Opcode, Translation, XInstruction, XParams
};
pub use isa::{Encoding, IsaEntry, IsaSpec, TokenCountPolicy};
pub use variable::{VarRef, Variable, VariableRegistry, VariableTable};
