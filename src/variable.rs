/*!
  Variables are named logical values produced and consumed by instructions, independent of the
  memory tier they currently live in. Instructions only hold references to them and compare them
  by name. Names are interned, so clones and comparisons are cheap.

  Resolution of operand names is the job of a `VariableRegistry`. The assembler proper owns the
  real registry (it also tracks placement); `VariableTable` is the simple implementation used by
  the translation helpers and the tests.
*/

use std::fmt::{Display, Formatter};
use std::sync::Arc;

use bimap::BiMap;
use string_cache::DefaultAtom;
use tracing::trace;

use crate::error::{AsmError, Result};

pub type VarRef = Arc<Variable>;

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Variable {
  pub name: DefaultAtom,
  /// Suggested bank within the register file, as annotated in the P-ISA listing.
  pub suggested_bank: Option<u32>,
}

impl Variable {
  pub fn new(name: &str, suggested_bank: Option<u32>) -> Variable {
    Variable {
      name: DefaultAtom::from(name),
      suggested_bank
    }
  }

  pub fn shared(name: &str, suggested_bank: Option<u32>) -> VarRef {
    Arc::new(Variable::new(name, suggested_bank))
  }
}

impl Display for Variable {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self.suggested_bank {
      Some(bank) => write!(f, "{} ({})", self.name, bank),
      None       => write!(f, "{}", self.name)
    }
  }
}

/// Resolves operand names to shared `Variable` handles.
pub trait VariableRegistry {
  /// `bank` is the suggested bank read next to the name, if any. Implementations decide whether an
  /// unknown name is an error or a new variable.
  fn resolve(&mut self, name: &str, bank: Option<u32>) -> Result<VarRef>;
}

/**
  A table of variables indexed in order of first appearance. Names map to indices through a
  `BiMap` so a driver can go both ways when reporting.
*/
#[derive(Default)]
pub struct VariableTable {
  indices: BiMap<DefaultAtom, usize>,
  variables: Vec<VarRef>,
  /// When set, unknown names are an error instead of being added.
  frozen: bool,
}

impl VariableTable {

  pub fn new() -> VariableTable {
    VariableTable::default()
  }

  /// A table that only resolves names already inserted.
  pub fn frozen(self) -> VariableTable {
    VariableTable { frozen: true, ..self }
  }

  /// Returns the existing variable named `name`, or adds it. The first suggested bank seen wins.
  pub fn get_or_insert(&mut self, name: &str, bank: Option<u32>) -> VarRef {
    let atom = DefaultAtom::from(name);
    if let Some(&index) = self.indices.get_by_left(&atom) {
      let existing = &self.variables[index];
      if bank.is_some() && bank != existing.suggested_bank {
        trace!("variable `{}` keeps bank {:?}, ignoring {:?}", atom, existing.suggested_bank, bank);
      }
      return existing.clone();
    }

    let variable = Arc::new(Variable { name: atom.clone(), suggested_bank: bank });
    let index = self.variables.len();
    trace!("new variable `{}` at index {}", atom, index);
    self.indices.insert(atom, index);
    self.variables.push(variable.clone());
    variable
  }

  pub fn get(&self, name: &str) -> Option<VarRef> {
    self.indices
        .get_by_left(&DefaultAtom::from(name))
        .map(|&index| self.variables[index].clone())
  }

  pub fn index_of(&self, name: &str) -> Option<usize> {
    self.indices.get_by_left(&DefaultAtom::from(name)).copied()
  }

  pub fn name_at(&self, index: usize) -> Option<&DefaultAtom> {
    self.indices.get_by_right(&index)
  }

  pub fn len(&self) -> usize {
    self.variables.len()
  }

  pub fn is_empty(&self) -> bool {
    self.variables.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = &VarRef> {
    self.variables.iter()
  }

}

impl VariableRegistry for VariableTable {
  fn resolve(&mut self, name: &str, bank: Option<u32>) -> Result<VarRef> {
    match self.frozen {
      true  => self.get(name).ok_or_else(|| AsmError::UnresolvedVariable(name.to_string())),
      false => Ok(self.get_or_insert(name, bank))
    }
  }
}
