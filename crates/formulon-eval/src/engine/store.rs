//! The per-sheet cell store: what's in each cell, and the reverse index
//! the graph walk needs to find a cell's dependents.

use rustc_hash::{FxHashMap, FxHashSet};

use formulon_common::{Address, CellValue};
use formulon_parse::ast::Ast;

#[derive(Clone, Debug)]
pub enum CellState {
    Empty,
    Literal(CellValue),
    Formula {
        source: String,
        ast: Ast,
        deps: Vec<Address>,
        value: CellValue,
    },
}

impl CellState {
    pub fn value(&self) -> CellValue {
        match self {
            CellState::Empty => CellValue::Empty,
            CellState::Literal(v) => v.clone(),
            CellState::Formula { value, .. } => value.clone(),
        }
    }
}

/// Owns every cell's current state plus the forward (`A1` depends on
/// `...`) and reverse (`...` is depended on by `A1`) adjacency needed to
/// find the dirty closure after an edit.
#[derive(Default)]
pub struct Store {
    cells: FxHashMap<Address, CellState>,
    dependents: FxHashMap<Address, FxHashSet<Address>>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, addr: &Address) -> CellValue {
        self.cells.get(addr).map(CellState::value).unwrap_or(CellValue::Empty)
    }

    pub fn state(&self, addr: &Address) -> Option<&CellState> {
        self.cells.get(addr)
    }

    pub fn dependents_of(&self, addr: &Address) -> impl Iterator<Item = &Address> {
        self.dependents.get(addr).into_iter().flatten()
    }

    pub fn deps_of(&self, addr: &Address) -> &[Address] {
        match self.cells.get(addr) {
            Some(CellState::Formula { deps, .. }) => deps,
            _ => &[],
        }
    }

    /// Highest occupied (column, row) on `sheet`, `(0, 0)` if nothing there.
    pub fn populated_extent(&self, sheet: &str) -> (u32, u32) {
        self.cells
            .keys()
            .filter(|a| a.sheet == sheet)
            .fold((0, 0), |(mc, mr), a| (mc.max(a.col), mr.max(a.row)))
    }

    pub fn addresses(&self) -> impl Iterator<Item = &Address> {
        self.cells.keys()
    }

    /// Removes stale reverse-edges for `addr`'s old dependency set (if any)
    /// and installs new ones for `new_deps`.
    fn rewire_dependents(&mut self, addr: &Address, new_deps: &[Address]) {
        let old_deps: Vec<Address> = match self.cells.get(addr) {
            Some(CellState::Formula { deps, .. }) => deps.clone(),
            _ => Vec::new(),
        };
        for old in old_deps {
            if let Some(set) = self.dependents.get_mut(&old) {
                set.remove(addr);
            }
        }
        for dep in new_deps {
            self.dependents.entry(dep.clone()).or_default().insert(addr.clone());
        }
    }

    pub fn set_literal(&mut self, addr: Address, value: CellValue) {
        self.rewire_dependents(&addr, &[]);
        self.cells.insert(addr, CellState::Literal(value));
    }

    pub fn set_formula(&mut self, addr: Address, source: String, ast: Ast, deps: Vec<Address>) {
        self.rewire_dependents(&addr, &deps);
        self.cells.insert(
            addr,
            CellState::Formula {
                source,
                ast,
                deps,
                value: CellValue::Empty,
            },
        );
    }

    pub fn clear(&mut self, addr: &Address) {
        self.rewire_dependents(addr, &[]);
        self.cells.remove(addr);
    }

    pub fn set_computed_value(&mut self, addr: &Address, value: CellValue) {
        if let Some(CellState::Formula { value: slot, .. }) = self.cells.get_mut(addr) {
            *slot = value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_roundtrip() {
        let mut store = Store::new();
        let a1 = Address::new("Sheet1", 1, 1);
        store.set_literal(a1.clone(), CellValue::Number(5.0));
        assert_eq!(store.get(&a1), CellValue::Number(5.0));
    }

    #[test]
    fn clearing_a_formula_removes_its_reverse_edges() {
        let mut store = Store::new();
        let a1 = Address::new("Sheet1", 1, 1);
        let b1 = Address::new("Sheet1", 2, 1);
        store.set_formula(b1.clone(), "=A1".into(), Ast::Number(0.0), vec![a1.clone()]);
        assert_eq!(store.dependents_of(&a1).count(), 1);
        store.clear(&b1);
        assert_eq!(store.dependents_of(&a1).count(), 0);
    }
}
