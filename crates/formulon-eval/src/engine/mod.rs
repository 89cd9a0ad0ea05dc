//! The dependency-tracked incremental recomputation core: owns the cell
//! store, tracks what's gone stale since the last edit, and recomputes
//! exactly the dirty closure in dependency order.

pub mod graph;
pub mod store;

use std::cell::RefCell;

use rand::rngs::SmallRng;
use rand::SeedableRng;
use rustc_hash::FxHashSet;

use formulon_common::{Address, CellValue, ErrorKind};
use formulon_parse::ast::Ast;
use formulon_parse::parser;

use crate::clock::{Clock, SystemClock};
use crate::context::EvalContext;
use crate::function::FnCtx;
use crate::interpreter;

pub use graph::Step;
pub use store::CellState;

use store::Store;

/// Lets the interpreter read cells during a recompute pass without knowing
/// the store is mid-recomputation. The sheet recorded here is the sheet
/// the formula being evaluated actually lives on, not a global default.
struct RecomputeContext<'a> {
    store: &'a Store,
    sheet: &'a str,
}

impl<'a> EvalContext for RecomputeContext<'a> {
    fn get(&self, addr: &Address) -> CellValue {
        self.store.get(addr)
    }

    fn current_sheet(&self) -> &str {
        self.sheet
    }

    fn populated_extent(&self, sheet: &str) -> (u32, u32) {
        self.store.populated_extent(sheet)
    }
}

pub struct Engine {
    store: Store,
    dirty: FxHashSet<Address>,
    clock: Box<dyn Clock>,
    rng: RefCell<SmallRng>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self {
            store: Store::new(),
            dirty: FxHashSet::default(),
            clock: Box::new(SystemClock),
            rng: RefCell::new(SmallRng::from_entropy()),
        }
    }

    /// Same as `new`, but with an injected clock/seed — for deterministic
    /// tests of `NOW`/`TODAY`/`RAND`.
    pub fn with_clock_and_seed(clock: Box<dyn Clock>, seed: u64) -> Self {
        Self {
            store: Store::new(),
            dirty: FxHashSet::default(),
            clock,
            rng: RefCell::new(SmallRng::seed_from_u64(seed)),
        }
    }

    pub fn get(&self, addr: &Address) -> CellValue {
        self.store.get(addr)
    }

    pub fn set_literal(&mut self, addr: Address, value: CellValue) {
        self.store.set_literal(addr.clone(), value);
        self.mark_dirty(&addr);
    }

    /// Parses `source`, extracts its dependencies, and installs it as
    /// `addr`'s formula. A parse error is stored as the cell's value
    /// directly (mirroring how Excel shows `#NAME?`/etc. for a malformed
    /// formula) rather than propagated to the caller.
    pub fn set_formula(&mut self, addr: Address, source: impl Into<String>) {
        let source = source.into();
        match parser::parse(&source) {
            Ok(ast) => {
                let deps = dependency_addresses(&ast, &addr.sheet, |sheet| self.store.populated_extent(sheet));
                self.store.set_formula(addr.clone(), source, ast, deps);
            }
            Err(_) => {
                self.store.set_literal(addr.clone(), CellValue::Error(ErrorKind::Name));
            }
        }
        self.mark_dirty(&addr);
    }

    pub fn clear(&mut self, addr: &Address) {
        self.store.clear(addr);
        self.mark_dirty(addr);
    }

    /// Marks `addr` and every cell transitively dependent on it as dirty.
    pub fn mark_dirty(&mut self, addr: &Address) {
        let mut queue = vec![addr.clone()];
        while let Some(current) = queue.pop() {
            if self.dirty.insert(current.clone()) {
                for dependent in self.store.dependents_of(&current) {
                    queue.push(dependent.clone());
                }
            }
        }
    }

    /// Recomputes every dirty formula cell in dependency order, localising
    /// any cycle to exactly its member cells.
    pub fn recompute(&mut self) {
        if self.dirty.is_empty() {
            return;
        }
        let dirty_formulas: FxHashSet<Address> = self
            .dirty
            .iter()
            .filter(|a| matches!(self.store.state(a), Some(CellState::Formula { .. })))
            .cloned()
            .collect();
        self.dirty.clear();

        let deps_of = |a: &Address| self.store.deps_of(a).to_vec();
        let steps = graph::plan(dirty_formulas, &deps_of);

        let fctx = FnCtx { clock: self.clock.as_ref(), rng: &self.rng };
        for step in steps {
            match step {
                Step::Eval(addr) => {
                    let ast = match self.store.state(&addr) {
                        Some(CellState::Formula { ast, .. }) => ast.clone(),
                        _ => continue,
                    };
                    let ctx = RecomputeContext { store: &self.store, sheet: &addr.sheet };
                    let value = interpreter::eval(&ast, &ctx, &fctx).into_scalar();
                    self.store.set_computed_value(&addr, value);
                }
                Step::CycleError(addr) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(address = %addr, "formula cycle detected");
                    self.store.set_computed_value(&addr, CellValue::Error(ErrorKind::Ref));
                }
            }
        }
    }
}

/// Resolves a formula's literal references/ranges against its own sheet to
/// the concrete addresses the recomputation graph tracks. Whole-column/row
/// open ends are bounded to that sheet's populated extent at the moment
/// the formula is set, same as a normal evaluation-time resolution would
/// do; re-setting the formula (even to identical source) refreshes this
/// edge set if the sheet has grown since.
fn dependency_addresses(ast: &Ast, owning_sheet: &str, populated_extent: impl Fn(&str) -> (u32, u32)) -> Vec<Address> {
    let mut out = Vec::new();
    for reference in ast.collect_references() {
        match reference {
            formulon_parse::ast::Reference::Cell { sheet, col, row } => {
                out.push(Address::new(sheet.clone().unwrap_or_else(|| owning_sheet.to_string()), *col, *row));
            }
            formulon_parse::ast::Reference::Range {
                sheet,
                start_col,
                start_row,
                end_col,
                end_row,
            } => {
                let sheet = sheet.clone().unwrap_or_else(|| owning_sheet.to_string());
                let (max_col, max_row) = populated_extent(&sheet);
                let sc = start_col.unwrap_or(1);
                let sr = start_row.unwrap_or(1);
                let ec = end_col.unwrap_or(max_col.max(sc));
                let er = end_row.unwrap_or(max_row.max(sr));
                for row in sr..=er {
                    for col in sc..=ec {
                        out.push(Address::new(sheet.clone(), col, row));
                    }
                }
            }
            formulon_parse::ast::Reference::Name(_) => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::NaiveDate;

    fn engine() -> Engine {
        Engine::with_clock_and_seed(
            Box::new(FixedClock(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap())),
            1,
        )
    }

    #[test]
    fn sum_of_a_range_recomputes_incrementally() {
        let mut e = engine();
        e.set_literal(Address::new("Sheet1", 1, 1), CellValue::Number(1.0));
        e.set_literal(Address::new("Sheet1", 1, 2), CellValue::Number(2.0));
        e.set_formula(Address::new("Sheet1", 2, 1), "=SUM(A1:A2)");
        e.recompute();
        assert_eq!(e.get(&Address::new("Sheet1", 2, 1)), CellValue::Number(3.0));

        e.set_literal(Address::new("Sheet1", 1, 2), CellValue::Number(20.0));
        e.recompute();
        assert_eq!(e.get(&Address::new("Sheet1", 2, 1)), CellValue::Number(21.0));
    }

    #[test]
    fn cross_sheet_conditional() {
        let mut e = engine();
        e.set_literal(Address::new("Data", 1, 1), CellValue::Number(10.0));
        e.set_formula(Address::new("Sheet1", 1, 1), "=IF(Data!A1>5,\"big\",\"small\")");
        e.recompute();
        assert_eq!(e.get(&Address::new("Sheet1", 1, 1)), CellValue::Text("big".into()));
    }

    #[test]
    fn division_by_zero_propagates_through_a_dependent() {
        let mut e = engine();
        e.set_literal(Address::new("Sheet1", 1, 1), CellValue::Number(0.0));
        e.set_formula(Address::new("Sheet1", 2, 1), "=10/A1");
        e.set_formula(Address::new("Sheet1", 3, 1), "=B1+1");
        e.recompute();
        assert_eq!(e.get(&Address::new("Sheet1", 2, 1)), CellValue::Error(ErrorKind::DivZero));
        assert_eq!(e.get(&Address::new("Sheet1", 3, 1)), CellValue::Error(ErrorKind::DivZero));
    }

    #[test]
    fn direct_cycle_yields_ref_error() {
        let mut e = engine();
        e.set_formula(Address::new("Sheet1", 1, 1), "=B1");
        e.set_formula(Address::new("Sheet1", 2, 1), "=A1");
        e.recompute();
        assert_eq!(e.get(&Address::new("Sheet1", 1, 1)), CellValue::Error(ErrorKind::Ref));
        assert_eq!(e.get(&Address::new("Sheet1", 2, 1)), CellValue::Error(ErrorKind::Ref));
    }

    #[test]
    fn vlookup_scenario() {
        let mut e = engine();
        e.set_literal(Address::new("Sheet1", 1, 1), CellValue::Text("b".into()));
        e.set_literal(Address::new("Sheet1", 1, 2), CellValue::Number(1.0));
        e.set_literal(Address::new("Sheet1", 2, 2), CellValue::Number(10.0));
        e.set_literal(Address::new("Sheet1", 1, 3), CellValue::Number(2.0));
        e.set_literal(Address::new("Sheet1", 2, 3), CellValue::Number(20.0));
        e.set_formula(Address::new("Sheet1", 3, 1), "=VLOOKUP(2,A2:B3,2,FALSE)");
        e.recompute();
        assert_eq!(e.get(&Address::new("Sheet1", 3, 1)), CellValue::Number(20.0));
    }
}
