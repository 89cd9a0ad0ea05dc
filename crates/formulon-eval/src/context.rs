//! The boundary the interpreter uses to read cell values without knowing
//! anything about the engine's storage. Implemented by the engine's value
//! store during a recomputation pass, and by lightweight test doubles in
//! unit tests.

use formulon_common::Address;
use formulon_common::CellValue;

pub trait EvalContext {
    /// Current value of `addr`; missing addresses read as `Empty`.
    fn get(&self, addr: &Address) -> CellValue;

    /// Sheet an unqualified reference resolves against.
    fn current_sheet(&self) -> &str;

    /// Highest occupied (column, row) on `sheet`, `(0, 0)` if empty. Used
    /// to bound whole-column/whole-row ranges to the populated area.
    fn populated_extent(&self, sheet: &str) -> (u32, u32);
}
