//! Turns a parser-level `Reference` (sheet names possibly unqualified,
//! range corners possibly open-ended) into a concrete `Address`/`Range`
//! against a live context — the same resolution dependency extraction and
//! the interpreter both need.

use formulon_common::error::ErrorKind;
use formulon_common::{Address, Range};
use formulon_parse::ast::Reference;

use crate::context::EvalContext;

#[derive(Clone, Debug, PartialEq)]
pub enum ResolvedRef {
    Cell(Address),
    Range(Range),
}

impl ResolvedRef {
    pub fn sheet(&self) -> &str {
        match self {
            ResolvedRef::Cell(a) => &a.sheet,
            ResolvedRef::Range(r) => &r.sheet,
        }
    }

    pub fn bounds(&self) -> (u32, u32, u32, u32) {
        match self {
            ResolvedRef::Cell(a) => (a.col, a.row, a.col, a.row),
            ResolvedRef::Range(r) => (r.start_col, r.start_row, r.end_col, r.end_row),
        }
    }

    /// Every address covered, in row-major order.
    pub fn addresses_row_major(&self) -> Vec<Address> {
        match self {
            ResolvedRef::Cell(a) => vec![a.clone()],
            ResolvedRef::Range(r) => r.addresses_row_major().collect(),
        }
    }
}

/// Resolves a `Reference::Cell`/`Reference::Range` (sheet defaulting to
/// the current sheet, open ends bounded to the populated area) or
/// `Reference::Name` (always unresolved — this crate has no named-range
/// table — producing `#NAME?`).
pub fn resolve(reference: &Reference, ctx: &dyn EvalContext) -> Result<ResolvedRef, ErrorKind> {
    match reference {
        Reference::Cell { sheet, col, row } => {
            let sheet = sheet.clone().unwrap_or_else(|| ctx.current_sheet().to_string());
            Ok(ResolvedRef::Cell(Address::new(sheet, *col, *row)))
        }
        Reference::Range {
            sheet,
            start_col,
            start_row,
            end_col,
            end_row,
        } => {
            let sheet = sheet.clone().unwrap_or_else(|| ctx.current_sheet().to_string());
            let (max_col, max_row) = ctx.populated_extent(&sheet);
            let start_col = start_col.unwrap_or(1);
            let start_row = start_row.unwrap_or(1);
            let end_col = end_col.unwrap_or(max_col.max(1));
            let end_row = end_row.unwrap_or(max_row.max(1));
            Range::new(sheet, start_col, start_row, end_col, end_row)
                .map(ResolvedRef::Range)
                .map_err(|_| ErrorKind::Ref)
        }
        Reference::Name(_) => Err(ErrorKind::Name),
    }
}

/// Geometric intersection of two resolved references on the same sheet.
/// `#VALUE!` for a cross-sheet intersection attempt, `#NULL!` when the
/// shapes do not overlap.
pub fn intersect(a: &ResolvedRef, b: &ResolvedRef) -> Result<ResolvedRef, ErrorKind> {
    if a.sheet() != b.sheet() {
        return Err(ErrorKind::Value);
    }
    let (a_sc, a_sr, a_ec, a_er) = a.bounds();
    let (b_sc, b_sr, b_ec, b_er) = b.bounds();
    let sc = a_sc.max(b_sc);
    let sr = a_sr.max(b_sr);
    let ec = a_ec.min(b_ec);
    let er = a_er.min(b_er);
    if sc > ec || sr > er {
        return Err(ErrorKind::Null);
    }
    if sc == ec && sr == er {
        Ok(ResolvedRef::Cell(Address::new(a.sheet().to_string(), sc, sr)))
    } else {
        Range::new(a.sheet().to_string(), sc, sr, ec, er)
            .map(ResolvedRef::Range)
            .map_err(|_| ErrorKind::Null)
    }
}
