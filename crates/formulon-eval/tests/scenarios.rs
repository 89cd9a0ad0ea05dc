//! End-to-end scenarios through the public `Engine` API.

use chrono::NaiveDate;
use formulon_common::{Address, CellValue, ErrorKind};
use formulon_eval::clock::FixedClock;
use formulon_eval::Engine;

fn engine() -> Engine {
    Engine::with_clock_and_seed(
        Box::new(FixedClock(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap())),
        7,
    )
}

#[test]
fn sum_of_a_range_with_incremental_recompute() {
    let mut e = engine();
    for row in 1..=5 {
        e.set_literal(Address::new("Sheet1", 1, row), CellValue::Number(row as f64));
    }
    e.set_formula(Address::new("Sheet1", 2, 1), "=SUM(A1:A5)");
    e.recompute();
    assert_eq!(e.get(&Address::new("Sheet1", 2, 1)), CellValue::Number(15.0));

    e.set_literal(Address::new("Sheet1", 1, 3), CellValue::Number(100.0));
    e.recompute();
    assert_eq!(e.get(&Address::new("Sheet1", 2, 1)), CellValue::Number(113.0));
}

#[test]
fn conditional_reads_a_cross_sheet_reference() {
    let mut e = engine();
    e.set_literal(Address::new("Inputs", 1, 1), CellValue::Number(42.0));
    e.set_formula(Address::new("Sheet1", 1, 1), "=IF(Inputs!A1=42,\"match\",\"no match\")");
    e.recompute();
    assert_eq!(e.get(&Address::new("Sheet1", 1, 1)), CellValue::Text("match".into()));
}

#[test]
fn division_by_zero_propagates_downstream() {
    let mut e = engine();
    e.set_literal(Address::new("Sheet1", 1, 1), CellValue::Number(0.0));
    e.set_formula(Address::new("Sheet1", 1, 2), "=5/A1");
    e.set_formula(Address::new("Sheet1", 1, 3), "=A2*2");
    e.recompute();
    assert_eq!(e.get(&Address::new("Sheet1", 1, 2)), CellValue::Error(ErrorKind::DivZero));
    assert_eq!(e.get(&Address::new("Sheet1", 1, 3)), CellValue::Error(ErrorKind::DivZero));
}

#[test]
fn a_formula_cycle_is_localised_to_its_members() {
    let mut e = engine();
    e.set_formula(Address::new("Sheet1", 1, 1), "=A2+1");
    e.set_formula(Address::new("Sheet1", 1, 2), "=A1+1");
    e.set_formula(Address::new("Sheet1", 1, 3), "=A2+1"); // downstream, not a cycle member
    e.recompute();
    assert_eq!(e.get(&Address::new("Sheet1", 1, 1)), CellValue::Error(ErrorKind::Ref));
    assert_eq!(e.get(&Address::new("Sheet1", 1, 2)), CellValue::Error(ErrorKind::Ref));
    assert_eq!(e.get(&Address::new("Sheet1", 1, 3)), CellValue::Error(ErrorKind::Ref));
}

#[test]
fn concatenation_binds_looser_than_addition() {
    let mut e = engine();
    e.set_formula(Address::new("Sheet1", 1, 1), "=1+2&\"x\"");
    e.recompute();
    assert_eq!(e.get(&Address::new("Sheet1", 1, 1)), CellValue::Text("3x".into()));
}

#[test]
fn vlookup_finds_a_row_by_exact_key() {
    let mut e = engine();
    let rows = [("apple", 1.0), ("banana", 2.0), ("cherry", 3.0)];
    for (i, (name, price)) in rows.iter().enumerate() {
        let row = (i + 1) as u32;
        e.set_literal(Address::new("Sheet1", 1, row), CellValue::Text((*name).into()));
        e.set_literal(Address::new("Sheet1", 2, row), CellValue::Number(*price));
    }
    e.set_formula(Address::new("Sheet1", 4, 1), "=VLOOKUP(\"banana\",A1:B3,2,FALSE)");
    e.recompute();
    assert_eq!(e.get(&Address::new("Sheet1", 4, 1)), CellValue::Number(2.0));
}
