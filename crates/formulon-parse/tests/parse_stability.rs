//! Property test for the "parse stability" universal invariant: the
//! canonical pretty-print of any parsed formula re-parses to an equal AST.

use formulon_parse::{parse, to_formula_text};
use proptest::prelude::*;

fn arb_formula() -> impl Strategy<Value = String> {
    let leaf = prop_oneof![
        (0i32..1000).prop_map(|n| n.to_string()),
        Just("A1".to_string()),
        Just("Sheet2!B3".to_string()),
        Just("TRUE".to_string()),
        Just("\"hi\"".to_string()),
    ];
    leaf.prop_recursive(4, 64, 8, |inner| {
        prop_oneof![
            (inner.clone(), "[+*&-]", inner.clone())
                .prop_map(|(l, op, r)| format!("({l}{op}{r})")),
            inner
                .clone()
                .prop_map(|a| format!("SUM({a},1)")),
        ]
    })
}

proptest! {
    #[test]
    fn canonical_pretty_print_reparses_to_equal_ast(body in arb_formula()) {
        let src = format!("={body}");
        if let Ok(ast) = parse(&src) {
            let rendered = to_formula_text(&ast);
            let reparsed = parse(&rendered).expect("canonical text must re-parse");
            prop_assert_eq!(ast, reparsed);
        }
    }
}
