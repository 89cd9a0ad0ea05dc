//! Criteria matching shared by `COUNTIF`/`SUMIF`: a comparison-prefixed or
//! wildcard string, or a plain value compared for equality.

use formulon_common::CellValue;

use crate::coerce;

pub fn matches(value: &CellValue, criteria: &CellValue) -> bool {
    let criteria_text = match criteria {
        CellValue::Text(s) => s.clone(),
        other => return equals(value, other),
    };

    for (prefix, cmp) in [
        (">=", Cmp::Ge),
        ("<=", Cmp::Le),
        ("<>", Cmp::Ne),
        (">", Cmp::Gt),
        ("<", Cmp::Lt),
        ("=", Cmp::Eq),
    ] {
        if let Some(rest) = criteria_text.strip_prefix(prefix) {
            return compare_with(value, rest, cmp);
        }
    }

    if criteria_text.contains('*') || criteria_text.contains('?') {
        let text = coerce::to_text(value).unwrap_or_default();
        return glob_match(&criteria_text, &text);
    }

    equals(value, &CellValue::Text(criteria_text))
}

#[derive(Clone, Copy)]
enum Cmp {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

fn compare_with(value: &CellValue, rhs_text: &str, cmp: Cmp) -> bool {
    let ordering = if let Ok(rhs_num) = rhs_text.trim().parse::<f64>() {
        match coerce::to_number(value) {
            Ok(n) => n.partial_cmp(&rhs_num),
            Err(_) => None,
        }
    } else {
        let lhs_text = coerce::to_text(value).unwrap_or_default();
        Some(lhs_text.to_ascii_lowercase().cmp(&rhs_text.to_ascii_lowercase()))
    };
    let Some(ordering) = ordering else { return false };
    use std::cmp::Ordering::*;
    match cmp {
        Cmp::Eq => ordering == Equal,
        Cmp::Ne => ordering != Equal,
        Cmp::Lt => ordering == Less,
        Cmp::Gt => ordering == Greater,
        Cmp::Le => ordering != Greater,
        Cmp::Ge => ordering != Less,
    }
}

fn equals(value: &CellValue, criteria: &CellValue) -> bool {
    match (value, criteria) {
        (CellValue::Number(a), CellValue::Number(b)) => a == b,
        (CellValue::Boolean(a), CellValue::Boolean(b)) => a == b,
        (CellValue::Empty, CellValue::Empty) => true,
        _ => {
            let a = coerce::to_text(value).unwrap_or_default();
            let b = coerce::to_text(criteria).unwrap_or_default();
            a.eq_ignore_ascii_case(&b)
        }
    }
}

/// Case-insensitive glob match supporting `*` (any run) and `?` (one
/// char).
fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.to_ascii_lowercase().chars().collect();
    let text: Vec<char> = text.to_ascii_lowercase().chars().collect();
    let mut dp = vec![vec![false; text.len() + 1]; pattern.len() + 1];
    dp[0][0] = true;
    for (i, pc) in pattern.iter().enumerate() {
        if *pc == '*' {
            dp[i + 1][0] = dp[i][0];
        }
    }
    for i in 0..pattern.len() {
        for j in 0..=text.len() {
            if !dp[i][j] {
                continue;
            }
            match pattern[i] {
                '*' => {
                    dp[i + 1][j] = true;
                    if j < text.len() {
                        dp[i][j + 1] = true;
                    }
                }
                '?' => {
                    if j < text.len() {
                        dp[i + 1][j + 1] = true;
                    }
                }
                c => {
                    if j < text.len() && text[j] == c {
                        dp[i + 1][j + 1] = true;
                    }
                }
            }
        }
    }
    dp[pattern.len()][text.len()]
}

/// Earliest character index where `pattern` (with `*`/`?` wildcards)
/// matches some prefix of `haystack` starting there, case-insensitive.
/// Unlike `glob_match`, the matched prefix need not consume the rest of
/// `haystack` — this is the shape `SEARCH` needs (the wildcard match can
/// be followed by further haystack text).
pub(crate) fn glob_find(pattern: &str, haystack: &str) -> Option<usize> {
    let pattern: Vec<char> = pattern.to_ascii_lowercase().chars().collect();
    let haystack: Vec<char> = haystack.to_ascii_lowercase().chars().collect();
    (0..=haystack.len()).find(|&start| matches_some_prefix(&pattern, &haystack[start..]))
}

fn matches_some_prefix(pattern: &[char], text: &[char]) -> bool {
    let mut dp = vec![vec![false; text.len() + 1]; pattern.len() + 1];
    dp[0][0] = true;
    for (i, pc) in pattern.iter().enumerate() {
        if *pc == '*' {
            dp[i + 1][0] = dp[i][0];
        }
    }
    for i in 0..pattern.len() {
        for j in 0..=text.len() {
            if !dp[i][j] {
                continue;
            }
            match pattern[i] {
                '*' => {
                    dp[i + 1][j] = true;
                    if j < text.len() {
                        dp[i][j + 1] = true;
                    }
                }
                '?' => {
                    if j < text.len() {
                        dp[i + 1][j + 1] = true;
                    }
                }
                c => {
                    if j < text.len() && text[j] == c {
                        dp[i + 1][j + 1] = true;
                    }
                }
            }
        }
    }
    (0..=text.len()).any(|j| dp[pattern.len()][j])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_equality() {
        assert!(matches(&CellValue::Number(5.0), &CellValue::Number(5.0)));
        assert!(!matches(&CellValue::Number(5.0), &CellValue::Number(6.0)));
    }

    #[test]
    fn comparison_prefix() {
        assert!(matches(&CellValue::Number(5.0), &CellValue::Text(">3".into())));
        assert!(!matches(&CellValue::Number(5.0), &CellValue::Text("<3".into())));
        assert!(matches(&CellValue::Number(5.0), &CellValue::Text("<>3".into())));
    }

    #[test]
    fn wildcard_match() {
        assert!(matches(&CellValue::Text("hello world".into()), &CellValue::Text("hel*".into())));
        assert!(matches(&CellValue::Text("cat".into()), &CellValue::Text("c?t".into())));
        assert!(!matches(&CellValue::Text("cart".into()), &CellValue::Text("c?t".into())));
    }

    #[test]
    fn text_equality_case_insensitive() {
        assert!(matches(&CellValue::Text("Yes".into()), &CellValue::Text("yes".into())));
    }

    #[test]
    fn glob_find_locates_a_wildcard_match_with_trailing_text() {
        assert_eq!(glob_find("a*c", "xabcy"), Some(1));
        assert_eq!(glob_find("z*", "xabcy"), None);
    }
}
