use std::sync::LazyLock;

use regex::Regex;

use crate::error::Rejection;

/// Optionally signed integer, then one or more `op operand` pairs where the
/// operand is an optionally signed integer, optionally wrapped in one pair of
/// parentheses.
static EXPRESSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^-?\d+(?:[+\-*/](?:\(-?\d+\)|-?\d+))+$").expect("valid regex")
});

/// Syntactic check run before anything is sent to the cluster.
///
/// A literal `/0` anywhere is refused outright, even when the rest of the
/// string would not parse. Division by zero that only appears at evaluation
/// time is left for the cluster to report.
pub fn validate(expression: &str) -> Result<(), Rejection> {
    if expression.contains("/0") {
        return Err(Rejection::DivisionByZero);
    }
    if !EXPRESSION.is_match(expression) {
        return Err(Rejection::InvalidFormat);
    }
    Ok(())
}
