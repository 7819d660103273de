use serde::Serialize;

/// Whether a statement should be followed by a change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementKind {
    Mutating,
    ReadOnly,
}

impl StatementKind {
    pub fn is_mutating(self) -> bool {
        matches!(self, StatementKind::Mutating)
    }
}

const MUTATING_PREFIXES: [&str; 3] = ["insert", "update", "delete"];

/// Textual heuristic: mutating iff the trimmed text starts with `insert`, `update`
/// or `delete`, ignoring ASCII case.
///
/// Not a parser. Leading comments, CTEs (`WITH ... INSERT`) and later statements in a
/// batch are not looked at, so such input is reported as read-only.
pub fn classify(sql: &str) -> StatementKind {
    let head = sql.trim_start();
    let mutating = MUTATING_PREFIXES.iter().any(|prefix| {
        head.get(..prefix.len())
            .is_some_and(|start| start.eq_ignore_ascii_case(prefix))
    });
    if mutating {
        StatementKind::Mutating
    } else {
        StatementKind::ReadOnly
    }
}
