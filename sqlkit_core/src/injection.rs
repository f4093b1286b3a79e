use regex::Regex;
use std::sync::LazyLock;

/// Statement text the filter refuses: embedded tab/CR/LF characters, `--`
/// line comments, or closed `/* ... */` block comments.
static SUSPECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\t\r\n]|--[^\r\n]*|/\*[\w\W]*?\*/").expect("suspect pattern"));

/// Heuristic SQL-injection filter applied before every statement execution.
///
/// Returns the first suspicious fragment, or `None` when the text passes.
/// This is a heuristic, not a parser: it over-rejects legitimate multi-line
/// SQL and under-rejects payloads that avoid comment markers and newlines.
#[must_use]
pub fn find_suspect(sql: &str) -> Option<&str> {
    SUSPECT.find(sql).map(|found| found.as_str())
}
