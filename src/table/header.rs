//! Database-friendly names for table headers and tables.
use regex::Regex;
use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::LazyLock;

/// Runs of characters that are not ASCII letters or digits.
static NON_ALPHANUMERIC: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^A-Za-z0-9]+").expect("Hardcode regex pattern"));

pub const UNNAMED_COLUMN: &str = "unnamed_column";
pub const UNNAMED_TABLE: &str = "unnamed_table";

/// Replaces every run of non-alphanumerics with a single `_`, trims `_` at
/// both ends and prefixes names that start with a digit. `None` when nothing
/// is left.
fn clean(raw: &str, digit_prefix: &str) -> Option<String> {
    let replaced = NON_ALPHANUMERIC.replace_all(raw, "_");
    let trimmed = replaced.trim_matches('_');
    if trimmed.is_empty() {
        None
    } else if trimmed.starts_with(|c: char| c.is_ascii_digit()) {
        Some(format!("{digit_prefix}{trimmed}"))
    } else {
        Some(trimmed.to_owned())
    }
}

/// Sanitizes a raw header into a lowercase column name.
///
/// Empty or missing headers become `unnamed_column`; names starting with a
/// digit get a `col_` prefix. Sanitizing an already sanitized name returns it
/// unchanged.
pub fn sanitize_column_name(raw: Option<&str>) -> String {
    raw.and_then(|raw| clean(raw, "col_"))
        .map(|name| name.to_ascii_lowercase())
        .unwrap_or_else(|| UNNAMED_COLUMN.to_owned())
}

/// Sanitizes a table name into an identifier, keeping its case.
pub fn sanitize_table_name(raw: &str) -> String {
    clean(raw, "table_").unwrap_or_else(|| UNNAMED_TABLE.to_owned())
}

/// Makes sanitized names unique, left to right.
///
/// The second occurrence of a name gets `_2`, the third `_3`, and so on; if a
/// suffixed name is already taken the counter keeps increasing.
pub fn dedupe_column_names(names: Vec<String>) -> Vec<String> {
    let mut counts = HashMap::<String, usize>::new();
    let mut taken = HashSet::<String>::with_capacity(names.len());
    let mut unique = Vec::with_capacity(names.len());
    for name in names {
        let count = counts.entry(name.to_owned()).or_insert(0);
        *count += 1;
        let mut candidate = if *count == 1 {
            name.to_owned()
        } else {
            format!("{name}_{count}")
        };
        while taken.contains(&candidate) {
            *count += 1;
            candidate = format!("{name}_{count}");
        }
        taken.insert(candidate.to_owned());
        unique.push(candidate);
    }
    unique
}
