//! Conversions between A1-style cell references and zero-based indexes.
//!
//! Column letters use bijective base-26: `A` is 1, `Z` is 26 and `AA` is 27,
//! shifted down by one so that column `A` has index 0.

/// Largest column index addressable by the xlsx format (`XFD`).
pub(crate) const MAX_COL_INDEX: usize = 16_383;

/// Converts column letters (e.g. `AA`) to a zero-based column index.
/// Returns `None` for empty input, non-letters, or columns beyond `XFD`.
pub(crate) fn col_to_index(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }
    let mut index = 0usize;
    for letter in letters.chars() {
        if !letter.is_ascii_alphabetic() {
            return None;
        }
        let digit = (letter.to_ascii_uppercase() as u8 - b'A') as usize + 1;
        index = index.checked_mul(26)?.checked_add(digit)?;
        if index > MAX_COL_INDEX + 1 {
            return None;
        }
    }
    Some(index - 1)
}

/// Converts a one-based row number to a zero-based row index.
pub(crate) fn row_to_index(digits: &str) -> Option<usize> {
    digits.parse::<usize>().ok()?.checked_sub(1)
}

/// Converts a zero-based column index to column letters.
pub(crate) fn index_to_col(col: usize) -> String {
    let mut col = col + 1;
    let mut letters = Vec::<char>::new();
    while col > 0 {
        col -= 1;
        letters.push(char::from(b'A' + (col % 26) as u8));
        col /= 26;
    }
    letters.iter().rev().collect()
}

/// Converts zero-based (row, col) indexes to an A1-style reference.
pub(crate) fn index_to_reference(row: usize, col: usize) -> String {
    format!("{}{}", index_to_col(col), row + 1)
}

/// Parses an A1-style reference (e.g. `B12`) into zero-based (row, col) indexes.
pub(crate) fn reference_to_index(reference: &str) -> Option<(usize, usize)> {
    let split = reference.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(split);
    let col = col_to_index(letters)?;
    let row = row_to_index(digits)?;
    Some((row, col))
}
