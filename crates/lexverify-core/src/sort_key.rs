//! Sort keys for provision identifiers.
//!
//! Converts identifiers such as `Article 3`, `Article 3A`, `Regulation 143`
//! into lexicographically-sortable strings so that provisions load and
//! report in document order regardless of file or map order.
//!
//! # Numbering conventions
//!
//! - Plain numeric: 1, 2, ..., 10
//! - Letter suffix (inserted provision): 3A between 3 and 4
//! - Z-prefix (pre-insertion): 3ZA between 3 and 3A
//! - Double letter: 3AA, 3AB after 3A
//!
//! Articles sort before regulations.

/// Normalise a bare provision number into a lexicographically-sortable string.
///
/// Input: bare number like "3", "3A", "41ZA", "19DZA"
/// Output: "003.000.000", "003.010.000", "041.001.000", "019.040.001"
///
/// 1. Leading ASCII digits → base number (zero-padded to 3 digits)
/// 2. Remaining uppercase letters → up to 2 suffix groups:
///    - Z-prefix group: ZA=001 ... ZZ=026 (sorts before plain letters)
///    - Plain letter: A=010 ... Z=260
/// 3. Pad to exactly 3 segments with "000"
pub fn normalize_number(s: &str) -> String {
    let upper = s.trim().to_ascii_uppercase();
    let bytes = upper.as_bytes();

    let digit_end = bytes
        .iter()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(bytes.len());
    let base: u32 = upper[..digit_end].parse().unwrap_or(0);

    let suffix = &bytes[digit_end..];
    let mut segments: Vec<u32> = vec![base];
    let mut i = 0;

    while i < suffix.len() && segments.len() < 3 {
        if suffix[i] == b'Z' && i + 1 < suffix.len() && suffix[i + 1].is_ascii_uppercase() {
            segments.push(u32::from(suffix[i + 1] - b'A') + 1);
            i += 2;
        } else if suffix[i].is_ascii_uppercase() {
            segments.push((u32::from(suffix[i] - b'A') + 1) * 10);
            i += 1;
        } else {
            break;
        }
    }

    while segments.len() < 3 {
        segments.push(0);
    }

    format!("{:03}.{:03}.{:03}", segments[0], segments[1], segments[2])
}

/// Sort key for a full identifier, with an optional clause suffix.
///
/// "Article 3A" → "0:003.010.000", "Regulation 143(i)" → "1:143.000.000~i".
/// Identifiers without a recognised kind prefix sort last, by raw text.
pub fn provision_sort_key(id: &str) -> String {
    let id = id.trim();
    let (head, clause) = match id.find('(') {
        Some(open) => (&id[..open], id[open + 1..].trim_end_matches(')')),
        None => (id, ""),
    };

    let mut parts = head.split_whitespace();
    let rank = match parts.next().map(str::to_ascii_lowercase).as_deref() {
        Some("article") => '0',
        Some("regulation") => '1',
        _ => return format!("9:{}", id.to_ascii_lowercase()),
    };
    let number = parts.next().unwrap_or("");

    let mut key = format!("{rank}:{}", normalize_number(number));
    if !clause.is_empty() {
        key.push('~');
        key.push_str(&clause.to_ascii_lowercase());
    }
    key
}
