//! Cut-label text format shared by growth and prediction.
//!
//! Continuous splits are labelled `"<t"` / `">t"` with the threshold printed
//! in shortest round-trip form. Categorical splits are labelled `":"`
//! followed by one character per level on that side, drawn from a fixed
//! 32-character alphabet.

use crate::errors::TreeError;

/// One character per categorical level, index 0..31.
pub const LEVEL_ALPHABET: [char; 32] = [
    'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r',
    's', 't', 'u', 'v', 'w', 'x', 'y', 'z', '0', '1', '2', '3', '4', '5',
];

/// The alphabet character of a 1-based level code, or `None` beyond the
/// 32-level limit.
pub fn level_char(level: usize) -> Option<char> {
    if level >= 1 && level <= LEVEL_ALPHABET.len() {
        Some(LEVEL_ALPHABET[level - 1])
    } else {
        None
    }
}

/// The `"<t"` / `">t"` label pair of a continuous split.
pub fn continuous_labels(threshold: f64) -> (String, String) {
    (format!("<{}", threshold), format!(">{}", threshold))
}

/// Reads the threshold back out of a continuous cut label.
pub fn parse_threshold(label: &str) -> Result<f64, TreeError> {
    let rest = label
        .strip_prefix('<')
        .or_else(|| label.strip_prefix('>'))
        .ok_or_else(|| TreeError::CorruptTree(format!("malformed cut label `{}`", label)))?;
    rest.parse::<f64>()
        .map_err(|_| TreeError::CorruptTree(format!("malformed cut label `{}`", label)))
}

/// Whether a categorical cut label lists the given 1-based level.
pub fn label_contains_level(label: &str, level: usize) -> Result<bool, TreeError> {
    if !label.starts_with(':') {
        return Err(TreeError::CorruptTree(format!(
            "malformed cut label `{}`",
            label
        )));
    }
    Ok(match level_char(level) {
        Some(c) => label[1..].contains(c),
        None => false,
    })
}
