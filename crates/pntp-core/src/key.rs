//! Derived keys for persisted records and report file names.

use crate::model::EntityType;

/// Characters that are unsafe in file names or database paths.
const UNSAFE_KEY_CHARS: [char; 8] = [' ', '.', '#', '/', '\\', '$', '[', ']'];

/// Suffix of every generated report file.
pub const REPORT_SUFFIX: &str = "_relatorio.pdf";

/// Storage key for an `(entity name, entity type)` pair.
///
/// `"<name>_<type>"`, lower-cased, with each unsafe character replaced by `_`.
/// Surrounding whitespace of the name is ignored. Diacritics are kept, so
/// `(" São Paulo ", Câmara)` maps to `"são_paulo_câmara"`. Both storage
/// backends address records with this key.
pub fn derive_key(entity_name: &str, entity_type: EntityType) -> String {
    format!("{}_{}", entity_name.trim(), entity_type.label())
        .to_lowercase()
        .chars()
        .map(|c| if UNSAFE_KEY_CHARS.contains(&c) { '_' } else { c })
        .collect()
}

/// Human-facing report file name, e.g. `São_Paulo_Câmara_relatorio.pdf`.
///
/// Case and diacritics are kept; whitespace and path separators become `_`.
pub fn report_file_name(entity_name: &str, entity_type: EntityType) -> String {
    let stem: String = format!("{}_{}", entity_name.trim(), entity_type.label())
        .chars()
        .map(|c| {
            if c.is_whitespace() || c == '/' || c == '\\' {
                '_'
            } else {
                c
            }
        })
        .collect();
    format!("{stem}{REPORT_SUFFIX}")
}
