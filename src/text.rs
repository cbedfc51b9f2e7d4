//! Text normalisation shared by column matching, table header detection and
//! file naming.

use unicode_normalization::UnicodeNormalization;

/// Remove combining marks after canonical decomposition ("Señoría" -> "Senoria").
pub fn strip_accents(s: &str) -> String {
    s.nfd()
        .filter(|c| !unicode_normalization::char::is_combining_mark(*c))
        .collect()
}

/// Accent-stripped, lowercased, trimmed, inner whitespace collapsed.
pub fn normalize(s: &str) -> String {
    strip_accents(s.trim())
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_accents() {
        assert_eq!(strip_accents("Secretaría de Hacienda"), "Secretaria de Hacienda");
        assert_eq!(strip_accents("Año Técnico"), "Ano Tecnico");
    }

    #[test]
    fn test_normalize_collapses_whitespace() {
        assert_eq!(normalize("  Nombre   de la\tMESA "), "nombre de la mesa");
        assert_eq!(normalize("Fecha de Realización"), "fecha de realizacion");
    }
}
