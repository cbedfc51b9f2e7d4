//! Common utilities for letter generation.
//!
//! Shared helpers for date formatting and output file naming.

use chrono::{Datelike, Local, NaiveDate};

use crate::text::strip_accents;

/// Group identity used when the grouping key is missing.
pub const NO_GROUP: &str = "(Sin grupo)";

/// Slug used when a group name has no usable characters.
pub const SLUG_FALLBACK: &str = "SIN_GRUPO";

const MONTHS_ES: [&str; 12] = [
    "enero",
    "febrero",
    "marzo",
    "abril",
    "mayo",
    "junio",
    "julio",
    "agosto",
    "septiembre",
    "octubre",
    "noviembre",
    "diciembre",
];

/// Spanish month name for 1..=12, empty otherwise.
pub fn month_name_es(month: u32) -> &'static str {
    match month {
        1..=12 => MONTHS_ES[(month - 1) as usize],
        _ => "",
    }
}

/// Long letter date, e.g. "Medellín, 5 de marzo de 2024".
pub fn format_long_date(city: &str, date: NaiveDate) -> String {
    format!(
        "{}, {} de {} de {}",
        city,
        date.day(),
        month_name_es(date.month()),
        date.year()
    )
}

/// Letter date: the requested one, or today.
pub fn letter_date_or_today(date: Option<NaiveDate>) -> NaiveDate {
    date.unwrap_or_else(|| Local::now().date_naive())
}

/// File-name-safe form of a group name: accents stripped, only ASCII
/// letters, digits, `_`, `-` and spaces kept, spaces turned into `_`.
pub fn slugify(text: &str) -> String {
    let kept: String = strip_accents(text.trim())
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | ' '))
        .collect();
    let slug = kept.trim().replace(' ', "_");
    if slug.is_empty() {
        SLUG_FALLBACK.to_string()
    } else {
        slug
    }
}

/// Substitutes `{GRUPO}`, `{GROUP}` and `{ACTOR}` with the slug of the group
/// and sanitises the result so it stays a plain file name.
pub fn apply_naming_pattern(pattern: &str, group_name: &str) -> String {
    let slug = slugify(group_name);
    let name = pattern
        .replace("{GRUPO}", &slug)
        .replace("{GROUP}", &slug)
        .replace("{ACTOR}", &slug);
    let sanitized = sanitize_filename::sanitize(&name);
    if sanitized.is_empty() {
        format!("CARTA_{slug}.docx")
    } else {
        sanitized
    }
}

/// `CARTA_X.docx` -> `CARTA_X_2.docx`
pub fn with_numeric_suffix(file_name: &str, n: usize) -> String {
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}_{n}.{ext}"),
        _ => format!("{file_name}_{n}"),
    }
}
