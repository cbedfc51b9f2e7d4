use dotenvy::dotenv;
use std::env;
use std::str::FromStr;

pub const DEFAULT_CITY: &str = "Medellín";
pub const DEFAULT_NAMING_PATTERN: &str = "CARTA_{GRUPO}.docx";
pub const DEFAULT_IMAGE_WIDTH_IN: f64 = 1.5;
pub const DEFAULT_SOFFICE_BIN: &str = "soffice";
pub const DEFAULT_WATERMARK_TEXT: &str = "BORRADOR";

/// Process-level defaults, read from the environment (and `.env`).
/// Command-line flags take precedence over every value here.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub city: String,
    pub naming_pattern: String,
    pub image_width_in: f64,
    pub newest_first: bool,
    pub soffice_bin: String,
    pub watermark_text: String,
    pub sign_command: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            city: DEFAULT_CITY.to_string(),
            naming_pattern: DEFAULT_NAMING_PATTERN.to_string(),
            image_width_in: DEFAULT_IMAGE_WIDTH_IN,
            newest_first: true,
            soffice_bin: DEFAULT_SOFFICE_BIN.to_string(),
            watermark_text: DEFAULT_WATERMARK_TEXT.to_string(),
            sign_command: None,
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "si" | "sí" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn non_empty(raw: Option<String>) -> Option<String> {
    raw.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parsed_or<T: FromStr>(key: &str, raw: Option<String>, default: T) -> T {
    match non_empty(raw) {
        Some(value) => value.parse().unwrap_or_else(|_| {
            log::warn!("{} tiene un valor inválido ('{}'); se usa el valor por defecto", key, value);
            default
        }),
        None => default,
    }
}

impl Settings {
    pub fn from_env() -> Self {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds settings from any key lookup; unset or blank keys keep their
    /// defaults and unparsable ones are reported and ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let image_width_in = parsed_or("CARTAS_IMAGE_WIDTH_IN", lookup("CARTAS_IMAGE_WIDTH_IN"), defaults.image_width_in);
        let image_width_in = if image_width_in > 0.0 && image_width_in.is_finite() {
            image_width_in
        } else {
            log::warn!("CARTAS_IMAGE_WIDTH_IN debe ser positivo; se usa {}", defaults.image_width_in);
            defaults.image_width_in
        };

        let newest_first = match non_empty(lookup("CARTAS_NEWEST_FIRST")) {
            Some(raw) => parse_bool(&raw).unwrap_or_else(|| {
                log::warn!("CARTAS_NEWEST_FIRST tiene un valor inválido ('{}'); se usa el valor por defecto", raw);
                defaults.newest_first
            }),
            None => defaults.newest_first,
        };

        Self {
            city: non_empty(lookup("CARTAS_CITY")).unwrap_or(defaults.city),
            naming_pattern: non_empty(lookup("CARTAS_NAMING_PATTERN")).unwrap_or(defaults.naming_pattern),
            image_width_in,
            newest_first,
            soffice_bin: non_empty(lookup("CARTAS_SOFFICE_BIN")).unwrap_or(defaults.soffice_bin),
            watermark_text: non_empty(lookup("CARTAS_WATERMARK_TEXT")).unwrap_or(defaults.watermark_text),
            sign_command: non_empty(lookup("CARTAS_SIGN_COMMAND")),
        }
    }
}
