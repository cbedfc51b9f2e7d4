//! Derived placeholders: small `{{ KEY | filter }}` expressions rendered once
//! over the base placeholder map.
//!
//! Every expression sees only the base map (never another derived output).
//! Keys are reachable by name and by their identifier form, with spaces
//! turned into underscores (`NOMBRE DIRECTIVO` -> `NOMBRE_DIRECTIVO`).

use indexmap::IndexMap;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;
use thiserror::Error;

static EXPRESSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{\{(.*?)\}\}").expect("valid expression pattern"));

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier pattern"));

#[derive(Debug, Error, PartialEq)]
pub enum ExpressionError {
    #[error("expresión vacía")]
    Empty,
    #[error("nombre de variable inválido '{0}'")]
    InvalidName(String),
    #[error("filtro desconocido '{0}'")]
    UnknownFilter(String),
    #[error("bloque sin cerrar o sentencia no soportada")]
    Syntax,
}

fn apply_filter(value: String, filter: &str) -> Result<String, ExpressionError> {
    Ok(match filter {
        "upper" => value.to_uppercase(),
        "lower" => value.to_lowercase(),
        "trim" => value.trim().to_string(),
        "capitalize" => capitalize(&value),
        "title" => value
            .split(' ')
            .map(capitalize)
            .collect::<Vec<_>>()
            .join(" "),
        other => return Err(ExpressionError::UnknownFilter(other.to_string())),
    })
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

fn evaluate(inner: &str, context: &HashMap<String, &str>) -> Result<String, ExpressionError> {
    let mut parts = inner.split('|').map(str::trim);
    let name = parts.next().filter(|n| !n.is_empty()).ok_or(ExpressionError::Empty)?;
    if !IDENTIFIER.is_match(name) {
        return Err(ExpressionError::InvalidName(name.to_string()));
    }
    let value = context.get(name).map(|v| v.to_string()).unwrap_or_default();
    parts.try_fold(value, apply_filter)
}

/// Renders one expression. Unknown keys render empty.
pub fn render_expression(expr: &str, context: &HashMap<String, &str>) -> Result<String, ExpressionError> {
    if expr.contains("{%") || expr.contains("{#") {
        return Err(ExpressionError::Syntax);
    }
    let mut out = String::with_capacity(expr.len());
    let mut last = 0;
    for caps in EXPRESSION.captures_iter(expr) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let literal = &expr[last..whole.start()];
        if literal.contains("{{") {
            return Err(ExpressionError::Syntax);
        }
        out.push_str(literal);
        out.push_str(&evaluate(inner.as_str(), context)?);
        last = whole.end();
    }
    let tail = &expr[last..];
    if tail.contains("{{") {
        return Err(ExpressionError::Syntax);
    }
    out.push_str(tail);
    Ok(out)
}

/// Renders every derived key in declaration order. A key whose expression
/// fails renders as an empty string.
pub fn render_derived_placeholders(
    base: &IndexMap<String, String>,
    derived: &IndexMap<String, String>,
) -> IndexMap<String, String> {
    let mut context: HashMap<String, &str> = HashMap::new();
    for (key, value) in base {
        context.insert(key.clone(), value.as_str());
        context.entry(key.replace(' ', "_")).or_insert(value.as_str());
    }

    derived
        .iter()
        .map(|(key, expr)| {
            let value = render_expression(expr, &context).unwrap_or_else(|e| {
                log::debug!("derivado '{}' no se pudo evaluar: {}", key, e);
                String::new()
            });
            (key.clone(), value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> IndexMap<String, String> {
        let mut m = IndexMap::new();
        m.insert("ACTOR".to_string(), "Secretaría de Hacienda".to_string());
        m.insert("NOMBRE DIRECTIVO".to_string(), "ana gómez".to_string());
        m.insert("PREFIJO".to_string(), "Dra.".to_string());
        m
    }

    fn derived(pairs: &[(&str, &str)]) -> IndexMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_renders_in_declaration_order() {
        let out = render_derived_placeholders(
            &base(),
            &derived(&[
                ("SALUDO", "{{PREFIJO}} {{ NOMBRE_DIRECTIVO | title }}"),
                ("ACTOR_MAYUS", "{{ ACTOR | upper }}"),
            ]),
        );
        let keys: Vec<_> = out.keys().cloned().collect();
        assert_eq!(keys, ["SALUDO", "ACTOR_MAYUS"]);
        assert_eq!(out["SALUDO"], "Dra. Ana Gómez");
        assert_eq!(out["ACTOR_MAYUS"], "SECRETARÍA DE HACIENDA");
    }

    #[test]
    fn test_failures_render_empty_without_aborting() {
        let out = render_derived_placeholders(
            &base(),
            &derived(&[
                ("MALO", "{{ ACTOR | reverse }}"),
                ("ABIERTO", "Hola {{ ACTOR"),
                ("BLOQUE", "{% if ACTOR %}x{% endif %}"),
                ("BUENO", "Señor(a) {{ACTOR}}"),
            ]),
        );
        assert_eq!(out["MALO"], "");
        assert_eq!(out["ABIERTO"], "");
        assert_eq!(out["BLOQUE"], "");
        assert_eq!(out["BUENO"], "Señor(a) Secretaría de Hacienda");
    }

    #[test]
    fn test_unknown_key_and_derived_references_are_empty() {
        let out = render_derived_placeholders(
            &base(),
            &derived(&[("A", "{{ PREFIJO }}"), ("B", "[{{ A }}][{{ NO_EXISTE }}]")]),
        );
        assert_eq!(out["B"], "[][]");
    }

    #[test]
    fn test_capitalize_and_trim() {
        let mut m = IndexMap::new();
        m.insert("X".to_string(), "  hOLA mundo ".to_string());
        let out = render_derived_placeholders(&m, &derived(&[("Y", "{{ X | trim | capitalize }}")]));
        assert_eq!(out["Y"], "Hola mundo");
    }
}
