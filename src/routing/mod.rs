//! Routing configuration: which template, table and export options apply to
//! each group, plus derived placeholders and the footer settings.
//!
//! ```yaml
//! templates:
//!   - match: 'Hacienda'
//!     template: 'MODELO_B.docx'
//!     table_index: 1
//!     export_pdf: true
//!     naming_pattern: 'HAC_{GRUPO}.docx'
//!     watermark_text: 'CONFIDENCIAL'
//!   - match_regex: '^Secretaría de Gobierno$'
//!     template: 'MODELO_A.docx'
//!     table_index: 0
//! derived_placeholders:
//!   SALUDO: '{{ PREFIJO }} {{ NOMBRE_DIRECTIVO }}'
//! footer_text: 'Alcaldía de Medellín'
//! footer_logo_name: 'logo.png'
//! ```

pub mod derived;
pub mod router;

pub use derived::render_derived_placeholders;
pub use router::{route, RouteDecision};

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::Value;

/// One routing rule. Rules are evaluated in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingRule {
    /// Case-insensitive substring of the group name.
    #[serde(rename = "match", deserialize_with = "optional_scalar")]
    pub match_text: Option<String>,
    #[serde(deserialize_with = "optional_scalar")]
    pub match_regex: Option<String>,
    #[serde(deserialize_with = "optional_scalar")]
    pub template: Option<String>,
    pub table_index: Option<i64>,
    pub export_pdf: bool,
    #[serde(deserialize_with = "optional_scalar")]
    pub naming_pattern: Option<String>,
    #[serde(deserialize_with = "optional_scalar")]
    pub watermark_text: Option<String>,
    pub sign_pdf: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    pub templates: Vec<RoutingRule>,
    #[serde(deserialize_with = "scalar_map")]
    pub derived_placeholders: IndexMap<String, String>,
    #[serde(deserialize_with = "optional_scalar")]
    pub footer_text: Option<String>,
    #[serde(deserialize_with = "optional_scalar")]
    pub footer_logo_name: Option<String>,
}

impl RoutingConfig {
    pub fn footer_text(&self) -> &str {
        self.footer_text.as_deref().unwrap_or_default()
    }

    pub fn any_rule_exports_pdf(&self) -> bool {
        self.templates.iter().any(|r| r.export_pdf)
    }
}

/// Parses the routing YAML. Empty or malformed input yields the empty
/// configuration; this never fails.
pub fn load_routing_yaml(text: Option<&str>) -> RoutingConfig {
    let Some(text) = text.filter(|t| !t.trim().is_empty()) else {
        return RoutingConfig::default();
    };
    match serde_yaml::from_str::<Option<RoutingConfig>>(text) {
        Ok(config) => {
            let config = config.unwrap_or_default();
            log::info!(
                "Configuración de ruteo: {} regla(s), {} derivado(s)",
                config.templates.len(),
                config.derived_placeholders.len()
            );
            config
        }
        Err(e) => {
            log::warn!("YAML de ruteo inválido, se usan valores por defecto: {}", e);
            RoutingConfig::default()
        }
    }
}

/// String form of a YAML scalar; collections have none.
fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Tagged(tagged) => scalar_to_string(&tagged.value),
        Value::Null | Value::Sequence(_) | Value::Mapping(_) => None,
    }
}

fn optional_scalar<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(scalar_to_string(&value).filter(|s| !s.is_empty()))
}

fn scalar_map<'de, D>(deserializer: D) -> Result<IndexMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<IndexMap<String, Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(raw
        .into_iter()
        .map(|(key, value)| {
            let expr = scalar_to_string(&value).unwrap_or_else(|| {
                log::debug!("derivado '{}' no es un texto; se deja vacío", key);
                String::new()
            });
            (key, expr)
        })
        .collect())
}
