//! First-match-wins selection of the routing rule for a group.

use regex::Regex;

use super::{RoutingConfig, RoutingRule};
use crate::NamedBlobs;

/// Outcome of routing one group. Every field is empty when no rule matched.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RouteDecision<'a> {
    /// Bytes of the rule's template, if it names one that exists.
    pub template: Option<&'a [u8]>,
    pub table_index: Option<i64>,
    pub rule: Option<&'a RoutingRule>,
}

impl RoutingRule {
    /// Literal substring (case-insensitive) or regex search on the group
    /// name. An invalid regex never matches.
    pub fn matches(&self, group_name: &str) -> bool {
        if let Some(literal) = &self.match_text {
            if group_name.to_lowercase().contains(&literal.to_lowercase()) {
                return true;
            }
        }
        match &self.match_regex {
            Some(pattern) => match Regex::new(pattern) {
                Ok(re) => re.is_match(group_name),
                Err(e) => {
                    log::debug!("regex de ruteo inválida '{}': {}", pattern, e);
                    false
                }
            },
            None => false,
        }
    }
}

pub fn route<'a>(group_name: &str, templates: &'a NamedBlobs, config: &'a RoutingConfig) -> RouteDecision<'a> {
    let Some(rule) = config.templates.iter().find(|r| r.matches(group_name)) else {
        return RouteDecision::default();
    };
    let template = rule.template.as_deref().and_then(|name| {
        let bytes = templates.get(name).map(Vec::as_slice);
        if bytes.is_none() {
            log::debug!("plantilla '{}' de la regla no está disponible", name);
        }
        bytes
    });
    RouteDecision {
        template,
        table_index: rule.table_index,
        rule: Some(rule),
    }
}
