//! Per-group letter orchestration.
//!
//! Rows are sorted by date, partitioned by the grouping field and turned into
//! one document per group. A failing group is recorded in the error ledger
//! and never stops the others.

use chrono::NaiveDate;
use indexmap::IndexMap;
use std::collections::BTreeMap;

use super::common::{apply_naming_pattern, format_long_date, letter_date_or_today, with_numeric_suffix, NO_GROUP};
use super::placeholders::replace_text_and_images;
use super::table::{clear_table_keep_header, fill_table, find_target_table};
use super::GeneratorError;
use crate::data::{Field, Row};
use crate::docx::footer::add_footer_with_page_numbers;
use crate::docx::Document;
use crate::routing::{render_derived_placeholders, route, RoutingConfig, RoutingRule};
use crate::NamedBlobs;

const FOOTER_LOGO_WIDTH_IN: f64 = 1.0;

/// Fields written to the records table, in column order.
const TABLE_FIELDS: [Field; 4] = [Field::Mesa, Field::Nivel, Field::Fecha, Field::Dato];

#[derive(Debug, Clone)]
pub struct GenerationOptions {
    pub group_field: Field,
    /// Table index used when the matched rule names none.
    pub table_index_default: Option<i64>,
    pub newest_first: bool,
    pub city: String,
    pub letter_date: Option<NaiveDate>,
    pub naming_pattern: String,
    pub image_width_in: f64,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            group_field: Field::Actor,
            table_index_default: None,
            newest_first: true,
            city: "Medellín".to_string(),
            letter_date: None,
            naming_pattern: "CARTA_{GRUPO}.docx".to_string(),
            image_width_in: 1.5,
        }
    }
}

/// A successfully generated letter.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedLetter {
    pub group: String,
    pub file_name: String,
    pub records: usize,
    /// Routing rule that matched the group, if any.
    pub rule: Option<RoutingRule>,
}

#[derive(Debug, Clone, Default)]
pub struct GenerationReport {
    /// File name -> DOCX bytes, in generation order.
    pub outputs: NamedBlobs,
    /// Successful letters sorted by group name.
    pub letters: Vec<GeneratedLetter>,
    /// Group name -> error message.
    pub errors: BTreeMap<String, String>,
}

impl GenerationReport {
    /// (group, record count) pairs sorted by group.
    pub fn summary(&self) -> Vec<(String, usize)> {
        self.letters
            .iter()
            .map(|l| (l.group.clone(), l.records))
            .collect()
    }

    pub fn letter_for_file(&self, file_name: &str) -> Option<&GeneratedLetter> {
        self.letters.iter().find(|l| l.file_name == file_name)
    }
}

/// Sorts by parsed date (rows without a date always last) and partitions by
/// the grouping field. Groups come out in name order, the missing-key group
/// last; rows keep the sorted order inside each group.
pub fn group_rows<'r>(rows: &'r [Row], group_field: Field, newest_first: bool) -> Vec<(String, Vec<&'r Row>)> {
    let mut sorted: Vec<&Row> = rows.iter().collect();
    sorted.sort_by(|a, b| match (a.fecha_ts, b.fecha_ts) {
        (Some(x), Some(y)) if newest_first => y.cmp(&x),
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });

    let mut groups: BTreeMap<&str, Vec<&Row>> = BTreeMap::new();
    let mut ungrouped: Vec<&Row> = Vec::new();
    for row in sorted {
        match row.get(group_field) {
            Some(key) => groups.entry(key).or_default().push(row),
            None => ungrouped.push(row),
        }
    }

    let mut out: Vec<(String, Vec<&Row>)> = groups
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
    if !ungrouped.is_empty() {
        match out.iter_mut().find(|(name, _)| name.as_str() == NO_GROUP) {
            Some((_, existing)) => existing.extend(ungrouped),
            None => out.push((NO_GROUP.to_string(), ungrouped)),
        }
    }
    out
}

fn first_value<'r>(rows: &[&'r Row], field: Field) -> Option<&'r str> {
    rows.iter().find_map(|r| r.get(field))
}

/// Shared, read-only inputs of one generation run.
struct LetterBuilder<'a> {
    default_template: &'a [u8],
    templates: &'a NamedBlobs,
    routing: &'a RoutingConfig,
    assets: &'a NamedBlobs,
    options: &'a GenerationOptions,
    letter_date: String,
}

impl<'a> LetterBuilder<'a> {
    fn text_map(&self, group_name: &str, rows: &[&Row]) -> IndexMap<String, String> {
        let mut text = IndexMap::new();
        text.insert(
            "ACTOR".to_string(),
            first_value(rows, Field::Actor).unwrap_or(group_name).to_string(),
        );
        text.insert(
            "NOMBRE DIRECTIVO".to_string(),
            first_value(rows, Field::NombreDirectivo).unwrap_or_default().to_string(),
        );
        text.insert(
            "PREFIJO".to_string(),
            first_value(rows, Field::Prefijo).unwrap_or_default().to_string(),
        );
        text.insert("FECHA_CARTA".to_string(), self.letter_date.clone());

        let derived = render_derived_placeholders(&text, &self.routing.derived_placeholders);
        text.extend(derived);
        text
    }

    fn image_map(&self, group_name: &str, rows: &[&Row]) -> IndexMap<String, Vec<u8>> {
        let mut images = IndexMap::new();
        for (field, key) in [(Field::FirmaImg, "IMG_FIRMA"), (Field::LogoImg, "IMG_LOGO")] {
            let Some(file_name) = first_value(rows, field) else {
                continue;
            };
            match self.assets.get(file_name) {
                Some(bytes) => {
                    images.insert(key.to_string(), bytes.clone());
                }
                None => log::debug!("[{}] imagen '{}' no encontrada en los recursos", group_name, file_name),
            }
        }
        images
    }

    fn build(&self, group_name: &str, rows: &[&Row]) -> Result<(String, Vec<u8>, Option<&'a RoutingRule>), GeneratorError> {
        let decision = route(group_name, self.templates, self.routing);
        let template = decision.template.unwrap_or(self.default_template);
        let table_index = decision.table_index.or(self.options.table_index_default);

        let text = self.text_map(group_name, rows);
        let images = self.image_map(group_name, rows);

        let mut doc = Document::from_bytes(template)?;
        let target = find_target_table(&doc, table_index).ok_or(GeneratorError::NoTargetTable)?;
        let records: Vec<Vec<String>> = rows
            .iter()
            .map(|r| TABLE_FIELDS.iter().map(|f| r.cell_value(*f)).collect())
            .collect();
        let table = doc.table_mut(target).ok_or(GeneratorError::NoTargetTable)?;
        clear_table_keep_header(table);
        fill_table(table, &records);

        replace_text_and_images(&mut doc, &text, &images, self.options.image_width_in);

        let footer_text = self.routing.footer_text();
        let footer_logo = self
            .routing
            .footer_logo_name
            .as_deref()
            .and_then(|name| self.assets.get(name))
            .map(Vec::as_slice);
        if !footer_text.is_empty() || footer_logo.is_some() {
            add_footer_with_page_numbers(&mut doc, footer_text, footer_logo, FOOTER_LOGO_WIDTH_IN)?;
        }

        let data = doc.to_bytes()?;
        let pattern = decision
            .rule
            .and_then(|r| r.naming_pattern.as_deref())
            .unwrap_or(self.options.naming_pattern.as_str());
        Ok((apply_naming_pattern(pattern, group_name), data, decision.rule))
    }
}

/// Generates one letter per group.
///
/// `default_template` is used whenever routing yields no template.
pub fn generate_letters_per_group(
    rows: &[Row],
    default_template: &[u8],
    templates: &NamedBlobs,
    routing: &RoutingConfig,
    assets: &NamedBlobs,
    options: &GenerationOptions,
) -> GenerationReport {
    let builder = LetterBuilder {
        default_template,
        templates,
        routing,
        assets,
        options,
        letter_date: format_long_date(&options.city, letter_date_or_today(options.letter_date)),
    };

    let mut report = GenerationReport::default();
    for (group_name, group) in group_rows(rows, options.group_field, options.newest_first) {
        match builder.build(&group_name, &group) {
            Ok((file_name, data, rule)) => {
                let mut unique = file_name.clone();
                let mut n = 2;
                while report.outputs.contains_key(&unique) {
                    unique = with_numeric_suffix(&file_name, n);
                    n += 1;
                }
                if unique != file_name {
                    log::warn!("[{}] nombre '{}' repetido; se guarda como '{}'", group_name, file_name, unique);
                }
                log::info!("[{}] carta generada: {} ({} registros)", group_name, unique, group.len());
                report.outputs.insert(unique.clone(), data);
                report.letters.push(GeneratedLetter {
                    group: group_name,
                    file_name: unique,
                    records: group.len(),
                    rule: rule.cloned(),
                });
            }
            Err(e) => {
                log::warn!("[{}] no se generó la carta: {}", group_name, e);
                report.errors.insert(group_name, e.to_string());
            }
        }
    }

    report.letters.sort_by(|a, b| a.group.cmp(&b.group));
    log::info!(
        "Generación terminada: {} carta(s), {} error(es)",
        report.letters.len(),
        report.errors.len()
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(actor: Option<&str>, fecha: &str) -> Row {
        let row = Row::new().with(Field::Fecha, fecha);
        match actor {
            Some(a) => row.with(Field::Actor, a),
            None => row,
        }
    }

    #[test]
    fn test_group_rows_sorted_newest_first_with_undated_last() {
        let rows = vec![
            row(Some("B"), "2024-01-01"),
            row(Some("A"), "sin fecha"),
            row(Some("A"), "2024-01-01"),
            row(Some("A"), "2024-06-01"),
            row(None, "2024-02-01"),
        ];
        let groups = group_rows(&rows, Field::Actor, true);
        let names: Vec<_> = groups.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["A", "B", NO_GROUP]);
        let dates: Vec<_> = groups[0].1.iter().map(|r| r.fecha_fmt.as_str()).collect();
        assert_eq!(dates, ["01/06/2024", "01/01/2024", ""]);

        let groups = group_rows(&rows, Field::Actor, false);
        let dates: Vec<_> = groups[0].1.iter().map(|r| r.fecha_fmt.as_str()).collect();
        assert_eq!(dates, ["01/01/2024", "01/06/2024", ""]);
    }

    #[test]
    fn test_group_rows_by_other_field() {
        let rows = vec![
            row(Some("A"), "2024-01-01").with(Field::Grupo, "Hacienda"),
            row(Some("B"), "2024-01-02").with(Field::Grupo, "Hacienda"),
        ];
        let groups = group_rows(&rows, Field::Grupo, true);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].1.len(), 2);
    }

    #[test]
    fn test_text_map_falls_back_to_group_name() {
        let routing = RoutingConfig::default();
        let templates = NamedBlobs::new();
        let options = GenerationOptions::default();
        let builder = LetterBuilder {
            default_template: &[],
            templates: &templates,
            routing: &routing,
            assets: &templates,
            options: &options,
            letter_date: "Medellín, 1 de enero de 2024".to_string(),
        };
        let r = Row::new().with(Field::Grupo, "Rentas");
        let text = builder.text_map("Rentas", &[&r]);
        assert_eq!(text["ACTOR"], "Rentas");
        assert_eq!(text["NOMBRE DIRECTIVO"], "");
        assert_eq!(text["FECHA_CARTA"], "Medellín, 1 de enero de 2024");
    }
}
