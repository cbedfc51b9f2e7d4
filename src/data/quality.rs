//! Data-quality report shown before generating: missing values, duplicated
//! records and per-actor date ranges.

use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::BTreeMap;

use super::mapping::{ColumnMapping, Field};
use super::rows::Row;

const DUPLICATE_KEY: [Field; 5] = [Field::Actor, Field::Mesa, Field::Nivel, Field::Fecha, Field::Dato];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissingStat {
    pub field: Field,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateRange {
    pub actor: String,
    pub min: Option<NaiveDateTime>,
    pub max: Option<NaiveDateTime>,
    /// Every row of the actor, dated or not.
    pub total_records: usize,
    /// Rows whose date parsed; these are the ones `min` and `max` cover.
    pub dated_records: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QualityReport {
    pub total_rows: usize,
    pub missing: Vec<MissingStat>,
    pub duplicates: Vec<Row>,
    pub date_ranges: Vec<DateRange>,
}

impl QualityReport {
    pub fn build(rows: &[Row], mapping: &ColumnMapping) -> Self {
        Self {
            total_rows: rows.len(),
            missing: compute_missing_summary(rows, mapping),
            duplicates: compute_duplicates_by_actor(rows),
            date_ranges: compute_date_ranges_by_actor(rows),
        }
    }
}

/// Percentage (two decimals) of missing values for every mapped field, most
/// incomplete first.
pub fn compute_missing_summary(rows: &[Row], mapping: &ColumnMapping) -> Vec<MissingStat> {
    let mut stats: Vec<MissingStat> = mapping
        .iter()
        .map(|(field, _)| {
            let missing = rows.iter().filter(|r| r.get(field).is_none()).count();
            let percent = if rows.is_empty() {
                0.0
            } else {
                (missing as f64 * 10_000.0 / rows.len() as f64).round() / 100.0
            };
            MissingStat { field, percent }
        })
        .collect();
    stats.sort_by(|a, b| b.percent.total_cmp(&a.percent));
    stats
}

fn duplicate_key(row: &Row) -> Vec<Option<&str>> {
    DUPLICATE_KEY.iter().map(|f| row.get(*f)).collect()
}

/// Every row whose (ACTOR, MESA, NIVEL, FECHA, DATO) appears more than once,
/// ordered by actor, mesa and date text.
pub fn compute_duplicates_by_actor(rows: &[Row]) -> Vec<Row> {
    let mut counts: BTreeMap<Vec<Option<&str>>, usize> = BTreeMap::new();
    for row in rows {
        *counts.entry(duplicate_key(row)).or_default() += 1;
    }
    let mut dups: Vec<&Row> = rows
        .iter()
        .filter(|r| counts.get(&duplicate_key(r)).copied().unwrap_or(0) > 1)
        .collect();
    dups.sort_by_key(|r| (r.get(Field::Actor), r.get(Field::Mesa), r.get(Field::Fecha)));
    dups.into_iter().cloned().collect()
}

/// Earliest and latest parsed date per actor. Rows without actor are skipped.
pub fn compute_date_ranges_by_actor(rows: &[Row]) -> Vec<DateRange> {
    let mut ranges: BTreeMap<&str, DateRange> = BTreeMap::new();
    for row in rows {
        let Some(actor) = row.get(Field::Actor) else {
            continue;
        };
        let entry = ranges.entry(actor).or_insert_with(|| DateRange {
            actor: actor.to_string(),
            min: None,
            max: None,
            total_records: 0,
            dated_records: 0,
        });
        entry.total_records += 1;
        if let Some(ts) = row.fecha_ts {
            entry.dated_records += 1;
            entry.min = Some(entry.min.map_or(ts, |m| m.min(ts)));
            entry.max = Some(entry.max.map_or(ts, |m| m.max(ts)));
        }
    }
    ranges.into_values().collect()
}
