//! Logical roles of the source columns and alias-based column guessing.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::text::normalize;

/// Logical field of a prepared row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Actor,
    NombreDirectivo,
    Prefijo,
    Mesa,
    Nivel,
    Fecha,
    Dato,
    Grupo,
    FirmaImg,
    LogoImg,
}

impl Field {
    pub const ALL: [Field; 10] = [
        Field::Actor,
        Field::NombreDirectivo,
        Field::Prefijo,
        Field::Mesa,
        Field::Nivel,
        Field::Fecha,
        Field::Dato,
        Field::Grupo,
        Field::FirmaImg,
        Field::LogoImg,
    ];

    /// Roles that must be mapped before any letter is generated.
    pub const REQUIRED: [Field; 7] = [
        Field::Actor,
        Field::NombreDirectivo,
        Field::Prefijo,
        Field::Mesa,
        Field::Nivel,
        Field::Fecha,
        Field::Dato,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Field::Actor => "actor",
            Field::NombreDirectivo => "nombre_directivo",
            Field::Prefijo => "prefijo",
            Field::Mesa => "mesa",
            Field::Nivel => "nivel",
            Field::Fecha => "fecha",
            Field::Dato => "dato",
            Field::Grupo => "grupo",
            Field::FirmaImg => "firma_img",
            Field::LogoImg => "logo_img",
        }
    }

    /// Column name of the field in prepared rows.
    pub fn column_name(&self) -> &'static str {
        match self {
            Field::Actor => "ACTOR",
            Field::NombreDirectivo => "NOMBRE_DIRECTIVO",
            Field::Prefijo => "PREFIJO",
            Field::Mesa => "MESA",
            Field::Nivel => "NIVEL",
            Field::Fecha => "FECHA",
            Field::Dato => "DATO",
            Field::Grupo => "GRUPO",
            Field::FirmaImg => "FIRMA_IMG",
            Field::LogoImg => "LOGO_IMG",
        }
    }

    /// Human label used in validation messages.
    pub fn label(&self) -> &'static str {
        match self {
            Field::Actor => "ACTOR",
            Field::NombreDirectivo => "NOMBRE DIRECTIVO",
            Field::Prefijo => "PREFIJO",
            Field::Mesa => "Nombre de la mesa",
            Field::Nivel => "Nivel",
            Field::Fecha => "Fecha",
            Field::Dato => "Dato transformador",
            Field::Grupo => "Grupo",
            Field::FirmaImg => "Archivo firma",
            Field::LogoImg => "Archivo logo",
        }
    }

    /// Normalised header aliases recognised for the field.
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            Field::Actor => &[
                "actor",
                "columna a",
                "a",
                "interesado",
                "responsable",
                "nombre del actor",
            ],
            Field::NombreDirectivo => &[
                "nombre directivo",
                "directivo",
                "dirigido a",
                "nombre del directivo",
                "nombre destinatario",
            ],
            Field::Prefijo => &["prefijo", "tratamiento", "titulo"],
            Field::Mesa => &[
                "nombre de la mesa",
                "nombre mesa",
                "mesa",
                "tema",
                "asunto",
                "actividad",
            ],
            Field::Nivel => &["nivel", "compromiso", "tipo", "categoria"],
            Field::Fecha => &[
                "fecha",
                "fecha mesa",
                "fecha programada",
                "dia",
                "fecha de realizacion",
            ],
            Field::Dato => &[
                "dato transformador",
                "dato",
                "transformador",
                "descripcion dato",
                "resultado esperado",
            ],
            Field::Grupo => &[
                "dependencia",
                "secretaria",
                "entidad",
                "despacho",
                "direccion",
                "institucion",
                "grupo",
            ],
            Field::FirmaImg => &[
                "firma_img",
                "firma imagen",
                "firma",
                "imagen firma",
                "archivo firma",
                "firma path",
            ],
            Field::LogoImg => &[
                "logo_img",
                "logo imagen",
                "logo",
                "imagen logo",
                "archivo logo",
                "logo path",
            ],
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

impl FromStr for Field {
    type Err = String;

    /// Accepts the role key (`nombre_directivo`) or the column name
    /// (`NOMBRE_DIRECTIVO`), case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace(' ', "_");
        Field::ALL
            .into_iter()
            .find(|f| f.key() == wanted)
            .ok_or_else(|| format!("campo desconocido '{s}'"))
    }
}

/// Role -> source column header.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ColumnMapping {
    columns: BTreeMap<Field, String>,
}

impl ColumnMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, field: Field, column: impl Into<String>) {
        self.columns.insert(field, column.into());
    }

    pub fn with(mut self, field: Field, column: impl Into<String>) -> Self {
        self.set(field, column);
        self
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.columns.get(&field).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        self.columns.iter().map(|(f, c)| (*f, c.as_str()))
    }

    /// Explicit assignments in `overrides` replace guessed ones.
    pub fn merged_with(mut self, overrides: &ColumnMapping) -> Self {
        for (field, column) in overrides.iter() {
            self.set(field, column);
        }
        self
    }
}

/// Partial (substring) matches only consider aliases at least this long, so
/// one-letter aliases like "a" only ever match exactly.
const MIN_PARTIAL_ALIAS_LEN: usize = 3;

/// Guess the column for every role: an exact normalised alias match wins,
/// otherwise the first header containing one of the aliases.
pub fn guess_mapping(headers: &[String]) -> ColumnMapping {
    let normalized: Vec<(usize, String)> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| (i, normalize(h)))
        .collect();

    let mut mapping = ColumnMapping::new();
    for field in Field::ALL {
        let aliases = field.aliases();
        let exact = normalized
            .iter()
            .find(|(_, h)| aliases.contains(&h.as_str()));
        let partial = || {
            normalized.iter().find(|(_, h)| {
                aliases
                    .iter()
                    .filter(|a| a.len() >= MIN_PARTIAL_ALIAS_LEN)
                    .any(|a| h.contains(a))
            })
        };
        if let Some((index, _)) = exact.or_else(partial) {
            mapping.set(field, headers[*index].clone());
        }
    }
    mapping
}
