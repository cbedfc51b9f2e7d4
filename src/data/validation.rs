//! Required-column validation.
//!
//! Every problem is collected before reporting so the user can fix the whole
//! mapping in one go.

use std::fmt;

use super::mapping::{ColumnMapping, Field};

/// One problem with the column mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Role key that failed validation
    pub field: String,
    /// Human-readable message in Spanish
    pub message: String,
    /// How to fix it
    pub suggestion: Option<String>,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            suggestion: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// No column was mapped to a required role.
    pub fn missing_column(field: Field) -> Self {
        Self::new(
            field.key(),
            format!("Columna requerida no encontrada para '{}'", field.key()),
        )
        .with_suggestion(format!(
            "Agregue una columna '{}' o asígnela con --column {}=<encabezado>",
            field.label(),
            field.key()
        ))
    }

    /// The mapped header does not exist in the sheet.
    pub fn unknown_column(field: Field, column: &str) -> Self {
        Self::new(
            field.key(),
            format!("La columna '{}' asignada a '{}' no existe en la hoja", column, field.key()),
        )
        .with_suggestion("Revise el encabezado exacto en la primera fila del archivo")
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.field, self.message)?;
        if let Some(ref suggestion) = self.suggestion {
            write!(f, ". {}", suggestion)?;
        }
        Ok(())
    }
}

/// Collection of validation errors with formatted output.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ValidationErrors {
    errors: Vec<ValidationError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    pub fn add(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.errors.iter()
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Validación fallida: {} problema(s) con las columnas",
            self.errors.len()
        )?;
        for (i, error) in self.errors.iter().enumerate() {
            writeln!(f, "{}. {}", i + 1, error)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Every required role must be mapped to a header present in the sheet;
/// optional roles are only checked when mapped.
pub fn validate_mapping(mapping: &ColumnMapping, headers: &[String]) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    for field in Field::ALL {
        match mapping.get(field) {
            Some(column) if headers.iter().any(|h| h == column) => {}
            Some(column) => errors.add(ValidationError::unknown_column(field, column)),
            None if Field::REQUIRED.contains(&field) => {
                errors.add(ValidationError::missing_column(field))
            }
            None => {}
        }
    }
    errors.into_result()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_missing_roles_are_reported() {
        let headers = vec!["Actor".to_string(), "Fecha".to_string()];
        let mapping = ColumnMapping::new()
            .with(Field::Actor, "Actor")
            .with(Field::Fecha, "Fecha");
        let errors = validate_mapping(&mapping, &headers).unwrap_err();
        assert_eq!(errors.len(), 5);
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, ["nombre_directivo", "prefijo", "mesa", "nivel", "dato"]);
    }

    #[test]
    fn test_unknown_optional_column_is_reported() {
        let headers: Vec<String> = ["A", "B", "C", "D", "E", "F", "G"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let mapping = ColumnMapping::new()
            .with(Field::Actor, "A")
            .with(Field::NombreDirectivo, "B")
            .with(Field::Prefijo, "C")
            .with(Field::Mesa, "D")
            .with(Field::Nivel, "E")
            .with(Field::Fecha, "F")
            .with(Field::Dato, "G")
            .with(Field::Grupo, "Dependencia");
        let errors = validate_mapping(&mapping, &headers).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors.to_string().contains("Dependencia"));
    }

    #[test]
    fn test_display_numbers_each_error() {
        let mut errors = ValidationErrors::new();
        errors.add(ValidationError::missing_column(Field::Mesa));
        let text = errors.to_string();
        assert!(text.contains("1 problema(s)"));
        assert!(text.contains("1. [mesa] Columna requerida no encontrada para 'mesa'"));
    }
}
