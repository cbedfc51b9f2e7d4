//! Command-line surface: `generate` runs the whole pipeline and writes every
//! artifact to a directory, `inspect` reports on the input sheet.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Settings;
use crate::data::{filter_actors, guess_mapping, prepare_rows, read_first_sheet, ColumnMapping, Field, QualityReport};
use crate::docx::merge_documents_docx;
use crate::export::{
    build_index_sheet, export_pdfs, make_zip, merge_pdfs, CommandSigner, PdfExportOptions, PdfSigner,
    SofficeConverter,
};
use crate::files::{detect_mime_type, load_named_files, FileExtension};
use crate::letters::{generate_letters_per_group, GenerationOptions};
use crate::routing::load_routing_yaml;

pub const ZIP_NAME: &str = "cartas_docx.zip";
pub const INDEX_NAME: &str = "indice_cartas.xlsx";
pub const MERGED_DOCX_NAME: &str = "cartas_consolidado.docx";
pub const MERGED_PDF_NAME: &str = "cartas_consolidado.pdf";

#[derive(Parser, Debug)]
#[command(name = "generador-cartas")]
#[command(about = "Genera una carta DOCX por grupo a partir de una hoja de cálculo", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate one letter per group plus the archive and index
    Generate(GenerateArgs),
    /// Show the guessed column mapping and the data-quality report
    Inspect(InspectArgs),
}

#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    /// Workbook with the records (.xlsx, .xls, .ods)
    #[arg(long)]
    pub data: PathBuf,
    /// Template files or directories; the first by name is the default
    #[arg(long, required = true, num_args = 1..)]
    pub templates: Vec<PathBuf>,
    /// Image files or directories referenced by FIRMA_IMG / LOGO_IMG
    #[arg(long, num_args = 1..)]
    pub assets: Vec<PathBuf>,
    /// Routing YAML
    #[arg(long)]
    pub routing: Option<PathBuf>,
    /// Output directory
    #[arg(long)]
    pub out: PathBuf,
    /// Column used to group records
    #[arg(long, default_value = "actor", value_parser = parse_field)]
    pub group_field: Field,
    /// Table index used when the matching rule names none
    #[arg(long)]
    pub table_index: Option<i64>,
    /// Sort records oldest first
    #[arg(long)]
    pub oldest_first: bool,
    #[arg(long)]
    pub city: Option<String>,
    /// Letter date (YYYY-MM-DD); defaults to today
    #[arg(long, value_parser = parse_day)]
    pub date: Option<NaiveDate>,
    #[arg(long)]
    pub naming_pattern: Option<String>,
    /// Inline image width in inches
    #[arg(long)]
    pub image_width: Option<f64>,
    /// Explicit column assignment, `field=Header`
    #[arg(long = "column", value_parser = parse_column)]
    pub columns: Vec<(Field, String)>,
    /// Only generate letters for these actors
    #[arg(long = "actor")]
    pub actors: Vec<String>,
    /// Also write a consolidated DOCX
    #[arg(long)]
    pub merge_docx: bool,
    /// Export every letter to PDF
    #[arg(long)]
    pub pdf: bool,
    /// Also write a consolidated PDF
    #[arg(long)]
    pub merge_pdf: bool,
    /// Stamp the watermark text on every exported PDF
    #[arg(long)]
    pub watermark: bool,
    #[arg(long)]
    pub watermark_text: Option<String>,
    /// LibreOffice binary
    #[arg(long)]
    pub soffice: Option<String>,
    /// External signer, with {input} and {output} placeholders
    #[arg(long)]
    pub sign_command: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct InspectArgs {
    #[arg(long)]
    pub data: PathBuf,
    /// Explicit column assignment, `field=Header`
    #[arg(long = "column", value_parser = parse_column)]
    pub columns: Vec<(Field, String)>,
}

fn parse_field(raw: &str) -> Result<Field, String> {
    raw.parse()
}

fn parse_day(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|e| format!("fecha inválida '{raw}': {e}"))
}

fn parse_column(raw: &str) -> Result<(Field, String), String> {
    let (field, header) = raw
        .split_once('=')
        .ok_or_else(|| format!("se esperaba campo=Encabezado, no '{raw}'"))?;
    let header = header.trim();
    if header.is_empty() {
        return Err(format!("encabezado vacío en '{raw}'"));
    }
    Ok((field.parse()?, header.to_string()))
}

fn overrides(columns: &[(Field, String)]) -> ColumnMapping {
    columns
        .iter()
        .fold(ColumnMapping::new(), |m, (field, header)| m.with(*field, header.as_str()))
}

/// Applies flags over environment settings.
pub fn generation_options(args: &GenerateArgs, settings: &Settings) -> GenerationOptions {
    GenerationOptions {
        group_field: args.group_field,
        table_index_default: args.table_index,
        newest_first: settings.newest_first && !args.oldest_first,
        city: args.city.clone().unwrap_or_else(|| settings.city.clone()),
        letter_date: args.date,
        naming_pattern: args
            .naming_pattern
            .clone()
            .unwrap_or_else(|| settings.naming_pattern.clone()),
        image_width_in: args
            .image_width
            .filter(|w| *w > 0.0)
            .unwrap_or(settings.image_width_in),
    }
}

fn write_output(dir: &Path, name: &str, data: &[u8]) -> Result<()> {
    let path = dir.join(name);
    fs::write(&path, data).with_context(|| format!("no se pudo escribir {}", path.display()))
}

pub fn run(cli: Cli) -> Result<()> {
    let settings = Settings::from_env();
    match cli.command {
        Commands::Generate(args) => run_generate(&args, &settings),
        Commands::Inspect(args) => run_inspect(&args),
    }
}

pub fn run_generate(args: &GenerateArgs, settings: &Settings) -> Result<()> {
    let sheet = read_first_sheet(&args.data)?;
    let mapping = guess_mapping(&sheet.headers).merged_with(&overrides(&args.columns));
    let rows = filter_actors(prepare_rows(&sheet, &mapping)?, &args.actors);
    if rows.is_empty() {
        bail!("no hay registros para generar cartas");
    }

    let templates = load_named_files(&args.templates, |k| k == FileExtension::Docx)
        .context("no se pudieron leer las plantillas")?;
    let Some(default_name) = templates.keys().min().cloned() else {
        bail!("no se encontró ninguna plantilla .docx");
    };
    log::info!("{} plantilla(s); por defecto: {}", templates.len(), default_name);

    let assets = load_named_files(&args.assets, |k| k.is_image()).context("no se pudieron leer los recursos")?;
    for name in assets.keys() {
        log::debug!("recurso {} ({})", name, detect_mime_type(name));
    }

    let routing_text = args
        .routing
        .as_ref()
        .map(|path| fs::read_to_string(path).with_context(|| format!("no se pudo leer {}", path.display())))
        .transpose()?;
    let routing = load_routing_yaml(routing_text.as_deref());

    let options = generation_options(args, settings);
    let report = generate_letters_per_group(
        &rows,
        &templates[&default_name],
        &templates,
        &routing,
        &assets,
        &options,
    );

    fs::create_dir_all(&args.out).with_context(|| format!("no se pudo crear {}", args.out.display()))?;
    for (name, data) in &report.outputs {
        write_output(&args.out, name, data)?;
    }
    write_output(&args.out, ZIP_NAME, &make_zip(&report.outputs)?)?;
    write_output(&args.out, INDEX_NAME, &build_index_sheet(&report.summary(), &report.errors)?)?;

    if args.merge_docx {
        match merge_documents_docx(&report.outputs) {
            Ok(Some(merged)) => write_output(&args.out, MERGED_DOCX_NAME, &merged)?,
            Ok(None) => log::info!("no hay cartas para consolidar"),
            Err(e) => log::warn!("no se generó el DOCX consolidado: {}", e),
        }
    }

    if args.pdf || routing.any_rule_exports_pdf() {
        let converter = SofficeConverter::new(args.soffice.clone().unwrap_or_else(|| settings.soffice_bin.clone()));
        let signer = args
            .sign_command
            .clone()
            .or_else(|| settings.sign_command.clone())
            .map(CommandSigner::new);
        let pdf_options = PdfExportOptions {
            export_all: args.pdf,
            watermark: args.watermark,
            watermark_text: args
                .watermark_text
                .clone()
                .unwrap_or_else(|| settings.watermark_text.clone()),
        };
        let pdfs = export_pdfs(
            &report,
            &converter,
            signer.as_ref().map(|s| s as &dyn PdfSigner),
            &pdf_options,
        );
        for (name, data) in &pdfs {
            write_output(&args.out, name, data)?;
        }
        if args.merge_pdf {
            let all: Vec<Vec<u8>> = pdfs.into_values().collect();
            match merge_pdfs(&all) {
                Ok(Some(merged)) => write_output(&args.out, MERGED_PDF_NAME, &merged)?,
                Ok(None) => log::info!("no hay PDFs para consolidar"),
                Err(e) => log::warn!("no se generó el PDF consolidado: {}", e),
            }
        }
    }

    for (group, message) in &report.errors {
        log::warn!("{}: {}", group, message);
    }
    log::info!(
        "{} carta(s) escritas en {} ({} grupo(s) con error)",
        report.letters.len(),
        args.out.display(),
        report.errors.len()
    );
    Ok(())
}

pub fn run_inspect(args: &InspectArgs) -> Result<()> {
    let sheet = read_first_sheet(&args.data)?;
    let mapping = guess_mapping(&sheet.headers).merged_with(&overrides(&args.columns));

    println!("Columnas detectadas ({} filas):", sheet.rows.len());
    for field in Field::ALL {
        let column = mapping.get(field).unwrap_or("-");
        println!("  {:<18} {}", field.label(), column);
    }

    let rows = prepare_rows(&sheet, &mapping)?;
    let report = QualityReport::build(&rows, &mapping);
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_column_override() {
        assert_eq!(
            parse_column("nombre_directivo= Jefe de área").unwrap(),
            (Field::NombreDirectivo, "Jefe de área".to_string())
        );
        assert!(parse_column("actor").is_err());
        assert!(parse_column("actor=").is_err());
        assert!(parse_column("desconocido=X").is_err());
    }

    #[test]
    fn test_flags_override_settings() {
        let cli = Cli::try_parse_from([
            "generador-cartas",
            "generate",
            "--data",
            "datos.xlsx",
            "--templates",
            "plantillas",
            "--out",
            "salida",
            "--oldest-first",
            "--city",
            "Cali",
            "--group-field",
            "grupo",
            "--date",
            "2024-03-05",
        ])
        .unwrap();
        let Commands::Generate(args) = cli.command else {
            panic!("se esperaba generate");
        };
        let options = generation_options(&args, &Settings::default());
        assert!(!options.newest_first);
        assert_eq!(options.city, "Cali");
        assert_eq!(options.group_field, Field::Grupo);
        assert_eq!(options.letter_date, NaiveDate::from_ymd_opt(2024, 3, 5));
        assert_eq!(options.naming_pattern, Settings::default().naming_pattern);
    }

    #[test]
    fn test_generate_requires_templates() {
        let parsed = Cli::try_parse_from(["generador-cartas", "generate", "--data", "d.xlsx", "--out", "o"]);
        assert!(parsed.is_err());
    }
}
