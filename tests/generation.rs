mod common;

use common::{body_texts, letter_template, part_text, png, table_rows, TemplateBuilder, TABLE_HEADERS};
use generador_cartas::data::{Field, Row};
use generador_cartas::letters::common::NO_GROUP;
use generador_cartas::routing::route;
use generador_cartas::{generate_letters_per_group, load_routing_yaml, GenerationOptions, NamedBlobs, RoutingConfig};

fn record(actor: &str, mesa: &str, fecha: &str) -> Row {
    Row::new()
        .with(Field::Actor, actor)
        .with(Field::NombreDirectivo, "Ana Gómez")
        .with(Field::Prefijo, "Dra.")
        .with(Field::Mesa, mesa)
        .with(Field::Nivel, "Alto")
        .with(Field::Fecha, fecha)
        .with(Field::Dato, "D1")
}

fn fixed_options() -> GenerationOptions {
    GenerationOptions {
        letter_date: chrono::NaiveDate::from_ymd_opt(2024, 3, 5),
        ..GenerationOptions::default()
    }
}

#[test]
fn test_route_first_matching_rule_wins() {
    let mut templates = NamedBlobs::new();
    templates.insert("A".to_string(), b"plantilla A".to_vec());
    templates.insert("B".to_string(), b"plantilla B".to_vec());
    let config = load_routing_yaml(Some(
        "templates:\n  - match: Hacienda\n    template: B\n    table_index: 1\n  - match_regex: '.*'\n    template: A\n",
    ));

    let decision = route("Secretaría de Hacienda", &templates, &config);
    assert_eq!(decision.template, Some(b"plantilla B".as_slice()));
    assert_eq!(decision.table_index, Some(1));
    assert_eq!(decision.rule, config.templates.first());

    let empty = RoutingConfig::default();
    let decision = route("Depto. Técnico", &templates, &empty);
    assert_eq!(decision.template, None);
    assert_eq!(decision.table_index, None);
    assert!(decision.rule.is_none());
}

#[test]
fn test_letter_renders_placeholders_and_table() {
    let rows = vec![
        record("Juan Pérez", "Mesa 1", "2024-01-10"),
        record("Juan Pérez", "Mesa 2", "2024-02-10"),
    ];
    let template = letter_template("Estimado {{ACTOR}}");
    let report = generate_letters_per_group(
        &rows,
        &template,
        &NamedBlobs::new(),
        &RoutingConfig::default(),
        &NamedBlobs::new(),
        &fixed_options(),
    );

    assert!(report.errors.is_empty());
    let docx = &report.outputs["CARTA_Juan_Perez.docx"];
    let texts = body_texts(docx);
    assert_eq!(texts[0], "Estimado Juan Pérez");
    assert_eq!(texts[1], "Señor(a) Ana Gómez, Juan Pérez");
    assert_eq!(texts[2], "Medellín, 5 de marzo de 2024");

    let table = table_rows(docx, 0);
    assert_eq!(table.len(), 3);
    assert_eq!(table[0], TABLE_HEADERS);
    assert_eq!(table[1], ["Mesa 2", "Alto", "10/02/2024", "D1"]);
    assert_eq!(table[2], ["Mesa 1", "Alto", "10/01/2024", "D1"]);
}

#[test]
fn test_failing_group_is_contained() {
    let rows = vec![
        record("A", "m1", "2024-01-01"),
        record("A", "m2", "2024-01-02"),
        record("B", "m3", "2024-01-03"),
    ];
    let mut templates = NamedBlobs::new();
    templates.insert("roto.docx".to_string(), b"esto no es un docx".to_vec());
    let config = load_routing_yaml(Some("templates:\n  - match_regex: '^A$'\n    template: roto.docx\n"));

    let report = generate_letters_per_group(
        &rows,
        &letter_template("Hola"),
        &templates,
        &config,
        &NamedBlobs::new(),
        &fixed_options(),
    );

    assert_eq!(report.outputs.keys().collect::<Vec<_>>(), ["CARTA_B.docx"]);
    assert_eq!(report.errors.keys().collect::<Vec<_>>(), ["A"]);
    assert!(!report.errors["A"].is_empty());
    assert_eq!(report.summary(), [("B".to_string(), 1)]);
}

#[test]
fn test_template_without_table_fails_only_that_group() {
    let rows = vec![record("A", "m1", "2024-01-01"), record("B", "m2", "2024-01-02")];
    let mut templates = NamedBlobs::new();
    templates.insert(
        "sin_tabla.docx".to_string(),
        TemplateBuilder::new()
            .paragraph("{{ACTOR}}")
            .table(&["uno", "dos"], &[])
            .build(),
    );
    let config = load_routing_yaml(Some("templates:\n  - match: b\n    template: sin_tabla.docx\n"));

    let report = generate_letters_per_group(
        &rows,
        &letter_template("x"),
        &templates,
        &config,
        &NamedBlobs::new(),
        &fixed_options(),
    );
    assert_eq!(report.summary(), [("A".to_string(), 1)]);
    assert!(report.errors["B"].contains("4 columnas"));
}

#[test]
fn test_ledger_has_one_entry_per_group() {
    let mut rows = vec![
        record("Norte", "m1", "2024-01-01"),
        record("Sur", "m2", "sin fecha"),
        record("Norte", "m3", "2024-05-01"),
        record("Centro", "m4", "2024-02-01"),
    ];
    rows.push(
        Row::new()
            .with(Field::Mesa, "m5")
            .with(Field::Fecha, "2024-03-01"),
    );

    let report = generate_letters_per_group(
        &rows,
        &letter_template("x"),
        &NamedBlobs::new(),
        &RoutingConfig::default(),
        &NamedBlobs::new(),
        &fixed_options(),
    );

    let groups: Vec<_> = report.letters.iter().map(|l| l.group.as_str()).collect();
    assert_eq!(groups, ["(Sin grupo)", "Centro", "Norte", "Sur"]);
    assert!(groups.contains(&NO_GROUP));
    assert_eq!(report.letters.len() + report.errors.len(), 4);
    let total: usize = report.letters.iter().map(|l| l.records).sum();
    assert_eq!(total, rows.len());

    let sin_grupo = &report.outputs["CARTA_Sin_grupo.docx"];
    assert_eq!(body_texts(sin_grupo)[1], "Señor(a) , (Sin grupo)");
}

#[test]
fn test_rule_options_are_applied() {
    let rows = vec![record("Secretaría de Hacienda", "m1", "2024-01-01")];
    let mut templates = NamedBlobs::new();
    templates.insert(
        "B.docx".to_string(),
        TemplateBuilder::new()
            .paragraph("Modelo B para {{ACTOR}}")
            .table(&["a", "b", "c", "d"], &[])
            .records_table()
            .build(),
    );
    let config = load_routing_yaml(Some(
        "templates:\n  - match: hacienda\n    template: B.docx\n    table_index: 1\n    naming_pattern: 'HAC_{GRUPO}.docx'\n",
    ));

    let report = generate_letters_per_group(
        &rows,
        &letter_template("x"),
        &templates,
        &config,
        &NamedBlobs::new(),
        &fixed_options(),
    );

    let docx = &report.outputs["HAC_Secretaria_de_Hacienda.docx"];
    assert_eq!(body_texts(docx)[0], "Modelo B para Secretaría de Hacienda");
    assert_eq!(table_rows(docx, 0).len(), 1);
    assert_eq!(table_rows(docx, 1).len(), 2);
    assert_eq!(report.letters[0].rule.as_ref(), config.templates.first());
}

#[test]
fn test_derived_placeholders() {
    let rows = vec![record("Rentas", "m1", "2024-01-01")];
    let config = load_routing_yaml(Some(
        "derived_placeholders:\n  SALUDO: '{{ PREFIJO }} {{ NOMBRE_DIRECTIVO | upper }}'\n  ROTO: '{{ ACTOR | desconocido }}'\n",
    ));
    let template = TemplateBuilder::new()
        .paragraph("{{SALUDO}}")
        .paragraph("[{{ROTO}}]")
        .records_table()
        .build();

    let report = generate_letters_per_group(
        &rows,
        &template,
        &NamedBlobs::new(),
        &config,
        &NamedBlobs::new(),
        &fixed_options(),
    );
    let texts = body_texts(&report.outputs["CARTA_Rentas.docx"]);
    assert_eq!(texts[0], "Dra. ANA GÓMEZ");
    assert_eq!(texts[1], "[]");
}

#[test]
fn test_images_and_footer() {
    let rows = vec![record("Rentas", "m1", "2024-01-01")
        .with(Field::FirmaImg, "firma.png")
        .with(Field::LogoImg, "no_existe.png")];
    let mut assets = NamedBlobs::new();
    assets.insert("firma.png".to_string(), png(40, 20));
    assets.insert("logo.png".to_string(), png(10, 10));
    let config = load_routing_yaml(Some("footer_text: Alcaldía\nfooter_logo_name: logo.png\n"));
    let template = TemplateBuilder::new()
        .paragraph("Firma: {{IMG_FIRMA}}")
        .paragraph("Logo: {{IMG_LOGO}}")
        .records_table()
        .build();

    let report = generate_letters_per_group(
        &rows,
        &template,
        &NamedBlobs::new(),
        &config,
        &assets,
        &fixed_options(),
    );
    let docx = &report.outputs["CARTA_Rentas.docx"];
    let texts = body_texts(docx);
    assert_eq!(texts[0], "Firma: ");
    assert_eq!(texts[1], "Logo: {{IMG_LOGO}}");

    let document = part_text(docx, "word/document.xml").unwrap();
    assert!(document.contains("<pic:pic"));
    let rels = part_text(docx, "word/_rels/document.xml.rels").unwrap();
    assert!(rels.contains("media/image1.png"));

    let footer = part_text(docx, "word/footer1.xml").unwrap();
    assert!(footer.contains("Alcaldía  •  "));
    assert!(footer.contains("NUMPAGES"));
    assert!(rels.contains("footer1.xml"));
}

#[test]
fn test_colliding_file_names_get_suffix() {
    let rows = vec![record("Sur?", "m1", "2024-01-01"), record("Sur", "m2", "2024-01-01")];
    let report = generate_letters_per_group(
        &rows,
        &letter_template("x"),
        &NamedBlobs::new(),
        &RoutingConfig::default(),
        &NamedBlobs::new(),
        &fixed_options(),
    );
    let names: Vec<_> = report.outputs.keys().map(String::as_str).collect();
    assert_eq!(names, ["CARTA_Sur.docx", "CARTA_Sur_2.docx"]);
    assert_eq!(report.letters.len(), 2);
}
