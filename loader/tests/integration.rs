use dcl::diagnostic::Diagnostics;
use dcl::expr::ExprKind;
use dcl::Document;
use loader::{
    check_provider_name_normalized, decode_provider_meta_block, load_file,
    normalize_provider_name, ConfigFile, ProviderMeta,
};

fn parse(source: &str) -> Document {
    let parser = dcl::parser::Parser::new(source.to_string(), 0);
    let (doc, diags) = parser.parse();
    assert!(!diags.has_errors(), "parse failed: {:?}", diags);
    doc
}

fn decode(source: &str) -> Result<(ProviderMeta, Diagnostics), Diagnostics> {
    let mut doc = parse(source);
    assert_eq!(doc.body.blocks.len(), 1, "expected exactly one block");
    decode_provider_meta_block(doc.body.blocks.remove(0), 0)
}

fn load(source: &str) -> (ConfigFile, Diagnostics) {
    load_file(parse(source))
}

fn error_messages(diags: &Diagnostics) -> Vec<String> {
    diags
        .iter()
        .filter(|d| d.is_error())
        .map(|d| d.message.clone())
        .collect()
}

// ---------------------------------------------------------------------------
// decode_provider_meta_block
// ---------------------------------------------------------------------------

#[test]
fn decodes_static_block() {
    let src = "provider_meta \"aws\" {\n  region = \"us-east-1\"\n  retries = 3\n}\n";
    let (meta, diags) = decode(src).expect("decode failed");
    assert_eq!(meta.provider, "aws");
    assert!(diags.is_empty());
    assert_eq!(meta.config.attributes.len(), 2);
}

#[test]
fn decodes_empty_body() {
    let (meta, diags) = decode("provider_meta \"aws\" {\n}\n").expect("decode failed");
    assert_eq!(meta.provider, "aws");
    assert!(meta.config.attributes.is_empty());
    assert!(diags.is_empty());
}

#[test]
fn records_label_and_header_spans() {
    let (meta, _) = decode("provider_meta \"aws\" {\n}\n").expect("decode failed");
    assert_eq!(meta.provider_range, 14..19);
    assert_eq!(meta.decl_range, 0..21);
}

#[test]
fn config_keeps_unevaluated_expressions() {
    let src = "provider_meta \"aws\" {\n  n = 1 + 2\n}\n";
    let (meta, _) = decode(src).expect("decode failed");
    let attr = &meta.config.attributes[0];
    assert_eq!(attr.name, "n");
    assert!(matches!(attr.expr.kind, ExprKind::BinaryOperation { .. }));
}

#[test]
fn config_is_the_parsed_body() {
    let src = "provider_meta \"aws\" {\n  region = \"eu-west-1\"\n}\n";
    let doc = parse(src);
    let expected = doc.body.blocks[0].body.clone();
    let block = doc.body.blocks.into_iter().next().expect("no block");
    let (meta, _) = decode_provider_meta_block(block, 0).expect("decode failed");
    assert_eq!(meta.config, expected);
}

#[test]
fn rejects_variable_references() {
    let src = "provider_meta \"aws\" {\n  region = var.region\n}\n";
    let diags = decode(src).expect_err("decode should fail");
    let msgs = error_messages(&diags);
    assert_eq!(msgs.len(), 1);
    assert!(msgs[0].contains("variables are not allowed here"));
    let diag = diags.iter().find(|d| d.is_error()).expect("no error");
    assert!(
        diag.notes.iter().any(|n| n.contains("in attribute \"region\"")),
        "missing attribute note: {:?}",
        diag.notes
    );
}

#[test]
fn rejects_function_calls() {
    let src = "provider_meta \"aws\" {\n  endpoint = lookup(\"x\")\n}\n";
    let diags = decode(src).expect_err("decode should fail");
    let msgs = error_messages(&diags);
    assert_eq!(msgs.len(), 1);
    assert!(msgs[0].contains("function calls are not allowed here"));
}

#[test]
fn rejects_templates_with_interpolated_variables() {
    let src = "provider_meta \"aws\" {\n  region = \"pre-${var.x}-post\"\n}\n";
    let diags = decode(src).expect_err("decode should fail");
    assert!(error_messages(&diags)[0].contains("variables are not allowed here"));
}

#[test]
fn accepts_escaped_interpolation_markers() {
    let src = "provider_meta \"aws\" {\n  note = \"costs $${price}\"\n}\n";
    let (meta, diags) = decode(src).expect("decode failed");
    assert!(diags.is_empty());
    assert!(matches!(
        meta.config.attributes[0].expr.kind,
        ExprKind::StringLiteral(_)
    ));
}

#[test]
fn reports_every_failing_attribute() {
    let src = "provider_meta \"aws\" {\n  a = var.x\n  b = upper(\"y\")\n  c = 1\n}\n";
    let diags = decode(src).expect_err("decode should fail");
    let msgs = error_messages(&diags);
    assert_eq!(msgs.len(), 2);
    assert!(msgs[0].contains("variables are not allowed here"));
    assert!(msgs[1].contains("function calls are not allowed here"));
}

#[test]
fn rejects_nested_blocks() {
    let src = "provider_meta \"aws\" {\n  extra {\n  }\n}\n";
    let diags = decode(src).expect_err("decode should fail");
    assert!(error_messages(&diags)[0].contains("only attributes are allowed here"));
}

#[test]
fn extraction_failure_gates_before_label_check() {
    // The label is bad too, but the nested block stops decoding first.
    let src = "provider_meta \"AWS\" {\n  extra {\n  }\n}\n";
    let diags = decode(src).expect_err("decode should fail");
    let msgs = error_messages(&diags);
    assert_eq!(msgs.len(), 1);
    assert!(msgs[0].contains("only attributes are allowed here"));
}

#[test]
fn rejects_unnormalized_label() {
    let src = "provider_meta \"AWS\" {\n  region = \"x\"\n}\n";
    let diags = decode(src).expect_err("decode should fail");
    let diag = diags.iter().find(|d| d.is_error()).expect("no error");
    assert!(diag.message.contains("not normalized"));
    assert!(diag.notes.iter().any(|n| n.contains("did you mean \"aws\"")));
}

#[test]
fn label_errors_point_at_the_label() {
    let src = "provider_meta \"AWS\" {\n}\n";
    let diags = decode(src).expect_err("decode should fail");
    let diag = diags.iter().find(|d| d.is_error()).expect("no error");
    assert_eq!(diag.span, 14..19);
}

#[test]
fn rejects_empty_label() {
    let diags = decode("provider_meta \"\" {\n}\n").expect_err("decode should fail");
    let diag = diags.iter().find(|d| d.is_error()).expect("no error");
    assert!(diag.message.contains("invalid provider name"));
    assert!(diag.notes.iter().any(|n| n.contains("must not be empty")));
}

#[test]
fn eval_errors_block_construction_even_with_valid_label() {
    let src = "provider_meta \"aws\" {\n  a = var.x\n}\n";
    assert!(decode(src).is_err());
}

#[test]
fn eval_and_label_errors_accumulate_in_order() {
    let src = "provider_meta \"AWS\" {\n  a = var.x\n}\n";
    let diags = decode(src).expect_err("decode should fail");
    let msgs = error_messages(&diags);
    assert_eq!(msgs.len(), 2);
    assert!(msgs[0].contains("variables are not allowed here"));
    assert!(msgs[1].contains("not normalized"));
}

#[test]
fn label_count_must_be_exactly_one() {
    let diags = decode("provider_meta {\n}\n").expect_err("decode should fail");
    let msgs = error_messages(&diags);
    assert_eq!(msgs.len(), 1);
    assert!(msgs[0].contains("exactly one label"));

    let diags = decode("provider_meta \"a\" \"b\" {\n}\n").expect_err("decode should fail");
    let msgs = error_messages(&diags);
    assert_eq!(msgs.len(), 1);
    assert!(msgs[0].contains("exactly one label"));
    assert!(msgs[0].contains("2"));
}

#[test]
fn success_carries_warnings_through() {
    let src = "provider_meta \"aws\" {\n  flag = 1 == \"1\"\n}\n";
    let (meta, diags) = decode(src).expect("decode failed");
    assert_eq!(meta.provider, "aws");
    assert!(!diags.has_errors());
    assert_eq!(diags.len(), 1);
    let warning = diags.iter().next().expect("no warning");
    assert!(warning.message.contains("never equal"));
    assert!(warning.notes.iter().any(|n| n.contains("in attribute \"flag\"")));
}

#[test]
fn diagnostics_are_deterministic() {
    let src = "provider_meta \"AWS\" {\n  a = var.x\n  b = now()\n}\n";
    let first = decode(src).expect_err("decode should fail");
    let second = decode(src).expect_err("decode should fail");
    assert_eq!(first, second);
}

#[test]
fn decoding_is_idempotent() {
    let src = "provider_meta \"aws\" {\n  region = \"us-east-1\"\n}\n";
    let (first, first_diags) = decode(src).expect("decode failed");
    let (second, second_diags) = decode(src).expect("decode failed");
    assert_eq!(first, second);
    assert_eq!(first_diags, second_diags);
}

// ---------------------------------------------------------------------------
// load_file
// ---------------------------------------------------------------------------

#[test]
fn loads_multiple_providers() {
    let src = "provider_meta \"gcp\" {\n}\nprovider_meta \"aws\" {\n}\n";
    let (file, diags) = load(src);
    assert!(diags.is_empty());
    let names: Vec<&str> = file.provider_metas.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["aws", "gcp"]);
}

#[test]
fn duplicate_provider_keeps_first_block() {
    let src = "provider_meta \"aws\" {\n  n = 1\n}\nprovider_meta \"aws\" {\n  n = 2\n}\n";
    let (file, diags) = load(src);
    assert!(error_messages(&diags)[0].contains("duplicate provider_meta block"));
    let meta = &file.provider_metas["aws"];
    assert!(matches!(
        meta.config.attributes[0].expr.kind,
        ExprKind::NumberLiteral(n) if n == 1.0
    ));
}

#[test]
fn duplicate_provider_error_points_at_both_blocks() {
    let src = "provider_meta \"aws\" {\n  n = 1\n}\nprovider_meta \"aws\" {\n  n = 2\n}\n";
    let (_, diags) = load(src);
    let dup = diags.iter().find(|d| d.is_error()).expect("no error");
    assert_eq!(dup.span, 32..53);
    assert_eq!(dup.related[0].span, 0..21);
    assert!(dup.related[0].message.contains("the first block for this provider is kept"));
}

#[test]
fn bad_block_does_not_stop_good_ones() {
    let src = "provider_meta \"AWS\" {\n}\nprovider_meta \"gcp\" {\n}\n";
    let (file, diags) = load(src);
    assert!(diags.has_errors());
    let names: Vec<&str> = file.provider_metas.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["gcp"]);
}

#[test]
fn rejects_unknown_block_types() {
    let (file, diags) = load("resource \"x\" {\n}\n");
    assert!(file.provider_metas.is_empty());
    assert!(error_messages(&diags)[0].contains("not expected here"));
}

#[test]
fn rejects_top_level_attributes() {
    let (_, diags) = load("region = \"us-east-1\"\n");
    assert!(error_messages(&diags)[0].contains("unexpected top-level attribute"));
}

// ---------------------------------------------------------------------------
// provider name normalization
// ---------------------------------------------------------------------------

#[test]
fn normalize_accepts_canonical_names() {
    for name in ["aws", "my-provider", "s3", "a", "provider-2"] {
        assert_eq!(normalize_provider_name(name).expect(name), name);
    }
}

#[test]
fn normalize_lowercases() {
    assert_eq!(normalize_provider_name("AWS").expect("AWS"), "aws");
    assert_eq!(normalize_provider_name("MyCloud").expect("MyCloud"), "mycloud");
}

#[test]
fn normalize_rejects_invalid_names() {
    assert!(normalize_provider_name("").expect_err("empty").contains("empty"));
    assert!(normalize_provider_name("my_provider")
        .expect_err("underscore")
        .contains("letters, digits, and dashes"));
    assert!(normalize_provider_name("my provider")
        .expect_err("space")
        .contains("letters, digits, and dashes"));
    assert!(normalize_provider_name("café")
        .expect_err("non-ascii")
        .contains("letters, digits, and dashes"));
    assert!(normalize_provider_name("-aws")
        .expect_err("leading dash")
        .contains("start or end"));
    assert!(normalize_provider_name("aws-")
        .expect_err("trailing dash")
        .contains("start or end"));
}

#[test]
fn check_passes_canonical_names_silently() {
    assert!(check_provider_name_normalized("aws", 0..3, 0).is_empty());
    assert!(check_provider_name_normalized("my-cloud", 0..8, 0).is_empty());
}

#[test]
fn check_reports_at_the_given_span() {
    let diags = check_provider_name_normalized("AWS", 5..8, 0);
    let diag = diags.iter().next().expect("no diagnostic");
    assert_eq!(diag.span, 5..8);
    assert!(diag.notes.iter().any(|n| n.contains("did you mean \"aws\"")));
}
