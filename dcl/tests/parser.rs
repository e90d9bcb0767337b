use dcl::diagnostic::Diagnostics;
use dcl::expr::{BinaryOperator, ExprKind, Expression, TemplatePart, UnaryOperator};
use dcl::parser::Parser;
use dcl::Document;

fn parse(source: &str) -> (Document, Diagnostics) {
    Parser::new(source.to_string(), 0).parse()
}

fn parse_ok(source: &str) -> Document {
    let (doc, diags) = parse(source);
    assert!(diags.is_empty(), "unexpected diagnostics: {:?}", diags);
    doc
}

/// Parse `x = <src>` and return the attribute's expression. Warnings are
/// tolerated; errors are not.
fn expr(src: &str) -> Expression {
    let (doc, diags) = parse(&format!("x = {}\n", src));
    assert!(!diags.has_errors(), "unexpected errors: {:?}", diags);
    doc.body
        .attributes
        .into_iter()
        .next()
        .expect("no attribute")
        .expr
}

// ---------------------------------------------------------------------------
// Structure
// ---------------------------------------------------------------------------

#[test]
fn parses_attributes_with_spans() {
    let doc = parse_ok("a = 1\n");
    assert_eq!(doc.body.attributes.len(), 1);
    let attr = &doc.body.attributes[0];
    assert_eq!(attr.name, "a");
    assert_eq!(attr.name_range, 0..1);
    assert_eq!(attr.span, 0..5);
    assert!(matches!(attr.expr.kind, ExprKind::NumberLiteral(n) if n == 1.0));
    assert_eq!(attr.expr.span, 4..5);
}

#[test]
fn parses_blocks_with_labels() {
    let doc = parse_ok("provider_meta \"aws\" {\n  region = \"x\"\n}\n");
    assert_eq!(doc.body.blocks.len(), 1);
    let block = &doc.body.blocks[0];
    assert_eq!(block.block_type, "provider_meta");
    assert_eq!(block.labels, vec!["aws"]);
    assert_eq!(block.label_ranges, vec![14..19]);
    assert_eq!(block.type_range, 0..13);
    assert_eq!(block.def_range, 0..21);
    assert_eq!(block.body.attributes.len(), 1);
}

#[test]
fn parses_bare_word_labels() {
    let doc = parse_ok("settings dev {\n}\n");
    assert_eq!(doc.body.blocks[0].labels, vec!["dev"]);
}

#[test]
fn parses_multiple_labels() {
    let doc = parse_ok("route \"a\" \"b\" {\n}\n");
    assert_eq!(doc.body.blocks[0].labels, vec!["a", "b"]);
}

#[test]
fn parses_single_line_blocks() {
    let doc = parse_ok("settings { a = 1 }\n");
    let block = &doc.body.blocks[0];
    assert!(block.labels.is_empty());
    assert_eq!(block.body.attributes.len(), 1);
}

#[test]
fn parses_nested_blocks() {
    let doc = parse_ok("outer {\n  inner \"x\" {\n    a = 1\n  }\n}\n");
    let outer = &doc.body.blocks[0];
    assert_eq!(outer.body.blocks.len(), 1);
    assert_eq!(outer.body.blocks[0].labels, vec!["x"]);
}

#[test]
fn skips_comments() {
    let doc = parse_ok("# line\na = 1 // trailing\n/* block\n spanning */ b = 2\n");
    assert_eq!(doc.body.attributes.len(), 2);
}

#[test]
fn rejects_duplicate_attributes_keeping_the_first() {
    let (doc, diags) = parse("a = 1\na = 2\n");
    let dup = diags.iter().next().expect("no diagnostic");
    assert!(dup.message.contains("duplicate attribute \"a\""));
    assert_eq!(dup.span, 6..7);
    assert_eq!(dup.related[0].span, 0..1);
    assert_eq!(doc.body.attributes.len(), 1);
    assert!(matches!(doc.body.attributes[0].expr.kind, ExprKind::NumberLiteral(n) if n == 1.0));
}

#[test]
fn recovers_after_a_bad_attribute() {
    let (doc, diags) = parse("a = = 1\nb = 2\n");
    assert!(diags.has_errors());
    assert_eq!(doc.body.attributes.len(), 1);
    assert_eq!(doc.body.attributes[0].name, "b");
}

#[test]
fn reports_unclosed_blocks() {
    let (doc, diags) = parse("settings {\n  a = 1\n");
    assert!(diags.iter().any(|d| d.message.contains("unclosed block")));
    assert_eq!(doc.body.blocks[0].body.attributes.len(), 1);
}

#[test]
fn reports_stray_closing_braces() {
    let (doc, diags) = parse("}\na = 1\n");
    assert!(diags.iter().any(|d| d.message.contains("unexpected \"}\"")));
    assert_eq!(doc.body.attributes.len(), 1);
}

#[test]
fn reports_unterminated_strings() {
    let (_, diags) = parse("a = \"abc\n");
    assert!(diags.iter().any(|d| d.message.contains("unterminated string")));
}

#[test]
fn reports_unknown_characters() {
    let (_, diags) = parse("a = 1 @ 2\n");
    assert!(diags
        .iter()
        .any(|d| d.message.contains("unexpected character '@'")));
}

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

#[test]
fn multiplication_binds_tighter_than_addition() {
    let e = expr("1 + 2 * 3");
    let ExprKind::BinaryOperation { operator, right, .. } = e.kind else {
        panic!("expected a binary operation");
    };
    assert_eq!(operator, BinaryOperator::Addition);
    assert!(matches!(
        right.kind,
        ExprKind::BinaryOperation {
            operator: BinaryOperator::Multiplication,
            ..
        }
    ));
}

#[test]
fn parentheses_override_precedence() {
    let e = expr("(1 + 2) * 3");
    let ExprKind::BinaryOperation { operator, left, .. } = e.kind else {
        panic!("expected a binary operation");
    };
    assert_eq!(operator, BinaryOperator::Multiplication);
    assert!(matches!(
        left.kind,
        ExprKind::BinaryOperation {
            operator: BinaryOperator::Addition,
            ..
        }
    ));
}

#[test]
fn parses_unary_operators() {
    assert!(matches!(
        expr("-5").kind,
        ExprKind::UnaryOperation {
            operator: UnaryOperator::Negation,
            ..
        }
    ));
    assert!(matches!(
        expr("!true").kind,
        ExprKind::UnaryOperation {
            operator: UnaryOperator::LogicalNot,
            ..
        }
    ));
}

#[test]
fn parses_conditionals() {
    let e = expr("a_var ? 1 : 2");
    assert!(matches!(e.kind, ExprKind::Conditional { .. }));
}

#[test]
fn conditionals_bind_loosest() {
    let e = expr("true || false ? 1 : 2");
    let ExprKind::Conditional { condition, .. } = e.kind else {
        panic!("expected a conditional");
    };
    assert!(matches!(
        condition.kind,
        ExprKind::BinaryOperation {
            operator: BinaryOperator::LogicalOr,
            ..
        }
    ));
}

#[test]
fn parses_tuples() {
    let ExprKind::Tuple(items) = expr("[1, 2, 3]").kind else {
        panic!("expected a tuple");
    };
    assert_eq!(items.len(), 3);

    let ExprKind::Tuple(items) = expr("[1, 2,]").kind else {
        panic!("expected a tuple");
    };
    assert_eq!(items.len(), 2);
}

#[test]
fn tuples_may_span_lines() {
    let ExprKind::Tuple(items) = expr("[\n  1,\n  2\n]").kind else {
        panic!("expected a tuple");
    };
    assert_eq!(items.len(), 2);
}

#[test]
fn parses_objects() {
    let ExprKind::Object(entries) = expr("{ a = 1, b = \"x\" }").kind else {
        panic!("expected an object");
    };
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].0, "a");
    assert_eq!(entries[1].0, "b");
}

#[test]
fn objects_accept_colons_and_string_keys() {
    let ExprKind::Object(entries) = expr("{ \"a key\": 1 }").kind else {
        panic!("expected an object");
    };
    assert_eq!(entries[0].0, "a key");
}

#[test]
fn objects_may_span_lines_without_commas() {
    let ExprKind::Object(entries) = expr("{\n  a = 1\n  b = 2\n}").kind else {
        panic!("expected an object");
    };
    assert_eq!(entries.len(), 2);
}

#[test]
fn parses_traversals() {
    let e = expr("var.region.name");
    let ExprKind::Traversal { root, path } = e.kind else {
        panic!("expected a traversal");
    };
    assert_eq!(root, "var");
    assert_eq!(path, vec!["region", "name"]);
    assert_eq!(e.span, 4..19);
}

#[test]
fn parses_function_calls() {
    let ExprKind::FunctionCall { name, args } = expr("max(1, min(2, 3))").kind else {
        panic!("expected a call");
    };
    assert_eq!(name, "max");
    assert_eq!(args.len(), 2);
    assert!(matches!(args[1].kind, ExprKind::FunctionCall { .. }));

    let ExprKind::FunctionCall { name, args } = expr("now()").kind else {
        panic!("expected a call");
    };
    assert_eq!(name, "now");
    assert!(args.is_empty());
}

#[test]
fn parses_number_formats() {
    assert!(matches!(expr("1.5").kind, ExprKind::NumberLiteral(n) if n == 1.5));
    assert!(matches!(expr("1e3").kind, ExprKind::NumberLiteral(n) if n == 1000.0));
    assert!(matches!(expr("2.5e-1").kind, ExprKind::NumberLiteral(n) if n == 0.25));
}

#[test]
fn processes_string_escapes() {
    assert!(matches!(
        expr("\"a\\nb\"").kind,
        ExprKind::StringLiteral(s) if s == "a\nb"
    ));
    assert!(matches!(
        expr("\"say \\\"hi\\\"\"").kind,
        ExprKind::StringLiteral(s) if s == "say \"hi\""
    ));
}

#[test]
fn reports_invalid_escapes() {
    let (_, diags) = parse("a = \"bad \\q escape\"\n");
    assert!(diags
        .iter()
        .any(|d| d.message.contains("invalid escape sequence")));
}

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

#[test]
fn splits_templates_into_parts() {
    let e = expr("\"pre-${var.x}-post\"");
    let ExprKind::Template(parts) = e.kind else {
        panic!("expected a template");
    };
    assert_eq!(parts.len(), 3);
    assert!(matches!(&parts[0], TemplatePart::Literal(s) if s == "pre-"));
    assert!(matches!(&parts[2], TemplatePart::Literal(s) if s == "-post"));
    let TemplatePart::Interpolation(inner) = &parts[1] else {
        panic!("expected an interpolation");
    };
    assert!(matches!(&inner.kind, ExprKind::Traversal { root, .. } if root == "var"));
}

#[test]
fn interpolation_spans_are_file_absolute() {
    // x = "pre-${var.x}-post"
    //      01234  567890
    let e = expr("\"pre-${var.x}-post\"");
    let ExprKind::Template(parts) = e.kind else {
        panic!("expected a template");
    };
    let TemplatePart::Interpolation(inner) = &parts[1] else {
        panic!("expected an interpolation");
    };
    assert_eq!(inner.span, 11..16);
}

#[test]
fn escaped_interpolations_stay_literal() {
    assert!(matches!(
        expr("\"cost: $${price}\"").kind,
        ExprKind::StringLiteral(s) if s == "cost: ${price}"
    ));
}

#[test]
fn warns_on_interpolation_only_strings() {
    let (doc, diags) = parse("x = \"${1 + 2}\"\n");
    assert!(!diags.has_errors());
    assert_eq!(diags.len(), 1);
    let warning = diags.iter().next().expect("no warning");
    assert!(warning.message.contains("interpolation-only"));
    assert!(matches!(
        doc.body.attributes[0].expr.kind,
        ExprKind::Template(_)
    ));
}

#[test]
fn templates_nest_quoted_strings() {
    let e = expr("\"${upper(\"x\")}\"");
    let ExprKind::Template(parts) = e.kind else {
        panic!("expected a template");
    };
    let TemplatePart::Interpolation(inner) = &parts[0] else {
        panic!("expected an interpolation");
    };
    assert!(matches!(&inner.kind, ExprKind::FunctionCall { name, .. } if name == "upper"));
}

#[test]
fn templates_keep_multibyte_literals() {
    let e = expr("\"café ${var.x} été\"");
    let ExprKind::Template(parts) = e.kind else {
        panic!("expected a template");
    };
    assert_eq!(parts.len(), 3);
    assert!(matches!(&parts[0], TemplatePart::Literal(s) if s == "café "));
    assert!(matches!(&parts[2], TemplatePart::Literal(s) if s == " été"));
    let TemplatePart::Interpolation(inner) = &parts[1] else {
        panic!("expected an interpolation");
    };
    // "é" is two bytes, so the interpolation sits at byte 13, not 12.
    assert_eq!(inner.span, 13..18);
}

#[test]
fn reports_invalid_multibyte_escapes_in_templates() {
    let (doc, diags) = parse("x = \"\\é${1}\"\n");
    assert_eq!(diags.len(), 1);
    let diag = diags.iter().next().expect("no diagnostic");
    assert!(diag.message.contains("invalid escape sequence \"\\é\""));
    let ExprKind::Template(parts) = &doc.body.attributes[0].expr.kind else {
        panic!("expected a template");
    };
    assert_eq!(parts.len(), 2);
    assert!(matches!(&parts[0], TemplatePart::Literal(s) if s == "é"));
}
