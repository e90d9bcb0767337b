use std::collections::BTreeMap;
use std::ops::Range;

use crate::diagnostic::{Diagnostic, Diagnostics};
use crate::expr::Expression;

/// A single `name = expression` entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub expr: Expression,
    /// Span of the attribute name.
    pub name_range: Range<usize>,
    /// Span of the whole entry, name through expression.
    pub span: Range<usize>,
}

/// A braced section with a type keyword and zero or more labels.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub block_type: String,
    pub labels: Vec<String>,
    pub body: Body,
    /// Span of the type keyword.
    pub type_range: Range<usize>,
    /// One span per label, in order.
    pub label_ranges: Vec<Range<usize>>,
    /// Span of the block header, type keyword through opening brace.
    pub def_range: Range<usize>,
    /// Span of the whole block including its body.
    pub span: Range<usize>,
}

/// The contents of a block or of a whole document: attributes and nested
/// blocks in source order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Body {
    pub attributes: Vec<Attribute>,
    pub blocks: Vec<Block>,
}

impl Body {
    pub fn new() -> Self {
        Body::default()
    }

    /// Enumerate the body's attributes, requiring that it contain nothing
    /// else. Every nested block produces an error, and the attribute map is
    /// returned regardless so callers can keep validating.
    pub fn just_attributes(&self, file_id: usize) -> (BTreeMap<&str, &Attribute>, Diagnostics) {
        let mut diags = Diagnostics::new();
        let mut attrs: BTreeMap<&str, &Attribute> = BTreeMap::new();

        for attr in &self.attributes {
            // The parser rejects duplicates already; this guards bodies
            // assembled in code.
            if let Some(first) = attrs.get(attr.name.as_str()) {
                diags.push(
                    Diagnostic::error(
                        format!("attribute \"{}\" was already set", attr.name),
                        attr.name_range.clone(),
                        file_id,
                    )
                    .with_related(
                        "the attribute was first set here",
                        first.name_range.clone(),
                        file_id,
                    ),
                );
                continue;
            }
            attrs.insert(attr.name.as_str(), attr);
        }

        for block in &self.blocks {
            diags.push(Diagnostic::error(
                format!(
                    "unexpected \"{}\" block: only attributes are allowed here",
                    block.block_type
                ),
                block.def_range.clone(),
                file_id,
            ));
        }

        (attrs, diags)
    }
}
