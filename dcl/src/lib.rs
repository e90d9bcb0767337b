pub mod body;
pub mod diagnostic;
pub mod eval;
pub mod expr;
pub mod parser;

use crate::body::Body;

/// A parsed DCL document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// The top-level attributes and blocks, in order.
    pub body: Body,
    /// The source file ID (for error reporting with codespan-reporting).
    pub source_id: usize,
}
