mod expression;
mod lexer;
mod structural;

use crate::Document;
use crate::diagnostic::Diagnostics;

/// Parser entry point.
pub struct Parser {
    source: String,
    file_id: usize,
}

impl Parser {
    pub fn new(source: String, file_id: usize) -> Self {
        Parser { source, file_id }
    }

    /// Parse the source into a Document. Diagnostics accumulate across the
    /// whole file; a partial document is returned even when they contain
    /// errors, so callers can keep validating what did parse.
    pub fn parse(&self) -> (Document, Diagnostics) {
        let (tokens, mut diags) = lexer::lex(&self.source, self.file_id);
        let (body, parse_diags) =
            structural::parse_body_tokens(tokens, self.source.len(), self.file_id);
        diags.extend(parse_diags);
        (
            Document {
                body,
                source_id: self.file_id,
            },
            diags,
        )
    }
}
