use std::ops::Range;

use crate::body::{Attribute, Block, Body};
use crate::diagnostic::{Diagnostic, Diagnostics};
use crate::parser::expression::ExprParser;
use crate::parser::lexer::{token_name, unescape, Token, TokenKind};

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Parse a token stream into a document body. Always produces a body;
/// malformed entries are skipped and reported.
pub(super) fn parse_body_tokens(
    tokens: Vec<Token>,
    source_len: usize,
    file_id: usize,
) -> (Body, Diagnostics) {
    let mut state = ParseState {
        tokens,
        pos: 0,
        source_len,
        file_id,
        diags: Diagnostics::new(),
    };
    let (body, _) = state.parse_body(None);
    (body, state.diags)
}

// ---------------------------------------------------------------------------
// Parse state
// ---------------------------------------------------------------------------

struct ParseState {
    tokens: Vec<Token>,
    pos: usize,
    source_len: usize,
    file_id: usize,
    diags: Diagnostics,
}

impl ParseState {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.peek().map(|t| &t.kind)
    }

    /// Skip ahead to the next newline without consuming it, so the caller
    /// can resume parsing on the following line. Stops before a closing
    /// brace too, which ends the enclosing body.
    fn sync_to_newline(&mut self) {
        while let Some(t) = self.peek() {
            match t.kind {
                TokenKind::Newline | TokenKind::RBrace => break,
                _ => self.pos += 1,
            }
        }
    }

    /// Parse entries until the closing brace of the enclosing block, or to
    /// the end of input for the top level. Returns the body and the byte
    /// offset just past it.
    fn parse_body(&mut self, open_brace: Option<Range<usize>>) -> (Body, usize) {
        let mut body = Body::new();
        let end_offset;

        loop {
            while self.peek_kind() == Some(&TokenKind::Newline) {
                self.pos += 1;
            }

            let Some(token) = self.peek() else {
                if let Some(open) = &open_brace {
                    self.diags.push(Diagnostic::error(
                        "unclosed block",
                        open.clone(),
                        self.file_id,
                    ));
                }
                end_offset = self.source_len;
                break;
            };

            match &token.kind {
                TokenKind::RBrace => {
                    let span = token.span.clone();
                    self.pos += 1;
                    if open_brace.is_some() {
                        end_offset = span.end;
                        break;
                    }
                    self.diags.push(Diagnostic::error(
                        "unexpected \"}\"",
                        span,
                        self.file_id,
                    ));
                }

                TokenKind::Ident(name) => {
                    let name = name.clone();
                    let name_range = token.span.clone();
                    self.pos += 1;

                    match self.peek() {
                        Some(t) if t.kind == TokenKind::Eq => {
                            let eq_end = t.span.end;
                            self.pos += 1;
                            self.parse_attribute(name, name_range, eq_end, &mut body);
                        }
                        Some(t)
                            if matches!(
                                t.kind,
                                TokenKind::StringLit(_)
                                    | TokenKind::Ident(_)
                                    | TokenKind::LBrace
                            ) =>
                        {
                            if let Some(block) = self.parse_block(name, name_range) {
                                body.blocks.push(block);
                            } else {
                                self.sync_to_newline();
                            }
                        }
                        other => {
                            let span = match other {
                                Some(t) => t.span.clone(),
                                None => name_range.clone(),
                            };
                            self.diags.push(Diagnostic::error(
                                format!("expected \"=\" or a block after \"{}\"", name),
                                span,
                                self.file_id,
                            ));
                            self.sync_to_newline();
                        }
                    }
                }

                other => {
                    let message = format!("unexpected {}", token_name(other));
                    let span = token.span.clone();
                    self.pos += 1;
                    self.diags.push(Diagnostic::error(message, span, self.file_id));
                    self.sync_to_newline();
                }
            }
        }

        (body, end_offset)
    }

    fn parse_attribute(
        &mut self,
        name: String,
        name_range: Range<usize>,
        eq_end: usize,
        body: &mut Body,
    ) {
        let (tokens, span) = self.collect_expression_tokens(eq_end);
        let mut parser = ExprParser::new(tokens, span, self.file_id, &mut self.diags);
        match parser.parse() {
            Ok(expr) => {
                if let Some(first) = body.attributes.iter().find(|a| a.name == name) {
                    let first_range = first.name_range.clone();
                    self.diags.push(
                        Diagnostic::error(
                            format!("duplicate attribute \"{}\"", name),
                            name_range,
                            self.file_id,
                        )
                        .with_related("the attribute was first set here", first_range, self.file_id),
                    );
                } else {
                    let span = name_range.start..expr.span.end;
                    body.attributes.push(Attribute {
                        name,
                        expr,
                        name_range,
                        span,
                    });
                }
            }
            Err(diag) => self.diags.push(diag),
        }
        if self.peek_kind() == Some(&TokenKind::Newline) {
            self.pos += 1;
        }
    }

    /// Collect the token run for one attribute value: up to the next
    /// newline, closing brace, or end of input at bracket depth zero.
    /// Newlines inside brackets are dropped so expressions can span lines.
    fn collect_expression_tokens(&mut self, fallback: usize) -> (Vec<Token>, Range<usize>) {
        let start = match self.peek() {
            Some(t) => t.span.start,
            None => fallback,
        };
        let mut end = start;
        let mut collected = Vec::new();
        let mut depth = 0usize;

        while let Some(token) = self.peek() {
            match &token.kind {
                TokenKind::Newline if depth == 0 => break,
                TokenKind::Newline => {
                    self.pos += 1;
                }
                TokenKind::RBrace if depth == 0 => break,
                kind => {
                    match kind {
                        TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => depth += 1,
                        TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => {
                            depth = depth.saturating_sub(1)
                        }
                        _ => {}
                    }
                    end = token.span.end;
                    collected.push(token.clone());
                    self.pos += 1;
                }
            }
        }

        (collected, start..end)
    }

    /// Parse a block from just after its type keyword: labels, then a
    /// braced body. Returns None if the header is malformed.
    fn parse_block(&mut self, block_type: String, type_range: Range<usize>) -> Option<Block> {
        let mut labels = Vec::new();
        let mut label_ranges = Vec::new();

        let lbrace_end = loop {
            match self.peek() {
                Some(t) => match &t.kind {
                    TokenKind::StringLit(raw) => {
                        let raw = raw.clone();
                        let span = t.span.clone();
                        self.pos += 1;
                        if raw.contains("${") {
                            self.diags.push(Diagnostic::error(
                                "interpolation is not allowed in block labels",
                                span.clone(),
                                self.file_id,
                            ));
                        }
                        labels.push(unescape(&raw, &span, self.file_id, &mut self.diags));
                        label_ranges.push(span);
                    }
                    TokenKind::Ident(word) => {
                        labels.push(word.clone());
                        label_ranges.push(t.span.clone());
                        self.pos += 1;
                    }
                    TokenKind::LBrace => {
                        let end = t.span.end;
                        self.pos += 1;
                        break end;
                    }
                    other => {
                        let message = format!(
                            "expected a label or \"{{\" in block header, found {}",
                            token_name(other)
                        );
                        let span = t.span.clone();
                        self.diags.push(Diagnostic::error(message, span, self.file_id));
                        return None;
                    }
                },
                None => {
                    self.diags.push(Diagnostic::error(
                        format!("expected \"{{\" to begin the \"{}\" block body", block_type),
                        type_range.clone(),
                        self.file_id,
                    ));
                    return None;
                }
            }
        };

        let def_range = type_range.start..lbrace_end;
        let (body, body_end) = self.parse_body(Some(def_range.clone()));

        Some(Block {
            span: type_range.start..body_end,
            block_type,
            labels,
            body,
            type_range,
            label_ranges,
            def_range,
        })
    }
}
