use std::mem;
use std::ops::Range;

use crate::diagnostic::{Diagnostic, Diagnostics};
use crate::expr::{BinaryOperator, ExprKind, Expression, TemplatePart, UnaryOperator};
use crate::parser::lexer::{lex_with_base, token_name, unescape, Token, TokenKind};

// ---------------------------------------------------------------------------
// Binding powers (higher binds tighter)
// ---------------------------------------------------------------------------

const BP_CONDITIONAL: u8 = 2;
const BP_LOGICAL_OR: u8 = 4;
const BP_LOGICAL_AND: u8 = 6;
const BP_EQUALITY: u8 = 8;
const BP_COMPARISON: u8 = 10;
const BP_ADDITIVE: u8 = 12;
const BP_MULTIPLICATIVE: u8 = 14;
const BP_UNARY: u8 = 16;

fn infix_binding(kind: &TokenKind) -> Option<(BinaryOperator, u8, u8)> {
    let (op, bp) = match kind {
        TokenKind::PipePipe => (BinaryOperator::LogicalOr, BP_LOGICAL_OR),
        TokenKind::AmpAmp => (BinaryOperator::LogicalAnd, BP_LOGICAL_AND),
        TokenKind::EqEq => (BinaryOperator::Equality, BP_EQUALITY),
        TokenKind::BangEq => (BinaryOperator::Inequality, BP_EQUALITY),
        TokenKind::Gt => (BinaryOperator::GreaterThan, BP_COMPARISON),
        TokenKind::Lt => (BinaryOperator::LessThan, BP_COMPARISON),
        TokenKind::GtEq => (BinaryOperator::GreaterThanOrEqual, BP_COMPARISON),
        TokenKind::LtEq => (BinaryOperator::LessThanOrEqual, BP_COMPARISON),
        TokenKind::Plus => (BinaryOperator::Addition, BP_ADDITIVE),
        TokenKind::Minus => (BinaryOperator::Subtraction, BP_ADDITIVE),
        TokenKind::Star => (BinaryOperator::Multiplication, BP_MULTIPLICATIVE),
        TokenKind::Slash => (BinaryOperator::Division, BP_MULTIPLICATIVE),
        TokenKind::Percent => (BinaryOperator::Modulo, BP_MULTIPLICATIVE),
        _ => return None,
    };
    Some((op, bp, bp + 1))
}

// ---------------------------------------------------------------------------
// Expression parser (Pratt)
// ---------------------------------------------------------------------------

/// Parses one expression from a pre-collected token run. Non-fatal
/// diagnostics (bad escapes, lex errors inside interpolations) accumulate
/// into `diags`; a fatal parse failure is the `Err` case.
pub(super) struct ExprParser<'d> {
    tokens: Vec<Token>,
    pos: usize,
    /// Span of the whole run, used when there is no token to point at.
    span: Range<usize>,
    file_id: usize,
    diags: &'d mut Diagnostics,
}

impl<'d> ExprParser<'d> {
    pub(super) fn new(
        tokens: Vec<Token>,
        span: Range<usize>,
        file_id: usize,
        diags: &'d mut Diagnostics,
    ) -> Self {
        ExprParser {
            tokens,
            pos: 0,
            span,
            file_id,
            diags,
        }
    }

    /// Parse the full run as a single expression. Leftover tokens after a
    /// complete expression are an error.
    pub(super) fn parse(&mut self) -> Result<Expression, Diagnostic> {
        let expr = self.parse_expr(0)?;
        if let Some(extra) = self.peek() {
            return Err(Diagnostic::error(
                format!("unexpected {} after expression", token_name(&extra.kind)),
                extra.span.clone(),
                self.file_id,
            ));
        }
        Ok(expr)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.peek().map(|t| &t.kind)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn error_here(&self, message: impl Into<String>) -> Diagnostic {
        let span = match self.peek() {
            Some(t) => t.span.clone(),
            None => self.span.clone(),
        };
        Diagnostic::error(message, span, self.file_id)
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<Token, Diagnostic> {
        match self.peek() {
            Some(t) if &t.kind == kind => {
                let token = t.clone();
                self.pos += 1;
                Ok(token)
            }
            Some(t) => Err(Diagnostic::error(
                format!(
                    "expected {}, found {}",
                    token_name(kind),
                    token_name(&t.kind)
                ),
                t.span.clone(),
                self.file_id,
            )),
            None => Err(Diagnostic::error(
                format!("expected {}", token_name(kind)),
                self.span.clone(),
                self.file_id,
            )),
        }
    }

    fn parse_expr(&mut self, min_bp: u8) -> Result<Expression, Diagnostic> {
        let mut lhs = self.parse_prefix()?;

        loop {
            let Some(kind) = self.peek_kind() else { break };

            if *kind == TokenKind::Question {
                if BP_CONDITIONAL < min_bp {
                    break;
                }
                self.advance();
                let true_branch = self.parse_expr(0)?;
                self.expect(&TokenKind::Colon)?;
                let false_branch = self.parse_expr(0)?;
                let span = lhs.span.start..false_branch.span.end;
                lhs = Expression::new(
                    ExprKind::Conditional {
                        condition: Box::new(lhs),
                        true_branch: Box::new(true_branch),
                        false_branch: Box::new(false_branch),
                    },
                    span,
                );
                continue;
            }

            let Some((op, lbp, rbp)) = infix_binding(kind) else {
                break;
            };
            if lbp < min_bp {
                break;
            }
            self.advance();
            let rhs = self.parse_expr(rbp)?;
            let span = lhs.span.start..rhs.span.end;
            lhs = Expression::new(
                ExprKind::BinaryOperation {
                    operator: op,
                    left: Box::new(lhs),
                    right: Box::new(rhs),
                },
                span,
            );
        }

        Ok(lhs)
    }

    fn parse_prefix(&mut self) -> Result<Expression, Diagnostic> {
        let Some(token) = self.advance() else {
            return Err(Diagnostic::error(
                "unexpected end of expression",
                self.span.clone(),
                self.file_id,
            ));
        };

        match token.kind {
            TokenKind::Number(n) => Ok(Expression::new(ExprKind::NumberLiteral(n), token.span)),
            TokenKind::True => Ok(Expression::new(ExprKind::BooleanLiteral(true), token.span)),
            TokenKind::False => Ok(Expression::new(ExprKind::BooleanLiteral(false), token.span)),
            TokenKind::Null => Ok(Expression::new(ExprKind::NullLiteral, token.span)),

            TokenKind::StringLit(raw) => self.parse_string(&raw, token.span),

            TokenKind::Ident(name) => {
                if self.peek_kind() == Some(&TokenKind::LParen) {
                    return self.parse_call(name, token.span);
                }
                let mut path = Vec::new();
                let mut end = token.span.end;
                while self.peek_kind() == Some(&TokenKind::Dot) {
                    self.advance();
                    match self.advance() {
                        Some(Token {
                            kind: TokenKind::Ident(part),
                            span,
                        }) => {
                            end = span.end;
                            path.push(part);
                        }
                        Some(other) => {
                            return Err(Diagnostic::error(
                                format!(
                                    "expected an attribute name after \".\", found {}",
                                    token_name(&other.kind)
                                ),
                                other.span,
                                self.file_id,
                            ));
                        }
                        None => {
                            return Err(Diagnostic::error(
                                "expected an attribute name after \".\"",
                                self.span.clone(),
                                self.file_id,
                            ));
                        }
                    }
                }
                Ok(Expression::new(
                    ExprKind::Traversal { root: name, path },
                    token.span.start..end,
                ))
            }

            TokenKind::Minus => {
                let operand = self.parse_expr(BP_UNARY)?;
                let span = token.span.start..operand.span.end;
                Ok(Expression::new(
                    ExprKind::UnaryOperation {
                        operator: UnaryOperator::Negation,
                        operand: Box::new(operand),
                    },
                    span,
                ))
            }

            TokenKind::Bang => {
                let operand = self.parse_expr(BP_UNARY)?;
                let span = token.span.start..operand.span.end;
                Ok(Expression::new(
                    ExprKind::UnaryOperation {
                        operator: UnaryOperator::LogicalNot,
                        operand: Box::new(operand),
                    },
                    span,
                ))
            }

            TokenKind::LParen => {
                let mut inner = self.parse_expr(0)?;
                let close = self.expect(&TokenKind::RParen)?;
                inner.span = token.span.start..close.span.end;
                Ok(inner)
            }

            TokenKind::LBracket => self.parse_tuple(token.span),
            TokenKind::LBrace => self.parse_object(token.span),

            other => Err(Diagnostic::error(
                format!("unexpected {} in expression", token_name(&other)),
                token.span,
                self.file_id,
            )),
        }
    }

    fn parse_call(&mut self, name: String, name_span: Range<usize>) -> Result<Expression, Diagnostic> {
        self.advance(); // (
        let mut args = Vec::new();
        let end;
        loop {
            if self.peek_kind() == Some(&TokenKind::RParen) {
                end = self.tokens[self.pos].span.end;
                self.advance();
                break;
            }
            args.push(self.parse_expr(0)?);
            match self.peek_kind() {
                Some(TokenKind::Comma) => {
                    self.advance();
                }
                Some(TokenKind::RParen) => {}
                _ => {
                    return Err(self.error_here("expected \",\" or \")\" in function arguments"));
                }
            }
        }
        Ok(Expression::new(
            ExprKind::FunctionCall { name, args },
            name_span.start..end,
        ))
    }

    fn parse_tuple(&mut self, open_span: Range<usize>) -> Result<Expression, Diagnostic> {
        let mut items = Vec::new();
        let end;
        loop {
            if self.peek_kind() == Some(&TokenKind::RBracket) {
                end = self.tokens[self.pos].span.end;
                self.advance();
                break;
            }
            items.push(self.parse_expr(0)?);
            match self.peek_kind() {
                Some(TokenKind::Comma) => {
                    self.advance();
                }
                Some(TokenKind::RBracket) => {}
                _ => {
                    return Err(self.error_here("expected \",\" or \"]\" in tuple"));
                }
            }
        }
        Ok(Expression::new(
            ExprKind::Tuple(items),
            open_span.start..end,
        ))
    }

    fn parse_object(&mut self, open_span: Range<usize>) -> Result<Expression, Diagnostic> {
        let mut entries = Vec::new();
        let end;
        loop {
            if self.peek_kind() == Some(&TokenKind::RBrace) {
                end = self.tokens[self.pos].span.end;
                self.advance();
                break;
            }
            let key = match self.advance() {
                Some(Token {
                    kind: TokenKind::Ident(k),
                    ..
                }) => k,
                Some(Token {
                    kind: TokenKind::StringLit(raw),
                    span,
                }) => unescape(&raw, &span, self.file_id, self.diags),
                Some(other) => {
                    return Err(Diagnostic::error(
                        format!(
                            "expected an attribute name in object, found {}",
                            token_name(&other.kind)
                        ),
                        other.span,
                        self.file_id,
                    ));
                }
                None => {
                    return Err(Diagnostic::error(
                        "unclosed object",
                        open_span,
                        self.file_id,
                    ));
                }
            };
            match self.peek_kind() {
                Some(TokenKind::Eq) | Some(TokenKind::Colon) => {
                    self.advance();
                }
                _ => {
                    return Err(self.error_here("expected \"=\" after object key"));
                }
            }
            entries.push((key, self.parse_expr(0)?));
            if self.peek_kind() == Some(&TokenKind::Comma) {
                self.advance();
            }
        }
        Ok(Expression::new(
            ExprKind::Object(entries),
            open_span.start..end,
        ))
    }

    // -----------------------------------------------------------------------
    // String literals and templates
    // -----------------------------------------------------------------------

    /// Turn the raw content of a quoted string into either a plain literal
    /// or a template with interpolated expressions. `span` covers the whole
    /// literal including the quotes, so content byte `k` sits at file offset
    /// `span.start + 1 + k`.
    fn parse_string(&mut self, raw: &str, span: Range<usize>) -> Result<Expression, Diagnostic> {
        if !raw.contains("${") {
            let content = unescape(raw, &span, self.file_id, self.diags);
            return Ok(Expression::new(ExprKind::StringLiteral(content), span));
        }

        let content_base = span.start + 1;
        let bytes = raw.as_bytes();
        let mut parts: Vec<TemplatePart> = Vec::new();
        let mut lit = String::new();
        let mut run_start = 0usize;
        let mut idx = 0usize;

        // idx moves byte-wise and may sit inside a multibyte character;
        // match on bytes and slice `raw` only at ASCII positions.
        while idx < raw.len() {
            if bytes[idx] == b'\\' {
                idx = (idx + 2).min(raw.len());
            } else if bytes[idx..].starts_with(b"$${") {
                lit.push_str(&unescape(&raw[run_start..idx], &span, self.file_id, self.diags));
                lit.push_str("${");
                idx += 3;
                run_start = idx;
            } else if bytes[idx..].starts_with(b"${") {
                lit.push_str(&unescape(&raw[run_start..idx], &span, self.file_id, self.diags));

                let inner_start = idx + 2;
                let mut depth = 1usize;
                let mut j = inner_start;
                while j < raw.len() && depth > 0 {
                    match bytes[j] {
                        b'{' => {
                            depth += 1;
                            j += 1;
                        }
                        b'}' => {
                            depth -= 1;
                            j += 1;
                        }
                        b'"' => {
                            j += 1;
                            while j < raw.len() && bytes[j] != b'"' {
                                if bytes[j] == b'\\' {
                                    j += 1;
                                }
                                j += 1;
                            }
                            j += 1;
                        }
                        _ => {
                            j += 1;
                        }
                    }
                }
                if depth > 0 {
                    return Err(Diagnostic::error(
                        "unterminated \"${\" interpolation",
                        content_base + idx..span.end,
                        self.file_id,
                    ));
                }

                let inner = &raw[inner_start..j - 1];
                let inner_base = content_base + inner_start;
                let (tokens, lex_diags) = lex_with_base(inner, self.file_id, inner_base);
                self.diags.extend(lex_diags);
                let mut inner_parser = ExprParser::new(
                    tokens,
                    inner_base..inner_base + inner.len(),
                    self.file_id,
                    &mut *self.diags,
                );
                let expr = inner_parser.parse()?;

                if !lit.is_empty() {
                    parts.push(TemplatePart::Literal(mem::take(&mut lit)));
                }
                parts.push(TemplatePart::Interpolation(expr));
                idx = j;
                run_start = idx;
            } else {
                idx += 1;
            }
        }

        lit.push_str(&unescape(&raw[run_start..], &span, self.file_id, self.diags));
        if !lit.is_empty() {
            parts.push(TemplatePart::Literal(lit));
        }

        if parts
            .iter()
            .all(|p| matches!(p, TemplatePart::Literal(_)))
        {
            let mut joined = String::new();
            for part in parts {
                if let TemplatePart::Literal(s) = part {
                    joined.push_str(&s);
                }
            }
            return Ok(Expression::new(ExprKind::StringLiteral(joined), span));
        }

        if parts.len() == 1 {
            self.diags.push(
                Diagnostic::warning(
                    "interpolation-only expression",
                    span.clone(),
                    self.file_id,
                )
                .with_note("write the inner expression directly, without the \"${\" wrapper"),
            );
        }

        Ok(Expression::new(ExprKind::Template(parts), span))
    }
}
