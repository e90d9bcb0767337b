use std::ops::Range;

use crate::diagnostic::{Diagnostic, Diagnostics};

/// A lexical token with its source byte span.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Range<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Ident(String),
    /// The raw text between the quotes, escapes unprocessed. Interpolation
    /// splitting and unescaping happen during expression parsing so spans
    /// inside templates stay exact.
    StringLit(String),
    Number(f64),
    True,
    False,
    Null,

    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Eq,
    EqEq,
    Bang,
    BangEq,
    Gt,
    Lt,
    GtEq,
    LtEq,
    AmpAmp,
    PipePipe,
    Question,
    Colon,
    Comma,
    Dot,

    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,

    Newline,
}

/// Short human-readable name for expectation messages.
pub(crate) fn token_name(kind: &TokenKind) -> &'static str {
    match kind {
        TokenKind::Ident(_) => "identifier",
        TokenKind::StringLit(_) => "string",
        TokenKind::Number(_) => "number",
        TokenKind::True => "\"true\"",
        TokenKind::False => "\"false\"",
        TokenKind::Null => "\"null\"",
        TokenKind::Plus => "\"+\"",
        TokenKind::Minus => "\"-\"",
        TokenKind::Star => "\"*\"",
        TokenKind::Slash => "\"/\"",
        TokenKind::Percent => "\"%\"",
        TokenKind::Eq => "\"=\"",
        TokenKind::EqEq => "\"==\"",
        TokenKind::Bang => "\"!\"",
        TokenKind::BangEq => "\"!=\"",
        TokenKind::Gt => "\">\"",
        TokenKind::Lt => "\"<\"",
        TokenKind::GtEq => "\">=\"",
        TokenKind::LtEq => "\"<=\"",
        TokenKind::AmpAmp => "\"&&\"",
        TokenKind::PipePipe => "\"||\"",
        TokenKind::Question => "\"?\"",
        TokenKind::Colon => "\":\"",
        TokenKind::Comma => "\",\"",
        TokenKind::Dot => "\".\"",
        TokenKind::LParen => "\"(\"",
        TokenKind::RParen => "\")\"",
        TokenKind::LBrace => "\"{\"",
        TokenKind::RBrace => "\"}\"",
        TokenKind::LBracket => "\"[\"",
        TokenKind::RBracket => "\"]\"",
        TokenKind::Newline => "newline",
    }
}

/// Tokenize a whole source file.
pub(crate) fn lex(source: &str, file_id: usize) -> (Vec<Token>, Diagnostics) {
    lex_with_base(source, file_id, 0)
}

/// Tokenize a fragment whose first byte sits at `base` in the real file,
/// so every produced span is file-absolute. Used for `${...}` bodies.
pub(crate) fn lex_with_base(source: &str, file_id: usize, base: usize) -> (Vec<Token>, Diagnostics) {
    let chars: Vec<char> = source.chars().collect();
    let mut byte_pos: Vec<usize> = Vec::with_capacity(chars.len() + 1);
    {
        let mut b = base;
        for c in &chars {
            byte_pos.push(b);
            b += c.len_utf8();
        }
        byte_pos.push(b);
    }

    let mut tokens = Vec::new();
    let mut diags = Diagnostics::new();
    let mut i = 0;

    let mut push = |kind: TokenKind, start: usize, end: usize, tokens: &mut Vec<Token>| {
        tokens.push(Token {
            kind,
            span: byte_pos[start]..byte_pos[end],
        });
    };

    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\r' => {
                i += 1;
            }

            '\n' => {
                push(TokenKind::Newline, i, i + 1, &mut tokens);
                i += 1;
            }

            '#' => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }

            '/' if chars.get(i + 1) == Some(&'/') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }

            '/' if chars.get(i + 1) == Some(&'*') => {
                let start = i;
                i += 2;
                let mut closed = false;
                while i < chars.len() {
                    if chars[i] == '*' && chars.get(i + 1) == Some(&'/') {
                        i += 2;
                        closed = true;
                        break;
                    }
                    i += 1;
                }
                if !closed {
                    diags.push(Diagnostic::error(
                        "unterminated block comment",
                        byte_pos[start]..byte_pos[i],
                        file_id,
                    ));
                }
            }

            '"' => {
                let start = i;
                i += 1;
                let content_start = i;
                let mut interp_depth = 0usize;
                let mut terminated = false;
                while i < chars.len() {
                    match chars[i] {
                        '\\' if interp_depth == 0 => {
                            i += 2;
                        }
                        '\n' if interp_depth == 0 => break,
                        '"' if interp_depth == 0 => {
                            terminated = true;
                            break;
                        }
                        '"' => {
                            // a quoted string nested inside an interpolation
                            i += 1;
                            while i < chars.len() && chars[i] != '"' && chars[i] != '\n' {
                                if chars[i] == '\\' {
                                    i += 1;
                                }
                                i += 1;
                            }
                            if i < chars.len() && chars[i] == '"' {
                                i += 1;
                            }
                        }
                        '$' if interp_depth == 0
                            && chars.get(i + 1) == Some(&'$')
                            && chars.get(i + 2) == Some(&'{') =>
                        {
                            i += 3;
                        }
                        '$' if chars.get(i + 1) == Some(&'{') => {
                            interp_depth += 1;
                            i += 2;
                        }
                        '{' if interp_depth > 0 => {
                            interp_depth += 1;
                            i += 1;
                        }
                        '}' if interp_depth > 0 => {
                            interp_depth -= 1;
                            i += 1;
                        }
                        _ => {
                            i += 1;
                        }
                    }
                }
                if terminated {
                    let raw: String = chars[content_start..i.min(chars.len())].iter().collect();
                    i += 1;
                    push(TokenKind::StringLit(raw), start, i.min(chars.len()), &mut tokens);
                } else {
                    let end = i.min(chars.len());
                    diags.push(Diagnostic::error(
                        "unterminated string",
                        byte_pos[start]..byte_pos[end],
                        file_id,
                    ));
                }
            }

            c if c.is_ascii_digit() => {
                let start = i;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
                if chars.get(i) == Some(&'.')
                    && chars.get(i + 1).is_some_and(|c| c.is_ascii_digit())
                {
                    i += 1;
                    while i < chars.len() && chars[i].is_ascii_digit() {
                        i += 1;
                    }
                }
                if matches!(chars.get(i), Some('e') | Some('E')) {
                    let mut j = i + 1;
                    if matches!(chars.get(j), Some('+') | Some('-')) {
                        j += 1;
                    }
                    if chars.get(j).is_some_and(|c| c.is_ascii_digit()) {
                        i = j;
                        while i < chars.len() && chars[i].is_ascii_digit() {
                            i += 1;
                        }
                    }
                }
                let text: String = chars[start..i].iter().collect();
                match text.parse::<f64>() {
                    Ok(n) => push(TokenKind::Number(n), start, i, &mut tokens),
                    Err(_) => diags.push(Diagnostic::error(
                        format!("invalid number literal \"{}\"", text),
                        byte_pos[start]..byte_pos[i],
                        file_id,
                    )),
                }
            }

            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                let kind = match word.as_str() {
                    "true" => TokenKind::True,
                    "false" => TokenKind::False,
                    "null" => TokenKind::Null,
                    _ => TokenKind::Ident(word),
                };
                push(kind, start, i, &mut tokens);
            }

            '=' if chars.get(i + 1) == Some(&'=') => {
                push(TokenKind::EqEq, i, i + 2, &mut tokens);
                i += 2;
            }
            '=' => {
                push(TokenKind::Eq, i, i + 1, &mut tokens);
                i += 1;
            }
            '!' if chars.get(i + 1) == Some(&'=') => {
                push(TokenKind::BangEq, i, i + 2, &mut tokens);
                i += 2;
            }
            '!' => {
                push(TokenKind::Bang, i, i + 1, &mut tokens);
                i += 1;
            }
            '>' if chars.get(i + 1) == Some(&'=') => {
                push(TokenKind::GtEq, i, i + 2, &mut tokens);
                i += 2;
            }
            '>' => {
                push(TokenKind::Gt, i, i + 1, &mut tokens);
                i += 1;
            }
            '<' if chars.get(i + 1) == Some(&'=') => {
                push(TokenKind::LtEq, i, i + 2, &mut tokens);
                i += 2;
            }
            '<' => {
                push(TokenKind::Lt, i, i + 1, &mut tokens);
                i += 1;
            }
            '&' if chars.get(i + 1) == Some(&'&') => {
                push(TokenKind::AmpAmp, i, i + 2, &mut tokens);
                i += 2;
            }
            '|' if chars.get(i + 1) == Some(&'|') => {
                push(TokenKind::PipePipe, i, i + 2, &mut tokens);
                i += 2;
            }
            '+' => {
                push(TokenKind::Plus, i, i + 1, &mut tokens);
                i += 1;
            }
            '-' => {
                push(TokenKind::Minus, i, i + 1, &mut tokens);
                i += 1;
            }
            '*' => {
                push(TokenKind::Star, i, i + 1, &mut tokens);
                i += 1;
            }
            '/' => {
                push(TokenKind::Slash, i, i + 1, &mut tokens);
                i += 1;
            }
            '%' => {
                push(TokenKind::Percent, i, i + 1, &mut tokens);
                i += 1;
            }
            '?' => {
                push(TokenKind::Question, i, i + 1, &mut tokens);
                i += 1;
            }
            ':' => {
                push(TokenKind::Colon, i, i + 1, &mut tokens);
                i += 1;
            }
            ',' => {
                push(TokenKind::Comma, i, i + 1, &mut tokens);
                i += 1;
            }
            '.' => {
                push(TokenKind::Dot, i, i + 1, &mut tokens);
                i += 1;
            }
            '(' => {
                push(TokenKind::LParen, i, i + 1, &mut tokens);
                i += 1;
            }
            ')' => {
                push(TokenKind::RParen, i, i + 1, &mut tokens);
                i += 1;
            }
            '{' => {
                push(TokenKind::LBrace, i, i + 1, &mut tokens);
                i += 1;
            }
            '}' => {
                push(TokenKind::RBrace, i, i + 1, &mut tokens);
                i += 1;
            }
            '[' => {
                push(TokenKind::LBracket, i, i + 1, &mut tokens);
                i += 1;
            }
            ']' => {
                push(TokenKind::RBracket, i, i + 1, &mut tokens);
                i += 1;
            }

            other => {
                diags.push(Diagnostic::error(
                    format!("unexpected character '{}'", other),
                    byte_pos[i]..byte_pos[i + 1],
                    file_id,
                ));
                i += 1;
            }
        }
    }

    (tokens, diags)
}

/// Process backslash escapes in the raw content of a string literal.
/// `$${` is handled separately during template splitting.
pub(crate) fn unescape(raw: &str, span: &Range<usize>, file_id: usize, diags: &mut Diagnostics) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some(other) => {
                diags.push(Diagnostic::error(
                    format!("invalid escape sequence \"\\{}\"", other),
                    span.clone(),
                    file_id,
                ));
                out.push(other);
            }
            None => {
                diags.push(Diagnostic::error(
                    "invalid trailing backslash in string",
                    span.clone(),
                    file_id,
                ));
            }
        }
    }
    out
}
