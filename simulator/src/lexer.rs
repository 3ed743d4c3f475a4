// Lexer for .cell description files.
//
// Uses the `logos` crate for DFA-based lexing. Whitespace (newlines
// included) and `#` comments are skipped.
//
// Preconditions: input is valid UTF-8.
// Postconditions: returns all tokens with byte-offset spans, plus any lex errors.
// Failure modes: unrecognized characters and out-of-range integers produce
//                `LexError`; lexing continues.
// Side effects: none.

use logos::Logos;
use std::fmt;

use crate::ast::Span;

/// A lexer error with location.
#[derive(Debug, Clone, PartialEq)]
pub struct LexError {
    pub span: Span,
    pub message: String,
}

/// Result of lexing: tokens plus any errors (non-fatal).
#[derive(Debug)]
pub struct LexResult {
    pub tokens: Vec<(Token, Span)>,
    pub errors: Vec<LexError>,
}

/// Identifiers carry no value; use the span to retrieve the text.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+|#[^\n]*")]
pub enum Token {
    // ── Keywords ──
    #[token("cell")]
    Cell,
    #[token("sfixed")]
    Sfixed,

    // ── Symbols ──
    #[token(":")]
    Colon,
    #[token(";")]
    Semi,
    #[token(",")]
    Comma,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,

    // ── Literals ──
    /// Unsigned decimal bit count.
    #[regex(r"[0-9]+", |lex| lex.slice().parse::<u32>().ok())]
    Int(u32),

    // ── Identifier ──
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Ident,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Cell => write!(f, "cell"),
            Token::Sfixed => write!(f, "sfixed"),
            Token::Colon => write!(f, ":"),
            Token::Semi => write!(f, ";"),
            Token::Comma => write!(f, ","),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LBrace => write!(f, "{{"),
            Token::RBrace => write!(f, "}}"),
            Token::Int(n) => write!(f, "{}", n),
            Token::Ident => write!(f, "identifier"),
        }
    }
}

/// Tokenize a .cell source string.
pub fn lex(source: &str) -> LexResult {
    let lexer = Token::lexer(source);
    let mut tokens = Vec::new();
    let mut errors = Vec::new();

    for (result, range) in lexer.spanned() {
        let span: Span = range.clone().into();
        match result {
            Ok(token) => tokens.push((token, span)),
            Err(()) => errors.push(LexError {
                span,
                message: format!("unexpected input: {:?}", &source[range]),
            }),
        }
    }

    LexResult { tokens, errors }
}

// ── Tests ──
