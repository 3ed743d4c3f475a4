// Parser for .cell description files.
//
// Parses a token stream (from the lexer) into a `CellFile` using chumsky
// combinators.
//
// Preconditions: input is a valid token stream from `lexer::lex()`.
// Postconditions: returns an AST plus any parse errors (non-fatal).
// Failure modes: syntax errors produce `Rich` diagnostics.
// Side effects: none.

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;
use chumsky::span::SimpleSpan;

use crate::ast::*;
use crate::lexer::Token;

/// Result of parsing: AST plus any errors.
#[derive(Debug)]
pub struct ParseResult {
    pub file: Option<CellFile>,
    pub errors: Vec<Rich<'static, Token, SimpleSpan>>,
}

/// Parse a .cell source string. Lexes then parses.
pub fn parse(source: &str) -> ParseResult {
    let lex_result = crate::lexer::lex(source);
    let len = source.len();

    let eoi: SimpleSpan = (len..len).into();
    let stream = Stream::from_iter(lex_result.tokens).map(eoi, |(t, s): (_, _)| (t, s));

    let parser = file_parser(source);
    let (file, parse_errors) = parser.parse(stream).into_output_errors();

    let mut all_errors: Vec<Rich<'static, Token, SimpleSpan>> = lex_result
        .errors
        .into_iter()
        .map(|e| Rich::custom(e.span, e.message))
        .collect();
    all_errors.extend(parse_errors.into_iter().map(|e| e.into_owned()));

    ParseResult {
        file,
        errors: all_errors,
    }
}

fn file_parser<'tokens, 'src: 'tokens, I>(
    source: &'src str,
) -> impl Parser<'tokens, I, CellFile, extra::Err<Rich<'tokens, Token, SimpleSpan>>> + 'src
where
    'tokens: 'src,
    I: ValueInput<'tokens, Token = Token, Span = SimpleSpan>,
{
    let ident = just(Token::Ident).map_with(move |_, e| {
        let span: SimpleSpan = e.span();
        Ident {
            name: source[span.start()..span.end()].to_string(),
            span,
        }
    });

    let int = select! { Token::Int(n) => n };

    // ── 'sfixed' '(' INT ',' INT ')' ──

    let format = just(Token::Sfixed)
        .ignore_then(
            int.clone()
                .then_ignore(just(Token::Comma))
                .then(int)
                .delimited_by(just(Token::LParen), just(Token::RParen)),
        )
        .map_with(|(int_bits, frac_bits), e| FormatLit {
            int_bits,
            frac_bits,
            span: e.span(),
        });

    let entry = ident
        .clone()
        .then_ignore(just(Token::Colon))
        .then(format)
        .then_ignore(just(Token::Semi))
        .map_with(|(port, format), e| Entry {
            port,
            format,
            span: e.span(),
        });

    let decl = just(Token::Cell)
        .ignore_then(ident.clone())
        .then(ident)
        .then(
            entry
                .repeated()
                .collect::<Vec<_>>()
                .delimited_by(just(Token::LBrace), just(Token::RBrace)),
        )
        .map_with(|((kind, name), entries), e| CellDecl {
            kind,
            name,
            entries,
            span: e.span(),
        });

    decl.repeated()
        .collect::<Vec<_>>()
        .map_with(|cells, e| CellFile {
            cells,
            span: e.span(),
        })
}
