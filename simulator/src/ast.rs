// AST node types for .cell description files.
//
// Every node carries a `SimpleSpan` so elaboration can point diagnostics at
// the construct that caused them.
//
// Preconditions: produced by the parser from a valid or partially-valid token stream.
// Postconditions: each node's span covers the source range of the construct.
// Failure modes: none (data-only module).
// Side effects: none.

use chumsky::span::SimpleSpan;

/// Byte-offset span (alias for chumsky's `SimpleSpan`).
pub type Span = SimpleSpan;

/// A complete file: a sequence of cell declarations.
#[derive(Debug, Clone, PartialEq)]
pub struct CellFile {
    pub cells: Vec<CellDecl>,
    pub span: Span,
}

// ── decl: 'cell' IDENT IDENT '{' entry* '}' ──

#[derive(Debug, Clone, PartialEq)]
pub struct CellDecl {
    /// Cell kind as written (`edge` or `interior` once elaborated).
    pub kind: Ident,
    pub name: Ident,
    pub entries: Vec<Entry>,
    pub span: Span,
}

// ── entry: IDENT ':' 'sfixed' '(' INT ',' INT ')' ';' ──

/// A port (or port group) format declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub port: Ident,
    pub format: FormatLit,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FormatLit {
    pub int_bits: u32,
    pub frac_bits: u32,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}
