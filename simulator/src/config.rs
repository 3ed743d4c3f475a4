// config.rs — Cell configurations and their elaboration from .cell files
//
// A `CellConfig` names a cell and fixes every port format. Configurations
// come either from a parsed .cell file (`elaborate`) or from a JSON array
// (`load_json`). Both paths report duplicate names and lossy output
// narrowings as `Diagnostic`s.
//
// Preconditions: none.
// Postconditions: every config returned by `elaborate` builds into a cell.
// Failure modes: declaration errors become diagnostics; I/O and JSON errors
//                become `SimError`.
// Side effects: `load_file` reads the file system.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ast::{CellDecl, CellFile, Span};
use crate::cell::{AnyCell, CellKind, InputFormats, Narrowing, Port};
use crate::diag::{codes, Diagnostic};
use crate::edge::EdgeCell;
use crate::error::SimError;
use crate::fixed::Format;
use crate::interior::InteriorCell;
use crate::parser::parse;

// ── Configuration ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellConfig {
    pub name: String,
    pub kind: CellKind,
    pub nw: Format,
    pub ne: Format,
    pub s: Format,
    /// Edge cells only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub se: Option<Format>,
    pub sw: Format,
    pub n: Format,
}

impl CellConfig {
    /// Every input port in `input`, every output port in `output`.
    pub fn uniform(name: impl Into<String>, kind: CellKind, input: Format, output: Format) -> Self {
        CellConfig {
            name: name.into(),
            kind,
            nw: input,
            ne: input,
            s: input,
            se: (kind == CellKind::Edge).then_some(output),
            sw: output,
            n: output,
        }
    }

    pub fn input_formats(&self) -> InputFormats {
        InputFormats {
            nw: self.nw,
            ne: self.ne,
            s: self.s,
        }
    }

    /// Elaborate the configured cell.
    pub fn build(&self) -> Result<AnyCell, SimError> {
        let inputs = self.input_formats();
        match (self.kind, self.se) {
            (CellKind::Edge, Some(se)) => Ok(AnyCell::Edge(EdgeCell::new(
                inputs, se, self.sw, self.n,
            ))),
            (CellKind::Edge, None) => Err(SimError::MissingPort {
                cell: self.name.clone(),
                port: Port::Se,
            }),
            (CellKind::Interior, None) => Ok(AnyCell::Interior(InteriorCell::new(
                inputs, self.sw, self.n,
            ))),
            (CellKind::Interior, Some(_)) => Err(SimError::UnexpectedPort {
                cell: self.name.clone(),
                kind: self.kind,
                port: Port::Se,
            }),
        }
    }
}

// ── Elaboration ─────────────────────────────────────────────────────────────

/// Left-hand side of an entry: a single port or a group default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Inputs,
    Outputs,
    Port(Port),
}

impl Slot {
    fn from_name(name: &str) -> Option<Slot> {
        match name {
            "inputs" => Some(Slot::Inputs),
            "outputs" => Some(Slot::Outputs),
            _ => Port::from_name(name).map(Slot::Port),
        }
    }

    fn group_of(port: Port) -> Slot {
        if port.is_input() {
            Slot::Inputs
        } else {
            Slot::Outputs
        }
    }
}

/// A declared slot. `format` is `None` when the literal was rejected.
struct Declared {
    slot: Slot,
    format: Option<Format>,
    span: Span,
}

enum Resolved {
    Found(Format, Span),
    Invalid,
    Missing,
}

fn resolve(declared: &[Declared], port: Port) -> Resolved {
    let find = |slot: Slot| declared.iter().find(|d| d.slot == slot);
    match find(Slot::Port(port)).or_else(|| find(Slot::group_of(port))) {
        Some(Declared {
            format: Some(format),
            span,
            ..
        }) => Resolved::Found(*format, *span),
        Some(_) => Resolved::Invalid,
        None => Resolved::Missing,
    }
}

#[derive(Debug)]
pub struct ElaborateResult {
    pub configs: Vec<CellConfig>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Turn parsed declarations into configurations.
pub fn elaborate(file: &CellFile) -> ElaborateResult {
    let mut configs = Vec::new();
    let mut diagnostics = Vec::new();
    let mut seen: HashMap<String, Span> = HashMap::new();

    for decl in &file.cells {
        if !claim_name(&mut seen, &decl.name.name, decl.name.span, &mut diagnostics) {
            continue;
        }
        if let Some(config) = elaborate_decl(decl, &mut diagnostics) {
            configs.push(config);
        }
    }

    ElaborateResult {
        configs,
        diagnostics,
    }
}

/// Record `name`, or report it when an earlier cell already took it.
fn claim_name(
    seen: &mut HashMap<String, Span>,
    name: &str,
    span: Span,
    diagnostics: &mut Vec<Diagnostic>,
) -> bool {
    if let Some(first) = seen.get(name) {
        diagnostics.push(
            Diagnostic::error(codes::E0105, span, format!("duplicate cell name `{name}`"))
                .with_related(*first, "first declared here"),
        );
        return false;
    }
    seen.insert(name.to_string(), span);
    true
}

/// Build `config` and warn about each lossy output narrowing.
///
/// `port_span` locates a port's declaration; `span` covers the whole cell.
fn check_cell(
    config: &CellConfig,
    span: Span,
    port_span: impl Fn(Port) -> Option<Span>,
    diagnostics: &mut Vec<Diagnostic>,
) -> bool {
    let cell = match config.build() {
        Ok(cell) => cell,
        Err(e) => {
            let code = match &e {
                SimError::MissingPort { .. } => codes::E0103,
                _ => codes::E0104,
            };
            diagnostics.push(Diagnostic::error(code, span, e.to_string()));
            return false;
        }
    };

    let name = &config.name;
    for narrowing in cell.narrowings().iter().filter(|n| n.is_lossy()) {
        let Narrowing {
            port,
            source,
            target,
        } = narrowing;
        diagnostics.push(
            Diagnostic::warning(
                codes::W0300,
                port_span(*port).unwrap_or(span),
                format!("output `{port}` of cell `{name}` narrows {source} to {target}"),
            )
            .with_hint("values outside the port format are rounded or saturated"),
        );
    }
    true
}

fn elaborate_decl(decl: &CellDecl, diagnostics: &mut Vec<Diagnostic>) -> Option<CellConfig> {
    let name = &decl.name.name;
    let Some(kind) = CellKind::from_name(&decl.kind.name) else {
        diagnostics.push(
            Diagnostic::error(
                codes::E0100,
                decl.kind.span,
                format!("unknown cell kind `{}`", decl.kind.name),
            )
            .with_hint("expected `edge` or `interior`"),
        );
        return None;
    };
    let errors_before = diagnostics.iter().filter(|d| d.is_error()).count();

    let mut declared: Vec<Declared> = Vec::new();
    for entry in &decl.entries {
        let Some(slot) = Slot::from_name(&entry.port.name) else {
            diagnostics.push(
                Diagnostic::error(
                    codes::E0101,
                    entry.port.span,
                    format!("unknown port `{}`", entry.port.name),
                )
                .with_hint("ports are nw, ne, s, se, sw, n; group defaults are inputs, outputs"),
            );
            continue;
        };
        if slot == Slot::Port(Port::Se) && kind == CellKind::Interior {
            diagnostics.push(Diagnostic::error(
                codes::E0104,
                entry.port.span,
                format!("port `se` is not available on {kind} cell `{name}`"),
            ));
            continue;
        }
        if let Some(first) = declared.iter().find(|d| d.slot == slot) {
            diagnostics.push(
                Diagnostic::error(
                    codes::E0102,
                    entry.port.span,
                    format!("`{}` is declared more than once", entry.port.name),
                )
                .with_related(first.span, "first declared here"),
            );
            continue;
        }

        let lit = entry.format;
        let format = match Format::new(lit.int_bits, lit.frac_bits) {
            Ok(format) => Some(format),
            Err(e) => {
                diagnostics.push(
                    Diagnostic::error(codes::E0200, lit.span, e.to_string()).with_hint(format!(
                        "integer plus fraction bits must total 1 to {}",
                        Format::MAX_WIDTH
                    )),
                );
                None
            }
        };
        declared.push(Declared {
            slot,
            format,
            span: entry.span,
        });
    }

    let mut ports: HashMap<Port, (Format, Span)> = HashMap::new();
    for &port in Port::INPUTS.iter().chain(kind.output_ports()) {
        match resolve(&declared, port) {
            Resolved::Found(format, span) => {
                ports.insert(port, (format, span));
            }
            Resolved::Invalid => {}
            Resolved::Missing => {
                let group = if port.is_input() { "inputs" } else { "outputs" };
                diagnostics.push(
                    Diagnostic::error(
                        codes::E0103,
                        decl.name.span,
                        format!("cell `{name}` declares no format for port `{port}`"),
                    )
                    .with_hint(format!(
                        "add `{port}: sfixed(i, f);` or a group default `{group}: sfixed(i, f);`"
                    )),
                );
            }
        }
    }

    if diagnostics.iter().filter(|d| d.is_error()).count() > errors_before {
        return None;
    }

    let format_of = |port: Port| ports.get(&port).map(|(f, _)| *f);
    let (Some(nw), Some(ne), Some(s), Some(sw), Some(n)) = (
        format_of(Port::Nw),
        format_of(Port::Ne),
        format_of(Port::S),
        format_of(Port::Sw),
        format_of(Port::N),
    ) else {
        return None;
    };
    let config = CellConfig {
        name: name.clone(),
        kind,
        nw,
        ne,
        s,
        se: format_of(Port::Se),
        sw,
        n,
    };

    let port_span = |port: Port| ports.get(&port).map(|(_, span)| *span);
    if !check_cell(&config, decl.span, port_span, diagnostics) {
        return None;
    }

    tracing::debug!(cell = %name, kind = %kind, "elaborated cell");
    Some(config)
}

// ── Loading ─────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct LoadResult {
    pub source: String,
    pub configs: Vec<CellConfig>,
    pub diagnostics: Vec<Diagnostic>,
}

impl LoadResult {
    pub fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_error()).count()
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    /// The named configuration, or the first one when `name` is `None`.
    pub fn select(&self, name: Option<&str>) -> Result<&CellConfig, SimError> {
        match name {
            Some(name) => self
                .configs
                .iter()
                .find(|c| c.name == name)
                .ok_or_else(|| SimError::UnknownCell(name.to_string())),
            None => self.configs.first().ok_or(SimError::NoCells),
        }
    }
}

/// Parse and elaborate .cell source text.
pub fn load_source(source: &str) -> LoadResult {
    let parsed = parse(source);
    let mut diagnostics: Vec<Diagnostic> =
        parsed.errors.iter().map(Diagnostic::from_syntax).collect();

    let configs = match parsed.file {
        Some(file) => {
            let result = elaborate(&file);
            diagnostics.extend(result.diagnostics);
            result.configs
        }
        None => Vec::new(),
    };

    LoadResult {
        source: source.to_string(),
        configs,
        diagnostics,
    }
}

/// Check a JSON array of configurations the way .cell declarations are checked.
///
/// Malformed JSON and invalid formats fail outright; duplicate names, a
/// misplaced `se` port and lossy outputs become diagnostics.
pub fn load_json(source: &str) -> Result<LoadResult, SimError> {
    let parsed: Vec<CellConfig> = serde_json::from_str(source)?;
    let name_spans = json_name_spans(source);

    let mut configs = Vec::new();
    let mut diagnostics = Vec::new();
    let mut seen: HashMap<String, Span> = HashMap::new();
    for (i, config) in parsed.into_iter().enumerate() {
        let span = name_spans
            .get(i)
            .copied()
            .unwrap_or_else(|| Span::from(0..0));
        if !claim_name(&mut seen, &config.name, span, &mut diagnostics) {
            continue;
        }
        if check_cell(&config, span, |_| None, &mut diagnostics) {
            configs.push(config);
        }
    }

    tracing::debug!(cells = configs.len(), "loaded JSON configuration");
    Ok(LoadResult {
        source: source.to_string(),
        configs,
        diagnostics,
    })
}

/// Spans of the `"name": "..."` members of a configuration array, in order.
fn json_name_spans(source: &str) -> Vec<Span> {
    const KEY: &str = "\"name\"";
    let mut spans = Vec::new();
    let mut from = 0;
    while let Some(found) = source[from..].find(KEY) {
        let start = from + found;
        from = start + KEY.len();

        let rest = source[from..].trim_start();
        let Some(value) = rest.strip_prefix(':') else {
            continue;
        };
        let value = value.trim_start();
        let open = source.len() - value.len();
        if !value.starts_with('"') {
            continue;
        }
        let Some(close) = source[open + 1..].find('"') else {
            break;
        };
        let end = open + close + 2;
        spans.push(Span::from(start..end));
        from = end;
    }
    spans
}

/// Load a `.cell` file, or a JSON array of configurations for `.json` paths.
pub fn load_file(path: &Path) -> Result<LoadResult, SimError> {
    let source = std::fs::read_to_string(path).map_err(|source| SimError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    if path.extension().is_some_and(|ext| ext == "json") {
        return load_json(&source);
    }
    Ok(load_source(&source))
}
