//! Compilation pipeline: semantic analysis, then lowering and rendering
//!
//! The front end delivers two artifacts in one input: the semantic-action
//! stream recorded during parsing, and the structured program tree. Analysis
//! runs the stream to completion first; only a clean run (no fatal flag) is
//! lowered to assembly. Aborting errors propagate as `Err`, recorded errors
//! come back in the output with `assembly` left empty.

use crate::ast::Program;
use crate::codegen::emitter::render_text;
use crate::codegen::{lower_program, param_cell, EmitterOptions};
use crate::sema::{Analyzer, SemanticAction, Symbol, SymbolKind, Token};
use crate::utils::{Error, Result, Warning};
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// One recorded semantic action with the token it was raised on
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRecord {
    pub action: SemanticAction,
    pub token: Token,
}

/// Everything the front end hands over for one compilation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompileInput {
    #[serde(default)]
    pub actions: Vec<ActionRecord>,
    #[serde(default)]
    pub program: Program,
}

#[derive(Debug, Serialize)]
pub struct CompileOutput {
    /// `None` when a recorded error suppressed emission
    pub assembly: Option<String>,
    pub warnings: Vec<Warning>,
    pub errors: Vec<Error>,
    pub symbols: Vec<Symbol>,
}

pub fn compile(input: &CompileInput) -> Result<CompileOutput> {
    compile_with(input, &EmitterOptions::default())
}

pub fn compile_with(input: &CompileInput, options: &EmitterOptions) -> Result<CompileOutput> {
    let mut analyzer = Analyzer::new();
    for record in &input.actions {
        analyzer.execute(record.action, &record.token)?;
    }

    // main is entered through the entry jump, never called
    for symbol in analyzer.table_mut().all_mut() {
        if symbol.name == "main" && symbol.kind == SymbolKind::Function {
            symbol.used = true;
        }
    }
    analyzer.report_unused();

    let (table, warnings, errors, fatal) = analyzer.into_parts();
    let symbols = table.all().to_vec();
    for symbol in &symbols {
        debug!(
            "symbol: {} ({:?}, {}, scope {}, used={}, initialized={})",
            symbol.name, symbol.kind, symbol.ty, symbol.scope, symbol.used, symbol.initialized
        );
    }

    if fatal {
        info!("emission suppressed: {} semantic error(s)", errors.len());
        return Ok(CompileOutput {
            assembly: None,
            warnings,
            errors,
            symbols,
        });
    }

    let (emitter, data) = lower_program(&input.program);

    // callers assign arguments into the mangled parameter cells, so each
    // parameter contributes one global data cell
    let mut data_symbols = symbols.clone();
    for symbol in &symbols {
        if symbol.kind == SymbolKind::Parameter {
            data_symbols.push(Symbol {
                name: param_cell(&symbol.scope, &symbol.name),
                kind: SymbolKind::Variable,
                ..symbol.clone()
            });
        }
    }

    let assembly = format!(
        "{}\n{}",
        data.render(&data_symbols, options),
        render_text(emitter.instrs(), options)
    );
    debug!("assembly:\n{}", assembly);

    Ok(CompileOutput {
        assembly: Some(assembly),
        warnings,
        errors,
        symbols,
    })
}
