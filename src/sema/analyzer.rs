//! Semantic analyzer driven by the external parser
//!
//! The table-driven LR parser raises one semantic action per grammar point
//! and hands over the current token; `Analyzer::execute` is the single
//! dispatch entry. Every token is observed first (type keywords open
//! declarations, delimiters open/close scopes, literals feed argument-type
//! inference), then the explicit action is applied.
//!
//! All analyzer state lives in this one value, so a fresh compilation gets a
//! fresh context and nothing leaks between runs.

use crate::sema::symbols::{FunctionSignature, Symbol, SymbolId, SymbolKind, SymbolTable};
use crate::sema::token::{Token, TokenKind};
use crate::sema::types::{call_compatible, promote, BaseType};
use crate::utils::{Error, Result, Warning};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

pub const GLOBAL_SCOPE: &str = "global";

/// Semantic-action identifiers raised by the parser at defined grammar points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SemanticAction {
    /// Token-only action raised on every shift that has no dedicated action
    Observe,
    Declare,
    EndDeclaration,
    Use,
    /// `ID[expr]` in a declaration: the declared symbol is an array
    MarkArray,
    MarkInitialized,
    /// Closes `ID[...] = { ... }`
    EndInitializerList,
    /// Assignment statement completed: the target received a value
    MarkAssigned,
    /// Identifier position of a call expression
    CallTarget,
    /// Opening parenthesis of a call's argument list
    BeginCallArgs,
    /// Argument separator: commit the accumulated argument type
    CommitCallArg,
    /// Closing parenthesis of a call: run arity and type checks
    EndCall,
}

/// Declaration-mode bookkeeping
#[derive(Debug, Default)]
struct DeclState {
    active: bool,
    ty: Option<BaseType>,
    /// Guards against the token pass and the action pass both declaring the
    /// same token occurrence
    last_pos: Option<usize>,
    last_name: Option<String>,
}

/// Brace tracking for `= { ... }` initializer lists inside a declaration
#[derive(Debug, Default)]
struct InitListState {
    pending: bool,
    active: bool,
    depth: usize,
}

/// Call-site argument checking state
#[derive(Debug)]
struct CallState {
    in_args: bool,
    target: Option<String>,
    count: usize,
    arg_types: Vec<BaseType>,
    current: BaseType,
}

impl Default for CallState {
    fn default() -> Self {
        Self {
            in_args: false,
            target: None,
            count: 0,
            arg_types: Vec::new(),
            current: BaseType::Unknown,
        }
    }
}

/// The analyzer context: scope/symbol lifecycle, function registry and
/// call-site type checking, one instance per compilation.
#[derive(Debug, Default)]
pub struct Analyzer {
    table: SymbolTable,
    decl: DeclState,
    init_list: InitListState,
    call: CallState,

    /// Stack of enclosing function names; empty means global scope
    func_stack: Vec<String>,
    /// Parallel to the scope stack: was this scope a function body?
    scope_is_function: Vec<bool>,

    in_param_list: bool,
    next_brace_is_body: bool,
    building_function: Option<String>,
    param_buffer: Vec<SymbolId>,

    last_ident: Option<String>,
    assign_target: Option<String>,
    /// Guards against the token pass and the action pass both recording the
    /// same use occurrence
    last_use_pos: Option<usize>,

    warnings: Vec<Warning>,
    errors: Vec<Error>,
    fatal: bool,
}

impl Analyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dispatch entry point: one call per semantic action raised by the parser
    pub fn execute(&mut self, action: SemanticAction, token: &Token) -> Result<()> {
        self.observe_token(token)?;
        self.apply_action(action, token)
    }

    /// Non-throwing fatal flag: set by checks that keep analyzing after
    /// reporting. Code emission must be suppressed when this is set.
    pub fn has_fatal_error(&self) -> bool {
        self.fatal
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn errors(&self) -> &[Error] {
        &self.errors
    }

    pub fn table(&self) -> &SymbolTable {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut SymbolTable {
        &mut self.table
    }

    /// "global" or the function whose body is being analyzed
    pub fn current_scope(&self) -> &str {
        self.func_stack.last().map(String::as_str).unwrap_or(GLOBAL_SCOPE)
    }

    /// Final sweep: drain every scope still open (normally just the global
    /// one) so their unused symbols get reported exactly once.
    pub fn report_unused(&mut self) {
        while self.table.scope_depth() > 0 {
            self.close_scope();
        }
    }

    pub fn into_parts(self) -> (SymbolTable, Vec<Warning>, Vec<Error>, bool) {
        (self.table, self.warnings, self.errors, self.fatal)
    }

    // ==================== Token observation ====================

    fn observe_token(&mut self, token: &Token) -> Result<()> {
        if let Some(ty) = token.kind.type_keyword() {
            self.begin_declaration(ty);
            return Ok(());
        }
        if let Some(ty) = token.kind.literal_type() {
            if self.call.in_args {
                self.call.current = promote(self.call.current, ty);
                debug!(
                    "literal '{}' in argument, accumulated type = {}",
                    token.lexeme, self.call.current
                );
            }
            return Ok(());
        }

        match token.kind {
            TokenKind::LParen => {
                if self.decl.active {
                    self.in_param_list = true;
                    self.param_buffer.clear();
                    self.building_function = self.last_ident.clone();
                    if let Some(name) = self.building_function.clone() {
                        self.promote_to_function(&name);
                    }
                }
            }
            TokenKind::RParen => {
                if self.in_param_list {
                    self.in_param_list = false;
                    self.next_brace_is_body = true;
                    self.register_signature(token);
                }
                self.end_declaration();
            }
            TokenKind::Ident => {
                if self.in_param_list {
                    self.declare_parameter(token)?;
                } else if self.decl.active {
                    if self.decl.last_pos != Some(token.position()) {
                        self.declare(token)?;
                    }
                } else {
                    self.use_symbol(token)?;
                    self.assign_target = Some(token.lexeme.clone());
                }
                self.last_ident = Some(token.lexeme.clone());
            }
            TokenKind::Comma => {
                if self.decl.active || self.in_param_list {
                    self.decl.last_pos = None;
                    self.decl.last_name = None;
                }
            }
            TokenKind::Semicolon => {
                self.end_declaration();
                self.last_ident = None;
                self.assign_target = None;
            }
            TokenKind::LBrace => {
                if self.decl.active && (self.init_list.pending || self.init_list.active) {
                    self.init_list.active = true;
                    self.init_list.depth += 1;
                } else {
                    self.open_scope();
                }
            }
            TokenKind::RBrace => {
                if self.init_list.active {
                    self.init_list.depth = self.init_list.depth.saturating_sub(1);
                    if self.init_list.depth == 0 {
                        self.init_list.active = false;
                        self.init_list.pending = false;
                        if let Some(name) = self.decl.last_name.clone() {
                            self.mark_initialized_quiet(&name);
                        }
                    }
                } else {
                    self.close_scope();
                    self.last_ident = None;
                    self.assign_target = None;
                }
            }
            TokenKind::Assign => {
                if self.decl.active {
                    self.init_list.pending = true;
                    let target = self.decl.last_name.clone().or_else(|| self.last_ident.clone());
                    if let Some(name) = target {
                        self.mark_initialized_quiet(&name);
                    }
                }
            }
            TokenKind::LBracket => {
                if self.decl.active {
                    let target = self.decl.last_name.clone().or_else(|| self.last_ident.clone());
                    if let Some(name) = target {
                        self.mark_array_quiet(&name);
                    }
                } else if let Some(name) = self.last_ident.clone() {
                    self.mark_used_quiet(&name);
                }
            }
            // Relational operators and the remaining delimiters carry no
            // analyzer state of their own.
            _ => {}
        }
        Ok(())
    }

    // ==================== Action dispatch ====================

    fn apply_action(&mut self, action: SemanticAction, token: &Token) -> Result<()> {
        match action {
            SemanticAction::Observe => Ok(()),
            SemanticAction::Declare => {
                if self.decl.last_pos == Some(token.position()) {
                    return Ok(());
                }
                if self.in_param_list {
                    self.declare_parameter(token)
                } else if self.decl.active {
                    self.declare(token)?;
                    self.last_ident = Some(token.lexeme.clone());
                    Ok(())
                } else {
                    Ok(())
                }
            }
            SemanticAction::EndDeclaration => {
                self.end_declaration();
                Ok(())
            }
            SemanticAction::Use => self.use_symbol(token),
            SemanticAction::MarkArray => {
                if let Some(name) = self.decl.last_name.clone() {
                    self.mark_array_quiet(&name);
                }
                Ok(())
            }
            SemanticAction::MarkInitialized => {
                if let Some(name) = self.decl.last_name.clone() {
                    self.mark_initialized_quiet(&name);
                }
                Ok(())
            }
            SemanticAction::EndInitializerList => {
                if let Some(name) = self.decl.last_name.clone() {
                    self.mark_initialized_quiet(&name);
                }
                self.init_list = InitListState::default();
                Ok(())
            }
            SemanticAction::MarkAssigned => {
                if let Some(name) = self.assign_target.clone() {
                    self.mark_initialized_quiet(&name);
                }
                Ok(())
            }
            SemanticAction::CallTarget => {
                self.call.target = Some(token.lexeme.clone());
                self.use_symbol(token)
            }
            SemanticAction::BeginCallArgs => {
                self.call.in_args = true;
                self.call.count = 0;
                self.call.arg_types.clear();
                self.call.current = BaseType::Unknown;
                Ok(())
            }
            SemanticAction::CommitCallArg => {
                if self.call.in_args {
                    self.commit_argument();
                }
                Ok(())
            }
            SemanticAction::EndCall => {
                if self.call.in_args {
                    self.call.in_args = false;
                    // A front end that omits the final separator still gets
                    // its last argument committed here; f() commits nothing.
                    if self.call.current != BaseType::Unknown {
                        self.commit_argument();
                    }
                    self.check_call(token);
                    self.call = CallState::default();
                }
                Ok(())
            }
        }
    }

    // ==================== Declarations ====================

    fn begin_declaration(&mut self, ty: BaseType) {
        self.decl.active = true;
        self.decl.ty = Some(ty);
        self.decl.last_pos = None;
        self.decl.last_name = None;
        self.init_list = InitListState::default();
    }

    fn end_declaration(&mut self) {
        self.decl = DeclState::default();
        self.init_list = InitListState::default();
    }

    fn declare(&mut self, token: &Token) -> Result<()> {
        let name = token.lexeme.clone();
        if name.is_empty() {
            return Ok(());
        }
        if self.table.scope_depth() == 0 {
            self.table.open_scope();
            self.scope_is_function.push(false);
        }

        if self.table.exists_in_current_scope(&name) {
            return Err(Error::DuplicateSymbol {
                name,
                span: token.span,
            });
        }
        let scope = self.current_scope().to_string();
        if scope != GLOBAL_SCOPE && self.table.exists_in_function(&name, &scope) {
            return Err(Error::Shadowing {
                name,
                function: scope,
                span: token.span,
            });
        }
        let ty = match self.decl.ty {
            Some(ty) => ty,
            None => {
                return Err(Error::MissingTypeContext {
                    name,
                    span: token.span,
                })
            }
        };

        self.table.insert(Symbol {
            name: name.clone(),
            ty,
            kind: SymbolKind::Variable,
            scope,
            used: false,
            initialized: false,
            array_len: None,
            span: token.span,
        });
        self.decl.last_pos = Some(token.position());
        self.decl.last_name = Some(name.clone());
        self.assign_target = Some(name);
        Ok(())
    }

    fn declare_parameter(&mut self, token: &Token) -> Result<()> {
        if self.decl.last_pos == Some(token.position()) {
            return Ok(());
        }
        let ty = match self.decl.ty {
            Some(ty) => ty,
            None => {
                return Err(Error::MissingTypeContext {
                    name: token.lexeme.clone(),
                    span: token.span,
                })
            }
        };
        let scope = self
            .building_function
            .clone()
            .unwrap_or_else(|| GLOBAL_SCOPE.to_string());

        // Parameters receive a value at call time, so they are born
        // initialized; they join the body scope when its brace opens.
        let id = self.table.insert_detached(Symbol {
            name: token.lexeme.clone(),
            ty,
            kind: SymbolKind::Parameter,
            scope,
            used: false,
            initialized: true,
            array_len: None,
            span: token.span,
        });
        self.param_buffer.push(id);
        self.decl.last_pos = Some(token.position());
        self.decl.last_name = Some(token.lexeme.clone());
        self.last_ident = Some(token.lexeme.clone());
        Ok(())
    }

    // ==================== Uses and marks ====================

    fn use_symbol(&mut self, token: &Token) -> Result<()> {
        let name = &token.lexeme;
        if name.is_empty() {
            return Ok(());
        }
        if self.last_use_pos == Some(token.position()) {
            return Ok(());
        }
        let id = self.table.lookup(name).ok_or_else(|| Error::UndeclaredSymbol {
            name: name.clone(),
            span: token.span,
        })?;

        let sym = self.table.symbol(id);
        if !sym.initialized {
            let w = Warning::UseBeforeInit {
                name: sym.name.clone(),
                ty: sym.ty,
                scope: sym.scope.clone(),
                position: token.position(),
            };
            warn!("{}", w);
            self.warnings.push(w);
        }
        let ty = sym.ty;
        self.table.symbol_mut(id).used = true;
        self.last_use_pos = Some(token.position());

        if self.call.in_args {
            self.call.current = promote(self.call.current, ty);
            debug!(
                "identifier '{}' in argument, accumulated type = {}",
                name, self.call.current
            );
        }
        Ok(())
    }

    fn mark_used_quiet(&mut self, name: &str) {
        if let Some(id) = self.table.lookup(name) {
            self.table.symbol_mut(id).used = true;
        }
    }

    fn mark_initialized_quiet(&mut self, name: &str) {
        if let Some(id) = self.table.lookup(name) {
            debug!("marking '{}' as initialized", name);
            self.table.symbol_mut(id).initialized = true;
        }
    }

    fn mark_array_quiet(&mut self, name: &str) {
        if let Some(id) = self.table.lookup(name) {
            self.table.symbol_mut(id).kind = SymbolKind::Array;
        }
    }

    // ==================== Scopes ====================

    fn open_scope(&mut self) {
        self.table.open_scope();
        let is_function = self.next_brace_is_body;
        if is_function {
            self.next_brace_is_body = false;
            if let Some(name) = self.building_function.clone() {
                self.func_stack.push(name);
            }
            for id in std::mem::take(&mut self.param_buffer) {
                self.table.attach_to_current_scope(id);
            }
            self.decl.last_name = None;
        }
        self.scope_is_function.push(is_function);
    }

    fn close_scope(&mut self) {
        for id in self.table.close_scope() {
            let s = self.table.symbol(id);
            if !s.used {
                let w = Warning::UnusedSymbol {
                    name: s.name.clone(),
                    ty: s.ty,
                    scope: s.scope.clone(),
                };
                warn!("{}", w);
                self.warnings.push(w);
            }
        }
        if let Some(was_function) = self.scope_is_function.pop() {
            if was_function {
                self.func_stack.pop();
            }
        }
    }

    // ==================== Function registration ====================

    fn promote_to_function(&mut self, name: &str) {
        if let Some(id) = self.table.lookup(name) {
            let sym = self.table.symbol_mut(id);
            sym.kind = SymbolKind::Function;
            sym.scope = GLOBAL_SCOPE.to_string();
            sym.initialized = true;
        }
    }

    /// Registered exactly once, at the close of the parameter list
    fn register_signature(&mut self, token: &Token) {
        let name = match self.building_function.clone() {
            Some(name) if !name.is_empty() => name,
            _ => return,
        };

        let ret = self
            .table
            .all()
            .iter()
            .find(|s| s.name == name && s.kind == SymbolKind::Function && s.scope == GLOBAL_SCOPE)
            .map(|s| s.ty)
            .unwrap_or(BaseType::Int);

        let params = if self.param_buffer.is_empty() {
            self.table.parameter_types_of(&name)
        } else {
            self.param_buffer
                .iter()
                .map(|id| self.table.symbol(*id).ty)
                .collect()
        };

        let sig = FunctionSignature { ret, params };
        if !self.table.insert_signature(&name, sig) {
            self.record_error(Error::DuplicateFunction {
                name,
                span: token.span,
            });
        }
    }

    // ==================== Call checking ====================

    fn commit_argument(&mut self) {
        self.call.count += 1;
        self.call.arg_types.push(self.call.current);
        if self.call.current == BaseType::Unknown {
            let w = Warning::UnresolvedArgumentType {
                name: self.call.target.clone().unwrap_or_default(),
                index: self.call.count,
            };
            warn!("{}", w);
            self.warnings.push(w);
        } else {
            debug!(
                "committed argument #{} with type {}",
                self.call.count, self.call.current
            );
        }
        self.call.current = BaseType::Unknown;
    }

    fn check_call(&mut self, token: &Token) {
        let name = match self.call.target.clone() {
            Some(name) if !name.is_empty() => name,
            _ => return,
        };
        let sig = match self.table.signature(&name) {
            Some(sig) => sig.clone(),
            None => {
                self.record_error(Error::UndeclaredFunctionCall {
                    name,
                    span: token.span,
                });
                return;
            }
        };

        debug!(
            "checking call to '{}': expected={}, received={}",
            name,
            sig.params.len(),
            self.call.count
        );
        if self.call.count != sig.params.len() {
            self.record_error(Error::ArityMismatch {
                name,
                expected: sig.params.len(),
                received: self.call.count,
                span: token.span,
            });
            return;
        }
        // Every position is checked; one error per failing position.
        let received_types = self.call.arg_types.clone();
        for (i, (&expected, &received)) in sig.params.iter().zip(received_types.iter()).enumerate()
        {
            if !call_compatible(expected, received) {
                self.record_error(Error::TypeMismatch {
                    name: name.clone(),
                    index: i + 1,
                    expected,
                    received,
                    span: token.span,
                });
            }
        }
    }

    /// Report without aborting: the defect is recorded, the fatal flag set,
    /// and analysis continues so one run surfaces every independent problem.
    fn record_error(&mut self, error: Error) {
        log::error!("{}", error);
        self.errors.push(error);
        self.fatal = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::Span;
    use pretty_assertions::assert_eq;

    fn tok(kind: TokenKind, lexeme: &str, pos: usize) -> Token {
        Token::new(kind, lexeme, Span::at(pos))
    }

    /// Drive a stream of (action, token) pairs, panicking on unexpected abort
    fn run(analyzer: &mut Analyzer, stream: &[(SemanticAction, Token)]) {
        for (action, token) in stream {
            analyzer.execute(*action, token).unwrap();
        }
    }

    use SemanticAction as A;
    use TokenKind as K;

    /// `void f(int a, int b) {` up to and including the opening brace
    fn open_function(analyzer: &mut Analyzer, name: &str, pos: usize) {
        run(
            analyzer,
            &[
                (A::Observe, tok(K::KwVoid, "void", pos)),
                (A::Declare, tok(K::Ident, name, pos + 5)),
                (A::Observe, tok(K::LParen, "(", pos + 7)),
                (A::Observe, tok(K::KwInt, "int", pos + 8)),
                (A::Declare, tok(K::Ident, "a", pos + 12)),
                (A::Observe, tok(K::Comma, ",", pos + 13)),
                (A::Observe, tok(K::KwInt, "int", pos + 15)),
                (A::Declare, tok(K::Ident, "b", pos + 19)),
                (A::Observe, tok(K::RParen, ")", pos + 20)),
                (A::Observe, tok(K::LBrace, "{", pos + 22)),
            ],
        );
    }

    fn close_function(analyzer: &mut Analyzer, pos: usize) {
        run(analyzer, &[(A::Observe, tok(K::RBrace, "}", pos))]);
    }

    #[test]
    fn declares_and_registers_a_function_signature() {
        let mut a = Analyzer::new();
        open_function(&mut a, "soma", 0);
        close_function(&mut a, 100);

        let sig = a.table().signature("soma").unwrap();
        assert_eq!(sig.ret, BaseType::Void);
        assert_eq!(sig.params, vec![BaseType::Int, BaseType::Int]);
        assert!(!a.has_fatal_error());
    }

    #[test]
    fn parameters_are_born_initialized_and_scoped_to_the_function() {
        let mut a = Analyzer::new();
        open_function(&mut a, "soma", 0);
        let param = a
            .table()
            .all()
            .iter()
            .find(|s| s.name == "a")
            .unwrap()
            .clone();
        assert_eq!(param.kind, SymbolKind::Parameter);
        assert_eq!(param.scope, "soma");
        assert!(param.initialized);
    }

    #[test]
    fn duplicate_in_same_block_is_rejected() {
        let mut a = Analyzer::new();
        run(
            &mut a,
            &[
                (A::Observe, tok(K::KwInt, "int", 0)),
                (A::Declare, tok(K::Ident, "x", 4)),
            ],
        );
        let err = a
            .execute(A::Declare, &tok(K::Ident, "x", 10))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateSymbol { .. }));
    }

    #[test]
    fn sibling_blocks_in_same_function_shadowing_is_rejected() {
        let mut a = Analyzer::new();
        open_function(&mut a, "f", 0);
        run(
            &mut a,
            &[
                // first block declares x, then closes
                (A::Observe, tok(K::LBrace, "{", 30)),
                (A::Observe, tok(K::KwInt, "int", 31)),
                (A::Declare, tok(K::Ident, "x", 35)),
                (A::Observe, tok(K::Semicolon, ";", 36)),
                (A::Observe, tok(K::RBrace, "}", 40)),
                // sibling block tries to re-declare x
                (A::Observe, tok(K::LBrace, "{", 45)),
                (A::Observe, tok(K::KwInt, "int", 46)),
            ],
        );
        let err = a.execute(A::Declare, &tok(K::Ident, "x", 50)).unwrap_err();
        assert!(matches!(err, Error::Shadowing { .. }));
    }

    #[test]
    fn same_name_in_a_different_function_is_fine() {
        let mut a = Analyzer::new();
        open_function(&mut a, "f", 0);
        run(
            &mut a,
            &[
                (A::Observe, tok(K::KwInt, "int", 30)),
                (A::Declare, tok(K::Ident, "x", 34)),
                (A::Observe, tok(K::Semicolon, ";", 35)),
            ],
        );
        close_function(&mut a, 40);

        let mut ok = true;
        open_function(&mut a, "g", 50);
        ok &= a
            .execute(A::Observe, &tok(K::KwInt, "int", 80))
            .is_ok();
        ok &= a.execute(A::Declare, &tok(K::Ident, "x", 84)).is_ok();
        assert!(ok);
    }

    #[test]
    fn use_of_undeclared_symbol_aborts() {
        let mut a = Analyzer::new();
        a.table_mut().open_scope();
        let err = a.execute(A::Use, &tok(K::Ident, "ghost", 7)).unwrap_err();
        assert_eq!(
            err,
            Error::UndeclaredSymbol {
                name: "ghost".into(),
                span: Span::at(7),
            }
        );
    }

    #[test]
    fn use_before_init_warns_but_does_not_abort() {
        let mut a = Analyzer::new();
        run(
            &mut a,
            &[
                (A::Observe, tok(K::KwInt, "int", 0)),
                (A::Declare, tok(K::Ident, "x", 4)),
                (A::Observe, tok(K::Semicolon, ";", 5)),
                (A::Use, tok(K::Ident, "x", 10)),
            ],
        );
        assert!(a
            .warnings()
            .iter()
            .any(|w| matches!(w, Warning::UseBeforeInit { name, .. } if name == "x")));
        assert!(!a.has_fatal_error());
    }

    #[test]
    fn closing_a_scope_warns_once_per_unused_symbol() {
        let mut a = Analyzer::new();
        open_function(&mut a, "f", 0);
        run(
            &mut a,
            &[
                (A::Observe, tok(K::KwInt, "int", 30)),
                (A::Declare, tok(K::Ident, "dead", 34)),
                (A::Observe, tok(K::Semicolon, ";", 38)),
            ],
        );
        close_function(&mut a, 40);

        let unused: Vec<_> = a
            .warnings()
            .iter()
            .filter(|w| matches!(w, Warning::UnusedSymbol { name, .. } if name == "dead"))
            .collect();
        assert_eq!(unused.len(), 1);
    }

    #[test]
    fn declaration_initializer_list_does_not_open_a_scope() {
        let mut a = Analyzer::new();
        a.table_mut().open_scope();
        run(
            &mut a,
            &[
                (A::Observe, tok(K::KwInt, "int", 0)),
                (A::Declare, tok(K::Ident, "d", 4)),
                (A::MarkArray, tok(K::LBracket, "[", 5)),
                (A::Observe, tok(K::IntLit, "3", 6)),
                (A::Observe, tok(K::RBracket, "]", 7)),
                (A::Observe, tok(K::Assign, "=", 9)),
                (A::Observe, tok(K::LBrace, "{", 11)),
                (A::Observe, tok(K::IntLit, "1", 12)),
                (A::Observe, tok(K::Comma, ",", 13)),
                (A::Observe, tok(K::IntLit, "2", 14)),
                (A::Observe, tok(K::RBrace, "}", 15)),
                (A::Observe, tok(K::Semicolon, ";", 16)),
            ],
        );
        let d = a.table().all().iter().find(|s| s.name == "d").unwrap();
        assert_eq!(d.kind, SymbolKind::Array);
        assert!(d.initialized);
        // only the scope we opened by hand is live
        assert_eq!(a.table().scope_depth(), 1);
    }

    /// `f(<literal args>)` as an action stream against a registered signature
    fn call_with_int_literals(a: &mut Analyzer, name: &str, args: &[&str], pos: usize) {
        a.execute(A::CallTarget, &tok(K::Ident, name, pos)).unwrap();
        a.execute(A::BeginCallArgs, &tok(K::LParen, "(", pos + 1))
            .unwrap();
        for (i, lit) in args.iter().enumerate() {
            a.execute(A::Observe, &tok(K::IntLit, lit, pos + 2 + i))
                .unwrap();
            a.execute(A::CommitCallArg, &tok(K::Comma, ",", pos + 3 + i))
                .unwrap();
        }
        a.execute(A::EndCall, &tok(K::RParen, ")", pos + 9)).unwrap();
    }

    #[test]
    fn arity_mismatch_is_recorded_and_sets_fatal() {
        let mut a = Analyzer::new();
        open_function(&mut a, "soma", 0);
        close_function(&mut a, 40);
        call_with_int_literals(&mut a, "soma", &["1"], 50);

        assert!(a.has_fatal_error());
        assert_eq!(
            a.errors()[0],
            Error::ArityMismatch {
                name: "soma".into(),
                expected: 2,
                received: 1,
                span: Span::at(59),
            }
        );
    }

    #[test]
    fn every_argument_position_is_type_checked() {
        let mut a = Analyzer::new();
        open_function(&mut a, "soma", 0);
        close_function(&mut a, 40);

        // soma("x", "y"): both positions fail, both reported
        a.execute(A::CallTarget, &tok(K::Ident, "soma", 50)).unwrap();
        a.execute(A::BeginCallArgs, &tok(K::LParen, "(", 54)).unwrap();
        a.execute(A::Observe, &tok(K::StrLit, "\"x\"", 55)).unwrap();
        a.execute(A::CommitCallArg, &tok(K::Comma, ",", 58)).unwrap();
        a.execute(A::Observe, &tok(K::StrLit, "\"y\"", 59)).unwrap();
        a.execute(A::EndCall, &tok(K::RParen, ")", 62)).unwrap();

        let mismatches: Vec<_> = a
            .errors()
            .iter()
            .filter_map(|e| match e {
                Error::TypeMismatch { index, expected, received, .. } => {
                    Some((*index, *expected, *received))
                }
                _ => None,
            })
            .collect();
        assert_eq!(
            mismatches,
            vec![
                (1, BaseType::Int, BaseType::String),
                (2, BaseType::Int, BaseType::String),
            ]
        );
    }

    #[test]
    fn exact_argument_types_pass_the_strict_check() {
        let mut a = Analyzer::new();
        open_function(&mut a, "soma", 0);
        close_function(&mut a, 40);
        call_with_int_literals(&mut a, "soma", &["1", "2"], 50);
        assert!(!a.has_fatal_error(), "errors: {:?}", a.errors());
    }

    #[test]
    fn empty_argument_list_commits_nothing() {
        let mut a = Analyzer::new();
        // void nop() { }
        run(
            &mut a,
            &[
                (A::Observe, tok(K::KwVoid, "void", 0)),
                (A::Declare, tok(K::Ident, "nop", 5)),
                (A::Observe, tok(K::LParen, "(", 8)),
                (A::Observe, tok(K::RParen, ")", 9)),
                (A::Observe, tok(K::LBrace, "{", 11)),
                (A::Observe, tok(K::RBrace, "}", 12)),
            ],
        );
        a.execute(A::CallTarget, &tok(K::Ident, "nop", 20)).unwrap();
        a.execute(A::BeginCallArgs, &tok(K::LParen, "(", 23)).unwrap();
        a.execute(A::EndCall, &tok(K::RParen, ")", 24)).unwrap();
        assert!(!a.has_fatal_error(), "errors: {:?}", a.errors());
    }

    #[test]
    fn call_to_unregistered_function_is_recorded() {
        let mut a = Analyzer::new();
        run(
            &mut a,
            &[
                (A::Observe, tok(K::KwInt, "int", 0)),
                (A::Declare, tok(K::Ident, "x", 4)),
                (A::Observe, tok(K::Semicolon, ";", 5)),
            ],
        );
        a.execute(A::CallTarget, &tok(K::Ident, "x", 10)).unwrap();
        a.execute(A::BeginCallArgs, &tok(K::LParen, "(", 11)).unwrap();
        a.execute(A::EndCall, &tok(K::RParen, ")", 12)).unwrap();
        assert!(matches!(
            a.errors()[0],
            Error::UndeclaredFunctionCall { .. }
        ));
    }

    #[test]
    fn redefining_a_function_name_is_rejected_at_declaration() {
        let mut a = Analyzer::new();
        open_function(&mut a, "f", 0);
        close_function(&mut a, 40);
        a.execute(A::Observe, &tok(K::KwVoid, "void", 50)).unwrap();
        let err = a.execute(A::Declare, &tok(K::Ident, "f", 55)).unwrap_err();
        assert!(matches!(err, Error::DuplicateSymbol { .. }));
    }

    #[test]
    fn unresolved_argument_type_warns_at_commit() {
        let mut a = Analyzer::new();
        open_function(&mut a, "soma", 0);
        close_function(&mut a, 40);

        a.execute(A::CallTarget, &tok(K::Ident, "soma", 50)).unwrap();
        a.execute(A::BeginCallArgs, &tok(K::LParen, "(", 54)).unwrap();
        // nothing observed for the first argument
        a.execute(A::CommitCallArg, &tok(K::Comma, ",", 55)).unwrap();
        a.execute(A::Observe, &tok(K::IntLit, "2", 56)).unwrap();
        a.execute(A::EndCall, &tok(K::RParen, ")", 57)).unwrap();

        assert!(a
            .warnings()
            .iter()
            .any(|w| matches!(w, Warning::UnresolvedArgumentType { index: 1, .. })));
        // both arguments still counted, so arity is satisfied
        assert!(a
            .errors()
            .iter()
            .all(|e| !matches!(e, Error::ArityMismatch { .. })));
    }
}
