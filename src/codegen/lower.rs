//! Lowering from the statement tree to BIP instructions
//!
//! The accumulator is the only working register, so expression chains fold
//! left to right through it, parking values in the scratch cell whenever an
//! operand has to pass through the accumulator itself (array elements, and
//! literals under MUL/DIV, which have no immediate form).
//!
//! The machine has no stack frames: every function parameter is a mangled
//! global cell (`<function>_<parameter>`), assigned by the caller before
//! CALL. `main` is never called; its body sits last under the MAIN label and
//! falls through to the final halt.

use crate::ast::{BinOp, Call, Cond, Expr, Index, Operand, Program, RelOp, Rvalue, Stmt, Target};
use crate::codegen::emitter::{
    sanitize_label, DataSection, Emitter, Opcode, FUNC_PREFIX, INDEX_REG, IN_PORT, MAIN_LABEL,
    OUT_PORT, SCRATCH, SCRATCH2,
};
use log::debug;
use std::collections::{HashMap, HashSet};

/// Cell name for a parameter of a function, as seen by caller and body alike
pub fn param_cell(function: &str, parameter: &str) -> String {
    sanitize_label(&format!("{}_{}", function, parameter))
}

fn direct_opcode(op: BinOp) -> Opcode {
    match op {
        BinOp::Add => Opcode::Add,
        BinOp::Sub => Opcode::Sub,
        BinOp::Mul => Opcode::Mul,
        BinOp::Div => Opcode::Div,
        BinOp::And => Opcode::And,
        BinOp::Or => Opcode::Or,
        BinOp::Xor => Opcode::Xor,
    }
}

/// Immediate form, for the operations that have one
fn immediate_opcode(op: BinOp) -> Option<Opcode> {
    match op {
        BinOp::Add => Some(Opcode::Addi),
        BinOp::Sub => Some(Opcode::Subi),
        BinOp::And => Some(Opcode::Andi),
        BinOp::Or => Some(Opcode::Ori),
        BinOp::Xor => Some(Opcode::Xori),
        BinOp::Mul | BinOp::Div => None,
    }
}

/// Branch taken when the comparison is false: left minus right is in the
/// accumulator, so each relation maps to its complement.
fn complement_branch(op: RelOp) -> Opcode {
    match op {
        RelOp::Gt => Opcode::Ble,
        RelOp::Lt => Opcode::Bge,
        RelOp::Ge => Opcode::Blt,
        RelOp::Le => Opcode::Bgt,
        RelOp::Eq => Opcode::Bne,
        RelOp::Ne => Opcode::Beq,
    }
}

/// Operand that cannot be addressed directly by this operation and has to be
/// brought into the accumulator first
fn passes_through_acc(op: BinOp, operand: &Operand) -> bool {
    match operand {
        Operand::Elem { .. } => true,
        Operand::Lit(_) => immediate_opcode(op).is_none(),
        Operand::Var(_) => false,
    }
}

fn is_reloadable(operand: &Operand) -> bool {
    matches!(operand, Operand::Lit(_) | Operand::Var(_))
}

#[derive(Debug, Default)]
pub struct Lowering {
    em: Emitter,
    data: DataSection,
    fn_params: HashMap<String, Vec<String>>,
    current_fn: Option<String>,
    has_return: bool,
}

impl Lowering {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lower a whole program: one JMP MAIN up front, functions in source
    /// order, main's body last under the MAIN label. A duplicate function
    /// definition is skipped; the first one wins.
    pub fn run(mut self, program: &Program) -> (Emitter, DataSection) {
        for item in &program.items {
            if let Stmt::Function { name, params, .. } = item {
                self.fn_params
                    .entry(name.clone())
                    .or_insert_with(|| params.clone());
            }
        }

        self.em.emit(Opcode::Jmp, MAIN_LABEL);
        let mut emitted: HashSet<String> = HashSet::new();
        let mut main_body: Option<&[Stmt]> = None;

        for item in &program.items {
            match item {
                Stmt::Function { name, body, .. } => {
                    if !emitted.insert(name.clone()) {
                        debug!("skipping duplicate definition of '{}'", name);
                        continue;
                    }
                    if name == "main" {
                        main_body = Some(body);
                        continue;
                    }
                    self.current_fn = Some(name.clone());
                    self.has_return = false;
                    self.em.label(format!("{}{}", FUNC_PREFIX, sanitize_label(name)));
                    self.lower_body(body);
                    if !self.has_return {
                        self.em.emit(Opcode::Return, "0");
                    }
                    self.current_fn = None;
                }
                other => self.lower_stmt(other),
            }
        }

        self.em.label(MAIN_LABEL);
        if let Some(body) = main_body {
            self.current_fn = Some("main".to_string());
            self.lower_body(body);
            self.current_fn = None;
        }

        (self.em, self.data)
    }

    fn lower_body(&mut self, body: &[Stmt]) {
        for stmt in body {
            self.lower_stmt(stmt);
        }
    }

    fn lower_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Decl {
                name,
                array_len,
                init,
            } => {
                if let Some(len) = array_len {
                    self.data.record_size(name, *len);
                }
                self.data.record_values(name, init.clone());
            }
            Stmt::Assign { target, value } => {
                // simple source into an indexed slot: set the index first and
                // skip the scratch round trip
                if let (Target::Elem { array, index }, Rvalue::Expr(expr)) = (target, value) {
                    if expr.rest.is_empty()
                        && is_reloadable(&expr.first)
                        && !matches!(index, Index::Expr(_))
                    {
                        let array = self.mangle(array);
                        self.set_index(index);
                        self.load_operand(&expr.first);
                        self.em.emit(Opcode::Stov, array);
                        return;
                    }
                }
                match value {
                    Rvalue::Expr(expr) => self.fold_expr(expr),
                    Rvalue::Call(call) => self.lower_call(call),
                }
                self.store_target(target);
            }
            Stmt::If {
                cond,
                then_body,
                else_body,
            } => {
                let (else_label, end_label) = self.em.next_if_labels();
                if else_body.is_empty() {
                    self.jump_if_false(cond, &end_label);
                    self.lower_body(then_body);
                    self.em.label(end_label);
                } else {
                    self.jump_if_false(cond, &else_label);
                    self.lower_body(then_body);
                    self.em.emit(Opcode::Jmp, end_label.clone());
                    self.em.label(else_label);
                    self.lower_body(else_body);
                    self.em.label(end_label);
                }
            }
            Stmt::While { cond, body } => {
                let (start, end) = self.em.next_while_labels();
                self.em.label(start.clone());
                self.jump_if_false(cond, &end);
                self.lower_body(body);
                self.em.emit(Opcode::Jmp, start);
                self.em.label(end);
            }
            Stmt::DoWhile { body, cond } => {
                let (start, end) = self.em.next_do_labels();
                self.em.label(start.clone());
                self.lower_body(body);
                self.jump_if_false(cond, &end);
                self.em.emit(Opcode::Jmp, start);
                self.em.label(end);
            }
            Stmt::For {
                init,
                cond,
                step,
                body,
            } => {
                if let Some(init) = init {
                    self.lower_stmt(init);
                }
                let (start, end) = self.em.next_for_labels();
                self.em.label(start.clone());
                if let Some(cond) = cond {
                    self.jump_if_false(cond, &end);
                }
                self.lower_body(body);
                if let Some(step) = step {
                    self.lower_stmt(step);
                }
                self.em.emit(Opcode::Jmp, start);
                self.em.label(end);
            }
            Stmt::Call(call) => self.lower_call(call),
            Stmt::Return(value) => self.lower_return(value.as_ref()),
            Stmt::Read(target) => {
                self.em.emit(Opcode::Ld, IN_PORT);
                self.store_target(target);
            }
            Stmt::Write(operand) => {
                self.load_operand(operand);
                self.em.emit(Opcode::Sto, OUT_PORT);
            }
            // functions only exist at the top level
            Stmt::Function { .. } => {}
        }
    }

    // ==================== Calls and returns ====================

    /// Bind each argument to the callee's parameter cell, then CALL. Extra
    /// arguments beyond the parameter list are dropped. A call to main is
    /// never emitted.
    fn lower_call(&mut self, call: &Call) {
        if call.name == "main" {
            return;
        }
        let params = self.fn_params.get(&call.name).cloned().unwrap_or_default();
        let bound = params.len().min(call.args.len());
        for i in 0..bound {
            self.load_operand(&call.args[i]);
            let cell = param_cell(&call.name, &params[i]);
            self.em.emit(Opcode::Sto, cell);
        }
        let label = format!("{}{}", FUNC_PREFIX, sanitize_label(&call.name));
        self.em.emit(Opcode::Call, label);
    }

    fn lower_return(&mut self, value: Option<&Operand>) {
        self.has_return = true;
        if let Some(value) = value {
            self.load_operand(value);
        }
        if self.current_fn.as_deref() == Some("main") {
            self.em.emit(Opcode::Hlt, "0");
        } else if value.is_some() {
            self.em.emit(Opcode::Return, "0");
        } else {
            self.em.emit0(Opcode::Ret);
        }
    }

    // ==================== Conditions ====================

    /// Branch to `target` when the condition is false. Relations park the
    /// right side, subtract it from the left and take the complementary
    /// branch; bare values are tested for zero.
    fn jump_if_false(&mut self, cond: &Cond, target: &str) {
        match cond {
            Cond::Rel { lhs, op, rhs } => {
                // a computed left subscript folds through the primary
                // scratch, so the parked right side retreats to the second
                let park = match lhs {
                    Operand::Elem {
                        index: Index::Expr(_),
                        ..
                    } => {
                        self.data.mark_scratch2_used();
                        SCRATCH2
                    }
                    _ => SCRATCH,
                };
                self.load_operand(rhs);
                self.em.emit(Opcode::Sto, park);
                self.load_operand(lhs);
                self.em.emit(Opcode::Sub, park);
                self.em.emit(complement_branch(*op), target);
            }
            Cond::Value(expr) => {
                self.fold_expr(expr);
                self.em.emit(Opcode::Jz, target);
            }
        }
    }

    // ==================== Expressions ====================

    /// Fold the chain into the accumulator. The opening pair uses the binary
    /// shapes: when the left side is reloadable and the operand has to pass
    /// through the accumulator, the operand comes in first, swapped outright
    /// for commutative operations and parked in the scratch cell otherwise.
    /// From the third operand on, the running value is carried in the scratch
    /// cell, each step combining into it.
    fn fold_expr(&mut self, expr: &Expr) {
        let mut remaining: &[(BinOp, Operand)] = &expr.rest;
        match remaining.first() {
            Some((op, operand))
                if is_reloadable(&expr.first) && passes_through_acc(*op, operand) =>
            {
                self.load_operand(operand);
                if op.is_commutative() {
                    self.fold_step(*op, &expr.first);
                } else {
                    self.em.emit(Opcode::Sto, SCRATCH);
                    self.load_operand(&expr.first);
                    self.em.emit(direct_opcode(*op), SCRATCH);
                }
                remaining = &remaining[1..];
            }
            _ => {
                self.load_operand(&expr.first);
                if let Some((op, operand)) = remaining.first() {
                    self.fold_step(*op, operand);
                    remaining = &remaining[1..];
                }
            }
        }
        if remaining.is_empty() {
            return;
        }
        self.em.emit(Opcode::Sto, SCRATCH);
        for (op, operand) in remaining {
            self.scratch_step(*op, operand);
        }
    }

    /// One fold step: accumulator holds the running value on entry and on
    /// exit.
    fn fold_step(&mut self, op: BinOp, operand: &Operand) {
        match operand {
            Operand::Var(name) => {
                let cell = self.mangle(name);
                self.em.emit(direct_opcode(op), cell);
            }
            Operand::Lit(k) => {
                if let Some(imm) = immediate_opcode(op) {
                    self.em.emit(imm, k.to_string());
                } else if op == BinOp::Mul {
                    self.em.emit(Opcode::Sto, SCRATCH);
                    self.em.emit(Opcode::Ldi, k.to_string());
                    self.em.emit(Opcode::Mul, SCRATCH);
                } else {
                    // division by a literal mid-chain stages the literal in
                    // the second scratch to keep the operand order
                    self.em.emit(Opcode::Sto, SCRATCH);
                    self.em.emit(Opcode::Ldi, k.to_string());
                    self.em.emit(Opcode::Sto, SCRATCH2);
                    self.data.mark_scratch2_used();
                    self.em.emit(Opcode::Ld, SCRATCH);
                    self.em.emit(Opcode::Div, SCRATCH2);
                }
            }
            Operand::Elem { array, index } => {
                let array = self.mangle(array);
                if matches!(index, Index::Expr(_)) {
                    // the index fold owns the primary scratch, so the
                    // running value moves to the second one
                    self.em.emit(Opcode::Sto, SCRATCH2);
                    self.data.mark_scratch2_used();
                    self.set_index(index);
                    self.em.emit(Opcode::Ldv, array);
                    if op.is_commutative() {
                        self.em.emit(direct_opcode(op), SCRATCH2);
                    } else {
                        self.em.emit(Opcode::Sto, SCRATCH);
                        self.em.emit(Opcode::Ld, SCRATCH2);
                        self.em.emit(direct_opcode(op), SCRATCH);
                    }
                } else {
                    self.em.emit(Opcode::Sto, SCRATCH);
                    self.set_index(index);
                    self.em.emit(Opcode::Ldv, array);
                    if op.is_commutative() {
                        self.em.emit(direct_opcode(op), SCRATCH);
                    } else {
                        self.em.emit(Opcode::Sto, SCRATCH2);
                        self.data.mark_scratch2_used();
                        self.em.emit(Opcode::Ld, SCRATCH);
                        self.em.emit(direct_opcode(op), SCRATCH2);
                    }
                }
            }
        }
    }

    /// One n-ary step. On entry and exit the running value sits in both the
    /// accumulator and the scratch cell.
    fn scratch_step(&mut self, op: BinOp, operand: &Operand) {
        match operand {
            Operand::Var(name) => {
                let cell = self.mangle(name);
                self.em.emit(direct_opcode(op), cell);
            }
            Operand::Lit(k) => {
                if let Some(imm) = immediate_opcode(op) {
                    self.em.emit(imm, k.to_string());
                } else if op == BinOp::Mul {
                    self.em.emit(Opcode::Ldi, k.to_string());
                    self.em.emit(Opcode::Mul, SCRATCH);
                } else {
                    self.em.emit(Opcode::Ldi, k.to_string());
                    self.em.emit(Opcode::Sto, SCRATCH2);
                    self.data.mark_scratch2_used();
                    self.em.emit(Opcode::Ld, SCRATCH);
                    self.em.emit(Opcode::Div, SCRATCH2);
                }
            }
            Operand::Elem { array, index } => {
                let array = self.mangle(array);
                if matches!(index, Index::Expr(_)) {
                    // a computed subscript may fold through the scratch cell
                    // itself, so the running value retreats to the second one
                    self.em.emit(Opcode::Sto, SCRATCH2);
                    self.data.mark_scratch2_used();
                    self.set_index(index);
                    self.em.emit(Opcode::Ldv, array);
                    if op.is_commutative() {
                        self.em.emit(direct_opcode(op), SCRATCH2);
                    } else {
                        self.em.emit(Opcode::Sto, SCRATCH);
                        self.em.emit(Opcode::Ld, SCRATCH2);
                        self.em.emit(direct_opcode(op), SCRATCH);
                    }
                } else {
                    self.set_index(index);
                    self.em.emit(Opcode::Ldv, array);
                    if op.is_commutative() {
                        self.em.emit(direct_opcode(op), SCRATCH);
                    } else {
                        self.em.emit(Opcode::Sto, SCRATCH2);
                        self.data.mark_scratch2_used();
                        self.em.emit(Opcode::Ld, SCRATCH);
                        self.em.emit(direct_opcode(op), SCRATCH2);
                    }
                }
            }
        }
        self.em.emit(Opcode::Sto, SCRATCH);
    }

    // ==================== Loads and stores ====================

    fn load_operand(&mut self, operand: &Operand) {
        match operand {
            Operand::Lit(k) => self.em.emit(Opcode::Ldi, k.to_string()),
            Operand::Var(name) => {
                let cell = self.mangle(name);
                self.em.emit(Opcode::Ld, cell);
            }
            Operand::Elem { array, index } => {
                let array = self.mangle(array);
                self.set_index(index);
                self.em.emit(Opcode::Ldv, array);
            }
        }
    }

    /// Evaluate the subscript and move it into the index register
    fn set_index(&mut self, index: &Index) {
        match index {
            Index::Lit(k) => self.em.emit(Opcode::Ldi, k.to_string()),
            Index::Var(name) => {
                let cell = self.mangle(name);
                self.em.emit(Opcode::Ld, cell);
            }
            Index::Expr(expr) => self.fold_expr(expr),
        }
        self.em.emit(Opcode::Sto, INDEX_REG);
    }

    /// Store the accumulator into the target. Indexed stores park the value
    /// first because setting the index register goes through the
    /// accumulator.
    fn store_target(&mut self, target: &Target) {
        match target {
            Target::Var(name) => {
                let cell = self.mangle(name);
                self.em.emit(Opcode::Sto, cell);
            }
            Target::Elem { array, index } => {
                let array = self.mangle(array);
                if matches!(index, Index::Expr(_)) {
                    self.em.emit(Opcode::Sto, SCRATCH2);
                    self.data.mark_scratch2_used();
                    self.set_index(index);
                    self.em.emit(Opcode::Ld, SCRATCH2);
                } else {
                    self.em.emit(Opcode::Sto, SCRATCH);
                    self.set_index(index);
                    self.em.emit(Opcode::Ld, SCRATCH);
                }
                self.em.emit(Opcode::Stov, array);
            }
        }
    }

    /// Parameters of the enclosing function live in mangled global cells;
    /// everything else keeps its own name.
    fn mangle(&self, name: &str) -> String {
        if let Some(function) = &self.current_fn {
            let is_param = self
                .fn_params
                .get(function)
                .map(|ps| ps.iter().any(|p| p == name))
                .unwrap_or(false);
            if is_param {
                return param_cell(function, name);
            }
        }
        sanitize_label(name)
    }
}

/// Convenience entry point
pub fn lower_program(program: &Program) -> (Emitter, DataSection) {
    Lowering::new().run(program)
}
