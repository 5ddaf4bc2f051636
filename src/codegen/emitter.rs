//! BIP assembly vocabulary and section rendering
//!
//! The machine model is a single accumulator plus the memory-mapped special
//! cells: `$indr` (index register for the LDV/STOV indexed forms), the I/O
//! ports, and the reserved scratch cells. Everything else is a named global
//! data cell.

use crate::sema::symbols::{Symbol, SymbolKind};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Reserved scratch cell, always last in the data section
pub const SCRATCH: &str = "__TMP0";
/// Secondary scratch, emitted only when the lowering actually needed it
pub const SCRATCH2: &str = "__TMP1";
/// Index register backing LDV/STOV
pub const INDEX_REG: &str = "$indr";
pub const IN_PORT: &str = "$in_port";
pub const OUT_PORT: &str = "$out_port";
pub const FUNC_PREFIX: &str = "FUNC_";
pub const MAIN_LABEL: &str = "MAIN";
pub const ENTRY_LABEL: &str = "_PRINCIPAL";

// ==================== Instructions ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Ld,
    Ldi,
    Sto,
    Ldv,
    Stov,
    Add,
    Addi,
    Sub,
    Subi,
    Mul,
    Div,
    And,
    Andi,
    Or,
    Ori,
    Xor,
    Xori,
    Not,
    Shl,
    Shr,
    Jmp,
    Jz,
    Ble,
    Bge,
    Blt,
    Bgt,
    Bne,
    Beq,
    Call,
    Return,
    Ret,
    Hlt,
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Opcode::Ld => "LD",
            Opcode::Ldi => "LDI",
            Opcode::Sto => "STO",
            Opcode::Ldv => "LDV",
            Opcode::Stov => "STOV",
            Opcode::Add => "ADD",
            Opcode::Addi => "ADDI",
            Opcode::Sub => "SUB",
            Opcode::Subi => "SUBI",
            Opcode::Mul => "MUL",
            Opcode::Div => "DIV",
            Opcode::And => "AND",
            Opcode::Andi => "ANDI",
            Opcode::Or => "OR",
            Opcode::Ori => "ORI",
            Opcode::Xor => "XOR",
            Opcode::Xori => "XORI",
            Opcode::Not => "NOT",
            Opcode::Shl => "SHL",
            Opcode::Shr => "SHR",
            Opcode::Jmp => "JMP",
            Opcode::Jz => "JZ",
            Opcode::Ble => "BLE",
            Opcode::Bge => "BGE",
            Opcode::Blt => "BLT",
            Opcode::Bgt => "BGT",
            Opcode::Bne => "BNE",
            Opcode::Beq => "BEQ",
            Opcode::Call => "CALL",
            Opcode::Return => "RETURN",
            Opcode::Ret => "RET",
            Opcode::Hlt => "HLT",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Instr {
    Label(String),
    Op {
        opcode: Opcode,
        operand: Option<String>,
    },
}

// ==================== Emission ====================

/// Instruction buffer plus the per-family label counters. Each control-flow
/// family numbers its labels independently.
#[derive(Debug, Default)]
pub struct Emitter {
    instrs: Vec<Instr>,
    if_count: usize,
    while_count: usize,
    do_count: usize,
    for_count: usize,
}

impl Emitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, opcode: Opcode, operand: impl Into<String>) {
        self.instrs.push(Instr::Op {
            opcode,
            operand: Some(operand.into()),
        });
    }

    pub fn emit0(&mut self, opcode: Opcode) {
        self.instrs.push(Instr::Op {
            opcode,
            operand: None,
        });
    }

    pub fn label(&mut self, name: impl Into<String>) {
        self.instrs.push(Instr::Label(name.into()));
    }

    pub fn instrs(&self) -> &[Instr] {
        &self.instrs
    }

    /// (`_ELSE_IF_n`, `_END_IF_n`)
    pub fn next_if_labels(&mut self) -> (String, String) {
        let n = self.if_count;
        self.if_count += 1;
        (format!("_ELSE_IF_{}", n), format!("_END_IF_{}", n))
    }

    /// (`WHILEn`, `ENDWHILEn`)
    pub fn next_while_labels(&mut self) -> (String, String) {
        let n = self.while_count;
        self.while_count += 1;
        (format!("WHILE{}", n), format!("ENDWHILE{}", n))
    }

    /// (`DOn`, `ENDDOn`)
    pub fn next_do_labels(&mut self) -> (String, String) {
        let n = self.do_count;
        self.do_count += 1;
        (format!("DO{}", n), format!("ENDDO{}", n))
    }

    /// (`FORn`, `ENDFORn`)
    pub fn next_for_labels(&mut self) -> (String, String) {
        let n = self.for_count;
        self.for_count += 1;
        (format!("FOR{}", n), format!("ENDFOR{}", n))
    }
}

// ==================== Label sanitizing ====================

/// Assembly labels admit alphanumerics, `_` and `$`; every other byte is
/// replaced, and an empty name becomes "sym".
pub fn sanitize_label(name: &str) -> String {
    if name.is_empty() {
        return "sym".to_string();
    }
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '$' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

// ==================== Rendering options ====================

#[derive(Debug, Clone)]
pub struct EmitterOptions {
    pub data_header: bool,
    pub text_header: bool,
    pub entry_label: String,
    pub sort_data: bool,
}

impl Default for EmitterOptions {
    fn default() -> Self {
        Self {
            data_header: true,
            text_header: true,
            entry_label: ENTRY_LABEL.to_string(),
            sort_data: false,
        }
    }
}

// ==================== Data section ====================

/// Initializer values and declared sizes collected during lowering, rendered
/// against the symbol table into the `.data` section.
#[derive(Debug, Default)]
pub struct DataSection {
    values: HashMap<String, Vec<i64>>,
    sizes: HashMap<String, usize>,
    uses_scratch2: bool,
}

impl DataSection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_values(&mut self, name: &str, values: Vec<i64>) {
        if !values.is_empty() {
            self.values.insert(name.to_string(), values);
        }
    }

    pub fn record_size(&mut self, name: &str, len: usize) {
        self.sizes.insert(name.to_string(), len);
    }

    pub fn mark_scratch2_used(&mut self) {
        self.uses_scratch2 = true;
    }

    fn is_candidate(symbol: &Symbol) -> bool {
        matches!(symbol.kind, SymbolKind::Variable | SymbolKind::Array)
    }

    /// One `label : v[, v...]` line per variable and array symbol, labels
    /// deduplicated with a numeric suffix, arrays zero-filled to length,
    /// scratch cells last.
    pub fn render(&self, symbols: &[Symbol], options: &EmitterOptions) -> String {
        let mut taken: HashSet<String> = HashSet::new();
        let mut lines: Vec<String> = Vec::new();

        for symbol in symbols.iter().filter(|s| Self::is_candidate(s)) {
            let mut label = sanitize_label(&symbol.name);
            if taken.contains(&label) {
                let mut k = 1;
                while taken.contains(&format!("{}_{}", label, k)) {
                    k += 1;
                }
                label = format!("{}_{}", label, k);
            }
            taken.insert(label.clone());

            let values = self.values.get(&symbol.name);
            let line = if symbol.kind == SymbolKind::Array {
                let len = self
                    .sizes
                    .get(&symbol.name)
                    .copied()
                    .or(symbol.array_len)
                    .or_else(|| values.map(Vec::len))
                    .filter(|&n| n > 0)
                    .unwrap_or(1);
                let mut cells = values.cloned().unwrap_or_default();
                cells.resize(len, 0);
                let rendered: Vec<String> = cells.iter().map(i64::to_string).collect();
                format!("{} : {}", label, rendered.join(", "))
            } else {
                let v = values.and_then(|vs| vs.first().copied()).unwrap_or(0);
                format!("{} : {}", label, v)
            };
            lines.push(line);
        }

        if options.sort_data {
            lines.sort();
        }

        let mut out = String::new();
        if options.data_header {
            out.push_str(".data\n");
        }
        for line in lines {
            out.push_str(&line);
            out.push('\n');
        }
        if self.uses_scratch2 {
            out.push_str(SCRATCH2);
            out.push_str(" : 0\n");
        }
        out.push_str(SCRATCH);
        out.push_str(" : 0\n");
        out
    }
}

// ==================== Text section ====================

/// Entry label first, labels flush left, instructions indented four spaces,
/// a final `HLT 0` closing the program.
pub fn render_text(instrs: &[Instr], options: &EmitterOptions) -> String {
    let mut out = String::new();
    if options.text_header {
        out.push_str(".text\n");
    }
    out.push_str(&options.entry_label);
    out.push_str(":\n");
    for instr in instrs {
        match instr {
            Instr::Label(name) => {
                out.push_str(name);
                out.push_str(":\n");
            }
            Instr::Op { opcode, operand } => {
                out.push_str("    ");
                out.push_str(&opcode.to_string());
                if let Some(operand) = operand {
                    out.push(' ');
                    out.push_str(operand);
                }
                out.push('\n');
            }
        }
    }
    out.push_str("    HLT 0\n");
    out
}
