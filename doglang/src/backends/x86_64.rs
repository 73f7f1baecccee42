//! x86-64 code generation (AT&T syntax).
//!
//! Every expression leaves its value in `%rax`. A binary operation parks its
//! left operand in one of eight scratch registers while the right operand is
//! computed. Variables live in 8-byte slots below `%rbp`; the whole frame is
//! reserved and zeroed in the prologue, so a slot is valid no matter which
//! path first writes it.

use std::collections::HashMap;

use tracing::debug;

use super::Backend;
use crate::error::CompileError;
use crate::ir::ast::{self, BinaryOperator, Block, Expression, Statement};

const SCRATCH_REGISTERS: [&str; 8] = [
    "%rcx", "%rsi", "%rdi", "%r8", "%r9", "%r10", "%r11", "%rdx",
];

const SLOT_SIZE: i64 = 8;

pub struct CodeGenerator {
    code: Vec<String>,
    in_use: [bool; SCRATCH_REGISTERS.len()],
    slots: HashMap<String, i64>,
    // variables plus one hidden result slot per loop
    slot_count: i64,
    next_id: usize,
}

impl Backend for CodeGenerator {
    fn compile(&mut self, program: &ast::Program) -> Result<String, CompileError> {
        let mut listing = self.compile_program(program)?.join("\n");
        listing.push('\n');
        Ok(listing)
    }
}

impl Default for CodeGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeGenerator {
    pub fn new() -> Self {
        Self {
            code: Vec::new(),
            in_use: [false; SCRATCH_REGISTERS.len()],
            slots: HashMap::new(),
            slot_count: 0,
            next_id: 0,
        }
    }

    /// Whole program as assembly lines: prologue, statements, `call print`
    /// with whatever is left in `%rax`, epilogue.
    pub fn compile_program(&mut self, program: &ast::Program) -> Result<Vec<String>, CompileError> {
        *self = Self::new();

        self.compile_block(&program.body)?;
        let body = std::mem::take(&mut self.code);

        let mut lines: Vec<String> = [".text", ".global _main", ".global main", "_main:", "main:"]
            .iter()
            .map(|line| line.to_string())
            .collect();
        lines.push(instruction("pushq %rbp"));
        lines.push(instruction("movq %rsp, %rbp"));

        let frame = self.frame_size();
        if frame > 0 {
            lines.push(instruction(format!("subq ${frame}, %rsp")));
            for slot in 1..=self.slot_count {
                lines.push(instruction(format!("movq $0, {}(%rbp)", -slot * SLOT_SIZE)));
            }
        }

        lines.extend(body);
        lines.push(instruction("call print"));
        lines.push(instruction("movq %rbp, %rsp"));
        lines.push(instruction("popq %rbp"));
        lines.push(instruction("ret"));

        debug!(
            lines = lines.len(),
            slots = self.slot_count,
            labels = self.next_id,
            "generated assembly"
        );
        Ok(lines)
    }

    /// Frame offset of a variable, if it has been given one.
    pub fn slot_of(&self, name: &str) -> Option<i64> {
        self.slots.get(name).copied()
    }

    /// Slot bytes rounded up so `%rsp` stays 16-byte aligned at `call print`.
    fn frame_size(&self) -> i64 {
        let bytes = self.slot_count * SLOT_SIZE;
        (bytes + 15) / 16 * 16
    }

    /// Leaves the value of the last statement in `%rax`, 0 for an empty block.
    fn compile_block(&mut self, block: &Block) -> Result<(), CompileError> {
        if block.is_empty() {
            self.emit("movq $0, %rax");
        }
        for statement in &block.statements {
            self.compile_statement(statement)?;
        }
        Ok(())
    }

    fn compile_statement(&mut self, statement: &Statement) -> Result<(), CompileError> {
        let id = self.next_id();

        match statement {
            Statement::Assign { target, value } => {
                self.compile_expression(value)?;
                let offset = self.slot(&target.name);
                self.emit(format!("movq %rax, {offset}(%rbp)"));
            }
            Statement::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.compile_expression(condition)?;
                self.emit("cmpq $0, %rax");
                self.emit(format!("je .Lelse{id}"));
                self.compile_block(then_branch)?;
                self.emit(format!("jmp .Lendif{id}"));
                self.label(format!(".Lelse{id}"));
                self.compile_block(else_branch)?;
                self.label(format!(".Lendif{id}"));
            }
            Statement::While { condition, body } => {
                // значение последнего прохода тела, 0 если тело не выполнялось
                let result = self.hidden_slot();
                self.emit(format!("movq $0, {result}(%rbp)"));
                self.label(format!(".Lwhile{id}"));
                self.compile_expression(condition)?;
                self.emit("cmpq $0, %rax");
                self.emit(format!("je .Lendwhile{id}"));
                self.compile_block(body)?;
                self.emit(format!("movq %rax, {result}(%rbp)"));
                self.emit(format!("jmp .Lwhile{id}"));
                self.label(format!(".Lendwhile{id}"));
                self.emit(format!("movq {result}(%rbp), %rax"));
            }
            Statement::Identifier(identifier) => {
                let offset = self.slot(&identifier.name);
                self.emit(format!("movq {offset}(%rbp), %rax"));
            }
        }
        Ok(())
    }

    fn compile_expression(&mut self, expression: &Expression) -> Result<(), CompileError> {
        let id = self.next_id();

        match expression {
            Expression::Integer(value) => {
                if i32::try_from(*value).is_ok() {
                    self.emit(format!("movq ${value}, %rax"));
                } else {
                    self.emit(format!("movabsq ${value}, %rax"));
                }
            }
            Expression::Identifier(identifier) => {
                let offset = self.slot(&identifier.name);
                self.emit(format!("movq {offset}(%rbp), %rax"));
            }
            Expression::BinaryOp { left, op, right } => {
                self.compile_expression(left)?;
                let index = self.acquire_register()?;
                let reg = SCRATCH_REGISTERS[index];
                self.emit(format!("movq %rax, {reg}"));
                self.compile_expression(right)?;

                // %rax = правый операнд, reg = левый
                match op {
                    BinaryOperator::Plus => self.emit(format!("addq {reg}, %rax")),
                    BinaryOperator::Times => self.emit(format!("imulq {reg}, %rax")),
                    BinaryOperator::Minus => {
                        self.emit(format!("subq %rax, {reg}"));
                        self.emit(format!("movq {reg}, %rax"));
                    }
                    BinaryOperator::LessThan => self.compile_comparison(reg, "jl", &format!(".Llt{id}")),
                    BinaryOperator::GreaterThan => self.compile_comparison(reg, "jg", &format!(".Lgt{id}")),
                }

                self.release_register(index);
            }
        }
        Ok(())
    }

    /// Leaves 1 in `%rax` when `reg <cond> %rax` holds, 0 otherwise.
    fn compile_comparison(&mut self, reg: &str, jump: &str, label: &str) {
        self.emit(format!("cmpq %rax, {reg}"));
        self.emit("movq $1, %rax");
        self.emit(format!("{jump} {label}"));
        self.emit("movq $0, %rax");
        self.label(label);
    }

    fn acquire_register(&mut self) -> Result<usize, CompileError> {
        let index = self
            .in_use
            .iter()
            .position(|used| !used)
            .ok_or(CompileError::RegistersExhausted {
                pool: SCRATCH_REGISTERS.len(),
            })?;
        self.in_use[index] = true;
        Ok(index)
    }

    fn release_register(&mut self, index: usize) {
        self.in_use[index] = false;
    }

    /// A variable gets its slot the first time it shows up and keeps it.
    fn slot(&mut self, name: &str) -> i64 {
        if let Some(offset) = self.slots.get(name) {
            return *offset;
        }
        let offset = self.hidden_slot();
        debug!(variable = name, offset, "allocated frame slot");
        self.slots.insert(name.to_string(), offset);
        offset
    }

    /// A fresh frame slot that no variable name refers to.
    fn hidden_slot(&mut self) -> i64 {
        self.slot_count += 1;
        -self.slot_count * SLOT_SIZE
    }

    fn next_id(&mut self) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn emit(&mut self, text: impl Into<String>) {
        self.code.push(instruction(text));
    }

    fn label(&mut self, name: impl AsRef<str>) {
        self.code.push(format!("{}:", name.as_ref()));
    }
}

fn instruction(text: impl Into<String>) -> String {
    format!("    {}", text.into())
}
