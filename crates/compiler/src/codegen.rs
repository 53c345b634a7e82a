//! Assembly generation
//!
//! Three phases over each function, mirroring the IR-to-machine pipeline:
//!
//! 1. **Instruction selection** lowers IR instructions to x86-64 with
//!    `Pseudo` operands and implements the System V AMD64 calling
//!    convention (six integer argument registers, 8-byte right-to-left
//!    stack pushes, 16-byte call alignment, return in `AX`).
//! 2. **Pseudo replacement** assigns every pseudo register a stack slot or,
//!    for static storage, a `Data` operand, using a backend symbol table
//!    derived from the frontend one. Frame sizes round up to 16 bytes.
//! 3. **Fixup** legalizes operand combinations the hardware rejects using
//!    the reserved scratch registers `R10` (sources) and `R11`
//!    (destinations), and plants the stack-frame allocation at function
//!    entry.

use crate::asm::{
    AsmType, BinaryOperator, CondCode, Function, Instruction, Operand, Program, Reg,
    StaticVariable, TopLevel, UnaryOperator, ARG_REGISTERS,
};
use crate::error::CompileError;
use crate::ir;
use crate::symbols::{IdentifierAttribute, SymbolTable};
use crate::types::{Const, Type};
use std::collections::HashMap;

// ============================================================================
//                         BACKEND SYMBOL TABLE
// ============================================================================

/// What assembly generation needs to know about a name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendSymbol {
    Object { ty: AsmType, is_static: bool },
    Function { defined: bool },
}

/// Derived from the frontend table once per compilation, immediately before
/// assembly generation.
#[derive(Debug, Default)]
pub struct BackendSymbolTable {
    entries: HashMap<String, BackendSymbol>,
}

impl BackendSymbolTable {
    pub fn from_frontend(symbols: &SymbolTable) -> Result<Self, CompileError> {
        let mut entries = HashMap::new();
        for (name, entry) in symbols.iter() {
            let backend = match &entry.attr {
                IdentifierAttribute::Function { defined, .. } => {
                    BackendSymbol::Function { defined: *defined }
                }
                IdentifierAttribute::Static { .. } => BackendSymbol::Object {
                    ty: scalar_asm_type(&entry.ty)?,
                    is_static: true,
                },
                IdentifierAttribute::Local => BackendSymbol::Object {
                    ty: scalar_asm_type(&entry.ty)?,
                    is_static: false,
                },
            };
            entries.insert(name.clone(), backend);
        }
        Ok(BackendSymbolTable { entries })
    }

    pub fn get(&self, name: &str) -> Option<&BackendSymbol> {
        self.entries.get(name)
    }
}

fn scalar_asm_type(ty: &Type) -> Result<AsmType, CompileError> {
    match ty {
        Type::Int => Ok(AsmType::Longword),
        Type::Long => Ok(AsmType::Quadword),
        Type::Function { .. } => Err(CompileError::Codegen(
            "function type where a scalar was expected".to_string(),
        )),
    }
}

/// Run all three phases over an IR program.
pub fn generate_program(
    program: &ir::Program,
    symbols: &SymbolTable,
) -> Result<Program, CompileError> {
    let backend = BackendSymbolTable::from_frontend(symbols)?;
    let selector = InstructionSelector { symbols };
    let mut top_levels = Vec::new();
    for top_level in &program.top_levels {
        match top_level {
            ir::TopLevel::Function(function) => {
                let mut selected = selector.select_function(function)?;
                replace_pseudos(&mut selected, &backend)?;
                fixup_function(&mut selected);
                top_levels.push(TopLevel::Function(selected));
            }
            ir::TopLevel::StaticVariable(variable) => {
                top_levels.push(TopLevel::StaticVariable(StaticVariable {
                    name: variable.name.clone(),
                    global: variable.global,
                    alignment: i64::from(scalar_asm_type(&variable.ty)?.size()),
                    init: variable.init,
                }));
            }
        }
    }
    Ok(Program { top_levels })
}

// ============================================================================
//                         INSTRUCTION SELECTION
// ============================================================================

struct InstructionSelector<'a> {
    symbols: &'a SymbolTable,
}

impl InstructionSelector<'_> {
    fn operand(value: &ir::Value) -> Operand {
        match value {
            ir::Value::Constant(constant) => Operand::Imm(constant.as_i64()),
            ir::Value::Var(name) => Operand::Pseudo(name.clone()),
        }
    }

    fn value_type(&self, value: &ir::Value) -> Result<AsmType, CompileError> {
        match value {
            ir::Value::Constant(Const::Int(_)) => Ok(AsmType::Longword),
            ir::Value::Constant(Const::Long(_)) => Ok(AsmType::Quadword),
            ir::Value::Var(name) => {
                let entry = self.symbols.expect(name).map_err(CompileError::Codegen)?;
                scalar_asm_type(&entry.ty)
            }
        }
    }

    fn select_function(&self, function: &ir::Function) -> Result<Function, CompileError> {
        let entry = self
            .symbols
            .expect(&function.name)
            .map_err(CompileError::Codegen)?;
        let Type::Function {
            params: param_types,
            ..
        } = &entry.ty
        else {
            return Err(CompileError::Codegen(format!(
                "'{}' selected as a function but typed {}",
                function.name, entry.ty
            )));
        };

        let mut out = Vec::new();
        // Move incoming arguments into their pseudos: six registers, then
        // the stack slots above the saved %rbp and return address.
        for (index, (param, param_ty)) in
            function.params.iter().zip(param_types).enumerate()
        {
            let ty = scalar_asm_type(param_ty)?;
            let src = if index < ARG_REGISTERS.len() {
                Operand::Reg(ARG_REGISTERS[index])
            } else {
                Operand::Stack(16 + 8 * (index - ARG_REGISTERS.len()) as i64)
            };
            out.push(Instruction::Mov {
                ty,
                src,
                dst: Operand::Pseudo(param.clone()),
            });
        }

        for instruction in &function.instructions {
            self.select_instruction(instruction, &mut out)?;
        }

        Ok(Function {
            name: function.name.clone(),
            global: function.global,
            instructions: out,
            stack_size: 0,
        })
    }

    fn select_instruction(
        &self,
        instruction: &ir::Instruction,
        out: &mut Vec<Instruction>,
    ) -> Result<(), CompileError> {
        match instruction {
            ir::Instruction::Return(value) => {
                out.push(Instruction::Mov {
                    ty: self.value_type(value)?,
                    src: Self::operand(value),
                    dst: Operand::Reg(Reg::Ax),
                });
                out.push(Instruction::Ret);
            }
            ir::Instruction::Unary {
                op: ir::UnaryOperator::Not,
                src,
                dst,
            } => {
                out.push(Instruction::Cmp {
                    ty: self.value_type(src)?,
                    src: Operand::Imm(0),
                    dst: Self::operand(src),
                });
                out.push(Instruction::Mov {
                    ty: self.value_type(dst)?,
                    src: Operand::Imm(0),
                    dst: Self::operand(dst),
                });
                out.push(Instruction::SetCC {
                    cc: CondCode::E,
                    operand: Self::operand(dst),
                });
            }
            ir::Instruction::Unary { op, src, dst } => {
                let ty = self.value_type(src)?;
                out.push(Instruction::Mov {
                    ty,
                    src: Self::operand(src),
                    dst: Self::operand(dst),
                });
                let op = match op {
                    ir::UnaryOperator::Negate => UnaryOperator::Neg,
                    ir::UnaryOperator::Complement => UnaryOperator::Not,
                    ir::UnaryOperator::Not => unreachable!("handled above"),
                };
                out.push(Instruction::Unary {
                    op,
                    ty,
                    operand: Self::operand(dst),
                });
            }
            ir::Instruction::Binary { op, lhs, rhs, dst } => {
                self.select_binary(*op, lhs, rhs, dst, out)?;
            }
            ir::Instruction::Copy { src, dst } => {
                out.push(Instruction::Mov {
                    ty: self.value_type(dst)?,
                    src: Self::operand(src),
                    dst: Self::operand(dst),
                });
            }
            ir::Instruction::Jump(target) => out.push(Instruction::Jmp(target.clone())),
            ir::Instruction::JumpIfZero { condition, target } => {
                self.select_conditional_jump(condition, target, CondCode::E, out)?;
            }
            ir::Instruction::JumpIfNotZero { condition, target } => {
                self.select_conditional_jump(condition, target, CondCode::Ne, out)?;
            }
            ir::Instruction::Label(name) => out.push(Instruction::Label(name.clone())),
            ir::Instruction::SignExtend { src, dst } => {
                out.push(Instruction::Movsx {
                    src: Self::operand(src),
                    dst: Self::operand(dst),
                });
            }
            ir::Instruction::Truncate { src, dst } => {
                // A 32-bit move into a register zeroes the upper half, which
                // is exactly the truncation the IR asks for
                out.push(Instruction::Mov {
                    ty: AsmType::Longword,
                    src: Self::operand(src),
                    dst: Self::operand(dst),
                });
            }
            ir::Instruction::FunctionCall { name, args, dst } => {
                self.select_call(name, args, dst, out)?;
            }
        }
        Ok(())
    }

    fn select_conditional_jump(
        &self,
        condition: &ir::Value,
        target: &str,
        cc: CondCode,
        out: &mut Vec<Instruction>,
    ) -> Result<(), CompileError> {
        out.push(Instruction::Cmp {
            ty: self.value_type(condition)?,
            src: Operand::Imm(0),
            dst: Self::operand(condition),
        });
        out.push(Instruction::JmpCC {
            cc,
            target: target.to_string(),
        });
        Ok(())
    }

    fn select_binary(
        &self,
        op: ir::BinaryOperator,
        lhs: &ir::Value,
        rhs: &ir::Value,
        dst: &ir::Value,
        out: &mut Vec<Instruction>,
    ) -> Result<(), CompileError> {
        let operand_ty = self.value_type(lhs)?;
        match op {
            ir::BinaryOperator::Divide | ir::BinaryOperator::Remainder => {
                // idiv computes DX:AX / operand, quotient in AX, remainder
                // in DX
                out.push(Instruction::Mov {
                    ty: operand_ty,
                    src: Self::operand(lhs),
                    dst: Operand::Reg(Reg::Ax),
                });
                out.push(Instruction::Cdq(operand_ty));
                out.push(Instruction::Idiv {
                    ty: operand_ty,
                    operand: Self::operand(rhs),
                });
                let result_reg = if op == ir::BinaryOperator::Divide {
                    Reg::Ax
                } else {
                    Reg::Dx
                };
                out.push(Instruction::Mov {
                    ty: operand_ty,
                    src: Operand::Reg(result_reg),
                    dst: Self::operand(dst),
                });
            }
            op if op.is_comparison() => {
                out.push(Instruction::Cmp {
                    ty: operand_ty,
                    src: Self::operand(rhs),
                    dst: Self::operand(lhs),
                });
                // Comparison results are always int
                out.push(Instruction::Mov {
                    ty: AsmType::Longword,
                    src: Operand::Imm(0),
                    dst: Self::operand(dst),
                });
                out.push(Instruction::SetCC {
                    cc: condition_code(op),
                    operand: Self::operand(dst),
                });
            }
            _ => {
                let asm_op = match op {
                    ir::BinaryOperator::Add => BinaryOperator::Add,
                    ir::BinaryOperator::Subtract => BinaryOperator::Sub,
                    ir::BinaryOperator::Multiply => BinaryOperator::Mult,
                    _ => unreachable!("division and comparisons handled above"),
                };
                out.push(Instruction::Mov {
                    ty: operand_ty,
                    src: Self::operand(lhs),
                    dst: Self::operand(dst),
                });
                out.push(Instruction::Binary {
                    op: asm_op,
                    ty: operand_ty,
                    src: Self::operand(rhs),
                    dst: Self::operand(dst),
                });
            }
        }
        Ok(())
    }

    fn select_call(
        &self,
        name: &str,
        args: &[ir::Value],
        dst: &ir::Value,
        out: &mut Vec<Instruction>,
    ) -> Result<(), CompileError> {
        let register_args = &args[..args.len().min(ARG_REGISTERS.len())];
        let stack_args = &args[register_args.len()..];

        // An odd number of 8-byte pushes would leave %rsp misaligned at the
        // call; pad first and pop the padding with the arguments afterwards
        let padding: i64 = if stack_args.len() % 2 == 1 { 8 } else { 0 };
        if padding != 0 {
            out.push(Instruction::Binary {
                op: BinaryOperator::Sub,
                ty: AsmType::Quadword,
                src: Operand::Imm(padding),
                dst: Operand::Reg(Reg::Sp),
            });
        }

        for (arg, reg) in register_args.iter().zip(ARG_REGISTERS) {
            out.push(Instruction::Mov {
                ty: self.value_type(arg)?,
                src: Self::operand(arg),
                dst: Operand::Reg(reg),
            });
        }

        for arg in stack_args.iter().rev() {
            let operand = Self::operand(arg);
            let ty = self.value_type(arg)?;
            if matches!(operand, Operand::Imm(_) | Operand::Reg(_))
                || ty == AsmType::Quadword
            {
                out.push(Instruction::Push(operand));
            } else {
                // Pushing 8 bytes of a 4-byte stack slot could read past the
                // frame; stage the longword through AX
                out.push(Instruction::Mov {
                    ty: AsmType::Longword,
                    src: operand,
                    dst: Operand::Reg(Reg::Ax),
                });
                out.push(Instruction::Push(Operand::Reg(Reg::Ax)));
            }
        }

        out.push(Instruction::Call(name.to_string()));

        let to_remove = 8 * stack_args.len() as i64 + padding;
        if to_remove != 0 {
            out.push(Instruction::Binary {
                op: BinaryOperator::Add,
                ty: AsmType::Quadword,
                src: Operand::Imm(to_remove),
                dst: Operand::Reg(Reg::Sp),
            });
        }

        out.push(Instruction::Mov {
            ty: self.value_type(dst)?,
            src: Operand::Reg(Reg::Ax),
            dst: Self::operand(dst),
        });
        Ok(())
    }
}

fn condition_code(op: ir::BinaryOperator) -> CondCode {
    match op {
        ir::BinaryOperator::Equal => CondCode::E,
        ir::BinaryOperator::NotEqual => CondCode::Ne,
        ir::BinaryOperator::LessThan => CondCode::L,
        ir::BinaryOperator::LessOrEqual => CondCode::Le,
        ir::BinaryOperator::GreaterThan => CondCode::G,
        ir::BinaryOperator::GreaterOrEqual => CondCode::Ge,
        _ => unreachable!("not a comparison operator"),
    }
}

// ============================================================================
//                          PSEUDO REPLACEMENT
// ============================================================================

struct StackAllocator<'a> {
    backend: &'a BackendSymbolTable,
    offsets: HashMap<String, i64>,
    next_offset: i64,
}

impl StackAllocator<'_> {
    fn replace(&mut self, operand: &mut Operand) -> Result<(), CompileError> {
        let Operand::Pseudo(name) = operand else {
            return Ok(());
        };
        let replacement = match self.backend.get(name) {
            Some(BackendSymbol::Object {
                is_static: true, ..
            }) => Operand::Data(name.clone()),
            Some(BackendSymbol::Object {
                ty,
                is_static: false,
            }) => Operand::Stack(self.allocate(name.clone(), *ty)),
            Some(BackendSymbol::Function { .. }) => {
                return Err(CompileError::Codegen(format!(
                    "function '{}' used as an operand",
                    name
                )));
            }
            None => {
                return Err(CompileError::Codegen(format!(
                    "pseudo register '{}' has no backend symbol",
                    name
                )));
            }
        };
        *operand = replacement;
        Ok(())
    }

    fn allocate(&mut self, name: String, ty: AsmType) -> i64 {
        if let Some(&offset) = self.offsets.get(&name) {
            return offset;
        }
        self.next_offset -= i64::from(ty.size());
        if ty == AsmType::Quadword {
            // Quadword slots are 8-aligned; offsets are negative
            self.next_offset -= self.next_offset.rem_euclid(8);
        }
        self.offsets.insert(name, self.next_offset);
        self.next_offset
    }
}

/// Assign every pseudo a home and record the rounded frame size.
fn replace_pseudos(
    function: &mut Function,
    backend: &BackendSymbolTable,
) -> Result<(), CompileError> {
    let mut allocator = StackAllocator {
        backend,
        offsets: HashMap::new(),
        next_offset: 0,
    };
    for instruction in &mut function.instructions {
        match instruction {
            Instruction::Mov { src, dst, .. }
            | Instruction::Movsx { src, dst }
            | Instruction::Binary { src, dst, .. }
            | Instruction::Cmp { src, dst, .. } => {
                allocator.replace(src)?;
                allocator.replace(dst)?;
            }
            Instruction::Unary { operand, .. }
            | Instruction::Idiv { operand, .. }
            | Instruction::SetCC { operand, .. }
            | Instruction::Push(operand) => allocator.replace(operand)?,
            _ => {}
        }
    }
    // Frames stay 16-byte aligned so calls inside the body line up
    function.stack_size = (-allocator.next_offset + 15) / 16 * 16;
    Ok(())
}

// ============================================================================
//                              FIXUP PASS
// ============================================================================

/// Rewrite instructions the hardware won't encode. `R10` carries rewritten
/// sources and `R11` rewritten destinations; the selector never touches
/// either, so the substitutions cannot clobber live values.
fn fixup_function(function: &mut Function) {
    let mut out = Vec::with_capacity(function.instructions.len() + 1);
    out.push(Instruction::Binary {
        op: BinaryOperator::Sub,
        ty: AsmType::Quadword,
        src: Operand::Imm(function.stack_size),
        dst: Operand::Reg(Reg::Sp),
    });
    for instruction in function.instructions.drain(..) {
        fixup_instruction(instruction, &mut out);
    }
    function.instructions = out;
}

fn fixup_instruction(instruction: Instruction, out: &mut Vec<Instruction>) {
    match instruction {
        Instruction::Mov { ty, src, dst } => {
            // A longword immediate wider than 32 bits truncates to its low
            // half; a quadword one headed to memory needs a register stop
            let src = if ty == AsmType::Longword && src.is_large_immediate() {
                match src {
                    Operand::Imm(v) => Operand::Imm(i64::from(v as i32)),
                    other => other,
                }
            } else {
                src
            };
            let src = if ty == AsmType::Quadword && src.is_large_immediate() && dst.is_memory()
            {
                out.push(Instruction::Mov {
                    ty,
                    src,
                    dst: Operand::Reg(Reg::R10),
                });
                Operand::Reg(Reg::R10)
            } else {
                src
            };
            if src.is_memory() && dst.is_memory() {
                out.push(Instruction::Mov {
                    ty,
                    src,
                    dst: Operand::Reg(Reg::R10),
                });
                out.push(Instruction::Mov {
                    ty,
                    src: Operand::Reg(Reg::R10),
                    dst,
                });
            } else {
                out.push(Instruction::Mov { ty, src, dst });
            }
        }
        Instruction::Movsx { src, dst } => {
            let src = if src.is_immediate() {
                out.push(Instruction::Mov {
                    ty: AsmType::Longword,
                    src,
                    dst: Operand::Reg(Reg::R10),
                });
                Operand::Reg(Reg::R10)
            } else {
                src
            };
            if dst.is_memory() {
                out.push(Instruction::Movsx {
                    src,
                    dst: Operand::Reg(Reg::R11),
                });
                out.push(Instruction::Mov {
                    ty: AsmType::Quadword,
                    src: Operand::Reg(Reg::R11),
                    dst,
                });
            } else {
                out.push(Instruction::Movsx { src, dst });
            }
        }
        Instruction::Binary { op, ty, src, dst } => {
            let src = if (ty == AsmType::Quadword && src.is_large_immediate())
                || (src.is_memory() && dst.is_memory() && op != BinaryOperator::Mult)
            {
                out.push(Instruction::Mov {
                    ty,
                    src,
                    dst: Operand::Reg(Reg::R10),
                });
                Operand::Reg(Reg::R10)
            } else {
                src
            };
            if op == BinaryOperator::Mult && dst.is_memory() {
                // imul cannot write to memory
                out.push(Instruction::Mov {
                    ty,
                    src: dst.clone(),
                    dst: Operand::Reg(Reg::R11),
                });
                out.push(Instruction::Binary {
                    op,
                    ty,
                    src,
                    dst: Operand::Reg(Reg::R11),
                });
                out.push(Instruction::Mov {
                    ty,
                    src: Operand::Reg(Reg::R11),
                    dst,
                });
            } else {
                out.push(Instruction::Binary { op, ty, src, dst });
            }
        }
        Instruction::Cmp { ty, src, dst } => {
            let src = if (ty == AsmType::Quadword && src.is_large_immediate())
                || (src.is_memory() && dst.is_memory())
            {
                out.push(Instruction::Mov {
                    ty,
                    src,
                    dst: Operand::Reg(Reg::R10),
                });
                Operand::Reg(Reg::R10)
            } else {
                src
            };
            if dst.is_immediate() {
                // The compared-to operand of cmp cannot be an immediate
                out.push(Instruction::Mov {
                    ty,
                    src: dst,
                    dst: Operand::Reg(Reg::R11),
                });
                out.push(Instruction::Cmp {
                    ty,
                    src,
                    dst: Operand::Reg(Reg::R11),
                });
            } else {
                out.push(Instruction::Cmp { ty, src, dst });
            }
        }
        Instruction::Idiv { ty, operand } => {
            if operand.is_immediate() {
                out.push(Instruction::Mov {
                    ty,
                    src: operand,
                    dst: Operand::Reg(Reg::R10),
                });
                out.push(Instruction::Idiv {
                    ty,
                    operand: Operand::Reg(Reg::R10),
                });
            } else {
                out.push(Instruction::Idiv { ty, operand });
            }
        }
        Instruction::Push(operand) => {
            if operand.is_large_immediate() {
                out.push(Instruction::Mov {
                    ty: AsmType::Quadword,
                    src: operand,
                    dst: Operand::Reg(Reg::R10),
                });
                out.push(Instruction::Push(Operand::Reg(Reg::R10)));
            } else {
                out.push(Instruction::Push(operand));
            }
        }
        other => out.push(other),
    }
}
