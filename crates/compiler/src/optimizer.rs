//! IR optimization passes
//!
//! Four independent, individually-enableable rewrites of a function's
//! instruction list: constant folding, copy propagation, unreachable-code
//! elimination, and dead-store elimination. Each pass runs to its own fixed
//! point, and the whole set repeats until a full round changes nothing; all
//! passes only ever shrink or simplify, so this terminates.
//!
//! The control-flow graph is derived on demand from the label/jump structure
//! of the instruction list and thrown away afterwards; the IR itself stays a
//! flat list.

use crate::config::OptimizationConfig;
use crate::ir::{BinaryOperator, Function, Instruction, Program, TopLevel, UnaryOperator, Value};
use crate::symbols::SymbolTable;
use crate::types::{Const, Type};
use std::collections::{HashMap, HashSet};

/// Optimize every function in the program in place.
pub fn optimize_program(
    program: &mut Program,
    symbols: &SymbolTable,
    config: &OptimizationConfig,
) {
    if !config.any_enabled() {
        return;
    }
    for top_level in &mut program.top_levels {
        if let TopLevel::Function(function) = top_level {
            optimize_function(function, symbols, config);
        }
    }
}

fn optimize_function(function: &mut Function, symbols: &SymbolTable, config: &OptimizationConfig) {
    let mut instructions = std::mem::take(&mut function.instructions);
    loop {
        let mut changed = false;
        if config.fold_constants {
            while fold_constants(&mut instructions) {
                changed = true;
            }
        }
        if config.propagate_copies {
            while propagate_copies(&mut instructions, symbols) {
                changed = true;
            }
        }
        if config.eliminate_unreachable_code {
            while eliminate_unreachable_code(&mut instructions) {
                changed = true;
            }
        }
        if config.eliminate_dead_stores {
            while eliminate_dead_stores(&mut instructions, symbols) {
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
    function.instructions = instructions;
}

// ============================================================================
//                            CONSTANT FOLDING
// ============================================================================

fn fold_constants(instructions: &mut Vec<Instruction>) -> bool {
    let mut changed = false;
    let mut folded = Vec::with_capacity(instructions.len());
    for instruction in instructions.drain(..) {
        match fold_instruction(instruction) {
            Folded::Replaced(new) => {
                changed = true;
                folded.push(new);
            }
            Folded::Removed => changed = true,
            Folded::Kept(original) => folded.push(original),
        }
    }
    *instructions = folded;
    changed
}

enum Folded {
    Kept(Instruction),
    Replaced(Instruction),
    Removed,
}

fn fold_instruction(instruction: Instruction) -> Folded {
    match &instruction {
        Instruction::Unary { op, src, dst } => {
            let Some(constant) = src.as_constant() else {
                return Folded::Kept(instruction);
            };
            let result = fold_unary(*op, constant);
            Folded::Replaced(Instruction::Copy {
                src: Value::Constant(result),
                dst: dst.clone(),
            })
        }
        Instruction::Binary { op, lhs, rhs, dst } => {
            let (Some(lhs), Some(rhs)) = (lhs.as_constant(), rhs.as_constant()) else {
                return Folded::Kept(instruction);
            };
            // Division by zero is left for the hardware to object to
            match fold_binary(*op, lhs, rhs) {
                Some(result) => Folded::Replaced(Instruction::Copy {
                    src: Value::Constant(result),
                    dst: dst.clone(),
                }),
                None => Folded::Kept(instruction),
            }
        }
        Instruction::JumpIfZero { condition, target } => match condition.as_constant() {
            Some(constant) if constant.is_zero() => {
                Folded::Replaced(Instruction::Jump(target.clone()))
            }
            Some(_) => Folded::Removed,
            None => Folded::Kept(instruction),
        },
        Instruction::JumpIfNotZero { condition, target } => match condition.as_constant() {
            Some(constant) if !constant.is_zero() => {
                Folded::Replaced(Instruction::Jump(target.clone()))
            }
            Some(_) => Folded::Removed,
            None => Folded::Kept(instruction),
        },
        _ => Folded::Kept(instruction),
    }
}

fn fold_unary(op: UnaryOperator, constant: Const) -> Const {
    match (op, constant) {
        (UnaryOperator::Complement, Const::Int(v)) => Const::Int(!v),
        (UnaryOperator::Complement, Const::Long(v)) => Const::Long(!v),
        (UnaryOperator::Negate, Const::Int(v)) => Const::Int(v.wrapping_neg()),
        (UnaryOperator::Negate, Const::Long(v)) => Const::Long(v.wrapping_neg()),
        (UnaryOperator::Not, c) => Const::Int(i32::from(c.is_zero())),
    }
}

/// Fold a binary operation; `None` means "leave the instruction alone"
/// (division or remainder by zero).
fn fold_binary(op: BinaryOperator, lhs: Const, rhs: Const) -> Option<Const> {
    if matches!(op, BinaryOperator::Divide | BinaryOperator::Remainder) && rhs.is_zero() {
        return None;
    }
    if op.is_comparison() {
        let (a, b) = (lhs.as_i64(), rhs.as_i64());
        let result = match op {
            BinaryOperator::Equal => a == b,
            BinaryOperator::NotEqual => a != b,
            BinaryOperator::LessThan => a < b,
            BinaryOperator::LessOrEqual => a <= b,
            BinaryOperator::GreaterThan => a > b,
            BinaryOperator::GreaterOrEqual => a >= b,
            _ => unreachable!(),
        };
        return Some(Const::Int(i32::from(result)));
    }
    // Arithmetic wraps in the common type of the operands
    let common = Type::common_type(&lhs.ty(), &rhs.ty());
    let result = match common {
        Type::Int => {
            let (a, b) = (lhs.as_i64() as i32, rhs.as_i64() as i32);
            let v = match op {
                BinaryOperator::Add => a.wrapping_add(b),
                BinaryOperator::Subtract => a.wrapping_sub(b),
                BinaryOperator::Multiply => a.wrapping_mul(b),
                BinaryOperator::Divide => a.wrapping_div(b),
                BinaryOperator::Remainder => a.wrapping_rem(b),
                _ => unreachable!(),
            };
            Const::Int(v)
        }
        _ => {
            let (a, b) = (lhs.as_i64(), rhs.as_i64());
            let v = match op {
                BinaryOperator::Add => a.wrapping_add(b),
                BinaryOperator::Subtract => a.wrapping_sub(b),
                BinaryOperator::Multiply => a.wrapping_mul(b),
                BinaryOperator::Divide => a.wrapping_div(b),
                BinaryOperator::Remainder => a.wrapping_rem(b),
                _ => unreachable!(),
            };
            Const::Long(v)
        }
    };
    Some(result)
}

// ============================================================================
//                          CONTROL-FLOW GRAPH
// ============================================================================

struct Cfg {
    blocks: Vec<Vec<Instruction>>,
    successors: Vec<Vec<usize>>,
}

impl Cfg {
    /// Partition the list into basic blocks: a label starts a block, and a
    /// jump or return ends one.
    fn build(instructions: Vec<Instruction>) -> Cfg {
        let mut blocks: Vec<Vec<Instruction>> = Vec::new();
        let mut current: Vec<Instruction> = Vec::new();
        for instruction in instructions {
            match &instruction {
                Instruction::Label(_) => {
                    if !current.is_empty() {
                        blocks.push(std::mem::take(&mut current));
                    }
                    current.push(instruction);
                }
                Instruction::Jump(_)
                | Instruction::JumpIfZero { .. }
                | Instruction::JumpIfNotZero { .. }
                | Instruction::Return(_) => {
                    current.push(instruction);
                    blocks.push(std::mem::take(&mut current));
                }
                _ => current.push(instruction),
            }
        }
        if !current.is_empty() {
            blocks.push(current);
        }

        let label_blocks: HashMap<&str, usize> = blocks
            .iter()
            .enumerate()
            .filter_map(|(index, block)| match block.first() {
                Some(Instruction::Label(name)) => Some((name.as_str(), index)),
                _ => None,
            })
            .collect();

        let mut successors = Vec::with_capacity(blocks.len());
        for (index, block) in blocks.iter().enumerate() {
            let mut outgoing = Vec::new();
            match block.last() {
                Some(Instruction::Return(_)) => {}
                Some(Instruction::Jump(target)) => {
                    if let Some(&succ) = label_blocks.get(target.as_str()) {
                        outgoing.push(succ);
                    }
                }
                Some(Instruction::JumpIfZero { target, .. })
                | Some(Instruction::JumpIfNotZero { target, .. }) => {
                    if let Some(&succ) = label_blocks.get(target.as_str()) {
                        outgoing.push(succ);
                    }
                    if index + 1 < blocks.len() {
                        outgoing.push(index + 1);
                    }
                }
                _ => {
                    if index + 1 < blocks.len() {
                        outgoing.push(index + 1);
                    }
                }
            }
            successors.push(outgoing);
        }

        Cfg { blocks, successors }
    }

    fn reachable_from_entry(&self) -> Vec<bool> {
        let mut reachable = vec![false; self.blocks.len()];
        let mut stack = vec![0usize];
        while let Some(index) = stack.pop() {
            if index >= self.blocks.len() || reachable[index] {
                continue;
            }
            reachable[index] = true;
            stack.extend(&self.successors[index]);
        }
        reachable
    }

}

// ============================================================================
//                      UNREACHABLE-CODE ELIMINATION
// ============================================================================

fn eliminate_unreachable_code(instructions: &mut Vec<Instruction>) -> bool {
    if instructions.is_empty() {
        return false;
    }
    let cfg = Cfg::build(std::mem::take(instructions));
    let reachable = cfg.reachable_from_entry();
    let changed = reachable.iter().any(|r| !r);
    *instructions = cfg
        .blocks
        .into_iter()
        .zip(reachable)
        .filter_map(|(block, keep)| keep.then_some(block))
        .flatten()
        .collect();
    changed
}

// ============================================================================
//                           COPY PROPAGATION
// ============================================================================

/// Forward propagation within each basic block: remember the most recent
/// value copied into each variable and substitute it at uses. A mapping dies
/// when either side is overwritten, and mappings touching static storage die
/// at calls (the callee may read or write them).
fn propagate_copies(instructions: &mut Vec<Instruction>, symbols: &SymbolTable) -> bool {
    let mut changed = false;
    let cfg = Cfg::build(std::mem::take(instructions));
    let mut blocks = Vec::with_capacity(cfg.blocks.len());
    for block in cfg.blocks {
        let mut copies: HashMap<String, Value> = HashMap::new();
        let mut rewritten = Vec::with_capacity(block.len());
        for instruction in block {
            let substituted = substitute_uses(instruction.clone(), &copies);
            if substituted != instruction {
                changed = true;
            }
            match &substituted {
                Instruction::Copy { src, dst } => {
                    if let Some(dst_name) = dst.var_name() {
                        if src.var_name() == Some(dst_name) {
                            // Identity copy, drop it
                            changed = true;
                            continue;
                        }
                        invalidate(&mut copies, dst_name);
                        copies.insert(dst_name.to_string(), src.clone());
                    }
                }
                Instruction::FunctionCall { dst, .. } => {
                    if let Some(dst_name) = dst.var_name() {
                        invalidate(&mut copies, dst_name);
                    }
                    copies.retain(|name, value| {
                        !symbols.is_static_storage(name)
                            && value
                                .var_name()
                                .is_none_or(|v| !symbols.is_static_storage(v))
                    });
                }
                other => {
                    if let Some(dst_name) = other.dst_var() {
                        let dst_name = dst_name.to_string();
                        invalidate(&mut copies, &dst_name);
                    }
                }
            }
            rewritten.push(substituted);
        }
        blocks.push(rewritten);
    }
    *instructions = blocks.into_iter().flatten().collect();
    changed
}

fn invalidate(copies: &mut HashMap<String, Value>, name: &str) {
    copies.remove(name);
    copies.retain(|_, value| value.var_name() != Some(name));
}

fn substitute_value(value: &Value, copies: &HashMap<String, Value>) -> Value {
    match value {
        Value::Var(name) => copies.get(name).cloned().unwrap_or_else(|| value.clone()),
        constant => constant.clone(),
    }
}

fn substitute_uses(instruction: Instruction, copies: &HashMap<String, Value>) -> Instruction {
    match instruction {
        Instruction::Return(value) => Instruction::Return(substitute_value(&value, copies)),
        Instruction::Unary { op, src, dst } => Instruction::Unary {
            op,
            src: substitute_value(&src, copies),
            dst,
        },
        Instruction::Binary { op, lhs, rhs, dst } => Instruction::Binary {
            op,
            lhs: substitute_value(&lhs, copies),
            rhs: substitute_value(&rhs, copies),
            dst,
        },
        Instruction::Copy { src, dst } => Instruction::Copy {
            src: substitute_value(&src, copies),
            dst,
        },
        Instruction::JumpIfZero { condition, target } => Instruction::JumpIfZero {
            condition: substitute_value(&condition, copies),
            target,
        },
        Instruction::JumpIfNotZero { condition, target } => Instruction::JumpIfNotZero {
            condition: substitute_value(&condition, copies),
            target,
        },
        Instruction::FunctionCall { name, args, dst } => Instruction::FunctionCall {
            name,
            args: args
                .iter()
                .map(|arg| substitute_value(arg, copies))
                .collect(),
            dst,
        },
        Instruction::SignExtend { src, dst } => Instruction::SignExtend {
            src: substitute_value(&src, copies),
            dst,
        },
        Instruction::Truncate { src, dst } => Instruction::Truncate {
            src: substitute_value(&src, copies),
            dst,
        },
        other => other,
    }
}

// ============================================================================
//                         DEAD-STORE ELIMINATION
// ============================================================================

/// Backward liveness over the CFG, iterated to a fixed point. A store whose
/// destination is dead at its program point is removed, except calls (side
/// effects) and stores to static storage (visible beyond the function).
fn eliminate_dead_stores(instructions: &mut Vec<Instruction>, symbols: &SymbolTable) -> bool {
    let cfg = Cfg::build(std::mem::take(instructions));
    let block_count = cfg.blocks.len();
    let mut live_in: Vec<HashSet<String>> = vec![HashSet::new(); block_count];
    let mut live_out: Vec<HashSet<String>> = vec![HashSet::new(); block_count];

    loop {
        let mut stable = true;
        for index in (0..block_count).rev() {
            let mut out_set = HashSet::new();
            for &succ in &cfg.successors[index] {
                out_set.extend(live_in[succ].iter().cloned());
            }
            let mut live = out_set.clone();
            for instruction in cfg.blocks[index].iter().rev() {
                if let Some(dst) = instruction.dst_var() {
                    live.remove(dst);
                }
                for used in used_vars(instruction) {
                    live.insert(used.to_string());
                }
            }
            if live_out[index] != out_set {
                live_out[index] = out_set;
                stable = false;
            }
            if live_in[index] != live {
                live_in[index] = live;
                stable = false;
            }
        }
        if stable {
            break;
        }
    }

    let mut changed = false;
    let mut blocks = Vec::with_capacity(block_count);
    for (index, block) in cfg.blocks.into_iter().enumerate() {
        let mut live = live_out[index].clone();
        let mut kept_reversed = Vec::with_capacity(block.len());
        for instruction in block.into_iter().rev() {
            let removable = matches!(
                instruction,
                Instruction::Copy { .. }
                    | Instruction::Unary { .. }
                    | Instruction::Binary { .. }
                    | Instruction::SignExtend { .. }
                    | Instruction::Truncate { .. }
            );
            if removable
                && let Some(dst) = instruction.dst_var()
                && !symbols.is_static_storage(dst)
                && !live.contains(dst)
            {
                changed = true;
                continue;
            }
            if let Some(dst) = instruction.dst_var() {
                live.remove(dst);
            }
            for used in used_vars(&instruction) {
                live.insert(used.to_string());
            }
            kept_reversed.push(instruction);
        }
        kept_reversed.reverse();
        blocks.push(kept_reversed);
    }
    *instructions = blocks.into_iter().flatten().collect();
    changed
}

fn used_vars(instruction: &Instruction) -> Vec<&str> {
    fn from(value: &Value) -> Option<&str> {
        value.var_name()
    }
    match instruction {
        Instruction::Return(value) => from(value).into_iter().collect(),
        Instruction::Unary { src, .. }
        | Instruction::Copy { src, .. }
        | Instruction::SignExtend { src, .. }
        | Instruction::Truncate { src, .. } => from(src).into_iter().collect(),
        Instruction::Binary { lhs, rhs, .. } => {
            from(lhs).into_iter().chain(from(rhs)).collect()
        }
        Instruction::JumpIfZero { condition, .. }
        | Instruction::JumpIfNotZero { condition, .. } => from(condition).into_iter().collect(),
        Instruction::FunctionCall { args, .. } => args.iter().filter_map(from).collect(),
        Instruction::Jump(_) | Instruction::Label(_) => Vec::new(),
    }
}
