//! IR generation
//!
//! Flattens the checked syntax tree into three-address instructions, lowers
//! structured control flow to labels and jumps, and desugars `&&`/`||` into
//! short-circuit branches. Temporaries (`tmp.<k>`) continue the counter the
//! resolver handed over, so every generated name stays unique; each
//! temporary is registered in the symbol table with its type as it is
//! created.
//!
//! After the functions are lowered, the symbol table is scanned (read-only)
//! for static-storage entries, which become IR static variables: explicit
//! initializers keep their value, tentative definitions become zeros, and
//! bare `extern` declarations produce nothing.

use crate::ast::{
    self, Block, BlockItem, Declaration, Expression, ExpressionKind, ForInit, FunctionDeclaration,
    Statement,
};
use crate::error::CompileError;
use crate::ir::{self, Instruction, Value};
use crate::symbols::{IdentifierAttribute, InitialValue, SymbolEntry, SymbolTable};
use crate::types::{Const, StaticInit, Type};

pub struct IrGenerator<'a> {
    symbols: &'a mut SymbolTable,
    /// Continues the resolver's counter so `tmp.<k>` never collides
    tmp_counter: usize,
    false_counter: usize,
    true_counter: usize,
    result_counter: usize,
    end_counter: usize,
    else_counter: usize,
    e2_counter: usize,
    start_counter: usize,
}

impl<'a> IrGenerator<'a> {
    pub fn new(symbols: &'a mut SymbolTable, resolution_counter: usize) -> Self {
        IrGenerator {
            symbols,
            tmp_counter: resolution_counter,
            false_counter: 0,
            true_counter: 0,
            result_counter: 0,
            end_counter: 0,
            else_counter: 0,
            e2_counter: 0,
            start_counter: 0,
        }
    }

    pub fn generate_program(
        mut self,
        program: &ast::Program,
    ) -> Result<ir::Program, CompileError> {
        let mut top_levels = Vec::new();
        for declaration in &program.declarations {
            if let Declaration::Function(function) = declaration
                && function.body.is_some()
            {
                top_levels.push(ir::TopLevel::Function(self.generate_function(function)?));
            }
        }
        for static_variable in self.convert_symbols_to_static_variables() {
            top_levels.push(ir::TopLevel::StaticVariable(static_variable));
        }
        Ok(ir::Program { top_levels })
    }

    fn generate_function(
        &mut self,
        function: &FunctionDeclaration,
    ) -> Result<ir::Function, CompileError> {
        let entry = self
            .symbols
            .expect(&function.name)
            .map_err(CompileError::IrGen)?;
        let IdentifierAttribute::Function { global, .. } = entry.attr else {
            return Err(CompileError::IrGen(format!(
                "'{}' lowered as a function but not recorded as one",
                function.name
            )));
        };
        let Type::Function { ret, .. } = &entry.ty else {
            return Err(CompileError::IrGen(format!(
                "function '{}' has a non-function type",
                function.name
            )));
        };
        let return_zero = match ret.as_ref() {
            Type::Long => Const::Long(0),
            _ => Const::Int(0),
        };

        let body = function
            .body
            .as_ref()
            .ok_or_else(|| CompileError::IrGen("lowering a function without a body".into()))?;
        let mut instructions = Vec::new();
        self.emit_block(body, &mut instructions)?;
        // A body that falls off the end returns 0
        instructions.push(Instruction::Return(Value::Constant(return_zero)));

        Ok(ir::Function {
            name: function.name.clone(),
            global,
            params: function.params.clone(),
            instructions,
        })
    }

    fn emit_block(
        &mut self,
        block: &Block,
        out: &mut Vec<Instruction>,
    ) -> Result<(), CompileError> {
        for item in &block.items {
            match item {
                BlockItem::Statement(statement) => self.emit_statement(statement, out)?,
                BlockItem::Declaration(Declaration::Variable(declaration)) => {
                    self.emit_variable_declaration(declaration, out)?;
                }
                // Nested function declarations produce no code
                BlockItem::Declaration(Declaration::Function(_)) => {}
            }
        }
        Ok(())
    }

    /// Local declarations with static storage are initialized from the data
    /// section, not here; only plain locals get a runtime copy.
    fn emit_variable_declaration(
        &mut self,
        declaration: &ast::VariableDeclaration,
        out: &mut Vec<Instruction>,
    ) -> Result<(), CompileError> {
        if declaration.storage_class.is_some() {
            return Ok(());
        }
        if let Some(init) = &declaration.init {
            let value = self.emit_expression(init, out)?;
            out.push(Instruction::Copy {
                src: value,
                dst: Value::Var(declaration.name.clone()),
            });
        }
        Ok(())
    }

    fn emit_statement(
        &mut self,
        statement: &Statement,
        out: &mut Vec<Instruction>,
    ) -> Result<(), CompileError> {
        match statement {
            Statement::Return(expression) => {
                let value = self.emit_expression(expression, out)?;
                out.push(Instruction::Return(value));
            }
            Statement::Expression(expression) => {
                self.emit_expression(expression, out)?;
            }
            Statement::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let condition_value = self.emit_expression(condition, out)?;
                let end_label = self.fresh_end_label();
                match else_branch {
                    Some(else_branch) => {
                        let else_label = self.fresh_else_label();
                        out.push(Instruction::JumpIfZero {
                            condition: condition_value,
                            target: else_label.clone(),
                        });
                        self.emit_statement(then_branch, out)?;
                        out.push(Instruction::Jump(end_label.clone()));
                        out.push(Instruction::Label(else_label));
                        self.emit_statement(else_branch, out)?;
                    }
                    None => {
                        out.push(Instruction::JumpIfZero {
                            condition: condition_value,
                            target: end_label.clone(),
                        });
                        self.emit_statement(then_branch, out)?;
                    }
                }
                out.push(Instruction::Label(end_label));
            }
            Statement::Compound(block) => self.emit_block(block, out)?,
            Statement::While {
                condition,
                body,
                label,
            } => {
                let continue_label = continue_label(label);
                let break_label = break_label(label);
                out.push(Instruction::Label(continue_label.clone()));
                let condition_value = self.emit_expression(condition, out)?;
                out.push(Instruction::JumpIfZero {
                    condition: condition_value,
                    target: break_label.clone(),
                });
                self.emit_statement(body, out)?;
                out.push(Instruction::Jump(continue_label));
                out.push(Instruction::Label(break_label));
            }
            Statement::DoWhile {
                body,
                condition,
                label,
            } => {
                let start_label = self.fresh_start_label();
                out.push(Instruction::Label(start_label.clone()));
                self.emit_statement(body, out)?;
                out.push(Instruction::Label(continue_label(label)));
                let condition_value = self.emit_expression(condition, out)?;
                out.push(Instruction::JumpIfNotZero {
                    condition: condition_value,
                    target: start_label,
                });
                out.push(Instruction::Label(break_label(label)));
            }
            Statement::For {
                init,
                condition,
                post,
                body,
                label,
            } => {
                match init {
                    ForInit::Declaration(declaration) => {
                        self.emit_variable_declaration(declaration, out)?;
                    }
                    ForInit::Expression(Some(expression)) => {
                        self.emit_expression(expression, out)?;
                    }
                    ForInit::Expression(None) => {}
                }
                let start_label = self.fresh_start_label();
                let break_label = break_label(label);
                out.push(Instruction::Label(start_label.clone()));
                if let Some(condition) = condition {
                    let condition_value = self.emit_expression(condition, out)?;
                    out.push(Instruction::JumpIfZero {
                        condition: condition_value,
                        target: break_label.clone(),
                    });
                }
                self.emit_statement(body, out)?;
                out.push(Instruction::Label(continue_label(label)));
                if let Some(post) = post {
                    self.emit_expression(post, out)?;
                }
                out.push(Instruction::Jump(start_label));
                out.push(Instruction::Label(break_label));
            }
            Statement::Break { label } => {
                out.push(Instruction::Jump(break_label(label)));
            }
            Statement::Continue { label } => {
                out.push(Instruction::Jump(continue_label(label)));
            }
            Statement::Null => {}
        }
        Ok(())
    }

    fn emit_expression(
        &mut self,
        expression: &Expression,
        out: &mut Vec<Instruction>,
    ) -> Result<Value, CompileError> {
        match &expression.kind {
            ExpressionKind::Constant(constant) => Ok(Value::Constant(*constant)),
            ExpressionKind::Var(name) => Ok(Value::Var(name.clone())),
            ExpressionKind::Unary { op, inner } => {
                let src = self.emit_expression(inner, out)?;
                let dst = self.make_temporary(self.expression_type(expression)?);
                out.push(Instruction::Unary {
                    op: convert_unary_op(*op),
                    src,
                    dst: dst.clone(),
                });
                Ok(dst)
            }
            ExpressionKind::Binary { op, lhs, rhs } => match op {
                ast::BinaryOperator::And => self.emit_logical_and(lhs, rhs, out),
                ast::BinaryOperator::Or => self.emit_logical_or(lhs, rhs, out),
                _ => {
                    let lhs_value = self.emit_expression(lhs, out)?;
                    let rhs_value = self.emit_expression(rhs, out)?;
                    let dst = self.make_temporary(self.expression_type(expression)?);
                    out.push(Instruction::Binary {
                        op: convert_binary_op(*op)?,
                        lhs: lhs_value,
                        rhs: rhs_value,
                        dst: dst.clone(),
                    });
                    Ok(dst)
                }
            },
            ExpressionKind::Assignment { lhs, rhs } => {
                let ExpressionKind::Var(name) = &lhs.kind else {
                    return Err(CompileError::IrGen(
                        "assignment target is not a variable".to_string(),
                    ));
                };
                let value = self.emit_expression(rhs, out)?;
                out.push(Instruction::Copy {
                    src: value,
                    dst: Value::Var(name.clone()),
                });
                Ok(Value::Var(name.clone()))
            }
            ExpressionKind::Conditional {
                condition,
                then_branch,
                else_branch,
            } => {
                let result = self.make_result_variable(self.expression_type(expression)?);
                let e2_label = self.fresh_e2_label();
                let end_label = self.fresh_end_label();
                let condition_value = self.emit_expression(condition, out)?;
                out.push(Instruction::JumpIfZero {
                    condition: condition_value,
                    target: e2_label.clone(),
                });
                let then_value = self.emit_expression(then_branch, out)?;
                out.push(Instruction::Copy {
                    src: then_value,
                    dst: result.clone(),
                });
                out.push(Instruction::Jump(end_label.clone()));
                out.push(Instruction::Label(e2_label));
                let else_value = self.emit_expression(else_branch, out)?;
                out.push(Instruction::Copy {
                    src: else_value,
                    dst: result.clone(),
                });
                out.push(Instruction::Label(end_label));
                Ok(result)
            }
            ExpressionKind::FunctionCall { name, args } => {
                let mut arg_values = Vec::new();
                for arg in args {
                    arg_values.push(self.emit_expression(arg, out)?);
                }
                let dst = self.make_temporary(self.expression_type(expression)?);
                out.push(Instruction::FunctionCall {
                    name: name.clone(),
                    args: arg_values,
                    dst: dst.clone(),
                });
                Ok(dst)
            }
            ExpressionKind::Cast { target, inner } => {
                let value = self.emit_expression(inner, out)?;
                let source_type = self.expression_type(inner)?;
                if source_type == *target {
                    return Ok(value);
                }
                let dst = self.make_temporary(target.clone());
                let instruction = match target {
                    Type::Long => Instruction::SignExtend {
                        src: value,
                        dst: dst.clone(),
                    },
                    Type::Int => Instruction::Truncate {
                        src: value,
                        dst: dst.clone(),
                    },
                    Type::Function { .. } => {
                        return Err(CompileError::IrGen(
                            "cast to a function type".to_string(),
                        ));
                    }
                };
                out.push(instruction);
                Ok(dst)
            }
        }
    }

    fn emit_logical_and(
        &mut self,
        lhs: &Expression,
        rhs: &Expression,
        out: &mut Vec<Instruction>,
    ) -> Result<Value, CompileError> {
        let false_label = self.fresh_false_label();
        let result = self.make_result_variable(Type::Int);
        let lhs_value = self.emit_expression(lhs, out)?;
        out.push(Instruction::JumpIfZero {
            condition: lhs_value,
            target: false_label.clone(),
        });
        let rhs_value = self.emit_expression(rhs, out)?;
        out.push(Instruction::JumpIfZero {
            condition: rhs_value,
            target: false_label.clone(),
        });
        out.push(Instruction::Copy {
            src: Value::Constant(Const::Int(1)),
            dst: result.clone(),
        });
        let end_label = self.fresh_end_label();
        out.push(Instruction::Jump(end_label.clone()));
        out.push(Instruction::Label(false_label));
        out.push(Instruction::Copy {
            src: Value::Constant(Const::Int(0)),
            dst: result.clone(),
        });
        out.push(Instruction::Label(end_label));
        Ok(result)
    }

    fn emit_logical_or(
        &mut self,
        lhs: &Expression,
        rhs: &Expression,
        out: &mut Vec<Instruction>,
    ) -> Result<Value, CompileError> {
        let true_label = self.fresh_true_label();
        let result = self.make_result_variable(Type::Int);
        let lhs_value = self.emit_expression(lhs, out)?;
        out.push(Instruction::JumpIfNotZero {
            condition: lhs_value,
            target: true_label.clone(),
        });
        let rhs_value = self.emit_expression(rhs, out)?;
        out.push(Instruction::JumpIfNotZero {
            condition: rhs_value,
            target: true_label.clone(),
        });
        out.push(Instruction::Copy {
            src: Value::Constant(Const::Int(0)),
            dst: result.clone(),
        });
        let end_label = self.fresh_end_label();
        out.push(Instruction::Jump(end_label.clone()));
        out.push(Instruction::Label(true_label));
        out.push(Instruction::Copy {
            src: Value::Constant(Const::Int(1)),
            dst: result.clone(),
        });
        out.push(Instruction::Label(end_label));
        Ok(result)
    }

    fn expression_type(&self, expression: &Expression) -> Result<Type, CompileError> {
        expression
            .ty()
            .map(Clone::clone)
            .map_err(CompileError::IrGen)
    }

    /// Allocate a fresh temporary of the given type and register it.
    fn make_temporary(&mut self, ty: Type) -> Value {
        let name = format!("tmp.{}", self.tmp_counter);
        self.tmp_counter += 1;
        self.symbols.insert(name.clone(), SymbolEntry::local(ty));
        Value::Var(name)
    }

    /// Result variables of `&&`/`||`/`?:` get their own name family.
    fn make_result_variable(&mut self, ty: Type) -> Value {
        let name = format!("result{}", self.result_counter);
        self.result_counter += 1;
        self.symbols.insert(name.clone(), SymbolEntry::local(ty));
        Value::Var(name)
    }

    fn fresh_false_label(&mut self) -> String {
        let label = format!("and_false{}", self.false_counter);
        self.false_counter += 1;
        label
    }

    fn fresh_true_label(&mut self) -> String {
        let label = format!("or_true{}", self.true_counter);
        self.true_counter += 1;
        label
    }

    fn fresh_end_label(&mut self) -> String {
        let label = format!("end{}", self.end_counter);
        self.end_counter += 1;
        label
    }

    fn fresh_else_label(&mut self) -> String {
        let label = format!("else{}", self.else_counter);
        self.else_counter += 1;
        label
    }

    fn fresh_e2_label(&mut self) -> String {
        let label = format!("e2{}", self.e2_counter);
        self.e2_counter += 1;
        label
    }

    fn fresh_start_label(&mut self) -> String {
        let label = format!("start{}", self.start_counter);
        self.start_counter += 1;
        label
    }

    /// Materialize static storage from the symbol table. The table is only
    /// read; entries stay in place for assembly generation. Sorted by name
    /// so output order is deterministic.
    fn convert_symbols_to_static_variables(&self) -> Vec<ir::StaticVariable> {
        let mut statics = Vec::new();
        for (name, entry) in self.symbols.iter() {
            let IdentifierAttribute::Static { init, global } = &entry.attr else {
                continue;
            };
            let init = match init {
                InitialValue::Initial(value) => *value,
                InitialValue::Tentative => StaticInit::zero(&entry.ty),
                InitialValue::NoInitializer => continue,
            };
            statics.push(ir::StaticVariable {
                name: name.clone(),
                global: *global,
                ty: entry.ty.clone(),
                init,
            });
        }
        statics.sort_by(|a, b| a.name.cmp(&b.name));
        statics
    }
}

fn continue_label(loop_label: &str) -> String {
    format!("continue_{}", loop_label)
}

fn break_label(loop_label: &str) -> String {
    format!("break_{}", loop_label)
}

fn convert_unary_op(op: ast::UnaryOperator) -> ir::UnaryOperator {
    match op {
        ast::UnaryOperator::Complement => ir::UnaryOperator::Complement,
        ast::UnaryOperator::Negate => ir::UnaryOperator::Negate,
        ast::UnaryOperator::Not => ir::UnaryOperator::Not,
    }
}

/// `&&` and `||` have no IR counterpart; they are desugared before this.
fn convert_binary_op(op: ast::BinaryOperator) -> Result<ir::BinaryOperator, CompileError> {
    let converted = match op {
        ast::BinaryOperator::Add => ir::BinaryOperator::Add,
        ast::BinaryOperator::Subtract => ir::BinaryOperator::Subtract,
        ast::BinaryOperator::Multiply => ir::BinaryOperator::Multiply,
        ast::BinaryOperator::Divide => ir::BinaryOperator::Divide,
        ast::BinaryOperator::Remainder => ir::BinaryOperator::Remainder,
        ast::BinaryOperator::Equal => ir::BinaryOperator::Equal,
        ast::BinaryOperator::NotEqual => ir::BinaryOperator::NotEqual,
        ast::BinaryOperator::LessThan => ir::BinaryOperator::LessThan,
        ast::BinaryOperator::LessOrEqual => ir::BinaryOperator::LessOrEqual,
        ast::BinaryOperator::GreaterThan => ir::BinaryOperator::GreaterThan,
        ast::BinaryOperator::GreaterOrEqual => ir::BinaryOperator::GreaterOrEqual,
        ast::BinaryOperator::And | ast::BinaryOperator::Or => {
            return Err(CompileError::IrGen(
                "logical operator reached binary lowering".to_string(),
            ));
        }
    };
    Ok(converted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loop_labeling::LoopLabeler;
    use crate::parser::parse;
    use crate::resolver::Resolver;
    use crate::typechecker::TypeChecker;

    fn lower(source: &str) -> (ir::Program, SymbolTable) {
        let (resolved, counter) = Resolver::new()
            .resolve_program(parse(source).unwrap())
            .unwrap();
        let mut symbols = SymbolTable::new();
        let checked = TypeChecker::new(&mut symbols)
            .check_program(resolved)
            .unwrap();
        let labeled = LoopLabeler::new().label_program(checked).unwrap();
        let program = IrGenerator::new(&mut symbols, counter)
            .generate_program(&labeled)
            .unwrap();
        (program, symbols)
    }

    fn only_function(program: &ir::Program) -> &ir::Function {
        let functions: Vec<_> = program
            .top_levels
            .iter()
            .filter_map(|top_level| match top_level {
                ir::TopLevel::Function(function) => Some(function),
                _ => None,
            })
            .collect();
        assert_eq!(functions.len(), 1);
        functions[0]
    }

    #[test]
    fn test_every_function_ends_with_return() {
        let sources = [
            "int main(void) { return 3; }",
            "int main(void) { int a = 1; a = a + 1; }",
            "long f(void) { } int main(void) { return 0; }",
        ];
        for source in sources {
            let (program, _) = lower(source);
            for top_level in &program.top_levels {
                if let ir::TopLevel::Function(function) = top_level {
                    assert!(
                        matches!(function.instructions.last(), Some(Instruction::Return(_))),
                        "{} does not end with Return",
                        function.name
                    );
                }
            }
        }
    }

    #[test]
    fn test_implicit_return_type_follows_function() {
        let (program, _) = lower("long f(void) { } int main(void) { return 0; }");
        let ir::TopLevel::Function(f) = &program.top_levels[0] else {
            panic!("expected function");
        };
        assert_eq!(f.name, "f");
        assert_eq!(
            f.instructions.last(),
            Some(&Instruction::Return(Value::Constant(Const::Long(0))))
        );
    }

    #[test]
    fn test_labels_unique_within_function() {
        let (program, _) = lower(
            "int main(void) { int x = 0; \
             if (x && 1 || 2) { x = 1 ? 2 : 3; } \
             while (x < 5) { x = x + 1; if (x == 3) continue; } \
             do x = x - 1; while (x > 0); \
             for (int i = 0; i < 3; i = i + 1) { if (i == 1) break; } \
             return x; }",
        );
        let function = only_function(&program);
        let mut seen = std::collections::HashSet::new();
        let mut targets = Vec::new();
        for instruction in &function.instructions {
            match instruction {
                Instruction::Label(name) => {
                    assert!(seen.insert(name.clone()), "duplicate label {}", name);
                }
                Instruction::Jump(target)
                | Instruction::JumpIfZero { target, .. }
                | Instruction::JumpIfNotZero { target, .. } => targets.push(target.clone()),
                _ => {}
            }
        }
        for target in targets {
            assert!(seen.contains(&target), "jump to missing label {}", target);
        }
    }

    #[test]
    fn test_logical_and_short_circuits() {
        let (program, _) = lower("int main(void) { return 1 && 0; }");
        let function = only_function(&program);
        let jumps_if_zero = function
            .instructions
            .iter()
            .filter(|i| matches!(i, Instruction::JumpIfZero { .. }))
            .count();
        assert_eq!(jumps_if_zero, 2);
        assert!(function.instructions.iter().any(
            |i| matches!(i, Instruction::Label(name) if name.starts_with("and_false"))
        ));
        // No IR binary operator for &&
        assert!(!function
            .instructions
            .iter()
            .any(|i| matches!(i, Instruction::Binary { .. })));
    }

    #[test]
    fn test_while_shape() {
        let (program, _) = lower(
            "int main(void) { int x = 0; while (x < 3) { x = x + 1; } return x; }",
        );
        let function = only_function(&program);
        let labels: Vec<_> = function
            .instructions
            .iter()
            .filter_map(|i| match i {
                Instruction::Label(name) => Some(name.as_str()),
                _ => None,
            })
            .collect();
        assert!(labels.iter().any(|l| l.starts_with("continue_loop")));
        assert!(labels.iter().any(|l| l.starts_with("break_loop")));
        // The loop ends with a jump back to the continue label
        let jump_targets: Vec<_> = function
            .instructions
            .iter()
            .filter_map(|i| match i {
                Instruction::Jump(target) => Some(target.as_str()),
                _ => None,
            })
            .collect();
        assert!(jump_targets.iter().any(|t| t.starts_with("continue_loop")));
    }

    #[test]
    fn test_cast_lowering() {
        let (program, _) = lower(
            "int main(void) { long a = 4294967296L; int b = (int) a; return b; }",
        );
        let function = only_function(&program);
        assert!(function
            .instructions
            .iter()
            .any(|i| matches!(i, Instruction::Truncate { .. })));
        // long a = <int constant>? No: the initializer is already long, so no
        // SignExtend; but int b = (int) a truncates.
        let (program, _) = lower("int main(void) { long a = 5; return (int) a; }");
        let function = only_function(&program);
        assert!(function
            .instructions
            .iter()
            .any(|i| matches!(i, Instruction::SignExtend { .. })));
    }

    #[test]
    fn test_same_type_cast_is_noop() {
        let (program, _) = lower("int main(void) { int a = 3; return (int) a; }");
        let function = only_function(&program);
        assert!(!function.instructions.iter().any(|i| matches!(
            i,
            Instruction::SignExtend { .. } | Instruction::Truncate { .. }
        )));
    }

    #[test]
    fn test_temporaries_registered_with_types() {
        let (program, symbols) = lower("int main(void) { long a = 1; return (int) (a + 2); }");
        let function = only_function(&program);
        for instruction in &function.instructions {
            if let Some(name) = instruction.dst_var() {
                let entry = symbols.get(name).expect("destination in symbol table");
                assert!(entry.ty.is_scalar());
            }
        }
        // The addition's temporary is long
        let add_dst = function
            .instructions
            .iter()
            .find_map(|i| match i {
                Instruction::Binary { dst, .. } => dst.var_name(),
                _ => None,
            })
            .unwrap();
        assert_eq!(symbols.get(add_dst).unwrap().ty, Type::Long);
    }

    #[test]
    fn test_static_variables_from_symbol_table() {
        let (program, _) = lower(
            "int defined = 7; long tentative; extern int undefined; \
             static long hidden = 9; \
             int main(void) { return defined; }",
        );
        let statics: Vec<_> = program
            .top_levels
            .iter()
            .filter_map(|top_level| match top_level {
                ir::TopLevel::StaticVariable(sv) => Some(sv),
                _ => None,
            })
            .collect();
        let names: Vec<_> = statics.iter().map(|sv| sv.name.as_str()).collect();
        assert_eq!(names, vec!["defined", "hidden", "tentative"]);
        let tentative = statics.iter().find(|sv| sv.name == "tentative").unwrap();
        assert_eq!(tentative.init, StaticInit::Long(0));
        assert!(tentative.global);
        let hidden = statics.iter().find(|sv| sv.name == "hidden").unwrap();
        assert_eq!(hidden.init, StaticInit::Long(9));
        assert!(!hidden.global);
    }

    #[test]
    fn test_static_local_initializer_not_lowered() {
        let (program, _) = lower(
            "int main(void) { static int counter = 5; counter = counter + 1; return counter; }",
        );
        let function = only_function(&program);
        // The first instruction must not be a Copy of the initializer; the
        // data section provides it
        let first = &function.instructions[0];
        assert!(
            !matches!(first, Instruction::Copy { src: Value::Constant(Const::Int(5)), .. }),
            "static initializer was lowered to code"
        );
    }

    #[test]
    fn test_function_call_lowering() {
        let (program, _) = lower(
            "int add(int a, int b) { return a + b; } \
             int main(void) { return add(40, 2); }",
        );
        let main = program
            .top_levels
            .iter()
            .find_map(|top_level| match top_level {
                ir::TopLevel::Function(f) if f.name == "main" => Some(f),
                _ => None,
            })
            .unwrap();
        let call = main
            .instructions
            .iter()
            .find_map(|i| match i {
                Instruction::FunctionCall { name, args, .. } => Some((name, args.len())),
                _ => None,
            })
            .unwrap();
        assert_eq!(call.0, "add");
        assert_eq!(call.1, 2);
    }
}
