//! Loop labeling
//!
//! Attaches a fresh `loop<N>` label to every loop and resolves each `break`
//! and `continue` to the label of its innermost enclosing loop. Runs after
//! type checking; IR generation derives `break_<label>` and
//! `continue_<label>` jump targets from these labels.

use crate::ast::{Block, BlockItem, Declaration, FunctionDeclaration, Program, Statement};
use crate::error::CompileError;

pub struct LoopLabeler {
    counter: usize,
}

impl LoopLabeler {
    pub fn new() -> Self {
        LoopLabeler { counter: 0 }
    }

    pub fn label_program(mut self, program: Program) -> Result<Program, CompileError> {
        let mut declarations = Vec::new();
        for declaration in program.declarations {
            let labeled = match declaration {
                Declaration::Function(function) => {
                    Declaration::Function(self.label_function(function)?)
                }
                other => other,
            };
            declarations.push(labeled);
        }
        Ok(Program { declarations })
    }

    fn fresh_label(&mut self) -> String {
        let label = format!("loop{}", self.counter);
        self.counter += 1;
        label
    }

    fn label_function(
        &mut self,
        mut function: FunctionDeclaration,
    ) -> Result<FunctionDeclaration, CompileError> {
        function.body = match function.body.take() {
            Some(block) => Some(self.label_block(block, "")?),
            None => None,
        };
        Ok(function)
    }

    fn label_block(&mut self, block: Block, current: &str) -> Result<Block, CompileError> {
        let mut items = Vec::new();
        for item in block.items {
            let labeled = match item {
                BlockItem::Statement(statement) => {
                    BlockItem::Statement(self.label_statement(statement, current)?)
                }
                declaration => declaration,
            };
            items.push(labeled);
        }
        Ok(Block { items })
    }

    fn label_statement(
        &mut self,
        statement: Statement,
        current: &str,
    ) -> Result<Statement, CompileError> {
        match statement {
            Statement::While {
                condition, body, ..
            } => {
                let label = self.fresh_label();
                Ok(Statement::While {
                    condition,
                    body: Box::new(self.label_statement(*body, &label)?),
                    label,
                })
            }
            Statement::DoWhile {
                body, condition, ..
            } => {
                let label = self.fresh_label();
                Ok(Statement::DoWhile {
                    body: Box::new(self.label_statement(*body, &label)?),
                    condition,
                    label,
                })
            }
            Statement::For {
                init,
                condition,
                post,
                body,
                ..
            } => {
                let label = self.fresh_label();
                Ok(Statement::For {
                    init,
                    condition,
                    post,
                    body: Box::new(self.label_statement(*body, &label)?),
                    label,
                })
            }
            Statement::Break { .. } => {
                if current.is_empty() {
                    return Err(CompileError::LoopLabeling(
                        "break statement outside of a loop".to_string(),
                    ));
                }
                Ok(Statement::Break {
                    label: current.to_string(),
                })
            }
            Statement::Continue { .. } => {
                if current.is_empty() {
                    return Err(CompileError::LoopLabeling(
                        "continue statement outside of a loop".to_string(),
                    ));
                }
                Ok(Statement::Continue {
                    label: current.to_string(),
                })
            }
            Statement::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let then_branch = Box::new(self.label_statement(*then_branch, current)?);
                let else_branch = match else_branch {
                    Some(statement) => {
                        Some(Box::new(self.label_statement(*statement, current)?))
                    }
                    None => None,
                };
                Ok(Statement::If {
                    condition,
                    then_branch,
                    else_branch,
                })
            }
            Statement::Compound(block) => {
                Ok(Statement::Compound(self.label_block(block, current)?))
            }
            other => Ok(other),
        }
    }
}

impl Default for LoopLabeler {
    fn default() -> Self {
        Self::new()
    }
}
