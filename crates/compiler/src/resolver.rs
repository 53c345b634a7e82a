//! Identifier resolution
//!
//! Renames every local variable to a globally unique `<name>.<counter>` form
//! so later passes never have to track scopes, checks for duplicate and
//! undeclared identifiers, and validates assignment targets. Identifiers with
//! linkage (functions, file-scope variables, `extern` locals) keep their
//! source names.
//!
//! Each scope gets a copy of its parent's resolution map with
//! `from_current_scope` cleared, so shadowing is allowed across scopes and
//! rejected within one.

use crate::ast::{
    Block, BlockItem, Declaration, Expression, ExpressionKind, ForInit, FunctionDeclaration,
    Program, Statement, StorageClass, VariableDeclaration,
};
use crate::error::CompileError;
use std::collections::HashMap;

#[derive(Debug, Clone)]
struct MapEntry {
    unique_name: String,
    from_current_scope: bool,
    has_linkage: bool,
}

type ResolutionMap = HashMap<String, MapEntry>;

/// Copy a map for a nested scope: inherited entries are no longer "current".
fn copy_for_nested_scope(map: &ResolutionMap) -> ResolutionMap {
    map.iter()
        .map(|(name, entry)| {
            (
                name.clone(),
                MapEntry {
                    from_current_scope: false,
                    ..entry.clone()
                },
            )
        })
        .collect()
}

pub struct Resolver {
    /// Monotonic counter for unique names; handed to the IR generator so
    /// temporaries never collide with resolved locals.
    counter: usize,
}

impl Resolver {
    pub fn new() -> Self {
        Resolver { counter: 0 }
    }

    /// Resolve a program, returning the rewritten tree and the running
    /// counter for later fresh-name generation.
    pub fn resolve_program(
        mut self,
        program: Program,
    ) -> Result<(Program, usize), CompileError> {
        let mut file_scope = ResolutionMap::new();
        let mut declarations = Vec::new();
        for declaration in program.declarations {
            let resolved = match declaration {
                Declaration::Function(function) => Declaration::Function(
                    self.resolve_function_declaration(function, &mut file_scope)?,
                ),
                Declaration::Variable(variable) => Declaration::Variable(
                    Self::resolve_file_scope_variable_declaration(variable, &mut file_scope),
                ),
            };
            declarations.push(resolved);
        }
        Ok((Program { declarations }, self.counter))
    }

    fn make_unique_name(&mut self, name: &str) -> String {
        let unique = format!("{}.{}", name, self.counter);
        self.counter += 1;
        unique
    }

    /// File-scope variables keep their names and always have linkage.
    /// Conflicts are the type checker's business.
    fn resolve_file_scope_variable_declaration(
        declaration: VariableDeclaration,
        map: &mut ResolutionMap,
    ) -> VariableDeclaration {
        map.insert(
            declaration.name.clone(),
            MapEntry {
                unique_name: declaration.name.clone(),
                from_current_scope: true,
                has_linkage: true,
            },
        );
        declaration
    }

    fn resolve_function_declaration(
        &mut self,
        function: FunctionDeclaration,
        map: &mut ResolutionMap,
    ) -> Result<FunctionDeclaration, CompileError> {
        if let Some(existing) = map.get(&function.name)
            && existing.from_current_scope
            && !existing.has_linkage
        {
            return Err(CompileError::IdentifierResolution(format!(
                "'{}' redeclared as a function",
                function.name
            )));
        }
        map.insert(
            function.name.clone(),
            MapEntry {
                unique_name: function.name.clone(),
                from_current_scope: true,
                has_linkage: true,
            },
        );

        // Parameters live in a fresh scope that the body shares.
        let mut inner_map = copy_for_nested_scope(map);
        let mut params = Vec::new();
        for param in function.params {
            params.push(self.resolve_param(param, &mut inner_map)?);
        }
        let body = match function.body {
            Some(block) => Some(self.resolve_block(block, &mut inner_map)?),
            None => None,
        };
        Ok(FunctionDeclaration {
            name: function.name,
            params,
            body,
            ty: function.ty,
            storage_class: function.storage_class,
        })
    }

    fn resolve_param(
        &mut self,
        name: String,
        map: &mut ResolutionMap,
    ) -> Result<String, CompileError> {
        if map.get(&name).is_some_and(|e| e.from_current_scope) {
            return Err(CompileError::IdentifierResolution(format!(
                "duplicate parameter name '{}'",
                name
            )));
        }
        let unique = self.make_unique_name(&name);
        map.insert(
            name,
            MapEntry {
                unique_name: unique.clone(),
                from_current_scope: true,
                has_linkage: false,
            },
        );
        Ok(unique)
    }

    fn resolve_block(
        &mut self,
        block: Block,
        map: &mut ResolutionMap,
    ) -> Result<Block, CompileError> {
        let mut items = Vec::new();
        for item in block.items {
            let resolved = match item {
                BlockItem::Declaration(Declaration::Variable(declaration)) => {
                    BlockItem::Declaration(Declaration::Variable(
                        self.resolve_local_variable_declaration(declaration, map)?,
                    ))
                }
                BlockItem::Declaration(Declaration::Function(function)) => {
                    if function.body.is_some() {
                        return Err(CompileError::IdentifierResolution(format!(
                            "nested definition of function '{}'",
                            function.name
                        )));
                    }
                    if function.storage_class == Some(StorageClass::Static) {
                        return Err(CompileError::IdentifierResolution(format!(
                            "block-scope function '{}' declared static",
                            function.name
                        )));
                    }
                    BlockItem::Declaration(Declaration::Function(
                        self.resolve_function_declaration(function, map)?,
                    ))
                }
                BlockItem::Statement(statement) => {
                    BlockItem::Statement(self.resolve_statement(statement, map)?)
                }
            };
            items.push(resolved);
        }
        Ok(Block { items })
    }

    fn resolve_local_variable_declaration(
        &mut self,
        declaration: VariableDeclaration,
        map: &mut ResolutionMap,
    ) -> Result<VariableDeclaration, CompileError> {
        if let Some(existing) = map.get(&declaration.name)
            && existing.from_current_scope
            && !(existing.has_linkage
                && declaration.storage_class == Some(StorageClass::Extern))
        {
            return Err(CompileError::IdentifierResolution(format!(
                "duplicate declaration of '{}'",
                declaration.name
            )));
        }

        if declaration.storage_class == Some(StorageClass::Extern) {
            // extern locals refer to file-scope storage: keep the name
            map.insert(
                declaration.name.clone(),
                MapEntry {
                    unique_name: declaration.name.clone(),
                    from_current_scope: true,
                    has_linkage: true,
                },
            );
            return Ok(declaration);
        }

        let unique = self.make_unique_name(&declaration.name);
        map.insert(
            declaration.name,
            MapEntry {
                unique_name: unique.clone(),
                from_current_scope: true,
                has_linkage: false,
            },
        );
        let init = match declaration.init {
            Some(expression) => Some(self.resolve_expression(expression, map)?),
            None => None,
        };
        Ok(VariableDeclaration {
            name: unique,
            init,
            ty: declaration.ty,
            storage_class: declaration.storage_class,
        })
    }

    fn resolve_statement(
        &mut self,
        statement: Statement,
        map: &mut ResolutionMap,
    ) -> Result<Statement, CompileError> {
        match statement {
            Statement::Return(expression) => {
                Ok(Statement::Return(self.resolve_expression(expression, map)?))
            }
            Statement::Expression(expression) => Ok(Statement::Expression(
                self.resolve_expression(expression, map)?,
            )),
            Statement::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let condition = self.resolve_expression(condition, map)?;
                let then_branch = Box::new(self.resolve_statement(*then_branch, map)?);
                let else_branch = match else_branch {
                    Some(statement) => Some(Box::new(self.resolve_statement(*statement, map)?)),
                    None => None,
                };
                Ok(Statement::If {
                    condition,
                    then_branch,
                    else_branch,
                })
            }
            Statement::Compound(block) => {
                let mut inner_map = copy_for_nested_scope(map);
                Ok(Statement::Compound(
                    self.resolve_block(block, &mut inner_map)?,
                ))
            }
            Statement::While {
                condition,
                body,
                label,
            } => Ok(Statement::While {
                condition: self.resolve_expression(condition, map)?,
                body: Box::new(self.resolve_statement(*body, map)?),
                label,
            }),
            Statement::DoWhile {
                body,
                condition,
                label,
            } => Ok(Statement::DoWhile {
                body: Box::new(self.resolve_statement(*body, map)?),
                condition: self.resolve_expression(condition, map)?,
                label,
            }),
            Statement::For {
                init,
                condition,
                post,
                body,
                label,
            } => {
                // The for-init opens its own scope enclosing the whole loop
                let mut inner_map = copy_for_nested_scope(map);
                let init = match init {
                    ForInit::Declaration(declaration) => ForInit::Declaration(
                        self.resolve_local_variable_declaration(declaration, &mut inner_map)?,
                    ),
                    ForInit::Expression(Some(expression)) => ForInit::Expression(Some(
                        self.resolve_expression(expression, &mut inner_map)?,
                    )),
                    ForInit::Expression(None) => ForInit::Expression(None),
                };
                let condition = match condition {
                    Some(expression) => {
                        Some(self.resolve_expression(expression, &mut inner_map)?)
                    }
                    None => None,
                };
                let post = match post {
                    Some(expression) => {
                        Some(self.resolve_expression(expression, &mut inner_map)?)
                    }
                    None => None,
                };
                let body = Box::new(self.resolve_statement(*body, &mut inner_map)?);
                Ok(Statement::For {
                    init,
                    condition,
                    post,
                    body,
                    label,
                })
            }
            Statement::Break { label } => Ok(Statement::Break { label }),
            Statement::Continue { label } => Ok(Statement::Continue { label }),
            Statement::Null => Ok(Statement::Null),
        }
    }

    fn resolve_expression(
        &mut self,
        expression: Expression,
        map: &mut ResolutionMap,
    ) -> Result<Expression, CompileError> {
        let kind = match expression.kind {
            ExpressionKind::Constant(c) => ExpressionKind::Constant(c),
            ExpressionKind::Var(name) => match map.get(&name) {
                Some(entry) => ExpressionKind::Var(entry.unique_name.clone()),
                None => {
                    return Err(CompileError::IdentifierResolution(format!(
                        "undeclared variable '{}'",
                        name
                    )));
                }
            },
            ExpressionKind::Cast { target, inner } => ExpressionKind::Cast {
                target,
                inner: Box::new(self.resolve_expression(*inner, map)?),
            },
            ExpressionKind::Unary { op, inner } => ExpressionKind::Unary {
                op,
                inner: Box::new(self.resolve_expression(*inner, map)?),
            },
            ExpressionKind::Binary { op, lhs, rhs } => ExpressionKind::Binary {
                op,
                lhs: Box::new(self.resolve_expression(*lhs, map)?),
                rhs: Box::new(self.resolve_expression(*rhs, map)?),
            },
            ExpressionKind::Assignment { lhs, rhs } => {
                let lhs = self.resolve_expression(*lhs, map)?;
                if !lhs.is_lvalue() {
                    return Err(CompileError::IdentifierResolution(
                        "invalid lvalue in assignment".to_string(),
                    ));
                }
                ExpressionKind::Assignment {
                    lhs: Box::new(lhs),
                    rhs: Box::new(self.resolve_expression(*rhs, map)?),
                }
            }
            ExpressionKind::Conditional {
                condition,
                then_branch,
                else_branch,
            } => ExpressionKind::Conditional {
                condition: Box::new(self.resolve_expression(*condition, map)?),
                then_branch: Box::new(self.resolve_expression(*then_branch, map)?),
                else_branch: Box::new(self.resolve_expression(*else_branch, map)?),
            },
            ExpressionKind::FunctionCall { name, args } => {
                let resolved_name = match map.get(&name) {
                    Some(entry) => entry.unique_name.clone(),
                    None => {
                        return Err(CompileError::IdentifierResolution(format!(
                            "call to undeclared function '{}'",
                            name
                        )));
                    }
                };
                let mut resolved_args = Vec::new();
                for arg in args {
                    resolved_args.push(self.resolve_expression(arg, map)?);
                }
                ExpressionKind::FunctionCall {
                    name: resolved_name,
                    args: resolved_args,
                }
            }
        };
        Ok(Expression {
            kind,
            ty: expression.ty,
        })
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn resolve(source: &str) -> Result<(Program, usize), CompileError> {
        Resolver::new().resolve_program(parse(source).unwrap())
    }

    fn collect_var_names(expression: &Expression, out: &mut Vec<String>) {
        match &expression.kind {
            ExpressionKind::Var(name) => out.push(name.clone()),
            ExpressionKind::Cast { inner, .. } | ExpressionKind::Unary { inner, .. } => {
                collect_var_names(inner, out)
            }
            ExpressionKind::Binary { lhs, rhs, .. }
            | ExpressionKind::Assignment { lhs, rhs } => {
                collect_var_names(lhs, out);
                collect_var_names(rhs, out);
            }
            ExpressionKind::Conditional {
                condition,
                then_branch,
                else_branch,
            } => {
                collect_var_names(condition, out);
                collect_var_names(then_branch, out);
                collect_var_names(else_branch, out);
            }
            ExpressionKind::FunctionCall { args, .. } => {
                for arg in args {
                    collect_var_names(arg, out);
                }
            }
            ExpressionKind::Constant(_) => {}
        }
    }

    #[test]
    fn test_locals_get_unique_names() {
        let (program, counter) =
            resolve("int main(void) { int a = 1; { int a = 2; } return a; }").unwrap();
        let Declaration::Function(function) = &program.declarations[0] else {
            panic!("expected function");
        };
        let body = function.body.as_ref().unwrap();
        let BlockItem::Declaration(Declaration::Variable(outer)) = &body.items[0] else {
            panic!("expected declaration");
        };
        let BlockItem::Statement(Statement::Compound(inner_block)) = &body.items[1] else {
            panic!("expected compound");
        };
        let BlockItem::Declaration(Declaration::Variable(inner)) = &inner_block.items[0] else {
            panic!("expected declaration");
        };
        assert_ne!(outer.name, inner.name);
        assert!(outer.name.starts_with("a."));
        assert!(inner.name.starts_with("a."));
        assert_eq!(counter, 2);

        // The trailing `return a;` refers to the outer unique name
        let BlockItem::Statement(Statement::Return(expression)) = &body.items[2] else {
            panic!("expected return");
        };
        let mut names = Vec::new();
        collect_var_names(expression, &mut names);
        assert_eq!(names, vec![outer.name.clone()]);
    }

    #[test]
    fn test_duplicate_declaration_in_same_scope() {
        let err = resolve("int main(void) { int a = 1; int a = 2; return a; }").unwrap_err();
        assert!(err.to_string().starts_with("Identifier resolution error:"));
    }

    #[test]
    fn test_undeclared_variable() {
        assert!(resolve("int main(void) { return b; }").is_err());
    }

    #[test]
    fn test_use_before_declaration_in_scope() {
        assert!(resolve("int main(void) { int a = b; int b = 1; return a; }").is_err());
    }

    #[test]
    fn test_invalid_lvalue() {
        let err = resolve("int main(void) { int a = 1; 2 = a; return a; }").unwrap_err();
        assert!(err.to_string().contains("lvalue"));
    }

    #[test]
    fn test_extern_local_keeps_name() {
        let (program, _) =
            resolve("int x; int main(void) { extern int x; return x; }").unwrap();
        let Declaration::Function(function) = &program.declarations[1] else {
            panic!("expected function");
        };
        let BlockItem::Declaration(Declaration::Variable(declaration)) =
            &function.body.as_ref().unwrap().items[0]
        else {
            panic!("expected declaration");
        };
        assert_eq!(declaration.name, "x");
    }

    #[test]
    fn test_duplicate_parameters_rejected() {
        assert!(resolve("int f(int a, int a);").is_err());
    }

    #[test]
    fn test_nested_function_definition_rejected() {
        assert!(resolve("int main(void) { int f(void) { return 1; } return f(); }").is_err());
    }

    #[test]
    fn test_call_to_undeclared_function() {
        assert!(resolve("int main(void) { return f(); }").is_err());
    }

    #[test]
    fn test_for_init_scope_encloses_body() {
        let (_, counter) =
            resolve("int main(void) { for (int i = 0; i < 3; i = i + 1) { int i = 9; } return 0; }")
                .unwrap();
        // One unique name for the loop variable, one for the shadowing body local
        assert_eq!(counter, 2);
    }
}
