//! Type checker
//!
//! Populates the frontend symbol table, attaches a type to every expression,
//! and inserts implicit casts where the usual conversions require them. The
//! rewritten tree is the input to IR generation; after this pass every
//! expression node carries a type and every identifier has a symbol table
//! entry.
//!
//! File-scope variables follow the C initializer lattice: an explicit
//! constant beats a tentative definition beats a bare `extern` declaration,
//! and two explicit initializers for the same name conflict.

use crate::ast::{
    Block, BlockItem, Declaration, Expression, ExpressionKind, ForInit, FunctionDeclaration,
    Program, Statement, StorageClass, UnaryOperator, VariableDeclaration,
};
use crate::error::CompileError;
use crate::symbols::{IdentifierAttribute, InitialValue, SymbolEntry, SymbolTable};
use crate::types::{Const, StaticInit, Type};

pub struct TypeChecker<'a> {
    symbols: &'a mut SymbolTable,
}

impl<'a> TypeChecker<'a> {
    pub fn new(symbols: &'a mut SymbolTable) -> Self {
        TypeChecker { symbols }
    }

    pub fn check_program(mut self, program: Program) -> Result<Program, CompileError> {
        let mut declarations = Vec::new();
        for declaration in program.declarations {
            let checked = match declaration {
                Declaration::Function(function) => {
                    Declaration::Function(self.check_function_declaration(function)?)
                }
                Declaration::Variable(variable) => {
                    Declaration::Variable(self.check_file_scope_variable_declaration(variable)?)
                }
            };
            declarations.push(checked);
        }
        Ok(Program { declarations })
    }

    fn constant_initializer(
        declaration: &VariableDeclaration,
    ) -> Result<Option<StaticInit>, CompileError> {
        match &declaration.init {
            None => Ok(None),
            Some(expression) => match expression.as_constant() {
                Some(constant) => Ok(Some(Self::static_init(constant, &declaration.ty))),
                None => Err(CompileError::Type(format!(
                    "non-constant initializer for static variable '{}'",
                    declaration.name
                ))),
            },
        }
    }

    fn static_init(constant: Const, ty: &Type) -> StaticInit {
        match ty {
            Type::Int => StaticInit::Int(constant.as_i64() as i32),
            Type::Long => StaticInit::Long(constant.as_i64()),
            Type::Function { .. } => unreachable!("variables never have function type"),
        }
    }

    /// Rewrite the initializer as a typed constant of the declared type so
    /// the tree stays fully typed even though statics are materialized from
    /// the symbol table, not from code.
    fn retype_constant_initializer(mut declaration: VariableDeclaration) -> VariableDeclaration {
        let ty = declaration.ty.clone();
        declaration.init = declaration.init.take().map(|expression| {
            match expression.as_constant() {
                Some(constant) => Expression::typed(
                    ExpressionKind::Constant(constant.convert_to(&ty)),
                    ty.clone(),
                ),
                None => expression,
            }
        });
        declaration
    }

    fn check_file_scope_variable_declaration(
        &mut self,
        declaration: VariableDeclaration,
    ) -> Result<VariableDeclaration, CompileError> {
        let mut initial = match Self::constant_initializer(&declaration)? {
            Some(init) => InitialValue::Initial(init),
            None => {
                if declaration.storage_class == Some(StorageClass::Extern) {
                    InitialValue::NoInitializer
                } else {
                    InitialValue::Tentative
                }
            }
        };
        let mut global = declaration.storage_class != Some(StorageClass::Static);

        if let Some(existing) = self.symbols.get(&declaration.name) {
            if existing.ty != declaration.ty {
                return Err(CompileError::Type(format!(
                    "conflicting declarations of '{}': {} vs {}",
                    declaration.name, existing.ty, declaration.ty
                )));
            }
            let IdentifierAttribute::Static {
                init: existing_init,
                global: existing_global,
            } = existing.attr
            else {
                return Err(CompileError::Type(format!(
                    "'{}' redeclared as a different kind of symbol",
                    declaration.name
                )));
            };
            if declaration.storage_class == Some(StorageClass::Extern) {
                // extern adopts the earlier declaration's linkage
                global = existing_global;
            } else if existing_global != global {
                return Err(CompileError::Type(format!(
                    "conflicting linkage for '{}'",
                    declaration.name
                )));
            }
            match (existing_init, &initial) {
                (InitialValue::Initial(_), InitialValue::Initial(_)) => {
                    return Err(CompileError::Type(format!(
                        "conflicting file-scope definitions of '{}'",
                        declaration.name
                    )));
                }
                (InitialValue::Initial(_), _) => initial = existing_init,
                (InitialValue::Tentative, InitialValue::NoInitializer) => {
                    initial = InitialValue::Tentative;
                }
                _ => {}
            }
        }

        self.symbols.insert(
            declaration.name.clone(),
            SymbolEntry::new(
                declaration.ty.clone(),
                IdentifierAttribute::Static {
                    init: initial,
                    global,
                },
            ),
        );
        Ok(Self::retype_constant_initializer(declaration))
    }

    fn check_function_declaration(
        &mut self,
        function: FunctionDeclaration,
    ) -> Result<FunctionDeclaration, CompileError> {
        let Type::Function {
            params: param_types,
            ret,
        } = function.ty.clone()
        else {
            return Err(CompileError::Type(format!(
                "'{}' declared as a function without a function type",
                function.name
            )));
        };

        let has_body = function.body.is_some();
        let mut already_defined = false;
        let mut global = function.storage_class != Some(StorageClass::Static);

        if let Some(existing) = self.symbols.get(&function.name) {
            if existing.ty != function.ty {
                return Err(CompileError::Type(format!(
                    "incompatible declarations of function '{}'",
                    function.name
                )));
            }
            let IdentifierAttribute::Function {
                defined,
                global: existing_global,
            } = existing.attr
            else {
                return Err(CompileError::Type(format!(
                    "'{}' redeclared as a different kind of symbol",
                    function.name
                )));
            };
            already_defined = defined;
            if defined && has_body {
                return Err(CompileError::Type(format!(
                    "function '{}' defined more than once",
                    function.name
                )));
            }
            if existing_global && function.storage_class == Some(StorageClass::Static) {
                return Err(CompileError::Type(format!(
                    "static declaration of '{}' follows non-static declaration",
                    function.name
                )));
            }
            global = existing_global;
        }

        self.symbols.insert(
            function.name.clone(),
            SymbolEntry::new(
                function.ty.clone(),
                IdentifierAttribute::Function {
                    defined: already_defined || has_body,
                    global,
                },
            ),
        );

        let body = match function.body {
            Some(block) => {
                for (param, param_ty) in function.params.iter().zip(&param_types) {
                    self.symbols
                        .insert(param.clone(), SymbolEntry::local(param_ty.clone()));
                }
                Some(self.check_block(block, &ret)?)
            }
            None => None,
        };

        Ok(FunctionDeclaration {
            name: function.name,
            params: function.params,
            body,
            ty: function.ty,
            storage_class: function.storage_class,
        })
    }

    fn check_block(&mut self, block: Block, return_type: &Type) -> Result<Block, CompileError> {
        let mut items = Vec::new();
        for item in block.items {
            let checked = match item {
                BlockItem::Declaration(Declaration::Variable(declaration)) => {
                    BlockItem::Declaration(Declaration::Variable(
                        self.check_local_variable_declaration(declaration)?,
                    ))
                }
                BlockItem::Declaration(Declaration::Function(function)) => {
                    BlockItem::Declaration(Declaration::Function(
                        self.check_function_declaration(function)?,
                    ))
                }
                BlockItem::Statement(statement) => {
                    BlockItem::Statement(self.check_statement(statement, return_type)?)
                }
            };
            items.push(checked);
        }
        Ok(Block { items })
    }

    fn check_local_variable_declaration(
        &mut self,
        declaration: VariableDeclaration,
    ) -> Result<VariableDeclaration, CompileError> {
        match declaration.storage_class {
            Some(StorageClass::Extern) => {
                if declaration.init.is_some() {
                    return Err(CompileError::Type(format!(
                        "initializer on local extern declaration of '{}'",
                        declaration.name
                    )));
                }
                if let Some(existing) = self.symbols.get(&declaration.name) {
                    if existing.ty != declaration.ty {
                        return Err(CompileError::Type(format!(
                            "conflicting declarations of '{}'",
                            declaration.name
                        )));
                    }
                } else {
                    self.symbols.insert(
                        declaration.name.clone(),
                        SymbolEntry::new(
                            declaration.ty.clone(),
                            IdentifierAttribute::Static {
                                init: InitialValue::NoInitializer,
                                global: true,
                            },
                        ),
                    );
                }
                Ok(declaration)
            }
            Some(StorageClass::Static) => {
                let init = match Self::constant_initializer(&declaration)? {
                    Some(init) => init,
                    None => StaticInit::zero(&declaration.ty),
                };
                self.symbols.insert(
                    declaration.name.clone(),
                    SymbolEntry::new(
                        declaration.ty.clone(),
                        IdentifierAttribute::Static {
                            init: InitialValue::Initial(init),
                            global: false,
                        },
                    ),
                );
                Ok(Self::retype_constant_initializer(declaration))
            }
            None => {
                self.symbols.insert(
                    declaration.name.clone(),
                    SymbolEntry::local(declaration.ty.clone()),
                );
                let mut declaration = declaration;
                declaration.init = match declaration.init.take() {
                    Some(expression) => {
                        let checked = self.check_expression(expression)?;
                        Some(Self::convert_to(checked, &declaration.ty))
                    }
                    None => None,
                };
                Ok(declaration)
            }
        }
    }

    fn check_statement(
        &mut self,
        statement: Statement,
        return_type: &Type,
    ) -> Result<Statement, CompileError> {
        match statement {
            Statement::Return(expression) => {
                let checked = self.check_expression(expression)?;
                Ok(Statement::Return(Self::convert_to(checked, return_type)))
            }
            Statement::Expression(expression) => {
                Ok(Statement::Expression(self.check_expression(expression)?))
            }
            Statement::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let condition = self.check_expression(condition)?;
                let then_branch = Box::new(self.check_statement(*then_branch, return_type)?);
                let else_branch = match else_branch {
                    Some(statement) => {
                        Some(Box::new(self.check_statement(*statement, return_type)?))
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
                Ok(Statement::Compound(self.check_block(block, return_type)?))
            }
            Statement::While {
                condition,
                body,
                label,
            } => Ok(Statement::While {
                condition: self.check_expression(condition)?,
                body: Box::new(self.check_statement(*body, return_type)?),
                label,
            }),
            Statement::DoWhile {
                body,
                condition,
                label,
            } => Ok(Statement::DoWhile {
                body: Box::new(self.check_statement(*body, return_type)?),
                condition: self.check_expression(condition)?,
                label,
            }),
            Statement::For {
                init,
                condition,
                post,
                body,
                label,
            } => {
                let init = match init {
                    ForInit::Declaration(declaration) => {
                        if declaration.storage_class.is_some() {
                            return Err(CompileError::Type(format!(
                                "storage class on '{}' in a for-loop initializer",
                                declaration.name
                            )));
                        }
                        ForInit::Declaration(self.check_local_variable_declaration(declaration)?)
                    }
                    ForInit::Expression(Some(expression)) => {
                        ForInit::Expression(Some(self.check_expression(expression)?))
                    }
                    ForInit::Expression(None) => ForInit::Expression(None),
                };
                let condition = match condition {
                    Some(expression) => Some(self.check_expression(expression)?),
                    None => None,
                };
                let post = match post {
                    Some(expression) => Some(self.check_expression(expression)?),
                    None => None,
                };
                let body = Box::new(self.check_statement(*body, return_type)?);
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

    /// Wrap `expression` in a cast to `target` unless it already has that type.
    fn convert_to(expression: Expression, target: &Type) -> Expression {
        if expression.ty.as_ref() == Some(target) {
            expression
        } else {
            Expression::typed(
                ExpressionKind::Cast {
                    target: target.clone(),
                    inner: Box::new(expression),
                },
                target.clone(),
            )
        }
    }

    fn check_expression(&mut self, expression: Expression) -> Result<Expression, CompileError> {
        match expression.kind {
            ExpressionKind::Constant(constant) => Ok(Expression::typed(
                ExpressionKind::Constant(constant),
                constant.ty(),
            )),
            ExpressionKind::Var(name) => {
                let entry = self
                    .symbols
                    .get(&name)
                    .ok_or_else(|| CompileError::Type(format!("undeclared variable '{}'", name)))?;
                if !entry.ty.is_scalar() {
                    return Err(CompileError::Type(format!(
                        "function '{}' used as a variable",
                        name
                    )));
                }
                let ty = entry.ty.clone();
                Ok(Expression::typed(ExpressionKind::Var(name), ty))
            }
            ExpressionKind::Cast { target, inner } => {
                let inner = self.check_expression(*inner)?;
                Ok(Expression::typed(
                    ExpressionKind::Cast {
                        target: target.clone(),
                        inner: Box::new(inner),
                    },
                    target,
                ))
            }
            ExpressionKind::Unary { op, inner } => {
                let inner = self.check_expression(*inner)?;
                let ty = match op {
                    UnaryOperator::Not => Type::Int,
                    UnaryOperator::Negate | UnaryOperator::Complement => {
                        inner.ty().map_err(CompileError::Type)?.clone()
                    }
                };
                Ok(Expression::typed(
                    ExpressionKind::Unary {
                        op,
                        inner: Box::new(inner),
                    },
                    ty,
                ))
            }
            ExpressionKind::Binary { op, lhs, rhs } => {
                let lhs = self.check_expression(*lhs)?;
                let rhs = self.check_expression(*rhs)?;
                if op.is_logical() {
                    // && and || test their operands without converting them
                    return Ok(Expression::typed(
                        ExpressionKind::Binary {
                            op,
                            lhs: Box::new(lhs),
                            rhs: Box::new(rhs),
                        },
                        Type::Int,
                    ));
                }
                let lhs_ty = lhs.ty().map_err(CompileError::Type)?.clone();
                let rhs_ty = rhs.ty().map_err(CompileError::Type)?.clone();
                let common = Type::common_type(&lhs_ty, &rhs_ty);
                let lhs = Self::convert_to(lhs, &common);
                let rhs = Self::convert_to(rhs, &common);
                let ty = if op.is_comparison() { Type::Int } else { common };
                Ok(Expression::typed(
                    ExpressionKind::Binary {
                        op,
                        lhs: Box::new(lhs),
                        rhs: Box::new(rhs),
                    },
                    ty,
                ))
            }
            ExpressionKind::Assignment { lhs, rhs } => {
                let lhs = self.check_expression(*lhs)?;
                let rhs = self.check_expression(*rhs)?;
                let target = lhs.ty().map_err(CompileError::Type)?.clone();
                let rhs = Self::convert_to(rhs, &target);
                Ok(Expression::typed(
                    ExpressionKind::Assignment {
                        lhs: Box::new(lhs),
                        rhs: Box::new(rhs),
                    },
                    target,
                ))
            }
            ExpressionKind::Conditional {
                condition,
                then_branch,
                else_branch,
            } => {
                let condition = self.check_expression(*condition)?;
                let then_branch = self.check_expression(*then_branch)?;
                let else_branch = self.check_expression(*else_branch)?;
                let then_ty = then_branch.ty().map_err(CompileError::Type)?.clone();
                let else_ty = else_branch.ty().map_err(CompileError::Type)?.clone();
                let common = Type::common_type(&then_ty, &else_ty);
                Ok(Expression::typed(
                    ExpressionKind::Conditional {
                        condition: Box::new(condition),
                        then_branch: Box::new(Self::convert_to(then_branch, &common)),
                        else_branch: Box::new(Self::convert_to(else_branch, &common)),
                    },
                    common,
                ))
            }
            ExpressionKind::FunctionCall { name, args } => {
                let entry = self.symbols.get(&name).ok_or_else(|| {
                    CompileError::Type(format!("call to undefined function '{}'", name))
                })?;
                let Type::Function {
                    params: param_types,
                    ret,
                } = entry.ty.clone()
                else {
                    return Err(CompileError::Type(format!(
                        "variable '{}' used as a function",
                        name
                    )));
                };
                if args.len() != param_types.len() {
                    return Err(CompileError::Type(format!(
                        "function '{}' called with {} argument(s) but declared with {}",
                        name,
                        args.len(),
                        param_types.len()
                    )));
                }
                let mut converted = Vec::new();
                for (arg, param_ty) in args.into_iter().zip(&param_types) {
                    let checked = self.check_expression(arg)?;
                    converted.push(Self::convert_to(checked, param_ty));
                }
                Ok(Expression::typed(
                    ExpressionKind::FunctionCall {
                        name,
                        args: converted,
                    },
                    *ret,
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::resolver::Resolver;

    fn check(source: &str) -> Result<(Program, SymbolTable), CompileError> {
        let (resolved, _) = Resolver::new().resolve_program(parse(source).unwrap())?;
        let mut symbols = SymbolTable::new();
        let checked = TypeChecker::new(&mut symbols).check_program(resolved)?;
        Ok((checked, symbols))
    }

    fn assert_fully_typed(expression: &Expression) {
        assert!(expression.ty.is_some(), "untyped expression: {:?}", expression);
        match &expression.kind {
            ExpressionKind::Cast { inner, .. } | ExpressionKind::Unary { inner, .. } => {
                assert_fully_typed(inner)
            }
            ExpressionKind::Binary { lhs, rhs, .. }
            | ExpressionKind::Assignment { lhs, rhs } => {
                assert_fully_typed(lhs);
                assert_fully_typed(rhs);
            }
            ExpressionKind::Conditional {
                condition,
                then_branch,
                else_branch,
            } => {
                assert_fully_typed(condition);
                assert_fully_typed(then_branch);
                assert_fully_typed(else_branch);
            }
            ExpressionKind::FunctionCall { args, .. } => {
                args.iter().for_each(assert_fully_typed);
            }
            ExpressionKind::Constant(_) | ExpressionKind::Var(_) => {}
        }
    }

    fn first_function_body(program: &Program) -> &Block {
        for declaration in &program.declarations {
            if let Declaration::Function(function) = declaration
                && let Some(body) = &function.body
            {
                return body;
            }
        }
        panic!("no function definition in program");
    }

    #[test]
    fn test_every_expression_gets_a_type() {
        let (program, _) = check(
            "long scale(int a, long b) { return a * b; } \
             int main(void) { int x = 3; return x < 4 ? scale(x, 10L) > 0 : !x; }",
        )
        .unwrap();
        for item in &first_function_body(&program).items {
            match item {
                BlockItem::Statement(Statement::Return(e)) => assert_fully_typed(e),
                BlockItem::Declaration(Declaration::Variable(v)) => {
                    if let Some(init) = &v.init {
                        assert_fully_typed(init);
                    }
                }
                _ => {}
            }
        }
    }

    #[test]
    fn test_common_type_inserts_cast() {
        let (program, _) = check("int main(void) { long a = 1; int b = 2; return a < b; }")
            .unwrap();
        let body = first_function_body(&program);
        let BlockItem::Statement(Statement::Return(e)) = &body.items[2] else {
            panic!("expected return");
        };
        // a < b compares longs, so b gets a cast to long; the result is int
        assert_eq!(e.ty, Some(Type::Int));
        let ExpressionKind::Binary { rhs, .. } = &e.kind else {
            panic!("expected comparison");
        };
        assert!(matches!(
            rhs.kind,
            ExpressionKind::Cast {
                target: Type::Long,
                ..
            }
        ));
        assert_eq!(rhs.ty, Some(Type::Long));
    }

    #[test]
    fn test_logical_operands_not_converted() {
        let (program, _) = check("int main(void) { long a = 1; return a && 1; }").unwrap();
        let body = first_function_body(&program);
        let BlockItem::Statement(Statement::Return(e)) = &body.items[1] else {
            panic!("expected return");
        };
        assert_eq!(e.ty, Some(Type::Int));
        let ExpressionKind::Binary { lhs, .. } = &e.kind else {
            panic!("expected binary");
        };
        // The long operand keeps its type; no cast inserted
        assert_eq!(lhs.ty, Some(Type::Long));
        assert!(matches!(lhs.kind, ExpressionKind::Var(_)));
    }

    #[test]
    fn test_call_arguments_converted_to_param_types() {
        let (program, symbols) =
            check("long f(long x) { return x; } int main(void) { return (int) f(3); }").unwrap();
        let entry = symbols.get("f").unwrap();
        assert!(matches!(
            entry.attr,
            IdentifierAttribute::Function {
                defined: true,
                global: true
            }
        ));
        let body = first_function_body(&program);
        let BlockItem::Statement(Statement::Return(_)) = &body.items[0] else {
            panic!("expected return");
        };
        // main's return finds f(3) with the int argument cast to long
        let Declaration::Function(main) = &program.declarations[1] else {
            panic!("expected main");
        };
        let BlockItem::Statement(Statement::Return(e)) = &main.body.as_ref().unwrap().items[0]
        else {
            panic!("expected return");
        };
        let ExpressionKind::Cast { inner, .. } = &e.kind else {
            panic!("expected cast");
        };
        let ExpressionKind::FunctionCall { args, .. } = &inner.kind else {
            panic!("expected call");
        };
        assert!(matches!(
            args[0].kind,
            ExpressionKind::Cast {
                target: Type::Long,
                ..
            }
        ));
    }

    #[test]
    fn test_arity_mismatch() {
        let err = check("int f(int a); int main(void) { return f(1, 2); }").unwrap_err();
        assert!(err.to_string().starts_with("Type error:"));
    }

    #[test]
    fn test_function_used_as_variable() {
        assert!(check("int f(void); int main(void) { return f + 1; }").is_err());
    }

    #[test]
    fn test_variable_used_as_function() {
        assert!(check("int main(void) { int a = 1; return a(); }").is_err());
    }

    #[test]
    fn test_conflicting_function_declarations() {
        assert!(check("int f(int a); long f(int a); int main(void) { return 0; }").is_err());
    }

    #[test]
    fn test_duplicate_function_definition() {
        assert!(check("int f(void) { return 1; } int f(void) { return 2; }").is_err());
    }

    #[test]
    fn test_static_after_non_static_function() {
        assert!(check("int f(void); static int f(void) { return 1; }").is_err());
    }

    #[test]
    fn test_file_scope_initializer_lattice() {
        // Tentative then explicit: explicit wins
        let (_, symbols) = check("int x; int x = 3;").unwrap();
        let IdentifierAttribute::Static { init, global } = symbols.get("x").unwrap().attr else {
            panic!("expected static attribute");
        };
        assert_eq!(init, InitialValue::Initial(StaticInit::Int(3)));
        assert!(global);

        // Two explicit initializers conflict
        assert!(check("int x = 1; int x = 2;").is_err());

        // extern alone defines nothing
        let (_, symbols) = check("extern long y;").unwrap();
        let IdentifierAttribute::Static { init, .. } = symbols.get("y").unwrap().attr else {
            panic!("expected static attribute");
        };
        assert_eq!(init, InitialValue::NoInitializer);
    }

    #[test]
    fn test_static_file_scope_variable_not_global() {
        let (_, symbols) = check("static int hidden = 5;").unwrap();
        let IdentifierAttribute::Static { global, .. } =
            symbols.get("hidden").unwrap().attr
        else {
            panic!("expected static attribute");
        };
        assert!(!global);
    }

    #[test]
    fn test_conflicting_linkage() {
        assert!(check("static int x; int x;").is_err());
    }

    #[test]
    fn test_local_static_requires_constant_initializer() {
        assert!(check("int main(void) { int a = 1; static int b = a; return b; }").is_err());
        let (_, symbols) =
            check("int main(void) { static long c; return (int) c; }").unwrap();
        // An uninitialized local static is zero-initialized, not tentative
        let found = symbols
            .iter()
            .find(|(name, _)| name.starts_with("c."))
            .expect("renamed static local in table");
        let IdentifierAttribute::Static { init, global } = found.1.attr else {
            panic!("expected static attribute");
        };
        assert_eq!(init, InitialValue::Initial(StaticInit::Long(0)));
        assert!(!global);
    }

    #[test]
    fn test_local_extern_with_initializer_rejected() {
        assert!(check("int main(void) { extern int x = 3; return x; }").is_err());
    }

    #[test]
    fn test_storage_class_in_for_init_rejected() {
        assert!(
            check("int main(void) { for (static int i = 0; i < 3; i = i + 1) ; return 0; }")
                .is_err()
        );
    }

    #[test]
    fn test_non_constant_file_scope_initializer() {
        assert!(check("int x = 1; int y = x;").is_err());
    }
}
