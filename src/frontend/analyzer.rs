use std::collections::HashSet;

use crate::ast::*;
use crate::frontend::diagnostics::Diagnostic;
use crate::frontend::symbol_table::{
    FunctionTable, ScopeStack, Signature, StorageClass, StructInfo, StructTable,
};
use crate::frontend::types::Type;

/// Completed symbol tables of a well-formed program. Handed to the code
/// generator read-only.
#[derive(Debug)]
pub struct Analysis {
    pub structs: StructTable,
    pub functions: FunctionTable,
}

/// Checks the whole program and annotates every expression and lvalue
/// with its type. Returns the diagnostics, sorted by source line, if any
/// fault was found; code generation must not run in that case.
pub fn analyze(program: &mut Program) -> Result<Analysis, Vec<Diagnostic>> {
    let mut ctx = AnalyzerContext::new();

    collect_structs(program, &mut ctx);
    collect_functions(program, &mut ctx);
    resolve_field_types(program, &mut ctx);

    // Root value scope holds the globals; function scopes nest inside it
    ctx.scopes.push();
    analyze_globals(program, &mut ctx);
    for func in &mut program.functions {
        func.analyze(&mut ctx);
    }
    check_entry_point(program, &mut ctx);
    ctx.scopes.pop();

    if ctx.diagnostics.is_empty() {
        Ok(Analysis {
            structs: ctx.structs,
            functions: ctx.functions,
        })
    } else {
        let mut diagnostics = ctx.diagnostics;
        diagnostics.sort_by_key(Diagnostic::line);
        Err(diagnostics)
    }
}

struct AnalyzerContext {
    structs: StructTable,
    functions: FunctionTable,
    scopes: ScopeStack,
    diagnostics: Vec<Diagnostic>,
    current_return: Type,
}

impl AnalyzerContext {
    fn new() -> Self {
        AnalyzerContext {
            structs: StructTable::new(),
            functions: FunctionTable::new(),
            scopes: ScopeStack::new(),
            diagnostics: Vec::new(),
            current_return: Type::Void,
        }
    }

    fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// A declared variable type must name a registered struct if it is a
    /// struct type at all.
    fn check_declared_type(&mut self, ty: &Type, line: u32) {
        if let Type::Struct(name) = ty {
            if !self.structs.contains(name) {
                self.report(Diagnostic::UnknownStruct {
                    name: name.clone(),
                    line,
                });
            }
        }
    }
}

fn collect_structs(program: &Program, ctx: &mut AnalyzerContext) {
    for decl in &program.structs {
        let mut seen = HashSet::new();
        for field in &decl.fields {
            if !seen.insert(field.name.as_str()) {
                ctx.report(Diagnostic::DuplicateInScope {
                    name: field.name.clone(),
                    line: field.line,
                });
            }
        }
        let info = StructInfo {
            fields: decl
                .fields
                .iter()
                .map(|f| (f.name.clone(), f.ty.clone()))
                .collect(),
        };
        if !ctx.structs.insert(&decl.name, info) {
            ctx.report(Diagnostic::DuplicateStruct {
                name: decl.name.clone(),
                line: decl.line,
            });
        }
    }
}

fn collect_functions(program: &Program, ctx: &mut AnalyzerContext) {
    for func in &program.functions {
        let sig = Signature {
            params: func.params.iter().map(|p| p.ty.clone()).collect(),
            ret: func.ret.clone(),
        };
        if !ctx.functions.insert(&func.name, sig) {
            ctx.report(Diagnostic::DuplicateFunction {
                name: func.name.clone(),
                line: func.line,
            });
        }
    }
}

/// Field types may reference structs declared later (or the struct
/// itself), so their resolution waits until every struct is registered.
fn resolve_field_types(program: &Program, ctx: &mut AnalyzerContext) {
    for decl in &program.structs {
        for field in &decl.fields {
            if let Type::Struct(name) = &field.ty {
                if !ctx.structs.contains(name) {
                    ctx.report(Diagnostic::UnknownStruct {
                        name: name.clone(),
                        line: field.line,
                    });
                }
            }
        }
    }
}

fn analyze_globals(program: &Program, ctx: &mut AnalyzerContext) {
    for global in &program.globals {
        ctx.check_declared_type(&global.ty, global.line);
        if !ctx
            .scopes
            .declare(&global.name, global.ty.clone(), StorageClass::Global)
        {
            ctx.report(Diagnostic::DuplicateInScope {
                name: global.name.clone(),
                line: global.line,
            });
        }
    }
}

/// The runtime startup glue jumps to `main()`, so it must exist and have
/// the `fun main() int` shape.
fn check_entry_point(program: &Program, ctx: &mut AnalyzerContext) {
    match program.functions.iter().find(|f| f.name == "main") {
        None => ctx.report(Diagnostic::UnknownFunction {
            name: "main".into(),
            line: 0,
        }),
        Some(main) => {
            if !main.params.is_empty() {
                ctx.report(Diagnostic::ArityMismatch {
                    name: "main".into(),
                    expected: 0,
                    found: main.params.len(),
                    line: main.line,
                });
            }
            if main.ret != Type::Int {
                ctx.report(Diagnostic::TypeMismatch {
                    message: "`main` must return int".into(),
                    line: main.line,
                });
            }
        }
    }
}

trait Analyze {
    fn analyze(&mut self, ctx: &mut AnalyzerContext);
}

impl Analyze for Function {
    fn analyze(&mut self, ctx: &mut AnalyzerContext) {
        ctx.current_return = self.ret.clone();
        ctx.scopes.push();

        for param in &self.params {
            ctx.check_declared_type(&param.ty, param.line);
            if !ctx
                .scopes
                .declare(&param.name, param.ty.clone(), StorageClass::Parameter)
            {
                ctx.report(Diagnostic::DuplicateInScope {
                    name: param.name.clone(),
                    line: param.line,
                });
            }
        }
        // Locals start indeterminate; declarations carry no initializer
        for local in &self.locals {
            ctx.check_declared_type(&local.ty, local.line);
            if !ctx
                .scopes
                .declare(&local.name, local.ty.clone(), StorageClass::Local)
            {
                ctx.report(Diagnostic::DuplicateInScope {
                    name: local.name.clone(),
                    line: local.line,
                });
            }
        }

        for stmt in &mut self.body {
            stmt.analyze(ctx);
        }

        if self.ret != Type::Void && !block_returns(&self.body) {
            ctx.report(Diagnostic::MissingReturn {
                function: self.name.clone(),
                line: self.line,
            });
        }

        ctx.scopes.pop();
    }
}

impl Analyze for Stmt {
    fn analyze(&mut self, ctx: &mut AnalyzerContext) {
        match self {
            Stmt::Assign {
                target,
                value,
                line,
            } => {
                let target_ty = target.check(ctx);
                let value_ty = value.check(ctx);
                if let (Some(target_ty), Some(value_ty)) = (target_ty, value_ty) {
                    if !target_ty.accepts(&value_ty) {
                        ctx.report(Diagnostic::TypeMismatch {
                            message: format!("cannot assign {} to {}", value_ty, target_ty),
                            line: *line,
                        });
                    }
                }
            }
            Stmt::If {
                cond,
                then_block,
                else_block,
                line,
            } => {
                if let Some(ty) = cond.check(ctx) {
                    if ty != Type::Bool {
                        ctx.report(Diagnostic::InvalidCondition {
                            found: ty,
                            line: *line,
                        });
                    }
                }
                analyze_block(then_block, ctx);
                if let Some(else_block) = else_block {
                    analyze_block(else_block, ctx);
                }
            }
            Stmt::While { cond, body, line } => {
                if let Some(ty) = cond.check(ctx) {
                    if ty != Type::Bool {
                        ctx.report(Diagnostic::InvalidCondition {
                            found: ty,
                            line: *line,
                        });
                    }
                }
                analyze_block(body, ctx);
            }
            Stmt::Return { value, line } => match value {
                None => {
                    if ctx.current_return != Type::Void {
                        ctx.report(Diagnostic::InvalidReturn {
                            message: "non-void function must return a value".into(),
                            line: *line,
                        });
                    }
                }
                Some(expr) => {
                    let ty = expr.check(ctx);
                    if ctx.current_return == Type::Void {
                        ctx.report(Diagnostic::InvalidReturn {
                            message: "void function cannot return a value".into(),
                            line: *line,
                        });
                    } else if let Some(ty) = ty {
                        if !ctx.current_return.accepts(&ty) {
                            let message =
                                format!("expected {}, found {}", ctx.current_return, ty);
                            ctx.report(Diagnostic::InvalidReturn {
                                message,
                                line: *line,
                            });
                        }
                    }
                }
            },
            Stmt::Print { value, line, .. } => {
                if let Some(ty) = value.check(ctx) {
                    if ty != Type::Int {
                        ctx.report(Diagnostic::InvalidPrintOperand {
                            found: ty,
                            line: *line,
                        });
                    }
                }
            }
            Stmt::Read { target, line } => {
                if let Some(ty) = target.check(ctx) {
                    if ty != Type::Int {
                        ctx.report(Diagnostic::InvalidReadTarget {
                            found: ty,
                            line: *line,
                        });
                    }
                }
            }
            Stmt::Delete { value, line } => {
                if let Some(ty) = value.check(ctx) {
                    if !ty.is_struct() {
                        ctx.report(Diagnostic::InvalidDelete {
                            found: ty,
                            line: *line,
                        });
                    }
                }
            }
            Stmt::Invoke { call, .. } => {
                // Result discarded; a void callee is fine here
                call.check(ctx);
            }
        }
    }
}

fn analyze_block(stmts: &mut [Stmt], ctx: &mut AnalyzerContext) {
    ctx.scopes.push();
    for stmt in stmts {
        stmt.analyze(ctx);
    }
    ctx.scopes.pop();
}

/// Syntactic return-reachability: a block returns iff its last statement
/// does, `if`/`else` returns iff both branches do, and a loop never
/// counts. Conservative on purpose.
fn block_returns(stmts: &[Stmt]) -> bool {
    stmts.last().map_or(false, stmt_returns)
}

fn stmt_returns(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::Return { .. } => true,
        Stmt::If {
            then_block,
            else_block: Some(else_block),
            ..
        } => block_returns(then_block) && block_returns(else_block),
        _ => false,
    }
}

impl Expr {
    /// Infers this expression's type, records it in the annotation, and
    /// reports any fault. An untypable subexpression yields `None` and
    /// silences the checks above it.
    fn check(&mut self, ctx: &mut AnalyzerContext) -> Option<Type> {
        let line = self.line;
        let ty = match &mut self.kind {
            ExprKind::IntLit(_) => Some(Type::Int),
            ExprKind::BoolLit(_) => Some(Type::Bool),
            ExprKind::Null => Some(Type::Null),
            ExprKind::ReadInt => Some(Type::Int),
            ExprKind::Var(name) => match ctx.scopes.resolve(name) {
                Some(entry) => Some(entry.ty.clone()),
                None => {
                    ctx.report(Diagnostic::UnknownName {
                        name: name.clone(),
                        line,
                    });
                    None
                }
            },
            ExprKind::New(name) => {
                if ctx.structs.contains(name) {
                    Some(Type::Struct(name.clone()))
                } else {
                    ctx.report(Diagnostic::UnknownStruct {
                        name: name.clone(),
                        line,
                    });
                    None
                }
            }
            ExprKind::FieldRead { base, field } => match base.check(ctx) {
                None => None,
                Some(Type::Struct(strukt)) => {
                    check_field(&strukt, field, line, ctx)
                }
                Some(found) => {
                    ctx.report(Diagnostic::TypeMismatch {
                        message: format!(
                            "field access requires a struct value, found {}",
                            found
                        ),
                        line,
                    });
                    None
                }
            },
            ExprKind::Unary { op, operand } => match (*op, operand.check(ctx)) {
                (_, None) => None,
                (UnaryOp::Neg, Some(ty)) => {
                    if ty != Type::Int {
                        ctx.report(Diagnostic::TypeMismatch {
                            message: "negation requires an int operand".into(),
                            line,
                        });
                    }
                    Some(Type::Int)
                }
                (UnaryOp::Not, Some(ty)) => {
                    if ty != Type::Bool {
                        ctx.report(Diagnostic::TypeMismatch {
                            message: "logical not requires a bool operand".into(),
                            line,
                        });
                    }
                    Some(Type::Bool)
                }
            },
            ExprKind::Binary { op, lhs, rhs } => {
                let lhs_ty = lhs.check(ctx);
                let rhs_ty = rhs.check(ctx);
                match (lhs_ty, rhs_ty) {
                    (Some(lhs_ty), Some(rhs_ty)) => {
                        Some(check_binary(*op, lhs_ty, rhs_ty, line, ctx))
                    }
                    _ => None,
                }
            }
            ExprKind::Call { name, args } => {
                let mut arg_types = Vec::with_capacity(args.len());
                for arg in args.iter_mut() {
                    arg_types.push(arg.check(ctx));
                }
                match ctx.functions.get(name).cloned() {
                    None => {
                        ctx.report(Diagnostic::UnknownFunction {
                            name: name.clone(),
                            line,
                        });
                        None
                    }
                    Some(sig) => {
                        if sig.params.len() != arg_types.len() {
                            ctx.report(Diagnostic::ArityMismatch {
                                name: name.clone(),
                                expected: sig.params.len(),
                                found: arg_types.len(),
                                line,
                            });
                        } else {
                            for (i, (param_ty, arg_ty)) in
                                sig.params.iter().zip(&arg_types).enumerate()
                            {
                                if let Some(arg_ty) = arg_ty {
                                    if !param_ty.accepts(arg_ty) {
                                        ctx.report(Diagnostic::TypeMismatch {
                                            message: format!(
                                                "argument {} of `{}`: expected {}, found {}",
                                                i + 1,
                                                name,
                                                param_ty,
                                                arg_ty
                                            ),
                                            line,
                                        });
                                    }
                                }
                            }
                        }
                        Some(sig.ret)
                    }
                }
            }
        };
        self.ty = ty.clone();
        ty
    }
}

impl Lvalue {
    fn check(&mut self, ctx: &mut AnalyzerContext) -> Option<Type> {
        let line = self.line;
        let ty = match &mut self.kind {
            LvalueKind::Var(name) => match ctx.scopes.resolve(name) {
                Some(entry) => Some(entry.ty.clone()),
                None => {
                    ctx.report(Diagnostic::UnknownName {
                        name: name.clone(),
                        line,
                    });
                    None
                }
            },
            LvalueKind::Field { base, field } => match base.check(ctx) {
                None => None,
                Some(Type::Struct(strukt)) => {
                    check_field(&strukt, field, line, ctx)
                }
                Some(found) => {
                    ctx.report(Diagnostic::TypeMismatch {
                        message: format!(
                            "field access requires a struct value, found {}",
                            found
                        ),
                        line,
                    });
                    None
                }
            },
        };
        self.ty = ty.clone();
        ty
    }
}

fn check_field(
    strukt: &str,
    field: &str,
    line: u32,
    ctx: &mut AnalyzerContext,
) -> Option<Type> {
    // An unregistered struct type was already reported at the declaration
    // that introduced it; stay silent here.
    let field_ty = ctx
        .structs
        .get(strukt)
        .map(|info| info.field_type(field).cloned());
    match field_ty {
        None => None,
        Some(Some(ty)) => Some(ty),
        Some(None) => {
            ctx.report(Diagnostic::UnknownField {
                strukt: strukt.to_string(),
                field: field.to_string(),
                line,
            });
            None
        }
    }
}

fn check_binary(
    op: BinaryOp,
    lhs: Type,
    rhs: Type,
    line: u32,
    ctx: &mut AnalyzerContext,
) -> Type {
    match op {
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
            if lhs != Type::Int || rhs != Type::Int {
                ctx.report(Diagnostic::TypeMismatch {
                    message: "arithmetic requires int operands".into(),
                    line,
                });
            }
            Type::Int
        }
        BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Leq | BinaryOp::Geq => {
            if lhs != Type::Int || rhs != Type::Int {
                ctx.report(Diagnostic::TypeMismatch {
                    message: "comparison requires int operands".into(),
                    line,
                });
            }
            Type::Bool
        }
        BinaryOp::Eq | BinaryOp::Neq => {
            let ok = lhs == rhs
                || (lhs == Type::Null && rhs.is_struct())
                || (rhs == Type::Null && lhs.is_struct());
            if !ok {
                ctx.report(Diagnostic::TypeMismatch {
                    message: format!("cannot compare {} with {}", lhs, rhs),
                    line,
                });
            }
            Type::Bool
        }
        BinaryOp::And | BinaryOp::Or => {
            if lhs != Type::Bool || rhs != Type::Bool {
                ctx.report(Diagnostic::TypeMismatch {
                    message: "logical operators require bool operands".into(),
                    line,
                });
            }
            Type::Bool
        }
    }
}
