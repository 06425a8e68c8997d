//! Debug printers behind the CLI dump switches.

use std::fmt::{self, Write};

use crate::ast::*;
use crate::frontend::analyzer::Analysis;

const INDENT: &str = "  ";

/// Renders the lifted AST as an indented tree.
pub fn dump_program(program: &Program) -> String {
    let mut out = String::new();
    PrettyPrinter::new(&mut out)
        .print_program(program)
        .expect("formatting into a String cannot fail");
    out
}

struct PrettyPrinter<'a, W: Write> {
    out: &'a mut W,
    indent: usize,
}

impl<'a, W: Write> PrettyPrinter<'a, W> {
    fn new(out: &'a mut W) -> Self {
        Self { out, indent: 0 }
    }

    fn line(&mut self, args: fmt::Arguments) -> fmt::Result {
        for _ in 0..self.indent {
            self.out.write_str(INDENT)?;
        }
        writeln!(self.out, "{}", args)
    }

    fn indented<F>(&mut self, f: F) -> fmt::Result
    where
        F: FnOnce(&mut Self) -> fmt::Result,
    {
        self.indent += 1;
        let result = f(self);
        self.indent -= 1;
        result
    }

    fn print_program(&mut self, program: &Program) -> fmt::Result {
        self.line(format_args!("Program"))?;
        self.indented(|pp| {
            for decl in &program.structs {
                pp.line(format_args!("Struct {}", decl.name))?;
                pp.indented(|pp| {
                    for field in &decl.fields {
                        pp.line(format_args!("Field {}: {}", field.name, field.ty))?;
                    }
                    Ok(())
                })?;
            }
            for global in &program.globals {
                pp.line(format_args!("Global {}: {}", global.name, global.ty))?;
            }
            for func in &program.functions {
                pp.print_function(func)?;
            }
            Ok(())
        })
    }

    fn print_function(&mut self, func: &Function) -> fmt::Result {
        let params: Vec<String> = func
            .params
            .iter()
            .map(|p| format!("{}: {}", p.name, p.ty))
            .collect();
        self.line(format_args!(
            "Function {}({}) -> {}",
            func.name,
            params.join(", "),
            func.ret
        ))?;
        self.indented(|pp| {
            for local in &func.locals {
                pp.line(format_args!("Local {}: {}", local.name, local.ty))?;
            }
            for stmt in &func.body {
                pp.print_stmt(stmt)?;
            }
            Ok(())
        })
    }

    fn print_stmt(&mut self, stmt: &Stmt) -> fmt::Result {
        match stmt {
            Stmt::Assign { target, value, .. } => {
                self.line(format_args!("Assign"))?;
                self.indented(|pp| {
                    pp.print_lvalue(target)?;
                    pp.print_expr(value)
                })
            }
            Stmt::If {
                cond,
                then_block,
                else_block,
                ..
            } => {
                self.line(format_args!("If"))?;
                self.indented(|pp| {
                    pp.print_expr(cond)?;
                    pp.line(format_args!("Then"))?;
                    pp.indented(|pp| pp.print_block(then_block))?;
                    if let Some(else_block) = else_block {
                        pp.line(format_args!("Else"))?;
                        pp.indented(|pp| pp.print_block(else_block))?;
                    }
                    Ok(())
                })
            }
            Stmt::While { cond, body, .. } => {
                self.line(format_args!("While"))?;
                self.indented(|pp| {
                    pp.print_expr(cond)?;
                    pp.line(format_args!("Body"))?;
                    pp.indented(|pp| pp.print_block(body))
                })
            }
            Stmt::Return { value, .. } => {
                self.line(format_args!("Return"))?;
                match value {
                    Some(value) => self.indented(|pp| pp.print_expr(value)),
                    None => Ok(()),
                }
            }
            Stmt::Print { value, newline, .. } => {
                let label = if *newline { "Println" } else { "Print" };
                self.line(format_args!("{}", label))?;
                self.indented(|pp| pp.print_expr(value))
            }
            Stmt::Read { target, .. } => {
                self.line(format_args!("Read"))?;
                self.indented(|pp| pp.print_lvalue(target))
            }
            Stmt::Delete { value, .. } => {
                self.line(format_args!("Delete"))?;
                self.indented(|pp| pp.print_expr(value))
            }
            Stmt::Invoke { call, .. } => {
                self.line(format_args!("Invoke"))?;
                self.indented(|pp| pp.print_expr(call))
            }
        }
    }

    fn print_block(&mut self, stmts: &[Stmt]) -> fmt::Result {
        for stmt in stmts {
            self.print_stmt(stmt)?;
        }
        Ok(())
    }

    fn print_expr(&mut self, expr: &Expr) -> fmt::Result {
        match &expr.kind {
            ExprKind::IntLit(value) => self.line(format_args!("IntLit {}", value)),
            ExprKind::BoolLit(value) => self.line(format_args!("BoolLit {}", value)),
            ExprKind::Null => self.line(format_args!("Null")),
            ExprKind::ReadInt => self.line(format_args!("ReadInt")),
            ExprKind::Var(name) => self.line(format_args!("Var {}", name)),
            ExprKind::New(name) => self.line(format_args!("New {}", name)),
            ExprKind::FieldRead { base, field } => {
                self.line(format_args!("FieldRead .{}", field))?;
                self.indented(|pp| pp.print_expr(base))
            }
            ExprKind::Unary { op, operand } => {
                self.line(format_args!("Unary {:?}", op))?;
                self.indented(|pp| pp.print_expr(operand))
            }
            ExprKind::Binary { op, lhs, rhs } => {
                self.line(format_args!("Binary {:?}", op))?;
                self.indented(|pp| {
                    pp.print_expr(lhs)?;
                    pp.print_expr(rhs)
                })
            }
            ExprKind::Call { name, args } => {
                self.line(format_args!("Call {}", name))?;
                self.indented(|pp| {
                    for arg in args {
                        pp.print_expr(arg)?;
                    }
                    Ok(())
                })
            }
        }
    }

    fn print_lvalue(&mut self, lvalue: &Lvalue) -> fmt::Result {
        match &lvalue.kind {
            LvalueKind::Var(name) => self.line(format_args!("Lvalue {}", name)),
            LvalueKind::Field { base, field } => {
                self.line(format_args!("LvalueField .{}", field))?;
                self.indented(|pp| pp.print_lvalue(base))
            }
        }
    }
}

/// Renders the completed symbol tables: struct layouts, globals and
/// per-function scopes with storage classes.
pub fn dump_symbols(program: &Program, analysis: &Analysis) -> String {
    let mut out = String::new();
    write_symbols(&mut out, program, analysis)
        .expect("formatting into a String cannot fail");
    out
}

fn write_symbols(
    out: &mut impl Write,
    program: &Program,
    analysis: &Analysis,
) -> fmt::Result {
    writeln!(out, "STRUCTS")?;
    let mut names: Vec<&str> = analysis.structs.names().collect();
    names.sort_unstable();
    for name in names {
        let info = analysis
            .structs
            .get(name)
            .expect("listed struct name resolves");
        writeln!(out, "{}{}", INDENT, name)?;
        for (field, ty) in &info.fields {
            writeln!(out, "{}{}{}: {}", INDENT, INDENT, field, ty)?;
        }
    }

    writeln!(out, "GLOBALS")?;
    let mut globals: Vec<&VarDecl> = program.globals.iter().collect();
    globals.sort_unstable_by(|a, b| a.name.cmp(&b.name));
    for global in globals {
        writeln!(out, "{}{}: {}", INDENT, global.name, global.ty)?;
    }

    writeln!(out, "FUNCTION SCOPES")?;
    let mut functions: Vec<&Function> = program.functions.iter().collect();
    functions.sort_unstable_by(|a, b| a.name.cmp(&b.name));
    for func in functions {
        writeln!(out, "{}{}() -> {}", INDENT, func.name, func.ret)?;
        for param in &func.params {
            writeln!(
                out,
                "{}{}{}: {} (parameter)",
                INDENT, INDENT, param.name, param.ty
            )?;
        }
        for local in &func.locals {
            writeln!(
                out,
                "{}{}{}: {} (local)",
                INDENT, INDENT, local.name, local.ty
            )?;
        }
    }
    Ok(())
}
