use std::fmt;

use crate::ast::*;
use crate::backend::riscv_context::{global_label, RiscvContext};
use crate::backend::stack_frame::{MAX_REG_ARGS, WORD_SIZE};
use crate::frontend::types::Type;

/// Trait for generating RISC-V code from AST nodes. Every expression
/// leaves its result in `t0` and restores `sp` to where it found it.
pub trait GenerateRiscv {
    fn generate(&self, ctx: &mut RiscvContext) -> fmt::Result;
}

impl GenerateRiscv for Program {
    fn generate(&self, ctx: &mut RiscvContext) -> fmt::Result {
        ctx.write_inst(format_args!(".data"))?;
        for global in &self.globals {
            ctx.write_line(&format!("{}: .word 0", global_label(&global.name)))?;
        }

        ctx.write_inst(format_args!(".text"))?;
        ctx.write_inst(format_args!(".globl main"))?;
        for func in &self.functions {
            func.generate(ctx)?;
        }
        Ok(())
    }
}

impl GenerateRiscv for Function {
    fn generate(&self, ctx: &mut RiscvContext) -> fmt::Result {
        ctx.enter_function(self);
        ctx.write_line(&format!("{}:", self.name))?;
        ctx.emit_prologue(self)?;

        for stmt in &self.body {
            stmt.generate(ctx)?;
        }

        // Falling off the end is reachable only for void returns; the
        // analyzer already rejected it elsewhere
        if !matches!(self.body.last(), Some(Stmt::Return { .. })) {
            ctx.emit_epilogue()?;
        }
        ctx.write_line("")
    }
}

impl GenerateRiscv for Stmt {
    fn generate(&self, ctx: &mut RiscvContext) -> fmt::Result {
        match self {
            Stmt::Assign { target, value, .. } => match &target.kind {
                LvalueKind::Var(name) => {
                    value.generate(ctx)?;
                    ctx.store_var(name)
                }
                LvalueKind::Field { .. } => {
                    // Target address first: the rhs may clobber t0-t2
                    target.address(ctx)?;
                    ctx.push("t0")?;
                    value.generate(ctx)?;
                    ctx.pop("t2")?;
                    ctx.write_inst(format_args!("sw t0, 0(t2)"))
                }
            },
            Stmt::If {
                cond,
                then_block,
                else_block,
                ..
            } => {
                cond.generate(ctx)?;
                match else_block {
                    Some(else_block) => {
                        let else_label = ctx.fresh_label();
                        let end_label = ctx.fresh_label();
                        ctx.write_inst(format_args!("beq t0, x0, {}", else_label))?;
                        for stmt in then_block {
                            stmt.generate(ctx)?;
                        }
                        ctx.write_inst(format_args!("j {}", end_label))?;
                        ctx.write_line(&format!("{}:", else_label))?;
                        for stmt in else_block {
                            stmt.generate(ctx)?;
                        }
                        ctx.write_line(&format!("{}:", end_label))
                    }
                    None => {
                        let end_label = ctx.fresh_label();
                        ctx.write_inst(format_args!("beq t0, x0, {}", end_label))?;
                        for stmt in then_block {
                            stmt.generate(ctx)?;
                        }
                        ctx.write_line(&format!("{}:", end_label))
                    }
                }
            }
            Stmt::While { cond, body, .. } => {
                let top_label = ctx.fresh_label();
                let end_label = ctx.fresh_label();
                ctx.write_line(&format!("{}:", top_label))?;
                cond.generate(ctx)?;
                ctx.write_inst(format_args!("beq t0, x0, {}", end_label))?;
                for stmt in body {
                    stmt.generate(ctx)?;
                }
                ctx.write_inst(format_args!("j {}", top_label))?;
                ctx.write_line(&format!("{}:", end_label))
            }
            Stmt::Return { value, .. } => {
                if let Some(value) = value {
                    value.generate(ctx)?;
                    ctx.write_inst(format_args!("mv a0, t0"))?;
                }
                ctx.emit_epilogue()
            }
            Stmt::Print { value, newline, .. } => {
                value.generate(ctx)?;
                ctx.write_inst(format_args!("mv a0, t0"))?;
                if *newline {
                    ctx.write_inst(format_args!("jal print_int_newline"))
                } else {
                    ctx.write_inst(format_args!("jal print_int"))
                }
            }
            Stmt::Read { target, .. } => match &target.kind {
                LvalueKind::Var(name) => {
                    ctx.write_inst(format_args!("jal read_int"))?;
                    ctx.write_inst(format_args!("mv t0, a0"))?;
                    ctx.store_var(name)
                }
                LvalueKind::Field { .. } => {
                    target.address(ctx)?;
                    ctx.push("t0")?;
                    ctx.write_inst(format_args!("jal read_int"))?;
                    ctx.write_inst(format_args!("mv t0, a0"))?;
                    ctx.pop("t2")?;
                    ctx.write_inst(format_args!("sw t0, 0(t2)"))
                }
            },
            Stmt::Delete { value, .. } => {
                value.generate(ctx)?;
                ctx.write_inst(format_args!("mv a0, t0"))?;
                ctx.write_inst(format_args!("jal free"))
            }
            Stmt::Invoke { call, .. } => call.generate(ctx),
        }
    }
}

impl GenerateRiscv for Expr {
    fn generate(&self, ctx: &mut RiscvContext) -> fmt::Result {
        match &self.kind {
            ExprKind::IntLit(value) => ctx.write_inst(format_args!("li t0, {}", value)),
            ExprKind::BoolLit(value) => {
                ctx.write_inst(format_args!("li t0, {}", *value as i32))
            }
            ExprKind::Null => ctx.write_inst(format_args!("li t0, 0")),
            ExprKind::Var(name) => ctx.load_var(name),
            ExprKind::FieldRead { base, field } => {
                base.generate(ctx)?;
                let offset = ctx.field_offset(struct_name_of(base), field);
                ctx.write_inst(format_args!("lw t0, {}(t0)", offset))
            }
            ExprKind::Unary { op, operand } => {
                operand.generate(ctx)?;
                match op {
                    UnaryOp::Neg => ctx.write_inst(format_args!("neg t0, t0")),
                    UnaryOp::Not => ctx.write_inst(format_args!("xori t0, t0, 1")),
                }
            }
            ExprKind::Binary { op, lhs, rhs } => {
                lhs.generate(ctx)?;
                ctx.push("t0")?;
                rhs.generate(ctx)?;
                ctx.pop("t1")?;
                // Left operand in t1, right in t0
                match op {
                    BinaryOp::Add => ctx.write_inst(format_args!("add t0, t1, t0")),
                    BinaryOp::Sub => ctx.write_inst(format_args!("sub t0, t1, t0")),
                    BinaryOp::Mul => ctx.write_inst(format_args!("mul t0, t1, t0")),
                    BinaryOp::Div => ctx.write_inst(format_args!("div t0, t1, t0")),
                    BinaryOp::Lt => ctx.write_inst(format_args!("slt t0, t1, t0")),
                    BinaryOp::Gt => ctx.write_inst(format_args!("slt t0, t0, t1")),
                    BinaryOp::Leq => {
                        ctx.write_inst(format_args!("slt t0, t0, t1"))?;
                        ctx.write_inst(format_args!("xori t0, t0, 1"))
                    }
                    BinaryOp::Geq => {
                        ctx.write_inst(format_args!("slt t0, t1, t0"))?;
                        ctx.write_inst(format_args!("xori t0, t0, 1"))
                    }
                    BinaryOp::Eq => {
                        ctx.write_inst(format_args!("sub t0, t1, t0"))?;
                        ctx.write_inst(format_args!("seqz t0, t0"))
                    }
                    BinaryOp::Neq => {
                        ctx.write_inst(format_args!("sub t0, t1, t0"))?;
                        ctx.write_inst(format_args!("snez t0, t0"))
                    }
                    // Operands are 0/1 words, and both sides are always
                    // evaluated: no short-circuiting
                    BinaryOp::And => ctx.write_inst(format_args!("and t0, t1, t0")),
                    BinaryOp::Or => ctx.write_inst(format_args!("or t0, t1, t0")),
                }
            }
            ExprKind::Call { name, args } => {
                // Right-to-left pushes leave argument 1 on top for the
                // register pops and argument 9 at sp+0 for the callee
                for arg in args.iter().rev() {
                    arg.generate(ctx)?;
                    ctx.push("t0")?;
                }
                for i in 0..args.len().min(MAX_REG_ARGS) {
                    ctx.pop(&format!("a{}", i))?;
                }
                ctx.write_inst(format_args!("jal {}", name))?;
                if args.len() > MAX_REG_ARGS {
                    let stack_args = (args.len() - MAX_REG_ARGS) as i32;
                    ctx.write_inst(format_args!(
                        "addi sp, sp, {}",
                        stack_args * WORD_SIZE
                    ))?;
                }
                ctx.write_inst(format_args!("mv t0, a0"))
            }
            ExprKind::New(name) => {
                let size = ctx.struct_size(name);
                ctx.write_inst(format_args!("li a0, {}", size))?;
                ctx.write_inst(format_args!("jal malloc"))?;
                ctx.write_inst(format_args!("mv t0, a0"))
            }
            ExprKind::ReadInt => {
                ctx.write_inst(format_args!("jal read_int"))?;
                ctx.write_inst(format_args!("mv t0, a0"))
            }
        }
    }
}

impl Lvalue {
    /// Loads the lvalue's current value into `t0`.
    fn load(&self, ctx: &mut RiscvContext) -> fmt::Result {
        match &self.kind {
            LvalueKind::Var(name) => ctx.load_var(name),
            LvalueKind::Field { base, field } => {
                base.load(ctx)?;
                let offset = ctx.field_offset(lvalue_struct_name_of(base), field);
                ctx.write_inst(format_args!("lw t0, {}(t0)", offset))
            }
        }
    }

    /// Computes the address of a field target into `t0`: the parent
    /// pointer chain is loaded and the field offset added. Variable
    /// targets have static slots and never come through here.
    fn address(&self, ctx: &mut RiscvContext) -> fmt::Result {
        let LvalueKind::Field { base, field } = &self.kind else {
            unreachable!("variable targets are stored through their slot");
        };
        base.load(ctx)?;
        let offset = ctx.field_offset(lvalue_struct_name_of(base), field);
        ctx.write_inst(format_args!("addi t0, t0, {}", offset))
    }
}

fn struct_name_of(expr: &Expr) -> &str {
    match &expr.ty {
        Some(Type::Struct(name)) => name,
        other => panic!(
            "field access on a value annotated {:?}; analyzer must reject this",
            other
        ),
    }
}

fn lvalue_struct_name_of(lvalue: &Lvalue) -> &str {
    match &lvalue.ty {
        Some(Type::Struct(name)) => name,
        other => panic!(
            "field target on a value annotated {:?}; analyzer must reject this",
            other
        ),
    }
}
