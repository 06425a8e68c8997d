mod riscv_context;
mod riscv_generator;
mod stack_frame;

use std::fmt;

use crate::ast::Program;
use crate::frontend::Analysis;
use riscv_context::RiscvContext;
use riscv_generator::GenerateRiscv;

/// Lowers a semantically valid, type-annotated program to RV32IM
/// assembly text. Any inconsistency found here is a compiler bug and
/// panics rather than emitting wrong code.
pub fn emit_riscv(program: &Program, analysis: &Analysis) -> Result<String, fmt::Error> {
    let mut ctx = RiscvContext::new(&analysis.structs);
    program.generate(&mut ctx)?;
    Ok(ctx.into_output())
}
