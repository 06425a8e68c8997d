use std::fmt;
use std::fmt::Write;

use crate::ast::Function;
use crate::backend::stack_frame::{StackFrame, MAX_REG_ARGS, WORD_SIZE};
use crate::frontend::symbol_table::StructTable;

/// Context for RISC-V code generation
pub struct RiscvContext<'a> {
    // Accumulates the generated RISC-V code
    out: String,
    pub structs: &'a StructTable,

    frame: StackFrame,
    func_name: String,
    label_count: u32,
}

impl<'a> RiscvContext<'a> {
    pub fn new(structs: &'a StructTable) -> Self {
        RiscvContext {
            out: String::new(),
            structs,
            frame: StackFrame::empty(),
            func_name: String::new(),
            label_count: 0,
        }
    }

    pub fn write_line(&mut self, content: &str) -> fmt::Result {
        writeln!(self.out, "{}", content)
    }

    /// Writes an instruction line with indentation.
    pub fn write_inst(&mut self, args: fmt::Arguments) -> fmt::Result {
        writeln!(self.out, "    {}", args)
    }

    pub fn into_output(self) -> String {
        self.out
    }

    /// Resets per-function state: frame layout and the label counter.
    pub fn enter_function(&mut self, func: &Function) {
        self.frame = StackFrame::new(func);
        self.func_name = func.name.clone();
        self.label_count = 0;
    }

    /// Fresh control-flow label, unique within the function and prefixed
    /// with `.L` so it can never collide with a function symbol.
    pub fn fresh_label(&mut self) -> String {
        let label = format!(".L{}_{}", self.func_name, self.label_count);
        self.label_count += 1;
        label
    }

    pub fn push(&mut self, reg: &str) -> fmt::Result {
        self.write_inst(format_args!("addi sp, sp, -{}", WORD_SIZE))?;
        self.write_inst(format_args!("sw {}, 0(sp)", reg))
    }

    pub fn pop(&mut self, reg: &str) -> fmt::Result {
        self.write_inst(format_args!("lw {}, 0(sp)", reg))?;
        self.write_inst(format_args!("addi sp, sp, {}", WORD_SIZE))
    }

    /// Loads the named variable into `t0`.
    pub fn load_var(&mut self, name: &str) -> fmt::Result {
        match self.frame.offset_of(name) {
            Some(offset) => self.write_inst(format_args!("lw t0, {}(fp)", offset)),
            None => {
                self.write_inst(format_args!("la t0, {}", global_label(name)))?;
                self.write_inst(format_args!("lw t0, 0(t0)"))
            }
        }
    }

    /// Stores `t0` into the named variable's slot. Clobbers `t2` for
    /// globals.
    pub fn store_var(&mut self, name: &str) -> fmt::Result {
        match self.frame.offset_of(name) {
            Some(offset) => self.write_inst(format_args!("sw t0, {}(fp)", offset)),
            None => {
                self.write_inst(format_args!("la t2, {}", global_label(name)))?;
                self.write_inst(format_args!("sw t0, 0(t2)"))
            }
        }
    }

    /// Saves `ra` and the caller's `fp`, establishes the new frame, makes
    /// room for parameter and local slots, and parks incoming register
    /// arguments in theirs.
    pub fn emit_prologue(&mut self, func: &Function) -> fmt::Result {
        self.write_inst(format_args!("addi sp, sp, -8"))?;
        self.write_inst(format_args!("sw ra, 4(sp)"))?;
        self.write_inst(format_args!("sw fp, 0(sp)"))?;
        self.write_inst(format_args!("addi fp, sp, 0"))?;
        if self.frame.size() > 0 {
            self.write_inst(format_args!("addi sp, sp, -{}", self.frame.size()))?;
        }
        for (i, param) in func.params.iter().enumerate().take(MAX_REG_ARGS) {
            let offset = self
                .frame
                .offset_of(&param.name)
                .expect("parameter has a frame slot");
            self.write_inst(format_args!("sw a{}, {}(fp)", i, offset))?;
        }
        Ok(())
    }

    /// Unwinds the frame and returns. Resetting `sp` from `fp` also
    /// discards any scratch words the evaluation stack left behind.
    pub fn emit_epilogue(&mut self) -> fmt::Result {
        self.write_inst(format_args!("addi sp, fp, 0"))?;
        self.write_inst(format_args!("lw fp, 0(sp)"))?;
        self.write_inst(format_args!("lw ra, 4(sp)"))?;
        self.write_inst(format_args!("addi sp, sp, 8"))?;
        self.write_inst(format_args!("jr ra"))
    }

    pub fn struct_size(&self, name: &str) -> i32 {
        let info = self
            .structs
            .get(name)
            .expect("codegen reached an unregistered struct");
        info.fields.len() as i32 * WORD_SIZE
    }

    pub fn field_offset(&self, strukt: &str, field: &str) -> i32 {
        let info = self
            .structs
            .get(strukt)
            .expect("codegen reached an unregistered struct");
        let index = info
            .field_index(field)
            .expect("codegen reached an unknown struct field");
        index as i32 * WORD_SIZE
    }
}

pub fn global_label(name: &str) -> String {
    format!("global_{}", name)
}
