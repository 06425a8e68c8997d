use lalrpop_util::lalrpop_mod;

pub mod ast;
pub mod backend;
pub mod frontend;

lalrpop_mod!(pub mini);
