use lalrpop_util::lalrpop_mod;

lalrpop_mod!(pub grammar, "/frontend/grammar.rs");

pub mod lexer;
