// cilc — CIL policy resolver
//
// Library root. The resolver passes live in their own modules.

pub mod ast;
pub mod datum;
pub mod db;
pub mod decl;
pub mod diag;
pub mod expand;
pub mod expr;
pub mod id;
pub mod mls;
pub mod order;
pub mod pass;
pub mod pipeline;
pub mod resolve;
pub mod rules;
pub mod strpool;
pub mod symtab;
