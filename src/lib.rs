// src/lib.rs

//! upsolve: unsolved competitive-programming problems across judges,
//! rated by clist and exported as JSON and Markdown.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
