// src/lib.rs
// codeshell - Python syntax classification and chat relay for a browser terminal

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod config;
pub mod console;
pub mod http;
pub mod llm;
pub mod syntax;
pub mod web;

pub use syntax::{Classification, ClassifyError, classify};
