//! CLI subcommands.

pub mod demo;
pub mod inspect;
pub mod validate;
