//! Domain model of the timeline context.

pub mod background;
pub mod branch;
pub mod commands;
pub mod effective;
pub mod interpreter;
pub mod seek;
pub mod session;
