//! Backend worker: owns the controller and executes UI commands one at a time.

pub mod commands;
pub mod runtime;
