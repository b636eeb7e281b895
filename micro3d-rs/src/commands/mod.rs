//! Command implementations for the micro3d-rs CLI

pub mod action;
pub mod figure;
