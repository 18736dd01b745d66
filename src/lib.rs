//! Taxotree library main entry point.

pub mod common;
pub mod db;
pub mod taxonomy;
