// ABOUTME: Library module for sqlite-dumper
// ABOUTME: Exports the dump engine and commands for use in the binary and tests

pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod filters;
pub mod utils;
