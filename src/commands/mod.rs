// ABOUTME: Command implementations for the dumper CLI
// ABOUTME: Exports the dump and verify commands

pub mod dump;
pub mod verify;

pub use dump::dump;
pub use verify::verify;
