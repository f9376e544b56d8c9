/*!
# CLI module
Contains the command line interface definitions and settings checks.
*/
/// Settings for the analyze subcommand
pub mod analyze;
/// Shared CLI definitions and filename checks
pub mod core;
/// Settings for the enrich subcommand
pub mod enrich;
