
/// Command line interface functionality
pub mod cli;
/// Hierarchical clustering of samples by shared orthologs
pub mod clustering;
/// Contains various shared data types
pub mod data_types;
/// Compound-profile grouping and the greedy minimum set cover
pub mod grouping;
/// The reference database merge pipeline
pub mod merge;
/// Per-variant column representation optimization
pub mod optimizer;
/// Tooling for parsing input files into meaningful structs / data
pub mod parsing;
/// Various utility functions that tend to be very generic
pub mod util;
/// All output writers
pub mod writers;
