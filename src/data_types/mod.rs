/*!
# Data types module
Contains the shared data structures passed between pipeline stages.
*/
/// Annotation records produced by the input parser
pub mod annotation;
/// Reference database schema variants and their declared columns
pub mod schema;
/// The column-oriented table backing every pipeline stage
pub mod table;
