/*!
# Writers module
All output writers consumed by the command-line front-end.
*/
/// JSON export of the derived analytical structures
pub mod analysis_writer;
/// Delimited text export of enriched tables
pub mod table_writer;
