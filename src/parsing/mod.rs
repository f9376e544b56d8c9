/*!
# Parsing module
Contains the logic for parsing input files into meaningful structs / data.
*/
/// Upload validation and the annotation line grammar
pub mod annotation;
/// On-demand loading of the reference database files
pub mod reference_db;
