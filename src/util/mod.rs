/*!
# Utility module
Various utility functions that tend to be very generic.
*/
/// Generic JSON save/load with transparent gzip support
pub mod json_io;
