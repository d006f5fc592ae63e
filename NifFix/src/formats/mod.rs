//! File format parsers
//!
//! Only the Gamebryo NIF container is supported. Parsing goes exactly as far
//! as needed to find mesh index data; everything else is skipped by size.

pub mod nif;

pub use nif::{NifFile, NifHeader, NifVersion};
