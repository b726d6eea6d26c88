//! Test utilities for the CFile crates.
//!
//! - [`builder`]: lays out complete CFiles in memory, for any type and encoding.
//! - [`io`]: `ReadAt` wrappers that inject read failures or count reads.
//! - [`data_gen`]: seeded generators of sorted test data.
//!
//! The builder is a fixture generator for tests and is not a supported writer.

pub mod builder;
pub mod data_gen;
pub mod io;

pub use builder::{BlockLayout, CFileBuilder, FileLayout};
