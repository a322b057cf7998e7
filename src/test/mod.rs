//! Test support shared by the unit tests.
//!
//! The [`builder`] produces complete synthetic assemblies, so no test depends on binaries
//! checked into the repository.

pub mod builder;
