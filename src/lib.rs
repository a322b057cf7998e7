// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]

//! # cilstrip
//!
//! Strips the executable CIL method bodies out of .NET assemblies while keeping their complete
//! structural metadata. The result is a "shell" assembly: every type, member, signature and
//! attribute is still there, but each method body is reduced to an empty instruction stream and
//! all manifest resources are gone. Shell assemblies are useful for interface inspection, for
//! linking against, or for distributing an API surface without its implementation.
//!
//! ## Features
//!
//! - **📦 Whole-file parsing** - PE headers, CLI header, metadata streams, all tables and every IL
//!   body are decoded up front
//! - **🔗 Reference resolution** - required assembly references are located in search
//!   directories and the installed framework, transitively, with cycle detection
//! - **✂️ Minimal rewriting** - only bodies, resource rows and resource payloads change, every
//!   other byte of the image is kept
//! - **⚡ Batches** - many files in one run, optionally on the rayon thread pool, with per-file
//!   error isolation
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cilstrip::prelude::*;
//! use std::path::{Path, PathBuf};
//!
//! let inputs = vec![PathBuf::from("bin/Library.dll")];
//! let outcomes = Driver::new("out").process(&inputs, &LogObserver);
//! for outcome in &outcomes {
//!     match &outcome.result {
//!         Ok(stats) => println!("{}: {} bodies", outcome.output.display(), stats.bodies_truncated),
//!         Err(error) => eprintln!("{}: {error}", outcome.input.display()),
//!     }
//! }
//! ```
//!
//! ### Step by step
//!
//! ```rust,no_run
//! use cilstrip::{load, strip, write, ModuleCache, NoFallback, Resolver};
//! use std::{path::Path, sync::Arc};
//!
//! let input = Path::new("bin/Library.dll");
//! let mut resolver = Resolver::for_input(input, &[], Arc::new(NoFallback), ModuleCache::default());
//!
//! let mut module = load(input, &mut resolver)?;
//! let stats = strip(&mut module);
//! write(&module, Path::new("out/Library.dll"))?;
//! println!("removed {} instructions", stats.instructions_removed);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! - [`metadata`] - ECMA-335 structures: CLI header, streams, tables, method bodies
//! - [`module`] - the object graph of one loaded assembly
//! - [`Resolver`] and [`Loader`] - turning files into modules with their dependencies
//! - [`strip()`] - truncating all bodies and dropping the resources
//! - [`write()`] - serializing the stripped module
//! - [`Driver`] - processing a batch of files, reporting to an [`Observer`]
//! - [`Error`], [`LoadError`], [`WriteError`], [`ProcessError`] - error handling

#[macro_use]
pub(crate) mod error;
pub(crate) mod file;

/// Shared functionality which is used in unit- and integration-tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust,no_run
/// use cilstrip::prelude::*;
///
/// let mut module = Module::from_file("tests/samples/Library.dll".as_ref())?;
/// let stats = strip(&mut module);
/// println!("{} bodies truncated", stats.bodies_truncated);
/// # Ok::<(), cilstrip::Error>(())
/// ```
pub mod prelude;

/// Definitions and parsing of CIL metadata based on ECMA-335
///
/// # Key Components
///
/// - [`metadata::cor20header`] - CLR 2.0 header information
/// - [`metadata::root`] - Metadata root and stream directory
/// - [`metadata::streams`] - `#Strings`, `#Blob` and `#GUID` heaps
/// - [`metadata::tables`] - The tables stream, decoded and re-encoded generically
/// - [`metadata::method`] - IL method bodies and their instructions
/// - [`metadata::token`] - Metadata tokens for cross-references
pub mod metadata;

/// The object graph of a loaded module: types, members, bodies, resources and references
pub mod module;

/// Progress notifications of the core
pub mod observer;

/// Locating and loading referenced assemblies
pub mod resolver;

/// Loading input files into modules
pub mod loader;

/// Truncating method bodies and dropping resources
pub mod strip;

/// Writing stripped modules
pub mod writer;

/// Batch processing of many input files
pub mod driver;

/// `cilstrip` Result type
///
/// A type alias for [`std::result::Result<T, Error>`], used by the parsing layer.
pub type Result<T> = std::result::Result<T, Error>;

/// `cilstrip` Error type
///
/// The low level error of the parsing layer. The pipeline stages wrap it into [`LoadError`] or
/// [`WriteError`] together with the file they were working on.
pub use error::Error;

pub use error::{LoadError, ProcessError, ResolutionError, WriteError};

pub use driver::{process, BatchSummary, Driver, FileOutcome};
pub use loader::{load, Loader, ReferencePolicy};
pub use module::Module;
pub use observer::{Event, LogObserver, NullObserver, Observer};
pub use resolver::{FallbackResolver, ModuleCache, NoFallback, PlatformFallback, Resolver};
pub use strip::{strip, strip_with, StripStats};
pub use writer::{to_bytes, write};

pub use metadata::streams::{Blob, Guid, StreamHeader, Strings};

pub use file::{parser::Parser, File};
