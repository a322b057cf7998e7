//! # cilstrip Prelude
//!
//! The types needed to load, strip and write modules, for glob imports.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The low level error of the parsing layer
pub use crate::Error;

/// The result type of the parsing layer
pub use crate::Result;

/// Errors of the pipeline stages
pub use crate::{LoadError, ProcessError, ResolutionError, WriteError};

// ================================================================================================
// Pipeline
// ================================================================================================

/// Batch processing
pub use crate::{BatchSummary, Driver, FileOutcome};

/// Loading and reference resolution
pub use crate::{
    load, FallbackResolver, Loader, ModuleCache, NoFallback, PlatformFallback, ReferencePolicy,
    Resolver,
};

/// Stripping and writing
pub use crate::{strip, strip_with, write, StripStats};

/// Progress notifications
pub use crate::{LogObserver, NullObserver, Observer};

// ================================================================================================
// Module Graph
// ================================================================================================

/// A loaded assembly module
pub use crate::Module;

/// Types, members and resources of a module
pub use crate::module::{HasOptionalBody, MemberKind, Method, Property, Resource, TypeDef};

/// Method bodies
pub use crate::metadata::method::MethodBody;

/// Metadata token type for referencing table entries
pub use crate::metadata::token::Token;
