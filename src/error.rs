use std::path::PathBuf;

use thiserror::Error;

use crate::metadata::token::Token;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

macro_rules! out_of_bounds_error {
    () => {
        crate::Error::OutOfBounds {
            file: file!(),
            line: line!(),
        }
    };
}

/// Low level errors of the PE / metadata parsing layer.
///
/// Everything that can go wrong while decoding or re-encoding the bytes of an image ends up
/// here. The higher level errors ([`LoadError`], [`WriteError`]) wrap this type together with
/// the context of the file being processed.
///
/// # Examples
///
/// ```rust
/// use cilstrip::{Error, Module};
///
/// match Module::from_mem(vec![0x4D, 0x5A]) {
///     Ok(_) => unreachable!(),
///     Err(Error::Empty) => eprintln!("nothing to parse"),
///     Err(other) => eprintln!("not a .NET image: {other}"),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The file is damaged and could not be parsed.
    ///
    /// Carries the source location where the malformation was detected.
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An out of bound access was attempted while parsing the file.
    #[error("Out of Bound read would have occurred! - {file}:{line}")]
    OutOfBounds {
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// This file type is not supported.
    #[error("This file type is not supported")]
    NotSupported,

    /// Provided input was empty.
    #[error("Provided input was empty")]
    Empty,

    /// File I/O error.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// Error from the goblin crate during PE parsing.
    #[error("{0}")]
    GoblinErr(#[from] goblin::error::Error),
}

/// A cross-assembly reference could not be satisfied.
#[derive(Error, Debug)]
pub enum ResolutionError {
    /// No search directory and no fallback produced a file for this name.
    #[error("Could not locate referenced assembly '{name}'")]
    NotFound {
        /// Logical assembly name, without extension
        name: String,
    },

    /// The name is already being loaded further up the resolution chain.
    #[error("Cyclic assembly reference - {}", chain.join(" -> "))]
    Cycle {
        /// Assembly names from the outermost load down to the repeated one
        chain: Vec<String>,
    },

    /// The assembly was located but failed to load.
    #[error("Failed to load referenced assembly '{name}' from '{}' - {source}", path.display())]
    Load {
        /// Logical assembly name, without extension
        name: String,
        /// The file the resolver picked
        path: PathBuf,
        /// What went wrong while loading it
        source: Box<LoadError>,
    },
}

impl ResolutionError {
    /// Follows nested dependency load failures down to the error that started the chain.
    #[must_use]
    pub fn innermost(&self) -> &ResolutionError {
        let mut current = self;
        while let ResolutionError::Load { source, .. } = current {
            match source.as_ref() {
                LoadError::UnresolvedReference { source, .. } => current = source,
                _ => break,
            }
        }
        current
    }
}

/// An input file could not be turned into a [`crate::Module`].
#[derive(Error, Debug)]
pub enum LoadError {
    /// The file could not be read.
    #[error("Failed to read '{}' - {source}", path.display())]
    Io {
        /// The file that was being read
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// The bytes are not a valid .NET module.
    #[error("'{}' is not a valid .NET module - {source}", path.display())]
    Malformed {
        /// The file that was being parsed
        path: PathBuf,
        /// Parser error
        source: Error,
    },

    /// A required assembly reference could not be resolved.
    #[error("Unresolved reference to '{name}' - {source}")]
    UnresolvedReference {
        /// Name of the referenced assembly
        name: String,
        /// Why resolution failed
        source: ResolutionError,
    },
}

/// A stripped module could not be serialized or persisted.
#[derive(Error, Debug)]
pub enum WriteError {
    /// The output file could not be written.
    #[error("Failed to write '{}' - {source}", path.display())]
    IoFailure {
        /// Target path
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// A re-encoded method body no longer fits into its original location.
    #[error("Method body of {token} needs {required} bytes, only {available} are available")]
    BodyOverflow {
        /// The MethodDef owning the body
        token: Token,
        /// Size of the original on-disk body
        available: usize,
        /// Size of the re-encoded body
        required: usize,
    },

    /// Re-encoding metadata failed.
    #[error("Failed to encode module - {0}")]
    Encoding(#[from] Error),
}

/// Everything that can fail while processing a single input file.
#[derive(Error, Debug)]
pub enum ProcessError {
    /// Reading, parsing or resolving the input failed
    #[error(transparent)]
    Load(#[from] LoadError),
    /// Writing the stripped output failed
    #[error(transparent)]
    Write(#[from] WriteError),
}
