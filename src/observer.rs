//! Progress notifications of the core.
//!
//! The driver, resolver, loader and stripper report their progress to an [`Observer`] passed in
//! by the caller. [`LogObserver`] forwards the events to the `log` facade and [`NullObserver`]
//! drops them.

use std::path::Path;

use log::{debug, error, info, trace, warn};

use crate::{error::ResolutionError, module::MemberKind, ProcessError};

/// A progress event
#[derive(Debug)]
pub enum Event<'a> {
    /// Processing of an input file starts
    FileStarted {
        /// The input file
        path: &'a Path,
    },
    /// A module has been parsed
    ModuleLoaded {
        /// Module name
        name: &'a str,
        /// Number of types, nested ones included
        types: usize,
    },
    /// A required reference has been resolved
    ReferenceResolved {
        /// Requested assembly name
        name: &'a str,
        /// Where it was loaded from
        path: Option<&'a Path>,
    },
    /// The platform fallback supplied a reference
    FallbackUsed {
        /// Requested assembly name
        name: &'a str,
        /// Where it was found
        path: &'a Path,
    },
    /// A required reference could not be resolved and loading continues anyway
    ReferenceUnresolved {
        /// Requested assembly name
        name: &'a str,
        /// Why resolution failed
        error: &'a ResolutionError,
    },
    /// All bodies of a type have been truncated
    TypeCleared {
        /// Qualified type name
        name: &'a str,
    },
    /// All bodies of a member have been truncated
    MemberCleared {
        /// Member kind
        kind: MemberKind,
        /// Member name
        name: &'a str,
        /// Instructions removed from its bodies
        instructions: usize,
    },
    /// The resource collection has been emptied
    ResourcesCleared {
        /// Number of resources removed
        count: usize,
    },
    /// The stripped module is written
    Saving {
        /// The output file
        path: &'a Path,
    },
    /// Processing of a file failed, the batch continues
    FileFailed {
        /// The input file
        path: &'a Path,
        /// The failure
        error: &'a ProcessError,
    },
}

/// Receiver of progress events. Implementations must tolerate calls from several threads.
pub trait Observer: Send + Sync {
    /// Handle one event
    fn notify(&self, event: &Event<'_>);
}

/// Forwards events to the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl Observer for LogObserver {
    fn notify(&self, event: &Event<'_>) {
        match event {
            Event::FileStarted { path } => info!("Processing {}", path.display()),
            Event::ModuleLoaded { name, types } => debug!("Loaded module {name} ({types} types)"),
            Event::ReferenceResolved { name, path } => match path {
                Some(path) => debug!("Resolved {name} from {}", path.display()),
                None => debug!("Resolved {name}"),
            },
            Event::FallbackUsed { name, path } => {
                debug!("Resolved {name} from platform directory {}", path.display());
            }
            Event::ReferenceUnresolved { name, error } => {
                warn!("Could not resolve {name}: {error}");
            }
            Event::TypeCleared { name } => trace!("Cleared type {name}"),
            Event::MemberCleared {
                kind,
                name,
                instructions,
            } => trace!("Cleared {kind} {name} ({instructions} instructions)"),
            Event::ResourcesCleared { count } => debug!("Removed {count} resources"),
            Event::Saving { path } => info!("Saving {}", path.display()),
            Event::FileFailed { path, error } => error!("Failed {}: {error}", path.display()),
        }
    }
}

/// Discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl Observer for NullObserver {
    fn notify(&self, _event: &Event<'_>) {}
}

#[cfg(test)]
mod tests {
    use std::{
        io,
        path::PathBuf,
        sync::{Mutex, Once},
    };

    use log::{Level, LevelFilter, Log, Metadata, Record};

    use super::*;
    use crate::LoadError;

    struct Capture(Mutex<Vec<(Level, String)>>);

    impl Log for Capture {
        fn enabled(&self, _metadata: &Metadata<'_>) -> bool {
            true
        }

        fn log(&self, record: &Record<'_>) {
            self.0
                .lock()
                .unwrap()
                .push((record.level(), record.args().to_string()));
        }

        fn flush(&self) {}
    }

    static CAPTURE: Capture = Capture(Mutex::new(Vec::new()));
    static INSTALL: Once = Once::new();

    fn captured(needle: &str) -> Vec<Level> {
        CAPTURE
            .0
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, message)| message.contains(needle))
            .map(|(level, _)| *level)
            .collect()
    }

    #[test]
    fn levels() {
        INSTALL.call_once(|| {
            log::set_logger(&CAPTURE).unwrap();
            log::set_max_level(LevelFilter::Trace);
        });

        let path = PathBuf::from("LevelsUnderTest.dll");
        let error = ProcessError::Load(LoadError::Io {
            path: path.clone(),
            source: io::Error::new(io::ErrorKind::NotFound, "gone"),
        });
        LogObserver.notify(&Event::FileStarted { path: &path });
        LogObserver.notify(&Event::FileFailed {
            path: &path,
            error: &error,
        });
        LogObserver.notify(&Event::TypeCleared {
            name: "LevelsUnderTest.Type",
        });

        assert_eq!(
            captured("LevelsUnderTest"),
            vec![Level::Info, Level::Error, Level::Trace]
        );
    }
}
