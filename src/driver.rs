//! Batch processing: load, strip and write a list of input files.
//!
//! Every file is handled in isolation. Failures are recorded in that file's [`FileOutcome`] and
//! reported to the [`Observer`], and the batch moves on to the next input. With
//! [`Driver::parallel`] the files are spread over the `rayon` pool; the outcomes keep the input
//! order either way.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::path::PathBuf;
//! use cilstrip::{BatchSummary, Driver, LogObserver};
//!
//! let inputs = vec![PathBuf::from("bin/App.dll"), PathBuf::from("bin/Library.dll")];
//! let outcomes = Driver::new("out")
//!     .with_search_dir("refs")
//!     .parallel(true)
//!     .process(&inputs, &LogObserver);
//!
//! let summary = BatchSummary::from_outcomes(&outcomes);
//! println!("{} stripped, {} failed", summary.success_count(), summary.failure_count());
//! ```

use std::{
    io,
    path::{Path, PathBuf},
    sync::Arc,
};

use rayon::prelude::*;

use crate::{
    error::{ProcessError, WriteError},
    loader::{Loader, ReferencePolicy},
    observer::{Event, NullObserver, Observer},
    resolver::{FallbackResolver, ModuleCache, PlatformFallback, Resolver},
    strip::{strip_with, StripStats},
    writer,
};

/// The result of processing one input file
#[derive(Debug)]
pub struct FileOutcome {
    /// The input file
    pub input: PathBuf,
    /// Where the stripped module was (or would have been) written
    pub output: PathBuf,
    /// Strip counters, or why the file failed
    pub result: Result<StripStats, ProcessError>,
}

impl FileOutcome {
    /// True if the file was stripped and written
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Strips a batch of modules into one output directory
pub struct Driver {
    output_dir: PathBuf,
    search_dirs: Vec<PathBuf>,
    policy: ReferencePolicy,
    fallback: Arc<dyn FallbackResolver>,
    cache: ModuleCache,
    parallel: bool,
}

impl Driver {
    /// Create a driver writing to `output_dir`, resolving through the platform framework
    /// directories.
    ///
    /// The output directory is expected to exist.
    pub fn new<P: AsRef<Path>>(output_dir: P) -> Self {
        Driver {
            output_dir: output_dir.as_ref().to_path_buf(),
            search_dirs: Vec::new(),
            policy: ReferencePolicy::default(),
            fallback: Arc::new(PlatformFallback::discover()),
            cache: ModuleCache::default(),
            parallel: false,
        }
    }

    /// Add a directory searched for references, before the input's own directory.
    ///
    /// Directories added first have priority.
    #[must_use]
    pub fn with_search_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.search_dirs.push(dir.as_ref().to_path_buf());
        self
    }

    /// What to do with required references that can't be resolved
    #[must_use]
    pub fn reference_policy(mut self, policy: ReferencePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replace the fallback consulted after all search directories
    #[must_use]
    pub fn fallback(mut self, fallback: Arc<dyn FallbackResolver>) -> Self {
        self.fallback = fallback;
        self
    }

    /// Process files on the rayon thread pool
    #[must_use]
    pub fn parallel(mut self, enabled: bool) -> Self {
        self.parallel = enabled;
        self
    }

    /// The fallback cache shared by all files of this driver
    #[must_use]
    pub fn cache(&self) -> &ModuleCache {
        &self.cache
    }

    /// Load, strip and write every file of `paths`, in order.
    ///
    /// Never fails as a whole; each outcome carries the result of its file.
    pub fn process(&self, paths: &[PathBuf], observer: &dyn Observer) -> Vec<FileOutcome> {
        if self.parallel {
            paths
                .par_iter()
                .map(|path| self.process_file(path, observer))
                .collect()
        } else {
            paths
                .iter()
                .map(|path| self.process_file(path, observer))
                .collect()
        }
    }

    /// Process a single file
    pub fn process_file(&self, path: &Path, observer: &dyn Observer) -> FileOutcome {
        observer.notify(&Event::FileStarted { path });

        let (output, result) = match path.file_name() {
            Some(name) => {
                let output = self.output_dir.join(name);
                let result = self.strip_file(path, &output, observer);
                (output, result)
            }
            None => (
                self.output_dir.clone(),
                Err(ProcessError::Write(WriteError::IoFailure {
                    path: path.to_path_buf(),
                    source: io::Error::new(io::ErrorKind::InvalidInput, "input has no file name"),
                })),
            ),
        };

        if let Err(error) = &result {
            observer.notify(&Event::FileFailed { path, error });
        }

        FileOutcome {
            input: path.to_path_buf(),
            output,
            result,
        }
    }

    fn strip_file(
        &self,
        path: &Path,
        output: &Path,
        observer: &dyn Observer,
    ) -> Result<StripStats, ProcessError> {
        let mut resolver = Resolver::for_input(
            path,
            &self.search_dirs,
            Arc::clone(&self.fallback),
            Arc::clone(&self.cache),
        )
        .reference_policy(self.policy)
        .with_observer(observer);

        let mut module = Loader::new(&mut resolver).load(path)?;
        let stats = strip_with(&mut module, observer);

        observer.notify(&Event::Saving { path: output });
        writer::write(&module, output)?;

        Ok(stats)
    }
}

/// Strip `paths` into `output_dir`, searching `extra_dirs` and then each input's directory for
/// references.
pub fn process(paths: &[PathBuf], output_dir: &Path, extra_dirs: &[PathBuf]) -> Vec<FileOutcome> {
    let driver = extra_dirs
        .iter()
        .fold(Driver::new(output_dir), |driver, dir| driver.with_search_dir(dir));
    driver.process(paths, &NullObserver)
}

/// Aggregated results of a batch
#[derive(Debug, Default, Clone)]
pub struct BatchSummary {
    /// Files stripped and written
    pub succeeded: Vec<PathBuf>,
    /// Failed files with their error message
    pub failed: Vec<(PathBuf, String)>,
    /// Counters summed over all successful files
    pub totals: StripStats,
}

impl BatchSummary {
    /// Summarize `outcomes`
    #[must_use]
    pub fn from_outcomes(outcomes: &[FileOutcome]) -> Self {
        let mut summary = BatchSummary::default();
        for outcome in outcomes {
            match &outcome.result {
                Ok(stats) => {
                    summary.succeeded.push(outcome.input.clone());
                    summary.totals.types_visited += stats.types_visited;
                    summary.totals.members_visited += stats.members_visited;
                    summary.totals.bodies_truncated += stats.bodies_truncated;
                    summary.totals.instructions_removed += stats.instructions_removed;
                    summary.totals.resources_removed += stats.resources_removed;
                }
                Err(error) => summary
                    .failed
                    .push((outcome.input.clone(), error.to_string())),
            }
        }
        summary
    }

    /// True if no file failed
    #[must_use]
    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// True if at least one file failed
    #[must_use]
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    /// Number of files stripped
    #[must_use]
    pub fn success_count(&self) -> usize {
        self.succeeded.len()
    }

    /// Number of files that failed
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.failed.len()
    }
}
