use std::path::PathBuf;

use clap::Parser;

/// cilstrip - strip CIL method bodies and resources from .NET assemblies
#[derive(Debug, Parser)]
#[command(name = "cilstrip", version, about, long_about = None)]
pub struct Cli {
    /// Assemblies to strip, directories containing them, or glob patterns like `bin/**/*.dll`.
    #[arg(value_name = "PATH", required = true)]
    pub inputs: Vec<PathBuf>,

    /// Directory the stripped assemblies are written to.
    #[arg(short, long, value_name = "DIR", default_value = "out")]
    pub output: PathBuf,

    /// Additional directory to search for referenced assemblies. Earlier ones win.
    #[arg(short = 'r', long = "reference-dir", value_name = "DIR")]
    pub reference_dirs: Vec<PathBuf>,

    /// Skip this file (can be given multiple times).
    #[arg(long, value_name = "PATH")]
    pub exclude: Vec<PathBuf>,

    /// Scan input directories recursively.
    #[arg(long)]
    pub recursive: bool,

    /// Keep going when a referenced assembly can't be found.
    #[arg(long)]
    pub lenient: bool,

    /// Process files in parallel.
    #[arg(long)]
    pub parallel: bool,

    /// Print a JSON report to stdout instead of log output.
    #[arg(long)]
    pub json: bool,

    /// More log output (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Log level selected by `--verbose`
    pub fn log_level(&self) -> log::LevelFilter {
        match self.verbose {
            0 => log::LevelFilter::Info,
            1 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["cilstrip", "App.dll"]).unwrap();
        assert_eq!(cli.inputs, vec![PathBuf::from("App.dll")]);
        assert_eq!(cli.output, PathBuf::from("out"));
        assert!(cli.reference_dirs.is_empty());
        assert!(!cli.lenient && !cli.parallel && !cli.json && !cli.recursive);
        assert_eq!(cli.log_level(), log::LevelFilter::Info);
    }

    #[test]
    fn options() {
        let cli = Cli::try_parse_from([
            "cilstrip",
            "-o",
            "shells",
            "-r",
            "first",
            "--reference-dir",
            "second",
            "--exclude",
            "bin/Skip.dll",
            "--lenient",
            "-vv",
            "bin",
        ])
        .unwrap();
        assert_eq!(cli.output, PathBuf::from("shells"));
        assert_eq!(
            cli.reference_dirs,
            vec![PathBuf::from("first"), PathBuf::from("second")]
        );
        assert_eq!(cli.exclude, vec![PathBuf::from("bin/Skip.dll")]);
        assert!(cli.lenient);
        assert_eq!(cli.log_level(), log::LevelFilter::Trace);
    }

    #[test]
    fn requires_input() {
        assert!(Cli::try_parse_from(["cilstrip"]).is_err());
    }
}
