use std::path::Path;

use cilstrip::{BatchSummary, FileOutcome};
use log::{info, warn};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct FileReport {
    input: String,
    output: String,
    success: bool,
    error: Option<String>,
    stats: Option<StatsReport>,
}

#[derive(Debug, Serialize)]
struct StatsReport {
    types_visited: usize,
    members_visited: usize,
    bodies_truncated: usize,
    instructions_removed: usize,
    resources_removed: usize,
}

#[derive(Debug, Serialize)]
struct BatchReport {
    files: Vec<FileReport>,
    succeeded: usize,
    failed: usize,
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

fn build_report(outcomes: &[FileOutcome], summary: &BatchSummary) -> BatchReport {
    let files = outcomes
        .iter()
        .map(|outcome| match &outcome.result {
            Ok(stats) => FileReport {
                input: display(&outcome.input),
                output: display(&outcome.output),
                success: true,
                error: None,
                stats: Some(StatsReport {
                    types_visited: stats.types_visited,
                    members_visited: stats.members_visited,
                    bodies_truncated: stats.bodies_truncated,
                    instructions_removed: stats.instructions_removed,
                    resources_removed: stats.resources_removed,
                }),
            },
            Err(error) => FileReport {
                input: display(&outcome.input),
                output: display(&outcome.output),
                success: false,
                error: Some(error.to_string()),
                stats: None,
            },
        })
        .collect();

    BatchReport {
        files,
        succeeded: summary.success_count(),
        failed: summary.failure_count(),
    }
}

/// Print the batch result: a JSON document on stdout with `json`, log lines otherwise.
pub fn print(outcomes: &[FileOutcome], summary: &BatchSummary, json: bool) -> anyhow::Result<()> {
    if json {
        let report = build_report(outcomes, summary);
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    for (path, error) in &summary.failed {
        warn!("{}: {error}", path.display());
    }
    info!(
        "Stripped {} of {} files ({} bodies, {} instructions, {} resources removed)",
        summary.success_count(),
        outcomes.len(),
        summary.totals.bodies_truncated,
        summary.totals.instructions_removed,
        summary.totals.resources_removed
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use cilstrip::{LoadError, ProcessError, StripStats};

    use super::*;

    #[test]
    fn json_shape() {
        let outcomes = vec![
            FileOutcome {
                input: PathBuf::from("in/A.dll"),
                output: PathBuf::from("out/A.dll"),
                result: Ok(StripStats {
                    bodies_truncated: 2,
                    ..StripStats::default()
                }),
            },
            FileOutcome {
                input: PathBuf::from("in/B.dll"),
                output: PathBuf::from("out/B.dll"),
                result: Err(ProcessError::Load(LoadError::Io {
                    path: PathBuf::from("in/B.dll"),
                    source: std::io::Error::from(std::io::ErrorKind::NotFound),
                })),
            },
        ];
        let summary = BatchSummary::from_outcomes(&outcomes);
        let value = serde_json::to_value(build_report(&outcomes, &summary)).unwrap();

        assert_eq!(value["succeeded"], 1);
        assert_eq!(value["failed"], 1);
        assert_eq!(value["files"][0]["stats"]["bodies_truncated"], 2);
        assert_eq!(value["files"][1]["success"], false);
        assert!(value["files"][1]["error"]
            .as_str()
            .unwrap()
            .contains("in/B.dll"));
    }
}
