use crate::config::LocatePolicy;
use crate::data_model::{LocatedFile, RecordJob};
use crate::error::{PipelineError, Result};
use crate::executor::ProcessingStep;
use async_trait::async_trait;
use std::path::Path;
use tracing::{debug, warn};

/// Finds the artifact the fetch tool produced for the job's identifier.
pub struct LocateStep;

#[async_trait]
impl ProcessingStep for LocateStep {
    fn name(&self) -> &'static str {
        "locate"
    }

    async fn process(&self, job: &mut RecordJob) -> Result<()> {
        let located =
            locate_artifact(&job.config.fetch_dir, &job.identifier, job.config.locate_policy)
                .await?;
        debug!(
            identifier = %job.identifier,
            file = %located.file_name,
            candidates = located.candidates,
            "Located downloaded artifact"
        );
        job.located = Some(located);
        Ok(())
    }
}

/// Scans `fetch_dir` for entries whose name starts with `identifier`.
///
/// Candidates are sorted by name, so with [`LocatePolicy::FirstSorted`] the
/// pick is deterministic. Entries with non UTF-8 names are ignored.
pub async fn locate_artifact(
    fetch_dir: &Path,
    identifier: &str,
    policy: LocatePolicy,
) -> Result<LocatedFile> {
    let locate_failed = |reason: String| PipelineError::LocateFailed {
        identifier: identifier.to_string(),
        reason,
    };

    let mut entries = tokio::fs::read_dir(fetch_dir).await.map_err(|e| {
        locate_failed(format!("cannot read '{}': {}", fetch_dir.display(), e))
    })?;

    let mut candidates: Vec<String> = Vec::new();
    loop {
        let entry = entries.next_entry().await.map_err(|e| {
            locate_failed(format!("cannot read '{}': {}", fetch_dir.display(), e))
        })?;
        let Some(entry) = entry else { break };
        if let Some(name) = entry.file_name().to_str() {
            if name.starts_with(identifier) {
                candidates.push(name.to_string());
            }
        }
    }
    candidates.sort();

    let count = candidates.len();
    let file_name = match (count, policy) {
        (0, _) => {
            return Err(locate_failed(format!(
                "no matches in '{}' after downloading",
                fetch_dir.display()
            )))
        }
        (1, _) => candidates.swap_remove(0),
        (_, LocatePolicy::FailOnAmbiguous) => {
            return Err(locate_failed(format!(
                "multiple matches in '{}': {}",
                fetch_dir.display(),
                candidates.join(", ")
            )))
        }
        (_, LocatePolicy::FirstSorted) => {
            warn!(
                %identifier,
                candidates = count,
                chosen = %candidates[0],
                "Multiple artifacts share the identifier prefix; using the first by name"
            );
            candidates.swap_remove(0)
        }
    };

    Ok(LocatedFile {
        path: fetch_dir.join(&file_name),
        file_name,
        candidates: count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_single_match() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("SRR100.sra"), b"x").unwrap();
        fs::write(dir.path().join("ERR200.sra"), b"x").unwrap();

        let located = locate_artifact(dir.path(), "SRR100", LocatePolicy::FirstSorted)
            .await
            .unwrap();
        assert_eq!(located.file_name, "SRR100.sra");
        assert_eq!(located.path, dir.path().join("SRR100.sra"));
        assert_eq!(located.candidates, 1);
    }

    #[tokio::test]
    async fn test_directory_entries_match_too() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("SRR7")).unwrap();
        let located = locate_artifact(dir.path(), "SRR7", LocatePolicy::FirstSorted)
            .await
            .unwrap();
        assert_eq!(located.file_name, "SRR7");
    }

    #[tokio::test]
    async fn test_no_match_is_failure() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("SRR1.sra"), b"x").unwrap();
        let err = locate_artifact(dir.path(), "SRR2", LocatePolicy::FirstSorted)
            .await
            .unwrap_err();
        match err {
            PipelineError::LocateFailed { identifier, reason } => {
                assert_eq!(identifier, "SRR2");
                assert!(reason.contains("no matches"));
            }
            other => panic!("Expected LocateFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_multiple_matches_pick_smallest_name() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("SRR5_2.sra"), b"x").unwrap();
        fs::write(dir.path().join("SRR5.sra"), b"x").unwrap();
        fs::write(dir.path().join("SRR5_1.sra"), b"x").unwrap();

        let located = locate_artifact(dir.path(), "SRR5", LocatePolicy::FirstSorted)
            .await
            .unwrap();
        assert_eq!(located.file_name, "SRR5.sra");
        assert_eq!(located.candidates, 3);
    }

    #[tokio::test]
    async fn test_multiple_matches_fail_when_strict() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("SRR5_1.sra"), b"x").unwrap();
        fs::write(dir.path().join("SRR5_2.sra"), b"x").unwrap();

        let err = locate_artifact(dir.path(), "SRR5", LocatePolicy::FailOnAmbiguous)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("multiple matches"));
    }

    #[tokio::test]
    async fn test_missing_directory_is_locate_failure() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("gone");
        let err = locate_artifact(&missing, "SRR1", LocatePolicy::FirstSorted)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::LocateFailed { .. }));
    }
}
