//! Suite processing tests: demultiplexed uploads resolved against job logs
//! and published to a temporary directory.

mod common;

use std::sync::Arc;

use bytes::Bytes;
use futures::stream;
use tempfile::TempDir;

use artifact_relay::error::ResolveError;
use artifact_relay::models::{RepoRef, UploadContext, UploadIdentity};
use artifact_relay::pipeline::{demultiplex, SuiteAggregator};
use common::{app_state, manifest_log, relay_config, FakeGitHub, COMMIT, RUN_ID, SUITE_ID};

fn identity(job_name: &str) -> UploadIdentity {
    UploadIdentity {
        repository: RepoRef::new("octo", "widgets"),
        commit_hash: COMMIT.to_string(),
        pull_number: 42,
        job_name: job_name.to_string(),
        run_id: RUN_ID,
    }
}

async fn upload(job_name: &str, declared: Vec<u64>, chunks: &[&'static [u8]]) -> UploadContext {
    let body: Vec<Result<Bytes, std::io::Error>> =
        chunks.iter().map(|c| Ok(Bytes::from_static(c))).collect();
    let artifacts = demultiplex(declared.clone(), stream::iter(body)).await.unwrap();
    UploadContext {
        upload_id: format!("upload-{}", job_name),
        identity: identity(job_name),
        declared_lengths: declared,
        artifacts,
    }
}

#[tokio::test]
async fn test_suite_with_one_failing_job() {
    let temp_dir = TempDir::new().unwrap();
    let github = Arc::new(FakeGitHub::member_pull_request());
    github.add_job(1, "linux", manifest_log(&[("a.txt", b"abc"), ("b.bin", b"defgh")]));
    // The windows log lists only one of the two uploaded files
    github.add_job(2, "windows", manifest_log(&[("c.exe", b"xyz")]));
    let state = app_state(relay_config(temp_dir.path()), github.clone());

    let aggregator = SuiteAggregator::new();
    aggregator.enqueue(SUITE_ID, upload("linux", vec![3, 5], &[b"ab", b"cdefg", b"h"]).await);
    aggregator.enqueue(SUITE_ID, upload("windows", vec![3, 1], &[b"xyz", b"!"]).await);

    let summary = state.processor.process(SUITE_ID, aggregator.drain(SUITE_ID)).await;

    assert_eq!(summary.outcomes.len(), 2);
    assert_eq!(summary.outcomes[0].urls().len(), 2);
    assert!(matches!(
        summary.outcomes[1].result,
        Err(ResolveError::HashNotFound(_))
    ));

    let root = temp_dir.path().join("octo/widgets/42");
    assert_eq!(std::fs::read(root.join("a.txt")).unwrap(), b"abc");
    assert_eq!(std::fs::read(root.join("b.bin")).unwrap(), b"defgh");
    assert!(!root.join("c.exe").exists());

    assert!(summary.reported);
    let comments = github.comments();
    assert_eq!(comments.len(), 1);
    assert!(comments[0].2.contains("**linux**"));
    assert!(!comments[0].2.contains("windows"));
}

#[tokio::test]
async fn test_missing_job_log_fails_only_that_job() {
    let temp_dir = TempDir::new().unwrap();
    let github = Arc::new(FakeGitHub::member_pull_request());
    github.add_job(1, "linux", manifest_log(&[("a.txt", b"abc")]));
    let state = app_state(relay_config(temp_dir.path()), github.clone());

    let batch = vec![
        upload("linux", vec![3], &[b"abc"]).await,
        upload("macos", vec![3], &[b"abc"]).await,
    ];
    let summary = state.processor.process(SUITE_ID, batch).await;

    assert!(summary.outcomes[0].result.is_ok());
    assert!(matches!(
        summary.outcomes[1].result,
        Err(ResolveError::JobNotFound(ref name)) if name == "macos"
    ));
    assert_eq!(summary.report.url_count(), 1);
}

#[tokio::test]
async fn test_nothing_published_means_no_comment() {
    let temp_dir = TempDir::new().unwrap();
    let github = Arc::new(FakeGitHub::member_pull_request());
    github.add_job(1, "linux", "no manifest in this log\n".to_string());
    let state = app_state(relay_config(temp_dir.path()), github.clone());

    let summary = state
        .processor
        .process(SUITE_ID, vec![upload("linux", vec![3], &[b"abc"]).await])
        .await;

    assert!(matches!(
        summary.outcomes[0].result,
        Err(ResolveError::ManifestMissing)
    ));
    assert!(!summary.reported);
    assert!(github.comments().is_empty());
}
