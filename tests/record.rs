mod common;

use kira_align::config::Tools;
use kira_align::domain::Destination;
use kira_align::record::{ResultRecord, publish, read_record};
use kira_align::workspace::Workspace;

use common::{FakeRunner, utf8_dir, write_file};

fn sample_record() -> ResultRecord {
    ResultRecord {
        sample: "sample1".to_string(),
        input: "/a.fastq+/b.fastq".to_string(),
        input_paths: vec!["/a.fastq".to_string(), "/b.fastq".to_string()],
        ref_db: "/refs/genome.fasta".to_string(),
        output_folder: "/results".to_string(),
        n_refs: 12,
        total_reads: 20,
        aligned_reads: 18,
        threads: 16,
        time_elapsed: 12.5,
        started_at: "2026-01-01T00:00:00+00:00".to_string(),
        tool: "kira-align/0.1.1".to_string(),
        logs: vec!["INFO Commands:".to_string()],
    }
}

#[test]
fn record_round_trips_through_json() {
    let record = sample_record();
    let json = serde_json::to_string(&record).unwrap();
    let mut decoded: ResultRecord = serde_json::from_str(&json).unwrap();
    decoded.logs = record.logs.clone();
    assert_eq!(decoded, record);
}

#[test]
fn publish_to_local_folder() {
    let temp = tempfile::tempdir().unwrap();
    let root = utf8_dir(&temp);
    let workspace = Workspace::create(&root.join("work")).unwrap();
    let bam = write_file(workspace.path(), "sample1.bam", "bam");
    let dest_dir = root.join("results");
    let runner = FakeRunner::new();
    let record = sample_record();

    let summary = publish(
        &runner,
        &Tools::default(),
        &record,
        "sample1",
        &Destination::Local(dest_dir.clone()),
        &workspace,
        &bam,
    )
    .unwrap();

    assert_eq!(summary.alignment, dest_dir.join("sample1.bam").to_string());
    assert_eq!(summary.record, dest_dir.join("sample1.json.gz").to_string());
    assert!(!bam.as_std_path().exists());
    assert!(!workspace.path().join("sample1.json").as_std_path().exists());
    assert_eq!(read_record(&dest_dir.join("sample1.json.gz")).unwrap(), record);
    assert!(runner.calls().is_empty());
}

#[test]
fn publish_to_object_store_uploads_bam_first() {
    let temp = tempfile::tempdir().unwrap();
    let root = utf8_dir(&temp);
    let workspace = Workspace::create(&root.join("work")).unwrap();
    let bam = write_file(workspace.path(), "sample1.bam", "bam");
    let runner = FakeRunner::new();

    let summary = publish(
        &runner,
        &Tools::default(),
        &sample_record(),
        "sample1",
        &Destination::ObjectStore("s3://bucket/results/".to_string()),
        &workspace,
        &bam,
    )
    .unwrap();

    let calls = runner.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls[0].arguments().contains(&bam.to_string()));
    assert!(calls[1].arguments()[5].ends_with("sample1.json.gz"));
    assert!(calls.iter().all(|call| call.arguments().contains(&"AES256".to_string())));
    assert_eq!(summary.record, "s3://bucket/results/sample1.json.gz");
    assert!(!bam.as_std_path().exists());
    assert!(!workspace.path().join("sample1.json.gz").as_std_path().exists());
}
