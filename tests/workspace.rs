mod common;

use kira_align::error::KiraError;
use kira_align::workspace::Workspace;

use common::utf8_dir;

#[test]
fn accession_cache_replaces_existing_folder() {
    let temp = tempfile::tempdir().unwrap();
    let root = utf8_dir(&temp);
    let link = root.join("ncbi").join("public").join("sra");
    std::fs::create_dir_all(link.join("stale").as_std_path()).unwrap();

    let workspace = Workspace::create(&root.join("work")).unwrap();
    let binding = workspace.prepare_accession_cache(&link).unwrap();

    let meta = std::fs::symlink_metadata(link.as_std_path()).unwrap();
    assert!(meta.file_type().is_symlink());
    assert_eq!(
        std::fs::read_link(link.as_std_path()).unwrap(),
        binding.target().as_std_path()
    );
    assert!(binding.target().starts_with(workspace.path()));
    assert!(!link.join("stale").as_std_path().exists());
}

#[test]
fn cache_link_released_with_binding() {
    let temp = tempfile::tempdir().unwrap();
    let root = utf8_dir(&temp);
    let link = root.join("ncbi").join("public").join("sra");
    let workspace = Workspace::create(&root.join("work")).unwrap();

    {
        let _binding = workspace.prepare_accession_cache(&link).unwrap();
        assert!(link.as_std_path().exists());
    }
    assert!(std::fs::symlink_metadata(link.as_std_path()).is_err());
}

#[test]
fn teardown_on_failure_removes_everything() {
    let temp = tempfile::tempdir().unwrap();
    let workspace = Workspace::create(&utf8_dir(&temp)).unwrap();
    let path = workspace.path().to_path_buf();
    let staging = workspace.ensure_fetch_dir().unwrap();
    std::fs::write(staging.join("partial.fastq").as_std_path(), "@r\n").unwrap();

    workspace.teardown_on_failure(&KiraError::NotFound("reads.fastq".to_string()));
    assert!(!path.as_std_path().exists());
}

#[test]
fn close_removes_workspace() {
    let temp = tempfile::tempdir().unwrap();
    let workspace = Workspace::create(&utf8_dir(&temp)).unwrap();
    let path = workspace.path().to_path_buf();
    workspace.close().unwrap();
    assert!(!path.as_std_path().exists());
}
