use kira_align::config::{Config, ConfigLoader, Tools};

#[test]
fn parse_tool_overrides() {
    let json = r#"{
        "tools": { "bwa": "/opt/bwa/bwa", "fastq-dump": "/opt/sra/fastq-dump" },
        "accession_cache": "/scratch/ncbi/public/sra",
        "download_retries": 2
    }"#;
    let config: Config = serde_json::from_str(json).unwrap();

    let resolved = ConfigLoader::resolve_config(config).unwrap();
    assert_eq!(resolved.tools.bwa, "/opt/bwa/bwa");
    assert_eq!(resolved.tools.fastq_dump, "/opt/sra/fastq-dump");
    assert_eq!(resolved.tools.samtools, Tools::default().samtools);
    assert_eq!(resolved.accession_cache, "/scratch/ncbi/public/sra");
    assert_eq!(resolved.download_retries, 2);
}

#[test]
fn missing_explicit_config_is_an_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("absent.json");
    assert!(ConfigLoader::resolve(Some(path.to_str().unwrap())).is_err());
}
