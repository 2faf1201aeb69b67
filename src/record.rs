use std::fs;

use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::Tools;
use crate::domain::Destination;
use crate::error::KiraError;
use crate::exec::{CommandRunner, Invocation};
use crate::fs_util;
use crate::workspace::Workspace;

/// Summary of one alignment run, written next to the BAM as `<sample>.json.gz`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub sample: String,
    pub input: String,
    pub input_paths: Vec<String>,
    pub ref_db: String,
    pub output_folder: String,
    pub n_refs: u64,
    pub total_reads: u64,
    pub aligned_reads: u64,
    pub threads: usize,
    pub time_elapsed: f64,
    pub started_at: String,
    pub tool: String,
    pub logs: Vec<String>,
}

/// Where the record and the alignment ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub sample: String,
    pub record: String,
    pub alignment: String,
}

/// Serialize and gzip `record` in the workspace, then ship it and `bam_path`
/// to `destination`.
///
/// The BAM goes first so a record at the destination always has its BAM beside it.
pub fn publish<R: CommandRunner>(
    runner: &R,
    tools: &Tools,
    record: &ResultRecord,
    name_prefix: &str,
    destination: &Destination,
    workspace: &Workspace,
    bam_path: &Utf8Path,
) -> Result<RunSummary, KiraError> {
    let json_path = workspace.path().join(format!("{name_prefix}.json"));
    let content = serde_json::to_vec(record)
        .map_err(|err| KiraError::Filesystem(err.to_string()))?;
    fs::write(json_path.as_std_path(), &content)
        .map_err(|err| KiraError::Filesystem(format!("write {json_path}: {err}")))?;
    let gz_path = fs_util::gzip_in_place(&json_path)?;

    match destination {
        Destination::ObjectStore(uri) => {
            let alignment = upload(runner, tools, bam_path, uri)?;
            let record = upload(runner, tools, &gz_path, uri)?;
            Ok(RunSummary {
                sample: name_prefix.to_string(),
                record,
                alignment,
            })
        }
        Destination::Local(dir) => {
            fs::create_dir_all(dir.as_std_path())
                .map_err(|err| KiraError::Filesystem(format!("create {dir}: {err}")))?;
            info!("Moving {bam_path} to {dir}");
            let alignment = fs_util::move_into(bam_path, dir)?;
            info!("Moving {gz_path} to {dir}");
            let record = fs_util::move_into(&gz_path, dir)?;
            Ok(RunSummary {
                sample: name_prefix.to_string(),
                record: record.to_string(),
                alignment: alignment.to_string(),
            })
        }
    }
}

fn upload<R: CommandRunner>(
    runner: &R,
    tools: &Tools,
    path: &Utf8Path,
    uri: &str,
) -> Result<String, KiraError> {
    runner.execute(
        &Invocation::new(&tools.aws)
            .args(["s3", "cp", "--quiet", "--sse", "AES256"])
            .arg(path.as_str())
            .arg(uri),
    )?;
    fs::remove_file(path.as_std_path())
        .map_err(|err| KiraError::Filesystem(format!("remove {path}: {err}")))?;
    let name = path.file_name().unwrap_or_default();
    Ok(format!("{uri}{name}"))
}

/// Decode a published `<sample>.json.gz`.
pub fn read_record(path: &Utf8Path) -> Result<ResultRecord, KiraError> {
    let file = fs::File::open(path.as_std_path())
        .map_err(|err| KiraError::Filesystem(format!("open {path}: {err}")))?;
    serde_json::from_reader(flate2::read::GzDecoder::new(file))
        .map_err(|err| KiraError::Filesystem(format!("parse {path}: {err}")))
}
