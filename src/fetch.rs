use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::info;

use crate::config::Tools;
use crate::domain::{Accession, Source};
use crate::error::KiraError;
use crate::exec::{CommandRunner, Invocation};
use crate::fs_util;
use crate::workspace::{CacheBinding, Workspace};

/// Brings a read file from any supported source into the workspace's
/// `fetched_reads/` folder.
pub struct Fetcher<'a, R: CommandRunner> {
    runner: &'a R,
    tools: &'a Tools,
    cache: Option<&'a CacheBinding>,
    retries: u32,
}

impl<'a, R: CommandRunner> Fetcher<'a, R> {
    pub fn new(runner: &'a R, tools: &'a Tools) -> Self {
        Self {
            runner,
            tools,
            cache: None,
            retries: 0,
        }
    }

    pub fn with_cache(mut self, cache: &'a CacheBinding) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Retry count for network downloads.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn fetch(&self, source: &Source, workspace: &Workspace) -> Result<Utf8PathBuf, KiraError> {
        let staging = workspace.ensure_fetch_dir()?;
        let filename = source.file_name();
        let local_path = staging.join(&filename);

        info!("Getting reads from {source}");
        info!("Filename: {filename}");
        info!("Local path: {local_path}");

        match source {
            Source::Local(path) => {
                info!("Treating as local path");
                self.link_local(path, &local_path)?;
            }
            Source::ObjectStore(uri) => {
                info!("Getting reads from S3");
                self.runner.execute(
                    &Invocation::new(&self.tools.aws)
                        .args(["s3", "cp", "--quiet", "--sse", "AES256"])
                        .arg(uri)
                        .arg(format!("{staging}/"))
                        .retries(self.retries),
                )?;
                ensure_downloaded(uri, &local_path)?;
            }
            Source::Ftp(uri) => {
                info!("Getting reads from FTP");
                self.runner.execute(
                    &Invocation::new(&self.tools.wget)
                        .arg("-P")
                        .arg(staging.as_str())
                        .arg(uri)
                        .retries(self.retries),
                )?;
                ensure_downloaded(uri, &local_path)?;
            }
            Source::Archive(accession) => {
                info!("Getting reads from SRA: {accession}");
                return self.fetch_accession(accession, &staging);
            }
        }

        Ok(local_path)
    }

    fn link_local(&self, path: &Utf8Path, local_path: &Utf8Path) -> Result<(), KiraError> {
        if !path.as_std_path().exists() {
            return Err(KiraError::NotFound(path.to_string()));
        }
        if fs::symlink_metadata(local_path.as_std_path()).is_ok() {
            return Err(KiraError::Collision(local_path.to_path_buf()));
        }
        let target = fs::canonicalize(path.as_std_path())
            .map_err(|err| KiraError::Filesystem(format!("resolve {path}: {err}")))?;
        info!("Making a symlink to temporary folder");
        std::os::unix::fs::symlink(&target, local_path.as_std_path())
            .map_err(|err| KiraError::Filesystem(format!("symlink {local_path}: {err}")))
    }

    fn fetch_accession(
        &self,
        accession: &Accession,
        staging: &Utf8Path,
    ) -> Result<Utf8PathBuf, KiraError> {
        let local_path = staging.join(format!("{accession}.fastq"));
        // fastq-dump gets a folder of its own so other staged inputs named
        // `<acc>_<n>.fastq` are never mistaken for its output.
        let dump_dir = staging.join(format!(".{accession}"));
        fs::create_dir(dump_dir.as_std_path()).map_err(|err| match err.kind() {
            std::io::ErrorKind::AlreadyExists => KiraError::Collision(dump_dir.clone()),
            _ => KiraError::Filesystem(format!("create {dump_dir}: {err}")),
        })?;

        info!("Downloading via fastq-dump");
        self.runner.execute(
            &Invocation::new(&self.tools.prefetch)
                .arg(accession.as_str())
                .retries(self.retries),
        )?;
        self.runner.execute(
            &Invocation::new(&self.tools.fastq_dump)
                .args(["--split-files", "--outdir"])
                .arg(dump_dir.as_str())
                .arg(accession.as_str()),
        )?;

        let parts = accession_outputs(&dump_dir, accession)?;
        if parts.is_empty() {
            return Err(KiraError::ArchiveEmpty(accession.to_string()));
        }

        info!("Concatenating output files");
        let temp_path = staging.join(format!("{accession}.fastq.temp"));
        fs_util::concatenate(&parts, &temp_path)?;

        info!("Removing {dump_dir}");
        fs::remove_dir_all(dump_dir.as_std_path())
            .map_err(|err| KiraError::Filesystem(format!("remove {dump_dir}: {err}")))?;

        if let Some(cache) = self.cache {
            let cached = cache.cached_artifact(accession.as_str());
            if cached.as_std_path().exists() {
                info!("Removing {cached}");
                fs::remove_file(cached.as_std_path())
                    .map_err(|err| KiraError::Filesystem(format!("remove {cached}: {err}")))?;
            }
        }

        fs::rename(temp_path.as_std_path(), local_path.as_std_path())
            .map_err(|err| KiraError::Filesystem(format!("rename {temp_path}: {err}")))?;
        info!("Done fetching {accession}");
        Ok(local_path)
    }
}

/// `<acc>.fastq` and `<acc>_<n>.fastq` files written by `fastq-dump`, sorted by name.
pub fn accession_outputs(
    dir: &Utf8Path,
    accession: &Accession,
) -> Result<Vec<Utf8PathBuf>, KiraError> {
    let single = format!("{accession}.fastq");
    let split_prefix = format!("{accession}_");
    let entries = fs::read_dir(dir.as_std_path())
        .map_err(|err| KiraError::Filesystem(format!("read {dir}: {err}")))?;

    let mut parts = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| KiraError::Filesystem(err.to_string()))?;
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        let matches =
            name == single || (name.starts_with(&split_prefix) && name.ends_with(".fastq"));
        if matches && entry.path().is_file() {
            parts.push(dir.join(name));
        }
    }
    parts.sort();
    Ok(parts)
}

fn ensure_downloaded(uri: &str, local_path: &Utf8Path) -> Result<(), KiraError> {
    if local_path.as_std_path().exists() {
        Ok(())
    } else {
        Err(KiraError::NotFound(format!(
            "{uri} (expected download at {local_path})"
        )))
    }
}
