use std::error::Error;
use std::fs;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::KiraError;

const FETCH_DIR: &str = "fetched_reads";
const CACHE_DIR: &str = "sra";
const LOG_FILE: &str = "log.txt";

/// Per-run temporary directory. Removed by `close`, `teardown_on_failure`,
/// or on drop if neither ran.
#[derive(Debug)]
pub struct Workspace {
    root: Utf8PathBuf,
    released: bool,
}

impl Workspace {
    pub fn create(parent: &Utf8Path) -> Result<Self, KiraError> {
        let suffix = Uuid::new_v4().simple().to_string();
        Self::create_named(parent, &suffix[..8])
    }

    pub fn create_named(parent: &Utf8Path, name: &str) -> Result<Self, KiraError> {
        let root = parent.join(name);
        if root.as_std_path().exists() {
            return Err(KiraError::Collision(root));
        }
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| KiraError::Filesystem(format!("create {parent}: {err}")))?;
        fs::create_dir(root.as_std_path()).map_err(|err| match err.kind() {
            io::ErrorKind::AlreadyExists => KiraError::Collision(root.clone()),
            _ => KiraError::Filesystem(format!("create {root}: {err}")),
        })?;
        Ok(Self {
            root,
            released: false,
        })
    }

    pub fn path(&self) -> &Utf8Path {
        &self.root
    }

    pub fn log_path(&self) -> Utf8PathBuf {
        self.root.join(LOG_FILE)
    }

    pub fn fetch_dir(&self) -> Utf8PathBuf {
        self.root.join(FETCH_DIR)
    }

    pub fn ensure_fetch_dir(&self) -> Result<Utf8PathBuf, KiraError> {
        let dir = self.fetch_dir();
        if !dir.as_std_path().exists() {
            info!("Making new folder {dir}");
            fs::create_dir(dir.as_std_path())
                .map_err(|err| KiraError::Filesystem(format!("create {dir}: {err}")))?;
        }
        Ok(dir)
    }

    /// Point the SRA toolkit's well-known cache `link` at a fresh folder inside
    /// this workspace, so cached downloads go away with the workspace.
    pub fn prepare_accession_cache(&self, link: &Utf8Path) -> Result<CacheBinding, KiraError> {
        info!("Setting up fastq-dump cache within {}", self.root);
        if let Some(parent) = link.parent() {
            fs::create_dir_all(parent.as_std_path())
                .map_err(|err| KiraError::Filesystem(format!("create {parent}: {err}")))?;
        }

        match fs::symlink_metadata(link.as_std_path()) {
            Ok(meta) if meta.file_type().is_symlink() || meta.is_file() => {
                fs::remove_file(link.as_std_path())
                    .map_err(|err| KiraError::Filesystem(format!("remove {link}: {err}")))?;
            }
            Ok(_) => {
                info!("Removing existing cache folder {link}");
                fs::remove_dir_all(link.as_std_path())
                    .map_err(|err| KiraError::Filesystem(format!("remove {link}: {err}")))?;
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => {
                return Err(KiraError::Filesystem(format!("inspect {link}: {err}")));
            }
        }

        let target = self.root.join(CACHE_DIR);
        if target.as_std_path().exists() {
            return Err(KiraError::Collision(target));
        }
        fs::create_dir(target.as_std_path())
            .map_err(|err| KiraError::Filesystem(format!("create {target}: {err}")))?;
        std::os::unix::fs::symlink(target.as_std_path(), link.as_std_path())
            .map_err(|err| KiraError::Filesystem(format!("symlink {link}: {err}")))?;

        if !link.as_std_path().exists() {
            return Err(KiraError::Filesystem(format!(
                "cache link {link} does not resolve"
            )));
        }

        Ok(CacheBinding {
            link: link.to_path_buf(),
            target,
        })
    }

    /// Success path: remove the workspace.
    pub fn close(mut self) -> Result<(), KiraError> {
        self.released = true;
        info!("Removing temporary folder: {}", self.root);
        fs::remove_dir_all(self.root.as_std_path())
            .map_err(|err| KiraError::Filesystem(format!("remove {}: {err}", self.root)))
    }

    /// Failure path: log the error chain, then remove the workspace.
    pub fn teardown_on_failure(mut self, failure: &KiraError) {
        self.released = true;
        error!("There was an unexpected failure: {failure}");
        let mut source = failure.source();
        while let Some(cause) = source {
            error!("Caused by: {cause}");
            source = cause.source();
        }

        info!("Removing temporary folder: {}", self.root);
        if let Err(err) = fs::remove_dir_all(self.root.as_std_path()) {
            warn!("failed to remove {}: {err}", self.root);
        }
        info!("Exit code: {}", failure.exit_code());
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if !self.released {
            let _ = fs::remove_dir_all(self.root.as_std_path());
        }
    }
}

/// The SRA cache link and the workspace folder it points at for this run.
/// The link is removed on drop if it still points at that folder.
#[derive(Debug, PartialEq, Eq)]
pub struct CacheBinding {
    link: Utf8PathBuf,
    target: Utf8PathBuf,
}

impl CacheBinding {
    pub fn link(&self) -> &Utf8Path {
        &self.link
    }

    pub fn target(&self) -> &Utf8Path {
        &self.target
    }

    /// Where prefetch leaves the `.sra` file for `accession`.
    pub fn cached_artifact(&self, accession: &str) -> Utf8PathBuf {
        self.target.join(format!("{accession}.sra"))
    }
}

impl Drop for CacheBinding {
    fn drop(&mut self) {
        let points_here = fs::read_link(self.link.as_std_path())
            .map(|dest| dest == self.target.as_std_path())
            .unwrap_or(false);
        if points_here {
            if let Err(err) = fs::remove_file(self.link.as_std_path()) {
                warn!("failed to remove cache link {}: {err}", self.link);
            }
        }
    }
}
