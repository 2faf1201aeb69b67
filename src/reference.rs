use camino::{Utf8Path, Utf8PathBuf};
use tracing::info;

use crate::config::Tools;
use crate::domain::{COMPRESSED_SUFFIX, Source};
use crate::error::KiraError;
use crate::exec::{CommandRunner, Invocation};
use crate::workspace::Workspace;

/// Produces a local, uncompressed FASTA for the reference `source`.
///
/// S3 references are copied into the workspace root. Local references are used
/// in place unless they are gzipped, in which case the decompressed copy is
/// written into the workspace root.
pub fn resolve_reference<R: CommandRunner>(
    runner: &R,
    tools: &Tools,
    source: &Source,
    workspace: &Workspace,
) -> Result<Utf8PathBuf, KiraError> {
    let local_path = match source {
        Source::ObjectStore(uri) => {
            info!("Getting reference database from S3: {uri}");
            let local_path = workspace.path().join(source.file_name());
            if local_path.as_std_path().exists() {
                return Err(KiraError::Collision(local_path));
            }
            info!("Saving database to {local_path}");
            runner.execute(
                &Invocation::new(&tools.aws)
                    .args(["s3", "cp", "--quiet", "--sse", "AES256"])
                    .arg(uri)
                    .arg(local_path.as_str()),
            )?;
            if !local_path.as_std_path().exists() {
                return Err(KiraError::NotFound(uri.clone()));
            }
            local_path
        }
        Source::Local(path) => {
            info!("Getting reference database from local path: {path}");
            if !path.as_std_path().exists() {
                return Err(KiraError::NotFound(path.to_string()));
            }
            path.clone()
        }
        Source::Ftp(_) | Source::Archive(_) => {
            return Err(KiraError::UnsupportedScheme(source.uri()));
        }
    };

    match decompressed_name(&local_path) {
        Some(name) => {
            let target = workspace.path().join(name);
            info!("Decompressing reference FASTA to {target}");
            runner.execute(
                &Invocation::new(&tools.gunzip)
                    .arg("-c")
                    .arg(local_path.as_str())
                    .stdout_to(&target),
            )?;
            Ok(target)
        }
        None => Ok(local_path),
    }
}

/// File name with the compression suffix stripped, if there is one.
fn decompressed_name(path: &Utf8Path) -> Option<String> {
    let name = path.file_name()?;
    name.strip_suffix(COMPRESSED_SUFFIX)
        .filter(|stripped| !stripped.is_empty())
        .map(str::to_string)
}
