use std::fs::{self, File};
use std::io::{self, BufWriter, Write};

use camino::{Utf8Path, Utf8PathBuf};
use flate2::Compression;
use flate2::write::GzEncoder;

use crate::error::KiraError;

/// Write every file in `parts`, in order, into `dest`.
pub fn concatenate(parts: &[Utf8PathBuf], dest: &Utf8Path) -> Result<(), KiraError> {
    let out = File::create(dest.as_std_path())
        .map_err(|err| KiraError::Filesystem(format!("create {dest}: {err}")))?;
    let mut writer = BufWriter::new(out);
    for part in parts {
        let mut input = File::open(part.as_std_path())
            .map_err(|err| KiraError::Filesystem(format!("open {part}: {err}")))?;
        io::copy(&mut input, &mut writer)
            .map_err(|err| KiraError::Filesystem(format!("copy {part}: {err}")))?;
    }
    writer
        .flush()
        .map_err(|err| KiraError::Filesystem(format!("write {dest}: {err}")))
}

/// Gzip `path` to `<path>.gz` and remove the original.
pub fn gzip_in_place(path: &Utf8Path) -> Result<Utf8PathBuf, KiraError> {
    let gz_path = Utf8PathBuf::from(format!("{path}.gz"));
    let mut input = File::open(path.as_std_path())
        .map_err(|err| KiraError::Filesystem(format!("open {path}: {err}")))?;
    let out = File::create(gz_path.as_std_path())
        .map_err(|err| KiraError::Filesystem(format!("create {gz_path}: {err}")))?;
    let mut encoder = GzEncoder::new(BufWriter::new(out), Compression::default());
    io::copy(&mut input, &mut encoder)
        .map_err(|err| KiraError::Filesystem(format!("compress {path}: {err}")))?;
    encoder
        .finish()
        .and_then(|mut writer| writer.flush())
        .map_err(|err| KiraError::Filesystem(format!("write {gz_path}: {err}")))?;
    fs::remove_file(path.as_std_path())
        .map_err(|err| KiraError::Filesystem(format!("remove {path}: {err}")))?;
    Ok(gz_path)
}

/// Move `source` into the directory `dest_dir`, keeping its file name.
/// Falls back to copy + remove when a rename crosses filesystems.
pub fn move_into(source: &Utf8Path, dest_dir: &Utf8Path) -> Result<Utf8PathBuf, KiraError> {
    let name = source
        .file_name()
        .ok_or_else(|| KiraError::Filesystem(format!("not a file path: {source}")))?;
    let dest = dest_dir.join(name);
    if fs::rename(source.as_std_path(), dest.as_std_path()).is_ok() {
        return Ok(dest);
    }

    let temp = tempfile::Builder::new()
        .prefix("kira-align-file")
        .tempfile_in(dest_dir.as_std_path())
        .map_err(|err| KiraError::Filesystem(err.to_string()))?;
    fs::copy(source.as_std_path(), temp.path())
        .map_err(|err| KiraError::Filesystem(format!("copy {source}: {err}")))?;
    temp.persist(dest.as_std_path())
        .map_err(|err| KiraError::Filesystem(err.to_string()))?;
    fs::remove_file(source.as_std_path())
        .map_err(|err| KiraError::Filesystem(format!("remove {source}: {err}")))?;
    Ok(dest)
}
