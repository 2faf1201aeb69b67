use std::fs::File;
use std::io::{BufRead, BufReader, Cursor, Read};

use bio::io::fasta;
use camino::Utf8Path;
use flate2::read::MultiGzDecoder;
use tracing::info;

use crate::domain::COMPRESSED_SUFFIX;
use crate::error::KiraError;

/// Number of records in a FASTQ or FASTA file, gzipped or not.
///
/// The file is scanned as FASTQ first. If a record-start line does not begin
/// with `@`, or no records are found, it is counted as FASTA instead, skipping
/// anything before the first `>` header.
pub fn count_reads(path: &Utf8Path) -> Result<u64, KiraError> {
    let mut reader = BufReader::new(open_reader(path)?);
    let mut line = Vec::new();
    let mut line_ix = 0u64;
    let mut n = 0u64;

    loop {
        line.clear();
        let read = reader
            .read_until(b'\n', &mut line)
            .map_err(|err| KiraError::Filesystem(format!("read {path}: {err}")))?;
        if read == 0 {
            break;
        }
        if line_ix % 4 == 0 {
            if line.first() == Some(&b'@') {
                n += 1;
            } else {
                info!("Not in FASTQ format, trying FASTA");
                return count_fasta_after_preamble(path);
            }
        }
        line_ix += 1;
    }

    if n == 0 {
        info!("No FASTQ reads found, trying to read as FASTA");
        return count_fasta_after_preamble(path);
    }
    Ok(n)
}

fn count_fasta_after_preamble(path: &Utf8Path) -> Result<u64, KiraError> {
    let mut reader = BufReader::new(open_reader(path)?);
    let mut line = Vec::new();
    loop {
        line.clear();
        let read = reader
            .read_until(b'\n', &mut line)
            .map_err(|err| KiraError::Filesystem(format!("read {path}: {err}")))?;
        if read == 0 {
            return Ok(0);
        }
        if line.first() == Some(&b'>') {
            break;
        }
    }
    count_records(fasta::Reader::new(Cursor::new(line).chain(reader)), path)
}

/// Number of FASTA records in `path`. Anything that does not parse as FASTA
/// is a `Format` error.
pub fn count_fasta_records(path: &Utf8Path) -> Result<u64, KiraError> {
    count_records(fasta::Reader::new(open_reader(path)?), path)
}

fn count_records<B: BufRead>(reader: fasta::Reader<B>, path: &Utf8Path) -> Result<u64, KiraError> {
    let mut n = 0u64;
    for record in reader.records() {
        record.map_err(|err| KiraError::Format(format!("{path}: {err}")))?;
        n += 1;
    }
    Ok(n)
}

pub(crate) fn open_reader(path: &Utf8Path) -> Result<Box<dyn Read>, KiraError> {
    let file = File::open(path.as_std_path())
        .map_err(|err| KiraError::Filesystem(format!("open {path}: {err}")))?;
    if path.as_str().ends_with(COMPRESSED_SUFFIX) {
        Ok(Box::new(MultiGzDecoder::new(file)))
    } else {
        Ok(Box::new(file))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use camino::Utf8PathBuf;

    use super::*;

    fn write(dir: &tempfile::TempDir, name: &str, content: &str) -> Utf8PathBuf {
        let path = Utf8PathBuf::from_path_buf(dir.path().join(name)).unwrap();
        std::fs::write(path.as_std_path(), content).unwrap();
        path
    }

    #[test]
    fn empty_file_counts_zero() {
        let temp = tempfile::tempdir().unwrap();
        let path = write(&temp, "empty.fastq", "");
        assert_eq!(count_reads(&path).unwrap(), 0);
    }

    #[test]
    fn garbage_is_format_error() {
        let temp = tempfile::tempdir().unwrap();
        let path = write(&temp, "ref.txt", "not a sequence file\n");
        let err = count_fasta_records(&path).unwrap_err();
        assert_matches!(err, KiraError::Format(_));
    }
}
