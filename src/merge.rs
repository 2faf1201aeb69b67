use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};

use camino::{Utf8Path, Utf8PathBuf};
use tracing::info;

use crate::count::open_reader;
use crate::domain::COMPRESSED_SUFFIX;
use crate::error::KiraError;

const MERGED_READS: &str = "input.fastq";

/// Name for the combined reads. A single gzipped input is linked rather than
/// rewritten, so it keeps its compression suffix.
pub fn merged_file_name(inputs: &[Utf8PathBuf]) -> String {
    match inputs {
        [single] if single.as_str().ends_with(COMPRESSED_SUFFIX) => {
            format!("{MERGED_READS}{COMPRESSED_SUFFIX}")
        }
        _ => MERGED_READS.to_string(),
    }
}

/// Combine FASTQ files into `output`.
///
/// A single input is symlinked. With several inputs every header and separator
/// line gets `-<index>` appended, where `index` is the input's position in
/// `inputs`, so read names stay unique across sources. Gzipped inputs are
/// decompressed on the way, and `output` is always plain text.
pub fn combine_fastqs(inputs: &[Utf8PathBuf], output: &Utf8Path) -> Result<(), KiraError> {
    match inputs {
        [] => Err(KiraError::Validation("no read files to combine".to_string())),
        [single] => {
            if !single.as_std_path().exists() {
                return Err(KiraError::NotFound(single.to_string()));
            }
            info!("Making a symlink: {single} -> {output}");
            std::os::unix::fs::symlink(single.as_std_path(), output.as_std_path())
                .map_err(|err| KiraError::Filesystem(format!("symlink {output}: {err}")))
        }
        _ => {
            info!("Combining {} FASTQ files", inputs.len());
            info!("Writing all inputs to {output}");
            let out = File::create(output.as_std_path())
                .map_err(|err| KiraError::Filesystem(format!("create {output}: {err}")))?;
            let mut writer = BufWriter::new(out);
            for (index, input) in inputs.iter().enumerate() {
                info!("Adding {input} to {output}");
                append_tagged(input, index, &mut writer)?;
            }
            writer
                .flush()
                .map_err(|err| KiraError::Filesystem(format!("write {output}: {err}")))
        }
    }
}

fn append_tagged<W: Write>(input: &Utf8Path, index: usize, writer: &mut W) -> Result<(), KiraError> {
    let mut reader = BufReader::new(open_reader(input)?);
    let tag = format!("-{index}\n");
    let mut line = Vec::new();
    let mut line_ix = 0usize;

    loop {
        line.clear();
        let read = reader
            .read_until(b'\n', &mut line)
            .map_err(|err| KiraError::Filesystem(format!("read {input}: {err}")))?;
        if read == 0 {
            break;
        }
        let written = match line_ix % 4 {
            0 | 2 => {
                let trimmed = line.strip_suffix(b"\n").unwrap_or(&line[..]);
                writer
                    .write_all(trimmed)
                    .and_then(|_| writer.write_all(tag.as_bytes()))
            }
            _ => writer.write_all(&line),
        };
        written.map_err(|err| KiraError::Filesystem(format!("write: {err}")))?;
        line_ix += 1;
    }
    Ok(())
}
