#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::io::{Read, Write};
use std::sync::Mutex;

use camino::{Utf8Path, Utf8PathBuf};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;

use kira_align::config::{ResolvedConfig, Tools};
use kira_align::error::KiraError;
use kira_align::exec::{CommandRunner, Invocation};

/// Stands in for bwa, samtools, aws, wget and the SRA toolkit by writing the
/// files those tools would produce.
#[derive(Default)]
pub struct FakeRunner {
    calls: Mutex<Vec<Invocation>>,
    /// Remote objects by URI (s3:// and ftp://).
    pub objects: HashMap<String, String>,
    /// fastq-dump output files by accession, written as `<acc>_<n>.fastq`.
    pub archives: HashMap<String, Vec<String>>,
    /// Folder prefetch drops `<acc>.sra` into.
    pub sra_cache: Option<Utf8PathBuf>,
    /// Program that exits with the given code.
    pub failing: Option<(String, i32)>,
    pub missing: Vec<String>,
    pub aligned_reads: u64,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }

    pub fn programs(&self) -> Vec<String> {
        self.calls()
            .iter()
            .map(|call| call.program().to_string())
            .collect()
    }

    fn simulate(&self, invocation: &Invocation) {
        let args = invocation.arguments();
        match invocation.program() {
            "aws" => {
                let source = &args[args.len() - 2];
                let dest = &args[args.len() - 1];
                if source.starts_with("s3://") {
                    let dest = if dest.ends_with('/') {
                        format!("{dest}{}", last_segment(source))
                    } else {
                        dest.clone()
                    };
                    if let Some(content) = self.objects.get(source) {
                        fs::write(&dest, content).unwrap();
                    }
                }
            }
            "wget" => {
                let dir = &args[1];
                let uri = &args[2];
                if let Some(content) = self.objects.get(uri) {
                    fs::write(format!("{dir}/{}", last_segment(uri)), content).unwrap();
                }
            }
            "prefetch" => {
                if let Some(cache) = &self.sra_cache {
                    fs::write(cache.join(format!("{}.sra", args[0])), "sra").unwrap();
                }
            }
            "fastq-dump" => {
                let dir = &args[2];
                let accession = &args[3];
                if let Some(parts) = self.archives.get(accession) {
                    for (ix, content) in parts.iter().enumerate() {
                        fs::write(format!("{dir}/{accession}_{}.fastq", ix + 1), content).unwrap();
                    }
                }
            }
            "gunzip" => {
                let mut text = String::new();
                GzDecoder::new(fs::File::open(&args[1]).unwrap())
                    .read_to_string(&mut text)
                    .unwrap();
                fs::write(invocation.stdout_path().unwrap(), text).unwrap();
            }
            "bwa" | "samtools" => {
                if let Some(pos) = args.iter().position(|arg| arg == "-o") {
                    fs::write(&args[pos + 1], "aligned").unwrap();
                }
                if args.iter().any(|arg| arg == "-c") {
                    fs::write(
                        invocation.stdout_path().unwrap(),
                        format!("{}\n", self.aligned_reads),
                    )
                    .unwrap();
                }
            }
            _ => {}
        }
    }
}

impl CommandRunner for FakeRunner {
    fn execute(&self, invocation: &Invocation) -> Result<(), KiraError> {
        self.calls.lock().unwrap().push(invocation.clone());
        if let Some((program, code)) = &self.failing {
            if program == invocation.program() {
                return Err(KiraError::Execution {
                    program: program.clone(),
                    code: Some(*code),
                });
            }
        }
        self.simulate(invocation);
        Ok(())
    }

    fn is_available(&self, program: &str) -> bool {
        !self.missing.iter().any(|name| name == program)
    }
}

pub fn utf8_dir(dir: &tempfile::TempDir) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap()
}

pub fn write_file(dir: &Utf8Path, name: &str, content: &str) -> Utf8PathBuf {
    let path = dir.join(name);
    fs::write(path.as_std_path(), content).unwrap();
    path
}

pub fn write_gz(dir: &Utf8Path, name: &str, content: &str) -> Utf8PathBuf {
    let path = dir.join(name);
    let mut encoder = GzEncoder::new(
        fs::File::create(path.as_std_path()).unwrap(),
        Compression::default(),
    );
    encoder.write_all(content.as_bytes()).unwrap();
    encoder.finish().unwrap();
    path
}

pub fn fastq(prefix: &str, n: usize) -> String {
    (0..n)
        .map(|ix| format!("@{prefix}{ix}\nACGTACGT\n+\nIIIIIIII\n"))
        .collect()
}

pub fn fasta(prefix: &str, n: usize) -> String {
    (0..n)
        .map(|ix| format!(">{prefix}{ix}\nACGTACGT\nTTGGCCAA\n"))
        .collect()
}

pub fn test_config(cache: Utf8PathBuf) -> ResolvedConfig {
    ResolvedConfig {
        tools: Tools::default(),
        accession_cache: cache,
        download_retries: 0,
    }
}

fn last_segment(value: &str) -> &str {
    value.rsplit('/').next().unwrap_or(value)
}
