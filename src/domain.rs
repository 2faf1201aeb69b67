use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use camino::Utf8PathBuf;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::KiraError;

pub const OBJECT_STORE_PREFIX: &str = "s3://";
pub const FTP_PREFIX: &str = "ftp://";
pub const ARCHIVE_PREFIX: &str = "sra://";

/// Separator between read-set URIs in the `--input` argument.
pub const READ_SET_DELIMITER: char = '+';

pub const COMPRESSED_SUFFIX: &str = ".gz";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Accession(String);

impl Accession {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Accession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Accession {
    type Err = KiraError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        static PATTERN: OnceLock<Regex> = OnceLock::new();
        let pattern = PATTERN.get_or_init(|| Regex::new(r"^(SRR|ERR|DRR)\d+$").unwrap());
        let normalized = value.trim().to_uppercase();
        if !pattern.is_match(&normalized) {
            return Err(KiraError::Validation(format!(
                "invalid SRA accession: {value}"
            )));
        }
        Ok(Self(normalized))
    }
}

/// Where a reference, a read file or the results live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Local(Utf8PathBuf),
    ObjectStore(String),
    Ftp(String),
    Archive(Accession),
}

impl Source {
    pub fn scheme(&self) -> &'static str {
        match self {
            Source::Local(_) => "local",
            Source::ObjectStore(_) => "s3",
            Source::Ftp(_) => "ftp",
            Source::Archive(_) => "sra",
        }
    }

    /// Name of the file this source resolves to inside the fetch staging folder.
    pub fn file_name(&self) -> String {
        match self {
            Source::Local(path) => last_segment(path.as_str()).to_string(),
            Source::ObjectStore(uri) | Source::Ftp(uri) => last_segment(uri).to_string(),
            Source::Archive(accession) => format!("{accession}.fastq"),
        }
    }

    pub fn uri(&self) -> String {
        match self {
            Source::Local(path) => path.to_string(),
            Source::ObjectStore(uri) | Source::Ftp(uri) => uri.clone(),
            Source::Archive(accession) => format!("{ARCHIVE_PREFIX}{accession}"),
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.uri())
    }
}

impl FromStr for Source {
    type Err = KiraError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let source = if value.starts_with(OBJECT_STORE_PREFIX) {
            Source::ObjectStore(value.to_string())
        } else if value.starts_with(FTP_PREFIX) {
            Source::Ftp(value.to_string())
        } else if let Some(rest) = value.strip_prefix(ARCHIVE_PREFIX) {
            Source::Archive(last_segment(rest).parse()?)
        } else if value.contains("://") {
            return Err(KiraError::UnsupportedScheme(value.to_string()));
        } else {
            Source::Local(Utf8PathBuf::from(value))
        };
        if source.file_name().is_empty() {
            return Err(KiraError::Validation(format!(
                "input does not name a file: {value}"
            )));
        }
        Ok(source)
    }
}

/// The ordered, de-duplicated list of read files for one sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadSet {
    sources: Vec<Source>,
}

impl ReadSet {
    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn uris(&self) -> Vec<String> {
        self.sources.iter().map(Source::uri).collect()
    }

    /// The original argument form, URIs joined by `+`.
    pub fn joined(&self) -> String {
        self.uris().join(&READ_SET_DELIMITER.to_string())
    }
}

impl FromStr for ReadSet {
    type Err = KiraError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let entries = value.split(READ_SET_DELIMITER).collect::<Vec<_>>();
        let mut seen_uris = HashSet::new();
        let mut seen_names = HashSet::new();
        let mut sources = Vec::with_capacity(entries.len());

        for entry in entries {
            if entry.is_empty() {
                return Err(KiraError::Validation(format!(
                    "empty entry in input list: {value}"
                )));
            }
            if entry
                .chars()
                .any(|ch| ch.is_whitespace() || ch.is_control())
            {
                return Err(KiraError::Validation(format!(
                    "illegal character in input: {entry:?}"
                )));
            }
            if !seen_uris.insert(entry.to_string()) {
                return Err(KiraError::Validation(format!(
                    "duplicate input: {entry}"
                )));
            }
            let source: Source = entry.parse()?;
            if !seen_names.insert(source.file_name()) {
                return Err(KiraError::Validation(format!(
                    "duplicate input filename: {}",
                    source.file_name()
                )));
            }
            sources.push(source);
        }

        Ok(Self { sources })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SampleName(String);

impl SampleName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SampleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SampleName {
    type Err = KiraError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let is_valid = !trimmed.is_empty()
            && trimmed != "."
            && trimmed != ".."
            && !trimmed
                .chars()
                .any(|ch| ch == '/' || ch.is_whitespace() || ch.is_control());
        if !is_valid {
            return Err(KiraError::Validation(format!(
                "invalid sample name: {value:?}"
            )));
        }
        Ok(Self(trimmed.to_string()))
    }
}

/// Where the alignment and its summary are published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    ObjectStore(String),
    Local(Utf8PathBuf),
}

impl Destination {
    pub fn is_object_store(&self) -> bool {
        matches!(self, Destination::ObjectStore(_))
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::ObjectStore(uri) => write!(f, "{uri}"),
            Destination::Local(path) => write!(f, "{path}"),
        }
    }
}

impl FromStr for Destination {
    type Err = KiraError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(KiraError::Validation("empty output folder".to_string()));
        }
        if trimmed.starts_with(OBJECT_STORE_PREFIX) {
            let mut uri = trimmed.to_string();
            if !uri.ends_with('/') {
                uri.push('/');
            }
            return Ok(Destination::ObjectStore(uri));
        }
        if trimmed.contains("://") {
            return Err(KiraError::UnsupportedScheme(trimmed.to_string()));
        }
        Ok(Destination::Local(Utf8PathBuf::from(trimmed)))
    }
}

fn last_segment(value: &str) -> &str {
    value.rsplit('/').next().unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parse_accession_normalizes_case() {
        let acc: Accession = "srr000001".parse().unwrap();
        assert_eq!(acc.as_str(), "SRR000001");
    }

    #[test]
    fn parse_accession_invalid() {
        let err = "GSE1234".parse::<Accession>().unwrap_err();
        assert_matches!(err, KiraError::Validation(_));
    }

    #[test]
    fn source_dispatch_by_prefix() {
        assert_matches!("s3://bucket/r.fastq".parse::<Source>(), Ok(Source::ObjectStore(_)));
        assert_matches!("ftp://host/r.fastq".parse::<Source>(), Ok(Source::Ftp(_)));
        assert_matches!("sra://SRR000001".parse::<Source>(), Ok(Source::Archive(_)));
        assert_matches!("/data/r.fastq".parse::<Source>(), Ok(Source::Local(_)));
        assert_matches!(
            "gs://bucket/r.fastq".parse::<Source>(),
            Err(KiraError::UnsupportedScheme(_))
        );
    }

    #[test]
    fn archive_file_name_uses_accession() {
        let source: Source = "sra://SRR000001".parse().unwrap();
        assert_eq!(source.file_name(), "SRR000001.fastq");
        assert_eq!(source.uri(), "sra://SRR000001");
    }

    #[test]
    fn destination_gets_trailing_slash() {
        let dest: Destination = "s3://bucket/results".parse().unwrap();
        assert_eq!(dest, Destination::ObjectStore("s3://bucket/results/".to_string()));
    }
}
