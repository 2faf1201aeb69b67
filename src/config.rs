use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use directories::BaseDirs;
use serde::{Deserialize, Serialize};

use crate::error::KiraError;

pub const DEFAULT_CONFIG_FILE: &str = "kira-align.json";

/// On-disk tool configuration. Every field is optional.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub tools: ToolOverrides,
    #[serde(default)]
    pub accession_cache: Option<String>,
    #[serde(default)]
    pub download_retries: Option<u32>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ToolOverrides {
    #[serde(default)]
    pub bwa: Option<String>,
    #[serde(default)]
    pub samtools: Option<String>,
    #[serde(default)]
    pub aws: Option<String>,
    #[serde(default)]
    pub wget: Option<String>,
    #[serde(default)]
    pub prefetch: Option<String>,
    #[serde(default, rename = "fastq-dump")]
    pub fastq_dump: Option<String>,
    #[serde(default)]
    pub gunzip: Option<String>,
}

/// Program names (or paths) for every external collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tools {
    pub bwa: String,
    pub samtools: String,
    pub aws: String,
    pub wget: String,
    pub prefetch: String,
    pub fastq_dump: String,
    pub gunzip: String,
}

impl Default for Tools {
    fn default() -> Self {
        Self {
            bwa: "bwa".to_string(),
            samtools: "samtools".to_string(),
            aws: "aws".to_string(),
            wget: "wget".to_string(),
            prefetch: "prefetch".to_string(),
            fastq_dump: "fastq-dump".to_string(),
            gunzip: "gunzip".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub tools: Tools,
    /// Well-known path the SRA toolkit writes its download cache to.
    pub accession_cache: Utf8PathBuf,
    pub download_retries: u32,
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, KiraError> {
        let config_path = match path {
            Some(path) => Utf8PathBuf::from(path),
            None => Utf8PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.as_std_path().exists() {
            return Self::resolve_config(Config::default());
        }

        let content = fs::read_to_string(config_path.as_std_path())
            .map_err(|_| KiraError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| KiraError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, KiraError> {
        let defaults = Tools::default();
        let overrides = config.tools;
        let tools = Tools {
            bwa: overrides.bwa.unwrap_or(defaults.bwa),
            samtools: overrides.samtools.unwrap_or(defaults.samtools),
            aws: overrides.aws.unwrap_or(defaults.aws),
            wget: overrides.wget.unwrap_or(defaults.wget),
            prefetch: overrides.prefetch.unwrap_or(defaults.prefetch),
            fastq_dump: overrides.fastq_dump.unwrap_or(defaults.fastq_dump),
            gunzip: overrides.gunzip.unwrap_or(defaults.gunzip),
        };

        let accession_cache = match config.accession_cache {
            Some(path) => Utf8PathBuf::from(path),
            None => default_accession_cache()?,
        };
        if accession_cache.file_name().is_none() {
            return Err(KiraError::ConfigParse(format!(
                "accession_cache must name a directory: {accession_cache}"
            )));
        }

        Ok(ResolvedConfig {
            tools,
            accession_cache,
            download_retries: config.download_retries.unwrap_or(0),
        })
    }
}

/// `<home>/ncbi/public/sra`, the location prefetch and fastq-dump cache into.
pub fn default_accession_cache() -> Result<Utf8PathBuf, KiraError> {
    BaseDirs::new()
        .and_then(|dirs| Utf8PathBuf::from_path_buf(dirs.home_dir().to_path_buf()).ok())
        .map(|home| sra_cache_under(&home))
        .ok_or_else(|| KiraError::Filesystem("unable to resolve home directory".to_string()))
}

fn sra_cache_under(home: &Utf8Path) -> Utf8PathBuf {
    home.join("ncbi").join("public").join("sra")
}
