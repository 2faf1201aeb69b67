use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum KiraError {
    #[error("command `{program}` exited with {}", describe_code(.code))]
    Execution { program: String, code: Option<i32> },

    #[error("failed to start `{program}`: {message}")]
    Spawn { program: String, message: String },

    #[error("input does not exist: {0}")]
    NotFound(String),

    #[error("no FASTQ produced for SRA accession: {0}")]
    ArchiveEmpty(String),

    #[error("unsupported URI scheme: {0}")]
    UnsupportedScheme(String),

    #[error("path already exists: {0}")]
    Collision(Utf8PathBuf),

    #[error("reference must be FASTA: {0}")]
    Format(String),

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(Utf8PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("required tool not found: {0}")]
    MissingTool(String),

    #[error("unexpected output from {program}: {output}")]
    ToolOutput { program: String, output: String },
}

impl KiraError {
    /// Process exit status for a run that ended with this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            KiraError::Execution { code, .. } => match code {
                Some(code) if (1..=255).contains(code) => *code as u8,
                _ => 1,
            },
            KiraError::Validation(_)
            | KiraError::NotFound(_)
            | KiraError::UnsupportedScheme(_)
            | KiraError::ConfigRead(_)
            | KiraError::ConfigParse(_) => 2,
            KiraError::MissingTool(_) | KiraError::Spawn { .. } => 3,
            _ => 1,
        }
    }
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "no exit code (terminated by signal)".to_string(),
    }
}
