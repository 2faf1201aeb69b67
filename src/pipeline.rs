use std::fs;
use std::time::Instant;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::info;

use crate::config::ResolvedConfig;
use crate::count::{count_fasta_records, count_reads};
use crate::domain::{COMPRESSED_SUFFIX, Destination, ReadSet, SampleName, Source};
use crate::error::KiraError;
use crate::exec::{CommandRunner, Invocation};
use crate::fetch::Fetcher;
use crate::logging::LogCapture;
use crate::merge::{combine_fastqs, merged_file_name};
use crate::record::{ResultRecord, RunSummary, publish};
use crate::reference::resolve_reference;
use crate::workspace::Workspace;

pub const DEFAULT_THREADS: usize = 16;
pub const DEFAULT_TEMP_ROOT: &str = "/share";

const ALIGNED_COUNT: &str = "aligned_reads.txt";

/// Everything one alignment run needs to know.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub reads: ReadSet,
    pub sample: SampleName,
    pub reference: Source,
    pub destination: Destination,
    pub threads: usize,
    pub temp_root: Utf8PathBuf,
}

pub struct Pipeline<R: CommandRunner> {
    runner: R,
    config: ResolvedConfig,
    log: LogCapture,
}

impl<R: CommandRunner> Pipeline<R> {
    pub fn new(runner: R, config: ResolvedConfig, log: LogCapture) -> Self {
        Self {
            runner,
            config,
            log,
        }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Run the whole job. The workspace is gone when this returns, whatever
    /// the outcome.
    pub fn run(&self, request: &RunRequest) -> Result<RunSummary, KiraError> {
        self.preflight(request)?;

        let started = Instant::now();
        let started_at = chrono::Utc::now().to_rfc3339();
        let workspace = Workspace::create(&request.temp_root)?;
        self.log.attach(&workspace.log_path())?;
        info!("Temporary folder: {}", workspace.path());

        match self.run_in(&workspace, request, started, started_at) {
            Ok(summary) => {
                let closed = workspace.close();
                self.log.detach();
                closed?;
                Ok(summary)
            }
            Err(err) => {
                workspace.teardown_on_failure(&err);
                self.log.detach();
                Err(err)
            }
        }
    }

    fn run_in(
        &self,
        workspace: &Workspace,
        request: &RunRequest,
        started: Instant,
        started_at: String,
    ) -> Result<RunSummary, KiraError> {
        let tools = &self.config.tools;
        let sample = request.sample.as_str();

        let ref_path = resolve_reference(&self.runner, tools, &request.reference, workspace)?;
        let n_refs = count_fasta_records(&ref_path)?;
        if n_refs == 0 {
            return Err(KiraError::Format(format!("no records in {ref_path}")));
        }
        info!("Reference contains {n_refs} sequences");

        info!("Indexing reference {ref_path}");
        self.runner.execute(
            &Invocation::new(&tools.bwa)
                .arg("index")
                .arg(ref_path.as_str()),
        )?;

        let cache = workspace.prepare_accession_cache(&self.config.accession_cache)?;

        info!("Fetching {} read file(s)", request.reads.len());
        let fetcher = Fetcher::new(&self.runner, tools)
            .with_cache(&cache)
            .with_retries(self.config.download_retries);
        let fetched = request
            .reads
            .sources()
            .iter()
            .map(|source| fetcher.fetch(source, workspace))
            .collect::<Result<Vec<_>, KiraError>>()?;
        let merged = workspace.path().join(merged_file_name(&fetched));
        combine_fastqs(&fetched, &merged)?;

        let bam_path = self.align(workspace, sample, &ref_path, &merged, request.threads)?;

        let total_reads = count_reads(&merged)?;
        let aligned_reads = self.count_aligned(workspace, &bam_path)?;
        info!("Aligned {aligned_reads} of {total_reads} reads");

        let logs = self.log.read_lines(&workspace.log_path())?;
        let record = ResultRecord {
            sample: sample.to_string(),
            input: request.reads.joined(),
            input_paths: request.reads.uris(),
            ref_db: request.reference.uri(),
            output_folder: request.destination.to_string(),
            n_refs,
            total_reads,
            aligned_reads,
            threads: request.threads,
            time_elapsed: started.elapsed().as_secs_f64(),
            started_at,
            tool: format!("kira-align/{}", env!("CARGO_PKG_VERSION")),
            logs,
        };

        publish(
            &self.runner,
            tools,
            &record,
            sample,
            &request.destination,
            workspace,
            &bam_path,
        )
    }

    /// bwa mem → unmapped-filtered BAM → sorted `<sample>.bam`.
    fn align(
        &self,
        workspace: &Workspace,
        sample: &str,
        ref_path: &Utf8Path,
        reads: &Utf8Path,
        threads: usize,
    ) -> Result<Utf8PathBuf, KiraError> {
        let tools = &self.config.tools;
        let sam_path = workspace.path().join(format!("{sample}.sam"));
        let unsorted_path = workspace.path().join(format!("{sample}.unsorted.bam"));
        let bam_path = workspace.path().join(format!("{sample}.bam"));

        info!("Aligning reads with BWA");
        self.runner.execute(
            &Invocation::new(&tools.bwa)
                .args(["mem", "-t"])
                .arg(threads.to_string())
                .arg("-o")
                .arg(sam_path.as_str())
                .arg(ref_path.as_str())
                .arg(reads.as_str()),
        )?;

        self.runner.execute(
            &Invocation::new(&tools.samtools)
                .args(["view", "-b", "-F", "4", "-o"])
                .arg(unsorted_path.as_str())
                .arg(sam_path.as_str()),
        )?;
        remove(&sam_path)?;

        self.runner.execute(
            &Invocation::new(&tools.samtools)
                .args(["sort", "-o"])
                .arg(bam_path.as_str())
                .arg(unsorted_path.as_str()),
        )?;
        remove(&unsorted_path)?;

        if !bam_path.as_std_path().exists() {
            return Err(KiraError::NotFound(bam_path.to_string()));
        }
        Ok(bam_path)
    }

    fn count_aligned(&self, workspace: &Workspace, bam_path: &Utf8Path) -> Result<u64, KiraError> {
        let samtools = &self.config.tools.samtools;
        let count_path = workspace.path().join(ALIGNED_COUNT);
        self.runner.execute(
            &Invocation::new(samtools)
                .args(["view", "-c"])
                .arg(bam_path.as_str())
                .stdout_to(&count_path),
        )?;
        let output = fs::read_to_string(count_path.as_std_path())
            .map_err(|err| KiraError::Filesystem(format!("read {count_path}: {err}")))?;
        output.trim().parse().map_err(|_| KiraError::ToolOutput {
            program: samtools.clone(),
            output: output.trim().to_string(),
        })
    }

    fn preflight(&self, request: &RunRequest) -> Result<(), KiraError> {
        for program in self.required_tools(request) {
            if !self.runner.is_available(program) {
                return Err(KiraError::MissingTool(program.to_string()));
            }
        }
        Ok(())
    }

    fn required_tools(&self, request: &RunRequest) -> Vec<&str> {
        let tools = &self.config.tools;
        let sources = || {
            request
                .reads
                .sources()
                .iter()
                .chain(std::iter::once(&request.reference))
        };

        let mut needed = vec![tools.bwa.as_str(), tools.samtools.as_str()];
        let uses_s3 = sources().any(|source| matches!(source, Source::ObjectStore(_)))
            || request.destination.is_object_store();
        if uses_s3 {
            needed.push(&tools.aws);
        }
        if sources().any(|source| matches!(source, Source::Ftp(_))) {
            needed.push(&tools.wget);
        }
        if sources().any(|source| matches!(source, Source::Archive(_))) {
            needed.push(&tools.prefetch);
            needed.push(&tools.fastq_dump);
        }
        if request.reference.uri().ends_with(COMPRESSED_SUFFIX) {
            needed.push(&tools.gunzip);
        }
        needed
    }
}

fn remove(path: &Utf8Path) -> Result<(), KiraError> {
    info!("Removing {path}");
    fs::remove_file(path.as_std_path())
        .map_err(|err| KiraError::Filesystem(format!("remove {path}: {err}")))
}
