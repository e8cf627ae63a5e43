use std::collections::HashMap;
use std::io::Read;
use std::process::Stdio;

use fanout_common::BuildTask;
use futures::future::BoxFuture;
use tokio::process::Command;
use tracing::debug;

/// Output of one compiler run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerOutput {
    /// Standard output and standard error, in the order they were written
    pub output: String,
    /// Whether the compiler exited with status 0
    pub success: bool,
}

/// The external toolchain a worker drives.
///
/// An `Err` means the compiler could not be run at all (missing binary,
/// permission denied); a compiler that ran and rejected the source returns
/// `Ok` with `success == false`.
pub trait Compiler: Send + Sync + 'static {
    fn compile(&self, task: &BuildTask) -> BoxFuture<'static, std::io::Result<CompilerOutput>>;
}

/// Which program compiles which language.
#[derive(Debug, Clone)]
pub struct CompilerConfig {
    /// Program used when the task's language has no entry in `programs`
    pub default_program: String,
    /// Language tag to program
    pub programs: HashMap<String, String>,
    /// Extra arguments placed before the source path
    pub args: Vec<String>,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        let programs = [("C", "gcc"), ("C++", "g++"), ("Objective-C", "clang")]
            .into_iter()
            .map(|(language, program)| (language.to_string(), program.to_string()))
            .collect();

        Self {
            default_program: "gcc".to_string(),
            programs,
            args: Vec::new(),
        }
    }
}

impl CompilerConfig {
    /// Runs `program` for every language.
    pub fn single(program: impl Into<String>) -> Self {
        Self {
            default_program: program.into(),
            programs: HashMap::new(),
            args: Vec::new(),
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn program_for(&self, language: &str) -> &str {
        self.programs
            .get(language)
            .map(String::as_str)
            .unwrap_or(&self.default_program)
    }
}

/// Runs the configured compiler as a child process: `program [args...] <source>`.
///
/// Standard output and standard error share one pipe, so diagnostics keep
/// their place relative to regular output.
#[derive(Debug, Clone, Default)]
pub struct CommandCompiler {
    config: CompilerConfig,
}

impl CommandCompiler {
    pub fn new(config: CompilerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }
}

impl Compiler for CommandCompiler {
    fn compile(&self, task: &BuildTask) -> BoxFuture<'static, std::io::Result<CompilerOutput>> {
        let program = self.config.program_for(&task.language).to_string();
        debug!("Running {} on {} ({})", program, task.source, task.language);

        let mut command = Command::new(&program);
        command
            .args(&self.config.args)
            .arg(&task.source)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        Box::pin(async move {
            let (mut reader, writer) = std::io::pipe()?;
            command.stdout(writer.try_clone()?).stderr(writer);

            let mut child = command.spawn()?;
            // close the parent's write ends so the reader sees EOF when the child exits
            drop(command);

            let collected = tokio::task::spawn_blocking(move || {
                let mut buf = Vec::new();
                reader.read_to_end(&mut buf).map(|_| buf)
            });

            let status = child.wait().await?;
            let output = collected.await.map_err(std::io::Error::other)??;

            Ok(CompilerOutput {
                output: String::from_utf8_lossy(&output).into_owned(),
                success: status.success(),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_programs_by_language() {
        let config = CompilerConfig::default();
        assert_eq!(config.program_for("C"), "gcc");
        assert_eq!(config.program_for("C++"), "g++");
        assert_eq!(config.program_for("Objective-C"), "clang");
        assert_eq!(config.program_for("Fortran"), "gcc");
    }

    #[test]
    fn test_single_program_ignores_language() {
        let config = CompilerConfig::single("cc");
        assert_eq!(config.program_for("C++"), "cc");
    }

    #[tokio::test]
    async fn test_exit_status_reported() {
        let ok = CommandCompiler::new(CompilerConfig::single("true"));
        let out = ok.compile(&BuildTask::new("C", "main.c")).await.unwrap();
        assert!(out.success);

        let fail = CommandCompiler::new(CompilerConfig::single("false"));
        let out = fail.compile(&BuildTask::new("C", "main.c")).await.unwrap();
        assert!(!out.success);
    }

    #[tokio::test]
    async fn test_output_combines_streams_and_receives_source() {
        let config = CompilerConfig::single("sh").with_args(vec![
            "-c".to_string(),
            "echo \"compiling $1\"; echo 'warning: unused' >&2; exit 2".to_string(),
            "sh".to_string(),
        ]);
        let compiler = CommandCompiler::new(config);

        let out = compiler.compile(&BuildTask::new("C", "hello.c")).await.unwrap();
        assert!(!out.success);
        assert_eq!(out.output, "compiling hello.c\nwarning: unused\n");
    }

    #[tokio::test]
    async fn test_interleaved_streams_keep_write_order() {
        let config = CompilerConfig::single("sh").with_args(vec![
            "-c".to_string(),
            "echo first; sleep 0.05; echo second >&2; sleep 0.05; echo third".to_string(),
            "sh".to_string(),
        ]);
        let compiler = CommandCompiler::new(config);

        let out = compiler.compile(&BuildTask::new("C", "main.c")).await.unwrap();
        assert!(out.success);
        assert_eq!(out.output, "first\nsecond\nthird\n");
    }

    #[tokio::test]
    async fn test_missing_program_is_io_error() {
        let compiler = CommandCompiler::new(CompilerConfig::single("fanout-no-such-compiler"));
        let err = compiler.compile(&BuildTask::new("C", "main.c")).await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }
}
