use crate::error::{BackupError, ProcessError};
use std::io;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// A single external command: program, ordered arguments and extra environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub envs: Vec<(String, String)>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Invocation {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd.envs(self.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        cmd.stdin(Stdio::null());
        cmd.kill_on_drop(true);
        cmd
    }
}

/// Exit code plus everything the process printed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Output {
    /// `None` when the process was killed by a signal.
    pub code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl Output {
    #[cfg(test)]
    pub fn success() -> Self {
        Output {
            code: Some(0),
            ..Default::default()
        }
    }

    #[cfg(test)]
    pub fn failure(code: i32, stderr: &str) -> Self {
        Output {
            code: Some(code),
            stdout: Vec::new(),
            stderr: stderr.as_bytes().to_vec(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == Some(0)
    }

    /// Text worth showing to a user when the command failed: stderr, or stdout
    /// when the tool wrote nothing to stderr.
    pub fn diagnostics(&self) -> String {
        let stderr = String::from_utf8_lossy(&self.stderr);
        let stderr = stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        String::from_utf8_lossy(&self.stdout).trim().to_string()
    }
}

impl From<std::process::Output> for Output {
    fn from(output: std::process::Output) -> Self {
        Output {
            code: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        }
    }
}

/// Outputs of both ends of `producer | consumer`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineOutput {
    pub producer: Output,
    pub consumer: Output,
}

/// Runs external commands on behalf of the backends.
///
/// `Err` means the process could not be started at all; a started process that
/// fails is reported through [`Output::code`].
#[async_trait::async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(&self, invocation: &Invocation) -> io::Result<Output>;

    /// Runs `producer` with its stdout connected to the stdin of `consumer`.
    async fn pipe(
        &self,
        producer: &Invocation,
        consumer: &Invocation,
    ) -> Result<PipelineOutput, (String, io::Error)>;
}

/// [`ProcessRunner`] backed by real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

#[async_trait::async_trait]
impl ProcessRunner for SystemRunner {
    async fn run(&self, invocation: &Invocation) -> io::Result<Output> {
        debug!(
            "Running {} with {} argument(s)",
            invocation.program,
            invocation.args.len()
        );
        let output = invocation.command().output().await?;
        Ok(output.into())
    }

    async fn pipe(
        &self,
        producer: &Invocation,
        consumer: &Invocation,
    ) -> Result<PipelineOutput, (String, io::Error)> {
        debug!("Running pipeline {} | {}", producer.program, consumer.program);
        let spawn_err = |program: &str| {
            let program = program.to_string();
            move |e: io::Error| (program, e)
        };

        let mut upstream = producer
            .command()
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_err(&producer.program))?;

        let stdout = upstream.stdout.take().ok_or_else(|| {
            (
                producer.program.clone(),
                io::Error::new(io::ErrorKind::BrokenPipe, "producer stdout unavailable"),
            )
        })?;
        let stdin: Stdio = stdout.try_into().map_err(spawn_err(&producer.program))?;

        let downstream = match consumer
            .command()
            .stdin(stdin)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                let _ = upstream.kill().await;
                return Err((consumer.program.clone(), e));
            }
        };

        let (producer_out, consumer_out) =
            tokio::join!(upstream.wait_with_output(), downstream.wait_with_output());

        Ok(PipelineOutput {
            producer: producer_out.map_err(spawn_err(&producer.program))?.into(),
            consumer: consumer_out.map_err(spawn_err(&consumer.program))?.into(),
        })
    }
}

/// Runs `invocation` and turns a spawn error or non-zero exit into a wrapped
/// [`BackupError::Command`] carrying the tool's diagnostics.
pub async fn run_checked(
    runner: &dyn ProcessRunner,
    invocation: &Invocation,
) -> Result<Output, BackupError> {
    let output = runner
        .run(invocation)
        .await
        .map_err(|source| BackupError::Command {
            source: ProcessError::Spawn {
                program: invocation.program.clone(),
                source,
            },
            output: String::new(),
        })?;

    if !output.is_success() {
        return Err(BackupError::Command {
            source: ProcessError::Exit {
                program: invocation.program.clone(),
                code: output.code,
            },
            output: output.diagnostics(),
        });
    }
    Ok(output)
}

/// Runs `producer | consumer`; the consumer's failure is reported first since it
/// usually explains a producer killed by a closed pipe.
pub async fn pipe_checked(
    runner: &dyn ProcessRunner,
    producer: &Invocation,
    consumer: &Invocation,
) -> Result<(), BackupError> {
    let outputs = runner
        .pipe(producer, consumer)
        .await
        .map_err(|(program, source)| BackupError::Pipeline {
            source: ProcessError::Spawn { program, source },
            output: String::new(),
        })?;

    for (invocation, output) in [(consumer, &outputs.consumer), (producer, &outputs.producer)] {
        if !output.is_success() {
            return Err(BackupError::Pipeline {
                source: ProcessError::Exit {
                    program: invocation.program.clone(),
                    code: output.code,
                },
                output: output.diagnostics(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    type Handler = Box<dyn Fn(&Invocation) -> io::Result<Output> + Send + Sync>;

    /// Records every invocation and answers with a scripted handler.
    pub struct RecordingRunner {
        handler: Handler,
        pub calls: Mutex<Vec<Invocation>>,
    }

    impl RecordingRunner {
        pub fn new<F>(handler: F) -> Self
        where
            F: Fn(&Invocation) -> io::Result<Output> + Send + Sync + 'static,
        {
            RecordingRunner {
                handler: Box::new(handler),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn succeeding() -> Self {
            Self::new(|_| Ok(Output::success()))
        }

        pub fn calls(&self) -> Vec<Invocation> {
            self.calls.lock().unwrap().clone()
        }

        pub fn programs(&self) -> Vec<String> {
            self.calls().into_iter().map(|c| c.program).collect()
        }
    }

    #[async_trait::async_trait]
    impl ProcessRunner for RecordingRunner {
        async fn run(&self, invocation: &Invocation) -> io::Result<Output> {
            self.calls.lock().unwrap().push(invocation.clone());
            (self.handler)(invocation)
        }

        async fn pipe(
            &self,
            producer: &Invocation,
            consumer: &Invocation,
        ) -> Result<PipelineOutput, (String, io::Error)> {
            let producer_out = self
                .run(producer)
                .await
                .map_err(|e| (producer.program.clone(), e))?;
            let consumer_out = self
                .run(consumer)
                .await
                .map_err(|e| (consumer.program.clone(), e))?;
            Ok(PipelineOutput {
                producer: producer_out,
                consumer: consumer_out,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::RecordingRunner;
    use super::*;

    #[test]
    fn test_diagnostics_prefers_stderr() {
        let output = Output {
            code: Some(1),
            stdout: b"partial".to_vec(),
            stderr: b"  boom\n".to_vec(),
        };
        assert_eq!(output.diagnostics(), "boom");

        let output = Output {
            code: Some(1),
            stdout: b"only stdout\n".to_vec(),
            stderr: Vec::new(),
        };
        assert_eq!(output.diagnostics(), "only stdout");
    }

    #[tokio::test]
    async fn test_run_checked_wraps_exit_failure() {
        let runner = RecordingRunner::new(|_| Ok(Output::failure(3, "bad flag")));
        let err = run_checked(&runner, &Invocation::new("tool").arg("-x"))
            .await
            .unwrap_err();

        match err {
            BackupError::Command {
                source: ProcessError::Exit { program, code },
                output,
            } => {
                assert_eq!(program, "tool");
                assert_eq!(code, Some(3));
                assert_eq!(output, "bad flag");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_run_checked_wraps_spawn_failure() {
        let runner = RecordingRunner::new(|_| {
            Err(io::Error::new(io::ErrorKind::NotFound, "no such file"))
        });
        let err = run_checked(&runner, &Invocation::new("missing"))
            .await
            .unwrap_err();
        assert!(matches!(
            err.process_error(),
            Some(ProcessError::Spawn { program, .. }) if program == "missing"
        ));
    }

    #[tokio::test]
    async fn test_pipe_checked_reports_consumer_failure() {
        let runner = RecordingRunner::new(|inv| {
            if inv.program == "restore" {
                Ok(Output::failure(1, "relation already exists"))
            } else {
                Ok(Output::success())
            }
        });
        let err = pipe_checked(&runner, &Invocation::new("gzip"), &Invocation::new("restore"))
            .await
            .unwrap_err();
        assert!(matches!(err, BackupError::Pipeline { .. }));
        assert_eq!(err.output(), Some("relation already exists"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_system_runner_pipes_stdout_into_stdin() {
        let producer = Invocation::new("sh").args(["-c", "printf 'hello'"]);
        let consumer = Invocation::new("sh").args(["-c", "cat; printf ' world' >&2"]);
        let outputs = SystemRunner.pipe(&producer, &consumer).await.unwrap();

        assert!(outputs.producer.is_success());
        assert!(outputs.consumer.is_success());
        assert_eq!(outputs.consumer.stdout, b"hello");
        assert_eq!(outputs.consumer.stderr, b" world");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_system_runner_passes_env() {
        let inv = Invocation::new("sh")
            .args(["-c", "printf \"$DBARCHIVE_TEST_VALUE\""])
            .env("DBARCHIVE_TEST_VALUE", "secret");
        let output = SystemRunner.run(&inv).await.unwrap();
        assert!(output.is_success());
        assert_eq!(output.stdout, b"secret");
    }
}
