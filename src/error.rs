use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Why an external tool did not complete.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("`{program}` exited with {}", exit_label(.code))]
    Exit { program: String, code: Option<i32> },
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "no status (terminated by signal)".to_string(),
    }
}

/// Errors returned by export and import.
///
/// Tool failures keep whatever the tool printed so callers can show both the
/// cause and the tool's own diagnostics.
#[derive(Debug, Error)]
pub enum BackupError {
    #[error("{source}{}", with_output(.output))]
    Command {
        #[source]
        source: ProcessError,
        output: String,
    },

    #[error("restore pipeline failed: {source}{}", with_output(.output))]
    Pipeline {
        #[source]
        source: ProcessError,
        output: String,
    },

    #[error("archive already exists: {}", .0.display())]
    ArchiveExists(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

fn with_output(output: &str) -> String {
    if output.is_empty() {
        String::new()
    } else {
        format!(": {}", output)
    }
}

impl BackupError {
    /// Diagnostic text captured from the failing tool, if any.
    pub fn output(&self) -> Option<&str> {
        match self {
            BackupError::Command { output, .. } | BackupError::Pipeline { output, .. } => {
                Some(output.as_str()).filter(|o| !o.is_empty())
            }
            _ => None,
        }
    }

    /// The underlying process failure, if this error came from a tool.
    pub fn process_error(&self) -> Option<&ProcessError> {
        match self {
            BackupError::Command { source, .. } | BackupError::Pipeline { source, .. } => {
                Some(source)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_error_display_includes_output() {
        let err = BackupError::Command {
            source: ProcessError::Exit {
                program: "mysqldump".into(),
                code: Some(2),
            },
            output: "Access denied for user 'root'".into(),
        };
        assert_eq!(
            err.to_string(),
            "`mysqldump` exited with status 2: Access denied for user 'root'"
        );
        assert_eq!(err.output(), Some("Access denied for user 'root'"));
    }

    #[test]
    fn test_empty_output_is_not_reported() {
        let err = BackupError::Pipeline {
            source: ProcessError::Exit {
                program: "pg_restore".into(),
                code: None,
            },
            output: String::new(),
        };
        assert_eq!(
            err.to_string(),
            "restore pipeline failed: `pg_restore` exited with no status (terminated by signal)"
        );
        assert!(err.output().is_none());
        assert!(err.process_error().is_some());
    }
}
