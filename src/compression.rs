// src/compression.rs
use crate::error::BackupError;
use crate::process::{run_checked, Invocation, ProcessRunner};
use std::path::{Path, PathBuf};
use tracing::info;

pub const GZIP_MIME: &str = "application/gzip";

/// Archiver driving the `gzip` executable.
#[derive(Debug, Clone)]
pub struct Gzip {
    program: String,
}

impl Gzip {
    pub fn new(program: impl Into<String>) -> Self {
        Gzip {
            program: program.into(),
        }
    }

    /// Path of the archive produced for `source`.
    pub fn archive_path(source: &Path) -> PathBuf {
        let mut name = source.as_os_str().to_owned();
        name.push(".gz");
        PathBuf::from(name)
    }

    /// Compresses `source` into `<source>.gz`, keeping `source` in place.
    pub fn compress_invocation(&self, source: &Path, level: Option<u8>) -> Invocation {
        let mut inv = Invocation::new(&self.program);
        if let Some(level) = level {
            inv = inv.arg(format!("-{}", level.clamp(1, 9)));
        }
        inv.args(["-k", "-f"]).arg(source.to_string_lossy().into_owned())
    }

    /// Writes the decompressed contents of `archive` to stdout, for use as the
    /// producer side of a restore pipe.
    pub fn decompress_invocation(&self, archive: &Path) -> Invocation {
        Invocation::new(&self.program)
            .args(["-d", "-c"])
            .arg(archive.to_string_lossy().into_owned())
    }

    pub async fn compress(
        &self,
        runner: &dyn ProcessRunner,
        source: &Path,
        level: Option<u8>,
    ) -> Result<PathBuf, BackupError> {
        let output_path = Self::archive_path(source);
        run_checked(runner, &self.compress_invocation(source, level)).await?;
        info!("Compressed {:?} -> {:?}", source, output_path);
        Ok(output_path)
    }
}

#[cfg(test)]
impl Default for Gzip {
    fn default() -> Self {
        Gzip::new("gzip")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::testing::RecordingRunner;
    use crate::process::SystemRunner;
    use tempfile::tempdir;

    #[test]
    fn test_archive_path_appends_suffix() {
        assert_eq!(
            Gzip::archive_path(Path::new("/tmp/bu_shop_1.sql")),
            PathBuf::from("/tmp/bu_shop_1.sql.gz")
        );
    }

    #[test]
    fn test_compress_invocation_level() {
        let gzip = Gzip::new("/usr/bin/gzip");
        let inv = gzip.compress_invocation(Path::new("dump"), Some(9));
        assert_eq!(inv.program, "/usr/bin/gzip");
        assert_eq!(inv.args, vec!["-9", "-k", "-f", "dump"]);

        let inv = gzip.compress_invocation(Path::new("dump"), None);
        assert_eq!(inv.args, vec!["-k", "-f", "dump"]);
    }

    #[tokio::test]
    async fn test_compress_failure_is_wrapped() {
        let runner = RecordingRunner::new(|_| {
            Ok(crate::process::Output::failure(1, "gzip: dump: No such file or directory"))
        });
        let err = Gzip::default()
            .compress(&runner, Path::new("dump"), None)
            .await
            .unwrap_err();
        assert_eq!(err.output(), Some("gzip: dump: No such file or directory"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_compress_with_real_gzip() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("data.sql");
        std::fs::write(&source, "CREATE TABLE t (id int);\n").unwrap();

        let archive = Gzip::default()
            .compress(&SystemRunner, &source, Some(9))
            .await
            .unwrap();

        assert_eq!(archive, dir.path().join("data.sql.gz"));
        assert!(std::fs::metadata(&archive).unwrap().len() > 0);
        assert!(source.exists());

        let output = SystemRunner
            .run(&Gzip::default().decompress_invocation(&archive))
            .await
            .unwrap();
        assert_eq!(output.stdout, b"CREATE TABLE t (id int);\n");
    }
}
