use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::debug;

use crate::error::BenchError;

const INDEX_FILE_NAME: &str = ".code-index.db";

/// Exit statuses the reference tool uses for "matches" and "no matches".
pub const RG_ALLOWED_STATUSES: &[i32] = &[0, 1];
pub const CODE_INDEXER_ALLOWED_STATUSES: &[i32] = &[0];

/// One external command line, kept as data so it can be both executed and
/// reported verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Shell-quoted rendering, suitable for copy-paste reproduction.
    pub fn render(&self) -> String {
        std::iter::once(&self.program)
            .chain(self.args.iter())
            .map(|part| shell_quote(part))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn shell_quote(part: &str) -> String {
    let safe = !part.is_empty()
        && part
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || "@%+=:,./-_".contains(ch));
    if safe {
        part.to_string()
    } else {
        format!("'{}'", part.replace('\'', "'\"'\"'"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub status: i32,
    pub stdout: String,
}

/// Blocking executor for external tools.
///
/// A status outside `allowed` is an [`BenchError::ExternalTool`]; there is no
/// retry and no timeout.
pub trait CommandRunner {
    fn capture(&self, invocation: &Invocation, allowed: &[i32]) -> Result<ToolOutput, BenchError>;

    /// Runs with output discarded. This is the form that gets timed.
    fn quiet(&self, invocation: &Invocation, allowed: &[i32]) -> Result<(), BenchError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl ProcessRunner {
    fn spawn_error(invocation: &Invocation, err: std::io::Error) -> BenchError {
        if err.kind() == ErrorKind::NotFound {
            BenchError::MissingResource {
                what: "executable",
                path: PathBuf::from(&invocation.program),
            }
        } else {
            BenchError::ExternalTool {
                command: invocation.render(),
                status: "spawn failed".to_string(),
                stderr: err.to_string(),
            }
        }
    }

    fn check_status(
        invocation: &Invocation,
        status: std::process::ExitStatus,
        allowed: &[i32],
        stderr: &[u8],
    ) -> Result<i32, BenchError> {
        match status.code() {
            Some(code) if allowed.contains(&code) => Ok(code),
            code => Err(BenchError::ExternalTool {
                command: invocation.render(),
                status: code
                    .map(|value| value.to_string())
                    .unwrap_or_else(|| "terminated by signal".to_string()),
                stderr: String::from_utf8_lossy(stderr).trim().to_string(),
            }),
        }
    }
}

impl CommandRunner for ProcessRunner {
    fn capture(&self, invocation: &Invocation, allowed: &[i32]) -> Result<ToolOutput, BenchError> {
        debug!(command = %invocation.render(), "running");
        let output = Command::new(&invocation.program)
            .args(&invocation.args)
            .output()
            .map_err(|err| Self::spawn_error(invocation, err))?;

        let status = Self::check_status(invocation, output.status, allowed, &output.stderr)?;
        Ok(ToolOutput {
            status,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        })
    }

    fn quiet(&self, invocation: &Invocation, allowed: &[i32]) -> Result<(), BenchError> {
        let status = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|err| Self::spawn_error(invocation, err))?;

        Self::check_status(invocation, status, allowed, &[])?;
        Ok(())
    }
}

/// The indexed definition-lookup tool under test.
#[derive(Debug, Clone)]
pub struct CodeIndexer {
    pub binary: PathBuf,
}

impl CodeIndexer {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn base(&self, index: &RepoIndex) -> Invocation {
        Invocation::new(self.binary.display().to_string())
            .arg("--db")
            .arg(index.db_path().display().to_string())
    }

    pub fn index_invocation(&self, index: &RepoIndex) -> Invocation {
        self.base(index)
            .arg("index")
            .arg(index.repo_path().display().to_string())
    }

    pub fn definition_invocation(&self, index: &RepoIndex, symbol: &str) -> Invocation {
        self.base(index).arg("definition").arg(symbol)
    }
}

/// The reference text-search tool.
#[derive(Debug, Clone)]
pub struct Ripgrep {
    pub program: String,
}

impl Ripgrep {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn search_invocation(&self, pattern: &str, glob: Option<&str>, path: &Path) -> Invocation {
        let mut invocation = Invocation::new(&self.program)
            .arg("--line-number")
            .arg("--no-heading")
            .arg(pattern);
        if let Some(glob) = glob {
            invocation = invocation.arg("--glob").arg(glob);
        }
        invocation.arg(path.display().to_string())
    }
}

/// Handle on the single on-disk index of one benchmark repository.
///
/// Every removal and rebuild of the index goes through this type, so there
/// is never more than one index per repository.
#[derive(Debug)]
pub struct RepoIndex {
    name: String,
    repo_path: PathBuf,
    db_path: PathBuf,
}

impl RepoIndex {
    /// Fails with `MissingResource` when the repository directory is absent.
    pub fn open(name: &str, repos_dir: &Path) -> Result<Self, BenchError> {
        let repo_path = repos_dir.join(name);
        if !repo_path.exists() {
            return Err(BenchError::MissingResource {
                what: "repository",
                path: repo_path,
            });
        }
        Ok(Self::at(name, repo_path))
    }

    pub fn at(name: &str, repo_path: PathBuf) -> Self {
        let db_path = repo_path.join(INDEX_FILE_NAME);
        Self {
            name: name.to_string(),
            repo_path,
            db_path,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn remove(&self) -> Result<(), BenchError> {
        match fs::remove_file(&self.db_path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(BenchError::Io {
                path: self.db_path.clone(),
                source,
            }),
        }
    }

    /// Removes any existing index, then builds a fresh one.
    pub fn rebuild(
        &self,
        indexer: &CodeIndexer,
        runner: &impl CommandRunner,
    ) -> Result<(), BenchError> {
        self.remove()?;
        runner.quiet(
            &indexer.index_invocation(self),
            CODE_INDEXER_ALLOWED_STATUSES,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_quotes_only_unsafe_parts() {
        let invocation = Invocation::new("rg")
            .arg("--line-number")
            .arg(r"fn parse\(")
            .arg("it's");
        assert_eq!(
            invocation.render(),
            r#"rg --line-number 'fn parse\(' 'it'"'"'s'"#
        );
        assert_eq!(Invocation::new("x").arg("").render(), "x ''");
    }

    #[test]
    fn search_invocation_includes_glob_when_present() {
        let rg = Ripgrep::new("rg");
        let with_glob = rg.search_invocation("struct Foo", Some("*.rs"), Path::new("/r/alpha"));
        assert_eq!(
            with_glob.args,
            vec!["--line-number", "--no-heading", "struct Foo", "--glob", "*.rs", "/r/alpha"]
        );
        let without = rg.search_invocation("struct Foo", None, Path::new("/r/alpha"));
        assert_eq!(without.args.len(), 4);
    }

    #[test]
    fn indexer_invocations_target_repo_index() {
        let index = RepoIndex::at("alpha", PathBuf::from("/r/alpha"));
        let indexer = CodeIndexer::new("/bin/code-indexer");
        assert_eq!(
            indexer.index_invocation(&index).render(),
            "/bin/code-indexer --db /r/alpha/.code-index.db index /r/alpha"
        );
        assert_eq!(
            indexer.definition_invocation(&index, "Config").render(),
            "/bin/code-indexer --db /r/alpha/.code-index.db definition Config"
        );
    }

    #[test]
    fn open_requires_existing_repository() {
        let dir = tempfile::tempdir().unwrap();
        let err = RepoIndex::open("missing", dir.path()).unwrap_err();
        assert!(matches!(
            err,
            BenchError::MissingResource {
                what: "repository",
                ..
            }
        ));

        fs::create_dir(dir.path().join("alpha")).unwrap();
        let index = RepoIndex::open("alpha", dir.path()).unwrap();
        assert_eq!(index.name(), "alpha");
        assert_eq!(index.db_path(), dir.path().join("alpha").join(".code-index.db"));
    }

    #[test]
    fn remove_deletes_existing_index_and_tolerates_absence() {
        let dir = tempfile::tempdir().unwrap();
        let index = RepoIndex::at("alpha", dir.path().to_path_buf());
        index.remove().unwrap();

        fs::write(index.db_path(), b"stale").unwrap();
        index.remove().unwrap();
        assert!(!index.db_path().exists());
    }

    #[test]
    fn process_runner_reports_missing_executable() {
        let runner = ProcessRunner;
        let invocation = Invocation::new("/definitely/not/a/real/speedbench-tool");
        let err = runner.capture(&invocation, &[0]).unwrap_err();
        assert!(matches!(
            err,
            BenchError::MissingResource {
                what: "executable",
                ..
            }
        ));
    }
}
