//! External tool resolution and execution
//!
//! The converter and segmenter are separate programs. Each one is located
//! through an environment-variable override, then next to the running
//! executable, then in the working directory, and finally left to `PATH`.
//! Their output is streamed into a [`ProgressSink`] line by line.

use crate::error::{Result, SarcopipeError};
use crate::progress::ProgressSink;
use log::debug;
use std::env;
use std::ffi::OsString;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};

/// An external program known to the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolSpec {
    /// Program name without platform suffix
    pub name: &'static str,

    /// Environment variable that overrides the program location
    pub env_var: &'static str,
}

/// DICOM to NIfTI converter
pub const DCM2NIIX: ToolSpec = ToolSpec {
    name: "dcm2niix",
    env_var: "SARCOPIPE_DCM2NIIX_BIN",
};

/// Muscle and fat segmentation tool
pub const SEGMENTER: ToolSpec = ToolSpec {
    name: "TotalSegmentator",
    env_var: "SARCOPIPE_SEGMENTER_BIN",
};

impl ToolSpec {
    /// Resolves the program location for this tool
    pub fn resolve(&self) -> PathBuf {
        let search_dirs: Vec<PathBuf> = [
            env::current_exe()
                .ok()
                .and_then(|exe| exe.parent().map(Path::to_path_buf)),
            env::current_dir().ok(),
        ]
        .into_iter()
        .flatten()
        .collect();

        resolve_program(env::var_os(self.env_var), &search_dirs, self.name)
    }
}

/// Picks the override if set, else the first existing candidate, else the bare name
fn resolve_program(
    override_value: Option<OsString>,
    search_dirs: &[PathBuf],
    name: &str,
) -> PathBuf {
    if let Some(value) = override_value.filter(|v| !v.is_empty()) {
        return PathBuf::from(value);
    }

    let exe_name = format!("{}{}", name, env::consts::EXE_SUFFIX);
    for dir in search_dirs {
        let candidate = dir.join(&exe_name);
        if candidate.is_file() {
            debug!("Resolved {} to {}", name, candidate.display());
            return candidate;
        }
    }

    PathBuf::from(exe_name)
}

/// Program plus the arguments that always precede the tool-specific ones
///
/// Lets a script-based tool run through its interpreter, e.g. `python predict.py`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: PathBuf,
    pub leading_args: Vec<OsString>,
}

impl ToolCommand {
    /// Creates a command for a bare program
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
        }
    }

    /// Creates a command for a resolved tool
    pub fn resolve(spec: &ToolSpec) -> Self {
        Self::new(spec.resolve())
    }

    /// Builder: Arguments placed before the tool-specific arguments
    pub fn with_leading_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.leading_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Starts a `Command` with the program and leading arguments
    pub fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.leading_args);
        command
    }
}

/// Renders a command line for progress output
pub fn describe(command: &Command) -> String {
    std::iter::once(command.get_program())
        .chain(command.get_args())
        .map(|part| part.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Runs a command, forwarding its output to the sink as it is produced
///
/// Standard output and standard error are read on their own threads and
/// forwarded in arrival order while the process runs. Carriage-return
/// progress bars collapse to their latest state and blank lines are dropped.
///
/// # Errors
///
/// Returns [`SarcopipeError::ToolError`] if the program cannot be started.
/// A non-zero exit is not an error; inspect the returned status.
pub fn run_streaming(command: &mut Command, sink: &mut dyn ProgressSink) -> Result<ExitStatus> {
    let program = command.get_program().to_string_lossy().into_owned();
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| SarcopipeError::ToolError {
            program: program.clone(),
            message: format!("could not start: {}", e),
        })?;

    let (tx, rx) = mpsc::channel();
    let mut readers = Vec::with_capacity(2);
    if let Some(stdout) = child.stdout.take() {
        readers.push(spawn_reader(stdout, tx.clone()));
    }
    if let Some(stderr) = child.stderr.take() {
        readers.push(spawn_reader(stderr, tx.clone()));
    }
    // The channel closes once both readers hit end of stream
    drop(tx);

    for line in rx {
        forward_line(&line, sink);
    }

    for reader in readers {
        if reader.join().is_err() {
            sink.warn(&format!("Lost part of the output of {}", program));
        }
    }

    Ok(child.wait()?)
}

fn spawn_reader<R: Read + Send + 'static>(reader: R, tx: Sender<String>) -> JoinHandle<()> {
    thread::spawn(move || {
        for_each_line(reader, |line| {
            let _ = tx.send(line);
        })
    })
}

/// Calls `f` with every newline-terminated chunk, decoded lossily
fn for_each_line<R: Read>(reader: R, mut f: impl FnMut(String)) {
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) | Err(_) => break,
            Ok(_) => f(String::from_utf8_lossy(&buf).into_owned()),
        }
    }
}

fn forward_line(raw: &str, sink: &mut dyn ProgressSink) {
    if let Some(line) = progress_line(raw) {
        sink.info(line);
    }
}

/// Last non-blank carriage-return segment of an output line
fn progress_line(raw: &str) -> Option<&str> {
    raw.split('\r')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .last()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::MemorySink;
    use rstest::rstest;
    use std::fs::File;
    use tempfile::TempDir;

    #[rstest]
    #[case("Convert 1 DICOM\n", Some("Convert 1 DICOM"))]
    #[case(" 10%\r 50%\r100%\n", Some("100%"))]
    #[case("done\r\n", Some("done"))]
    #[case("   \n", None)]
    #[case("", None)]
    fn test_progress_line(#[case] raw: &str, #[case] expected: Option<&str>) {
        assert_eq!(progress_line(raw), expected);
    }

    #[test]
    fn test_resolve_prefers_override() {
        let temp_dir = TempDir::new().unwrap();
        File::create(temp_dir.path().join(format!("dcm2niix{}", env::consts::EXE_SUFFIX)))
            .unwrap();

        let resolved = resolve_program(
            Some(OsString::from("/opt/tools/dcm2niix")),
            &[temp_dir.path().to_path_buf()],
            "dcm2niix",
        );
        assert_eq!(resolved, PathBuf::from("/opt/tools/dcm2niix"));
    }

    #[test]
    fn test_resolve_searches_dirs_in_order() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        let exe_name = format!("dcm2niix{}", env::consts::EXE_SUFFIX);
        File::create(second.path().join(&exe_name)).unwrap();

        let resolved = resolve_program(
            Some(OsString::new()),
            &[first.path().to_path_buf(), second.path().to_path_buf()],
            "dcm2niix",
        );
        assert_eq!(resolved, second.path().join(&exe_name));
    }

    #[test]
    fn test_resolve_falls_back_to_path_lookup() {
        let empty = TempDir::new().unwrap();
        let resolved = resolve_program(None, &[empty.path().to_path_buf()], "dcm2niix");
        assert_eq!(
            resolved,
            PathBuf::from(format!("dcm2niix{}", env::consts::EXE_SUFFIX))
        );
    }

    #[test]
    fn test_tool_command_leading_args() {
        let tool = ToolCommand::new("python").with_leading_args(["predict_muscle_fat.py"]);
        let mut command = tool.command();
        command.arg("--input").arg("nifti");
        assert_eq!(describe(&command), "python predict_muscle_fat.py --input nifti");
    }

    #[cfg(unix)]
    #[test]
    fn test_run_streaming_forwards_output() {
        let mut command = Command::new("sh");
        command
            .arg("-c")
            .arg("echo converting; printf ' 10%%\\r100%%\\n'; echo warning >&2");

        let mut sink = MemorySink::new();
        let status = run_streaming(&mut command, &mut sink).unwrap();

        assert!(status.success());
        let mut lines = sink.lines.clone();
        lines.sort();
        assert_eq!(lines, vec!["100%", "converting", "warning"]);
        assert!(
            sink.lines.iter().position(|l| l == "converting")
                < sink.lines.iter().position(|l| l == "100%")
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_run_streaming_forwards_stderr_while_running() {
        let mut command = Command::new("sh");
        command
            .arg("-c")
            .arg("echo progress-on-stderr >&2; sleep 1; echo done");

        let start = std::time::Instant::now();
        let mut seen = Vec::new();
        let mut sink = |line: &str| seen.push((line.to_string(), start.elapsed()));
        let status = run_streaming(&mut command, &mut sink).unwrap();

        assert!(status.success());
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].0, "progress-on-stderr");
        assert_eq!(seen[1].0, "done");
        assert!(seen[0].1 < std::time::Duration::from_millis(900));
    }

    #[cfg(unix)]
    #[test]
    fn test_run_streaming_reports_exit_code() {
        let mut command = Command::new("sh");
        command.arg("-c").arg("exit 3");

        let mut sink = MemorySink::new();
        let status = run_streaming(&mut command, &mut sink).unwrap();

        assert_eq!(status.code(), Some(3));
    }

    #[test]
    fn test_run_streaming_missing_program() {
        let mut command = Command::new("/nonexistent/sarcopipe-tool");
        let mut sink = MemorySink::new();
        let err = run_streaming(&mut command, &mut sink).unwrap_err();
        assert!(matches!(err, SarcopipeError::ToolError { .. }));
    }
}
