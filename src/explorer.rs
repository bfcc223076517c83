//! Data explorer launcher
//!
//! Builds the `docker run` invocation for the explorer web app and hands it
//! to a runner. The runner is a trait so the argv can be checked without a
//! container runtime.

use serde::{Deserialize, Serialize};
use std::process::{Command, Stdio};

use crate::error::{Result, SpecError};

pub const DEFAULT_CONTAINER: &str = "ghcr.io/ml6team/data_explorer";
pub const DEFAULT_TAG: &str = "latest";
pub const DEFAULT_PORT: u16 = 8501;
pub const DEFAULT_NAME: &str = "fondant-explorer";

/// Port the app listens on inside the container.
const CONTAINER_PORT: u16 = 8501;
/// Where the data directory is mounted inside the container.
const ARTIFACTS_MOUNT: &str = "/artifacts";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeMount {
    pub host_path: String,
    pub container_path: String,
    #[serde(default)]
    pub mode: Option<String>,
}

impl VolumeMount {
    fn to_arg(&self) -> String {
        match &self.mode {
            Some(mode) => format!("{}:{}:{}", self.host_path, self.container_path, mode),
            None => format!("{}:{}", self.host_path, self.container_path),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplorerConfig {
    pub name: String,
    pub rm: bool,
    pub port: u16,
    pub container: String,
    pub tag: String,
    #[serde(default)]
    pub data_directory: Option<String>,
    #[serde(default)]
    pub credentials: Option<String>,
    #[serde(default)]
    pub volumes: Vec<VolumeMount>,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            rm: true,
            port: DEFAULT_PORT,
            container: DEFAULT_CONTAINER.to_string(),
            tag: DEFAULT_TAG.to_string(),
            data_directory: None,
            credentials: None,
            volumes: vec![],
        }
    }
}

impl ExplorerConfig {
    /// Full argv, starting with the runtime binary.
    pub fn command(&self) -> Vec<String> {
        let mut argv: Vec<String> = vec!["docker".into(), "run".into(), "--name".into()];
        argv.push(self.name.clone());
        if self.rm {
            argv.push("--rm".into());
        }
        argv.push("-p".into());
        argv.push(format!("{}:{}", self.port, CONTAINER_PORT));

        // Credentials are mounted read-only.
        if let Some(credentials) = &self.credentials {
            argv.push("-v".into());
            argv.push(format!("{}:ro", credentials));
        }
        if let Some(data) = &self.data_directory {
            argv.push("-v".into());
            argv.push(format!("{}:{}", data, ARTIFACTS_MOUNT));
        }
        for volume in &self.volumes {
            argv.push("-v".into());
            argv.push(volume.to_arg());
        }

        argv.push(format!("{}:{}", self.container, self.tag));
        argv
    }
}

pub trait CommandRunner {
    fn run(&self, argv: &[String]) -> Result<()>;
}

/// Runs the command with the host's container runtime.
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run(&self, argv: &[String]) -> Result<()> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| SpecError::Explorer("empty command".to_string()))?;

        let status = Command::new(program)
            .args(args)
            .stdout(Stdio::null())
            .status()
            .map_err(|e| SpecError::Explorer(format!("{}: {}", program, e)))?;

        if !status.success() {
            return Err(SpecError::Explorer(format!(
                "{} exited with code {:?}",
                program,
                status.code()
            )));
        }
        Ok(())
    }
}

pub fn run_explorer_app(config: &ExplorerConfig, runner: &dyn CommandRunner) -> Result<()> {
    let argv = config.command();
    log::info!(
        "Starting data explorer on http://localhost:{} ({})",
        config.port,
        argv.join(" ")
    );
    runner.run(&argv)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recorder {
        calls: RefCell<Vec<Vec<String>>>,
    }

    impl CommandRunner for Recorder {
        fn run(&self, argv: &[String]) -> Result<()> {
            self.calls.borrow_mut().push(argv.to_vec());
            Ok(())
        }
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_default_command() {
        let recorder = Recorder::default();
        run_explorer_app(&ExplorerConfig::default(), &recorder).unwrap();
        assert_eq!(
            recorder.calls.into_inner(),
            vec![strings(&[
                "docker",
                "run",
                "--name",
                "fondant-explorer",
                "--rm",
                "-p",
                "8501:8501",
                "ghcr.io/ml6team/data_explorer:latest",
            ])]
        );
    }

    #[test]
    fn test_full_options() {
        let config = ExplorerConfig {
            credentials: Some("/path/to/credentials".into()),
            data_directory: Some("/path/to/source".into()),
            container: "ghcr.io/ml6team/data_explorer_test".into(),
            tag: "earliest".into(),
            port: 1234,
            ..Default::default()
        };
        assert_eq!(
            config.command(),
            strings(&[
                "docker",
                "run",
                "--name",
                "fondant-explorer",
                "--rm",
                "-p",
                "1234:8501",
                "-v",
                "/path/to/credentials:ro",
                "-v",
                "/path/to/source:/artifacts",
                "ghcr.io/ml6team/data_explorer_test:earliest",
            ])
        );
    }

    #[test]
    fn test_credentials_only() {
        let config = ExplorerConfig {
            credentials: Some("/path/to/credentials".into()),
            ..Default::default()
        };
        assert_eq!(
            config.command(),
            strings(&[
                "docker",
                "run",
                "--name",
                "fondant-explorer",
                "--rm",
                "-p",
                "8501:8501",
                "-v",
                "/path/to/credentials:ro",
                "ghcr.io/ml6team/data_explorer:latest",
            ])
        );
    }

    #[test]
    fn test_data_directory_only() {
        let config = ExplorerConfig {
            data_directory: Some("/path/to/source".into()),
            ..Default::default()
        };
        assert_eq!(
            config.command(),
            strings(&[
                "docker",
                "run",
                "--name",
                "fondant-explorer",
                "--rm",
                "-p",
                &format!("{}:8501", DEFAULT_PORT),
                "-v",
                "/path/to/source:/artifacts",
                &format!("{}:{}", DEFAULT_CONTAINER, DEFAULT_TAG),
            ])
        );
    }

    #[test]
    fn test_extra_volume_and_no_rm() {
        let config = ExplorerConfig {
            rm: false,
            volumes: vec![VolumeMount {
                host_path: "/cache".into(),
                container_path: "/root/.cache".into(),
                mode: Some("rw".into()),
            }],
            ..Default::default()
        };
        let argv = config.command();
        assert!(!argv.contains(&"--rm".to_string()));
        assert_eq!(argv[argv.len() - 2], "/cache:/root/.cache:rw");
    }

    #[cfg(unix)]
    #[test]
    fn test_chatty_child_does_not_block() {
        use std::sync::mpsc;
        use std::time::Duration;

        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let argv = strings(&["sh", "-c", "head -c 200000 /dev/zero; echo done"]);
            let _ = tx.send(ProcessRunner.run(&argv));
        });

        let result = rx
            .recv_timeout(Duration::from_secs(10))
            .expect("runner did not return");
        assert!(result.is_ok());
    }

    #[test]
    fn test_failing_child_is_reported() {
        let err = ProcessRunner
            .run(&strings(&["sh", "-c", "exit 3"]))
            .unwrap_err();
        assert!(err.to_string().contains("exited with code Some(3)"));
    }

    #[test]
    fn test_empty_command_is_an_error() {
        assert!(ProcessRunner.run(&[]).is_err());
    }
}
