//! Thin wrapper over the container orchestration CLI. Every failure is fatal.
use std::process::{ExitStatus, Stdio};
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};
use txflood_core::ComposeConfig;

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("Orchestration program is empty")]
    EmptyProgram,

    #[error("Failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("`{command}` exited with {status}")]
    Failed { command: String, status: ExitStatus },

    #[error("Unexpected port mapping output: {0:?}")]
    BadPort(String),
}

pub struct Compose {
    program: Vec<String>,
    project: String,
}

impl Compose {
    pub fn new(config: &ComposeConfig) -> Result<Self, ComposeError> {
        let program: Vec<String> = config
            .program
            .split_whitespace()
            .map(str::to_string)
            .collect();
        if program.is_empty() {
            return Err(ComposeError::EmptyProgram);
        }
        Ok(Self {
            program,
            project: config.project.clone(),
        })
    }

    /// `up -d <service>`
    pub async fn up(&self, service: &str) -> Result<(), ComposeError> {
        info!("Starting {service}");
        self.run(&["up", "-d", service]).await
    }

    /// Host port published for `service`'s `private_port`.
    pub async fn port(&self, service: &str, private_port: u16) -> Result<u16, ComposeError> {
        let out = self
            .capture(&["port", service, &private_port.to_string()])
            .await?;
        parse_port(&out)
    }

    /// Run `args` inside the running `service` container, inheriting stdio.
    pub async fn exec(&self, service: &str, args: &[String]) -> Result<(), ComposeError> {
        let mut full = vec!["exec", service];
        full.extend(args.iter().map(String::as_str));
        self.run(&full).await
    }

    fn command(&self, args: &[&str]) -> (Command, String) {
        let mut command = Command::new(&self.program[0]);
        command
            .args(&self.program[1..])
            .arg("-p")
            .arg(&self.project)
            .args(args);

        let rendered = format!("{} -p {} {}", self.program.join(" "), self.project, args.join(" "));
        (command, rendered)
    }

    async fn run(&self, args: &[&str]) -> Result<(), ComposeError> {
        let (mut command, rendered) = self.command(args);
        debug!("Running `{rendered}`");
        let status = command
            .status()
            .await
            .map_err(|source| ComposeError::Spawn {
                command: rendered.clone(),
                source,
            })?;
        check(status, rendered)
    }

    async fn capture(&self, args: &[&str]) -> Result<String, ComposeError> {
        let (mut command, rendered) = self.command(args);
        debug!("Running `{rendered}`");
        let output = command
            .stdout(Stdio::piped())
            .output()
            .await
            .map_err(|source| ComposeError::Spawn {
                command: rendered.clone(),
                source,
            })?;
        check(output.status, rendered)?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

fn check(status: ExitStatus, command: String) -> Result<(), ComposeError> {
    if status.success() {
        Ok(())
    } else {
        Err(ComposeError::Failed { command, status })
    }
}

/// `0.0.0.0:32822` -> `32822`
fn parse_port(out: &str) -> Result<u16, ComposeError> {
    out.trim()
        .lines()
        .next()
        .and_then(|line| line.rsplit(':').next())
        .and_then(|port| port.trim().parse().ok())
        .ok_or_else(|| ComposeError::BadPort(out.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compose(program: &str) -> Compose {
        Compose::new(&ComposeConfig {
            program: program.to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn port_output() {
        assert_eq!(parse_port("0.0.0.0:32822\n").unwrap(), 32822);
        assert_eq!(parse_port("0.0.0.0:80\n:::80\n").unwrap(), 80);
        assert!(matches!(parse_port(""), Err(ComposeError::BadPort(_))));
        assert!(matches!(
            parse_port("no such service"),
            Err(ComposeError::BadPort(_))
        ));
    }

    #[test]
    fn empty_program_is_rejected() {
        let res = Compose::new(&ComposeConfig {
            program: "  ".to_string(),
            ..Default::default()
        });
        assert!(matches!(res, Err(ComposeError::EmptyProgram)));
    }

    #[tokio::test]
    async fn success_and_failure() {
        compose("true").up("mdb").await.unwrap();

        let err = compose("false").up("mdb").await.unwrap_err();
        match err {
            ComposeError::Failed { command, .. } => {
                assert_eq!(command, "false -p bench_create up -d mdb")
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn project_and_arguments_are_passed() {
        // `echo` stands in for the orchestration tool and repeats its argv.
        let out = compose("echo")
            .capture(&["port", "graphite", "80"])
            .await
            .unwrap();
        assert_eq!(out.trim(), "-p bench_create port graphite 80");
    }

    #[tokio::test]
    async fn port_via_program_output() {
        // `sh -c` takes the trailing arguments as positional parameters.
        let compose = Compose {
            program: vec![
                "sh".to_string(),
                "-c".to_string(),
                "echo 0.0.0.0:49153".to_string(),
            ],
            project: "bench_create".to_string(),
        };
        assert_eq!(compose.port("graphite", 80).await.unwrap(), 49153);
    }

    #[tokio::test]
    async fn missing_program_fails_to_spawn() {
        let err = compose("definitely-not-a-real-binary-txflood")
            .up("mdb")
            .await
            .unwrap_err();
        assert!(matches!(err, ComposeError::Spawn { .. }));
    }
}
