use dt_core::config::{DEFAULT_ADB, DEFAULT_PORT};
use dt_core::BridgeError;
use std::io::ErrorKind;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{error, info, warn};

const STDERR_LIMIT: usize = 4 * 1024;

/// `adb forward tcp:<port> tcp:<port>` for one port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortForward {
    pub program: String,
    pub port: u16,
}

impl PortForward {
    pub fn new(port: u16) -> Self {
        Self {
            program: DEFAULT_ADB.to_string(),
            port,
        }
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn args(&self) -> [String; 3] {
        let endpoint = format!("tcp:{}", self.port);
        ["forward".to_string(), endpoint.clone(), endpoint]
    }

    pub async fn establish(&self) -> Result<(), BridgeError> {
        let output = Command::new(&self.program)
            .args(self.args())
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|err| match err.kind() {
                ErrorKind::NotFound => BridgeError::NotFound {
                    program: self.program.clone(),
                },
                _ => BridgeError::Spawn {
                    program: self.program.clone(),
                    reason: err.to_string(),
                },
            })?;

        if output.status.success() {
            return Ok(());
        }
        Err(BridgeError::Failed {
            program: self.program.clone(),
            code: output.status.code(),
            stderr: limit_output(output.stderr),
        })
    }
}

impl Default for PortForward {
    fn default() -> Self {
        Self::new(DEFAULT_PORT)
    }
}

/// Runs the forward and reports the outcome. A failure is not fatal: the
/// forward may already be in place from an earlier run.
pub async fn setup(forward: &PortForward) -> bool {
    info!(port = forward.port, "setting up port forward tcp:{0} -> tcp:{0}", forward.port);
    match forward.establish().await {
        Ok(()) => {
            info!(port = forward.port, "port forward established");
            true
        }
        Err(err @ BridgeError::NotFound { .. }) => {
            warn!("{err}");
            false
        }
        Err(err) => {
            error!("{err}");
            false
        }
    }
}

fn limit_output(data: Vec<u8>) -> String {
    let mut sliced = data;
    sliced.truncate(STDERR_LIMIT);
    String::from_utf8_lossy(&sliced).trim_end().to_string()
}
