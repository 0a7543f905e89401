use crate::sanitize::sanitize_message;
use crate::ConvertError;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

/// Reject binary paths that could smuggle shell syntax.
pub fn validate_binary_path(path: &str) -> anyhow::Result<()> {
    let dangerous_chars = [';', '|', '&', '$', '`', '(', ')', '<', '>', '\n', '\r'];
    if path.trim().is_empty() {
        return Err(anyhow::anyhow!("Engine path is empty"));
    }
    if path.chars().any(|c| dangerous_chars.contains(&c)) {
        return Err(anyhow::anyhow!(
            "Invalid engine path {:?}: contains dangerous characters",
            path
        ));
    }
    Ok(())
}

/// Run `program` inside `workdir` and fail with its sanitized stderr on a non-zero exit.
///
/// The child is killed if the returned future is dropped.
pub(crate) async fn run(
    program: &str,
    args: &[String],
    workdir: &Path,
    engine: &'static str,
) -> Result<(), ConvertError> {
    let output = Command::new(program)
        .args(args)
        .current_dir(workdir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| ConvertError::failed(format!("Failed to execute {}: {}", engine, e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        let diagnostics = if stderr.trim().is_empty() {
            stdout
        } else {
            stderr
        };
        tracing::warn!(engine, status = %output.status, "Engine exited with failure");
        return Err(ConvertError::Failed {
            message: format!("{} exited with {}", engine, output.status),
            trace: Some(sanitize_message(&diagnostics, &[workdir])).filter(|t| !t.is_empty()),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_shell_metacharacters() {
        assert!(validate_binary_path("soffice").is_ok());
        assert!(validate_binary_path("/usr/bin/weasyprint").is_ok());
        assert!(validate_binary_path("soffice; rm -rf /").is_err());
        assert!(validate_binary_path("").is_err());
    }
}
