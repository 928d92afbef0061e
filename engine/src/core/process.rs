//! Subprocess construction for the FFmpeg tool family.
//!
//! Every external binary goes through these builders so Windows never
//! flashes a console window and a dropped child never outlives its owner.

use std::ffi::OsStr;
use std::process::Stdio;

#[cfg(target_os = "windows")]
const CREATE_NO_WINDOW: u32 = 0x08000000;

/// Blocking command with stdin closed
pub fn std_command(program: impl AsRef<OsStr>) -> std::process::Command {
    let mut cmd = std::process::Command::new(program);
    cmd.stdin(Stdio::null());
    #[cfg(target_os = "windows")]
    {
        use std::os::windows::process::CommandExt;
        cmd.creation_flags(CREATE_NO_WINDOW);
    }
    cmd
}

/// Async command that is killed when its handle is dropped.
///
/// stdin is closed; callers that stream into the child override it.
pub fn tokio_command(program: impl AsRef<OsStr>) -> tokio::process::Command {
    let mut cmd = tokio::process::Command::new(program);
    cmd.stdin(Stdio::null()).kill_on_drop(true);
    #[cfg(target_os = "windows")]
    {
        cmd.creation_flags(CREATE_NO_WINDOW);
    }
    cmd
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(not(target_os = "windows"))]
    #[test]
    fn test_std_command_runs() {
        let output = std_command("echo").arg("capgen").output().unwrap();
        assert!(output.status.success());
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "capgen");
    }

    #[cfg(not(target_os = "windows"))]
    #[tokio::test]
    async fn test_tokio_command_runs() {
        let output = tokio_command("echo").arg("capgen").output().await.unwrap();
        assert!(output.status.success());
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "capgen");
    }

    #[cfg(not(target_os = "windows"))]
    #[tokio::test]
    async fn test_tokio_command_stdin_is_closed() {
        // `cat` exits immediately on a closed stdin
        let output = tokio_command("cat").output().await.unwrap();
        assert!(output.status.success());
        assert!(output.stdout.is_empty());
    }
}
