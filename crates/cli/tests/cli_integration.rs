//! Integration tests for the treewatch binary

mod common;

use anyhow::Result;
use common::{TwCommand, WatchProcess};
use std::time::Duration;

#[test]
fn test_help_exits_zero() -> Result<()> {
    let result = TwCommand::new().args(&["--help"]).execute()?;
    assert!(result.success(), "stderr: {}", result.stderr);
    Ok(())
}

#[test]
fn test_missing_argument_exits_one() -> Result<()> {
    let result = TwCommand::new().execute()?;
    assert_eq!(result.exit_code, 1);
    Ok(())
}

#[test]
fn test_unknown_flag_exits_one() -> Result<()> {
    let result = TwCommand::new().args(&["--bogus", "/tmp"]).execute()?;
    assert_eq!(result.exit_code, 1);
    Ok(())
}

#[test]
fn test_nonexistent_root_exits_one() -> Result<()> {
    let temp_dir = tempfile::tempdir()?;
    let missing = temp_dir.path().join("missing");
    let missing_arg = missing.to_string_lossy().to_string();

    let result = TwCommand::new().args(&[&missing_arg]).execute()?;
    assert_eq!(result.exit_code, 1);
    assert!(result.contains_stderr("path not found"), "stderr: {}", result.stderr);
    assert!(result.stdout.is_empty());
    Ok(())
}

#[test]
fn test_invalid_delay_exits_one() -> Result<()> {
    let temp_dir = tempfile::tempdir()?;
    let root_arg = temp_dir.path().to_string_lossy().to_string();

    let result = TwCommand::new().args(&["--delay-ms", "0", &root_arg]).execute()?;
    assert_eq!(result.exit_code, 1);
    Ok(())
}

#[test]
fn test_streams_created_file() -> Result<()> {
    let temp_dir = tempfile::tempdir()?;
    let root = std::fs::canonicalize(temp_dir.path())?;
    let root_arg = root.to_string_lossy().to_string();

    let process = WatchProcess::spawn(&[&root_arg])?;
    std::thread::sleep(Duration::from_millis(300));

    let file = root.join("streamed.txt");
    std::fs::write(&file, b"data")?;

    let expected = format!("1|{}", file.display());
    process.wait_for_line(&expected, Duration::from_secs(5))?;
    Ok(())
}

#[test]
fn test_json_format() -> Result<()> {
    let temp_dir = tempfile::tempdir()?;
    let root = std::fs::canonicalize(temp_dir.path())?;
    let root_arg = root.to_string_lossy().to_string();

    let process = WatchProcess::spawn(&["--format", "json", &root_arg])?;
    std::thread::sleep(Duration::from_millis(300));

    let dir = root.join("fresh");
    std::fs::create_dir(&dir)?;

    let expected = format!(r#"{{"type":1,"path":"{}"}}"#, dir.display());
    process.wait_for_line(&expected, Duration::from_secs(5))?;
    Ok(())
}

#[cfg(unix)]
#[test]
fn test_sigterm_exits_zero_and_drains_pending() -> Result<()> {
    let temp_dir = tempfile::tempdir()?;
    let root = std::fs::canonicalize(temp_dir.path())?;
    let root_arg = root.to_string_lossy().to_string();

    // Long delay: the record can only come out through the shutdown flush
    let mut process = WatchProcess::spawn(&["--delay-ms", "10000", &root_arg])?;
    std::thread::sleep(Duration::from_millis(300));

    let file = root.join("pending.txt");
    std::fs::write(&file, b"data")?;
    std::thread::sleep(Duration::from_millis(500));

    process.terminate()?;
    assert_eq!(process.wait_exit(Duration::from_secs(5))?, Some(0));

    let expected = format!("1|{}", file.display());
    process.wait_for_line(&expected, Duration::from_secs(2))?;
    Ok(())
}
