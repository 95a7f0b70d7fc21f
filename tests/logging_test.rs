use anyhow::Result;
use std::fs;
use tempfile::tempdir;
use tracing::error;

use inventory_stager::logging::init_logging;

#[test]
fn test_error_logged_before_guard_drop_reaches_file() -> Result<()> {
    let dir = tempdir()?;
    let guard = init_logging(dir.path());

    error!(target: "inventory_stager", "Command failed: storage unavailable");
    drop(guard);

    let mut contents = String::new();
    for entry in fs::read_dir(dir.path())? {
        let path = entry?.path();
        if path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with("inventory_stager.log"))
        {
            contents.push_str(&fs::read_to_string(&path)?);
        }
    }

    assert!(contents.contains("Command failed: storage unavailable"));
    assert!(contents.contains("\"level\":\"ERROR\""));
    Ok(())
}
