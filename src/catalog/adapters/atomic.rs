//! Whole-file replacement through a synced sibling temp file.

use cap_std::fs_utf8::Dir;
use std::io::Write;
use tracing::debug;

/// Replaces `name` in `dir` with `contents`.
///
/// The bytes go to `.<name>.<uuid>.tmp`, are synced, and the temp file is
/// renamed over `name`. A failed write removes the temp file.
pub(super) fn replace_file(dir: &Dir, name: &str, contents: &[u8]) -> std::io::Result<()> {
    let temp_name = format!(".{name}.{}.tmp", uuid::Uuid::new_v4());
    let written = write_synced(dir, &temp_name, contents)
        .and_then(|()| dir.rename(&temp_name, dir, name));
    if let Err(err) = written {
        // The temp file may not exist if creation itself failed.
        if let Err(cleanup) = dir.remove_file(&temp_name) {
            debug!(file = %temp_name, %cleanup, "temp file not removed");
        }
        return Err(err);
    }
    Ok(())
}

fn write_synced(dir: &Dir, name: &str, contents: &[u8]) -> std::io::Result<()> {
    let mut file = dir.create(name)?;
    file.write_all(contents)?;
    file.sync_all()
}
