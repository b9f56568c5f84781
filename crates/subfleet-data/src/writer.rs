//! Writes command scripts out as movement reports.

use std::fmt::Write as _;
use std::fs;

use subfleet_core::{CommandSource, ScriptedSource};
use tracing::info;

use crate::error::DataError;
use crate::layout::DataLayout;

/// Writes one `MovementReports/<ID>.txt` per scripted id, creating the
/// directory if needed. Existing reports with the same id are replaced.
/// Returns the number of files written.
///
/// # Errors
///
/// Returns a [`DataError`] if the directory or a file cannot be written.
pub fn write_movement_reports(layout: &DataLayout, scripts: &ScriptedSource) -> Result<usize, DataError> {
    let dir = layout.movement_dir();
    fs::create_dir_all(&dir).map_err(|e| DataError::io(&dir, e))?;

    let mut written = 0;
    for id in scripts.entity_ids() {
        let mut text = String::new();
        for command in scripts.commands(&id) {
            let _ = writeln!(text, "{command}");
        }
        let path = layout.movement_file(&id);
        fs::write(&path, text).map_err(|e| DataError::io(&path, e))?;
        written += 1;
    }

    info!(dir = %dir.display(), reports = written, "movement reports written");
    Ok(written)
}
