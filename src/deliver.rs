//! Artifact delivery.
//!
//! File-system rendition of the download trigger: the final bytes are
//! staged in a transient part-file which is persisted under its final name
//! on success. The part-file is released unconditionally when the persist
//! step fails.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::debug;

use crate::{Error, Result, SourceUrl};

/// Filename for the delivered document, derived from the source hostname
/// and suffixed `-encrypted` when the document is locked.
pub fn output_filename(url: &SourceUrl, encrypted: bool) -> String {
    if encrypted {
        format!("{}-encrypted.pdf", url.hostname())
    } else {
        format!("{}.pdf", url.hostname())
    }
}

/// Write the final bytes to `<out_dir>/<filename>`.
pub fn deliver(out_dir: &Path, filename: &str, bytes: &[u8]) -> Result<PathBuf> {
    fs::create_dir_all(out_dir).map_err(|e| {
        Error::Delivery(format!("Failed to create {}: {}", out_dir.display(), e))
    })?;

    let final_path = out_dir.join(filename);
    let part_path = out_dir.join(format!(".{}.part", filename));

    let staged = fs::File::create(&part_path)
        .and_then(|mut f| f.write_all(bytes).and_then(|_| f.sync_all()));
    if let Err(e) = staged {
        let _ = fs::remove_file(&part_path);
        return Err(Error::Delivery(format!(
            "Failed to stage {}: {}",
            part_path.display(),
            e
        )));
    }

    if let Err(e) = fs::rename(&part_path, &final_path) {
        // Release the transient reference even though delivery failed.
        let _ = fs::remove_file(&part_path);
        return Err(Error::Delivery(format!(
            "Failed to persist {}: {}",
            final_path.display(),
            e
        )));
    }

    debug!("delivered {} ({} bytes)", final_path.display(), bytes.len());
    Ok(final_path)
}
