use anyhow::{bail, Context, Result};
use std::io::{BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Writes `path` through a temporary file in the same directory, renamed into
/// place only after `fill` succeeded. On error the temporary file is removed
/// and `path` is left untouched.
pub fn write_atomic<F>(path: &Path, fill: F) -> Result<()>
where
    F: FnOnce(&mut dyn Write) -> Result<()>,
{
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    if !parent.is_dir() {
        bail!("output directory does not exist: {}", parent.display());
    }

    let temp_file = NamedTempFile::new_in(parent)
        .with_context(|| format!("creating temp file in {}", parent.display()))?;
    {
        let mut writer = BufWriter::new(temp_file.as_file());
        fill(&mut writer)?;
        writer.flush().with_context(|| format!("writing {}", path.display()))?;
    }
    temp_file
        .persist(path)
        .with_context(|| format!("renaming temp file to {}", path.display()))?;
    Ok(())
}
