//! Parameter files.
//!
//! A parameter file is the text a module list renders to: one `NAME VALUE`
//! line per field (array elements as `NAME:i`), `#` comments, and qualified
//! names (`GAIN.BM`) for nested modules and labelled sub-lists. Loading
//! applies the lines in order and stops at the first failure.

use std::path::Path;

use periphery_core::{ListRef, apply_text, render_to_string};

use crate::error::ConfigError;

/// Apply parameter text to `root`, returning the number of lines applied.
pub fn apply_par_text(root: &ListRef, text: &str) -> Result<usize, ConfigError> {
    Ok(apply_text(root, text)?)
}

/// Read a parameter file and apply it to `root`.
///
/// Returns the number of lines applied. Errors carry the file path and the
/// 1-based number of the failing line; lines before it stay applied.
pub fn load_par_file(root: &ListRef, path: impl AsRef<Path>) -> Result<usize, ConfigError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
    let applied = apply_text(root, &text).map_err(|source| {
        tracing::warn!(
            path = %path.display(),
            line = source.line,
            error = %source.source,
            "parameter file rejected"
        );
        ConfigError::ParFile {
            path: path.to_path_buf(),
            source,
        }
    })?;
    tracing::debug!(path = %path.display(), lines = applied, "parameter file loaded");
    Ok(applied)
}

/// Render every enabled field reachable from `root`.
pub fn render_par_file(root: &ListRef) -> Result<String, ConfigError> {
    Ok(render_to_string(root)?)
}

/// Render `root` and write it to `path`, creating parent directories.
pub fn save_par_file(root: &ListRef, path: impl AsRef<Path>) -> Result<(), ConfigError> {
    let path = path.as_ref();
    let content = render_par_file(root)?;

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
    }

    std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))?;
    tracing::debug!(path = %path.display(), "parameter file saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use periphery_modules::{Gammatone, Module};

    #[test]
    fn apply_counts_only_assignments() {
        let bm = Gammatone::new().unwrap();
        let list = bm.par_list().unwrap();
        let applied = apply_par_text(&list, "# filterbank\n\nCASCADE 2\nGAIN -3 # dB\n").unwrap();
        assert_eq!(applied, 2);
        assert_eq!(bm.params().borrow().gain_db(), -3.0);
    }

    #[test]
    fn apply_reports_the_failing_line() {
        let bm = Gammatone::new().unwrap();
        let list = bm.par_list().unwrap();
        let err = apply_par_text(&list, "CASCADE 2\nCASCADE 0\nGAIN 5\n").unwrap_err();
        assert!(matches!(err, ConfigError::Line(ref e) if e.line == 2), "{err}");
        assert_eq!(bm.params().borrow().cascade(), 2);
        assert_eq!(bm.params().borrow().gain_db(), 0.0);
    }
}
