use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Expands `path` into the files it names: a file is returned as-is, a
/// directory yields its immediate regular files (no recursion) accepted by
/// `filter`, sorted by name. A path that does not exist is a config error.
pub fn resolve_entries<F>(path: &Path, filter: F) -> Result<Vec<PathBuf>>
where
    F: Fn(&Path) -> bool,
{
    let meta = fs::metadata(path).map_err(|_| Error::config(path, "path does not exist"))?;
    if meta.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !meta.is_dir() {
        return Err(Error::config(path, "neither a file nor a directory"));
    }
    let mut files = fs::read_dir(path)
        .map_err(|e| Error::config(path, e))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && filter(p))
        .collect::<Vec<_>>();
    files.sort();
    Ok(files)
}

pub fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn file_is_returned_as_is() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.yaml");
        fs::write(&file, "").unwrap();
        assert_eq!(resolve_entries(&file, |_| false).unwrap(), vec![file]);
    }

    #[test]
    fn directory_is_expanded_without_recursion() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.yml"), "").unwrap();
        fs::write(dir.path().join("a.yaml"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("c.yaml"), "").unwrap();

        let found = resolve_entries(dir.path(), |p| has_extension(p, &["yaml", "yml"])).unwrap();
        assert_eq!(
            found,
            vec![dir.path().join("a.yaml"), dir.path().join("b.yml")]
        );
    }

    #[test]
    fn missing_path_names_the_path() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        match resolve_entries(&missing, |_| true) {
            Err(Error::Config { path, .. }) => assert_eq!(path, missing),
            other => panic!("unexpected {:?}", other),
        }
    }
}
