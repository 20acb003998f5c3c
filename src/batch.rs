//! Mapping template sources to outputs for the command line.

use std::path::{Path, PathBuf};

use crate::entries::resolve_entries;
use crate::error::{Error, Result};

/// Where the template text comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Stdin,
    Path(PathBuf),
}

/// Splits the positional arguments into source and output. `piped` says
/// whether a template arrived on standard input; if so, a lone argument is
/// the output file. A leading `-` always names standard input.
pub fn plan(paths: &[PathBuf], piped: bool) -> Result<(Source, Option<PathBuf>)> {
    match paths {
        [first, rest @ ..] if first.as_path() == Path::new("-") => {
            Ok((Source::Stdin, rest.first().cloned()))
        }
        [] if piped => Ok((Source::Stdin, None)),
        [target] if piped => Ok((Source::Stdin, Some(target.clone()))),
        [] => Err(Error::Usage("source is missing".into())),
        [source, rest @ ..] => Ok((Source::Path(source.clone()), rest.first().cloned())),
    }
}

pub fn validate(source: &Source, target: Option<&Path>) -> Result<()> {
    let target_is_dir = target.map(Path::is_dir).unwrap_or(false);
    match source {
        Source::Stdin if target_is_dir => Err(Error::Usage(
            "when reading from standard input, [output] must be a file".into(),
        )),
        Source::Path(p) if p.is_dir() && !target_is_dir => Err(Error::Usage(
            "[source] is a directory, so [output] must be a directory too".into(),
        )),
        _ => Ok(()),
    }
}

/// Template files named by `source`: the file itself, or every regular file
/// directly inside a directory.
pub fn source_files(source: &Path) -> Result<Vec<PathBuf>> {
    resolve_entries(source, |_| true)
}

/// A directory target receives `<target>/<file name>`; a file target is used
/// as-is.
pub fn output_path(source_file: &Path, target: &Path) -> PathBuf {
    match source_file.file_name() {
        Some(name) if target.is_dir() => target.join(name),
        _ => target.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn paths(args: &[&str]) -> Vec<PathBuf> {
        args.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn plan_without_piped_input() {
        assert_eq!(
            plan(&paths(&["t.yaml"]), false).unwrap(),
            (Source::Path("t.yaml".into()), None)
        );
        assert_eq!(
            plan(&paths(&["src", "out"]), false).unwrap(),
            (Source::Path("src".into()), Some("out".into()))
        );
        assert_eq!(
            plan(&paths(&["-", "out.yaml"]), false).unwrap(),
            (Source::Stdin, Some("out.yaml".into()))
        );
        assert!(matches!(plan(&[], false), Err(Error::Usage(_))));
    }

    #[test]
    fn piped_input_makes_lone_argument_the_output() {
        assert_eq!(plan(&[], true).unwrap(), (Source::Stdin, None));
        assert_eq!(
            plan(&paths(&["out.txt"]), true).unwrap(),
            (Source::Stdin, Some("out.txt".into()))
        );
        assert_eq!(
            plan(&paths(&["src", "out"]), true).unwrap(),
            (Source::Path("src".into()), Some("out".into()))
        );
    }

    #[test]
    fn directory_source_needs_directory_target() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("out.yaml");
        fs::write(&file, "").unwrap();
        let source = Source::Path(dir.path().to_path_buf());

        assert!(validate(&source, Some(dir.path())).is_ok());
        assert!(matches!(validate(&source, Some(&file)), Err(Error::Usage(_))));
        assert!(matches!(validate(&source, None), Err(Error::Usage(_))));
        assert!(matches!(
            validate(&Source::Stdin, Some(dir.path())),
            Err(Error::Usage(_))
        ));
        assert!(validate(&Source::Stdin, Some(&file)).is_ok());
    }

    #[test]
    fn output_path_in_directory() {
        let dir = TempDir::new().unwrap();
        assert_eq!(
            output_path(Path::new("src/app.yaml"), dir.path()),
            dir.path().join("app.yaml")
        );
        let file = dir.path().join("single.yaml");
        assert_eq!(output_path(Path::new("src/app.yaml"), &file), file);
    }
}
