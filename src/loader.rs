//! Loading definition batches from YAML
//!
//! Definition files are mappings of schema name to definition body. The
//! loader turns strings, files, directories or the embedded default
//! corpus into a [`DescriptorSet`]; it performs no resolution. All I/O
//! happens here, strictly before a registry build starts.

use std::collections::BTreeMap;
use std::path::Path;

use miette::{Diagnostic, NamedSource, SourceSpan};
use rust_embed::Embed;
use thiserror::Error;
use walkdir::WalkDir;

use crate::descriptor::{DescriptorSet, SchemaDescriptor};
use crate::model::ModelError;

/// Default definition corpus shipped with the crate
#[derive(Embed)]
#[folder = "defs/"]
struct EmbeddedDefs;

/// Errors raised while loading definition files
#[derive(Debug, Error, Diagnostic)]
pub enum LoadError {
    #[error("failed to read '{path}'")]
    #[diagnostic(code(modelkit::load::io))]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid definition YAML: {message}")]
    #[diagnostic(code(modelkit::load::yaml))]
    Yaml {
        message: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("here")]
        span: SourceSpan,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Model(#[from] ModelError),
}

/// Parse a definition mapping from YAML text.
pub fn from_str(content: &str, filename: &str) -> Result<DescriptorSet, LoadError> {
    let schemas: BTreeMap<String, SchemaDescriptor> =
        serde_yml::from_str(content).map_err(|err| yaml_error(err, content, filename))?;
    let mut set = DescriptorSet::new();
    for (name, descriptor) in schemas {
        set.insert(name, descriptor)?;
    }
    Ok(set)
}

/// Load a single definition file.
pub fn from_path(path: &Path) -> Result<DescriptorSet, LoadError> {
    let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    from_str(&content, &path.display().to_string())
}

/// Load every `.yaml`/`.yml` file under a directory, in path order.
/// Schema names must be unique across all loaded files.
pub fn load_dir(dir: &Path) -> Result<DescriptorSet, LoadError> {
    let mut paths: Vec<_> = WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            matches!(
                path.extension().and_then(|ext| ext.to_str()),
                Some("yaml") | Some("yml")
            )
        })
        .collect();
    paths.sort();

    let mut set = DescriptorSet::new();
    for path in paths {
        let batch = from_path(&path)?;
        set.merge(batch)?;
    }
    Ok(set)
}

/// The definition corpus embedded in the crate.
pub fn embedded_set() -> Result<DescriptorSet, LoadError> {
    let mut names: Vec<_> = EmbeddedDefs::iter().collect();
    names.sort();

    let mut set = DescriptorSet::new();
    for name in names {
        let Some(file) = EmbeddedDefs::get(&name) else {
            continue;
        };
        let content = String::from_utf8_lossy(&file.data);
        let batch = from_str(&content, &name)?;
        set.merge(batch)?;
    }
    Ok(set)
}

fn yaml_error(err: serde_yml::Error, content: &str, filename: &str) -> LoadError {
    let offset = err
        .location()
        .map(|location| offset_of(content, location.line(), location.column()))
        .unwrap_or(0);
    LoadError::Yaml {
        message: err.to_string(),
        src: NamedSource::new(filename, content.to_string()),
        span: SourceSpan::from(offset..offset.saturating_add(1)),
    }
}

/// Convert a one-based line/column position to a byte offset.
fn offset_of(source: &str, line: usize, column: usize) -> usize {
    let start: usize = source
        .split_inclusive('\n')
        .take(line.saturating_sub(1))
        .map(str::len)
        .sum();
    (start + column.saturating_sub(1)).min(source.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_from_str_parses_a_batch() {
        let set = from_str("Thing:\n  label: Thing\nPerson:\n  extends: Thing\n", "inline")
            .unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.contains("Person"));
    }

    #[test]
    fn test_syntax_error_reports_location() {
        let err = from_str("Thing:\n  label: [unclosed\n", "broken.yaml").unwrap_err();
        assert!(matches!(err, LoadError::Yaml { .. }));
    }

    #[test]
    fn test_load_dir_combines_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.yaml"), "Thing: {}\n").unwrap();
        fs::write(dir.path().join("b.yaml"), "Person:\n  extends: Thing\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let set = load_dir(dir.path()).unwrap();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_load_dir_rejects_duplicates_across_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.yaml"), "Thing: {}\n").unwrap();
        fs::write(dir.path().join("b.yaml"), "Thing: {}\n").unwrap();

        let err = load_dir(dir.path()).unwrap_err();
        assert!(matches!(
            err,
            LoadError::Model(ModelError::DuplicateSchema { .. })
        ));
    }

    #[test]
    fn test_load_dir_on_missing_directory_is_empty() {
        let dir = tempdir().unwrap();
        let set = load_dir(&dir.path().join("nope")).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn test_embedded_corpus_parses() {
        let set = embedded_set().unwrap();
        assert!(set.contains("Thing"));
        assert!(set.contains("Email"));
        assert!(set.contains("BankAccount"));
    }

    #[test]
    fn test_offset_of() {
        let source = "first\nsecond\n";
        assert_eq!(offset_of(source, 1, 1), 0);
        assert_eq!(offset_of(source, 2, 3), 8);
        assert_eq!(offset_of(source, 9, 9), source.len());
    }
}
