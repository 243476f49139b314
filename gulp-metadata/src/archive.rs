//! Retrieve-archive handling.
//!
//! A bulk retrieve answers with a zip. It is unpacked into a scratch
//! directory, the object definitions are read back, and the scratch
//! directory is removed when it drops, on success and failure alike.

use std::io::Cursor;
use std::path::Path;

use zip::ZipArchive;

use gulp_sync::walk::files_under;

use crate::error::{io_err, ReaderError};

pub const OBJECT_EXTENSION: &str = "object";

/// One `.object` file from a retrieve archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectDefinition {
    /// File stem, i.e. the object's full API name.
    pub name: String,
    pub contents: String,
}

/// Every object definition in `archive`, ordered by path.
pub fn object_definitions(archive: &[u8]) -> Result<Vec<ObjectDefinition>, ReaderError> {
    object_definitions_in(archive, &std::env::temp_dir())
}

/// As [`object_definitions`], with the scratch directory created under
/// `scratch_parent`.
pub fn object_definitions_in(
    archive: &[u8],
    scratch_parent: &Path,
) -> Result<Vec<ObjectDefinition>, ReaderError> {
    let scratch = tempfile::Builder::new()
        .prefix("gulp-retrieve-")
        .tempdir_in(scratch_parent)
        .map_err(|e| io_err(scratch_parent, e))?;

    ZipArchive::new(Cursor::new(archive))?.extract(scratch.path())?;

    let mut definitions = Vec::new();
    for path in files_under(scratch.path())? {
        if path.extension().and_then(|e| e.to_str()) != Some(OBJECT_EXTENSION) {
            continue;
        }
        let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
        definitions.push(ObjectDefinition {
            name: name.to_string(),
            contents,
        });
    }
    tracing::debug!(count = definitions.len(), "unpacked object definitions");
    Ok(definitions)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    use super::*;

    fn zip_of(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, contents) in entries {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .expect("start");
            writer.write_all(contents.as_bytes()).expect("write");
        }
        writer.finish().expect("finish").into_inner()
    }

    #[test]
    fn reads_only_object_files() {
        let scratch_parent = TempDir::new().expect("tmp");
        let archive = zip_of(&[
            ("unpackaged/package.xml", "<Package/>"),
            ("unpackaged/objects/B__c.object", "<CustomObject>b</CustomObject>"),
            ("unpackaged/objects/A__c.object", "<CustomObject>a</CustomObject>"),
        ]);

        let definitions = object_definitions_in(&archive, scratch_parent.path()).expect("unpack");
        let names: Vec<&str> = definitions.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["A__c", "B__c"]);
        assert_eq!(definitions[0].contents, "<CustomObject>a</CustomObject>");
    }

    #[test]
    fn scratch_directory_is_removed() {
        let scratch_parent = TempDir::new().expect("tmp");
        let archive = zip_of(&[("objects/A__c.object", "<CustomObject/>")]);
        object_definitions_in(&archive, scratch_parent.path()).expect("unpack");

        let leftovers = std::fs::read_dir(scratch_parent.path()).expect("read_dir").count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn corrupt_archive_fails_and_cleans_up() {
        let scratch_parent = TempDir::new().expect("tmp");
        let err = object_definitions_in(b"not a zip", scratch_parent.path()).unwrap_err();
        assert!(matches!(err, ReaderError::Archive(_)));

        let leftovers = std::fs::read_dir(scratch_parent.path()).expect("read_dir").count();
        assert_eq!(leftovers, 0);
    }
}
