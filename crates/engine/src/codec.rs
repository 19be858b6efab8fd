//! Container codec
//!
//! A container is a JSON document. Objects keep their key order
//! (`serde_json` is built with `preserve_order`), files are written
//! pretty-printed with a trailing newline, so a container that is read and
//! written back unchanged produces the same bytes.

use std::fs;
use std::path::Path;

use tracing::trace;

use crate::error::CodecError;

/// In-memory representation of one serialized object or config file
pub type Container = serde_json::Value;

/// Keyed section of a container
pub type ContainerMap = serde_json::Map<String, Container>;

/// Read a container from disk
///
/// # Arguments
/// * `path` - File to read
///
/// # Returns
/// The parsed container, or an error if the file is missing or malformed.
pub fn read_container(path: &Path) -> Result<Container, CodecError> {
    let text = fs::read_to_string(path).map_err(|source| CodecError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let container = serde_json::from_str(&text).map_err(|source| CodecError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    trace!("Read container {:?} ({} bytes)", path, text.len());
    Ok(container)
}

/// Write a container to disk, creating parent directories as needed
///
/// # Arguments
/// * `path` - Destination file, overwritten if present
/// * `container` - Container to encode
pub fn write_container(path: &Path, container: &Container) -> Result<(), CodecError> {
    let text = encode(container)?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| CodecError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    fs::write(path, &text).map_err(|source| CodecError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    trace!("Wrote container {:?} ({} bytes)", path, text.len());
    Ok(())
}

/// Encode a container to the exact text written by [`write_container`]
pub fn encode(container: &Container) -> Result<String, CodecError> {
    let mut text = serde_json::to_string_pretty(container).map_err(CodecError::Encode)?;
    text.push('\n');
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("obj.aobj");

        let container = json!({ "type_id": "mesh", "id": "cube", "count": 3 });
        write_container(&path, &container).unwrap();

        let loaded = read_container(&path).unwrap();
        assert_eq!(loaded, container);
    }

    #[test]
    fn test_key_order_is_preserved() {
        let text = "{\n  \"zeta\": 1,\n  \"alpha\": 2,\n  \"mid\": [\n    -1,\n    0\n  ]\n}\n";
        let container: Container = serde_json::from_str(text).unwrap();

        let keys: Vec<_> = container.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
        assert_eq!(encode(&container).unwrap(), text);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_container(&dir.path().join("nope.aobj")).unwrap_err();
        assert!(matches!(err, CodecError::Io { .. }));
    }

    #[test]
    fn test_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.aobj");
        fs::write(&path, "{ \"id\": ").unwrap();

        let err = read_container(&path).unwrap_err();
        assert!(matches!(err, CodecError::Parse { .. }));
    }
}
