//! Validation of rendered storage destinations.
//!
//! Destinations are rendered from operator templates and manifest filenames
//! that arrive through CI logs. A rendered path must never climb out of the
//! directory the template points at.

use std::path::{Component, Path, PathBuf};

use anyhow::{bail, Result};

/// Validate a filesystem destination.
///
/// Rejects `..` components, null bytes and empty paths. The path is not
/// canonicalized since it usually does not exist yet.
pub fn validate_destination(path: &Path) -> Result<PathBuf> {
    if path.as_os_str().is_empty() {
        bail!("Destination path is empty");
    }

    if let Some(path_str) = path.to_str() {
        if path_str.contains('\0') {
            bail!("Destination path contains null bytes");
        }
    }

    for component in path.components() {
        if let Component::ParentDir = component {
            bail!("Path traversal attempt detected: {:?} contains '..'", path);
        }
    }

    if path.file_name().is_none() {
        bail!("Destination {:?} does not name a file", path);
    }

    Ok(path.to_path_buf())
}

/// Validate and normalize an object key.
///
/// Leading slashes are stripped and empty segments collapsed; `.` and `..`
/// segments are rejected.
pub fn validate_object_key(key: &str) -> Result<String> {
    if key.contains('\0') {
        bail!("Object key contains null bytes");
    }

    let mut segments = Vec::new();
    for segment in key.split('/') {
        match segment {
            "" => continue,
            "." | ".." => bail!("Object key '{}' contains a relative segment", key),
            s => segments.push(s),
        }
    }

    if segments.is_empty() || key.ends_with('/') {
        bail!("Object key '{}' does not name an object", key);
    }

    Ok(segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_destination_accepts_plain_paths() {
        let path = validate_destination(Path::new("/srv/builds/octo/widgets/42/a.txt")).unwrap();
        assert_eq!(path, PathBuf::from("/srv/builds/octo/widgets/42/a.txt"));

        assert!(validate_destination(Path::new("relative/dir/a.txt")).is_ok());
        assert!(validate_destination(Path::new("./a.txt")).is_ok());
    }

    #[test]
    fn test_validate_destination_rejects_traversal() {
        assert!(validate_destination(Path::new("/srv/builds/../etc/passwd")).is_err());
        assert!(validate_destination(Path::new("../a.txt")).is_err());
    }

    #[test]
    fn test_validate_destination_rejects_degenerate_paths() {
        assert!(validate_destination(Path::new("")).is_err());
        assert!(validate_destination(Path::new("/")).is_err());
        assert!(validate_destination(Path::new("/srv/a\0.txt")).is_err());
    }

    #[test]
    fn test_validate_object_key() {
        assert_eq!(validate_object_key("/builds//octo/a.zip").unwrap(), "builds/octo/a.zip");
        assert_eq!(validate_object_key("a.zip").unwrap(), "a.zip");

        assert!(validate_object_key("builds/../secrets").is_err());
        assert!(validate_object_key("builds/./a.zip").is_err());
        assert!(validate_object_key("builds/").is_err());
        assert!(validate_object_key("/").is_err());
    }
}
