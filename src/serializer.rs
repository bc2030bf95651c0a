//! Serialization of extraction results and loading of documentation maps.
//!
//! Descriptors serialize to YAML or pretty-printed JSON. Documentation maps (method
//! name to doc text) are read from `.json`, `.yaml` or `.yml` files.

use crate::error::{Error, Result};
use crate::writer::DocMap;
use log::debug;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Serializes a value (a `ClassDescriptor` or a list of them) to YAML.
///
/// # Errors
///
/// Returns [`Error::Serialization`] if serialization fails.
pub fn serialize_yaml<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    debug!("Serializing to YAML");
    Ok(serde_yaml::to_string(value)?)
}

/// Serializes a value to JSON with pretty printing.
pub fn serialize_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    debug!("Serializing to JSON");
    Ok(serde_json::to_string_pretty(value)?)
}

/// Loads a documentation map, choosing the format by file extension.
///
/// # Errors
///
/// - [`Error::Io`] if the file cannot be read
/// - [`Error::InvalidArgument`] for unsupported extensions
/// - [`Error::Serialization`] if the content is not a string-to-string map
pub fn load_doc_map(path: &Path) -> Result<DocMap> {
    debug!("Loading documentation map from {}", path.display());

    let content = fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let extension = path
        .extension()
        .and_then(|s| s.to_str())
        .map(str::to_ascii_lowercase);

    let docs: DocMap = match extension.as_deref() {
        Some("json") => serde_json::from_str(&content)?,
        Some("yaml") | Some("yml") => serde_yaml::from_str(&content)?,
        _ => {
            return Err(Error::InvalidArgument(format!(
                "unsupported documentation map format: {} (expected .json, .yaml or .yml)",
                path.display()
            )))
        }
    };

    debug!("Loaded {} documentation entries", docs.len());
    Ok(docs)
}

/// Writes string content to a file, creating parent directories as needed.
pub fn write_to_file(content: &str, path: &Path) -> Result<()> {
    debug!("Writing content to file: {}", path.display());

    let write_error = |source: std::io::Error| Error::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(write_error)?;
    }
    fs::write(path, content).map_err(write_error)?;

    debug!("Successfully wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::controller::ControllerExtractor;
    use crate::extractor::ClassDescriptor;
    use tempfile::TempDir;

    fn create_test_descriptor() -> ClassDescriptor {
        ControllerExtractor::extract(
            "<?php\nnamespace App\\Http\\Controllers;\n\nclass PostController\n{\n    public function index(int $page = 1)\n    {\n        return Post::where('published', true)->paginate($page);\n    }\n}\n",
        )
        .unwrap()
    }

    #[test]
    fn test_serialize_yaml() {
        let yaml = serialize_yaml(&create_test_descriptor()).unwrap();

        assert!(yaml.contains("class_name: PostController"));
        assert!(yaml.contains("name: index"));
        assert!(yaml.contains("model: Post"));
        assert!(yaml.contains("method: paginate"));
        assert!(yaml.contains("kind: opaque"));
        assert!(!yaml.contains("path:"));
    }

    #[test]
    fn test_serialize_json() {
        let json = serialize_json(&create_test_descriptor()).unwrap();
        assert!(json.contains('\n'), "JSON should be pretty printed");

        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["class_name"], "PostController");
        assert_eq!(parsed["methods"][0]["parameters"][0]["type"], "int");
        assert_eq!(parsed["methods"][0]["parameters"][0]["default_value"], "1");
        assert_eq!(parsed["methods"][0]["queries"][0]["calls"][0]["args"][1]["kind"], "constant");
        assert_eq!(parsed["methods"][0]["queries"][0]["calls"][0]["args"][1]["value"], "true");
    }

    #[test]
    fn test_roundtrip_json_serialization() {
        let descriptor = create_test_descriptor();
        let json = serialize_json(&descriptor).unwrap();
        let deserialized: ClassDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, descriptor);
    }

    #[test]
    fn test_serialize_descriptor_list() {
        let yaml = serialize_yaml(&vec![create_test_descriptor(), create_test_descriptor()]).unwrap();
        assert_eq!(yaml.matches("class_name: PostController").count(), 2);
    }

    #[test]
    fn test_load_doc_map_json() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("docs.json");
        fs::write(&path, r#"{"index": "/**\n * List posts.\n */", "show": "Show a post."}"#).unwrap();

        let docs = load_doc_map(&path).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs["index"], "/**\n * List posts.\n */");
        assert_eq!(docs["show"], "Show a post.");
    }

    #[test]
    fn test_load_doc_map_yaml() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("docs.yml");
        fs::write(&path, "index: |\n  List posts.\n\n  Paginated.\nshow: Show a post.\n").unwrap();

        let docs = load_doc_map(&path).unwrap();
        assert_eq!(docs["index"], "List posts.\n\nPaginated.\n");
        assert_eq!(docs["show"], "Show a post.");
    }

    #[test]
    fn test_load_doc_map_rejects_unknown_extension() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("docs.txt");
        fs::write(&path, "index = nope").unwrap();

        assert!(matches!(load_doc_map(&path), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_load_doc_map_rejects_non_map() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("docs.json");
        fs::write(&path, "[1, 2, 3]").unwrap();

        assert!(matches!(load_doc_map(&path), Err(Error::Serialization(_))));
    }

    #[test]
    fn test_load_doc_map_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let err = load_doc_map(&temp_dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn test_write_to_file_creates_directories() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("reports").join("nested").join("controllers.yaml");

        write_to_file("test content", &file_path).unwrap();
        assert_eq!(fs::read_to_string(&file_path).unwrap(), "test content");
    }

    #[test]
    fn test_write_to_file_overwrites_existing() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("controllers.json");

        write_to_file("initial content", &file_path).unwrap();
        write_to_file("new content", &file_path).unwrap();

        assert_eq!(fs::read_to_string(&file_path).unwrap(), "new content");
    }
}
