use crate::error::{Error, Result};
use crate::syntax::SyntaxTree;
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};
use tree_sitter::{Node, Parser};

/// Parser for PHP source files.
///
/// `SourceParser` runs tree-sitter with the PHP grammar and converts the result into a
/// lossless [`SyntaxTree`]. Every call builds a fresh tree; nothing is cached between
/// calls, so extraction and writing always work on their own parse of the source.
///
/// # Example
///
/// ```no_run
/// use controller_docgen::parser::SourceParser;
/// use std::path::Path;
///
/// let parsed = SourceParser::parse_file(Path::new("app/Http/Controllers/UserController.php")).unwrap();
/// assert_eq!(parsed.tree.to_source(), parsed.source);
/// ```
pub struct SourceParser;

/// A successfully parsed PHP file with its syntax tree.
#[derive(Debug)]
pub struct ParsedFile {
    /// Path to the source file
    pub path: PathBuf,
    /// The file content the tree was built from
    pub source: String,
    /// The parsed lossless syntax tree
    pub tree: SyntaxTree,
}

impl SourceParser {
    /// Parses PHP source text into a lossless syntax tree.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] if the source is empty or contains syntax errors. The
    /// message names the line and column of the first problem found.
    pub fn parse_source(source: &str) -> Result<SyntaxTree> {
        if source.trim().is_empty() {
            return Err(Error::parse("source is empty"));
        }

        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_php::LANGUAGE_PHP.into())
            .map_err(|e| Error::parse(format!("failed to load PHP grammar: {e}")))?;

        let tree = parser
            .parse(source, None)
            .ok_or_else(|| Error::parse("parser returned no tree"))?;

        let root = tree.root_node();
        if root.has_error() {
            let message = first_error(root)
                .map(|node| describe_error(node, source))
                .unwrap_or_else(|| "syntax error".to_string());
            return Err(Error::parse(message));
        }

        Ok(SyntaxTree::from_tree_sitter(&tree, source))
    }

    /// Reads and parses a single PHP file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read and [`Error::Parse`] (carrying
    /// the file path) if it is not valid PHP.
    pub fn parse_file(path: &Path) -> Result<ParsedFile> {
        debug!("Parsing file: {}", path.display());

        let source = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let tree = Self::parse_source(&source).map_err(|e| e.at(path))?;

        debug!("Successfully parsed file: {}", path.display());

        Ok(ParsedFile {
            path: path.to_path_buf(),
            source,
            tree,
        })
    }

    /// Parses multiple files, continuing past failures.
    ///
    /// Failures are logged as warnings and returned in place, one result per input path.
    pub fn parse_files(paths: &[PathBuf]) -> Vec<Result<ParsedFile>> {
        debug!("Parsing {} files", paths.len());

        let results: Vec<Result<ParsedFile>> = paths
            .iter()
            .map(|path| {
                Self::parse_file(path).inspect_err(|e| {
                    warn!("Failed to parse {}: {}", path.display(), e);
                })
            })
            .collect();

        let success_count = results.iter().filter(|r| r.is_ok()).count();
        debug!(
            "Parsing complete: {} succeeded, {} failed",
            success_count,
            results.len() - success_count
        );

        results
    }
}

/// First ERROR or MISSING node in pre-order.
fn first_error(node: Node) -> Option<Node> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if let Some(found) = first_error(child) {
            return Some(found);
        }
    }
    None
}

fn describe_error(node: Node, source: &str) -> String {
    let position = node.start_position();
    let line = position.row + 1;
    let column = position.column + 1;

    if node.is_missing() {
        return format!("missing `{}` at line {}, column {}", node.kind(), line, column);
    }

    let snippet: String = source
        .get(node.start_byte()..node.end_byte())
        .unwrap_or_default()
        .lines()
        .next()
        .unwrap_or_default()
        .chars()
        .take(40)
        .collect();
    format!(
        "syntax error at line {}, column {} near `{}`",
        line,
        column,
        snippet.trim()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    /// Helper function to create a temporary file with content
    fn create_temp_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let file_path = dir.path().join(name);
        let mut file = fs::File::create(&file_path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file_path
    }

    #[test]
    fn test_parse_valid_php_file() {
        let temp_dir = TempDir::new().unwrap();
        let valid_code = r#"<?php

namespace App\Http\Controllers;

class UserController extends Controller
{
    public function show(int $id)
    {
        return User::findOrFail($id);
    }
}
"#;

        let file_path = create_temp_file(&temp_dir, "UserController.php", valid_code);
        let parsed = SourceParser::parse_file(&file_path).unwrap();

        assert_eq!(parsed.path, file_path);
        assert_eq!(parsed.source, valid_code);
        assert_eq!(parsed.tree.to_source(), valid_code);
    }

    #[test]
    fn test_parse_invalid_php_file() {
        let temp_dir = TempDir::new().unwrap();
        let invalid_code = "<?php\nclass Broken {\n    public function ( {\n        $x = ;\n    }\n";

        let file_path = create_temp_file(&temp_dir, "Broken.php", invalid_code);
        let err = SourceParser::parse_file(&file_path).unwrap_err();

        match &err {
            Error::Parse { path, message } => {
                assert_eq!(path, &file_path);
                assert!(message.contains("line"), "message was: {}", message);
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_nonexistent_file() {
        let err = SourceParser::parse_file(Path::new("/nonexistent/Controller.php")).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/Controller.php"));
    }

    #[test]
    fn test_parse_empty_file() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = create_temp_file(&temp_dir, "empty.php", "");
        let err = SourceParser::parse_file(&file_path).unwrap_err();

        match err {
            Error::Parse { message, .. } => assert_eq!(message, "source is empty"),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_reports_missing_token() {
        let err = SourceParser::parse_source("<?php\n$a = 1\n$b = 2;\n").unwrap_err();
        assert_eq!(err.kind_code(), "PARSE_ERROR");
    }

    #[test]
    fn test_parse_files_batch() {
        let temp_dir = TempDir::new().unwrap();

        let file1 = create_temp_file(&temp_dir, "a.php", "<?php\nclass A {}\n");
        let file2 = create_temp_file(&temp_dir, "b.php", "<?php\nfunction helper() { return 1; }\n");
        let file3 = create_temp_file(&temp_dir, "c.php", "<?php\nclass {\n");

        let paths = vec![file1.clone(), file2.clone(), file3];
        let results = SourceParser::parse_files(&paths);

        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(results[1].is_ok());
        assert!(results[2].is_err());
        assert_eq!(results[0].as_ref().unwrap().path, file1);
        assert_eq!(results[1].as_ref().unwrap().path, file2);
    }

    #[test]
    fn test_parse_files_empty_list() {
        let paths: Vec<PathBuf> = vec![];
        assert!(SourceParser::parse_files(&paths).is_empty());
    }

    #[test]
    fn test_each_parse_builds_an_independent_tree() {
        let source = "<?php\nclass A\n{\n    public function a() {}\n}\n";
        let first = SourceParser::parse_source(source).unwrap();
        let mut second = SourceParser::parse_source(source).unwrap();

        second
            .root_mut()
            .children_mut()
            .unwrap()
            .push(crate::syntax::SyntaxNode::trivia("\n".to_string(), Default::default()));

        assert_eq!(first.to_source(), source);
        assert_eq!(second.to_source(), format!("{source}\n"));
    }
}
