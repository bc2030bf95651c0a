//! Documentation-block writer.
//!
//! Inserts generated `/** ... */` blocks above controller methods by mutating a fresh
//! lossless parse of the source and printing it back. Only the comment nodes directly
//! above documented methods change; every other byte is printed as parsed.

use crate::error::{Error, Result};
use crate::parser::SourceParser;
use crate::syntax::{preceding_doc_comment, NodeKind, Span, SyntaxNode};
use log::{debug, info, warn};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Documentation text keyed by method name.
pub type DocMap = BTreeMap<String, String>;

/// Writer that attaches documentation blocks to methods.
///
/// # Example
///
/// ```
/// use controller_docgen::writer::{DocBlockWriter, DocMap};
///
/// let source = "<?php\nclass A\n{\n    public function index() {}\n}\n";
/// let mut docs = DocMap::new();
/// docs.insert("index".to_string(), "Lists everything.".to_string());
///
/// let output = DocBlockWriter::write(source, &docs).unwrap();
/// assert!(output.contains("    /**\n     * Lists everything.\n     */\n    public function index()"));
/// ```
pub struct DocBlockWriter;

impl DocBlockWriter {
    /// Returns `source` with a documentation block attached to every method named in `docs`.
    ///
    /// An existing `/** */` block directly above such a method is replaced, so running
    /// the same map twice gives the same text as running it once. Methods missing from
    /// `docs` keep whatever comments they had.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] if the source does not parse, or if the documented
    /// result would not parse again.
    pub fn write(source: &str, docs: &DocMap) -> Result<String> {
        let mut tree = SourceParser::parse_source(source)?;
        let newline = if source.contains("\r\n") { "\r\n" } else { "\n" };

        let mut documented = BTreeSet::new();
        annotate(tree.root_mut(), docs, newline, &mut documented);

        for name in docs.keys().filter(|name| !documented.contains(*name)) {
            warn!("No method named `{}` found; documentation skipped", name);
        }
        debug!("Attached {} documentation blocks", documented.len());

        let output = tree.to_source();
        if !documented.is_empty() {
            SourceParser::parse_source(&output).map_err(|e| match e {
                Error::Parse { message, .. } => {
                    Error::parse(format!("documented source no longer parses: {message}"))
                }
                other => other,
            })?;
        }
        Ok(output)
    }

    /// Reads `source_path`, documents it and writes the result to `output`, or back
    /// to `source_path` when no output is given.
    ///
    /// The destination is replaced atomically: content goes to a temporary file in
    /// the destination directory which is then moved into place, so a failure never
    /// leaves a half-written destination behind.
    ///
    /// Returns the path that was written.
    pub fn write_file(source_path: &Path, docs: &DocMap, output: Option<&Path>) -> Result<PathBuf> {
        let source = fs::read_to_string(source_path).map_err(|source| Error::Io {
            path: source_path.to_path_buf(),
            source,
        })?;

        let rendered = Self::write(&source, docs).map_err(|e| e.at(source_path))?;

        let destination = output.unwrap_or(source_path);
        persist_atomically(&rendered, destination)?;

        info!("Documentation written to {}", destination.display());
        Ok(destination.to_path_buf())
    }
}

fn annotate(node: &mut SyntaxNode, docs: &DocMap, newline: &str, documented: &mut BTreeSet<String>) {
    let Some(children) = node.children_mut() else {
        return;
    };

    for child in children.iter_mut() {
        annotate(child, docs, newline, documented);
    }

    let targets: Vec<(usize, String, &String)> = children
        .iter()
        .enumerate()
        .filter(|(_, child)| child.kind() == NodeKind::Method)
        .filter_map(|(index, method)| {
            let name = method.child_by_field("name")?.text();
            let doc = docs.get(&name)?;
            Some((index, name, doc))
        })
        .collect();

    // Back to front so insertions do not shift pending indices.
    for (index, name, doc) in targets.into_iter().rev() {
        attach(children, index, doc, newline);
        debug!("Documented method {}", name);
        documented.insert(name);
    }
}

fn attach(siblings: &mut Vec<SyntaxNode>, index: usize, doc: &str, newline: &str) {
    let indent = indentation_before(siblings, index);
    let block = render_doc_block(doc, &indent, newline);

    match preceding_doc_comment(siblings, index) {
        Some(existing) => siblings[existing].set_text(block),
        None => {
            let at = Span::empty_at(siblings[index].span());
            siblings.insert(index, SyntaxNode::trivia(format!("{newline}{indent}"), at));
            siblings.insert(index, SyntaxNode::comment(block, at));
        }
    }
}

/// Indentation of the line `siblings[index]` starts on.
fn indentation_before(siblings: &[SyntaxNode], index: usize) -> String {
    let Some(previous) = index.checked_sub(1).map(|i| &siblings[i]) else {
        return String::new();
    };
    if previous.kind() != NodeKind::Trivia {
        return String::new();
    }
    let text = previous.text();
    match text.rfind('\n') {
        Some(pos) => text[pos + 1..]
            .chars()
            .take_while(|c| *c == ' ' || *c == '\t')
            .collect(),
        None => String::new(),
    }
}

/// Shapes documentation text into a doc block indented for its method.
///
/// Text that already is a `/** ... */` block keeps its lines, re-indented; anything
/// else is treated as prose and wrapped. The first line is never indented because it
/// continues the method's own indentation. A `*/` inside the text is written as
/// `*\/` so the block cannot end early.
pub fn render_doc_block(doc: &str, indent: &str, newline: &str) -> String {
    let trimmed = doc.trim();
    let mut lines = Vec::new();

    let inner = trimmed
        .strip_prefix("/**")
        .and_then(|rest| rest.strip_suffix("*/"));

    if let Some(inner) = inner {
        let block = format!("/**{}*/", escape_terminators(inner));
        for (i, line) in block.lines().enumerate() {
            let line = line.trim();
            if i == 0 {
                lines.push(line.to_string());
            } else if line.starts_with('*') {
                lines.push(format!("{indent} {line}"));
            } else if line.is_empty() {
                lines.push(format!("{indent} *"));
            } else {
                lines.push(format!("{indent} * {line}"));
            }
        }
    } else {
        lines.push("/**".to_string());
        for line in escape_terminators(trimmed).lines() {
            let line = line.trim_end();
            if line.trim().is_empty() {
                lines.push(format!("{indent} *"));
            } else {
                lines.push(format!("{indent} * {line}"));
            }
        }
        lines.push(format!("{indent} */"));
    }

    lines.join(newline)
}

fn escape_terminators(text: &str) -> String {
    text.replace("*/", "*\\/")
}

fn persist_atomically(content: &str, destination: &Path) -> Result<()> {
    let dir = match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    if !dir.is_dir() {
        return Err(Error::DestinationMissing { dir });
    }
    let metadata = fs::metadata(&dir).map_err(|e| Error::DestinationNotWritable {
        dir: dir.clone(),
        reason: e.to_string(),
    })?;
    if metadata.permissions().readonly() {
        return Err(Error::DestinationNotWritable {
            dir,
            reason: "directory is read-only".to_string(),
        });
    }

    let mut temp = NamedTempFile::new_in(&dir).map_err(|e| Error::DestinationNotWritable {
        dir: dir.clone(),
        reason: e.to_string(),
    })?;

    let write_error = |source: std::io::Error| Error::Write {
        path: destination.to_path_buf(),
        source,
    };

    temp.write_all(content.as_bytes()).map_err(write_error)?;
    temp.as_file().sync_all().map_err(write_error)?;
    if let Ok(existing) = fs::metadata(destination) {
        fs::set_permissions(temp.path(), existing.permissions()).map_err(write_error)?;
    }
    temp.persist(destination).map_err(|e| write_error(e.error))?;

    debug!("Wrote {} bytes to {}", content.len(), destination.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    const SOURCE: &str = r#"<?php

namespace App\Http\Controllers;

class UserController extends Controller
{
    public function index()
    {
        return User::all();
    }

    // Handles the form post.
    public function store(Request $request)
    {
        return User::create($request->all());
    }

    /**
     * Old docs.
     */
    public function show($id)
    {
        return User::find($id);
    }
}
"#;

    fn docs(entries: &[(&str, &str)]) -> DocMap {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_empty_map_round_trips() {
        let output = DocBlockWriter::write(SOURCE, &DocMap::new()).unwrap();
        assert_eq!(output, SOURCE);
    }

    #[test]
    fn test_inserts_block_above_undocumented_method() {
        let output = DocBlockWriter::write(SOURCE, &docs(&[("index", "List all users.")])).unwrap();
        let expected = SOURCE.replace(
            "{\n    public function index()",
            "{\n    /**\n     * List all users.\n     */\n    public function index()",
        );
        assert_eq!(output, expected);
    }

    #[test]
    fn test_replaces_existing_doc_block() {
        let block = "/**\n * Show one user.\n *\n * @param int $id\n * @return \\Illuminate\\Http\\JsonResponse\n */";
        let output = DocBlockWriter::write(SOURCE, &docs(&[("show", block)])).unwrap();

        assert!(!output.contains("Old docs."));
        let expected = SOURCE.replace(
            "    /**\n     * Old docs.\n     */\n",
            "    /**\n     * Show one user.\n     *\n     * @param int $id\n     * @return \\Illuminate\\Http\\JsonResponse\n     */\n",
        );
        assert_eq!(output, expected);
    }

    #[test]
    fn test_plain_comment_is_kept() {
        let output = DocBlockWriter::write(SOURCE, &docs(&[("store", "Store a user.")])).unwrap();
        assert!(output.contains(
            "    // Handles the form post.\n    /**\n     * Store a user.\n     */\n    public function store("
        ));
    }

    #[test]
    fn test_selective_mutation() {
        let output = DocBlockWriter::write(SOURCE, &docs(&[("index", "List all users.")])).unwrap();
        assert!(output.contains("// Handles the form post.\n    public function store("));
        assert!(output.contains("/**\n     * Old docs.\n     */\n    public function show("));
    }

    #[test]
    fn test_idempotent() {
        let map = docs(&[
            ("index", "List all users."),
            ("store", "/** Store a user. */"),
            ("show", "Show a user.\n\nReturns 404 when missing."),
        ]);
        let once = DocBlockWriter::write(SOURCE, &map).unwrap();
        let twice = DocBlockWriter::write(&once, &map).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_unknown_method_names_are_ignored() {
        let output = DocBlockWriter::write(SOURCE, &docs(&[("destroy", "Nope.")])).unwrap();
        assert_eq!(output, SOURCE);
    }

    #[test]
    fn test_non_public_methods_are_documented_too() {
        let source = "<?php\nclass A\n{\n    private function helper() {}\n}\n";
        let output = DocBlockWriter::write(source, &docs(&[("helper", "Helps.")])).unwrap();
        assert_eq!(
            output,
            "<?php\nclass A\n{\n    /**\n     * Helps.\n     */\n    private function helper() {}\n}\n"
        );
    }

    #[test]
    fn test_crlf_line_endings_are_followed() {
        let source = "<?php\r\nclass A\r\n{\r\n    public function a()\r\n    {\r\n    }\r\n}\r\n";
        let output = DocBlockWriter::write(source, &docs(&[("a", "Does a.")])).unwrap();
        assert_eq!(
            output,
            "<?php\r\nclass A\r\n{\r\n    /**\r\n     * Does a.\r\n     */\r\n    public function a()\r\n    {\r\n    }\r\n}\r\n"
        );
    }

    #[test]
    fn test_tab_indentation() {
        let source = "<?php\nclass A\n{\n\tpublic function a() {}\n}\n";
        let output = DocBlockWriter::write(source, &docs(&[("a", "Does a.")])).unwrap();
        assert_eq!(
            output,
            "<?php\nclass A\n{\n\t/**\n\t * Does a.\n\t */\n\tpublic function a() {}\n}\n"
        );
    }

    #[test]
    fn test_invalid_source_is_rejected() {
        let err = DocBlockWriter::write("<?php\nclass {", &DocMap::new()).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn test_render_doc_block() {
        assert_eq!(render_doc_block("One line.", "    ", "\n"), "/**\n     * One line.\n     */");
        assert_eq!(
            render_doc_block("  /**\n  * Existing.\n  */  ", "  ", "\n"),
            "/**\n   * Existing.\n   */"
        );
        assert_eq!(render_doc_block("/** Short. */", "    ", "\n"), "/** Short. */");
        assert_eq!(render_doc_block("A\n\nB", "", "\n"), "/**\n * A\n *\n * B\n */");
    }

    #[test]
    fn test_comment_terminator_in_docs_is_escaped() {
        let map = docs(&[("index", "Matches paths like app/*/ and more.")]);

        let once = DocBlockWriter::write(SOURCE, &map).unwrap();
        assert!(once.contains("     * Matches paths like app/*\\/ and more.\n     */\n    public function index()"));

        let twice = DocBlockWriter::write(&once, &map).unwrap();
        assert_eq!(twice, once);
    }

    #[test]
    fn test_terminator_inside_existing_block_is_escaped() {
        assert_eq!(
            render_doc_block("/**\n * Globs: *.php, src/*/x\n */", "", "\n"),
            "/**\n * Globs: *.php, src/*\\/x\n */"
        );
        let map = docs(&[("show", "/** Ends */ early */")]);
        let output = DocBlockWriter::write(SOURCE, &map).unwrap();
        assert!(output.contains("    /** Ends *\\/ early */\n    public function show($id)"));
    }

    #[test]
    fn test_write_file_in_place() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("UserController.php");
        fs::write(&path, SOURCE).unwrap();

        let written = DocBlockWriter::write_file(&path, &docs(&[("index", "List all users.")]), None).unwrap();
        assert_eq!(written, path);

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("     * List all users.\n"));

        let leftovers: Vec<_> = fs::read_dir(temp_dir.path()).unwrap().collect();
        assert_eq!(leftovers.len(), 1, "temporary file should have been moved into place");
    }

    #[test]
    fn test_write_file_to_alternate_output() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("UserController.php");
        let output = temp_dir.path().join("out").join("UserController.php");
        fs::write(&path, SOURCE).unwrap();
        fs::create_dir(temp_dir.path().join("out")).unwrap();

        DocBlockWriter::write_file(&path, &docs(&[("index", "List.")]), Some(&output)).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), SOURCE);
        assert!(fs::read_to_string(&output).unwrap().contains("     * List.\n"));
    }

    #[test]
    fn test_missing_output_directory() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("UserController.php");
        fs::write(&path, SOURCE).unwrap();
        let output = temp_dir.path().join("missing").join("UserController.php");

        let err = DocBlockWriter::write_file(&path, &docs(&[("index", "List.")]), Some(&output)).unwrap_err();
        assert!(matches!(err, Error::DestinationMissing { .. }));
        assert!(!output.exists());
    }

    #[test]
    fn test_parse_failure_leaves_destination_untouched() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("Broken.php");
        fs::write(&path, "<?php\nclass Broken {\n").unwrap();

        let err = DocBlockWriter::write_file(&path, &docs(&[("a", "A.")]), None).unwrap_err();
        match err {
            Error::Parse { path: reported, .. } => assert_eq!(reported, path),
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(fs::read_to_string(&path).unwrap(), "<?php\nclass Broken {\n");
    }

    #[test]
    fn test_missing_source_file() {
        let temp_dir = TempDir::new().unwrap();
        let err = DocBlockWriter::write_file(&temp_dir.path().join("Nope.php"), &DocMap::new(), None).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_read_only_output_directory() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("UserController.php");
        fs::write(&path, SOURCE).unwrap();
        let locked = temp_dir.path().join("locked");
        fs::create_dir(&locked).unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o555)).unwrap();

        let output = locked.join("UserController.php");
        let result = DocBlockWriter::write_file(&path, &docs(&[("index", "List.")]), Some(&output));

        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        assert!(matches!(result, Err(Error::DestinationNotWritable { .. })));
        assert!(!output.exists());
        assert_eq!(fs::read_to_string(&path).unwrap(), SOURCE);
    }
}
