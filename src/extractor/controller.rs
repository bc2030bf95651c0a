use crate::error::{Error, Result};
use crate::extractor::query::QueryExtractor;
use crate::extractor::{ClassDescriptor, LineSpan, MethodDescriptor, Parameter};
use crate::parser::SourceParser;
use crate::syntax::{
    preceding_doc_comment, ModifierKind, NodeKind, ParameterKind, SyntaxNode, SyntaxTree,
};
use log::debug;
use std::fs;
use std::path::Path;

/// Structural extractor for controller classes.
///
/// Finds the first class declaration in a file and describes every method declared
/// with an explicit `public` modifier. When a file declares several classes the first
/// one in source order wins.
pub struct ControllerExtractor;

impl ControllerExtractor {
    /// Parses `source` and describes its controller class.
    ///
    /// # Errors
    ///
    /// - [`Error::Parse`] if the source is empty or not valid PHP
    /// - [`Error::NoClassDeclaration`] if the file declares no class
    pub fn extract(source: &str) -> Result<ClassDescriptor> {
        let tree = SourceParser::parse_source(source)?;
        Self::extract_tree(&tree, source)
    }

    /// Reads a file and describes its controller class.
    ///
    /// Errors carry `path`; the returned descriptor records it too.
    pub fn extract_file(path: &Path) -> Result<ClassDescriptor> {
        debug!("Extracting controller from {}", path.display());

        let source = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut class = Self::extract(&source).map_err(|e| e.at(path))?;
        class.path = Some(path.to_path_buf());
        Ok(class)
    }

    /// Describes the controller class of an already parsed tree.
    ///
    /// `source` must be the text `tree` was parsed from; method source is sliced from it.
    pub fn extract_tree(tree: &SyntaxTree, source: &str) -> Result<ClassDescriptor> {
        let class = tree.find_first(NodeKind::Class).ok_or_else(Error::no_class)?;

        let class_name = class
            .child_by_field("name")
            .map(|n| n.text())
            .ok_or_else(|| Error::parse("class declaration without a name"))?;

        let namespace = tree
            .find_first(NodeKind::Namespace)
            .and_then(|ns| ns.child_by_field("name"))
            .map(|n| n.text());

        let parent = class
            .child_of_kind(NodeKind::BaseClause)
            .and_then(|clause| clause.child_of_kind(NodeKind::Name))
            .map(|n| n.text());

        let imports = tree
            .root()
            .descendants()
            .filter(|n| n.kind() == NodeKind::NamespaceUse)
            .flat_map(|decl| {
                decl.descendants()
                    .filter(|n| n.grammar() == "namespace_use_clause")
                    .map(|clause| clause.text().trim().to_string())
                    .collect::<Vec<_>>()
            })
            .collect();

        let mut methods = Vec::new();
        if let Some(body) = class.child_by_field("body") {
            let members = body.children();
            for (index, member) in members.iter().enumerate() {
                if member.kind() != NodeKind::Method {
                    continue;
                }
                if !is_public(member) {
                    debug!(
                        "Skipping non-public method {}",
                        member.child_by_field("name").map(|n| n.text()).unwrap_or_default()
                    );
                    continue;
                }
                let doc_comment = preceding_doc_comment(members, index)
                    .and_then(|i| members[i].leaf_text())
                    .map(str::to_string);
                methods.push(describe_method(member, doc_comment, source));
            }
        }

        debug!(
            "Extracted class {} with {} public methods",
            class_name,
            methods.len()
        );

        Ok(ClassDescriptor {
            class_name,
            namespace,
            parent,
            imports,
            methods,
            path: None,
        })
    }
}

fn is_public(method: &SyntaxNode) -> bool {
    method.children().iter().any(|child| {
        child.kind() == NodeKind::Modifier(ModifierKind::Visibility)
            && child.text().trim().eq_ignore_ascii_case("public")
    })
}

fn describe_method(method: &SyntaxNode, doc_comment: Option<String>, source: &str) -> MethodDescriptor {
    let name = method
        .child_by_field("name")
        .map(|n| n.text())
        .unwrap_or_default();

    let parameters = method
        .child_by_field("parameters")
        .map(|list| list.children().iter().filter_map(describe_parameter).collect())
        .unwrap_or_default();

    let return_type = method.child_by_field("return_type").map(|n| n.text());

    let is_static = method
        .children()
        .iter()
        .any(|c| c.kind() == NodeKind::Modifier(ModifierKind::Static));

    let queries = QueryExtractor::extract_queries(method);
    debug!("Method {} has {} query chains", name, queries.len());

    let span = method.span();
    MethodDescriptor {
        name,
        parameters,
        return_type,
        is_static,
        span: LineSpan {
            start_line: span.start_line,
            end_line: span.end_line,
        },
        doc_comment,
        queries,
        source: declaration_source(source, span.start, span.end),
    }
}

fn describe_parameter(node: &SyntaxNode) -> Option<Parameter> {
    let kind = match node.kind() {
        NodeKind::Parameter(kind) => kind,
        _ => return None,
    };

    let raw_name = node.child_by_field("name")?.text();
    let by_reference =
        node.child_by_field("reference_modifier").is_some() || raw_name.starts_with('&');
    let name = raw_name
        .trim_start_matches('&')
        .trim()
        .trim_start_matches('$')
        .to_string();

    Some(Parameter {
        name,
        type_name: node.child_by_field("type").map(|n| n.text()),
        default_value: node.child_by_field("default_value").map(|n| n.text()),
        variadic: kind == ParameterKind::Variadic,
        by_reference,
    })
}

/// Slices `source[start..end]`, widened to the start of the line when only
/// indentation precedes `start`.
fn declaration_source(source: &str, start: usize, end: usize) -> String {
    let line_start = source[..start].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let from = if source[line_start..start].chars().all(|c| c == ' ' || c == '\t') {
        line_start
    } else {
        start
    };
    source[from..end].to_string()
}
