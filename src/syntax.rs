//! Lossless syntax tree for PHP source files.
//!
//! The tree is built from a tree-sitter concrete syntax tree but owns all of its text:
//! every token is a leaf carrying the exact bytes it was parsed from, and every gap
//! between tokens (whitespace, line breaks) becomes a [`NodeKind::Trivia`] leaf.
//! Concatenating the leaves in tree order therefore reproduces the source exactly,
//! which is what lets the writer mutate a handful of nodes and print everything else
//! back untouched.
//!
//! Node kinds are a closed set. Grammar kinds the rest of the crate never inspects
//! collapse into [`NodeKind::Other`] or [`ExprKind::Other`], while the tree-sitter grammar
//! kind name stays available through [`SyntaxNode::grammar`].

use std::fmt;

/// Syntactic category of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Program,
    Namespace,
    NamespaceUse,
    Class,
    /// Member list of a class, interface or trait
    ClassBody,
    BaseClause,
    Method,
    Modifier(ModifierKind),
    ParameterList,
    Parameter(ParameterKind),
    Type,
    /// Identifiers and (qualified) names, including `self`/`static`/`parent`
    Name,
    Block,
    Statement,
    Expr(ExprKind),
    Arguments,
    Argument,
    Comment,
    /// Source text between tokens
    Trivia,
    /// Anonymous grammar token: keywords, punctuation, operators
    Token,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModifierKind {
    Visibility,
    Static,
    Abstract,
    Final,
    Readonly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterKind {
    Simple,
    Variadic,
    /// Constructor property promotion (`public function __construct(private Foo $foo)`)
    Promoted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExprKind {
    /// `Type::method(...)`
    StaticCall,
    /// `$receiver->method(...)` and `$receiver?->method(...)`
    MemberCall,
    FunctionCall,
    Closure,
    Variable,
    Array,
    Literal(LiteralKind),
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LiteralKind {
    String,
    /// Double-quoted string, possibly with interpolated parts
    InterpolatedString,
    Integer,
    Float,
    Boolean,
    Null,
}

impl NodeKind {
    /// Maps a tree-sitter-php grammar kind onto the closed node kind set.
    pub fn from_grammar(kind: &str, is_named: bool) -> Self {
        if !is_named {
            return NodeKind::Token;
        }

        match kind {
            "program" => NodeKind::Program,
            "namespace_definition" => NodeKind::Namespace,
            "namespace_use_declaration" => NodeKind::NamespaceUse,
            "class_declaration" => NodeKind::Class,
            "declaration_list" => NodeKind::ClassBody,
            "base_clause" => NodeKind::BaseClause,
            "method_declaration" => NodeKind::Method,
            "visibility_modifier" => NodeKind::Modifier(ModifierKind::Visibility),
            "static_modifier" => NodeKind::Modifier(ModifierKind::Static),
            "abstract_modifier" => NodeKind::Modifier(ModifierKind::Abstract),
            "final_modifier" => NodeKind::Modifier(ModifierKind::Final),
            "readonly_modifier" => NodeKind::Modifier(ModifierKind::Readonly),
            "formal_parameters" => NodeKind::ParameterList,
            "simple_parameter" => NodeKind::Parameter(ParameterKind::Simple),
            "variadic_parameter" => NodeKind::Parameter(ParameterKind::Variadic),
            "property_promotion_parameter" => NodeKind::Parameter(ParameterKind::Promoted),
            "named_type"
            | "primitive_type"
            | "optional_type"
            | "union_type"
            | "intersection_type"
            | "disjunctive_normal_form_type"
            | "bottom_type"
            | "type_list" => NodeKind::Type,
            "name" | "qualified_name" | "namespace_name" | "relative_scope" => NodeKind::Name,
            "compound_statement" => NodeKind::Block,
            "arguments" => NodeKind::Arguments,
            "argument" => NodeKind::Argument,
            "comment" => NodeKind::Comment,
            "scoped_call_expression" => NodeKind::Expr(ExprKind::StaticCall),
            "member_call_expression" | "nullsafe_member_call_expression" => {
                NodeKind::Expr(ExprKind::MemberCall)
            }
            "function_call_expression" => NodeKind::Expr(ExprKind::FunctionCall),
            "anonymous_function"
            | "anonymous_function_creation_expression"
            | "arrow_function" => NodeKind::Expr(ExprKind::Closure),
            "variable_name" => NodeKind::Expr(ExprKind::Variable),
            "array_creation_expression" => NodeKind::Expr(ExprKind::Array),
            "string" => NodeKind::Expr(ExprKind::Literal(LiteralKind::String)),
            "encapsed_string" => NodeKind::Expr(ExprKind::Literal(LiteralKind::InterpolatedString)),
            "integer" => NodeKind::Expr(ExprKind::Literal(LiteralKind::Integer)),
            "float" => NodeKind::Expr(ExprKind::Literal(LiteralKind::Float)),
            "boolean" => NodeKind::Expr(ExprKind::Literal(LiteralKind::Boolean)),
            "null" => NodeKind::Expr(ExprKind::Literal(LiteralKind::Null)),
            k if k.ends_with("_statement") => NodeKind::Statement,
            k if k.ends_with("_expression") || k == "heredoc" || k == "nowdoc" => {
                NodeKind::Expr(ExprKind::Other)
            }
            _ => NodeKind::Other,
        }
    }

    /// Whether this node only carries layout or commentary.
    pub fn is_trivia(self) -> bool {
        matches!(self, NodeKind::Trivia | NodeKind::Comment)
    }
}

/// Position of a node in the source it was parsed from.
///
/// Offsets are bytes, lines are 1-based. Nodes inserted after parsing get an empty
/// span at their insertion point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub start_line: usize,
    pub end_line: usize,
}

impl Span {
    pub fn empty_at(other: Span) -> Self {
        Span {
            start: other.start,
            end: other.start,
            start_line: other.start_line,
            end_line: other.start_line,
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Content {
    Leaf(String),
    Branch(Vec<SyntaxNode>),
}

/// A node of the lossless syntax tree.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxNode {
    kind: NodeKind,
    grammar: &'static str,
    field: Option<&'static str>,
    span: Span,
    content: Content,
}

impl SyntaxNode {
    pub fn leaf(
        kind: NodeKind,
        grammar: &'static str,
        field: Option<&'static str>,
        span: Span,
        text: String,
    ) -> Self {
        Self {
            kind,
            grammar,
            field,
            span,
            content: Content::Leaf(text),
        }
    }

    pub fn branch(
        kind: NodeKind,
        grammar: &'static str,
        field: Option<&'static str>,
        span: Span,
        children: Vec<SyntaxNode>,
    ) -> Self {
        Self {
            kind,
            grammar,
            field,
            span,
            content: Content::Branch(children),
        }
    }

    pub fn trivia(text: String, span: Span) -> Self {
        Self::leaf(NodeKind::Trivia, "trivia", None, span, text)
    }

    pub fn comment(text: String, span: Span) -> Self {
        Self::leaf(NodeKind::Comment, "comment", None, span, text)
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// The tree-sitter grammar kind this node was built from.
    pub fn grammar(&self) -> &'static str {
        self.grammar
    }

    /// The grammar field under which this node hangs in its parent, if any.
    pub fn field(&self) -> Option<&'static str> {
        self.field
    }

    pub fn span(&self) -> Span {
        self.span
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.content, Content::Leaf(_))
    }

    /// Text of a leaf node, `None` for branches.
    pub fn leaf_text(&self) -> Option<&str> {
        match &self.content {
            Content::Leaf(text) => Some(text),
            Content::Branch(_) => None,
        }
    }

    /// Replaces this node's content with a single piece of text.
    pub fn set_text(&mut self, text: String) {
        self.content = Content::Leaf(text);
    }

    pub fn children(&self) -> &[SyntaxNode] {
        match &self.content {
            Content::Leaf(_) => &[],
            Content::Branch(children) => children,
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<SyntaxNode>> {
        match &mut self.content {
            Content::Leaf(_) => None,
            Content::Branch(children) => Some(children),
        }
    }

    /// Children that are neither trivia, comments nor anonymous tokens.
    pub fn named_children(&self) -> impl Iterator<Item = &SyntaxNode> {
        self.children()
            .iter()
            .filter(|child| !child.kind.is_trivia() && child.kind != NodeKind::Token)
    }

    pub fn child_by_field(&self, field: &str) -> Option<&SyntaxNode> {
        self.children()
            .iter()
            .find(|child| child.field == Some(field))
    }

    pub fn child_of_kind(&self, kind: NodeKind) -> Option<&SyntaxNode> {
        self.children().iter().find(|child| child.kind == kind)
    }

    /// Pre-order traversal of this node and everything below it.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }

    /// Source text covered by this node.
    pub fn text(&self) -> String {
        let mut out = String::with_capacity(self.span.len());
        self.write_text(&mut out);
        out
    }

    pub fn write_text(&self, out: &mut String) {
        match &self.content {
            Content::Leaf(text) => out.push_str(text),
            Content::Branch(children) => {
                for child in children {
                    child.write_text(out);
                }
            }
        }
    }
}

impl fmt::Display for SyntaxNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

/// Pre-order iterator over a subtree.
pub struct Descendants<'a> {
    stack: Vec<&'a SyntaxNode>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a SyntaxNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children().iter().rev());
        Some(node)
    }
}

/// Index of the `/** ... */` comment that documents `siblings[index]`.
///
/// Only trivia may sit between the comment and the node; any other sibling
/// (including a plain `//` comment) ends the search.
pub fn preceding_doc_comment(siblings: &[SyntaxNode], index: usize) -> Option<usize> {
    siblings[..index]
        .iter()
        .enumerate()
        .rev()
        .find(|(_, sibling)| sibling.kind != NodeKind::Trivia)
        .filter(|(_, sibling)| {
            sibling.kind == NodeKind::Comment
                && sibling.leaf_text().is_some_and(|text| text.starts_with("/**"))
        })
        .map(|(i, _)| i)
}

/// An owned, lossless syntax tree for one source text.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxTree {
    root: SyntaxNode,
}

impl SyntaxTree {
    /// Converts a tree-sitter tree into an owned lossless tree over `source`.
    ///
    /// The root always spans the whole source; bytes tree-sitter leaves outside the
    /// program node become trivia at the edges.
    pub fn from_tree_sitter(tree: &tree_sitter::Tree, source: &str) -> Self {
        let builder = Builder {
            source,
            lines: LineIndex::new(source),
        };
        let mut cursor = tree.walk();
        let root = builder.build(&mut cursor, None, Some((0, source.len())));
        Self { root }
    }

    pub fn root(&self) -> &SyntaxNode {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut SyntaxNode {
        &mut self.root
    }

    /// First node of `kind` in pre-order.
    pub fn find_first(&self, kind: NodeKind) -> Option<&SyntaxNode> {
        self.root.descendants().find(|node| node.kind == kind)
    }

    /// Prints the tree back to source text.
    pub fn to_source(&self) -> String {
        self.root.text()
    }
}

impl fmt::Display for SyntaxTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.root.fmt(f)
    }
}

struct Builder<'s> {
    source: &'s str,
    lines: LineIndex,
}

impl Builder<'_> {
    fn build(
        &self,
        cursor: &mut tree_sitter::TreeCursor,
        field: Option<&'static str>,
        bounds: Option<(usize, usize)>,
    ) -> SyntaxNode {
        let node = cursor.node();
        let (start, end) = bounds.unwrap_or((node.start_byte(), node.end_byte()));
        let kind = NodeKind::from_grammar(node.kind(), node.is_named());
        let span = self.span(start, end);

        if !cursor.goto_first_child() {
            if bounds.is_some() {
                // A childless root still has to cover the whole source.
                let inner = SyntaxNode::leaf(
                    kind,
                    node.kind(),
                    None,
                    self.span(node.start_byte(), node.end_byte()),
                    self.slice(node.start_byte(), node.end_byte()),
                );
                let mut children = Vec::new();
                self.push_gap(&mut children, start, node.start_byte());
                children.push(inner);
                self.push_gap(&mut children, node.end_byte(), end);
                return SyntaxNode::branch(kind, node.kind(), field, span, children);
            }
            return SyntaxNode::leaf(kind, node.kind(), field, span, self.slice(start, end));
        }

        let mut children = Vec::new();
        let mut offset = start;
        loop {
            let child = cursor.node();
            let child_field = cursor.field_name();
            self.push_gap(&mut children, offset, child.start_byte());
            children.push(self.build(cursor, child_field, None));
            offset = offset.max(child.end_byte());
            if !cursor.goto_next_sibling() {
                break;
            }
        }
        cursor.goto_parent();
        self.push_gap(&mut children, offset, end);

        SyntaxNode::branch(kind, node.kind(), field, span, children)
    }

    fn push_gap(&self, children: &mut Vec<SyntaxNode>, from: usize, to: usize) {
        if to > from {
            children.push(SyntaxNode::trivia(self.slice(from, to), self.span(from, to)));
        }
    }

    fn slice(&self, from: usize, to: usize) -> String {
        match self.source.get(from..to) {
            Some(text) => text.to_string(),
            None => String::from_utf8_lossy(&self.source.as_bytes()[from..to]).into_owned(),
        }
    }

    fn span(&self, start: usize, end: usize) -> Span {
        let start_line = self.lines.line_of(start);
        let end_line = if end > start {
            self.lines.line_of(end - 1)
        } else {
            start_line
        };
        Span {
            start,
            end,
            start_line,
            end_line,
        }
    }
}

/// Byte offset to line number lookup.
struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    fn new(text: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(text.match_indices('\n').map(|(i, _)| i + 1));
        Self { starts }
    }

    fn line_of(&self, offset: usize) -> usize {
        match self.starts.binary_search(&offset) {
            Ok(i) => i + 1,
            Err(i) => i,
        }
    }
}
