//! Extraction of controller metadata from PHP source.
//!
//! Two extractors cooperate here:
//!
//! - [`controller::ControllerExtractor`] finds the class declaration and describes its
//!   public methods
//! - [`query::QueryExtractor`] recovers fluent, statically-rooted call chains such as
//!   `User::where('active', true)->get()` from a method body
//!
//! The descriptors hold copies of everything they need; no syntax tree outlives an
//! extraction call.
//!
//! # Example
//!
//! ```no_run
//! use controller_docgen::extractor::controller::ControllerExtractor;
//! use std::path::Path;
//!
//! let class = ControllerExtractor::extract_file(Path::new("app/Http/Controllers/UserController.php")).unwrap();
//! for method in &class.methods {
//!     println!("{} has {} queries", method.name, method.queries.len());
//! }
//! ```

pub mod controller;
pub mod query;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Everything extracted from one controller file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDescriptor {
    /// Short class name (e.g. "UserController")
    pub class_name: String,
    /// Declared namespace, absent for files without a namespace
    pub namespace: Option<String>,
    /// Parent class from the `extends` clause
    pub parent: Option<String>,
    /// Names imported with top-level `use` statements, in source order
    pub imports: Vec<String>,
    /// Public methods in declaration order
    pub methods: Vec<MethodDescriptor>,
    /// File the descriptor was extracted from, when extracted from disk
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl ClassDescriptor {
    /// Namespace-qualified class name.
    pub fn qualified_name(&self) -> String {
        match &self.namespace {
            Some(namespace) => format!("{}\\{}", namespace, self.class_name),
            None => self.class_name.clone(),
        }
    }

    pub fn method(&self, name: &str) -> Option<&MethodDescriptor> {
        self.methods.iter().find(|m| m.name == name)
    }
}

/// Structured summary of a single public method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodDescriptor {
    pub name: String,
    pub parameters: Vec<Parameter>,
    /// Declared return type as written (e.g. "JsonResponse", "?array")
    pub return_type: Option<String>,
    pub is_static: bool,
    pub span: LineSpan,
    /// Existing `/** ... */` block directly above the method
    pub doc_comment: Option<String>,
    /// Query chains found in the method body, in source order
    pub queries: Vec<QueryChain>,
    /// Declaration text exactly as written, including the first line's indentation
    pub source: String,
}

/// A single method parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    /// Name without the leading `$`
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: Option<String>,
    /// Default value expression as written
    pub default_value: Option<String>,
    pub variadic: bool,
    pub by_reference: bool,
}

impl Parameter {
    pub fn new(name: String, type_name: Option<String>) -> Self {
        Self {
            name,
            type_name,
            default_value: None,
            variadic: false,
            by_reference: false,
        }
    }
}

/// Inclusive 1-based line range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineSpan {
    pub start_line: usize,
    pub end_line: usize,
}

/// A fluent call chain rooted at a static call, root first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryChain {
    /// Type the chain is rooted at (e.g. "User", "\App\Models\Post", "self")
    pub model: String,
    /// Calls in left-to-right source order; the first one is the static call
    pub calls: Vec<CallFrame>,
    /// Line the chain expression starts on
    pub line: usize,
    /// The chain expression as written
    pub text: String,
}

impl QueryChain {
    pub fn method_names(&self) -> Vec<&str> {
        self.calls.iter().map(|c| c.method.as_str()).collect()
    }
}

impl fmt::Display for QueryChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.model)?;
        for (i, call) in self.calls.iter().enumerate() {
            let separator = if i == 0 { "::" } else { "->" };
            write!(f, "{}{}", separator, call)?;
        }
        Ok(())
    }
}

/// One invocation inside a query chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallFrame {
    pub method: String,
    pub args: Vec<ArgValue>,
}

impl fmt::Display for CallFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args: Vec<String> = self.args.iter().map(ToString::to_string).collect();
        write!(f, "{}({})", self.method, args.join(", "))
    }
}

/// Statically resolved value of a call argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ArgValue {
    String(String),
    Integer(i64),
    Float(f64),
    /// Bare constant reference, including `true`, `false` and `null`
    Constant(String),
    /// The argument is not a recognised literal form (variable, array, closure, ...)
    Opaque,
}

impl ArgValue {
    pub fn is_opaque(&self) -> bool {
        matches!(self, ArgValue::Opaque)
    }
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgValue::String(s) => write!(f, "'{}'", s.replace('\'', "\\'")),
            ArgValue::Integer(i) => write!(f, "{}", i),
            ArgValue::Float(v) => write!(f, "{:?}", v),
            ArgValue::Constant(name) => f.write_str(name),
            ArgValue::Opaque => f.write_str("<opaque>"),
        }
    }
}
