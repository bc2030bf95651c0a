//! Controller doc generator - structured metadata and documentation blocks for PHP controllers.
//!
//! This library reads web-request controllers (classes whose public methods each handle
//! one request), describes every handler method, and later writes generated
//! documentation blocks back into the same source file without disturbing anything
//! else in it.
//!
//! # Architecture
//!
//! 1. [`parser`] - Parses PHP source into a lossless syntax tree
//! 2. [`syntax`] - The lossless syntax tree: every byte of the source lives in a leaf
//! 3. [`extractor`] - Describes the controller class, its public methods and the
//!    query-builder chains inside them
//! 4. [`writer`] - Attaches documentation blocks to methods and prints the tree back
//! 5. [`scanner`] - Finds PHP files in a directory
//! 6. [`serializer`] - YAML/JSON output and documentation map loading
//!
//! Extraction and writing each parse the source on their own. Documentation text is
//! typically produced by an external service between the two steps, so no tree is
//! kept around in between.
//!
//! # Example Usage
//!
//! ```no_run
//! use controller_docgen::{
//!     extractor::controller::ControllerExtractor,
//!     writer::{DocBlockWriter, DocMap},
//! };
//! use std::path::Path;
//!
//! let path = Path::new("app/Http/Controllers/UserController.php");
//! let class = ControllerExtractor::extract_file(path).unwrap();
//!
//! let mut docs = DocMap::new();
//! for method in &class.methods {
//!     let summary = format!("Handles {} for {}.", method.name, class.class_name);
//!     docs.insert(method.name.clone(), summary);
//! }
//!
//! DocBlockWriter::write_file(path, &docs, None).unwrap();
//! ```
//!
//! # Command-Line Interface
//!
//! For command-line usage, see the [`cli`] module.

pub mod cli;
pub mod error;
pub mod extractor;
pub mod parser;
pub mod scanner;
pub mod serializer;
pub mod syntax;
pub mod writer;

pub use error::{Error, Result};
pub use extractor::controller::ControllerExtractor;
pub use extractor::query::QueryExtractor;
pub use extractor::{ArgValue, CallFrame, ClassDescriptor, MethodDescriptor, Parameter, QueryChain};
pub use writer::{DocBlockWriter, DocMap};
