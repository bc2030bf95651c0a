use log::warn;
use std::path::PathBuf;
use walkdir::WalkDir;

/// Directory names never descended into.
const SKIPPED_DIRS: &[&str] = &["vendor", "node_modules", "storage"];

/// File scanner for traversing project directories.
///
/// The `FileScanner` recursively walks a directory to find PHP source files. It skips
/// hidden directories (those starting with `.`) and dependency or runtime directories
/// such as `vendor`, `node_modules` and `storage`.
///
/// # Example
///
/// ```no_run
/// use controller_docgen::scanner::FileScanner;
/// use std::path::PathBuf;
///
/// let scanner = FileScanner::new(PathBuf::from("./app/Http/Controllers"));
/// let result = scanner.scan();
/// println!("Found {} PHP files", result.php_files.len());
/// ```
pub struct FileScanner {
    root_path: PathBuf,
}

/// Result of a directory scan.
pub struct ScanResult {
    /// Paths to all discovered `.php` files, sorted
    pub php_files: Vec<PathBuf>,
    /// Warning messages for entries that could not be accessed
    pub warnings: Vec<String>,
}

impl FileScanner {
    pub fn new(root_path: PathBuf) -> Self {
        Self { root_path }
    }

    /// Scans the directory tree and collects all `.php` files.
    ///
    /// Inaccessible entries are logged and recorded as warnings; scanning continues.
    pub fn scan(&self) -> ScanResult {
        let mut php_files = Vec::new();
        let mut warnings = Vec::new();

        for entry in WalkDir::new(&self.root_path)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                if e.path() == self.root_path {
                    return true;
                }
                if !e.file_type().is_dir() {
                    return true;
                }
                let file_name = e.file_name().to_string_lossy();
                !file_name.starts_with('.') && !SKIPPED_DIRS.iter().any(|dir| *dir == file_name)
            })
        {
            match entry {
                Ok(entry) => {
                    let path = entry.path();
                    if entry.file_type().is_file()
                        && path.extension().and_then(|s| s.to_str()) == Some("php")
                    {
                        php_files.push(path.to_path_buf());
                    }
                }
                Err(e) => {
                    let warning = format!("Failed to access path: {}", e);
                    warn!("{}", warning);
                    warnings.push(warning);
                }
            }
        }

        ScanResult {
            php_files,
            warnings,
        }
    }
}
