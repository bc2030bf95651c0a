use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::{debug, info, warn};
use std::path::PathBuf;

/// Controller doc generator - extract PHP controller metadata and write doc blocks back
#[derive(Parser, Debug)]
#[command(name = "controller-docgen")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Describe the controller class of a file, or of every PHP file in a directory
    Extract {
        /// Controller file or directory to scan
        #[arg(value_name = "PATH")]
        path: PathBuf,

        /// Output format (yaml or json)
        #[arg(short = 'f', long = "format", value_enum, default_value = "yaml")]
        output_format: OutputFormat,

        /// Output file path (if not specified, outputs to stdout)
        #[arg(short = 'o', long = "output", value_name = "FILE")]
        output_path: Option<PathBuf>,
    },

    /// Insert documentation blocks from a JSON or YAML map into a controller file
    Write {
        /// Controller file to document
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Documentation map file: method name -> doc text
        #[arg(short = 'd', long = "docs", value_name = "MAP")]
        docs: PathBuf,

        /// Write to this path instead of updating FILE in place
        #[arg(short = 'o', long = "output", value_name = "FILE")]
        output_path: Option<PathBuf>,

        /// Print the documented source instead of writing it
        #[arg(long = "dry-run")]
        dry_run: bool,
    },
}

/// Output format options
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// YAML format
    Yaml,
    /// JSON format
    Json,
}

/// Validate and log already-parsed arguments
pub fn parse_args_from_parsed(args: CliArgs) -> Result<CliArgs> {
    debug!("Parsed arguments: {:?}", args);

    match &args.command {
        Command::Extract {
            path,
            output_format,
            output_path,
        } => {
            if !path.exists() {
                anyhow::bail!("Path does not exist: {}", path.display());
            }
            info!("Input: {}", path.display());
            info!("Output format: {:?}", output_format);
            match output_path {
                Some(output) => info!("Output file: {}", output.display()),
                None => info!("Output: stdout"),
            }
        }
        Command::Write {
            file,
            docs,
            output_path,
            dry_run,
        } => {
            if !file.is_file() {
                anyhow::bail!("Controller file does not exist: {}", file.display());
            }
            if !docs.is_file() {
                anyhow::bail!("Documentation map does not exist: {}", docs.display());
            }
            info!("Controller: {}", file.display());
            info!("Documentation map: {}", docs.display());
            if *dry_run {
                info!("Dry run: nothing will be written");
            } else {
                info!(
                    "Output file: {}",
                    output_path.as_ref().unwrap_or(file).display()
                );
            }
        }
    }

    Ok(args)
}

/// Run the selected command
pub fn run(args: CliArgs) -> Result<()> {
    match args.command {
        Command::Extract {
            path,
            output_format,
            output_path,
        } => run_extract(path, output_format, output_path),
        Command::Write {
            file,
            docs,
            output_path,
            dry_run,
        } => run_write(file, docs, output_path, dry_run),
    }
}

fn run_extract(path: PathBuf, output_format: OutputFormat, output_path: Option<PathBuf>) -> Result<()> {
    use crate::error::Error;
    use crate::extractor::controller::ControllerExtractor;
    use crate::extractor::ClassDescriptor;
    use crate::scanner::FileScanner;
    use crate::serializer::{serialize_json, serialize_yaml, write_to_file};

    let content = if path.is_dir() {
        info!("Scanning directory...");
        let scan_result = FileScanner::new(path.clone()).scan();
        info!("Found {} PHP files", scan_result.php_files.len());

        if scan_result.php_files.is_empty() {
            anyhow::bail!("No PHP files found in {}", path.display());
        }

        let mut classes: Vec<ClassDescriptor> = Vec::new();
        for file in &scan_result.php_files {
            match ControllerExtractor::extract_file(file) {
                Ok(class) => {
                    debug!("{}: {} public methods", class.class_name, class.methods.len());
                    classes.push(class);
                }
                Err(Error::NoClassDeclaration { path }) => {
                    debug!("Skipping {}: no class declaration", path.display());
                }
                Err(e) => warn!("Skipping {}: {}", file.display(), e),
            }
        }

        info!("Extracted {} classes", classes.len());
        if classes.is_empty() {
            anyhow::bail!("No controller classes could be extracted from {}", path.display());
        }

        match output_format {
            OutputFormat::Yaml => serialize_yaml(&classes)?,
            OutputFormat::Json => serialize_json(&classes)?,
        }
    } else {
        let class = ControllerExtractor::extract_file(&path)
            .with_context(|| format!("Failed to extract controller from {}", path.display()))?;
        info!(
            "Found {} with {} public methods",
            class.class_name,
            class.methods.len()
        );

        match output_format {
            OutputFormat::Yaml => serialize_yaml(&class)?,
            OutputFormat::Json => serialize_json(&class)?,
        }
    };

    if let Some(output_path) = &output_path {
        info!("Writing output to: {}", output_path.display());
        write_to_file(&content, output_path)?;
    } else {
        println!("{}", content);
    }

    Ok(())
}

fn run_write(file: PathBuf, docs: PathBuf, output_path: Option<PathBuf>, dry_run: bool) -> Result<()> {
    use crate::serializer::load_doc_map;
    use crate::writer::DocBlockWriter;
    use std::fs;

    let docs = load_doc_map(&docs)?;
    info!("Loaded documentation for {} methods", docs.len());

    if dry_run {
        let source = fs::read_to_string(&file)
            .with_context(|| format!("Failed to read {}", file.display()))?;
        let rendered = DocBlockWriter::write(&source, &docs)
            .map_err(|e| e.at(&file))
            .context("Failed to render documentation")?;
        print!("{}", rendered);
        warn!("No files were modified (dry-run mode)");
        return Ok(());
    }

    let written = DocBlockWriter::write_file(&file, &docs, output_path.as_deref())?;
    info!("Documentation written to {}", written.display());

    Ok(())
}
