//! md-pdf converts a Markdown document into a PDF styled like GitHub's
//! rendering: syntax-highlighted code blocks, tables, footnotes and
//! emoji-capable typography, in a light or dark theme, on letter or A4 pages.
//!
//! The conversion is a straight pipeline. Markdown is turned into an HTML
//! fragment, the fragment is wrapped with the composed stylesheets into one
//! self-contained HTML document, and a headless browser prints that document
//! to PDF.
//!
//! ```rust,no_run
//! use md_pdf::config::{ColorMode, PageSize};
//! use std::error::Error;
//!
//! fn example() -> Result<(), Box<dyn Error>> {
//!     md_pdf::convert("README.md", "README.pdf", ColorMode::Dark, PageSize::A4, 0.75)?;
//!     Ok(())
//! }
//! ```
//!
//! The assembled HTML can be produced without a browser, which is what the
//! `--html` flag of the command line tool does:
//! ```rust
//! use md_pdf::config::{ColorMode, PageSize};
//! use md_pdf::document::PageGeometry;
//!
//! let geometry = PageGeometry::new(PageSize::Letter, 0.5).unwrap();
//! let doc = md_pdf::render_document("# Title", ColorMode::Light, &geometry, None).unwrap();
//! assert!(doc.as_str().contains("@page { size: letter; margin: 0.5in; }"));
//! assert!(doc.as_str().contains("<h1 id=\"title\">Title</h1>"));
//! ```
//!
//! ## Pipeline
//! ```text
//! +-------------+     +----------------+     +------------------+
//! |  Markdown   |     |  HTML fragment |     |  HTML document   |
//! |  file       | --> |  pulldown-cmark| --> |  @page rule      |
//! |             |     |  + highlighted |     |  + style layers  |
//! |             |     |    code blocks |     |  + <base href>   |
//! +-------------+     +----------------+     +------------------+
//!                                                     |
//!                                                     v
//!                     +----------------+     +------------------+
//!                     |  PDF file      |     |  Rasterizer      |
//!                     |  (atomic       | <-- |  headless Chrome |
//!                     |   rename)      |     |  print to PDF    |
//!                     +----------------+     +------------------+
//! ```

pub mod config;
pub mod document;
pub mod fonts;
pub mod highlighting;
pub mod markdown;
pub mod pdf;
pub mod styles;

use config::{ColorMode, PageSize};
use document::{AssembledDocument, PageGeometry};
use log::debug;
use pdf::{ChromeRasterizer, Rasterizer};
use std::error::Error;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

/// Errors that can occur while converting a Markdown file.
#[derive(Debug)]
pub enum MdpError {
    /// The input Markdown file does not exist
    InputNotFound { path: String },
    /// Indicates an invalid configuration value or configuration file
    ConfigError { message: String, suggestion: String },
    /// Indicates an I/O error
    IoError {
        message: String,
        path: String,
        suggestion: String,
    },
    /// Indicates a bundled font error
    FontError {
        font_name: String,
        message: String,
        suggestion: String,
    },
    /// Indicates an error while producing the PDF
    PdfError {
        message: String,
        path: Option<String>,
        suggestion: Option<String>,
    },
}

impl Error for MdpError {}
impl fmt::Display for MdpError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MdpError::InputNotFound { path } => write!(f, "Input file not found: {}", path),
            MdpError::ConfigError {
                message,
                suggestion,
            } => {
                write!(f, "Configuration Error: {}", message)?;
                write!(f, "\nSuggestion: {}", suggestion)
            }
            MdpError::IoError {
                message,
                path,
                suggestion,
            } => {
                write!(f, "File Error: {}", message)?;
                write!(f, "\nPath: {}", path)?;
                write!(f, "\nSuggestion: {}", suggestion)
            }
            MdpError::FontError {
                font_name,
                message,
                suggestion,
            } => {
                write!(f, "Font Error: Failed to load font '{}'", font_name)?;
                write!(f, "\n   Reason: {}", message)?;
                write!(f, "\nSuggestion: {}", suggestion)
            }
            MdpError::PdfError {
                message,
                path,
                suggestion,
            } => {
                write!(f, "PDF Generation Error: {}", message)?;
                if let Some(p) = path {
                    write!(f, "\nPath: {}", p)?;
                }
                if let Some(hint) = suggestion {
                    write!(f, "\nSuggestion: {}", hint)?;
                }
                Ok(())
            }
        }
    }
}

impl MdpError {
    /// Creates a simple PDF error with just a message
    pub fn pdf_error(message: impl Into<String>) -> Self {
        MdpError::PdfError {
            message: message.into(),
            path: None,
            suggestion: None,
        }
    }
}

/// Escapes text for HTML element content and quoted attribute values.
pub(crate) fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            c => out.push(c),
        }
    }
    out
}

/// One validated conversion job.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionRequest {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub mode: ColorMode,
    pub geometry: PageGeometry,
}

impl ConversionRequest {
    pub fn new(
        input_path: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
        mode: ColorMode,
        page_size: PageSize,
        margin_inches: f64,
    ) -> Result<Self, MdpError> {
        Ok(Self {
            input_path: input_path.into(),
            output_path: output_path.into(),
            mode,
            geometry: PageGeometry::new(page_size, margin_inches)?,
        })
    }
}

/// Converts a Markdown file to a PDF file using a headless Chrome.
///
/// # Arguments
/// * `input` - Markdown source file
/// * `output` - PDF file to create or overwrite
/// * `mode` - light or dark color theme
/// * `page_size` - letter or A4
/// * `margin_inches` - page margin on all sides
///
/// # Returns
/// * `Err(MdpError::InputNotFound)` if the input does not exist; no output is written
/// * `Err(MdpError)` for any other failure during conversion
pub fn convert(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    mode: ColorMode,
    page_size: PageSize,
    margin_inches: f64,
) -> Result<(), MdpError> {
    let request = ConversionRequest::new(
        input.as_ref(),
        output.as_ref(),
        mode,
        page_size,
        margin_inches,
    )?;
    convert_with(&request, &ChromeRasterizer::default())
}

/// Runs a conversion with the given rasterizer.
pub fn convert_with(request: &ConversionRequest, rasterizer: &dyn Rasterizer) -> Result<(), MdpError> {
    let document = prepare(request)?;
    let bytes = rasterizer.rasterize(&document, &request.geometry)?;
    pdf::write_output(&request.output_path, &bytes)
}

/// Reads the request's input and assembles its HTML document, with relative
/// assets resolved against the input's directory.
pub fn prepare(request: &ConversionRequest) -> Result<AssembledDocument, MdpError> {
    let input = &request.input_path;
    if !input.exists() {
        return Err(MdpError::InputNotFound {
            path: input.display().to_string(),
        });
    }

    let markdown = fs::read_to_string(input).map_err(|e| MdpError::IoError {
        message: format!("Failed to read input: {}", e),
        path: input.display().to_string(),
        suggestion: "Check that the file is readable UTF-8 text".to_string(),
    })?;
    debug!("Read {} bytes from {}", markdown.len(), input.display());

    let base_url = base_url_for(input)?;
    render_document(&markdown, request.mode, &request.geometry, Some(&base_url))
}

/// The `file://` directory URL that relative links in `input` resolve against.
pub fn base_url_for(input: &Path) -> Result<Url, MdpError> {
    let parent = match input.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let dir = parent.canonicalize().map_err(|e| MdpError::IoError {
        message: format!("Failed to resolve input directory: {}", e),
        path: parent.display().to_string(),
        suggestion: "Check that the input directory is accessible".to_string(),
    })?;
    Url::from_directory_path(&dir).map_err(|_| MdpError::IoError {
        message: "Input directory cannot be expressed as a file URL".to_string(),
        path: dir.display().to_string(),
        suggestion: "Move the input to a local directory".to_string(),
    })
}

/// Turns Markdown text into the complete HTML document for `mode`.
pub fn render_document(
    markdown: &str,
    mode: ColorMode,
    geometry: &PageGeometry,
    base_url: Option<&Url>,
) -> Result<AssembledDocument, MdpError> {
    let body = markdown::markdown_to_html(markdown);
    debug!("Markdown rendered to {} bytes of HTML", body.len());
    let styles = styles::compose_stylesheets(mode, true)?;
    Ok(document::assemble(&body, &styles, geometry, base_url))
}
