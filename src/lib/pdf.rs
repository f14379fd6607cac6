//! Rasterization of the assembled document and the final PDF write.
//!
//! [`Rasterizer`] is the seam to the HTML/CSS layout engine. The production
//! implementation, [`ChromeRasterizer`], drives a headless Chrome/Chromium
//! through the DevTools protocol: the document is written to a temporary
//! `.html` file, loaded over `file://` and printed with backgrounds enabled.

use crate::config::ChromeSettings;
use crate::document::{AssembledDocument, PageGeometry};
use crate::MdpError;
use headless_chrome::{types::PrintToPdfOptions, Browser, LaunchOptions};
use log::{debug, info};
use std::io::Write;
use std::path::Path;
use std::thread;
use std::time::Duration;
use url::Url;

const PDF_MAGIC: &[u8] = b"%PDF-";

/// Turns an assembled HTML document into PDF bytes.
pub trait Rasterizer {
    fn rasterize(
        &self,
        document: &AssembledDocument,
        geometry: &PageGeometry,
    ) -> Result<Vec<u8>, MdpError>;
}

/// Rasterizer backed by a headless Chrome instance launched per call.
#[derive(Debug, Clone, Default)]
pub struct ChromeRasterizer {
    settings: ChromeSettings,
}

fn chrome_error(message: String) -> MdpError {
    MdpError::PdfError {
        message,
        path: None,
        suggestion: Some(
            "Make sure Chrome or Chromium is installed, or set [chrome] path in your configuration file"
                .to_string(),
        ),
    }
}

impl ChromeRasterizer {
    pub fn new(settings: ChromeSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ChromeSettings {
        &self.settings
    }

    fn print_options(geometry: &PageGeometry) -> PrintToPdfOptions {
        let (paper_width, paper_height) = geometry.paper_inches();
        let margin = geometry.margin_inches;
        PrintToPdfOptions {
            landscape: Some(false),
            display_header_footer: Some(false),
            print_background: Some(true),
            scale: Some(1.0),
            paper_width: Some(paper_width),
            paper_height: Some(paper_height),
            margin_top: Some(margin),
            margin_bottom: Some(margin),
            margin_left: Some(margin),
            margin_right: Some(margin),
            // the @page rule is authoritative, paper fields are the fallback
            prefer_css_page_size: Some(true),
            ..Default::default()
        }
    }
}

impl Rasterizer for ChromeRasterizer {
    fn rasterize(
        &self,
        document: &AssembledDocument,
        geometry: &PageGeometry,
    ) -> Result<Vec<u8>, MdpError> {
        let mut html_file = tempfile::Builder::new()
            .prefix("md-pdf-")
            .suffix(".html")
            .tempfile()
            .map_err(|e| MdpError::IoError {
                message: format!("Failed to create temporary HTML file: {}", e),
                path: std::env::temp_dir().display().to_string(),
                suggestion: "Check that the temporary directory is writable".to_string(),
            })?;
        html_file
            .write_all(document.as_str().as_bytes())
            .and_then(|_| html_file.flush())
            .map_err(|e| MdpError::IoError {
                message: format!("Failed to write temporary HTML file: {}", e),
                path: html_file.path().display().to_string(),
                suggestion: "Check available disk space in the temporary directory".to_string(),
            })?;

        let file_url = Url::from_file_path(html_file.path()).map_err(|_| MdpError::IoError {
            message: "Temporary HTML file path is not absolute".to_string(),
            path: html_file.path().display().to_string(),
            suggestion: "Set TMPDIR to an absolute directory".to_string(),
        })?;

        let timeout = Duration::from_secs(self.settings.timeout_secs);
        let options = LaunchOptions::default_builder()
            .headless(true)
            .sandbox(self.settings.sandbox)
            .path(self.settings.executable.clone())
            .idle_browser_timeout(timeout)
            .build()
            .map_err(|e| chrome_error(format!("Invalid browser launch options: {}", e)))?;

        info!("Launching headless browser");
        let browser =
            Browser::new(options).map_err(|e| chrome_error(format!("Failed to launch browser: {}", e)))?;
        let tab = browser
            .new_tab()
            .map_err(|e| chrome_error(format!("Failed to open browser tab: {}", e)))?;
        tab.set_default_timeout(timeout);

        debug!("Loading {}", file_url);
        tab.navigate_to(file_url.as_str())
            .map_err(|e| chrome_error(format!("Failed to load document: {}", e)))?;
        tab.wait_until_navigated()
            .map_err(|e| chrome_error(format!("Document did not finish loading: {}", e)))?;

        // fonts and images finish decoding after the load event
        if self.settings.settle_ms > 0 {
            thread::sleep(Duration::from_millis(self.settings.settle_ms));
        }

        let bytes = tab
            .print_to_pdf(Some(Self::print_options(geometry)))
            .map_err(|e| chrome_error(format!("Failed to print PDF: {}", e)))?;

        if !bytes.starts_with(PDF_MAGIC) {
            return Err(MdpError::PdfError {
                message: "Browser output is not a PDF document".to_string(),
                path: None,
                suggestion: Some("Try a different Chrome or Chromium version".to_string()),
            });
        }

        info!("Rendered PDF ({} bytes)", bytes.len());
        Ok(bytes)
    }
}

/// Writes the rendered output to `path`, replacing any existing file.
///
/// The bytes go to a temporary file in the destination directory first and
/// are renamed into place, so a failure never leaves a truncated file.
pub fn write_output(path: &Path, bytes: &[u8]) -> Result<(), MdpError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    if !parent.is_dir() {
        return Err(MdpError::IoError {
            message: "Output directory does not exist".to_string(),
            path: parent.display().to_string(),
            suggestion: format!("Create the directory first: mkdir -p {}", parent.display()),
        });
    }

    let write_error = |e: std::io::Error| MdpError::IoError {
        message: format!("Failed to write output: {}", e),
        path: path.display().to_string(),
        suggestion: if e.kind() == std::io::ErrorKind::PermissionDenied {
            "Check that you have write permissions for this location".to_string()
        } else {
            "Try a different output path or check available disk space".to_string()
        },
    };

    let mut file = tempfile::NamedTempFile::new_in(parent).map_err(write_error)?;
    file.write_all(bytes).map_err(write_error)?;
    file.flush().map_err(write_error)?;
    file.persist(path).map_err(|e| write_error(e.error))?;

    debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}
