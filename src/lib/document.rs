//! Assembles the self-contained HTML document handed to the rasterizer.
//!
//! Layout of the output:
//! ```text
//! <!DOCTYPE html>
//! <html lang="en">
//! <head>
//!   <meta charset="utf-8">
//!   <base href="file:///dir/of/input/">      (only when a base is known)
//!   <style>@page { size: A4; margin: 0.5in; }</style>
//!   <style>structural</style>
//!   <style>theme</style>
//!   <style>syntax highlight</style>
//!   <style>font faces</style>                (only with bundled fonts)
//! </head>
//! <body>
//!   body fragment, verbatim
//! </body>
//! </html>
//! ```

use crate::config::{validate_margin, PageSize};
use crate::escape_html;
use crate::styles::StyleBundle;
use crate::MdpError;
use url::Url;

/// Physical page parameters for one conversion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub size: PageSize,
    pub margin_inches: f64,
}

impl PageGeometry {
    /// Validates the margin before it is interpolated into CSS.
    pub fn new(size: PageSize, margin_inches: f64) -> Result<Self, MdpError> {
        Ok(Self {
            size,
            margin_inches: validate_margin(margin_inches)?,
        })
    }

    /// The `@page` rule, e.g. `@page { size: letter; margin: 0.5in; }`.
    pub fn page_rule(&self) -> String {
        format!(
            "@page {{ size: {}; margin: {}in; }}",
            self.size.css_keyword(),
            self.margin_inches
        )
    }

    /// Paper width and height in inches.
    pub fn paper_inches(&self) -> (f64, f64) {
        self.size.dimensions_inches()
    }
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self {
            size: PageSize::default(),
            margin_inches: crate::config::DEFAULT_MARGIN_INCHES,
        }
    }
}

/// A complete HTML document, ready for rasterization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledDocument {
    html: String,
}

impl AssembledDocument {
    pub fn as_str(&self) -> &str {
        &self.html
    }

    pub fn into_string(self) -> String {
        self.html
    }
}

/// Wraps a body fragment and its stylesheets into one document.
///
/// The body is trusted output of the Markdown transformer and is inserted
/// as is. The base URL is attribute-escaped.
pub fn assemble(
    body: &str,
    styles: &StyleBundle,
    geometry: &PageGeometry,
    base_url: Option<&Url>,
) -> AssembledDocument {
    let css_len: usize = styles.layers().iter().map(|l| l.css.len()).sum();
    let mut html = String::with_capacity(body.len() + css_len + 512);

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    if let Some(base) = base_url {
        html.push_str(&format!("<base href=\"{}\">\n", escape_html(base.as_str())));
    }
    html.push_str(&format!("<style>{}</style>\n", geometry.page_rule()));
    for layer in styles.layers() {
        html.push_str("<style>\n");
        html.push_str(&layer.css);
        html.push_str("\n</style>\n");
    }
    html.push_str("</head>\n<body>\n");
    html.push_str(body);
    html.push_str("\n</body>\n</html>\n");

    AssembledDocument { html }
}
