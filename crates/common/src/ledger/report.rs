//! HTML report renderer - splices discovery events into a report page

use super::{ReportSink, SourceDiscovered};
use crate::errors::{AppError, Result};
use std::path::{Path, PathBuf};
use tracing::info;

/// Writes one block per event immediately before the first marker
pub struct HtmlReportRenderer {
    path: PathBuf,
    marker: String,
}

impl HtmlReportRenderer {
    pub fn new(path: impl AsRef<Path>, marker: &str) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            marker: marker.to_string(),
        }
    }

    pub fn render(event: &SourceDiscovered) -> String {
        let title = escape_html(&event.title);
        let link = escape_html(&event.link);
        let timestamp = event.discovered_at.to_rfc3339();

        format!(
            "<div class=\"report\" data-id=\"{}\">\n  \
             <h3>{}</h3>\n  \
             <a href=\"{}\" target=\"_blank\">{}</a>\n  \
             <time datetime=\"{}\">{}</time>\n\
             </div>\n",
            event.id, title, link, link, timestamp, timestamp
        )
    }

    /// `document` with the block inserted before the first marker
    fn splice(&self, document: &str, block: &str) -> Option<String> {
        let at = document.find(&self.marker)?;
        let mut out = String::with_capacity(document.len() + block.len());
        out.push_str(&document[..at]);
        out.push_str(block);
        out.push_str(&document[at..]);
        Some(out)
    }
}

impl ReportSink for HtmlReportRenderer {
    fn publish(&self, event: &SourceDiscovered) -> Result<()> {
        let document = std::fs::read_to_string(&self.path).map_err(|e| AppError::Report {
            message: format!("Cannot read report {}: {}", self.path.display(), e),
        })?;

        let updated = self
            .splice(&document, &Self::render(event))
            .ok_or_else(|| AppError::Report {
                message: format!("Marker {} not found in {}", self.marker, self.path.display()),
            })?;

        std::fs::write(&self.path, updated).map_err(|e| AppError::Report {
            message: format!("Cannot write report {}: {}", self.path.display(), e),
        })?;

        info!(title = %event.title, link = %event.link, "Source published to report");
        Ok(())
    }
}

/// Escape text for use in HTML content and attribute values
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}
