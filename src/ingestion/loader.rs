//! Document loaders: PDF files and fetched web pages

use reqwest::Client;
use scraper::{Html, Selector};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use super::{Document, IngestError};

/// Load a PDF from disk, producing one document per page.
///
/// The document source is the file name, not the full path, so that
/// delete-by-source can match on the uploaded filename.
pub fn load_pdf(path: &Path) -> Result<Vec<Document>, IngestError> {
    let source = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let pdf = lopdf::Document::load(path)
        .map_err(|e| IngestError::DocumentProcessing(format!("unreadable PDF {source}: {e}")))?;

    let mut documents = Vec::new();
    for (page_number, _) in pdf.get_pages() {
        let text = pdf.extract_text(&[page_number]).map_err(|e| {
            IngestError::DocumentProcessing(format!(
                "failed to extract text from page {page_number} of {source}: {e}"
            ))
        })?;
        documents.push(Document::new(
            text.trim_end().to_string(),
            source.clone(),
            Some(page_number),
        ));
    }

    debug!("Loaded {} page(s) from {}", documents.len(), source);
    Ok(documents)
}

/// Extract the visible paragraph text from an HTML page, one `<p>` per line.
pub fn extract_paragraph_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("p") else {
        return String::new();
    };

    document
        .select(&selector)
        .map(|p| {
            p.text()
                .collect::<Vec<_>>()
                .join(" ")
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Fetches a web page and extracts its paragraph text as a single document.
pub struct WebLoader {
    client: Client,
}

impl WebLoader {
    pub fn new() -> Result<Self, IngestError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("rag-tenant-node/0.1")
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| IngestError::DocumentProcessing(e.to_string()))?;
        Ok(Self { client })
    }

    /// Fetch a URL and produce a single document tagged with the source URL.
    pub async fn fetch(&self, url: &str) -> Result<Document, IngestError> {
        if !is_safe_url(url) {
            return Err(IngestError::UnsafeUrl(url.to_string()));
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| IngestError::Fetch {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(IngestError::Fetch {
                url: url.to_string(),
                reason: format!("HTTP {}", status.as_u16()),
            });
        }

        let html = response.text().await.map_err(|e| IngestError::Fetch {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let text = extract_paragraph_text(&html);
        if text.is_empty() {
            return Err(IngestError::EmptyExtraction(url.to_string()));
        }

        info!("Extracted {} chars from {}", text.len(), url);
        Ok(Document::new(text, url, None))
    }
}

/// Reject URLs that could reach local or private-network services.
pub fn is_safe_url(url: &str) -> bool {
    let parsed = match Url::parse(url) {
        Ok(u) => u,
        Err(_) => return false,
    };

    if !matches!(parsed.scheme(), "http" | "https") {
        return false;
    }

    match parsed.host_str() {
        Some(host) => {
            let host = host.to_lowercase();
            if host == "localhost" || host == "0.0.0.0" {
                return false;
            }
            !is_private_ip(&host)
        }
        None => false,
    }
}

fn is_private_ip(host: &str) -> bool {
    let octets: Vec<u8> = host.split('.').filter_map(|o| o.parse().ok()).collect();
    if octets.len() != 4 {
        return false;
    }
    match octets[0] {
        10 | 127 => true,
        172 => (16..=31).contains(&octets[1]),
        192 => octets[1] == 168,
        169 => octets[1] == 254,
        _ => false,
    }
}
