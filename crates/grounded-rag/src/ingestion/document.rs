//! Page-by-page loading of the structured presentation document

use std::path::Path;

use crate::error::{Error, Result};

/// Text of one page, 1-indexed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    /// Page number (1-indexed)
    pub page_number: u32,
    /// Extracted text
    pub text: String,
}

/// Load every non-empty page of a document.
///
/// PDFs are read with `lopdf`; anything else is treated as UTF-8 text whose
/// pages are separated by form feeds, the layout `pdftotext` produces.
pub fn load_pages(path: &Path) -> Result<Vec<PageText>> {
    if !path.exists() {
        return Err(Error::DocumentNotFound(path.display().to_string()));
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let pages = match extension.as_str() {
        "pdf" => load_pdf_pages(path)?,
        _ => {
            let data = std::fs::read(path)?;
            split_form_feed_pages(&String::from_utf8_lossy(&data))
        }
    };

    Ok(pages
        .into_iter()
        .filter(|page| !page.text.trim().is_empty())
        .collect())
}

fn load_pdf_pages(path: &Path) -> Result<Vec<PageText>> {
    let name = path.display().to_string();
    let document =
        lopdf::Document::load(path).map_err(|e| Error::parse(name.clone(), e.to_string()))?;

    let mut pages = Vec::new();
    for page_number in document.get_pages().keys() {
        match document.extract_text(&[*page_number]) {
            Ok(text) => pages.push(PageText {
                page_number: *page_number,
                text,
            }),
            Err(e) => {
                tracing::warn!("  Could not extract page {} of {}: {}", page_number, name, e);
            }
        }
    }

    Ok(pages)
}

/// Split plain text on form feed characters into numbered pages
pub fn split_form_feed_pages(text: &str) -> Vec<PageText> {
    text.split('\u{000C}')
        .enumerate()
        .map(|(i, page)| PageText {
            page_number: i as u32 + 1,
            text: page.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_form_feed_pages() {
        let pages = split_form_feed_pages("first page\u{000C}second page");
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[1].page_number, 2);
        assert_eq!(pages[1].text, "second page");
    }

    #[test]
    fn test_load_text_document_skips_blank_pages() {
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        write!(file, "Slide one\u{000C}   \u{000C}Slide three").unwrap();

        let pages = load_pages(file.path()).unwrap();
        let numbers: Vec<u32> = pages.iter().map(|p| p.page_number).collect();
        assert_eq!(numbers, vec![1, 3]);
    }

    #[test]
    fn test_missing_document() {
        let err = load_pages(Path::new("/definitely/not/here.pdf")).unwrap_err();
        assert!(matches!(err, Error::DocumentNotFound(_)));
    }
}
