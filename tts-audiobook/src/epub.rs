// EPUB parsing and text extraction

use crate::assembler::RawChapter;
use anyhow::{Context, Result};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

/// Render width for html2text. Large so paragraphs are not wrapped into several lines.
const RENDER_WIDTH: usize = 10_000;

const UNKNOWN: &str = "Unknown";

/// Book text and metadata pulled out of an e-book file.
#[derive(Debug)]
pub struct ExtractedBook {
    pub title: String,
    pub author: String,
    /// Chapters in reading order, empty ones included
    pub chapters: Vec<RawChapter>,
    pub cover_image: Option<Vec<u8>>,
}

/// Parse an EPUB file and extract one raw chapter per spine document.
pub fn parse_epub(path: &Path) -> Result<ExtractedBook> {
    let mut doc =
        epub::doc::EpubDoc::new(path).map_err(|e| anyhow::anyhow!("Failed to open EPUB: {}", e))?;

    let title = doc
        .mdata("title")
        .map(|m| m.value.clone())
        .unwrap_or_else(|| UNKNOWN.to_string());
    let author = doc
        .mdata("creator")
        .map(|m| m.value.clone())
        .unwrap_or_else(|| UNKNOWN.to_string());

    let cover_image = extract_cover_image(&mut doc);

    let mut chapters = Vec::new();
    let spine = doc.spine.clone();

    for (position, spine_item) in spine.iter().enumerate() {
        let Some((content_bytes, _mime)) = doc.get_resource(&spine_item.idref) else {
            debug!("Spine item {} has no resource, skipping", spine_item.idref);
            continue;
        };
        let html = String::from_utf8_lossy(&content_bytes);

        let chapter_title = extract_title_from_html(&html)
            .unwrap_or_else(|| format!("Chapter {}", position + 1));
        let body = html_to_text(&html);

        debug!(
            "Extracted \"{}\" ({} chars) from {}",
            chapter_title,
            body.len(),
            spine_item.idref
        );
        chapters.push(RawChapter::new(chapter_title, body));
    }

    Ok(ExtractedBook {
        title,
        author,
        chapters,
        cover_image,
    })
}

/// Read a plain text file as a single-chapter book titled by the file stem.
pub fn read_text_file(path: &Path) -> Result<ExtractedBook> {
    let body = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let title = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| UNKNOWN.to_string());

    Ok(ExtractedBook {
        title: title.clone(),
        author: UNKNOWN.to_string(),
        chapters: vec![RawChapter::new(title, body)],
        cover_image: None,
    })
}

/// Pick the extractor by file extension (`.txt` or EPUB).
pub fn load_book(path: &Path) -> Result<ExtractedBook> {
    let is_text = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("txt"));

    if is_text {
        read_text_file(path)
    } else {
        parse_epub(path)
    }
}

fn extract_cover_image(
    doc: &mut epub::doc::EpubDoc<std::io::BufReader<std::fs::File>>,
) -> Option<Vec<u8>> {
    if let Some((cover_bytes, _mime)) = doc.get_cover() {
        return Some(cover_bytes);
    }

    // Some books only reference the cover from metadata
    let cover_id = doc.mdata("cover").map(|m| m.value.clone())?;
    doc.get_resource(&cover_id).map(|(bytes, _mime)| bytes)
}

/// First non-empty h1, h2, or h3 text in the document.
fn extract_title_from_html(html: &str) -> Option<String> {
    let html_lower = html.to_ascii_lowercase();

    ["h1", "h2", "h3"]
        .iter()
        .find_map(|tag| heading_text(html, &html_lower, tag))
}

fn heading_text(html: &str, html_lower: &str, tag: &str) -> Option<String> {
    let start = html_lower.find(&format!("<{}", tag))?;
    let content_start = start + html_lower[start..].find('>')? + 1;
    let end = html_lower[content_start..].find(&format!("</{}>", tag))?;

    let title = strip_html_tags(&html[content_start..content_start + end]);
    let title = title.split_whitespace().collect::<Vec<_>>().join(" ");
    (!title.is_empty()).then_some(title)
}

fn strip_html_tags(html: &str) -> String {
    let mut result = String::new();
    let mut in_tag = false;

    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => result.push(ch),
            _ => {}
        }
    }

    result
}

static HEADING_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^#+\s+").unwrap());
static FOOTNOTE_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\[\d+\]:?\s").unwrap());
static LINK_REFERENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\]]*)\]\[\d+\]").unwrap());
static EMPHASIS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*{1,2}([^*]+)\*{1,2}").unwrap());
static RULE_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[-─═=_*\s]+$").unwrap());

/// Convert chapter HTML to plain text, one block element per line.
///
/// Inline markup disappears; blank lines between blocks collapse to a single
/// newline.
pub fn html_to_text(html: &str) -> String {
    let rendered = html2text::from_read(html.as_bytes(), RENDER_WIDTH);

    rendered
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !FOOTNOTE_LINE.is_match(line) && !RULE_LINE.is_match(line))
        .map(strip_render_markup)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn strip_render_markup(line: &str) -> String {
    let line = HEADING_MARKER.replace(line, "");
    let line = LINK_REFERENCE.replace_all(&line, "$1");
    let line = EMPHASIS.replace_all(&line, "$1");
    line.trim().to_string()
}
