//! DOCX reader: pulls paragraphs out of `word/document.xml` and lays them out
//! as simple HTML for the renderer.

use std::io::{Cursor, Read};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::conversion::ConversionError;

const DOCUMENT_XML: &str = "word/document.xml";

static PARAGRAPH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<w:p\b[^>]*?(?:/>|>(.*?)</w:p>)").unwrap());
static STYLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<w:pStyle\s+w:val="([^"]+)""#).unwrap());
static RUN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<w:t(?:\s[^>]*)?>(.*?)</w:t>|<w:tab/>|<w:br/>").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParagraphKind {
    Heading(u8),
    ListItem,
    Body,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paragraph {
    pub kind: ParagraphKind,
    pub text: String,
}

/// Text content of a DOCX file, paragraph by paragraph. Empty paragraphs are
/// dropped.
#[derive(Debug, Clone, Default)]
pub struct DocxBody {
    pub paragraphs: Vec<Paragraph>,
}

impl DocxBody {
    pub fn parse(bytes: &[u8]) -> Result<Self, ConversionError> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| ConversionError::Docx(format!("not a zip container: {e}")))?;
        let mut xml = String::new();
        archive
            .by_name(DOCUMENT_XML)
            .map_err(|e| ConversionError::Docx(format!("missing {DOCUMENT_XML}: {e}")))?
            .read_to_string(&mut xml)?;
        Ok(Self::from_document_xml(&xml))
    }

    pub fn from_document_xml(xml: &str) -> Self {
        let paragraphs = PARAGRAPH_RE
            .captures_iter(xml)
            .filter_map(|caps| {
                let inner = caps.get(1)?.as_str();
                let text = paragraph_text(inner);
                if text.trim().is_empty() {
                    return None;
                }
                Some(Paragraph {
                    kind: paragraph_kind(inner),
                    text: text.trim().to_string(),
                })
            })
            .collect();
        Self { paragraphs }
    }

    pub fn is_empty(&self) -> bool {
        self.paragraphs.is_empty()
    }

    pub fn plain_text(&self) -> String {
        self.paragraphs
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// HTML body fragment; consecutive list items share one `<ul>`.
    pub fn to_html(&self) -> String {
        let mut html = String::new();
        let mut in_list = false;
        for p in &self.paragraphs {
            let is_item = p.kind == ParagraphKind::ListItem;
            if is_item && !in_list {
                html.push_str("<ul>\n");
            } else if !is_item && in_list {
                html.push_str("</ul>\n");
            }
            in_list = is_item;

            let text = escape_html(&p.text).replace('\n', "<br>");
            match p.kind {
                ParagraphKind::Heading(level) => {
                    html.push_str(&format!("<h{level}>{text}</h{level}>\n"))
                }
                ParagraphKind::ListItem => html.push_str(&format!("<li>{text}</li>\n")),
                ParagraphKind::Body => html.push_str(&format!("<p>{text}</p>\n")),
            }
        }
        if in_list {
            html.push_str("</ul>\n");
        }
        html
    }
}

fn paragraph_kind(inner: &str) -> ParagraphKind {
    let style = STYLE_RE
        .captures(inner)
        .map(|c| c[1].to_ascii_lowercase())
        .unwrap_or_default();
    match style.as_str() {
        "title" | "heading1" => ParagraphKind::Heading(1),
        "heading2" => ParagraphKind::Heading(2),
        "heading3" => ParagraphKind::Heading(3),
        s if s.starts_with("list") => ParagraphKind::ListItem,
        _ if inner.contains("<w:numPr>") => ParagraphKind::ListItem,
        _ => ParagraphKind::Body,
    }
}

fn paragraph_text(inner: &str) -> String {
    let mut text = String::new();
    for caps in RUN_RE.captures_iter(inner) {
        match caps.get(1) {
            Some(run) => text.push_str(&unescape_xml(run.as_str())),
            None if &caps[0] == "<w:tab/>" => text.push(' '),
            None => text.push('\n'),
        }
    }
    text
}

fn unescape_xml(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
