//! Last-resort conversion output: recovered printable text wrapped in a
//! notice, as HTML for the renderer or as a plain PDF written with lopdf.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use once_cell::sync::Lazy;
use regex::bytes::Regex;

use crate::conversion::docx::escape_html;

/// Runs kept when recovering text from a binary file.
const MAX_RUNS: usize = 50;
const WRAP_COLUMNS: usize = 90;
const LINES_PER_PAGE: usize = 50;
const FONT_SIZE: i64 = 10;
const LEADING: i64 = 14;
const LEFT_MARGIN: i64 = 50;
const TOP_MARGIN: i64 = 790;

static PRINTABLE_RUN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?-u)[A-Za-z0-9\s.,;:'"!?()\-]{5,100}"#).unwrap());

/// Best-effort plain text from an arbitrary binary: the first printable runs
/// joined with spaces.
pub fn printable_runs(bytes: &[u8]) -> String {
    PRINTABLE_RUN_RE
        .find_iter(bytes)
        .map(|m| String::from_utf8_lossy(m.as_bytes()).trim().to_string())
        .filter(|run| !run.is_empty())
        .take(MAX_RUNS)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Full HTML page around a converted body fragment.
pub fn html_document(body: &str, note: Option<&str>) -> String {
    let note = note
        .map(|n| {
            format!(
                "<div class=\"note\"><p>{}</p></div>",
                escape_html(n)
            )
        })
        .unwrap_or_default();
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="UTF-8">
<title>Document</title>
<style>
body {{ font-family: Arial, sans-serif; line-height: 1.5; margin: 1cm; }}
h1, h2, h3 {{ margin-top: 1em; margin-bottom: 0.5em; }}
p {{ margin-bottom: 0.5em; }}
.note {{ margin-top: 20px; padding: 10px; border: 1px solid #ddd; font-style: italic; color: #666; }}
</style>
</head>
<body>
{body}
{note}
</body>
</html>
"#
    )
}

/// Notice page naming the original file, with whatever text was recovered.
pub fn placeholder_html(filename: &str, recovered: &str) -> String {
    let mut body = format!(
        "<h1>Document Preview</h1>\n<p>{}</p>\n<p>Original file: <code>{}</code></p>\n",
        escape_html(&unconverted_notice(filename)),
        escape_html(filename)
    );
    if !recovered.trim().is_empty() {
        body.push_str(&format!(
            "<h2>Extracted text</h2>\n<pre>{}</pre>\n",
            escape_html(recovered)
        ));
    }
    html_document(&body, None)
}

pub fn unconverted_notice(filename: &str) -> String {
    format!("The file {filename} could not be converted. Open the original file for full content.")
}

/// Writes `text` into a bare PDF (Helvetica, wrapped lines, as many pages as
/// needed). Non-ASCII characters are replaced with `?`.
pub fn text_pdf(text: &str) -> lopdf::Result<Vec<u8>> {
    let lines = wrap_lines(text, WRAP_COLUMNS);

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::new();
    let chunks: Vec<&[String]> = if lines.is_empty() {
        vec![&lines[..]]
    } else {
        lines.chunks(LINES_PER_PAGE).collect()
    };
    for chunk in chunks {
        // One text object per line so extractors see line breaks.
        let mut operations = Vec::with_capacity(chunk.len() * 5);
        for (row, line) in chunk.iter().enumerate() {
            let y = TOP_MARGIN - row as i64 * LEADING;
            operations.extend([
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), FONT_SIZE.into()]),
                Operation::new("Td", vec![LEFT_MARGIN.into(), y.into()]),
                Operation::new("Tj", vec![Object::string_literal(line.as_bytes().to_vec())]),
                Operation::new("ET", vec![]),
            ]);
        }

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out)?;
    Ok(out)
}

fn wrap_lines(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for raw in text.lines() {
        let ascii: String = raw
            .chars()
            .map(|c| if c.is_ascii() && !c.is_ascii_control() { c } else { '?' })
            .collect();
        let mut current = String::new();
        for word in ascii.split_whitespace() {
            if !current.is_empty() && current.len() + 1 + word.len() > width {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        }
        lines.push(current);
    }
    lines
}
