//! Byte-level text recovery for PDFs no parser accepts.
//!
//! Three independent passes over the raw bytes: literal strings `(...)`, hex
//! strings `<...>` (UTF-16BE when they carry a BOM), and `stream ... endstream`
//! bodies. Matches are unioned in that order and whitespace is collapsed.

use std::io::Read;

use flate2::read::ZlibDecoder;
use once_cell::sync::Lazy;
use regex::bytes::Regex as BytesRegex;
use regex::Regex;

static LITERAL_RE: Lazy<BytesRegex> =
    Lazy::new(|| BytesRegex::new(r"(?s-u)\(((?:[^()\\]|\\.)*)\)").unwrap());
static HEX_RE: Lazy<BytesRegex> =
    Lazy::new(|| BytesRegex::new(r"(?-u)<([0-9A-Fa-f]{4,})>").unwrap());
static STREAM_RE: Lazy<BytesRegex> =
    Lazy::new(|| BytesRegex::new(r"(?s-u)stream\r?\n(.*?)\r?\nendstream").unwrap());
static TEXT_OPERATOR_RE: Lazy<BytesRegex> =
    Lazy::new(|| BytesRegex::new(r"(?-u)\)\s*(?:Tj|TJ|'|\x22)").unwrap());
static STREAM_RUN_RE: Lazy<BytesRegex> =
    Lazy::new(|| BytesRegex::new(r#"(?-u)[A-Za-z0-9 .,;:'"!?()@&/+\-]{4,}"#).unwrap());

static WORDLIKE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z0-9]{2,}").unwrap());
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static SPACE_BEFORE_PUNCT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r" ([.,;:!?])").unwrap());

/// Streams bigger than this are not inflated.
const MAX_INFLATED_BYTES: u64 = 8 * 1024 * 1024;

pub fn scan(bytes: &[u8]) -> String {
    let mut pieces = literal_strings(bytes);
    pieces.extend(hex_strings(bytes));
    pieces.extend(stream_text(bytes));

    let mut seen = std::collections::HashSet::new();
    pieces.retain(|p| seen.insert(p.clone()));

    let joined = pieces.join(" ");
    let collapsed = WHITESPACE_RE.replace_all(&joined, " ");
    SPACE_BEFORE_PUNCT_RE
        .replace_all(&collapsed, "$1")
        .trim()
        .to_string()
}

fn keep(text: String) -> Option<String> {
    let trimmed = text.trim();
    if WORDLIKE_RE.is_match(trimmed) {
        Some(trimmed.to_string())
    } else {
        None
    }
}

fn literal_strings(bytes: &[u8]) -> Vec<String> {
    LITERAL_RE
        .captures_iter(bytes)
        .filter_map(|caps| keep(decode_literal(&caps[1])))
        .collect()
}

fn hex_strings(bytes: &[u8]) -> Vec<String> {
    HEX_RE
        .captures_iter(bytes)
        .filter_map(|caps| decode_hex(&caps[1]))
        .filter_map(keep)
        .collect()
}

/// Compressed bodies are inflated and their literal strings read; plain
/// content streams are already covered by the literal pass; anything else
/// contributes its printable runs.
fn stream_text(bytes: &[u8]) -> Vec<String> {
    let mut out = Vec::new();
    for caps in STREAM_RE.captures_iter(bytes) {
        let body = &caps[1];
        if let Some(inflated) = inflate(body) {
            out.extend(literal_strings(&inflated));
        } else if !TEXT_OPERATOR_RE.is_match(body) {
            out.extend(
                STREAM_RUN_RE
                    .find_iter(body)
                    .map(|m| latin1(m.as_bytes()))
                    .filter(|run| run.chars().filter(|c| c.is_ascii_alphabetic()).count() >= 3)
                    .filter_map(keep),
            );
        }
    }
    out
}

fn inflate(body: &[u8]) -> Option<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(body).take(MAX_INFLATED_BYTES);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out).ok()?;
    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}

/// Resolves the escapes allowed inside a PDF literal string.
fn decode_literal(raw: &[u8]) -> String {
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] != b'\\' {
            out.push(raw[i]);
            i += 1;
            continue;
        }
        i += 1;
        let Some(&next) = raw.get(i) else { break };
        match next {
            b'n' => out.push(b'\n'),
            b'r' => out.push(b'\r'),
            b't' => out.push(b'\t'),
            b'b' | b'f' => out.push(b' '),
            b'0'..=b'7' => {
                let mut value: u32 = 0;
                let mut digits = 0;
                while digits < 3 && i < raw.len() && (b'0'..=b'7').contains(&raw[i]) {
                    value = value * 8 + u32::from(raw[i] - b'0');
                    i += 1;
                    digits += 1;
                }
                out.push((value & 0xFF) as u8);
                continue;
            }
            // Escaped line break: continuation.
            b'\r' | b'\n' => {}
            other => out.push(other),
        }
        i += 1;
    }
    latin1(&out)
}

fn decode_hex(digits: &[u8]) -> Option<String> {
    let digits = std::str::from_utf8(digits).ok()?;
    let bytes: Vec<u8> = digits
        .as_bytes()
        .chunks(2)
        .filter_map(|pair| {
            let pair = std::str::from_utf8(pair).ok()?;
            // A trailing odd digit is padded with 0.
            let padded = if pair.len() == 1 {
                format!("{pair}0")
            } else {
                pair.to_string()
            };
            u8::from_str_radix(&padded, 16).ok()
        })
        .collect();

    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]));
        return Some(
            char::decode_utf16(units)
                .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
                .collect(),
        );
    }
    // Glyph ids and binary blobs decode to mostly non-printable bytes.
    let printable = bytes.iter().filter(|b| b.is_ascii_graphic() || **b == b' ').count();
    if printable * 2 < bytes.len() {
        return None;
    }
    Some(latin1(&bytes))
}

fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}
