//! Sanitizer: strips characters that must never reach storage.
//!
//! Every string that leaves the pipeline goes through `clean`. The function is
//! idempotent: `clean(&clean(s)) == clean(s)`.

/// Removes NUL and C0/C1 control characters (tab, newline and carriage return
/// survive), turns undecodable sequences into a space, and trims.
///
/// Rust strings cannot hold lone UTF-16 surrogates; they arrive here already
/// decoded to U+FFFD by a lossy conversion, so that is the code point mapped
/// to a space.
pub fn clean(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if c == char::REPLACEMENT_CHARACTER {
            out.push(' ');
        } else if !is_stripped_control(c) {
            out.push(c);
        }
    }
    out.trim().to_string()
}

/// Decodes raw bytes lossily and cleans the result.
pub fn clean_bytes(input: &[u8]) -> String {
    clean(&String::from_utf8_lossy(input))
}

/// Cleans every element and drops the ones that end up empty.
pub fn clean_all(items: &[String]) -> Vec<String> {
    items
        .iter()
        .map(|item| clean(item))
        .filter(|item| !item.is_empty())
        .collect()
}

fn is_stripped_control(c: char) -> bool {
    matches!(c,
        '\u{0000}'..='\u{0008}'
        | '\u{000B}'
        | '\u{000C}'
        | '\u{000E}'..='\u{001F}'
        | '\u{007F}'..='\u{009F}')
}
