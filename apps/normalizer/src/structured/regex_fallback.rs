//! Deterministic field extraction used when the completion capability is
//! absent or its answer is unusable.
//!
//! Every field has its own pattern family, tried in priority order; the first
//! hit wins. Results go through the sanitizer and missing fields stay empty.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::resume::{EducationDetail, Experience, StructuredResumeDraft};
use crate::structured::skills::find_skills;

const SUMMARY_MAX_LINES: usize = 4;
const SUMMARY_PARAGRAPH_MIN: usize = 50;
const SUMMARY_PARAGRAPH_MAX: usize = 500;
const SUMMARY_PREFIX_CHARS: usize = 200;
const EDUCATION_LINE_MAX: usize = 200;

/// Capitalized words that head sections or describe roles, never names.
const NAME_STOPWORDS: &[&str] = &[
    "Resume", "Curriculum", "Vitae", "Summary", "Profile", "Objective", "Contact", "Experience",
    "Education", "Skills", "Work", "Professional", "Technical", "Software", "Engineer",
    "Developer", "Senior", "Junior", "Manager", "University", "College", "Institute", "Present",
    "File", "Information", "Languages", "Certifications", "Page", "Street", "Avenue", "Road",
];

const US_STATES: &[&str] = &[
    "AL", "AK", "AZ", "AR", "CA", "CO", "CT", "DE", "FL", "GA", "HI", "ID", "IL", "IN", "IA",
    "KS", "KY", "LA", "ME", "MD", "MA", "MI", "MN", "MS", "MO", "MT", "NE", "NV", "NH", "NJ",
    "NM", "NY", "NC", "ND", "OH", "OK", "OR", "PA", "RI", "SC", "SD", "TN", "TX", "UT", "VT",
    "VA", "WA", "WV", "WI", "WY", "DC",
];

// Name
static NAME_LABEL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i:\bname)[ \t]*:[ \t]*([A-Z][a-z]+(?: [A-Z]\.)?(?: [A-Z][a-z]+)+)").unwrap()
});
static RESUME_OF_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i:\b(?:cv|resume|curriculum vitae)\s+of)\s+([A-Z][a-z]+(?: [A-Z][a-z]+)+)")
        .unwrap()
});
static NAME_LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*([A-Z][a-z]+(?:[ \t]+[A-Z]\.)?(?:[ \t]+[A-Z][a-z]+){1,2})[ \t\r]*$")
        .unwrap()
});
static NAME_ANYWHERE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([A-Z][a-z]+ (?:[A-Z]\. )?[A-Z][a-z]+)\b").unwrap());

// Contact
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap());
static PHONE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // (512) 555-0199, +1 (512) 555-0199
        r"(?:\+\d{1,3}[-. ]?)?\(\d{3}\)[-. ]?\d{3}[-. ]?\d{4}\b",
        // 5125550199
        r"\b\d{10}\b",
        // 512-555-0199, 512.555.0199
        r"\b\d{3}[-.]\d{3}[-.]\d{4}\b",
        // Phone: ...
        r"(?i:\b(?:phone|tel|mobile|cell))[ \t]*:?[ \t]*(\+?[\d(][\d() \t.-]{5,}\d)",
        // +44 20 7946 0958
        r"\+\d{1,3}(?:[-. ]?\d{1,4}){2,4}\b",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});
static LOCATION_LABEL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i:\b(?:address|location))[ \t]*:[ \t]*([^\n|]+)").unwrap());
static BASED_IN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i:\bbased in)[ \t]+([^\n.;|]+)").unwrap());
static CITY_STATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b([A-Z][a-zA-Z]+(?:[ -][A-Z][a-zA-Z]+)*),[ \t]*([A-Z]{2})\b(?:[ \t]+(\d{5}(?:-\d{4})?))?")
        .unwrap()
});

// Title
static TITLE_LABEL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^[ \t]*(?:job\s+|current\s+)?(?:title|position|role)[ \t]*:[ \t]*([^\n]+)")
        .unwrap()
});
static ROLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:(?:senior|lead|principal|staff|junior|associate)\s+)?(?:(?:software|frontend|backend|full stack|devops|cloud|data|machine learning|ai|mobile|web|ui/ux|qa|test|product|project)\s+)?(?:engineer|developer|architect|scientist|analyst|manager|director|specialist|designer|consultant)\b",
    )
    .unwrap()
});
static EXECUTIVE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:CTO|CEO|CIO|CFO|COO|VP of [A-Z][a-z]+)\b").unwrap());

// Summary
static SUMMARY_LABEL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^[ \t]*(?:professional\s+)?(?:summary|profile|objective|about(?:\s+me)?)\b[ \t]*:?[ \t]*(.*)$")
        .unwrap()
});
static PARAGRAPH_BREAK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n[ \t\r]*\n").unwrap());
/// A line that opens another labeled section ("Skills: ...").
static LABEL_LINE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z][A-Za-z ]{1,30}:").unwrap());

// Education
static DEGREE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:Bachelor|Master|Doctor)(?:'s)?(?:\s+of\s+[A-Z][A-Za-z]+(?:\s+[A-Z][A-Za-z]+)*)?|\b(?:B\.S\.|B\.A\.|M\.S\.|M\.A\.|Ph\.D\.?)|\b(?:PhD|MBA|BSc|MSc|BEng|MEng)\b",
    )
    .unwrap()
});
static INSTITUTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:University|College|Institute|School) of [A-Z][A-Za-z&]*(?: (?:of |and |& )?[A-Z][A-Za-z&]*)*|\b[A-Z][A-Za-z&.]*(?: [A-Z][A-Za-z&.]*)* (?:University|College|Institute)\b",
    )
    .unwrap()
});
static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(?:19|20)\d{2}\b").unwrap());

// Experience
static EXPERIENCE_YEARS_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\b(\d{1,2})\+?\s*(?:years|yrs)\s+of\s+(?:\w+\s+)?experience",
        r"(?i)\bexperience\s*:?\s*(\d{1,2})\+?\s*(?:years|yrs)\b",
        r"(?i)\b(?:with|having|over)\s+(\d{1,2})\+?\s*(?:years|yrs)\b",
        r"(?i)\b(\d{1,2})\+\s*(?:years|yrs)\b",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});
static SENIOR_KEYWORD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:senior|lead|principal|staff|architect|manager|director)\b").unwrap()
});
static ENTRY_KEYWORD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:junior|entry|graduate|intern|trainee)\b").unwrap());
/// `Company - Title - MM/YYYY - MM/YYYY|Present` on one line.
static EXPERIENCE_LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)^[ \t]*([A-Z][A-Za-z0-9.&' ]*?)[ \t]*[-–|,][ \t]*([A-Z][A-Za-z/ ]*?)[ \t]*[-–|,][ \t]*((?:\d{1,2}/)?\d{4})[ \t]*(?:-|–|to)[ \t]*((?:\d{1,2}/)?\d{4}|(?i:present|current|now))[ \t\r]*$",
    )
    .unwrap()
});

// Lists
static LANGUAGES_LABEL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)^[ \t]*languages?\b[ \t]*:?[ \t]*(.*)$").unwrap());
static CERTIFICATIONS_LABEL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^[ \t]*(?:certifications?|certificates?)\b[ \t]*:?[ \t]*(.*)$").unwrap()
});
static LIST_SPLIT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[,;\n]|\s\|\s").unwrap());

pub fn extract(text: &str) -> StructuredResumeDraft {
    StructuredResumeDraft {
        name: find_name(text),
        email: find_email(text),
        phone: find_phone(text),
        location: find_location(text),
        title: find_title(text),
        summary: find_summary(text),
        skills: find_skills(text),
        experience: find_experience(text),
        education: find_education(text),
        education_details: find_education_details(text),
        certifications: labeled_list(text, &CERTIFICATIONS_LABEL_RE),
        languages: labeled_list(text, &LANGUAGES_LABEL_RE),
        experience_level: experience_level(text),
    }
    .sanitized()
}

fn capture_or_whole(caps: &regex::Captures<'_>) -> String {
    caps.get(1)
        .or_else(|| caps.get(0))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}

pub fn find_name(text: &str) -> String {
    for labeled in [&NAME_LABEL_RE, &RESUME_OF_RE] {
        if let Some(caps) = labeled.captures(text) {
            return capture_or_whole(&caps);
        }
    }
    let is_name = |candidate: &str| {
        !candidate
            .split_whitespace()
            .any(|w| NAME_STOPWORDS.contains(&w.trim_end_matches('.')))
    };
    NAME_LINE_RE
        .captures_iter(text)
        .chain(NAME_ANYWHERE_RE.captures_iter(text))
        .map(|caps| capture_or_whole(&caps))
        .map(|candidate| candidate.split_whitespace().collect::<Vec<_>>().join(" "))
        .find(|candidate| is_name(candidate))
        .unwrap_or_default()
}

pub fn find_email(text: &str) -> String {
    EMAIL_RE
        .find(text)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// Layouts in priority order: parenthesized area code, ten digits,
/// hyphenated, labeled, international.
pub fn find_phone(text: &str) -> String {
    PHONE_PATTERNS
        .iter()
        .find_map(|pattern| pattern.captures(text))
        .map(|caps| capture_or_whole(&caps))
        .unwrap_or_default()
}

pub fn find_location(text: &str) -> String {
    for labeled in [&LOCATION_LABEL_RE, &BASED_IN_RE] {
        if let Some(caps) = labeled.captures(text) {
            let location = capture_or_whole(&caps);
            if !location.is_empty() {
                return location;
            }
        }
    }
    CITY_STATE_RE
        .captures_iter(text)
        .find(|caps| US_STATES.contains(&&caps[2]))
        .map(|caps| caps[0].trim().to_string())
        .unwrap_or_default()
}

pub fn find_title(text: &str) -> String {
    if let Some(caps) = TITLE_LABEL_RE.captures(text) {
        return capture_or_whole(&caps);
    }
    ROLE_RE
        .find(text)
        .or_else(|| EXECUTIVE_RE.find(text))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}

/// Labeled section first; else the first paragraph when it has a plausible
/// length; else the opening characters of the document.
pub fn find_summary(text: &str) -> String {
    if let Some(lines) = labeled_block(text, &SUMMARY_LABEL_RE, SUMMARY_MAX_LINES, true) {
        if !lines.is_empty() {
            return lines.join(" ");
        }
    }

    let trimmed = text.trim();
    let first_paragraph = PARAGRAPH_BREAK_RE.split(trimmed).next().unwrap_or("").trim();
    let len = first_paragraph.chars().count();
    if len > SUMMARY_PARAGRAPH_MIN && len < SUMMARY_PARAGRAPH_MAX {
        return first_paragraph.to_string();
    }
    if trimmed.chars().count() > 100 {
        let prefix: String = trimmed.chars().take(SUMMARY_PREFIX_CHARS).collect();
        return format!("{}...", prefix.trim_end());
    }
    String::new()
}

/// Lines of a labeled block: what follows the label on its own line, then
/// (when `continues`, or when the label line is bare) the next lines up to a
/// blank line or another label.
fn labeled_block(text: &str, label: &Regex, max_lines: usize, continues: bool) -> Option<Vec<String>> {
    let caps = label.captures(text)?;
    let mut lines = Vec::new();
    let inline = caps.get(1).map_or("", |m| m.as_str()).trim();
    if !inline.is_empty() {
        lines.push(inline.to_string());
        if !continues {
            return Some(lines);
        }
    }

    let rest = &text[caps.get(0)?.end()..];
    for line in rest.lines().skip(1) {
        let line = line.trim();
        if line.is_empty() {
            if lines.is_empty() {
                continue;
            }
            break;
        }
        if lines.len() >= max_lines || LABEL_LINE_RE.is_match(line) {
            break;
        }
        lines.push(line.to_string());
    }
    Some(lines)
}

fn labeled_list(text: &str, label: &Regex) -> Vec<String> {
    let Some(lines) = labeled_block(text, label, usize::MAX, false) else {
        return Vec::new();
    };
    let mut items: Vec<String> = Vec::new();
    for item in LIST_SPLIT_RE.split(&lines.join("\n")) {
        let item = item.trim().trim_start_matches(['-', '*', '•']).trim();
        if !item.is_empty() && !items.iter().any(|i| i == item) {
            items.push(item.to_string());
        }
    }
    items
}

/// Lines mentioning a degree, then institutions not already covered.
pub fn find_education(text: &str) -> Vec<String> {
    let mut education: Vec<String> = Vec::new();
    for line in text.lines().map(str::trim) {
        if DEGREE_RE.is_match(line) {
            let line: String = line.chars().take(EDUCATION_LINE_MAX).collect();
            if !education.contains(&line) {
                education.push(line);
            }
        }
    }
    for institution in INSTITUTION_RE.find_iter(text).map(|m| m.as_str().trim()) {
        if !education.iter().any(|e| e.contains(institution)) {
            education.push(institution.to_string());
        }
    }
    education
}

/// One detail per degree line; institution and year come from the same line
/// or the next non-empty one.
pub fn find_education_details(text: &str) -> Vec<EducationDetail> {
    let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    lines
        .iter()
        .enumerate()
        .filter_map(|(i, line)| {
            let degree = DEGREE_RE.find(line)?.as_str().trim().to_string();
            let next = lines.get(i + 1).copied().unwrap_or("");
            let institution = INSTITUTION_RE
                .find(line)
                .or_else(|| INSTITUTION_RE.find(next))
                .map(|m| m.as_str().trim().to_string())
                .unwrap_or_default();
            let year = YEAR_RE
                .find_iter(line)
                .last()
                .or_else(|| YEAR_RE.find_iter(next).last())
                .map(|m| m.as_str().to_string())
                .unwrap_or_default();
            Some(EducationDetail {
                degree,
                institution,
                year,
            })
        })
        .collect()
}

/// Seniority from the largest "N years" claim, else from role keywords.
/// Empty when neither is present.
pub fn experience_level(text: &str) -> String {
    let years = EXPERIENCE_YEARS_PATTERNS
        .iter()
        .filter_map(|p| p.captures(text))
        .filter_map(|caps| caps[1].parse::<u32>().ok())
        .max()
        .unwrap_or(0);

    let level = match years {
        0 if SENIOR_KEYWORD_RE.is_match(text) => "Senior",
        0 if ENTRY_KEYWORD_RE.is_match(text) => "Entry Level",
        0 => "",
        1..=2 => "Entry Level",
        3..=5 => "Mid Level",
        6..=10 => "Senior",
        _ => "Executive",
    };
    level.to_string()
}

pub fn find_experience(text: &str) -> Vec<Experience> {
    EXPERIENCE_LINE_RE
        .captures_iter(text)
        .map(|caps| Experience {
            company: caps[1].trim().to_string(),
            title: caps[2].trim().to_string(),
            duration: format!("{} - {}", &caps[3], &caps[4]),
            description: String::new(),
        })
        .collect()
}
