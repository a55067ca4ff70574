//! Local rendering of raw drafts into a numbered, indented layout.
//!
//! Used for `formatted_content` when the backend formatter is unavailable.

/// Clause headings recognised when they appear alone on a line.
const HEADINGS: &[&str] = &[
    "agreement",
    "parties",
    "definitions",
    "terms",
    "termination",
    "confidentiality",
    "governing law",
    "dispute resolution",
    "miscellaneous",
    "signatures",
    "witnesseth",
    "now, therefore",
];

const INDENT: &str = "    ";

fn is_heading(line: &str) -> bool {
    let lower = line.to_lowercase();
    HEADINGS.contains(&lower.as_str()) || line.ends_with(':')
}

/// Format a raw draft for preview.
///
/// Headings (known clause titles, or any line ending in `:`) are uppercased
/// and numbered from 1; every other non-blank line is indented by four
/// spaces. Paragraphs are separated by one blank line and the output ends in
/// exactly one newline.
pub fn format_document(content: &str) -> String {
    let mut section = 0u32;
    let mut blocks = Vec::new();

    for line in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if is_heading(line) {
            section += 1;
            blocks.push(format!("{section}. {}", line.to_uppercase()));
        } else {
            blocks.push(format!("{INDENT}{line}"));
        }
    }

    let mut out = blocks.join("\n\n");
    out.push('\n');
    out
}

/// Normalise whitespace in free text: runs of whitespace (including
/// newlines) collapse to one space and spaces before `.,;:` are removed.
pub fn clean_text(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut out = String::with_capacity(collapsed.len());
    for c in collapsed.chars() {
        if matches!(c, '.' | ',' | ';' | ':') && out.ends_with(' ') {
            out.pop();
        }
        out.push(c);
    }
    out
}
