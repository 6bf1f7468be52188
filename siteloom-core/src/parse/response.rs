//! Multi-stage file extraction from free-form model responses
//!
//! The model is instructed to label files either with explicit
//! `[FILENAME]name[/FILENAME]` tags or with fenced code blocks, but real
//! responses are frequently malformed, truncated mid-stream, or unlabeled.
//! Extraction therefore runs as an ordered chain of independent matchers over
//! the same input, each stage only claiming names no earlier stage claimed:
//!
//! 1. Reasoning: a `[REASONING]` block, else the text before the first
//!    recognizable marker, else the whole text.
//! 2. Closed `[FILENAME]...[/FILENAME]` tags; content runs to the next
//!    tag, fence, or end of text.
//! 3. Fenced code blocks, with an explicit filename after the language or a
//!    default name inferred from the language.
//! 4. Open `[FILENAME]` tags without a closing tag, only when stages 2-3
//!    found nothing.
//! 5. Last resort: if the text contains an HTML root tag anywhere, the whole
//!    text becomes `index.html`.
//!
//! The `regex` crate has no lookahead, so "content up to the next marker" is
//! computed by slicing between boundary-match positions instead.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{GeneratedFile, ParsedResponse};
use crate::types::ENTRY_DOCUMENT;

/// `[REASONING]...[/REASONING]`, case-insensitive, dot matches newline.
static REASONING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)\[REASONING\](.*?)\[/REASONING\]").unwrap());

/// Any file marker: a filename tag or a fence. Used both for reasoning
/// extraction and as the boundary terminating tag content.
static BOUNDARY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\[FILENAME\]|```").unwrap());

/// Closed filename tag: `[FILENAME]name[/FILENAME]` plus trailing whitespace.
static CLOSED_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\[FILENAME\]\s*([\w./-]+)\s*\[/FILENAME\]\s*").unwrap());

/// Fenced code block with optional language and optional explicit filename
/// on the fence line.
static FENCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```([A-Za-z][A-Za-z0-9]*)?(?:[ \t]+([\w./-]+))?[ \t]*\r?\n(.*?)```").unwrap()
});

/// Open filename tag without a closing tag: `[FILENAME]name` followed by a
/// line break.
static OPEN_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\[FILENAME\]\s*([\w./-]+)\s*\n").unwrap());

/// Parse a raw model response into reasoning plus named files.
///
/// Never fails: malformed or partial markers are simply not matched. Safe to
/// call on any prefix of the final text.
pub fn parse_response(raw: &str) -> ParsedResponse {
    let mut parsed = ParsedResponse {
        reasoning: extract_reasoning(raw),
        files: Vec::new(),
    };

    extract_closed_tags(raw, &mut parsed.files);
    extract_fenced_blocks(raw, &mut parsed.files);

    if parsed.files.is_empty() {
        extract_open_tags(raw, &mut parsed.files);
    }

    if parsed.files.is_empty() && raw.to_lowercase().contains("<html") {
        parsed.files.push(GeneratedFile {
            name: ENTRY_DOCUMENT.to_string(),
            content: raw.to_string(),
        });
    }

    parsed
}

fn extract_reasoning(raw: &str) -> String {
    if let Some(caps) = REASONING_RE.captures(raw) {
        return caps[1].trim().to_string();
    }

    match BOUNDARY_RE.find(raw) {
        Some(m) if m.start() > 0 => raw[..m.start()].trim().to_string(),
        Some(_) => String::new(),
        None => raw.trim().to_string(),
    }
}

/// First-write-wins claim: a name taken by an earlier stage (or an earlier
/// match within the same stage) is never overwritten.
fn claim(files: &mut Vec<GeneratedFile>, name: &str, content: &str) {
    if name.is_empty() || files.iter().any(|f| f.name == name) {
        return;
    }
    files.push(GeneratedFile {
        name: name.to_string(),
        content: content.to_string(),
    });
}

/// Slice from `start` to the next marker boundary, or to end of text.
fn until_next_boundary(raw: &str, start: usize) -> &str {
    match BOUNDARY_RE.find(&raw[start..]) {
        Some(m) => &raw[start..start + m.start()],
        None => &raw[start..],
    }
}

fn extract_closed_tags(raw: &str, files: &mut Vec<GeneratedFile>) {
    for caps in CLOSED_TAG_RE.captures_iter(raw) {
        let whole = caps.get(0).expect("match");
        let name = caps[1].trim().to_string();
        let content = until_next_boundary(raw, whole.end());
        claim(files, &name, content.trim());
    }
}

fn extract_fenced_blocks(raw: &str, files: &mut Vec<GeneratedFile>) {
    for caps in FENCE_RE.captures_iter(raw) {
        let lang = caps
            .get(1)
            .map(|m| m.as_str().to_lowercase())
            .unwrap_or_default();
        let explicit = caps.get(2).map(|m| m.as_str().trim()).unwrap_or("");
        let content = caps[3].trim().to_string();

        let name = if !explicit.is_empty() {
            explicit.to_string()
        } else {
            match default_name_for_lang(&lang) {
                // A language default only applies while its name is unclaimed
                Some(default) if !files.iter().any(|f| f.name == default) => default.to_string(),
                _ => continue,
            }
        };

        claim(files, &name, &content);
    }
}

fn default_name_for_lang(lang: &str) -> Option<&'static str> {
    match lang {
        "html" => Some(ENTRY_DOCUMENT),
        "css" => Some("style.css"),
        "js" | "javascript" => Some("script.js"),
        _ => None,
    }
}

fn extract_open_tags(raw: &str, files: &mut Vec<GeneratedFile>) {
    for caps in OPEN_TAG_RE.captures_iter(raw) {
        let whole = caps.get(0).expect("match");
        let name = caps[1].trim().to_string();
        let content = until_next_boundary(raw, whole.end());
        claim(files, &name, content.trim());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(parsed: &ParsedResponse) -> Vec<&str> {
        parsed.files.iter().map(|f| f.name.as_str()).collect()
    }

    #[test]
    fn test_empty_input() {
        let parsed = parse_response("");
        assert_eq!(parsed.reasoning, "");
        assert!(parsed.files.is_empty());
    }

    #[test]
    fn test_closed_tag_verbatim() {
        let raw = "[FILENAME]index.html[/FILENAME]<button style=\"color:red\">Click</button>";
        let parsed = parse_response(raw);
        assert_eq!(parsed.files.len(), 1);
        assert_eq!(parsed.files[0].name, "index.html");
        assert_eq!(
            parsed.files[0].content,
            "<button style=\"color:red\">Click</button>"
        );
    }

    #[test]
    fn test_reasoning_block() {
        let raw = "[REASONING]  I will build a button.  [/REASONING]\n\
                   [FILENAME]index.html[/FILENAME]\n<button></button>";
        let parsed = parse_response(raw);
        assert_eq!(parsed.reasoning, "I will build a button.");
        assert_eq!(names(&parsed), vec!["index.html"]);
    }

    #[test]
    fn test_reasoning_before_first_marker() {
        let raw = "Here is your page.\n\n[FILENAME]index.html[/FILENAME]\n<html></html>";
        let parsed = parse_response(raw);
        assert_eq!(parsed.reasoning, "Here is your page.");
    }

    #[test]
    fn test_reasoning_is_whole_text_without_markers() {
        let parsed = parse_response("I could not produce any files, sorry.");
        assert_eq!(parsed.reasoning, "I could not produce any files, sorry.");
        assert!(parsed.files.is_empty());
    }

    #[test]
    fn test_reasoning_empty_when_text_starts_with_marker() {
        let parsed = parse_response("[FILENAME]a.txt[/FILENAME]\nhello");
        assert_eq!(parsed.reasoning, "");
    }

    #[test]
    fn test_multiple_closed_tags() {
        let raw = "[FILENAME]index.html[/FILENAME]\n<html></html>\n\
                   [FILENAME]style.css[/FILENAME]\nbody{margin:0}";
        let parsed = parse_response(raw);
        assert_eq!(names(&parsed), vec!["index.html", "style.css"]);
        assert_eq!(parsed.files[0].content, "<html></html>");
        assert_eq!(parsed.files[1].content, "body{margin:0}");
    }

    #[test]
    fn test_tag_content_stops_at_fence() {
        let raw = "[FILENAME]readme.txt[/FILENAME]\nplain text\n```css\nbody{}\n```";
        let parsed = parse_response(raw);
        assert_eq!(parsed.files[0].name, "readme.txt");
        assert_eq!(parsed.files[0].content, "plain text");
        assert_eq!(names(&parsed), vec!["readme.txt", "style.css"]);
    }

    #[test]
    fn test_fence_with_explicit_filename() {
        let raw = "```js app.js\nconsole.log(1);\n```";
        let parsed = parse_response(raw);
        assert_eq!(parsed.files[0].name, "app.js");
        assert_eq!(parsed.files[0].content, "console.log(1);");
    }

    #[test]
    fn test_fence_default_names() {
        let raw = "```html\n<html></html>\n```\n```css\nbody{}\n```\n```javascript\nlet x;\n```";
        let parsed = parse_response(raw);
        assert_eq!(names(&parsed), vec!["index.html", "style.css", "script.js"]);
    }

    #[test]
    fn test_first_write_wins_for_default_names() {
        let raw = "```html\n<p>first</p>\n```\n```html\n<p>second</p>\n```";
        let parsed = parse_response(raw);
        assert_eq!(parsed.files.len(), 1);
        assert_eq!(parsed.files[0].content, "<p>first</p>");
    }

    #[test]
    fn test_tag_claims_name_before_fence() {
        let raw = "[FILENAME]index.html[/FILENAME]\n<p>tagged</p>\n```html\n<p>fenced</p>\n```";
        let parsed = parse_response(raw);
        assert_eq!(parsed.files.len(), 1);
        assert_eq!(parsed.files[0].content, "<p>tagged</p>");
    }

    #[test]
    fn test_unlabeled_unknown_language_fence_ignored() {
        let parsed = parse_response("```rust\nfn main() {}\n```");
        assert!(parsed.files.is_empty());
        // Which makes the whole text reasoning-free too: the fence is a marker
        assert_eq!(parsed.reasoning, "");
    }

    #[test]
    fn test_open_tag_fallback() {
        let raw = "[FILENAME]index.html\n<html><body>hi</body></html>";
        let parsed = parse_response(raw);
        assert_eq!(parsed.files.len(), 1);
        assert_eq!(parsed.files[0].name, "index.html");
        assert_eq!(parsed.files[0].content, "<html><body>hi</body></html>");
    }

    #[test]
    fn test_open_tag_not_used_when_closed_tags_exist() {
        let raw = "[FILENAME]a.txt[/FILENAME]\ncontent a\n[FILENAME]b.txt\nnot reached by stage 4";
        let parsed = parse_response(raw);
        // Stage 2 found a.txt, so stage 4 never runs and b.txt stays unclaimed
        assert_eq!(names(&parsed), vec!["a.txt"]);
    }

    #[test]
    fn test_html_sniff_last_resort() {
        let raw = "<html><body>No markers anywhere</body></html>";
        let parsed = parse_response(raw);
        assert_eq!(parsed.files.len(), 1);
        assert_eq!(parsed.files[0].name, "index.html");
        assert_eq!(parsed.files[0].content, raw);
    }

    #[test]
    fn test_no_files_no_html_yields_empty_set() {
        let parsed = parse_response("Just chatting, no code today.");
        assert!(parsed.files.is_empty());
    }

    #[test]
    fn test_prefix_monotonicity() {
        let full = "Some reasoning first.\n\
                    [FILENAME]index.html[/FILENAME]\n<html><body><p>hi</p></body></html>\n\
                    [FILENAME]style.css[/FILENAME]\nbody { margin: 0; }\n\
                    ```js app.js\nconsole.log('x');\n```";

        let mut seen: Vec<String> = Vec::new();
        for end in 0..=full.len() {
            if !full.is_char_boundary(end) {
                continue;
            }
            let parsed = parse_response(&full[..end]);
            let current: Vec<String> = parsed.files.iter().map(|f| f.name.clone()).collect();
            // Every previously discovered name must still be present
            for name in &seen {
                assert!(
                    current.contains(name),
                    "name {} lost at prefix length {}",
                    name,
                    end
                );
            }
            seen = current;
        }

        let parsed = parse_response(full);
        assert_eq!(names(&parsed), vec!["index.html", "style.css", "app.js"]);
    }

    #[test]
    fn test_partial_marker_does_not_panic() {
        for raw in ["[FILE", "[FILENAME]ind", "[FILENAME]index.html[/FILE", "```ht"] {
            let _ = parse_response(raw);
        }
    }

    #[test]
    fn test_nested_path_names() {
        let raw = "[FILENAME]img/logo.svg[/FILENAME]\n<svg></svg>";
        let parsed = parse_response(raw);
        assert_eq!(parsed.files[0].name, "img/logo.svg");
    }
}
