// src/core/processors/news.rs

//! News article extraction: pulls the title and visible text out of an
//! archived HTML page, emitting a row only for English-language documents.

use crate::core::errors::PipelineError;
use crate::core::record::{OutputRow, Record};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Value, json};

static TITLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("title regex"));
static HTML_LANG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)<html[^>]*\blang\s*=\s*["']?en"#).expect("lang regex"));
static OG_LOCALE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)property\s*=\s*["']og:locale["'][^>]*content\s*=\s*["']en"#)
        .expect("og:locale regex")
});
static SCRIPT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<script[^>]*>.*?</script>").expect("script regex"));
static STYLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<style[^>]*>.*?</style>").expect("style regex"));
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("tag regex"));

pub fn process(record: &Record) -> Result<Vec<OutputRow>, PipelineError> {
    let html = record.content.as_str();
    if !html.contains('<') {
        return Err(PipelineError::ProcessorFailure(format!(
            "{}: not an HTML document",
            record.uri
        )));
    }

    let title = TITLE_RE
        .captures(html)
        .map(|caps| decode_entities(caps[1].trim()))
        .ok_or_else(|| {
            PipelineError::ProcessorFailure(format!("{}: could not parse article", record.uri))
        })?;

    // Only English articles are kept; everything else is silently dropped.
    if !is_english(html) {
        return Ok(vec![]);
    }

    let mut row = OutputRow::new();
    row.insert("uri".to_string(), Value::String(record.uri.clone()));
    row.insert("ts".to_string(), json!(record.ts));
    row.insert("title".to_string(), Value::String(title));
    row.insert("text".to_string(), Value::String(visible_text(html)));
    Ok(vec![row])
}

fn is_english(html: &str) -> bool {
    HTML_LANG_RE.is_match(html) || OG_LOCALE_RE.is_match(html)
}

/// Strips scripts, styles and markup, collapsing the remainder into
/// whitespace-normalized text.
fn visible_text(html: &str) -> String {
    let without_scripts = SCRIPT_RE.replace_all(html, " ");
    let without_styles = STYLE_RE.replace_all(&without_scripts, " ");
    let without_tags = TAG_RE.replace_all(&without_styles, " ");
    let decoded = decode_entities(&without_tags);
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Decodes the handful of entities that matter for plain-text output.
fn decode_entities(text: &str) -> String {
    text.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
}
