// src/core/processors/rottentomatoes.rs

//! Rotten Tomatoes score scraping. The site's markup changed shape several
//! times across the crawl window, so three probes are tried in order: the
//! 2019 meter spans, the 2020 ratings-wrap blocks, and the 2021
//! `<score-board>` element.

use crate::core::errors::PipelineError;
use crate::core::record::{OutputRow, Record};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Value, json};

// 2019 markup: critic score in a meter-value span, audience score nested in
// the audience-score meter div.
static OLD_CRITIC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<span[^>]*class="[^"]*\bmeter-value\b[^"]*"[^>]*>\s*([0-9]+%?)"#)
        .expect("old critic regex")
});
static OLD_AUDIENCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?is)class="[^"]*\baudience-score\b[^"]*".{0,400}?<span[^>]*class="[^"]*\bsuperPageFontColor\b[^"]*"[^>]*>\s*([0-9]+%?)"#,
    )
    .expect("old audience regex")
});

// 2020 markup: two mop-ratings-wrap__half blocks, critic first.
static HALF_BLOCK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<div[^>]*class="[^"]*\bmop-ratings-wrap__half\b[^"]*"[^>]*>(.*?)</div>"#)
        .expect("half block regex")
});
static SMALL_COUNT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?is)<small[^>]*class="[^"]*\bmop-ratings-wrap__text--small\b[^"]*"[^>]*>\s*([0-9]+)"#,
    )
    .expect("small count regex")
});
static VERIFIED_COUNT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?is)<strong[^>]*class="[^"]*\bmop-ratings-wrap__text--small\b[^"]*"[^>]*>\s*(?:Verified\s+Ratings:\s*)?([0-9]+)"#,
    )
    .expect("verified count regex")
});
static LINK_COUNT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<a[^>]*class="scoreboard__link scoreboard__link--(tomatometer|audience)"[^>]*>\s*([0-9]+)"#)
        .expect("scoreboard link regex")
});

// 2021 markup: a <score-board> element carrying both scores as attributes.
static SCORE_BOARD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<score-board([^>]*)>").expect("score board regex"));
static TOMATOMETER_ATTR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)tomatometerscore\s*=\s*"([^"]*)""#).expect("tomatometer attr regex")
});
static AUDIENCE_ATTR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)audiencescore\s*=\s*"([^"]*)""#).expect("audience attr regex"));

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("tag regex"));

/// The two scores plus their review counts, however the page happened to
/// spell them.
#[derive(Debug, Default, PartialEq)]
struct Scores {
    critic: String,
    audience: String,
    critic_count: i64,
    audience_count: i64,
}

pub fn process(record: &Record) -> Result<Vec<OutputRow>, PipelineError> {
    let scores = extract_scores(&record.content).ok_or_else(|| {
        PipelineError::ProcessorFailure(format!("{}: no recognizable score markup", record.uri))
    })?;

    let mut row = OutputRow::new();
    row.insert("uri".to_string(), Value::String(record.uri.clone()));
    row.insert("ts".to_string(), json!(record.ts));
    row.insert("criticScore".to_string(), Value::String(scores.critic));
    row.insert("criticNum".to_string(), json!(scores.critic_count));
    row.insert("audienceScore".to_string(), Value::String(scores.audience));
    row.insert("audienceNum".to_string(), json!(scores.audience_count));
    Ok(vec![row])
}

fn extract_scores(html: &str) -> Option<Scores> {
    probe_old(html)
        .or_else(|| probe_ratings_wrap(html))
        .or_else(|| probe_score_board(html))
}

fn probe_old(html: &str) -> Option<Scores> {
    let critic = OLD_CRITIC_RE.captures(html)?[1].to_string();
    let audience = OLD_AUDIENCE_RE.captures(html)?[1].to_string();
    Some(Scores {
        critic,
        audience,
        ..Default::default()
    })
}

fn probe_ratings_wrap(html: &str) -> Option<Scores> {
    let mut halves = HALF_BLOCK_RE.captures_iter(html);
    let critic = first_token(&halves.next()?[1])?;
    let audience = halves
        .next()
        .and_then(|caps| first_token(&caps[1]))
        .unwrap_or_else(|| "None".to_string());

    let (critic_count, audience_count) = review_counts(html);
    Some(Scores {
        critic,
        audience,
        critic_count,
        audience_count,
    })
}

fn probe_score_board(html: &str) -> Option<Scores> {
    let attrs = SCORE_BOARD_RE.captures(html)?[1].to_string();
    let critic = TOMATOMETER_ATTR_RE.captures(&attrs)?[1].to_string();
    let audience = AUDIENCE_ATTR_RE.captures(&attrs)?[1].to_string();
    Some(Scores {
        critic,
        audience,
        ..Default::default()
    })
}

/// Review counts for the 2020 markup: a small-text element for critics and a
/// "Verified Ratings" strong for the audience, falling back to the
/// scoreboard links of later pages.
fn review_counts(html: &str) -> (i64, i64) {
    let mut critic = SMALL_COUNT_RE
        .captures(html)
        .and_then(|caps| caps[1].parse().ok());
    let mut audience = VERIFIED_COUNT_RE
        .captures(html)
        .and_then(|caps| caps[1].parse().ok());

    for caps in LINK_COUNT_RE.captures_iter(html) {
        let count = caps[2].parse().ok();
        match &caps[1] {
            "tomatometer" => critic = critic.or(count),
            _ => audience = audience.or(count),
        }
    }
    (critic.unwrap_or(0), audience.unwrap_or(0))
}

/// First whitespace-delimited token of a markup fragment's visible text.
fn first_token(fragment: &str) -> Option<String> {
    let text = TAG_RE.replace_all(fragment, " ");
    text.split_whitespace().next().map(|t| t.to_string())
}
