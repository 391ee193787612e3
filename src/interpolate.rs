//! `{{var|filter:"arg"}}` substitution in reply text
//!
//! A tag names one context variable followed by zero or more filters
//! separated by `|`. Inside a quoted filter argument `\"` and `\\` are
//! escapes and `|` does not split. Missing variables render as the empty
//! string; unknown filters leave the value unchanged.

use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::expr::title_case;
use crate::types::Context;

/// `{{ ... }}` where a quoted argument is consumed whole, so `}}` inside
/// quotes does not end the tag.
fn tag_pattern() -> &'static Regex {
    static TAG: OnceLock<Regex> = OnceLock::new();
    TAG.get_or_init(|| {
        Regex::new(r#"\{\{((?:"(?:\\.|[^"\\])*"|"|[^"}]|\}[^}])*)\}\}"#).expect("tag pattern must compile")
    })
}

/// Render `template` against `ctx`.
pub fn interpolate(template: &str, ctx: &Context) -> String {
    tag_pattern()
        .replace_all(template, |caps: &Captures| render_tag(&caps[1], ctx))
        .into_owned()
}

fn render_tag(tag: &str, ctx: &Context) -> String {
    let mut segments = split_segments(tag).into_iter();
    let name = segments.next().unwrap_or_default();
    let mut value = ctx.get(name.trim()).cloned().unwrap_or_default();

    for segment in segments {
        let (filter, arg) = parse_filter(&segment);
        value = apply_filter(filter, arg.as_deref(), value);
    }

    value
}

fn apply_filter(filter: &str, arg: Option<&str>, value: String) -> String {
    match filter {
        "upper" => value.to_uppercase(),
        "lower" => value.to_lowercase(),
        "title" => title_case(&value),
        "trim" => value.trim().to_string(),
        "default" if value.is_empty() => arg.unwrap_or_default().to_string(),
        "default" => value,
        other => {
            tracing::trace!(filter = other, "ignoring unknown filter");
            value
        }
    }
}

/// Split on `|` outside double quotes. Segments keep their raw text.
fn split_segments(tag: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = tag.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '\\' if in_quotes => {
                current.push(ch);
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            }
            '"' => {
                in_quotes = !in_quotes;
                current.push(ch);
            }
            '|' if !in_quotes => segments.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    segments.push(current);
    segments
}

/// `name` or `name:"arg"` -> (name, arg)
fn parse_filter(segment: &str) -> (&str, Option<String>) {
    match segment.split_once(':') {
        Some((name, arg)) => (name.trim(), Some(unquote_arg(arg.trim()))),
        None => (segment.trim(), None),
    }
}

fn unquote_arg(raw: &str) -> String {
    let Some(inner) = raw
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    else {
        return raw.to_string();
    };

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        match (ch, chars.clone().next()) {
            ('\\', Some(next @ ('"' | '\\'))) => {
                out.push(next);
                chars.next();
            }
            _ => out.push(ch),
        }
    }
    out
}
