//! # Directive Decoding
//!
//! Models signal "show this visual" by embedding bracketed markers such as
//! `[SHOW_VIDEO]` in their free-text reply. The [`DirectiveDecoder`] picks the
//! single trigger for a reply and removes every recognized marker from the text
//! shown to the user.
//!
//! Markers are checked in a fixed priority order, not by their position in the
//! reply. Parameterized markers (`[SHOW_OFFER:a,b]`) are removed together with
//! their arguments.

use crate::{
    errors::PromptError,
    types::{DecodedResponse, Trigger},
};
use regex::Regex;
use tracing::debug;

/// Marker patterns in priority order.
const MARKERS: &[(Trigger, &str)] = &[
    (Trigger::Slideshow, r"\[SHOW_SLIDESHOW\]"),
    (Trigger::Syllabus, r"\[SHOW_SYLLABUS\]"),
    (Trigger::Video, r"\[SHOW_VIDEO\]"),
    (Trigger::Offer, r"\[SHOW_OFFER(?::([^\]\[]*))?\]"),
];

#[derive(Debug, Clone)]
struct Marker {
    trigger: Trigger,
    pattern: Regex,
}

/// Extracts the visual trigger from a model reply and strips the markers.
#[derive(Debug, Clone)]
pub struct DirectiveDecoder {
    markers: Vec<Marker>,
    /// Any marker.
    any_marker: Regex,
    /// A run of markers together with the horizontal whitespace around them.
    marker_run: Regex,
}

impl DirectiveDecoder {
    pub fn new() -> Result<Self, PromptError> {
        let markers = MARKERS
            .iter()
            .map(|(trigger, pattern)| {
                Ok::<_, PromptError>(Marker {
                    trigger: *trigger,
                    pattern: Regex::new(pattern)?,
                })
            })
            .collect::<Result<Vec<_>, PromptError>>()?;

        let alternation = MARKERS
            .iter()
            .map(|(_, pattern)| *pattern)
            .collect::<Vec<_>>()
            .join("|");
        let any_marker = Regex::new(&format!("(?:{alternation})"))?;
        let marker_run = Regex::new(&format!(r"[ \t]*(?:(?:{alternation})[ \t]*)+"))?;

        Ok(Self {
            markers,
            any_marker,
            marker_run,
        })
    }

    /// Decodes a raw model reply.
    ///
    /// A reply without markers is returned trimmed with no trigger.
    pub fn decode(&self, raw: &str) -> DecodedResponse {
        let Some(marker) = self.markers.iter().find(|m| m.pattern.is_match(raw)) else {
            return DecodedResponse {
                cleaned: raw.trim().to_string(),
                ..Default::default()
            };
        };

        let trigger_args = match marker.trigger {
            Trigger::Offer => marker
                .pattern
                .captures(raw)
                .and_then(|caps| caps.get(1))
                .map(|args| split_args(args.as_str()))
                .unwrap_or_default(),
            _ => Vec::new(),
        };

        debug!(trigger = %marker.trigger, args = ?trigger_args, "Decoded directive marker");

        DecodedResponse {
            cleaned: self.strip(raw),
            trigger: Some(marker.trigger),
            trigger_args,
        }
    }

    /// Removes every marker, collapsing the whitespace around each removed run.
    fn strip(&self, raw: &str) -> String {
        let mut text = raw.to_string();
        // Removing a marker can join its neighbours into a new one.
        while self.any_marker.is_match(&text) {
            text = self
                .marker_run
                .replace_all(&text, |caps: &regex::Captures| {
                    let run = &caps[0];
                    if self.any_marker.replace_all(run, "").is_empty() {
                        ""
                    } else {
                        " "
                    }
                })
                .into_owned();
        }
        text.trim().to_string()
    }
}

fn split_args(args: &str) -> Vec<String> {
    args.split(',')
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(String::from)
        .collect()
}
