//! Segmentation of accumulated answer text into render blocks.
//!
//! The segmenter is re-run on the whole output text after every delta, so it
//! is a pure function of its input: the same text always yields the same
//! segments. It recognizes `<think>` blocks and triple-backtick fences by
//! marker scanning; everything else is prose.

mod noise;

pub use noise::{NOISE_PREFIXES, is_noise, strip_noise};

use crate::config::RenderConfig;
use crate::payload::{StructuredPayload, resolve};

const THINK_OPEN: &str = "<think>";
const THINK_CLOSE: &str = "</think>";
const FENCE: &str = "```";

/// Discriminant of a [`ContentSegment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    /// Reasoning block.
    Thought,
    /// Prose.
    Text,
    /// Closed fence or bare JSON, resolved.
    DataComplete,
    /// Fence still open; not parsed.
    DataPartial,
}

/// One classified slice of the output text.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentSegment {
    /// Inner text of a `<think>` block.
    Thought(String),
    /// Prose with noise lines removed.
    Text(String),
    /// A complete structured block.
    DataComplete {
        /// Block body between the tag and the closing fence, untrimmed.
        raw: String,
        /// Fence tag (`json`, `python`, ...), lower-cased.
        language: Option<String>,
        /// Resolution of `raw`.
        payload: StructuredPayload,
    },
    /// A fence whose closing marker has not arrived yet.
    DataPartial {
        /// Body received so far.
        raw: String,
        /// Fence tag, if already received.
        language: Option<String>,
    },
}

impl ContentSegment {
    /// The discriminant of this segment.
    pub fn kind(&self) -> SegmentKind {
        match self {
            Self::Thought(_) => SegmentKind::Thought,
            Self::Text(_) => SegmentKind::Text,
            Self::DataComplete { .. } => SegmentKind::DataComplete,
            Self::DataPartial { .. } => SegmentKind::DataPartial,
        }
    }

    /// The text this segment was derived from.
    pub fn raw(&self) -> &str {
        match self {
            Self::Thought(raw) | Self::Text(raw) => raw,
            Self::DataComplete { raw, .. } | Self::DataPartial { raw, .. } => raw,
        }
    }

    /// The resolved payload of a complete data segment.
    pub fn payload(&self) -> Option<&StructuredPayload> {
        match self {
            Self::DataComplete { payload, .. } => Some(payload),
            _ => None,
        }
    }
}

/// Splits output text into [`ContentSegment`]s.
///
/// # Examples
///
/// ```
/// use flowchat_core::segment::{ContentSegment, Segmenter, SegmentKind};
///
/// let segments = Segmenter::default().segment("<think>plan</think>Done.");
/// let kinds: Vec<SegmentKind> = segments.iter().map(ContentSegment::kind).collect();
/// assert_eq!(kinds, vec![SegmentKind::Thought, SegmentKind::Text]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Segmenter {
    filter_noise: bool,
    extra_prefixes: Vec<String>,
}

impl Default for Segmenter {
    fn default() -> Self {
        Self {
            filter_noise: true,
            extra_prefixes: Vec::new(),
        }
    }
}

impl Segmenter {
    /// Build a segmenter from the `[render]` configuration section.
    pub fn from_config(config: &RenderConfig) -> Self {
        Self {
            filter_noise: config.filter_noise,
            extra_prefixes: config
                .extra_noise_prefixes
                .iter()
                .map(|p| p.to_lowercase())
                .collect(),
        }
    }

    /// Segment the complete output text received so far.
    pub fn segment(&self, text: &str) -> Vec<ContentSegment> {
        let has_fence = text.contains(FENCE);
        let mut segments = Vec::new();
        let mut rest = text;

        while !rest.is_empty() {
            let think = rest.find(THINK_OPEN);
            let fence = rest.find(FENCE);

            match (think, fence) {
                (Some(t), f) if f.is_none_or(|f| t < f) => {
                    self.push_text(&mut segments, &rest[..t], has_fence);
                    let body = &rest[t + THINK_OPEN.len()..];
                    match body.find(THINK_CLOSE) {
                        Some(end) => {
                            segments.push(ContentSegment::Thought(body[..end].to_string()));
                            rest = &body[end + THINK_CLOSE.len()..];
                        }
                        None => {
                            segments.push(ContentSegment::Thought(body.to_string()));
                            break;
                        }
                    }
                }
                (_, Some(f)) => {
                    self.push_text(&mut segments, &rest[..f], has_fence);
                    let after = &rest[f + FENCE.len()..];
                    let (language, body) = split_fence_tag(after);
                    match body.find(FENCE) {
                        Some(end) => {
                            let raw = &body[..end];
                            segments.push(ContentSegment::DataComplete {
                                raw: raw.to_string(),
                                language,
                                payload: resolve(raw),
                            });
                            rest = &body[end + FENCE.len()..];
                        }
                        None => {
                            segments.push(ContentSegment::DataPartial {
                                raw: body.to_string(),
                                language,
                            });
                            break;
                        }
                    }
                }
                _ => {
                    self.push_text(&mut segments, rest, has_fence);
                    break;
                }
            }
        }

        segments
    }

    fn push_text(&self, segments: &mut Vec<ContentSegment>, text: &str, has_fence: bool) {
        if text.is_empty() {
            return;
        }
        let text = if self.filter_noise {
            strip_noise(text, &self.extra_prefixes)
        } else {
            text.to_string()
        };
        if text.is_empty() {
            return;
        }

        if !has_fence && let Some((before, json, after)) = split_bare_json(&text) {
            tracing::debug!("segment: recovered unfenced JSON payload");
            if !before.is_empty() {
                segments.push(ContentSegment::Text(before.to_string()));
            }
            segments.push(ContentSegment::DataComplete {
                raw: json.to_string(),
                language: None,
                payload: resolve(json),
            });
            if !after.is_empty() {
                segments.push(ContentSegment::Text(after.to_string()));
            }
            return;
        }

        segments.push(ContentSegment::Text(text));
    }
}

/// Segment `text` with the default segmenter.
///
/// # Examples
///
/// ```
/// use flowchat_core::segment::{ContentSegment, segment};
///
/// let segments = segment("prefix ```json {\"a\":1");
/// assert_eq!(segments[0], ContentSegment::Text("prefix ".to_string()));
/// assert!(matches!(segments[1], ContentSegment::DataPartial { .. }));
/// ```
pub fn segment(text: &str) -> Vec<ContentSegment> {
    Segmenter::default().segment(text)
}

/// Split the optional tag off the text following an opening fence.
///
/// A tag counts only when whitespace or the end of the text follows it, so
/// the body of a one-line fence like `42` between markers is not mistaken
/// for a tag.
fn split_fence_tag(after: &str) -> (Option<String>, &str) {
    let tag_len = after
        .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '+' | '-' | '.')))
        .unwrap_or(after.len());
    let terminated = after[tag_len..]
        .chars()
        .next()
        .is_none_or(char::is_whitespace);
    if tag_len == 0 || !terminated {
        (None, after)
    } else {
        (Some(after[..tag_len].to_ascii_lowercase()), &after[tag_len..])
    }
}

/// Locate a bare JSON value at the start of `text` (after whitespace).
///
/// The value spans from the opening bracket to its matching closer, found by
/// a depth scan that skips brackets inside string literals. Returns the text
/// before, the value, and the text after, or `None` when the text does not
/// open with a bracket, the closer is missing, or the span is not valid JSON.
fn split_bare_json(text: &str) -> Option<(&str, &str, &str)> {
    let start = text.len() - text.trim_start().len();
    let bytes = text.as_bytes();
    if !matches!(bytes.get(start), Some(b'{' | b'[')) {
        return None;
    }

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    let mut end = None;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' | b'[' => depth += 1,
            b'}' | b']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    end = Some(i + 1);
                    break;
                }
            }
            _ => {}
        }
    }

    let end = end?;
    let candidate = &text[start..end];
    serde_json::from_str::<serde_json::Value>(candidate).ok()?;
    Some((&text[..start], candidate, &text[end..]))
}

#[cfg(test)]
mod tests;
