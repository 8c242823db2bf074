//! Denylist filter for leaked model deliberation.
//!
//! Some models narrate their planning outside an explicit `<think>` block.
//! Lines opening with one of these phrases are dropped from prose. The list is
//! best-effort; commentary that matches nothing is left in place.

/// Line prefixes (lower-case) that mark leaked deliberation.
pub const NOISE_PREFIXES: &[&str] = &[
    "the user says",
    "the user said",
    "the user is asking",
    "the user asks",
    "the user wants",
    "okay, the user",
    "so the user",
    "we need to respond",
    "we need to answer",
    "we should respond",
    "i need to respond",
    "i should respond",
    "internal thinking",
    "internal reasoning",
    "let me think",
    "role:",
    "system:",
];

/// Whether `line` opens with a denylisted phrase, ignoring case and leading
/// whitespace.
pub fn is_noise(line: &str, extra_prefixes: &[String]) -> bool {
    let line = line.trim_start().to_lowercase();
    NOISE_PREFIXES.iter().any(|p| line.starts_with(p))
        || extra_prefixes.iter().any(|p| line.starts_with(p.as_str()))
}

/// Remove noise lines, keeping every other line byte-for-byte.
pub fn strip_noise(text: &str, extra_prefixes: &[String]) -> String {
    text.split_inclusive('\n')
        .filter(|line| !is_noise(line, extra_prefixes))
        .collect()
}
