use serde_json::json;

use super::*;
use crate::payload::PayloadShape;

fn kinds(segments: &[ContentSegment]) -> Vec<SegmentKind> {
    segments.iter().map(ContentSegment::kind).collect()
}

// -- fences --

#[test]
fn test_closed_fence_between_text() {
    let segments = segment("prefix ```json {\"a\":1} ``` suffix");

    assert_eq!(segments.len(), 3);
    assert_eq!(segments[0], ContentSegment::Text("prefix ".to_string()));
    let payload = segments[1].payload().unwrap();
    assert_eq!(payload.shape, PayloadShape::Record);
    assert_eq!(payload.data, json!({"a": 1}));
    assert_eq!(segments[2], ContentSegment::Text(" suffix".to_string()));
}

#[test]
fn test_unclosed_fence_is_partial() {
    let segments = segment("prefix ```json {\"a\":1");

    assert_eq!(
        segments,
        vec![
            ContentSegment::Text("prefix ".to_string()),
            ContentSegment::DataPartial {
                raw: " {\"a\":1".to_string(),
                language: Some("json".to_string()),
            },
        ]
    );
}

#[test]
fn test_bare_opening_fence_is_partial() {
    let segments = segment("Here:\n```");
    assert_eq!(kinds(&segments), vec![SegmentKind::Text, SegmentKind::DataPartial]);
    assert_eq!(segments[1].raw(), "");
}

#[test]
fn test_fence_with_newlines_and_no_tag() {
    let segments = segment("```\n[{\"id\":1},{\"id\":2}]\n```");
    assert_eq!(segments.len(), 1);
    let ContentSegment::DataComplete { raw, language, payload } = &segments[0] else {
        panic!("expected complete data, got {:?}", segments[0]);
    };
    assert_eq!(raw, "\n[{\"id\":1},{\"id\":2}]\n");
    assert!(language.is_none());
    assert_eq!(payload.shape, PayloadShape::Tabular);
}

#[test]
fn test_non_json_fence_resolves_unrecognized() {
    let segments = segment("```python\nprint('hi')\n```");
    let ContentSegment::DataComplete { language, payload, .. } = &segments[0] else {
        panic!("expected complete data");
    };
    assert_eq!(language.as_deref(), Some("python"));
    assert_eq!(payload.shape, PayloadShape::Unrecognized);
}

#[test]
fn test_multiple_fences() {
    let text = "A ```json {\"data\":[]} ``` B ```json {\"type\":\"form\"} ``` C";
    let segments = segment(text);
    assert_eq!(
        kinds(&segments),
        vec![
            SegmentKind::Text,
            SegmentKind::DataComplete,
            SegmentKind::Text,
            SegmentKind::DataComplete,
            SegmentKind::Text,
        ]
    );
    assert_eq!(segments[1].payload().unwrap().shape, PayloadShape::Tabular);
    assert_eq!(segments[3].payload().unwrap().shape, PayloadShape::Form);
}

// -- think blocks --

#[test]
fn test_unclosed_think_is_open_to_end() {
    let segments = segment("<think>still thinking");
    assert_eq!(
        segments,
        vec![ContentSegment::Thought("still thinking".to_string())]
    );
}

#[test]
fn test_closed_think_then_text() {
    let segments = segment("<think>look up runs</think>You have 2 runs.");
    assert_eq!(
        segments,
        vec![
            ContentSegment::Thought("look up runs".to_string()),
            ContentSegment::Text("You have 2 runs.".to_string()),
        ]
    );
}

#[test]
fn test_fence_inside_think_stays_in_thought() {
    let segments = segment("<think>maybe ```json {}``` </think>ok");
    assert_eq!(kinds(&segments), vec![SegmentKind::Thought, SegmentKind::Text]);
    assert_eq!(segments[0].raw(), "maybe ```json {}``` ");
}

#[test]
fn test_think_tag_inside_fence_is_data() {
    let segments = segment("```\n<think>\n```");
    assert_eq!(kinds(&segments), vec![SegmentKind::DataComplete]);
}

// -- noise filtering --

#[test]
fn test_noise_lines_are_dropped() {
    let segments = segment("The user says hello.\nWe need to respond kindly.\nHi there!");
    assert_eq!(segments, vec![ContentSegment::Text("Hi there!".to_string())]);
}

#[test]
fn test_text_made_only_of_noise_is_not_emitted() {
    let segments = segment("role: assistant\n```json {\"a\":1} ```");
    assert_eq!(kinds(&segments), vec![SegmentKind::DataComplete]);
}

#[test]
fn test_noise_filter_can_be_disabled() {
    let config = crate::config::RenderConfig {
        filter_noise: false,
        extra_noise_prefixes: Vec::new(),
    };
    let segments = Segmenter::from_config(&config).segment("The user says hello.");
    assert_eq!(
        segments,
        vec![ContentSegment::Text("The user says hello.".to_string())]
    );
}

#[test]
fn test_extra_noise_prefixes_from_config() {
    let config = crate::config::RenderConfig {
        filter_noise: true,
        extra_noise_prefixes: vec!["PLAN:".to_string()],
    };
    let segments = Segmenter::from_config(&config).segment("plan: fetch\nDone.");
    assert_eq!(segments, vec![ContentSegment::Text("Done.".to_string())]);
}

// -- bare JSON fallback --

#[test]
fn test_bare_json_object_is_recovered() {
    let segments = segment("  {\"success\":true,\"message\":\"Flow created\"}\nAnything else?");
    assert_eq!(
        kinds(&segments),
        vec![SegmentKind::Text, SegmentKind::DataComplete, SegmentKind::Text]
    );
    assert_eq!(segments[0].raw(), "  ");
    assert_eq!(
        segments[1].payload().unwrap().shape,
        PayloadShape::SuccessEnvelope
    );
    assert_eq!(segments[2].raw(), "\nAnything else?");
}

#[test]
fn test_bare_json_with_brackets_in_strings() {
    let segments = segment(r#"[{"name":"a]}\"b"},{"name":"c"}]"#);
    assert_eq!(kinds(&segments), vec![SegmentKind::DataComplete]);
    assert_eq!(segments[0].payload().unwrap().rows().len(), 2);
}

#[test]
fn test_incomplete_bare_json_stays_text() {
    let segments = segment("{\"data\":[{\"id\":1}");
    assert_eq!(kinds(&segments), vec![SegmentKind::Text]);
}

#[test]
fn test_bracketed_prose_stays_text() {
    let segments = segment("[see docs](https://example.com) for details");
    assert_eq!(kinds(&segments), vec![SegmentKind::Text]);
}

#[test]
fn test_no_fallback_when_fence_present() {
    let segments = segment("{\"a\":1} then ```");
    assert_eq!(kinds(&segments), vec![SegmentKind::Text, SegmentKind::DataPartial]);
}

#[test]
fn test_bare_json_after_think() {
    let segments = segment("<think>x</think>{\"items\":[{\"id\":3}]}");
    assert_eq!(kinds(&segments), vec![SegmentKind::Thought, SegmentKind::DataComplete]);
}

// -- general properties --

#[test]
fn test_empty_text_has_no_segments() {
    assert!(segment("").is_empty());
}

#[test]
fn test_segmentation_is_deterministic() {
    let inputs = [
        "",
        "plain",
        "<think>a</think>b```json {\"x\":[1]}``` c",
        "```",
        "<think>",
        "{\"data\":[]}",
        "``",
    ];
    for input in inputs {
        assert_eq!(segment(input), segment(input), "input: {input:?}");
    }
}

#[test]
fn test_every_prefix_of_a_stream_segments() {
    let text = "<think>plan</think>Here are your flows:\n```json\n{\"flows\":[{\"id\":1,\"name\":\"Sync\"}]}\n```\nDone. ünïcode";
    let mut boundaries: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
    boundaries.push(text.len());
    for end in boundaries {
        let _ = segment(&text[..end]);
    }

    let full = segment(text);
    assert_eq!(
        kinds(&full),
        vec![
            SegmentKind::Thought,
            SegmentKind::Text,
            SegmentKind::DataComplete,
            SegmentKind::Text,
        ]
    );
    assert_eq!(full[2].payload().unwrap().shape, PayloadShape::Tabular);
}

#[test]
fn test_raw_values_reconstruct_text_without_markers() {
    let text = "intro <think>why</think> middle ```json\n{\"a\":1}\n``` end";
    let rebuilt: String = segment(text).iter().map(ContentSegment::raw).collect();
    assert_eq!(rebuilt, "intro why middle \n{\"a\":1}\n end");
}

#[test]
fn test_raw_values_keep_fence_body_whitespace() {
    let rebuilt: String = segment("a ```json\n{\"a\":1}\n``` b")
        .iter()
        .map(ContentSegment::raw)
        .collect();
    assert_eq!(rebuilt, "a \n{\"a\":1}\n b");
}

#[test]
fn test_raw_values_keep_whitespace_around_bare_json() {
    let text = "\n  [{\"id\":1}]  \n";
    let segments = segment(text);
    assert_eq!(
        kinds(&segments),
        vec![SegmentKind::Text, SegmentKind::DataComplete, SegmentKind::Text]
    );
    let rebuilt: String = segments.iter().map(ContentSegment::raw).collect();
    assert_eq!(rebuilt, text);
}

#[test]
fn test_partial_fence_raw_is_untrimmed() {
    let segments = segment("```json\n{\"a\":");
    assert_eq!(segments[0].raw(), "\n{\"a\":");
}

// -- fence tags --

#[test]
fn test_one_line_fence_body_is_not_a_tag() {
    let segments = segment("```true```");
    let ContentSegment::DataComplete { raw, language, payload } = &segments[0] else {
        panic!("expected complete data, got {:?}", segments[0]);
    };
    assert!(language.is_none());
    assert_eq!(raw, "true");
    assert_eq!(payload.data, json!(true));

    let segments = segment("```42```");
    assert_eq!(segments[0].payload().unwrap().data, json!(42));
    assert_eq!(segments[0].raw(), "42");
}

#[test]
fn test_tag_followed_by_whitespace_or_end() {
    let segments = segment("```JSON {\"a\":1}```");
    let ContentSegment::DataComplete { language, .. } = &segments[0] else {
        panic!("expected complete data");
    };
    assert_eq!(language.as_deref(), Some("json"));

    let segments = segment("```json");
    assert_eq!(
        segments,
        vec![ContentSegment::DataPartial {
            raw: String::new(),
            language: Some("json".to_string()),
        }]
    );
}

#[test]
fn test_tag_glued_to_body_is_body() {
    let segments = segment("```json{\"a\":1}```");
    let ContentSegment::DataComplete { raw, language, .. } = &segments[0] else {
        panic!("expected complete data");
    };
    assert!(language.is_none());
    assert_eq!(raw, "json{\"a\":1}");
}
