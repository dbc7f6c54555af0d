//! Fence handling across the response shapes backends are known to produce.

use serde_json::{json, Value};
use uxcrew_core::{
    decode_json, normalize_json, normalize_markup, FeedbackReport, HeuristicEvaluation,
    Normalized, VisionAnalysis,
};

const PAYLOAD: &str = r##"{
  "screen_type": "login",
  "components": [{"type": "button", "text": "Sign in", "position": "bottom", "color": "#0057FF", "size": "large"}],
  "notable_patterns": ["```not a fence```"]
}"##;

fn wrappers(body: &str) -> Vec<String> {
    vec![
        body.to_string(),
        format!("```json\n{body}\n```"),
        format!("```JSON\n{body}\n```"),
        format!("```\n{body}\n```"),
        format!("   \n```json\n{body}\n```\n\n"),
        format!("```json\n{body}"),
        format!("{body}\n```"),
        format!("```json{body}```"),
    ]
}

#[test]
fn every_fence_variant_recovers_the_same_value() {
    let expected: Value = serde_json::from_str(PAYLOAD).unwrap();
    for wrapped in wrappers(PAYLOAD) {
        assert_eq!(
            normalize_json(&wrapped),
            Normalized::Valid(expected.clone()),
            "failed for {wrapped:?}"
        );
    }
}

#[test]
fn fenced_payload_decodes_into_domain_types() {
    for wrapped in wrappers(PAYLOAD) {
        let analysis = decode_json::<VisionAnalysis>(&wrapped).valid().expect("valid analysis");
        assert_eq!(analysis.screen_type, "login");
        assert_eq!(analysis.components[0].kind, "button");
    }
}

#[test]
fn malformed_responses_never_panic() {
    let junk = [
        "",
        "   ",
        "```",
        "``````",
        "```json",
        "{\"unterminated\": ",
        "I'm sorry, I can't analyze this image.",
        "```json\n{\"a\": 1,}\n```",
        "```html\n<html></html>\n```",
        "\u{feff}\u{0}",
    ];
    for raw in junk {
        match normalize_json(raw) {
            Normalized::Malformed { raw: kept, .. } => assert_eq!(kept, raw.trim()),
            Normalized::Valid(v) => panic!("{raw:?} unexpectedly parsed as {v}"),
        }
        assert!(!decode_json::<FeedbackReport>(raw).is_valid());
    }
}

#[test]
fn heuristic_payload_without_score_is_schema_mismatch() {
    let raw = "```json\n{\"violations\": [], \"strengths\": []}\n```";
    assert!(normalize_json(raw).is_valid());
    match decode_json::<HeuristicEvaluation>(raw) {
        Normalized::Malformed { raw: kept, reason } => {
            assert_eq!(kept, raw);
            assert!(reason.contains("overall_score"));
        }
        Normalized::Valid(v) => panic!("unexpected {v:?}"),
    }
}

#[test]
fn markup_variants() {
    let doc = "<!DOCTYPE html>\n<html><head><meta name=\"viewport\" content=\"width=375\"></head><body></body></html>";
    for wrapped in [
        doc.to_string(),
        format!("```html\n{doc}\n```"),
        format!("Here you go:\n\n```html\n{doc}\n```\n\nThe layout uses a single column."),
    ] {
        assert_eq!(normalize_markup(&wrapped), Normalized::Valid(doc.to_string()));
    }
    assert!(!normalize_markup("```html\n```").is_valid());
    assert_eq!(
        normalize_json("[1, 2, 3]"),
        Normalized::Valid(json!([1, 2, 3]))
    );
}

#[test]
fn markup_prefers_html_block_over_earlier_blocks() {
    let raw = "Styles first:\n```css\n.a { color: red; }\n```\nMarkup:\n```html\n<html><body>hi</body></html>\n```";
    assert_eq!(
        normalize_markup(raw),
        Normalized::Valid("<html><body>hi</body></html>".to_string())
    );

    let upper = "```js\nconsole.log(1)\n```\n```HTML\n<div>card</div>\n```";
    assert_eq!(normalize_markup(upper), Normalized::Valid("<div>card</div>".to_string()));
}

#[test]
fn markup_falls_back_to_first_block_that_looks_like_markup() {
    let raw = "```css\n.a {}\n```\nthen\n```\n<!DOCTYPE html><html></html>\n```";
    assert_eq!(
        normalize_markup(raw),
        Normalized::Valid("<!DOCTYPE html><html></html>".to_string())
    );

    let no_markup = "```css\n.a {}\n```\n```js\nlet x = 1;\n```";
    assert!(!normalize_markup(no_markup).is_valid());
}
