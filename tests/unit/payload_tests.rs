/*!
 * Tests for request payload building
 */

use serde_json::Value;
use segtrans::translation::prompts::{PayloadBuilder, PromptTemplate};
use segtrans::translation::TaskKind;
use crate::common::{FALLBACK_MODEL, PRIMARY_MODEL};

fn body(
    builder: &PayloadBuilder,
    task: TaskKind,
    text: &str,
    glossary: Option<&str>,
    model: &str,
) -> Value {
    serde_json::to_value(builder.build(task, text, glossary, model)).unwrap()
}

/// Test that the translate body carries text and cleaned glossary in one user part
#[test]
fn test_build_withTranslateAndGlossary_shouldSendSingleUserPart() {
    let builder = PayloadBuilder::new(None, 0.0);
    let value = body(
        &builder,
        TaskKind::Translate,
        "林风走进了山门。",
        Some("```\n<cn>林风</cn> - <vi>**Lâm Phong**</vi>\n```"),
        FALLBACK_MODEL,
    );

    let parts = value["contents"][0]["parts"].as_array().unwrap();
    assert_eq!(parts.len(), 1);
    let text = parts[0]["text"].as_str().unwrap();
    assert!(text.starts_with(PromptTemplate::SOURCE_HEADER));
    assert!(text.contains("林风 - Lâm Phong"));
    assert!(!text.contains("```"));
    assert!(!text.contains('*'));
    assert!(value.get("systemInstruction").is_none());
}

/// Test that the system prompt placement follows the model id
#[test]
fn test_build_withSystemPrompt_shouldPlaceItPerModel() {
    let builder = PayloadBuilder::new(Some("Only output names.".to_string()), 0.0);

    let gemma = body(&builder, TaskKind::ExtractName, "raw text", None, PRIMARY_MODEL);
    assert!(gemma.get("systemInstruction").is_none());
    assert_eq!(gemma["contents"][0]["parts"][0]["text"], "Only output names.\n\nraw text");

    let gemini = body(&builder, TaskKind::ExtractName, "raw text", None, FALLBACK_MODEL);
    assert_eq!(gemini["systemInstruction"]["parts"][0]["text"], "Only output names.");
    assert_eq!(gemini["contents"][0]["parts"][0]["text"], "raw text");
}

/// Test that the temperature is sent as configured
#[test]
fn test_build_withTemperature_shouldSetGenerationConfig() {
    let builder = PayloadBuilder::new(None, 0.5);
    let value = body(&builder, TaskKind::Normalize, "text", None, FALLBACK_MODEL);
    assert_eq!(value["generationConfig"]["temperature"], 0.5);
}

/// Test that the fix-translation prompt ends with the trimmed line
#[test]
fn test_build_withFixTranslation_shouldAppendTrimmedLine() {
    let builder = PayloadBuilder::new(None, 0.0);
    let line = "  Lâm Phong 走 vào.\n";
    let request = builder.build(TaskKind::FixTranslation, line, None, FALLBACK_MODEL);
    let text = request.user_text();
    assert!(text.starts_with(PromptTemplate::FIX_TRANSLATION));
    assert!(text.ends_with("Lâm Phong 走 vào."));
}
