use super::*;
use crate::types::{SelectionSnapshot, SelectionType};

fn page() -> PageInfo {
    PageInfo::new("https://example.com/post").with_title("Post")
}

#[test]
fn test_empty_selection_is_none() {
    assert!(analyze(&SelectionSnapshot::new("   \n\t"), &page()).is_none());
}

#[test]
fn test_artifact_only_selection_is_none() {
    assert!(analyze(&SelectionSnapshot::new("Show more"), &page()).is_none());
}

#[test]
fn test_min_chars() {
    let pipeline = SelectionPipeline::with_config(PipelineConfig {
        min_chars: 5,
        ..PipelineConfig::default()
    });
    assert!(pipeline.analyze(&SelectionSnapshot::new("abc"), &page()).is_none());
    assert!(pipeline.analyze(&SelectionSnapshot::new("abcdef"), &page()).is_some());
}

#[test]
fn test_metrics_and_page_fields() {
    let data = analyze(&SelectionSnapshot::new("  Hello   there \n"), &page()).unwrap();
    assert_eq!(data.text, "Hello there");
    assert_eq!(data.original_text, "  Hello   there \n");
    assert_eq!(data.word_count, 2);
    assert_eq!(data.char_count, 11);
    assert_eq!(data.page_url, "https://example.com/post");
    assert_eq!(data.page_title.as_deref(), Some("Post"));
    assert_eq!(data.data_types, BTreeSet::from([SelectionType::Word]));
    assert_eq!(data.llm_formatted_text, "Hello there");
}

#[test]
fn test_list_selection() {
    let selection = SelectionSnapshot::new("a b").with_html("<ul><li>a</li><li>b</li></ul>");
    let data = analyze(&selection, &page()).unwrap();
    assert!(data.context_types.contains(&SelectionType::List));
    assert_eq!(data.llm_formatted_text, "- a\n- b");
}

#[test]
fn test_json_selection_round_trips() {
    let raw = "[1, {\"k\": \"v\"}, true]";
    let data = analyze(&SelectionSnapshot::new(raw), &page()).unwrap();
    assert!(data.data_types.contains(&SelectionType::Json));
    let body = data
        .llm_formatted_text
        .strip_prefix("```json\n")
        .and_then(|b| b.strip_suffix("\n```"))
        .unwrap();
    let parsed: serde_json::Value = serde_json::from_str(body).unwrap();
    assert_eq!(parsed, serde_json::from_str::<serde_json::Value>(raw).unwrap());
}

#[test]
fn test_json_string_whitespace_survives_cleaning() {
    let raw = "{\"msg\": \"two  spaces\",\n \"cmd\": \"ls    -la\"}";
    let data = analyze(&SelectionSnapshot::new(raw), &page()).unwrap();
    assert!(data.data_types.contains(&SelectionType::Json));
    assert!(data.text.contains("\"ls -la\""));
    let body = data
        .llm_formatted_text
        .strip_prefix("```json\n")
        .and_then(|b| b.strip_suffix("\n```"))
        .unwrap();
    let parsed: serde_json::Value = serde_json::from_str(body).unwrap();
    assert_eq!(parsed["cmd"], "ls    -la");
    assert_eq!(parsed, serde_json::from_str::<serde_json::Value>(raw).unwrap());
}

#[test]
fn test_code_block_uses_ancestor_hint() {
    let selection = SelectionSnapshot::new("x = compute()\nprint(x)")
        .with_ancestor(ElementInfo::new("code").with_class("language-py"))
        .with_ancestor(ElementInfo::new("pre"));
    let data = analyze(&selection, &page()).unwrap();
    assert!(data.context_types.contains(&SelectionType::Code));
    assert!(data.llm_formatted_text.starts_with("```python\n"));
}

#[test]
fn test_code_hint_from_fragment() {
    let selection = SelectionSnapshot::new("let y = 2")
        .with_html(r#"<pre><code class="language-js">let y = 2</code></pre>"#);
    let data = analyze(&selection, &page()).unwrap();
    assert_eq!(data.llm_formatted_text, "```javascript\nlet y = 2\n```");
}

#[test]
fn test_table_selection() {
    let selection = SelectionSnapshot::new("Name Age Ann 31").with_html(
        "<table><thead><tr><th>Name</th><th>Age</th></tr></thead><tbody><tr><td>Ann</td><td>31</td></tr></tbody></table>",
    );
    let data = analyze(&selection, &page()).unwrap();
    assert!(data.context_types.contains(&SelectionType::Table));
    assert_eq!(
        data.llm_formatted_text,
        "| Name | Age |\n| --- | --- |\n| Ann | 31 |"
    );
}

#[test]
fn test_long_text_truncation_with_config() {
    let text = (0..80).map(|i| format!("word{}", i)).collect::<Vec<_>>().join(" ");
    let pipeline = SelectionPipeline::with_config(PipelineConfig {
        max_words: 60,
        ..PipelineConfig::default()
    });
    let data = pipeline.analyze(&SelectionSnapshot::new(text), &page()).unwrap();
    assert!(data.data_types.contains(&SelectionType::LongText));
    assert!(data.llm_formatted_text.contains("first 60 of 80 words"));
}

#[test]
fn test_deterministic() {
    let selection = SelectionSnapshot::new("# Notes\n\n- **one**\n- two")
        .with_html("<h1>Notes</h1><ul><li><b>one</b></li><li>two</li></ul>");
    let first = analyze(&selection, &page()).unwrap();
    let second = analyze(&selection, &page()).unwrap();
    assert_eq!(first, second);
}
