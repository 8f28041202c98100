use super::*;

fn tags(list: &[SelectionType]) -> BTreeSet<SelectionType> {
    list.iter().copied().collect()
}

fn strip_fence(text: &str) -> &str {
    let body = text.strip_prefix("```json\n").unwrap();
    body.strip_suffix("\n```").unwrap()
}

#[test]
fn test_passthrough_without_rule() {
    let input = FormatInput::new("plain words");
    assert_eq!(format_for_llm(&input, &tags(&[SelectionType::Sentence])), "plain words");
    assert!(matching_rule(&tags(&[SelectionType::Url, SelectionType::Quote])).is_none());
}

#[test]
fn test_json_pretty_printed_and_round_trips() {
    let raw = r#"{"b":[1,2,{"c":null}],"a":"x"}"#;
    let out = format_for_llm(&FormatInput::new(raw), &tags(&[SelectionType::Json]));
    assert!(out.starts_with("```json\n{\n"));
    let reparsed: serde_json::Value = serde_json::from_str(strip_fence(&out)).unwrap();
    let original: serde_json::Value = serde_json::from_str(raw).unwrap();
    assert_eq!(reparsed, original);
}

#[test]
fn test_json_prefers_original_text() {
    let input = FormatInput {
        text: r#"{"cmd": "ls -la"}"#,
        original_text: r#"  {"cmd": "ls    -la"}  "#,
        ..FormatInput::new("")
    };
    let out = format_for_llm(&input, &tags(&[SelectionType::Json]));
    let reparsed: serde_json::Value = serde_json::from_str(strip_fence(&out)).unwrap();
    assert_eq!(reparsed, serde_json::json!({"cmd": "ls    -la"}));
}

#[test]
fn test_json_fallback_when_parse_fails() {
    let out = format_for_llm(&FormatInput::new("{broken"), &tags(&[SelectionType::Json]));
    assert_eq!(out, "```\n{broken\n```");
}

#[test]
fn test_json_wins_over_code() {
    let rule = matching_rule(&tags(&[SelectionType::Code, SelectionType::Json])).unwrap();
    assert_eq!(rule.name, "json");
}

#[test]
fn test_only_first_rule_applies() {
    let input = FormatInput {
        html: "<ul><li>a</li></ul>",
        ..FormatInput::new("Error: a")
    };
    let out = format_for_llm(&input, &tags(&[SelectionType::List, SelectionType::ErrorMessage]));
    assert_eq!(out, "```\nError: a\n```");
}

#[test]
fn test_code_keeps_indentation() {
    let raw = "\ndef f(x):\n    return x\n";
    let input = FormatInput {
        original_text: raw,
        ..FormatInput::new("def f(x):\n return x")
    };
    let out = format_for_llm(&input, &tags(&[SelectionType::Code]));
    assert_eq!(out, "```python\ndef f(x):\n    return x\n```");
}

#[test]
fn test_code_language_hint() {
    let input = FormatInput {
        language_hint: Some("ts"),
        ..FormatInput::new("let a = 1")
    };
    let out = format_for_llm(&input, &tags(&[SelectionType::Code]));
    assert!(out.starts_with("```typescript\n"));
}

#[test]
fn test_terminal_block() {
    let out = format_for_llm(
        &FormatInput::new("$ ls\nfile.txt"),
        &tags(&[SelectionType::TerminalOutput]),
    );
    assert_eq!(out, "```\n$ ls\nfile.txt\n```");
}

#[test]
fn test_table_rule_and_fallback() {
    let input = FormatInput {
        html: "<table><tr><td>1</td><td>2</td></tr></table>",
        ..FormatInput::new("1 2")
    };
    let out = format_for_llm(&input, &tags(&[SelectionType::Table]));
    assert_eq!(out, "| 1 | 2 |\n| --- | --- |");

    let out = format_for_llm(&FormatInput::new("1 2"), &tags(&[SelectionType::Table]));
    assert_eq!(out, "<table>\n1 2\n</table>");
}

#[test]
fn test_math() {
    let latex = FormatInput {
        html: "<span>x</span>",
        ..FormatInput::new(r"\(x^2\)")
    };
    assert_eq!(format_for_llm(&latex, &tags(&[SelectionType::Math])), r"\(x^2\)");

    let mathml = FormatInput {
        html: "<math><mi>x</mi></math>",
        ..FormatInput::new("x")
    };
    assert_eq!(
        format_for_llm(&mathml, &tags(&[SelectionType::Math])),
        "```mathml\n<math><mi>x</mi></math>\n```"
    );
}

#[test]
fn test_list_rule() {
    let input = FormatInput {
        html: "<ul><li>a</li><li>b</li></ul>",
        ..FormatInput::new("a b")
    };
    assert_eq!(format_for_llm(&input, &tags(&[SelectionType::List])), "- a\n- b");

    let no_html = FormatInput::new("a b");
    assert_eq!(format_for_llm(&no_html, &tags(&[SelectionType::List])), "a b");
}

#[test]
fn test_long_text_truncated() {
    let text = (0..30).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ");
    let input = FormatInput {
        max_words: 10,
        ..FormatInput::new(&text)
    };
    let out = format_for_llm(&input, &tags(&[SelectionType::LongText, SelectionType::Paragraph]));
    assert!(out.starts_with("w0 w1 w2 w3 w4 w5 w6 w7 w8 w9\n\n[Truncated"));
    assert!(out.contains("first 10 of 30 words"));
}

#[test]
fn test_truncate_words() {
    assert_eq!(truncate_words("a b c", 5), "a b c");
    assert_eq!(truncate_words("a b c", 3), "a b c");
    let out = truncate_words("one\n\ntwo  three four", 2);
    assert!(out.starts_with("one\n\ntwo\n\n"));
    assert!(truncate_words("x y", 0).starts_with("\n\n[Truncated"));
}
