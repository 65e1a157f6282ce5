//! # Input Rules
//!
//! An input rule rewrites text as it is typed: when the text before the
//! cursor plus the newly typed text matches the rule's pattern (anchored at
//! the end), the match is replaced. With a capture group in the pattern,
//! only the group is replaced and the rest of the match is kept.

use regex::Regex;
use reprose_model::{EditorState, Transaction};
use tracing::debug;

use crate::errors::{EditorError, EditorResult};
use crate::plugin::Plugin;

/// How far back the text before the cursor is considered
const MAX_MATCH: usize = 500;

/// Stand-in for non-text inline nodes when collecting the text before the
/// cursor
const LEAF_TEXT: &str = "\u{fffc}";

#[derive(Debug, Clone)]
pub struct InputRule {
    name: String,
    pattern: Regex,
    replacement: String,
}

impl InputRule {
    pub fn new(
        name: impl Into<String>,
        pattern: &str,
        replacement: impl Into<String>,
    ) -> EditorResult<Self> {
        let name = name.into();
        let pattern = Regex::new(pattern).map_err(|err| {
            EditorError::Configuration(format!("input rule {}: {}", name, err))
        })?;
        Ok(Self {
            name,
            pattern,
            replacement: replacement.into(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }

    /// Build the rewrite for `text` typed over `from..to`, if the rule
    /// matches. `before` is the textblock text preceding `from`.
    fn rewrite(
        &self,
        state: &EditorState,
        before: &str,
        from: usize,
        to: usize,
        text: &str,
    ) -> Option<Transaction> {
        let haystack = format!("{}{}", before, text);
        let captures = self.pattern.captures(&haystack)?;
        let whole = captures.get(0)?;
        if whole.end() != haystack.len() {
            return None;
        }

        let matched = whole.as_str();
        let match_len = matched.chars().count();
        let text_len = text.chars().count();
        if match_len < text_len {
            return None;
        }

        let mut start = from - (match_len - text_len);
        let end = to;
        let mut insert = self.replacement.clone();

        if let Some(group) = captures.get(1) {
            let group_start = group.start() - whole.start();
            let group_end = group.end() - whole.start();
            let offset = matched[..group_start].chars().count();
            insert.push_str(&matched[group_end..]);
            start += offset;
            if start > end {
                let cut_off = start - end;
                let kept: String = matched
                    .chars()
                    .skip(offset - cut_off)
                    .take(cut_off)
                    .collect();
                insert = kept + &insert;
                start = end;
            }
        }

        let mut tr = state.tr();
        tr.insert_text(&insert, start, end).ok()?;
        debug!(rule = %self.name, start, end, "Input rule applied");
        Some(tr)
    }
}

/// Smart quotes, ellipsis and em-dash, in that order
pub fn typographic_rules() -> EditorResult<Vec<InputRule>> {
    const OPENING: &str = r#"(?:^|[\s{\[(<'"\x{2018}\x{201C}])"#;
    Ok(vec![
        InputRule::new("open_double_quote", &format!(r#"{}(")$"#, OPENING), "\u{201C}")?,
        InputRule::new("close_double_quote", r#""$"#, "\u{201D}")?,
        InputRule::new("open_single_quote", &format!(r#"{}(')$"#, OPENING), "\u{2018}")?,
        InputRule::new("close_single_quote", r#"'$"#, "\u{2019}")?,
        InputRule::new("ellipsis", r"\.\.\.$", "\u{2026}")?,
        InputRule::new("em_dash", r"--$", "\u{2014}")?,
    ])
}

/// Runs input rules on typed text. Always the first plugin.
#[derive(Debug, Clone)]
pub struct InputRulesPlugin {
    rules: Vec<InputRule>,
}

impl InputRulesPlugin {
    pub fn new(rules: Vec<InputRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[InputRule] {
        &self.rules
    }
}

impl Plugin for InputRulesPlugin {
    fn name(&self) -> &str {
        "input-rules"
    }

    fn handle_text_input(
        &self,
        state: &EditorState,
        from: usize,
        to: usize,
        text: &str,
        dispatch: &mut dyn FnMut(Transaction),
    ) -> bool {
        if self.rules.is_empty() {
            return false;
        }
        let Ok(rpos) = state.doc().resolve(from) else {
            return false;
        };
        let parent = rpos.parent();
        let in_code = state
            .schema()
            .node_type(parent.type_name())
            .map(|t| t.spec().code)
            .unwrap_or(false);
        if in_code {
            return false;
        }

        let offset = rpos.parent_offset();
        let before =
            parent
                .content()
                .text_between(offset.saturating_sub(MAX_MATCH), offset, LEAF_TEXT);

        for rule in &self.rules {
            if let Some(tr) = rule.rewrite(state, &before, from, to, text) {
                dispatch(tr);
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use indexmap::IndexMap;
    use reprose_model::{NodeSpec, Schema, SchemaDescriptor, Selection};
    use serde_json::json;

    fn state(text: &str, cursor: usize) -> EditorState {
        let mut nodes = IndexMap::new();
        nodes.insert("doc".to_string(), NodeSpec::new().with_content("block+"));
        nodes.insert("text".to_string(), NodeSpec::new().with_group("inline"));
        nodes.insert(
            "paragraph".to_string(),
            NodeSpec::new().with_content("inline*").with_group("block"),
        );
        nodes.insert(
            "code_block".to_string(),
            NodeSpec::new().with_content("text*").with_group("block").code(),
        );
        let schema = Arc::new(Schema::new(SchemaDescriptor::new(nodes, IndexMap::new())).unwrap());
        let content = if text.is_empty() {
            json!([])
        } else {
            json!([{ "type": "text", "text": text }])
        };
        let doc = json!({
            "type": "doc",
            "content": [
                { "type": "paragraph", "content": content },
                { "type": "code_block", "content": [{ "type": "text", "text": "x-" }] }
            ]
        });
        let state = EditorState::from_json(schema, &doc).unwrap();
        state.with_selection(Selection::cursor(cursor))
    }

    fn type_text(state: &EditorState, text: &str) -> Option<String> {
        let plugin = InputRulesPlugin::new(typographic_rules().unwrap());
        let pos = state.selection().from();
        let mut result = None;
        plugin.handle_text_input(state, pos, pos, text, &mut |tr| {
            result = Some(state.apply(&tr).unwrap().doc().child(0).unwrap().text_content());
        });
        result
    }

    #[test]
    fn test_em_dash() {
        let state = state("a-", 3);
        assert_eq!(type_text(&state, "-").as_deref(), Some("a\u{2014}"));
    }

    #[test]
    fn test_ellipsis() {
        let state = state("wait..", 7);
        assert_eq!(type_text(&state, ".").as_deref(), Some("wait\u{2026}"));
    }

    #[test]
    fn test_quotes_open_and_close() {
        let state_open = state("say ", 5);
        assert_eq!(
            type_text(&state_open, "\"").as_deref(),
            Some("say \u{201C}")
        );

        let state_close = state("say \u{201C}hi", 8);
        assert_eq!(
            type_text(&state_close, "\"").as_deref(),
            Some("say \u{201C}hi\u{201D}")
        );
    }

    #[test]
    fn test_quote_at_block_start_opens() {
        let state = state("", 1);
        assert_eq!(type_text(&state, "'").as_deref(), Some("\u{2018}"));
    }

    #[test]
    fn test_plain_text_is_not_handled() {
        let state = state("abc", 4);
        assert_eq!(type_text(&state, "d"), None);
    }

    #[test]
    fn test_rules_skip_code_blocks() {
        // paragraph "a-" spans 0..4, code block content starts at 5
        let state = state("a-", 7);
        assert_eq!(type_text(&state, "-"), None);
    }

    #[test]
    fn test_invalid_pattern_is_a_configuration_error() {
        let err = InputRule::new("broken", "(", "x").unwrap_err();
        assert!(matches!(err, EditorError::Configuration(_)));
    }
}
