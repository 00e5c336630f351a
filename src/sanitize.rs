//! Defensive cleanup of client input before it reaches either upstream.

use std::collections::HashSet;

use crate::translate::responses_types::InputItem;

/// What [`drop_orphan_tool_results`] removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SanitizeReport {
    pub dropped_call_ids: Vec<String>,
}

impl SanitizeReport {
    pub fn dropped(&self) -> usize {
        self.dropped_call_ids.len()
    }

    pub fn is_clean(&self) -> bool {
        self.dropped_call_ids.is_empty()
    }
}

/// Remove function call outputs whose `call_id` has no earlier function call.
///
/// Clients replaying partial history often send tool results without the call
/// that produced them; upstream rejects those. Survivors keep their order.
pub fn drop_orphan_tool_results(input: Vec<InputItem>) -> (Vec<InputItem>, SanitizeReport) {
    // A call_id is valid from the position of its function call onward.
    let keep: Vec<bool> = {
        let mut seen_calls: HashSet<&str> = HashSet::new();
        input
            .iter()
            .map(|item| match item {
                InputItem::FunctionCall(call) => {
                    seen_calls.insert(call.call_id.as_str());
                    true
                }
                InputItem::FunctionCallOutput(output) => {
                    seen_calls.contains(output.call_id.as_str())
                }
                _ => true,
            })
            .collect()
    };

    let mut report = SanitizeReport::default();
    let kept = input
        .into_iter()
        .zip(keep)
        .filter_map(|(item, keep)| {
            if keep {
                return Some(item);
            }
            if let InputItem::FunctionCallOutput(ref output) = item {
                report.dropped_call_ids.push(output.call_id.clone());
            }
            None
        })
        .collect();

    (kept, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::responses_types::*;

    fn call(id: &str) -> InputItem {
        InputItem::FunctionCall(FunctionCallItem {
            id: None,
            call_id: id.to_string(),
            name: "f".to_string(),
            arguments: "{}".to_string(),
            status: None,
        })
    }

    fn output(id: &str) -> InputItem {
        InputItem::FunctionCallOutput(FunctionCallOutputItem {
            id: None,
            call_id: id.to_string(),
            output: FunctionOutput::Text("ok".to_string()),
            status: None,
        })
    }

    fn user(text: &str) -> InputItem {
        InputItem::UserMessage(EasyMessage {
            content: MessageContent::Text(text.to_string()),
        })
    }

    fn assert_no_orphans(items: &[InputItem]) {
        for (i, item) in items.iter().enumerate() {
            if let InputItem::FunctionCallOutput(o) = item {
                let matched = items[..i]
                    .iter()
                    .any(|p| matches!(p, InputItem::FunctionCall(c) if c.call_id == o.call_id));
                assert!(matched, "orphan {} survived", o.call_id);
            }
        }
    }

    #[test]
    fn test_matched_pairs_survive() {
        let input = vec![user("hi"), call("a"), output("a")];
        let (kept, report) = drop_orphan_tool_results(input.clone());
        assert_eq!(kept, input);
        assert!(report.is_clean());
    }

    #[test]
    fn test_orphan_is_dropped_and_reported() {
        let input = vec![user("hi"), output("ghost"), call("a"), output("a")];
        let (kept, report) = drop_orphan_tool_results(input);
        assert_eq!(kept, vec![user("hi"), call("a"), output("a")]);
        assert_eq!(report.dropped(), 1);
        assert_eq!(report.dropped_call_ids, vec!["ghost".to_string()]);
    }

    #[test]
    fn test_output_before_its_call_is_an_orphan() {
        let input = vec![output("a"), call("a")];
        let (kept, report) = drop_orphan_tool_results(input);
        assert_eq!(kept, vec![call("a")]);
        assert_eq!(report.dropped_call_ids, vec!["a".to_string()]);
    }

    #[test]
    fn test_survivor_order_preserved_on_mixed_input() {
        let input = vec![
            call("a"),
            output("x"),
            user("1"),
            call("b"),
            output("b"),
            output("y"),
            output("a"),
            user("2"),
        ];
        let (kept, report) = drop_orphan_tool_results(input);
        assert_eq!(
            kept,
            vec![call("a"), user("1"), call("b"), output("b"), output("a"), user("2")]
        );
        assert_eq!(report.dropped(), 2);
        assert_no_orphans(&kept);
    }

    #[test]
    fn test_empty_input() {
        let (kept, report) = drop_orphan_tool_results(Vec::new());
        assert!(kept.is_empty());
        assert!(report.is_clean());
    }
}
