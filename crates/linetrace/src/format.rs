use facet_value::Value;

/// Longest inline annotation before it is cut with an ellipsis.
const INLINE_MAX_CHARS: usize = 80;

/// Turns an instrumented value into display text.
///
/// `inline` feeds the annotation drawn next to the source line, `full` feeds
/// explicit print requests. Both must be pure.
pub trait ItemFormatter: Send + Sync {
    fn inline(&self, item: &Value) -> String;
    fn full(&self, item: &Value) -> String;
}

/// Renders values as compact JSON.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonFormatter;

impl ItemFormatter for JsonFormatter {
    fn inline(&self, item: &Value) -> String {
        let full = self.full(item);
        if full.chars().count() <= INLINE_MAX_CHARS {
            return full;
        }
        let mut cut: String = full.chars().take(INLINE_MAX_CHARS - 3).collect();
        cut.push_str("...");
        cut
    }

    fn full(&self, item: &Value) -> String {
        facet_json::to_string(item).unwrap_or_else(|e| format!("<unprintable: {e}>"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_values_are_cut_inline_but_not_in_full() {
        let long = "a".repeat(200);
        let value: Value = long.clone().into();
        let inline = JsonFormatter.inline(&value);
        assert_eq!(inline.chars().count(), INLINE_MAX_CHARS);
        assert!(inline.ends_with("..."));
        assert!(JsonFormatter.full(&value).contains(&long));
    }

    #[test]
    fn short_values_are_untouched() {
        let value: Value = 42i64.into();
        assert_eq!(JsonFormatter.inline(&value), "42");
    }
}
