//! Comma-separated token lists, e.g. the value of Require/Supported/Allow.

/// Split a header value into trimmed, non-empty comma-separated tokens.
pub fn parse_token_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_and_trims() {
        assert_eq!(parse_token_list(" 100rel , timer"), vec!["100rel", "timer"]);
    }

    #[test]
    fn empty_value_yields_empty_list() {
        assert!(parse_token_list("").is_empty());
    }
}
