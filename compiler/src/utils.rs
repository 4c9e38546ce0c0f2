use serde_json;

/// JSON-quotes `text` for use in diagnostics.
pub fn quote(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| format!("\"{}\"", text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_and_escapes() {
        assert_eq!(quote("Car"), "\"Car\"");
        assert_eq!(quote("a\"b"), "\"a\\\"b\"");
    }
}
