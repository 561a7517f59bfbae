use brandlens_core::Platform;

/// Check an API key against the vendor's published key format. This is a
/// shape check only; it does not call the vendor.
pub fn validate_key_format(platform: Platform, key: &str) -> bool {
    match platform {
        Platform::ChatGpt => key.starts_with("sk-") && key.len() > 20,
        Platform::Claude => key.starts_with("sk-ant-") && key.len() > 20,
        Platform::Gemini => key.len() > 20,
        Platform::Perplexity => key.starts_with("pplx-") && key.len() > 20,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openai_key_format() {
        assert!(validate_key_format(
            Platform::ChatGpt,
            "sk-proj-abcdefghijklmnopqrstuvwx"
        ));
        assert!(!validate_key_format(Platform::ChatGpt, "sk-short"));
        assert!(!validate_key_format(
            Platform::ChatGpt,
            "pk-proj-abcdefghijklmnopqrstuvwx"
        ));
    }

    #[test]
    fn test_anthropic_key_format() {
        assert!(validate_key_format(
            Platform::Claude,
            "sk-ant-REDACTED"
        ));
        // Plain sk- keys belong to OpenAI, not Anthropic
        assert!(!validate_key_format(
            Platform::Claude,
            "sk-proj-abcdefghijklmnopqrstuvwx"
        ));
    }

    #[test]
    fn test_gemini_key_format() {
        assert!(validate_key_format(
            Platform::Gemini,
            "AIzaSyAbCdEfGhIjKlMnOpQrStUv"
        ));
        assert!(!validate_key_format(Platform::Gemini, "AIza-short"));
    }

    #[test]
    fn test_perplexity_key_format() {
        assert!(validate_key_format(
            Platform::Perplexity,
            "pplx-abcdefghijklmnopqrstuvwx"
        ));
        assert!(!validate_key_format(
            Platform::Perplexity,
            "sk-abcdefghijklmnopqrstuvwx"
        ));
    }
}
