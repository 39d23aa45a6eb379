//! Environment variable expansion for configuration strings.
//!
//! Supports:
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default

use crate::ConfigError;

/// Expand environment variable references in a string.
///
/// Strings without `${` are returned unchanged, including any bare `$VAR`.
/// Once a string contains `${`, bare `$VAR` references in it are expanded
/// too and follow the same unset-variable rule.
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    if !value.contains("${") {
        return Ok(value.to_owned());
    }

    shellexpand::env_with_context(value, |var| -> Result<Option<String>, LookupError> {
        match std::env::var(var) {
            Ok(val) => Ok(Some(val)),
            Err(_) => Err(LookupError {
                var_name: var.to_owned(),
            }),
        }
    })
    .map(std::borrow::Cow::into_owned)
    .map_err(|e| ConfigError::EnvVar {
        field: field.to_owned(),
        message: format!("${{{0}}} not set", e.cause.var_name),
    })
}

/// Error returned when environment variable lookup fails.
struct LookupError {
    var_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_with_default_uses_value() {
        // SAFETY: the variable name is unique to this test
        unsafe {
            std::env::set_var("PUML_TEST_PROXY_SET", "proxy.local:3128");
        }
        let result = expand_env("${PUML_TEST_PROXY_SET:-}", "proxy").unwrap();
        assert_eq!(result, "proxy.local:3128");
        unsafe {
            std::env::remove_var("PUML_TEST_PROXY_SET");
        }
    }

    #[test]
    fn test_expand_with_empty_default() {
        // SAFETY: the variable name is unique to this test
        unsafe {
            std::env::remove_var("PUML_TEST_PROXY_UNSET");
        }
        let result = expand_env("${PUML_TEST_PROXY_UNSET:-}", "proxy").unwrap();
        assert_eq!(result, "");
    }

    #[test]
    fn test_expand_missing_var_error() {
        // SAFETY: the variable name is unique to this test
        unsafe {
            std::env::remove_var("PUML_TEST_MISSING");
        }
        let err = expand_env("${PUML_TEST_MISSING}", "cloud_uri").unwrap_err();
        assert!(matches!(err, ConfigError::EnvVar { .. }));
        assert!(err.to_string().contains("PUML_TEST_MISSING"));
        assert!(err.to_string().contains("cloud_uri"));
    }

    #[test]
    fn test_expand_embedded_var() {
        // SAFETY: the variable name is unique to this test
        unsafe {
            std::env::set_var("PUML_TEST_HOST", "plantuml.internal");
        }
        let result = expand_env("https://${PUML_TEST_HOST}/plantuml", "cloud_uri").unwrap();
        assert_eq!(result, "https://plantuml.internal/plantuml");
        unsafe {
            std::env::remove_var("PUML_TEST_HOST");
        }
    }

    #[test]
    fn test_value_containing_placeholder_is_kept() {
        // SAFETY: the variable name is unique to this test
        unsafe {
            std::env::set_var("PUML_TEST_LITERAL", "a${b}c");
        }
        let result = expand_env("${PUML_TEST_LITERAL}", "web_path").unwrap();
        assert_eq!(result, "a${b}c");
        unsafe {
            std::env::remove_var("PUML_TEST_LITERAL");
        }
    }

    #[test]
    fn test_bare_dollar_expanded_next_to_braces() {
        // SAFETY: the variable name is unique to this test
        unsafe {
            std::env::set_var("PUML_TEST_BARE", "x");
            std::env::remove_var("PUML_TEST_BARE_UNSET");
        }
        let result = expand_env("$PUML_TEST_BARE/${PUML_TEST_BARE}", "web_path").unwrap();
        assert_eq!(result, "x/x");
        let err = expand_env("$PUML_TEST_BARE_UNSET/${PUML_TEST_BARE}", "web_path").unwrap_err();
        assert!(err.to_string().contains("PUML_TEST_BARE_UNSET"));
        unsafe {
            std::env::remove_var("PUML_TEST_BARE");
        }
    }

    #[test]
    fn test_bare_dollar_not_expanded() {
        let result = expand_env("https://example.com/$path", "cloud_uri").unwrap();
        assert_eq!(result, "https://example.com/$path");
    }
}
