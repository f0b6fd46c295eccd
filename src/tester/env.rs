// Module: Env
// `#name#` placeholder substitution applied to urls, header values and
// payload bytes. Unknown names keep their sentinel intact.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

static ENV_VAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"#(.*?)#").expect("valid env var regex"));

pub fn replace_with_env_value(src: &str, env: &HashMap<String, String>) -> String {
    let mut result = String::with_capacity(src.len());
    let mut last = 0;
    for captures in ENV_VAR_RE.captures_iter(src) {
        let whole = captures.get(0).expect("group 0 always present");
        match env.get(&captures[1]) {
            Some(value) => {
                result.push_str(&src[last..whole.start()]);
                result.push_str(value);
            }
            None => result.push_str(&src[last..whole.end()]),
        }
        last = whole.end();
    }
    result.push_str(&src[last..]);
    result
}

/// Substitution over raw payload bytes. Non-utf8 payloads are passed
/// through untouched.
pub fn replace_in_bytes(src: &[u8], env: &HashMap<String, String>) -> Vec<u8> {
    match std::str::from_utf8(src) {
        Ok(text) => replace_with_env_value(text, env).into_bytes(),
        Err(_) => src.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_replaces_known_variables() {
        let env = env(&[("id", "42"), ("token", "abc")]);
        assert_eq!(
            replace_with_env_value("/users/#id#?t=#token#", &env),
            "/users/42?t=abc"
        );
    }

    #[test]
    fn test_unknown_variable_keeps_the_sentinel() {
        let env = env(&[("id", "42")]);
        assert_eq!(
            replace_with_env_value("/users/#id#/#missing#", &env),
            "/users/42/#missing#"
        );
    }

    #[test]
    fn test_no_sentinel_is_untouched() {
        assert_eq!(replace_with_env_value("/plain/url", &env(&[])), "/plain/url");
    }

    #[test]
    fn test_repeated_variable() {
        let env = env(&[("x", "1")]);
        assert_eq!(replace_with_env_value("#x#-#x#", &env), "1-1");
    }

    #[test]
    fn test_replace_in_bytes() {
        let env = env(&[("name", "jean")]);
        assert_eq!(
            replace_in_bytes(br##"{"name": "#name#"}"##, &env),
            br#"{"name": "jean"}"#.to_vec()
        );
    }

    #[test]
    fn test_non_utf8_payload_is_passed_through() {
        let env = env(&[("x", "1")]);
        let payload = vec![0xff, 0xfe, b'#', b'x', b'#'];
        assert_eq!(replace_in_bytes(&payload, &env), payload);
    }
}
