/// Interprets an environment-style flag. `1`/`true`/`yes`/`on` switch the flag on, their negations switch it
/// off, case-insensitively and ignoring surrounding whitespace. An absent or unrecognisable value falls back to
/// `default`, so a typo in an env var never silently disables signature checks.
pub fn env_flag(value: Option<String>, default: bool) -> bool {
    value
        .as_deref()
        .map(|raw| match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        })
        .unwrap_or(default)
}

#[cfg(test)]
mod test {
    use super::env_flag;

    #[test]
    fn recognised_values_override_the_default() {
        for on in ["1", "true", "YES", " on "] {
            assert!(env_flag(Some(on.to_string()), false), "{on} should switch the flag on");
        }
        for off in ["0", "false", "No", "OFF"] {
            assert!(!env_flag(Some(off.to_string()), true), "{off} should switch the flag off");
        }
    }

    #[test]
    fn anything_else_falls_back_to_the_default() {
        assert!(env_flag(None, true));
        assert!(!env_flag(None, false));
        assert!(env_flag(Some("bananas".to_string()), true));
        assert!(!env_flag(Some("".to_string()), false));
    }
}
