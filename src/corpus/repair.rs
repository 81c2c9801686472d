/// Bounded corruption repairs applied once to a chunk that failed to parse.
///
/// In order: strip raw control characters, double backslashes that do not
/// start a valid JSON escape, then escape bare double quotes inside the
/// values of the code-carrying fields.
use std::sync::LazyLock;

use regex::Regex;

/// Fields whose string values may contain unescaped quotes.
const CODE_FIELDS: [&str; 3] = ["code_snippet", "vulnerable_code", "fixed_code"];

static FIELD_STARTS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    CODE_FIELDS
        .iter()
        .map(|f| Regex::new(&format!(r#""{f}"\s*:\s*""#)).expect("valid field regex"))
        .collect()
});

/// End of a string value: its closing quote followed by the next key, whatever
/// its name.
static NEXT_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""\s*,\s*"[A-Za-z_][A-Za-z0-9_]*"\s*:"#).expect("valid key regex")
});

/// End of the last value in the object.
static OBJECT_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""\s*\}\s*$"#).expect("valid object end regex"));

/// Apply all repairs.
#[must_use]
pub fn repair(content: &str) -> String {
    let stripped = strip_control_chars(content);
    let escaped = double_stray_backslashes(&stripped);
    FIELD_STARTS
        .iter()
        .fold(escaped, |acc, start| escape_value_quotes(&acc, start))
}

/// Remove characters below U+0020.
#[must_use]
pub fn strip_control_chars(content: &str) -> String {
    content.chars().filter(|c| (*c as u32) >= 0x20).collect()
}

/// Double every backslash that does not begin a valid JSON escape sequence.
#[must_use]
pub fn double_stray_backslashes(content: &str) -> String {
    let chars: Vec<char> = content.chars().collect();
    let mut out = String::with_capacity(content.len() + 8);
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c != '\\' {
            out.push(c);
            i += 1;
            continue;
        }

        match chars.get(i + 1) {
            Some('"' | '\\' | '/' | 'b' | 'f' | 'n' | 'r' | 't') => {
                out.push(c);
                out.push(chars[i + 1]);
                i += 2;
            }
            Some('u') if is_unicode_escape(&chars[i + 2..]) => {
                out.push(c);
                out.push('u');
                i += 2;
            }
            _ => {
                out.push_str("\\\\");
                i += 1;
            }
        }
    }

    out
}

fn is_unicode_escape(rest: &[char]) -> bool {
    rest.len() >= 4 && rest[..4].iter().all(char::is_ascii_hexdigit)
}

/// Escape bare quotes inside the string value that follows `start`.
fn escape_value_quotes(content: &str, start: &Regex) -> String {
    let Some(m) = start.find(content) else {
        return content.to_string();
    };
    let value_start = m.end();
    let rest = &content[value_start..];

    let value_end = NEXT_KEY
        .find(rest)
        .or_else(|| OBJECT_END.find(rest))
        .map(|end| end.start());
    let Some(value_end) = value_end else {
        return content.to_string();
    };

    let mut out = String::with_capacity(content.len() + 8);
    out.push_str(&content[..value_start]);
    out.push_str(&escape_bare_quotes(&rest[..value_end]));
    out.push_str(&rest[value_end..]);
    out
}

/// Prefix every quote preceded by an even number of backslashes.
fn escape_bare_quotes(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 8);
    let mut backslashes = 0usize;
    for c in value.chars() {
        if c == '"' && backslashes % 2 == 0 {
            out.push('\\');
        }
        out.push(c);
        backslashes = if c == '\\' { backslashes + 1 } else { 0 };
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_control_chars() {
        assert_eq!(strip_control_chars("a\u{0}b\tc\nd\u{1f}e"), "abcde");
        assert_eq!(strip_control_chars("héllo"), "héllo");
    }

    #[test]
    fn test_double_stray_backslashes() {
        assert_eq!(double_stray_backslashes(r"C:\data"), r"C:\\data");
        assert_eq!(double_stray_backslashes(r#"a\"b\\c\n"#), r#"a\"b\\c\n"#);
        assert_eq!(double_stray_backslashes(r"\u00e9 \uZZ"), r"\u00e9 \\uZZ");
        assert_eq!(double_stray_backslashes("end\\"), "end\\\\");
    }

    #[test]
    fn test_escape_quotes_in_snippet_only() {
        let broken = r#"{"code_snippet":"say "hi"","vulnerability_type":"XSS"}"#;
        let fixed = repair(broken);
        assert_eq!(
            fixed,
            r#"{"code_snippet":"say \"hi\"","vulnerability_type":"XSS"}"#
        );
        let v: serde_json::Value = serde_json::from_str(&fixed).unwrap();
        assert_eq!(v["code_snippet"], r#"say "hi""#);
    }

    #[test]
    fn test_escape_quotes_when_snippet_is_last() {
        let broken = r#"{"vulnerability_type":"XSS","code_snippet":"x = "a""}"#;
        let v: serde_json::Value = serde_json::from_str(&repair(broken)).unwrap();
        assert_eq!(v["code_snippet"], r#"x = "a""#);
        assert_eq!(v["vulnerability_type"], "XSS");
    }

    #[test]
    fn test_unlisted_key_after_snippet_survives() {
        let broken = r#"{"code_snippet":"say "hi"","language":"js","vulnerability_type":"XSS"}"#;
        let v: serde_json::Value = serde_json::from_str(&repair(broken)).unwrap();
        assert_eq!(v["code_snippet"], r#"say "hi""#);
        assert_eq!(v["language"], "js");
        assert_eq!(v["vulnerability_type"], "XSS");
    }

    #[test]
    fn test_already_escaped_quotes_untouched() {
        let ok = r#"{"code_snippet":"a \"b\" c","vulnerability_type":"x"}"#;
        assert_eq!(repair(ok), ok);
    }

    #[test]
    fn test_fixed_code_quotes_escaped() {
        let broken = r#"{"code_snippet":"a","vulnerability_type":"x","fixed_code":"esc("y")"}"#;
        let v: serde_json::Value = serde_json::from_str(&repair(broken)).unwrap();
        assert_eq!(v["fixed_code"], r#"esc("y")"#);
    }

    #[test]
    fn test_escape_bare_quotes_counts_backslashes() {
        assert_eq!(escape_bare_quotes(r#"a\\"b"#), r#"a\\\"b"#);
        assert_eq!(escape_bare_quotes(r#"a\"b"#), r#"a\"b"#);
    }
}
