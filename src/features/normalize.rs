/// Snippet normalization shared by training and inference.
///
/// `normalize(normalize(x)) == normalize(x)` holds for every input: none of the
/// rewrites can produce text that a later pass would match again.
use std::sync::LazyLock;

use regex::Regex;

static COMMENT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"//.*|/\*[\s\S]*?\*/").expect("valid comment regex"));

static WHITESPACE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

// require('./x') / require("x")
static REQUIRE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"require\(\s*['"][\w\-/\.@]+['"]\s*\)"#).expect("valid require regex")
});

// import('./x')
static DYNAMIC_IMPORT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"import\(\s*['"][\w\-/\.@]+['"]\s*\)"#).expect("valid import regex")
});

// import x from './x'
static FROM_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\bfrom\s*['"][\w\-/\.@]+['"]"#).expect("valid from regex")
});

/// Placeholder substituted for `from '<module>'`.
pub const MODULE_PLACEHOLDER: &str = "from MODULE";

/// Normalize a code snippet. Absent input yields the empty string.
#[must_use]
pub fn normalize(snippet: Option<&str>) -> String {
    let Some(code) = snippet else {
        return String::new();
    };

    let code = COMMENT_PATTERN.replace_all(code, "");
    let code = WHITESPACE_PATTERN.replace_all(&code, " ");
    let code = REQUIRE_PATTERN.replace_all(&code, "require()");
    let code = DYNAMIC_IMPORT_PATTERN.replace_all(&code, "import()");
    let code = FROM_PATTERN.replace_all(&code, MODULE_PLACEHOLDER);

    code.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_is_empty() {
        assert_eq!(normalize(None), "");
    }

    #[test]
    fn test_strips_line_and_block_comments() {
        let code = "let a = 1; // set a\n/* block\n comment */ let b = 2;";
        assert_eq!(normalize(Some(code)), "let a = 1; let b = 2;");
    }

    #[test]
    fn test_collapses_whitespace_and_trims() {
        assert_eq!(normalize(Some("  a\t\tb \n\n c  ")), "a b c");
    }

    #[test]
    fn test_require_paths_canonicalized() {
        let a = normalize(Some("const fs = require('fs');"));
        let b = normalize(Some("const fs = require(\"./lib/my-fs.js\");"));
        assert_eq!(a, "const fs = require();");
        assert_eq!(a, b);
    }

    #[test]
    fn test_import_forms_canonicalized() {
        let a = normalize(Some("import db from './db/client';"));
        let b = normalize(Some("import db from \"@corp/db\";"));
        assert_eq!(a, "import db from MODULE;");
        assert_eq!(a, b);
        assert_eq!(
            normalize(Some("await import('./plugin.js')")),
            "await import()"
        );
    }

    #[test]
    fn test_idempotent() {
        let samples = [
            "",
            "   ",
            "db.query(`SELECT * FROM users WHERE id=${id}`) // todo",
            "a/\n/b",
            "x /* a */ / y",
            "/ /* c */ / z",
            "const x = require('a') + require(\"b\");\n\n// end",
            "import a from 'b'; import('c'); /* unterminated",
            "url = 'http://example.com/path'",
            "line1\r\nline2\r\n",
        ];
        for s in samples {
            let once = normalize(Some(s));
            let twice = normalize(Some(&once));
            assert_eq!(once, twice, "not idempotent for {s:?}");
        }
    }
}
