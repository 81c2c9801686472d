/// Keyword-driven numeric features over the raw (pre-normalization) snippet.
use serde::{Deserialize, Serialize};

use super::NUMERIC_COLUMNS;

const USER_INPUT_KEYWORDS: &[&str] = &["req.", "input", "param", "query", "body"];
const DB_KEYWORDS: &[&str] = &["query", "exec", "select", "insert", "update", "complete"];
const FILE_KEYWORDS: &[&str] = &["readfile", "writefile", "open", "fs."];
const EVAL_KEYWORDS: &[&str] = &["exec", "eval", "system", "shell"];
const VALIDATION_KEYWORDS: &[&str] = &["validate", "sanitize", "escape", "filter"];
const QUOTE_MARKERS: &[&str] = &["'", "\""];
const CONCAT_MARKERS: &[&str] = &["+", "${", "%s"];

/// The eight numeric columns of a feature row, by name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordFeatures {
    pub has_user_input: bool,
    pub has_db_operation: bool,
    pub has_file_operation: bool,
    pub has_eval: bool,
    pub code_length: usize,
    pub has_validation: bool,
    pub has_quotes: bool,
    pub has_concatenation: bool,
}

impl KeywordFeatures {
    /// Values in [`super::FEATURE_COLUMNS`] order.
    #[must_use]
    pub fn values(&self) -> [f32; NUMERIC_COLUMNS] {
        [
            flag(self.has_user_input),
            flag(self.has_db_operation),
            flag(self.has_file_operation),
            flag(self.has_eval),
            self.code_length as f32,
            flag(self.has_validation),
            flag(self.has_quotes),
            flag(self.has_concatenation),
        ]
    }
}

fn flag(b: bool) -> f32 {
    if b { 1.0 } else { 0.0 }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// Extract keyword features. Absent input yields `None`; callers substitute
/// [`KeywordFeatures::default`].
#[must_use]
pub fn extract(snippet: Option<&str>) -> Option<KeywordFeatures> {
    let raw = snippet?;
    let code = raw.to_lowercase();

    Some(KeywordFeatures {
        has_user_input: contains_any(&code, USER_INPUT_KEYWORDS),
        has_db_operation: contains_any(&code, DB_KEYWORDS),
        has_file_operation: contains_any(&code, FILE_KEYWORDS),
        has_eval: contains_any(&code, EVAL_KEYWORDS),
        code_length: raw.chars().count(),
        has_validation: contains_any(&code, VALIDATION_KEYWORDS),
        has_quotes: contains_any(&code, QUOTE_MARKERS),
        has_concatenation: contains_any(&code, CONCAT_MARKERS),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_yields_none() {
        assert_eq!(extract(None), None);
        assert_eq!(extract(None).unwrap_or_default(), KeywordFeatures::default());
    }

    #[test]
    fn test_sql_snippet() {
        let f = extract(Some("db.query(`SELECT * FROM users WHERE id=${id}`)")).unwrap();
        assert!(f.has_user_input, "query counts as user input");
        assert!(f.has_db_operation);
        assert!(!f.has_file_operation);
        assert!(!f.has_eval);
        assert!(!f.has_validation);
        assert!(!f.has_quotes);
        assert!(f.has_concatenation, "template interpolation counts");
        assert_eq!(f.code_length, 46);
    }

    #[test]
    fn test_case_insensitive() {
        let f = extract(Some("FS.ReadFile(PATH); EVAL(x); Sanitize(y)")).unwrap();
        assert!(f.has_file_operation);
        assert!(f.has_eval);
        assert!(f.has_validation);
    }

    #[test]
    fn test_concatenation_markers() {
        assert!(extract(Some("a + b")).unwrap().has_concatenation);
        assert!(extract(Some("printf(\"%s\", x)")).unwrap().has_concatenation);
        assert!(!extract(Some("a - b")).unwrap().has_concatenation);
    }

    #[test]
    fn test_code_length_counts_raw_chars() {
        let f = extract(Some("  é // comment ")).unwrap();
        assert_eq!(f.code_length, 15);
    }

    #[test]
    fn test_deterministic() {
        let s = "res.send('<b>' + req.body.name + '</b>')";
        let a = extract(Some(s)).unwrap();
        let b = extract(Some(s)).unwrap();
        assert_eq!(a, b);
        let (va, vb) = (a.values(), b.values());
        assert!(va.iter().zip(vb.iter()).all(|(x, y)| x.to_bits() == y.to_bits()));
    }

    #[test]
    fn test_values_order() {
        let f = KeywordFeatures {
            has_eval: true,
            code_length: 12,
            has_concatenation: true,
            ..Default::default()
        };
        assert_eq!(f.values(), [0.0, 0.0, 0.0, 1.0, 12.0, 0.0, 0.0, 1.0]);
    }
}
