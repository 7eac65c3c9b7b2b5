//! Response extraction
//!
//! Recovers the artifact from a raw model response. The first fenced block
//! tagged with one of the expected languages wins; without one, the whole
//! response is used with fence delimiters removed.

use regex::Regex;

pub const SQL_TAGS: &[&str] = &["sql"];
pub const JAVASCRIPT_TAGS: &[&str] = &["javascript", "js"];

const FENCE: &str = "```";

/// Extract the artifact text from `raw` for the given language tags
pub fn extract_fenced(raw: &str, tags: &[&str]) -> String {
    let tag_group = tags
        .iter()
        .map(|t| regex::escape(t))
        .collect::<Vec<_>>()
        .join("|");

    if !tags.is_empty() {
        if let Ok(re) = Regex::new(&format!(r"(?s)```(?i:{})\b(.*?)```", tag_group)) {
            if let Some(block) = re.captures(raw).and_then(|c| c.get(1)) {
                return block.as_str().trim().to_string();
            }
        }
    }

    // No tagged block: drop delimiters (with an expected tag glued to an opening one)
    let without_tagged = if tags.is_empty() {
        raw.to_string()
    } else if let Ok(re) = Regex::new(&format!(r"```(?i:{})\b", tag_group)) {
        re.replace_all(raw, "").into_owned()
    } else {
        raw.to_string()
    };

    without_tagged.replace(FENCE, "").trim().to_string()
}

/// SQL artifacts additionally lose trailing statement terminators
pub fn clean_sql(raw: &str) -> String {
    extract_fenced(raw, SQL_TAGS)
        .trim_end_matches(|c: char| c == ';' || c.is_whitespace())
        .to_string()
}

pub fn extract_javascript(raw: &str) -> String {
    extract_fenced(raw, JAVASCRIPT_TAGS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fenced_sql_with_chatter() {
        let raw = "Here:\n```sql\nSELECT 1;\n```";
        assert_eq!(extract_fenced(raw, SQL_TAGS), "SELECT 1;");
        assert_eq!(clean_sql(raw), "SELECT 1");
    }

    #[test]
    fn test_first_block_wins() {
        let raw = "First:\n```sql\n  SELECT a FROM t\n```\nOr maybe:\n```sql\nSELECT b FROM t\n```";
        assert_eq!(extract_fenced(raw, SQL_TAGS), "SELECT a FROM t");
    }

    #[test]
    fn test_fallback_strips_delimiters_only() {
        let raw = "```\nSELECT * FROM t\n```";
        assert_eq!(extract_fenced(raw, SQL_TAGS), "SELECT * FROM t");

        let raw = "  SELECT count(*) FROM t  ";
        assert_eq!(extract_fenced(raw, SQL_TAGS), "SELECT count(*) FROM t");

        // Explanatory text is not dropped beyond trimming
        let raw = "The answer is SELECT 1";
        assert_eq!(extract_fenced(raw, SQL_TAGS), "The answer is SELECT 1");
    }

    #[test]
    fn test_unclosed_tagged_fence() {
        let raw = "```sql\nSELECT 2";
        assert_eq!(extract_fenced(raw, SQL_TAGS), "SELECT 2");
    }

    #[test]
    fn test_language_tag_must_match() {
        let raw = "```json\n{\"a\": 1}\n```\n```js\nvar result = 1;\n```";
        assert_eq!(extract_javascript(raw), "var result = 1;");

        let raw = "```javascript\nvar result = df.length;\n```";
        assert_eq!(extract_javascript(raw), "var result = df.length;");

        let raw = "```JavaScript\nvar result = 2;\n```";
        assert_eq!(extract_javascript(raw), "var result = 2;");
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let inputs = [
            "Here:\n```sql\nSELECT 1;\n```",
            "```\nSELECT 1\n```",
            "plain text",
            "",
            "```sql\nSELECT 1\n``` trailing ``` junk",
        ];
        for raw in inputs {
            let once = extract_fenced(raw, SQL_TAGS);
            assert_eq!(extract_fenced(&once, SQL_TAGS), once, "input: {:?}", raw);
            let cleaned = clean_sql(raw);
            assert_eq!(clean_sql(&cleaned), cleaned, "input: {:?}", raw);
        }
    }

    #[test]
    fn test_empty_response() {
        assert_eq!(clean_sql(""), "");
        assert_eq!(extract_javascript("   \n"), "");
    }
}
