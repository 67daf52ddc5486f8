//! Statement classification and the pagination rewrite.
//!
//! Only statement forms that produce a plain row set can be wrapped in an
//! outer bounded SELECT without changing their meaning. `EXPLAIN` returns
//! rows too, but wrapping it would change what is being explained, so it is
//! deliberately not in the set.

/// First tokens of statements that survive wrapping in
/// `SELECT * FROM (...) LIMIT n OFFSET m`.
const PAGINATABLE_KEYWORDS: [&str; 4] = ["SELECT", "WITH", "TABLE", "VALUES"];

/// Remove `/* ... */` block comments (non-greedy, across newlines) and
/// `--` line comments. Keeps the newline that terminates a line comment so
/// token boundaries survive.
pub fn strip_comments(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut rest = sql;
    loop {
        match (rest.find("/*"), rest.find("--")) {
            (Some(block), line) if line.map_or(true, |l| block < l) => {
                out.push_str(&rest[..block]);
                rest = match rest[block + 2..].find("*/") {
                    Some(end) => &rest[block + 2 + end + 2..],
                    // Unterminated block comment swallows the remainder.
                    None => "",
                };
            }
            (_, Some(line)) => {
                out.push_str(&rest[..line]);
                rest = match rest[line + 2..].find('\n') {
                    Some(nl) => &rest[line + 2 + nl..],
                    None => "",
                };
            }
            // `(Some(_), None)` always satisfies the first arm's guard, so
            // only the no-comment case reaches here.
            _ => {
                out.push_str(rest);
                break;
            }
        }
    }
    out
}

/// True when the statement's first non-comment token is a row-producing
/// keyword. Comments ahead of the first token never count.
pub fn can_paginate(sql: &str) -> bool {
    let stripped = strip_comments(sql.trim());
    match stripped.split_whitespace().next() {
        Some(token) => PAGINATABLE_KEYWORDS.contains(&token.to_ascii_uppercase().as_str()),
        None => false,
    }
}

/// Wrap a paginatable statement in a bounded outer SELECT. The caller
/// passes `fetch_limit = limit + 1`; the extra row is how "more rows
/// exist" is detected without a second scan.
pub fn wrap_paginated(sql: &str, fetch_limit: usize, offset: usize) -> String {
    let mut inner = sql.trim();
    while let Some(stripped) = inner.strip_suffix(';') {
        inner = stripped.trim_end();
    }
    format!(
        "SELECT * FROM ({}) AS paged_subquery LIMIT {} OFFSET {}",
        inner, fetch_limit, offset
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_is_paginatable() {
        assert!(can_paginate("SELECT 1"));
        assert!(can_paginate("  select * from t  "));
        assert!(can_paginate("WITH x AS (SELECT 1) SELECT * FROM x"));
        assert!(can_paginate("TABLE t"));
        assert!(can_paginate("VALUES (1), (2)"));
    }

    #[test]
    fn ddl_dml_and_explain_are_not() {
        assert!(!can_paginate("INSERT INTO t VALUES (1)"));
        assert!(!can_paginate("CREATE TABLE t (x INT)"));
        assert!(!can_paginate("UPDATE t SET x = 1"));
        assert!(!can_paginate("DELETE FROM t"));
        assert!(!can_paginate("EXPLAIN SELECT 1"));
        assert!(!can_paginate("DROP TABLE t"));
    }

    #[test]
    fn comments_before_first_token_are_ignored() {
        assert!(can_paginate("-- note\nSELECT 1"));
        assert!(can_paginate("/* x */ SELECT 1"));
        assert!(can_paginate("/* multi\nline */\n-- and a line\nSELECT 1"));
    }

    #[test]
    fn keyword_only_inside_comment_does_not_count() {
        assert!(!can_paginate("-- SELECT 1"));
        assert!(!can_paginate("/* SELECT 1 */"));
        assert!(!can_paginate("/* SELECT */ INSERT INTO t VALUES (1)"));
    }

    #[test]
    fn empty_and_whitespace_are_not_paginatable() {
        assert!(!can_paginate(""));
        assert!(!can_paginate("   \n\t"));
    }

    #[test]
    fn strip_comments_preserves_code() {
        assert_eq!(
            strip_comments("SELECT /* c */ 1 -- tail"),
            "SELECT  1 "
        );
        assert_eq!(strip_comments("-- only\n-- comments"), "\n");
    }

    #[test]
    fn block_comment_without_line_comment() {
        assert_eq!(strip_comments("/* a */SELECT 1"), "SELECT 1");
        assert_eq!(strip_comments("SELECT 1 /* tail */"), "SELECT 1 ");
        assert_eq!(strip_comments("SELECT /* unterminated"), "SELECT ");
    }

    #[test]
    fn wrap_builds_bounded_subquery() {
        assert_eq!(
            wrap_paginated("SELECT * FROM t", 1001, 0),
            "SELECT * FROM (SELECT * FROM t) AS paged_subquery LIMIT 1001 OFFSET 0"
        );
    }

    #[test]
    fn wrap_strips_trailing_semicolons() {
        assert_eq!(
            wrap_paginated("SELECT 1; ;\n", 11, 20),
            "SELECT * FROM (SELECT 1) AS paged_subquery LIMIT 11 OFFSET 20"
        );
    }
}
