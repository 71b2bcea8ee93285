//! Read/write classification of Cypher text
//!
//! A statement counts as a write when it contains a mutating clause keyword
//! outside of string literals, backtick-quoted identifiers and comments.

use regex::Regex;
use std::sync::LazyLock;

static WRITE_CLAUSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(CREATE|MERGE|SET|DELETE|REMOVE|DROP)\b")
        .expect("write clause pattern is valid")
});

/// Kind of statement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// Only reads
    Read,
    /// May mutate the graph or schema
    Write,
}

/// Classify a statement
pub fn classify(cypher: &str) -> StatementKind {
    if WRITE_CLAUSE.is_match(&strip_literals(cypher)) {
        StatementKind::Write
    } else {
        StatementKind::Read
    }
}

/// Whether a statement may mutate data
pub fn is_write(cypher: &str) -> bool {
    classify(cypher) == StatementKind::Write
}

/// Blank out quoted text and comments, keeping word boundaries intact
fn strip_literals(cypher: &str) -> String {
    let mut out = String::with_capacity(cypher.len());
    let mut chars = cypher.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\'' | '"' | '`' => {
                out.push(' ');
                let mut escaped = false;
                for inner in chars.by_ref() {
                    if escaped {
                        escaped = false;
                    } else if inner == '\\' && c != '`' {
                        escaped = true;
                    } else if inner == c {
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'/') => {
                out.push(' ');
                for inner in chars.by_ref() {
                    if inner == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                out.push(' ');
                chars.next();
                let mut prev = '\0';
                for inner in chars.by_ref() {
                    if prev == '*' && inner == '/' {
                        break;
                    }
                    prev = inner;
                }
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads() {
        assert_eq!(classify("MATCH (u:User) RETURN u"), StatementKind::Read);
        assert!(!is_write("MATCH (n) WHERE n.name = $name RETURN n.name"));
        assert!(!is_write("RETURN [1, 'two', true] AS mixed"));
    }

    #[test]
    fn test_writes_any_case() {
        assert!(is_write("MATCH (u:User {name:'Michal'}) SET u.age = 30"));
        assert!(is_write("create (n:Movie) return n"));
        assert!(is_write("MERGE (n:X)"));
        assert!(is_write("MATCH (n) DETACH DELETE n"));
        assert!(is_write("MATCH (n) REMOVE n.name"));
        assert!(is_write("DROP INDEX foo"));
    }

    #[test]
    fn test_keywords_inside_literals_are_ignored() {
        assert!(!is_write("MATCH (n) WHERE n.name = 'SET me free' RETURN n"));
        assert!(!is_write("MATCH (n) WHERE n.note = \"create \\\" delete\" RETURN n"));
        assert!(!is_write("MATCH (n:`Delete`) RETURN n"));
        assert!(!is_write("MATCH (n) // then we delete\nRETURN n"));
        assert!(!is_write("MATCH (n) /* create */ RETURN n"));
    }

    #[test]
    fn test_keyword_must_be_a_whole_word() {
        assert!(!is_write("MATCH (n) WHERE n.created = 1 RETURN n.offset"));
        assert!(!is_write("MATCH (n:Dataset) RETURN n"));
    }
}
