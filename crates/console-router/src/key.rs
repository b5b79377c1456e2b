//! Query keys
//!
//! A query key is the ordered token list callers use to say what data they
//! want. The same value is the caller's cache identity and the router's
//! input, so any change to a key's shape changes both.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{ConsoleError, Result};

/// A single primitive token of a query key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Token {
    Text(String),
    Number(serde_json::Number),
    Bool(bool),
}

impl Token {
    /// The token as text, if it is a text token
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Token::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The token as a JSON value, for building request bodies
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Token::Text(s) => serde_json::Value::String(s.clone()),
            Token::Number(n) => serde_json::Value::Number(n.clone()),
            Token::Bool(b) => serde_json::Value::Bool(*b),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Text(s) => f.write_str(s),
            Token::Number(n) => write!(f, "{}", n),
            Token::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for Token {
    fn from(s: &str) -> Self {
        Token::Text(s.to_string())
    }
}

impl From<String> for Token {
    fn from(s: String) -> Self {
        Token::Text(s)
    }
}

impl From<i64> for Token {
    fn from(n: i64) -> Self {
        Token::Number(n.into())
    }
}

impl From<bool> for Token {
    fn from(b: bool) -> Self {
        Token::Bool(b)
    }
}

/// Ordered, immutable sequence of tokens identifying a request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryKey {
    tokens: Arc<[Token]>,
}

impl QueryKey {
    pub fn new(tokens: impl IntoIterator<Item = Token>) -> Self {
        Self {
            tokens: tokens.into_iter().collect(),
        }
    }

    /// Parse a key from a JSON array of strings, numbers and booleans
    ///
    /// ```
    /// # use console_router::QueryKey;
    /// let key = QueryKey::from_json(r#"["slots/slotById", "greet_slot"]"#).unwrap();
    /// assert_eq!(key.first(), "slots/slotById");
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| ConsoleError::InvalidKey(e.to_string()))
    }

    /// First token rendered as a path. Empty keys yield `""`.
    pub fn first(&self) -> String {
        self.tokens
            .first()
            .map(|t| t.to_string())
            .unwrap_or_default()
    }

    /// Positional token
    pub fn get(&self, index: usize) -> Option<&Token> {
        self.tokens.get(index)
    }

    /// Whether any text token equals `marker`
    pub fn contains(&self, marker: &str) -> bool {
        self.tokens.iter().any(|t| t.as_str() == Some(marker))
    }

    /// Whether every marker is present
    pub fn contains_all(&self, markers: &[&str]) -> bool {
        markers.iter().all(|m| self.contains(m))
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Stable text form used as cache identity
    pub fn cache_key(&self) -> String {
        serde_json::to_string(&self.tokens).unwrap_or_default()
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, token) in self.tokens.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", token)?;
        }
        f.write_str("]")
    }
}

impl From<Vec<&str>> for QueryKey {
    fn from(tokens: Vec<&str>) -> Self {
        Self::new(tokens.into_iter().map(Token::from))
    }
}

impl<const N: usize> From<[&str; N]> for QueryKey {
    fn from(tokens: [&str; N]) -> Self {
        Self::new(tokens.into_iter().map(Token::from))
    }
}

impl From<Vec<Token>> for QueryKey {
    fn from(tokens: Vec<Token>) -> Self {
        Self::new(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_token() {
        let key = QueryKey::from(["intents", "prod"]);
        assert_eq!(key.first(), "intents");
        assert_eq!(QueryKey::new(Vec::new()).first(), "");
    }

    #[test]
    fn test_contains_matches_whole_tokens_only() {
        let key = QueryKey::from(["slots/slotById", "greet_slot"]);
        assert!(key.contains("slots/slotById"));
        assert!(!key.contains("slots"));
        assert!(!key.contains("greet"));
    }

    #[test]
    fn test_contains_ignores_non_text_tokens() {
        let key = QueryKey::new(vec![Token::from("stories"), Token::from(7i64), Token::from(true)]);
        assert!(!key.contains("7"));
        assert!(!key.contains("true"));
    }

    #[test]
    fn test_contains_all() {
        let key = QueryKey::from(["regex", "[a-z]+", "examples"]);
        assert!(key.contains_all(&["regex", "examples"]));
        assert!(!key.contains_all(&["regex", "entities"]));
    }

    #[test]
    fn test_from_json_mixed_tokens() {
        let key = QueryKey::from_json(r#"["intents-report", 42, false]"#).unwrap();
        assert_eq!(key.len(), 3);
        assert_eq!(key.get(1), Some(&Token::from(42i64)));
        assert_eq!(key.get(2), Some(&Token::Bool(false)));
    }

    #[test]
    fn test_from_json_rejects_nested_values() {
        let err = QueryKey::from_json(r#"["forms", {"id": 1}]"#).unwrap_err();
        assert!(matches!(err, ConsoleError::InvalidKey(_)));
    }

    #[test]
    fn test_cache_key_is_stable() {
        let a = QueryKey::from(["rules", "prod"]);
        let b = QueryKey::from_json(r#"["rules","prod"]"#).unwrap();
        assert_eq!(a.cache_key(), b.cache_key());
        assert_eq!(a.cache_key(), r#"["rules","prod"]"#);
    }

    #[test]
    fn test_display() {
        let key = QueryKey::new(vec![Token::from("forms/formById"), Token::from(3i64)]);
        assert_eq!(key.to_string(), "[forms/formById, 3]");
    }
}
