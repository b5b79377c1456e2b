//! Ordered route table
//!
//! Every query key is matched against the rules top to bottom and the first
//! match wins. Keys routinely satisfy several predicates at once (a key with
//! both `"settings"` and `"prod"`, or `"prod"` and `"entities"`), so the
//! order of [`RouteTable::standard`] is the routing contract.

use std::fmt;

use serde::Serialize;

use crate::backend::BackendKind;
use crate::key::QueryKey;

/// Marker placed in keys that must be served by the staged (production) API
pub const PROD_MARKER: &str = "prod";
/// Prefix of streaming paths on the staged backend
pub const STREAM_PREFIX: &str = "sse/";

/// Configuration the predicates depend on
#[derive(Debug, Clone, Default)]
pub struct RouteContext {
    /// Local deployment flag
    pub local: bool,
    /// First-token prefixes served by the mocked backend
    pub mocked_prefixes: Vec<String>,
}

impl RouteContext {
    pub fn new(local: bool, mocked_prefixes: Vec<String>) -> Self {
        Self {
            local,
            mocked_prefixes,
        }
    }

    /// Whether the key's first token starts with a mocked endpoint prefix
    pub fn is_mocked(&self, key: &QueryKey) -> bool {
        let first = key.first();
        self.mocked_prefixes
            .iter()
            .any(|prefix| !prefix.is_empty() && first.starts_with(prefix.as_str()))
    }
}

/// Condition a key must satisfy for a rule to apply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predicate {
    /// First token has a mocked prefix, or local mode and the key has `"prod"`
    MockedOrLocalProd,
    /// Key contains the token
    Contains(&'static str),
    /// Key contains every token
    ContainsAll(&'static [&'static str]),
    /// First token contains the substring
    FirstTokenContains(&'static str),
    Always,
}

impl Predicate {
    pub fn matches(&self, key: &QueryKey, ctx: &RouteContext) -> bool {
        match self {
            Predicate::MockedOrLocalProd => {
                ctx.is_mocked(key) || (ctx.local && key.contains(PROD_MARKER))
            }
            Predicate::Contains(marker) => key.contains(marker),
            Predicate::ContainsAll(markers) => key.contains_all(markers),
            Predicate::FirstTokenContains(needle) => key.first().contains(needle),
            Predicate::Always => true,
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::MockedOrLocalProd => {
                write!(f, "mocked prefix, or local and \"{}\"", PROD_MARKER)
            }
            Predicate::Contains(marker) => write!(f, "contains \"{}\"", marker),
            Predicate::ContainsAll(markers) => {
                let quoted: Vec<String> = markers.iter().map(|m| format!("\"{}\"", m)).collect();
                write!(f, "contains {}", quoted.join(" + "))
            }
            Predicate::FirstTokenContains(needle) => {
                write!(f, "first token contains \"{}\"", needle)
            }
            Predicate::Always => f.write_str("always"),
        }
    }
}

/// How the POST body is built from the key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyShape {
    /// `{<field>: key[1]}`
    Field(&'static str),
    /// `{regex: key[1], examples: true}`
    RegexExamples,
}

impl BodyShape {
    /// Build the body. An absent `key[1]` leaves its field out.
    pub fn build(&self, key: &QueryKey) -> serde_json::Value {
        let mut body = serde_json::Map::new();
        let argument = key.get(1).map(|t| t.to_json());
        match self {
            BodyShape::Field(field) => {
                if let Some(value) = argument {
                    body.insert((*field).to_string(), value);
                }
            }
            BodyShape::RegexExamples => {
                if let Some(value) = argument {
                    body.insert("regex".into(), value);
                }
                body.insert("examples".into(), serde_json::Value::Bool(true));
            }
        }
        serde_json::Value::Object(body)
    }
}

/// Outgoing request shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestShape {
    /// `GET <first>`
    Get,
    /// `POST <first>` with a JSON body
    Post(BodyShape),
    /// `GET sse/<first>` as an event stream
    Stream,
}

impl RequestShape {
    pub fn method(&self) -> &'static str {
        match self {
            RequestShape::Get | RequestShape::Stream => "GET",
            RequestShape::Post(_) => "POST",
        }
    }

    pub fn path(&self, key: &QueryKey) -> String {
        match self {
            RequestShape::Stream => format!("{}{}", STREAM_PREFIX, key.first()),
            _ => key.first(),
        }
    }
}

/// How the response is turned into the payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Unwrap {
    /// Take `body.response`
    Envelope,
    /// Key-tag stage: `"entities"` takes `body.response`, `"regexes"` takes
    /// `body.response.regexes`, anything else returns the body unchanged
    Tagged,
    /// Raw event stream handle
    Stream,
}

impl fmt::Display for Unwrap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Unwrap::Envelope => "response",
            Unwrap::Tagged => "by key tag",
            Unwrap::Stream => "stream",
        })
    }
}

/// One rule of the table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub name: &'static str,
    pub predicate: Predicate,
    pub backend: BackendKind,
    pub request: RequestShape,
    pub unwrap: Unwrap,
}

impl Route {
    const fn new(
        name: &'static str,
        predicate: Predicate,
        backend: BackendKind,
        request: RequestShape,
        unwrap: Unwrap,
    ) -> Self {
        Self {
            name,
            predicate,
            backend,
            request,
            unwrap,
        }
    }

    /// Resource-specific POST on the primary API
    const fn resource_post(name: &'static str, marker: &'static str, field: &'static str) -> Self {
        Self::new(
            name,
            Predicate::Contains(marker),
            BackendKind::Primary,
            RequestShape::Post(BodyShape::Field(field)),
            Unwrap::Envelope,
        )
    }
}

const STANDARD_ROUTES: &[Route] = &[
    Route::new(
        "mocked",
        Predicate::MockedOrLocalProd,
        BackendKind::Mocked,
        RequestShape::Get,
        Unwrap::Envelope,
    ),
    Route::new(
        "settings",
        Predicate::Contains("settings"),
        BackendKind::Staged,
        RequestShape::Get,
        Unwrap::Tagged,
    ),
    Route::new(
        "active-chats-stream",
        Predicate::ContainsAll(&[PROD_MARKER, "cs-get-all-active-chats"]),
        BackendKind::Staged,
        RequestShape::Stream,
        Unwrap::Stream,
    ),
    Route::new(
        "prod",
        Predicate::Contains(PROD_MARKER),
        BackendKind::Staged,
        RequestShape::Get,
        Unwrap::Tagged,
    ),
    Route::new(
        "auth",
        Predicate::FirstTokenContains("auth"),
        BackendKind::Auth,
        RequestShape::Get,
        Unwrap::Tagged,
    ),
    Route::new(
        "regex-examples",
        Predicate::ContainsAll(&["regex", "examples"]),
        BackendKind::Primary,
        RequestShape::Post(BodyShape::RegexExamples),
        Unwrap::Envelope,
    ),
    Route::resource_post("slot-by-id", "slots/slotById", "slot"),
    Route::resource_post("form-by-id", "forms/formById", "form"),
    Route::resource_post("story-by-name", "story-by-name", "story"),
    Route::resource_post("rule-by-name", "rule-by-name", "rule"),
    Route::resource_post("intents-report", "intents-report", "id"),
    Route::new(
        "default",
        Predicate::Always,
        BackendKind::Primary,
        RequestShape::Get,
        Unwrap::Tagged,
    ),
];

/// Immutable ordered list of rules
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: &'static [Route],
}

impl RouteTable {
    /// The console's routing table
    pub fn standard() -> Self {
        Self {
            routes: STANDARD_ROUTES,
        }
    }

    /// First rule matching the key. The table ends in an `Always` rule,
    /// so every key routes.
    pub fn select(&self, key: &QueryKey, ctx: &RouteContext) -> &'static Route {
        self.routes
            .iter()
            .find(|route| route.predicate.matches(key, ctx))
            .or_else(|| self.routes.last())
            .expect("route table ends with a catch-all rule")
    }

    pub fn routes(&self) -> &'static [Route] {
        self.routes
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn select(key: &[&str], ctx: &RouteContext) -> &'static str {
        RouteTable::standard()
            .select(&QueryKey::from(key.to_vec()), ctx)
            .name
    }

    fn remote() -> RouteContext {
        RouteContext::default()
    }

    #[test]
    fn test_table_ends_with_catch_all() {
        let routes = RouteTable::standard().routes();
        assert_eq!(routes.last().unwrap().predicate, Predicate::Always);
        assert!(routes[..routes.len() - 1]
            .iter()
            .all(|r| r.predicate != Predicate::Always));
    }

    #[test]
    fn test_route_names_are_unique() {
        let routes = RouteTable::standard().routes();
        let mut names: Vec<_> = routes.iter().map(|r| r.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), routes.len());
    }

    #[test]
    fn test_mocked_prefix_wins_over_everything() {
        let ctx = RouteContext::new(false, vec!["fixtures/".into()]);
        assert_eq!(select(&["fixtures/intents", "settings", "prod"], &ctx), "mocked");
        assert_eq!(select(&["fixtures/auth"], &ctx), "mocked");
        assert_eq!(select(&["fixtures/x", "regex", "examples"], &ctx), "mocked");
    }

    #[test]
    fn test_mocked_prefix_only_tests_first_token() {
        let ctx = RouteContext::new(false, vec!["fixtures/".into()]);
        assert_eq!(select(&["intents", "fixtures/intents"], &ctx), "default");
    }

    #[test]
    fn test_empty_prefix_is_ignored() {
        let ctx = RouteContext::new(false, vec![String::new()]);
        assert_eq!(select(&["intents"], &ctx), "default");
    }

    #[test]
    fn test_local_prod_goes_to_mocked() {
        let local = RouteContext::new(true, vec![]);
        assert_eq!(select(&["cs-get-all-active-chats", "prod"], &local), "mocked");
        assert_eq!(select(&["intents"], &local), "default");
        assert_eq!(select(&["intents", "prod"], &remote()), "prod");
    }

    #[test]
    fn test_settings_precedes_prod() {
        assert_eq!(select(&["bot-settings", "settings", "prod"], &remote()), "settings");
    }

    #[test]
    fn test_active_chats_stream_needs_prod() {
        assert_eq!(
            select(&["cs-get-all-active-chats", "prod"], &remote()),
            "active-chats-stream"
        );
        assert_eq!(select(&["cs-get-all-active-chats"], &remote()), "default");
    }

    #[test]
    fn test_prod_precedes_auth_and_resources() {
        assert_eq!(select(&["auth/me", "prod"], &remote()), "prod");
        assert_eq!(select(&["slots/slotById", "x", "prod"], &remote()), "prod");
        assert_eq!(select(&["entities", "prod"], &remote()), "prod");
    }

    #[test]
    fn test_auth_is_substring_of_first_token() {
        assert_eq!(select(&["auth/me"], &remote()), "auth");
        assert_eq!(select(&["users/authority"], &remote()), "auth");
        assert_eq!(select(&["users", "auth"], &remote()), "default");
    }

    #[test]
    fn test_regex_examples_needs_both_markers() {
        assert_eq!(select(&["regex", "[a-z]+", "examples"], &remote()), "regex-examples");
        assert_eq!(select(&["regex", "[a-z]+"], &remote()), "default");
    }

    #[test]
    fn test_secondary_resource_rules() {
        assert_eq!(select(&["slots/slotById", "greet_slot"], &remote()), "slot-by-id");
        assert_eq!(select(&["forms/formById", "f1"], &remote()), "form-by-id");
        assert_eq!(select(&["story-by-name", "happy"], &remote()), "story-by-name");
        assert_eq!(select(&["rule-by-name", "r"], &remote()), "rule-by-name");
        assert_eq!(select(&["intents-report", "9"], &remote()), "intents-report");
        assert_eq!(select(&["unknown-resource"], &remote()), "default");
    }

    #[test]
    fn test_empty_key_routes_to_default() {
        assert_eq!(select(&[], &remote()), "default");
    }

    #[test]
    fn test_field_body() {
        let key = QueryKey::from(["slots/slotById", "greet_slot"]);
        assert_eq!(BodyShape::Field("slot").build(&key), json!({"slot": "greet_slot"}));
    }

    #[test]
    fn test_field_body_keeps_token_type() {
        let key = QueryKey::from_json(r#"["intents-report", 12]"#).unwrap();
        assert_eq!(BodyShape::Field("id").build(&key), json!({"id": 12}));
    }

    #[test]
    fn test_field_body_without_argument() {
        let key = QueryKey::from(["forms/formById"]);
        assert_eq!(BodyShape::Field("form").build(&key), json!({}));
    }

    #[test]
    fn test_regex_examples_body() {
        let key = QueryKey::from(["regex", "[a-z]+", "examples"]);
        assert_eq!(
            BodyShape::RegexExamples.build(&key),
            json!({"regex": "[a-z]+", "examples": true})
        );
    }

    #[test]
    fn test_stream_path() {
        let key = QueryKey::from(["cs-get-all-active-chats", "prod"]);
        assert_eq!(RequestShape::Stream.path(&key), "sse/cs-get-all-active-chats");
        assert_eq!(RequestShape::Get.path(&key), "cs-get-all-active-chats");
        assert_eq!(RequestShape::Stream.method(), "GET");
    }

    #[test]
    fn test_predicate_display() {
        assert_eq!(
            Predicate::ContainsAll(&["regex", "examples"]).to_string(),
            "contains \"regex\" + \"examples\""
        );
        assert_eq!(
            Predicate::FirstTokenContains("auth").to_string(),
            "first token contains \"auth\""
        );
    }
}
