//! Keyword-based parsing of user replies
//!
//! Matching is deliberately crude: case-insensitive substring checks over a
//! small vocabulary, first match wins. It is the fallback path; the agent
//! normally reads the same presentation and decides for itself. There is no
//! negation handling ("not yes" still matches "yes").

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CheckpointError;
use crate::stage::CheckpointName;

static ROUTE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)route\s+(\d+|[a-z]+)").expect("route pattern is a valid regex"));

const CONFIRM_WORDS: &[&str] = &["yes", "confirm", "correct", "proceed"];
const MORE_WORDS: &[&str] = &["more", "additional"];
const LOOKS_GOOD_WORDS: &[&str] = &["looks good", "approve", "yes"];
const APPROVE_WORDS: &[&str] = &["approve", "yes", "generate", "looks good"];
const CHANGE_WORDS: &[&str] = &["change", "adjust", "modify"];

/// What the user wants to do at a checkpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CheckpointAction {
    Confirm,
    Clarify,
    Select,
    Refine,
    Approve,
    RequestMore,
}

impl std::fmt::Display for CheckpointAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Confirm => write!(f, "confirm"),
            Self::Clarify => write!(f, "clarify"),
            Self::Select => write!(f, "select"),
            Self::Refine => write!(f, "refine"),
            Self::Approve => write!(f, "approve"),
            Self::RequestMore => write!(f, "requestMore"),
        }
    }
}

/// Extra data attached to a parsed reply
///
/// Serializes as `{"response": "..."}` or `{"routeId": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResponseDetails {
    /// The raw reply, unmodified
    Response(String),
    /// Route number or name the user picked
    RouteId(String),
}

/// Structured result of a checkpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointResponse {
    pub action: CheckpointAction,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<ResponseDetails>,
}

impl CheckpointResponse {
    pub fn new(action: CheckpointAction) -> Self {
        Self { action, details: None }
    }

    fn with_response(action: CheckpointAction, raw: &str) -> Self {
        Self {
            action,
            details: Some(ResponseDetails::Response(raw.to_string())),
        }
    }

    fn select(route_id: &str) -> Self {
        Self {
            action: CheckpointAction::Select,
            details: Some(ResponseDetails::RouteId(route_id.to_string())),
        }
    }

    /// Raw reply carried by clarify/refine/requestMore responses
    pub fn raw_response(&self) -> Option<&str> {
        match &self.details {
            Some(ResponseDetails::Response(raw)) => Some(raw),
            _ => None,
        }
    }

    pub fn route_id(&self) -> Option<&str> {
        match &self.details {
            Some(ResponseDetails::RouteId(id)) => Some(id),
            _ => None,
        }
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

/// Map a raw reply at the given checkpoint to a structured response
pub fn parse_response(checkpoint: CheckpointName, raw: &str) -> CheckpointResponse {
    let lower = raw.trim().to_lowercase();
    debug!(%checkpoint, reply_len = raw.len(), "parse_response: called");

    let response = match checkpoint {
        CheckpointName::ConfirmIntent => {
            if contains_any(&lower, CONFIRM_WORDS) {
                CheckpointResponse::new(CheckpointAction::Confirm)
            } else {
                CheckpointResponse::with_response(CheckpointAction::Clarify, raw)
            }
        }
        CheckpointName::PresentFindings => {
            if contains_any(&lower, MORE_WORDS) {
                CheckpointResponse::with_response(CheckpointAction::RequestMore, raw)
            } else {
                CheckpointResponse::new(CheckpointAction::Confirm)
            }
        }
        CheckpointName::SelectRoute => parse_route_selection(raw),
        CheckpointName::RefineRoute => {
            if contains_any(&lower, LOOKS_GOOD_WORDS) {
                CheckpointResponse::new(CheckpointAction::Confirm)
            } else {
                // Change words and anything unrecognized both mean "refine"
                CheckpointResponse::with_response(CheckpointAction::Refine, raw)
            }
        }
        CheckpointName::PresentFinal => {
            if contains_any(&lower, APPROVE_WORDS) {
                CheckpointResponse::new(CheckpointAction::Approve)
            } else if contains_any(&lower, CHANGE_WORDS) {
                CheckpointResponse::with_response(CheckpointAction::Refine, raw)
            } else {
                CheckpointResponse::with_response(CheckpointAction::Clarify, raw)
            }
        }
    };

    debug!(action = %response.action, "parse_response: parsed");
    response
}

/// Like [`parse_response`], resolving the checkpoint from its name first
pub fn parse_response_named(checkpoint: &str, raw: &str) -> Result<CheckpointResponse, CheckpointError> {
    let name: CheckpointName = checkpoint.parse()?;
    Ok(parse_response(name, raw))
}

fn parse_route_selection(raw: &str) -> CheckpointResponse {
    if let Some(id) = ROUTE_PATTERN.captures(raw).and_then(|caps| caps.get(1)) {
        debug!(route_id = id.as_str(), "parse_route_selection: matched route pattern");
        return CheckpointResponse::select(id.as_str());
    }

    let trimmed = raw.trim();
    if !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit()) {
        debug!(route_id = trimmed, "parse_route_selection: bare number");
        return CheckpointResponse::select(trimmed);
    }

    CheckpointResponse::with_response(CheckpointAction::Clarify, raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confirm_intent_yes() {
        let response = parse_response(CheckpointName::ConfirmIntent, "yes");
        assert_eq!(response, CheckpointResponse::new(CheckpointAction::Confirm));
    }

    #[test]
    fn test_confirm_intent_keywords_case_insensitive() {
        for reply in ["Correct!", "PROCEED please", "I confirm", "  Yes  "] {
            assert_eq!(
                parse_response(CheckpointName::ConfirmIntent, reply).action,
                CheckpointAction::Confirm,
                "reply: {}",
                reply
            );
        }
    }

    #[test]
    fn test_confirm_intent_clarify_keeps_raw_reply() {
        let reply = "Actually, I want to avoid Highway 1";
        let response = parse_response(CheckpointName::ConfirmIntent, reply);
        assert_eq!(response.action, CheckpointAction::Clarify);
        assert_eq!(response.raw_response(), Some(reply));
    }

    #[test]
    fn test_no_negation_handling() {
        let response = parse_response(CheckpointName::ConfirmIntent, "not yes");
        assert_eq!(response.action, CheckpointAction::Confirm);
    }

    #[test]
    fn test_present_findings() {
        let more = parse_response(CheckpointName::PresentFindings, "Can you research more about water stops?");
        assert_eq!(more.action, CheckpointAction::RequestMore);
        assert!(more.raw_response().is_some());

        let additional = parse_response(CheckpointName::PresentFindings, "Any additional climbs?");
        assert_eq!(additional.action, CheckpointAction::RequestMore);

        let proceed = parse_response(CheckpointName::PresentFindings, "looks good, proceed");
        assert_eq!(proceed, CheckpointResponse::new(CheckpointAction::Confirm));
    }

    #[test]
    fn test_select_route_by_number() {
        let response = parse_response(CheckpointName::SelectRoute, "2");
        assert_eq!(response.action, CheckpointAction::Select);
        assert_eq!(response.route_id(), Some("2"));

        let padded = parse_response(CheckpointName::SelectRoute, " 3 \n");
        assert_eq!(padded.route_id(), Some("3"));
    }

    #[test]
    fn test_select_route_by_phrase() {
        let response = parse_response(CheckpointName::SelectRoute, "I'd like route 1 please");
        assert_eq!(response.route_id(), Some("1"));

        let named = parse_response(CheckpointName::SelectRoute, "Route coastal sounds fun");
        assert_eq!(named.route_id(), Some("coastal"));
    }

    #[test]
    fn test_select_route_phrase_beats_bare_number() {
        let response = parse_response(CheckpointName::SelectRoute, "ROUTE 12");
        assert_eq!(response.route_id(), Some("12"));
    }

    #[test]
    fn test_select_route_unrecognized() {
        let response = parse_response(CheckpointName::SelectRoute, "the mountain one");
        assert_eq!(response.action, CheckpointAction::Clarify);
        assert_eq!(response.raw_response(), Some("the mountain one"));

        let mixed = parse_response(CheckpointName::SelectRoute, "2 or 3");
        assert_eq!(mixed.action, CheckpointAction::Clarify);
    }

    #[test]
    fn test_refine_route() {
        assert_eq!(
            parse_response(CheckpointName::RefineRoute, "Looks good to me").action,
            CheckpointAction::Confirm
        );

        let change = parse_response(CheckpointName::RefineRoute, "Change the lunch stop");
        assert_eq!(change.action, CheckpointAction::Refine);
        assert_eq!(change.raw_response(), Some("Change the lunch stop"));

        let other = parse_response(CheckpointName::RefineRoute, "hmm, what about the fog?");
        assert_eq!(other.action, CheckpointAction::Refine);
    }

    #[test]
    fn test_present_final() {
        for reply in ["approve", "Yes!", "generate it", "looks good"] {
            assert_eq!(
                parse_response(CheckpointName::PresentFinal, reply),
                CheckpointResponse::new(CheckpointAction::Approve)
            );
        }

        let adjust = parse_response(CheckpointName::PresentFinal, "please adjust the start time");
        assert_eq!(adjust.action, CheckpointAction::Refine);

        let unclear = parse_response(CheckpointName::PresentFinal, "how long will it take?");
        assert_eq!(unclear.action, CheckpointAction::Clarify);
    }

    #[test]
    fn test_parse_response_named() {
        let response = parse_response_named("selectRoute", "route 2").unwrap();
        assert_eq!(response.route_id(), Some("2"));

        assert!(matches!(
            parse_response_named("chooseRoute", "route 2"),
            Err(CheckpointError::UnknownCheckpoint(_))
        ));
    }

    #[test]
    fn test_response_json_shape() {
        let select = parse_response(CheckpointName::SelectRoute, "2");
        assert_eq!(
            serde_json::to_value(&select).unwrap(),
            serde_json::json!({"action": "select", "details": {"routeId": "2"}})
        );

        let more = parse_response(CheckpointName::PresentFindings, "more please");
        assert_eq!(
            serde_json::to_value(&more).unwrap(),
            serde_json::json!({"action": "requestMore", "details": {"response": "more please"}})
        );

        let confirm = parse_response(CheckpointName::ConfirmIntent, "yes");
        assert_eq!(serde_json::to_value(&confirm).unwrap(), serde_json::json!({"action": "confirm"}));
    }
}
