//! Checkpoint payload records
//!
//! Plain data describing what gets presented at each stage. Field names
//! serialize in camelCase because these records travel through agent tool
//! calls as JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::stage::WorkflowStage;

/// Structured form of the user's route request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedQuery {
    /// Place names, in the order the user gave them
    #[serde(default)]
    pub destinations: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<DistanceRange>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<Constraints>,

    /// Free-text reference to a past activity ("like my Saturday ride")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

impl ParsedQuery {
    pub fn new(destinations: Vec<String>) -> Self {
        Self {
            destinations,
            ..Default::default()
        }
    }

    pub fn with_distance(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.distance = Some(DistanceRange { min, max });
        self
    }
}

/// Distance range in miles; either bound may be missing
///
/// `min > max` is not rejected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DistanceRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Constraints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub must_visit: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avoid: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surface_preferences: Option<Vec<String>>,
}

/// Research skill the agent can invoke
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Skill {
    History,
    Climb,
    Weather,
    Stops,
    Route,
    Safety,
    Nutrition,
    Clothing,
}

impl Skill {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::History => "history",
            Self::Climb => "climb",
            Self::Weather => "weather",
            Self::Stops => "stops",
            Self::Route => "route",
            Self::Safety => "safety",
            Self::Nutrition => "nutrition",
            Self::Clothing => "clothing",
        }
    }
}

impl std::fmt::Display for Skill {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which skills a query needs; a missing skill means "not needed"
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SkillsNeeded(BTreeMap<Skill, bool>);

impl SkillsNeeded {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set a flag
    pub fn with(mut self, skill: Skill, needed: bool) -> Self {
        self.0.insert(skill, needed);
        self
    }

    pub fn is_needed(&self, skill: Skill) -> bool {
        self.0.get(&skill).copied().unwrap_or(false)
    }

    /// Skills flagged as needed, in canonical skill order
    pub fn active(&self) -> Vec<Skill> {
        self.0
            .iter()
            .filter(|(_, needed)| **needed)
            .map(|(skill, _)| *skill)
            .collect()
    }
}

impl FromIterator<(Skill, bool)> for SkillsNeeded {
    fn from_iter<I: IntoIterator<Item = (Skill, bool)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Output of one research skill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillResult {
    pub skill_name: String,

    /// Human-readable summary shown to the user
    pub summary: String,

    /// Opaque structured payload from the skill
    #[serde(default)]
    pub data: serde_json::Value,
}

impl SkillResult {
    pub fn new(skill_name: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            skill_name: skill_name.into(),
            summary: summary.into(),
            data: serde_json::Value::Object(Default::default()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StopKind {
    Cafe,
    Water,
    Viewpoint,
}

impl std::fmt::Display for StopKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cafe => write!(f, "cafe"),
            Self::Water => write!(f, "water"),
            Self::Viewpoint => write!(f, "viewpoint"),
        }
    }
}

/// A named stop along a route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    #[serde(rename = "type")]
    pub kind: StopKind,
    pub name: String,
    pub location: String,
}

/// One proposed route option
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteCandidate {
    /// Unique among the candidates of a plan
    pub id: String,
    pub name: String,

    /// Miles
    pub distance: f64,

    /// Feet of climbing
    pub elevation: f64,

    #[serde(default)]
    pub highlights: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stops: Option<Vec<Stop>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warnings: Option<Vec<String>>,
}

impl RouteCandidate {
    pub fn new(id: impl Into<String>, name: impl Into<String>, distance: f64, elevation: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            distance,
            elevation,
            highlights: Vec::new(),
            stops: None,
            warnings: None,
        }
    }

    pub fn with_highlights(mut self, highlights: Vec<String>) -> Self {
        self.highlights = highlights;
        self
    }
}

/// Fueling schedule for a refined route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutritionPlan {
    /// Total calories for the ride
    pub calories: u32,
    #[serde(default)]
    pub stops: Vec<IntakeStop>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntakeStop {
    pub time: String,
    pub intake: String,
}

/// A selected candidate after refinement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefinedRoute {
    #[serde(flatten)]
    pub route: RouteCandidate,

    /// Adjustments applied to the candidate (may be empty)
    pub adjustments: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nutrition_plan: Option<NutritionPlan>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clothing_recommendations: Option<Vec<String>>,
}

impl RefinedRoute {
    pub fn new(route: RouteCandidate, adjustments: Vec<String>) -> Self {
        Self {
            route,
            adjustments,
            nutrition_plan: None,
            clothing_recommendations: None,
        }
    }
}

/// User comment recorded against the stage it was made at
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackEntry {
    pub stage: WorkflowStage,
    pub feedback: String,
    pub timestamp: DateTime<Utc>,
}
