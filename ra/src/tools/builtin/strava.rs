//! Strava tools backed by fixture data
//!
//! Same names and parameters as the Strava MCP server, answering from a
//! small fixed data set so the agent can be exercised without an account.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::tools::{Tool, ToolContext, ToolError, ToolResult};

struct Activity {
    id: u64,
    name: &'static str,
    /// Meters
    distance: u32,
    /// Seconds
    moving_time: u32,
    /// Meters
    total_elevation_gain: u32,
    start_latlng: [f64; 2],
}

const ACTIVITIES: &[Activity] = &[
    Activity {
        id: 12345,
        name: "Pescadero Loop via Tunitas Creek",
        distance: 105_000,
        moving_time: 14_400,
        total_elevation_gain: 1800,
        start_latlng: [37.4419, -122.143],
    },
    Activity {
        id: 12346,
        name: "Conservatory Drive Climb",
        distance: 45_000,
        moving_time: 7200,
        total_elevation_gain: 900,
        start_latlng: [37.4419, -122.143],
    },
];

struct Segment {
    id: u64,
    name: &'static str,
    distance: u32,
    avg_grade: f64,
    elev_difference: u32,
}

const SEGMENTS: &[Segment] = &[
    Segment {
        id: 98765,
        name: "Tunitas Creek Road Climb",
        distance: 8500,
        avg_grade: 5.2,
        elev_difference: 442,
    },
    Segment {
        id: 98766,
        name: "Stage Road South",
        distance: 12_000,
        avg_grade: 2.1,
        elev_difference: 252,
    },
];

/// (segment_id, activity_id, elapsed_time, moving_time)
const EFFORTS: &[(u64, u64, u32, u32)] = &[(98765, 12345, 1920, 1900), (98766, 12345, 2400, 2380)];

struct AthleteRoute {
    id: u64,
    name: &'static str,
    distance: u32,
    elevation_gain: u32,
}

const ROUTES: &[AthleteRoute] = &[
    AthleteRoute {
        id: 55555,
        name: "Pescadero Lunch Ride",
        distance: 105_000,
        elevation_gain: 1800,
    },
    AthleteRoute {
        id: 55556,
        name: "Quick Conservatory Loop",
        distance: 45_000,
        elevation_gain: 900,
    },
];

const STREAM_12345: &[[f64; 2]] = &[[37.4419, -122.143], [37.41, -122.2], [37.263, -122.406], [37.255, -122.39]];

const DEFAULT_PER_PAGE: usize = 30;

#[derive(Debug, Default, Deserialize)]
struct Pagination {
    page: Option<usize>,
    per_page: Option<usize>,
}

impl Pagination {
    fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let per_page = self.per_page.unwrap_or(DEFAULT_PER_PAGE).max(1);
        let start = (self.page.unwrap_or(1).max(1) - 1).saturating_mul(per_page);
        if start >= items.len() {
            return &[];
        }
        &items[start..(start + per_page).min(items.len())]
    }
}

#[derive(Debug, Deserialize)]
struct ActivityParams {
    activity_id: u64,
}

#[derive(Debug, Deserialize)]
struct SegmentExploreParams {
    bounds: String,
    activity_type: Option<String>,
}

impl SegmentExploreParams {
    /// Bounds must be four numbers: SW lat, SW lng, NE lat, NE lng
    fn validate(&self) -> Result<(), ToolError> {
        let coords: Vec<f64> = self
            .bounds
            .split(',')
            .map(|c| c.trim().parse::<f64>())
            .collect::<Result<_, _>>()
            .map_err(|_| ToolError::InvalidArgument(format!("bounds must be numeric, got '{}'", self.bounds)))?;
        if coords.len() != 4 {
            return Err(ToolError::InvalidArgument(format!(
                "bounds needs 4 coordinates, got {}",
                coords.len()
            )));
        }
        Ok(())
    }

    /// Fixture segments are all cycling segments
    fn wants_riding(&self) -> bool {
        self.activity_type
            .as_deref()
            .is_none_or(|t| t.trim().eq_ignore_ascii_case("riding"))
    }
}

#[derive(Debug, Deserialize)]
struct SegmentParams {
    segment_id: u64,
}

#[derive(Debug, Deserialize)]
struct StreamParams {
    activity_id: u64,
    stream_types: Option<String>,
}

impl StreamParams {
    /// Only the latlng stream is recorded; no filter means every stream
    fn wants_latlng(&self) -> bool {
        self.stream_types
            .as_deref()
            .is_none_or(|types| types.split(',').any(|t| t.trim() == "latlng"))
    }
}

fn format_activity_summary(a: &Activity) -> String {
    format!(
        "### {}\n- Distance: {}m\n- Moving Time: {}s\n- Elevation: {}m\n- ID: {}",
        a.name, a.distance, a.moving_time, a.total_elevation_gain, a.id
    )
}

fn format_segment(s: &Segment) -> String {
    format!(
        "### {}\n- ID: {}\n- Distance: {}m\n- Avg Grade: {}%\n- Elev Difference: {}m",
        s.name, s.id, s.distance, s.avg_grade, s.elev_difference
    )
}

fn format_route(r: &AthleteRoute) -> String {
    format!(
        "### {}\n- ID: {}\n- Distance: {}m\n- Elevation: {}m",
        r.name, r.id, r.distance, r.elevation_gain
    )
}

fn params<T: for<'de> Deserialize<'de>>(input: Value) -> Result<T, ToolError> {
    serde_json::from_value(input).map_err(|e| ToolError::InvalidArgument(e.to_string()))
}

/// The Strava endpoints available to the agent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StravaEndpoint {
    AllActivities,
    RecentActivities,
    ActivityDetails,
    ExploreSegments,
    SegmentEfforts,
    ActivityStreams,
    AthleteRoutes,
}

impl StravaEndpoint {
    pub const ALL: [StravaEndpoint; 7] = [
        Self::AllActivities,
        Self::RecentActivities,
        Self::ActivityDetails,
        Self::ExploreSegments,
        Self::SegmentEfforts,
        Self::ActivityStreams,
        Self::AthleteRoutes,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::AllActivities => "get-all-activities",
            Self::RecentActivities => "get-recent-activities",
            Self::ActivityDetails => "get-activity-details",
            Self::ExploreSegments => "explore-segments",
            Self::SegmentEfforts => "list-segment-efforts",
            Self::ActivityStreams => "get-activity-streams",
            Self::AthleteRoutes => "list-athlete-routes",
        }
    }

    fn description(&self) -> &'static str {
        match self {
            Self::AllActivities => "Get all activities for the authenticated athlete",
            Self::RecentActivities => "Get recent activities for the authenticated athlete",
            Self::ActivityDetails => "Get detailed information about a specific activity",
            Self::ExploreSegments => "Explore segments in a given area",
            Self::SegmentEfforts => "List efforts for a given segment",
            Self::ActivityStreams => "Get activity streams (GPS, heart rate, power, etc.)",
            Self::AthleteRoutes => "List routes created by the authenticated athlete",
        }
    }

    fn input_schema(&self) -> Value {
        let pagination = serde_json::json!({
            "type": "object",
            "properties": {
                "page": { "type": "integer", "description": "Page number (default: 1)" },
                "per_page": { "type": "integer", "description": "Items per page (default: 30)" }
            }
        });
        match self {
            Self::AllActivities | Self::RecentActivities | Self::AthleteRoutes => pagination,
            Self::ActivityDetails => serde_json::json!({
                "type": "object",
                "properties": { "activity_id": { "type": "integer" } },
                "required": ["activity_id"]
            }),
            Self::ExploreSegments => serde_json::json!({
                "type": "object",
                "properties": {
                    "bounds": { "type": "string", "description": "SW lat, SW lng, NE lat, NE lng" },
                    "activity_type": { "type": "string", "description": "riding or running" }
                },
                "required": ["bounds"]
            }),
            Self::SegmentEfforts => serde_json::json!({
                "type": "object",
                "properties": { "segment_id": { "type": "integer" } },
                "required": ["segment_id"]
            }),
            Self::ActivityStreams => serde_json::json!({
                "type": "object",
                "properties": {
                    "activity_id": { "type": "integer" },
                    "stream_types": { "type": "string", "description": "Comma-separated stream types" }
                },
                "required": ["activity_id"]
            }),
        }
    }

    fn respond(&self, input: Value) -> Result<String, ToolError> {
        let text = match self {
            Self::AllActivities | Self::RecentActivities => {
                let page: Pagination = params(input)?;
                let activities = page.slice(ACTIVITIES);
                if activities.is_empty() {
                    "No activities found".to_string()
                } else {
                    activities
                        .iter()
                        .map(format_activity_summary)
                        .collect::<Vec<_>>()
                        .join("\n\n")
                }
            }
            Self::ActivityDetails => {
                let ActivityParams { activity_id } = params(input)?;
                match ACTIVITIES.iter().find(|a| a.id == activity_id) {
                    Some(a) => format!(
                        "# {}\n- Distance: {}m\n- Moving Time: {}s\n- Elevation: {}m\n- Start: {}, {}",
                        a.name, a.distance, a.moving_time, a.total_elevation_gain, a.start_latlng[0], a.start_latlng[1]
                    ),
                    None => "Activity not found".to_string(),
                }
            }
            Self::ExploreSegments => {
                let explore: SegmentExploreParams = params(input)?;
                explore.validate()?;
                if explore.wants_riding() {
                    SEGMENTS.iter().map(format_segment).collect::<Vec<_>>().join("\n\n")
                } else {
                    "No segments found".to_string()
                }
            }
            Self::SegmentEfforts => {
                let SegmentParams { segment_id } = params(input)?;
                match EFFORTS.iter().find(|(segment, ..)| *segment == segment_id) {
                    Some((_, activity_id, elapsed, moving)) => format!(
                        "### Effort 1\n- Activity ID: {}\n- Elapsed Time: {}s\n- Moving Time: {}s",
                        activity_id, elapsed, moving
                    ),
                    None => "No efforts found".to_string(),
                }
            }
            Self::ActivityStreams => {
                let streams: StreamParams = params(input)?;
                if streams.activity_id == 12345 && streams.wants_latlng() {
                    serde_json::json!({ "latlng": { "data": STREAM_12345 } }).to_string()
                } else {
                    "No stream data available".to_string()
                }
            }
            Self::AthleteRoutes => {
                let page: Pagination = params(input)?;
                let routes = page.slice(ROUTES);
                if routes.is_empty() {
                    "No routes found".to_string()
                } else {
                    routes.iter().map(format_route).collect::<Vec<_>>().join("\n\n")
                }
            }
        };
        Ok(text)
    }
}

/// One Strava endpoint exposed as a tool
pub struct StravaTool {
    endpoint: StravaEndpoint,
}

impl StravaTool {
    pub fn new(endpoint: StravaEndpoint) -> Self {
        Self { endpoint }
    }

    /// One tool per endpoint
    pub fn all() -> Vec<StravaTool> {
        StravaEndpoint::ALL.into_iter().map(Self::new).collect()
    }
}

#[async_trait]
impl Tool for StravaTool {
    fn name(&self) -> &'static str {
        self.endpoint.name()
    }

    fn description(&self) -> &'static str {
        self.endpoint.description()
    }

    fn input_schema(&self) -> Value {
        self.endpoint.input_schema()
    }

    async fn execute(&self, input: Value, ctx: &ToolContext) -> ToolResult {
        debug!(session_id = %ctx.session_id, endpoint = self.endpoint.name(), "StravaTool::execute: called");
        self.endpoint.respond(input).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn call(endpoint: StravaEndpoint, input: Value) -> ToolResult {
        StravaTool::new(endpoint).execute(input, &ToolContext::new()).await
    }

    #[tokio::test]
    async fn test_all_activities() {
        let result = call(StravaEndpoint::AllActivities, json!({})).await;
        assert!(!result.is_error);
        assert_eq!(
            result.content,
            "### Pescadero Loop via Tunitas Creek\n- Distance: 105000m\n- Moving Time: 14400s\n- Elevation: 1800m\n- ID: 12345\n\n\
             ### Conservatory Drive Climb\n- Distance: 45000m\n- Moving Time: 7200s\n- Elevation: 900m\n- ID: 12346"
        );
    }

    #[tokio::test]
    async fn test_pagination() {
        let result = call(StravaEndpoint::RecentActivities, json!({"page": 2, "per_page": 1})).await;
        assert!(result.content.starts_with("### Conservatory Drive Climb"));

        let result = call(StravaEndpoint::RecentActivities, json!({"page": 3, "per_page": 1})).await;
        assert_eq!(result.content, "No activities found");
    }

    #[tokio::test]
    async fn test_activity_details() {
        let result = call(StravaEndpoint::ActivityDetails, json!({"activity_id": 12345})).await;
        assert_eq!(
            result.content,
            "# Pescadero Loop via Tunitas Creek\n- Distance: 105000m\n- Moving Time: 14400s\n- Elevation: 1800m\n- Start: 37.4419, -122.143"
        );

        let result = call(StravaEndpoint::ActivityDetails, json!({"activity_id": 1})).await;
        assert_eq!(result.content, "Activity not found");
    }

    #[tokio::test]
    async fn test_activity_details_requires_id() {
        let result = call(StravaEndpoint::ActivityDetails, json!({})).await;
        assert!(result.is_error);
        assert!(result.content.contains("activity_id"));
    }

    #[tokio::test]
    async fn test_explore_segments() {
        let result = call(StravaEndpoint::ExploreSegments, json!({"bounds": "37.2,-122.5,37.5,-122.1"})).await;
        assert!(result.content.contains("### Tunitas Creek Road Climb\n- ID: 98765\n- Distance: 8500m\n- Avg Grade: 5.2%"));
        assert!(result.content.contains("### Stage Road South"));
    }

    #[tokio::test]
    async fn test_explore_segments_filters_and_validates() {
        let result = call(
            StravaEndpoint::ExploreSegments,
            json!({"bounds": "37.2,-122.5,37.5,-122.1", "activity_type": "running"}),
        )
        .await;
        assert_eq!(result.content, "No segments found");

        let result = call(
            StravaEndpoint::ExploreSegments,
            json!({"bounds": "37.2,-122.5,37.5,-122.1", "activity_type": "Riding"}),
        )
        .await;
        assert!(result.content.contains("### Tunitas Creek Road Climb"));

        let result = call(StravaEndpoint::ExploreSegments, json!({"bounds": "37.2,-122.5"})).await;
        assert!(result.is_error);
        assert!(result.content.contains("4 coordinates"));

        let result = call(StravaEndpoint::ExploreSegments, json!({"bounds": "north,south,east,west"})).await;
        assert!(result.is_error);
    }

    #[tokio::test]
    async fn test_segment_efforts() {
        let result = call(StravaEndpoint::SegmentEfforts, json!({"segment_id": 98766})).await;
        assert_eq!(
            result.content,
            "### Effort 1\n- Activity ID: 12345\n- Elapsed Time: 2400s\n- Moving Time: 2380s"
        );

        let result = call(StravaEndpoint::SegmentEfforts, json!({"segment_id": 5})).await;
        assert_eq!(result.content, "No efforts found");
    }

    #[tokio::test]
    async fn test_activity_streams() {
        let result = call(StravaEndpoint::ActivityStreams, json!({"activity_id": 12345, "stream_types": "latlng"})).await;
        let streams: Value = serde_json::from_str(&result.content).unwrap();
        assert_eq!(streams["latlng"]["data"].as_array().unwrap().len(), 4);
        assert_eq!(streams["latlng"]["data"][2], json!([37.263, -122.406]));

        let result = call(StravaEndpoint::ActivityStreams, json!({"activity_id": 12345})).await;
        assert!(result.content.contains("latlng"));

        let result = call(StravaEndpoint::ActivityStreams, json!({"activity_id": 12345, "stream_types": "heartrate, watts"})).await;
        assert_eq!(result.content, "No stream data available");

        let result = call(StravaEndpoint::ActivityStreams, json!({"activity_id": 12346})).await;
        assert_eq!(result.content, "No stream data available");
    }

    #[tokio::test]
    async fn test_athlete_routes() {
        let result = call(StravaEndpoint::AthleteRoutes, json!({})).await;
        assert!(result.content.starts_with("### Pescadero Lunch Ride\n- ID: 55555"));
        assert!(result.content.ends_with("- Elevation: 900m"));
    }

    #[test]
    fn test_all_tools_named() {
        let names: Vec<&str> = StravaTool::all().iter().map(|t| t.name()).collect();
        assert_eq!(names.len(), 7);
        assert!(names.contains(&"list-athlete-routes"));
    }
}
