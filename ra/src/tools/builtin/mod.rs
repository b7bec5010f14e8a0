//! Built-in tools for the planning agent

mod present_route_plan;
mod route_plan;
mod strava;

pub use present_route_plan::PresentRoutePlanTool;
pub use route_plan::RoutePlanTool;
pub use strava::{StravaEndpoint, StravaTool};
