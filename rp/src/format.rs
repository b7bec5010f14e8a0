//! Markdown rendering of checkpoint payloads

use std::fmt::Write;

use tracing::debug;

use crate::checkpoint::CheckpointPayload;
use crate::types::{DistanceRange, ParsedQuery, RefinedRoute, RouteCandidate, SkillResult, SkillsNeeded};

/// Render the message shown to the user for a checkpoint
///
/// Output is deterministic for a given payload. Optional sections are left
/// out entirely when their data is absent or empty.
pub fn format_message(payload: &CheckpointPayload) -> String {
    debug!(checkpoint = %payload.checkpoint(), "format_message: called");
    match payload {
        CheckpointPayload::ConfirmIntent { query, skills_needed } => format_confirm_intent(query, skills_needed),
        CheckpointPayload::PresentFindings {
            skill_results,
            insights,
        } => format_present_findings(skill_results, insights.as_deref()),
        CheckpointPayload::SelectRoute { candidates } => format_select_route(candidates),
        CheckpointPayload::RefineRoute {
            selected_route,
            proposed_refinements,
        } => format_refine_route(selected_route, proposed_refinements.as_deref()),
        CheckpointPayload::PresentFinal { final_route } => format_present_final(final_route),
    }
}

/// A zero bound is treated the same as a missing one
fn bound(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v != 0.0)
}

fn non_empty(list: &Option<Vec<String>>) -> Option<&[String]> {
    list.as_deref().filter(|items| !items.is_empty())
}

fn format_distance(range: &DistanceRange) -> Option<String> {
    match (bound(range.min), bound(range.max)) {
        (Some(min), Some(max)) => Some(format!("{}-{} miles", min, max)),
        (Some(min), None) => Some(format!("At least {} miles", min)),
        (None, Some(max)) => Some(format!("Up to {} miles", max)),
        (None, None) => None,
    }
}

fn push_bullets(message: &mut String, items: &[String]) {
    for item in items {
        let _ = writeln!(message, "- {}", item);
    }
}

fn format_confirm_intent(query: &ParsedQuery, skills_needed: &SkillsNeeded) -> String {
    let mut message = String::from("I understand you want to plan a route with:\n\n");

    if !query.destinations.is_empty() {
        let _ = writeln!(message, "**Destinations:** {}", query.destinations.join(", "));
    }

    if let Some(distance) = query.distance.as_ref().and_then(format_distance) {
        let _ = writeln!(message, "**Distance:** {}", distance);
    }

    if let Some(constraints) = &query.constraints {
        if let Some(must_visit) = non_empty(&constraints.must_visit) {
            let _ = writeln!(message, "**Must visit:** {}", must_visit.join(", "));
        }
        if let Some(avoid) = non_empty(&constraints.avoid) {
            let _ = writeln!(message, "**Avoid:** {}", avoid.join(", "));
        }
        if let Some(surface) = non_empty(&constraints.surface_preferences) {
            let _ = writeln!(message, "**Surface:** {}", surface.join(", "));
        }
    }

    if let Some(reference) = query.reference.as_deref().filter(|r| !r.is_empty()) {
        let _ = writeln!(message, "**Reference activity:** {}", reference);
    }

    let active: Vec<&str> = skills_needed.active().iter().map(|skill| skill.as_str()).collect();
    if !active.is_empty() {
        let _ = writeln!(message, "\n**Research areas:** {}", active.join(", "));
    }

    message.push_str("\nIs this correct? (yes/no, or provide clarifications)");
    message
}

fn format_present_findings(skill_results: &[SkillResult], insights: Option<&[String]>) -> String {
    let mut message = String::from("Here's what I found:\n\n");

    for result in skill_results {
        let _ = write!(message, "**{}**\n{}\n\n", result.skill_name, result.summary);
    }

    if let Some(insights) = insights.filter(|items| !items.is_empty()) {
        message.push_str("**Key insights:**\n");
        push_bullets(&mut message, insights);
        message.push('\n');
    }

    message.push_str("Would you like to proceed with route options, or should I research more?");
    message
}

fn format_select_route(candidates: &[RouteCandidate]) -> String {
    let mut message = String::from("I've prepared these route options:\n\n");

    for (i, route) in candidates.iter().enumerate() {
        let _ = writeln!(message, "**Route {}: {}**", i + 1, route.name);
        let _ = writeln!(message, "- Distance: {} miles", route.distance);
        let _ = writeln!(message, "- Elevation: {} ft", route.elevation);
        let _ = writeln!(message, "- Highlights: {}", route.highlights.join(", "));

        if let Some(stops) = route.stops.as_deref().filter(|s| !s.is_empty()) {
            let names: Vec<&str> = stops.iter().map(|stop| stop.name.as_str()).collect();
            let _ = writeln!(message, "- Stops: {}", names.join(", "));
        }

        if let Some(warnings) = non_empty(&route.warnings) {
            let _ = writeln!(message, "- Warnings: {}", warnings.join(", "));
        }

        message.push('\n');
    }

    message.push_str("Which route would you like? (enter number or name)");
    message
}

fn format_refine_route(selected: &RouteCandidate, refinements: Option<&[String]>) -> String {
    let mut message = format!("Refining **{}**\n\n", selected.name);

    if let Some(refinements) = refinements.filter(|items| !items.is_empty()) {
        message.push_str("Proposed adjustments:\n");
        push_bullets(&mut message, refinements);
        message.push('\n');
    }

    message.push_str("Any changes needed, or does this look good?");
    message
}

fn format_present_final(final_route: &RefinedRoute) -> String {
    let route = &final_route.route;
    let mut message = format!("**Final Route: {}**\n\n", route.name);
    let _ = writeln!(message, "- Distance: {} miles", route.distance);
    let _ = writeln!(message, "- Elevation: {} ft", route.elevation);

    if !route.highlights.is_empty() {
        let _ = writeln!(message, "- Highlights: {}", route.highlights.join(", "));
    }

    if let Some(stops) = route.stops.as_deref().filter(|s| !s.is_empty()) {
        message.push_str("\n**Stops:**\n");
        for stop in stops {
            let _ = writeln!(message, "- {} ({})", stop.name, stop.kind);
        }
    }

    if let Some(nutrition) = &final_route.nutrition_plan {
        message.push_str("\n**Nutrition Plan:**\n");
        let _ = writeln!(message, "- Total calories: {}", nutrition.calories);
        for intake in &nutrition.stops {
            let _ = writeln!(message, "- {}: {}", intake.time, intake.intake);
        }
    }

    if let Some(clothing) = non_empty(&final_route.clothing_recommendations) {
        message.push_str("\n**Clothing:**\n");
        push_bullets(&mut message, clothing);
    }

    if let Some(warnings) = non_empty(&route.warnings) {
        message.push_str("\n**Warnings:**\n");
        push_bullets(&mut message, warnings);
    }

    if !final_route.adjustments.is_empty() {
        message.push_str("\n**Adjustments made:**\n");
        push_bullets(&mut message, &final_route.adjustments);
    }

    message.push_str("\nApprove and generate GPX? (yes to generate, or request changes)");
    message
}
