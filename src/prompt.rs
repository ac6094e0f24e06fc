use crate::insights::{ClientInsights, EventInsights, MenuInsights};
use serde::Serialize;

/// Canned observations returned when no provider can be used.
pub const FALLBACK_ANALYSIS: &str = "Summer months show 25% higher booking rates for outdoor events.\n\
Seafood dishes are trending with 30% higher selection rate than last quarter.\n\
Consider expanding vegetarian options as requests increased by 40% in recent events.\n\
Expect increased demand for corporate events in Q4 based on current booking patterns.";

/// System role message for chat-style providers.
pub const SYSTEM_PROMPT: &str = "You are a business analytics expert for a catering company.";

/// Render the three summaries into the fixed four-observation template.
pub fn build_prompt(events: &EventInsights, clients: &ClientInsights, menu: &MenuInsights) -> String {
    format!(
        "As a business intelligence expert for a catering company, analyze this data and provide concise, actionable insights separated by newlines:\n\
         \n\
         EVENTS DATA:\n\
         {}\n\
         \n\
         CLIENT DATA:\n\
         {}\n\
         \n\
         MENU ITEMS DATA:\n\
         {}\n\
         \n\
         Provide exactly 4 observations, each on a new line:\n\
         1. A seasonal trend from the events data\n\
         2. Popular menu items and categories\n\
         3. One strategic business recommendation\n\
         4. A forecast about future demand\n",
        pretty(events),
        pretty(clients),
        pretty(menu),
    )
}

fn pretty<T: Serialize>(value: &T) -> String {
    // summaries are plain structs of strings and numbers
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}
