use serde::{Deserialize, Serialize};

/// An event row as selected by the dashboard (`event_date, guest_count, total_amount`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventRow {
    pub event_date: Option<String>,
    pub guest_count: Option<f64>,
    pub total_amount: Option<f64>,
    pub title: Option<String>,
    pub location: Option<String>,
}

/// A client row (`created_at, company`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientRow {
    pub created_at: Option<String>,
    pub company: Option<String>,
}

/// A recipe row used as a menu item (`name, cost, category`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MenuItemRow {
    pub name: Option<String>,
    pub cost: Option<f64>,
    pub category: Option<String>,
}

/// Event summary. Serializes to `{"count": 0}` alone when there were no events.
#[derive(Debug, Clone, Serialize)]
pub struct EventInsights {
    pub count: usize,
    #[serde(flatten)]
    pub detail: Option<EventDetail>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDetail {
    pub recent_events: Vec<RecentEvent>,
    pub monthly_stats: Vec<MonthlyStat>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecentEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guests: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revenue: Option<f64>,
}

/// Per-month aggregate. `month` is 1-12, or `None` for rows whose date could not be read.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyStat {
    pub month: Option<u32>,
    pub event_count: usize,
    pub average_guests: f64,
    pub average_revenue: f64,
    pub total_revenue: f64,
}

/// Client summary. Serializes to `{"count": 0}` alone when there were no clients.
#[derive(Debug, Clone, Serialize)]
pub struct ClientInsights {
    pub count: usize,
    #[serde(flatten)]
    pub detail: Option<ClientDetail>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientDetail {
    pub new_clients_this_month: usize,
    pub top_companies: Vec<CompanyCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompanyCount {
    pub company: String,
    pub count: usize,
}

/// Menu summary. Serializes to `{"count": 0}` alone when there were no items.
#[derive(Debug, Clone, Serialize)]
pub struct MenuInsights {
    pub count: usize,
    #[serde(flatten)]
    pub detail: Option<MenuDetail>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuDetail {
    pub categories: Vec<String>,
    pub category_stats: Vec<CategoryStat>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryStat {
    pub category: String,
    pub item_count: usize,
    pub average_cost: f64,
    /// Most expensive items first, at most three.
    pub items: Vec<MenuItemCost>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MenuItemCost {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub cost: f64,
}
