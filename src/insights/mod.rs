//! Folds raw dashboard rows into the compact summaries embedded in the prompt.

pub mod types;

pub use types::*;

use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveDateTime};
use std::collections::{BTreeMap, HashMap};

pub const RECENT_EVENT_LIMIT: usize = 5;
pub const TOP_COMPANY_LIMIT: usize = 5;
pub const TOP_ITEMS_PER_CATEGORY: usize = 3;

const INDIVIDUAL_COMPANY: &str = "Individual";
const UNCATEGORIZED: &str = "Uncategorized";

#[derive(Default)]
struct MonthBucket {
    events: usize,
    guests: f64,
    revenue: f64,
}

impl MonthBucket {
    fn add(&mut self, event: &EventRow) {
        self.events += 1;
        self.guests += event.guest_count.unwrap_or(0.0);
        self.revenue += event.total_amount.unwrap_or(0.0);
    }

    fn into_stat(self, month: Option<u32>) -> MonthlyStat {
        let n = self.events as f64;
        MonthlyStat {
            month,
            event_count: self.events,
            average_guests: self.guests / n,
            average_revenue: self.revenue / n,
            total_revenue: self.revenue,
        }
    }
}

/// Summarize events by calendar month and keep the first five as "recent".
///
/// Callers sort events newest first; input order is trusted.
pub fn aggregate_events(events: &[EventRow]) -> EventInsights {
    if events.is_empty() {
        return EventInsights {
            count: 0,
            detail: None,
        };
    }

    let mut by_month: BTreeMap<u32, MonthBucket> = BTreeMap::new();
    let mut undated: Option<MonthBucket> = None;

    for event in events {
        match event.event_date.as_deref().and_then(parse_local_date) {
            Some(date) => by_month.entry(date.month()).or_default().add(event),
            None => undated.get_or_insert_with(MonthBucket::default).add(event),
        }
    }

    let mut monthly_stats: Vec<MonthlyStat> = by_month
        .into_iter()
        .map(|(month, bucket)| bucket.into_stat(Some(month)))
        .collect();
    if let Some(bucket) = undated {
        monthly_stats.push(bucket.into_stat(None));
    }

    let recent_events = events
        .iter()
        .take(RECENT_EVENT_LIMIT)
        .map(|e| RecentEvent {
            date: e.event_date.clone(),
            title: e.title.clone(),
            location: e.location.clone(),
            guests: e.guest_count,
            revenue: e.total_amount,
        })
        .collect();

    EventInsights {
        count: events.len(),
        detail: Some(EventDetail {
            recent_events,
            monthly_stats,
        }),
    }
}

/// Summarize clients against the local calendar month.
pub fn aggregate_clients(clients: &[ClientRow]) -> ClientInsights {
    aggregate_clients_at(clients, Local::now().date_naive())
}

/// Same as [`aggregate_clients`] with an explicit "today".
pub fn aggregate_clients_at(clients: &[ClientRow], today: NaiveDate) -> ClientInsights {
    if clients.is_empty() {
        return ClientInsights {
            count: 0,
            detail: None,
        };
    }

    let new_clients_this_month = clients
        .iter()
        .filter_map(|c| c.created_at.as_deref().and_then(parse_local_date))
        .filter(|d| d.month() == today.month() && d.year() == today.year())
        .count();

    let mut top_companies: Vec<CompanyCount> =
        group_in_order(clients, |c| label_or(c.company.as_deref(), INDIVIDUAL_COMPANY))
            .into_iter()
            .map(|(company, rows)| CompanyCount {
                company,
                count: rows.len(),
            })
            .collect();
    // stable: ties keep first-seen order
    top_companies.sort_by(|a, b| b.count.cmp(&a.count));
    top_companies.truncate(TOP_COMPANY_LIMIT);

    ClientInsights {
        count: clients.len(),
        detail: Some(ClientDetail {
            new_clients_this_month,
            top_companies,
        }),
    }
}

/// Summarize menu items per category with the three most expensive items of each.
pub fn aggregate_menu_items(items: &[MenuItemRow]) -> MenuInsights {
    if items.is_empty() {
        return MenuInsights {
            count: 0,
            detail: None,
        };
    }

    let groups = group_in_order(items, |i| label_or(i.category.as_deref(), UNCATEGORIZED));
    let categories = groups.iter().map(|(name, _)| name.clone()).collect();

    let category_stats = groups
        .into_iter()
        .map(|(category, rows)| {
            let total_cost: f64 = rows.iter().map(|i| i.cost.unwrap_or(0.0)).sum();
            let mut ranked: Vec<MenuItemCost> = rows
                .iter()
                .map(|i| MenuItemCost {
                    name: i.name.clone(),
                    cost: i.cost.unwrap_or(0.0),
                })
                .collect();
            ranked.sort_by(|a, b| b.cost.total_cmp(&a.cost));
            ranked.truncate(TOP_ITEMS_PER_CATEGORY);

            CategoryStat {
                category,
                item_count: rows.len(),
                average_cost: total_cost / rows.len() as f64,
                items: ranked,
            }
        })
        .collect();

    MenuInsights {
        count: items.len(),
        detail: Some(MenuDetail {
            categories,
            category_stats,
        }),
    }
}

/// Groups rows by label, keeping groups in the order their label first appears.
fn group_in_order<'a, T>(rows: &'a [T], label: impl Fn(&T) -> String) -> Vec<(String, Vec<&'a T>)> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(String, Vec<&'a T>)> = Vec::new();

    for row in rows {
        let key = label(row);
        match index.get(&key) {
            Some(&i) => groups[i].1.push(row),
            None => {
                index.insert(key.clone(), groups.len());
                groups.push((key, vec![row]));
            }
        }
    }
    groups
}

fn label_or(value: Option<&str>, default: &str) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v.to_string(),
        _ => default.to_string(),
    }
}

/// Reads a date or timestamp as a local calendar date.
///
/// Timestamps with an offset are shifted into the local zone; bare dates and
/// naive timestamps are taken as already local.
pub(crate) fn parse_local_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Local).date_naive());
    }
    // postgres timestamptz text form, e.g. "2024-06-15 10:00:00.123+00"
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Some(dt.with_timezone(&Local).date_naive());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.date());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(date: &str, guests: f64, amount: f64) -> EventRow {
        EventRow {
            event_date: Some(date.to_string()),
            guest_count: Some(guests),
            total_amount: Some(amount),
            ..Default::default()
        }
    }

    fn client(created_at: &str, company: Option<&str>) -> ClientRow {
        ClientRow {
            created_at: Some(created_at.to_string()),
            company: company.map(str::to_string),
        }
    }

    fn item(name: &str, cost: f64, category: Option<&str>) -> MenuItemRow {
        MenuItemRow {
            name: Some(name.to_string()),
            cost: Some(cost),
            category: category.map(str::to_string),
        }
    }

    #[test]
    fn test_empty_inputs_serialize_to_count_only() {
        assert_eq!(serde_json::to_value(aggregate_events(&[])).unwrap(), json!({"count": 0}));
        assert_eq!(serde_json::to_value(aggregate_clients(&[])).unwrap(), json!({"count": 0}));
        assert_eq!(
            serde_json::to_value(aggregate_menu_items(&[])).unwrap(),
            json!({"count": 0})
        );
    }

    #[test]
    fn test_monthly_stats_group_and_average() {
        let events = vec![
            event("2024-07-20", 100.0, 3000.0),
            event("2024-06-15", 50.0, 1000.0),
            event("2024-06-02", 150.0, 2000.0),
        ];
        let insights = aggregate_events(&events);
        let detail = insights.detail.unwrap();

        assert_eq!(insights.count, 3);
        assert_eq!(detail.monthly_stats.len(), 2);

        let june = &detail.monthly_stats[0];
        assert_eq!(june.month, Some(6));
        assert_eq!(june.event_count, 2);
        assert_eq!(june.average_guests, 100.0);
        assert_eq!(june.average_revenue, 1500.0);
        assert_eq!(june.total_revenue, 3000.0);

        assert_eq!(detail.monthly_stats[1].month, Some(7));
    }

    #[test]
    fn test_monthly_revenue_sums_to_input_total() {
        let events = vec![
            event("2024-01-05", 10.0, 120.5),
            event("2024-03-11", 20.0, 99.99),
            event("2024-03-28T18:30:00", 30.0, 410.25),
            event("not a date", 40.0, 77.0),
            EventRow {
                event_date: Some("2024-11-01".into()),
                ..Default::default()
            },
        ];
        let detail = aggregate_events(&events).detail.unwrap();

        let input_total: f64 = events.iter().map(|e| e.total_amount.unwrap_or(0.0)).sum();
        let stats_total: f64 = detail.monthly_stats.iter().map(|m| m.total_revenue).sum();
        assert!((input_total - stats_total).abs() < 1e-9);

        for stat in &detail.monthly_stats {
            assert!(stat.event_count >= 1);
            let rebuilt = stat.average_revenue * stat.event_count as f64;
            assert!((rebuilt - stat.total_revenue).abs() < 1e-9);
        }
        assert_eq!(detail.monthly_stats.last().unwrap().month, None);
    }

    #[test]
    fn test_recent_events_keep_input_order_and_cap() {
        let events: Vec<EventRow> = (1..=8)
            .map(|d| event(&format!("2024-05-{:02}", 9 - d), d as f64, 0.0))
            .collect();
        let detail = aggregate_events(&events).detail.unwrap();

        assert_eq!(detail.recent_events.len(), RECENT_EVENT_LIMIT);
        assert_eq!(detail.recent_events[0].date.as_deref(), Some("2024-05-08"));
        assert_eq!(detail.recent_events[4].guests, Some(5.0));

        let json = serde_json::to_value(&detail.recent_events[0]).unwrap();
        assert!(json.get("title").is_none());
    }

    #[test]
    fn test_recent_event_omits_missing_numbers() {
        let events = vec![EventRow {
            event_date: Some("2024-05-01".into()),
            title: Some("Gala".into()),
            ..Default::default()
        }];
        let detail = aggregate_events(&events).detail.unwrap();

        let json = serde_json::to_value(&detail.recent_events[0]).unwrap();
        assert_eq!(json, json!({"date": "2024-05-01", "title": "Gala"}));
        assert_eq!(detail.monthly_stats[0].total_revenue, 0.0);
    }

    #[test]
    fn test_new_clients_counted_for_current_month() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 20).unwrap();
        let clients = vec![
            client("2024-06-03T12:00:00", Some("Acme")),
            client("2024-06-18", None),
            client("2023-06-18", Some("Acme")),
            client("2024-05-30T12:00:00", Some("Globex")),
        ];
        let detail = aggregate_clients_at(&clients, today).detail.unwrap();
        assert_eq!(detail.new_clients_this_month, 2);
    }

    #[test]
    fn test_top_companies_ranked_with_stable_ties() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let names = [
            Some("Beta"),
            Some("Alpha"),
            None,
            Some("Alpha"),
            Some(""),
            Some("Gamma"),
            Some("Delta"),
            Some("Epsilon"),
            Some("Zeta"),
        ];
        let clients: Vec<ClientRow> = names.iter().map(|c| client("2020-01-01", *c)).collect();
        let insights = aggregate_clients_at(&clients, today);
        let top = insights.detail.unwrap().top_companies;

        assert_eq!(insights.count, 9);
        assert_eq!(top.len(), TOP_COMPANY_LIMIT);
        assert_eq!(
            top[0],
            CompanyCount {
                company: "Alpha".into(),
                count: 2
            }
        );
        assert_eq!(top[1].company, "Individual");
        assert_eq!(top[1].count, 2);
        assert_eq!(top[2].company, "Beta");
        assert_eq!(top[3].company, "Gamma");
        assert!(top.windows(2).all(|w| w[0].count >= w[1].count));
    }

    #[test]
    fn test_menu_categories_and_top_items() {
        let items = vec![
            item("Salmon", 30.0, Some("Mains")),
            item("Bruschetta", 8.0, Some("Starters")),
            item("Steak", 45.0, Some("Mains")),
            item("Risotto", 22.0, Some("Mains")),
            item("Lobster", 45.0, Some("Mains")),
            item("Water", 1.0, None),
        ];
        let insights = aggregate_menu_items(&items);
        let detail = insights.detail.unwrap();

        assert_eq!(insights.count, 6);
        assert_eq!(detail.categories, vec!["Mains", "Starters", "Uncategorized"]);

        let mains = &detail.category_stats[0];
        assert_eq!(mains.item_count, 4);
        assert_eq!(mains.average_cost, 35.5);
        let names: Vec<_> = mains.items.iter().map(|i| i.name.as_deref().unwrap()).collect();
        assert_eq!(names, vec!["Steak", "Lobster", "Salmon"]);

        for stat in &detail.category_stats {
            assert!(stat.items.len() <= TOP_ITEMS_PER_CATEGORY);
            assert!(stat.items.windows(2).all(|w| w[0].cost >= w[1].cost));
        }
    }

    #[test]
    fn test_missing_cost_counts_as_zero() {
        let items = vec![
            MenuItemRow {
                name: Some("Mystery".into()),
                cost: None,
                category: Some("Sides".into()),
            },
            item("Fries", 4.0, Some("Sides")),
        ];
        let stat = &aggregate_menu_items(&items).detail.unwrap().category_stats[0];
        assert_eq!(stat.average_cost, 2.0);
        assert_eq!(stat.items[1].cost, 0.0);
    }

    #[test]
    fn test_parse_local_date_formats() {
        let june = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        assert_eq!(parse_local_date("2024-06-15"), Some(june));
        assert_eq!(parse_local_date("2024-06-15T12:00:00"), Some(june));
        assert_eq!(parse_local_date(" 2024-06-15 12:30:00 "), Some(june));
        assert_eq!(parse_local_date("2024-06-15T12:00:00+00:00").map(|d| d.month()), Some(6));
        assert_eq!(parse_local_date("2024-06-15 12:00:00.5+00").map(|d| d.month()), Some(6));
        assert_eq!(parse_local_date("soon"), None);
    }
}
