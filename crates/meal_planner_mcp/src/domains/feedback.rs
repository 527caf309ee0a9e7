//! Consumption tracking history and the nutrition feedback aggregate.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ConsumptionStatus {
    Eaten,
    Skipped,
    #[serde(other)]
    Other,
}

impl ConsumptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsumptionStatus::Eaten => "eaten",
            ConsumptionStatus::Skipped => "skipped",
            ConsumptionStatus::Other => "other",
        }
    }
}

/// One tracking event for one meal item. Never mutated after creation.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ConsumptionRecord {
    pub item_id: String,
    pub status: ConsumptionStatus,
    pub quantity_ratio: f64,
    pub timestamp: DateTime<Utc>,
}

/// Append-only tracking events for a single item.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrackingHistory {
    events: Vec<ConsumptionRecord>,
}

impl TrackingHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, record: ConsumptionRecord) {
        self.events.push(record);
    }

    /// The authoritative event: greatest timestamp, later append wins ties.
    pub fn latest(&self) -> Option<&ConsumptionRecord> {
        self.events
            .iter()
            .enumerate()
            .max_by_key(|(seq, r)| (r.timestamp, *seq))
            .map(|(_, r)| r)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConsumptionRecord> {
        self.events.iter()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Nutrients {
    pub calories: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
}

impl Nutrients {
    pub fn scaled(&self, ratio: f64) -> Self {
        Self {
            calories: self.calories * ratio,
            protein_g: self.protein_g * ratio,
            carbs_g: self.carbs_g * ratio,
            fat_g: self.fat_g * ratio,
        }
    }

    pub fn add(&mut self, other: &Nutrients) {
        self.calories += other.calories;
        self.protein_g += other.protein_g;
        self.carbs_g += other.carbs_g;
        self.fat_g += other.fat_g;
    }
}

/// Consumed nutrients over a window plus preference hints for generation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NutritionSummary {
    pub calories: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
    #[serde(default)]
    pub eaten_item_names: Vec<String>,
    #[serde(default)]
    pub skipped_item_names: Vec<String>,
}

impl NutritionSummary {
    pub fn nutrients(&self) -> Nutrients {
        Nutrients {
            calories: self.calories,
            protein_g: self.protein_g,
            carbs_g: self.carbs_g,
            fat_g: self.fat_g,
        }
    }

    /// Reporting form: one decimal place.
    pub fn rounded(&self) -> Self {
        Self {
            calories: round1(self.calories),
            protein_g: round1(self.protein_g),
            carbs_g: round1(self.carbs_g),
            fat_g: round1(self.fat_g),
            eaten_item_names: self.eaten_item_names.clone(),
            skipped_item_names: self.skipped_item_names.clone(),
        }
    }
}

pub fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// A planned item together with its tracking history.
#[derive(Clone, Copy, Debug)]
pub struct TrackedItem<'a> {
    pub name: &'a str,
    pub nutrients: Nutrients,
    pub history: &'a TrackingHistory,
}

/// Sum ratio-scaled nutrients of items whose latest event is "eaten".
///
/// Hint lists keep first-seen order, skip duplicates and stop at `hint_limit`.
/// Totals keep full precision; round with [`NutritionSummary::rounded`].
pub fn aggregate<'a, I>(items: I, hint_limit: usize) -> NutritionSummary
where
    I: IntoIterator<Item = TrackedItem<'a>>,
{
    let mut totals = Nutrients::default();
    let mut eaten: Vec<String> = Vec::new();
    let mut skipped: Vec<String> = Vec::new();

    for item in items {
        let Some(latest) = item.history.latest() else {
            continue;
        };
        match latest.status {
            ConsumptionStatus::Eaten => {
                totals.add(&item.nutrients.scaled(latest.quantity_ratio));
                push_hint(&mut eaten, item.name, hint_limit);
            }
            ConsumptionStatus::Skipped => push_hint(&mut skipped, item.name, hint_limit),
            ConsumptionStatus::Other => {}
        }
    }

    NutritionSummary {
        calories: totals.calories,
        protein_g: totals.protein_g,
        carbs_g: totals.carbs_g,
        fat_g: totals.fat_g,
        eaten_item_names: eaten,
        skipped_item_names: skipped,
    }
}

fn push_hint(names: &mut Vec<String>, name: &str, limit: usize) {
    if names.len() < limit && !names.iter().any(|n| n == name) {
        names.push(name.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn record(status: ConsumptionStatus, ratio: f64, secs: i64) -> ConsumptionRecord {
        ConsumptionRecord {
            item_id: "i".into(),
            status,
            quantity_ratio: ratio,
            timestamp: at(secs),
        }
    }

    fn history(records: Vec<ConsumptionRecord>) -> TrackingHistory {
        let mut h = TrackingHistory::new();
        for r in records {
            h.append(r);
        }
        h
    }

    fn nutrients(calories: f64, protein_g: f64, carbs_g: f64, fat_g: f64) -> Nutrients {
        Nutrients {
            calories,
            protein_g,
            carbs_g,
            fat_g,
        }
    }

    #[test]
    fn latest_prefers_newest_timestamp_over_append_order() {
        let h = history(vec![
            record(ConsumptionStatus::Eaten, 1.0, 50),
            record(ConsumptionStatus::Skipped, 1.0, 10),
        ]);
        assert_eq!(h.latest().unwrap().status, ConsumptionStatus::Eaten);
    }

    #[test]
    fn latest_breaks_timestamp_ties_by_append_order() {
        let h = history(vec![
            record(ConsumptionStatus::Eaten, 1.0, 10),
            record(ConsumptionStatus::Skipped, 1.0, 10),
        ]);
        assert_eq!(h.latest().unwrap().status, ConsumptionStatus::Skipped);
        assert!(TrackingHistory::new().latest().is_none());
    }

    #[test]
    fn no_eaten_items_yields_zero_totals() {
        let skipped = history(vec![record(ConsumptionStatus::Skipped, 1.0, 0)]);
        let other = history(vec![record(ConsumptionStatus::Other, 1.0, 0)]);
        let untracked = TrackingHistory::new();
        let items = [
            TrackedItem { name: "Toast", nutrients: nutrients(140.0, 6.0, 26.0, 2.0), history: &skipped },
            TrackedItem { name: "Eggs", nutrients: nutrients(200.0, 14.0, 2.0, 15.0), history: &other },
            TrackedItem { name: "Rice", nutrients: nutrients(215.0, 5.0, 45.0, 2.0), history: &untracked },
        ];
        let s = aggregate(items, 10);
        assert_eq!(s.nutrients(), Nutrients::default());
        assert!(s.eaten_item_names.is_empty());
        assert_eq!(s.skipped_item_names, vec!["Toast".to_string()]);
    }

    #[test]
    fn fully_eaten_items_contribute_full_values() {
        let a = history(vec![record(ConsumptionStatus::Eaten, 1.0, 0)]);
        let b = history(vec![record(ConsumptionStatus::Eaten, 1.0, 0)]);
        let items = [
            TrackedItem { name: "Salmon", nutrients: nutrients(350.0, 39.0, 0.0, 20.0), history: &a },
            TrackedItem { name: "Quinoa", nutrients: nutrients(220.0, 8.0, 39.0, 4.0), history: &b },
        ];
        let s = aggregate(items, 10);
        assert_eq!(s.nutrients(), nutrients(570.0, 47.0, 39.0, 24.0));
        assert_eq!(s.eaten_item_names, vec!["Salmon".to_string(), "Quinoa".to_string()]);
    }

    #[test]
    fn partial_ratio_scales_and_only_latest_counts() {
        let h = history(vec![
            record(ConsumptionStatus::Skipped, 1.0, 0),
            record(ConsumptionStatus::Eaten, 0.5, 60),
        ]);
        let items = [TrackedItem { name: "Oatmeal", nutrients: nutrients(250.0, 8.0, 45.0, 5.0), history: &h }];
        let s = aggregate(items, 10);
        assert_eq!(s.nutrients(), nutrients(125.0, 4.0, 22.5, 2.5));
        assert!(s.skipped_item_names.is_empty());
    }

    #[test]
    fn hints_are_deduplicated_and_capped() {
        let h = history(vec![record(ConsumptionStatus::Eaten, 1.0, 0)]);
        let names: Vec<String> = (0..15).map(|i| format!("Dish {}", i % 12)).collect();
        let items: Vec<TrackedItem<'_>> = names
            .iter()
            .map(|n| TrackedItem { name: n, nutrients: Nutrients::default(), history: &h })
            .collect();
        let s = aggregate(items, 10);
        assert_eq!(s.eaten_item_names.len(), 10);
        assert_eq!(s.eaten_item_names[0], "Dish 0");
        assert_eq!(s.eaten_item_names[9], "Dish 9");
    }

    #[test]
    fn rounding_happens_only_when_reporting() {
        let h = history(vec![record(ConsumptionStatus::Eaten, 1.0 / 3.0, 0)]);
        let items = [TrackedItem { name: "Soup", nutrients: nutrients(100.0, 10.0, 10.0, 10.0), history: &h }];
        let s = aggregate(items, 10);
        assert!((s.calories - 100.0 / 3.0).abs() < 1e-12);
        assert_eq!(s.rounded().calories, 33.3);
    }
}
