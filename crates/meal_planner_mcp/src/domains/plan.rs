//! Day → meal slot → food item plan structure and the strict parser for
//! generation payloads.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::feedback::Nutrients;

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, PartialOrd, Ord, Hash, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum MealSlot {
    Breakfast,
    Lunch,
    Dinner,
}

impl MealSlot {
    pub const ALL: [MealSlot; 3] = [MealSlot::Breakfast, MealSlot::Lunch, MealSlot::Dinner];

    pub fn as_str(self) -> &'static str {
        match self {
            MealSlot::Breakfast => "breakfast",
            MealSlot::Lunch => "lunch",
            MealSlot::Dinner => "dinner",
        }
    }
}

impl std::fmt::Display for MealSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, JsonSchema)]
pub struct FoodItem {
    pub name: String,
    pub calories: f64,
    #[serde(rename = "protein")]
    pub protein_g: f64,
    #[serde(rename = "carbs")]
    pub carbs_g: f64,
    #[serde(rename = "fat")]
    pub fat_g: f64,
}

impl FoodItem {
    pub fn nutrients(&self) -> Nutrients {
        Nutrients {
            calories: self.calories,
            protein_g: self.protein_g,
            carbs_g: self.carbs_g,
            fat_g: self.fat_g,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, JsonSchema)]
pub struct DayPlan {
    pub breakfast: Vec<FoodItem>,
    pub lunch: Vec<FoodItem>,
    pub dinner: Vec<FoodItem>,
}

impl DayPlan {
    pub fn slot(&self, slot: MealSlot) -> &[FoodItem] {
        match slot {
            MealSlot::Breakfast => &self.breakfast,
            MealSlot::Lunch => &self.lunch,
            MealSlot::Dinner => &self.dinner,
        }
    }

    pub fn slots(&self) -> impl Iterator<Item = (MealSlot, &[FoodItem])> {
        MealSlot::ALL.into_iter().map(move |s| (s, self.slot(s)))
    }

    pub fn total_calories(&self) -> f64 {
        self.slots()
            .flat_map(|(_, items)| items.iter())
            .map(|i| i.calories)
            .sum()
    }

    pub fn is_complete(&self) -> bool {
        self.slots().all(|(_, items)| !items.is_empty())
    }
}

/// Plan keyed by 1-based day index. Serializes as `{"1": {...}, "2": {...}}`.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, JsonSchema)]
#[serde(transparent)]
pub struct GeneratedPlan {
    pub days: BTreeMap<u32, DayPlan>,
}

impl GeneratedPlan {
    pub fn horizon_days(&self) -> u32 {
        self.days.len() as u32
    }

    pub fn day(&self, index: u32) -> Option<&DayPlan> {
        self.days.get(&index)
    }

    /// Every day 1..=horizon present with all three slots populated.
    pub fn covers(&self, horizon_days: u32) -> bool {
        (1..=horizon_days).all(|d| self.day(d).is_some_and(DayPlan::is_complete))
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum PlanParseError {
    #[error("invalid JSON: {0}")]
    InvalidJson(String),
    #[error("expected a JSON object keyed by day number")]
    NotAnObject,
    #[error("day {0} missing from plan")]
    MissingDay(u32),
    #[error("day {0} is not an object")]
    InvalidDay(u32),
    #[error("day {day} has no {slot} items")]
    MissingSlot { day: u32, slot: MealSlot },
    #[error("day {day} {slot} item {index}: {reason}")]
    InvalidItem {
        day: u32,
        slot: MealSlot,
        index: usize,
        reason: String,
    },
}

/// Remove an optional leading ```` ```json ```` / ```` ``` ```` fence and a trailing ```` ``` ````.
pub fn strip_code_fences(text: &str) -> &str {
    let mut s = text.trim();
    if let Some(rest) = s.strip_prefix("```json") {
        s = rest;
    } else if let Some(rest) = s.strip_prefix("```") {
        s = rest;
    }
    if let Some(rest) = s.strip_suffix("```") {
        s = rest;
    }
    s.trim()
}

/// Parse and validate a generation payload for a `horizon_days` plan.
///
/// Days beyond the horizon are dropped; anything missing inside it is an error.
pub fn parse_plan_response(text: &str, horizon_days: u32) -> Result<GeneratedPlan, PlanParseError> {
    let value: Value = serde_json::from_str(strip_code_fences(text))
        .map_err(|e| PlanParseError::InvalidJson(e.to_string()))?;
    let root = value.as_object().ok_or(PlanParseError::NotAnObject)?;

    let mut days = BTreeMap::new();
    for day in 1..=horizon_days {
        let raw = root
            .get(&day.to_string())
            .ok_or(PlanParseError::MissingDay(day))?;
        days.insert(day, parse_day(day, raw)?);
    }
    Ok(GeneratedPlan { days })
}

fn parse_day(day: u32, raw: &Value) -> Result<DayPlan, PlanParseError> {
    let obj = raw.as_object().ok_or(PlanParseError::InvalidDay(day))?;
    let slot_items = |slot: MealSlot| -> Result<Vec<FoodItem>, PlanParseError> {
        let items = obj
            .get(slot.as_str())
            .and_then(Value::as_array)
            .filter(|a| !a.is_empty())
            .ok_or(PlanParseError::MissingSlot { day, slot })?;
        items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                parse_item(item).map_err(|reason| PlanParseError::InvalidItem {
                    day,
                    slot,
                    index,
                    reason,
                })
            })
            .collect()
    };
    Ok(DayPlan {
        breakfast: slot_items(MealSlot::Breakfast)?,
        lunch: slot_items(MealSlot::Lunch)?,
        dinner: slot_items(MealSlot::Dinner)?,
    })
}

fn parse_item(raw: &Value) -> Result<FoodItem, String> {
    let obj = raw.as_object().ok_or_else(|| "not an object".to_string())?;
    let name = obj
        .get("name")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| "missing name".to_string())?;
    let number = |field: &str| -> Result<f64, String> {
        let v = obj
            .get(field)
            .and_then(Value::as_f64)
            .ok_or_else(|| format!("missing numeric {field}"))?;
        if !v.is_finite() || v < 0.0 {
            return Err(format!("{field} must be a non-negative number"));
        }
        Ok(v)
    };
    Ok(FoodItem {
        name: name.to_string(),
        calories: number("calories")?,
        protein_g: number("protein")?,
        carbs_g: number("carbs")?,
        fat_g: number("fat")?,
    })
}
