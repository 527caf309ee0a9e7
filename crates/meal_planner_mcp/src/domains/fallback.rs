//! Offline plan used whenever generation is unavailable or returns junk.

use std::collections::BTreeMap;

use super::plan::{DayPlan, FoodItem, GeneratedPlan};

const PLANT_BASED_TAGS: &[&str] = &["vegetarian", "vegan", "plant_based", "plant-based"];

type Template = [(&'static str, f64, f64, f64, f64)];

const PLANT_BREAKFAST: &Template = &[
    ("Oatmeal with Berries", 250.0, 8.0, 45.0, 5.0),
    ("Banana", 105.0, 1.0, 27.0, 0.0),
];
const PLANT_LUNCH: &Template = &[
    ("Quinoa Salad", 350.0, 12.0, 55.0, 10.0),
    ("Mixed Vegetables", 80.0, 3.0, 15.0, 1.0),
];
const PLANT_DINNER: &Template = &[
    ("Tofu Stir Fry", 300.0, 18.0, 25.0, 15.0),
    ("Brown Rice", 215.0, 5.0, 45.0, 2.0),
];

const STANDARD_BREAKFAST: &Template = &[
    ("Scrambled Eggs", 200.0, 14.0, 2.0, 15.0),
    ("Whole Wheat Toast", 140.0, 6.0, 26.0, 2.0),
];
const STANDARD_LUNCH: &Template = &[
    ("Grilled Chicken Breast", 280.0, 53.0, 0.0, 6.0),
    ("Sweet Potato", 180.0, 4.0, 41.0, 0.0),
];
const STANDARD_DINNER: &Template = &[
    ("Baked Salmon", 350.0, 39.0, 0.0, 20.0),
    ("Quinoa", 220.0, 8.0, 39.0, 4.0),
];

pub fn is_plant_based(diet_type: &str) -> bool {
    let tag = diet_type.trim();
    PLANT_BASED_TAGS.iter().any(|t| t.eq_ignore_ascii_case(tag))
}

/// Repeat one fixed day for `days` days, scaled so the day totals `calories`.
///
/// Pure and deterministic. Item names never change; nutrient values are
/// rounded to whole units after scaling.
pub fn fallback_plan(calories: u32, diet_type: &str, days: u32) -> GeneratedPlan {
    let (breakfast, lunch, dinner) = if is_plant_based(diet_type) {
        (PLANT_BREAKFAST, PLANT_LUNCH, PLANT_DINNER)
    } else {
        (STANDARD_BREAKFAST, STANDARD_LUNCH, STANDARD_DINNER)
    };

    let template_total: f64 = [breakfast, lunch, dinner]
        .iter()
        .flat_map(|slot| slot.iter())
        .map(|(_, kcal, ..)| kcal)
        .sum();
    let factor = f64::from(calories.max(1)) / template_total;

    let day = DayPlan {
        breakfast: scale(breakfast, factor),
        lunch: scale(lunch, factor),
        dinner: scale(dinner, factor),
    };

    GeneratedPlan {
        days: (1..=days).map(|d| (d, day.clone())).collect::<BTreeMap<_, _>>(),
    }
}

fn scale(template: &Template, factor: f64) -> Vec<FoodItem> {
    template
        .iter()
        .map(|&(name, calories, protein, carbs, fat)| FoodItem {
            name: name.to_string(),
            calories: (calories * factor).round(),
            protein_g: (protein * factor).round(),
            carbs_g: (carbs * factor).round(),
            fat_g: (fat * factor).round(),
        })
        .collect()
}
