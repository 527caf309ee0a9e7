use std::fmt::Write as _;

use crate::config::PlannerSettings;
use crate::domains::MealSlot;
use crate::domains::feedback::round1;
use crate::generation::{PlanFeedback, PlanRequest};

const EXAMPLE_PLAN: &str = r#"{
    "1": {
        "breakfast": [
            {"name": "Greek Yogurt with Honey and Almonds", "calories": 180, "protein": 15, "carbs": 20, "fat": 6},
            {"name": "Fresh Strawberries", "calories": 50, "protein": 1, "carbs": 12, "fat": 0}
        ],
        "lunch": [
            {"name": "Grilled Chicken Caesar Salad", "calories": 350, "protein": 35, "carbs": 15, "fat": 18},
            {"name": "Whole Grain Roll", "calories": 120, "protein": 4, "carbs": 22, "fat": 2}
        ],
        "dinner": [
            {"name": "Baked Salmon with Lemon", "calories": 280, "protein": 35, "carbs": 0, "fat": 15},
            {"name": "Roasted Brussels Sprouts", "calories": 80, "protein": 4, "carbs": 12, "fat": 3},
            {"name": "Quinoa Pilaf", "calories": 180, "protein": 6, "carbs": 30, "fat": 4}
        ]
    },
    "2": {
        "breakfast": [
            {"name": "Avocado Toast on Sourdough", "calories": 250, "protein": 8, "carbs": 28, "fat": 12},
            {"name": "Poached Eggs", "calories": 140, "protein": 12, "carbs": 1, "fat": 10}
        ],
        "lunch": [...DIFFERENT from day 1...],
        "dinner": [...DIFFERENT from day 1...]
    }
}"#;

/// Instruction for a day-keyed JSON meal plan.
pub fn meal_plan_prompt(request: &PlanRequest, settings: &PlannerSettings) -> String {
    let allergies = if request.allergies.is_empty() {
        "None".to_string()
    } else {
        request.allergies.join(", ")
    };
    let split = settings.slot_split;
    let target = request.daily_calorie_target;
    let tolerance = settings.daily_tolerance_kcal;

    let mut out = String::new();
    let _ = writeln!(
        out,
        "Create a {}-day healthy meal plan with VARIETY - each day should have DIFFERENT meals.\n",
        request.horizon_days
    );
    let _ = writeln!(out, "Daily calories target: {target}");
    let _ = writeln!(out, "Diet type: {}", request.diet_type);
    let _ = writeln!(out, "Allergies: {allergies}");
    let _ = writeln!(out, "Goal: {}\n", request.goal);

    if let Some(feedback) = &request.feedback {
        out.push_str(&feedback_block(feedback));
        out.push('\n');
    }

    let _ = writeln!(
        out,
        "CRITICAL REQUIREMENTS:
1. Each day MUST have DIFFERENT breakfast, lunch, and dinner
2. NO REPEATING meals across days - provide variety
3. Mix different cuisines (Indian, Mediterranean, Asian, American, etc.)
4. Vary cooking methods (grilled, baked, steamed, raw, etc.)
5. Include seasonal and colorful ingredients
6. Balance macros: protein, carbs, healthy fats
7. NEVER include any ingredient the user is allergic to ({allergies})

Each day must include Breakfast, Lunch, Dinner.
Split the daily calories roughly {}% breakfast, {}% lunch, {}% dinner.
Each meal must contain 2-4 food items with:
- name (string) - be specific and appetizing
- calories (number)
- protein (number in grams)
- carbs (number in grams)
- fat (number in grams)

Return ONLY valid JSON structured by day number as keys (1, 2, 3, etc.).
Example format:
{EXAMPLE_PLAN}

IMPORTANT:
- Return ONLY the JSON object, no additional text
- Include every day from 1 to {}
- Make each day's meals UNIQUE and DIFFERENT
- Ensure total daily calories are close to {target} (±{tolerance} calories)",
        split.breakfast_pct, split.lunch_pct, split.dinner_pct, request.horizon_days
    );
    out
}

fn feedback_block(feedback: &PlanFeedback) -> String {
    let mut out = String::from("User recent intake summary:\n");
    let scope = if feedback.per_day { " per day" } else { "" };
    let n = &feedback.intake;
    let _ = writeln!(out, "Calories eaten{scope}: {}", round1(n.calories));
    let _ = writeln!(out, "Protein eaten{scope}: {}g", round1(n.protein_g));
    let _ = writeln!(out, "Carbs eaten{scope}: {}g", round1(n.carbs_g));
    let _ = writeln!(out, "Fat eaten{scope}: {}g", round1(n.fat_g));
    if let Some(r) = &feedback.macro_ratios {
        let _ = writeln!(
            out,
            "Calorie share from protein/carbs/fat: {:.0}% / {:.0}% / {:.0}%",
            r.protein * 100.0,
            r.carbs * 100.0,
            r.fat * 100.0
        );
    }
    if let Some(note) = &feedback.adjustment_note {
        let _ = writeln!(out, "Adjustment: {note}");
    }
    if !feedback.eaten_item_names.is_empty() {
        let _ = writeln!(
            out,
            "Foods the user enjoyed: {}",
            feedback.eaten_item_names.join(", ")
        );
    }
    if !feedback.skipped_item_names.is_empty() {
        let _ = writeln!(
            out,
            "Foods the user skipped (prefer alternatives): {}",
            feedback.skipped_item_names.join(", ")
        );
    }
    out.push_str("\nAdjust the new meal plan to correct imbalances and match user preferences.\n");
    out
}

/// Fixed food-photo style for item thumbnails.
pub fn meal_image_prompt(meal_name: &str, slot: MealSlot) -> String {
    format!(
        "Create a beautiful, appetizing photo of {meal_name} for a {slot} meal.

Style requirements:
- Soft pastel colors with dreamy lighting
- Frosted glass plate or bowl with subtle transparency
- Holographic light reflections
- Airy, luminous atmosphere
- Soft purple and lavender ambient glow
- Professional food photography
- Top-down or 45-degree angle
- Clean, minimalist presentation
- Soft shadows with purple tint
- Slightly magical, futuristic feel

The image should match a soft pastel glassmorphism AI assistant interface with:
- Lavender, sky blue, and soft pink color palette
- Dreamy gradient background
- Friendly, futuristic aesthetic
- Soft, bright, slightly holographic appearance

Make the food look fresh, healthy, and appealing."
    )
}
