//! Persistence collaborator: meal and item records plus append-only tracking.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::domains::{
    ConsumptionRecord, FoodItem, GeneratedPlan, MealSlot, Nutrients, TrackingHistory,
};
use crate::error::{PlannerError, PlannerResult};

#[derive(Clone, Debug, PartialEq)]
pub struct MealItemRecord {
    pub id: String,
    pub meal_id: String,
    pub name: String,
    pub nutrients: Nutrients,
    pub image_url: Option<String>,
    pub history: TrackingHistory,
}

/// One (user, date, slot) meal.
#[derive(Clone, Debug, PartialEq)]
pub struct MealRecord {
    pub id: String,
    pub user_id: String,
    pub date: NaiveDate,
    pub slot: MealSlot,
    pub items: Vec<MealItemRecord>,
}

/// An item with the meal it belongs to.
#[derive(Clone, Debug, PartialEq)]
pub struct ItemContext {
    pub user_id: String,
    pub date: NaiveDate,
    pub slot: MealSlot,
    pub item: MealItemRecord,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReplaceSummary {
    pub deleted_meals: usize,
    pub created_meals: usize,
    pub created_items: usize,
}

#[async_trait]
pub trait PlanStore: Send + Sync + 'static {
    /// Meals dated in `[from, until)`, or from `from` onward when `until` is
    /// `None`. Ordered by date, then slot.
    async fn meals_in_range(
        &self,
        user_id: &str,
        from: NaiveDate,
        until: Option<NaiveDate>,
    ) -> PlannerResult<Vec<MealRecord>>;

    async fn find_item(&self, item_id: &str) -> PlannerResult<Option<ItemContext>>;

    /// Adds a tracking event to the item named in `record`.
    async fn append_tracking(&self, record: ConsumptionRecord) -> PlannerResult<()>;

    /// Store day `d` of `plan` on `start_date + (d - 1)`.
    async fn create_plan(
        &self,
        user_id: &str,
        start_date: NaiveDate,
        plan: &GeneratedPlan,
    ) -> PlannerResult<ReplaceSummary>;

    /// Delete every meal dated on or after `from`. Returns the number removed.
    async fn delete_from(&self, user_id: &str, from: NaiveDate) -> PlannerResult<usize>;

    /// [`delete_from`](Self::delete_from) followed by
    /// [`create_plan`](Self::create_plan) as one atomic step.
    async fn replace_plan_from(
        &self,
        user_id: &str,
        from: NaiveDate,
        start_date: NaiveDate,
        plan: &GeneratedPlan,
    ) -> PlannerResult<ReplaceSummary>;

    async fn set_item_image(&self, item_id: &str, image_url: String) -> PlannerResult<()>;

    async fn meals_on(&self, user_id: &str, date: NaiveDate) -> PlannerResult<Vec<MealRecord>> {
        let next = date
            .checked_add_days(Days::new(1))
            .ok_or_else(|| PlannerError::Validation(format!("date out of range: {date}")))?;
        self.meals_in_range(user_id, date, Some(next)).await
    }
}

/// Process-local store. Everything is lost on restart.
#[derive(Clone, Default)]
pub struct InMemoryPlanStore {
    meals: Arc<Mutex<HashMap<String, Vec<MealRecord>>>>,
}

impl InMemoryPlanStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a single meal outside of any plan, e.g. to seed a partial week.
    pub async fn insert_meal(
        &self,
        user_id: &str,
        date: NaiveDate,
        slot: MealSlot,
        items: Vec<FoodItem>,
    ) -> MealRecord {
        let meal_id = Uuid::new_v4().to_string();
        let record = MealRecord {
            id: meal_id.clone(),
            user_id: user_id.to_string(),
            date,
            slot,
            items: items
                .into_iter()
                .map(|food| MealItemRecord {
                    id: Uuid::new_v4().to_string(),
                    meal_id: meal_id.clone(),
                    nutrients: food.nutrients(),
                    name: food.name,
                    image_url: None,
                    history: TrackingHistory::new(),
                })
                .collect(),
        };
        self.meals
            .lock()
            .await
            .entry(user_id.to_string())
            .or_default()
            .push(record.clone());
        record
    }
}

fn build_meals(
    user_id: &str,
    start_date: NaiveDate,
    plan: &GeneratedPlan,
) -> PlannerResult<Vec<MealRecord>> {
    let mut out = Vec::new();
    for (&day, day_plan) in &plan.days {
        let date = start_date
            .checked_add_days(Days::new(u64::from(day.saturating_sub(1))))
            .ok_or_else(|| PlannerError::Store(format!("plan day {day} is out of date range")))?;
        for (slot, items) in day_plan.slots() {
            let meal_id = Uuid::new_v4().to_string();
            let items = items
                .iter()
                .map(|food| MealItemRecord {
                    id: Uuid::new_v4().to_string(),
                    meal_id: meal_id.clone(),
                    name: food.name.clone(),
                    nutrients: food.nutrients(),
                    image_url: None,
                    history: TrackingHistory::new(),
                })
                .collect();
            out.push(MealRecord {
                id: meal_id,
                user_id: user_id.to_string(),
                date,
                slot,
                items,
            });
        }
    }
    Ok(out)
}

fn summary_of(created: &[MealRecord], deleted_meals: usize) -> ReplaceSummary {
    ReplaceSummary {
        deleted_meals,
        created_meals: created.len(),
        created_items: created.iter().map(|m| m.items.len()).sum(),
    }
}

fn delete_locked(meals: &mut Vec<MealRecord>, from: NaiveDate) -> usize {
    let before = meals.len();
    meals.retain(|m| m.date < from);
    before - meals.len()
}

fn find_item_mut<'a>(
    all: &'a mut HashMap<String, Vec<MealRecord>>,
    item_id: &str,
) -> Option<&'a mut MealItemRecord> {
    all.values_mut()
        .flat_map(|meals| meals.iter_mut())
        .flat_map(|m| m.items.iter_mut())
        .find(|i| i.id == item_id)
}

fn item_not_found() -> PlannerError {
    PlannerError::NotFound("Meal item not found".into())
}

#[async_trait]
impl PlanStore for InMemoryPlanStore {
    async fn meals_in_range(
        &self,
        user_id: &str,
        from: NaiveDate,
        until: Option<NaiveDate>,
    ) -> PlannerResult<Vec<MealRecord>> {
        let all = self.meals.lock().await;
        let mut out: Vec<MealRecord> = all
            .get(user_id)
            .map(|meals| {
                meals
                    .iter()
                    .filter(|m| m.date >= from && until.is_none_or(|u| m.date < u))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        out.sort_by_key(|m| (m.date, m.slot));
        Ok(out)
    }

    async fn find_item(&self, item_id: &str) -> PlannerResult<Option<ItemContext>> {
        let all = self.meals.lock().await;
        let found = all.values().flatten().find_map(|meal| {
            meal.items.iter().find(|i| i.id == item_id).map(|item| ItemContext {
                user_id: meal.user_id.clone(),
                date: meal.date,
                slot: meal.slot,
                item: item.clone(),
            })
        });
        Ok(found)
    }

    async fn append_tracking(&self, record: ConsumptionRecord) -> PlannerResult<()> {
        let mut all = self.meals.lock().await;
        let item = find_item_mut(&mut all, &record.item_id).ok_or_else(item_not_found)?;
        item.history.append(record);
        Ok(())
    }

    async fn create_plan(
        &self,
        user_id: &str,
        start_date: NaiveDate,
        plan: &GeneratedPlan,
    ) -> PlannerResult<ReplaceSummary> {
        let created = build_meals(user_id, start_date, plan)?;
        let summary = summary_of(&created, 0);
        let mut all = self.meals.lock().await;
        all.entry(user_id.to_string()).or_default().extend(created);
        Ok(summary)
    }

    async fn delete_from(&self, user_id: &str, from: NaiveDate) -> PlannerResult<usize> {
        let mut all = self.meals.lock().await;
        Ok(all
            .get_mut(user_id)
            .map(|meals| delete_locked(meals, from))
            .unwrap_or(0))
    }

    async fn replace_plan_from(
        &self,
        user_id: &str,
        from: NaiveDate,
        start_date: NaiveDate,
        plan: &GeneratedPlan,
    ) -> PlannerResult<ReplaceSummary> {
        // build first so a bad plan leaves existing meals untouched
        let created = build_meals(user_id, start_date, plan)?;
        let mut all = self.meals.lock().await;
        let meals = all.entry(user_id.to_string()).or_default();
        let deleted = delete_locked(meals, from);
        let summary = summary_of(&created, deleted);
        meals.extend(created);
        Ok(summary)
    }

    async fn set_item_image(&self, item_id: &str, image_url: String) -> PlannerResult<()> {
        let mut all = self.meals.lock().await;
        let item = find_item_mut(&mut all, item_id).ok_or_else(item_not_found)?;
        item.image_url = Some(image_url);
        Ok(())
    }
}

/// Per-user mutual exclusion for plan replacement.
#[derive(Clone, Default)]
pub struct UserLeases {
    locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl UserLeases {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until no other holder exists for `user_id`.
    pub async fn acquire(&self, user_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks.entry(user_id.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::{ConsumptionStatus, fallback_plan};
    use chrono::Utc;
    use std::time::Duration;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[tokio::test]
    async fn create_plan_lays_days_out_from_start() {
        let store = InMemoryPlanStore::new();
        let summary = store
            .create_plan("u1", d(2024, 3, 1), &fallback_plan(2000, "none", 3))
            .await
            .unwrap();
        assert_eq!(summary.created_meals, 9);
        assert_eq!(summary.created_items, 18);

        let meals = store.meals_in_range("u1", d(2024, 3, 1), None).await.unwrap();
        assert_eq!(meals.len(), 9);
        assert_eq!(meals[0].date, d(2024, 3, 1));
        assert_eq!(meals[0].slot, MealSlot::Breakfast);
        assert_eq!(meals[8].date, d(2024, 3, 3));
        assert_eq!(meals[8].slot, MealSlot::Dinner);

        assert_eq!(store.meals_on("u1", d(2024, 3, 2)).await.unwrap().len(), 3);
        assert!(store.meals_in_range("u2", d(2024, 3, 1), None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn replace_keeps_past_meals() {
        let store = InMemoryPlanStore::new();
        store
            .create_plan("u1", d(2024, 3, 1), &fallback_plan(2000, "none", 5))
            .await
            .unwrap();
        let summary = store
            .replace_plan_from("u1", d(2024, 3, 3), d(2024, 3, 3), &fallback_plan(1800, "vegan", 2))
            .await
            .unwrap();
        assert_eq!(summary.deleted_meals, 9);
        assert_eq!(summary.created_meals, 6);

        let past = store
            .meals_in_range("u1", d(2024, 3, 1), Some(d(2024, 3, 3)))
            .await
            .unwrap();
        assert_eq!(past.len(), 6);
        let future = store.meals_in_range("u1", d(2024, 3, 3), None).await.unwrap();
        assert_eq!(future.len(), 6);
        assert_eq!(future[0].items[0].name, "Oatmeal with Berries");
    }

    #[tokio::test]
    async fn tracking_appends_and_missing_items_are_not_found() {
        let store = InMemoryPlanStore::new();
        store
            .create_plan("u1", d(2024, 3, 1), &fallback_plan(2000, "none", 1))
            .await
            .unwrap();
        let item_id = store.meals_on("u1", d(2024, 3, 1)).await.unwrap()[0].items[0].id.clone();

        for status in [ConsumptionStatus::Skipped, ConsumptionStatus::Eaten] {
            store
                .append_tracking(ConsumptionRecord {
                    item_id: item_id.clone(),
                    status,
                    quantity_ratio: 1.0,
                    timestamp: Utc::now(),
                })
                .await
                .unwrap();
        }
        let ctx = store.find_item(&item_id).await.unwrap().expect("item");
        assert_eq!(ctx.item.history.len(), 2);
        assert_eq!(ctx.slot, MealSlot::Breakfast);

        let err = store
            .append_tracking(ConsumptionRecord {
                item_id: "nope".into(),
                status: ConsumptionStatus::Eaten,
                quantity_ratio: 1.0,
                timestamp: Utc::now(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, PlannerError::NotFound(_)));
        assert!(store.find_item("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn leases_serialize_same_user_only() {
        let leases = UserLeases::new();
        let held = leases.acquire("u1").await;

        // a different user is never blocked
        let other = tokio::time::timeout(Duration::from_millis(50), leases.acquire("u2")).await;
        assert!(other.is_ok());

        let same = tokio::time::timeout(Duration::from_millis(50), leases.acquire("u1")).await;
        assert!(same.is_err());

        drop(held);
        let again = tokio::time::timeout(Duration::from_millis(50), leases.acquire("u1")).await;
        assert!(again.is_ok());
    }
}
