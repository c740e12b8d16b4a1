//! Quote aggregate: a quote header plus its line items.
//!
//! All derived figures (covered area, base cost, line totals, extras and total
//! cost) are rewritten here and only here. Callers mutate an owned copy and
//! the store persists it as one unit, so a half-applied state is never
//! visible. A mutation that fails may leave the copy partly updated; the
//! store drops it.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::{AppError, Result};

use super::calculators::{
    calculate_totals, compute_base_cost, compute_line_total, resolve_covered_area,
};
use super::models::{PricingMode, PricingPlan, Quote, QuoteLineItem, QuoteStatus};

/// A line item about to be attached to a quote. The total is computed on
/// insertion.
#[derive(Debug, Clone)]
pub struct NewLineItem {
    pub id: Uuid,
    pub service_id: Uuid,
    pub service_name: String,
    pub pricing_mode: PricingMode,
    pub quantity: i32,
    pub unit_price: Decimal,
}

/// Plan selection carried by a field update.
#[derive(Debug, Clone)]
pub enum PlanChange {
    /// Switch to this (already resolved, active) plan.
    Select(PricingPlan),
    /// Drop the plan reference and keep the current rate and currency.
    Clear,
}

/// Validated partial update of a quote. `None` means "not supplied"; the
/// nested `Option` on clearable fields distinguishes "set to null".
#[derive(Debug, Clone, Default)]
pub struct QuoteChanges {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub project_name: Option<String>,
    pub document_type: Option<Option<String>>,
    pub document_number: Option<Option<String>>,
    pub project_address: Option<Option<String>>,
    pub notes: Option<Option<String>>,
    pub status: Option<QuoteStatus>,
    pub expires_at: Option<Option<NaiveDate>>,
    pub total_area: Option<Decimal>,
    pub uncovered_percent: Option<Decimal>,
    pub covered_area: Option<Decimal>,
    pub floor_count: Option<i32>,
    pub rate_per_area: Option<Decimal>,
    pub currency: Option<String>,
    pub plan: Option<PlanChange>,
    pub plan_name: Option<Option<String>>,
    pub plan_min_days: Option<Option<i32>>,
    pub plan_max_days: Option<Option<i32>>,
}

impl QuoteChanges {
    /// Whether any field that feeds base cost is present.
    pub fn touches_pricing(&self) -> bool {
        self.total_area.is_some()
            || self.uncovered_percent.is_some()
            || self.covered_area.is_some()
            || self.floor_count.is_some()
            || self.rate_per_area.is_some()
            || matches!(self.plan, Some(PlanChange::Select(_)))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuoteAggregate {
    quote: Quote,
    line_items: Vec<QuoteLineItem>,
}

impl QuoteAggregate {
    /// Build a new aggregate and derive every figure from its inputs.
    ///
    /// The derived fields of `quote` are ignored and overwritten.
    pub fn create(
        quote: Quote,
        items: Vec<NewLineItem>,
        explicit_covered: Option<Decimal>,
    ) -> Result<Self> {
        let quote_id = quote.id;
        let line_items = items
            .into_iter()
            .map(|item| QuoteLineItem {
                id: item.id,
                quote_id,
                service_id: item.service_id,
                service_name: item.service_name,
                pricing_mode: item.pricing_mode,
                quantity: item.quantity,
                unit_price: item.unit_price,
                line_total: Decimal::ZERO,
            })
            .collect();

        let mut aggregate = Self { quote, line_items };
        aggregate.recompute(explicit_covered)?;
        Ok(aggregate)
    }

    /// Rehydrate from storage. Stored figures are trusted as-is.
    pub fn from_parts(quote: Quote, line_items: Vec<QuoteLineItem>) -> Self {
        Self { quote, line_items }
    }

    pub fn id(&self) -> Uuid {
        self.quote.id
    }

    pub fn quote(&self) -> &Quote {
        &self.quote
    }

    pub fn line_items(&self) -> &[QuoteLineItem] {
        &self.line_items
    }

    pub fn line_item(&self, item_id: Uuid) -> Option<&QuoteLineItem> {
        self.line_items.iter().find(|item| item.id == item_id)
    }

    pub fn into_parts(self) -> (Quote, Vec<QuoteLineItem>) {
        (self.quote, self.line_items)
    }

    /// Full recomputation: covered area, base cost, every line total, then
    /// extras and total cost.
    pub fn recompute(&mut self, explicit_covered: Option<Decimal>) -> Result<()> {
        let quote = &mut self.quote;
        quote.covered_area =
            resolve_covered_area(quote.total_area, quote.uncovered_percent, explicit_covered);
        quote.base_cost =
            compute_base_cost(quote.covered_area, quote.floor_count, quote.rate_per_area)?;

        let (total_area, base_cost) = (quote.total_area, quote.base_cost);
        for item in &mut self.line_items {
            item.line_total = compute_line_total(
                item.pricing_mode,
                item.unit_price,
                item.quantity,
                total_area,
                base_cost,
            )?;
        }

        self.refresh_totals()
    }

    /// Re-derive extras and total cost from the current line items.
    fn refresh_totals(&mut self) -> Result<()> {
        let totals = calculate_totals(
            self.quote.base_cost,
            self.line_items.iter().map(|item| item.line_total),
        )?;
        self.quote.extras_cost = totals.extras_cost;
        self.quote.total_cost = totals.total_cost;
        Ok(())
    }

    fn line_total(
        &self,
        mode: PricingMode,
        unit_price: Decimal,
        quantity: i32,
    ) -> Result<Decimal> {
        compute_line_total(
            mode,
            unit_price,
            quantity,
            self.quote.total_area,
            self.quote.base_cost,
        )
    }

    /// Apply a validated field update. Returns whether a full recomputation
    /// ran.
    pub fn apply_changes(&mut self, changes: QuoteChanges) -> Result<bool> {
        let recompute = changes.touches_pricing();
        let quote = &mut self.quote;

        if let Some(v) = changes.full_name {
            quote.full_name = v;
        }
        if let Some(v) = changes.phone {
            quote.phone = v;
        }
        if let Some(v) = changes.email {
            quote.email = v;
        }
        if let Some(v) = changes.project_name {
            quote.project_name = v;
        }
        if let Some(v) = changes.document_type {
            quote.document_type = v;
        }
        if let Some(v) = changes.document_number {
            quote.document_number = v;
        }
        if let Some(v) = changes.project_address {
            quote.project_address = v;
        }
        if let Some(v) = changes.notes {
            quote.notes = v;
        }
        if let Some(v) = changes.status {
            quote.status = v;
        }
        if let Some(v) = changes.expires_at {
            quote.expires_at = v;
        }

        if let Some(v) = changes.total_area {
            quote.total_area = v;
        }
        if let Some(v) = changes.uncovered_percent {
            quote.uncovered_percent = v;
        }
        if let Some(v) = changes.floor_count {
            quote.floor_count = v;
        }

        // A hand-set rate or currency means the quote no longer follows a plan.
        if let Some(v) = changes.rate_per_area {
            quote.rate_per_area = v;
            quote.pricing_plan_id = None;
        }
        if let Some(v) = changes.currency {
            quote.currency = v;
            quote.pricing_plan_id = None;
        }

        match changes.plan {
            Some(PlanChange::Select(plan)) => {
                quote.pricing_plan_id = Some(plan.id);
                quote.rate_per_area = plan.rate_per_area;
                quote.currency = plan.currency;
                quote.plan_name = Some(plan.name);
                quote.plan_min_days = plan.min_days;
                quote.plan_max_days = plan.max_days;
            }
            plan => {
                if let Some(PlanChange::Clear) = plan {
                    quote.pricing_plan_id = None;
                }
                if let Some(v) = changes.plan_name {
                    quote.plan_name = v;
                }
                if let Some(v) = changes.plan_min_days {
                    quote.plan_min_days = v;
                }
                if let Some(v) = changes.plan_max_days {
                    quote.plan_max_days = v;
                }
            }
        }

        if recompute {
            self.recompute(changes.covered_area)?;
        }
        Ok(recompute)
    }

    /// Attach a line item priced against the current base cost.
    pub fn add_line_item(&mut self, item: NewLineItem) -> Result<&QuoteLineItem> {
        let line_total = self.line_total(item.pricing_mode, item.unit_price, item.quantity)?;
        self.line_items.push(QuoteLineItem {
            id: item.id,
            quote_id: self.quote.id,
            service_id: item.service_id,
            service_name: item.service_name,
            pricing_mode: item.pricing_mode,
            quantity: item.quantity,
            unit_price: item.unit_price,
            line_total,
        });
        self.refresh_totals()?;

        let last = self.line_items.len() - 1;
        Ok(&self.line_items[last])
    }

    /// Edit quantity and/or unit price of one item and reprice it.
    pub fn update_line_item(
        &mut self,
        item_id: Uuid,
        quantity: Option<i32>,
        unit_price: Option<Decimal>,
    ) -> Result<&QuoteLineItem> {
        let index = self
            .line_items
            .iter()
            .position(|item| item.id == item_id)
            .ok_or_else(|| AppError::NotFound(format!("Quote line item {}", item_id)))?;

        let (mode, new_quantity, new_price) = {
            let item = &self.line_items[index];
            (
                item.pricing_mode,
                quantity.unwrap_or(item.quantity),
                unit_price.unwrap_or(item.unit_price),
            )
        };
        let line_total = self.line_total(mode, new_price, new_quantity)?;

        let item = &mut self.line_items[index];
        item.quantity = new_quantity;
        item.unit_price = new_price;
        item.line_total = line_total;

        self.refresh_totals()?;
        Ok(&self.line_items[index])
    }

    /// Detach one item.
    pub fn remove_line_item(&mut self, item_id: Uuid) -> Result<QuoteLineItem> {
        let index = self
            .line_items
            .iter()
            .position(|item| item.id == item_id)
            .ok_or_else(|| AppError::NotFound(format!("Quote line item {}", item_id)))?;

        let removed = self.line_items.remove(index);
        self.refresh_totals()?;
        Ok(removed)
    }

    /// Check the derived figures against their inputs.
    ///
    /// Covered area is not checked since it may carry an explicit override.
    /// Figures that can no longer be computed count as inconsistent.
    pub fn is_consistent(&self) -> bool {
        let q = &self.quote;
        match compute_base_cost(q.covered_area, q.floor_count, q.rate_per_area) {
            Ok(base_cost) if base_cost == q.base_cost => {}
            _ => return false,
        }
        let lines_ok = self.line_items.iter().all(|item| {
            item.quote_id == q.id
                && compute_line_total(
                    item.pricing_mode,
                    item.unit_price,
                    item.quantity,
                    q.total_area,
                    q.base_cost,
                )
                .is_ok_and(|total| total == item.line_total)
        });
        let totals = calculate_totals(q.base_cost, self.line_items.iter().map(|i| i.line_total));
        lines_ok
            && totals.is_ok_and(|t| q.extras_cost == t.extras_cost && q.total_cost == t.total_cost)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    pub(crate) fn sample_quote() -> Quote {
        Quote {
            id: Uuid::new_v4(),
            full_name: "Ana Torres".to_string(),
            phone: "+51 999 111 222".to_string(),
            email: "ana@example.com".to_string(),
            document_type: None,
            document_number: None,
            project_name: "Casa Miraflores".to_string(),
            project_address: None,
            total_area: dec!(100),
            uncovered_percent: dec!(30),
            covered_area: Decimal::ZERO,
            floor_count: 1,
            pricing_plan_id: None,
            rate_per_area: dec!(500),
            currency: "PEN".to_string(),
            plan_name: None,
            plan_min_days: None,
            plan_max_days: None,
            base_cost: Decimal::ZERO,
            extras_cost: Decimal::ZERO,
            total_cost: Decimal::ZERO,
            status: QuoteStatus::New,
            notes: None,
            expires_at: None,
            created_at: Utc::now(),
        }
    }

    fn item(mode: PricingMode, price: Decimal, quantity: i32) -> NewLineItem {
        NewLineItem {
            id: Uuid::new_v4(),
            service_id: Uuid::new_v4(),
            service_name: format!("{} service", mode),
            pricing_mode: mode,
            quantity,
            unit_price: price,
        }
    }

    fn plan(rate: Decimal, currency: &str) -> PricingPlan {
        PricingPlan {
            id: Uuid::new_v4(),
            name: "Premium".to_string(),
            rate_per_area: rate,
            currency: currency.to_string(),
            min_days: Some(30),
            max_days: Some(45),
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_create_derives_all_figures() {
        let agg = QuoteAggregate::create(sample_quote(), vec![], None).unwrap();
        let q = agg.quote();
        assert_eq!(q.covered_area, dec!(70.00));
        assert_eq!(q.base_cost, dec!(35000.00));
        assert_eq!(q.extras_cost, dec!(0));
        assert_eq!(q.total_cost, dec!(35000.00));
        assert!(agg.is_consistent());
    }

    #[test]
    fn test_create_with_items_prices_against_new_base() {
        let agg = QuoteAggregate::create(
            sample_quote(),
            vec![
                item(PricingMode::Flat, dec!(1500), 1),
                item(PricingMode::Percentage, dec!(10), 1),
                item(PricingMode::PerArea, dec!(5), 2),
            ],
            None,
        )
        .unwrap();
        let totals: Vec<_> = agg.line_items().iter().map(|i| i.line_total).collect();
        assert_eq!(totals, vec![dec!(1500), dec!(3500), dec!(1000)]);
        assert_eq!(agg.quote().extras_cost, dec!(6000));
        assert_eq!(agg.quote().total_cost, dec!(41000));
        assert!(agg.is_consistent());
    }

    #[test]
    fn test_add_flat_item() {
        let mut agg = QuoteAggregate::create(sample_quote(), vec![], None).unwrap();
        let added = agg
            .add_line_item(item(PricingMode::Flat, dec!(1500), 1))
            .unwrap()
            .clone();
        assert_eq!(added.line_total, dec!(1500.00));
        assert_eq!(added.quote_id, agg.id());
        assert_eq!(agg.quote().extras_cost, dec!(1500.00));
        assert_eq!(agg.quote().total_cost, dec!(36500.00));
    }

    #[test]
    fn test_percentage_item_tracks_area_edit() {
        let mut agg = QuoteAggregate::create(sample_quote(), vec![], None).unwrap();
        agg.add_line_item(item(PricingMode::Percentage, dec!(10), 1)).unwrap();
        assert_eq!(agg.quote().total_cost, dec!(38500.00));

        let recomputed = agg.apply_changes(QuoteChanges {
            total_area: Some(dec!(200)),
            ..Default::default()
        })
        .unwrap();

        assert!(recomputed);
        let q = agg.quote();
        assert_eq!(q.covered_area, dec!(140.00));
        assert_eq!(q.base_cost, dec!(70000.00));
        assert_eq!(agg.line_items()[0].line_total, dec!(7000.00));
        assert_eq!(q.total_cost, dec!(77000.00));
        assert!(agg.is_consistent());
    }

    #[test]
    fn test_label_only_changes_skip_recompute() {
        let mut agg = QuoteAggregate::create(sample_quote(), vec![], Some(dec!(80))).unwrap();
        let recomputed = agg.apply_changes(QuoteChanges {
            status: Some(QuoteStatus::Sent),
            notes: Some(Some("call back".to_string())),
            ..Default::default()
        })
        .unwrap();
        assert!(!recomputed);
        assert_eq!(agg.quote().status, QuoteStatus::Sent);
        // the explicit override survives edits that do not touch pricing
        assert_eq!(agg.quote().covered_area, dec!(80));
    }

    #[test]
    fn test_explicit_covered_area_is_single_shot() {
        let mut agg = QuoteAggregate::create(sample_quote(), vec![], None).unwrap();
        agg.apply_changes(QuoteChanges {
            covered_area: Some(dec!(90)),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(agg.quote().covered_area, dec!(90));
        assert_eq!(agg.quote().base_cost, dec!(45000));

        agg.apply_changes(QuoteChanges {
            floor_count: Some(2),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(agg.quote().covered_area, dec!(70));
        assert_eq!(agg.quote().base_cost, dec!(70000));
    }

    #[test]
    fn test_plan_switch_overwrites_rate_currency_and_snapshot() {
        let mut agg = QuoteAggregate::create(sample_quote(), vec![], None).unwrap();
        agg.add_line_item(item(PricingMode::Percentage, dec!(10), 1)).unwrap();
        let premium = plan(dec!(800), "USD");

        agg.apply_changes(QuoteChanges {
            plan: Some(PlanChange::Select(premium.clone())),
            ..Default::default()
        })
        .unwrap();

        let q = agg.quote();
        assert_eq!(q.pricing_plan_id, Some(premium.id));
        assert_eq!(q.rate_per_area, dec!(800));
        assert_eq!(q.currency, "USD");
        assert_eq!(q.plan_name.as_deref(), Some("Premium"));
        assert_eq!(q.plan_min_days, Some(30));
        assert_eq!(q.plan_max_days, Some(45));
        assert_eq!(q.base_cost, dec!(56000));
        assert_eq!(agg.line_items()[0].line_total, dec!(5600));
        assert_eq!(q.total_cost, dec!(61600));
    }

    #[test]
    fn test_plan_select_ignores_manual_snapshot_fields() {
        let mut agg = QuoteAggregate::create(sample_quote(), vec![], None).unwrap();
        agg.apply_changes(QuoteChanges {
            plan: Some(PlanChange::Select(plan(dec!(600), "PEN"))),
            plan_name: Some(Some("Hand typed".to_string())),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(agg.quote().plan_name.as_deref(), Some("Premium"));
    }

    #[test]
    fn test_plan_clear_keeps_rate_and_snapshot() {
        let mut agg = QuoteAggregate::create(sample_quote(), vec![], None).unwrap();
        agg.apply_changes(QuoteChanges {
            plan: Some(PlanChange::Select(plan(dec!(600), "USD"))),
            ..Default::default()
        })
        .unwrap();
        let before = agg.quote().clone();

        let recomputed = agg.apply_changes(QuoteChanges {
            plan: Some(PlanChange::Clear),
            ..Default::default()
        })
        .unwrap();

        assert!(!recomputed);
        let q = agg.quote();
        assert_eq!(q.pricing_plan_id, None);
        assert_eq!(q.rate_per_area, before.rate_per_area);
        assert_eq!(q.currency, "USD");
        assert_eq!(q.plan_name, before.plan_name);
        assert_eq!(q.total_cost, before.total_cost);
    }

    #[test]
    fn test_manual_rate_detaches_plan() {
        let mut agg = QuoteAggregate::create(sample_quote(), vec![], None).unwrap();
        agg.apply_changes(QuoteChanges {
            plan: Some(PlanChange::Select(plan(dec!(600), "PEN"))),
            ..Default::default()
        })
        .unwrap();
        agg.apply_changes(QuoteChanges {
            rate_per_area: Some(dec!(450)),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(agg.quote().pricing_plan_id, None);
        assert_eq!(agg.quote().base_cost, dec!(31500));
    }

    #[test]
    fn test_apply_same_changes_twice_is_idempotent() {
        let changes = QuoteChanges {
            total_area: Some(dec!(180)),
            uncovered_percent: Some(dec!(25)),
            floor_count: Some(2),
            status: Some(QuoteStatus::Reviewed),
            ..Default::default()
        };
        let mut agg = QuoteAggregate::create(sample_quote(), vec![], None).unwrap();
        agg.add_line_item(item(PricingMode::PerArea, dec!(3), 1)).unwrap();

        agg.apply_changes(changes.clone()).unwrap();
        let once = agg.clone();
        agg.apply_changes(changes).unwrap();
        assert_eq!(agg, once);
    }

    #[test]
    fn test_update_line_item_reprices_against_current_base() {
        let mut agg = QuoteAggregate::create(sample_quote(), vec![], None).unwrap();
        let id = agg
            .add_line_item(item(PricingMode::Percentage, dec!(10), 1))
            .unwrap()
            .id;

        let updated = agg.update_line_item(id, Some(2), Some(dec!(5))).unwrap().clone();
        assert_eq!(updated.quantity, 2);
        assert_eq!(updated.unit_price, dec!(5));
        assert_eq!(updated.line_total, dec!(3500));
        assert_eq!(agg.quote().total_cost, dec!(38500));
        assert!(agg.is_consistent());
    }

    #[test]
    fn test_update_missing_line_item_is_not_found() {
        let mut agg = QuoteAggregate::create(sample_quote(), vec![], None).unwrap();
        let before = agg.clone();
        let err = agg.update_line_item(Uuid::new_v4(), Some(2), None).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(agg, before);
    }

    #[test]
    fn test_remove_line_item() {
        let mut agg = QuoteAggregate::create(sample_quote(), vec![], None).unwrap();
        let keep = agg.add_line_item(item(PricingMode::Flat, dec!(1500), 1)).unwrap().id;
        let drop = agg.add_line_item(item(PricingMode::Flat, dec!(200), 2)).unwrap().id;
        assert_eq!(agg.quote().extras_cost, dec!(1900));

        let removed = agg.remove_line_item(drop).unwrap();
        assert_eq!(removed.id, drop);
        assert_eq!(agg.line_items().len(), 1);
        assert_eq!(agg.line_items()[0].id, keep);
        assert_eq!(agg.quote().extras_cost, dec!(1500));
        assert_eq!(agg.quote().total_cost, dec!(36500));

        assert!(matches!(agg.remove_line_item(drop), Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_oversized_floor_count_is_validation_error() {
        let mut agg = QuoteAggregate::create(sample_quote(), vec![], None).unwrap();
        let err = agg
            .apply_changes(QuoteChanges {
                total_area: Some(dec!(1000000000000000)),
                rate_per_area: Some(dec!(1000000000)),
                floor_count: Some(2_000_000_000),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "baseCost"));
    }

    #[test]
    fn test_oversized_line_item_is_validation_error() {
        let mut agg = QuoteAggregate::create(sample_quote(), vec![], None).unwrap();
        let before = agg.clone();
        let err = agg
            .add_line_item(item(PricingMode::PerArea, dec!(999999999999), 1_000_000))
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "lineTotal"));
        assert_eq!(agg, before);
    }

    #[test]
    fn test_is_consistent_detects_tampering() {
        let agg = QuoteAggregate::create(sample_quote(), vec![], None).unwrap();
        let (mut quote, items) = agg.into_parts();
        quote.total_cost += Decimal::ONE;
        assert!(!QuoteAggregate::from_parts(quote, items).is_consistent());
    }
}
