use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::order::{LineItem, Order, OrderId, PricedEntity};
use crate::errors::DomainError;

use super::cost_table::{validate_costs_string, CostTable};
use super::{CalculatorDescriptor, ShippingCalculator};

pub const DEFAULT_COSTS_STRING: &str = "1:5\n2:7\n5:10\n10:15\n100:50";

pub const DESCRIPTOR: CalculatorDescriptor = CalculatorDescriptor {
    key: "weight_tier",
    label_key: "simple_weight",
    default_label: "Simple Weight",
};

/// Operator-facing settings for the weight tier rule.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightTierPreferences {
    pub costs_string: String,
    pub default_weight: Decimal,
    /// Zero disables the oversized item check.
    pub max_item_size: Decimal,
    pub handling_fee: Decimal,
    /// The handling fee applies while the line item subtotal is below this amount.
    pub handling_max: Decimal,
}

impl Default for WeightTierPreferences {
    fn default() -> Self {
        Self {
            costs_string: DEFAULT_COSTS_STRING.to_string(),
            default_weight: Decimal::ONE,
            max_item_size: Decimal::ZERO,
            handling_fee: Decimal::ZERO,
            handling_max: Decimal::ZERO,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ShippingTraceStep {
    pub stage: String,
    pub detail: String,
    pub amount: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ShippingQuote {
    pub order_id: OrderId,
    pub line_items_total: Decimal,
    pub total_weight: Decimal,
    pub weight_class: Option<Decimal>,
    pub tier_cost: Option<Decimal>,
    pub handling_fee: Decimal,
    pub total: Decimal,
    pub trace: Vec<ShippingTraceStep>,
}

/// Prices an order from a table of weight tiers.
///
/// The tier is the smallest threshold that is not below the order's total weight.
/// [`WeightTierCalculator::is_available`] rejects malformed tables, overweight orders
/// and oversized items; [`WeightTierCalculator::compute`] assumes that check already
/// ran and prices an overweight order at zero.
#[derive(Clone, Debug, Default)]
pub struct WeightTierCalculator {
    preferences: WeightTierPreferences,
}

impl WeightTierCalculator {
    pub fn new(preferences: WeightTierPreferences) -> Self {
        Self { preferences }
    }

    pub fn preferences(&self) -> &WeightTierPreferences {
        &self.preferences
    }

    pub fn is_available(&self, order: &Order) -> bool {
        if let Err(error) = validate_costs_string(&self.preferences.costs_string) {
            warn!(
                event_name = "shipping.weight_tier.invalid_costs",
                order_id = %order.id.0,
                error = %error,
                "weight tier rule unavailable: cost table is malformed"
            );
            return false;
        }

        match self.is_order_overweight(order) {
            Ok(false) => {}
            Ok(true) => {
                debug!(
                    event_name = "shipping.weight_tier.overweight",
                    order_id = %order.id.0,
                    "weight tier rule unavailable: order exceeds every tier"
                );
                return false;
            }
            Err(error) => {
                warn!(
                    event_name = "shipping.weight_tier.unparsable_costs",
                    order_id = %order.id.0,
                    error = %error,
                    "weight tier rule unavailable: cost table could not be parsed"
                );
                return false;
            }
        }

        if self.preferences.max_item_size > Decimal::ZERO {
            if let Some(item) = order.line_items.iter().find(|item| self.is_item_oversized(item)) {
                debug!(
                    event_name = "shipping.weight_tier.oversized",
                    order_id = %order.id.0,
                    largest_dimension = %item.variant.largest_dimension(),
                    max_item_size = %self.preferences.max_item_size,
                    "weight tier rule unavailable: line item is oversized"
                );
                return false;
            }
        }

        true
    }

    /// Sum of `quantity * weight` over line items. A variant without a weight, or with a
    /// weight of exactly zero, weighs `default_weight`.
    pub fn total_weight(&self, order: &Order) -> Result<Decimal, DomainError> {
        order
            .line_items
            .iter()
            .try_fold(Decimal::ZERO, |total, item| {
                Decimal::from(item.quantity)
                    .checked_mul(self.item_weight(item))
                    .and_then(|weight| total.checked_add(weight))
            })
            .ok_or(DomainError::WeightOverflow)
    }

    fn item_weight(&self, item: &LineItem) -> Decimal {
        match item.variant.weight {
            Some(weight) if !weight.is_zero() => weight,
            _ => self.preferences.default_weight,
        }
    }

    pub fn is_item_oversized(&self, item: &LineItem) -> bool {
        if self.preferences.max_item_size.is_zero() {
            return false;
        }

        item.variant.largest_dimension() > self.preferences.max_item_size
    }

    pub fn is_order_overweight(&self, order: &Order) -> Result<bool, DomainError> {
        let table = self.cost_table()?;
        let total_weight = match self.total_weight(order) {
            Ok(total_weight) => total_weight,
            // heavier than any representable tier
            Err(DomainError::WeightOverflow) => return Ok(true),
            Err(error) => return Err(error),
        };

        Ok(table.max_threshold().map_or(true, |max| total_weight > max))
    }

    pub fn handling_fee_for(&self, order: &Order) -> Decimal {
        // An overflowing subtotal is above any ceiling.
        match order.line_items_total() {
            Some(subtotal) if self.preferences.handling_max > subtotal => {
                self.preferences.handling_fee
            }
            _ => Decimal::ZERO,
        }
    }

    /// Prices `entity`. Absent and unsupported entities cost nothing; a shipment is
    /// priced through its order.
    pub fn compute(&self, entity: Option<&PricedEntity>) -> Result<Decimal, DomainError> {
        match entity.and_then(PricedEntity::resolve_order) {
            Some(order) => self.compute_order(order),
            None => Ok(Decimal::ZERO),
        }
    }

    pub fn compute_order(&self, order: &Order) -> Result<Decimal, DomainError> {
        self.quote(order).map(|quote| quote.total)
    }

    pub fn quote(&self, order: &Order) -> Result<ShippingQuote, DomainError> {
        let line_items_total = order.line_items_total().ok_or(DomainError::AmountOverflow)?;
        let handling_fee = self.handling_fee_for(order);
        let total_weight = self.total_weight(order)?;
        let table = self.cost_table()?;
        let weight_class = table.weight_class_for(total_weight);
        let tier_cost = table.cost_for(total_weight);

        let mut trace = vec![
            step("line_items_total", "sum(line_item.total)", line_items_total),
            step(
                "handling_fee",
                format!("applies when handling_max {} > subtotal", self.preferences.handling_max),
                handling_fee,
            ),
            step(
                "total_weight",
                format!("sum(quantity * weight), default weight {}", self.preferences.default_weight),
                total_weight,
            ),
        ];

        let total = match (weight_class, tier_cost) {
            (Some(weight_class), Some(tier_cost)) => {
                trace.push(step(
                    "weight_class",
                    format!("smallest threshold >= total weight is {weight_class}"),
                    tier_cost,
                ));
                tier_cost.checked_add(handling_fee).ok_or(DomainError::AmountOverflow)?
            }
            _ => {
                trace.push(step("weight_class", "no tier covers the total weight", Decimal::ZERO));
                Decimal::ZERO
            }
        };
        trace.push(step("total", "tier cost + handling fee", total));

        debug!(
            event_name = "shipping.weight_tier.computed",
            order_id = %order.id.0,
            total_weight = %total_weight,
            handling_fee = %handling_fee,
            total = %total,
            "weight tier cost computed"
        );

        Ok(ShippingQuote {
            order_id: order.id.clone(),
            line_items_total,
            total_weight,
            weight_class,
            tier_cost,
            handling_fee,
            total,
            trace,
        })
    }

    fn cost_table(&self) -> Result<CostTable, DomainError> {
        CostTable::parse(self.preferences.costs_string.trim())
    }
}

fn step(stage: &str, detail: impl Into<String>, amount: Decimal) -> ShippingTraceStep {
    ShippingTraceStep { stage: stage.to_string(), detail: detail.into(), amount }
}

impl ShippingCalculator for WeightTierCalculator {
    fn descriptor(&self) -> &CalculatorDescriptor {
        &DESCRIPTOR
    }

    fn is_available(&self, order: &Order) -> bool {
        WeightTierCalculator::is_available(self, order)
    }

    fn compute(&self, entity: Option<&PricedEntity>) -> Result<Decimal, DomainError> {
        WeightTierCalculator::compute(self, entity)
    }
}
