use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShipmentId(pub String);

/// Physical attributes of the purchasable variant behind a line item.
///
/// Every attribute is optional; the calculator decides how absent values are treated.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub weight: Option<Decimal>,
    #[serde(default)]
    pub width: Option<Decimal>,
    #[serde(default)]
    pub depth: Option<Decimal>,
    #[serde(default)]
    pub height: Option<Decimal>,
}

impl Variant {
    /// Largest of width, depth and height. Missing dimensions count as zero.
    pub fn largest_dimension(&self) -> Decimal {
        [self.width, self.depth, self.height]
            .into_iter()
            .map(|size| size.unwrap_or(Decimal::ZERO))
            .max()
            .unwrap_or(Decimal::ZERO)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub variant: Variant,
    pub quantity: u32,
    pub total: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    #[serde(default)]
    pub line_items: Vec<LineItem>,
}

impl Order {
    /// Sum of line item totals, or `None` when the sum overflows.
    pub fn line_items_total(&self) -> Option<Decimal> {
        self.line_items.iter().try_fold(Decimal::ZERO, |sum, item| sum.checked_add(item.total))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shipment {
    pub id: ShipmentId,
    pub order: Order,
}

/// Anything a shipping calculator can be asked to price.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PricedEntity {
    Order(Order),
    Shipment(Shipment),
    #[serde(other)]
    Unsupported,
}

impl PricedEntity {
    /// The order whose line items drive the price, if this entity has one.
    pub fn resolve_order(&self) -> Option<&Order> {
        match self {
            Self::Order(order) => Some(order),
            Self::Shipment(shipment) => Some(&shipment.order),
            Self::Unsupported => None,
        }
    }
}
