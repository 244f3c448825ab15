pub mod config;
pub mod domain;
pub mod errors;
pub mod shipping;

pub use domain::order::{LineItem, Order, OrderId, PricedEntity, Shipment, ShipmentId, Variant};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use shipping::cost_table::{is_valid_costs_string, validate_costs_string, CostTable, WeightTier};
pub use shipping::weight_tier::{
    ShippingQuote, ShippingTraceStep, WeightTierCalculator, WeightTierPreferences,
};
pub use shipping::{CalculatorDescriptor, CalculatorRegistry, ShippingCalculator, Translations};
