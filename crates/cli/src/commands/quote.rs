use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::Serialize;
use shipcalc_core::config::{AppConfig, LoadOptions};
use shipcalc_core::shipping::weight_tier::DESCRIPTOR;
use shipcalc_core::{
    ApplicationError, PricedEntity, ShippingQuote, Translations, WeightTierCalculator,
};
use tracing::info;

use super::CommandResult;

const COMMAND: &str = "quote";

#[derive(Debug, Serialize)]
struct QuoteOutcome {
    command: &'static str,
    status: &'static str,
    calculator: String,
    entity: &'static str,
    available: bool,
    cost: Decimal,
    quote: Option<ShippingQuote>,
}

pub fn run(input: &Path, options: LoadOptions) -> CommandResult {
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "config_validation",
                format!("config validation failed: {error}"),
                2,
            )
        }
    };

    let entity = match read_entity(input) {
        Ok(entity) => entity,
        Err(error) => {
            let interface = ApplicationError::Input(format!("{error:#}")).into_interface(COMMAND);
            return CommandResult::failure(COMMAND, "invalid_input", interface.to_string(), 3);
        }
    };

    let calculator = WeightTierCalculator::new(config.calculator);
    let order = entity.as_ref().and_then(PricedEntity::resolve_order);
    let available = order.is_some_and(|order| calculator.is_available(order));

    let priced = calculator.compute(entity.as_ref()).and_then(|cost| {
        // The trace only exists for entities that resolve to an order.
        order.map(|order| calculator.quote(order)).transpose().map(|quote| (cost, quote))
    });

    let (cost, quote) = match priced {
        Ok(priced) => priced,
        Err(error) => {
            let interface = ApplicationError::from(error).into_interface(COMMAND);
            return CommandResult::failure(
                COMMAND,
                "cost_computation",
                format!("{} ({interface})", interface.user_message()),
                4,
            );
        }
    };

    info!(
        event_name = "cli.quote.completed",
        order_id = order.map(|order| order.id.0.as_str()).unwrap_or("none"),
        available,
        cost = %cost,
        "shipping quote completed"
    );

    let outcome = QuoteOutcome {
        command: COMMAND,
        status: "ok",
        calculator: DESCRIPTOR.label(&Translations::new()),
        entity: entity_kind(entity.as_ref()),
        available,
        cost,
        quote,
    };
    CommandResult::with_payload(COMMAND, &outcome)
}

fn read_entity(path: &Path) -> Result<Option<PricedEntity>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("could not read input file `{}`", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("could not parse input file `{}`", path.display()))
}

fn entity_kind(entity: Option<&PricedEntity>) -> &'static str {
    match entity {
        None => "none",
        Some(PricedEntity::Order(_)) => "order",
        Some(PricedEntity::Shipment(_)) => "shipment",
        Some(PricedEntity::Unsupported) => "unsupported",
    }
}
