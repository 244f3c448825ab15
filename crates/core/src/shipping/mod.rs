pub mod cost_table;
pub mod weight_tier;

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::order::{Order, PricedEntity};
use crate::errors::DomainError;

use self::weight_tier::{WeightTierCalculator, WeightTierPreferences};

/// Localized labels keyed by label key, supplied by the host.
pub type Translations = HashMap<String, String>;

/// How a calculator identifies itself to the host's calculator picker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct CalculatorDescriptor {
    pub key: &'static str,
    pub label_key: &'static str,
    pub default_label: &'static str,
}

impl CalculatorDescriptor {
    pub fn label(&self, translations: &Translations) -> String {
        translations
            .get(self.label_key)
            .cloned()
            .unwrap_or_else(|| self.default_label.to_string())
    }
}

pub trait ShippingCalculator: Send + Sync {
    fn descriptor(&self) -> &CalculatorDescriptor;
    fn is_available(&self, order: &Order) -> bool;
    fn compute(&self, entity: Option<&PricedEntity>) -> Result<Decimal, DomainError>;
}

pub type CalculatorFactory = fn(&WeightTierPreferences) -> Box<dyn ShippingCalculator>;

struct Registration {
    descriptor: CalculatorDescriptor,
    factory: CalculatorFactory,
}

/// Calculators the host can offer, in registration order.
#[derive(Default)]
pub struct CalculatorRegistry {
    registrations: Vec<Registration>,
}

impl CalculatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(weight_tier::DESCRIPTOR, |preferences| {
            Box::new(WeightTierCalculator::new(preferences.clone()))
        });
        registry
    }

    /// Registers `factory` under `descriptor.key`, replacing any earlier registration.
    pub fn register(&mut self, descriptor: CalculatorDescriptor, factory: CalculatorFactory) {
        let registration = Registration { descriptor, factory };
        match self.registrations.iter_mut().find(|existing| existing.descriptor.key == descriptor.key)
        {
            Some(existing) => *existing = registration,
            None => self.registrations.push(registration),
        }
    }

    pub fn descriptors(&self) -> Vec<CalculatorDescriptor> {
        self.registrations.iter().map(|registration| registration.descriptor).collect()
    }

    pub fn get(&self, key: &str) -> Option<&CalculatorDescriptor> {
        self.registrations
            .iter()
            .find(|registration| registration.descriptor.key == key)
            .map(|registration| &registration.descriptor)
    }

    pub fn build(
        &self,
        key: &str,
        preferences: &WeightTierPreferences,
    ) -> Option<Box<dyn ShippingCalculator>> {
        self.registrations
            .iter()
            .find(|registration| registration.descriptor.key == key)
            .map(|registration| (registration.factory)(preferences))
    }
}
