// Built-in scenarios for the booking site

mod booking;
mod hero;
mod payment_code;
mod products;

pub use booking::{BookingFlow, LegalModals, PaymentFlow, RoundTripDiscount};
pub use hero::{DestinationImages, HeroImage, HeroSearch, HeroTitles, IMAGE_DESTINATIONS, PromoMessage};
pub use payment_code::PaymentCode;
pub use products::ProductPurchase;

use crate::error::{Error, Result};
use crate::scenario::Scenario;

/// Every built-in scenario, in listing order
pub fn all() -> Vec<Box<dyn Scenario>> {
    vec![
        Box::new(HeroSearch),
        Box::new(BookingFlow),
        Box::new(PaymentFlow),
        Box::new(PromoMessage),
        Box::new(PaymentCode),
        Box::new(LegalModals),
        Box::new(DestinationImages),
        Box::new(ProductPurchase),
        Box::new(HeroTitles),
        Box::new(RoundTripDiscount),
    ]
}

/// Looks up a scenario by its CLI name
pub fn find(name: &str) -> Result<Box<dyn Scenario>> {
    all()
        .into_iter()
        .find(|s| s.name() == name)
        .ok_or_else(|| Error::UnknownScenario(name.to_string()))
}
