// Add-products page for an existing reservation

use std::time::Duration;

use async_trait::async_trait;
use playwright_rs::WaitUntil;

use crate::error::Result;
use crate::scenario::{Scenario, ScenarioContext};

pub struct ProductPurchase;

#[async_trait]
impl Scenario for ProductPurchase {
    fn name(&self) -> &'static str {
        "product-purchase"
    }

    fn description(&self) -> &'static str {
        "Open the add-products page for a reservation code"
    }

    async fn run(&self, cx: &ScenarioContext<'_>) -> Result<()> {
        cx.goto_with(
            "/#comprar-productos/JULES-1234",
            Some(WaitUntil::NetworkIdle),
            Duration::from_secs(30),
        )
        .await?;
        cx.expect_visible_within(
            "h1:has-text('Añadir Productos a tu Viaje')",
            Duration::from_secs(20),
        )
        .await?;
        cx.expect_visible_within("h3:has-text('Productos Adicionales')", Duration::from_secs(15))
            .await?;
        cx.checkpoint("compra-productos").await
    }
}
