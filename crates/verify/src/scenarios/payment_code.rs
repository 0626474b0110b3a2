// Pay-with-code scenario
//
// Validates a payment code against a mocked API so the page can be checked
// without a backend or real codes.

use async_trait::async_trait;

use crate::error::Result;
use crate::intercept::{PaymentCodeResponse, intercept, payment_code_route};
use crate::scenario::{Scenario, ScenarioContext, by_text};

pub struct PaymentCode;

#[async_trait]
impl Scenario for PaymentCode {
    fn name(&self) -> &'static str {
        "payment-code"
    }

    fn description(&self) -> &'static str {
        "Validate TESTCODE against a mocked API and check the child seat badge"
    }

    async fn run(&self, cx: &ScenarioContext<'_>) -> Result<()> {
        cx.goto("/#pagar-con-codigo").await?;
        cx.wait_for("#codigo", cx.timeouts().element).await?;
        cx.checkpoint("initial").await?;

        cx.step("Mock code validation");
        let fixture = PaymentCodeResponse::test_code();
        intercept(
            cx.page(),
            &payment_code_route(&fixture.codigo_pago.codigo),
            fixture.mock()?,
        )
        .await?;

        cx.step("Validate code");
        cx.fill("#codigo", &fixture.codigo_pago.codigo).await?;
        cx.click("button:has-text('Validar Código')").await?;
        cx.wait_for(&by_text("Silla de Niño"), cx.timeouts().element)
            .await?;
        cx.checkpoint("validated").await
    }
}
