// Booking form scenarios
//
// Quote, personal details, payment selection and the legal modals of the
// multi-step booking form.

use std::time::Duration;

use async_trait::async_trait;
use playwright_rs::{SelectOption, WaitUntil, expect};

use crate::config::ViewportSize;
use crate::error::Result;
use crate::scenario::{Scenario, ScenarioContext, by_role, by_text};

const ORIGIN: &str = "Aeropuerto La Araucanía";
const DESTINATION: &str = "Pucón";

fn label(text: &str) -> SelectOption {
    SelectOption::Label(text.to_string())
}

/// Quote then personal details
pub struct BookingFlow;

#[async_trait]
impl Scenario for BookingFlow {
    fn name(&self) -> &'static str {
        "booking-flow"
    }

    fn description(&self) -> &'static str {
        "Request a quote and fill the personal details step"
    }

    async fn run(&self, cx: &ScenarioContext<'_>) -> Result<()> {
        cx.goto("/").await?;
        cx.expect_visible_within(
            &by_role("heading", "Viaja a cualquier lugar"),
            Duration::from_secs(15),
        )
        .await?;

        cx.step("Fill quote form");
        cx.select("select[name=\"origen\"]", label(ORIGIN)).await?;
        cx.select("select[name=\"destino\"]", label(DESTINATION)).await?;
        cx.fill("input[name=\"fecha\"]", "2025-12-24").await?;
        cx.select("select[name=\"pasajeros\"]", "2").await?;
        cx.click(&by_role("button", "Ver precios")).await?;

        cx.step("Fill personal details");
        cx.expect_visible_within(&by_role("button", "Pagar con Flow"), Duration::from_secs(5))
            .await?;
        cx.fill("input[name=\"nombre\"]", "Juan Pérez").await?;
        cx.fill("input[name=\"email\"]", "juan.perez@example.com")
            .await?;
        cx.fill("input[name=\"telefono\"]", "+56912345678").await?;
        cx.checkpoint("verification").await
    }
}

/// Full booking through payment selection and the gateway's success return
pub struct PaymentFlow;

impl PaymentFlow {
    /// Lands on the app as the payment gateway would after a successful
    /// payment. The gateway itself is never contacted.
    async fn simulate_gateway_return(&self, cx: &ScenarioContext<'_>) -> Result<()> {
        cx.step("Simulate gateway success return");
        let path = format!(
            "/?flow_payment=success&reserva_id={}",
            cx.gateway_reservation_id()
        );
        cx.goto(&path).await
    }
}

#[async_trait]
impl Scenario for PaymentFlow {
    fn name(&self) -> &'static str {
        "payment-flow"
    }

    fn description(&self) -> &'static str {
        "Book a trip, choose a 40% deposit via Flow and land on the completion page"
    }

    async fn run(&self, cx: &ScenarioContext<'_>) -> Result<()> {
        cx.goto("/").await?;

        cx.step("Open booking form");
        let reservar = format!("section#inicio >> {}", by_role("button", "🚀 Reservar ahora"));
        cx.expect_visible(&reservar).await?;
        expect(cx.locator(&reservar).await)
            .with_timeout(cx.timeouts().assertion)
            .to_be_enabled()
            .await?;
        cx.force_click(&reservar).await?;

        cx.step("Trip details");
        cx.select("select[name=\"origen\"]", label(ORIGIN)).await?;
        cx.select("select[name=\"destino\"]", label(DESTINATION)).await?;
        cx.fill("input[name=\"fecha\"]", "2025-12-24").await?;
        cx.select("select[name=\"pasajeros\"]", "2").await?;
        cx.click("button:has-text(\"Continuar al pago →\")").await?;

        cx.step("Personal details and consent");
        cx.fill("input[name=\"nombre\"]", "Test User").await?;
        cx.fill("input[name=\"email\"]", "test@example.com").await?;
        cx.fill("input[name=\"telefono\"]", "+56912345678").await?;
        cx.check("label[for=\"payment-consent\"]").await?;

        cx.step("Choose deposit and payment method");
        cx.click(&by_role("button", "Reservar con 40%")).await?;
        cx.click(&by_role("button", "Flow")).await?;

        self.simulate_gateway_return(cx).await?;

        cx.expect_visible("h1:has-text(\"Completa los detalles de tu reserva\")")
            .await?;
        cx.checkpoint("completion").await
    }
}

/// Terms and privacy modals open and close without ticking the consent box
pub struct LegalModals;

#[async_trait]
impl Scenario for LegalModals {
    fn name(&self) -> &'static str {
        "legal-modals"
    }

    fn description(&self) -> &'static str {
        "Open the terms and privacy modals and check consent stays unchecked"
    }

    fn viewport(&self) -> Option<ViewportSize> {
        Some(ViewportSize::new(1280, 720))
    }

    async fn run(&self, cx: &ScenarioContext<'_>) -> Result<()> {
        cx.goto_with("/", Some(WaitUntil::NetworkIdle), cx.timeouts().navigation)
            .await?;

        cx.step("Fill step one");
        cx.fill("input#fecha", "2025-12-27").await?;
        if cx.input_value("select#origen").await?.is_empty() {
            cx.select("select#origen", label(ORIGIN)).await?;
        }
        cx.select("select#destino", label(DESTINATION)).await?;
        cx.select("select#hora", "10:00").await?;
        cx.click("button:has-text(\"Reservar Ahora\")").await?;
        cx.wait_for(&by_text("Detalles y Pago"), Duration::from_secs(10))
            .await?;

        cx.step("Terms modal");
        cx.click(&by_text("términos y condiciones")).await?;
        cx.wait_for("role=dialog >> text=Condiciones de servicio", cx.timeouts().element)
            .await?;
        cx.checkpoint("terms-modal").await?;
        cx.press("Escape").await?;
        cx.expect_hidden("role=dialog").await?;

        cx.step("Privacy modal");
        cx.click(&by_text("política de privacidad")).await?;
        cx.wait_for("role=dialog >> text=Política de Privacidad", cx.timeouts().element)
            .await?;
        cx.checkpoint("privacy-modal").await?;
        cx.press("Escape").await?;
        cx.expect_hidden("role=dialog").await?;

        cx.step("Consent untouched");
        cx.expect_unchecked("#terms").await
    }
}

/// Same-day round trip shows the 25% discount and the savings badge
pub struct RoundTripDiscount;

#[async_trait]
impl Scenario for RoundTripDiscount {
    fn name(&self) -> &'static str {
        "round-trip-discount"
    }

    fn description(&self) -> &'static str {
        "Same-day round trip shows the 25% discount and total savings"
    }

    async fn run(&self, cx: &ScenarioContext<'_>) -> Result<()> {
        cx.goto("/").await?;

        cx.step("Pick destination and round trip");
        cx.select("section#inicio select[name=\"destino\"]", label(DESTINATION))
            .await?;
        cx.click("section#inicio label[for=\"idaVuelta-switch\"]")
            .await?;
        cx.expect_visible("section#inicio input[name=\"fechaRegreso\"]")
            .await?;

        cx.step("Same-day dates");
        let today = chrono::Utc::now().date_naive().format("%Y-%m-%d").to_string();
        cx.fill("section#inicio input[name=\"fecha\"]", &today).await?;
        cx.fill("section#inicio input[name=\"fechaRegreso\"]", &today)
            .await?;

        cx.step("Price breakdown");
        cx.click("section#inicio button:has-text(\"Ver precios\")")
            .await?;
        cx.expect_visible_within(
            "section#inicio h3:has-text(\"Resumen de tu viaje\")",
            Duration::from_secs(10),
        )
        .await?;
        cx.expect_visible("section#inicio span:has-text(\"Descuento viaje mismo día (25%)\")")
            .await?;
        cx.expect_visible("section#inicio .bg-green-500:has-text(\"Ahorraste:\")")
            .await?;
        cx.checkpoint("total-savings").await
    }
}
