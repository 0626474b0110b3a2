// Request interception
//
// Short-circuits matching requests with a canned response so a scenario can
// run without the backend. Also holds the payment-code fixture the booking
// site's "pay with code" page expects.

use playwright_rs::{FulfillOptions, Page};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A fixed response served for intercepted requests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockResponse {
    pub status: u16,
    pub content_type: String,
    pub body: String,
}

impl MockResponse {
    pub fn new(status: u16, content_type: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: content_type.into(),
            body: body.into(),
        }
    }

    /// `200 application/json` with `value` serialised as the body
    pub fn json<T: Serialize>(value: &T) -> Result<Self> {
        Ok(Self::new(200, "application/json", serde_json::to_string(value)?))
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    fn fulfill_options(&self) -> FulfillOptions {
        FulfillOptions::builder()
            .status(self.status)
            .content_type(self.content_type.clone())
            .body_string(self.body.clone())
            .build()
    }
}

/// Serves `response` for every request whose URL matches the glob `pattern`.
///
/// Must be registered before the request is issued. Later registrations win
/// over earlier ones for the same URL.
pub async fn intercept(page: &Page, pattern: &str, response: MockResponse) -> Result<()> {
    tracing::debug!(
        status = response.status,
        "Intercepting requests matching {}",
        pattern
    );
    let owned_pattern = pattern.to_string();
    page.route(pattern, move |route| {
        let options = response.fulfill_options();
        let pattern = owned_pattern.clone();
        async move {
            tracing::debug!("Fulfilling {} ({})", route.request().url(), pattern);
            route.fulfill(Some(options)).await
        }
    })
    .await?;
    Ok(())
}

/// Whether `url` matches the route glob `pattern`.
///
/// Uses the same glob rules as the browser-side router, so `**/api/x`
/// matches any scheme and host. An invalid glob only matches itself.
pub fn glob_matches(pattern: &str, url: &str) -> bool {
    match glob::Pattern::new(pattern) {
        Ok(compiled) => compiled.matches(url),
        Err(_) => pattern == url,
    }
}

/// Route pattern for the payment-code validation endpoint
pub fn payment_code_route(code: &str) -> String {
    format!("**/api/codigos-pago/{}", code)
}

/// A pre-issued payment code as returned by `/api/codigos-pago/<code>`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCode {
    pub id: u64,
    pub codigo: String,
    pub origen: String,
    pub destino: String,
    /// Amount in CLP, sent as a string by the API
    pub monto: String,
    pub descripcion: String,
    pub vehiculo: String,
    pub pasajeros: u32,
    pub ida_vuelta: bool,
    pub permitir_abono: bool,
    pub silla_infantil: bool,
    pub fecha_vencimiento: String,
    pub usos_maximos: u32,
    pub usos_actuales: u32,
    pub estado: String,
}

/// Envelope of the payment-code endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCodeResponse {
    pub success: bool,
    pub codigo_pago: PaymentCode,
}

impl PaymentCodeResponse {
    /// Active single-use code `TESTCODE` with a child seat, airport to Pucón
    pub fn test_code() -> Self {
        Self {
            success: true,
            codigo_pago: PaymentCode {
                id: 999,
                codigo: "TESTCODE".into(),
                origen: "Aeropuerto La Araucanía".into(),
                destino: "Pucón".into(),
                monto: "50000".into(),
                descripcion: "Test Description".into(),
                vehiculo: "Van".into(),
                pasajeros: 2,
                ida_vuelta: false,
                permitir_abono: true,
                silla_infantil: true,
                fecha_vencimiento: "2025-12-31T23:59:00.000Z".into(),
                usos_maximos: 1,
                usos_actuales: 0,
                estado: "activo".into(),
            },
        }
    }

    pub fn mock(&self) -> Result<MockResponse> {
        MockResponse::json(self)
    }
}
