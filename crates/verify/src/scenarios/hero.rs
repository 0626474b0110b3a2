// Hero section scenarios
//
// The landing page's search bar, titles, promo banner and destination imagery.

use std::time::Duration;

use async_trait::async_trait;
use playwright_rs::SelectOption;

use crate::config::ViewportSize;
use crate::error::{Error, Result};
use crate::scenario::{Scenario, ScenarioContext, by_text};

const PROMO_TEXT: &str = "Precio especial si reservas ida y vuelta";

/// Hero search bar opens the booking summary sheet
pub struct HeroSearch;

#[async_trait]
impl Scenario for HeroSearch {
    fn name(&self) -> &'static str {
        "hero-search"
    }

    fn description(&self) -> &'static str {
        "Fill the hero search bar and check the summary sheet opens"
    }

    async fn run(&self, cx: &ScenarioContext<'_>) -> Result<()> {
        cx.step("Open home page");
        cx.goto("/").await?;
        cx.wait_for(&by_text("Tu viaje comienza aquí"), Duration::from_secs(10))
            .await?;

        cx.step("Fill search form");
        cx.select("select#hero-origen", SelectOption::Index(1)).await?;
        cx.select("select#hero-destino", SelectOption::Index(1)).await?;
        cx.fill("input#hero-fecha", "2025-12-25").await?;
        // The hour select has no id; it is the third select in the bar
        let hora = cx.locator("select").await.nth(2);
        cx.select_on(&hora, SelectOption::Index(5)).await?;
        cx.select("select#hero-pasajeros", "2").await?;

        cx.step("Search");
        cx.click("button:has-text('Buscar')").await?;
        // The sheet title; other text on the page may also mention it
        cx.wait_for(&by_text("Resumen"), Duration::from_secs(5))
            .await?;
        cx.expect_visible("input#hero-nombre").await?;
        cx.checkpoint("summary-sheet").await
    }
}

/// Main hero title and subtitle are rendered
pub struct HeroTitles;

#[async_trait]
impl Scenario for HeroTitles {
    fn name(&self) -> &'static str {
        "hero-titles"
    }

    fn description(&self) -> &'static str {
        "Check the hero title and subtitle are visible"
    }

    async fn run(&self, cx: &ScenarioContext<'_>) -> Result<()> {
        cx.goto("/").await?;
        cx.expect_visible("h1:has-text(\"Viajes privados y de turismo\")")
            .await?;
        cx.expect_visible("p:has-text(\"Cotiza y reserva en línea de forma rápida y segura.\")")
            .await?;
        cx.checkpoint("hero-titles").await
    }
}

/// Round-trip promo shows for one-way trips and hides once a return is requested
pub struct PromoMessage;

#[async_trait]
impl Scenario for PromoMessage {
    fn name(&self) -> &'static str {
        "promo-message"
    }

    fn description(&self) -> &'static str {
        "Round-trip promo appears for one-way trips and hides after 'Necesito regreso'"
    }

    fn viewport(&self) -> Option<ViewportSize> {
        Some(ViewportSize::new(1280, 800))
    }

    async fn run(&self, cx: &ScenarioContext<'_>) -> Result<()> {
        cx.goto("/").await?;
        cx.wait_for("select#origen", cx.timeouts().element).await?;

        cx.step("Select origin and destination");
        cx.select("select#origen", SelectOption::Index(1)).await?;
        cx.select("select#destino", SelectOption::Index(1)).await?;

        cx.step("Promo visible for one-way trip");
        let promo = by_text(PROMO_TEXT);
        cx.expect_visible_within(&promo, Duration::from_secs(5))
            .await?;
        cx.checkpoint("promo-visible").await?;

        cx.step("Request return trip");
        cx.click(&by_text("Necesito regreso")).await?;
        cx.expect_hidden(&promo).await?;
        cx.checkpoint("promo-hidden").await
    }
}

/// Destinations checked by [`DestinationImages`]
pub const IMAGE_DESTINATIONS: [&str; 4] = ["Licán Ray", "Lautaro", "Melipeuco", "Panguipulli"];

/// Returns the src of the image in the hero's right-hand panel, or a marker
/// string describing what was missing.
const RIGHT_PANEL_IMAGE_JS: &str = r#"(() => {
    const hero = document.getElementById('inicio');
    if (!hero) return 'missing:section';
    const panel = Array.from(hero.querySelectorAll('div')).find(div =>
        div.className.includes('hidden lg:block') && div.className.includes('sticky top-0'));
    if (!panel) return 'missing:panel';
    const img = panel.querySelector('img');
    return img ? img.src : 'missing:image';
})()"#;

/// What the hero panel showed for a destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeroImage {
    /// The generic van picture
    Default(String),
    /// A destination-specific picture
    Specific(String),
    /// Anything else, including a missing panel or image
    Unexpected(String),
}

impl HeroImage {
    pub fn classify(src: &str) -> Self {
        if src.contains("hero-van") {
            HeroImage::Default(src.to_string())
        } else if src.starts_with("http") {
            HeroImage::Specific(src.to_string())
        } else {
            HeroImage::Unexpected(src.to_string())
        }
    }
}

/// Each destination swaps the hero image
pub struct DestinationImages;

#[async_trait]
impl Scenario for DestinationImages {
    fn name(&self) -> &'static str {
        "destination-images"
    }

    fn description(&self) -> &'static str {
        "Select each featured destination and classify the hero image shown"
    }

    fn viewport(&self) -> Option<ViewportSize> {
        // The image panel is only rendered at the lg breakpoint
        Some(ViewportSize::new(1280, 800))
    }

    async fn run(&self, cx: &ScenarioContext<'_>) -> Result<()> {
        cx.goto("/").await?;
        cx.wait_for("select#destino", cx.timeouts().element).await?;

        for destination in IMAGE_DESTINATIONS {
            cx.step(format!("Select {}", destination));
            let before = cx.evaluate_string(RIGHT_PANEL_IMAGE_JS).await?;
            cx.select("select#destino", SelectOption::Label(destination.to_string()))
                .await?;

            let src = match cx
                .wait_for_change(
                    &format!("hero image to change for {}", destination),
                    RIGHT_PANEL_IMAGE_JS,
                    &before,
                    Duration::from_secs(3),
                )
                .await
            {
                Ok(src) => src,
                Err(Error::WaitTimeout { .. }) => before,
                Err(e) => return Err(e),
            };

            match HeroImage::classify(&src) {
                HeroImage::Specific(src) => {
                    tracing::info!("{}: destination image {}", destination, src)
                }
                HeroImage::Default(src) => {
                    cx.warn(format!("{}: default image shown ({})", destination, src))
                }
                HeroImage::Unexpected(src) => {
                    cx.warn(format!("{}: unexpected image result ({})", destination, src))
                }
            }

            cx.checkpoint(&format!("destination-{}", destination))
                .await?;
        }
        Ok(())
    }
}
