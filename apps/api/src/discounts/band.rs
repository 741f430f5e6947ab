//! Band Resolver — maps a raw weekly charge value onto the exact band label
//! used in the contract's tables.
//!
//! The lookup itself is delegated to the model: ranges are contiguous, the
//! first starts at zero, `low <= value <= high` selects a range, and values
//! above every range clamp to the highest one. The returned label is threaded
//! verbatim into every later prompt.

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::discounts::templates::{band_priming, render_band_query};
use crate::errors::AppError;
use crate::llm_client::{LlmClient, LlmError, ModelTier, RemoteFile};

pub const INVALID_CHARGE_MESSAGE: &str = "weeklyChargesBand must be a numeric charge value.";

/// A weekly charge value as supplied by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct ChargeValue {
    raw: String,
    amount: f64,
}

impl ChargeValue {
    /// Accepts `16856`, `16,856`, `$16,856.00`. Rejects negatives and non-numbers.
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let raw = raw.trim();
        match parse_amount(raw) {
            Some(amount) if amount >= 0.0 => Ok(Self {
                raw: raw.to_string(),
                amount,
            }),
            _ => Err(AppError::Validation(INVALID_CHARGE_MESSAGE.to_string())),
        }
    }

    /// The value exactly as the caller wrote it.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }
}

/// A parsed `"<low> - <high>"` band label.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandRange {
    pub low: f64,
    pub high: f64,
}

impl BandRange {
    /// Returns `None` for labels that are not a numeric range (e.g. open-ended tiers).
    pub fn parse(label: &str) -> Option<Self> {
        let (low, high) = label.split_once(" - ").or_else(|| label.split_once('-'))?;
        let low = parse_amount(low)?;
        let high = parse_amount(high)?;
        (low <= high).then_some(Self { low, high })
    }

    pub fn contains(&self, value: f64) -> bool {
        self.low <= value && value <= self.high
    }
}

fn parse_amount(text: &str) -> Option<f64> {
    let cleaned: String = text
        .trim()
        .trim_start_matches('$')
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct BandAnswer {
    #[serde(rename = "weeklyChargesBand")]
    weekly_charges_band: String,
}

/// Asks the model which band row of `document` contains `charge`.
pub async fn resolve_band(
    llm: &LlmClient,
    document: &RemoteFile,
    charge: &ChargeValue,
) -> Result<String, AppError> {
    let mut session = llm.start_chat(ModelTier::Baseline, document.scope, band_priming(document));

    let answer: BandAnswer = session
        .send_json(&render_band_query(charge.raw()))
        .await
        .map_err(|e| match e {
            LlmError::Parse(e) => AppError::UpstreamFormat(format!(
                "Band resolution returned an unexpected shape: {e}"
            )),
            other => AppError::from(other).context("Band resolution failed"),
        })?;

    let label = answer.weekly_charges_band.trim().to_string();
    if label.is_empty() {
        return Err(AppError::UpstreamFormat(
            "Band resolution returned an empty weeklyChargesBand".to_string(),
        ));
    }

    match BandRange::parse(&label) {
        Some(range) if range.contains(charge.amount()) => {}
        Some(range) if charge.amount() > range.high => {
            debug!(
                "Charge {} is above band '{label}'; treating as clamp to highest band",
                charge.raw()
            );
        }
        Some(_) => warn!(
            "Band '{label}' returned for {} does not contain the value",
            charge.raw()
        ),
        None => debug!("Band label '{label}' is not a numeric range"),
    }

    info!("Resolved weekly charges {} to band '{label}'", charge.raw());
    Ok(label)
}
