//! Result Aggregator — fans the three chains out and joins them.
//!
//! Each chain runs to its own completion regardless of the others; only then
//! is the result assembled. Any failed chain fails the whole extraction.

use serde::Serialize;
use tracing::{error, info};

use crate::discounts::chains::{
    extract_domestic_air_accessorials, extract_domestic_ground, extract_international,
    AirAccessorialsTables, GroundTables, InternationalTables,
};
use crate::discounts::schema::KeyPolicy;
use crate::errors::AppError;
use crate::llm_client::{LlmClient, RemoteFile};

/// Serialized as `[air+accessorials, ground, international]`.
#[derive(Debug, Clone, Serialize)]
pub struct DiscountTables(
    pub AirAccessorialsTables,
    pub GroundTables,
    pub InternationalTables,
);

pub async fn extract_all(
    llm: &LlmClient,
    document: &RemoteFile,
    band: &str,
    policy: KeyPolicy,
) -> Result<DiscountTables, AppError> {
    info!("Extracting all discount tables from {} for band '{band}'", document.name);

    let (air, ground, international) = tokio::join!(
        extract_domestic_air_accessorials(llm, document, band, policy),
        extract_domestic_ground(llm, document, band, policy),
        extract_international(llm, document, band, policy),
    );

    for failure in [air.as_ref().err(), ground.as_ref().err(), international.as_ref().err()]
        .into_iter()
        .flatten()
    {
        error!("Discount chain failed: {failure}");
    }

    Ok(DiscountTables(air?, ground?, international?))
}
