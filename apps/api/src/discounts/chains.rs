//! Prompt-Chain Orchestrators.
//!
//! Flow per chain: open session(s) lazily per model tier → prime each with the
//! example exchange → send steps strictly in order → parse and key-check each
//! response. The first failing step ends the chain; there are no retries.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::discounts::schema::{missing_keys, KeyPolicy};
use crate::discounts::templates::{
    extraction_priming, render_prompt, ChainSpec, ChainStep, TableId,
    DOMESTIC_AIR_ACCESSORIALS_CHAIN, DOMESTIC_GROUND_CHAIN, INTERNATIONAL_CHAIN,
};
use crate::errors::AppError;
use crate::llm_client::{
    parse_json_response, strip_json_fences, ChatSession, LlmClient, ModelTier, RemoteFile,
};

/// Parsed responses of one chain, keyed by table.
pub type ChainOutput = BTreeMap<TableId, Value>;

#[derive(Debug, Clone, Serialize)]
pub struct AirAccessorialsTables {
    #[serde(rename = "domesticAir")]
    pub domestic_air: Value,
    #[serde(rename = "accesorials")]
    pub accessorials: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroundTables {
    #[serde(rename = "domesticGround1")]
    pub domestic_ground1: Value,
    #[serde(rename = "domesticGround2")]
    pub domestic_ground2: Value,
    #[serde(rename = "domesticGround3")]
    pub domestic_ground3: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct InternationalTables {
    pub international1: Value,
    pub international2: Value,
    /// The consolidated international table.
    #[serde(rename = "response5")]
    pub consolidated: Value,
}

/// Runs every step of `spec` against `document` and returns the parsed tables.
pub async fn run_chain(
    llm: &LlmClient,
    document: &RemoteFile,
    band: &str,
    spec: &ChainSpec,
    policy: KeyPolicy,
) -> Result<ChainOutput, AppError> {
    info!("Chain {} started against {}", spec.name, document.name);

    let mut sessions: HashMap<ModelTier, ChatSession> = HashMap::new();
    let mut responses: HashMap<TableId, String> = HashMap::new();
    let mut output = ChainOutput::new();

    for step in spec.steps {
        let session = sessions.entry(step.tier).or_insert_with(|| {
            debug!("Chain {} opened {:?} session", spec.name, step.tier);
            llm.start_chat(step.tier, document.scope, extraction_priming(document, band))
        });

        let prompt = render_prompt(step, band, &responses);
        debug!(
            "Chain {} sending {} ({} chars) to {}",
            spec.name,
            step.table.key(),
            prompt.len(),
            session.model()
        );

        let text = session
            .send(&prompt)
            .await
            .map_err(|e| AppError::from(e).context(step_label(spec, step)))?;

        let value: Value = parse_json_response(&text).map_err(|e| {
            AppError::UpstreamFormat(format!(
                "{}: model returned invalid JSON: {e}",
                step_label(spec, step)
            ))
        })?;

        check_keys(spec, step, &value, policy)?;

        info!("Chain {} filled {}", spec.name, step.table.key());
        responses.insert(step.table, strip_json_fences(&text).to_string());
        output.insert(step.table, value);
    }

    info!("Chain {} completed ({} tables)", spec.name, output.len());
    Ok(output)
}

fn step_label(spec: &ChainSpec, step: &ChainStep) -> String {
    format!("{} chain, {} table", spec.name, step.table.key())
}

fn check_keys(
    spec: &ChainSpec,
    step: &ChainStep,
    value: &Value,
    policy: KeyPolicy,
) -> Result<(), AppError> {
    let template = step.table.template().map_err(|e| {
        AppError::Internal(
            anyhow::Error::new(e).context(format!("{} skeleton is not JSON", step.table.key())),
        )
    })?;

    let missing = missing_keys(&template, value);
    if missing.is_empty() {
        return Ok(());
    }

    let summary = missing.join(", ");
    match policy {
        KeyPolicy::Strict => Err(AppError::UpstreamFormat(format!(
            "{}: response is missing template keys: {summary}",
            step_label(spec, step)
        ))),
        KeyPolicy::WarnOnly => {
            warn!("{}: response is missing template keys: {summary}", step_label(spec, step));
            Ok(())
        }
    }
}

fn take(output: &mut ChainOutput, table: TableId) -> Result<Value, AppError> {
    output.remove(&table).ok_or_else(|| {
        AppError::Internal(anyhow::anyhow!("chain produced no {} table", table.key()))
    })
}

pub async fn extract_domestic_air_accessorials(
    llm: &LlmClient,
    document: &RemoteFile,
    band: &str,
    policy: KeyPolicy,
) -> Result<AirAccessorialsTables, AppError> {
    let mut output =
        run_chain(llm, document, band, &DOMESTIC_AIR_ACCESSORIALS_CHAIN, policy).await?;
    Ok(AirAccessorialsTables {
        domestic_air: take(&mut output, TableId::DomesticAir)?,
        accessorials: take(&mut output, TableId::Accessorials)?,
    })
}

pub async fn extract_domestic_ground(
    llm: &LlmClient,
    document: &RemoteFile,
    band: &str,
    policy: KeyPolicy,
) -> Result<GroundTables, AppError> {
    let mut output = run_chain(llm, document, band, &DOMESTIC_GROUND_CHAIN, policy).await?;
    Ok(GroundTables {
        domestic_ground1: take(&mut output, TableId::DomesticGround1)?,
        domestic_ground2: take(&mut output, TableId::DomesticGround2)?,
        domestic_ground3: take(&mut output, TableId::DomesticGround3)?,
    })
}

pub async fn extract_international(
    llm: &LlmClient,
    document: &RemoteFile,
    band: &str,
    policy: KeyPolicy,
) -> Result<InternationalTables, AppError> {
    let mut output = run_chain(llm, document, band, &INTERNATIONAL_CHAIN, policy).await?;
    Ok(InternationalTables {
        international1: take(&mut output, TableId::International1)?,
        international2: take(&mut output, TableId::International2)?,
        consolidated: take(&mut output, TableId::ConsolidatedInternational)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ground_cwt_step() -> &'static ChainStep {
        &DOMESTIC_GROUND_CHAIN.steps[2]
    }

    #[test]
    fn test_complete_response_passes_key_check() {
        let step = ground_cwt_step();
        let mut value = step.table.template().unwrap();
        value["Commodity Tier"] = json!("filled");
        assert!(check_keys(&DOMESTIC_GROUND_CHAIN, step, &value, KeyPolicy::Strict).is_ok());
    }

    #[test]
    fn test_missing_keys_fail_only_when_strict() {
        let step = ground_cwt_step();
        let value = json!({ "unexpected": "shape" });

        let err = check_keys(&DOMESTIC_GROUND_CHAIN, step, &value, KeyPolicy::Strict).unwrap_err();
        match err {
            AppError::UpstreamFormat(msg) => {
                assert!(msg.starts_with("domestic-ground chain, domesticGround3 table"), "{msg}");
                assert!(msg.contains("missing template keys"), "{msg}");
            }
            other => panic!("expected format error, got {other:?}"),
        }

        assert!(check_keys(&DOMESTIC_GROUND_CHAIN, step, &value, KeyPolicy::WarnOnly).is_ok());
    }

    #[test]
    fn test_take_reports_absent_table() {
        let mut output = ChainOutput::new();
        output.insert(TableId::DomesticAir, json!({}));

        assert!(take(&mut output, TableId::DomesticAir).is_ok());
        assert!(matches!(
            take(&mut output, TableId::DomesticAir),
            Err(AppError::Internal(_))
        ));
    }

    #[test]
    fn test_output_field_names() {
        let tables = InternationalTables {
            international1: json!(1),
            international2: json!(2),
            consolidated: json!(3),
        };
        let value = serde_json::to_value(tables).unwrap();
        assert_eq!(value["response5"], 3);

        let tables = AirAccessorialsTables {
            domestic_air: json!(1),
            accessorials: json!(2),
        };
        assert_eq!(serde_json::to_value(tables).unwrap()["accesorials"], 2);
    }
}
