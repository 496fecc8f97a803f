//! Hyperliquid `/info` wire format: request bodies and tolerant response decoding.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::domain::FundingObservation;
use crate::utils::epoch_ms_to_datetime;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP transport failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("response was not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("unexpected response shape: {0}")]
    Malformed(String),
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
#[serde(rename_all = "camelCase")]
pub enum InfoRequest {
    MetaAndAssetCtxs,
    #[serde(rename_all = "camelCase")]
    FundingHistory { coin: String, start_time: i64 },
}

/// One decoded `fundingHistory` response.
#[derive(Debug, Clone, Default)]
pub struct FundingPage {
    pub observations: Vec<FundingObservation>,
    /// Records the server sent, malformed ones included. Drives pagination.
    pub raw_len: usize,
    /// Latest `time` seen on any record, malformed ones included.
    pub last_time_ms: Option<i64>,
    /// Records dropped for a missing or unparsable field.
    pub dropped: usize,
}

/// One entry of `metaAndAssetCtxs`, universe name joined to its context.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetContext {
    pub symbol: String,
    pub funding_rate: f64,
    pub mark_price: Option<f64>,
    pub day_ntl_vlm: Option<f64>,
    pub open_interest: Option<f64>,
}

/// Hyperliquid sends decimals as strings; accept plain numbers too.
fn parse_decimal(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::String(s) => s.parse::<f64>().ok().filter(|v| v.is_finite()),
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

fn decode_funding_entry(entry: &Value, requested_coin: &str) -> Option<FundingObservation> {
    let time_ms = entry.get("time")?.as_i64()?;
    let timestamp = epoch_ms_to_datetime(time_ms)?;
    let hourly_rate = parse_decimal(entry.get("fundingRate"))?;
    let symbol = entry
        .get("coin")
        .and_then(Value::as_str)
        .unwrap_or(requested_coin);

    Some(
        FundingObservation::new(symbol, timestamp, hourly_rate)
            .with_premium(parse_decimal(entry.get("premium"))),
    )
}

pub fn decode_funding_page(body: Value, requested_coin: &str) -> Result<FundingPage, ApiError> {
    let Value::Array(entries) = body else {
        return Err(ApiError::Malformed(format!(
            "fundingHistory for {} did not return an array",
            requested_coin
        )));
    };

    let mut page = FundingPage {
        raw_len: entries.len(),
        ..FundingPage::default()
    };

    for entry in &entries {
        if let Some(t) = entry.get("time").and_then(Value::as_i64) {
            page.last_time_ms = Some(page.last_time_ms.map_or(t, |prev| prev.max(t)));
        }
        match decode_funding_entry(entry, requested_coin) {
            Some(obs) => page.observations.push(obs),
            None => page.dropped += 1,
        }
    }

    if page.dropped > 0 {
        log::warn!(
            "⚠ Dropped {} malformed funding record(s) for {}",
            page.dropped,
            requested_coin
        );
    }

    Ok(page)
}

/// `[ {universe: [{name, ..}]}, [ctx, ..] ]`, matched by position.
pub fn decode_asset_contexts(body: Value) -> Result<Vec<AssetContext>, ApiError> {
    let universe = body
        .get(0)
        .and_then(|meta| meta.get("universe"))
        .and_then(Value::as_array)
        .ok_or_else(|| ApiError::Malformed("metaAndAssetCtxs missing universe".into()))?;
    let contexts = body
        .get(1)
        .and_then(Value::as_array)
        .ok_or_else(|| ApiError::Malformed("metaAndAssetCtxs missing asset contexts".into()))?;

    if universe.len() != contexts.len() {
        log::warn!(
            "⚠ Universe has {} symbols but {} asset contexts; extra entries ignored",
            universe.len(),
            contexts.len()
        );
    }

    let mut dropped = 0usize;
    let assets: Vec<AssetContext> = universe
        .iter()
        .zip(contexts)
        .filter_map(|(meta, ctx)| {
            let decoded = (|| {
                Some(AssetContext {
                    symbol: meta.get("name")?.as_str()?.to_string(),
                    funding_rate: parse_decimal(ctx.get("funding"))?,
                    mark_price: parse_decimal(ctx.get("markPx")),
                    day_ntl_vlm: parse_decimal(ctx.get("dayNtlVlm")),
                    open_interest: parse_decimal(ctx.get("openInterest")),
                })
            })();
            if decoded.is_none() {
                dropped += 1;
            }
            decoded
        })
        .collect();

    if dropped > 0 {
        log::warn!("⚠ Dropped {} malformed asset context(s)", dropped);
    }

    Ok(assets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn requests_serialize_with_type_tag() {
        let history = InfoRequest::FundingHistory {
            coin: "ETH".into(),
            start_time: 1_700_000_000_000,
        };
        assert_eq!(
            serde_json::to_value(&history).unwrap(),
            json!({"type": "fundingHistory", "coin": "ETH", "startTime": 1_700_000_000_000_i64})
        );
        assert_eq!(
            serde_json::to_value(InfoRequest::MetaAndAssetCtxs).unwrap(),
            json!({"type": "metaAndAssetCtxs"})
        );
    }

    #[test]
    fn malformed_history_record_is_dropped_not_the_page() {
        let body = json!([
            {"coin": "BTC", "time": 1_735_689_600_000_i64, "fundingRate": "0.0000125", "premium": "-0.0003"},
            {"coin": "BTC", "time": 1_735_693_200_000_i64, "premium": "0.0001"},
            {"coin": "BTC", "time": 1_735_696_800_000_i64, "fundingRate": "oops"},
            {"coin": "BTC", "time": 1_735_700_400_000_i64, "fundingRate": "-0.00001"}
        ]);

        let page = decode_funding_page(body, "BTC").unwrap();
        assert_eq!(page.raw_len, 4);
        assert_eq!(page.dropped, 2);
        assert_eq!(page.observations.len(), 2);
        assert_eq!(page.last_time_ms, Some(1_735_700_400_000));
        assert_eq!(page.observations[0].hourly_rate, 0.0000125);
        assert_eq!(page.observations[0].premium, Some(-0.0003));
        assert_eq!(page.observations[1].premium, None);
    }

    #[test]
    fn non_array_history_is_an_error() {
        let err = decode_funding_page(json!({"error": "bad coin"}), "NOPE").unwrap_err();
        assert!(matches!(err, ApiError::Malformed(_)));
    }

    #[test]
    fn asset_contexts_join_universe_by_position() {
        let body = json!([
            {"universe": [{"name": "BTC", "szDecimals": 5}, {"name": "ETH"}, {"name": "BAD"}]},
            [
                {"funding": "0.0000125", "markPx": "97000.5", "dayNtlVlm": "1000000", "openInterest": "12000"},
                {"funding": "-0.00002", "markPx": "3400.1"},
                {"markPx": "1.0"}
            ]
        ]);

        let assets = decode_asset_contexts(body).unwrap();
        assert_eq!(assets.len(), 2);
        assert_eq!(assets[0].symbol, "BTC");
        assert_eq!(assets[0].open_interest, Some(12000.0));
        assert_eq!(assets[1].symbol, "ETH");
        assert_eq!(assets[1].funding_rate, -0.00002);
        assert_eq!(assets[1].day_ntl_vlm, None);
    }

    #[test]
    fn asset_contexts_without_universe_fail() {
        assert!(decode_asset_contexts(json!([[], []])).is_err());
    }
}
