use scanner_core::{DiscoveryError, HistoryFetchError, RawHistory};
use serde::Deserialize;

/// `retCode` Bybit answers with when the symbol parameter is not listed.
pub const RET_CODE_PARAMS_ERROR: i64 = 10001;

/// Status of instruments that can currently be traded.
pub const STATUS_TRADING: &str = "Trading";

/// Common v5 response envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    #[serde(rename = "retCode")]
    pub ret_code: i64,
    #[serde(rename = "retMsg", default)]
    pub ret_msg: String,
    pub result: Option<T>,
}

/// One page of `GET /v5/market/instruments-info`.
#[derive(Debug, Clone, Deserialize)]
pub struct InstrumentsPage {
    #[serde(default)]
    pub list: Vec<InstrumentInfo>,
    #[serde(rename = "nextPageCursor", default)]
    pub next_page_cursor: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InstrumentInfo {
    pub symbol: String,
    #[serde(default)]
    pub status: Option<String>,
}

impl InstrumentInfo {
    /// Spot and older payloads may omit `status`; those count as tradable.
    pub fn is_trading(&self) -> bool {
        self.status.as_deref().map_or(true, |s| s == STATUS_TRADING)
    }
}

impl InstrumentsPage {
    /// Cursor for the following page, if any.
    pub fn next_cursor(&self) -> Option<&str> {
        self.next_page_cursor.as_deref().filter(|c| !c.is_empty())
    }
}

/// Result of `GET /v5/market/kline`. Rows are newest first:
/// `[startTime, open, high, low, close, volume, turnover]`.
#[derive(Debug, Clone, Deserialize)]
pub struct KlinePage {
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub list: Vec<Vec<String>>,
}

pub fn parse_instruments_page(body: &str) -> Result<InstrumentsPage, DiscoveryError> {
    let envelope: Envelope<InstrumentsPage> =
        serde_json::from_str(body).map_err(|e| DiscoveryError::Decode(e.to_string()))?;

    if envelope.ret_code != 0 {
        return Err(DiscoveryError::Api {
            code: envelope.ret_code,
            message: envelope.ret_msg,
        });
    }

    envelope
        .result
        .ok_or_else(|| DiscoveryError::Decode("missing result".to_string()))
}

pub fn parse_kline(symbol: &str, body: &str) -> Result<RawHistory, HistoryFetchError> {
    let envelope: Envelope<KlinePage> =
        serde_json::from_str(body).map_err(|e| HistoryFetchError::Decode(e.to_string()))?;

    match envelope.ret_code {
        0 => {}
        RET_CODE_PARAMS_ERROR if envelope.ret_msg.to_lowercase().contains("symbol") => {
            return Err(HistoryFetchError::UnknownInstrument(symbol.to_string()));
        }
        code => {
            return Err(HistoryFetchError::Api {
                code,
                message: envelope.ret_msg,
            });
        }
    }

    let page = envelope
        .result
        .ok_or_else(|| HistoryFetchError::Decode("missing result".to_string()))?;

    Ok(RawHistory {
        symbol: symbol.to_string(),
        rows: page.list,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_instruments_page() {
        let body = r#"{
            "retCode": 0,
            "retMsg": "OK",
            "result": {
                "category": "linear",
                "list": [
                    {"symbol": "10000LADYSUSDT", "status": "Trading", "contractType": "LinearPerpetual"},
                    {"symbol": "BTCUSDT", "status": "Trading"},
                    {"symbol": "OLDUSDT", "status": "Closed"}
                ],
                "nextPageCursor": "first%3D10000LADYSUSDT"
            },
            "time": 1672280219169
        }"#;

        let page = parse_instruments_page(body).unwrap();
        let trading: Vec<&str> = page
            .list
            .iter()
            .filter(|i| i.is_trading())
            .map(|i| i.symbol.as_str())
            .collect();
        assert_eq!(trading, vec!["10000LADYSUSDT", "BTCUSDT"]);
        assert_eq!(page.next_cursor(), Some("first%3D10000LADYSUSDT"));
    }

    #[test]
    fn test_empty_cursor_ends_pagination() {
        let body = r#"{"retCode":0,"retMsg":"OK","result":{"list":[],"nextPageCursor":""}}"#;
        assert_eq!(parse_instruments_page(body).unwrap().next_cursor(), None);
    }

    #[test]
    fn test_instruments_api_error() {
        let body = r#"{"retCode":10002,"retMsg":"invalid request","result":{}}"#;
        match parse_instruments_page(body) {
            Err(DiscoveryError::Api { code, message }) => {
                assert_eq!(code, 10002);
                assert_eq!(message, "invalid request");
            }
            other => panic!("Expected API error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_kline() {
        let body = r#"{
            "retCode": 0,
            "retMsg": "OK",
            "result": {
                "symbol": "BTCUSDT",
                "category": "linear",
                "list": [
                    ["1670608800000", "17071", "17073", "17027", "17055.5", "268611", "15.74462667"],
                    ["1670605200000", "17071.5", "17071.5", "17061", "17071", "4177", "0.24469757"]
                ]
            },
            "time": 1672025956592
        }"#;

        let raw = parse_kline("BTCUSDT", body).unwrap();
        assert_eq!(raw.symbol, "BTCUSDT");
        assert_eq!(raw.rows.len(), 2);
        assert_eq!(raw.rows[0][4], "17055.5");
    }

    #[test]
    fn test_kline_unknown_symbol() {
        let body = r#"{"retCode":10001,"retMsg":"params error: Symbol Is Invalid","result":{}}"#;
        assert!(matches!(
            parse_kline("NOPEUSDT", body),
            Err(HistoryFetchError::UnknownInstrument(s)) if s == "NOPEUSDT"
        ));
    }

    #[test]
    fn test_kline_garbage_body() {
        assert!(matches!(
            parse_kline("BTCUSDT", "<html>"),
            Err(HistoryFetchError::Decode(_))
        ));
    }
}
