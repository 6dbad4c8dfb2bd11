use crate::config::{Config, DEFAULT_YAHOO_BASE_URL};
use crate::errors::{DataHubError, Result};
use crate::models::ticker::{CompanyInfo, StatementTable};
use crate::scrapers::base::FinanceScraper;
use crate::util::{self, RawStatement};
use async_trait::async_trait;
use chrono::DateTime;
use log::{debug, warn};
use reqwest::Client;
use serde_json::Value;
use std::collections::BTreeMap;
use tokio::sync::Mutex;

const COOKIE_URL: &str = "https://fc.yahoo.com";
const USER_AGENT: &str = concat!(
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 ",
    "(KHTML, like Gecko) Chrome/120.0 Safari/537.36"
);

// 报表列表中不属于科目的键
const NON_FIELD_KEYS: [&str; 2] = ["maxAge", "endDate"];

/// Yahoo Finance 数据抓取器（quoteSummary 接口）
pub struct YahooScraper {
    client: Client,
    base_url: String,
    exchange_suffix: String,
    // None: 尚未尝试；Some(None): 获取失败，不带 crumb 请求
    crumb: Mutex<Option<Option<String>>>,
}

impl YahooScraper {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(USER_AGENT)
            .cookie_store(true)
            .build()
            .map_err(DataHubError::RequestError)?;

        Ok(Self {
            client,
            base_url: config.yahoo_base_url.clone(),
            exchange_suffix: config.exchange_suffix.clone(),
            crumb: Mutex::new(None),
        })
    }

    /// 获取 crumb，整个客户端生命周期内只尝试一次
    async fn crumb(&self) -> Option<String> {
        let mut cached = self.crumb.lock().await;
        if let Some(crumb) = cached.as_ref() {
            return crumb.clone();
        }

        let fetched = match self.fetch_crumb().await {
            Ok(crumb) => crumb,
            Err(e) => {
                warn!("Failed to obtain Yahoo crumb, continuing without it: {}", e);
                None
            }
        };
        *cached = Some(fetched.clone());
        fetched
    }

    async fn fetch_crumb(&self) -> Result<Option<String>> {
        if self.base_url == DEFAULT_YAHOO_BASE_URL {
            // 只为拿到 cookie，响应本身可能是 404
            let _ = self.client.get(COOKIE_URL).send().await;
        }

        let response = self
            .client
            .get(format!("{}/v1/test/getcrumb", self.base_url))
            .send()
            .await?;
        if !response.status().is_success() {
            debug!("getcrumb returned {}", response.status());
            return Ok(None);
        }

        let text = response.text().await?;
        let crumb = text.trim();
        if crumb.is_empty() || crumb.contains('<') {
            return Ok(None);
        }
        Ok(Some(crumb.to_string()))
    }

    async fn fetch_module(&self, symbol: &str, module: &str) -> Result<Value> {
        debug!("Fetching {} for {}", module, symbol);

        let mut request = self
            .client
            .get(format!("{}/v10/finance/quoteSummary/{}", self.base_url, symbol))
            .query(&[("modules", module)]);
        if let Some(crumb) = self.crumb().await {
            request = request.query(&[("crumb", crumb)]);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        // 404 时 Yahoo 仍返回带 error 字段的 JSON，优先用它的描述
        let json: Value = match serde_json::from_str(&text) {
            Ok(json) => json,
            Err(e) if status.is_success() => return Err(DataHubError::JsonError(e)),
            Err(_) => return Err(DataHubError::provider(symbol, format!("HTTP {}", status))),
        };
        extract_module(&json, module, symbol)
    }

    async fn fetch_statement(
        &self,
        symbol: &str,
        module: &str,
        list_key: &str,
    ) -> Result<StatementTable> {
        let data = self.fetch_module(symbol, module).await?;
        let raw = parse_statements(&data, list_key).ok_or_else(|| {
            DataHubError::provider(symbol, format!("{} has no {} list", module, list_key))
        })?;
        Ok(util::clean_statement(&raw))
    }
}

#[async_trait]
impl FinanceScraper for YahooScraper {
    fn provider_symbol(&self, code: &str) -> String {
        format!("{}{}", code, self.exchange_suffix)
    }

    async fn fetch_company_info(&self, symbol: &str) -> Result<CompanyInfo> {
        let profile = self.fetch_module(symbol, "assetProfile").await?;
        Ok(parse_asset_profile(&profile))
    }

    async fn fetch_cash_flow(&self, symbol: &str) -> Result<StatementTable> {
        self.fetch_statement(symbol, "cashflowStatementHistory", "cashflowStatements").await
    }

    async fn fetch_income_statement(&self, symbol: &str) -> Result<StatementTable> {
        self.fetch_statement(symbol, "incomeStatementHistory", "incomeStatementHistory").await
    }

    async fn fetch_balance_sheet(&self, symbol: &str) -> Result<StatementTable> {
        self.fetch_statement(symbol, "balanceSheetHistory", "balanceSheetStatements").await
    }
}

/// 从 quoteSummary 响应中取出指定模块
pub(crate) fn extract_module(json: &Value, module: &str, symbol: &str) -> Result<Value> {
    let summary = json
        .get("quoteSummary")
        .ok_or_else(|| DataHubError::provider(symbol, "response has no quoteSummary"))?;

    if let Some(error) = summary.get("error").filter(|e| !e.is_null()) {
        let description = error
            .get("description")
            .and_then(|d| d.as_str())
            .unwrap_or("unknown error");
        return Err(DataHubError::provider(symbol, description));
    }

    summary
        .get("result")
        .and_then(|r| r.as_array())
        .and_then(|r| r.first())
        .and_then(|r| r.get(module))
        .cloned()
        .ok_or_else(|| DataHubError::provider(symbol, format!("module {} missing", module)))
}

/// `{raw, fmt}` 包装取 raw，空对象视为缺失
fn unwrap_raw(value: &Value) -> Option<Value> {
    match value {
        Value::Object(map) => map.get("raw").cloned(),
        Value::Array(_) => None,
        other => Some(other.clone()),
    }
}

/// 公司资料只保留标量字段，嵌套结构（如高管列表）丢弃
pub(crate) fn parse_asset_profile(profile: &Value) -> CompanyInfo {
    let mut info = CompanyInfo::new();
    if let Some(map) = profile.as_object() {
        for (key, value) in map {
            if key == "maxAge" {
                continue;
            }
            if let Some(scalar) = unwrap_raw(value).filter(|v| !v.is_null()) {
                info.insert(key.clone(), scalar);
            }
        }
    }
    info
}

/// Turns a statement history list into period -> field -> raw value. The
/// period label is the statement's end date.
pub(crate) fn parse_statements(data: &Value, list_key: &str) -> Option<RawStatement> {
    let statements = data.get(list_key)?.as_array()?;
    let mut raw = RawStatement::new();

    for statement in statements {
        let Some(map) = statement.as_object() else { continue };
        let Some(period) = map.get("endDate").and_then(period_label) else {
            warn!("Skipping statement without endDate");
            continue;
        };

        let fields: BTreeMap<String, Value> = map
            .iter()
            .filter(|(key, _)| !NON_FIELD_KEYS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), unwrap_raw(value).unwrap_or(Value::Null)))
            .collect();
        raw.insert(period, fields);
    }

    Some(raw)
}

fn period_label(end_date: &Value) -> Option<String> {
    if let Some(fmt) = end_date.get("fmt").and_then(|f| f.as_str()) {
        return Some(fmt.to_string());
    }
    let secs = end_date.get("raw").and_then(|r| r.as_i64())?;
    DateTime::from_timestamp(secs, 0).map(|dt| dt.format("%Y-%m-%d").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn cash_flow_payload() -> Value {
        json!({
            "quoteSummary": {
                "result": [{
                    "cashflowStatementHistory": {
                        "maxAge": 86400,
                        "cashflowStatements": [
                            {
                                "maxAge": 1,
                                "endDate": {"raw": 1624924800, "fmt": "2021-06-29"},
                                "netIncome": {"raw": 11304000000i64, "fmt": "11.3B"},
                                "dividendsPaid": {}
                            },
                            {
                                "maxAge": 1,
                                "endDate": {"raw": 1593475200},
                                "netIncome": {"raw": 8736000000i64, "fmt": "8.74B"}
                            }
                        ]
                    }
                }],
                "error": null
            }
        })
    }

    #[test]
    fn test_parse_statements_cleans_cells() {
        let payload = cash_flow_payload();
        let data = extract_module(&payload, "cashflowStatementHistory", "BHP.AX").unwrap();
        let raw = parse_statements(&data, "cashflowStatements").unwrap();
        let table = util::clean_statement(&raw);

        assert_eq!(table.len(), 2);
        assert_eq!(table["2021-06-29"]["netIncome"], 11304000000);
        assert_eq!(table["2021-06-29"]["dividendsPaid"], 0);
        assert_eq!(table["2020-06-30"]["netIncome"], 8736000000);
        assert!(!table["2021-06-29"].contains_key("maxAge"));
    }

    #[test]
    fn test_asset_profile_drops_nested_values() {
        let profile = json!({
            "sector": "Basic Materials",
            "city": "Melbourne",
            "fullTimeEmployees": 80000,
            "companyOfficers": [{"name": "Someone"}],
            "auditRisk": {"raw": 3, "fmt": "3"},
            "maxAge": 86400
        });
        let info = parse_asset_profile(&profile);

        assert_eq!(info["sector"], json!("Basic Materials"));
        assert_eq!(info["fullTimeEmployees"], json!(80000));
        assert_eq!(info["auditRisk"], json!(3));
        assert!(!info.contains_key("companyOfficers"));
        assert!(!info.contains_key("maxAge"));
    }

    #[test]
    fn test_extract_module_reports_provider_error() {
        let payload = json!({
            "quoteSummary": {
                "result": null,
                "error": {
                    "code": "Not Found",
                    "description": "Quote not found for ticker symbol: ZZZ.AX"
                }
            }
        });
        let err = extract_module(&payload, "assetProfile", "ZZZ.AX").unwrap_err();
        assert!(matches!(err, DataHubError::ProviderError { .. }));
        assert!(err.to_string().contains("Quote not found"));
    }

    #[tokio::test]
    async fn test_fetch_cash_flow_over_http_with_crumb() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/test/getcrumb"))
            .respond_with(ResponseTemplate::new(200).set_body_string("abc123"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v10/finance/quoteSummary/BHP.AX"))
            .and(query_param("modules", "cashflowStatementHistory"))
            .and(query_param("crumb", "abc123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(cash_flow_payload()))
            .mount(&server)
            .await;

        let config = Config::new().with_yahoo_base_url(&server.uri());
        let scraper = YahooScraper::new(&config).unwrap();
        let symbol = scraper.provider_symbol("BHP");
        assert_eq!(symbol, "BHP.AX");

        let table = scraper.fetch_cash_flow(&symbol).await.unwrap();
        assert_eq!(table["2021-06-29"]["netIncome"], 11304000000);

        // crumb 已缓存，不会再次请求
        scraper.fetch_cash_flow(&symbol).await.unwrap();
    }

    #[tokio::test]
    async fn test_fetch_fails_on_http_error_without_json() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v10/finance/quoteSummary/BAD.AX"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
            .mount(&server)
            .await;

        let config = Config::new().with_yahoo_base_url(&server.uri());
        let scraper = YahooScraper::new(&config).unwrap();

        let err = scraper.fetch_balance_sheet("BAD.AX").await.unwrap_err();
        assert!(matches!(err, DataHubError::ProviderError { .. }));
    }
}
