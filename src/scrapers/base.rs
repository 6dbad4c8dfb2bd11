use crate::models::ticker::{CompanyInfo, StatementTable};
use crate::errors::Result;
use async_trait::async_trait;

/// Base trait for financial data scrapers
#[async_trait]
pub trait FinanceScraper {
    /// Provider symbol for an exchange ticker code
    fn provider_symbol(&self, code: &str) -> String;

    /// Fetch the company profile
    async fn fetch_company_info(&self, symbol: &str) -> Result<CompanyInfo>;

    /// Fetch the cleaned annual cash flow statement
    async fn fetch_cash_flow(&self, symbol: &str) -> Result<StatementTable>;

    /// Fetch the cleaned annual income statement
    async fn fetch_income_statement(&self, symbol: &str) -> Result<StatementTable>;

    /// Fetch the cleaned annual balance sheet
    async fn fetch_balance_sheet(&self, symbol: &str) -> Result<StatementTable>;
}
