use anyhow::{Context, Result};
use asx_datahub::config::Config;
use asx_datahub::store::{JsonFileStore, QueryRequest, SortIndex, TickerStore};
use std::env;

/// 列出最久未更新的股票以及各数据段是否可用
#[tokio::main]
async fn main() -> Result<()> {
    let limit = env::args()
        .nth(1)
        .map(|arg| arg.parse::<usize>())
        .transpose()
        .context("limit must be a number")?
        .unwrap_or(10);

    let config = Config::from_env()?;
    let path = config.table_path();
    if !path.exists() {
        anyhow::bail!(
            "数据表 {} 不存在，请先运行 'cargo run -- init --file <csv>'",
            path.display()
        );
    }

    let store = JsonFileStore::open(&path)?;
    let page = store
        .query(QueryRequest::new(SortIndex::LastUpdated).with_limit(limit))
        .await?;

    let mark = |available: bool| if available { "ok" } else { "N/A" };
    println!(
        "{:<8} {:<28} {:<5} {:<5} {:<5} {:<5}",
        "Code", "LastUpdated", "Info", "CF", "IS", "BS"
    );
    for record in &page.items {
        println!(
            "{:<8} {:<28} {:<5} {:<5} {:<5} {:<5}",
            record.code,
            record.last_updated,
            mark(record.info.is_available()),
            mark(record.cash_flow.is_available()),
            mark(record.income_statement.is_available()),
            mark(record.balance_sheet.is_available()),
        );
    }

    let total = store.len().await;
    let complete = page
        .items
        .iter()
        .filter(|r| {
            r.info.is_available()
                && r.cash_flow.is_available()
                && r.income_statement.is_available()
                && r.balance_sheet.is_available()
        })
        .count();
    println!(
        "{} of {} shown have all sections; {} tickers in table",
        complete,
        page.items.len(),
        total
    );

    Ok(())
}
