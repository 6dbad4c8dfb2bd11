use asx_datahub::config::Config;
use asx_datahub::scrapers::yahoo::YahooScraper;
use asx_datahub::services::bulk_loader::BulkLoader;
use asx_datahub::services::catalog::{self, TickerCatalog};
use asx_datahub::services::refresh_service::RefreshWorker;
use asx_datahub::store::{JsonFileStore, SortIndex, TickerStore};
use asx_datahub::views;

use clap::{App, Arg, SubCommand};
use log::info;
use std::error::Error;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize logger
    env_logger::init();

    let app = App::new("ASX DataHub")
        .version(env!("CARGO_PKG_VERSION"))
        .about("ASX company financials scraper and store")
        .arg(
            Arg::with_name("data-dir")
                .long("data-dir")
                .value_name("DIR")
                .help("Directory holding the ticker table (overrides DATAHUB_DATA_DIR)")
                .takes_value(true)
                .global(true),
        );

    let app = app
        .subcommand(
            SubCommand::with_name("refresh")
                .about("Refresh the ticker with the oldest LastUpdated")
                .arg(
                    Arg::with_name("symbol")
                        .short('s')
                        .long("symbol")
                        .value_name("CODE")
                        .help("Refresh this ticker instead of the stalest one")
                        .takes_value(true),
                ),
        )
        .subcommand(
            SubCommand::with_name("init")
                .about("Load the ASX listed companies reference CSV")
                .arg(
                    Arg::with_name("file")
                        .short('f')
                        .long("file")
                        .value_name("PATH")
                        .help("Reference CSV: code, name, group, listing date, market cap")
                        .required(true)
                        .takes_value(true),
                ),
        )
        .subcommand(
            SubCommand::with_name("show")
                .about("Show stored data for one ticker")
                .arg(
                    Arg::with_name("symbol")
                        .short('s')
                        .long("symbol")
                        .value_name("CODE")
                        .required(true)
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("section")
                        .long("section")
                        .value_name("SECTION")
                        .help("info, cash-flow, income-statement, balance-sheet")
                        .takes_value(true)
                        .default_value("info"),
                ),
        )
        .subcommand(
            SubCommand::with_name("list")
                .about("List tickers ordered by an index")
                .arg(
                    Arg::with_name("sort-by")
                        .long("sort-by")
                        .value_name("INDEX")
                        .help("ticker, lastUpdated, marketCap, companyName, group, listingDate")
                        .takes_value(true)
                        .default_value("ticker"),
                )
                .arg(
                    Arg::with_name("order")
                        .long("order")
                        .value_name("ORDER")
                        .help("asc or dsc")
                        .takes_value(true)
                        .default_value("asc"),
                )
                .arg(
                    Arg::with_name("limit")
                        .short('l')
                        .long("limit")
                        .value_name("LIMIT")
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("page")
                        .short('p')
                        .long("page")
                        .value_name("PAGE")
                        .help("Pages are walked from 1 up to this page")
                        .takes_value(true)
                        .default_value("1"),
                ),
        );

    let matches = app.get_matches();

    let mut config = Config::from_env()?;
    if let Some(dir) = matches.value_of("data-dir") {
        config = config.with_data_dir(dir);
    }
    info!("Using ticker table {}", config.table_path().display());

    let store: Arc<dyn TickerStore + Send + Sync> =
        Arc::new(JsonFileStore::open(config.table_path())?);

    if let Some(matches) = matches.subcommand_matches("refresh") {
        let scraper = Arc::new(YahooScraper::new(&config)?);
        let worker = RefreshWorker::new(&config, store, scraper);

        let status = match matches.value_of("symbol") {
            Some(symbol) => worker.refresh_ticker(symbol).await?,
            None => worker.refresh_oldest().await?,
        };
        println!("{}", serde_json::to_string(&status)?);
    } else if let Some(matches) = matches.subcommand_matches("init") {
        let file = matches.value_of("file").ok_or("missing --file")?;
        let summary = BulkLoader::new(store).load_csv(file).await?;
        println!("{}", serde_json::to_string(&summary)?);
    } else if let Some(matches) = matches.subcommand_matches("show") {
        let symbol = matches.value_of("symbol").ok_or("missing --symbol")?;
        let section = matches.value_of("section").unwrap_or("info");
        let record = TickerCatalog::new(store).get_ticker(symbol).await?;

        println!("{} ({}) - {}", record.company_name, record.code, record.group);
        println!("Listed {}, market cap {}", record.listing_date, record.market_cap);
        println!("Last updated {}", views::last_updated_local(&record));
        println!();

        let statement = match section {
            "info" => {
                for (label, value) in views::info_rows(&record.info) {
                    println!("{:<15} {}", label, value);
                }
                return Ok(());
            }
            "cash-flow" => &record.cash_flow,
            "income-statement" => &record.income_statement,
            "balance-sheet" => &record.balance_sheet,
            other => return Err(format!("Unknown section: {}", other).into()),
        };
        match views::statement_view(statement) {
            Some(view) => println!("{}", views::render_table(&view)),
            None => println!("N/A"),
        }
    } else if let Some(matches) = matches.subcommand_matches("list") {
        let index = SortIndex::parse(matches.value_of("sort-by").unwrap_or("ticker"))?;
        let ascending = catalog::parse_order(matches.value_of("order").unwrap_or("asc"))?;
        let limit = match matches.value_of("limit") {
            Some(limit) => limit.parse::<usize>()?,
            None => config.page_size,
        };
        let page = matches.value_of("page").unwrap_or("1").parse::<usize>()?;

        // 续页键只在本次进程内有效，需要逐页走到目标页
        let catalog = TickerCatalog::new(store);
        let mut items = Vec::new();
        for current in 1..=page.max(1) {
            items = catalog.search(index, ascending, current, limit).await?;
        }

        println!(
            "{:<8} {:<40} {:<30} {:>16} {}",
            "Code", "Company", "Group", "Market Cap", "Last Updated"
        );
        println!("{:-<120}", "");
        for record in &items {
            println!(
                "{:<8} {:<40} {:<30} {:>16} {}",
                record.code,
                record.company_name,
                record.group,
                record.market_cap,
                record.last_updated
            );
        }
        if items.is_empty() {
            info!("No tickers on page {}", page);
        }
    } else {
        info!("No command specified. Use --help for usage information.");
    }

    Ok(())
}
