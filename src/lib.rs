// 公开导出的模块，供外部使用
pub mod models;
pub mod errors;
pub mod store;
pub mod services;
pub mod views;

// 供命令行程序使用，库场景下通常不直接依赖
#[doc(hidden)]
pub mod scrapers;
#[doc(hidden)]
pub mod config;
#[doc(hidden)]
pub mod util;

// 重新导出常用类型，方便使用
pub use models::ticker::{TickerRecord, Section, StatementTable, CompanyInfo};
pub use store::{TickerStore, JsonFileStore};
pub use services::refresh_service::{RefreshWorker, RefreshStatus};
pub use errors::{Result, DataHubError};
