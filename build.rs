use std::env;
use std::path::Path;

fn main() {
    // 获取项目根目录
    let manifest_dir = env::var("CARGO_MANIFEST_DIR").unwrap();

    // 检查数据表是否已初始化
    let table_file = Path::new(&manifest_dir).join("data").join("tickers.json");
    if !table_file.exists() {
        println!("cargo:warning=data/tickers.json not found. Refresh will fail until loaded.");
        println!("cargo:warning=Run 'cargo run -- init --file <ASX listed companies CSV>' first.");
    } else {
        println!("cargo:rerun-if-changed=data/tickers.json");
    }
}
