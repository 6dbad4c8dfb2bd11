use crate::models::ticker::{
    self, CompanyInfo, Section, StatementTable, TickerRecord, NOT_AVAILABLE,
};
use chrono_tz::Australia::Sydney;
use serde_json::Value;
use std::collections::BTreeSet;

/// 公司资料页展示的字段及标签
pub const INFO_HEADERS: [(&str, &str); 9] = [
    ("sector", "Sector:"),
    ("industry", "Industry:"),
    ("website", "Website:"),
    ("address1", "Address:"),
    ("city", "City:"),
    ("state", "State:"),
    ("phone", "Phone Number:"),
    ("zip", "Postcode:"),
    ("country", "Country:"),
];

/// 表格视图：表头加若干行
#[derive(Debug, Clone, PartialEq)]
pub struct TableView {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => NOT_AVAILABLE.to_string(),
        other => other.to_string(),
    }
}

/// Label/value rows for the company profile. Missing fields show "N/A".
pub fn info_rows(info: &Section<CompanyInfo>) -> Vec<(String, String)> {
    INFO_HEADERS
        .iter()
        .map(|(key, label)| {
            let value = info
                .data()
                .and_then(|i| i.get(*key))
                .map(scalar_text)
                .unwrap_or_else(|| NOT_AVAILABLE.to_string());
            (label.to_string(), value)
        })
        .collect()
}

/// 报表视图：科目为行，报告期为列（最新在前）
pub fn statement_view(section: &Section<StatementTable>) -> Option<TableView> {
    let table = section.data()?;
    let periods: Vec<&String> = table.keys().rev().collect();
    let fields: BTreeSet<&String> = table.values().flat_map(|f| f.keys()).collect();

    let mut header = vec![String::new()];
    header.extend(periods.iter().map(|p| p.to_string()));

    let rows = fields
        .into_iter()
        .map(|field| {
            let mut row = vec![field.clone()];
            row.extend(periods.iter().map(|p| {
                table[*p]
                    .get(field)
                    .map(|v| v.to_string())
                    .unwrap_or_default()
            }));
            row
        })
        .collect();

    Some(TableView { header, rows })
}

/// 以悉尼时间显示最后更新时间
pub fn last_updated_local(record: &TickerRecord) -> String {
    match ticker::parse_timestamp(&record.last_updated) {
        Some(ts) => ts
            .and_utc()
            .with_timezone(&Sydney)
            .format("%Y-%m-%d %H:%M:%S %Z")
            .to_string(),
        None => record.last_updated.clone(),
    }
}

/// 按列宽对齐渲染为纯文本
pub fn render_table(view: &TableView) -> String {
    let columns = view.header.len();
    let mut widths = vec![0usize; columns];
    for row in std::iter::once(&view.header).chain(view.rows.iter()) {
        for (i, cell) in row.iter().enumerate().take(columns) {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    // 行按表头列数截断或补空
    let format_row = |row: &Vec<String>| {
        widths
            .iter()
            .enumerate()
            .map(|(i, width)| {
                let cell = row.get(i).map(String::as_str).unwrap_or("");
                format!("{:<width$}", cell, width = *width)
            })
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut lines = vec![format_row(&view.header)];
    lines.push("-".repeat(widths.iter().sum::<usize>() + 2 * columns.saturating_sub(1)));
    lines.extend(view.rows.iter().map(format_row));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::collections::BTreeMap;

    #[test]
    fn test_info_rows_fill_missing() {
        let info = Section::Available(CompanyInfo::from([
            ("sector".to_string(), json!("Financial Services")),
            ("zip".to_string(), json!(2000)),
        ]));
        let rows = info_rows(&info);
        assert_eq!(rows.len(), 9);
        assert_eq!(rows[0], ("Sector:".to_string(), "Financial Services".to_string()));
        assert_eq!(rows[1].1, "N/A");
        assert_eq!(rows[7], ("Postcode:".to_string(), "2000".to_string()));

        assert!(info_rows(&Section::Unavailable).iter().all(|(_, v)| v == "N/A"));
    }

    #[test]
    fn test_statement_view_periods_newest_first() {
        let table: StatementTable = BTreeMap::from([
            ("2020-06-30".to_string(), BTreeMap::from([("netIncome".to_string(), 5)])),
            (
                "2021-06-30".to_string(),
                BTreeMap::from([("netIncome".to_string(), 7), ("capex".to_string(), -3)]),
            ),
        ]);
        let view = statement_view(&Section::Available(table)).unwrap();

        assert_eq!(view.header, vec!["", "2021-06-30", "2020-06-30"]);
        assert_eq!(view.rows[0], vec!["capex", "-3", ""]);
        assert_eq!(view.rows[1], vec!["netIncome", "7", "5"]);
        assert!(statement_view(&Section::Unavailable).is_none());

        let text = render_table(&view);
        assert!(text.lines().nth(2).unwrap().starts_with("capex"));
    }

    #[test]
    fn test_render_table_fits_rows_to_header() {
        let view = TableView {
            header: vec!["".to_string(), "2021".to_string()],
            rows: vec![
                vec!["netIncome".to_string(), "7".to_string(), "extra".to_string()],
                vec!["capex".to_string()],
            ],
        };
        let text = render_table(&view);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 4);
        assert_eq!(lines[2], "netIncome  7");
        assert_eq!(lines[3], "capex");
        assert!(!text.contains("extra"));
    }

    #[test]
    fn test_last_updated_in_sydney_time() {
        let updated = "2021-01-01T00:00:00".to_string();
        let record = TickerRecord::new("ABC", "Acme", "Materials", "2000-01-01", 0, updated);
        assert_eq!(last_updated_local(&record), "2021-01-01 11:00:00 AEDT");
    }
}
