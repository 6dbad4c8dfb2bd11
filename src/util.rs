use crate::models::ticker::StatementTable;
use serde_json::Value;
use std::collections::BTreeMap;

/// 原始报表：报告期 -> 科目 -> 未清洗的值（可能为空或非数字）
pub type RawStatement = BTreeMap<String, BTreeMap<String, Value>>;

/// 将单元格转为整数，缺失或无法识别的值记为 0，小数向零截断
pub fn clean_cell(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
            .unwrap_or(0),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(|f| f.trunc() as i64)
            .unwrap_or(0),
        Value::Bool(b) => *b as i64,
        _ => 0,
    }
}

/// 清洗报表：列标签统一为字符串，空值补 0，全部转为整数
pub fn clean_statement(raw: &RawStatement) -> StatementTable {
    raw.iter()
        .map(|(period, fields)| {
            let cleaned = fields
                .iter()
                .map(|(field, value)| (field.clone(), clean_cell(value)))
                .collect();
            (period.clone(), cleaned)
        })
        .collect()
}

/// 市值等整数字段：无法解析时为 0
pub fn try_int(value: &str) -> i64 {
    value.trim().parse::<i64>().unwrap_or(0)
}

/// 空字段替换为 "N/A"，其余原样保留
pub fn or_not_available(value: &str) -> String {
    if value.is_empty() {
        crate::models::ticker::NOT_AVAILABLE.to_string()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    // 把已清洗的报表还原成原始形式，便于再次清洗
    fn to_raw(table: &StatementTable) -> RawStatement {
        table
            .iter()
            .map(|(period, fields)| {
                let raw = fields
                    .iter()
                    .map(|(field, value)| (field.clone(), Value::from(*value)))
                    .collect();
                (period.clone(), raw)
            })
            .collect()
    }

    fn raw_sample() -> RawStatement {
        let mut raw = RawStatement::new();
        raw.insert(
            "2021-06-30".to_string(),
            BTreeMap::from([
                ("netIncome".to_string(), json!(1234.9)),
                ("capitalExpenditures".to_string(), json!(-50.5)),
                ("dividendsPaid".to_string(), Value::Null),
                ("issuanceOfStock".to_string(), json!("77")),
                ("repurchaseOfStock".to_string(), json!("n/a")),
            ]),
        );
        raw
    }

    #[test]
    fn test_clean_fills_missing_and_truncates() {
        let cleaned = clean_statement(&raw_sample());
        let period = &cleaned["2021-06-30"];
        assert_eq!(period["netIncome"], 1234);
        assert_eq!(period["capitalExpenditures"], -50);
        assert_eq!(period["dividendsPaid"], 0);
        assert_eq!(period["issuanceOfStock"], 77);
        assert_eq!(period["repurchaseOfStock"], 0);
    }

    #[test]
    fn test_clean_is_idempotent() {
        let once = clean_statement(&raw_sample());
        let twice = clean_statement(&to_raw(&once));
        assert_eq!(once, twice);
    }

    #[test]
    fn test_try_int_defaults_to_zero() {
        assert_eq!(try_int("123456"), 123456);
        assert_eq!(try_int(""), 0);
        assert_eq!(try_int("1,200"), 0);
        assert_eq!(try_int("12.5"), 0);
    }

    #[test]
    fn test_or_not_available() {
        assert_eq!(or_not_available(""), "N/A");
        assert_eq!(or_not_available("Materials"), "Materials");
        assert_eq!(or_not_available(" Acme Co "), " Acme Co ");
        assert_eq!(or_not_available("  "), "  ");
    }
}
