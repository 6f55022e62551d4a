use anyhow::Result;
use chrono::NaiveDate;
use serde::Serialize;

use crate::aggregate::{DailyRow, DateRange};

pub fn render_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

#[derive(Debug, Serialize)]
struct DailyExport<'a> {
    start: NaiveDate,
    end: NaiveDate,
    days: &'a [DailyRow],
}

/// Per-day rows wrapped with the range they were selected from.
pub fn daily_rows_to_json(range: DateRange, rows: &[DailyRow]) -> Result<String> {
    render_json(&DailyExport {
        start: range.start,
        end: range.end,
        days: rows,
    })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::daily_rows_to_json;
    use crate::aggregate::DateRange;

    #[test]
    fn empty_export_keeps_the_range() {
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 5, 31).unwrap(),
        );
        let json: serde_json::Value =
            serde_json::from_str(&daily_rows_to_json(range, &[]).unwrap()).unwrap();
        assert_eq!(json["start"], "2024-05-01");
        assert_eq!(json["end"], "2024-05-31");
        assert_eq!(json["days"].as_array().map(Vec::len), Some(0));
    }
}
