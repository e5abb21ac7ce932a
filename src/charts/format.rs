//! Axis and label formatting shared by the chart renderer and the console report.

use chrono::NaiveDate;

/// `1234567` -> `"1,234,567"`.
pub fn format_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);

    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if value < 0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

/// Axis tick in whole thousands, truncated: `54_900.0` -> `"54K"`.
pub fn format_kilo(value: f64) -> String {
    format!("{}K", (value / 1000.0) as i64)
}

/// Axis tick with thousands separators, truncated toward zero.
pub fn format_axis_thousands(value: f64) -> String {
    format_thousands(value as i64)
}

/// `"Jan 2021"`
pub fn month_label(date: NaiveDate) -> String {
    date.format("%b %Y").to_string()
}

/// `"Jan 16, 2021"`
pub fn short_date(date: NaiveDate) -> String {
    date.format("%b %d, %Y").to_string()
}

/// `"January 16, 2021"`
pub fn long_date(date: NaiveDate) -> String {
    date.format("%B %d, %Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thousands_separator() {
        assert_eq!(format_thousands(0), "0");
        assert_eq!(format_thousands(999), "999");
        assert_eq!(format_thousands(1000), "1,000");
        assert_eq!(format_thousands(4005), "4,005");
        assert_eq!(format_thousands(1_234_567), "1,234,567");
        assert_eq!(format_thousands(-25_300), "-25,300");
    }

    #[test]
    fn test_axis_formatters_truncate() {
        assert_eq!(format_kilo(54_900.0), "54K");
        assert_eq!(format_kilo(0.0), "0K");
        assert_eq!(format_axis_thousands(12_345.9), "12,345");
    }

    #[test]
    fn test_date_labels() {
        let date = NaiveDate::from_ymd_opt(2021, 1, 16).unwrap();
        assert_eq!(month_label(date), "Jan 2021");
        assert_eq!(short_date(date), "Jan 16, 2021");
        assert_eq!(long_date(date), "January 16, 2021");
    }
}
