//! Display formatting for dashboard tables

/// Placeholder for values the API did not provide
pub const MISSING: &str = "-";

/// Direction of a 24h change, used to color table cells
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Up,
    Down,
}

impl Trend {
    /// Strictly positive changes are `Up`; zero and negative are `Down`
    pub fn of(change: f64) -> Self {
        if change > 0.0 {
            Trend::Up
        } else {
            Trend::Down
        }
    }
}

/// Fixed-point rendering with exact ties rounded away from zero
///
/// `format!("{:.N}")` rounds ties to even, which shows 2.5 as "2".
fn fixed(value: f64, decimals: u32) -> String {
    let scale = 10f64.powi(decimals as i32);
    let rounded = (value * scale).round() / scale;
    format!("{:.*}", decimals as usize, rounded)
}

/// Inserts thousands separators into a plain `format!` rendering
fn group_thousands(formatted: &str) -> String {
    let (sign, unsigned) = match formatted.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", formatted),
    };
    let (integer, fraction) = match unsigned.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (unsigned, None),
    };

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (i, c) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    match fraction {
        Some(f) => format!("{}{}.{}", sign, grouped, f),
        None => format!("{}{}", sign, grouped),
    }
}

/// `$1,234.57`
pub fn format_price(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("${}", group_thousands(&fixed(v, 2))),
        None => MISSING.to_string(),
    }
}

/// `$1,234,568`, for market cap and volume
pub fn format_usd_whole(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("${}", group_thousands(&fixed(v, 0))),
        None => MISSING.to_string(),
    }
}

/// `2.35%`
pub fn format_percent(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{}%", fixed(v, 2)),
        None => MISSING.to_string(),
    }
}
