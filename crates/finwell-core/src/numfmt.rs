//! Total number formatting for chat responses. Every `f64` renders; non-finite values as `N/A`.

const NOT_AVAILABLE: &str = "N/A";

/// Dollar amount with K/M/B suffixes at 1e3/1e6/1e9, e.g. `$1.50B`, `$12.3K`, `-$4.20`.
pub fn format_currency(value: f64) -> String {
    if !value.is_finite() {
        return String::from(NOT_AVAILABLE);
    }

    let body = currency_body(value.abs());

    if value < 0.0 && !is_zero_text(&body) {
        format!("-${body}")
    } else {
        format!("${body}")
    }
}

/// Signed percentage with two decimals; positive values get a leading `+`.
pub fn format_percent(value: f64) -> String {
    if !value.is_finite() {
        return String::from(NOT_AVAILABLE);
    }

    let body = format!("{:.2}", value.abs());
    if is_zero_text(&body) {
        String::from("0.00%")
    } else if value > 0.0 {
        format!("+{body}%")
    } else {
        format!("-{body}%")
    }
}

/// Dollar price with thousands separators and two decimals, e.g. `$64,250.12`.
pub fn format_price(value: f64) -> String {
    if !value.is_finite() {
        return String::from(NOT_AVAILABLE);
    }

    let body = format!("{:.2}", value.abs());
    let (whole, fraction) = body.split_once('.').unwrap_or((body.as_str(), "00"));
    let grouped = group_thousands(whole);

    if value < 0.0 && !is_zero_text(&body) {
        format!("-${grouped}.{fraction}")
    } else {
        format!("${grouped}.{fraction}")
    }
}

/// Whole count with thousands separators, e.g. `1,204,332`.
pub fn format_count(value: f64) -> String {
    if !value.is_finite() {
        return String::from(NOT_AVAILABLE);
    }

    let rounded = format!("{:.0}", value.abs());
    let grouped = group_thousands(&rounded);
    if value < 0.0 && rounded != "0" {
        format!("-{grouped}")
    } else {
        grouped
    }
}

/// Plain number with up to `decimals` places.
pub fn format_number(value: f64, decimals: usize) -> String {
    if !value.is_finite() {
        return String::from(NOT_AVAILABLE);
    }

    let body = format!("{:.*}", decimals, value.abs());
    if value < 0.0 && !is_zero_text(&body) {
        format!("-{body}")
    } else {
        body
    }
}

/// (scale, suffix, decimals) from smallest to largest.
const CURRENCY_BANDS: [(f64, &str, usize); 4] =
    [(1.0, "", 2), (1e3, "K", 1), (1e6, "M", 2), (1e9, "B", 2)];

/// Picks the band after rounding, so `999_960` becomes `1.00M` rather than `1000.0K`.
fn currency_body(magnitude: f64) -> String {
    let mut band = CURRENCY_BANDS
        .iter()
        .rposition(|(scale, _, _)| magnitude >= *scale)
        .unwrap_or(0);

    loop {
        let (scale, suffix, decimals) = CURRENCY_BANDS[band];
        let scaled = format!("{:.*}", decimals, magnitude / scale);
        let overflows = scaled.parse::<f64>().is_ok_and(|rounded| rounded >= 1000.0);
        if overflows && band + 1 < CURRENCY_BANDS.len() {
            band += 1;
            continue;
        }
        return format!("{scaled}{suffix}");
    }
}

fn is_zero_text(body: &str) -> bool {
    body.chars().all(|ch| matches!(ch, '0' | '.' | 'K' | 'M' | 'B'))
}

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut grouped = String::with_capacity(len + len / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (len - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}
