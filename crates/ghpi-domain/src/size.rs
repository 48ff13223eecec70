const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Renders a byte count with two decimals in binary units, e.g. `1.50 KB`.
#[must_use]
pub fn format_size(bytes: u64) -> String {
    let mut unit = 1_u64;
    for suffix in UNITS {
        if bytes < unit.saturating_mul(1024) {
            return format_scaled(bytes, unit, suffix);
        }
        unit = unit.saturating_mul(1024);
    }
    format_scaled(bytes, unit, "PB")
}

fn format_scaled(value: u64, unit: u64, suffix: &str) -> String {
    let whole = value / unit;
    let remainder = u128::from(value % unit);
    let hundredths = (remainder * 100) / u128::from(unit);
    format!("{whole}.{hundredths:02} {suffix}")
}
