//! Human-readable byte sizes for log lines

use byte_unit::{Byte, UnitType};

/// Format a byte count with a binary unit, e.g. `1.50 KiB`
pub fn format_bytes(bytes: u64) -> String {
    let adjusted = Byte::from_u64(bytes).get_appropriate_unit(UnitType::Binary);
    format!("{adjusted:.2}")
}

/// Percentage of `done` over `total`, clamped to 100 and 0 when `total` is unknown
pub fn percent(done: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (done as f64 / total as f64 * 100.0).min(100.0)
}
