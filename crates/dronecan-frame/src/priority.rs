//! Named transfer priorities.
//!
//! Priority is a 5-bit field; lower values win bus arbitration.

/// Highest priority.
pub const HIGHEST: u8 = 0;

pub const HIGH: u8 = 8;

/// Default for frames that do not specify one.
pub const MEDIUM: u8 = 16;

pub const LOW: u8 = 24;

/// Lowest priority.
pub const LOWEST: u8 = 31;

/// Returns a human-readable label for a priority value.
pub fn priority_name(priority: u8) -> &'static str {
    match priority {
        HIGHEST => "HIGHEST",
        1..=8 => "HIGH",
        9..=16 => "MEDIUM",
        17..=24 => "LOW",
        25..=31 => "LOWEST",
        _ => "INVALID",
    }
}
