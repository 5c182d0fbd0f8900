//! London terminal stations.
//!
//! Boards can be filtered "to London" or "from London", which means any of
//! the central London termini rather than a single station.

use std::collections::HashSet;

use crate::domain::Crs;

/// CRS codes of the London terminals.
pub const LONDON_TERMINAL_CODES: [&str; 18] = [
    "BFR", // Blackfriars
    "CST", // Cannon Street
    "CHX", // Charing Cross
    "CTK", // City Thameslink
    "EUS", // Euston
    "FST", // Fenchurch Street
    "KGX", // Kings Cross
    "LST", // Liverpool Street
    "LBG", // London Bridge
    "MYB", // Marylebone
    "MOG", // Moorgate
    "OLD", // Old Street
    "PAD", // Paddington
    "STP", // St Pancras
    "VXH", // Vauxhall
    "VIC", // Victoria
    "WAT", // Waterloo
    "WAE", // Waterloo East
];

/// Returns true for the filter station values that mean "any London terminal".
pub fn is_london_alias(s: &str) -> bool {
    let s = s.trim();
    s.eq_ignore_ascii_case("LON") || s.eq_ignore_ascii_case("London")
}

/// The London terminals as parsed codes.
pub fn london_terminal_codes() -> HashSet<Crs> {
    LONDON_TERMINAL_CODES
        .iter()
        .filter_map(|code| Crs::parse(code).ok())
        .collect()
}

/// Something that knows which stations count as London terminals.
pub trait LondonTerminals: Send + Sync {
    fn london_terminals(&self) -> HashSet<Crs>;
}

/// The built-in terminal list, needing no station data.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedLondonTerminals;

impl LondonTerminals for FixedLondonTerminals {
    fn london_terminals(&self) -> HashSet<Crs> {
        london_terminal_codes()
    }
}
