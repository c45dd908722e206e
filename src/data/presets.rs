//! Country preset catalog: baseline monthly profiles per country.

use crate::domain::EconomicProfile;
use crate::error::ForecastError;

/// A named baseline profile.
#[derive(Debug, Clone, Copy)]
pub struct Preset {
    pub country: &'static str,
    pub profile: EconomicProfile,
}

const fn preset(
    country: &'static str,
    food: f64,
    rent: f64,
    energy: f64,
    transport: f64,
    debt: f64,
    income: f64,
) -> Preset {
    Preset {
        country,
        profile: EconomicProfile {
            food,
            rent,
            energy,
            transport,
            debt,
            income,
        },
    }
}

/// The catalog, in display order.
pub const PRESETS: [Preset; 4] = [
    preset("Finland", 320.0, 850.0, 160.0, 140.0, 200.0, 3400.0),
    preset("Germany", 310.0, 750.0, 150.0, 130.0, 180.0, 3300.0),
    preset("USA", 360.0, 950.0, 200.0, 170.0, 250.0, 5000.0),
    preset("Romania", 260.0, 450.0, 120.0, 100.0, 90.0, 2000.0),
];

/// Country keys, in catalog order.
pub const COUNTRIES: [&str; 4] = [
    PRESETS[0].country,
    PRESETS[1].country,
    PRESETS[2].country,
    PRESETS[3].country,
];

/// Look up the baseline profile for a country (exact, case-sensitive key).
pub fn lookup(country: &str) -> Result<EconomicProfile, ForecastError> {
    PRESETS
        .iter()
        .find(|p| p.country == country)
        .map(|p| p.profile)
        .ok_or_else(|| ForecastError::UnknownCountry(country.to_string()))
}

/// Position of a country in the catalog.
pub fn index_of(country: &str) -> Option<usize> {
    PRESETS.iter().position(|p| p.country == country)
}

/// Next country in catalog order (wraps around).
pub fn next_country(country: &str) -> &'static str {
    let idx = index_of(country).map_or(0, |i| (i + 1) % PRESETS.len());
    PRESETS[idx].country
}

/// Previous country in catalog order (wraps around).
pub fn prev_country(country: &str) -> &'static str {
    let idx = index_of(country).map_or(0, |i| (i + PRESETS.len() - 1) % PRESETS.len());
    PRESETS[idx].country
}
