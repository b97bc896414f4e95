use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Destination classification of a trip, deciding which rate entry applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Zone {
    /// Within the office's own jurisdiction / line patrol area.
    Local,
    /// The county seat.
    County,
    /// The city.
    City,
}

/// Rates for jurisdiction-internal trips.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocalRates {
    /// Per-diem food allowance.
    #[serde(default)]
    pub food: f64,
    /// Per-diem miscellaneous allowance (legacy config key `misc`).
    #[serde(default, rename = "misc")]
    pub per_diem_misc: f64,
}

/// Rates for county/city trips.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntercityRates {
    #[serde(default)]
    pub misc_one_way: f64,
    #[serde(default)]
    pub misc_round_trip: f64,
}

/// The full zone-to-rates mapping from the settings store.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateTable {
    pub local: LocalRates,
    pub county: IntercityRates,
    pub city: IntercityRates,
}

impl RateTable {
    /// Rate entry for an intercity zone. `Zone::Local` has no one-way/round-trip
    /// split and is handled separately by the expander.
    pub fn intercity(&self, zone: Zone) -> Option<IntercityRates> {
        match zone {
            Zone::Local => None,
            Zone::County => Some(self.county),
            Zone::City => Some(self.city),
        }
    }
}

/// A claimant, identified by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub name: String,
    pub phone: String,
    pub bank: String,
    pub card: String,
}

/// One row of the trip ledger: a single directional leg with its amounts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripLineItem {
    /// The date this specific leg occurred.
    pub date: NaiveDate,
    pub start_place: String,
    pub end_place: String,
    pub food_amount: f64,
    pub misc_amount: f64,
    /// Whether this leg needs a "no vehicle dispatched" certificate.
    pub needs_no_car_proof: bool,
    pub reason: String,
    /// The outer trip's overall start/end. Absent on synthesized return legs,
    /// which then fall back to the leg's own date.
    #[serde(default)]
    pub full_span: Option<(NaiveDate, NaiveDate)>,
    /// True only for the second leg of a two-day out-and-back trip.
    #[serde(default)]
    pub is_return_leg: bool,
}

impl TripLineItem {
    /// Total reimbursable amount for this leg.
    pub fn cost(&self) -> f64 {
        self.food_amount + self.misc_amount
    }

    /// The outer trip span, defaulting to the leg's own date when absent.
    pub fn span(&self) -> (NaiveDate, NaiveDate) {
        self.full_span.unwrap_or((self.date, self.date))
    }
}
