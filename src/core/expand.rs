//! Trip expansion: one user-entered trip becomes one or two dated ledger
//! line-items according to the zone rules.

use crate::config::{AppConfig, StationInfo};
use crate::errors::{Error, Result};
use crate::models::{TripLineItem, Zone};
use chrono::NaiveDate;
use serde::Deserialize;

/// The "this office" token offered by place pickers.
pub const THIS_OFFICE: &str = "本所";
/// The end-place choice denoting a trip within the jurisdiction.
pub const JURISDICTION_ENDPOINT: &str = "辖区线路";
/// The end-place label written into documents for jurisdiction trips.
const JURISDICTION_LABEL: &str = "辖区";
/// Organizational suffix stripped from the office name in place columns.
const OFFICE_SUFFIX: &str = "供电所";

/// A single validated trip entry, as supplied by the UI or a batch file.
#[derive(Debug, Clone, Deserialize)]
pub struct TripRequest {
    /// Departure date, `YYYY-MM-DD`.
    pub start_date: String,
    /// Return date, required when `same_day` is false.
    #[serde(default)]
    pub end_date: Option<String>,
    pub start_place: String,
    pub end_place: String,
    #[serde(default = "default_same_day")]
    pub same_day: bool,
    #[serde(default)]
    pub needs_no_car_proof: bool,
    #[serde(default = "default_reason")]
    pub reason: String,
}

fn default_same_day() -> bool {
    true
}

fn default_reason() -> String {
    "差旅".to_string()
}

/// Classifies an end place against the configured place names.
pub fn classify(end_place: &str, station: &StationInfo) -> Result<Zone> {
    if end_place == JURISDICTION_ENDPOINT {
        Ok(Zone::Local)
    } else if end_place == station.county {
        Ok(Zone::County)
    } else if end_place == station.city {
        Ok(Zone::City)
    } else {
        Err(Error::InvalidZone(end_place.to_string()))
    }
}

/// Expands a trip request into ledger line-items.
///
/// Jurisdiction trips and same-day county/city round trips produce exactly
/// one item; a multi-day county/city trip always produces an outbound and a
/// return leg.
pub fn expand(request: &TripRequest, config: &AppConfig) -> Result<Vec<TripLineItem>> {
    let start = parse_date(&request.start_date)?;
    let end = if request.same_day {
        start
    } else {
        let raw = request
            .end_date
            .as_deref()
            .ok_or_else(|| Error::InvalidDate("return date missing".to_string()))?;
        parse_date(raw)?
    };

    let zone = classify(&request.end_place, &config.station_info)?;
    let start_place = normalize_place(&request.start_place, &config.station_info);

    let items = match zone {
        Zone::Local => vec![TripLineItem {
            date: start,
            start_place,
            end_place: JURISDICTION_LABEL.to_string(),
            food_amount: config.rules.local.food,
            misc_amount: config.rules.local.per_diem_misc,
            needs_no_car_proof: request.needs_no_car_proof,
            reason: request.reason.clone(),
            full_span: Some((start, end)),
            is_return_leg: false,
        }],
        Zone::County | Zone::City => {
            // `classify` only returns Local for the jurisdiction endpoint.
            let rates = config
                .rules
                .intercity(zone)
                .unwrap_or(config.rules.county);
            if request.same_day {
                vec![TripLineItem {
                    date: start,
                    start_place,
                    end_place: request.end_place.clone(),
                    food_amount: 0.0,
                    misc_amount: rates.misc_round_trip,
                    needs_no_car_proof: request.needs_no_car_proof,
                    reason: request.reason.clone(),
                    full_span: Some((start, end)),
                    is_return_leg: false,
                }]
            } else {
                vec![
                    TripLineItem {
                        date: start,
                        start_place: start_place.clone(),
                        end_place: request.end_place.clone(),
                        food_amount: 0.0,
                        misc_amount: rates.misc_one_way,
                        needs_no_car_proof: request.needs_no_car_proof,
                        reason: request.reason.clone(),
                        full_span: Some((start, end)),
                        is_return_leg: false,
                    },
                    TripLineItem {
                        date: end,
                        start_place: request.end_place.clone(),
                        end_place: start_place,
                        food_amount: 0.0,
                        misc_amount: rates.misc_one_way,
                        needs_no_car_proof: false,
                        reason: request.reason.clone(),
                        full_span: None,
                        is_return_leg: true,
                    },
                ]
            }
        }
    };
    Ok(items)
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| Error::InvalidDate(raw.to_string()))
}

/// Substitutes the "this office" token with the configured office name, its
/// organizational suffix stripped.
fn normalize_place(place: &str, station: &StationInfo) -> String {
    let short_name = station.name.replace(OFFICE_SUFFIX, "");
    place.replace(THIS_OFFICE, &short_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn config() -> AppConfig {
        AppConfig::default()
    }

    fn request(end_place: &str) -> TripRequest {
        TripRequest {
            start_date: "2024-05-06".to_string(),
            end_date: None,
            start_place: THIS_OFFICE.to_string(),
            end_place: end_place.to_string(),
            same_day: true,
            needs_no_car_proof: false,
            reason: "线路巡视".to_string(),
        }
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_local_trip_is_one_item_with_both_rates() {
        let mut req = request(JURISDICTION_ENDPOINT);
        req.needs_no_car_proof = true;
        let items = expand(&req, &config()).unwrap();
        assert_eq!(items.len(), 1);
        let item = &items[0];
        assert_eq!(item.food_amount, config().rules.local.food);
        assert_eq!(item.misc_amount, config().rules.local.per_diem_misc);
        assert_eq!(item.start_place, "龙潭");
        assert_eq!(item.end_place, "辖区");
        assert!(item.needs_no_car_proof);
        assert_eq!(item.full_span, Some((date("2024-05-06"), date("2024-05-06"))));
        assert!(!item.is_return_leg);
    }

    #[test]
    fn test_same_day_county_round_trip() {
        let items = expand(&request("桃源县"), &config()).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].food_amount, 0.0);
        assert_eq!(items[0].misc_amount, 30.0);
        assert_eq!(items[0].end_place, "桃源县");
    }

    #[test]
    fn test_multi_day_city_trip_expands_to_two_legs() {
        let mut req = request("常德市");
        req.start_date = "2024-05-10".to_string();
        req.end_date = Some("2024-05-12".to_string());
        req.same_day = false;
        req.needs_no_car_proof = true;

        let items = expand(&req, &config()).unwrap();
        assert_eq!(items.len(), 2);

        let out = &items[0];
        assert_eq!(out.date, date("2024-05-10"));
        assert_eq!(out.misc_amount, 25.0);
        assert!(out.needs_no_car_proof);
        assert_eq!(out.full_span, Some((date("2024-05-10"), date("2024-05-12"))));
        assert_eq!((out.start_place.as_str(), out.end_place.as_str()), ("龙潭", "常德市"));

        let back = &items[1];
        assert_eq!(back.date, date("2024-05-12"));
        assert_eq!(back.misc_amount, 25.0);
        assert!(back.is_return_leg);
        // The no-car flag never carries over to the synthesized return leg.
        assert!(!back.needs_no_car_proof);
        assert_eq!(back.full_span, None);
        assert_eq!(back.span(), (date("2024-05-12"), date("2024-05-12")));
        assert_eq!((back.start_place.as_str(), back.end_place.as_str()), ("常德市", "龙潭"));
    }

    #[test]
    fn test_missing_return_date_is_rejected() {
        let mut req = request("桃源县");
        req.same_day = false;
        assert!(matches!(
            expand(&req, &config()),
            Err(Error::InvalidDate(_))
        ));
    }

    #[test]
    fn test_bad_date_is_rejected() {
        let mut req = request("桃源县");
        req.start_date = "2024-13-40".to_string();
        assert!(matches!(
            expand(&req, &config()),
            Err(Error::InvalidDate(_))
        ));
    }

    #[test]
    fn test_unknown_end_place_is_rejected() {
        assert!(matches!(
            expand(&request("长沙市"), &config()),
            Err(Error::InvalidZone(_))
        ));
    }
}
