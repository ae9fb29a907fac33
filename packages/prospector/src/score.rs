//! Donor-potential scoring and score normalization.
//!
//! Scores cross several boundaries in this crate (provider output, stored
//! rows, user-supplied floors, UI display) on two scales: the internal 1-10
//! scale and the 0-100 display scale. All of that conversion goes through
//! the functions here so the rescaling rule cannot drift between call
//! sites.

/// Normalize a score to the internal 1-10 scale.
///
/// Values above 10 are treated as 0-100 input and mapped with
/// `ceil(n / 10)` clamped to [1, 10]. Values of 10 or below are kept
/// as-is, clamped to [0, 10] (a 0 stays 0 and fails any floor of 1+).
pub fn normalize_score_10(score: i64) -> i64 {
    if score > 10 {
        ((score + 9) / 10).clamp(1, 10)
    } else {
        score.clamp(0, 10)
    }
}

/// Project a score onto the 0-100 display scale.
pub fn ui_score(score: i64) -> i64 {
    normalize_score_10(score) * 10
}

/// Normalize a user-supplied minimum-score floor (1-10 or 0-100 input).
///
/// Absent or non-positive input means "no floor", which is 1.
pub fn normalize_min_score(score: Option<i64>) -> i64 {
    let raw = match score {
        Some(n) if n > 0 => n,
        _ => return 1,
    };
    if raw > 10 {
        ((raw + 9) / 10).clamp(1, 10)
    } else {
        raw.clamp(1, 10)
    }
}

/// Clamp a requested result limit to the supported range.
pub fn normalize_result_limit(limit: Option<i64>) -> usize {
    limit.unwrap_or(100).clamp(1, 1000) as usize
}

const ANIMAL_WELFARE_TYPES: [&str; 3] = ["animal_shelter", "veterinary_care", "pet_store"];
const WEALTH_ADJACENT_TYPES: [&str; 7] = [
    "bank",
    "finance",
    "financial_planner",
    "real_estate_agency",
    "lawyer",
    "accounting",
    "insurance_agency",
];
const STRONG_LOW_FIT_TYPES: [&str; 11] = [
    "parking",
    "parking_lot",
    "gas_station",
    "car_wash",
    "storage",
    "transit_station",
    "bus_station",
    "train_station",
    "airport",
    "rv_park",
    "campground",
];
const MODERATE_LOW_FIT_TYPES: [&str; 10] = [
    "plumber",
    "electrician",
    "roofing_contractor",
    "locksmith",
    "car_repair",
    "auto_parts_store",
    "towing",
    "laundry",
    "convenience_store",
    "atm",
];
const INSTITUTIONAL_TYPES: [&str; 3] = ["university", "hospital", "school"];

/// Heuristic donor-potential score for a discovered place, on the 1-10
/// scale.
///
/// Rewards mission alignment (animal-welfare and nonprofit types),
/// capacity signals (corporate offices, websites, philanthropic name
/// tokens, wealth-adjacent business categories), and down-ranks local
/// service types with low philanthropy intent.
pub fn score_place(name: &str, types: &[String], primary_type: &str, has_website: bool) -> i64 {
    let name = name.to_lowercase();
    let types: Vec<String> = types.iter().map(|t| t.to_lowercase()).collect();
    let primary = primary_type.to_lowercase();
    let has_type = |set: &[&str]| types.iter().any(|t| set.contains(&t.as_str()));

    let mut score: i64 = 3;

    if has_type(&ANIMAL_WELFARE_TYPES) {
        score += 2;
    }
    if types.iter().any(|t| t == "nonprofit_organization") {
        score += 2;
    }

    if types.iter().any(|t| t == "corporate_office") {
        score += 2;
    }
    if has_website {
        score += 1;
    }

    if ["foundation", "charities", "charity", "philanthrop", "trust"]
        .iter()
        .any(|k| name.contains(k))
    {
        score += 3;
    } else if ["group", "partners", "capital", "holdings"]
        .iter()
        .any(|k| name.contains(k))
    {
        score += 1;
    }

    if has_type(&WEALTH_ADJACENT_TYPES) {
        score += 2;
    }

    if has_type(&STRONG_LOW_FIT_TYPES) {
        score -= 3;
    }
    if has_type(&MODERATE_LOW_FIT_TYPES) {
        score -= 2;
    }
    if STRONG_LOW_FIT_TYPES.contains(&primary.as_str()) {
        score -= 2;
    }
    if MODERATE_LOW_FIT_TYPES.contains(&primary.as_str()) {
        score -= 1;
    }

    if has_type(&INSTITUTIONAL_TYPES) {
        score += 1;
    }
    if ["foundation", "capital", "wealth", "advisors", "holdings", "philanth"]
        .iter()
        .any(|k| name.contains(k))
    {
        score += 1;
    }

    score.clamp(1, 10)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_normalize_keeps_small_scale() {
        assert_eq!(normalize_score_10(0), 0);
        assert_eq!(normalize_score_10(5), 5);
        assert_eq!(normalize_score_10(10), 10);
    }

    #[test]
    fn test_normalize_maps_ui_scale() {
        assert_eq!(normalize_score_10(80), 8);
        assert_eq!(normalize_score_10(85), 9);
        assert_eq!(normalize_score_10(100), 10);
        assert_eq!(normalize_score_10(250), 10);
    }

    #[test]
    fn test_ui_score_projection() {
        assert_eq!(ui_score(7), 70);
        assert_eq!(ui_score(80), 80);
    }

    #[test]
    fn test_min_score_floors_at_one() {
        assert_eq!(normalize_min_score(None), 1);
        assert_eq!(normalize_min_score(Some(0)), 1);
        assert_eq!(normalize_min_score(Some(-3)), 1);
        assert_eq!(normalize_min_score(Some(5)), 5);
        assert_eq!(normalize_min_score(Some(80)), 8);
    }

    #[test]
    fn test_result_limit_clamps() {
        assert_eq!(normalize_result_limit(None), 100);
        assert_eq!(normalize_result_limit(Some(0)), 1);
        assert_eq!(normalize_result_limit(Some(5000)), 1000);
    }

    #[test]
    fn test_score_place_foundation_outranks_gas_station() {
        let foundation = score_place(
            "Evergreen Charitable Foundation",
            &["nonprofit_organization".into()],
            "nonprofit_organization",
            true,
        );
        let gas = score_place("QuickFuel", &["gas_station".into()], "gas_station", false);
        assert!(foundation >= 8, "got {foundation}");
        assert_eq!(gas, 1);
    }

    #[test]
    fn test_score_place_animal_shelter_is_mission_aligned() {
        let score = score_place(
            "Westside Animal Shelter",
            &["animal_shelter".into(), "nonprofit_organization".into()],
            "animal_shelter",
            true,
        );
        assert!(score >= 8, "got {score}");
    }

    proptest! {
        #[test]
        fn prop_rescale_is_idempotent(n in 0i64..5000) {
            let once = normalize_score_10(n);
            prop_assert_eq!(normalize_score_10(once), once);
        }

        #[test]
        fn prop_rescale_range(n in 1i64..5000) {
            let scaled = normalize_score_10(n);
            prop_assert!((1..=10).contains(&scaled));
            prop_assert!((0..=100).contains(&ui_score(n)));
        }

        #[test]
        fn prop_min_score_in_range(n in proptest::option::of(-100i64..5000)) {
            prop_assert!((1..=10).contains(&normalize_min_score(n)));
        }
    }
}
