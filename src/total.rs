//! Grand-total derivation.

/// Sum of the non-null, finite components; `None` when none qualify.
///
/// ```rust
/// use quote_harness::total::calculate_total;
///
/// assert_eq!(calculate_total(Some(1000.0), None, Some(500.0)), Some(1500.0));
/// assert_eq!(calculate_total(None, None, None), None);
/// ```
pub fn calculate_total(
    guestroom_total: Option<f64>,
    meeting_room_total: Option<f64>,
    food_beverage_total: Option<f64>,
) -> Option<f64> {
    let valid: Vec<f64> = [guestroom_total, meeting_room_total, food_beverage_total]
        .into_iter()
        .flatten()
        .filter(|v| v.is_finite())
        .collect();

    if valid.is_empty() {
        return None;
    }

    Some(valid.iter().sum())
}
