//! Hourly profiles over the optimisation horizon.
use crate::sizing::SizingError;
use crate::units::{Dimensionless, Energy};
use std::ops::Index;

/// An ordered sequence of values, one per hour of the horizon.
///
/// Hour `t` of the horizon is at index `t`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TimeSeries<T>(Vec<T>);

impl<T> TimeSeries<T> {
    /// Create a new [`TimeSeries`] from hourly values
    pub fn new(values: Vec<T>) -> Self {
        Self(values)
    }

    /// The number of hours covered
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the series contains no values
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Get the value for the given hour, if it is in range
    pub fn get(&self, hour: usize) -> Option<&T> {
        self.0.get(hour)
    }

    /// Iterate over the values in hour order
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.0.iter()
    }

    /// The values as a slice
    pub fn as_slice(&self) -> &[T] {
        &self.0
    }
}

impl<T> Index<usize> for TimeSeries<T> {
    type Output = T;

    fn index(&self, hour: usize) -> &T {
        &self.0[hour]
    }
}

impl<T> FromIterator<T> for TimeSeries<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<T> From<Vec<T>> for TimeSeries<T> {
    fn from(values: Vec<T>) -> Self {
        Self(values)
    }
}

impl<'a, T> IntoIterator for &'a TimeSeries<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// The hourly load to be served (kWh in each hour)
pub type LoadProfile = TimeSeries<Energy>;

/// The fraction of installed solar capacity which can be delivered in each hour
pub type CapacityFactorProfile = TimeSeries<Dimensionless>;

/// The shortest horizon for which storage continuity can be expressed
pub const MIN_HORIZON: usize = 2;

/// Check that the load and capacity factor profiles are consistent with one another.
///
/// Both profiles must be the same length, cover at least [`MIN_HORIZON`] hours, the load must be
/// non-negative and every capacity factor must lie in [0, 1].
///
/// # Returns
///
/// The horizon length in hours
pub fn check_profiles(
    load: &LoadProfile,
    capacity_factor: &CapacityFactorProfile,
) -> Result<usize, SizingError> {
    if load.len() != capacity_factor.len() {
        return Err(SizingError::InvalidInput(format!(
            "Load profile has {} hours but capacity factor profile has {}",
            load.len(),
            capacity_factor.len()
        )));
    }

    let horizon = load.len();
    if horizon < MIN_HORIZON {
        return Err(SizingError::InvalidInput(format!(
            "Horizon must be at least {MIN_HORIZON} hours (got {horizon})"
        )));
    }

    if let Some((hour, value)) = load
        .iter()
        .enumerate()
        .find(|(_, value)| !(value.is_finite() && value.value() >= 0.0))
    {
        return Err(SizingError::InvalidInput(format!(
            "Load must be a finite, non-negative number (hour {hour}: {value})"
        )));
    }

    if let Some((hour, value)) = capacity_factor
        .iter()
        .enumerate()
        .find(|(_, value)| !(0.0..=1.0).contains(&value.value()))
    {
        return Err(SizingError::InvalidInput(format!(
            "Capacity factor must be between 0 and 1 (hour {hour}: {value})"
        )));
    }

    Ok(horizon)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{capacity_factor, load};
    use rstest::rstest;

    #[test]
    fn test_check_profiles_ok() {
        let horizon =
            check_profiles(&load(&[1.0, 0.0, 3.0]), &capacity_factor(&[0.0, 0.5, 1.0])).unwrap();
        assert_eq!(horizon, 3);
    }

    #[test]
    fn test_check_profiles_length_mismatch() {
        let result = check_profiles(&load(&[1.0, 2.0, 3.0]), &capacity_factor(&[0.0, 0.5]));
        assert!(matches!(result, Err(SizingError::InvalidInput(_))));
    }

    #[rstest]
    #[case(&[])]
    #[case(&[1.0])]
    fn test_check_profiles_horizon_too_short(#[case] values: &[f64]) {
        let cf = vec![0.5; values.len()];
        let result = check_profiles(&load(values), &capacity_factor(&cf));
        assert!(matches!(result, Err(SizingError::InvalidInput(_))));
    }

    #[rstest]
    #[case(-1.0)]
    #[case(f64::NAN)]
    #[case(f64::INFINITY)]
    fn test_check_profiles_bad_load(#[case] value: f64) {
        let result = check_profiles(&load(&[1.0, value]), &capacity_factor(&[0.1, 0.2]));
        assert!(matches!(result, Err(SizingError::InvalidInput(_))));
    }

    #[rstest]
    #[case(-0.1)]
    #[case(1.1)]
    #[case(f64::NAN)]
    fn test_check_profiles_bad_capacity_factor(#[case] value: f64) {
        let result = check_profiles(&load(&[1.0, 1.0]), &capacity_factor(&[0.1, value]));
        assert!(matches!(result, Err(SizingError::InvalidInput(_))));
    }

    #[test]
    fn test_time_series_access() {
        let series = load(&[4.0, 5.0]);
        assert_eq!(series.len(), 2);
        assert_eq!(series[1], Energy(5.0));
        assert_eq!(series.get(2), None);
        assert_eq!(series.iter().copied().sum::<Energy>(), Energy(9.0));
    }
}
