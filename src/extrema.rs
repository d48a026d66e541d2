//! # Lower-Low / Higher-High Detection
//!
//! NOAA hilo data reports every high and every low tide. On a mixed
//! semidiurnal coast the two lows of a lunar day differ, and the reports only
//! care about the lower one. This module isolates those points as strict local
//! extrema among consecutive observations of the same kind.
//!
//! ## Adjacency
//! Neighbours are taken from the same-kind subsequence: a low tide is compared
//! with the previous and next *low* tides, ignoring the highs in between.
//!
//! ## Boundary Padding
//! The first and last candidates have only one real neighbour. Instead of
//! dropping them, the sequence is padded with its second element in front and
//! its second-to-last element behind:
//!
//! ```text
//! candidates: c0  c1  c2 ... c(n-2)  c(n-1)
//! padded:  c1 c0  c1  c2 ... c(n-2)  c(n-1) c(n-2)
//! ```
//!
//! so `c0` is kept iff it is strictly beyond `c1`, and `c(n-1)` iff it is
//! strictly beyond `c(n-2)`. Ties never qualify; a plateau is dropped entirely.

use crate::{ObservationSeries, TideKind, TideObservation};

/// Keep the strict local extrema of `kind` within `series`.
///
/// Sequences of zero or one candidate are returned unchanged.
///
/// # Example
/// ```
/// use chrono::NaiveDate;
/// use tidal_variance_lib::extrema::detect_extrema;
/// use tidal_variance_lib::{ObservationSeries, TideKind, TideObservation};
///
/// let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
/// let lows = [1.2, 2.0, 0.8, 1.5, 1.1]
///     .iter()
///     .enumerate()
///     .map(|(i, v)| {
///         let ts = day.and_hms_opt(i as u32 * 4, 0, 0).unwrap();
///         TideObservation::new(ts, *v, Some(TideKind::Low))
///     })
///     .collect::<ObservationSeries>();
///
/// let lower_lows = detect_extrema(&lows, TideKind::Low);
/// assert_eq!(lower_lows.values(), vec![1.2, 0.8, 1.1]);
/// ```
pub fn detect_extrema(series: &ObservationSeries, kind: TideKind) -> ObservationSeries {
    let candidates = series.filter(|obs| obs.kind == Some(kind));
    let c = candidates.as_slice();
    let n = c.len();
    if n <= 1 {
        return candidates;
    }

    let kept: Vec<TideObservation> = (0..n)
        .filter(|&i| {
            let left = if i == 0 { c[1].value } else { c[i - 1].value };
            let right = if i == n - 1 { c[n - 2].value } else { c[i + 1].value };
            is_extremum(kind, c[i].value, left, right)
        })
        .map(|i| c[i].clone())
        .collect();

    ObservationSeries::new(kept)
}

/// Lower-low tides: local minima among consecutive low tides.
pub fn identify_low_tides(series: &ObservationSeries) -> ObservationSeries {
    detect_extrema(series, TideKind::Low)
}

/// Higher-high tides: local maxima among consecutive high tides.
pub fn identify_high_tides(series: &ObservationSeries) -> ObservationSeries {
    detect_extrema(series, TideKind::High)
}

fn is_extremum(kind: TideKind, value: f64, left: f64, right: f64) -> bool {
    match kind {
        TideKind::Low => value < left && value < right,
        TideKind::High => value > left && value > right,
    }
}
