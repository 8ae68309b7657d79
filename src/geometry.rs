//! Geometrische Hilfsfunktionen für die Palettenbelegung.
//!
//! Dieses Modul bietet Funktionen zur Prüfung, ob Fenster auf eine Palette passen
//! (mit und ohne Überstand), und zur Berechnung relativer Maßabweichungen.

use crate::types::EPSILON_MM;

/// Berechnet die relative Abweichung zweier Maße bezogen auf ihren Mittelwert.
///
/// # Parameter
/// * `a` - Erstes Maß
/// * `b` - Zweites Maß
///
/// # Rückgabewert
/// `|a - b| / ((a + b) / 2)`, oder `None` wenn der Mittelwert nicht positiv ist
///
/// # Beispiel
/// ```
/// use pallet_optimizer::geometry::relative_difference;
///
/// let diff = relative_difference(1000.0, 1050.0).unwrap();
/// assert!((diff - 50.0 / 1025.0).abs() < 1e-9);
/// ```
pub fn relative_difference(a: f64, b: f64) -> Option<f64> {
    let avg = (a + b) / 2.0;
    if avg <= 0.0 {
        return None;
    }
    Some((a - b).abs() / avg)
}

/// Prüft, ob zwei Maße innerhalb der relativen Toleranz liegen.
///
/// Ein nicht positiver Mittelwert gilt als nicht ähnlich.
pub fn within_ratio(a: f64, b: f64, threshold: f64) -> bool {
    relative_difference(a, b).is_some_and(|diff| diff <= threshold)
}

/// Prüft, ob eine Breite auf eine Palettenlänge passt, optional mit Überstand.
///
/// # Parameter
/// * `width` - Breite des Fensters
/// * `pallet_length` - Länge der Palette
/// * `overhang` - Erlaubter Überstand (0.0 für keinen)
pub fn fits_length(width: f64, pallet_length: f64, overhang: f64) -> bool {
    width <= pallet_length + overhang + EPSILON_MM
}

/// Prüft, ob zusätzliche Tiefe noch in die Ladetiefe passt.
///
/// # Parameter
/// * `used` - Bereits belegte Tiefe
/// * `additional` - Neu hinzukommende Tiefe
/// * `max` - Maximale Ladetiefe
pub fn fits_depth(used: f64, additional: f64, max: f64) -> bool {
    used + additional <= max + EPSILON_MM
}

/// Verbleibende Ladetiefe nach dem Hinzufügen einer Tiefe.
pub fn remaining_depth(used: f64, additional: f64, max: f64) -> f64 {
    max - (used + additional)
}

/// Breite eines nebeneinander gestellten Fensterpaars inklusive Abstand.
pub fn side_by_side_width(a: f64, b: f64, gap: f64) -> f64 {
    a + b + gap
}

/// Auslastung in Prozent.
///
/// Liefert 0.0 bei nicht positiver Maximaltiefe.
pub fn utilization_percent(used: f64, max: f64) -> f64 {
    if max <= 0.0 {
        return 0.0;
    }
    (used / max) * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_difference_uses_mean() {
        let diff = relative_difference(1500.0, 2000.0).unwrap();
        assert!((diff - 500.0 / 1750.0).abs() < 1e-12);
        assert!(relative_difference(0.0, 0.0).is_none());
    }

    #[test]
    fn within_ratio_is_inclusive() {
        // 15% vom Mittelwert 1000 sind genau 150
        assert!(within_ratio(925.0, 1075.0, 0.15));
        assert!(!within_ratio(1500.0, 2000.0, 0.15));
    }

    #[test]
    fn fits_length_respects_overhang() {
        assert!(fits_length(2500.0, 2500.0, 0.0));
        assert!(!fits_length(2501.0, 2500.0, 0.0));
        assert!(fits_length(3200.0, 2500.0, 700.0));
        assert!(!fits_length(3201.0, 2500.0, 700.0));
    }

    #[test]
    fn depth_helpers() {
        assert!(fits_depth(1100.0, 100.0, 1200.0));
        assert!(!fits_depth(1150.0, 100.0, 1200.0));
        assert!((remaining_depth(600.0, 100.0, 1200.0) - 500.0).abs() < EPSILON_MM);
        assert!((utilization_percent(600.0, 1200.0) - 50.0).abs() < EPSILON_MM);
        assert_eq!(utilization_percent(10.0, 0.0), 0.0);
    }
}
