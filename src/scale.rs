//! Linear scale ticks and tick labels, following the classic d3 (v3)
//! `scale.linear()` rules so label lengths match what a browser axis shows.

/// A linear scale over `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearScale {
    pub domain: (f64, f64),
}

impl LinearScale {
    pub fn new(min: f64, max: f64) -> Self {
        Self { domain: (min, max) }
    }

    /// Tick step for roughly `count` ticks, or `None` when the domain has no
    /// usable span.
    pub fn tick_step(&self, count: usize) -> Option<f64> {
        let (lo, hi) = self.extent();
        let span = hi - lo;
        let m = count as f64;
        if !(span > 0.0) || !span.is_finite() || m <= 0.0 {
            return None;
        }
        let mut step = 10f64.powf((span / m).log10().floor());
        let err = m / span * step;
        if err <= 0.15 {
            step *= 10.0;
        } else if err <= 0.35 {
            step *= 5.0;
        } else if err <= 0.75 {
            step *= 2.0;
        }
        Some(step)
    }

    pub fn ticks(&self, count: usize) -> Vec<f64> {
        let Some(step) = self.tick_step(count) else {
            return Vec::new();
        };
        let (lo, hi) = self.extent();
        let first = (lo / step).ceil() as i64;
        // tolerate a quotient landing just below an integer
        let last = (hi / step + 1e-9).floor() as i64;
        // Divide by the inverse step for sub-unit steps; multiplying by 0.1
        // accumulates representation error (0.30000000000000004).
        let inverse = (1.0 / step).round();
        (first..=last)
            .map(|i| {
                if step < 1.0 {
                    i as f64 / inverse
                } else {
                    i as f64 * step
                }
            })
            .collect()
    }

    /// Format every tick the way the axis would label it.
    pub fn tick_labels(&self, count: usize) -> Vec<String> {
        let Some(step) = self.tick_step(count) else {
            return Vec::new();
        };
        let precision = tick_precision(step);
        self.ticks(count)
            .into_iter()
            .map(|t| format_grouped(t, precision))
            .collect()
    }

    fn extent(&self) -> (f64, f64) {
        let (a, b) = self.domain;
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }
}

/// Decimal places needed to tell ticks `step` apart.
pub fn tick_precision(step: f64) -> usize {
    let p = -(step.log10() + 0.01).floor();
    if p > 0.0 {
        p as usize
    } else {
        0
    }
}

/// Fixed-point formatting with `,` as the thousands separator.
pub fn format_grouped(value: f64, precision: usize) -> String {
    let fixed = format!("{:.*}", precision, value.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (fixed.as_str(), None),
    };

    let mut grouped = String::with_capacity(fixed.len() + int_part.len() / 3);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if let Some(frac) = frac_part {
        grouped.push('.');
        grouped.push_str(frac);
    }

    let is_zero = fixed.chars().all(|c| c == '0' || c == '.');
    if value < 0.0 && !is_zero {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_ticks() {
        let scale = LinearScale::new(0.0, 5640.0);
        assert_eq!(scale.tick_step(5), Some(1000.0));
        assert_eq!(
            scale.ticks(5),
            vec![0.0, 1000.0, 2000.0, 3000.0, 4000.0, 5000.0]
        );
        assert_eq!(
            scale.tick_labels(5),
            vec!["0", "1,000", "2,000", "3,000", "4,000", "5,000"]
        );
    }

    #[test]
    fn test_fractional_ticks() {
        let scale = LinearScale::new(0.0, 0.00564);
        let step = scale.tick_step(5).unwrap();
        assert!((step - 0.001).abs() < 1e-12);
        let labels = scale.tick_labels(5);
        assert_eq!(labels.first().map(String::as_str), Some("0.000"));
        assert_eq!(labels.last().map(String::as_str), Some("0.005"));
        assert_eq!(labels.len(), 6);
    }

    #[test]
    fn test_step_rounding() {
        // span/5 = 2, err = 0.5 -> step doubles
        assert_eq!(LinearScale::new(0.0, 10.0).tick_step(5), Some(2.0));
        // span/5 = 4, err = 0.25 -> step times five
        assert_eq!(LinearScale::new(0.0, 20.0).tick_step(5), Some(5.0));
        assert_eq!(
            LinearScale::new(0.0, 0.4).ticks(5),
            vec![0.0, 0.1, 0.2, 0.3, 0.4]
        );
    }

    #[test]
    fn test_empty_domain_has_no_ticks() {
        let scale = LinearScale::new(0.0, 0.0);
        assert!(scale.ticks(5).is_empty());
        assert!(scale.tick_labels(5).is_empty());
    }

    #[test]
    fn test_format_grouped() {
        assert_eq!(format_grouped(1234567.0, 0), "1,234,567");
        assert_eq!(format_grouped(999.0, 0), "999");
        assert_eq!(format_grouped(1000.5, 1), "1,000.5");
        assert_eq!(format_grouped(-2500.0, 0), "-2,500");
        assert_eq!(format_grouped(0.0, 2), "0.00");
    }

    #[test]
    fn test_tick_precision() {
        assert_eq!(tick_precision(1000.0), 0);
        assert_eq!(tick_precision(1.0), 0);
        assert_eq!(tick_precision(0.5), 1);
        assert_eq!(tick_precision(0.05), 2);
        assert_eq!(tick_precision(0.001), 3);
    }
}
