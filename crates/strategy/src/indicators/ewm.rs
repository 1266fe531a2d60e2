/// Exponentially weighted mean over a series.
///
/// Two weighting schemes:
/// - `adjust = false`: the recursive form `y[t] = (1 - α) * y[t-1] + α * x[t]`,
///   seeded with the first observation. Used for EMA / MACD.
/// - `adjust = true`: the bias-corrected form where every observation keeps
///   its own weight `(1 - α)^age` and the result is the weighted average.
///   Used for the KDJ and RSI smoothings.
///
/// NaN inputs are skipped, but still age the weights of earlier
/// observations. Outputs stay NaN until `min_periods` real observations
/// have been seen (at least one).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ewm {
    alpha: f64,
    adjust: bool,
    min_periods: usize,
}

impl Ewm {
    /// Decay expressed as a span: `α = 2 / (span + 1)`, unadjusted.
    pub fn span(span: usize) -> Self {
        Self {
            alpha: 2.0 / (span as f64 + 1.0),
            adjust: false,
            min_periods: 0,
        }
    }

    /// Decay expressed as a centre of mass: `α = 1 / (1 + com)`, adjusted.
    pub fn com(com: f64) -> Self {
        Self {
            alpha: 1.0 / (1.0 + com),
            adjust: true,
            min_periods: 0,
        }
    }

    pub fn min_periods(mut self, min_periods: usize) -> Self {
        self.min_periods = min_periods;
        self
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn apply(&self, values: &[f64]) -> Vec<f64> {
        let mut out = Vec::with_capacity(values.len());
        let Some(&first) = values.first() else {
            return out;
        };

        let min_periods = self.min_periods.max(1);
        let decay = 1.0 - self.alpha;
        let new_weight = if self.adjust { 1.0 } else { self.alpha };

        let mut weighted = first;
        let mut nobs = usize::from(!first.is_nan());
        let mut old_weight = 1.0;
        out.push(if nobs >= min_periods { weighted } else { f64::NAN });

        for &x in &values[1..] {
            let is_observation = !x.is_nan();
            nobs += usize::from(is_observation);

            if !weighted.is_nan() {
                old_weight *= decay;
                if is_observation {
                    if weighted != x {
                        weighted = (old_weight * weighted + new_weight * x) / (old_weight + new_weight);
                    }
                    old_weight = if self.adjust {
                        old_weight + new_weight
                    } else {
                        1.0
                    };
                }
            } else if is_observation {
                weighted = x;
            }

            out.push(if nobs >= min_periods { weighted } else { f64::NAN });
        }
        out
    }
}
