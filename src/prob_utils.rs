/// Convert a log-odds margin to a probability
///
/// Each branch is arranged so that exp() is only evaluated on non-positive input.
///
pub fn logistic(x: f64) -> f64 {
    if x >= 0. {
        1. / (1. + (-x).exp())
    } else {
        let e = x.exp();
        e / (1. + e)
    }
}

/// Convert a probability to a log-odds margin
pub fn logit(p: f64) -> f64 {
    (p / (1. - p)).ln()
}
