//! Answer scoring for multiple-choice questions.

use std::collections::BTreeSet;

/// Result of scoring a single submitted answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreOutcome {
    /// Whether the selection matches the correct options exactly.
    pub is_correct: bool,
    /// Points awarded (zero when incorrect).
    pub points: u32,
}

impl ScoreOutcome {
    const INCORRECT: Self = Self {
        is_correct: false,
        points: 0,
    };
}

/// Score a selection against the correct option set.
///
/// A correct answer always earns half of `max_points`; the other half scales
/// linearly with the time left, so answering instantly earns everything and
/// answering at (or after) the limit earns exactly half. Multi-select answers
/// must match the correct set exactly, there is no partial credit.
pub fn score(
    selected: &BTreeSet<usize>,
    correct: &BTreeSet<usize>,
    max_points: u32,
    time_limit_secs: u32,
    response_time_secs: f64,
) -> ScoreOutcome {
    if selected != correct {
        return ScoreOutcome::INCORRECT;
    }

    let speed = if time_limit_secs == 0 {
        0.0
    } else {
        let limit = f64::from(time_limit_secs);
        ((limit - response_time_secs) / limit).max(0.0)
    };
    let points = (f64::from(max_points) * (0.5 + 0.5 * speed)).round() as u32;

    ScoreOutcome {
        is_correct: true,
        points,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(values: &[usize]) -> BTreeSet<usize> {
        values.iter().copied().collect()
    }

    #[test]
    fn instant_correct_answer_earns_full_points() {
        let outcome = score(&set(&[1]), &set(&[1]), 100, 30, 0.0);
        assert_eq!(
            outcome,
            ScoreOutcome {
                is_correct: true,
                points: 100
            }
        );
    }

    #[test]
    fn answer_at_the_limit_earns_half() {
        let outcome = score(&set(&[1]), &set(&[1]), 100, 30, 30.0);
        assert!(outcome.is_correct);
        assert_eq!(outcome.points, 50);
    }

    #[test]
    fn partial_multi_select_is_incorrect() {
        let outcome = score(&set(&[1]), &set(&[1, 2]), 100, 30, 5.0);
        assert_eq!(outcome, ScoreOutcome::INCORRECT);
    }

    #[test]
    fn selection_order_is_irrelevant() {
        let outcome = score(&set(&[1, 2]), &set(&[2, 1]), 100, 30, 0.0);
        assert!(outcome.is_correct);
        assert_eq!(outcome.points, 100);
    }

    #[test]
    fn speed_bonus_scales_linearly() {
        assert_eq!(score(&set(&[0]), &set(&[0]), 100, 10, 2.0).points, 90);
        assert_eq!(score(&set(&[0]), &set(&[0]), 100, 10, 5.0).points, 75);
    }

    #[test]
    fn late_answer_is_floored_at_half() {
        assert_eq!(score(&set(&[0]), &set(&[0]), 100, 10, 25.0).points, 50);
    }

    #[test]
    fn zero_time_limit_does_not_divide_by_zero() {
        assert_eq!(score(&set(&[0]), &set(&[0]), 100, 0, 0.0).points, 50);
    }

    #[test]
    fn empty_selection_never_matches_a_non_empty_key() {
        assert!(!score(&set(&[]), &set(&[3]), 100, 10, 0.0).is_correct);
    }
}
