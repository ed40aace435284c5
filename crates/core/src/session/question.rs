use rand::{seq::SliceRandom, Rng};

/// Answer buttons shown per question.
pub const OPTION_COUNT: usize = 4;
/// Largest multiplier asked for any table.
pub const MAX_MULTIPLIER: u32 = 10;
/// Distractors are drawn from `answer ± DISTRACTOR_SPREAD`.
pub const DISTRACTOR_SPREAD: i64 = 10;

/// A generated multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub table: u32,
    pub multiplier: u32,
    /// Product computed once at generation time.
    pub answer: u32,
    /// Shuffled, distinct, positive options; one of them is `answer`.
    pub options: [u32; OPTION_COUNT],
}

impl Question {
    /// Roll a question for `table`.
    pub fn generate<R: Rng + ?Sized>(table: u32, rng: &mut R) -> Self {
        let multiplier = rng.gen_range(1..=MAX_MULTIPLIER);
        let answer = table * multiplier;

        let mut options = Vec::with_capacity(OPTION_COUNT);
        options.push(answer);
        while options.len() < OPTION_COUNT {
            let offset = rng.gen_range(-DISTRACTOR_SPREAD..=DISTRACTOR_SPREAD);
            if offset == 0 {
                continue;
            }
            let candidate = (i64::from(answer) + offset).max(1) as u32;
            if !options.contains(&candidate) {
                options.push(candidate);
            }
        }
        options.shuffle(rng);

        let mut shuffled = [0; OPTION_COUNT];
        shuffled.copy_from_slice(&options);
        Self {
            table,
            multiplier,
            answer,
            options: shuffled,
        }
    }

    /// Display form, also stored in history.
    pub fn text(&self) -> String {
        format!("{} x {} = ?", self.table, self.multiplier)
    }

    pub fn is_correct(&self, value: u32) -> bool {
        value == self.answer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn options_are_four_distinct_positive_values_with_answer() {
        let mut rng = StdRng::seed_from_u64(7);
        for table in 1..=12 {
            for _ in 0..200 {
                let question = Question::generate(table, &mut rng);
                assert_eq!(question.answer, table * question.multiplier);
                assert!((1..=MAX_MULTIPLIER).contains(&question.multiplier));
                assert!(question.options.contains(&question.answer));
                assert!(question.options.iter().all(|value| *value >= 1));
                let mut sorted = question.options.to_vec();
                sorted.sort_unstable();
                sorted.dedup();
                assert_eq!(sorted.len(), OPTION_COUNT, "{question:?}");
            }
        }
    }

    #[test]
    fn distractors_stay_near_the_answer() {
        let mut rng = StdRng::seed_from_u64(99);
        for _ in 0..200 {
            let question = Question::generate(9, &mut rng);
            for value in question.options {
                let distance = (i64::from(value) - i64::from(question.answer)).abs();
                assert!(distance <= DISTRACTOR_SPREAD);
            }
        }
    }

    #[test]
    fn text_names_both_operands() {
        let question = Question {
            table: 3,
            multiplier: 7,
            answer: 21,
            options: [21, 18, 24, 20],
        };
        assert_eq!(question.text(), "3 x 7 = ?");
        assert!(question.is_correct(21));
        assert!(!question.is_correct(20));
    }
}
