//! Encouragement cues shown (and optionally played) after each answer.

use rand::{seq::SliceRandom, Rng};

/// Message plus the audio asset a front-end may play with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedbackCue {
    /// Text shown to the player.
    pub message: &'static str,
    /// Audio asset file name.
    pub audio: &'static str,
}

const fn cue(audio: &'static str, message: &'static str) -> FeedbackCue {
    FeedbackCue { message, audio }
}

/// Cues for a correct answer.
pub const CORRECT_CUES: &[FeedbackCue] = &[
    cue("amazing.mp3", "Amazing!"),
    cue("cool.mp3", "Cool!"),
    cue("excellent.mp3", "Excellent!"),
    cue("ibelieveinyou.mp3", "I believe in you!"),
    cue("waytogo.mp3", "Way to go!"),
    cue("younailedit.mp3", "You nailed it!"),
];

/// Cues for a wrong answer or timeout.
pub const WRONG_CUES: &[FeedbackCue] = &[
    cue("checkagain.mp3", "Check again!"),
    cue("dontgiveup.mp3", "Don't give up!"),
    cue("iamsorry.mp3", "I'm sorry!"),
    cue("maybenexttime.mp3", "Maybe next time!"),
    cue("nicetry.mp3", "Nice try!"),
    cue("ooops.mp3", "Oops!"),
    cue("oops-try-again.mp3", "Oops, try again!"),
    cue("tryagain.mp3", "Try again!"),
];

/// Played when a new profile is created.
pub const WELCOME_AUDIO: &str = "welcome.mp3";
/// Played when an existing profile logs in.
pub const WELCOME_BACK_AUDIO: &str = "welcomeback.mp3";

/// Pick a random cue from the group matching the answer.
pub fn pick<R: Rng + ?Sized>(rng: &mut R, correct: bool) -> FeedbackCue {
    let group = if correct { CORRECT_CUES } else { WRONG_CUES };
    // both groups are non-empty constants
    group.choose(rng).copied().unwrap_or(group[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn pick_draws_from_matching_group() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..50 {
            assert!(CORRECT_CUES.contains(&pick(&mut rng, true)));
            assert!(WRONG_CUES.contains(&pick(&mut rng, false)));
        }
    }
}
