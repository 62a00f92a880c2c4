//! Turns the analysis of one move into commentary for one reader.
//!
//! Each concern (the move itself, the opening, move quality, mates, the game
//! ending) is its own composed grammar and yields at most one sentence. A
//! grammar that fails to compose or derives nothing is logged and skipped.

use rand::Rng;
use shakmaty::Color;
use tracing::warn;

use analysis::{AnalysisResult, MoveQuality, Outcome};
use chess_core::board::piece_name;

use crate::fragments::{self, Capture, Voice};
use crate::grammar::{n, Fragment, Grammar};

#[derive(Debug, Clone, Copy)]
pub struct Names<'a> {
    pub white: &'a str,
    pub black: &'a str,
}

impl<'a> Names<'a> {
    pub fn of(&self, color: Color) -> &'a str {
        match color {
            Color::White => self.white,
            Color::Black => self.black,
        }
    }
}

/// What happened on one ply, already analysed.
#[derive(Debug, Clone, Copy)]
pub struct MoveFacts<'a> {
    pub mover: Color,
    pub san: &'a str,
    /// Destination square of the move
    pub square: &'a str,
    /// SAN of the ply before, absent on the first move
    pub previous_san: Option<&'a str>,
    /// Plies played including this one
    pub ply: usize,
    /// Display name of the opening reached, if it is in the book
    pub opening: Option<&'a str>,
    pub analysis: &'a AnalysisResult,
}

#[derive(Debug, Clone, Default)]
pub struct Narrator;

impl Narrator {
    pub fn new() -> Self {
        Self
    }

    /// Commentary on `facts` addressed to the player of `reader`.
    pub fn describe<R: Rng + ?Sized>(
        &self,
        facts: &MoveFacts,
        reader: Color,
        names: &Names,
        rng: &mut R,
    ) -> String {
        let mover = Voice::new(facts.mover, names.of(facts.mover), reader);
        let other = Voice::new(!facts.mover, names.of(!facts.mover), reader);
        let result = facts.analysis;
        let move_count = facts.ply.div_ceil(2);

        let mut text = Vec::new();
        text.extend(self.describe_move(facts, &mover, &other, rng));

        if let Some(name) = facts.opening {
            text.extend(self.sentence(&["OPENING"], vec![fragments::opening(name)], rng));
        }

        text.extend(self.describe_quality(facts, reader, &mover, &other, rng));

        if let Some(mate) = result.mate.filter(|m| m.plies_to_mate > 0) {
            let mater = Voice::new(mate.side, names.of(mate.side), reader);
            let victim = Voice::new(!mate.side, names.of(!mate.side), reader);
            text.extend(self.sentence(
                &["MATING"],
                vec![
                    fragments::parties(&mater, &victim),
                    fragments::checkmating(&mater, mate.plies_to_mate),
                ],
                rng,
            ));
        }

        match result.outcome {
            Some(Outcome::Stalemate) => {
                text.extend(self.sentence(&["STALEMATE"], vec![fragments::stalemate(move_count)], rng));
            }
            Some(Outcome::Draw) => {
                text.extend(self.sentence(&["DRAW"], vec![fragments::draw(move_count)], rng));
            }
            Some(decisive) => {
                let winner = decisive.winner().unwrap_or(facts.mover);
                let winner_voice = Voice::new(winner, names.of(winner), reader);
                let loser_voice = Voice::new(!winner, names.of(!winner), reader);
                text.extend(self.sentence(
                    &["CHECKMATED", "WIN"],
                    vec![
                        fragments::parties(&winner_voice, &loser_voice),
                        fragments::checkmated(),
                        fragments::win(&winner_voice, move_count),
                    ],
                    rng,
                ));
            }
            None => {}
        }

        text.join(" ")
    }

    fn describe_move<R: Rng + ?Sized>(
        &self,
        facts: &MoveFacts,
        mover: &Voice,
        other: &Voice,
        rng: &mut R,
    ) -> Option<String> {
        let result = facts.analysis;
        let mut parts = vec![fragments::parties(mover, other)];
        let mut sequence = Vec::new();

        match facts.previous_san {
            None => {
                parts.push(fragments::first_move(mover, facts.san));
                sequence.push("OPEN");
            }
            Some(previous) => {
                let capture = result.capture.map(|role| Capture {
                    piece: piece_name(role),
                    square: facts.square,
                });
                parts.push(fragments::move_made(mover, facts.san, Some(previous), capture));
                sequence.push("MOVE");
            }
        }

        let mated = result.outcome.is_some_and(|o| o.winner().is_some());
        if result.is_check && !mated {
            parts.push(fragments::check());
            sequence.push("CHECK");
        }

        self.sentence(&sequence, parts, rng)
    }

    fn describe_quality<R: Rng + ?Sized>(
        &self,
        facts: &MoveFacts,
        reader: Color,
        mover: &Voice,
        other: &Voice,
        rng: &mut R,
    ) -> Option<String> {
        let result = facts.analysis;
        let mut parts = vec![fragments::parties(mover, other)];
        let mut sequence = Vec::new();

        match result.quality? {
            MoveQuality::Blunder { critical } => {
                let loss = result.delta.map(f64::abs).unwrap_or_default();
                parts.push(fragments::blunder(mover, facts.san, loss, critical));
                sequence.push("BLUNDER");
                if reader == facts.mover && !result.suggestions.is_empty() {
                    parts.push(fragments::suggestions(&result.suggestions));
                    sequence.push("SUGGEST");
                }
            }
            MoveQuality::Good => {
                parts.push(fragments::good_move(facts.san));
                sequence.push("GOOD");
            }
            MoveQuality::Fantastic { engine_line } => {
                parts.push(fragments::fantastic_move(facts.san));
                sequence.push("FANTASTIC");
                if engine_line {
                    sequence.push("ENGINE_LINE");
                }
            }
        }

        self.sentence(&sequence, parts, rng)
    }

    /// Sample one sentence whose parts follow `sequence`.
    fn sentence<R: Rng + ?Sized>(
        &self,
        sequence: &[&str],
        mut parts: Vec<Fragment>,
        rng: &mut R,
    ) -> Option<String> {
        parts.push(Fragment::new().alt("S", sequence.iter().map(|s| n(*s))));
        match Grammar::compose("S", &parts) {
            Ok(grammar) => {
                let sentence = grammar.sample(rng);
                if sentence.is_none() {
                    warn!(?sequence, "Grammar derived no sentences");
                }
                sentence
            }
            Err(e) => {
                warn!(?sequence, error = %e, "Failed to compose grammar");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis::MateResult;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use shakmaty::Role;

    const NAMES: Names<'static> = Names {
        white: "Ada",
        black: "Grace",
    };

    fn facts<'a>(result: &'a AnalysisResult, previous: Option<&'a str>) -> MoveFacts<'a> {
        MoveFacts {
            mover: Color::White,
            san: "Bxf7+",
            square: "f7",
            previous_san: previous,
            ply: 7,
            opening: None,
            analysis: result,
        }
    }

    #[test]
    fn test_capture_and_check_always_narrated() {
        let result = AnalysisResult {
            capture: Some(Role::Pawn),
            is_check: true,
            ..AnalysisResult::default()
        };
        let narrator = Narrator::new();
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let text = narrator.describe(&facts(&result, Some("Nc6")), Color::White, &NAMES, &mut rng);
            assert!(text.starts_with("You"), "{text}");
            assert!(text.contains("Bxf7+."), "{text}");
            assert!(text.contains("check") || text.contains("Check"), "{text}");
        }
    }

    #[test]
    fn test_opponent_reads_third_person() {
        let result = AnalysisResult::default();
        let mut rng = StdRng::seed_from_u64(3);
        let text = Narrator::new().describe(&facts(&result, Some("Nc6")), Color::Black, &NAMES, &mut rng);
        assert!(!text.starts_with("You"), "{text}");
        assert!(text.ends_with("with Bxf7+."), "{text}");
    }

    #[test]
    fn test_same_seed_same_text() {
        let result = AnalysisResult {
            quality: Some(MoveQuality::Good),
            ..AnalysisResult::default()
        };
        let narrator = Narrator::new();
        let f = facts(&result, None);
        let a = narrator.describe(&f, Color::White, &NAMES, &mut StdRng::seed_from_u64(11));
        let b = narrator.describe(&f, Color::White, &NAMES, &mut StdRng::seed_from_u64(11));
        assert_eq!(a, b);
        assert!(a.contains("move."));
    }

    #[test]
    fn test_suggestions_only_for_mover() {
        let result = AnalysisResult {
            quality: Some(MoveQuality::Blunder { critical: true }),
            delta: Some(-0.75),
            suggestions: vec!["Nf3".into()],
            ..AnalysisResult::default()
        };
        let narrator = Narrator::new();
        let f = facts(&result, Some("Nc6"));
        for seed in 0..10 {
            let mine = narrator.describe(&f, Color::White, &NAMES, &mut StdRng::seed_from_u64(seed));
            let theirs = narrator.describe(&f, Color::Black, &NAMES, &mut StdRng::seed_from_u64(seed));
            assert!(mine.contains("blunder") && mine.contains("Nf3"), "{mine}");
            assert!(theirs.contains("blunder") && !theirs.contains("Nf3"), "{theirs}");
        }
    }

    #[test]
    fn test_checkmate_ending() {
        let result = AnalysisResult {
            is_check: true,
            outcome: Some(Outcome::WhiteWins),
            mate: Some(MateResult {
                side: Color::White,
                plies_to_mate: 0,
            }),
            ..AnalysisResult::default()
        };
        let mut rng = StdRng::seed_from_u64(5);
        let text = Narrator::new().describe(&facts(&result, Some("Nc6")), Color::Black, &NAMES, &mut rng);
        assert!(text.contains("checkmated you."), "{text}");
        assert!(!text.contains("Check!"), "{text}");
    }

    #[test]
    fn test_mate_in_n_announced() {
        let result = AnalysisResult {
            mate: Some(MateResult {
                side: Color::Black,
                plies_to_mate: 2,
            }),
            ..AnalysisResult::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        let text = Narrator::new().describe(&facts(&result, Some("Nc6")), Color::Black, &NAMES, &mut rng);
        assert!(text.contains("in 2 moves."), "{text}");
    }

    #[test]
    fn test_broken_composition_is_empty() {
        let narrator = Narrator::new();
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(narrator.sentence(&["MISSING"], vec![], &mut rng), None);
    }
}
