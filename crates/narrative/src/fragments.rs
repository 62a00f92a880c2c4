//! Grammar fragments, one per narrated situation.
//!
//! Fragments address the two players through [`parties`], which defines the
//! shared symbols `MOVER`, `MOVER_OBJ`, `OTHER_OBJ`, `OTHER_POSS` and `HAVE`.
//! The player reading the commentary is the second person ("You capture"),
//! the opponent the third ("Ada captures").

use shakmaty::Color;

use chess_core::board::color_name;

use crate::grammar::{n, t, Fragment, Symbol};

#[derive(Debug, Clone, Copy)]
pub struct Voice<'a> {
    pub color: Color,
    pub name: &'a str,
    pub second_person: bool,
}

impl<'a> Voice<'a> {
    pub fn new(color: Color, name: &'a str, reader: Color) -> Self {
        Self {
            color,
            name,
            second_person: color == reader,
        }
    }

    fn subjects(&self) -> Vec<String> {
        if self.second_person {
            return vec!["You".into()];
        }
        vec![
            self.name.to_string(),
            "Your opponent".into(),
            capitalize(color_name(self.color)),
        ]
    }

    fn objects(&self) -> Vec<String> {
        if self.second_person {
            return vec!["you".into()];
        }
        vec![
            self.name.to_string(),
            "your opponent".into(),
            color_name(self.color).to_string(),
        ]
    }

    fn possessives(&self) -> Vec<String> {
        if self.second_person {
            return vec!["your".into()];
        }
        vec![
            "their".into(),
            format!("{}'s", self.name),
            format!("{}'s", color_name(self.color)),
        ]
    }

    fn pick<T>(&self, second: T, third: T) -> T {
        if self.second_person {
            second
        } else {
            third
        }
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn moves_phrase(count: usize) -> String {
    if count == 1 {
        "in 1 move".into()
    } else {
        format!("in {count} moves")
    }
}

fn end() -> Symbol {
    t(".")
}

/// `mover` acts on `other`.
pub fn parties(mover: &Voice, other: &Voice) -> Fragment {
    Fragment::new()
        .words("MOVER", mover.subjects())
        .words("MOVER_OBJ", mover.objects())
        .words("OTHER_OBJ", other.objects())
        .words("OTHER_POSS", other.possessives())
        .words("HAVE", [mover.pick("have", "has")])
}

/// First move of the game. Start symbol `OPEN`.
pub fn first_move(mover: &Voice, san: &str) -> Fragment {
    let verbs: &[&str] = mover.pick::<&[&str]>(
        &["open", "begin", "start off"],
        &["opens", "begins", "starts off"],
    );
    Fragment::new()
        .alt("OPEN", [n("MOVER"), n("OPEN_VERB"), t("with"), t(san), end()])
        .words("OPEN_VERB", verbs)
}

/// A captured piece and the square it stood on.
#[derive(Debug, Clone, Copy)]
pub struct Capture<'a> {
    pub piece: &'a str,
    pub square: &'a str,
}

/// Any later move, optionally answering `previous` and taking a piece.
/// Start symbol `MOVE`.
pub fn move_made(
    mover: &Voice,
    san: &str,
    previous: Option<&str>,
    capture: Option<Capture>,
) -> Fragment {
    let replies: &[&str] = mover.pick::<&[&str]>(
        &["respond", "counter"],
        &["responds", "counters", "answers", "comes back"],
    );
    let mut fragment = Fragment::new()
        .alt("MOVE", [n("MOVER"), n("MOVE_VERB"), t("with"), t(san), end()])
        .words("REPLY", replies);

    if let Some(prev) = previous {
        fragment = fragment
            .alt("MOVE_VERB", [t(mover.pick("respond to", "responds to")), t(prev)])
            .alt("MOVE_VERB", [t(mover.pick("counter", "counters")), t(prev)]);
    }

    match capture {
        Some(Capture { piece, square }) => {
            let takes: &[&str] = mover.pick::<&[&str]>(
                &["capture", "take", "attack"],
                &["captures", "takes", "attacks"],
            );
            fragment
                .alt("MOVE_VERB", [n("REPLY"), t("by"), n("TAKING"), n("OTHER_POSS"), n("VICTIM")])
                .alt("MOVE_VERB", [n("TAKE"), n("OTHER_POSS"), n("VICTIM")])
                .words("TAKING", ["capturing", "taking", "attacking"])
                .words("TAKE", takes)
                .words("VICTIM", [piece.to_string(), format!("{piece} on {square}")])
        }
        None => fragment.alt("MOVE_VERB", [n("REPLY")]),
    }
}

/// Start symbol `CHECK`.
pub fn check() -> Fragment {
    Fragment::new()
        .words("CHECK", ["Check!"])
        .alt("CHECK", [n("MOVER"), n("HAVE"), t("put"), n("OTHER_OBJ"), t("in check"), end()])
        .alt("CHECK", [t("That is check"), end()])
}

/// Start symbol `OPENING`.
pub fn opening(name: &str) -> Fragment {
    Fragment::new()
        .alt("OPENING", [n("OPENING_INTRO"), t(format!("the {name}")), end()])
        .words("OPENING_INTRO", ["This is", "The game has entered", "We are now in"])
}

/// Start symbol `BLUNDER`. `loss` is the size of the score drop.
pub fn blunder(mover: &Voice, san: &str, loss: f64, critical: bool) -> Fragment {
    let lost: &[&str] = mover.pick::<&[&str]>(
        &["have lost", "are down", "have dropped", "have cost yourself"],
        &["has lost", "is down", "has dropped", "has given away"],
    );
    let advantage = format!("a {loss:.2} point advantage");

    let fragment = Fragment::new()
        .alt(
            "BLUNDER",
            [n("BL_THIS"), n("BL_IS"), t("a"), n("BL_ADJ"), t("blunder"), end(), n("MOVER"), n("BL_LOST"), t(&advantage), end()],
        )
        .alt(
            "BLUNDER",
            [n("MOVER"), n("HAVE"), t("blundered"), end(), n("BL_THIS"), n("BL_IS"), t("a"), n("BL_ADJ"), t("blunder"), end()],
        )
        .alt("BLUNDER", [n("BL_THIS"), n("BL_IS"), t("a"), n("BL_ADJ"), t("blunder"), end()])
        .words("BL_THIS", ["This move", san, "This"])
        .words("BL_LOST", lost);

    if critical {
        fragment
            .alt("BL_IS", [t("is"), n("BL_SURE")])
            .words("BL_SURE", ["definitely", "certainly", "without doubt", "absolutely", "undeniably"])
            .words("BL_ADJ", ["critical", "huge"])
    } else {
        fragment
            .alt("BL_IS", [n("BL_MAY"), t("be"), n("BL_SEEN")])
            .words("BL_MAY", ["could", "may", "might"])
            .words("BL_SEEN", ["considered", "thought of as"])
            .words("BL_ADJ", ["fair", "considerable"])
    }
}

/// Better moves after a blunder, already in SAN. Start symbol `SUGGEST`.
pub fn suggestions(moves: &[String]) -> Fragment {
    let list = match moves {
        [a] => a.clone(),
        [a, b] => format!("{a} or {b}"),
        [a, b, c, ..] => format!("{a}, {b} or {c}"),
        [] => String::new(),
    };
    let fragment = Fragment::new()
        .alt("SUGGEST", [n("MOVER"), t("could have played"), t(&list), t("instead"), end()]);

    if moves.len() == 1 {
        fragment
            .alt("SUGGEST", [t("A better move was"), t(&list), end()])
            .alt("SUGGEST", [t(&list), t("would have been stronger"), end()])
    } else {
        fragment.alt("SUGGEST", [t("Better options were"), t(&list), end()])
    }
}

/// Start symbol `GOOD`.
pub fn good_move(san: &str) -> Fragment {
    Fragment::new()
        .alt("GOOD", [n("MOVER"), n("HAVE"), t("played a"), n("GOOD_ADJ"), t("move"), end()])
        .alt("GOOD", [t(san), t("is a"), n("GOOD_ADJ"), t("move"), end()])
        .words("GOOD_ADJ", ["good", "solid", "strong"])
}

/// Start symbol `FANTASTIC`, plus `ENGINE_LINE` for moves the engine would play.
pub fn fantastic_move(san: &str) -> Fragment {
    Fragment::new()
        .alt("FANTASTIC", [t(san), t("is a"), n("FAN_ADJ"), t("move"), t("!")])
        .alt("FANTASTIC", [n("MOVER"), n("HAVE"), t("found a"), n("FAN_ADJ"), t("move"), t("!")])
        .words("FAN_ADJ", ["fantastic", "brilliant", "superb"])
        .words(
            "ENGINE_LINE",
            [
                "That is exactly what the engine would have played.",
                "The engine agrees.",
                "The engine had that move in mind.",
            ],
        )
}

/// A forced mate `plies` away, with `mater` in the mover slot.
/// Start symbol `MATING`.
pub fn checkmating(mater: &Voice, plies: u32) -> Fragment {
    let within = moves_phrase(plies as usize);
    if mater.second_person {
        Fragment::new()
            .alt("MATING", [t("There is a checkmate available"), t(&within), end()])
            .alt("MATING", [t("There is a checkmate on"), n("OTHER_OBJ"), t("available"), t(&within), end()])
            .alt("MATING", [n("MOVER"), t("can checkmate"), n("OTHER_OBJ"), t(&within), end()])
    } else {
        Fragment::new()
            .alt("MATING", [n("MOVER"), t("is"), n("MATE_TRY"), t("to checkmate"), n("OTHER_OBJ"), t(&within), end()])
            .alt("MATING", [n("MOVER"), t("is"), n("MATE_SETUP"), t("a mate"), t(&within), end()])
            .alt("MATING", [n("MOVER"), n("MATE_THINK"), t("they can checkmate"), n("OTHER_OBJ"), t(&within), end()])
            .words("MATE_TRY", ["trying", "attempting"])
            .words("MATE_SETUP", ["setting up", "steering towards", "building"])
            .words("MATE_THINK", ["thinks", "believes", "predicts"])
    }
}

/// Delivered mate, with the winner in the mover slot. Start symbol `CHECKMATED`.
pub fn checkmated() -> Fragment {
    Fragment::new().alt("CHECKMATED", [n("MOVER"), n("HAVE"), t("checkmated"), n("OTHER_OBJ"), end()])
}

/// Winner in the mover slot. Start symbol `WIN`.
pub fn win(winner: &Voice, move_count: usize) -> Fragment {
    Fragment::new()
        .alt("WIN", [n("MOVER"), n("WIN_VERB"), end()])
        .alt("WIN", [n("MOVER"), n("WIN_VERB"), t(moves_phrase(move_count)), end()])
        .alt("WIN_VERB", [t(winner.pick("have won", "has won"))])
        .alt("WIN_VERB", [t(winner.pick("have beaten", "has beaten")), n("OTHER_OBJ")])
}

/// Start symbol `STALEMATE`.
pub fn stalemate(move_count: usize) -> Fragment {
    Fragment::new()
        .alt("STALEMATE", [n("STALE_INTRO"), t(moves_phrase(move_count)), end()])
        .words("STALE_INTRO", ["Stalemate", "The game has reached a stalemate"])
}

/// Draw by insufficient material or the fifty-move rule. Start symbol `DRAW`.
pub fn draw(move_count: usize) -> Fragment {
    let after = format!("after {move_count} moves");
    Fragment::new()
        .alt("DRAW", [t("The game ends in a draw"), t(&after), end()])
        .alt("DRAW", [t("It is a draw"), t(&after), end()])
        .alt("DRAW", [t("Neither side can win. The game is drawn"), t(&after), end()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Grammar;

    fn sentences(start: &str, fragments: Vec<Fragment>) -> Vec<String> {
        Grammar::compose(start, &fragments).unwrap().sentences()
    }

    #[test]
    fn test_voice_person() {
        let you = Voice::new(Color::White, "Ada", Color::White);
        let them = Voice::new(Color::Black, "Grace", Color::White);
        assert_eq!(you.subjects(), vec!["You"]);
        assert_eq!(them.subjects(), vec!["Grace", "Your opponent", "Black"]);
        assert_eq!(them.possessives()[1], "Grace's");
    }

    #[test]
    fn test_first_move_uses_person() {
        let you = Voice::new(Color::White, "Ada", Color::White);
        let them = Voice::new(Color::Black, "Grace", Color::White);
        let all = sentences("OPEN", vec![parties(&you, &them), first_move(&you, "e4")]);
        assert!(all.contains(&"You start off with e4.".to_string()));

        let ada = Voice::new(Color::White, "Ada", Color::Black);
        let grace = Voice::new(Color::Black, "Grace", Color::Black);
        let all = sentences("OPEN", vec![parties(&ada, &grace), first_move(&ada, "e4")]);
        assert!(all.contains(&"Ada opens with e4.".to_string()));
        assert!(all.iter().all(|s| !s.starts_with("You")));
    }

    #[test]
    fn test_capture_mentions_victim() {
        let them = Voice::new(Color::Black, "Grace", Color::White);
        let you = Voice::new(Color::White, "Ada", Color::White);
        let capture = Capture {
            piece: "knight",
            square: "f3",
        };
        let all = sentences(
            "MOVE",
            vec![parties(&them, &you), move_made(&them, "Bxf3", Some("Nf3"), Some(capture))],
        );
        assert!(all.contains(&"Grace captures your knight on f3 with Bxf3.".to_string()));
        assert!(all.contains(&"Black counters Nf3 with Bxf3.".to_string()));
    }

    #[test]
    fn test_suggestion_lists() {
        let you = Voice::new(Color::White, "Ada", Color::White);
        let them = Voice::new(Color::Black, "Grace", Color::White);
        let moves = vec!["Nf3".to_string(), "d4".to_string(), "c4".to_string()];
        let all = sentences("SUGGEST", vec![parties(&you, &them), suggestions(&moves)]);
        assert!(all.contains(&"Better options were Nf3, d4 or c4.".to_string()));

        let all = sentences("SUGGEST", vec![parties(&you, &them), suggestions(&moves[..1])]);
        assert!(all.contains(&"Nf3 would have been stronger.".to_string()));
    }

    #[test]
    fn test_checkmating_third_person() {
        let them = Voice::new(Color::Black, "Grace", Color::White);
        let you = Voice::new(Color::White, "Ada", Color::White);
        let all = sentences("MATING", vec![parties(&them, &you), checkmating(&them, 3)]);
        assert!(all.contains(&"Grace is trying to checkmate you in 3 moves.".to_string()));
    }

    #[test]
    fn test_endings() {
        let you = Voice::new(Color::White, "Ada", Color::White);
        let them = Voice::new(Color::Black, "Grace", Color::White);
        let all = sentences("WIN", vec![parties(&you, &them), win(&you, 12)]);
        assert!(all.contains(&"You have beaten Grace in 12 moves.".to_string()));

        let all = sentences("STALEMATE", vec![stalemate(1)]);
        assert_eq!(all, vec!["Stalemate in 1 move.", "The game has reached a stalemate in 1 move."]);
    }
}
