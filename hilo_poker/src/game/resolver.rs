//! Hi-lo winner resolution and pot distribution.
//!
//! Players contest the low target, the high target, or both (a swing bet).
//! A swing bettor who beats every pool on both sides sweeps the pot. Otherwise
//! each side is won independently and a pot contested by two different
//! winners is halved, an odd chip being discarded first.

use std::cmp::Ordering;

use super::{
    entities::{Card, Chips, Choice, Choices, Player, PlayerId},
    functional::{highest_card, lowest_card},
};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Targets {
    pub low: f64,
    pub high: f64,
}

impl Targets {
    fn for_side(&self, side: Choice) -> f64 {
        match side {
            Choice::Low => self.low,
            Choice::High => self.high,
        }
    }
}

/// The slice of a player the resolver needs.
#[derive(Clone, Debug)]
pub struct Contestant {
    pub id: PlayerId,
    pub choices: Choices,
    pub low_result: Option<f64>,
    pub high_result: Option<f64>,
    pub hand: Vec<Card>,
}

impl Contestant {
    fn result_for(&self, side: Choice) -> Option<f64> {
        match side {
            Choice::Low => self.low_result,
            Choice::High => self.high_result,
        }
    }

    /// The card that settles a tie on `side`.
    fn tie_break_card(&self, side: Choice) -> Option<Card> {
        match side {
            Choice::Low => lowest_card(&self.hand),
            Choice::High => highest_card(&self.hand),
        }
    }
}

impl From<&Player> for Contestant {
    fn from(player: &Player) -> Self {
        Self {
            id: player.id.clone(),
            choices: player.choices,
            low_result: player.low_equation_result,
            high_result: player.high_equation_result,
            hand: player.hand.clone(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SideOutcome {
    pub winner: Option<PlayerId>,
    /// Winner's tie-break card, set only when a tie had to be broken.
    pub winning_card: Option<Card>,
    /// Everyone tied at the best distance, empty unless two or more tied.
    pub contenders: Vec<PlayerId>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Resolution {
    pub sweeper: Option<PlayerId>,
    pub low: SideOutcome,
    pub high: SideOutcome,
    /// Chips awarded through the low side (the whole pot on a sweep).
    pub low_delta: Chips,
    /// Chips awarded through the high side (the whole pot on a sweep).
    pub high_delta: Chips,
    pub payouts: Vec<(PlayerId, Chips)>,
    /// Odd chip lost when halving.
    pub discarded: Chips,
}

impl Resolution {
    pub fn payout_for(&self, id: &PlayerId) -> Chips {
        self.payouts
            .iter()
            .filter(|(winner, _)| winner == id)
            .map(|(_, amount)| amount)
            .sum()
    }

    pub fn has_winner(&self) -> bool {
        !self.payouts.is_empty()
    }
}

/// Compares tie-break cards; `Less` means `a` beats `b`.
fn compare_tie_break(side: Choice, a: Option<Card>, b: Option<Card>) -> Ordering {
    let key = |card: Option<Card>| card.and_then(|c| c.rank().map(|rank| (rank, c.suit)));
    match (key(a), key(b)) {
        (Some(a), Some(b)) => match side {
            Choice::Low => a.cmp(&b),
            Choice::High => b.cmp(&a),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Best contestant on one side of the table.
pub fn find_side_winner(pool: &[&Contestant], side: Choice, targets: Targets) -> SideOutcome {
    let target = targets.for_side(side);
    let scored: Vec<(&Contestant, f64)> = pool
        .iter()
        .filter_map(|c| c.result_for(side).map(|r| (*c, (r - target).abs())))
        .collect();

    let Some(best) = scored
        .iter()
        .map(|(_, distance)| *distance)
        .min_by(|a, b| a.total_cmp(b))
    else {
        return SideOutcome::default();
    };

    let tied: Vec<&Contestant> = scored
        .iter()
        .filter(|(_, distance)| *distance == best)
        .map(|(c, _)| *c)
        .collect();

    if let [only] = tied.as_slice() {
        return SideOutcome {
            winner: Some(only.id.clone()),
            winning_card: None,
            contenders: Vec::new(),
        };
    }

    // Earlier seats keep the win when even the cards are identical.
    let winner = tied.iter().copied().reduce(|best, next| {
        match compare_tie_break(side, next.tie_break_card(side), best.tie_break_card(side)) {
            Ordering::Less => next,
            _ => best,
        }
    });

    SideOutcome {
        winner: winner.map(|c| c.id.clone()),
        winning_card: winner.and_then(|c| c.tie_break_card(side)),
        contenders: tied.iter().map(|c| c.id.clone()).collect(),
    }
}

/// Decides who takes `pot` among `contestants` (the non-folded players).
pub fn resolve(contestants: &[Contestant], pot: Chips, targets: Targets) -> Resolution {
    let swing: Vec<&Contestant> = contestants
        .iter()
        .filter(|c| c.choices.is_swing())
        .collect();
    let low_pool: Vec<&Contestant> = contestants.iter().filter(|c| c.choices.low).collect();
    let high_pool: Vec<&Contestant> = contestants.iter().filter(|c| c.choices.high).collect();

    let low = find_side_winner(&low_pool, Choice::Low, targets);
    let high = find_side_winner(&high_pool, Choice::High, targets);

    if !swing.is_empty() {
        let swing_low = find_side_winner(&swing, Choice::Low, targets).winner;
        let swing_high = find_side_winner(&swing, Choice::High, targets).winner;
        if let Some(sweeper) = swing_low
            && swing_high.as_ref() == Some(&sweeper)
            && low.winner.as_ref() == Some(&sweeper)
            && high.winner.as_ref() == Some(&sweeper)
        {
            return Resolution {
                sweeper: Some(sweeper.clone()),
                low,
                high,
                low_delta: pot,
                high_delta: pot,
                payouts: vec![(sweeper, pot)],
                discarded: 0,
            };
        }
    }

    let mut resolution = Resolution {
        low: low.clone(),
        high: high.clone(),
        ..Default::default()
    };

    match (low.winner, high.winner) {
        (Some(lo), Some(hi)) if lo != hi => {
            let discarded = pot % 2;
            let share = (pot - discarded) / 2;
            resolution.low_delta = share;
            resolution.high_delta = share;
            resolution.discarded = discarded;
            resolution.payouts = vec![(lo, share), (hi, share)];
        }
        (Some(winner), _) => {
            resolution.low_delta = pot;
            resolution.payouts = vec![(winner, pot)];
        }
        (None, Some(winner)) => {
            resolution.high_delta = pot;
            resolution.payouts = vec![(winner, pot)];
        }
        (None, None) => {}
    }

    resolution
}
