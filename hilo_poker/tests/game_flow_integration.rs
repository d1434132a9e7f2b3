/// Integration tests for whole hands played through the message handlers
///
/// Every table here is dealt from a fixed deck so the exact cards, turn
/// order and chip movements can be asserted.
use hilo_poker::{
    GameConfig, ServerContext,
    entities::{Card, CardValue, Deck, GamePhase, Operator, Player, PlayerId, RoomCode, Suit},
    messages::{BetType, JoinRejectReason, ServerMessage},
    outbox::{Command, DeadlineStage, Outbox},
};
use serde_json::{Value, json};

/// All 44 numbered cards, rank by rank.
fn numbers_deck() -> Vec<Card> {
    (0..=10)
        .flat_map(|rank| Suit::NUMBERED.map(|suit| Card::number(rank, suit)))
        .collect()
}

fn id(s: &str) -> PlayerId {
    PlayerId::new(s)
}

struct Table {
    context: ServerContext,
    code: RoomCode,
}

impl Table {
    /// Seats `players` (the first one hosts) without starting.
    fn seat(config: GameConfig, players: &[&str], deck: Vec<Card>) -> Self {
        let context = ServerContext::new(config)
            .with_deck_source(Box::new(move || Deck::from_cards(deck.clone())));
        let mut table = Self {
            context,
            code: RoomCode::new("TEMP"),
        };

        let out = table.raw(None, json!({"type": "create", "userId": players[0]}));
        table.code = out
            .sender_messages()
            .into_iter()
            .find_map(|m| match m {
                ServerMessage::RoomEntered { room_code, .. } => Some(room_code.clone()),
                _ => None,
            })
            .unwrap();

        for player in &players[1..] {
            let code = table.code.to_string();
            table.raw(
                None,
                json!({"type": "enter", "userId": player, "roomCode": code}),
            );
        }
        for player in players {
            table.send(player, json!({"type": "join", "username": player}));
        }
        table
    }

    fn started(config: GameConfig, players: &[&str], deck: Vec<Card>) -> (Self, Outbox) {
        let mut table = Self::seat(config, players, deck);
        let out = table.send(players[0], json!({"type": "start"}));
        (table, out)
    }

    fn raw(&mut self, bound: Option<&str>, message: Value) -> Outbox {
        let mut out = Outbox::new();
        let bound = bound.map(PlayerId::new);
        self.context
            .handle_raw(bound.as_ref(), &message.to_string(), &mut out)
            .unwrap();
        out
    }

    fn send(&mut self, who: &str, message: Value) -> Outbox {
        self.raw(Some(who), message)
    }

    fn player(&self, who: &str) -> &Player {
        self.context.players.get(&id(who)).unwrap()
    }

    fn phase(&self) -> GamePhase {
        self.context.games.get(&self.code).unwrap().phase
    }

    fn pot(&self) -> u32 {
        self.context.games.get(&self.code).unwrap().pot
    }

    fn identity_order(&self, who: &str) -> Vec<usize> {
        (0..self.player(who).hand.len()).collect()
    }

    fn submit(&mut self, who: &str, result: f64) -> Outbox {
        let order = self.identity_order(who);
        self.send(
            who,
            json!({"type": "equation-result", "result": result, "order": order}),
        )
    }
}

fn deal_for<'a>(out: &'a Outbox, recipient: &str, owner: &str) -> Option<&'a ServerMessage> {
    out.messages_for(&id(recipient))
        .into_iter()
        .rev()
        .find(|m| matches!(m, ServerMessage::Deal { id: dealt, .. } if dealt == &id(owner)))
}

fn round_result(out: &Outbox, recipient: &str) -> hilo_poker::messages::RoundResult {
    out.messages_for(&id(recipient))
        .into_iter()
        .find_map(|m| match m {
            ServerMessage::RoundResult(result) => Some(result.clone()),
            _ => None,
        })
        .unwrap()
}

fn has(out: &Outbox, recipient: &str, kind: &str) -> bool {
    out.messages_for(&id(recipient))
        .iter()
        .any(|m| m.kind() == kind)
}

// === Full Hand ===

#[test]
fn test_two_player_hand_splits_the_pot() {
    let (mut table, out) = Table::started(GameConfig::default(), &["alice", "bob"], numbers_deck());

    assert!(has(&out, "bob", "game-started"));
    assert!(out
        .messages_for(&id("bob"))
        .contains(&&ServerMessage::BeginHand { hand_number: 0 }));
    assert_eq!(table.phase(), GamePhase::FirstBetting);

    // Hidden cards go round first.
    // alice: + ÷ − [0 stone] 0 silver 0 gold, bob: + ÷ − [0 bronze] 1 stone 1 bronze
    let alice = table.player("alice");
    assert_eq!(alice.hand.len(), 6);
    assert!(alice.hand[..3].iter().all(Card::is_operator));
    assert_eq!(alice.hand[3], Card::number(0, Suit::Stone).hidden());
    assert_eq!(alice.hand[4], Card::number(0, Suit::Silver));
    assert_eq!(table.player("bob").hand[3], Card::number(0, Suit::Bronze).hidden());
    assert_eq!(table.player("bob").hand[4], Card::number(1, Suit::Stone));

    match deal_for(&out, "bob", "alice") {
        Some(ServerMessage::Deal { hand, .. }) => {
            assert!(hand[3].is_redacted());
            assert_eq!(hand[4].value, Some(CardValue::Number(0)));
        }
        other => panic!("expected alice's deal, got {other:?}"),
    }
    match deal_for(&out, "alice", "alice") {
        Some(ServerMessage::Deal { hand, .. }) => {
            assert!(!hand[3].is_redacted());
            assert!(hand[3].hidden);
        }
        other => panic!("expected alice's own deal, got {other:?}"),
    }
    assert!(out.messages_for(&id("bob")).contains(&&ServerMessage::NextTurn {
        to_call: 1,
        max_bet: 25,
        current_turn_player_id: id("alice"),
        username: Some("alice".to_string().into()),
        player_chip_count: 25,
    }));

    // First betting round: ante then call.
    let out = table.send("alice", json!({"type": "bet-placed", "betAmount": 1}));
    assert!(out.messages_for(&id("bob")).iter().any(|m| matches!(
        m,
        ServerMessage::BetPlaced { bet_type: BetType::Ante, pot: 1, .. }
    )));
    let out = table.send("bob", json!({"type": "bet-placed", "betAmount": 1}));
    assert!(out.messages_for(&id("alice")).iter().any(|m| matches!(
        m,
        ServerMessage::BetPlaced { bet_type: BetType::Call, pot: 2, .. }
    )));
    assert!(out.messages_for(&id("alice")).contains(&&ServerMessage::EndBettingRound {
        round: GamePhase::FirstBetting
    }));
    assert_eq!(table.phase(), GamePhase::EquationForming);
    assert_eq!(table.player("alice").hand.len(), 7);
    assert!(out.commands().iter().any(|c| matches!(
        c,
        Command::ArmDeadline { stage: DeadlineStage::Window, hand_number: 0, .. }
    )));

    // Equations.
    let out = table.submit("alice", 1.0);
    match out.messages_for(&id("bob")).as_slice() {
        [ServerMessage::PlayerFormedEquation { id: who, hand, .. }] => {
            assert_eq!(who, &id("alice"));
            assert!(hand[3].is_redacted());
        }
        other => panic!("unexpected {other:?}"),
    }
    let out = table.submit("bob", 19.0);
    assert!(has(&out, "alice", "end-equation-forming"));
    assert!(out
        .commands()
        .contains(&Command::DisarmDeadline(table.code.clone())));
    assert_eq!(table.phase(), GamePhase::SecondBetting);

    // Second betting round resumes after bob, who closed the first one.
    assert!(out.messages_for(&id("alice")).iter().any(|m| matches!(
        m,
        ServerMessage::NextTurn { to_call: 0, current_turn_player_id, .. }
            if current_turn_player_id == &id("alice")
    )));
    table.send("alice", json!({"type": "bet-placed", "betAmount": 0}));
    let out = table.send("bob", json!({"type": "bet-placed", "betAmount": 0}));
    assert!(has(&out, "bob", "hi-lo-selection"));
    assert_eq!(table.phase(), GamePhase::HiLoSelection);

    // Hi-lo selection and showdown.
    table.send("alice", json!({"type": "hi-lo-selected", "choices": ["low"]}));
    let out = table.send("bob", json!({"type": "hi-lo-selected", "choices": ["high"]}));
    assert_eq!(table.phase(), GamePhase::ResultViewing);

    let result = round_result(&out, "alice");
    assert_eq!(result.lo_winner, Some(id("alice")));
    assert_eq!(result.hi_winner, Some(id("bob")));
    assert_eq!(result.results.len(), 2);
    let alice_row = &result.results[0];
    assert_eq!(alice_row.chip_differential, 1);
    assert_eq!(alice_row.low_result, Some(1.0));
    assert_eq!(alice_row.low_difference, Some(0.0));
    assert!(alice_row.is_lo_winner);
    assert!(alice_row.low_hand.iter().all(|c| !c.hidden));
    assert_eq!(table.player("alice").chip_count, 25);
    assert_eq!(table.player("bob").chip_count, 25);
    assert_eq!(table.pot(), 0);

    // Revealed hands go out before the summary.
    match deal_for(&out, "bob", "alice") {
        Some(ServerMessage::Deal { hand, .. }) => assert!(hand.iter().all(|c| !c.is_redacted())),
        other => panic!("expected alice's revealed hand, got {other:?}"),
    }

    // Acknowledgements start the next hand.
    let out = table.send("alice", json!({"type": "acknowledge-hand-results"}));
    assert!(out.is_empty());
    let out = table.send("bob", json!({"type": "acknowledge-hand-results"}));
    assert!(out
        .messages_for(&id("alice"))
        .contains(&&ServerMessage::BeginHand { hand_number: 1 }));
    assert_eq!(table.phase(), GamePhase::FirstBetting);
}

#[test]
fn test_folded_player_must_acknowledge_results() {
    let (mut table, _) = Table::started(
        GameConfig::default(),
        &["alice", "bob", "carol"],
        numbers_deck(),
    );
    table.send("alice", json!({"type": "bet-placed", "betAmount": 1}));
    table.send("bob", json!({"type": "fold", "manual": true}));
    table.send("carol", json!({"type": "bet-placed", "betAmount": 1}));
    table.submit("alice", 1.0);
    table.submit("carol", 20.0);
    table.send("alice", json!({"type": "bet-placed", "betAmount": 0}));
    table.send("carol", json!({"type": "bet-placed", "betAmount": 0}));
    table.send("alice", json!({"type": "hi-lo-selected", "choices": ["low"]}));
    table.send("carol", json!({"type": "hi-lo-selected", "choices": ["high"]}));
    assert_eq!(table.phase(), GamePhase::ResultViewing);

    table.send("alice", json!({"type": "acknowledge-hand-results"}));
    let out = table.send("carol", json!({"type": "acknowledge-hand-results"}));
    assert!(out.is_empty());
    assert_eq!(table.phase(), GamePhase::ResultViewing, "bob has not acknowledged");

    let out = table.send("bob", json!({"type": "acknowledge-hand-results"}));
    assert!(out
        .messages_for(&id("alice"))
        .contains(&&ServerMessage::BeginHand { hand_number: 1 }));
}

#[test]
fn test_eliminated_player_still_acknowledges() {
    let config = GameConfig {
        starting_chips: 1,
        ..Default::default()
    };
    let (mut table, _) = Table::started(config, &["alice", "bob", "carol"], numbers_deck());
    // bob is all in and loses, alice and carol carry on.
    table.send("alice", json!({"type": "bet-placed", "betAmount": 1}));
    table.send("bob", json!({"type": "bet-placed", "betAmount": 1}));
    table.send("carol", json!({"type": "fold", "manual": true}));
    table.submit("alice", 1.0);
    table.submit("bob", 6.0);
    table.send("alice", json!({"type": "hi-lo-selected", "choices": ["low"]}));
    table.send("bob", json!({"type": "hi-lo-selected", "choices": ["low"]}));
    assert_eq!(table.player("bob").chip_count, 0);
    for who in ["alice", "bob", "carol"] {
        table.send(who, json!({"type": "acknowledge-hand-results"}));
    }
    assert!(table.player("bob").out);
    assert!(!table.player("bob").departed);

    // Next hand: bob sits folded while alice and carol play it out.
    assert_eq!(table.phase(), GamePhase::FirstBetting);
    assert!(table.player("bob").folded);
    let first = table.context.games.get(&table.code).unwrap().current_turn.clone();
    let second = if first == id("alice") { "carol" } else { "alice" };
    // carol's only chip goes in either way, so the second round is skipped.
    table.send(first.as_str(), json!({"type": "bet-placed", "betAmount": 1}));
    table.send(second, json!({"type": "bet-placed", "betAmount": 1}));
    table.submit("alice", 1.0);
    let out = table.submit("carol", 20.0);
    assert!(has(&out, "carol", "second-round-betting-skipped"));
    assert!(!has(&out, "bob", "second-round-betting-skipped"));
    table.send("alice", json!({"type": "hi-lo-selected", "choices": ["low"]}));
    table.send("carol", json!({"type": "hi-lo-selected", "choices": ["high"]}));
    assert_eq!(table.phase(), GamePhase::ResultViewing);

    table.send("alice", json!({"type": "acknowledge-hand-results"}));
    table.send("carol", json!({"type": "acknowledge-hand-results"}));
    assert_eq!(table.phase(), GamePhase::ResultViewing, "bob is still seated");
    let out = table.send("bob", json!({"type": "acknowledge-hand-results"}));
    assert!(out
        .messages_for(&id("carol"))
        .contains(&&ServerMessage::BeginHand { hand_number: 2 }));
}

#[test]
fn test_out_of_turn_bet_is_ignored() {
    let (mut table, _) = Table::started(GameConfig::default(), &["alice", "bob"], numbers_deck());
    let out = table.send("bob", json!({"type": "bet-placed", "betAmount": 1}));
    assert!(out.is_empty());
    assert_eq!(table.pot(), 0);
}

#[test]
fn test_bet_above_chip_count_is_ignored() {
    let (mut table, _) = Table::started(GameConfig::default(), &["alice", "bob"], numbers_deck());
    let out = table.send("alice", json!({"type": "bet-placed", "betAmount": 26}));
    assert!(out.is_empty());
    assert_eq!(table.player("alice").chip_count, 25);
}

// === Folding ===

#[test]
fn test_last_player_standing_takes_pot() {
    let (mut table, _) = Table::started(
        GameConfig::default(),
        &["alice", "bob", "carol"],
        numbers_deck(),
    );

    table.send("alice", json!({"type": "bet-placed", "betAmount": 1}));
    let out = table.send("bob", json!({"type": "fold", "manual": true}));
    match out.messages_for(&id("alice")).first() {
        Some(ServerMessage::PlayerFolded { id: who, hand, .. }) => {
            assert_eq!(who, &id("bob"));
            assert!(hand.iter().all(|c| c.is_redacted()));
        }
        other => panic!("unexpected {other:?}"),
    }
    // Turn moves past bob to carol.
    assert!(out.messages_for(&id("carol")).iter().any(|m| matches!(
        m,
        ServerMessage::NextTurn { to_call: 1, current_turn_player_id, .. }
            if current_turn_player_id == &id("carol")
    )));

    let out = table.send("carol", json!({"type": "fold", "manual": true}));
    let alice_view = round_result(&out, "alice");
    assert!(alice_view.because_all_but_one_folded);
    assert_eq!(
        alice_view.message,
        "Everyone else folded. You take the pot by default."
    );
    assert_eq!(
        round_result(&out, "bob").message,
        "Everyone but alice has folded. They take the pot of 1."
    );
    assert!(out.messages_for(&id("bob")).contains(&&ServerMessage::ChipDistribution {
        id: id("alice"),
        chip_count: 25,
    }));
    assert!(out
        .messages_for(&id("carol"))
        .contains(&&ServerMessage::BeginHand { hand_number: 1 }));
    assert_eq!(table.player("alice").chip_count, 25);
}

#[test]
fn test_fold_outside_fold_phases_is_ignored() {
    let (mut table, _) = Table::started(
        GameConfig::default(),
        &["alice", "bob"],
        numbers_deck(),
    );
    table.send("alice", json!({"type": "bet-placed", "betAmount": 1}));
    table.send("bob", json!({"type": "bet-placed", "betAmount": 1}));
    table.submit("alice", 1.0);
    table.submit("bob", 20.0);
    table.send("alice", json!({"type": "bet-placed", "betAmount": 0}));
    table.send("bob", json!({"type": "bet-placed", "betAmount": 0}));
    assert_eq!(table.phase(), GamePhase::HiLoSelection);

    let out = table.send("alice", json!({"type": "fold", "manual": true}));
    assert!(out.is_empty());
    assert!(!table.player("alice").folded);
}

// === Discards ===

#[test]
fn test_multiply_holds_the_deal_until_discarded() {
    let mut deck = vec![Card::operator(Operator::Multiply)];
    deck.extend(numbers_deck());
    let (mut table, out) = Table::started(GameConfig::default(), &["alice", "bob"], deck);

    // Both hidden numbers come off first, then alice opens on the multiply
    // and a forced number.
    assert_eq!(
        table.player("alice").hand[4..],
        [Card::operator(Operator::Multiply), Card::number(0, Suit::Silver)]
    );
    assert_eq!(table.player("bob").hand[3], Card::number(0, Suit::Bronze).hidden());
    assert!(table.player("alice").needs_to_discard);
    assert_eq!(table.phase(), GamePhase::FirstDeal);
    assert!(!has(&out, "alice", "next-turn"));
    match deal_for(&out, "bob", "alice") {
        Some(ServerMessage::Deal {
            multiplication_card_dealt,
            ..
        }) => assert!(multiplication_card_dealt),
        other => panic!("unexpected {other:?}"),
    }

    // Nobody else may discard and nobody may bet yet.
    assert!(table
        .send("bob", json!({"type": "discard", "value": 1}))
        .is_empty());
    assert!(table
        .send("alice", json!({"type": "bet-placed", "betAmount": 1}))
        .is_empty());

    // The granted operators are not the dealt card.
    assert!(table
        .send("alice", json!({"type": "discard", "value": "+"}))
        .is_empty());
    assert!(table.player("alice").needs_to_discard);

    let out = table.send("alice", json!({"type": "discard", "value": "×"}));
    assert!(out.messages_for(&id("bob")).contains(&&ServerMessage::PlayerDiscarded {
        id: id("alice"),
        username: Some("alice".to_string().into()),
        value: CardValue::Operator(Operator::Multiply),
    }));
    // Only the granted operators remain.
    assert!(!table.player("alice").hand[3..].iter().any(Card::is_operator));
    assert_eq!(table.player("alice").hand.len(), 6);
    assert!(!table.player("alice").needs_to_discard);
    assert_eq!(table.phase(), GamePhase::FirstBetting);
    assert!(has(&out, "alice", "first-round-betting-commenced"));
}

// === Equation Deadlines ===

#[test]
fn test_nobody_answers_and_everyone_is_refunded() {
    let (mut table, _) = Table::started(GameConfig::default(), &["alice", "bob"], numbers_deck());
    table.send("alice", json!({"type": "bet-placed", "betAmount": 1}));
    table.send("bob", json!({"type": "bet-placed", "betAmount": 3}));
    table.send("alice", json!({"type": "bet-placed", "betAmount": 2}));
    assert_eq!(table.phase(), GamePhase::EquationForming);
    assert_eq!(table.pot(), 6);

    let code = table.code.clone();
    let mut out = Outbox::new();
    table
        .context
        .equation_deadline(&code, 0, DeadlineStage::Window, &mut out)
        .unwrap();
    assert!(has(&out, "alice", "end-equation-forming"));
    assert!(out
        .messages_for(&id("bob"))
        .contains(&&ServerMessage::RequestFormedEquation));
    assert!(out.commands().iter().any(|c| matches!(
        c,
        Command::ArmDeadline { stage: DeadlineStage::Grace, .. }
    )));

    let mut out = Outbox::new();
    table
        .context
        .equation_deadline(&code, 0, DeadlineStage::Grace, &mut out)
        .unwrap();
    let result = round_result(&out, "alice");
    assert!(result.because_no_one_formed_equation);
    assert_eq!(table.player("alice").chip_count, 25);
    assert_eq!(table.player("bob").chip_count, 25);
    assert!(out
        .messages_for(&id("bob"))
        .contains(&&ServerMessage::BeginHand { hand_number: 1 }));
}

#[test]
fn test_late_answer_after_window_still_counts() {
    let (mut table, _) = Table::started(GameConfig::default(), &["alice", "bob"], numbers_deck());
    table.send("alice", json!({"type": "bet-placed", "betAmount": 1}));
    table.send("bob", json!({"type": "bet-placed", "betAmount": 1}));
    table.submit("alice", 1.0);

    let code = table.code.clone();
    let mut out = Outbox::new();
    table
        .context
        .equation_deadline(&code, 0, DeadlineStage::Window, &mut out)
        .unwrap();
    assert!(out
        .messages_for(&id("bob"))
        .contains(&&ServerMessage::RequestFormedEquation));
    assert!(!out
        .messages_for(&id("alice"))
        .contains(&&ServerMessage::RequestFormedEquation));

    let out = table.submit("bob", 20.0);
    assert!(!has(&out, "alice", "end-equation-forming"), "already announced");
    assert_eq!(table.phase(), GamePhase::SecondBetting);
}

#[test]
fn test_grace_expiry_leaves_single_survivor() {
    let (mut table, _) = Table::started(GameConfig::default(), &["alice", "bob"], numbers_deck());
    table.send("alice", json!({"type": "bet-placed", "betAmount": 1}));
    table.send("bob", json!({"type": "bet-placed", "betAmount": 1}));
    table.submit("alice", 3.0);

    let code = table.code.clone();
    let mut out = Outbox::new();
    table
        .context
        .equation_deadline(&code, 0, DeadlineStage::Window, &mut out)
        .unwrap();
    let mut out = Outbox::new();
    table
        .context
        .equation_deadline(&code, 0, DeadlineStage::Grace, &mut out)
        .unwrap();

    assert!(round_result(&out, "bob").because_all_but_one_folded);
    assert_eq!(table.player("alice").chip_count, 26);
    assert_eq!(table.player("bob").chip_count, 24);
}

#[test]
fn test_stale_deadline_is_ignored() {
    let (mut table, _) = Table::started(GameConfig::default(), &["alice", "bob"], numbers_deck());
    let code = table.code.clone();
    let mut out = Outbox::new();
    table
        .context
        .equation_deadline(&code, 0, DeadlineStage::Grace, &mut out)
        .unwrap();
    assert!(out.is_empty());
    assert_eq!(table.phase(), GamePhase::FirstBetting);
}

#[test]
fn test_invalid_equation_order_is_rejected() {
    let (mut table, _) = Table::started(GameConfig::default(), &["alice", "bob"], numbers_deck());
    table.send("alice", json!({"type": "bet-placed", "betAmount": 1}));
    table.send("bob", json!({"type": "bet-placed", "betAmount": 1}));

    let out = table.send(
        "alice",
        json!({"type": "equation-result", "result": 1.0, "order": [0, 0, 1, 2, 3, 4, 5]}),
    );
    assert!(out.is_empty());
    assert_eq!(table.player("alice").equation_result, None);
}

// === All-in ===

#[test]
fn test_all_in_skips_second_round_and_ends_game() {
    let config = GameConfig {
        starting_chips: 1,
        ..Default::default()
    };
    let (mut table, _) = Table::started(config, &["alice", "bob"], numbers_deck());
    table.send("alice", json!({"type": "bet-placed", "betAmount": 1}));
    table.send("bob", json!({"type": "bet-placed", "betAmount": 1}));
    table.submit("alice", 1.0);
    let out = table.submit("bob", 6.0);
    assert!(has(&out, "alice", "second-round-betting-skipped"));
    assert_eq!(table.phase(), GamePhase::HiLoSelection);

    table.send("alice", json!({"type": "hi-lo-selected", "choices": ["low"]}));
    table.send("bob", json!({"type": "hi-lo-selected", "choices": ["low"]}));
    assert_eq!(table.player("alice").chip_count, 2);
    assert_eq!(table.player("bob").chip_count, 0);

    table.send("alice", json!({"type": "acknowledge-hand-results"}));
    let out = table.send("bob", json!({"type": "acknowledge-hand-results"}));
    assert!(out.messages_for(&id("alice")).contains(&&ServerMessage::Kicked {
        user_id: id("bob"),
        username: Some("bob".to_string().into()),
    }));
    assert!(out.messages_for(&id("bob")).contains(&&ServerMessage::GameOver {
        winner_id: Some(id("alice")),
        username: Some("alice".to_string().into()),
    }));
    assert_eq!(table.phase(), GamePhase::Lobby);
}

// === Swing Bets ===

#[test]
fn test_swing_bettor_sweeps_with_two_equations() {
    let (mut table, _) = Table::started(GameConfig::default(), &["alice", "bob"], numbers_deck());
    table.send("alice", json!({"type": "bet-placed", "betAmount": 1}));
    table.send("bob", json!({"type": "bet-placed", "betAmount": 1}));
    table.submit("alice", 20.0);
    table.submit("bob", 4.0);
    table.send("alice", json!({"type": "bet-placed", "betAmount": 0}));
    table.send("bob", json!({"type": "bet-placed", "betAmount": 0}));

    let order: Vec<usize> = table.identity_order("alice").into_iter().rev().collect();
    table.send(
        "alice",
        json!({
            "type": "hi-lo-selected",
            "choices": ["low", "high"],
            "otherEquationResult": 1.0,
            "order": order,
        }),
    );
    let alice = table.player("alice");
    assert_eq!(alice.low_equation_result, Some(1.0));
    assert_eq!(alice.high_equation_result, Some(20.0));
    assert_eq!(alice.low_hand.first(), alice.hand.last());

    let out = table.send("bob", json!({"type": "hi-lo-selected", "choices": ["low"]}));
    let result = round_result(&out, "bob");
    assert_eq!(result.lo_winner, Some(id("alice")));
    assert_eq!(result.hi_winner, Some(id("alice")));
    assert_eq!(table.player("alice").chip_count, 26);
}

#[test]
fn test_swing_without_second_equation_is_ignored() {
    let (mut table, _) = Table::started(GameConfig::default(), &["alice", "bob"], numbers_deck());
    table.send("alice", json!({"type": "bet-placed", "betAmount": 1}));
    table.send("bob", json!({"type": "bet-placed", "betAmount": 1}));
    table.submit("alice", 20.0);
    table.submit("bob", 4.0);
    table.send("alice", json!({"type": "bet-placed", "betAmount": 0}));
    table.send("bob", json!({"type": "bet-placed", "betAmount": 0}));

    table.send("alice", json!({"type": "hi-lo-selected", "choices": ["low", "high"]}));
    assert!(table.player("alice").choices.is_empty());
}

// === Rooms ===

#[test]
fn test_reconnect_mid_hand_gets_snapshot() {
    let (mut table, _) = Table::started(GameConfig::default(), &["alice", "bob"], numbers_deck());
    let code = table.code.to_string();

    let out = table.raw(
        None,
        json!({"type": "enter", "userId": "mallory", "roomCode": code}),
    );
    assert!(out.sender_messages().contains(&&ServerMessage::RoomJoinReject {
        reason: JoinRejectReason::InProgress
    }));

    let out = table.raw(None, json!({"type": "enter", "userId": "bob", "roomCode": code}));
    assert_eq!(out.commands(), &[Command::Bind(id("bob"))]);
    let sender = out.sender_messages();
    assert!(matches!(
        sender.first(),
        Some(ServerMessage::RoomEntered { in_progress: true, joined: true, .. })
    ));
    let alice_deal = sender
        .iter()
        .find(|m| matches!(m, ServerMessage::Deal { id: dealt, .. } if dealt == &id("alice")));
    match alice_deal {
        Some(ServerMessage::Deal { hand, .. }) => assert!(hand[3].is_redacted()),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_leaving_mid_hand_folds_the_player() {
    let (mut table, _) = Table::started(
        GameConfig::default(),
        &["alice", "bob", "carol"],
        numbers_deck(),
    );
    table.send("alice", json!({"type": "bet-placed", "betAmount": 1}));

    // bob holds the turn and leaves.
    let out = table.send("bob", json!({"type": "leave"}));
    assert!(table.player("bob").out);
    assert!(table.player("bob").folded);
    assert!(out.messages_for(&id("carol")).iter().any(|m| matches!(
        m,
        ServerMessage::NextTurn { current_turn_player_id, .. }
            if current_turn_player_id == &id("carol")
    )));

    // bob sits out the next hand entirely.
    table.send("carol", json!({"type": "bet-placed", "betAmount": 1}));
    table.submit("alice", 1.0);
    table.submit("carol", 20.0);
    table.send("alice", json!({"type": "bet-placed", "betAmount": 0}));
    table.send("carol", json!({"type": "bet-placed", "betAmount": 0}));
    table.send("alice", json!({"type": "hi-lo-selected", "choices": ["low"]}));
    table.send("carol", json!({"type": "hi-lo-selected", "choices": ["high"]}));
    table.send("alice", json!({"type": "acknowledge-hand-results"}));
    table.send("carol", json!({"type": "acknowledge-hand-results"}));

    assert_eq!(table.phase(), GamePhase::FirstBetting);
    assert!(table.player("bob").hand.is_empty());
    assert!(table.player("bob").folded);
}

#[test]
fn test_player_cannot_enter_second_room_mid_hand() {
    let (mut table, _) = Table::started(GameConfig::default(), &["alice", "bob"], numbers_deck());
    let out = table.raw(None, json!({"type": "create", "userId": "bob"}));
    assert!(out.sender_messages().contains(&&ServerMessage::RoomJoinReject {
        reason: JoinRejectReason::InOtherRoom
    }));
    assert_eq!(table.context.games.len(), 1);
}
