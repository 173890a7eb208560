//! The action reducer.
//!
//! `apply_action` is the only way the table changes. It clones the caller's
//! state, pushes an undo snapshot, runs exactly one handler, and returns the
//! new state. Any error drops the clone, so a failed action is a strict
//! no-op; callers keep their original value untouched.

use rand::Rng;

use crate::data;
use crate::engine::action::{Action, Creditor};
use crate::engine::phase::{self, GamePhase};
use crate::engine::random;
use crate::engine::rent::{self, RentAmount};
use crate::error::{EngineError, Result};
use crate::models::{
    CardEffect, DeckType, PropertyState, Transaction, TransactionKind, BANK, MAX_HOUSES,
};
use crate::state::{FreeParkingPrize, GameState, PendingEvent};

/// Apply one action to the table.
///
/// On success the returned state carries the pre-action snapshot on its undo
/// stack and whatever audit-log rows the handler appended. `UNDO_LAST` is the
/// one exception: it pops a snapshot instead of pushing one.
pub fn apply_action(state: &GameState, action: &Action, rng: &mut impl Rng) -> Result<GameState> {
    if !phase::allowed_in_phase(action, state.phase) {
        return Err(EngineError::InvalidPhaseForAction {
            action: action.kind_name().to_string(),
            phase: state.phase.wire_name().to_string(),
        });
    }

    if matches!(action, Action::UndoLast) {
        return undo_last(state);
    }

    current_index(state)?;

    let mut next = state.clone();
    next.push_snapshot(state.snapshot());
    dispatch(&mut next, action, rng)?;
    Ok(next)
}

fn dispatch(state: &mut GameState, action: &Action, rng: &mut impl Rng) -> Result<()> {
    match action {
        Action::RollDice { dice } => handle_roll_dice(state, *dice, rng),
        Action::EndTurn => handle_end_turn(state),
        Action::PassGo => handle_pass_go(state),
        Action::ManualPosition {
            player_id,
            position,
        } => handle_manual_position(state, player_id, *position),
        Action::GoToJail => {
            let idx = current_index(state)?;
            jail_player(state, idx, "was sent to jail")
        }
        Action::EnterJail => handle_enter_jail(state),
        Action::LeaveJail => handle_leave_jail(state),
        Action::PayJailFine => handle_pay_jail_fine(state),
        Action::UseJailCard => handle_use_jail_card(state),
        Action::BuyProperty { property_id, price } => {
            handle_buy_property(state, property_id, *price)
        }
        Action::PayRent { property_id } => handle_pay_rent(state, property_id),
        Action::CollectRent {
            from_player_id,
            to_player_id,
            amount,
            property_id,
        } => handle_collect_rent(state, from_player_id, to_player_id, *amount, property_id.as_deref()),
        Action::MortgageProperty { property_id } => handle_mortgage(state, property_id),
        Action::UnmortgageProperty { property_id } => handle_unmortgage(state, property_id),
        Action::BuyHouse { property_id, cost } => handle_buy_house(state, property_id, *cost),
        Action::SellHouse { property_id } => handle_sell_house(state, property_id),
        Action::BuyHotel { property_id, cost } => handle_buy_hotel(state, property_id, *cost),
        Action::SellHotel { property_id } => handle_sell_hotel(state, property_id),
        Action::ManualOwnership {
            property_id,
            owner_id,
        } => handle_manual_ownership(state, property_id, owner_id.as_deref()),
        Action::AdjustBalance {
            player_id,
            amount,
            reason,
        } => handle_adjust_balance(state, player_id, *amount, reason),
        Action::TransferCash {
            from_player_id,
            to_player_id,
            amount,
            reason,
        } => handle_transfer_cash(state, from_player_id, to_player_id, *amount, reason),
        Action::TradeExecute {
            from_player_id,
            to_player_id,
            cash_from,
            cash_to,
            properties_from,
            properties_to,
            jail_cards_from,
            jail_cards_to,
        } => handle_trade_execute(
            state,
            from_player_id,
            to_player_id,
            *cash_from,
            *cash_to,
            properties_from,
            properties_to,
            jail_cards_from,
            jail_cards_to,
        ),
        Action::DeclareBankruptcy {
            player_id,
            creditor,
        } => handle_declare_bankruptcy(state, player_id, creditor),
        Action::DrawCard { deck } => handle_draw_card(state, *deck, rng),
        Action::ApplyCardEffect => handle_apply_card_effect(state, rng),
        Action::TrainEventTrigger => handle_train_trigger(state, rng),
        Action::TrainEventStop { property_id } => handle_train_stop(state, property_id),
        Action::TrainEventBuy { property_id, price } => {
            handle_train_buy(state, property_id, *price)
        }
        Action::TrainEventSkip => handle_train_skip(state),
        Action::TrainEventPayRent {
            property_id,
            amount,
        } => handle_train_pay_rent(state, property_id, *amount),
        Action::ChanceEventTrigger => handle_chance_trigger(state, rng),
        Action::ChanceEventApply {
            outcome_id,
            amount,
            property_id,
            player_payments,
        } => handle_chance_apply(
            state,
            outcome_id,
            *amount,
            property_id.as_deref(),
            player_payments.as_ref(),
        ),
        Action::FreeParkingEventTrigger => handle_parking_trigger(state, rng),
        Action::FreeParkingEventAccept => handle_parking_accept(state),
        // Handled in apply_action before the snapshot push.
        Action::UndoLast => Err(EngineError::Internal("undo reached dispatch".to_string())),
    }
}

// =============================================================================
// Shared helpers
// =============================================================================

fn current_index(state: &GameState) -> Result<usize> {
    if state.current_player_index < state.players.len() {
        Ok(state.current_player_index)
    } else {
        Err(EngineError::Internal(
            "current player index out of range".to_string(),
        ))
    }
}

fn find_player_index(state: &GameState, player_id: &str) -> Result<usize> {
    state
        .player_index(player_id)
        .ok_or_else(|| EngineError::PlayerNotFound(player_id.to_string()))
}

fn insufficient(player_id: &str, required: i64, available: i64) -> EngineError {
    EngineError::InsufficientFunds {
        player_id: player_id.to_string(),
        required,
        available,
    }
}

/// Voluntary spend: fails without touching the balance when short.
fn charge(state: &mut GameState, idx: usize, amount: i64) -> Result<()> {
    let player = &state.players[idx];
    if player.balance < amount {
        return Err(insufficient(&player.id, amount, player.balance));
    }
    state.players[idx].balance -= amount;
    Ok(())
}

/// Forced debit: the balance may go negative, which parks the table in
/// bankruptcy resolution until the debt is settled.
fn forced_debit(state: &mut GameState, idx: usize, amount: i64, into_pot: bool) {
    state.players[idx].balance -= amount;
    if into_pot && state.settings.free_parking_pot {
        state.free_parking_pot += amount;
    }
    if state.players[idx].balance < 0 {
        state.phase = GamePhase::BankruptcyResolution;
    }
}

fn credit_pass_go(state: &mut GameState, idx: usize) {
    let amount = state.settings.pass_go_amount;
    let player = &state.players[idx];
    let (pid, pname) = (player.id.clone(), player.name.clone());
    state.players[idx].balance += amount;
    state.push_log(
        Transaction::new(
            TransactionKind::PassGo,
            format!("{} passed GO and collected ${}.", pname, amount),
        )
        .with_amount(amount)
        .with_from(BANK)
        .with_to(pid),
    );
}

fn release_from_jail(state: &mut GameState, idx: usize) {
    state.players[idx].in_jail = false;
    state.players[idx].jail_turns = 0;
    if state.phase == GamePhase::InJailDecision {
        state.phase = GamePhase::Normal;
    }
}

fn jail_player(state: &mut GameState, idx: usize, why: &str) -> Result<()> {
    let player = &state.players[idx];
    let (pid, pname) = (player.id.clone(), player.name.clone());
    state.players[idx].position = data::JAIL_POSITION;
    state.players[idx].in_jail = true;
    state.players[idx].jail_turns = 0;
    state.phase = GamePhase::InJailDecision;
    state.push_log(
        Transaction::new(TransactionKind::GoToJail, format!("{} {}.", pname, why)).with_from(pid),
    );
    Ok(())
}

/// Forward movement with wrap detection, then landing resolution.
fn move_by(state: &mut GameState, idx: usize, steps: usize, rng: &mut impl Rng) -> Result<()> {
    let old_pos = state.players[idx].position;
    let new_pos = (old_pos + steps) % data::BOARD_SIZE;
    move_token(state, idx, new_pos);
    if new_pos < old_pos {
        credit_pass_go(state, idx);
    }
    resolve_landing(state, idx, rng)
}

/// Absolute forward movement; `credit` pays GO money when the path wraps.
fn move_to(
    state: &mut GameState,
    idx: usize,
    target: usize,
    credit: bool,
    rng: &mut impl Rng,
) -> Result<()> {
    let old_pos = state.players[idx].position;
    move_token(state, idx, target);
    if credit && target < old_pos {
        credit_pass_go(state, idx);
    }
    resolve_landing(state, idx, rng)
}

/// Backward movement; never credits GO.
fn move_back(state: &mut GameState, idx: usize, steps: usize, rng: &mut impl Rng) -> Result<()> {
    let old_pos = state.players[idx].position;
    let new_pos = (old_pos + data::BOARD_SIZE - steps % data::BOARD_SIZE) % data::BOARD_SIZE;
    move_token(state, idx, new_pos);
    resolve_landing(state, idx, rng)
}

fn move_token(state: &mut GameState, idx: usize, new_pos: usize) {
    state.players[idx].position = new_pos;
    let player = &state.players[idx];
    let (pid, pname) = (player.id.clone(), player.name.clone());
    let space = data::space_at(new_pos);
    let space_name = space
        .map(|s| s.name.clone())
        .unwrap_or_else(|| format!("space {}", new_pos));
    let mut note = format!("{} moved to {}.", pname, space_name);
    // Purchasable landings are caller-resolved; the entry records the owner
    // for the PAY_RENT / BUY_PROPERTY follow-up.
    let landed_property = space.filter(|s| s.property.is_some());
    if let Some(space) = landed_property {
        let owner_id = state
            .property_states
            .get(&space.id)
            .and_then(|ps| ps.owner_id.clone());
        match owner_id {
            Some(owner_id) => {
                let owner_name = state
                    .players
                    .iter()
                    .find(|p| p.id == owner_id)
                    .map(|p| p.name.clone())
                    .unwrap_or(owner_id);
                note.push_str(&format!(" Owned by {}.", owner_name));
            }
            None => note.push_str(" It is unowned."),
        }
    }
    let mut entry = Transaction::new(TransactionKind::MovePlayer, note).with_from(pid);
    if let Some(space) = landed_property {
        entry = entry.with_property(space.id.clone());
    }
    state.push_log(entry);
}

/// What happens when a token stops on a space.
fn resolve_landing(state: &mut GameState, idx: usize, rng: &mut impl Rng) -> Result<()> {
    let pos = state.players[idx].position;
    let Some(space) = data::space_at(pos) else {
        return Ok(());
    };
    let kind = space.kind;
    let space_name = space.name.clone();
    let tax = space.tax;

    match kind {
        data::SpaceKind::GoToJail => jail_player(state, idx, "landed on Go To Jail"),
        data::SpaceKind::Tax => {
            let amount = tax.unwrap_or(0);
            let player = &state.players[idx];
            let (pid, pname) = (player.id.clone(), player.name.clone());
            forced_debit(state, idx, amount, true);
            state.push_log(
                Transaction::new(
                    TransactionKind::PayTax,
                    format!("{} paid {} of ${}.", pname, space_name, amount),
                )
                .with_amount(-amount)
                .with_from(pid)
                .with_to(BANK),
            );
            Ok(())
        }
        data::SpaceKind::Chance => draw_pending_card(state, idx, DeckType::Chance, rng),
        data::SpaceKind::CommunityChest => {
            draw_pending_card(state, idx, DeckType::CommunityChest, rng)
        }
        data::SpaceKind::FreeParking => {
            if state.settings.free_parking_pot && state.free_parking_pot > 0 {
                let pot = state.free_parking_pot;
                state.free_parking_pot = 0;
                let player = &state.players[idx];
                let (pid, pname) = (player.id.clone(), player.name.clone());
                state.players[idx].balance += pot;
                state.push_log(
                    Transaction::new(
                        TransactionKind::AdjustBalance,
                        format!("{} collected the ${} free-parking pot.", pname, pot),
                    )
                    .with_amount(pot)
                    .with_from(BANK)
                    .with_to(pid),
                );
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Draw from a deck into the pending-card marker and enter `CardDraw`.
fn draw_pending_card(
    state: &mut GameState,
    idx: usize,
    deck_type: DeckType,
    rng: &mut impl Rng,
) -> Result<()> {
    if state.pending_event.is_some() {
        return Err(EngineError::EventAlreadyPending);
    }
    let (deck, discard) = state.deck_mut(deck_type);
    let Some(card_id) = random::draw_card(deck, discard, rng) else {
        return Err(EngineError::Internal(format!(
            "{} deck is empty",
            deck_type.label()
        )));
    };
    let text = data::card(&card_id)
        .map(|c| c.text.clone())
        .unwrap_or_default();
    let player = &state.players[idx];
    let (pid, pname) = (player.id.clone(), player.name.clone());
    state.pending_event = Some(PendingEvent::Card {
        card_id: card_id.clone(),
        deck: deck_type,
    });
    state.phase = GamePhase::CardDraw;
    state.push_log(
        Transaction::new(
            TransactionKind::DrawCard,
            format!("{} drew a {} card: {}", pname, deck_type.label(), text),
        )
        .with_card(card_id)
        .with_from(pid),
    );
    Ok(())
}

fn move_money(state: &mut GameState, from_idx: usize, to_idx: usize, amount: i64) {
    state.players[from_idx].balance -= amount;
    state.players[to_idx].balance += amount;
}

// =============================================================================
// Turn flow
// =============================================================================

fn handle_roll_dice(
    state: &mut GameState,
    dice: Option<(u8, u8)>,
    rng: &mut impl Rng,
) -> Result<()> {
    if state.pending_event.is_some() {
        return Err(EngineError::EventAlreadyPending);
    }
    let idx = current_index(state)?;

    let dice = match dice {
        Some((a, b)) => {
            if !(1..=6).contains(&a) || !(1..=6).contains(&b) {
                return Err(EngineError::InvalidDice { die1: a, die2: b });
            }
            (a, b)
        }
        None => random::roll_dice(rng),
    };
    state.last_dice_roll = Some(dice);
    let steps = (dice.0 + dice.1) as usize;

    let player = &state.players[idx];
    let (pid, pname, jailed) = (player.id.clone(), player.name.clone(), player.in_jail);

    state.push_log(
        Transaction::new(
            TransactionKind::RollDice,
            format!("{} rolled {} + {}.", pname, dice.0, dice.1),
        )
        .with_from(&pid),
    );

    if !jailed {
        return move_by(state, idx, steps, rng);
    }

    // Jailed: doubles walk free, a third failed roll forces the fine.
    if random::is_doubles(dice) {
        release_from_jail(state, idx);
        state.push_log(
            Transaction::new(
                TransactionKind::JailRollAttempt,
                format!("{} rolled doubles and left jail.", pname),
            )
            .with_from(&pid),
        );
        return move_by(state, idx, steps, rng);
    }

    let attempts = state.players[idx].jail_turns + 1;
    if attempts < 3 {
        state.players[idx].jail_turns = attempts;
        state.push_log(
            Transaction::new(
                TransactionKind::JailRollAttempt,
                format!("{} failed escape roll {} of 3.", pname, attempts),
            )
            .with_from(&pid),
        );
        return Ok(());
    }

    let fine = state.settings.jail_fine;
    let balance = state.players[idx].balance;
    if balance < fine {
        return Err(insufficient(&pid, fine, balance));
    }
    state.push_log(
        Transaction::new(
            TransactionKind::JailRollAttempt,
            format!("{} failed escape roll 3 of 3.", pname),
        )
        .with_from(&pid),
    );
    state.players[idx].balance -= fine;
    if state.settings.free_parking_pot {
        state.free_parking_pot += fine;
    }
    state.push_log(
        Transaction::new(
            TransactionKind::JailPayFine,
            format!("{} paid the ${} fine after three failed rolls.", pname, fine),
        )
        .with_amount(-fine)
        .with_from(&pid)
        .with_to(BANK),
    );
    release_from_jail(state, idx);
    move_by(state, idx, steps, rng)
}

fn handle_end_turn(state: &mut GameState) -> Result<()> {
    let len = state.players.len();
    let current = state.current_player_index;
    let mut next_idx = (current + 1) % len;
    let mut hops = 0;
    while state.players[next_idx].is_bankrupt && hops < len {
        next_idx = (next_idx + 1) % len;
        hops += 1;
    }
    if next_idx <= current {
        state.turn_number += 1;
    }
    state.current_player_index = next_idx;
    state.phase = GamePhase::Normal;
    state.last_dice_roll = None;
    state.pending_event = None;

    let next_name = state.players[next_idx].name.clone();
    state.push_log(Transaction::new(
        TransactionKind::EndTurn,
        format!("Turn passed to {}.", next_name),
    ));
    Ok(())
}

fn handle_pass_go(state: &mut GameState) -> Result<()> {
    let idx = current_index(state)?;
    credit_pass_go(state, idx);
    Ok(())
}

fn handle_manual_position(state: &mut GameState, player_id: &str, position: usize) -> Result<()> {
    if position >= data::BOARD_SIZE {
        return Err(EngineError::PositionOutOfRange(position));
    }
    let idx = find_player_index(state, player_id)?;
    state.players[idx].position = position;
    let pname = state.players[idx].name.clone();
    let space = data::space_at(position)
        .map(|s| s.name.clone())
        .unwrap_or_default();
    state.push_log(
        Transaction::new(
            TransactionKind::ManualPosition,
            format!("{} placed on {} by the table.", pname, space),
        )
        .with_from(player_id),
    );
    Ok(())
}

// =============================================================================
// Jail
// =============================================================================

fn handle_enter_jail(state: &mut GameState) -> Result<()> {
    let idx = current_index(state)?;
    let player = &state.players[idx];
    let (pid, pname) = (player.id.clone(), player.name.clone());
    state.players[idx].in_jail = true;
    state.players[idx].jail_turns = 0;
    state.phase = GamePhase::InJailDecision;
    state.push_log(
        Transaction::new(
            TransactionKind::GoToJail,
            format!("{} marked as jailed in place.", pname),
        )
        .with_from(pid),
    );
    Ok(())
}

fn handle_leave_jail(state: &mut GameState) -> Result<()> {
    let idx = current_index(state)?;
    let player = &state.players[idx];
    let (pid, pname) = (player.id.clone(), player.name.clone());
    release_from_jail(state, idx);
    state.push_log(
        Transaction::new(
            TransactionKind::LeaveJail,
            format!("{} released from jail by the table.", pname),
        )
        .with_from(pid),
    );
    Ok(())
}

fn handle_pay_jail_fine(state: &mut GameState) -> Result<()> {
    let idx = current_index(state)?;
    let fine = state.settings.jail_fine;
    let player = &state.players[idx];
    let (pid, pname) = (player.id.clone(), player.name.clone());
    charge(state, idx, fine)?;
    if state.settings.free_parking_pot {
        state.free_parking_pot += fine;
    }
    release_from_jail(state, idx);
    state.push_log(
        Transaction::new(
            TransactionKind::JailPayFine,
            format!("{} paid the ${} jail fine.", pname, fine),
        )
        .with_amount(-fine)
        .with_from(pid)
        .with_to(BANK),
    );
    Ok(())
}

fn handle_use_jail_card(state: &mut GameState) -> Result<()> {
    let idx = current_index(state)?;
    let player = &state.players[idx];
    let (pid, pname) = (player.id.clone(), player.name.clone());

    // Chance card is spent before the chest card when both are held.
    let deck_type = if player.get_out_of_jail_chance {
        DeckType::Chance
    } else if player.get_out_of_jail_chest {
        DeckType::CommunityChest
    } else {
        return Err(EngineError::NoJailCard(pid));
    };

    match deck_type {
        DeckType::Chance => state.players[idx].get_out_of_jail_chance = false,
        DeckType::CommunityChest => state.players[idx].get_out_of_jail_chest = false,
    }
    // The card goes back into circulation via the discard pile.
    let card_id = data::jail_card_id(deck_type).map(str::to_string);
    if let Some(ref card_id) = card_id {
        let (_, discard) = state.deck_mut(deck_type);
        discard.push(card_id.clone());
    }
    release_from_jail(state, idx);

    let mut txn = Transaction::new(
        TransactionKind::JailUseCard,
        format!(
            "{} used a {} Get Out of Jail Free card.",
            pname,
            deck_type.label()
        ),
    )
    .with_from(pid);
    if let Some(card_id) = card_id {
        txn = txn.with_card(card_id);
    }
    state.push_log(txn);
    Ok(())
}

// =============================================================================
// Property
// =============================================================================

fn handle_buy_property(
    state: &mut GameState,
    property_id: &str,
    price: Option<i64>,
) -> Result<()> {
    let idx = current_index(state)?;
    let prop_data = state
        .property_data(property_id)
        .ok_or_else(|| EngineError::PropertyNotFound(property_id.to_string()))?;
    let catalog_price = prop_data.price;
    let prop_name = prop_data.name.clone();
    let price = price.unwrap_or(catalog_price);
    if price < 0 {
        return Err(EngineError::BadRequest("price must not be negative".to_string()));
    }

    let owned = state
        .property_state(property_id)
        .map(|p| p.owner_id.is_some())
        .unwrap_or(false);
    if owned {
        return Err(EngineError::PropertyAlreadyOwned(property_id.to_string()));
    }

    let player = &state.players[idx];
    let (pid, pname) = (player.id.clone(), player.name.clone());
    charge(state, idx, price)?;

    let entry = state
        .property_states
        .entry(property_id.to_string())
        .or_insert_with(|| PropertyState::vacant(property_id));
    entry.owner_id = Some(pid.clone());
    state.players[idx]
        .owned_property_ids
        .push(property_id.to_string());

    // A negotiated price re-anchors the mortgage value for this table.
    if price != catalog_price {
        if let Some(data) = state.property_data.get_mut(property_id) {
            data.price = price;
            data.mortgage_value = price / 2;
        }
    }

    state.push_log(
        Transaction::new(
            TransactionKind::BuyProperty,
            format!("{} bought {} for ${}.", pname, prop_name, price),
        )
        .with_amount(-price)
        .with_from(pid)
        .with_to(BANK)
        .with_property(property_id),
    );
    Ok(())
}

fn handle_pay_rent(state: &mut GameState, property_id: &str) -> Result<()> {
    let idx = current_index(state)?;
    let payer = &state.players[idx];
    let (payer_id, payer_name) = (payer.id.clone(), payer.name.clone());
    if payer.is_bankrupt {
        return Err(EngineError::BankruptPlayerInvolved(payer_id));
    }

    let prop_state = state
        .property_state(property_id)
        .ok_or_else(|| EngineError::PropertyNotFound(property_id.to_string()))?;
    let owner_id = prop_state
        .owner_id
        .clone()
        .ok_or_else(|| EngineError::RentNotOwed("property is unowned".to_string()))?;
    if owner_id == payer_id {
        return Err(EngineError::RentNotOwed(
            "player owns this property".to_string(),
        ));
    }
    let owner_idx = find_player_index(state, &owner_id)?;
    if state.players[owner_idx].is_bankrupt {
        return Err(EngineError::BankruptPlayerInvolved(owner_id));
    }

    let rent = match rent::rent_due(state, property_id, state.last_dice_roll)? {
        RentAmount::Amount(v) => v,
        RentAmount::RollRequired => {
            return Err(EngineError::RollRequired(property_id.to_string()))
        }
    };

    charge(state, idx, rent)?;
    state.players[owner_idx].balance += rent;

    let owner_name = state.players[owner_idx].name.clone();
    let prop_name = state
        .property_data(property_id)
        .map(|d| d.name.clone())
        .unwrap_or_else(|| property_id.to_string());
    state.push_log(
        Transaction::new(
            TransactionKind::PayRent,
            format!(
                "{} paid ${} rent for {} to {}.",
                payer_name, rent, prop_name, owner_name
            ),
        )
        .with_amount(-rent)
        .with_from(payer_id)
        .with_to(owner_id)
        .with_property(property_id),
    );
    Ok(())
}

fn handle_collect_rent(
    state: &mut GameState,
    collector_id: &str,
    payer_id: &str,
    amount: i64,
    property_id: Option<&str>,
) -> Result<()> {
    if amount < 0 {
        return Err(EngineError::BadRequest("rent must not be negative".to_string()));
    }
    let collector_idx = find_player_index(state, collector_id)?;
    let payer_idx = find_player_index(state, payer_id)?;
    if state.players[collector_idx].is_bankrupt {
        return Err(EngineError::BankruptPlayerInvolved(collector_id.to_string()));
    }
    if state.players[payer_idx].is_bankrupt {
        return Err(EngineError::BankruptPlayerInvolved(payer_id.to_string()));
    }

    let payer = &state.players[payer_idx];
    if payer.balance < amount {
        return Err(insufficient(payer_id, amount, payer.balance));
    }
    move_money(state, payer_idx, collector_idx, amount);

    let payer_name = state.players[payer_idx].name.clone();
    let collector_name = state.players[collector_idx].name.clone();
    let mut txn = Transaction::new(
        TransactionKind::PayRent,
        format!(
            "{} paid ${} rent to {} (manual entry).",
            payer_name, amount, collector_name
        ),
    )
    .with_amount(-amount)
    .with_from(payer_id)
    .with_to(collector_id);
    if let Some(property_id) = property_id {
        txn = txn.with_property(property_id);
    }
    state.push_log(txn);
    Ok(())
}

fn handle_mortgage(state: &mut GameState, property_id: &str) -> Result<()> {
    let idx = current_index(state)?;
    let pid = state.players[idx].id.clone();
    let pname = state.players[idx].name.clone();

    let prop_data = state
        .property_data(property_id)
        .ok_or_else(|| EngineError::PropertyNotFound(property_id.to_string()))?;
    let value = prop_data.mortgage_value;
    let prop_name = prop_data.name.clone();

    let prop_state = state
        .property_state(property_id)
        .ok_or_else(|| EngineError::PropertyNotFound(property_id.to_string()))?;
    if prop_state.owner_id.as_deref() != Some(pid.as_str()) {
        return Err(EngineError::NotOwner {
            property_id: property_id.to_string(),
            player_id: pid,
        });
    }
    if prop_state.mortgaged {
        return Err(EngineError::AlreadyMortgaged(property_id.to_string()));
    }
    if prop_state.houses > 0 || prop_state.hotel {
        return Err(EngineError::HasImprovements(property_id.to_string()));
    }

    if let Some(p) = state.property_state_mut(property_id) {
        p.mortgaged = true;
    }
    state.players[idx].balance += value;
    state.push_log(
        Transaction::new(
            TransactionKind::MortgageProperty,
            format!("{} mortgaged {} for ${}.", pname, prop_name, value),
        )
        .with_amount(value)
        .with_from(BANK)
        .with_to(pid)
        .with_property(property_id),
    );
    Ok(())
}

fn handle_unmortgage(state: &mut GameState, property_id: &str) -> Result<()> {
    let idx = current_index(state)?;
    let pid = state.players[idx].id.clone();
    let pname = state.players[idx].name.clone();

    let prop_data = state
        .property_data(property_id)
        .ok_or_else(|| EngineError::PropertyNotFound(property_id.to_string()))?;
    let cost = state.settings.unmortgage_cost(prop_data.mortgage_value);
    let prop_name = prop_data.name.clone();

    let prop_state = state
        .property_state(property_id)
        .ok_or_else(|| EngineError::PropertyNotFound(property_id.to_string()))?;
    if prop_state.owner_id.as_deref() != Some(pid.as_str()) {
        return Err(EngineError::NotOwner {
            property_id: property_id.to_string(),
            player_id: pid,
        });
    }
    if !prop_state.mortgaged {
        return Err(EngineError::NotMortgaged(property_id.to_string()));
    }

    charge(state, idx, cost)?;
    if let Some(p) = state.property_state_mut(property_id) {
        p.mortgaged = false;
    }
    state.push_log(
        Transaction::new(
            TransactionKind::UnmortgageProperty,
            format!("{} unmortgaged {} for ${}.", pname, prop_name, cost),
        )
        .with_amount(-cost)
        .with_from(pid)
        .with_to(BANK)
        .with_property(property_id),
    );
    Ok(())
}

fn handle_buy_house(state: &mut GameState, property_id: &str, cost: Option<i64>) -> Result<()> {
    let idx = current_index(state)?;
    let pid = state.players[idx].id.clone();
    let pname = state.players[idx].name.clone();

    let prop_data = state
        .property_data(property_id)
        .ok_or_else(|| EngineError::PropertyNotFound(property_id.to_string()))?;
    let cost = cost.unwrap_or(prop_data.house_cost);
    let prop_name = prop_data.name.clone();
    let group = prop_data.group.clone();
    let is_street = prop_data.is_street();

    let prop_state = state
        .property_state(property_id)
        .ok_or_else(|| EngineError::PropertyNotFound(property_id.to_string()))?;
    if prop_state.owner_id.as_deref() != Some(pid.as_str()) {
        return Err(EngineError::NotOwner {
            property_id: property_id.to_string(),
            player_id: pid,
        });
    }
    if !is_street {
        return Err(EngineError::NotBuildable(property_id.to_string()));
    }
    if prop_state.hotel || prop_state.houses >= MAX_HOUSES {
        return Err(EngineError::MaxImprovementReached(property_id.to_string()));
    }
    if !rent::has_monopoly(state, &pid, &group) {
        return Err(EngineError::MonopolyRequired(property_id.to_string()));
    }
    let target_level = state
        .property_state(property_id)
        .map(|p| p.houses + 1)
        .unwrap_or(1);
    if state.settings.enforce_even_building
        && !rent::even_build_allows(state, property_id, target_level)
    {
        return Err(EngineError::EvenBuildingViolation(property_id.to_string()));
    }

    charge(state, idx, cost)?;
    if let Some(p) = state.property_state_mut(property_id) {
        p.houses += 1;
    }
    let houses = state
        .property_state(property_id)
        .map(|p| p.houses)
        .unwrap_or(0);
    state.push_log(
        Transaction::new(
            TransactionKind::BuyHouse,
            format!("{} built house {} on {} for ${}.", pname, houses, prop_name, cost),
        )
        .with_amount(-cost)
        .with_from(pid)
        .with_to(BANK)
        .with_property(property_id),
    );
    Ok(())
}

fn handle_sell_house(state: &mut GameState, property_id: &str) -> Result<()> {
    let idx = current_index(state)?;
    let pid = state.players[idx].id.clone();
    let pname = state.players[idx].name.clone();

    let prop_data = state
        .property_data(property_id)
        .ok_or_else(|| EngineError::PropertyNotFound(property_id.to_string()))?;
    let refund = if prop_data.house_cost > 0 {
        prop_data.house_cost / 2
    } else {
        25
    };
    let prop_name = prop_data.name.clone();

    let prop_state = state
        .property_state(property_id)
        .ok_or_else(|| EngineError::PropertyNotFound(property_id.to_string()))?;
    if prop_state.owner_id.as_deref() != Some(pid.as_str()) {
        return Err(EngineError::NotOwner {
            property_id: property_id.to_string(),
            player_id: pid,
        });
    }
    if prop_state.houses == 0 {
        return Err(EngineError::NoImprovements(property_id.to_string()));
    }
    let target_level = prop_state.houses - 1;
    if state.settings.enforce_even_building
        && !rent::even_build_allows(state, property_id, target_level)
    {
        return Err(EngineError::EvenBuildingViolation(property_id.to_string()));
    }

    if let Some(p) = state.property_state_mut(property_id) {
        p.houses -= 1;
    }
    state.players[idx].balance += refund;
    state.push_log(
        Transaction::new(
            TransactionKind::SellHouse,
            format!("{} sold a house on {} for ${}.", pname, prop_name, refund),
        )
        .with_amount(refund)
        .with_from(BANK)
        .with_to(pid)
        .with_property(property_id),
    );
    Ok(())
}

fn handle_buy_hotel(state: &mut GameState, property_id: &str, cost: Option<i64>) -> Result<()> {
    let idx = current_index(state)?;
    let pid = state.players[idx].id.clone();
    let pname = state.players[idx].name.clone();

    let prop_data = state
        .property_data(property_id)
        .ok_or_else(|| EngineError::PropertyNotFound(property_id.to_string()))?;
    let cost = cost.unwrap_or(prop_data.hotel_cost);
    let prop_name = prop_data.name.clone();
    let group = prop_data.group.clone();
    let is_street = prop_data.is_street();

    let prop_state = state
        .property_state(property_id)
        .ok_or_else(|| EngineError::PropertyNotFound(property_id.to_string()))?;
    if prop_state.owner_id.as_deref() != Some(pid.as_str()) {
        return Err(EngineError::NotOwner {
            property_id: property_id.to_string(),
            player_id: pid,
        });
    }
    if !is_street {
        return Err(EngineError::NotBuildable(property_id.to_string()));
    }
    if prop_state.hotel {
        return Err(EngineError::MaxImprovementReached(property_id.to_string()));
    }
    if prop_state.houses != MAX_HOUSES {
        return Err(EngineError::HotelRequiresFourHouses(property_id.to_string()));
    }
    if !rent::has_monopoly(state, &pid, &group) {
        return Err(EngineError::MonopolyRequired(property_id.to_string()));
    }
    if state.settings.enforce_even_building
        && !rent::even_build_allows(state, property_id, MAX_HOUSES + 1)
    {
        return Err(EngineError::EvenBuildingViolation(property_id.to_string()));
    }

    charge(state, idx, cost)?;
    if let Some(p) = state.property_state_mut(property_id) {
        p.houses = 0;
        p.hotel = true;
    }
    state.push_log(
        Transaction::new(
            TransactionKind::BuyHotel,
            format!("{} built a hotel on {} for ${}.", pname, prop_name, cost),
        )
        .with_amount(-cost)
        .with_from(pid)
        .with_to(BANK)
        .with_property(property_id),
    );
    Ok(())
}

fn handle_sell_hotel(state: &mut GameState, property_id: &str) -> Result<()> {
    let idx = current_index(state)?;
    let pid = state.players[idx].id.clone();
    let pname = state.players[idx].name.clone();

    let prop_data = state
        .property_data(property_id)
        .ok_or_else(|| EngineError::PropertyNotFound(property_id.to_string()))?;
    let refund = if prop_data.hotel_cost > 0 {
        prop_data.hotel_cost / 2
    } else {
        50
    };
    let prop_name = prop_data.name.clone();

    let prop_state = state
        .property_state(property_id)
        .ok_or_else(|| EngineError::PropertyNotFound(property_id.to_string()))?;
    if prop_state.owner_id.as_deref() != Some(pid.as_str()) {
        return Err(EngineError::NotOwner {
            property_id: property_id.to_string(),
            player_id: pid,
        });
    }
    if !prop_state.hotel {
        return Err(EngineError::NoImprovements(property_id.to_string()));
    }

    // Selling the hotel puts the four houses back.
    if let Some(p) = state.property_state_mut(property_id) {
        p.hotel = false;
        p.houses = MAX_HOUSES;
    }
    state.players[idx].balance += refund;
    state.push_log(
        Transaction::new(
            TransactionKind::SellHotel,
            format!("{} sold the hotel on {} for ${}.", pname, prop_name, refund),
        )
        .with_amount(refund)
        .with_from(BANK)
        .with_to(pid)
        .with_property(property_id),
    );
    Ok(())
}

fn handle_manual_ownership(
    state: &mut GameState,
    property_id: &str,
    owner_id: Option<&str>,
) -> Result<()> {
    let prop_name = state
        .property_data(property_id)
        .map(|d| d.name.clone())
        .ok_or_else(|| EngineError::PropertyNotFound(property_id.to_string()))?;
    if state.property_state(property_id).is_none() {
        state
            .property_states
            .insert(property_id.to_string(), PropertyState::vacant(property_id));
    }
    let new_owner_idx = match owner_id {
        Some(id) => Some(find_player_index(state, id)?),
        None => None,
    };

    for player in &mut state.players {
        player.owned_property_ids.retain(|p| p != property_id);
    }
    let note = match new_owner_idx {
        Some(idx) => {
            let owner = state.players[idx].id.clone();
            state.players[idx]
                .owned_property_ids
                .push(property_id.to_string());
            if let Some(p) = state.property_state_mut(property_id) {
                p.owner_id = Some(owner);
            }
            format!(
                "{} assigned to {} by the table.",
                prop_name, state.players[idx].name
            )
        }
        None => {
            if let Some(p) = state.property_state_mut(property_id) {
                p.owner_id = None;
            }
            format!("{} returned to the bank by the table.", prop_name)
        }
    };

    let mut txn =
        Transaction::new(TransactionKind::ManualOwnership, note).with_property(property_id);
    if let Some(owner_id) = owner_id {
        txn = txn.with_to(owner_id);
    }
    state.push_log(txn);
    Ok(())
}

// =============================================================================
// Money & trades
// =============================================================================

fn handle_adjust_balance(
    state: &mut GameState,
    player_id: &str,
    amount: i64,
    reason: &str,
) -> Result<()> {
    let idx = find_player_index(state, player_id)?;
    state.players[idx].balance += amount;
    let pname = state.players[idx].name.clone();
    let txn = Transaction::new(
        TransactionKind::AdjustBalance,
        format!("{}: {}", pname, reason),
    )
    .with_amount(amount);
    let txn = if amount < 0 {
        txn.with_from(player_id).with_to(BANK)
    } else {
        txn.with_from(BANK).with_to(player_id)
    };
    state.push_log(txn);
    Ok(())
}

fn handle_transfer_cash(
    state: &mut GameState,
    from_player_id: &str,
    to_player_id: &str,
    amount: i64,
    reason: &str,
) -> Result<()> {
    if amount < 0 {
        return Err(EngineError::BadRequest("amount must not be negative".to_string()));
    }
    let from_idx = find_player_index(state, from_player_id)?;
    let to_idx = find_player_index(state, to_player_id)?;
    if state.players[from_idx].is_bankrupt {
        return Err(EngineError::BankruptPlayerInvolved(from_player_id.to_string()));
    }
    if state.players[to_idx].is_bankrupt {
        return Err(EngineError::BankruptPlayerInvolved(to_player_id.to_string()));
    }
    let available = state.players[from_idx].balance;
    if available < amount {
        return Err(insufficient(from_player_id, amount, available));
    }
    move_money(state, from_idx, to_idx, amount);

    let from_name = state.players[from_idx].name.clone();
    let to_name = state.players[to_idx].name.clone();
    state.push_log(
        Transaction::new(
            TransactionKind::TransferCash,
            format!("{} paid {} ${}: {}", from_name, to_name, amount, reason),
        )
        .with_amount(-amount)
        .with_from(from_player_id)
        .with_to(to_player_id),
    );
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn handle_trade_execute(
    state: &mut GameState,
    from_player_id: &str,
    to_player_id: &str,
    cash_from: i64,
    cash_to: i64,
    properties_from: &[String],
    properties_to: &[String],
    jail_cards_from: &[DeckType],
    jail_cards_to: &[DeckType],
) -> Result<()> {
    if from_player_id == to_player_id {
        return Err(EngineError::InvalidTrade("players must differ".to_string()));
    }
    if cash_from < 0 || cash_to < 0 {
        return Err(EngineError::InvalidTrade(
            "cash amounts must not be negative".to_string(),
        ));
    }
    let from_idx = find_player_index(state, from_player_id)?;
    let to_idx = find_player_index(state, to_player_id)?;
    if state.players[from_idx].is_bankrupt {
        return Err(EngineError::BankruptPlayerInvolved(from_player_id.to_string()));
    }
    if state.players[to_idx].is_bankrupt {
        return Err(EngineError::BankruptPlayerInvolved(to_player_id.to_string()));
    }

    // Validate everything before touching anything.
    for property_id in properties_from {
        if !state.players[from_idx].owns(property_id) {
            return Err(EngineError::NotOwner {
                property_id: property_id.clone(),
                player_id: from_player_id.to_string(),
            });
        }
    }
    for property_id in properties_to {
        if !state.players[to_idx].owns(property_id) {
            return Err(EngineError::NotOwner {
                property_id: property_id.clone(),
                player_id: to_player_id.to_string(),
            });
        }
    }
    if state.players[from_idx].balance < cash_from {
        return Err(insufficient(from_player_id, cash_from, state.players[from_idx].balance));
    }
    if state.players[to_idx].balance < cash_to {
        return Err(insufficient(to_player_id, cash_to, state.players[to_idx].balance));
    }
    for deck in jail_cards_from {
        if !state.players[from_idx].holds_jail_card(*deck) {
            return Err(EngineError::InvalidTrade(format!(
                "{} holds no {} jail card",
                from_player_id,
                deck.label()
            )));
        }
    }
    for deck in jail_cards_to {
        if !state.players[to_idx].holds_jail_card(*deck) {
            return Err(EngineError::InvalidTrade(format!(
                "{} holds no {} jail card",
                to_player_id,
                deck.label()
            )));
        }
    }

    move_money(state, from_idx, to_idx, cash_from);
    move_money(state, to_idx, from_idx, cash_to);
    for property_id in properties_from {
        reassign_property(state, property_id, from_idx, to_idx);
    }
    for property_id in properties_to {
        reassign_property(state, property_id, to_idx, from_idx);
    }
    // Each deck has one such card, so the giver holding it means the
    // recipient cannot already.
    for deck in jail_cards_from {
        state.players[from_idx].set_jail_card(*deck, false);
        state.players[to_idx].set_jail_card(*deck, true);
    }
    for deck in jail_cards_to {
        state.players[to_idx].set_jail_card(*deck, false);
        state.players[from_idx].set_jail_card(*deck, true);
    }

    if state.phase == GamePhase::Trade {
        state.phase = GamePhase::Normal;
    }

    let from_name = state.players[from_idx].name.clone();
    let to_name = state.players[to_idx].name.clone();
    let mut note = format!(
        "Trade between {} and {}: {} properties and ${} for {} properties and ${}.",
        from_name,
        to_name,
        properties_from.len(),
        cash_from,
        properties_to.len(),
        cash_to
    );
    if !jail_cards_from.is_empty() || !jail_cards_to.is_empty() {
        note.push_str(&format!(
            " Jail cards handed over: {} for {}.",
            jail_cards_from.len(),
            jail_cards_to.len()
        ));
    }
    state.push_log(
        Transaction::new(TransactionKind::TradeExecute, note)
            .with_from(from_player_id)
            .with_to(to_player_id),
    );
    Ok(())
}

fn reassign_property(state: &mut GameState, property_id: &str, from_idx: usize, to_idx: usize) {
    state.players[from_idx]
        .owned_property_ids
        .retain(|p| p != property_id);
    state.players[to_idx]
        .owned_property_ids
        .push(property_id.to_string());
    let new_owner = state.players[to_idx].id.clone();
    if let Some(p) = state.property_state_mut(property_id) {
        p.owner_id = Some(new_owner);
    }
}

fn handle_declare_bankruptcy(
    state: &mut GameState,
    player_id: &str,
    creditor: &Creditor,
) -> Result<()> {
    let idx = find_player_index(state, player_id)?;
    let owned = state.players[idx].owned_property_ids.clone();
    let pname = state.players[idx].name.clone();

    let (creditor_label, note) = match creditor {
        Creditor::Bank => {
            for property_id in &owned {
                if let Some(p) = state.property_state_mut(property_id) {
                    p.owner_id = None;
                    p.houses = 0;
                    p.hotel = false;
                    p.mortgaged = false;
                }
            }
            state.players[idx].owned_property_ids.clear();
            state.players[idx].balance = 0;
            (
                BANK.to_string(),
                format!("{} declared bankruptcy; estate returned to the bank.", pname),
            )
        }
        Creditor::Player(creditor_id) => {
            if creditor_id == player_id {
                return Err(EngineError::BadRequest(
                    "creditor must be a different player".to_string(),
                ));
            }
            let creditor_idx = find_player_index(state, creditor_id)?;
            if state.players[creditor_idx].is_bankrupt {
                return Err(EngineError::BankruptPlayerInvolved(creditor_id.clone()));
            }
            let balance = state.players[idx].balance;
            state.players[creditor_idx].balance += balance;
            state.players[idx].balance = 0;
            for property_id in &owned {
                reassign_property(state, property_id, idx, creditor_idx);
            }
            let creditor_name = state.players[creditor_idx].name.clone();
            (
                creditor_id.clone(),
                format!(
                    "{} declared bankruptcy; estate passed to {}.",
                    pname, creditor_name
                ),
            )
        }
    };

    state.players[idx].is_bankrupt = true;
    state.players[idx].in_jail = false;
    state.players[idx].jail_turns = 0;
    if state.phase == GamePhase::BankruptcyResolution {
        state.phase = GamePhase::Normal;
    }

    state.push_log(
        Transaction::new(TransactionKind::DeclareBankruptcy, note)
            .with_from(player_id)
            .with_to(creditor_label),
    );
    Ok(())
}

// =============================================================================
// Cards
// =============================================================================

fn handle_draw_card(state: &mut GameState, deck: DeckType, rng: &mut impl Rng) -> Result<()> {
    let idx = current_index(state)?;
    draw_pending_card(state, idx, deck, rng)
}

fn handle_apply_card_effect(state: &mut GameState, rng: &mut impl Rng) -> Result<()> {
    let Some(PendingEvent::Card { card_id, deck }) = state.pending_event.clone() else {
        return Err(EngineError::NoPendingEvent);
    };
    let card = data::card(&card_id).ok_or_else(|| EngineError::CardNotFound(card_id.clone()))?;
    let idx = current_index(state)?;
    let player = &state.players[idx];
    let (pid, pname) = (player.id.clone(), player.name.clone());

    // The marker clears first; a movement effect may set a fresh one.
    state.pending_event = None;
    state.phase = GamePhase::Normal;

    match card.effect {
        CardEffect::Money { amount } => {
            state.players[idx].balance += amount;
            let txn = Transaction::new(TransactionKind::ApplyCardEffect, card.text.clone())
                .with_amount(amount)
                .with_card(&card_id);
            let txn = if amount < 0 {
                txn.with_from(&pid).with_to(BANK)
            } else {
                txn.with_from(BANK).with_to(&pid)
            };
            state.push_log(txn);
            if state.players[idx].balance < 0 {
                state.phase = GamePhase::BankruptcyResolution;
            }
            Ok(())
        }
        CardEffect::Move { spaces } => {
            log_card_effect(state, &card_id, &card.text, &pid);
            if spaces >= 0 {
                move_by(state, idx, spaces as usize, rng)
            } else {
                move_back(state, idx, (-spaces) as usize, rng)
            }
        }
        CardEffect::MoveTo { target_position } => {
            log_card_effect(state, &card_id, &card.text, &pid);
            if target_position == data::JAIL_POSITION {
                jail_player(state, idx, "was sent directly to jail")
            } else {
                move_to(state, idx, target_position, true, rng)
            }
        }
        CardEffect::GetOutOfJail => {
            match deck {
                DeckType::Chance => state.players[idx].get_out_of_jail_chance = true,
                DeckType::CommunityChest => state.players[idx].get_out_of_jail_chest = true,
            }
            // Retained by the player: pull it back out of the discard pile.
            let (_, discard) = state.deck_mut(deck);
            if let Some(pos) = discard.iter().rposition(|c| c == &card_id) {
                discard.remove(pos);
            }
            state.push_log(
                Transaction::new(
                    TransactionKind::ApplyCardEffect,
                    format!("{} kept a Get Out of Jail Free card.", pname),
                )
                .with_card(&card_id)
                .with_from(&pid),
            );
            Ok(())
        }
        CardEffect::Repairs {
            per_house,
            per_hotel,
        } => {
            let mut houses = 0i64;
            let mut hotels = 0i64;
            for property_id in &state.players[idx].owned_property_ids {
                if let Some(p) = state.property_state(property_id) {
                    houses += p.houses as i64;
                    if p.hotel {
                        hotels += 1;
                    }
                }
            }
            let total = houses * per_house + hotels * per_hotel;
            forced_debit(state, idx, total, false);
            state.push_log(
                Transaction::new(
                    TransactionKind::ApplyCardEffect,
                    format!(
                        "{} paid ${} in repairs ({} houses, {} hotels).",
                        pname, total, houses, hotels
                    ),
                )
                .with_amount(-total)
                .with_card(&card_id)
                .with_from(&pid)
                .with_to(BANK),
            );
            Ok(())
        }
        CardEffect::AdvanceToRailroad => {
            log_card_effect(state, &card_id, &card.text, &pid);
            let target = data::nearest_railroad(state.players[idx].position);
            move_to(state, idx, target, true, rng)
        }
        CardEffect::AdvanceToUtility => {
            log_card_effect(state, &card_id, &card.text, &pid);
            let target = data::nearest_utility(state.players[idx].position);
            move_to(state, idx, target, true, rng)
        }
        CardEffect::GoBack3 => {
            log_card_effect(state, &card_id, &card.text, &pid);
            move_back(state, idx, 3, rng)
        }
    }
}

fn log_card_effect(state: &mut GameState, card_id: &str, text: &str, player_id: &str) {
    state.push_log(
        Transaction::new(TransactionKind::ApplyCardEffect, text.to_string())
            .with_card(card_id)
            .with_from(player_id),
    );
}

// =============================================================================
// Table events
// =============================================================================

fn handle_train_trigger(state: &mut GameState, rng: &mut impl Rng) -> Result<()> {
    if state.pending_event.is_some() {
        return Err(EngineError::EventAlreadyPending);
    }
    let property_id = random::roulette_property(rng).to_string();
    state.pending_event = Some(PendingEvent::Train { property_id });
    Ok(())
}

fn pending_train_property(state: &GameState) -> Result<String> {
    match &state.pending_event {
        Some(PendingEvent::Train { property_id }) => Ok(property_id.clone()),
        _ => Err(EngineError::NoPendingEvent),
    }
}

fn handle_train_stop(state: &mut GameState, property_id: &str) -> Result<()> {
    pending_train_property(state)?;
    if state.property_data(property_id).is_none() {
        return Err(EngineError::PropertyNotFound(property_id.to_string()));
    }
    state.pending_event = Some(PendingEvent::Train {
        property_id: property_id.to_string(),
    });
    Ok(())
}

fn handle_train_buy(state: &mut GameState, property_id: &str, price: i64) -> Result<()> {
    let pending = pending_train_property(state)?;
    if pending != property_id {
        return Err(EngineError::InvalidEventInput(
            "property_id does not match the pending train event",
        ));
    }
    state.pending_event = None;
    handle_buy_property(state, property_id, Some(price))
}

fn handle_train_skip(state: &mut GameState) -> Result<()> {
    pending_train_property(state)?;
    // auction_on_skip is reserved; skipping simply clears the event.
    state.pending_event = None;
    Ok(())
}

fn handle_train_pay_rent(state: &mut GameState, property_id: &str, amount: i64) -> Result<()> {
    let pending = pending_train_property(state)?;
    if pending != property_id {
        return Err(EngineError::InvalidEventInput(
            "property_id does not match the pending train event",
        ));
    }
    if amount < 0 {
        return Err(EngineError::BadRequest("rent must not be negative".to_string()));
    }

    let idx = current_index(state)?;
    let payer_id = state.players[idx].id.clone();
    let owner_id = state
        .property_state(property_id)
        .and_then(|p| p.owner_id.clone())
        .ok_or_else(|| EngineError::RentNotOwed("property is unowned".to_string()))?;
    if owner_id == payer_id {
        return Err(EngineError::RentNotOwed(
            "player owns this property".to_string(),
        ));
    }
    let owner_idx = find_player_index(state, &owner_id)?;
    if state.players[owner_idx].is_bankrupt {
        return Err(EngineError::BankruptPlayerInvolved(owner_id));
    }

    charge(state, idx, amount)?;
    state.players[owner_idx].balance += amount;
    state.pending_event = None;

    let payer_name = state.players[idx].name.clone();
    let owner_name = state.players[owner_idx].name.clone();
    let prop_name = state
        .property_data(property_id)
        .map(|d| d.name.clone())
        .unwrap_or_else(|| property_id.to_string());
    state.push_log(
        Transaction::new(
            TransactionKind::PayRent,
            format!(
                "Train event: {} paid ${} rent for {} to {}.",
                payer_name, amount, prop_name, owner_name
            ),
        )
        .with_amount(-amount)
        .with_from(payer_id)
        .with_to(owner_id)
        .with_property(property_id),
    );
    Ok(())
}

fn handle_chance_trigger(state: &mut GameState, rng: &mut impl Rng) -> Result<()> {
    if state.pending_event.is_some() {
        return Err(EngineError::EventAlreadyPending);
    }
    let all = data::outcomes();
    let outcome = &all[rng.gen_range(0..all.len())];
    state.pending_event = Some(PendingEvent::Chance {
        outcome_id: outcome.id.clone(),
    });
    Ok(())
}

fn handle_chance_apply(
    state: &mut GameState,
    outcome_id: &str,
    amount: Option<i64>,
    property_id: Option<&str>,
    player_payments: Option<&std::collections::BTreeMap<String, i64>>,
) -> Result<()> {
    let pending_id = match &state.pending_event {
        Some(PendingEvent::Chance { outcome_id }) => outcome_id.clone(),
        _ => return Err(EngineError::NoPendingEvent),
    };
    if pending_id != outcome_id {
        return Err(EngineError::InvalidEventInput(
            "outcome_id does not match the pending chance event",
        ));
    }
    let outcome =
        data::outcome(outcome_id).ok_or_else(|| EngineError::OutcomeNotFound(outcome_id.to_string()))?;
    let idx = current_index(state)?;
    let player = &state.players[idx];
    let (pid, pname) = (player.id.clone(), player.name.clone());

    use crate::data::OutcomeAction::*;
    match outcome.action {
        Receive | LuckyInvestment => {
            let value = amount.unwrap_or(outcome.amount);
            state.players[idx].balance += value;
            state.push_log(
                Transaction::new(
                    TransactionKind::AdjustBalance,
                    format!("{}: {}", outcome.name, outcome.description),
                )
                .with_amount(value)
                .with_from(BANK)
                .with_to(&pid),
            );
        }
        Pay => {
            let value = amount.unwrap_or(outcome.amount);
            forced_debit(state, idx, value, false);
            state.push_log(
                Transaction::new(
                    TransactionKind::AdjustBalance,
                    format!("{}: {}", outcome.name, outcome.description),
                )
                .with_amount(-value)
                .with_from(&pid)
                .with_to(BANK),
            );
        }
        TaxAudit => {
            // 10% of cash on hand, never negative.
            let value = amount.unwrap_or_else(|| (state.players[idx].balance / 10).max(0));
            forced_debit(state, idx, value, true);
            state.push_log(
                Transaction::new(
                    TransactionKind::PayTax,
                    format!("{}: {} paid ${}.", outcome.name, pname, value),
                )
                .with_amount(-value)
                .with_from(&pid)
                .with_to(BANK),
            );
        }
        RentReimbursement => {
            let value = amount.ok_or(EngineError::InvalidEventInput(
                "amount is required for rent reimbursement",
            ))?;
            if value < 0 {
                return Err(EngineError::BadRequest("amount must not be negative".to_string()));
            }
            state.players[idx].balance += value;
            state.push_log(
                Transaction::new(
                    TransactionKind::AdjustBalance,
                    format!("{}: {} took back ${}.", outcome.name, pname, value),
                )
                .with_amount(value)
                .with_from(BANK)
                .with_to(&pid),
            );
        }
        ReceivePerPlayer | ReceivePropertyUpgrade => {
            if outcome.action == ReceivePropertyUpgrade {
                let property_id = property_id.ok_or(EngineError::InvalidEventInput(
                    "property_id is required for this outcome",
                ))?;
                let owns = state
                    .property_state(property_id)
                    .map(|p| p.owner_id.as_deref() == Some(pid.as_str()))
                    .unwrap_or(false);
                if !owns {
                    return Err(EngineError::NotOwner {
                        property_id: property_id.to_string(),
                        player_id: pid,
                    });
                }
            }
            let payments = resolve_payments(state, &pid, player_payments, outcome.amount)?;
            for (payer_idx, value) in payments {
                forced_debit(state, payer_idx, value, false);
                state.players[idx].balance += value;
                let payer_id = state.players[payer_idx].id.clone();
                let payer_name = state.players[payer_idx].name.clone();
                let mut txn = Transaction::new(
                    TransactionKind::TransferCash,
                    format!("{}: {} paid {} ${}.", outcome.name, payer_name, pname, value),
                )
                .with_amount(-value)
                .with_from(payer_id)
                .with_to(&pid);
                if let Some(property_id) = property_id {
                    txn = txn.with_property(property_id);
                }
                state.push_log(txn);
            }
        }
        PayPerPlayer => {
            let payments = resolve_payments(state, &pid, player_payments, outcome.amount)?;
            for (recipient_idx, value) in payments {
                forced_debit(state, idx, value, false);
                state.players[recipient_idx].balance += value;
                let recipient_id = state.players[recipient_idx].id.clone();
                let recipient_name = state.players[recipient_idx].name.clone();
                state.push_log(
                    Transaction::new(
                        TransactionKind::TransferCash,
                        format!("{}: {} paid {} ${}.", outcome.name, pname, recipient_name, value),
                    )
                    .with_amount(-value)
                    .with_from(&pid)
                    .with_to(recipient_id),
                );
            }
        }
        PayPropertyRepair => {
            let property_id = property_id.ok_or(EngineError::InvalidEventInput(
                "property_id is required for this outcome",
            ))?;
            let owns = state
                .property_state(property_id)
                .map(|p| p.owner_id.as_deref() == Some(pid.as_str()))
                .unwrap_or(false);
            if !owns {
                return Err(EngineError::NotOwner {
                    property_id: property_id.to_string(),
                    player_id: pid,
                });
            }
            let value = amount.unwrap_or(outcome.amount);
            forced_debit(state, idx, value, false);
            state.push_log(
                Transaction::new(
                    TransactionKind::AdjustBalance,
                    format!("{}: {} paid ${} for repairs.", outcome.name, pname, value),
                )
                .with_amount(-value)
                .with_from(&pid)
                .with_to(BANK)
                .with_property(property_id),
            );
        }
    }

    state.pending_event = None;
    Ok(())
}

/// Per-head payment list for the per-player outcomes.
///
/// Explicit figures are validated; otherwise every other active player owes
/// the outcome's default.
fn resolve_payments(
    state: &GameState,
    current_id: &str,
    player_payments: Option<&std::collections::BTreeMap<String, i64>>,
    default_amount: i64,
) -> Result<Vec<(usize, i64)>> {
    match player_payments {
        Some(map) => {
            let mut resolved = Vec::with_capacity(map.len());
            for (player_id, value) in map {
                if player_id == current_id {
                    return Err(EngineError::InvalidEventInput(
                        "payments must involve other players",
                    ));
                }
                if *value < 0 {
                    return Err(EngineError::BadRequest(
                        "payment amounts must not be negative".to_string(),
                    ));
                }
                let idx = state
                    .player_index(player_id)
                    .ok_or_else(|| EngineError::PlayerNotFound(player_id.clone()))?;
                if state.players[idx].is_bankrupt {
                    return Err(EngineError::BankruptPlayerInvolved(player_id.clone()));
                }
                resolved.push((idx, *value));
            }
            Ok(resolved)
        }
        None => Ok(state
            .players
            .iter()
            .enumerate()
            .filter(|(_, p)| p.id != current_id && !p.is_bankrupt)
            .map(|(i, _)| (i, default_amount))
            .collect()),
    }
}

fn handle_parking_trigger(state: &mut GameState, rng: &mut impl Rng) -> Result<()> {
    if state.pending_event.is_some() {
        return Err(EngineError::EventAlreadyPending);
    }
    let prize = match random::lottery_prize(rng) {
        random::LotteryPrize::Cash(amount) => FreeParkingPrize::Cash { amount },
        random::LotteryPrize::Property(property_id) => {
            FreeParkingPrize::Property { property_id }
        }
    };
    state.pending_event = Some(PendingEvent::FreeParking { prize });
    Ok(())
}

fn handle_parking_accept(state: &mut GameState) -> Result<()> {
    let prize = match &state.pending_event {
        Some(PendingEvent::FreeParking { prize }) => prize.clone(),
        _ => return Err(EngineError::NoPendingEvent),
    };
    let idx = current_index(state)?;
    let player = &state.players[idx];
    let (pid, pname) = (player.id.clone(), player.name.clone());

    match prize {
        FreeParkingPrize::Cash { amount } => {
            state.players[idx].balance += amount;
            state.push_log(
                Transaction::new(
                    TransactionKind::AdjustBalance,
                    format!("Free-parking lottery paid {} ${}.", pname, amount),
                )
                .with_amount(amount)
                .with_from(BANK)
                .with_to(pid),
            );
        }
        FreeParkingPrize::Property { property_id } => {
            let prop_state = state
                .property_state(&property_id)
                .ok_or_else(|| EngineError::PropertyNotFound(property_id.clone()))?;
            if prop_state.owner_id.is_some() {
                // Already on someone's card: pay out cash instead.
                let amount = random::PRIZE_CONVERSION_CASH;
                state.players[idx].balance += amount;
                let prop_name = state
                    .property_data(&property_id)
                    .map(|d| d.name.clone())
                    .unwrap_or_else(|| property_id.clone());
                state.push_log(
                    Transaction::new(
                        TransactionKind::AdjustBalance,
                        format!(
                            "Free-parking lottery: {} is already owned, {} received ${} instead.",
                            prop_name, pname, amount
                        ),
                    )
                    .with_amount(amount)
                    .with_from(BANK)
                    .with_to(pid),
                );
            } else {
                if let Some(p) = state.property_state_mut(&property_id) {
                    p.owner_id = Some(pid.clone());
                }
                state.players[idx]
                    .owned_property_ids
                    .push(property_id.clone());
                let prop_name = state
                    .property_data(&property_id)
                    .map(|d| d.name.clone())
                    .unwrap_or_else(|| property_id.clone());
                state.push_log(
                    Transaction::new(
                        TransactionKind::ManualOwnership,
                        format!("{} won {} in the free-parking lottery.", pname, prop_name),
                    )
                    .with_to(pid)
                    .with_property(property_id),
                );
            }
        }
    }

    state.pending_event = None;
    Ok(())
}

// =============================================================================
// History
// =============================================================================

fn undo_last(state: &GameState) -> Result<GameState> {
    let mut history = state.history.clone();
    let Some(snapshot) = history.pop() else {
        return Err(EngineError::NoHistoryToUndo);
    };
    let mut restored = snapshot.state;
    restored.history = history;
    Ok(restored)
}
