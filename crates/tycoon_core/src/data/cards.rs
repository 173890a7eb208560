//! Chance / Community Chest card catalog loading.

use std::sync::OnceLock;

use serde::Deserialize;

use crate::models::{Card, CardEffect, DeckType};

/// Card decks (compile-time embedded).
pub const CARDS_YAML: &str = include_str!("../../../../data/cards.yaml");

#[derive(Deserialize)]
struct RawCards {
    chance: Vec<RawCard>,
    community_chest: Vec<RawCard>,
}

#[derive(Deserialize)]
struct RawCard {
    id: String,
    text: String,
    effect: CardEffect,
}

struct CardCatalog {
    chance: Vec<Card>,
    community_chest: Vec<Card>,
}

static CATALOG: OnceLock<CardCatalog> = OnceLock::new();

fn catalog() -> &'static CardCatalog {
    CATALOG.get_or_init(|| {
        let raw: RawCards = serde_yaml::from_str(CARDS_YAML).expect("Failed to parse cards.yaml");
        let build = |cards: Vec<RawCard>, deck: DeckType| -> Vec<Card> {
            cards
                .into_iter()
                .map(|c| Card {
                    id: c.id,
                    deck,
                    text: c.text,
                    effect: c.effect,
                })
                .collect()
        };
        CardCatalog {
            chance: build(raw.chance, DeckType::Chance),
            community_chest: build(raw.community_chest, DeckType::CommunityChest),
        }
    })
}

/// All cards of one deck in catalog order.
pub fn deck_cards(deck: DeckType) -> &'static [Card] {
    match deck {
        DeckType::Chance => &catalog().chance,
        DeckType::CommunityChest => &catalog().community_chest,
    }
}

pub fn card(card_id: &str) -> Option<&'static Card> {
    catalog()
        .chance
        .iter()
        .chain(catalog().community_chest.iter())
        .find(|c| c.id == card_id)
}

/// Id of the Get Out of Jail Free card in one deck.
pub fn jail_card_id(deck: DeckType) -> Option<&'static str> {
    deck_cards(deck)
        .iter()
        .find(|c| c.effect == CardEffect::GetOutOfJail)
        .map(|c| c.id.as_str())
}
