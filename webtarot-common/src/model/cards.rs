//! Card identity types
//!
//! A deck is 22 major arcana followed by 4 suits of 14 ranks (78 cards).

use crate::Error;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// One drawn card slot
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub arcana: Arcana,
    /// Drawn reversed
    pub flipped: bool,
}

/// Parse the command-line card notation
///
/// `fool`, `highPriestess`, `ace-of-cups`, with an optional `:r` suffix for a
/// reversed card (`queen-of-swords:r`). Names use the wire spelling.
impl FromStr for Card {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (name, flipped) = match s.strip_suffix(":r") {
            Some(name) => (name, true),
            None => (s, false),
        };
        Ok(Card {
            arcana: name.parse()?,
            flipped,
        })
    }
}

impl FromStr for Arcana {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once("-of-") {
            Some((rank, suit)) => Ok(Arcana::Minor {
                rank: wire_name(rank)?,
                suit: wire_name(suit)?,
            }),
            None => Ok(Arcana::Major {
                name: wire_name(s)?,
            }),
        }
    }
}

fn wire_name<T: DeserializeOwned>(name: &str) -> Result<T, Error> {
    serde_json::from_value(serde_json::Value::String(name.to_string()))
        .map_err(|_| Error::InvalidInput(format!("Unknown card name: {}", name)))
}

impl Display for Card {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.flipped {
            write!(f, "{} (reversed)", self.arcana)
        } else {
            write!(f, "{}", self.arcana)
        }
    }
}

/// Card identity
///
/// Wire shapes:
/// - `{"major":{"name":"fool"}}`
/// - `{"minor":{"rank":"ace","suit":"cups"}}`
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Arcana {
    Major { name: MajorArcana },
    Minor { rank: Rank, suit: Suit },
}

impl Arcana {
    /// Every card of the deck in deck order
    pub fn all() -> Vec<Arcana> {
        let mut cards = Vec::with_capacity(78);
        cards.extend(MajorArcana::ALL.iter().map(|&name| Arcana::Major { name }));
        for &suit in Suit::ALL.iter() {
            for &rank in Rank::ALL.iter() {
                cards.push(Arcana::Minor { rank, suit });
            }
        }
        cards
    }

    pub fn is_major(&self) -> bool {
        matches!(self, Arcana::Major { .. })
    }
}

impl Display for Arcana {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Arcana::Major { name } => write!(f, "{}", name),
            Arcana::Minor { rank, suit } => write!(f, "{} of {}", rank, suit),
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MajorArcana {
    Fool,
    Magician,
    HighPriestess,
    Empress,
    Emperor,
    Hierophant,
    Lovers,
    Chariot,
    Strength,
    Hermit,
    WheelOfFortune,
    Justice,
    HangedMan,
    Death,
    Temperance,
    Devil,
    Tower,
    Star,
    Moon,
    Sun,
    Judgement,
    World,
}

impl MajorArcana {
    pub const ALL: [MajorArcana; 22] = [
        MajorArcana::Fool,
        MajorArcana::Magician,
        MajorArcana::HighPriestess,
        MajorArcana::Empress,
        MajorArcana::Emperor,
        MajorArcana::Hierophant,
        MajorArcana::Lovers,
        MajorArcana::Chariot,
        MajorArcana::Strength,
        MajorArcana::Hermit,
        MajorArcana::WheelOfFortune,
        MajorArcana::Justice,
        MajorArcana::HangedMan,
        MajorArcana::Death,
        MajorArcana::Temperance,
        MajorArcana::Devil,
        MajorArcana::Tower,
        MajorArcana::Star,
        MajorArcana::Moon,
        MajorArcana::Sun,
        MajorArcana::Judgement,
        MajorArcana::World,
    ];
}

impl Display for MajorArcana {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            MajorArcana::Fool => "The Fool",
            MajorArcana::Magician => "The Magician",
            MajorArcana::HighPriestess => "The High Priestess",
            MajorArcana::Empress => "The Empress",
            MajorArcana::Emperor => "The Emperor",
            MajorArcana::Hierophant => "The Hierophant",
            MajorArcana::Lovers => "The Lovers",
            MajorArcana::Chariot => "The Chariot",
            MajorArcana::Strength => "Strength",
            MajorArcana::Hermit => "The Hermit",
            MajorArcana::WheelOfFortune => "Wheel of Fortune",
            MajorArcana::Justice => "Justice",
            MajorArcana::HangedMan => "The Hanged Man",
            MajorArcana::Death => "Death",
            MajorArcana::Temperance => "Temperance",
            MajorArcana::Devil => "The Devil",
            MajorArcana::Tower => "The Tower",
            MajorArcana::Star => "The Star",
            MajorArcana::Moon => "The Moon",
            MajorArcana::Sun => "The Sun",
            MajorArcana::Judgement => "Judgement",
            MajorArcana::World => "The World",
        };
        f.write_str(label)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Rank {
    Ace,
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Page,
    Knight,
    Queen,
    King,
}

impl Rank {
    pub const ALL: [Rank; 14] = [
        Rank::Ace,
        Rank::Two,
        Rank::Three,
        Rank::Four,
        Rank::Five,
        Rank::Six,
        Rank::Seven,
        Rank::Eight,
        Rank::Nine,
        Rank::Ten,
        Rank::Page,
        Rank::Knight,
        Rank::Queen,
        Rank::King,
    ];
}

impl Display for Rank {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Rank::Ace => "Ace",
            Rank::Two => "Two",
            Rank::Three => "Three",
            Rank::Four => "Four",
            Rank::Five => "Five",
            Rank::Six => "Six",
            Rank::Seven => "Seven",
            Rank::Eight => "Eight",
            Rank::Nine => "Nine",
            Rank::Ten => "Ten",
            Rank::Page => "Page",
            Rank::Knight => "Knight",
            Rank::Queen => "Queen",
            Rank::King => "King",
        };
        f.write_str(label)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Suit {
    Cups,
    Pentacles,
    Swords,
    Wands,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Cups, Suit::Pentacles, Suit::Swords, Suit::Wands];
}

impl Display for Suit {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Suit::Cups => "Cups",
            Suit::Pentacles => "Pentacles",
            Suit::Swords => "Swords",
            Suit::Wands => "Wands",
        };
        f.write_str(label)
    }
}
