//! Cards, the deck, and five-card hand evaluation.
//!
//! A hand is scored into a [`HandScore`]: a vector whose first element is the
//! [`HandCategory`] ordinal (0 = high card … 8 = straight flush) followed by
//! tie-break values, most significant first.  Two scores compare
//! element-wise, with missing trailing elements treated as zero.
//!
//! # Examples
//!
//! ```
//! use draw_core::poker::{Card, CardNumber, CardSuit, HandCategory, evaluate};
//!
//! let hand = [
//!     Card(CardNumber::Queen, CardSuit::Spades),
//!     Card(CardNumber::Queen, CardSuit::Hearts),
//!     Card(CardNumber::Queen, CardSuit::Clubs),
//!     Card(CardNumber::Four, CardSuit::Diamonds),
//!     Card(CardNumber::Four, CardSuit::Spades),
//! ];
//! let score = evaluate(&hand);
//! assert_eq!(score.category(), HandCategory::FullHouse);
//! assert_eq!(score.name(), "Full");
//! ```

use rand::Rng;
use rand::seq::SliceRandom;
use std::cmp::Ordering;
use std::fmt;

/// Number of cards in a draw-poker hand.
pub const HAND_SIZE: usize = 5;

/// Represents a card suit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CardSuit {
    Clubs,
    Diamonds,
    Hearts,
    Spades,
}

impl CardSuit {
    /// All suits in deck order
    pub const ALL: [CardSuit; 4] = [
        CardSuit::Clubs,
        CardSuit::Diamonds,
        CardSuit::Hearts,
        CardSuit::Spades,
    ];

    /// Returns the suit as a display symbol
    pub fn symbol(&self) -> &'static str {
        match self {
            CardSuit::Clubs => "♣",
            CardSuit::Diamonds => "♦",
            CardSuit::Hearts => "♥",
            CardSuit::Spades => "♠",
        }
    }
}

/// Represents a card rank (2-14, where 14 = Ace).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CardNumber {
    Two = 2,
    Three = 3,
    Four = 4,
    Five = 5,
    Six = 6,
    Seven = 7,
    Eight = 8,
    Nine = 9,
    Ten = 10,
    Jack = 11,
    Queen = 12,
    King = 13,
    Ace = 14,
}

impl CardNumber {
    /// All ranks, lowest first
    pub const ALL: [CardNumber; 13] = [
        CardNumber::Two,
        CardNumber::Three,
        CardNumber::Four,
        CardNumber::Five,
        CardNumber::Six,
        CardNumber::Seven,
        CardNumber::Eight,
        CardNumber::Nine,
        CardNumber::Ten,
        CardNumber::Jack,
        CardNumber::Queen,
        CardNumber::King,
        CardNumber::Ace,
    ];

    /// Numeric value used for scoring (2..=14).
    pub fn value(self) -> u8 {
        self as u8
    }

    /// Returns the rank as it is printed on the card
    pub fn symbol(&self) -> &'static str {
        match self {
            CardNumber::Two => "2",
            CardNumber::Three => "3",
            CardNumber::Four => "4",
            CardNumber::Five => "5",
            CardNumber::Six => "6",
            CardNumber::Seven => "7",
            CardNumber::Eight => "8",
            CardNumber::Nine => "9",
            CardNumber::Ten => "10",
            CardNumber::Jack => "J",
            CardNumber::Queen => "Q",
            CardNumber::King => "K",
            CardNumber::Ace => "A",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Card(pub CardNumber, pub CardSuit);

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.0.symbol(), self.1.symbol())
    }
}

impl Card {
    pub fn number(&self) -> CardNumber {
        self.0
    }

    pub fn suit(&self) -> CardSuit {
        self.1
    }

    pub fn value(&self) -> u8 {
        self.0.value()
    }
}

/// All 52 cards in rank-major order.
pub fn get_all_cards() -> Vec<Card> {
    CardNumber::ALL
        .iter()
        .flat_map(|&n| CardSuit::ALL.iter().map(move |&s| Card(n, s)))
        .collect()
}

/// The cards left to deal in the current hand.
///
/// Cards only ever leave from the top (the end of the vector).  Discards are
/// burned, never put back.
#[derive(Debug, Clone, Default)]
pub struct Deck {
    cards: Vec<Card>,
}

impl Deck {
    /// A freshly shuffled 52-card deck.
    pub fn shuffled<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut cards = get_all_cards();
        cards.shuffle(rng);
        Self { cards }
    }

    /// A deck with a fixed order.  The **last** card is dealt first.
    pub fn from_cards(cards: Vec<Card>) -> Self {
        Self { cards }
    }

    /// Take the top card.
    pub fn draw(&mut self) -> Option<Card> {
        self.cards.pop()
    }

    pub fn remaining(&self) -> usize {
        self.cards.len()
    }

    pub fn contains(&self, card: &Card) -> bool {
        self.cards.contains(card)
    }
}

/// Hand categories, from lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HandCategory {
    HighCard = 0,
    Pair = 1,
    TwoPair = 2,
    ThreeOfAKind = 3,
    Straight = 4,
    Flush = 5,
    FullHouse = 6,
    FourOfAKind = 7,
    StraightFlush = 8,
}

impl HandCategory {
    const ALL: [HandCategory; 9] = [
        HandCategory::HighCard,
        HandCategory::Pair,
        HandCategory::TwoPair,
        HandCategory::ThreeOfAKind,
        HandCategory::Straight,
        HandCategory::Flush,
        HandCategory::FullHouse,
        HandCategory::FourOfAKind,
        HandCategory::StraightFlush,
    ];

    pub fn from_ordinal(ordinal: u8) -> Option<HandCategory> {
        Self::ALL.get(ordinal as usize).copied()
    }

    /// Short name shown to players.
    pub fn name(self) -> &'static str {
        match self {
            HandCategory::HighCard => "High Card",
            HandCategory::Pair => "Pair",
            HandCategory::TwoPair => "Two Pair",
            HandCategory::ThreeOfAKind => "Trips",
            HandCategory::Straight => "Straight",
            HandCategory::Flush => "Flush",
            HandCategory::FullHouse => "Full",
            HandCategory::FourOfAKind => "Quads",
            HandCategory::StraightFlush => "Straight Flush",
        }
    }
}

impl fmt::Display for HandCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Comparable score of a five-card hand.
#[derive(Debug, Clone, Eq)]
pub struct HandScore(Vec<u8>);

impl HandScore {
    /// Wrap a raw score vector.  The first element must be a category ordinal.
    pub fn from_vec(values: Vec<u8>) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[u8] {
        &self.0
    }

    pub fn category(&self) -> HandCategory {
        self.0
            .first()
            .and_then(|&c| HandCategory::from_ordinal(c))
            .unwrap_or(HandCategory::HighCard)
    }

    pub fn name(&self) -> &'static str {
        self.category().name()
    }
}

impl Ord for HandScore {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.0.len().max(other.0.len());
        for i in 0..len {
            let a = self.0.get(i).copied().unwrap_or(0);
            let b = other.0.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => continue,
                unequal => return unequal,
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for HandScore {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for HandScore {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

/// Highest card of a straight, if the five values form one.
///
/// `values` must be sorted descending.  The wheel (A-2-3-4-5) counts as a
/// five-high straight.
fn straight_high(values: &[u8; HAND_SIZE]) -> Option<u8> {
    if values.windows(2).all(|w| w[0] == w[1] + 1) {
        return Some(values[0]);
    }
    if *values == [14, 5, 4, 3, 2] {
        return Some(5);
    }
    None
}

/// Score exactly five cards.
pub fn evaluate(cards: &[Card; HAND_SIZE]) -> HandScore {
    let mut values = cards.map(|c| c.value());
    values.sort_unstable_by(|a, b| b.cmp(a));

    let is_flush = cards.iter().all(|c| c.suit() == cards[0].suit());
    let straight = straight_high(&values);

    // (count, value), count desc then value desc
    let mut groups: Vec<(u8, u8)> = Vec::with_capacity(HAND_SIZE);
    for &v in &values {
        match groups.iter_mut().find(|(_, gv)| *gv == v) {
            Some((count, _)) => *count += 1,
            None => groups.push((1, v)),
        }
    }
    groups.sort_by(|a, b| b.0.cmp(&a.0).then(b.1.cmp(&a.1)));
    let kickers = || groups.iter().filter(|(c, _)| *c == 1).map(|&(_, v)| v);

    let mut score = Vec::with_capacity(HAND_SIZE + 1);
    match (is_flush, straight, groups[0].0, groups.get(1).map(|g| g.0)) {
        (true, Some(high), _, _) => score.extend([8, high]),
        (_, _, 4, _) => score.extend([7, groups[0].1, groups[1].1]),
        (_, _, 3, Some(2)) => score.extend([6, groups[0].1, groups[1].1]),
        (true, None, _, _) => {
            score.push(5);
            score.extend(values);
        }
        (false, Some(high), _, _) => score.extend([4, high]),
        (_, _, 3, _) => {
            score.extend([3, groups[0].1]);
            score.extend(kickers());
        }
        (_, _, 2, Some(2)) => score.extend([2, groups[0].1, groups[1].1, groups[2].1]),
        (_, _, 2, _) => {
            score.extend([1, groups[0].1]);
            score.extend(kickers());
        }
        _ => {
            score.push(0);
            score.extend(values);
        }
    }
    HandScore(score)
}

/// Score a dealt hand given as a slice; `None` unless it holds exactly five cards.
pub fn evaluate_slice(cards: &[Card]) -> Option<HandScore> {
    let hand: &[Card; HAND_SIZE] = cards.try_into().ok()?;
    Some(evaluate(hand))
}
