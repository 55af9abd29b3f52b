//! content::guestbook
//!
//! Guestbook messages and the message list document.
//!
//! # Composition
//!
//! Visitors submit a [`MessageDraft`]. After validation it becomes a
//! [`GuestbookMessage`] with a generated id, a timestamp, a colour from the
//! site [`PALETTE`], a board [`Position`] and a display scale. Placement
//! avoids covering more than half of an existing card where it can.

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{ContentError, Document};

/// Card colours, as used by the guestbook board.
pub const PALETTE: [&str; 15] = [
    "#FF6B6B", "#4ECDC4", "#45B7D1", "#FFA07A", "#98D8C8", "#F7DC6F", "#BB8FCE", "#85C1E2",
    "#F8B739", "#52B788", "#FCC841", "#DFEFFC", "#DEDE92", "#DE4331", "#FE9750",
];

/// Horizontal bounds of a card's position, in percent of the board.
pub const X_RANGE: (f64, f64) = (2.0, 90.0);

/// Vertical bounds of a card's position, in percent of the board.
pub const Y_RANGE: (f64, f64) = (10.0, 85.0);

/// Display scale bounds (lower inclusive, upper exclusive).
pub const SCALE_RANGE: (f64, f64) = (0.85, 1.15);

/// Card footprint in percent of the board.
const CARD_WIDTH: f64 = 12.0;
const CARD_HEIGHT: f64 = 8.0;

const PLACEMENT_ATTEMPTS: usize = 50;
const MAX_OVERLAP: f64 = 0.5;

/// Position of a message card on the board, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    #[serde(serialize_with = "whole_as_integer")]
    pub x: f64,
    #[serde(serialize_with = "whole_as_integer")]
    pub y: f64,
}

impl Position {
    /// Pick a position for a new card given the cards already on the board.
    ///
    /// The spread grows with the number of messages. Up to 50 candidates are
    /// tried; the first one overlapping no existing card by more than half
    /// wins, otherwise the last candidate is used.
    pub fn place<R: Rng + ?Sized>(existing: &[GuestbookMessage], rng: &mut R) -> Self {
        let total = existing.len() + 1;
        let (range_x, range_y) = match total {
            0..=5 => (25.0, 20.0),
            6..=10 => (35.0, 30.0),
            11..=20 => (45.0, 40.0),
            _ => (48.0, 47.0),
        };

        let mut candidate = Self::candidate(range_x, range_y, rng);
        for _ in 1..PLACEMENT_ATTEMPTS {
            if existing
                .iter()
                .all(|m| candidate.overlap_ratio(&m.position) <= MAX_OVERLAP)
            {
                return candidate;
            }
            candidate = Self::candidate(range_x, range_y, rng);
        }
        candidate
    }

    fn candidate<R: Rng + ?Sized>(range_x: f64, range_y: f64, rng: &mut R) -> Self {
        let x = 50.0 + rng.random_range(-1.0..1.0) * range_x;
        let y = 50.0 + rng.random_range(-1.0..1.0) * range_y;
        Self {
            x: x.clamp(X_RANGE.0, X_RANGE.1),
            y: y.clamp(Y_RANGE.0, Y_RANGE.1),
        }
    }

    /// Fraction of a card's area covered when placed here over `other`.
    fn overlap_ratio(&self, other: &Position) -> f64 {
        let overlap_x =
            ((self.x + CARD_WIDTH).min(other.x + CARD_WIDTH) - self.x.max(other.x)).max(0.0);
        let overlap_y =
            ((self.y + CARD_HEIGHT).min(other.y + CARD_HEIGHT) - self.y.max(other.y)).max(0.0);
        (overlap_x * overlap_y) / (CARD_WIDTH * CARD_HEIGHT)
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// A single guestbook entry as stored in the message list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuestbookMessage {
    pub id: String,
    pub nickname: String,
    pub content: String,
    /// Kept as written; new messages use `2024-05-01T12:30:45.000Z`.
    pub timestamp: String,
    pub color: String,
    #[serde(flatten)]
    pub position: Position,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "optional_whole_as_integer"
    )]
    pub scale: Option<f64>,
}

impl GuestbookMessage {
    /// Turn a validated draft into a message placed among `existing`.
    pub fn compose<R: Rng + ?Sized>(
        draft: &MessageDraft,
        existing: &[GuestbookMessage],
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Self {
        let now = now.trunc_subsecs(3);
        let suffix: u64 = rng.random::<u64>() & ((1 << 52) - 1);
        let position = Position::place(existing, rng);
        let color = PALETTE[rng.random_range(0..PALETTE.len())];
        let scale = rng.random_range(SCALE_RANGE.0..SCALE_RANGE.1);

        Self {
            id: format!("{}-{:x}", now.timestamp_millis(), suffix),
            nickname: draft.nickname.clone(),
            content: draft.content.clone(),
            timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            color: color.to_string(),
            position,
            scale: Some(scale),
        }
    }
}

/// Largest magnitude below which every whole `f64` is an exact integer.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

// The site writes numbers the way JavaScript does, `50` rather than `50.0`.
// Re-encoding a list must not rewrite entries it only passed through.
fn whole_as_integer<S: serde::Serializer>(value: &f64, s: S) -> Result<S::Ok, S::Error> {
    if value.fract() == 0.0 && value.abs() <= MAX_SAFE_INTEGER {
        s.serialize_i64(*value as i64)
    } else {
        s.serialize_f64(*value)
    }
}

fn optional_whole_as_integer<S: serde::Serializer>(
    value: &Option<f64>,
    s: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(v) => whole_as_integer(v, s),
        None => s.serialize_none(),
    }
}

/// A message as submitted by a visitor, before it is placed on the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageDraft {
    nickname: String,
    content: String,
}

impl MessageDraft {
    /// Validate and normalize a submission.
    ///
    /// Nickname and content are trimmed and must be non-empty. The length
    /// limit applies to the content as submitted, before trimming, counted
    /// in UTF-16 code units as the site's form counts it.
    pub fn new(nickname: &str, content: &str, max_chars: usize) -> Result<Self, ContentError> {
        let len = content.encode_utf16().count();
        let nickname = nickname.trim();
        let content = content.trim();

        if nickname.is_empty() {
            return Err(ContentError::Invalid("nickname is required".into()));
        }
        if content.is_empty() {
            return Err(ContentError::Invalid("message content is required".into()));
        }
        if len > max_chars {
            return Err(ContentError::Invalid(format!(
                "message is {len} characters, the limit is {max_chars}"
            )));
        }

        Ok(Self {
            nickname: nickname.to_string(),
            content: content.to_string(),
        })
    }

    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

/// The full, ordered message list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Guestbook(Vec<GuestbookMessage>);

impl Guestbook {
    pub fn new(messages: Vec<GuestbookMessage>) -> Self {
        Self(messages)
    }

    /// Append a message at the end of the list.
    pub fn push(&mut self, message: GuestbookMessage) {
        self.0.push(message);
    }

    pub fn messages(&self) -> &[GuestbookMessage] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Ids in list order.
    pub fn ids(&self) -> Vec<&str> {
        self.0.iter().map(|m| m.id.as_str()).collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.iter().any(|m| m.id == id)
    }
}

impl Document for Guestbook {
    // serde_json writes NaN and infinities as `null`, which would not decode
    // back into a position.
    fn encode(&self) -> Result<Vec<u8>, ContentError> {
        if let Some(bad) = self
            .0
            .iter()
            .find(|m| !m.position.is_finite() || m.scale.is_some_and(|s| !s.is_finite()))
        {
            return Err(ContentError::Encode(format!(
                "message {} has a non-finite position or scale",
                bad.id
            )));
        }
        serde_json::to_vec_pretty(self).map_err(|e| ContentError::Encode(e.to_string()))
    }
}
