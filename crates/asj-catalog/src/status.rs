//! Piece lifecycle state machine.
//!
//! Every status change is applied via [`PieceState::apply`], which enforces
//! that only legal transitions occur. Illegal events return
//! [`StatusTransitionError`]; callers surface these as validation failures.
//!
//! # State diagram
//!
//! ```text
//!   NotInShow ──Lock──► NotInShowLocked
//!       │ ▲                  │
//!       │ └────Unlock────────┘
//!       │
//!   AssignLocation
//!       ▼
//!    InShow ──MarkWon──► Won ──MarkSold──► Sold (terminal)
//!       │ ▲               │
//!       │ └───ClearWon────┘
//!       │
//!   MarkReturned ──► Returned (terminal)
//! ```
//!
//! Clearing the location demotes InShow back to NotInShow (a piece cannot be
//! "in show" without a panel location), mirroring the location-driven
//! promotion on assignment. Won/Sold/Returned ignore location changes — the
//! show has closed by then.

/// All valid states a piece can occupy during the show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PieceStatus {
    /// Entered in the system, not yet delivered to the show floor.
    NotInShow,
    /// As NotInShow, but frozen against artist edits (bid sheets printed).
    NotInShowLocked,
    /// Hung at a location; open for bids.
    InShow,
    /// Closed with a winning silent bid.
    Won,
    /// Invoiced and paid for. **Terminal.**
    Sold,
    /// Returned to the artist unsold. **Terminal.**
    Returned,
}

impl PieceStatus {
    /// Returns `true` if no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Sold | Self::Returned)
    }

    /// `true` while the artist may still edit the piece's details.
    pub fn is_artist_editable(&self) -> bool {
        matches!(self, Self::NotInShow)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PieceStatus::NotInShow => "NOT_IN_SHOW",
            PieceStatus::NotInShowLocked => "NOT_IN_SHOW_LOCKED",
            PieceStatus::InShow => "IN_SHOW",
            PieceStatus::Won => "WON",
            PieceStatus::Sold => "SOLD",
            PieceStatus::Returned => "RETURNED",
        }
    }

    pub fn parse(s: &str) -> Result<Self, StatusTransitionError> {
        match s {
            "NOT_IN_SHOW" => Ok(PieceStatus::NotInShow),
            "NOT_IN_SHOW_LOCKED" => Ok(PieceStatus::NotInShowLocked),
            "IN_SHOW" => Ok(PieceStatus::InShow),
            "WON" => Ok(PieceStatus::Won),
            "SOLD" => Ok(PieceStatus::Sold),
            "RETURNED" => Ok(PieceStatus::Returned),
            other => Err(StatusTransitionError {
                from: None,
                event: format!("parse({other:?})"),
            }),
        }
    }
}

/// Events that drive piece status transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PieceEvent {
    /// A floor location was written onto the piece.
    AssignLocation,
    /// The piece's location was cleared.
    ClearLocation,
    /// Freeze artist edits ahead of bid-sheet printing.
    Lock,
    /// Release the printing freeze.
    Unlock,
    /// Close-stage promotion found a qualifying top bid.
    MarkWon,
    /// Staff action reverting a premature Won marking.
    ClearWon,
    /// Cashier invoiced the piece.
    MarkSold,
    /// Close-out returned the piece to the artist.
    MarkReturned,
}

/// Returned when an event cannot legally be applied in the current status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusTransitionError {
    /// Status when the illegal event arrived; `None` for parse failures.
    pub from: Option<PieceStatus>,
    pub event: String,
}

impl std::fmt::Display for StatusTransitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.from {
            Some(from) => write!(f, "illegal piece transition: {} + {}", from.as_str(), self.event),
            None => write!(f, "invalid piece status: {}", self.event),
        }
    }
}

impl std::error::Error for StatusTransitionError {}

/// A piece's lifecycle position: status plus whether a location is set.
///
/// Location presence gates the NotInShow ↔ InShow pair, so the two travel
/// together through the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PieceState {
    pub status: PieceStatus,
    pub has_location: bool,
}

impl PieceState {
    /// A freshly registered piece: not in show, no location.
    pub fn new() -> Self {
        PieceState {
            status: PieceStatus::NotInShow,
            has_location: false,
        }
    }

    pub fn with_status(status: PieceStatus, has_location: bool) -> Self {
        PieceState { status, has_location }
    }

    /// Apply an event, returning the updated state.
    ///
    /// # Errors
    /// [`StatusTransitionError`] for illegal transitions; the state is left
    /// unchanged (method takes `self` by value).
    pub fn apply(mut self, event: PieceEvent) -> Result<PieceState, StatusTransitionError> {
        use PieceEvent::*;
        use PieceStatus::*;

        match (self.status, &event) {
            // Location assignment hangs the piece: NotInShow -> InShow.
            (NotInShow, AssignLocation) => {
                self.status = InShow;
                self.has_location = true;
            }
            // Re-hanging an InShow piece at a new location is a no-op here.
            (InShow, AssignLocation) => self.has_location = true,
            // Locked pieces keep their status; the location sticks for later.
            (NotInShowLocked, AssignLocation) => self.has_location = true,
            // Post-close statuses ignore location churn.
            (Won | Sold | Returned, AssignLocation) => self.has_location = true,

            (InShow, ClearLocation) => {
                self.status = NotInShow;
                self.has_location = false;
            }
            (NotInShow | NotInShowLocked, ClearLocation) => self.has_location = false,

            (NotInShow, Lock) => self.status = NotInShowLocked,
            (NotInShowLocked, Unlock) => self.status = NotInShow,

            (InShow, MarkWon) => self.status = Won,
            (Won, ClearWon) => self.status = InShow,
            (Won, MarkSold) => self.status = Sold,
            (InShow, MarkReturned) => self.status = Returned,

            (status, ev) => {
                return Err(StatusTransitionError {
                    from: Some(status),
                    event: format!("{ev:?}"),
                });
            }
        }

        Ok(self)
    }
}

impl Default for PieceState {
    fn default() -> Self {
        Self::new()
    }
}
