//! # Shared Bus - In-Process Event Bus
//!
//! Notifications that leave the ledger core for its collaborators:
//!
//! ```text
//! ┌──────────────┐  BlockVerification   ┌──────────────┐
//! │ Chain / Casper│ ──────┐             │ Vote gossip   │
//! └──────────────┘       │             └──────────────┘
//! ┌──────────────┐       ▼                    ↑
//! │  Tx Pool     │ ─▶ ┌──────────────┐        │
//! └──────────────┘    │  Event Bus   │ ───────┘
//!                     └──────────────┘  subscribe()
//! ```
//!
//! Publishing never blocks and never fails: with no subscribers the event
//! is dropped and a warning is logged.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod events;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use events::{EventFilter, EventTopic, LedgerEvent};
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::{Subscription, SubscriptionError};

/// Maximum events to buffer per subscriber before it starts lagging.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
