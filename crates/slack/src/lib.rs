//! Slack boundary for the reviewer scheduler
//!
//! - **Slash Commands** (`commands`) - `/reviewer help|new|edit|schedule|bookings|find`
//! - **Actions** (`actions`) - week picker values, schedule action IDs, toggle buttons
//! - **Events** (`events`) - dispatch of commands and block actions to the scheduler
//! - **Block Kit** (`blocks`) - schedule, roster and bookings messages
//! - **Signatures** (`signature`) - `v0` request signing checks
//!
//! # Architecture
//!
//! ```text
//! Slack request → signature check → EventDispatcher → Handlers → SchedulingService
//!                                         ↓
//!                                   Block Kit UI → response_url
//! ```
//!
//! Buttons carry the state they were rendered with. Handlers invert it through
//! [`actions::ToggleButton::requested_state`] before calling the scheduler, which
//! only ever receives explicit target states.

pub mod actions;
pub mod blocks;
pub mod commands;
pub mod events;
pub mod signature;
