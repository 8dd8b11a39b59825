//! Command handlers for CLI subcommands
//!
//! This module contains the implementation logic for each CLI subcommand.

mod check;
mod completions;
mod inspect;
mod negotiate;
mod transform;
mod utils;

pub use check::handle_check;
pub use completions::handle_completions;
pub use inspect::{handle_changes, handle_fields};
pub use negotiate::handle_negotiate;
pub use transform::{handle_downgrade, handle_upgrade};
