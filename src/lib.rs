//! # Bill Splitter
//!
//! Turns a monthly family-plan phone bill into per-owner shares and records
//! it once in a shared-expense ledger.
//!
//! ## Core Concepts
//!
//! - **Draft**: the loosely typed bill a language model pulls out of the PDF text
//! - **Normalization**: validates the draft, resolves phone numbers to owners and
//!   flags totals that do not add up
//! - **Allocation**: line charges stay with the line's owner; plan-wide charges are
//!   split evenly and the rounding cents go to the payer
//! - **Duplicate check**: a bill period already present in the ledger is skipped
//!
//! ## Example
//!
//! ```rust,ignore
//! use bill_splitter::*;
//!
//! let directory = OwnerDirectory::parse("123-456-7890 - Alice\n555-010-2000 - Bob")?;
//! let draft = BillDraft::from_json(reply)?;
//! let normalized = normalize(&draft, &directory)?;
//! let allocation = allocate(&normalized.bill, "Alice")?;
//!
//! for share in &allocation.shares {
//!     println!("{}: ${:.2}", share.owner, share.subtotal);
//! }
//! ```

pub mod allocator;
pub mod comment;
pub mod config;
pub mod directory;
pub mod duplicate;
pub mod error;
pub mod extract;
pub mod ledger;
pub mod model;
pub mod normalizer;
pub mod pipeline;
pub mod schema;

#[cfg(feature = "remote")]
pub mod llm;
#[cfg(feature = "remote")]
pub mod pdf;
#[cfg(feature = "remote")]
pub mod splitwise;

pub use allocator::{allocate, ShareAllocator};
pub use comment::format_breakdown;
pub use config::{Config, Credentials};
pub use directory::{canonicalize_phone, OwnerDirectory, UNKNOWN_OWNER};
pub use duplicate::{find_duplicate, ExpenseRecord, DUPLICATE_MARKER};
pub use error::{Result, SplitError};
pub use extract::{BillExtractor, Extraction};
pub use ledger::{CreatedExpense, ExpenseSplit, Ledger, LedgerUser, NewExpense};
pub use model::*;
pub use normalizer::normalize;
pub use pipeline::{Outcome, Pipeline, PipelineEvent, PipelineState, RunReport};
pub use schema::{BillDraft, LineDraft};
