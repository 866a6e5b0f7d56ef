//! asj-allocation: space amounts and the first-come-first-served allocator.
//!
//! Pure crate — no IO, no DB. The persistence layer loads space capacities
//! and artist requests, runs [`Allocator::allocate`], and writes the
//! resulting grants back.

pub mod allocator;
pub mod amount;

pub use allocator::{
    AllocationDecision, AllocationError, Allocator, Grant, RejectedRequest, RejectionReason,
    SpaceDefinition, SpaceRequest,
};
pub use amount::{SpaceAmount, SpaceAmountError};
