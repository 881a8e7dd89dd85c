//! Async client for the mega-dao contracts.
//!
//! [`MegaClient`] exposes one method per contract action. Queries go through a
//! [`ReadOnlyClient`]; state-changing calls come back as [`CallPayload`]s for
//! an external wallet to sign and broadcast.

pub mod client;
pub mod error;
pub mod facade;
pub mod rpc;

pub use client::{DEFAULT_ASSET_CONTRACT, MAX_VOTES, MegaClient, ProposalData, VoteEntry};
pub use error::{ClientError, ErrorScope, LowerError, translate_error};
pub use facade::{AbiError, CallPayload, DeployedContract, QueryError};
pub use rpc::{HttpReadOnlyClient, ReadOnlyClient, ReadOnlyInvocation, RpcError};
