//! Builder for atomic two-party ledger transactions: token swaps,
//! collectible burns with rewards, and metadata updates, assembled as one
//! all-or-nothing instruction sequence and partially signed by the system
//! before the user ever sees them.

pub mod address;
pub mod collectible;
pub mod error;
pub mod flow;
pub mod instruction;
pub mod ledger;
pub mod provision;
pub mod shim;
pub mod signer;
pub mod transaction;

// Re-export the main types for convenience
pub use address::{
    derive_edition_address, derive_holding_address, derive_metadata_address, Address,
    COLLECTIBLE_PROGRAM, HOLDING_PROGRAM, SYSTEM_PROGRAM, TOKEN_PROGRAM,
};
pub use collectible::{
    bump_counter, verify_provenance, Attribute, AttributeDocument, CollectibleRecord,
    CollectionRef, ContentStore, InMemoryContentStore,
};
pub use error::BuilderError;
pub use flow::{
    assemble_flow, build_burn_for_reward_transaction, build_token_swap_transaction,
    build_transfer_and_update_transaction, execute_flow, FlowConfig, FlowContext, FlowPlan,
    FlowStep, Party, ProvisionSpec,
};
pub use instruction::{AccountMeta, CollectibleOp, HoldingOp, Instruction, TokenOp};
pub use ledger::{Account, InMemoryLedger, LedgerHandle, MAX_ANCHOR_AGE};
pub use provision::{ensure_account, ensure_holding_account};
pub use shim::{
    handle_burn_for_reward, handle_token_swap, handle_transfer_and_update, FlowRequest,
};
pub use signer::{Keypair, Signature, TransactionSigner};
pub use transaction::{
    verify_instruction_ordering, AnchorRef, Slot, Transaction, TransactionBuilder,
};
