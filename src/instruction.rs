use crate::address::{
    derive_edition_address, derive_holding_address, derive_metadata_address, Address,
    COLLECTIBLE_PROGRAM, HOLDING_PROGRAM, SYSTEM_PROGRAM, TOKEN_PROGRAM,
};
use crate::error::BuilderError;
use serde::{Deserialize, Serialize};

/// A reference to an account consumed by an instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountMeta {
    /// The account's address
    pub address: Address,

    /// True if the transaction requires a signature matching `address`
    pub is_signer: bool,

    /// True if the account may be mutated during execution
    pub is_writable: bool,
}

impl AccountMeta {
    /// Construct metadata for a writable account
    pub fn new(address: Address, is_signer: bool) -> Self {
        Self {
            address,
            is_signer,
            is_writable: true,
        }
    }

    /// Construct metadata for a read-only account
    pub fn new_readonly(address: Address, is_signer: bool) -> Self {
        Self {
            address,
            is_signer,
            is_writable: false,
        }
    }
}

/// Payload carried by token program instructions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenOp {
    /// Move `amount` base units from a source holding account to a
    /// destination holding account
    Transfer { amount: u64 },
}

/// Payload carried by holding-account program instructions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HoldingOp {
    /// Create the derived holding account for an (owner, mint) pair
    Create,
}

/// Payload carried by collectible program instructions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollectibleOp {
    /// Destroy a unique item and close its metadata and edition accounts
    Burn,
    /// Repoint the metadata record at a freshly published document
    Update { uri: String },
}

/// An ordered unit of work against a named program
///
/// Instructions are immutable once constructed; ordering within a
/// transaction is semantically significant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    /// The program that executes this instruction
    pub program_id: Address,

    /// The accounts this instruction reads or writes, with their signer and
    /// writability flags
    pub accounts: Vec<AccountMeta>,

    /// The binary payload passed to the program
    pub data: Vec<u8>,
}

impl Instruction {
    /// If this instruction creates an account, the address being created
    pub fn creation_target(&self) -> Option<Address> {
        if self.program_id != HOLDING_PROGRAM {
            return None;
        }
        match bincode::deserialize::<HoldingOp>(&self.data) {
            Ok(HoldingOp::Create) => self.accounts.get(1).map(|meta| meta.address),
            Err(_) => None,
        }
    }

    /// Addresses that must sign the containing transaction for this
    /// instruction to execute
    pub fn signer_addresses(&self) -> Vec<Address> {
        self.accounts
            .iter()
            .filter(|meta| meta.is_signer)
            .map(|meta| meta.address)
            .collect()
    }
}

/// Build an instruction creating the holding account at `address` for the
/// (owner, mint) pair, funded by `payer`.
///
/// Accounts (strict order):
/// - payer (writable, signer)
/// - holding account (writable)
/// - owner (readonly)
/// - mint (readonly)
/// - system program (readonly)
pub fn create_holding_account(
    payer: &Address,
    address: &Address,
    owner: &Address,
    mint: &Address,
) -> Result<Instruction, BuilderError> {
    let data = bincode::serialize(&HoldingOp::Create)?;

    Ok(Instruction {
        program_id: HOLDING_PROGRAM,
        accounts: vec![
            AccountMeta::new(*payer, true),
            AccountMeta::new(*address, false),
            AccountMeta::new_readonly(*owner, false),
            AccountMeta::new_readonly(*mint, false),
            AccountMeta::new_readonly(SYSTEM_PROGRAM, false),
        ],
        data,
    })
}

/// Build an instruction transferring `amount` base units between holding
/// accounts, authorized by the source account's owner.
///
/// Accounts (strict order):
/// - source holding account (writable)
/// - destination holding account (writable)
/// - authority (readonly, signer)
pub fn transfer(
    source: &Address,
    destination: &Address,
    authority: &Address,
    amount: u64,
) -> Result<Instruction, BuilderError> {
    if amount == 0 {
        return Err(BuilderError::InvalidAmount(amount));
    }

    let data = bincode::serialize(&TokenOp::Transfer { amount })?;

    Ok(Instruction {
        program_id: TOKEN_PROGRAM,
        accounts: vec![
            AccountMeta::new(*source, false),
            AccountMeta::new(*destination, false),
            AccountMeta::new_readonly(*authority, true),
        ],
        data,
    })
}

/// Build an instruction destroying the collectible at `mint`, authorized by
/// its holder.
///
/// Accounts (strict order):
/// - metadata account (writable)
/// - edition account (writable)
/// - mint (writable)
/// - holder's holding account (writable)
/// - authority (writable, signer; reclaims the closed accounts' funds)
pub fn burn_collectible(mint: &Address, authority: &Address) -> Result<Instruction, BuilderError> {
    let metadata = derive_metadata_address(mint);
    let edition = derive_edition_address(mint);
    let holding = derive_holding_address(mint, authority);

    let data = bincode::serialize(&CollectibleOp::Burn)?;

    Ok(Instruction {
        program_id: COLLECTIBLE_PROGRAM,
        accounts: vec![
            AccountMeta::new(metadata, false),
            AccountMeta::new(edition, false),
            AccountMeta::new(*mint, false),
            AccountMeta::new(holding, false),
            AccountMeta::new(*authority, true),
        ],
        data,
    })
}

/// Build an instruction repointing the collectible's metadata at `new_uri`,
/// authorized by the record's update authority.
///
/// Accounts (strict order):
/// - metadata account (writable)
/// - update authority (readonly, signer)
pub fn update_collectible(
    mint: &Address,
    update_authority: &Address,
    new_uri: &str,
) -> Result<Instruction, BuilderError> {
    let metadata = derive_metadata_address(mint);

    let data = bincode::serialize(&CollectibleOp::Update {
        uri: new_uri.to_string(),
    })?;

    Ok(Instruction {
        program_id: COLLECTIBLE_PROGRAM,
        accounts: vec![
            AccountMeta::new(metadata, false),
            AccountMeta::new_readonly(*update_authority, true),
        ],
        data,
    })
}
