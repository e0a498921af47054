use crate::address::{derive_holding_address, Address};
use crate::error::BuilderError;
use crate::instruction::{create_holding_account, Instruction};
use crate::ledger::LedgerHandle;
use log::debug;

/// Ensure the account at `address` exists before anything uses it
///
/// Queries the ledger for existence. Only an explicit "not found" produces
/// a creation instruction; a transport failure propagates to the caller,
/// which may retry.
///
/// # Parameters
/// * `ledger` - The ledger to query for existence
/// * `address` - The resolved account address
/// * `owner` - The wallet controlling the account
/// * `mint` - The mint the account holds
/// * `payer` - The wallet funding the account if it must be created
///
/// # Returns
/// `Some(instruction)` creating the account, or `None` if it already exists
pub fn ensure_account(
    ledger: &dyn LedgerHandle,
    address: &Address,
    owner: &Address,
    mint: &Address,
    payer: &Address,
) -> Result<Option<Instruction>, BuilderError> {
    match ledger.lookup_account(address)? {
        Some(_) => Ok(None),
        None => {
            debug!("holding account {} for owner {} is absent", address, owner);
            let create = create_holding_account(payer, address, owner, mint)?;
            Ok(Some(create))
        }
    }
}

/// Resolve the holding account for a (mint, owner) pair and ensure it exists
pub fn ensure_holding_account(
    ledger: &dyn LedgerHandle,
    mint: &Address,
    owner: &Address,
    payer: &Address,
) -> Result<(Address, Option<Instruction>), BuilderError> {
    let address = derive_holding_address(mint, owner);
    let create = ensure_account(ledger, &address, owner, mint, payer)?;
    Ok((address, create))
}
