use crate::address::{derive_holding_address, Address};
use crate::collectible::CollectibleRecord;
use crate::error::BuilderError;
use crate::signer::Signature;
use crate::transaction::{AnchorRef, Slot, Transaction};
use log::debug;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

/// A ledger account as returned by lookups
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// The account's address
    pub address: Address,

    /// The wallet controlling this account
    pub owner: Address,

    /// The mint this account holds a balance of; wallet accounts carry none
    pub mint: Option<Address>,

    /// Balance in base units
    pub balance: u64,
}

/// Handle to the external ledger node
///
/// Implementations own transport concerns (endpoints, timeouts, retries of
/// their own); the builder only distinguishes "absent" from "lookup failed".
pub trait LedgerHandle {
    /// Read the latest ledger state reference
    ///
    /// # Returns
    /// An anchor bounding the submission window of transactions built
    /// against it
    fn latest_anchor(&self) -> Result<AnchorRef, BuilderError>;

    /// Look up an account by address
    ///
    /// # Returns
    /// `Ok(Some(account))` if present, `Ok(None)` if the ledger reports the
    /// account does not exist. Transport failures are errors, never `None`.
    fn lookup_account(&self, address: &Address) -> Result<Option<Account>, BuilderError>;

    /// Look up the collectible record for a mint
    ///
    /// # Returns
    /// `Ok(Some(record))` if the mint has a metadata record, `Ok(None)` if
    /// it does not
    fn lookup_collectible(&self, mint: &Address)
        -> Result<Option<CollectibleRecord>, BuilderError>;

    /// Submit a fully signed transaction
    ///
    /// Used by callers after the user's signature is applied; the builder
    /// itself never submits.
    fn submit(&self, transaction: &Transaction) -> Result<Signature, BuilderError>;
}

/// How many slots a freshness anchor stays valid for
pub const MAX_ANCHOR_AGE: Slot = 150;

/// Deterministic in-memory ledger
///
/// Stands in for a ledger node in tests and local environments, the same
/// way the shim handlers stand in for remote invocation.
pub struct InMemoryLedger {
    accounts: Mutex<HashMap<Address, Account>>,
    collectibles: Mutex<HashMap<Address, CollectibleRecord>>,
    slot: AtomicU64,
    fail_lookups: AtomicBool,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self {
            accounts: Mutex::new(HashMap::new()),
            collectibles: Mutex::new(HashMap::new()),
            slot: AtomicU64::new(1),
            fail_lookups: AtomicBool::new(false),
        }
    }

    /// Register an account
    pub fn register_account(&self, account: Account) {
        let mut accounts = self.accounts.lock().expect("ledger account map poisoned");
        accounts.insert(account.address, account);
    }

    /// Register the holding account for a (mint, owner) pair with a balance
    pub fn fund_holding_account(&self, mint: &Address, owner: &Address, balance: u64) -> Address {
        let address = derive_holding_address(mint, owner);
        self.register_account(Account {
            address,
            owner: *owner,
            mint: Some(*mint),
            balance,
        });
        address
    }

    /// Register a collectible record
    pub fn register_collectible(&self, record: CollectibleRecord) {
        let mut collectibles = self
            .collectibles
            .lock()
            .expect("ledger collectible map poisoned");
        collectibles.insert(record.mint, record);
    }

    /// Move the ledger forward by `count` slots
    pub fn advance_slots(&self, count: Slot) {
        self.slot.fetch_add(count, Ordering::SeqCst);
    }

    /// Make subsequent lookups fail with a transport error, to exercise the
    /// retryable-failure path
    pub fn set_fail_lookups(&self, fail: bool) {
        self.fail_lookups.store(fail, Ordering::SeqCst);
    }

    fn check_transport(&self) -> Result<(), BuilderError> {
        if self.fail_lookups.load(Ordering::SeqCst) {
            return Err(BuilderError::AccountLookup(
                "simulated transport failure".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerHandle for InMemoryLedger {
    fn latest_anchor(&self) -> Result<AnchorRef, BuilderError> {
        self.check_transport()?;

        // Each observation advances the slot, so consecutive builds bind
        // distinct anchors
        let slot: Slot = self.slot.fetch_add(1, Ordering::SeqCst);

        let mut hasher = Sha256::new();
        hasher.update(b"anchor");
        hasher.update(slot.to_le_bytes());

        Ok(AnchorRef {
            digest: hasher.finalize().into(),
            slot,
        })
    }

    fn lookup_account(&self, address: &Address) -> Result<Option<Account>, BuilderError> {
        self.check_transport()?;
        let accounts = self
            .accounts
            .lock()
            .map_err(|err| BuilderError::AccountLookup(format!("account map poisoned: {}", err)))?;
        Ok(accounts.get(address).cloned())
    }

    fn lookup_collectible(
        &self,
        mint: &Address,
    ) -> Result<Option<CollectibleRecord>, BuilderError> {
        self.check_transport()?;
        let collectibles = self
            .collectibles
            .lock()
            .map_err(|err| BuilderError::AccountLookup(format!("collectible map poisoned: {}", err)))?;
        Ok(collectibles.get(mint).cloned())
    }

    fn submit(&self, transaction: &Transaction) -> Result<Signature, BuilderError> {
        self.check_transport()?;

        let current = self.slot.load(Ordering::SeqCst);
        if current.saturating_sub(transaction.anchor.slot) > MAX_ANCHOR_AGE {
            return Err(BuilderError::StaleAnchor(transaction.anchor.slot));
        }

        if let Some(missing) = transaction.missing_signers().first() {
            return Err(BuilderError::MissingSignature(*missing));
        }
        transaction.verify_signatures()?;

        debug!(
            "accepted transaction from {} with {} instructions",
            transaction.fee_payer,
            transaction.instructions.len()
        );

        // The fee payer's signature identifies the transaction
        transaction
            .signatures
            .get(&transaction.fee_payer)
            .copied()
            .ok_or(BuilderError::MissingSignature(transaction.fee_payer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::tests::wallet;
    use crate::instruction::transfer;
    use crate::signer::tests::keypair;
    use crate::signer::TransactionSigner;
    use crate::transaction::TransactionBuilder;

    #[test]
    fn test_lookup_distinguishes_absent_from_failed() {
        let ledger = InMemoryLedger::new();
        let address = wallet(1);

        // Absent account reports None
        assert!(ledger.lookup_account(&address).unwrap().is_none());

        // Transport failure reports an error, not absence
        ledger.set_fail_lookups(true);
        let result = ledger.lookup_account(&address);
        assert!(matches!(result, Err(BuilderError::AccountLookup(_))));
    }

    #[test]
    fn test_registered_account_is_found() {
        let ledger = InMemoryLedger::new();
        let mint = wallet(1);
        let owner = wallet(2);

        let address = ledger.fund_holding_account(&mint, &owner, 10);

        let account = ledger.lookup_account(&address).unwrap().unwrap();
        assert_eq!(account.owner, owner);
        assert_eq!(account.mint, Some(mint));
        assert_eq!(account.balance, 10);
    }

    #[test]
    fn test_anchor_advances_per_observation() {
        let ledger = InMemoryLedger::new();

        let first = ledger.latest_anchor().unwrap();
        let second = ledger.latest_anchor().unwrap();

        assert!(second.slot > first.slot);
        assert_ne!(first.digest, second.digest);
    }

    #[test]
    fn test_submit_requires_all_signatures() {
        let ledger = InMemoryLedger::new();
        let user = keypair(1);
        let system = keypair(2);

        let spend = transfer(&wallet(4), &wallet(5), &system.address(), 5).unwrap();
        let mut builder = TransactionBuilder::new(&ledger, user.address()).unwrap();
        builder.add_instruction(spend);
        let mut tx = builder.build().unwrap();

        tx.try_partial_sign(&system).unwrap();
        assert!(matches!(
            ledger.submit(&tx),
            Err(BuilderError::MissingSignature(_))
        ));

        tx.try_partial_sign(&user).unwrap();
        let signature = ledger.submit(&tx).unwrap();
        assert_eq!(signature, tx.signatures[&user.address()]);
    }

    #[test]
    fn test_submit_rejects_expired_anchor() {
        let ledger = InMemoryLedger::new();
        let user = keypair(1);
        let system = keypair(2);

        let spend = transfer(&wallet(4), &wallet(5), &system.address(), 5).unwrap();
        let mut builder = TransactionBuilder::new(&ledger, user.address()).unwrap();
        builder.add_instruction(spend);
        let mut tx = builder.build().unwrap();
        tx.try_partial_sign(&system).unwrap();
        tx.try_partial_sign(&user).unwrap();

        // Submittable within the window, stale past it
        ledger.advance_slots(MAX_ANCHOR_AGE + 1);
        let result = ledger.submit(&tx);
        assert!(matches!(result, Err(BuilderError::StaleAnchor(_))));
    }
}
