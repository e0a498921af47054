use crate::address::Address;
use crate::collectible::ContentStore;
use crate::error::BuilderError;
use crate::flow::{
    build_burn_for_reward_transaction, build_token_swap_transaction,
    build_transfer_and_update_transaction, FlowConfig,
};
use crate::ledger::LedgerHandle;
use crate::signer::TransactionSigner;
use log::debug;
use serde::{Deserialize, Serialize};

/// Parameters of one flow invocation as they cross the process boundary
///
/// The party holding the user's key sends this in and receives the encoded,
/// partially signed transaction back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowRequest {
    /// The user's wallet address
    pub user: Address,

    /// The asset the flow operates on; required by the collectible flows
    pub asset_mint: Option<Address>,
}

impl FlowRequest {
    fn require_asset_mint(&self) -> Result<Address, BuilderError> {
        self.asset_mint.ok_or(BuilderError::MissingAssetMint)
    }
}

/// Handle a token swap invocation, returning the encoded transaction
pub fn handle_token_swap(
    ledger: &dyn LedgerHandle,
    system_signer: &dyn TransactionSigner,
    config: &FlowConfig,
    request: &FlowRequest,
) -> Result<String, BuilderError> {
    debug!("token swap requested by {}", request.user);
    let tx = build_token_swap_transaction(ledger, system_signer, config, request.user)?;
    tx.encode()
}

/// Handle a burn-for-reward invocation, returning the encoded transaction
pub fn handle_burn_for_reward(
    ledger: &dyn LedgerHandle,
    system_signer: &dyn TransactionSigner,
    config: &FlowConfig,
    request: &FlowRequest,
) -> Result<String, BuilderError> {
    let asset_mint = request.require_asset_mint()?;
    debug!("burn of {} requested by {}", asset_mint, request.user);
    let tx =
        build_burn_for_reward_transaction(ledger, system_signer, config, request.user, asset_mint)?;
    tx.encode()
}

/// Handle a transfer-and-update invocation, returning the encoded
/// transaction
pub fn handle_transfer_and_update(
    ledger: &dyn LedgerHandle,
    content_store: &dyn ContentStore,
    system_signer: &dyn TransactionSigner,
    config: &FlowConfig,
    request: &FlowRequest,
) -> Result<String, BuilderError> {
    let asset_mint = request.require_asset_mint()?;
    debug!("update of {} requested by {}", asset_mint, request.user);
    let tx = build_transfer_and_update_transaction(
        ledger,
        content_store,
        system_signer,
        config,
        request.user,
        asset_mint,
    )?;
    tx.encode()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::InMemoryLedger;
    use crate::signer::tests::keypair;
    use crate::transaction::Transaction;

    #[test]
    fn test_swap_handler_round_trip() {
        let ledger = InMemoryLedger::new();
        let system = keypair(1);
        let user = keypair(2);
        let config = FlowConfig::default();

        ledger.fund_holding_account(&config.swap_send_mint, &user.address(), 100);
        ledger.fund_holding_account(&config.swap_send_mint, &system.address(), 100);
        ledger.fund_holding_account(&config.swap_receive_mint, &user.address(), 100);
        ledger.fund_holding_account(&config.swap_receive_mint, &system.address(), 100);

        let request = FlowRequest {
            user: user.address(),
            asset_mint: None,
        };
        let encoded = handle_token_swap(&ledger, &system, &config, &request).unwrap();

        // The user's side decodes, countersigns, and submits
        let mut tx = Transaction::decode(&encoded).unwrap();
        assert_eq!(tx.instructions.len(), 2);
        assert_eq!(tx.signatures.len(), 1);
        assert_eq!(tx.fee_payer, user.address());

        tx.try_partial_sign(&user).unwrap();
        assert!(tx.is_fully_signed());
        ledger.submit(&tx).unwrap();
    }

    #[test]
    fn test_collectible_handlers_require_asset_mint() {
        let ledger = InMemoryLedger::new();
        let system = keypair(1);
        let config = FlowConfig::default();

        let request = FlowRequest {
            user: keypair(2).address(),
            asset_mint: None,
        };

        let result = handle_burn_for_reward(&ledger, &system, &config, &request);
        assert!(matches!(result, Err(BuilderError::MissingAssetMint)));
    }
}
