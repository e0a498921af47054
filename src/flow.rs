use crate::address::{derive_holding_address, Address, COLLECTIBLE_PROGRAM, TOKEN_PROGRAM};
use crate::collectible::{bump_counter, verify_provenance, ContentStore};
#[cfg(test)]
use crate::collectible::CollectibleRecord;
use crate::error::BuilderError;
use crate::instruction::{burn_collectible, transfer, update_collectible};
use crate::ledger::LedgerHandle;
use crate::provision::ensure_holding_account;
use crate::signer::TransactionSigner;
use crate::transaction::{Transaction, TransactionBuilder};
use log::debug;

/// Business constants for the shipped flows
///
/// Injected into every builder call; the crate holds no global flow state.
/// The defaults mirror the reference deployment: the swap trades 5 units of
/// the send mint against 1 unit of the receive mint, burning a collectible
/// pays 1 reward token, and the transfer-and-update flow moves 5 units.
#[derive(Debug, Clone)]
pub struct FlowConfig {
    pub swap_send_mint: Address,
    pub swap_send_amount: u64,
    pub swap_receive_mint: Address,
    pub swap_receive_amount: u64,

    pub reward_mint: Address,
    pub reward_amount: u64,

    pub transfer_mint: Address,
    pub transfer_amount: u64,

    /// The single collection assets must belong to before a destructive or
    /// mutating flow will touch them
    pub expected_collection: Address,

    /// The attribute holding the counter bumped by the update flow
    pub counter_trait: String,
}

impl Default for FlowConfig {
    fn default() -> Self {
        let (swap_send_mint, _) =
            Address::find_derived_address(&[b"mint", b"swap-send"], &TOKEN_PROGRAM);
        let (swap_receive_mint, _) =
            Address::find_derived_address(&[b"mint", b"swap-receive"], &TOKEN_PROGRAM);
        let (reward_mint, _) =
            Address::find_derived_address(&[b"mint", b"reward"], &TOKEN_PROGRAM);
        let (expected_collection, _) =
            Address::find_derived_address(&[b"collection", b"season-one"], &COLLECTIBLE_PROGRAM);

        Self {
            swap_send_mint,
            swap_send_amount: 5,
            swap_receive_mint,
            swap_receive_amount: 1,
            reward_mint,
            reward_amount: 1,
            transfer_mint: swap_send_mint,
            transfer_amount: 5,
            expected_collection,
            counter_trait: "Counter".to_string(),
        }
    }
}

/// The two signing principals of a flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Party {
    User,
    System,
}

/// A holding account that must exist before the flow's instructions run
#[derive(Debug, Clone)]
pub struct ProvisionSpec {
    pub mint: Address,
    pub owner: Party,
}

/// One step of a flow, in execution order
#[derive(Debug, Clone)]
pub enum FlowStep {
    /// Move tokens between the parties' holding accounts, authorized by the
    /// sending party
    Transfer {
        mint: Address,
        amount: u64,
        from: Party,
        to: Party,
    },

    /// Destroy the flow's asset, authorized by the user holding it
    BurnAsset,

    /// Republish the asset's attribute document and repoint its metadata,
    /// authorized by the system as update authority
    UpdateAsset,
}

/// Declarative description of one flow: which holding accounts must exist,
/// which instructions run in which order, and (implicitly, through the
/// steps) whether the asset gate and metadata bump apply
///
/// The three shipped flows are values of this type, so they cannot drift
/// apart structurally.
#[derive(Debug, Clone)]
pub struct FlowPlan {
    pub name: &'static str,
    pub provisioning: Vec<ProvisionSpec>,
    pub steps: Vec<FlowStep>,
}

impl FlowPlan {
    /// The swap: the send mint moves user to system, the receive mint
    /// moves system to user, atomically
    pub fn token_swap(config: &FlowConfig) -> Self {
        Self {
            name: "token-swap",
            provisioning: vec![
                ProvisionSpec {
                    mint: config.swap_send_mint,
                    owner: Party::User,
                },
                ProvisionSpec {
                    mint: config.swap_send_mint,
                    owner: Party::System,
                },
                ProvisionSpec {
                    mint: config.swap_receive_mint,
                    owner: Party::User,
                },
                ProvisionSpec {
                    mint: config.swap_receive_mint,
                    owner: Party::System,
                },
            ],
            steps: vec![
                FlowStep::Transfer {
                    mint: config.swap_send_mint,
                    amount: config.swap_send_amount,
                    from: Party::User,
                    to: Party::System,
                },
                FlowStep::Transfer {
                    mint: config.swap_receive_mint,
                    amount: config.swap_receive_amount,
                    from: Party::System,
                    to: Party::User,
                },
            ],
        }
    }

    /// Burn a collection asset and pay the user a reward token
    pub fn burn_for_reward(config: &FlowConfig) -> Self {
        Self {
            name: "burn-for-reward",
            provisioning: vec![ProvisionSpec {
                mint: config.reward_mint,
                owner: Party::User,
            }],
            steps: vec![
                FlowStep::BurnAsset,
                FlowStep::Transfer {
                    mint: config.reward_mint,
                    amount: config.reward_amount,
                    from: Party::System,
                    to: Party::User,
                },
            ],
        }
    }

    /// Move tokens from the user to the system and bump the asset's counter
    pub fn transfer_and_update(config: &FlowConfig) -> Self {
        Self {
            name: "transfer-and-update",
            provisioning: vec![ProvisionSpec {
                mint: config.transfer_mint,
                owner: Party::System,
            }],
            steps: vec![
                FlowStep::Transfer {
                    mint: config.transfer_mint,
                    amount: config.transfer_amount,
                    from: Party::User,
                    to: Party::System,
                },
                FlowStep::UpdateAsset,
            ],
        }
    }

    /// Whether any step reads or destroys the flow's asset
    pub fn touches_asset(&self) -> bool {
        self.steps
            .iter()
            .any(|step| matches!(step, FlowStep::BurnAsset | FlowStep::UpdateAsset))
    }

    fn mutates_metadata(&self) -> bool {
        self.steps
            .iter()
            .any(|step| matches!(step, FlowStep::UpdateAsset))
    }
}

/// Everything one flow invocation needs: the external collaborators, the
/// business constants, and the request parameters
pub struct FlowContext<'a> {
    pub ledger: &'a dyn LedgerHandle,
    pub content_store: Option<&'a dyn ContentStore>,
    pub system_signer: &'a dyn TransactionSigner,
    pub config: &'a FlowConfig,
    pub user: Address,
    pub asset_mint: Option<Address>,
}

impl FlowContext<'_> {
    fn party_address(&self, party: Party) -> Address {
        match party {
            Party::User => self.user,
            Party::System => self.system_signer.address(),
        }
    }
}

/// Assemble a flow's transaction without signing it
///
/// Runs the asset gate and metadata mutation to completion before any
/// instruction is assembled, so a policy rejection never yields a partial
/// transaction. The user pays network fees in every flow.
pub fn assemble_flow(
    plan: &FlowPlan,
    ctx: &FlowContext<'_>,
) -> Result<Transaction, BuilderError> {
    debug!("assembling {} transaction for user {}", plan.name, ctx.user);

    let asset = if plan.touches_asset() {
        let mint = ctx.asset_mint.ok_or(BuilderError::MissingAssetMint)?;
        let record = ctx
            .ledger
            .lookup_collectible(&mint)?
            .ok_or(BuilderError::CollectibleNotFound(mint))?;
        verify_provenance(&record, &ctx.config.expected_collection)?;
        Some(record)
    } else {
        None
    };

    // The republish commits before the on-chain update instruction exists;
    // a crash in between orphans the new document (known limitation)
    let new_uri = if plan.mutates_metadata() {
        let store = ctx.content_store.ok_or_else(|| {
            BuilderError::ContentStore("no content store configured for metadata update".to_string())
        })?;
        let record = asset
            .as_ref()
            .ok_or_else(|| BuilderError::Other("metadata update without an asset gate".to_string()))?;
        Some(bump_counter(store, record, &ctx.config.counter_trait)?)
    } else {
        None
    };

    let mut builder = TransactionBuilder::new(ctx.ledger, ctx.user)?;

    for spec in &plan.provisioning {
        let owner = ctx.party_address(spec.owner);
        let (address, create) =
            ensure_holding_account(ctx.ledger, &spec.mint, &owner, &ctx.user)?;
        if let Some(instruction) = create {
            debug!("{}: provisioning holding account {}", plan.name, address);
            builder.add_instruction(instruction);
        }
    }

    for step in &plan.steps {
        match step {
            FlowStep::Transfer {
                mint,
                amount,
                from,
                to,
            } => {
                let authority = ctx.party_address(*from);
                let source = derive_holding_address(mint, &authority);
                let destination = derive_holding_address(mint, &ctx.party_address(*to));
                builder.add_instruction(transfer(&source, &destination, &authority, *amount)?);
            }
            FlowStep::BurnAsset => {
                let record = asset
                    .as_ref()
                    .ok_or_else(|| BuilderError::Other("burn step without an asset gate".to_string()))?;
                builder.add_instruction(burn_collectible(&record.mint, &ctx.user)?);
            }
            FlowStep::UpdateAsset => {
                let record = asset
                    .as_ref()
                    .ok_or_else(|| BuilderError::Other("update step without an asset gate".to_string()))?;
                let uri = new_uri
                    .as_deref()
                    .ok_or_else(|| BuilderError::Other("update step without a republished document".to_string()))?;
                builder.add_instruction(update_collectible(
                    &record.mint,
                    &ctx.system_signer.address(),
                    uri,
                )?);
            }
        }
    }

    builder.build()
}

/// Assemble a flow's transaction and apply the system's partial signature
///
/// The system signs exactly once, after every instruction is final; the
/// returned transaction awaits only the user's signature.
pub fn execute_flow(plan: &FlowPlan, ctx: &FlowContext<'_>) -> Result<Transaction, BuilderError> {
    let mut tx = assemble_flow(plan, ctx)?;
    tx.try_partial_sign(ctx.system_signer)?;

    debug!(
        "{} transaction ready: {} instructions, {} of {} signatures",
        plan.name,
        tx.instructions.len(),
        tx.signatures.len(),
        tx.required_signers().len()
    );
    Ok(tx)
}

/// Build the partially signed token swap transaction for `user`
pub fn build_token_swap_transaction(
    ledger: &dyn LedgerHandle,
    system_signer: &dyn TransactionSigner,
    config: &FlowConfig,
    user: Address,
) -> Result<Transaction, BuilderError> {
    let ctx = FlowContext {
        ledger,
        content_store: None,
        system_signer,
        config,
        user,
        asset_mint: None,
    };
    execute_flow(&FlowPlan::token_swap(config), &ctx)
}

/// Build the partially signed burn-for-reward transaction for `user` and
/// the asset at `asset_mint`
pub fn build_burn_for_reward_transaction(
    ledger: &dyn LedgerHandle,
    system_signer: &dyn TransactionSigner,
    config: &FlowConfig,
    user: Address,
    asset_mint: Address,
) -> Result<Transaction, BuilderError> {
    let ctx = FlowContext {
        ledger,
        content_store: None,
        system_signer,
        config,
        user,
        asset_mint: Some(asset_mint),
    };
    execute_flow(&FlowPlan::burn_for_reward(config), &ctx)
}

/// Build the partially signed transfer-and-update transaction for `user`
/// and the asset at `asset_mint`
pub fn build_transfer_and_update_transaction(
    ledger: &dyn LedgerHandle,
    content_store: &dyn ContentStore,
    system_signer: &dyn TransactionSigner,
    config: &FlowConfig,
    user: Address,
    asset_mint: Address,
) -> Result<Transaction, BuilderError> {
    let ctx = FlowContext {
        ledger,
        content_store: Some(content_store),
        system_signer,
        config,
        user,
        asset_mint: Some(asset_mint),
    };
    execute_flow(&FlowPlan::transfer_and_update(config), &ctx)
}
