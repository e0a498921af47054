use crate::address::Address;
use crate::error::BuilderError;
use crate::instruction::Instruction;
use crate::ledger::LedgerHandle;
use crate::signer::{verify_signature, Signature, TransactionSigner};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Ledger slot number
pub type Slot = u64;

/// A reference to recent ledger state, bounding how long a transaction
/// remains submittable
///
/// The anchor is bound when the transaction is assembled, not when it is
/// submitted; the slot records the binding point so callers can reason
/// about the staleness window of a prebuilt transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorRef {
    /// Digest of the ledger state the transaction is anchored to
    pub digest: [u8; 32],

    /// The slot at which the digest was observed
    pub slot: Slot,
}

// The canonical message a signature commits to: everything except the
// signature table itself. Signing and verification must agree on this
// byte layout.
#[derive(Serialize)]
struct MessageView<'a> {
    fee_payer: &'a Address,
    anchor: &'a AnchorRef,
    instructions: &'a [Instruction],
}

/// An ordered sequence of instructions executing all-or-nothing
///
/// The transaction is assembled once, partially signed by the system, and
/// completed later by the user; its canonical message bytes must not change
/// between those two signing events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// The address paying network fees; always the user in the shipped flows
    pub fee_payer: Address,

    /// The freshness anchor bound at assembly time
    pub anchor: AnchorRef,

    /// The instructions, in execution order
    pub instructions: Vec<Instruction>,

    /// Signatures collected so far, keyed by signer address
    pub signatures: BTreeMap<Address, Signature>,
}

impl Transaction {
    /// Create an unsigned transaction
    pub fn new(fee_payer: Address, anchor: AnchorRef, instructions: Vec<Instruction>) -> Self {
        Self {
            fee_payer,
            anchor,
            instructions,
            signatures: BTreeMap::new(),
        }
    }

    /// The canonical message bytes every signature commits to
    pub fn message_bytes(&self) -> Result<Vec<u8>, BuilderError> {
        let message = MessageView {
            fee_payer: &self.fee_payer,
            anchor: &self.anchor,
            instructions: &self.instructions,
        };
        Ok(bincode::serialize(&message)?)
    }

    /// Every address that must sign before the transaction is submittable
    pub fn required_signers(&self) -> BTreeSet<Address> {
        let mut signers = BTreeSet::new();
        signers.insert(self.fee_payer);
        for instruction in &self.instructions {
            signers.extend(instruction.signer_addresses());
        }
        signers
    }

    /// Required signers that have not signed yet
    pub fn missing_signers(&self) -> Vec<Address> {
        self.required_signers()
            .into_iter()
            .filter(|address| !self.signatures.contains_key(address))
            .collect()
    }

    /// Check whether every required signer has signed
    pub fn is_fully_signed(&self) -> bool {
        self.missing_signers().is_empty()
    }

    /// Apply one principal's signature over the full instruction set
    ///
    /// The signature commits to the whole transaction shape; mutating the
    /// instructions afterwards invalidates it. Instruction ordering is
    /// re-checked here so a signature is never produced over a malformed
    /// sequence.
    pub fn try_partial_sign(
        &mut self,
        signer: &dyn TransactionSigner,
    ) -> Result<(), BuilderError> {
        verify_instruction_ordering(&self.instructions)?;

        let address = signer.address();
        if !self.required_signers().contains(&address) {
            // An extra signature is harmless but usually indicates a
            // misconfigured flow
            warn!("{} signed but is not a required signer", address);
        }

        let message = self.message_bytes()?;
        let signature = signer.try_sign(&message)?;
        self.signatures.insert(address, signature);

        debug!(
            "partial signature applied by {} ({}/{} signers present)",
            address,
            self.signatures.len(),
            self.required_signers().len()
        );
        Ok(())
    }

    /// Verify every signature present against the current message bytes
    ///
    /// Fails if any instruction was mutated after its signature was applied.
    pub fn verify_signatures(&self) -> Result<(), BuilderError> {
        let message = self.message_bytes()?;
        for (address, signature) in &self.signatures {
            verify_signature(address, &message, signature)?;
        }
        Ok(())
    }

    /// Serialize the transaction to its text-safe transport encoding
    pub fn encode(&self) -> Result<String, BuilderError> {
        let bytes = bincode::serialize(self)?;
        Ok(bs58::encode(bytes).into_string())
    }

    /// Restore a transaction from its transport encoding
    pub fn decode(encoded: &str) -> Result<Self, BuilderError> {
        let bytes = bs58::decode(encoded)
            .into_vec()
            .map_err(|err| BuilderError::Serialization(err.to_string()))?;
        Ok(bincode::deserialize(&bytes)?)
    }
}

/// Check that every account created inside a transaction is created before
/// any instruction that reads or writes it
///
/// The source of this invariant is the ledger's execution model: an
/// instruction touching a missing account fails the whole transaction.
pub fn verify_instruction_ordering(instructions: &[Instruction]) -> Result<(), BuilderError> {
    let mut created_at: HashMap<Address, usize> = HashMap::new();
    for (index, instruction) in instructions.iter().enumerate() {
        if let Some(target) = instruction.creation_target() {
            created_at.entry(target).or_insert(index);
        }
    }

    for (index, instruction) in instructions.iter().enumerate() {
        for meta in &instruction.accounts {
            if let Some(&created) = created_at.get(&meta.address) {
                if index < created {
                    return Err(BuilderError::InstructionOrdering(format!(
                        "account {} is used at instruction {} but created at instruction {}",
                        meta.address, index, created
                    )));
                }
            }
        }
    }

    Ok(())
}

/// Accumulates instructions for one transaction and binds its freshness
/// anchor
///
/// The anchor is read from the ledger when the builder is created, so the
/// staleness window starts at assembly time.
pub struct TransactionBuilder {
    fee_payer: Address,
    anchor: AnchorRef,
    instructions: Vec<Instruction>,
}

impl TransactionBuilder {
    /// Create a builder, binding the anchor from the ledger's latest state
    pub fn new(ledger: &dyn LedgerHandle, fee_payer: Address) -> Result<Self, BuilderError> {
        let anchor = ledger.latest_anchor()?;
        debug!("anchor bound at slot {}", anchor.slot);
        Ok(Self::with_anchor(fee_payer, anchor))
    }

    /// Create a builder with an explicit anchor
    pub fn with_anchor(fee_payer: Address, anchor: AnchorRef) -> Self {
        Self {
            fee_payer,
            anchor,
            instructions: Vec::new(),
        }
    }

    /// Append an instruction
    pub fn add_instruction(&mut self, instruction: Instruction) -> &mut Self {
        self.instructions.push(instruction);
        self
    }

    /// Produce the unsigned transaction, checking the ordering invariant
    pub fn build(self) -> Result<Transaction, BuilderError> {
        verify_instruction_ordering(&self.instructions)?;
        Ok(Transaction::new(
            self.fee_payer,
            self.anchor,
            self.instructions,
        ))
    }
}
