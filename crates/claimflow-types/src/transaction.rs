//! Ledger transactions: building, content-hash identity, signatures.
//!
//! A transaction is an atomic proposal. It either reaches finality as a
//! whole or is rejected as a whole; there is no partial application of its
//! outputs.
//!
//! ## Identity
//!
//! `TxId = SHA-256("claimflow:tx:v1:" || canonical_json(body))`
//!
//! Every party that holds the same body computes the same id, so a state
//! reference (`txhash`, `index`) identifies one exact version of a record
//! across the network.
//!
//! ## Signing
//!
//! Signatures are ed25519 over the 32-byte id. A transaction is *fully
//! signed* once every command signer has signed, and *finalized* once the
//! notary has signed on top.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{AssetState, ClaimError, ClaimRecord, Identity, Party, PartyKey, Result, StateRef, TxId};

/// Domain prefix mixed into every transaction id.
const TX_ID_DOMAIN: &[u8] = b"claimflow:tx:v1:";

// ---------------------------------------------------------------------------
// States
// ---------------------------------------------------------------------------

/// Any state a transaction can output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerState {
    Asset(AssetState),
    Claim(ClaimRecord),
}

impl LedgerState {
    #[must_use]
    pub fn as_asset(&self) -> Option<&AssetState> {
        match self {
            Self::Asset(asset) => Some(asset),
            Self::Claim(_) => None,
        }
    }

    #[must_use]
    pub fn as_claim(&self) -> Option<&ClaimRecord> {
        match self {
            Self::Claim(claim) => Some(claim),
            Self::Asset(_) => None,
        }
    }
}

/// A state together with the notary that governs it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionState<T> {
    pub data: T,
    pub notary: Party,
}

impl<T> TransactionState<T> {
    #[must_use]
    pub fn new(data: T, notary: Party) -> Self {
        Self { data, notary }
    }
}

/// A state plus the reference that locates it on the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateAndRef<T> {
    pub state: TransactionState<T>,
    pub reference: StateRef,
}

impl StateAndRef<LedgerState> {
    /// Narrow to an asset state, if that is what this is.
    #[must_use]
    pub fn into_asset(self) -> Option<StateAndRef<AssetState>> {
        match self.state.data {
            LedgerState::Asset(asset) => Some(StateAndRef {
                state: TransactionState::new(asset, self.state.notary),
                reference: self.reference,
            }),
            LedgerState::Claim(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// The business operation a transaction performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandKind {
    /// First version of an asset record.
    IssueAsset,
    /// New version of an asset record, consuming the previous one.
    UpdateAsset,
    /// A new claim against an asset's issuer.
    CreateClaim,
}

impl std::fmt::Display for CommandKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IssueAsset => write!(f, "ISSUE_ASSET"),
            Self::UpdateAsset => write!(f, "UPDATE_ASSET"),
            Self::CreateClaim => write!(f, "CREATE_CLAIM"),
        }
    }
}

/// A command and the keys that must sign for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub kind: CommandKind,
    pub signers: Vec<PartyKey>,
}

impl Command {
    #[must_use]
    pub fn new(kind: CommandKind, signers: Vec<PartyKey>) -> Self {
        Self { kind, signers }
    }
}

// ---------------------------------------------------------------------------
// WireTransaction
// ---------------------------------------------------------------------------

/// Everything the transaction id commits to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionBody {
    /// States consumed by this transaction.
    pub inputs: Vec<StateRef>,
    /// States that must be current at finality but are not consumed.
    pub references: Vec<StateRef>,
    pub outputs: Vec<TransactionState<LedgerState>>,
    pub commands: Vec<Command>,
    /// The ordering authority that will finalize this transaction.
    pub notary: Party,
}

/// A transaction body plus its content-hash id.
///
/// The id travels with the body but is never trusted on receipt;
/// call [`WireTransaction::verify_id`] on anything that came off the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireTransaction {
    pub id: TxId,
    pub body: TransactionBody,
}

impl WireTransaction {
    /// Hash `body` into its transaction id.
    pub fn compute_id(body: &TransactionBody) -> Result<TxId> {
        let canonical = serde_json::to_vec(body)?;
        let mut hasher = Sha256::new();
        hasher.update(TX_ID_DOMAIN);
        hasher.update(&canonical);
        let result = hasher.finalize();
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&result);
        Ok(TxId(hash))
    }

    /// Wrap a body, computing its id.
    pub fn from_body(body: TransactionBody) -> Result<Self> {
        let id = Self::compute_id(&body)?;
        Ok(Self { id, body })
    }

    /// Check that the declared id matches the body.
    ///
    /// # Errors
    /// Returns [`ClaimError::TransactionIdMismatch`] if the body was altered.
    pub fn verify_id(&self) -> Result<()> {
        let computed = Self::compute_id(&self.body)?;
        if computed != self.id {
            return Err(ClaimError::TransactionIdMismatch {
                declared: self.id,
                computed,
            });
        }
        Ok(())
    }

    /// Union of the signers of every command.
    #[must_use]
    pub fn required_signers(&self) -> BTreeSet<PartyKey> {
        self.body
            .commands
            .iter()
            .flat_map(|c| c.signers.iter().copied())
            .collect()
    }

    /// Claim outputs, in output order.
    #[must_use]
    pub fn claim_outputs(&self) -> Vec<&ClaimRecord> {
        self.body
            .outputs
            .iter()
            .filter_map(|o| o.data.as_claim())
            .collect()
    }

    /// Asset outputs, in output order.
    #[must_use]
    pub fn asset_outputs(&self) -> Vec<&AssetState> {
        self.body
            .outputs
            .iter()
            .filter_map(|o| o.data.as_asset())
            .collect()
    }

    /// The output at `index` as a located state.
    #[must_use]
    pub fn out_ref(&self, index: u32) -> Option<StateAndRef<LedgerState>> {
        let state = self.body.outputs.get(usize::try_from(index).ok()?)?;
        Some(StateAndRef {
            state: state.clone(),
            reference: StateRef::new(self.id, index),
        })
    }

    /// Every output as a located state.
    pub fn out_refs(&self) -> impl Iterator<Item = StateAndRef<LedgerState>> + '_ {
        self.body
            .outputs
            .iter()
            .zip(0u32..)
            .map(|(state, index)| StateAndRef {
                state: state.clone(),
                reference: StateRef::new(self.id, index),
            })
    }
}

// ---------------------------------------------------------------------------
// TransactionBuilder
// ---------------------------------------------------------------------------

/// Incrementally assembles a [`WireTransaction`].
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    body: TransactionBody,
}

impl TransactionBuilder {
    #[must_use]
    pub fn new(notary: Party) -> Self {
        Self {
            body: TransactionBody {
                inputs: Vec::new(),
                references: Vec::new(),
                outputs: Vec::new(),
                commands: Vec::new(),
                notary,
            },
        }
    }

    #[must_use]
    pub fn add_input(mut self, input: StateRef) -> Self {
        self.body.inputs.push(input);
        self
    }

    #[must_use]
    pub fn add_reference(mut self, reference: StateRef) -> Self {
        self.body.references.push(reference);
        self
    }

    /// Add an output governed by the builder's notary.
    #[must_use]
    pub fn add_output(mut self, state: LedgerState) -> Self {
        let notary = self.body.notary.clone();
        self.body.outputs.push(TransactionState::new(state, notary));
        self
    }

    #[must_use]
    pub fn add_command(mut self, command: Command) -> Self {
        self.body.commands.push(command);
        self
    }

    /// Freeze the builder into a transaction with a computed id.
    pub fn build(self) -> Result<WireTransaction> {
        WireTransaction::from_body(self.body)
    }

    /// Build and sign with `identity` in one step.
    pub fn sign_initial(self, identity: &Identity) -> Result<SignedTransaction> {
        Ok(SignedTransaction::signed_by(self.build()?, identity))
    }
}

// ---------------------------------------------------------------------------
// Signatures
// ---------------------------------------------------------------------------

/// An ed25519 signature by `by` over a transaction id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionSignature {
    pub by: PartyKey,
    pub bytes: Vec<u8>,
}

impl TransactionSignature {
    /// # Errors
    /// Returns [`ClaimError::InvalidSignature`] if verification fails.
    pub fn verify(&self, tx_id: &TxId) -> Result<()> {
        if self.by.verify(tx_id.as_bytes(), &self.bytes) {
            Ok(())
        } else {
            Err(ClaimError::InvalidSignature {
                signer: self.by,
                tx_id: *tx_id,
            })
        }
    }
}

/// A transaction plus the signatures collected so far.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub tx: WireTransaction,
    pub sigs: Vec<TransactionSignature>,
}

impl SignedTransaction {
    /// `tx` carrying only `identity`'s signature.
    #[must_use]
    pub fn signed_by(tx: WireTransaction, identity: &Identity) -> Self {
        let sig = identity.sign(&tx.id);
        Self {
            tx,
            sigs: vec![sig],
        }
    }

    #[must_use]
    pub fn id(&self) -> TxId {
        self.tx.id
    }

    #[must_use]
    pub fn notary(&self) -> &Party {
        &self.tx.body.notary
    }

    #[must_use]
    pub fn is_signed_by(&self, key: &PartyKey) -> bool {
        self.sigs.iter().any(|s| &s.by == key)
    }

    /// Add a signature after checking it. A second signature by the same
    /// key is ignored.
    pub fn with_signature(mut self, sig: TransactionSignature) -> Result<Self> {
        sig.verify(&self.tx.id)?;
        if !self.is_signed_by(&sig.by) {
            self.sigs.push(sig);
        }
        Ok(self)
    }

    /// Required signers that have not signed yet.
    #[must_use]
    pub fn missing_signers(&self) -> BTreeSet<PartyKey> {
        self.tx
            .required_signers()
            .into_iter()
            .filter(|k| !self.is_signed_by(k))
            .collect()
    }

    /// Check the id, every attached signature, and that only keys in
    /// `allowed_missing` are absent from the required set.
    pub fn verify_signatures_except(&self, allowed_missing: &[PartyKey]) -> Result<()> {
        self.tx.verify_id()?;
        for sig in &self.sigs {
            sig.verify(&self.tx.id)?;
        }
        let missing: Vec<PartyKey> = self
            .missing_signers()
            .into_iter()
            .filter(|k| !allowed_missing.contains(k))
            .collect();
        if let Some(first) = missing.first() {
            return Err(ClaimError::SignatureRejected {
                reason: format!(
                    "{} missing {} required signature(s), first {first}",
                    self.tx.id,
                    missing.len()
                ),
            });
        }
        Ok(())
    }

    /// Every required signer has signed.
    pub fn verify_required_signatures(&self) -> Result<()> {
        self.verify_signatures_except(&[])
    }

    /// Fully signed and countersigned by the transaction's notary.
    pub fn verify_finalized(&self) -> Result<()> {
        self.verify_required_signatures()?;
        let notary_key = self.notary().owning_key;
        if !self.is_signed_by(&notary_key) {
            return Err(ClaimError::SignatureRejected {
                reason: format!("{} carries no signature from notary {}", self.tx.id, self.notary()),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::{Amount, TokenType};

    struct Fixture {
        issuer: Identity,
        holder: Identity,
        notary: Identity,
    }

    fn fixture() -> Fixture {
        Fixture {
            issuer: Identity::from_seed("Issuer", [1u8; 32]),
            holder: Identity::from_seed("Holder", [2u8; 32]),
            notary: Identity::from_seed("Notary", [3u8; 32]),
        }
    }

    fn claim_builder(f: &Fixture) -> TransactionBuilder {
        let claim = ClaimRecord::new(
            f.issuer.party().clone(),
            f.holder.party().clone(),
            Amount::new(2, TokenType::new("USD", 2)),
        );
        TransactionBuilder::new(f.notary.party().clone())
            .add_output(LedgerState::Claim(claim))
            .add_reference(StateRef::new(TxId([7u8; 32]), 0))
            .add_command(Command::new(
                CommandKind::CreateClaim,
                vec![f.issuer.key(), f.holder.key()],
            ))
    }

    #[test]
    fn id_is_deterministic_for_same_body() {
        let f = fixture();
        let tx = claim_builder(&f).build().unwrap();
        let again = WireTransaction::from_body(tx.body.clone()).unwrap();
        assert_eq!(tx.id, again.id);
        tx.verify_id().unwrap();
    }

    #[test]
    fn tampered_body_fails_id_check() {
        let f = fixture();
        let mut tx = claim_builder(&f).build().unwrap();
        tx.body.references.clear();
        let err = tx.verify_id().unwrap_err();
        assert!(matches!(err, ClaimError::TransactionIdMismatch { .. }));
    }

    #[test]
    fn required_signers_union_of_commands() {
        let f = fixture();
        let tx = claim_builder(&f).build().unwrap();
        let signers = tx.required_signers();
        assert_eq!(signers.len(), 2);
        assert!(signers.contains(&f.issuer.key()));
        assert!(signers.contains(&f.holder.key()));
    }

    #[test]
    fn partially_signed_reports_missing_holder() {
        let f = fixture();
        let stx = claim_builder(&f).sign_initial(&f.issuer).unwrap();
        assert_eq!(
            stx.missing_signers().into_iter().collect::<Vec<_>>(),
            vec![f.holder.key()]
        );
        stx.verify_signatures_except(&[f.holder.key()]).unwrap();
        let err = stx.verify_required_signatures().unwrap_err();
        assert!(matches!(err, ClaimError::SignatureRejected { .. }));
    }

    #[test]
    fn countersigned_and_notarised() {
        let f = fixture();
        let stx = claim_builder(&f).sign_initial(&f.issuer).unwrap();
        let holder_sig = f.holder.sign(&stx.id());
        let stx = stx.with_signature(holder_sig).unwrap();
        stx.verify_required_signatures().unwrap();
        assert!(stx.verify_finalized().is_err());

        let notary_sig = f.notary.sign(&stx.id());
        let stx = stx.with_signature(notary_sig).unwrap();
        stx.verify_finalized().unwrap();
    }

    #[test]
    fn foreign_signature_rejected() {
        let f = fixture();
        let stx = claim_builder(&f).sign_initial(&f.issuer).unwrap();
        let wrong = f.holder.sign(&TxId([0u8; 32]));
        let err = stx.with_signature(wrong).unwrap_err();
        assert!(matches!(err, ClaimError::InvalidSignature { .. }));
    }

    #[test]
    fn duplicate_signature_ignored() {
        let f = fixture();
        let stx = claim_builder(&f).sign_initial(&f.issuer).unwrap();
        let again = f.issuer.sign(&stx.id());
        let stx = stx.with_signature(again).unwrap();
        assert_eq!(stx.sigs.len(), 1);
    }

    #[test]
    fn out_refs_index_outputs() {
        let f = fixture();
        let asset = AssetState::dummy(f.issuer.party().clone(), "ACME", Decimal::new(25, 3));
        let tx = TransactionBuilder::new(f.notary.party().clone())
            .add_output(LedgerState::Asset(asset.clone()))
            .add_command(Command::new(CommandKind::IssueAsset, vec![f.issuer.key()]))
            .build()
            .unwrap();
        let refs: Vec<_> = tx.out_refs().collect();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].reference, StateRef::new(tx.id, 0));
        assert_eq!(tx.out_ref(0).unwrap().into_asset().unwrap().state.data, asset);
        assert!(tx.out_ref(1).is_none());
        assert_eq!(tx.asset_outputs().len(), 1);
        assert!(tx.claim_outputs().is_empty());
    }
}
