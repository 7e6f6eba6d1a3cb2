//! Score registry with delayed root rotation
//!
//! The registry keeps two roots. Proofs verify only against `current_root`;
//! a newly published root waits in `upcoming_root` for one full delay period
//! before it is promoted. While paused, the owner may overwrite the upcoming
//! root without promoting it, so a bad root can be cut off before it is ever
//! trusted.

use crate::error::{RegistryError, Result};
use crate::merkle::{leaf_hash, verify_proof};
use credit_primitives::{Address, Authorization, CallContext, ProtocolTag, Role, ScoreProof};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

const EMPTY_ROOT: [u8; 32] = [0u8; 32];

/// Root pair and rotation timing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleRootState {
    /// Root proofs verify against
    pub current_root: [u8; 32],

    /// Root promoted at the next rotation
    pub upcoming_root: [u8; 32],

    /// Timestamp of the last promotion
    pub last_root_update: u64,

    /// Minimum seconds between promotions
    pub root_delay: u64,
}

impl MerkleRootState {
    /// Earliest timestamp the next promotion may happen
    pub fn ready_at(&self) -> u64 {
        self.last_root_update.saturating_add(self.root_delay)
    }
}

/// Verified score
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRecord {
    /// Account the score belongs to
    pub account: Address,

    /// Protocol tag
    pub protocol: ProtocolTag,

    /// Score value
    pub score: u128,

    /// When the root proving this score became current
    pub last_updated: u64,
}

/// Merkle-root score registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreRegistry {
    state: MerkleRootState,
    epoch: u64,
    paused: bool,
    auth: Authorization,
}

impl ScoreRegistry {
    /// Create a registry owned by `owner`
    ///
    /// `genesis_root` seeds both the current and upcoming root; a zero
    /// genesis root verifies nothing until the first promotion.
    pub fn new(owner: Address, genesis_root: [u8; 32], root_delay: u64, now: u64) -> Result<Self> {
        if root_delay == 0 {
            return Err(RegistryError::InvalidDelay(root_delay));
        }

        info!(
            owner = %owner,
            root_delay,
            genesis = %hex::encode(genesis_root),
            "Score registry created"
        );

        Ok(Self {
            state: MerkleRootState {
                current_root: genesis_root,
                upcoming_root: genesis_root,
                last_root_update: now,
                root_delay,
            },
            epoch: 0,
            paused: false,
            auth: Authorization::with_owner(owner),
        })
    }

    /// Publish a new root
    ///
    /// Unpaused: root updater only, at or after the delay boundary; promotes
    /// the upcoming root and queues `new_root`. Paused: owner only; replaces
    /// the upcoming root and leaves the timestamp untouched.
    pub fn update_root(&mut self, ctx: &CallContext, new_root: [u8; 32]) -> Result<()> {
        if new_root == EMPTY_ROOT {
            return Err(RegistryError::EmptyRoot);
        }

        if self.paused {
            self.auth.require(Role::Owner, &ctx.caller)?;
            self.state.upcoming_root = new_root;
            warn!(
                upcoming = %hex::encode(new_root),
                "Upcoming root overridden while paused"
            );
            return Ok(());
        }

        self.auth.require(Role::RootUpdater, &ctx.caller)?;
        let ready_at = self.state.ready_at();
        if ctx.now < ready_at {
            return Err(RegistryError::DelayNotElapsed {
                now: ctx.now,
                ready_at,
            });
        }

        self.state.current_root = self.state.upcoming_root;
        self.state.upcoming_root = new_root;
        self.state.last_root_update = ctx.now;
        self.epoch += 1;

        info!(
            epoch = self.epoch,
            current = %hex::encode(self.state.current_root),
            upcoming = %hex::encode(new_root),
            "Merkle root rotated"
        );
        Ok(())
    }

    /// True if the proof verifies against the current root
    ///
    /// A zero account, a zero current root, a missing leaf and a bad path
    /// are all the same outcome.
    pub fn verify(&self, proof: &ScoreProof) -> bool {
        if proof.is_empty() || self.state.current_root == EMPTY_ROOT {
            return false;
        }
        let leaf = leaf_hash(&proof.account, &proof.protocol, proof.score);
        let valid = verify_proof(&self.state.current_root, &leaf, &proof.merkle_proof);
        debug!(account = %proof.account, valid, "Score proof checked");
        valid
    }

    /// Verify and materialize the score
    pub fn verify_score(&self, proof: &ScoreProof) -> Result<ScoreRecord> {
        if !self.verify(proof) {
            return Err(RegistryError::InvalidProof);
        }
        Ok(ScoreRecord {
            account: proof.account,
            protocol: proof.protocol,
            score: proof.score,
            last_updated: self.state.last_root_update,
        })
    }

    /// Pause or unpause (pause operator only)
    pub fn set_paused(&mut self, ctx: &CallContext, paused: bool) -> Result<()> {
        self.auth.require(Role::PauseOperator, &ctx.caller)?;
        self.paused = paused;
        info!(paused, "Registry pause state changed");
        Ok(())
    }

    /// Change the rotation delay (owner only)
    pub fn set_root_delay(&mut self, ctx: &CallContext, root_delay: u64) -> Result<()> {
        self.auth.require(Role::Owner, &ctx.caller)?;
        if root_delay == 0 {
            return Err(RegistryError::InvalidDelay(root_delay));
        }
        self.state.root_delay = root_delay;
        info!(root_delay, "Root delay changed");
        Ok(())
    }

    /// Grant a role (owner only)
    pub fn grant_role(&mut self, ctx: &CallContext, role: Role, account: Address) -> Result<()> {
        Ok(self.auth.grant(&ctx.caller, role, account)?)
    }

    /// Revoke a role (owner only)
    pub fn revoke_role(&mut self, ctx: &CallContext, role: Role, account: &Address) -> Result<()> {
        Ok(self.auth.revoke(&ctx.caller, role, account)?)
    }

    /// Number of promotions so far
    pub fn current_epoch(&self) -> u64 {
        self.epoch
    }

    /// Root pair and timing
    pub fn root_state(&self) -> &MerkleRootState {
        &self.state
    }

    /// Pause flag
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Role table
    pub fn authorization(&self) -> &Authorization {
        &self.auth
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merkle::MerkleTree;

    const DELAY: u64 = 3_600;
    const T0: u64 = 1_700_000_000;

    struct Fixture {
        registry: ScoreRegistry,
        owner: Address,
        updater: Address,
    }

    fn fixture() -> Fixture {
        let owner = Address::from_label("owner");
        let updater = Address::from_label("updater");
        let mut registry = ScoreRegistry::new(owner, EMPTY_ROOT, DELAY, T0).unwrap();
        let ctx = CallContext::new(owner, T0);
        registry.grant_role(&ctx, Role::RootUpdater, updater).unwrap();
        registry.grant_role(&ctx, Role::PauseOperator, owner).unwrap();
        Fixture {
            registry,
            owner,
            updater,
        }
    }

    fn root(byte: u8) -> [u8; 32] {
        [byte; 32]
    }

    #[test]
    fn test_rotation_promotes_upcoming() {
        let mut f = fixture();
        f.registry
            .update_root(&CallContext::new(f.updater, T0 + DELAY), root(1))
            .unwrap();
        assert_eq!(f.registry.root_state().current_root, EMPTY_ROOT);
        assert_eq!(f.registry.root_state().upcoming_root, root(1));
        assert_eq!(f.registry.current_epoch(), 1);

        f.registry
            .update_root(&CallContext::new(f.updater, T0 + 2 * DELAY), root(2))
            .unwrap();
        assert_eq!(f.registry.root_state().current_root, root(1));
        assert_eq!(f.registry.root_state().last_root_update, T0 + 2 * DELAY);
    }

    #[test]
    fn test_delay_enforced() {
        let mut f = fixture();
        let err = f
            .registry
            .update_root(&CallContext::new(f.updater, T0 + DELAY - 1), root(1))
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::DelayNotElapsed {
                now: T0 + DELAY - 1,
                ready_at: T0 + DELAY
            }
        );
        assert_eq!(f.registry.current_epoch(), 0);
    }

    #[test]
    fn test_second_rotation_waits_full_delay() {
        let mut f = fixture();
        let t = T0 + DELAY;
        f.registry
            .update_root(&CallContext::new(f.updater, t), root(1))
            .unwrap();

        let err = f
            .registry
            .update_root(&CallContext::new(f.updater, t + 1), root(2))
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::DelayNotElapsed {
                now: t + 1,
                ready_at: t + DELAY
            }
        );
        assert_eq!(f.registry.root_state().upcoming_root, root(1));
        assert_eq!(f.registry.current_epoch(), 1);

        f.registry
            .update_root(&CallContext::new(f.updater, t + DELAY), root(2))
            .unwrap();
        let state = f.registry.root_state();
        assert_eq!(state.current_root, root(1));
        assert_eq!(state.upcoming_root, root(2));
        assert_eq!(state.last_root_update, t + DELAY);
        assert_eq!(f.registry.current_epoch(), 2);
    }

    #[test]
    fn test_empty_root_rejected() {
        let mut f = fixture();
        let err = f
            .registry
            .update_root(&CallContext::new(f.updater, T0 + DELAY), EMPTY_ROOT)
            .unwrap_err();
        assert_eq!(err, RegistryError::EmptyRoot);
    }

    #[test]
    fn test_only_updater_rotates_when_unpaused() {
        let mut f = fixture();
        let err = f
            .registry
            .update_root(&CallContext::new(f.owner, T0 + DELAY), root(1))
            .unwrap_err();
        assert!(matches!(err, RegistryError::Unauthorized(_)));
    }

    #[test]
    fn test_paused_owner_override() {
        let mut f = fixture();
        f.registry
            .set_paused(&CallContext::new(f.owner, T0), true)
            .unwrap();

        // Updater is locked out while paused
        assert!(f
            .registry
            .update_root(&CallContext::new(f.updater, T0 + DELAY), root(1))
            .is_err());

        f.registry
            .update_root(&CallContext::new(f.owner, T0 + 5), root(9))
            .unwrap();
        let state = f.registry.root_state();
        assert_eq!(state.upcoming_root, root(9));
        assert_eq!(state.current_root, EMPTY_ROOT);
        assert_eq!(state.last_root_update, T0);
        assert_eq!(f.registry.current_epoch(), 0);
    }

    #[test]
    fn test_verify_against_current_root_only() {
        let mut f = fixture();
        let protocol = ProtocolTag::from_label("arcx.credit");
        let alice = Address::from_label("alice");
        let bob = Address::from_label("bob");

        let mut tree = MerkleTree::from_leaves(vec![
            leaf_hash(&alice, &protocol, 500),
            leaf_hash(&bob, &protocol, 900),
        ]);
        let published = tree.root();
        let proof = ScoreProof::new(alice, protocol, 500, tree.proof(0).unwrap());

        f.registry
            .update_root(&CallContext::new(f.updater, T0 + DELAY), published)
            .unwrap();
        // Still upcoming
        assert!(!f.registry.verify(&proof));

        f.registry
            .update_root(&CallContext::new(f.updater, T0 + 2 * DELAY), root(7))
            .unwrap();
        assert!(f.registry.verify(&proof));

        let record = f.registry.verify_score(&proof).unwrap();
        assert_eq!(record.score, 500);
        assert_eq!(record.last_updated, T0 + 2 * DELAY);

        let forged = ScoreProof::new(alice, protocol, 999, proof.merkle_proof.clone());
        assert_eq!(
            f.registry.verify_score(&forged).unwrap_err(),
            RegistryError::InvalidProof
        );
        assert!(!f.registry.verify(&ScoreProof::empty(protocol)));
    }

    #[test]
    fn test_set_root_delay() {
        let mut f = fixture();
        let ctx = CallContext::new(f.owner, T0);
        assert_eq!(
            f.registry.set_root_delay(&ctx, 0).unwrap_err(),
            RegistryError::InvalidDelay(0)
        );
        f.registry.set_root_delay(&ctx, 60).unwrap();
        assert_eq!(f.registry.root_state().ready_at(), T0 + 60);
        assert!(f
            .registry
            .set_root_delay(&CallContext::new(f.updater, T0), 10)
            .is_err());
    }
}
