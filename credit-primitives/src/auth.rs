//! Role-based authorization
//!
//! Restricted operations take the caller from a `CallContext` and check it
//! against an explicit role table. Only the owner may grant or revoke roles.

use crate::types::Address;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use thiserror::Error;

/// Privileged role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    /// Full administrative control
    Owner,
    /// May pause and unpause
    PauseOperator,
    /// May publish merkle roots
    RootUpdater,
    /// May change the interest rate
    InterestSetter,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Owner => "owner",
            Role::PauseOperator => "pause-operator",
            Role::RootUpdater => "root-updater",
            Role::InterestSetter => "interest-setter",
        };
        f.write_str(name)
    }
}

/// Caller lacked a role
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{caller} is not {role}")]
pub struct Unauthorized {
    /// Role that was required
    pub role: Role,
    /// Rejected caller
    pub caller: Address,
}

/// Role table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authorization {
    roles: BTreeMap<Role, BTreeSet<Address>>,
}

impl Authorization {
    /// Create a table with a single owner
    pub fn with_owner(owner: Address) -> Self {
        let mut auth = Self::default();
        auth.roles.entry(Role::Owner).or_default().insert(owner);
        auth
    }

    /// Check membership
    pub fn has_role(&self, role: Role, account: &Address) -> bool {
        self.roles
            .get(&role)
            .map(|members| members.contains(account))
            .unwrap_or(false)
    }

    /// Fail unless `caller` holds `role`
    pub fn require(&self, role: Role, caller: &Address) -> Result<(), Unauthorized> {
        if self.has_role(role, caller) {
            Ok(())
        } else {
            Err(Unauthorized {
                role,
                caller: *caller,
            })
        }
    }

    /// Grant a role (owner only)
    pub fn grant(&mut self, caller: &Address, role: Role, account: Address) -> Result<(), Unauthorized> {
        self.require(Role::Owner, caller)?;
        self.roles.entry(role).or_default().insert(account);
        tracing::info!(%role, %account, "Role granted");
        Ok(())
    }

    /// Revoke a role (owner only)
    pub fn revoke(&mut self, caller: &Address, role: Role, account: &Address) -> Result<(), Unauthorized> {
        self.require(Role::Owner, caller)?;
        if let Some(members) = self.roles.get_mut(&role) {
            members.remove(account);
        }
        tracing::info!(%role, %account, "Role revoked");
        Ok(())
    }

    /// Accounts holding a role
    pub fn members(&self, role: Role) -> Vec<Address> {
        self.roles
            .get(&role)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }
}
