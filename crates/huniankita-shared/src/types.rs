use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

/// Account role. Determines which actions a user may perform.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Browsing visitor with an account (favourites etc.), no listings.
    Guest,
    /// Partner/vendor permitted to list properties, subject to token gating.
    Mitra,
    /// Site operator: user management, content, token top-ups.
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Guest => "guest",
            Role::Mitra => "mitra",
            Role::Admin => "admin",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "guest" => Ok(Role::Guest),
            "mitra" => Ok(Role::Mitra),
            "admin" => Ok(Role::Admin),
            other => Err(UnknownVariant::new("role", other)),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Property vocabulary
// ---------------------------------------------------------------------------

/// Kind of rental property offered on the marketplace.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    Kost,
    Guesthouse,
    Villa,
}

impl PropertyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::Kost => "kost",
            PropertyType::Guesthouse => "guesthouse",
            PropertyType::Villa => "villa",
        }
    }
}

impl std::str::FromStr for PropertyType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "kost" => Ok(PropertyType::Kost),
            "guesthouse" => Ok(PropertyType::Guesthouse),
            "villa" => Ok(PropertyType::Villa),
            other => Err(UnknownVariant::new("property type", other)),
        }
    }
}

/// Listing lifecycle status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PropertyStatus {
    Available,
    Pending,
    Sold,
}

impl PropertyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyStatus::Available => "available",
            PropertyStatus::Pending => "pending",
            PropertyStatus::Sold => "sold",
        }
    }
}

impl std::str::FromStr for PropertyStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(PropertyStatus::Available),
            "pending" => Ok(PropertyStatus::Pending),
            "sold" => Ok(PropertyStatus::Sold),
            other => Err(UnknownVariant::new("property status", other)),
        }
    }
}

/// Billing period the listed price refers to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PriceUnit {
    Monthly,
    Yearly,
    Daily,
}

impl PriceUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriceUnit::Monthly => "monthly",
            PriceUnit::Yearly => "yearly",
            PriceUnit::Daily => "daily",
        }
    }
}

impl std::str::FromStr for PriceUnit {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "monthly" => Ok(PriceUnit::Monthly),
            "yearly" => Ok(PriceUnit::Yearly),
            "daily" => Ok(PriceUnit::Daily),
            other => Err(UnknownVariant::new("price unit", other)),
        }
    }
}

// ---------------------------------------------------------------------------
// Token gate vocabulary
// ---------------------------------------------------------------------------

/// Paid action guarded by the token ledger gate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    /// Publish a new listing.
    Upload,
    /// Elevate an existing listing for a limited window.
    Boost,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Upload => "upload",
            ActionKind::Boost => "boost",
        }
    }
}

impl std::str::FromStr for ActionKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "upload" => Ok(ActionKind::Upload),
            "boost" => Ok(ActionKind::Boost),
            other => Err(UnknownVariant::new("action", other)),
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a read-only gate check.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "decision", rename_all = "lowercase")]
pub enum Decision {
    /// The action may proceed at the quoted cost.
    Approved { cost: i64 },
    /// The action may not proceed.
    Denied { reason: DenyReason, shortfall: i64 },
}

impl Decision {
    pub fn is_approved(&self) -> bool {
        matches!(self, Decision::Approved { .. })
    }
}

/// Why a gate check denied the action.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    /// Balance below the action's current cost.
    InsufficientTokens,
}

// ---------------------------------------------------------------------------
// Parse error
// ---------------------------------------------------------------------------

/// A string did not name a known enum variant.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown {what}: {value}")]
pub struct UnknownVariant {
    what: &'static str,
    value: String,
}

impl UnknownVariant {
    fn new(what: &'static str, value: &str) -> Self {
        Self {
            what,
            value: value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn role_round_trip() {
        for role in [Role::Guest, Role::Mitra, Role::Admin] {
            assert_eq!(Role::from_str(role.as_str()).unwrap(), role);
        }
        assert!(Role::from_str("superuser").is_err());
    }

    #[test]
    fn property_type_round_trip() {
        for kind in [
            PropertyType::Kost,
            PropertyType::Guesthouse,
            PropertyType::Villa,
        ] {
            assert_eq!(PropertyType::from_str(kind.as_str()).unwrap(), kind);
        }
    }

    #[test]
    fn action_kind_round_trip() {
        assert_eq!(ActionKind::from_str("upload").unwrap(), ActionKind::Upload);
        assert_eq!(ActionKind::from_str("boost").unwrap(), ActionKind::Boost);
        assert!(ActionKind::from_str("promote").is_err());
    }

    #[test]
    fn decision_serializes_with_tag() {
        let approved = serde_json::to_value(Decision::Approved { cost: 15 }).unwrap();
        assert_eq!(approved["decision"], "approved");
        assert_eq!(approved["cost"], 15);

        let denied = serde_json::to_value(Decision::Denied {
            reason: DenyReason::InsufficientTokens,
            shortfall: 5,
        })
        .unwrap();
        assert_eq!(denied["reason"], "insufficient_tokens");
    }
}
