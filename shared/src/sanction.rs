use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use crate::league::{Team, TeamMember};

/// Normalized player name used to match sanction fees to roster entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct PlayerKey(String);

impl PlayerKey {
    pub fn new(name: &str) -> Self {
        let collapsed = name.split_whitespace().collect::<Vec<_>>().join(" ");
        Self(collapsed.to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for PlayerKey {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl fmt::Display for PlayerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Players whose sanction fee was included in a collected payment.
pub fn sanction_paid_set(team: &Team) -> HashSet<PlayerKey> {
    team.weekly_payments
        .iter()
        .filter(|payment| payment.paid.counts_as_collected())
        .flat_map(|payment| payment.bca_sanction_players.iter())
        .map(|name| PlayerKey::new(name))
        .filter(|key| !key.is_empty())
        .collect()
}

/// Roster members who still owe a sanction fee, in roster order.
pub fn unpaid_sanction_players(team: &Team) -> Vec<&TeamMember> {
    let paid = sanction_paid_set(team);
    team.team_members
        .iter()
        .filter(|member| member.bca_sanctioned && !member.previously_sanctioned)
        .filter(|member| !paid.contains(&PlayerKey::new(&member.name)))
        .collect()
}
