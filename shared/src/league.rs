use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

/// Whether a weekly payment was made. Stored by the UI as either a JSON bool
/// or one of the strings `"true"`, `"false"`, `"partial"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaidStatus {
    Paid,
    #[default]
    Unpaid,
    Partial,
}

impl PaidStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Paid => "true",
            Self::Unpaid => "false",
            Self::Partial => "partial",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "true" => Some(Self::Paid),
            "false" => Some(Self::Unpaid),
            "partial" => Some(Self::Partial),
            _ => None,
        }
    }

    /// Paid and partial payments both count as money received.
    pub fn counts_as_collected(self) -> bool {
        matches!(self, Self::Paid | Self::Partial)
    }
}

impl Serialize for PaidStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PaidStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Flag(bool),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Flag(true) => Ok(Self::Paid),
            Raw::Flag(false) => Ok(Self::Unpaid),
            Raw::Text(text) => Self::parse(&text).ok_or_else(|| {
                de::Error::invalid_value(de::Unexpected::Str(&text), &"true, false or partial")
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub week: u32,
    #[serde(default)]
    pub paid: PaidStatus,
    #[serde(default)]
    pub amount: f64,
    #[serde(default, alias = "payment_date")]
    pub payment_date: Option<String>,
    #[serde(default, alias = "bca_sanction_players")]
    pub bca_sanction_players: Vec<String>,
    #[serde(default, alias = "payment_method", skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TeamMember {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, alias = "bca_sanctioned")]
    pub bca_sanctioned: bool,
    #[serde(default, alias = "previously_sanctioned")]
    pub previously_sanctioned: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    #[serde(default)]
    pub id: String,
    #[serde(alias = "team_name")]
    pub team_name: String,
    #[serde(default, alias = "captain_name")]
    pub captain_name: String,
    /// Division name, not id.
    pub division: String,
    #[serde(default, alias = "team_members")]
    pub team_members: Vec<TeamMember>,
    #[serde(default, alias = "weekly_payments")]
    pub weekly_payments: Vec<Payment>,
    #[serde(default)]
    pub archived: bool,
    #[serde(default, alias = "created_at", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, alias = "updated_at", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Team {
    /// Weeks that have at least one collected payment, ascending.
    pub fn paid_weeks(&self) -> Vec<u32> {
        let mut weeks: Vec<u32> = self
            .weekly_payments
            .iter()
            .filter(|payment| payment.paid.counts_as_collected())
            .map(|payment| payment.week)
            .collect();
        weeks.sort_unstable();
        weeks.dedup();
        weeks
    }

    pub fn has_collected_payment_for(&self, week: u32) -> bool {
        self.weekly_payments
            .iter()
            .any(|payment| payment.week == week && payment.paid.counts_as_collected())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Division {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default, alias = "start_date")]
    pub start_date: Option<String>,
    #[serde(default = "default_total_weeks", alias = "total_weeks")]
    pub total_weeks: u32,
    /// Per-week overrides; index 0 is week 1.
    #[serde(default, alias = "week_play_dates")]
    pub week_play_dates: Vec<Option<String>>,
    #[serde(default, alias = "dues_per_player_per_match")]
    pub dues_per_player_per_match: f64,
    #[serde(default = "default_players_per_week", alias = "players_per_week")]
    pub players_per_week: u32,
    #[serde(default, alias = "day_of_play", skip_serializing_if = "Option::is_none")]
    pub day_of_play: Option<String>,
    #[serde(default = "default_is_active", alias = "is_active")]
    pub is_active: bool,
}

pub const DEFAULT_TOTAL_WEEKS: u32 = 20;
pub const DEFAULT_PLAYERS_PER_WEEK: u32 = 5;

fn default_total_weeks() -> u32 {
    DEFAULT_TOTAL_WEEKS
}

fn default_players_per_week() -> u32 {
    DEFAULT_PLAYERS_PER_WEEK
}

fn default_is_active() -> bool {
    true
}

impl Division {
    /// Dues owed by one team for one week of play.
    pub fn weekly_dues(&self) -> f64 {
        self.dues_per_player_per_match * f64::from(self.players_per_week)
    }

    /// True when any week carries a non-blank date override.
    pub fn has_custom_play_dates(&self) -> bool {
        self.week_play_dates
            .iter()
            .flatten()
            .any(|date| !date.trim().is_empty())
    }

    pub fn week_override(&self, week: u32) -> Option<&str> {
        let idx = usize::try_from(week.checked_sub(1)?).ok()?;
        self.week_play_dates
            .get(idx)?
            .as_deref()
            .filter(|date| !date.trim().is_empty())
    }
}
