//! Payloads returned by the OpenDota API.
//!
//! Only the fields the pipeline makes decisions on are typed. Payloads that
//! get staged keep the JSON the API returned and serialize back to exactly
//! that.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

type Fields = serde_json::Map<String, serde_json::Value>;

/// Decodes the typed view of a payload next to the payload itself.
fn with_raw<'de, D, T>(deserializer: D) -> Result<(T, serde_json::Value), D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    let typed = T::deserialize(&raw).map_err(serde::de::Error::custom)?;
    Ok((typed, raw))
}

/// Entry of `GET /teams/{id}/matches`.
///
/// Either field may be missing or `null` for a single entry without making
/// the rest of the list unusable.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MatchSummary {
    #[serde(default)]
    pub match_id: Option<i64>,
    #[serde(default)]
    pub start_time: Option<i64>,
}

/// Response of `GET /matches/{id}`.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchDetails {
    pub match_id: i64,
    pub start_time: Option<i64>,
    pub radiant_team_id: Option<i64>,
    pub dire_team_id: Option<i64>,
    pub players: Vec<MatchPlayer>,
    /// The payload as returned by the API.
    pub raw: serde_json::Value,
}

#[derive(Deserialize)]
struct MatchDetailsFields {
    match_id: i64,
    #[serde(default)]
    start_time: Option<i64>,
    #[serde(default)]
    radiant_team_id: Option<i64>,
    #[serde(default)]
    dire_team_id: Option<i64>,
    #[serde(default)]
    players: Option<Vec<MatchPlayer>>,
}

impl<'de> Deserialize<'de> for MatchDetails {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let (fields, raw): (MatchDetailsFields, _) = with_raw(deserializer)?;

        Ok(Self {
            match_id: fields.match_id,
            start_time: fields.start_time,
            radiant_team_id: fields.radiant_team_id,
            dire_team_id: fields.dire_team_id,
            players: fields.players.unwrap_or_default(),
            raw,
        })
    }
}

impl Serialize for MatchDetails {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.raw.serialize(serializer)
    }
}

impl MatchDetails {
    pub fn players(&self) -> &[MatchPlayer] {
        &self.players
    }

    /// Radiant and dire team ids, skipping sides without a registered team.
    pub fn team_ids(&self) -> impl Iterator<Item = i64> {
        [self.radiant_team_id, self.dire_team_id]
            .into_iter()
            .flatten()
            .filter(|id| *id != 0)
    }
}

/// A single participant embedded in [`MatchDetails`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MatchPlayer {
    #[serde(default)]
    pub account_id: Option<i64>,
    #[serde(default)]
    pub personaname: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl MatchPlayer {
    /// The account id, unless the player is anonymous.
    pub fn known_account_id(&self) -> Option<i64> {
        match self.account_id {
            None | Some(0) | Some(crate::ANONYMOUS_ACCOUNT_ID) => None,
            Some(id) => Some(id),
        }
    }

    /// Reshapes the participant into the envelope `GET /players/{id}` uses.
    ///
    /// Returns `None` for anonymous players.
    pub fn profile(&self) -> Option<PlayerProfile> {
        let account_id = self.known_account_id()?;
        let personaname = self
            .personaname
            .clone()
            .unwrap_or_else(|| "Unknown".to_owned());
        let name = self.name.clone().unwrap_or_else(|| personaname.clone());

        let raw = serde_json::json!({
            "profile": {
                "account_id": account_id,
                "personaname": personaname,
                "name": name,
            }
        });

        Some(PlayerProfile {
            account_id,
            personaname: Some(personaname),
            name: Some(name),
            raw,
        })
    }
}

/// Response of `GET /players/{id}`, or the same envelope built from a
/// [`MatchPlayer`].
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerProfile {
    pub account_id: i64,
    pub personaname: Option<String>,
    pub name: Option<String>,
    pub raw: serde_json::Value,
}

#[derive(Deserialize)]
struct PlayerProfileFields {
    profile: ProfileFields,
}

#[derive(Deserialize)]
struct ProfileFields {
    account_id: i64,
    #[serde(default)]
    personaname: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

impl<'de> Deserialize<'de> for PlayerProfile {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let (fields, raw): (PlayerProfileFields, _) = with_raw(deserializer)?;

        Ok(Self {
            account_id: fields.profile.account_id,
            personaname: fields.profile.personaname,
            name: fields.profile.name,
            raw,
        })
    }
}

impl Serialize for PlayerProfile {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.raw.serialize(serializer)
    }
}

impl PlayerProfile {
    pub fn account_id(&self) -> i64 {
        self.account_id
    }
}

/// Response of `GET /teams/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub team_id: i64,
    #[serde(flatten)]
    pub other: Fields,
}

/// Entry of `GET /heroes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hero {
    pub id: i64,
    #[serde(flatten)]
    pub other: Fields,
}
