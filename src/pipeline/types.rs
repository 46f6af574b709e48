//! Core data structures for leaderboard snapshots
//!
//! Field names on the entry types follow the upstream JSON exactly
//! (`Name`, `Value`, `Clan`, `Tag`, `XP`, `MaxPlayers`) so the same serde
//! derive decodes the upstream payload, the stored rows and the API output.

use super::category::{Category, EntryKind};
use super::ids::SnapshotId;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// One player row in a ranking. `value` is kept as upstream formats it.
///
/// Missing or `null` fields decode as `""` so one odd entry does not cost
/// the whole snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerEntry {
    #[serde(rename = "Name", default, deserialize_with = "null_as_empty")]
    pub name: String,
    #[serde(rename = "Value", default, deserialize_with = "null_as_empty")]
    pub value: String,
}

/// One clan row in the `TopClans` ranking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClanEntry {
    #[serde(rename = "Clan", default, deserialize_with = "null_as_empty")]
    pub clan: String,
    #[serde(rename = "Tag", default, deserialize_with = "null_as_empty")]
    pub tag: String,
    #[serde(rename = "XP", default, deserialize_with = "null_as_empty")]
    pub xp: String,
    #[serde(rename = "MaxPlayers", default, deserialize_with = "null_as_empty")]
    pub max_players: String,
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Ordered entries of one category (first = best)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Ranking {
    Clans(Vec<ClanEntry>),
    Players(Vec<PlayerEntry>),
}

impl Ranking {
    pub fn empty(kind: EntryKind) -> Self {
        match kind {
            EntryKind::Clan => Ranking::Clans(Vec::new()),
            EntryKind::Player => Ranking::Players(Vec::new()),
        }
    }

    pub fn kind(&self) -> EntryKind {
        match self {
            Ranking::Clans(_) => EntryKind::Clan,
            Ranking::Players(_) => EntryKind::Player,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Ranking::Clans(entries) => entries.len(),
            Ranking::Players(entries) => entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Decode a JSON array of entries of the given kind
    pub fn decode(kind: EntryKind, value: Value) -> serde_json::Result<Self> {
        Ok(match kind {
            EntryKind::Clan => Ranking::Clans(serde_json::from_value(value)?),
            EntryKind::Player => Ranking::Players(serde_json::from_value(value)?),
        })
    }

    /// Serialize each entry on its own, in rank order (one stored row per entry)
    pub fn entries_json(&self) -> serde_json::Result<Vec<String>> {
        match self {
            Ranking::Clans(entries) => entries.iter().map(serde_json::to_string).collect(),
            Ranking::Players(entries) => entries.iter().map(serde_json::to_string).collect(),
        }
    }

    /// Rebuild a ranking from stored rows produced by `entries_json`
    pub fn from_entries_json<S: AsRef<str>>(kind: EntryKind, rows: &[S]) -> serde_json::Result<Self> {
        Ok(match kind {
            EntryKind::Clan => Ranking::Clans(
                rows.iter()
                    .map(|row| serde_json::from_str(row.as_ref()))
                    .collect::<Result<_, _>>()?,
            ),
            EntryKind::Player => Ranking::Players(
                rows.iter()
                    .map(|row| serde_json::from_str(row.as_ref()))
                    .collect::<Result<_, _>>()?,
            ),
        })
    }
}

/// One full leaderboard capture
///
/// Only categories present in the source payload have a ranking; an absent
/// category and an empty ranking are different things.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    rankings: BTreeMap<Category, Ranking>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of `insert`
    pub fn with_ranking(mut self, category: Category, ranking: Ranking) -> Self {
        self.insert(category, ranking);
        self
    }

    /// Store a ranking under a concrete category
    ///
    /// `Category::All` has no storage field and is ignored.
    pub fn insert(&mut self, category: Category, ranking: Ranking) -> Option<Ranking> {
        if !category.is_concrete() {
            log::debug!("Ignoring ranking for meta category {}", category);
            return None;
        }
        self.rankings.insert(category, ranking)
    }

    pub fn get(&self, category: Category) -> Option<&Ranking> {
        self.rankings.get(&category)
    }

    pub fn contains(&self, category: Category) -> bool {
        self.rankings.contains_key(&category)
    }

    pub fn rankings(&self) -> impl Iterator<Item = (Category, &Ranking)> {
        self.rankings.iter().map(|(category, ranking)| (*category, ranking))
    }

    pub fn is_empty(&self) -> bool {
        self.rankings.is_empty()
    }

    /// Build a snapshot from a JSON object keyed by storage field
    ///
    /// Missing and `null` fields are left out. Keys that are not a storage
    /// field are ignored.
    pub fn from_fields(mut fields: Map<String, Value>) -> serde_json::Result<Self> {
        let mut snapshot = Snapshot::new();

        for category in Category::concrete() {
            let (Some(field), Some(kind)) = (category.storage_field(), category.entry_kind()) else {
                continue;
            };

            match fields.remove(field) {
                None | Some(Value::Null) => {}
                Some(value) => {
                    snapshot.insert(category, Ranking::decode(kind, value)?);
                }
            }
        }

        Ok(snapshot)
    }
}

/// Query result: windows of one snapshot, plus that snapshot's id
///
/// Serializes to `{"Id": "<hex>", "<StorageField>": [...], ...}`. Categories
/// that were not requested, or that the snapshot does not hold, are left
/// out. A cursor that matched nothing produces the empty object `{}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Leaderboard {
    pub id: Option<SnapshotId>,
    pub windows: BTreeMap<Category, Ranking>,
}

impl Leaderboard {
    /// Result for a cursor that did not match any snapshot
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn for_snapshot(id: SnapshotId) -> Self {
        Self {
            id: Some(id),
            windows: BTreeMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.windows.is_empty()
    }

    pub fn window(&self, category: Category) -> Option<&Ranking> {
        self.windows.get(&category)
    }
}

impl Serialize for Leaderboard {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = self.windows.len() + usize::from(self.id.is_some());
        let mut map = serializer.serialize_map(Some(len))?;

        if let Some(id) = &self.id {
            map.serialize_entry("Id", id)?;
        }
        for (category, ranking) in &self.windows {
            if let Some(field) = category.storage_field() {
                map.serialize_entry(field, ranking)?;
            }
        }

        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn player(name: &str, value: &str) -> PlayerEntry {
        PlayerEntry {
            name: name.to_string(),
            value: value.to_string(),
        }
    }

    #[test]
    fn test_from_fields_skips_missing_and_null() {
        let fields = json!({
            "MostKills": [{"Name": "alpha", "Value": "1,204"}],
            "MostXP": null,
            "SomethingElse": 42
        });
        let Value::Object(fields) = fields else { unreachable!() };

        let snapshot = Snapshot::from_fields(fields).unwrap();

        assert!(snapshot.contains(Category::Kills));
        assert!(!snapshot.contains(Category::Xp));
        assert!(!snapshot.contains(Category::Heals));
        assert_eq!(
            snapshot.get(Category::Kills),
            Some(&Ranking::Players(vec![player("alpha", "1,204")]))
        );
    }

    #[test]
    fn test_empty_list_is_kept() {
        let Value::Object(fields) = json!({"MostHeals": []}) else { unreachable!() };

        let snapshot = Snapshot::from_fields(fields).unwrap();

        assert_eq!(snapshot.get(Category::Heals), Some(&Ranking::Players(vec![])));
    }

    #[test]
    fn test_clans_decode_as_clan_entries() {
        let Value::Object(fields) = json!({
            "TopClans": [{"Clan": "Wolves", "Tag": "WLF", "XP": "99000", "MaxPlayers": "64"}]
        }) else {
            unreachable!()
        };

        let snapshot = Snapshot::from_fields(fields).unwrap();

        match snapshot.get(Category::Clans) {
            Some(Ranking::Clans(entries)) => {
                assert_eq!(entries[0].tag, "WLF");
                assert_eq!(entries[0].max_players, "64");
            }
            other => panic!("expected clan ranking, got {:?}", other),
        }
    }

    #[test]
    fn test_null_and_missing_entry_fields_are_empty() {
        let Value::Object(fields) = json!({
            "MostKills": [{"Name": "a", "Value": null}, {"Name": "b"}],
            "TopClans": [{"Clan": "Wolves", "Tag": null, "XP": "5"}]
        }) else { unreachable!() };

        let snapshot = Snapshot::from_fields(fields).unwrap();

        assert_eq!(
            snapshot.get(Category::Kills),
            Some(&Ranking::Players(vec![player("a", ""), player("b", "")]))
        );
        match snapshot.get(Category::Clans) {
            Some(Ranking::Clans(clans)) => {
                assert_eq!(clans[0].clan, "Wolves");
                assert_eq!(clans[0].tag, "");
                assert_eq!(clans[0].max_players, "");
            }
            other => panic!("expected clans, got {:?}", other),
        }
    }

    #[test]
    fn test_non_string_entry_field_is_an_error() {
        let Value::Object(fields) = json!({"MostKills": [{"Name": "a", "Value": 12}]}) else { unreachable!() };
        assert!(Snapshot::from_fields(fields).is_err());
    }

    #[test]
    fn test_wrong_shape_is_an_error() {
        let Value::Object(fields) = json!({"MostKills": {"Name": "x"}}) else { unreachable!() };
        assert!(Snapshot::from_fields(fields).is_err());
    }

    #[test]
    fn test_insert_ignores_meta_category() {
        let mut snapshot = Snapshot::new();
        snapshot.insert(Category::All, Ranking::Players(vec![]));
        assert!(snapshot.is_empty());
    }

    #[test]
    fn test_stored_rows_rebuild_ranking() {
        let ranking = Ranking::Players(vec![player("a", "1"), player("b", "2")]);
        let rows = ranking.entries_json().unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(Ranking::from_entries_json(EntryKind::Player, &rows).unwrap(), ranking);
    }

    #[test]
    fn test_leaderboard_serializes_only_present_windows() {
        let id = SnapshotId::new();
        let mut leaderboard = Leaderboard::for_snapshot(id);
        leaderboard
            .windows
            .insert(Category::Xp, Ranking::Players(vec![player("a", "10")]));

        let value = serde_json::to_value(&leaderboard).unwrap();

        assert_eq!(
            value,
            json!({
                "Id": id.to_hex(),
                "MostXP": [{"Name": "a", "Value": "10"}]
            })
        );
    }

    #[test]
    fn test_empty_leaderboard_serializes_to_empty_object() {
        let value = serde_json::to_value(Leaderboard::empty()).unwrap();
        assert_eq!(value, json!({}));
    }
}
