//! Leaderboard categories
//!
//! One table maps every category to its wire token (the `category=` query
//! parameter) and to its storage field (the upstream JSON key, reused as the
//! column value in the append log). Lookups in either direction go through
//! `CATEGORY_TABLE`; there is no second mapping to keep in sync.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Entry shape stored under a category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Clan,
    Player,
}

/// A leaderboard ranking axis
///
/// `All` is a request-side meta value. It never has a storage field and is
/// never stored in a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    All,
    Clans,
    Xp,
    Heals,
    Revives,
    VehiclesDestroyed,
    VehicleRepairs,
    Roadkills,
    LongestKill,
    Objectives,
    Kills,
}

struct CategoryRow {
    category: Category,
    token: &'static str,
    storage: Option<(&'static str, EntryKind)>,
}

// Row order must match the enum discriminants (checked in tests).
const CATEGORY_TABLE: [CategoryRow; 11] = [
    CategoryRow { category: Category::All, token: "all", storage: None },
    CategoryRow { category: Category::Clans, token: "clans", storage: Some(("TopClans", EntryKind::Clan)) },
    CategoryRow { category: Category::Xp, token: "xp", storage: Some(("MostXP", EntryKind::Player)) },
    CategoryRow { category: Category::Heals, token: "heals", storage: Some(("MostHeals", EntryKind::Player)) },
    CategoryRow { category: Category::Revives, token: "revives", storage: Some(("MostRevives", EntryKind::Player)) },
    CategoryRow {
        category: Category::VehiclesDestroyed,
        token: "vehicles_destroyed",
        storage: Some(("MostVehiclesDestroyed", EntryKind::Player)),
    },
    CategoryRow {
        category: Category::VehicleRepairs,
        token: "vehicle_repairs",
        storage: Some(("MostVehicleRepairs", EntryKind::Player)),
    },
    CategoryRow { category: Category::Roadkills, token: "roadkills", storage: Some(("MostRoadkills", EntryKind::Player)) },
    CategoryRow {
        category: Category::LongestKill,
        token: "longest_kill",
        storage: Some(("MostLongestKill", EntryKind::Player)),
    },
    CategoryRow { category: Category::Objectives, token: "objectives", storage: Some(("MostObjectives", EntryKind::Player)) },
    CategoryRow { category: Category::Kills, token: "kills", storage: Some(("MostKills", EntryKind::Player)) },
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown category: {0}")]
pub struct UnknownCategory(pub String);

impl Category {
    fn row(self) -> &'static CategoryRow {
        &CATEGORY_TABLE[self as usize]
    }

    /// Look up a category by its wire token (`xp`, `vehicles_destroyed`, ...)
    pub fn from_token(token: &str) -> Option<Self> {
        CATEGORY_TABLE
            .iter()
            .find(|row| row.token == token)
            .map(|row| row.category)
    }

    /// Look up a concrete category by its storage field (`MostXP`, ...)
    pub fn from_storage_field(field: &str) -> Option<Self> {
        CATEGORY_TABLE
            .iter()
            .find(|row| matches!(row.storage, Some((name, _)) if name == field))
            .map(|row| row.category)
    }

    pub fn token(self) -> &'static str {
        self.row().token
    }

    /// Storage field, `None` for `All`
    pub fn storage_field(self) -> Option<&'static str> {
        self.row().storage.map(|(field, _)| field)
    }

    /// Entry shape, `None` for `All`
    pub fn entry_kind(self) -> Option<EntryKind> {
        self.row().storage.map(|(_, kind)| kind)
    }

    pub fn is_concrete(self) -> bool {
        self.row().storage.is_some()
    }

    /// Every category that maps to a storage field, in table order
    pub fn concrete() -> impl Iterator<Item = Category> {
        CATEGORY_TABLE
            .iter()
            .filter(|row| row.storage.is_some())
            .map(|row| row.category)
    }

    /// Expand a requested set into concrete categories
    ///
    /// An empty request, or one containing `All`, selects every concrete
    /// category. Otherwise the request is returned as a set.
    pub fn resolve<I>(requested: I) -> BTreeSet<Category>
    where
        I: IntoIterator<Item = Category>,
    {
        let requested: BTreeSet<Category> = requested.into_iter().collect();

        if requested.is_empty() || requested.contains(&Category::All) {
            Self::concrete().collect()
        } else {
            requested
        }
    }
}

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_token(s).ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}
