//! Sidebar derivation: the pure ordering rule behind the server list.
//!
//! Unfoldered guilds first, newest join first; then one entry per
//! gateway-provided folder in original order. A folder without an id is a
//! transparent passthrough for its first guild.

use std::collections::HashSet;

use client_core::GatewayCache;
use shared::domain::{Guild, Snowflake, DM_GUILD_ID};

#[derive(Debug, Clone, PartialEq)]
pub enum ServerListItem {
    Guild(Guild),
    Folder(FolderEntry),
}

impl ServerListItem {
    /// Stable identity for selection and per-row widget state.
    pub fn key(&self) -> &Snowflake {
        match self {
            ServerListItem::Guild(guild) => &guild.id,
            ServerListItem::Folder(folder) => &folder.id,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FolderEntry {
    pub id: Snowflake,
    pub name: String,
    pub color: Option<u32>,
    pub guilds: Vec<Guild>,
}

pub fn derive_server_list(cache: &GatewayCache) -> Vec<ServerListItem> {
    let foldered: HashSet<&Snowflake> = cache
        .folders
        .iter()
        .flat_map(|folder| folder.guild_ids.iter())
        .collect();

    let mut unfoldered: Vec<&Guild> = cache
        .guilds
        .values()
        .filter(|guild| !foldered.contains(&guild.id))
        .collect();
    // Join time is the ordering contract; the id tiebreak only pins down
    // guilds joined in the same instant.
    unfoldered.sort_by(|a, b| {
        b.joined_at
            .cmp(&a.joined_at)
            .then_with(|| b.id.cmp(&a.id))
    });

    let mut items: Vec<ServerListItem> = unfoldered
        .into_iter()
        .cloned()
        .map(ServerListItem::Guild)
        .collect();

    for folder in &cache.folders {
        match &folder.id {
            Some(id) => {
                let guilds: Vec<Guild> = folder
                    .guild_ids
                    .iter()
                    .filter_map(|guild_id| cache.guild(guild_id).cloned())
                    .collect();
                let name = folder.name.clone().unwrap_or_else(|| {
                    guilds
                        .iter()
                        .map(|guild| guild.name.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                });
                items.push(ServerListItem::Folder(FolderEntry {
                    id: id.clone(),
                    name,
                    color: folder.color,
                    guilds,
                }));
            }
            None => {
                // Transparent passthrough: render the referenced guild as if
                // it stood alone, or nothing when the cache does not know it.
                let Some(first) = folder.guild_ids.first() else {
                    continue;
                };
                if let Some(guild) = cache.guild(first) {
                    items.push(ServerListItem::Guild(guild.clone()));
                }
            }
        }
    }

    items
}

/// Restores the last-viewed guild: a stored id survives only while it is
/// still "@me" or present in the cache, otherwise selection falls back to
/// the DM pseudo-guild.
pub fn restore_selection(stored: Option<Snowflake>, cache: &GatewayCache) -> Snowflake {
    match stored {
        Some(id) if id.is_dm() || cache.contains_guild(&id) => id,
        _ => Snowflake::new(DM_GUILD_ID),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;
    use shared::domain::GuildFolder;
    use std::collections::HashMap;

    fn guild(id: &str, name: &str, joined_secs: i64) -> Guild {
        Guild {
            id: Snowflake::new(id),
            name: name.to_string(),
            icon: None,
            joined_at: Utc.timestamp_opt(joined_secs, 0).unwrap(),
            features: Vec::new(),
        }
    }

    fn cache_of(guilds: Vec<Guild>, folders: Vec<GuildFolder>) -> GatewayCache {
        GatewayCache {
            guilds: guilds
                .into_iter()
                .map(|guild| (guild.id.clone(), guild))
                .collect(),
            folders,
            dms: Vec::new(),
        }
    }

    fn folder(id: Option<&str>, name: Option<&str>, guild_ids: &[&str]) -> GuildFolder {
        GuildFolder {
            id: id.map(Snowflake::new),
            name: name.map(str::to_string),
            color: None,
            guild_ids: guild_ids.iter().map(|id| Snowflake::new(*id)).collect(),
        }
    }

    #[test]
    fn unfoldered_guilds_sort_by_descending_join_time() {
        let cache = cache_of(
            vec![guild("a", "A", 3), guild("b", "B", 1), guild("c", "C", 2)],
            Vec::new(),
        );
        let items = derive_server_list(&cache);
        let names: Vec<&str> = items
            .iter()
            .map(|item| match item {
                ServerListItem::Guild(guild) => guild.name.as_str(),
                ServerListItem::Folder(_) => panic!("no folders expected"),
            })
            .collect();
        assert_eq!(names, ["A", "C", "B"]);
    }

    #[test]
    fn folders_follow_unfoldered_guilds_in_original_order() {
        let cache = cache_of(
            vec![
                guild("a", "A", 5),
                guild("b", "B", 4),
                guild("c", "C", 3),
                guild("d", "D", 2),
            ],
            vec![
                folder(Some("f2"), Some("Second"), &["d"]),
                folder(Some("f1"), Some("First"), &["c"]),
            ],
        );
        let items = derive_server_list(&cache);
        assert_eq!(items.len(), 4);
        assert!(matches!(&items[0], ServerListItem::Guild(g) if g.id.as_str() == "a"));
        assert!(matches!(&items[1], ServerListItem::Guild(g) if g.id.as_str() == "b"));
        assert!(matches!(&items[2], ServerListItem::Folder(f) if f.name == "Second"));
        assert!(matches!(&items[3], ServerListItem::Folder(f) if f.name == "First"));
    }

    #[test]
    fn explicit_folder_name_wins_over_member_names() {
        let cache = cache_of(
            vec![guild("a", "A", 1), guild("b", "B", 2)],
            vec![folder(Some("f1"), Some("Work"), &["a", "b"])],
        );
        let items = derive_server_list(&cache);
        assert!(matches!(&items[0], ServerListItem::Folder(f) if f.name == "Work"));
    }

    #[test]
    fn nameless_folder_joins_member_names_in_folder_order() {
        let cache = cache_of(
            vec![guild("a", "Alpha", 1), guild("b", "Beta", 2)],
            vec![folder(Some("f1"), None, &["b", "a"])],
        );
        let items = derive_server_list(&cache);
        match &items[0] {
            ServerListItem::Folder(entry) => {
                assert_eq!(entry.name, "Beta, Alpha");
                assert_eq!(entry.guilds.len(), 2);
                assert_eq!(entry.guilds[0].id.as_str(), "b");
            }
            other => panic!("expected folder, got {other:?}"),
        }
    }

    #[test]
    fn folder_with_unknown_members_skips_them_in_name_and_contents() {
        let cache = cache_of(
            vec![guild("a", "Alpha", 1)],
            vec![folder(Some("f1"), None, &["gone", "a"])],
        );
        match &derive_server_list(&cache)[0] {
            ServerListItem::Folder(entry) => {
                assert_eq!(entry.name, "Alpha");
                assert_eq!(entry.guilds.len(), 1);
            }
            other => panic!("expected folder, got {other:?}"),
        }
    }

    #[test]
    fn idless_folder_collapses_to_its_first_guild() {
        let cache = cache_of(
            vec![guild("a", "Alpha", 1)],
            vec![folder(None, None, &["a"])],
        );
        let items = derive_server_list(&cache);
        assert_eq!(items.len(), 1);
        assert_eq!(
            items[0],
            ServerListItem::Guild(guild("a", "Alpha", 1)),
            "passthrough entry must be indistinguishable from a standalone guild"
        );
    }

    #[test]
    fn idless_folder_with_unknown_guild_is_omitted() {
        let cache = cache_of(
            vec![guild("a", "Alpha", 1)],
            vec![folder(None, None, &["gone"]), folder(None, None, &[])],
        );
        let items = derive_server_list(&cache);
        assert_eq!(items.len(), 1);
        assert!(matches!(&items[0], ServerListItem::Guild(g) if g.id.as_str() == "a"));
    }

    #[test]
    fn restore_keeps_stored_guild_only_while_cached() {
        let cache = cache_of(vec![guild("a", "Alpha", 1)], Vec::new());
        assert_eq!(
            restore_selection(Some(Snowflake::new("a")), &cache),
            Snowflake::new("a")
        );
        assert_eq!(
            restore_selection(Some(Snowflake::new("gone")), &cache),
            Snowflake::new(DM_GUILD_ID)
        );
        assert_eq!(
            restore_selection(Some(Snowflake::new("@me")), &cache),
            Snowflake::new(DM_GUILD_ID)
        );
        assert_eq!(restore_selection(None, &cache), Snowflake::new(DM_GUILD_ID));
    }

    // Generates a cache with distinct join times and disjoint folder
    // membership, the shape the gateway actually provides.
    fn arb_cache() -> impl Strategy<Value = GatewayCache> {
        (2usize..10)
            .prop_flat_map(|n| {
                let joins = Just((0..n as i64).collect::<Vec<_>>()).prop_shuffle();
                let assignment = proptest::collection::vec(proptest::option::of(0usize..3), n);
                (Just(n), joins, assignment)
            })
            .prop_map(|(n, joins, assignment)| {
                let guilds: Vec<Guild> = (0..n)
                    .map(|i| guild(&format!("g{i}"), &format!("Guild {i}"), joins[i]))
                    .collect();
                let mut folder_members: HashMap<usize, Vec<Snowflake>> = HashMap::new();
                for (i, slot) in assignment.iter().enumerate() {
                    if let Some(folder_index) = slot {
                        folder_members
                            .entry(*folder_index)
                            .or_default()
                            .push(guilds[i].id.clone());
                    }
                }
                let mut folder_indices: Vec<usize> = folder_members.keys().copied().collect();
                folder_indices.sort_unstable();
                let folders = folder_indices
                    .into_iter()
                    .map(|index| GuildFolder {
                        id: Some(Snowflake::new(format!("f{index}"))),
                        name: None,
                        color: None,
                        guild_ids: folder_members[&index].clone(),
                    })
                    .collect();
                cache_of(guilds, folders)
            })
    }

    proptest! {
        #[test]
        fn every_guild_appears_exactly_once(cache in arb_cache()) {
            let items = derive_server_list(&cache);
            let mut seen: Vec<&Snowflake> = Vec::new();
            for item in &items {
                match item {
                    ServerListItem::Guild(guild) => seen.push(&guild.id),
                    ServerListItem::Folder(entry) => {
                        for guild in &entry.guilds {
                            seen.push(&guild.id);
                        }
                    }
                }
            }
            prop_assert_eq!(seen.len(), cache.guilds.len());
            let unique: HashSet<_> = seen.iter().collect();
            prop_assert_eq!(unique.len(), seen.len());
            for id in seen {
                prop_assert!(cache.contains_guild(id));
            }
        }

        #[test]
        fn standalone_entries_precede_folders_and_descend_by_join_time(cache in arb_cache()) {
            let items = derive_server_list(&cache);
            let mut seen_folder = false;
            let mut last_join = None;
            for item in &items {
                match item {
                    ServerListItem::Guild(guild) => {
                        prop_assert!(!seen_folder, "standalone guild after a folder entry");
                        if let Some(previous) = last_join {
                            prop_assert!(guild.joined_at < previous);
                        }
                        last_join = Some(guild.joined_at);
                    }
                    ServerListItem::Folder(_) => seen_folder = true,
                }
            }
        }

        #[test]
        fn folder_entries_keep_gateway_order(cache in arb_cache()) {
            let items = derive_server_list(&cache);
            let folder_ids: Vec<&Snowflake> = items
                .iter()
                .filter_map(|item| match item {
                    ServerListItem::Folder(entry) => Some(&entry.id),
                    ServerListItem::Guild(_) => None,
                })
                .collect();
            let expected: Vec<&Snowflake> = cache
                .folders
                .iter()
                .filter_map(|folder| folder.id.as_ref())
                .collect();
            prop_assert_eq!(folder_ids, expected);
        }
    }
}
