use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use feruca::Collator;
use forwarder_gateway::{BackendGateway, ChatId, ChatSummary, PhoneRequest};
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use crate::error::{ClientError, ValidationError};
use crate::input::mask_phone;
use crate::session::{SessionStore, update_session};

const LOG_TARGET: &str = "forwarder.directory";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatDirectoryEntry {
    pub id: ChatId,
    pub name: String,
    pub kind: String,
}

impl From<ChatSummary> for ChatDirectoryEntry {
    fn from(chat: ChatSummary) -> Self {
        Self {
            id: chat.id,
            name: chat.name,
            kind: chat.kind,
        }
    }
}

/// Named, alphabetized option set for source/destination pickers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatDirectory {
    entries: Vec<ChatDirectoryEntry>,
}

impl ChatDirectory {
    /// Drops blank names and repeated ids (first wins), then sorts by name.
    #[must_use]
    pub fn build(chats: impl IntoIterator<Item = ChatSummary>) -> Self {
        let mut seen = HashSet::new();
        let mut entries = chats
            .into_iter()
            .filter(|chat| !chat.name.trim().is_empty())
            .filter(|chat| seen.insert(chat.id.clone()))
            .map(ChatDirectoryEntry::from)
            .collect::<Vec<_>>();
        sort_entries(&mut entries);
        Self { entries }
    }

    #[must_use]
    pub fn entries(&self) -> &[ChatDirectoryEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: &ChatId) -> Option<&ChatDirectoryEntry> {
        self.entries.iter().find(|entry| &entry.id == id)
    }

    /// Case- and accent-insensitive substring match on the display name.
    #[must_use]
    pub fn search(&self, query: &str) -> Vec<&ChatDirectoryEntry> {
        let needle = collation_key(query.trim());
        self.entries
            .iter()
            .filter(|entry| needle.is_empty() || collation_key(&entry.name).contains(&needle))
            .collect()
    }

    #[must_use]
    pub fn name_map(&self) -> BTreeMap<String, String> {
        self.entries
            .iter()
            .map(|entry| (entry.id.as_str().to_string(), entry.name.clone()))
            .collect()
    }
}

/// Loose match key for search: compatibility-decomposed, accents stripped,
/// lowercased.
#[must_use]
pub fn collation_key(name: &str) -> String {
    name.nfkd()
        .filter(|ch| !is_combining_mark(*ch))
        .flat_map(char::to_lowercase)
        .collect()
}

/// CLDR root collation order: base letters first, then accents, then case
/// with lowercase ahead of uppercase.
#[must_use]
pub fn compare_names(left: &str, right: &str) -> Ordering {
    Collator::default().collate(left, right)
}

fn sort_entries(entries: &mut [ChatDirectoryEntry]) {
    let mut collator = Collator::default();
    entries.sort_by(|left, right| {
        collator
            .collate(left.name.as_str(), right.name.as_str())
            .then_with(|| left.id.cmp(&right.id))
    });
}

/// Fetches the chat listing and keeps the persisted id→name lookup in step
/// with the last successful fetch.
pub struct ChatDirectoryCache<G, S> {
    gateway: Arc<G>,
    store: Arc<S>,
}

impl<G, S> ChatDirectoryCache<G, S>
where
    G: BackendGateway,
    S: SessionStore,
{
    pub fn new(gateway: Arc<G>, store: Arc<S>) -> Self {
        Self { gateway, store }
    }

    /// Rebuilds the directory wholesale. A failed fetch leaves the persisted
    /// lookup untouched.
    pub async fn refresh(&self, phone: &str) -> Result<ChatDirectory, ClientError> {
        let phone = phone.trim();
        if phone.is_empty() {
            return Err(ValidationError::MissingPhone.into());
        }

        let chats = self
            .gateway
            .get_chats(&PhoneRequest {
                phone: phone.to_string(),
            })
            .await?;
        let fetched = chats.len();
        let directory = ChatDirectory::build(chats);
        let names = directory.name_map();
        update_session(self.store.as_ref(), |session| {
            session.chat_names = names;
        })?;

        tracing::info!(
            target: LOG_TARGET,
            phone = %mask_phone(phone),
            fetched,
            kept = directory.len(),
            "chat directory rebuilt",
        );
        Ok(directory)
    }

    pub fn cached_names(&self) -> Result<BTreeMap<String, String>, ClientError> {
        Ok(self.store.load_session()?.chat_names)
    }

    /// Display label for a bare id: cached name, then the supplied fallback,
    /// then the id itself.
    pub fn label_for(&self, id: &ChatId, fallback: Option<&str>) -> Result<String, ClientError> {
        let names = self.cached_names()?;
        Ok(resolve_label(&names, id, fallback))
    }
}

#[must_use]
pub fn resolve_label(
    names: &BTreeMap<String, String>,
    id: &ChatId,
    fallback: Option<&str>,
) -> String {
    names
        .get(id.as_str())
        .map(String::as_str)
        .or(fallback)
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .map_or_else(|| id.to_string(), str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{MemorySessionStore, PersistedSession};
    use crate::testing::FakeGateway;
    use forwarder_gateway::{Endpoint, GatewayError};

    fn chat(id: i64, name: &str, kind: &str) -> ChatSummary {
        ChatSummary {
            id: ChatId::from(id),
            name: name.to_string(),
            kind: kind.to_string(),
        }
    }

    fn names(directory: &ChatDirectory) -> Vec<&str> {
        directory
            .entries()
            .iter()
            .map(|entry| entry.name.as_str())
            .collect()
    }

    #[test]
    fn build_drops_blank_names_and_sorts() {
        let directory = ChatDirectory::build([
            chat(1, "A", "Group"),
            chat(2, "", "User"),
            chat(3, "B", "Channel"),
        ]);
        let ids = directory
            .entries()
            .iter()
            .map(|entry| entry.id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(ids, ["1", "3"]);
        assert_eq!(names(&directory), ["A", "B"]);
    }

    #[test]
    fn build_excludes_whitespace_only_names() {
        let directory = ChatDirectory::build([
            chat(1, "   ", "User"),
            chat(2, "\t\n", "User"),
            chat(3, "Team", "Group"),
        ]);
        assert_eq!(names(&directory), ["Team"]);
    }

    #[test]
    fn ordering_ignores_case_and_accents() {
        let directory = ChatDirectory::build([
            chat(1, "zebra", "User"),
            chat(2, "Émile", "User"),
            chat(3, "apple", "User"),
            chat(4, "Banana", "User"),
            chat(5, "eve", "User"),
        ]);
        assert_eq!(
            names(&directory),
            ["apple", "Banana", "Émile", "eve", "zebra"]
        );
    }

    #[test]
    fn rebuilding_a_sorted_directory_is_stable() {
        let first = ChatDirectory::build([
            chat(9, "beta", "User"),
            chat(4, "Alpha", "User"),
            chat(7, "alpha", "User"),
        ]);
        let again = ChatDirectory::build(first.entries().iter().map(|entry| ChatSummary {
            id: entry.id.clone(),
            name: entry.name.clone(),
            kind: entry.kind.clone(),
        }));
        assert_eq!(first, again);
        assert_eq!(names(&first), ["alpha", "Alpha", "beta"]);
    }

    #[test]
    fn letters_without_decomposition_sort_near_their_base() {
        let directory = ChatDirectory::build([
            chat(1, "Alpha", "User"),
            chat(2, "alpha", "User"),
            chat(3, "Ørsted", "Group"),
            chat(4, "Zed", "User"),
            chat(5, "Oscar", "User"),
            chat(6, "Łódź", "Channel"),
        ]);
        let order = names(&directory);
        let position = |name: &str| order.iter().position(|entry| *entry == name);
        assert!(position("alpha") < position("Alpha"));
        assert!(position("Ørsted") < position("Zed"));
        assert!(position("Oscar") < position("Zed"));
        assert!(position("Łódź") < position("Zed"));
        assert_eq!(order.last(), Some(&"Zed"));
    }

    #[test]
    fn compare_names_orders_lowercase_first() {
        assert_eq!(compare_names("alpha", "Alpha"), Ordering::Less);
        assert_eq!(compare_names("Émile", "eve"), Ordering::Less);
        assert_eq!(compare_names("Zed", "Ørsted"), Ordering::Greater);
    }

    #[test]
    fn duplicate_ids_keep_first_occurrence() {
        let directory = ChatDirectory::build([chat(1, "First", "User"), chat(1, "Second", "User")]);
        assert_eq!(names(&directory), ["First"]);
    }

    #[test]
    fn search_matches_substrings_loosely() {
        let directory = ChatDirectory::build([
            chat(1, "Café Owners", "Group"),
            chat(2, "News", "Channel"),
        ]);
        let hits = directory.search("cafe");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, ChatId::from(1_i64));
        assert_eq!(directory.search("").len(), 2);
        assert_eq!(
            directory.get(&ChatId::from(2_i64)).map(|entry| entry.name.as_str()),
            Some("News")
        );
        assert_eq!(directory.get(&ChatId::from(9_i64)), None);
    }

    #[test]
    fn labels_prefer_cached_names() {
        let names = BTreeMap::from([("1".to_string(), "Cached".to_string())]);
        assert_eq!(
            resolve_label(&names, &ChatId::from("1"), Some("Backend")),
            "Cached"
        );
        assert_eq!(
            resolve_label(&names, &ChatId::from("2"), Some("Backend")),
            "Backend"
        );
        assert_eq!(resolve_label(&names, &ChatId::from("2"), None), "2");
        assert_eq!(resolve_label(&names, &ChatId::from("2"), Some(" ")), "2");
    }

    #[tokio::test]
    async fn refresh_persists_name_map() {
        let gateway = Arc::new(FakeGateway::new().with_chats(vec![
            chat(1, "A", "Group"),
            chat(2, "", "User"),
            chat(3, "B", "Channel"),
        ]));
        let store = Arc::new(MemorySessionStore::new());
        let cache = ChatDirectoryCache::new(gateway.clone(), store.clone());

        let directory = cache.refresh("+5551234567").await.expect("refresh");
        assert_eq!(names(&directory), ["A", "B"]);
        assert_eq!(
            cache.cached_names().expect("names"),
            BTreeMap::from([
                ("1".to_string(), "A".to_string()),
                ("3".to_string(), "B".to_string()),
            ])
        );
        assert_eq!(
            cache
                .label_for(&ChatId::from("3"), Some("ignored"))
                .expect("label"),
            "B"
        );
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_lookup() {
        let previous = BTreeMap::from([("7".to_string(), "Old".to_string())]);
        let store = Arc::new(MemorySessionStore::with_session(PersistedSession {
            chat_names: previous.clone(),
            ..PersistedSession::default()
        }));
        let gateway = Arc::new(FakeGateway::new());
        gateway.fail_next(
            Endpoint::GetChats,
            GatewayError::NetworkUnreachable {
                endpoint: Endpoint::GetChats,
                message: "connection refused".to_string(),
            },
        );
        let cache = ChatDirectoryCache::new(gateway, store);

        let error = cache.refresh("+5551234567").await.expect_err("offline");
        assert_eq!(error.kind(), crate::ErrorKind::NetworkUnreachable);
        assert_eq!(cache.cached_names().expect("names"), previous);
    }

    #[tokio::test]
    async fn refresh_without_phone_skips_network() {
        let gateway = Arc::new(FakeGateway::new());
        let cache = ChatDirectoryCache::new(gateway.clone(), Arc::new(MemorySessionStore::new()));
        let error = cache.refresh("  ").await.expect_err("missing phone");
        assert!(error.is_validation());
        assert_eq!(gateway.call_count(Endpoint::GetChats), 0);
    }
}
