use serde::{Deserialize, Serialize};

/// A normalized news article. Wire names match the records the user store
/// already holds (notably `urlToImage`), so saved bookmarks round-trip
/// unchanged; every field defaults so partial records still deserialize.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub url: String,
    #[serde(rename = "urlToImage", default)]
    pub image_url: String,
    #[serde(default)]
    pub source: String,
}

/// A saved bookmark. Older user records stored bare article titles; newer
/// ones store the full article object. Both shapes must survive a read,
/// and legacy entries are written back exactly as they came in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Bookmark {
    Legacy(String),
    Saved(Article),
}

impl Bookmark {
    /// Membership test used for dedup: saved bookmarks match on `url`,
    /// legacy strings match on the article title.
    pub fn matches_article(&self, article: &Article) -> bool {
        match self {
            Bookmark::Legacy(title) => *title == article.title,
            Bookmark::Saved(saved) => saved.url == article.url,
        }
    }

    /// Removal test: legacy strings match the key itself, saved bookmarks
    /// match on either `id` or `url`.
    pub fn matches_key(&self, key: &str) -> bool {
        match self {
            Bookmark::Legacy(title) => title == key,
            Bookmark::Saved(saved) => saved.id == key || saved.url == key,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Bookmark::Legacy(title) => title,
            Bookmark::Saved(saved) => &saved.title,
        }
    }
}

/// User ids arrive from the resource store as strings or numbers depending
/// on its vintage; both are normalized to a string for path building.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl<'de> Deserialize<'de> for UserId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Str(String),
            Num(i64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Str(s) => UserId(s),
            Raw::Num(n) => UserId(n.to_string()),
        })
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A user record as held by the external resource store. The password is
/// deserialized for verification but never serialized back out of this
/// service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing)]
    pub password: String,
    #[serde(default)]
    pub history: Vec<String>,
    #[serde(default)]
    pub bookmarks: Vec<Bookmark>,
}

/// Payload for creating a user record in the store.
#[derive(Debug, Clone, Serialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub history: Vec<String>,
    pub bookmarks: Vec<Bookmark>,
}

/// Append to a reading history, refusing a duplicate at the tail. Returns
/// whether the entry was appended.
pub fn push_history(history: &mut Vec<String>, entry: &str) -> bool {
    if history.last().map(String::as_str) == Some(entry) {
        return false;
    }
    history.push(entry.to_string());
    true
}

/// Distinct non-empty sources across saved bookmarks, in first-seen order.
/// Legacy string bookmarks carry no source and are skipped.
pub fn unique_sources(bookmarks: &[Bookmark]) -> Vec<String> {
    let mut sources: Vec<String> = Vec::new();
    for bookmark in bookmarks {
        if let Bookmark::Saved(article) = bookmark {
            if !article.source.is_empty() && !sources.iter().any(|s| s == &article.source) {
                sources.push(article.source.clone());
            }
        }
    }
    sources
}
