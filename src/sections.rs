use serde::ser::{Serialize, SerializeMap, Serializer};

/// Ordered mapping from section key to that section's text.
///
/// Key order is the distributor's heading order, not insertion or alphabetical
/// order, so a UI can render sections in the sequence the panel defines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionMap {
    entries: Vec<(String, String)>,
}

impl SectionMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Map with every key present and empty.
    #[must_use]
    pub fn empty_for<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        keys.into_iter().map(|key| (key, String::new())).collect()
    }

    /// Insert or replace; a new key goes last.
    pub fn insert(&mut self, key: impl Into<String>, text: impl Into<String>) {
        let key = key.into();
        let text = text.into();

        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, slot)) => *slot = text,
            None => self.entries.push((key, text)),
        }
    }

    pub fn push_str(&mut self, key: &str, text: &str) {
        match self.entries.iter_mut().find(|(existing, _)| existing == key) {
            Some((_, slot)) => slot.push_str(text),
            None => self.entries.push((key.to_string(), text.to_string())),
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, text)| text.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, text)| (key.as_str(), text.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when every section is still empty.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.entries.iter().all(|(_, text)| text.is_empty())
    }
}

impl<K, V> FromIterator<(K, V)> for SectionMap
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut map = Self::new();
        for (key, text) in iter {
            map.insert(key, text);
        }
        map
    }
}

impl Serialize for SectionMap {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, text) in &self.entries {
            map.serialize_entry(key, text)?;
        }
        map.end()
    }
}
