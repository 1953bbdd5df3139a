use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use skyprice_core::Locale;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LanguageEntry {
    pub locale: Locale,
    pub updated_at: DateTime<Utc>,
}

/// Per-user conversation language. Lives for the lifetime of the process.
pub trait LanguageStore: Send + Sync {
    fn language(&self, user_id: &str) -> Option<Locale>;

    /// Read-modify-write under one lock: `resolve` sees the stored language
    /// (if any) and returns the one to keep.
    fn update_language(
        &self,
        user_id: &str,
        resolve: &dyn Fn(Option<Locale>) -> Locale,
    ) -> Locale;

    fn entry(&self, user_id: &str) -> Option<LanguageEntry>;
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    languages: Arc<RwLock<HashMap<String, LanguageEntry>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.languages.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.languages.read().is_empty()
    }
}

impl LanguageStore for MemoryStore {
    fn language(&self, user_id: &str) -> Option<Locale> {
        self.languages.read().get(user_id).map(|entry| entry.locale)
    }

    fn update_language(
        &self,
        user_id: &str,
        resolve: &dyn Fn(Option<Locale>) -> Locale,
    ) -> Locale {
        let mut guard = self.languages.write();
        let previous = guard.get(user_id).map(|entry| entry.locale);
        let locale = resolve(previous);
        guard.insert(
            user_id.to_string(),
            LanguageEntry {
                locale,
                updated_at: Utc::now(),
            },
        );
        locale
    }

    fn entry(&self, user_id: &str) -> Option<LanguageEntry> {
        self.languages.read().get(user_id).copied()
    }
}

impl<T: LanguageStore + ?Sized> LanguageStore for Arc<T> {
    fn language(&self, user_id: &str) -> Option<Locale> {
        (**self).language(user_id)
    }

    fn update_language(
        &self,
        user_id: &str,
        resolve: &dyn Fn(Option<Locale>) -> Locale,
    ) -> Locale {
        (**self).update_language(user_id, resolve)
    }

    fn entry(&self, user_id: &str) -> Option<LanguageEntry> {
        (**self).entry(user_id)
    }
}
