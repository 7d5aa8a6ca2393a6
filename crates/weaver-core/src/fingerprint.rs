//! Content fingerprinting for skipping unchanged generators
//!
//! The in-process driver compares facts directly. Between separate runs of
//! the CLI the facts are gone, so each generator's facts are reduced to a
//! SHA-256 fingerprint and persisted in a state file next to the output.

use crate::error::CoreError;
use crate::facts::Fact;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// State file written into the output directory.
pub const STATE_FILE_NAME: &str = ".weaver-state.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentFingerprint {
    /// Hash of the facts, in order.
    pub content_hash: String,
    /// Hash of settings that change the output without changing facts.
    pub metadata_hash: String,
    pub combined_hash: String,
}

impl ContentFingerprint {
    pub fn content_matches(&self, other: &ContentFingerprint) -> bool {
        self.combined_hash == other.combined_hash
    }

    pub fn short_hash(&self) -> String {
        self.combined_hash.chars().take(12).collect()
    }
}

#[derive(Default)]
pub struct FingerprintBuilder {
    content_parts: Vec<Vec<u8>>,
    metadata_parts: Vec<String>,
}

impl FingerprintBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Order of content parts is significant: emitted code follows fact order.
    pub fn add_content(&mut self, content: &[u8]) -> &mut Self {
        self.content_parts.push(content.to_vec());
        self
    }

    pub fn add_content_str(&mut self, content: &str) -> &mut Self {
        self.add_content(content.as_bytes())
    }

    pub fn add_fact<F: Fact>(&mut self, fact: &F) -> Result<&mut Self, CoreError> {
        let bytes = serde_json::to_vec(fact)?;
        Ok(self.add_content(&bytes))
    }

    pub fn add_metadata(&mut self, key: &str, value: &str) -> &mut Self {
        self.metadata_parts.push(format!("{}={}", key, value));
        self
    }

    pub fn build(&self) -> ContentFingerprint {
        let content_hash = self.hash_content();
        let metadata_hash = self.hash_metadata();
        let combined_hash = hash_pair(&content_hash, &metadata_hash);
        ContentFingerprint {
            content_hash,
            metadata_hash,
            combined_hash,
        }
    }

    fn hash_content(&self) -> String {
        let mut hasher = Sha256::new();
        for content in &self.content_parts {
            // length prefix keeps ["ab", "c"] and ["a", "bc"] apart
            hasher.update((content.len() as u64).to_le_bytes());
            hasher.update(content);
        }
        format!("{:x}", hasher.finalize())
    }

    fn hash_metadata(&self) -> String {
        let mut hasher = Sha256::new();
        let mut sorted = self.metadata_parts.clone();
        sorted.sort();
        for metadata in &sorted {
            hasher.update(metadata.as_bytes());
            hasher.update([0u8]);
        }
        format!("{:x}", hasher.finalize())
    }
}

fn hash_pair(content_hash: &str, metadata_hash: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content_hash.as_bytes());
    hasher.update(metadata_hash.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Fingerprint a generator's facts.
pub fn fingerprint_facts<'a, F, I>(facts: I, metadata: &[(&str, &str)]) -> Result<ContentFingerprint, CoreError>
where
    F: Fact,
    I: IntoIterator<Item = &'a F>,
{
    let mut builder = FingerprintBuilder::new();
    for fact in facts {
        builder.add_fact(fact)?;
    }
    for (key, value) in metadata {
        builder.add_metadata(key, value);
    }
    Ok(builder.build())
}

/// Persisted fingerprints of the last successful run, keyed by generator name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationState {
    pub generators: BTreeMap<String, ContentFingerprint>,
    pub updated_at: Option<DateTime<Utc>>,
    pub weaver_version: String,
}

impl GenerationState {
    pub fn state_path(output_dir: &Path) -> PathBuf {
        output_dir.join(STATE_FILE_NAME)
    }

    /// Load state; a missing file or a file written by another version yields empty state.
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        let state: GenerationState = serde_json::from_str(&text)?;
        if state.weaver_version != env!("CARGO_PKG_VERSION") {
            return Ok(Self::default());
        }
        Ok(state)
    }

    pub fn save(&mut self, path: &Path) -> Result<(), CoreError> {
        self.updated_at = Some(Utc::now());
        self.weaver_version = env!("CARGO_PKG_VERSION").to_string();
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }

    pub fn is_unchanged(&self, generator: &str, fingerprint: &ContentFingerprint) -> bool {
        self.generators
            .get(generator)
            .is_some_and(|previous| previous.content_matches(fingerprint))
    }

    pub fn record(&mut self, generator: &str, fingerprint: ContentFingerprint) {
        self.generators.insert(generator.to_string(), fingerprint);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts::{RegistrationFact, ServiceLifetime};

    fn registration(implementation: &str) -> RegistrationFact {
        RegistrationFact {
            service_type: None,
            implementation_type: implementation.to_string(),
            lifetime: ServiceLifetime::Scoped,
            hint: String::new(),
            is_open_generic: false,
        }
    }

    #[test]
    fn test_fingerprint_is_deterministic() {
        let facts = vec![registration("global::App.A"), registration("global::App.B")];
        let a = fingerprint_facts(&facts, &[("root_namespace", "App")]).unwrap();
        let b = fingerprint_facts(&facts, &[("root_namespace", "App")]).unwrap();
        assert!(a.content_matches(&b));
        assert_eq!(a.short_hash().len(), 12);
    }

    #[test]
    fn test_fact_order_changes_fingerprint() {
        let forward = vec![registration("global::App.A"), registration("global::App.B")];
        let reversed = vec![registration("global::App.B"), registration("global::App.A")];
        let a = fingerprint_facts(&forward, &[]).unwrap();
        let b = fingerprint_facts(&reversed, &[]).unwrap();
        assert_ne!(a.content_hash, b.content_hash);
    }

    #[test]
    fn test_metadata_order_is_irrelevant() {
        let mut first = FingerprintBuilder::new();
        first.add_metadata("a", "1").add_metadata("b", "2");
        let mut second = FingerprintBuilder::new();
        second.add_metadata("b", "2").add_metadata("a", "1");
        assert_eq!(first.build(), second.build());
    }

    #[test]
    fn test_state_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = GenerationState::state_path(dir.path());

        let fingerprint = fingerprint_facts(&[registration("global::App.A")], &[]).unwrap();
        let mut state = GenerationState::default();
        state.record("registrations", fingerprint.clone());
        state.save(&path).unwrap();

        let loaded = GenerationState::load(&path).unwrap();
        assert!(loaded.is_unchanged("registrations", &fingerprint));
        assert!(!loaded.is_unchanged("comparers", &fingerprint));
    }

    #[test]
    fn test_missing_state_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let state = GenerationState::load(&dir.path().join(STATE_FILE_NAME)).unwrap();
        assert!(state.generators.is_empty());
    }
}
