//! Corpus loading and validation.
//!
//! A corpus is the ordered list of reference documents. It is validated once
//! (unique ids, non-empty titles, required fields) before any embedding work
//! and never mutated afterwards.

use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::{resolve_with_base, CorpusSettings};
use crate::error::{Error, Result};
use crate::traits::CorpusSource;
use crate::types::{DocumentId, ReferenceDocument};

const SAMPLE_JOBS: &str = include_str!("../data/sample_jobs.json");

#[derive(Debug, Clone, Default)]
pub struct Corpus {
    documents: Vec<ReferenceDocument>,
    positions: HashMap<DocumentId, usize>,
}

impl Corpus {
    pub fn new(documents: Vec<ReferenceDocument>) -> Result<Self> {
        let mut positions = HashMap::with_capacity(documents.len());
        for (pos, doc) in documents.iter().enumerate() {
            if doc.title.trim().is_empty() {
                return Err(Error::MalformedCorpus(format!(
                    "document {} at position {} has an empty title",
                    doc.id, pos
                )));
            }
            if let Some(prev) = positions.insert(doc.id.clone(), pos) {
                return Err(Error::MalformedCorpus(format!(
                    "duplicate id {} at positions {} and {}",
                    doc.id, prev, pos
                )));
            }
        }
        Ok(Self { documents, positions })
    }

    pub fn documents(&self) -> &[ReferenceDocument] { &self.documents }

    pub fn len(&self) -> usize { self.documents.len() }

    pub fn is_empty(&self) -> bool { self.documents.is_empty() }

    pub fn get(&self, id: &DocumentId) -> Option<&ReferenceDocument> {
        self.positions.get(id).map(|&pos| &self.documents[pos])
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReferenceDocument> {
        self.documents.iter()
    }
}

/// Documents stored as JSON: one file holding an array (or a single object),
/// or a directory of such files read in sorted path order.
pub struct JsonCorpusSource {
    path: PathBuf,
}

impl JsonCorpusSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_file(path: &Path) -> Result<Vec<ReferenceDocument>> {
        let raw = fs::read_to_string(path)
            .map_err(|e| Error::MalformedCorpus(format!("cannot read {}: {}", path.display(), e)))?;
        parse_documents(&raw, &path.display().to_string())
    }

    fn list_json_files(root: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| p.extension().and_then(|s| s.to_str()) == Some("json"))
            .collect();
        files.sort();
        files
    }
}

impl CorpusSource for JsonCorpusSource {
    fn describe(&self) -> String {
        format!("json:{}", self.path.display())
    }

    fn load(&self) -> Result<Vec<ReferenceDocument>> {
        if !self.path.exists() {
            return Err(Error::NotFound(format!("corpus path {}", self.path.display())));
        }
        if !self.path.is_dir() {
            return Self::read_file(&self.path);
        }
        let files = Self::list_json_files(&self.path);
        if files.is_empty() {
            warn!(dir = %self.path.display(), "no .json files in corpus directory");
        }
        let mut documents = Vec::new();
        for file in &files {
            let docs = Self::read_file(file)?;
            debug!(file = %file.display(), count = docs.len(), "read corpus file");
            documents.extend(docs);
        }
        Ok(documents)
    }
}

/// The five canonical sample jobs shipped with the crate.
pub struct SampleCorpus;

impl CorpusSource for SampleCorpus {
    fn describe(&self) -> String {
        "built-in sample jobs".to_string()
    }

    fn load(&self) -> Result<Vec<ReferenceDocument>> {
        parse_documents(SAMPLE_JOBS, "sample_jobs.json")
    }
}

pub fn sample_jobs() -> Result<Vec<ReferenceDocument>> {
    SampleCorpus.load()
}

/// Load and validate. Any failure here happens before embedding starts.
pub fn load_corpus(source: &dyn CorpusSource) -> Result<Corpus> {
    let documents = source.load()?;
    let corpus = Corpus::new(documents)?;
    info!(source = %source.describe(), documents = corpus.len(), "corpus loaded");
    Ok(corpus)
}

/// Pick a source from configuration, falling back to the sample jobs when
/// the configured path is missing and the fallback is enabled.
pub fn source_from_settings(settings: &CorpusSettings, base_dir: &Path) -> Result<Box<dyn CorpusSource>> {
    match &settings.path {
        Some(path) => {
            let resolved = resolve_with_base(base_dir, path);
            if resolved.exists() {
                return Ok(Box::new(JsonCorpusSource::new(resolved)));
            }
            if !settings.fallback_to_samples {
                return Err(Error::NotFound(format!("corpus path {}", resolved.display())));
            }
            warn!(path = %resolved.display(), "corpus path missing; using built-in sample jobs");
        }
        None if !settings.fallback_to_samples => {
            return Err(Error::InvalidConfig(
                "corpus.path is unset and corpus.fallback_to_samples is off".into(),
            ));
        }
        None => {}
    }
    Ok(Box::new(SampleCorpus))
}

fn parse_documents(raw: &str, origin: &str) -> Result<Vec<ReferenceDocument>> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| Error::MalformedCorpus(format!("{}: {}", origin, e)))?;
    match value {
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, item)| {
                serde_json::from_value(item)
                    .map_err(|e| Error::MalformedCorpus(format!("{}[{}]: {}", origin, i, e)))
            })
            .collect(),
        other => serde_json::from_value(other)
            .map(|doc| vec![doc])
            .map_err(|e| Error::MalformedCorpus(format!("{}: {}", origin, e))),
    }
}
