//! Deterministic stand-ins for the model-backed capabilities.

use crate::embedding::Embedder;
use crate::error::{Result, VidragError};
use crate::llm::ChatModel;
use crate::rerank::CrossEncoder;
use crate::retrieval::{Chunk, Retriever, ScoreKind, ScoredCandidate};
use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::collections::{HashSet, VecDeque};
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

fn words(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|w| {
            w.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|w| !w.is_empty())
        .collect()
}

enum Script {
    Replies(Mutex<VecDeque<String>>),
    Failing,
    Hanging,
}

/// Chat model that answers from a fixed script and records every prompt.
pub struct ScriptedChatModel {
    script: Script,
    prompts: Mutex<Vec<(String, String)>>,
}

impl ScriptedChatModel {
    /// Reply with each entry in turn, then fail.
    pub fn replies(replies: &[&str]) -> Self {
        Self::with_script(Script::Replies(Mutex::new(
            replies.iter().map(|r| r.to_string()).collect(),
        )))
    }

    pub fn failing() -> Self {
        Self::with_script(Script::Failing)
    }

    /// Never answers.
    pub fn hanging() -> Self {
        Self::with_script(Script::Hanging)
    }

    fn with_script(script: Script) -> Self {
        Self {
            script,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    /// `(system, user)` prompt pairs in call order.
    pub fn prompts(&self) -> Vec<(String, String)> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedChatModel {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        self.prompts
            .lock()
            .unwrap()
            .push((system_prompt.to_string(), user_prompt.to_string()));

        match &self.script {
            Script::Replies(replies) => replies
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| VidragError::Llm("script exhausted".to_string())),
            Script::Failing => Err(VidragError::Llm("provider unavailable".to_string())),
            Script::Hanging => {
                futures::future::pending::<()>().await;
                Err(VidragError::Llm("unreachable".to_string()))
            }
        }
    }
}

/// Hashes lowercase words into a fixed number of buckets.
pub struct BagOfWordsEmbedder {
    dimensions: usize,
}

impl Default for BagOfWordsEmbedder {
    fn default() -> Self {
        Self { dimensions: 1024 }
    }
}

impl BagOfWordsEmbedder {
    fn vector(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; self.dimensions];
        for word in words(text) {
            let mut hasher = DefaultHasher::new();
            word.hash(&mut hasher);
            vector[(hasher.finish() % self.dimensions as u64) as usize] += 1.0;
        }
        vector
    }
}

#[async_trait]
impl Embedder for BagOfWordsEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.vector(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.vector(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// Retriever returning a fixed list and recording the `top_k` of each call.
pub struct RecordingRetriever {
    name: &'static str,
    chunks: Option<Vec<Chunk>>,
    calls: Mutex<Vec<usize>>,
}

impl RecordingRetriever {
    pub fn new(name: &'static str, chunks: Vec<Chunk>) -> Self {
        Self {
            name,
            chunks: Some(chunks),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(name: &'static str) -> Self {
        Self {
            name,
            chunks: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<usize> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Retriever for RecordingRetriever {
    async fn retrieve(&self, _query: &str, top_k: usize) -> Result<Vec<ScoredCandidate>> {
        self.calls.lock().unwrap().push(top_k);

        let chunks = self
            .chunks
            .as_ref()
            .ok_or_else(|| VidragError::Index(format!("{} index offline", self.name)))?;

        Ok(chunks
            .iter()
            .take(top_k)
            .enumerate()
            .map(|(rank, chunk)| ScoredCandidate::new(chunk.clone(), 1.0 / (rank as f32 + 1.0), ScoreKind::Cosine))
            .collect())
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

/// Scores a document by how many distinct query words it contains.
#[derive(Default)]
pub struct OverlapCrossEncoder {
    calls: AtomicUsize,
    documents: AtomicUsize,
}

impl OverlapCrossEncoder {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn documents_scored(&self) -> usize {
        self.documents.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CrossEncoder for OverlapCrossEncoder {
    async fn score_pairs(&self, query: &str, documents: &[String]) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.documents.fetch_add(documents.len(), Ordering::SeqCst);

        let query: HashSet<String> = words(query).into_iter().collect();
        Ok(documents
            .iter()
            .map(|doc| {
                let doc: HashSet<String> = words(doc).into_iter().collect();
                query.intersection(&doc).count() as f32
            })
            .collect())
    }
}

/// Returns a preset score list regardless of input.
pub struct FixedScores {
    scores: Vec<f32>,
    calls: AtomicUsize,
}

impl FixedScores {
    pub fn new(scores: Vec<f32>) -> Self {
        Self {
            scores,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CrossEncoder for FixedScores {
    async fn score_pairs(&self, _query: &str, _documents: &[String]) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.scores.clone())
    }
}
