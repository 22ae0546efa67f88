//! In-memory document store with optional JSON snapshot persistence
//!
//! Each collection sits behind its own `tokio::sync::RwLock`, so a single
//! upsert is atomic with respect to other writers of the same collection.
//!
//! Several processes may open the same snapshot. Each one records the
//! documents it wrote or deleted, and `save` merges only those into the file
//! as it is on disk at that moment, under an exclusive lock, so writes to
//! different documents are never lost.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use fs2::FileExt;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tokio::sync::{Mutex, RwLock};

use super::{
    CatalogStore, CompanyGroup, FindOptions, ProgressFilter, ProgressFind, ProgressSort,
    ProgressStore, QuestionFilter, StoreError,
};
use crate::model::{Difficulty, Progress, ProgressWrite, Question, QuestionUpsert};

type ProgressKey = (String, String);

/// On-disk form of the store
#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    questions: Vec<Question>,
    progress: Vec<Progress>,
}

/// Documents touched through this handle since it was opened or last saved
#[derive(Debug, Default)]
struct Changes {
    questions_purged: bool,
    questions: HashSet<String>,
    progress: HashSet<ProgressKey>,
    removed_progress: HashSet<ProgressKey>,
}

/// Current versions of the changed documents, ready to merge into a snapshot
struct PendingWrites {
    questions_purged: bool,
    questions: Vec<Question>,
    progress: Vec<Progress>,
    removed_progress: Vec<ProgressKey>,
}

impl PendingWrites {
    fn merge_into(self, on_disk: Snapshot) -> Snapshot {
        let mut questions: BTreeMap<String, Question> = if self.questions_purged {
            BTreeMap::new()
        } else {
            on_disk.questions.into_iter().map(|q| (q.id.clone(), q)).collect()
        };
        for question in self.questions {
            questions.insert(question.id.clone(), question);
        }

        let mut progress: BTreeMap<ProgressKey, Progress> = on_disk
            .progress
            .into_iter()
            .map(|p| ((p.user_id.clone(), p.question_id.clone()), p))
            .collect();
        for key in &self.removed_progress {
            progress.remove(key);
        }
        for record in self.progress {
            progress.insert((record.user_id.clone(), record.question_id.clone()), record);
        }

        Snapshot {
            questions: questions.into_values().collect(),
            progress: progress.into_values().collect(),
        }
    }
}

fn decode_snapshot(path: &Path, contents: &str) -> Result<Snapshot, StoreError> {
    serde_json::from_str(contents)
        .map_err(|source| StoreError::Corrupt { path: path.to_path_buf(), source })
}

/// Sidecar file holding the write lock, `<snapshot>.lock`
fn lock_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".lock");
    PathBuf::from(name)
}

/// Merge `pending` into the snapshot at `path` and atomically replace it.
///
/// Blocking: takes an exclusive lock that is released when the lock file
/// handle drops at the end of the call.
fn write_merged(path: &Path, pending: PendingWrites) -> Result<Snapshot, StoreError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let io_error = |path: &Path| {
        let path = path.to_path_buf();
        move |source| StoreError::Io { path, source }
    };

    fs::create_dir_all(parent).map_err(io_error(parent))?;

    let lock_path = lock_path(path);
    let lock = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&lock_path)
        .map_err(io_error(&lock_path))?;
    lock.lock_exclusive().map_err(io_error(&lock_path))?;

    let on_disk = match fs::read_to_string(path) {
        Ok(contents) => decode_snapshot(path, &contents)?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Snapshot::default(),
        Err(source) => return Err(StoreError::Io { path: path.to_path_buf(), source }),
    };
    let merged = pending.merge_into(on_disk);
    let contents = serde_json::to_string_pretty(&merged)?;

    let mut file = NamedTempFile::new_in(parent).map_err(io_error(parent))?;
    file.write_all(contents.as_bytes()).map_err(io_error(file.path()))?;
    file.persist(path).map_err(|e| StoreError::Io { path: path.to_path_buf(), source: e.error })?;

    Ok(merged)
}

/// Catalog and progress collections held in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    questions: RwLock<HashMap<String, Question>>,
    progress: RwLock<HashMap<ProgressKey, Progress>>,
    changes: Mutex<Changes>,
    snapshot_path: Option<PathBuf>,
}

impl MemoryStore {
    /// An empty store that is never persisted
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a store backed by a snapshot file, starting empty if it does not exist
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();

        let snapshot = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => decode_snapshot(&path, &contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Snapshot::default(),
            Err(source) => return Err(StoreError::Io { path, source }),
        };

        tracing::debug!(
            "Loaded snapshot {:?}: {} questions, {} progress records",
            path,
            snapshot.questions.len(),
            snapshot.progress.len()
        );

        let store = Self { snapshot_path: Some(path), ..Self::default() };
        store.replace_contents(snapshot).await;
        Ok(store)
    }

    async fn replace_contents(&self, snapshot: Snapshot) {
        *self.questions.write().await =
            snapshot.questions.into_iter().map(|q| (q.id.clone(), q)).collect();
        *self.progress.write().await = snapshot
            .progress
            .into_iter()
            .map(|p| ((p.user_id.clone(), p.question_id.clone()), p))
            .collect();
    }

    /// Merge this handle's writes into the snapshot file; a no-op for unbacked stores.
    ///
    /// Afterwards the store also holds whatever other handles saved meanwhile.
    pub async fn save(&self) -> Result<(), StoreError> {
        let Some(path) = self.snapshot_path.clone() else {
            return Ok(());
        };

        let mut questions = self.questions.write().await;
        let mut progress = self.progress.write().await;
        let mut changes = self.changes.lock().await;

        let pending = PendingWrites {
            questions_purged: changes.questions_purged,
            questions: changes
                .questions
                .iter()
                .filter_map(|id| questions.get(id).cloned())
                .collect(),
            progress: changes
                .progress
                .iter()
                .filter_map(|key| progress.get(key).cloned())
                .collect(),
            removed_progress: changes.removed_progress.iter().cloned().collect(),
        };

        let merged = tokio::task::spawn_blocking(move || write_merged(&path, pending))
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))??;

        tracing::debug!(
            "Saved snapshot: {} questions, {} progress records",
            merged.questions.len(),
            merged.progress.len()
        );

        *questions = merged.questions.into_iter().map(|q| (q.id.clone(), q)).collect();
        *progress = merged
            .progress
            .into_iter()
            .map(|p| ((p.user_id.clone(), p.question_id.clone()), p))
            .collect();
        *changes = Changes::default();

        Ok(())
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn upsert_questions(&self, batch: Vec<QuestionUpsert>) -> Result<usize, StoreError> {
        let mut questions = self.questions.write().await;
        let mut changes = self.changes.lock().await;
        let writes = batch.len();

        for upsert in batch {
            let existing = questions.remove(&upsert.id);
            let question = upsert.apply(existing);
            changes.questions.insert(question.id.clone());
            questions.insert(question.id.clone(), question);
        }

        Ok(writes)
    }

    async fn get_question(&self, id: &str) -> Result<Option<Question>, StoreError> {
        Ok(self.questions.read().await.get(id).cloned())
    }

    async fn get_questions(&self, ids: &[String]) -> Result<Vec<Question>, StoreError> {
        let questions = self.questions.read().await;
        let unique: HashSet<&String> = ids.iter().collect();
        let mut found: Vec<Question> =
            unique.into_iter().filter_map(|id| questions.get(id).cloned()).collect();
        found.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(found)
    }

    async fn find_by_title(&self, title: &str) -> Result<Option<Question>, StoreError> {
        let questions = self.questions.read().await;
        Ok(questions.values().filter(|q| q.title == title).min_by(|a, b| a.id.cmp(&b.id)).cloned())
    }

    async fn find_by_url(&self, pattern: &Regex) -> Result<Option<Question>, StoreError> {
        let questions = self.questions.read().await;
        Ok(questions
            .values()
            .filter(|q| pattern.is_match(&q.url))
            .min_by(|a, b| a.id.cmp(&b.id))
            .cloned())
    }

    async fn find_questions(
        &self,
        filter: &QuestionFilter,
        options: &FindOptions,
    ) -> Result<Vec<Question>, StoreError> {
        let questions = self.questions.read().await;
        let mut matched: Vec<&Question> =
            questions.values().filter(|q| filter.matches(q)).collect();
        matched.sort_by(|a, b| options.sort.compare(a, b));

        Ok(matched
            .into_iter()
            .skip(options.skip)
            .take(options.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn count_questions(&self, filter: &QuestionFilter) -> Result<u64, StoreError> {
        let questions = self.questions.read().await;
        Ok(questions.values().filter(|q| filter.matches(q)).count() as u64)
    }

    async fn count_by_difficulty(&self) -> Result<HashMap<Difficulty, u64>, StoreError> {
        let questions = self.questions.read().await;
        let mut counts = HashMap::new();
        for question in questions.values() {
            *counts.entry(question.difficulty).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn company_groups(&self, limit: Option<usize>) -> Result<Vec<CompanyGroup>, StoreError> {
        let questions = self.questions.read().await;

        let mut grouped: BTreeMap<&str, Vec<String>> = BTreeMap::new();
        for question in questions.values() {
            for company in &question.companies {
                grouped.entry(company.as_str()).or_default().push(question.id.clone());
            }
        }

        let mut groups: Vec<CompanyGroup> = grouped
            .into_iter()
            .map(|(company, mut question_ids)| {
                question_ids.sort();
                CompanyGroup {
                    company: company.to_string(),
                    total: question_ids.len(),
                    question_ids,
                }
            })
            .collect();

        // BTreeMap order already sorts names; a stable sort keeps it for ties
        groups.sort_by(|a, b| b.total.cmp(&a.total));
        if let Some(limit) = limit {
            groups.truncate(limit);
        }

        Ok(groups)
    }

    async fn question_ids(&self) -> Result<HashSet<String>, StoreError> {
        Ok(self.questions.read().await.keys().cloned().collect())
    }

    async fn purge_questions(&self) -> Result<u64, StoreError> {
        let mut questions = self.questions.write().await;
        let mut changes = self.changes.lock().await;
        let deleted = questions.len() as u64;
        questions.clear();
        changes.questions_purged = true;
        changes.questions.clear();
        Ok(deleted)
    }
}

#[async_trait]
impl ProgressStore for MemoryStore {
    async fn get_progress(
        &self,
        user_id: &str,
        question_id: &str,
    ) -> Result<Option<Progress>, StoreError> {
        let key = (user_id.to_string(), question_id.to_string());
        Ok(self.progress.read().await.get(&key).cloned())
    }

    async fn upsert_progress(
        &self,
        user_id: &str,
        question_id: &str,
        write: ProgressWrite,
    ) -> Result<Progress, StoreError> {
        let key = (user_id.to_string(), question_id.to_string());
        let mut progress = self.progress.write().await;
        let mut changes = self.changes.lock().await;

        let existing = progress.remove(&key);
        let record = write.apply(user_id, question_id, existing);
        changes.removed_progress.remove(&key);
        changes.progress.insert(key.clone());
        progress.insert(key, record.clone());

        Ok(record)
    }

    async fn find_progress(
        &self,
        filter: &ProgressFilter,
        options: &ProgressFind,
    ) -> Result<Vec<Progress>, StoreError> {
        let progress = self.progress.read().await;
        let mut matched: Vec<&Progress> = progress.values().filter(|p| filter.matches(p)).collect();

        match options.sort {
            ProgressSort::QuestionId => matched.sort_by(|a, b| a.question_id.cmp(&b.question_id)),
            ProgressSort::RecentlyUpdated => matched.sort_by(|a, b| {
                b.updated_at.cmp(&a.updated_at).then_with(|| a.question_id.cmp(&b.question_id))
            }),
        }

        Ok(matched.into_iter().take(options.limit.unwrap_or(usize::MAX)).cloned().collect())
    }

    async fn count_progress(&self, filter: &ProgressFilter) -> Result<u64, StoreError> {
        let progress = self.progress.read().await;
        Ok(progress.values().filter(|p| filter.matches(p)).count() as u64)
    }

    async fn delete_progress_outside(&self, known: &HashSet<String>) -> Result<u64, StoreError> {
        let mut progress = self.progress.write().await;
        let mut changes = self.changes.lock().await;

        let orphans: Vec<ProgressKey> = progress
            .keys()
            .filter(|(_, question_id)| !known.contains(question_id))
            .cloned()
            .collect();
        for key in &orphans {
            progress.remove(key);
            changes.progress.remove(key);
            changes.removed_progress.insert(key.clone());
        }

        Ok(orphans.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::Utc;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::{ProgressFields, ProgressStatus};

    fn upsert(id: &str, title: &str, companies: &[&str]) -> QuestionUpsert {
        QuestionUpsert {
            id: id.to_string(),
            title: title.to_string(),
            url: format!("https://leetcode.com/problems/{}", id),
            difficulty: Difficulty::Easy,
            acceptance_rate: 0.5,
            companies: companies.iter().map(|c| c.to_string()).collect::<BTreeSet<_>>(),
            appearances: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    fn solve() -> ProgressWrite {
        ProgressWrite {
            set: ProgressFields { status: Some(ProgressStatus::Solved), ..Default::default() },
            set_on_insert: ProgressFields::default(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn upsert_never_shrinks_companies() {
        let store = MemoryStore::new();
        store
            .upsert_questions(vec![upsert("two-sum", "Two Sum", &["Google", "Amazon"])])
            .await
            .unwrap();
        store.upsert_questions(vec![upsert("two-sum", "Two Sum", &["Meta"])]).await.unwrap();

        let question = store.get_question("two-sum").await.unwrap().unwrap();
        assert_eq!(question.company_count(), 3);
    }

    #[tokio::test]
    async fn find_by_url_uses_pattern() {
        let store = MemoryStore::new();
        store.upsert_questions(vec![upsert("two-sum", "Two Sum", &["Google"])]).await.unwrap();

        let pattern = Regex::new("/two-sum/?$").unwrap();
        assert!(store.find_by_url(&pattern).await.unwrap().is_some());

        let pattern = Regex::new("/three-sum/?$").unwrap();
        assert!(store.find_by_url(&pattern).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn company_groups_sorted_by_total() {
        let store = MemoryStore::new();
        store
            .upsert_questions(vec![
                upsert("a", "A", &["Google", "Amazon"]),
                upsert("b", "B", &["Google"]),
                upsert("c", "C", &["Meta"]),
            ])
            .await
            .unwrap();

        let groups = store.company_groups(None).await.unwrap();
        let names: Vec<_> = groups.iter().map(|g| g.company.as_str()).collect();
        assert_eq!(names, vec!["Google", "Amazon", "Meta"]);
        assert_eq!(groups[0].question_ids, vec!["a".to_string(), "b".to_string()]);

        let top = store.company_groups(Some(1)).await.unwrap();
        assert_eq!(top.len(), 1);
    }

    #[tokio::test]
    async fn find_questions_pages_results() {
        let store = MemoryStore::new();
        store
            .upsert_questions(vec![
                upsert("a", "A", &[]),
                upsert("b", "B", &[]),
                upsert("c", "C", &[]),
            ])
            .await
            .unwrap();

        let page = store
            .find_questions(&QuestionFilter::default(), &FindOptions::default().skip(1).limit(1))
            .await
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].id, "b");
    }

    #[tokio::test]
    async fn progress_is_partitioned_by_user() {
        let store = MemoryStore::new();
        store.upsert_progress("u1", "two-sum", solve()).await.unwrap();

        assert!(store.get_progress("u1", "two-sum").await.unwrap().is_some());
        assert!(store.get_progress("u2", "two-sum").await.unwrap().is_none());
        assert_eq!(store.count_progress(&ProgressFilter::for_user("u2")).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn delete_progress_outside_removes_orphans() {
        let store = MemoryStore::new();
        store.upsert_progress("u1", "kept", solve()).await.unwrap();
        store.upsert_progress("u1", "orphan", solve()).await.unwrap();

        let known: HashSet<String> = ["kept".to_string()].into_iter().collect();
        assert_eq!(store.delete_progress_outside(&known).await.unwrap(), 1);
        assert!(store.get_progress("u1", "kept").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn snapshot_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");

        let store = MemoryStore::open(&path).await.unwrap();
        store.upsert_questions(vec![upsert("two-sum", "Two Sum", &["Google"])]).await.unwrap();
        store.upsert_progress("u1", "two-sum", solve()).await.unwrap();
        store.save().await.unwrap();

        let reopened = MemoryStore::open(&path).await.unwrap();
        assert_eq!(
            reopened.get_question("two-sum").await.unwrap(),
            store.get_question("two-sum").await.unwrap()
        );
        assert!(reopened.get_progress("u1", "two-sum").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn overlapping_handles_keep_each_others_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let first = MemoryStore::open(&path).await.unwrap();
        let second = MemoryStore::open(&path).await.unwrap();
        first.upsert_progress("u1", "two-sum", solve()).await.unwrap();
        second.upsert_progress("u2", "lru-cache", solve()).await.unwrap();

        first.save().await.unwrap();
        second.save().await.unwrap();

        let reopened = MemoryStore::open(&path).await.unwrap();
        assert!(reopened.get_progress("u1", "two-sum").await.unwrap().is_some());
        assert!(reopened.get_progress("u2", "lru-cache").await.unwrap().is_some());

        // Saving also pulls in what the other handle wrote
        assert!(second.get_progress("u1", "two-sum").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn deletions_and_purges_survive_merge() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let seed = MemoryStore::open(&path).await.unwrap();
        seed.upsert_questions(vec![upsert("kept", "Kept", &["Google"])]).await.unwrap();
        seed.upsert_progress("u1", "kept", solve()).await.unwrap();
        seed.upsert_progress("u1", "orphan", solve()).await.unwrap();
        seed.save().await.unwrap();

        let cleaner = MemoryStore::open(&path).await.unwrap();
        let other = MemoryStore::open(&path).await.unwrap();
        let known = cleaner.question_ids().await.unwrap();
        assert_eq!(cleaner.delete_progress_outside(&known).await.unwrap(), 1);
        assert_eq!(cleaner.purge_questions().await.unwrap(), 1);
        other.upsert_progress("u2", "kept", solve()).await.unwrap();

        cleaner.save().await.unwrap();
        other.save().await.unwrap();

        let reopened = MemoryStore::open(&path).await.unwrap();
        assert!(reopened.get_progress("u1", "orphan").await.unwrap().is_none());
        assert!(reopened.get_progress("u1", "kept").await.unwrap().is_some());
        assert!(reopened.get_progress("u2", "kept").await.unwrap().is_some());
        assert!(reopened.question_ids().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn save_replaces_snapshot_without_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let store = MemoryStore::open(&path).await.unwrap();
        store.upsert_progress("u1", "two-sum", solve()).await.unwrap();
        store.save().await.unwrap();
        store.upsert_progress("u1", "lru-cache", solve()).await.unwrap();
        store.save().await.unwrap();

        let mut names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        assert_eq!(names, vec!["store.json".to_string(), "store.json.lock".to_string()]);
    }

    #[tokio::test]
    async fn corrupt_snapshot_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "not json").unwrap();

        let err = MemoryStore::open(&path).await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }
}
