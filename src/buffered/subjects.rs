//! Field-level change tracking on top of `Buffered`.
//!
//! Every staged field write records its path. `commit()` commits the cell
//! once and pushes the new projection to the channel of each touched path
//! that has one. Channels are created on first subscription and live as
//! long as the tracker does.

use std::collections::{HashMap, HashSet};

use parking_lot::Mutex;
use tokio::sync::watch;

use super::{Addressable, Buffered};

pub struct BufferedPathSubjects<V: Addressable> {
    value: Buffered<V>,
    subjects: Mutex<HashMap<V::Path, watch::Sender<V::Field>>>,
    touched: HashSet<V::Path>,
}

impl<V: Clone + Addressable> BufferedPathSubjects<V> {
    pub fn new(value: V) -> Self {
        Self {
            value: Buffered::new(value),
            subjects: Mutex::new(HashMap::new()),
            touched: HashSet::new(),
        }
    }

    pub fn value(&self) -> &Buffered<V> {
        &self.value
    }

    /// Read a committed field.
    pub fn get(&self, path: &V::Path) -> V::Field {
        self.value.field(path)
    }

    /// Stage a field write and mark its path touched.
    pub fn set(&mut self, path: &V::Path, value: V::Field) {
        self.value.set_field(path, value);
        self.touched.insert(path.clone());
    }

    /// Paths written since the last commit.
    pub fn touched(&self) -> impl Iterator<Item = &V::Path> {
        self.touched.iter()
    }

    /// Channel for one path, seeded with its committed projection.
    pub fn subscribe(&self, path: &V::Path) -> watch::Receiver<V::Field> {
        self.subjects
            .lock()
            .entry(path.clone())
            .or_insert_with(|| watch::channel(self.value.field(path)).0)
            .subscribe()
    }

    /// Commit the cell and notify touched paths. Returns whether anything
    /// was touched.
    pub fn commit(&mut self) -> bool {
        let touched = std::mem::take(&mut self.touched);
        let committed = self.value.commit();
        let subjects = self.subjects.lock();
        for path in &touched {
            if let Some(subject) = subjects.get(path) {
                subject.send_replace(committed.get_field(path));
            }
        }
        !touched.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffered::tree_path;
    use crate::model::{Json, Step};
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq)]
    struct Player {
        name: String,
        score: i64,
    }

    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    enum PlayerPath {
        Name,
        Score,
    }

    #[derive(Debug, Clone, PartialEq)]
    enum PlayerField {
        Name(String),
        Score(i64),
    }

    impl Addressable for Player {
        type Path = PlayerPath;
        type Field = PlayerField;

        fn get_field(&self, path: &PlayerPath) -> PlayerField {
            match path {
                PlayerPath::Name => PlayerField::Name(self.name.clone()),
                PlayerPath::Score => PlayerField::Score(self.score),
            }
        }

        fn set_field(&mut self, path: &PlayerPath, value: PlayerField) {
            match (path, value) {
                (PlayerPath::Name, PlayerField::Name(v)) => self.name = v,
                (PlayerPath::Score, PlayerField::Score(v)) => self.score = v,
                _ => {}
            }
        }
    }

    #[test]
    fn test_only_touched_paths_notify() {
        let mut o = BufferedPathSubjects::new(Player { name: "ada".into(), score: 0 });
        let name = o.subscribe(&PlayerPath::Name);
        let score = o.subscribe(&PlayerPath::Score);

        o.set(&PlayerPath::Score, PlayerField::Score(10));
        assert_eq!(o.get(&PlayerPath::Score), PlayerField::Score(0));
        assert!(o.commit());

        assert!(score.has_changed().unwrap());
        assert_eq!(*score.borrow(), PlayerField::Score(10));
        assert!(!name.has_changed().unwrap());
        assert_eq!(*name.borrow(), PlayerField::Name("ada".into()));
    }

    #[test]
    fn test_commit_without_writes_reports_nothing() {
        let mut o = BufferedPathSubjects::new(Player { name: "ada".into(), score: 0 });
        assert!(!o.commit());
    }

    #[test]
    fn test_late_subscriber_sees_committed_projection() {
        let mut o = BufferedPathSubjects::new(Json::from(json!({"a": {"b": 1}})));
        let ab = tree_path([Step::key("a"), Step::key("b")]);

        o.set(&ab, Some(Json::from(2)));
        o.set(&ab, Some(Json::from(3)));
        assert_eq!(o.touched().count(), 1);
        o.commit();

        let rx = o.subscribe(&ab);
        assert_eq!(*rx.borrow(), Some(Json::from(3)));
    }

    #[test]
    fn test_removed_field_projects_absent() {
        let mut o = BufferedPathSubjects::new(Json::from(json!({"a": 1})));
        let a = tree_path([Step::key("a")]);
        let rx = o.subscribe(&a);

        o.set(&a, None);
        o.commit();

        assert_eq!(*rx.borrow(), None);
    }
}
