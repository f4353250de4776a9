//! Comment thread reconstruction.
//!
//! Comments are stored flat, each with an optional parent reference.  A
//! [`Thread`] arranges them into a forest kept as an arena: comments live in
//! a `Vec`, and each slot owns the indices of its direct replies.  Nothing
//! points back up, so the structure stays trivially serializable and a bad
//! parent reference can never loop a traversal.
//!
//! Every input comment appears exactly once, either as a root or as a reply:
//!
//! - a parent missing from the input set makes the comment a root (the set
//!   may have been filtered);
//! - a comment naming itself as parent is a root;
//! - a parent chain that loops back on itself is cut by promoting the loop
//!   member that comes first in input order to a root.  Comments hanging
//!   off the loop stay attached to it.
//!
//! Siblings are ordered by creation time, ties broken by id.
//!
//! [`Thread::into_forest`] lays the result out flat in display order, each
//! entry naming its replies by id.  Reply chains have no depth limit, so
//! nothing that builds, serializes or drops a forest walks it recursively.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::CommentId;

/// What the reconstructor needs to know about a comment.
pub trait Threaded {
    fn comment_id(&self) -> CommentId;
    fn parent_id(&self) -> Option<CommentId>;
    fn created_at(&self) -> DateTime<Utc>;
}

/// One comment of a [`Forest`] with the ids of its direct replies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentNode<T> {
    #[serde(flatten)]
    pub comment: T,
    /// Nesting level, 0 for roots.
    pub depth: usize,
    pub replies: Vec<CommentId>,
}

/// A reconstructed thread in display order: every comment is followed by
/// its replies, depth first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forest<T> {
    pub roots: Vec<CommentId>,
    pub comments: Vec<CommentNode<T>>,
}

impl<T> Forest<T> {
    pub fn len(&self) -> usize {
        self.comments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.comments.is_empty()
    }
}

/// Arena-backed comment forest.
#[derive(Debug, Clone)]
pub struct Thread<T> {
    nodes: Vec<T>,
    index: HashMap<CommentId, usize>,
    replies: Vec<Vec<usize>>,
    roots: Vec<usize>,
}

impl<T: Threaded> Thread<T> {
    /// Build the forest from a flat comment list in any order.
    pub fn build(comments: Vec<T>) -> Self {
        let mut thread = Self {
            nodes: comments,
            index: HashMap::new(),
            replies: Vec::new(),
            roots: Vec::new(),
        };
        thread.relink();
        thread
    }

    /// Add a freshly created comment without refetching the list.
    ///
    /// The comment lands under its parent when the parent is present, as a
    /// root otherwise.  Earlier comments that were waiting for this one as
    /// their parent are adopted.
    pub fn insert(&mut self, comment: T) {
        self.nodes.push(comment);
        self.relink();
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: CommentId) -> Option<&T> {
        self.index.get(&id).map(|&slot| &self.nodes[slot])
    }

    /// Top-level comments in display order.
    pub fn roots(&self) -> impl Iterator<Item = &T> + '_ {
        self.roots.iter().map(move |&slot| &self.nodes[slot])
    }

    /// Direct replies to `id` in display order.  Empty for unknown ids.
    pub fn replies(&self, id: CommentId) -> impl Iterator<Item = &T> + '_ {
        let slots = self
            .index
            .get(&id)
            .map(|&slot| self.replies[slot].as_slice())
            .unwrap_or(&[]);
        slots.iter().map(move |&slot| &self.nodes[slot])
    }

    /// Consume the arena into a flat forest in display order.
    pub fn into_forest(self) -> Forest<T> {
        let order = self.pre_order();
        let Thread {
            nodes,
            replies,
            roots,
            ..
        } = self;

        let ids: Vec<CommentId> = nodes.iter().map(Threaded::comment_id).collect();
        let mut pending: Vec<Option<T>> = nodes.into_iter().map(Some).collect();

        let comments = order
            .into_iter()
            .filter_map(|(slot, depth)| {
                let comment = pending[slot].take()?;
                Some(CommentNode {
                    comment,
                    depth,
                    replies: replies[slot].iter().map(|&child| ids[child]).collect(),
                })
            })
            .collect();

        Forest {
            roots: roots.into_iter().map(|slot| ids[slot]).collect(),
            comments,
        }
    }

    fn relink(&mut self) {
        let count = self.nodes.len();
        self.index.clear();
        for (slot, node) in self.nodes.iter().enumerate() {
            self.index.entry(node.comment_id()).or_insert(slot);
        }

        let mut parent: Vec<Option<usize>> = self
            .nodes
            .iter()
            .enumerate()
            .map(|(slot, node)| {
                node.parent_id()
                    .and_then(|pid| self.index.get(&pid).copied())
                    .filter(|&p| p != slot)
            })
            .collect();

        // Anything not reachable from a root sits on, or hangs off, a
        // parent loop.
        let mut reachable = vec![false; count];
        let mut children = build_children(&parent, count);
        for slot in 0..count {
            if parent[slot].is_none() {
                mark(slot, &children, &mut reachable);
            }
        }
        for slot in 0..count {
            if !reachable[slot] {
                let cut = loop_member(slot, &parent);
                parent[cut] = None;
                children = build_children(&parent, count);
                mark(cut, &children, &mut reachable);
            }
        }

        let key = |slot: &usize| {
            let node = &self.nodes[*slot];
            (node.created_at(), node.comment_id())
        };
        for list in children.iter_mut() {
            list.sort_by_key(key);
        }
        let mut roots: Vec<usize> = (0..count).filter(|&s| parent[s].is_none()).collect();
        roots.sort_by_key(key);

        self.replies = children;
        self.roots = roots;
    }

    fn pre_order(&self) -> Vec<(usize, usize)> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<(usize, usize)> = self.roots.iter().rev().map(|&s| (s, 0)).collect();
        while let Some((slot, depth)) = stack.pop() {
            order.push((slot, depth));
            for &child in self.replies[slot].iter().rev() {
                stack.push((child, depth + 1));
            }
        }
        order
    }
}

fn build_children(parent: &[Option<usize>], count: usize) -> Vec<Vec<usize>> {
    let mut children = vec![Vec::new(); count];
    for (slot, p) in parent.iter().enumerate() {
        if let Some(p) = p {
            children[*p].push(slot);
        }
    }
    children
}

/// The earliest slot on the loop that `start`'s parent chain runs into.
/// `start` must be unreachable from every root, so the chain never ends.
fn loop_member(start: usize, parent: &[Option<usize>]) -> usize {
    let mut seen = vec![false; parent.len()];
    let mut slot = start;
    while !seen[slot] {
        seen[slot] = true;
        match parent[slot] {
            Some(p) => slot = p,
            None => return slot,
        }
    }

    let entry = slot;
    let mut earliest = entry;
    let mut next = parent[entry];
    while let Some(p) = next {
        if p == entry {
            break;
        }
        earliest = earliest.min(p);
        next = parent[p];
    }
    earliest
}

fn mark(start: usize, children: &[Vec<usize>], reachable: &mut [bool]) {
    let mut stack = vec![start];
    while let Some(slot) = stack.pop() {
        if reachable[slot] {
            continue;
        }
        reachable[slot] = true;
        stack.extend(children[slot].iter().copied());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        id: i64,
        parent: Option<i64>,
        at: i64,
    }

    impl Threaded for Note {
        fn comment_id(&self) -> CommentId {
            CommentId(self.id)
        }
        fn parent_id(&self) -> Option<CommentId> {
            self.parent.map(CommentId)
        }
        fn created_at(&self) -> DateTime<Utc> {
            Utc.timestamp_opt(self.at, 0).unwrap()
        }
    }

    fn note(id: i64, parent: Option<i64>, at: i64) -> Note {
        Note { id, parent, at }
    }

    fn ids<'a>(it: impl Iterator<Item = &'a Note>) -> Vec<i64> {
        it.map(|n| n.id).collect()
    }

    fn forest_ids(forest: &Forest<Note>) -> Vec<i64> {
        forest.comments.iter().map(|n| n.comment.id).collect()
    }

    #[test]
    fn test_builds_nested_replies() {
        let thread = Thread::build(vec![
            note(3, Some(1), 30),
            note(1, None, 10),
            note(2, None, 20),
            note(4, Some(3), 40),
            note(5, Some(1), 35),
        ]);

        assert_eq!(ids(thread.roots()), vec![1, 2]);
        assert_eq!(ids(thread.replies(CommentId(1))), vec![3, 5]);
        assert_eq!(ids(thread.replies(CommentId(3))), vec![4]);
        assert_eq!(ids(thread.replies(CommentId(99))), Vec::<i64>::new());
    }

    #[test]
    fn test_equal_timestamps_order_by_id() {
        let thread = Thread::build(vec![
            note(9, None, 5),
            note(2, None, 5),
            note(7, Some(2), 6),
            note(4, Some(2), 6),
        ]);
        assert_eq!(ids(thread.roots()), vec![2, 9]);
        assert_eq!(ids(thread.replies(CommentId(2))), vec![4, 7]);
    }

    #[test]
    fn test_missing_parent_becomes_root() {
        let thread = Thread::build(vec![note(1, None, 1), note(2, Some(404), 2)]);
        assert_eq!(ids(thread.roots()), vec![1, 2]);
    }

    #[test]
    fn test_self_parent_and_cycles_keep_every_comment() {
        let thread = Thread::build(vec![
            note(1, Some(1), 1),
            note(2, Some(3), 2),
            note(3, Some(2), 3),
            note(4, Some(3), 4),
        ]);

        let forest = thread.into_forest();
        let mut seen = forest_ids(&forest);
        seen.sort();
        assert_eq!(seen, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_loop_is_cut_at_a_loop_member() {
        // 4 hangs off the 2 <-> 3 loop and comes first in input order.
        let thread = Thread::build(vec![
            note(4, Some(3), 4),
            note(2, Some(3), 2),
            note(3, Some(2), 3),
        ]);

        assert_eq!(ids(thread.roots()), vec![2]);
        assert_eq!(ids(thread.replies(CommentId(2))), vec![3]);
        assert_eq!(ids(thread.replies(CommentId(3))), vec![4]);
    }

    #[test]
    fn test_forest_preserves_every_comment_once() {
        let mut comments = Vec::new();
        for id in 1..=50 {
            let parent = if id % 5 == 1 { None } else { Some(id - 1 - (id % 3)) };
            comments.push(note(id, parent, id % 7));
        }
        let forest = Thread::build(comments).into_forest();

        let mut seen = forest_ids(&forest);
        seen.sort();
        assert_eq!(seen, (1..=50).collect::<Vec<_>>());
    }

    #[test]
    fn test_forest_lists_replies_after_their_parent() {
        let forest = Thread::build(vec![
            note(3, Some(1), 30),
            note(1, None, 10),
            note(2, None, 20),
            note(4, Some(3), 40),
            note(5, Some(1), 35),
        ])
        .into_forest();

        assert_eq!(forest.roots, vec![CommentId(1), CommentId(2)]);
        assert_eq!(forest_ids(&forest), vec![1, 3, 4, 5, 2]);
        let depths: Vec<_> = forest.comments.iter().map(|n| n.depth).collect();
        assert_eq!(depths, vec![0, 1, 2, 1, 0]);
        assert_eq!(forest.comments[0].replies, vec![CommentId(3), CommentId(5)]);
        assert!(forest.comments[4].replies.is_empty());
    }

    #[test]
    fn test_insert_reply_and_adopt_orphans() {
        let mut thread = Thread::build(vec![note(1, None, 1), note(3, Some(2), 3)]);
        assert_eq!(ids(thread.roots()), vec![1, 3]);

        thread.insert(note(2, Some(1), 2));
        assert_eq!(thread.len(), 3);
        assert_eq!(ids(thread.roots()), vec![1]);
        assert_eq!(ids(thread.replies(CommentId(1))), vec![2]);
        assert_eq!(ids(thread.replies(CommentId(2))), vec![3]);

        thread.insert(note(10, None, 0));
        assert_eq!(ids(thread.roots()), vec![10, 1]);
    }

    #[test]
    fn test_deep_chain_builds_serializes_and_drops() {
        let comments = (0..200_000)
            .map(|id| note(id, if id == 0 { None } else { Some(id - 1) }, id))
            .collect();
        let thread = Thread::build(comments);
        assert_eq!(thread.roots().count(), 1);

        let forest = thread.into_forest();
        assert_eq!(forest.len(), 200_000);
        assert_eq!(forest.comments[199_999].depth, 199_999);

        let json = serde_json::to_vec(&forest).unwrap();
        let back: Forest<Note> = serde_json::from_slice(&json).unwrap();
        assert_eq!(back.comments[1].replies, vec![CommentId(2)]);
        drop(back);
        drop(forest);
    }

    #[test]
    fn test_node_serializes_flat_with_reply_ids() {
        let forest = Thread::build(vec![note(1, None, 1), note(2, Some(1), 2)]).into_forest();
        let json = serde_json::to_value(&forest).unwrap();
        assert_eq!(json["roots"], serde_json::json!([1]));
        assert_eq!(json["comments"][0]["id"], 1);
        assert_eq!(json["comments"][0]["depth"], 0);
        assert_eq!(json["comments"][0]["replies"], serde_json::json!([2]));
        assert_eq!(json["comments"][1]["depth"], 1);
        assert_eq!(json["comments"][1]["replies"], serde_json::json!([]));
    }
}
