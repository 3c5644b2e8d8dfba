use std::collections::{hash_map, HashMap};

use crate::{
    api::{Comment, CommentId},
    CommentExt,
};

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Node {
    pub comment: Comment,

    /// 0 for top-level comments
    pub depth: usize,

    /// Replies, in thread order
    pub children: Vec<Node>,
}

impl Node {
    /// Number of comments in this subtree, including this one
    pub fn len(&self) -> usize {
        let mut res = 0;
        let mut stack = vec![self];
        while let Some(n) = stack.pop() {
            res += 1;
            stack.extend(n.children.iter());
        }
        res
    }

    pub fn find(&self, id: &CommentId) -> Option<&Node> {
        find(std::slice::from_ref(self), id)
    }
}

// Threads can be deeper than the stack allows recursing
impl Drop for Node {
    fn drop(&mut self) {
        let mut stack = std::mem::take(&mut self.children);
        while let Some(mut n) = stack.pop() {
            stack.append(&mut n.children);
        }
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Unvisited,
    OnPath,
    Done,
}

/// Cuts every parent edge that closes a cycle, in a single pass over the
/// nodes. `order` decides which node of a cycle gets promoted to root.
fn break_cycles(comments: &[Comment], parents: &mut [Option<usize>], order: &[usize]) {
    let mut marks = vec![Mark::Unvisited; parents.len()];
    let mut path = Vec::new();
    for &start in order {
        if marks[start] != Mark::Unvisited {
            continue;
        }
        let mut cur = start;
        loop {
            marks[cur] = Mark::OnPath;
            path.push(cur);
            match parents[cur] {
                None => break,
                Some(p) => match marks[p] {
                    Mark::Done => break,
                    Mark::Unvisited => cur = p,
                    Mark::OnPath => {
                        tracing::warn!(
                            comment = %comments[cur].id,
                            parent = %comments[p].id,
                            "comment thread contains a cycle, promoting comment to top-level"
                        );
                        parents[cur] = None;
                        break;
                    }
                },
            }
        }
        for i in path.drain(..) {
            marks[i] = Mark::Done;
        }
    }
}

/// Converts the flat comment collection of a single post into a forest
///
/// Top-level comments, comments whose parent is not in `comments` and
/// comments whose parent chain loops are all roots. Every list of siblings
/// is sorted by creation time, then id. Every input comment appears exactly
/// once in the result, duplicated ids included.
pub fn build_tree(comments: &[Comment]) -> Vec<Node> {
    let n = comments.len();

    // Replies to a duplicated id attach to its first occurrence
    let mut by_id: HashMap<&CommentId, usize> = HashMap::with_capacity(n);
    for (i, c) in comments.iter().enumerate() {
        match by_id.entry(&c.id) {
            hash_map::Entry::Vacant(e) => {
                e.insert(i);
            }
            hash_map::Entry::Occupied(_) => {
                tracing::warn!(comment = %c.id, "duplicate comment id in collection")
            }
        }
    }

    let mut parents = comments
        .iter()
        .map(|c| match &c.parent_id {
            None => None,
            Some(p) => match by_id.get(p) {
                Some(&p) => Some(p),
                None => {
                    tracing::trace!(comment = %c.id, parent = %p, "promoting orphan comment");
                    None
                }
            },
        })
        .collect::<Vec<_>>();

    let mut order = (0..n).collect::<Vec<_>>();
    order.sort_by(|&a, &b| comments[a].thread_key().cmp(&comments[b].thread_key()));
    break_cycles(comments, &mut parents, &order);

    // Iterating in thread order means every child list comes out sorted
    let mut roots = Vec::new();
    let mut children = vec![Vec::new(); n];
    for &i in &order {
        match parents[i] {
            None => roots.push(i),
            Some(p) => children[p].push(i),
        }
    }

    // Pre-order, so that depths flow top-down and every node comes before its children
    let mut depths = vec![0; n];
    let mut preorder = Vec::with_capacity(n);
    let mut stack = roots.iter().rev().copied().collect::<Vec<_>>();
    while let Some(i) = stack.pop() {
        preorder.push(i);
        for &c in children[i].iter().rev() {
            depths[c] = depths[i] + 1;
            stack.push(c);
        }
    }

    let mut built: Vec<Option<Node>> = (0..n).map(|_| None).collect();
    for &i in preorder.iter().rev() {
        let kids = children[i]
            .iter()
            .map(|&c| built[c].take().expect("child node built before its parent"))
            .collect();
        built[i] = Some(Node {
            comment: comments[i].clone(),
            depth: depths[i],
            children: kids,
        });
    }
    roots
        .into_iter()
        .map(|r| built[r].take().expect("root node was built"))
        .collect()
}

/// Pre-order listing of all the comments in `forest`
pub fn flatten(forest: &[Node]) -> Vec<Comment> {
    let mut res = Vec::new();
    let mut stack = forest.iter().rev().collect::<Vec<_>>();
    while let Some(n) = stack.pop() {
        res.push(n.comment.clone());
        stack.extend(n.children.iter().rev());
    }
    res
}

pub fn count(forest: &[Node]) -> usize {
    forest.iter().map(|n| n.len()).sum()
}

pub fn find<'a>(forest: &'a [Node], id: &CommentId) -> Option<&'a Node> {
    let mut stack = forest.iter().collect::<Vec<_>>();
    while let Some(n) = stack.pop() {
        if n.comment.id == *id {
            return Some(n);
        }
        stack.extend(n.children.iter());
    }
    None
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::*;
    use crate::api::{PostId, Time, UserId};

    fn t(secs: i64) -> Time {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::seconds(secs)
    }

    fn comment(id: u64, parent: Option<u64>, at: i64) -> Comment {
        Comment {
            id: CommentId::from(id),
            post_id: PostId::from(1),
            parent_id: parent.map(CommentId::from),
            author_id: UserId::from(100 + id),
            author_name: format!("user{id}"),
            text: format!("comment {id}"),
            created_at: t(at),
            liked_by: Default::default(),
        }
    }

    fn ids(forest: &[Node]) -> Vec<&str> {
        forest.iter().map(|n| n.comment.id.as_str()).collect()
    }

    fn check_siblings_ordered(forest: &[Node]) {
        for w in forest.windows(2) {
            assert!(
                w[0].comment.thread_key() <= w[1].comment.thread_key(),
                "siblings out of order: {:?} then {:?}",
                w[0].comment.id,
                w[1].comment.id,
            );
        }
        for n in forest {
            check_siblings_ordered(&n.children);
        }
    }

    fn check_depths(forest: &[Node], depth: usize) {
        for n in forest {
            assert_eq!(n.depth, depth, "bad depth for {:?}", n.comment.id);
            check_depths(&n.children, depth + 1);
        }
    }

    #[test]
    fn empty_input() {
        assert_eq!(build_tree(&[]), Vec::new());
    }

    #[test]
    fn all_top_level() {
        let forest = build_tree(&[comment(3, None, 2), comment(1, None, 0), comment(2, None, 1)]);
        assert_eq!(ids(&forest), vec!["1", "2", "3"]);
        assert!(forest.iter().all(|n| n.depth == 0 && n.children.is_empty()));
    }

    #[test]
    fn orphans_are_promoted() {
        let forest = build_tree(&[comment(1, None, 0), comment(2, Some(99), 1)]);
        assert_eq!(ids(&forest), vec!["1", "2"]);
        assert_eq!(count(&forest), 2);
    }

    #[test]
    fn depths() {
        let forest = build_tree(&[comment(3, Some(2), 2), comment(1, None, 0), comment(2, Some(1), 1)]);
        assert_eq!(ids(&forest), vec!["1"]);
        let root = &forest[0];
        assert_eq!(root.depth, 0);
        assert_eq!(root.children[0].comment.id, CommentId::from(2));
        assert_eq!(root.children[0].depth, 1);
        assert_eq!(root.children[0].children[0].comment.id, CommentId::from(3));
        assert_eq!(root.children[0].children[0].depth, 2);
        assert_eq!(root.len(), 3);
    }

    #[test]
    fn ties_broken_by_id() {
        let forest = build_tree(&[
            comment(1, None, 0),
            comment(12, Some(1), 5),
            comment(3, Some(1), 5),
            comment(7, Some(1), 4),
        ]);
        assert_eq!(ids(&forest[0].children), vec!["7", "3", "12"]);
    }

    #[test]
    fn sibling_order_is_independent_per_level() {
        // Reply 4 is older than its parent's older sibling's replies, which must not matter
        let forest = build_tree(&[
            comment(1, None, 0),
            comment(2, None, 10),
            comment(3, Some(1), 20),
            comment(4, Some(2), 15),
            comment(5, Some(1), 12),
        ]);
        assert_eq!(ids(&forest), vec!["1", "2"]);
        assert_eq!(ids(&forest[0].children), vec!["5", "3"]);
        assert_eq!(ids(&forest[1].children), vec!["4"]);
    }

    #[test]
    fn self_parent_and_cycles() {
        let forest = build_tree(&[comment(1, Some(1), 0)]);
        assert_eq!(ids(&forest), vec!["1"]);

        // 2 -> 3 -> 4 -> 2, with 5 hanging below 4
        let forest = build_tree(&[
            comment(2, Some(4), 1),
            comment(3, Some(2), 2),
            comment(4, Some(3), 3),
            comment(5, Some(4), 4),
        ]);
        assert_eq!(count(&forest), 4);
        assert_eq!(forest.len(), 1);
        check_depths(&forest, 0);
    }

    #[test]
    fn duplicate_ids_keep_every_record() {
        let forest = build_tree(&[
            comment(1, None, 0),
            comment(1, None, 3),
            comment(2, Some(1), 1),
        ]);
        assert_eq!(count(&forest), 3);
        assert_eq!(ids(&forest), vec!["1", "1"]);
        assert_eq!(ids(&forest[0].children), vec!["2"]);
    }

    #[test]
    fn deep_threads_do_not_recurse() {
        let comments = (0..50_000)
            .map(|i| comment(i, i.checked_sub(1), i as i64))
            .collect::<Vec<_>>();
        let forest = build_tree(&comments);
        assert_eq!(count(&forest), comments.len());
        let deepest = find(&forest, &CommentId::from(49_999)).unwrap();
        assert_eq!(deepest.depth, 49_999);
        assert_eq!(flatten(&forest), comments);
        drop(forest);
    }

    /// Generated comment graphs: entry `i` gets id `i`, a creation time, and
    /// a parent picked among `0..=len` (where `len` itself is never a valid id)
    fn generated(edges: &[(Option<u8>, u8)]) -> Vec<Comment> {
        let len = edges.len() as u64;
        edges.iter()
            .enumerate()
            .map(|(i, (parent, at))| {
                let parent = parent.map(|p| p as u64 % (len + 1));
                comment(i as u64, parent, *at as i64)
            })
            .collect()
    }

    #[test]
    fn forest_is_complete_and_ordered() {
        bolero::check!()
            .with_type::<Vec<(Option<u8>, u8)>>()
            .for_each(|edges| {
                let comments = generated(edges);
                let forest = build_tree(&comments);
                assert_eq!(count(&forest), comments.len());
                check_siblings_ordered(&forest);
                check_depths(&forest, 0);
            });
    }

    #[test]
    fn rebuilding_is_idempotent() {
        bolero::check!()
            .with_type::<Vec<(Option<u8>, u8)>>()
            .for_each(|edges| {
                // Only keep edges pointing to older entries, so that the input is acyclic
                let acyclic = edges
                    .iter()
                    .enumerate()
                    .map(|(i, (p, at))| (p.filter(|p| (*p as usize) < i), *at))
                    .collect::<Vec<_>>();
                let forest = build_tree(&generated(&acyclic));
                assert_eq!(build_tree(&flatten(&forest)), forest);
            });
    }

    #[test]
    fn input_order_does_not_matter() {
        bolero::check!()
            .with_type::<Vec<(Option<u8>, u8)>>()
            .for_each(|edges| {
                let comments = generated(edges);
                let mut reversed = comments.clone();
                reversed.reverse();
                assert_eq!(build_tree(&comments), build_tree(&reversed));
            });
    }
}
