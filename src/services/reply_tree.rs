// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Forum reply threading.
//!
//! Replies are stored flat with an optional parent pointer; this rebuilds
//! the nested discussion as a forest.

use serde::Serialize;
use std::collections::{HashMap, VecDeque};

/// A reply that may point at a parent reply.
pub trait ThreadedReply {
    fn reply_id(&self) -> &str;
    fn parent_reply_id(&self) -> Option<&str>;
}

impl<T: ThreadedReply + ?Sized> ThreadedReply for &T {
    fn reply_id(&self) -> &str {
        (**self).reply_id()
    }

    fn parent_reply_id(&self) -> Option<&str> {
        (**self).parent_reply_id()
    }
}

/// Deepest nesting level rendered. Replies further down a chain are
/// listed as siblings at this level, in conversation order.
pub const MAX_THREAD_DEPTH: usize = 32;

/// A reply together with its direct answers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplyNode<T> {
    #[serde(flatten)]
    pub reply: T,
    pub children: Vec<ReplyNode<T>>,
}

impl<T> ReplyNode<T> {
    /// Number of replies in this subtree, including this one.
    pub fn size(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children.iter());
        }
        count
    }

    /// Nesting levels in this subtree; a leaf has depth 1.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(self, 1)];
        while let Some((node, level)) = stack.pop() {
            deepest = deepest.max(level);
            stack.extend(node.children.iter().map(|c| (c, level + 1)));
        }
        deepest
    }
}

/// Build the reply forest for one topic.
///
/// A reply becomes a root when it has no parent or when its parent is not
/// part of `replies` (for example a parent cut off by a query limit). Roots
/// and children keep the order of the input list. No node is nested deeper
/// than [`MAX_THREAD_DEPTH`].
///
/// Ids are expected to be unique; if one repeats, children attach to its
/// last occurrence.
pub fn build_reply_tree<T: ThreadedReply>(replies: Vec<T>) -> Vec<ReplyNode<T>> {
    let total = replies.len();

    // Pass 1: index by id.
    let index: HashMap<&str, usize> = replies
        .iter()
        .enumerate()
        .map(|(i, reply)| (reply.reply_id(), i))
        .collect();

    // Pass 2: attach to parent or root list, in input order.
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); total];
    let mut roots: Vec<usize> = Vec::new();
    for (i, reply) in replies.iter().enumerate() {
        match reply.parent_reply_id().and_then(|p| index.get(p)) {
            Some(&parent) => children[parent].push(i),
            None => roots.push(i),
        }
    }
    drop(index);

    // Pass 3: breadth-first from the roots, capping depth. Replies on a
    // parent cycle are never reached.
    let mut placed_under: Vec<Vec<usize>> = vec![Vec::new(); total];
    let mut anchor_of: Vec<Option<usize>> = vec![None; total];
    let mut depth = vec![0usize; total];
    let mut order = Vec::with_capacity(total);
    let mut queue: VecDeque<usize> = roots.iter().copied().collect();
    while let Some(node) = queue.pop_front() {
        order.push(node);
        for &child in &children[node] {
            let anchor = match anchor_of[node] {
                Some(up) if depth[node] + 1 >= MAX_THREAD_DEPTH => up,
                _ => node,
            };
            anchor_of[child] = Some(anchor);
            depth[child] = depth[anchor] + 1;
            placed_under[anchor].push(child);
            queue.push_back(child);
        }
    }

    if order.len() < total {
        tracing::warn!(
            total,
            placed = order.len(),
            "Reply parent pointers form a cycle; unreachable replies omitted"
        );
    }

    // Pass 4: deepest first, so every child node exists before its parent.
    let mut slots: Vec<Option<T>> = replies.into_iter().map(Some).collect();
    let mut built: Vec<Option<ReplyNode<T>>> =
        std::iter::repeat_with(|| None).take(total).collect();
    for &i in order.iter().rev() {
        let Some(reply) = slots[i].take() else {
            continue;
        };
        let kids = placed_under[i]
            .iter()
            .filter_map(|&child| built[child].take())
            .collect();
        built[i] = Some(ReplyNode {
            reply,
            children: kids,
        });
    }

    roots
        .into_iter()
        .filter_map(|i| built[i].take())
        .collect()
}
