use {
    gitmem_core::ThreadId,
    std::{
        cell::RefCell,
        fmt::{self, Display, Formatter},
        rc::Rc,
    },
};

/// A point in the space of schedules. A path from the root is one
/// schedule, each node naming the thread scheduled at that step. A node is
/// marked complete when its whole subtree has been explored (or a thread
/// crashed there, cutting the subtree off). Children are ordered by
/// strictly increasing thread id, which is what makes the exploration
/// deterministic.
// Remember to use Rc::ptr_eq for checking which node the cursor points to.
// As a safety precaution, TraceNode does not even support value equality
// checks.
#[derive(Debug)]
pub(crate) struct TraceNode {
    tid: ThreadId,
    complete: bool,
    children: Vec<Rc<RefCell<TraceNode>>>,
}

/// The exploration tree plus a cursor marking the node the current replay
/// has reached. The root always represents the main thread's first step.
#[derive(Debug)]
pub(crate) struct TraceTree {
    root: Rc<RefCell<TraceNode>>,
    cursor: Rc<RefCell<TraceNode>>,
}

impl TraceTree {
    pub(crate) fn new() -> Self {
        let root = Rc::new(RefCell::new(TraceNode {
            tid: ThreadId::from(0),
            complete: false,
            children: Vec::new(),
        }));
        TraceTree {
            cursor: Rc::clone(&root),
            root,
        }
    }

    pub(crate) fn root_complete(&self) -> bool {
        self.root.borrow().complete
    }

    pub(crate) fn cursor_complete(&self) -> bool {
        self.cursor.borrow().complete
    }

    pub(crate) fn mark_cursor_complete(&self) {
        self.cursor.borrow_mut().complete = true;
    }

    pub(crate) fn cursor_is_leaf(&self) -> bool {
        self.cursor.borrow().children.is_empty()
    }

    /// Move the cursor into its rightmost child if that child's subtree is
    /// still incomplete, returning the thread id to replay. The rightmost
    /// child is always the deepest unexplored branch.
    pub(crate) fn descend_rightmost_incomplete(&mut self) -> Option<ThreadId> {
        let next = {
            let cursor = self.cursor.borrow();
            match cursor.children.last() {
                Some(child) if !child.borrow().complete => Rc::clone(child),
                _ => return None,
            }
        };
        let tid = next.borrow().tid;
        self.cursor = next;
        Some(tid)
    }

    /// The first thread id worth trying when extending at the cursor:
    /// one past the last child, or the main thread if there are none.
    pub(crate) fn next_tid_to_try(&self) -> ThreadId {
        let cursor = self.cursor.borrow();
        match cursor.children.last() {
            Some(child) => child.borrow().tid.next(),
            None => ThreadId::from(0),
        }
    }

    /// Add a child for the given thread id and move the cursor to it.
    pub(crate) fn extend(&mut self, tid: ThreadId) {
        let child = Rc::new(RefCell::new(TraceNode {
            tid,
            complete: false,
            children: Vec::new(),
        }));
        self.cursor.borrow_mut().children.push(Rc::clone(&child));
        self.cursor = child;
    }

    /// Rewind the cursor to the root for the next replay.
    pub(crate) fn rewind(&mut self) {
        self.cursor = Rc::clone(&self.root);
    }
}

impl Display for TraceTree {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "TraceTree")?;
        let mut stack = vec![(0usize, Rc::clone(&self.root))];
        while let Some((depth, node)) = stack.pop() {
            let cursor_mark = if Rc::ptr_eq(&node, &self.cursor) {
                " ⇐"
            } else {
                ""
            };
            let node = node.borrow();
            let complete_mark = if node.complete { " (complete)" } else { "" };
            write!(
                f,
                "\n\t{:width$}- t{tid}{complete_mark}{cursor_mark}",
                "",
                width = 2 * depth,
                tid = node.tid,
            )?;
            for child in &node.children {
                stack.push((depth + 1, Rc::clone(child)));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn descends_only_into_incomplete_rightmost_children() {
        let mut tree = TraceTree::new();
        tree.extend(ThreadId::from(1));
        tree.mark_cursor_complete();
        tree.rewind();
        assert_eq!(tree.descend_rightmost_incomplete(), None);

        tree.extend(ThreadId::from(2));
        tree.rewind();
        assert_eq!(tree.descend_rightmost_incomplete(), Some(ThreadId::from(2)));
        assert_eq!(tree.descend_rightmost_incomplete(), None);
    }

    #[test]
    fn extension_starts_one_past_the_last_child() {
        let mut tree = TraceTree::new();
        assert_eq!(tree.next_tid_to_try(), ThreadId::from(0));
        tree.extend(ThreadId::from(1));
        tree.rewind();
        assert_eq!(tree.next_tid_to_try(), ThreadId::from(2));
    }

    #[test]
    fn displays_the_tree_with_the_cursor_marked() {
        let mut tree = TraceTree::new();
        tree.extend(ThreadId::from(1));
        let rendered = tree.to_string();
        assert!(rendered.contains("- t0"));
        assert!(rendered.contains("- t1 ⇐"));
    }
}
