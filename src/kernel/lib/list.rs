// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Intrusive Doubly-Linked List
//!
//! The list never allocates: each member embeds a [`ListElem`] and the
//! list links those elements together. [`list_entry!`] converts an
//! element pointer back into a pointer to the structure containing it.
//!
//! Because the list stores raw pointers into its members, linking an
//! element is `unsafe`: the caller promises the member stays valid and
//! does not move until it is unlinked again. An element can be on at
//! most one list at a time.
//!
//! # Usage
//!
//! ```rust,ignore
//! struct Sleeper {
//!     wake: i64,
//!     elem: ListElem,
//! }
//!
//! unsafe { list.push_back(NonNull::from(&mut sleeper.elem)) };
//! let e = list.pop_front().unwrap();
//! let sleeper = list_entry!(e, Sleeper, elem);
//! ```

use core::marker::PhantomData;
use core::ptr::NonNull;

use crate::kassert;

/// Link embedded in every list member
#[derive(Debug)]
pub struct ListElem {
    prev: Option<NonNull<ListElem>>,
    next: Option<NonNull<ListElem>>,
    linked: bool,
}

impl ListElem {
    /// Create an unlinked element
    pub const fn new() -> Self {
        Self {
            prev: None,
            next: None,
            linked: false,
        }
    }

    /// Returns true while the element is on a list
    pub fn is_linked(&self) -> bool {
        self.linked
    }
}

impl Default for ListElem {
    fn default() -> Self {
        Self::new()
    }
}

/// Intrusive list head
#[derive(Debug)]
pub struct List {
    head: Option<NonNull<ListElem>>,
    tail: Option<NonNull<ListElem>>,
    len: usize,
}

// Members are only reached through the list with interrupts off.
unsafe impl Send for List {}

impl List {
    /// Create an empty list
    pub const fn new() -> Self {
        Self {
            head: None,
            tail: None,
            len: 0,
        }
    }

    /// Returns true if the list has no members
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Number of members
    pub fn len(&self) -> usize {
        self.len
    }

    /// First member, if any
    pub fn front(&self) -> Option<NonNull<ListElem>> {
        self.head
    }

    /// Append `elem` at the tail
    ///
    /// # Safety
    ///
    /// `elem` must be valid, not on any list, and must neither move nor
    /// be freed until it has been removed again.
    pub unsafe fn push_back(&mut self, elem: NonNull<ListElem>) {
        self.insert_before(None, elem);
    }

    /// Insert `elem` in front of `before`, or at the tail if `before` is
    /// `None`
    ///
    /// # Safety
    ///
    /// Same requirements as [`List::push_back`]; `before` must be a
    /// member of this list.
    pub unsafe fn insert_before(
        &mut self,
        before: Option<NonNull<ListElem>>,
        elem: NonNull<ListElem>,
    ) {
        let e = elem.as_ptr();
        kassert!(!(*e).linked, "list element is already on a list");

        let prev = match before {
            Some(b) => (*b.as_ptr()).prev,
            None => self.tail,
        };

        (*e).prev = prev;
        (*e).next = before;
        (*e).linked = true;

        match prev {
            Some(p) => (*p.as_ptr()).next = Some(elem),
            None => self.head = Some(elem),
        }
        match before {
            Some(b) => (*b.as_ptr()).prev = Some(elem),
            None => self.tail = Some(elem),
        }

        self.len += 1;
    }

    /// Insert `elem` before the first member that `less(elem, member)`
    /// orders after it
    ///
    /// Members that compare equal to `elem` stay in front of it, so
    /// insertion is stable. With a sorted list the result stays sorted.
    ///
    /// # Safety
    ///
    /// Same requirements as [`List::push_back`].
    pub unsafe fn insert_ordered<F>(&mut self, elem: NonNull<ListElem>, mut less: F)
    where
        F: FnMut(NonNull<ListElem>, NonNull<ListElem>) -> bool,
    {
        let before = self.iter().find(|&member| less(elem, member));
        self.insert_before(before, elem);
    }

    /// Remove and return the first member
    pub fn pop_front(&mut self) -> Option<NonNull<ListElem>> {
        let head = self.head?;
        // SAFETY: members stay valid while linked.
        unsafe { self.remove(head) };
        Some(head)
    }

    /// Unlink `elem`
    ///
    /// # Safety
    ///
    /// `elem` must be a member of this list.
    pub unsafe fn remove(&mut self, elem: NonNull<ListElem>) {
        let e = elem.as_ptr();
        kassert!((*e).linked, "list element is not on a list");

        match (*e).prev {
            Some(p) => (*p.as_ptr()).next = (*e).next,
            None => self.head = (*e).next,
        }
        match (*e).next {
            Some(n) => (*n.as_ptr()).prev = (*e).prev,
            None => self.tail = (*e).prev,
        }

        (*e).prev = None;
        (*e).next = None;
        (*e).linked = false;

        self.len -= 1;
    }

    /// Iterate over members from head to tail
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            next: self.head,
            _list: PhantomData,
        }
    }
}

impl Default for List {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over list members
pub struct Iter<'a> {
    next: Option<NonNull<ListElem>>,
    _list: PhantomData<&'a List>,
}

impl Iterator for Iter<'_> {
    type Item = NonNull<ListElem>;

    fn next(&mut self) -> Option<Self::Item> {
        let cur = self.next?;
        // SAFETY: members stay valid while linked, and the borrow of the
        // list keeps it from changing under the iterator.
        self.next = unsafe { (*cur.as_ptr()).next };
        Some(cur)
    }
}

/// Convert a pointer to an embedded [`ListElem`] into a pointer to the
/// structure that contains it
macro_rules! list_entry {
    ($elem:expr, $Container:path, $field:ident) => {
        ($elem)
            .as_ptr()
            .cast::<u8>()
            .wrapping_sub(memoffset::offset_of!($Container, $field))
            .cast::<$Container>()
    };
}

pub(crate) use list_entry;

#[cfg(test)]
mod tests {
    use super::*;
    use std::vec::Vec;

    struct Node {
        value: u32,
        key: u32,
        elem: ListElem,
    }

    impl Node {
        fn new(value: u32, key: u32) -> Self {
            Self {
                value,
                key,
                elem: ListElem::new(),
            }
        }
    }

    fn elem(node: &mut Node) -> NonNull<ListElem> {
        NonNull::from(&mut node.elem)
    }

    fn values(list: &List) -> Vec<u32> {
        list.iter()
            .map(|e| unsafe { (*list_entry!(e, Node, elem)).value })
            .collect()
    }

    fn by_key(a: NonNull<ListElem>, b: NonNull<ListElem>) -> bool {
        unsafe { (*list_entry!(a, Node, elem)).key < (*list_entry!(b, Node, elem)).key }
    }

    #[test]
    fn test_push_pop_fifo() {
        let mut a = Node::new(1, 0);
        let mut b = Node::new(2, 0);
        let mut c = Node::new(3, 0);
        let mut list = List::new();

        unsafe {
            list.push_back(elem(&mut a));
            list.push_back(elem(&mut b));
            list.push_back(elem(&mut c));
        }
        assert_eq!(list.len(), 3);
        assert_eq!(values(&list), [1, 2, 3]);

        let first = list.pop_front().unwrap();
        assert_eq!(unsafe { (*list_entry!(first, Node, elem)).value }, 1);
        assert!(!a.elem.is_linked());
        assert_eq!(values(&list), [2, 3]);

        list.pop_front();
        list.pop_front();
        assert!(list.is_empty());
        assert!(list.pop_front().is_none());
    }

    #[test]
    fn test_remove_middle_and_ends() {
        let mut a = Node::new(1, 0);
        let mut b = Node::new(2, 0);
        let mut c = Node::new(3, 0);
        let mut list = List::new();

        unsafe {
            list.push_back(elem(&mut a));
            list.push_back(elem(&mut b));
            list.push_back(elem(&mut c));

            list.remove(elem(&mut b));
            assert_eq!(values(&list), [1, 3]);

            list.remove(elem(&mut c));
            assert_eq!(values(&list), [1]);

            list.remove(elem(&mut a));
        }
        assert!(list.is_empty());
        assert_eq!(list.len(), 0);

        // A removed element can be linked again
        unsafe { list.push_back(elem(&mut b)) };
        assert_eq!(values(&list), [2]);
    }

    #[test]
    fn test_insert_ordered_is_stable() {
        let mut first_five = Node::new(1, 5);
        let mut second_five = Node::new(2, 5);
        let mut three = Node::new(3, 3);
        let mut nine = Node::new(4, 9);
        let mut list = List::new();

        unsafe {
            list.insert_ordered(elem(&mut first_five), by_key);
            list.insert_ordered(elem(&mut second_five), by_key);
            list.insert_ordered(elem(&mut three), by_key);
            list.insert_ordered(elem(&mut nine), by_key);
        }

        assert_eq!(values(&list), [3, 1, 2, 4]);
    }

    #[test]
    #[should_panic(expected = "already on a list")]
    fn test_double_link_is_fatal() {
        let mut a = Node::new(1, 0);
        let mut list = List::new();

        unsafe {
            list.push_back(elem(&mut a));
            list.push_back(elem(&mut a));
        }
    }
}
