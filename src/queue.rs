/// Growable ring buffer used for both raw reply batches and decoded rows.
///
/// Slots are `Option<T>` so a popped slot can be cleared instead of keeping
/// the value alive until it is overwritten. There is no internal locking;
/// the owning cursor serializes access.
#[derive(Debug)]
pub struct Queue<T> {
    elems: Vec<Option<T>>,
    nelems: usize,
    popi: usize,
    pushi: usize,
}

impl<T> Default for Queue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Queue<T> {
    pub fn new() -> Self {
        Self {
            elems: Vec::new(),
            nelems: 0,
            popi: 0,
            pushi: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.nelems
    }

    pub fn is_empty(&self) -> bool {
        self.nelems == 0
    }

    pub fn capacity(&self) -> usize {
        self.elems.len()
    }

    /// Append at the logical tail, growing the storage when full.
    pub fn push(&mut self, elem: T) {
        if self.nelems == self.elems.len() {
            self.expand();
        }
        self.elems[self.pushi] = Some(elem);
        self.nelems += 1;
        self.pushi = (self.pushi + 1) % self.elems.len();
    }

    /// Remove the logical head, or None if empty.
    pub fn pop(&mut self) -> Option<T> {
        if self.nelems == 0 {
            return None;
        }
        let elem = self.elems[self.popi].take();
        self.nelems -= 1;
        self.popi = (self.popi + 1) % self.elems.len();
        elem
    }

    pub fn peek(&self) -> Option<&T> {
        if self.nelems == 0 {
            return None;
        }
        self.elems[self.popi].as_ref()
    }

    fn expand(&mut self) {
        let curcap = self.elems.len();
        let newcap = if curcap == 0 {
            8
        } else if curcap < 1024 {
            curcap * 2
        } else {
            curcap + curcap / 4
        };

        let mut elems: Vec<Option<T>> = Vec::with_capacity(newcap);
        elems.resize_with(newcap, || None);

        // Only called when full, so the live run is either [0, curcap) or
        // wraps as [popi, curcap) followed by [0, popi).
        if self.popi == 0 {
            for (dst, src) in elems.iter_mut().zip(self.elems.iter_mut()) {
                *dst = src.take();
            }
            self.pushi = curcap;
        } else {
            let newpopi = newcap - (curcap - self.popi);
            for i in 0..self.popi {
                elems[i] = self.elems[i].take();
            }
            for i in self.popi..curcap {
                elems[newpopi + (i - self.popi)] = self.elems[i].take();
            }
            self.popi = newpopi;
        }
        self.elems = elems;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::VecDeque;

    #[test]
    fn pop_and_peek_on_empty() {
        let mut q: Queue<u32> = Queue::new();
        assert_eq!(q.peek(), None);
        assert_eq!(q.pop(), None);
        assert_eq!(q.len(), 0);
        assert_eq!(q.capacity(), 0);
    }

    #[test]
    fn fifo_order() {
        let mut q = Queue::new();
        for i in 0..5 {
            q.push(i);
        }
        assert_eq!(q.peek(), Some(&0));
        assert_eq!(q.len(), 5);
        for i in 0..5 {
            assert_eq!(q.pop(), Some(i));
        }
        assert!(q.is_empty());
    }

    #[test]
    fn growth_tiers() {
        let mut q = Queue::new();
        q.push(0);
        assert_eq!(q.capacity(), 8);
        for i in 1..9 {
            q.push(i);
        }
        assert_eq!(q.capacity(), 16);
        for i in 9..1025 {
            q.push(i);
        }
        assert_eq!(q.capacity(), 1024 + 256);
    }

    #[test]
    fn expand_preserves_order_when_wrapped() {
        let mut q = Queue::new();
        for i in 0..8 {
            q.push(i);
        }
        for i in 0..3 {
            assert_eq!(q.pop(), Some(i));
        }
        // Wrap around the end of the 8-slot buffer, then force growth.
        for i in 8..14 {
            q.push(i);
        }
        assert_eq!(q.capacity(), 16);
        let drained: Vec<_> = std::iter::from_fn(|| q.pop()).collect();
        assert_eq!(drained, (3..14).collect::<Vec<_>>());
    }

    #[test]
    fn popped_slots_are_cleared() {
        let rc = std::rc::Rc::new(());
        let mut q = Queue::new();
        q.push(rc.clone());
        q.push(rc.clone());
        assert_eq!(std::rc::Rc::strong_count(&rc), 3);
        drop(q.pop());
        assert_eq!(std::rc::Rc::strong_count(&rc), 2);
        drop(q.pop());
        assert_eq!(std::rc::Rc::strong_count(&rc), 1);
    }

    proptest! {
        /// Property: any interleaving of pushes and pops behaves like a VecDeque
        #[test]
        fn matches_vecdeque_model(ops in prop::collection::vec(prop::option::of(0u32..1000), 0..400)) {
            let mut q = Queue::new();
            let mut model = VecDeque::new();
            for op in ops {
                match op {
                    Some(v) => {
                        q.push(v);
                        model.push_back(v);
                    }
                    None => prop_assert_eq!(q.pop(), model.pop_front()),
                }
                prop_assert_eq!(q.len(), model.len());
                prop_assert_eq!(q.peek(), model.front());
            }
        }
    }
}
