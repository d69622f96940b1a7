/// A min-priority queue backed by a quaternary heap.
///
/// Every node of the heap has up to four children, which halves the depth
/// of the heap compared to a binary heap: [`PriorityQueue::enqueue`] does
/// fewer comparisons on the way up, [`PriorityQueue::try_dequeue`] compares
/// up to four children per level on the way down.
///
/// # Ties
///
/// Elements of equal priority come out in an unspecified order, callers
/// must not rely on it.
///
/// ```
/// # use telesim_core::PriorityQueue;
/// let mut queue = PriorityQueue::new();
/// queue.enqueue("b", 2);
/// queue.enqueue("a", 1);
/// queue.enqueue("c", 3);
///
/// assert_eq!(queue.try_dequeue(), Some(("a", 1)));
/// assert_eq!(queue.try_peek(), Some((&"b", &2)));
/// ```
#[derive(Debug, Clone)]
pub struct PriorityQueue<E, P> {
    heap: Vec<(E, P)>,
}

const ARITY: usize = 4;

#[inline(always)]
fn parent(index: usize) -> usize {
    (index - 1) / ARITY
}

#[inline(always)]
fn first_child(index: usize) -> usize {
    index * ARITY + 1
}

impl<E, P> Default for PriorityQueue<E, P> {
    fn default() -> Self {
        Self { heap: Vec::new() }
    }
}

impl<E, P> PriorityQueue<E, P>
where
    P: Ord,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            heap: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Remove every element, keeping the allocated capacity.
    pub fn clear(&mut self) {
        self.heap.clear();
    }

    /// Insert `element` with the given `priority`.
    pub fn enqueue(&mut self, element: E, priority: P) {
        self.heap.push((element, priority));
        self.sift_up(self.heap.len() - 1);
    }

    /// The element of lowest priority, without removing it.
    pub fn try_peek(&self) -> Option<(&E, &P)> {
        self.heap.first().map(|(element, priority)| (element, priority))
    }

    /// Remove and return the element of lowest priority.
    pub fn try_dequeue(&mut self) -> Option<(E, P)> {
        if self.heap.is_empty() {
            return None;
        }
        // the last element takes the place of the root
        let root = self.heap.swap_remove(0);
        if !self.heap.is_empty() {
            self.sift_down(0);
        }
        Some(root)
    }

    fn sift_up(&mut self, mut index: usize) {
        while index > 0 {
            let parent = parent(index);
            if self.heap[parent].1 <= self.heap[index].1 {
                break;
            }
            self.heap.swap(parent, index);
            index = parent;
        }
    }

    fn sift_down(&mut self, mut index: usize) {
        let len = self.heap.len();
        loop {
            let first = first_child(index);
            if first >= len {
                break;
            }
            let last = (first + ARITY).min(len);

            let mut min_child = first;
            for child in first + 1..last {
                if self.heap[child].1 < self.heap[min_child].1 {
                    min_child = child;
                }
            }

            if self.heap[index].1 <= self.heap[min_child].1 {
                break;
            }
            self.heap.swap(index, min_child);
            index = min_child;
        }
    }
}
