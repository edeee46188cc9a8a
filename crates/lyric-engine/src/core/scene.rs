use crate::api::types::BubbleId;
use crate::components::bubble::BubbleHandle;

/// Live bubbles in spawn order (oldest first).
/// A flat Vec is plenty for the few dozen bubbles a session keeps on screen.
pub struct Scene {
    bubbles: Vec<BubbleHandle>,
}

impl Scene {
    pub fn new() -> Self {
        Self {
            bubbles: Vec::with_capacity(64),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bubbles: Vec::with_capacity(capacity),
        }
    }

    /// Add a bubble as the newest.
    pub fn spawn(&mut self, bubble: BubbleHandle) {
        self.bubbles.push(bubble);
    }

    /// Remove a bubble by id, keeping spawn order. Returns it if found.
    pub fn despawn(&mut self, id: BubbleId) -> Option<BubbleHandle> {
        let idx = self.bubbles.iter().position(|b| b.id == id)?;
        Some(self.bubbles.remove(idx))
    }

    /// Remove and return the oldest bubble.
    pub fn despawn_oldest(&mut self) -> Option<BubbleHandle> {
        if self.bubbles.is_empty() {
            None
        } else {
            Some(self.bubbles.remove(0))
        }
    }

    /// Remove every bubble matching `pred`, in spawn order.
    pub fn despawn_where(&mut self, mut pred: impl FnMut(&BubbleHandle) -> bool) -> Vec<BubbleHandle> {
        let mut removed = Vec::new();
        let mut kept = Vec::with_capacity(self.bubbles.len());
        for b in self.bubbles.drain(..) {
            if pred(&b) {
                removed.push(b);
            } else {
                kept.push(b);
            }
        }
        self.bubbles = kept;
        removed
    }

    /// Remove everything.
    pub fn drain_all(&mut self) -> Vec<BubbleHandle> {
        std::mem::take(&mut self.bubbles)
    }

    pub fn get(&self, id: BubbleId) -> Option<&BubbleHandle> {
        self.bubbles.iter().find(|b| b.id == id)
    }

    pub fn get_mut(&mut self, id: BubbleId) -> Option<&mut BubbleHandle> {
        self.bubbles.iter_mut().find(|b| b.id == id)
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &BubbleHandle> {
        self.bubbles.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut BubbleHandle> {
        self.bubbles.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.bubbles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bubbles.is_empty()
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}
