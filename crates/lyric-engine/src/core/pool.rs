/// Something that can be recycled through an [`ObjectPool`].
pub trait Poolable {
    /// Restore transient visual state before the value is handed out again.
    fn reset(&mut self);

    /// Detach from the screen and drop content when returned.
    fn detach(&mut self);
}

/// Bounded free-list of reusable values.
///
/// `acquire` prefers a pooled value and falls back to the factory; `release` keeps
/// the value only while the pool is below `max_size`, otherwise it is dropped.
pub struct ObjectPool<T: Poolable> {
    free: Vec<T>,
    max_size: usize,
    factory: fn() -> T,
    created: usize,
}

impl<T: Poolable> ObjectPool<T> {
    pub fn new(max_size: usize, factory: fn() -> T) -> Self {
        Self {
            free: Vec::with_capacity(max_size),
            max_size,
            factory,
            created: 0,
        }
    }

    /// Take a value out of the pool, constructing one if the pool is empty.
    pub fn acquire(&mut self) -> T {
        let mut item = match self.free.pop() {
            Some(item) => item,
            None => {
                self.created += 1;
                (self.factory)()
            }
        };
        item.reset();
        item
    }

    /// Return a value. Dropped instead of pooled once the pool is full.
    pub fn release(&mut self, mut item: T) {
        item.detach();
        if self.free.len() < self.max_size {
            self.free.push(item);
        }
    }

    /// Return several values at once.
    pub fn release_all(&mut self, items: impl IntoIterator<Item = T>) {
        for item in items {
            self.release(item);
        }
    }

    /// Values currently waiting in the pool.
    pub fn available(&self) -> usize {
        self.free.len()
    }

    /// Values ever constructed by the factory.
    pub fn created(&self) -> usize {
        self.created
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }
}
