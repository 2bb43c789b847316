//! Fixed-size batching for write amortization.

/// Buffers items and hands back a full batch every `size` pushes.
#[derive(Debug)]
pub struct BatchAccumulator<T> {
    size: usize,
    buf: Vec<T>,
}

impl<T> BatchAccumulator<T> {
    /// A size of zero is treated as one.
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            size,
            buf: Vec::with_capacity(size),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Add an item; returns the batch once it is full.
    pub fn push(&mut self, item: T) -> Option<Vec<T>> {
        self.buf.push(item);
        if self.buf.len() >= self.size {
            Some(std::mem::replace(&mut self.buf, Vec::with_capacity(self.size)))
        } else {
            None
        }
    }

    /// Drain the final partial batch, if any.
    pub fn finish(&mut self) -> Option<Vec<T>> {
        if self.buf.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.buf))
        }
    }
}

/// Iterator adapter yielding `ceil(len / size)` batches.
pub struct Batches<I: Iterator> {
    inner: I,
    acc: BatchAccumulator<I::Item>,
    done: bool,
}

impl<I: Iterator> Iterator for Batches<I> {
    type Item = Vec<I::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        for item in self.inner.by_ref() {
            if let Some(batch) = self.acc.push(item) {
                return Some(batch);
            }
        }
        self.done = true;
        self.acc.finish()
    }
}

pub fn batches<I: IntoIterator>(items: I, size: usize) -> Batches<I::IntoIter> {
    Batches {
        inner: items.into_iter(),
        acc: BatchAccumulator::new(size),
        done: false,
    }
}
