use std::iter::Iterator;

pub struct DatasetIterator<'a, I> {
    current: usize,
    dataset: &'a dyn Dataset<I>,
}

impl<'a, I> DatasetIterator<'a, I> {
    pub fn new<D>(dataset: &'a D) -> Self
    where
        D: Dataset<I>,
    {
        DatasetIterator {
            current: 0,
            dataset,
        }
    }
}

impl<'a, I: 'a> Iterator for DatasetIterator<'a, I> {
    type Item = &'a I;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.dataset.get(self.current);
        self.current += 1;
        item
    }
}

/// Ordered, index-addressable collection of items.
pub trait Dataset<I>: Send + Sync {
    fn get(&self, index: usize) -> Option<&I>;
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn iter(&self) -> DatasetIterator<'_, I>
    where
        Self: Sized,
    {
        DatasetIterator::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Numbers(Vec<u32>);

    impl Dataset<u32> for Numbers {
        fn get(&self, index: usize) -> Option<&u32> {
            self.0.get(index)
        }

        fn len(&self) -> usize {
            self.0.len()
        }
    }

    #[test]
    fn iterates_in_index_order() {
        let numbers = Numbers(vec![3, 1, 2]);
        let collected: Vec<_> = numbers.iter().copied().collect();
        assert_eq!(collected, vec![3, 1, 2]);
        assert!(!numbers.is_empty());
        assert!(Numbers(vec![]).is_empty());
    }
}
