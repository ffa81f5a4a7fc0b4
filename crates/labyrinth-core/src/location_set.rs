use crate::types::Location;

/// Bitset over the locations of one grid, indexed row-major.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LocationSet {
    extent: u8,
    words: Vec<u64>,
}

impl LocationSet {
    pub fn new(extent: usize) -> Self {
        let cells = extent * extent;
        Self {
            extent: extent as u8,
            words: vec![0; cells.div_ceil(64)],
        }
    }

    pub const fn extent(&self) -> usize {
        self.extent as usize
    }

    /// Inserts `location`, returning whether it was newly added.
    pub fn insert(&mut self, location: Location) -> bool {
        let Some((word, bit)) = self.slot(location) else {
            return false;
        };
        let fresh = self.words[word] & bit == 0;
        self.words[word] |= bit;
        fresh
    }

    pub fn remove(&mut self, location: Location) -> bool {
        let Some((word, bit)) = self.slot(location) else {
            return false;
        };
        let present = self.words[word] & bit != 0;
        self.words[word] &= !bit;
        present
    }

    pub fn contains(&self, location: Location) -> bool {
        self.slot(location)
            .is_some_and(|(word, bit)| self.words[word] & bit != 0)
    }

    pub fn len(&self) -> usize {
        self.words.iter().map(|word| word.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|word| *word == 0)
    }

    pub fn union_with(&mut self, other: &Self) {
        for (word, other) in self.words.iter_mut().zip(&other.words) {
            *word |= other;
        }
    }

    pub fn intersect_with(&mut self, other: &Self) {
        for (word, other) in self.words.iter_mut().zip(&other.words) {
            *word &= other;
        }
    }

    pub fn subtract(&mut self, other: &Self) {
        for (word, other) in self.words.iter_mut().zip(&other.words) {
            *word &= !other;
        }
    }

    pub fn difference(&self, other: &Self) -> Self {
        let mut result = self.clone();
        result.subtract(other);
        result
    }

    pub fn is_subset(&self, other: &Self) -> bool {
        self.words
            .iter()
            .zip(&other.words)
            .all(|(word, other)| word & !other == 0)
    }

    pub fn iter(&self) -> impl Iterator<Item = Location> + '_ {
        let extent = self.extent();
        self.words
            .iter()
            .enumerate()
            .flat_map(move |(word_idx, &word)| {
                let mut bits = word;
                std::iter::from_fn(move || {
                    if bits == 0 {
                        return None;
                    }
                    let bit = bits.trailing_zeros() as usize;
                    bits &= bits - 1;
                    Some(word_idx * 64 + bit)
                })
            })
            .map(move |index| Location::new((index / extent) as u8, (index % extent) as u8))
    }

    fn slot(&self, location: Location) -> Option<(usize, u64)> {
        let extent = self.extent();
        let (row, column) = (usize::from(location.row), usize::from(location.column));
        if row >= extent || column >= extent {
            return None;
        }
        let index = row * extent + column;
        Some((index / 64, 1u64 << (index % 64)))
    }
}
