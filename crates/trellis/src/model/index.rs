//! Index paths for addressing rows in a sectioned list.

use std::fmt;

/// The position of a row: its section index and row index within that section.
///
/// Index paths are only meaningful for attached rows and should be used
/// immediately; any mutation may invalidate them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IndexPath {
    /// Section index within the controller.
    pub section: usize,
    /// Row index within the section.
    pub row: usize,
}

impl IndexPath {
    /// Create a new index path.
    #[inline]
    pub const fn new(section: usize, row: usize) -> Self {
        Self { section, row }
    }
}

impl fmt::Display for IndexPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.section, self.row)
    }
}

impl From<(usize, usize)> for IndexPath {
    fn from((section, row): (usize, usize)) -> Self {
        Self { section, row }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering_is_section_major() {
        let mut paths = vec![IndexPath::new(1, 0), IndexPath::new(0, 5), IndexPath::new(0, 1)];
        paths.sort();
        assert_eq!(paths, vec![IndexPath::new(0, 1), IndexPath::new(0, 5), IndexPath::new(1, 0)]);
    }

    #[test]
    fn test_display() {
        assert_eq!(IndexPath::from((2, 3)).to_string(), "[2, 3]");
    }
}
