/// Maps byte offsets to 1-based line and column numbers.
///
/// Columns count chars, not bytes, so they line up with what an editor shows.
#[derive(Debug, Clone)]
pub struct LineIndex<'a> {
    source: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    pub fn new(source: &'a str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self {
            source,
            line_starts,
        }
    }

    /// `(line, column)` of `offset`, both starting at 1. Offsets past the end
    /// are clamped.
    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        let mut offset = offset.min(self.source.len());
        while !self.source.is_char_boundary(offset) {
            offset -= 1;
        }
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        let column = self.source[self.line_starts[line]..offset].chars().count() + 1;
        (line + 1, column)
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_line_col() {
        let index = LineIndex::new("ab\ncd\n\nx");
        assert_eq!(index.line_col(0), (1, 1));
        assert_eq!(index.line_col(2), (1, 3));
        assert_eq!(index.line_col(3), (2, 1));
        assert_eq!(index.line_col(6), (3, 1));
        assert_eq!(index.line_col(7), (4, 1));
        assert_eq!(index.line_count(), 4);
    }

    #[test]
    fn test_columns_count_chars() {
        let index = LineIndex::new("éé<");
        assert_eq!(index.line_col(4), (1, 3));
        assert_eq!(index.line_col(3), (1, 2));
    }

    #[test]
    fn test_offset_past_end_is_clamped() {
        let index = LineIndex::new("a\nb");
        assert_eq!(index.line_col(99), (2, 2));
    }
}
