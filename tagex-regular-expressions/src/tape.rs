/// A finite sequence of symbols with a movable read position.
///
/// Unlike an iterator, a tape can be rewound, which the scanning evaluator
/// uses to restart a match on the symbol that ended the previous one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tape<A> {
    symbols: Vec<A>,
    index: usize,
}

impl<A> Tape<A> {
    pub fn new(symbols: impl IntoIterator<Item = A>) -> Self {
        Self {
            symbols: symbols.into_iter().collect(),
            index: 0,
        }
    }

    /// The position of the next symbol to be read.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Moves the read position to `index`.
    pub fn reset(&mut self, index: usize) {
        self.index = index;
    }

    /// Looks `offset` symbols ahead of the read position without moving it.
    pub fn peek(&self, offset: usize) -> Option<&A> {
        self.symbols.get(self.index + offset)
    }

    /// Reads the next symbol and advances past it.
    pub fn next_symbol(&mut self) -> Option<&A> {
        let symbol = self.symbols.get(self.index);
        self.index += 1;
        symbol
    }

    pub fn is_done(&self) -> bool {
        self.index >= self.symbols.len()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn symbols(&self) -> &[A] {
        &self.symbols
    }
}

impl<A> FromIterator<A> for Tape<A> {
    fn from_iter<I: IntoIterator<Item = A>>(iter: I) -> Self {
        Self::new(iter)
    }
}
