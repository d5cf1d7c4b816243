use crate::domain::model::{CartLine, ProductId};

/// Ordered cart lines with at most one line per product id.
///
/// Lines can only enter through [`Cart::add`], which merges by product id, so
/// a duplicate line for one product cannot be constructed.
#[derive(Debug, Clone, Default)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn line_for(&self, product_id: ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.product_id() == product_id)
    }

    /// Merges into the existing line for the same product (quantity summed, non-blank
    /// note replaces the old one, first price snapshot kept) or appends a new line.
    pub fn add(&mut self, line: CartLine) {
        match self
            .lines
            .iter_mut()
            .find(|existing| existing.product_id() == line.product_id())
        {
            Some(existing) => existing.absorb(line),
            None => self.lines.push(line),
        }
    }

    pub fn add_all(&mut self, lines: impl IntoIterator<Item = CartLine>) {
        for line in lines {
            self.add(line);
        }
    }

    /// Drops every line whose product name equals one of `names`, ignoring case.
    /// Returns how many lines were removed.
    pub fn remove_named<S: AsRef<str>>(&mut self, names: &[S]) -> usize {
        let wanted: Vec<String> = names.iter().map(|n| n.as_ref().to_lowercase()).collect();
        let before = self.lines.len();
        self.lines
            .retain(|line| !wanted.contains(&line.product().name.to_lowercase()));
        before - self.lines.len()
    }

    pub fn total(&self) -> f64 {
        self.lines.iter().map(CartLine::subtotal).sum()
    }
}
