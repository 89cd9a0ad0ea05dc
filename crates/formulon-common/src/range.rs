use crate::address::Address;

/// A rectangular block of addresses within a single sheet, given as its
/// top-left and bottom-right corners (inclusive, 1-based).
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Range {
    pub sheet: String,
    pub start_col: u32,
    pub start_row: u32,
    pub end_col: u32,
    pub end_row: u32,
}

impl Range {
    pub fn new(
        sheet: impl Into<String>,
        start_col: u32,
        start_row: u32,
        end_col: u32,
        end_row: u32,
    ) -> Result<Self, &'static str> {
        if start_col == 0 || start_row == 0 || end_col == 0 || end_row == 0 {
            return Err("row and column indices are 1-based");
        }
        if start_col > end_col || start_row > end_row {
            return Err("range corners must be ordered: start <= end");
        }
        Ok(Self {
            sheet: sheet.into(),
            start_col,
            start_row,
            end_col,
            end_row,
        })
    }

    pub fn width(&self) -> u32 {
        self.end_col - self.start_col + 1
    }

    pub fn height(&self) -> u32 {
        self.end_row - self.start_row + 1
    }

    pub fn top_left(&self) -> Address {
        Address::new(self.sheet.clone(), self.start_col, self.start_row)
    }

    pub fn bottom_right(&self) -> Address {
        Address::new(self.sheet.clone(), self.end_col, self.end_row)
    }

    pub fn contains(&self, addr: &Address) -> bool {
        addr.sheet == self.sheet
            && addr.col >= self.start_col
            && addr.col <= self.end_col
            && addr.row >= self.start_row
            && addr.row <= self.end_row
    }

    /// Addresses in row-major order: every address in the first row, then
    /// the second, and so on. This is the order variadic aggregators and
    /// lookup-matrix flattening both rely on.
    pub fn addresses_row_major(&self) -> impl Iterator<Item = Address> + '_ {
        (self.start_row..=self.end_row).flat_map(move |row| {
            (self.start_col..=self.end_col).map(move |col| Address::new(self.sheet.clone(), col, row))
        })
    }

    pub fn is_single_cell(&self) -> bool {
        self.width() == 1 && self.height() == 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_based_indices() {
        assert!(Range::new("Sheet1", 0, 1, 2, 2).is_err());
    }

    #[test]
    fn rejects_unordered_corners() {
        assert!(Range::new("Sheet1", 3, 1, 1, 1).is_err());
    }

    #[test]
    fn row_major_order() {
        let r = Range::new("Sheet1", 1, 1, 2, 2).unwrap();
        let addrs: Vec<String> = r.addresses_row_major().map(|a| a.to_string()).collect();
        assert_eq!(
            addrs,
            vec!["Sheet1!A1", "Sheet1!B1", "Sheet1!A2", "Sheet1!B2"]
        );
    }
}
