use crate::models::{DateRange, HolidayType};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    Date,
    LocalName,
    Name,
    Id,
}

impl SortField {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "date" => Some(SortField::Date),
            "localName" | "local_name" => Some(SortField::LocalName),
            "name" => Some(SortField::Name),
            "id" => Some(SortField::Id),
            _ => None,
        }
    }

    pub(crate) fn column(&self) -> &'static str {
        match self {
            SortField::Date => "h.date",
            SortField::LocalName => "h.local_name",
            SortField::Name => "h.name",
            SortField::Id => "h.id",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortOrder {
    pub field: SortField,
    pub direction: SortDirection,
}

impl SortOrder {
    pub fn asc(field: SortField) -> Self {
        Self {
            field,
            direction: SortDirection::Asc,
        }
    }

    /// Parse `"date"`, `"date,desc"` or `"localName,asc"`.
    pub fn parse(raw: &str) -> Result<Self> {
        let (field, direction) = match raw.split_once(',') {
            Some((f, d)) => (f, Some(d)),
            None => (raw, None),
        };
        let field = SortField::parse(field)
            .ok_or_else(|| Error::InvalidInput(format!("unsupported sort property: {field}")))?;
        let direction = match direction.map(str::trim) {
            None => SortDirection::Asc,
            Some(d) if d.eq_ignore_ascii_case("asc") => SortDirection::Asc,
            Some(d) if d.eq_ignore_ascii_case("desc") => SortDirection::Desc,
            Some(d) => {
                return Err(Error::InvalidInput(format!(
                    "unsupported sort direction: {d}"
                )));
            }
        };
        Ok(Self { field, direction })
    }
}

/// Zero-based page request; sort orders are applied in sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
    pub sort: Vec<SortOrder>,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 0,
            size: Self::DEFAULT_SIZE,
            sort: Vec::new(),
        }
    }
}

impl PageRequest {
    pub const DEFAULT_SIZE: u32 = 20;
    pub const MAX_SIZE: u32 = 1000;

    pub fn new(page: u32, size: u32, sort: Vec<SortOrder>) -> Result<Self> {
        if size == 0 || size > Self::MAX_SIZE {
            return Err(Error::InvalidInput(format!(
                "page size must be within 1..={}",
                Self::MAX_SIZE
            )));
        }
        Ok(Self { page, size, sort })
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page) * u64::from(self.size)
    }

    /// Requested orders followed by the stable `date ASC, id ASC` tiebreak.
    pub fn effective_sort(&self) -> Vec<SortOrder> {
        let mut out = self.sort.clone();
        for field in [SortField::Date, SortField::Id] {
            if !out.iter().any(|o| o.field == field) {
                out.push(SortOrder::asc(field));
            }
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total_elements: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, request: &PageRequest, total_elements: u64) -> Self {
        let size = u64::from(request.size.max(1));
        Self {
            content,
            page: request.page,
            size: request.size,
            total_elements,
            total_pages: total_elements.div_ceil(size),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            page: self.page,
            size: self.size,
            total_elements: self.total_elements,
            total_pages: self.total_pages,
        }
    }
}

/// Store-level search predicate: one country, one date range, optional tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HolidaySearchFilter {
    pub country_code: String,
    pub range: DateRange,
    pub holiday_type: Option<HolidayType>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_order_parses_property_and_direction() {
        assert_eq!(
            SortOrder::parse("date,desc").unwrap(),
            SortOrder {
                field: SortField::Date,
                direction: SortDirection::Desc
            }
        );
        assert_eq!(
            SortOrder::parse("localName").unwrap(),
            SortOrder::asc(SortField::LocalName)
        );
        assert!(SortOrder::parse("country,asc").is_err());
        assert!(SortOrder::parse("date,sideways").is_err());
    }

    #[test]
    fn effective_sort_appends_stable_tiebreak() {
        let req = PageRequest::new(0, 10, vec![SortOrder::parse("name,desc").unwrap()]).unwrap();
        let fields: Vec<SortField> = req.effective_sort().iter().map(|o| o.field).collect();
        assert_eq!(fields, vec![SortField::Name, SortField::Date, SortField::Id]);
    }

    #[test]
    fn page_counts_total_pages() {
        let req = PageRequest::new(1, 20, vec![]).unwrap();
        let page = Page::new(vec![1, 2, 3], &req, 43);
        assert_eq!(page.total_pages, 3);
        assert_eq!(req.offset(), 20);
        assert_eq!(Page::<u8>::new(vec![], &req, 0).total_pages, 0);
        assert!(PageRequest::new(0, 0, vec![]).is_err());
        assert!(PageRequest::new(0, 5000, vec![]).is_err());
    }
}
