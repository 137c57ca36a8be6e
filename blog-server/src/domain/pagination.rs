//! Forgiving page-number pagination.
//!
//! A page token comes straight from the query string and may be anything.
//! Resolution never fails: junk and non-positive numbers land on the first
//! page, numbers past the end land on the last one.

use serde::Serialize;

pub const POSTS_PER_PAGE: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PageToken {
    First,
    Number(u64),
    PastEnd,
}

fn parse_token(raw: Option<&str>) -> PageToken {
    let Some(raw) = raw.map(str::trim) else {
        return PageToken::First;
    };
    let digits = raw.strip_prefix('+').unwrap_or(raw);
    if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        return match digits.parse::<u64>() {
            Ok(0) => PageToken::First,
            Ok(n) => PageToken::Number(n),
            Err(_) => PageToken::PastEnd,
        };
    }
    // Negative integers are valid numbers but never a valid page.
    PageToken::First
}

#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    count: usize,
    per_page: usize,
}

impl Paginator {
    pub fn new(count: usize, per_page: usize) -> Self {
        Self {
            count,
            per_page: per_page.max(1),
        }
    }

    /// An empty collection still has one (empty) page.
    pub fn num_pages(&self) -> usize {
        if self.count == 0 {
            1
        } else {
            self.count.div_ceil(self.per_page)
        }
    }

    pub fn resolve(&self, token: Option<&str>) -> PageWindow {
        let last = self.num_pages();
        let number = match parse_token(token) {
            PageToken::First => 1,
            PageToken::Number(n) if n as u128 <= last as u128 => n as usize,
            PageToken::Number(_) | PageToken::PastEnd => last,
        };
        PageWindow {
            number,
            num_pages: last,
            count: self.count,
            per_page: self.per_page,
        }
    }
}

/// A resolved, always valid page of a collection of `count` items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: usize,
    pub num_pages: usize,
    pub count: usize,
    pub per_page: usize,
}

impl PageWindow {
    pub fn offset(&self) -> usize {
        (self.number - 1) * self.per_page
    }

    pub fn limit(&self) -> usize {
        self.per_page
    }

    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    #[cfg(test)]
    /// Cuts this window out of a fully materialized collection.
    pub fn slice<T>(&self, items: Vec<T>) -> Vec<T> {
        items
            .into_iter()
            .skip(self.offset())
            .take(self.limit())
            .collect()
    }

    /// Wraps items already fetched with `offset`/`limit`.
    pub fn into_page<T>(self, items: Vec<T>) -> Page<T> {
        Page {
            items,
            number: self.number,
            num_pages: self.num_pages,
            count: self.count,
            has_next: self.has_next(),
            has_previous: self.has_previous(),
            next_page_number: self.has_next().then_some(self.number + 1),
            previous_page_number: self.has_previous().then(|| self.number - 1),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: usize,
    pub num_pages: usize,
    pub count: usize,
    pub has_next: bool,
    pub has_previous: bool,
    pub next_page_number: Option<usize>,
    pub previous_page_number: Option<usize>,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            number: self.number,
            num_pages: self.num_pages,
            count: self.count,
            has_next: self.has_next,
            has_previous: self.has_previous,
            next_page_number: self.next_page_number,
            previous_page_number: self.previous_page_number,
        }
    }
}

#[cfg(test)]
/// Resolves `token` against `items` and returns the matching page.
pub fn paginate<T>(items: Vec<T>, per_page: usize, token: Option<&str>) -> Page<T> {
    let window = Paginator::new(items.len(), per_page).resolve(token);
    let slice = window.slice(items);
    window.into_page(slice)
}
