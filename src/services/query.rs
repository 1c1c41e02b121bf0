//! Filtering, ordering and pagination over a catalog snapshot.
//!
//! Everything here is pure: the same snapshot and query always produce the
//! same page.

use std::cmp::Ordering;

use crate::models::{Category, FilePage, FileQuery, FileRecord, FileWithCount, Pagination};
use crate::store::CatalogSnapshot;

/// Does `file` satisfy every filter present in `query`
pub fn matches(file: &FileRecord, query: &FileQuery) -> bool {
    if let Some(subject) = &query.subject {
        if file.subject.as_str() != subject {
            return false;
        }
    }
    if let Some(grade) = &query.grade {
        if file.grade.as_str() != grade {
            return false;
        }
    }
    if let Some(semester) = &query.semester {
        if file.semester.as_str() != semester {
            return false;
        }
    }
    if let Some(search) = &query.search {
        let needle = search.to_lowercase();
        if !file.title.to_lowercase().contains(&needle)
            && !file.description.to_lowercase().contains(&needle)
        {
            return false;
        }
    }
    true
}

/// Newest first, higher id first on equal timestamps
pub fn newest_first(a: &FileRecord, b: &FileRecord) -> Ordering {
    b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id))
}

/// Clamp `page` into range and compute the descriptor for `total_items`
pub fn paginate(total_items: u64, page: u32, page_size: u32) -> Pagination {
    let page_size = page_size.max(1);
    let total_pages = total_items.div_ceil(page_size as u64).max(1);
    let total_pages = u32::try_from(total_pages).unwrap_or(u32::MAX);

    Pagination {
        current_page: page.clamp(1, total_pages),
        total_pages,
        page_size,
        total_items,
    }
}

/// Apply `query` to `snapshot` and cut out the requested page
pub fn run(mut snapshot: CatalogSnapshot, query: &FileQuery) -> FilePage {
    let files = std::mem::take(&mut snapshot.files);

    let mut matching: Vec<FileRecord> = files.into_iter().filter(|f| matches(f, query)).collect();
    matching.sort_by(newest_first);

    let pagination = paginate(matching.len() as u64, query.page, query.page_size);
    let start = (pagination.current_page as usize - 1) * pagination.page_size as usize;

    let files = matching
        .into_iter()
        .skip(start)
        .take(pagination.page_size as usize)
        .map(|file| {
            let count = snapshot.download_count(file.id);
            FileWithCount::new(file, count)
        })
        .collect();

    FilePage { files, pagination }
}
