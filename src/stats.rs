use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::categories::Category;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryUsage {
    pub category: Category,
    pub folder_name: &'static str,
    pub bytes: u64,
}

/// Space taken by the category folders of a set of watched folders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Statistics {
    pub total_bytes: u64,
    /// Largest first; categories with no folder anywhere are omitted.
    pub categories: Vec<CategoryUsage>,
}

pub fn folder_statistics(folders: &[PathBuf]) -> Statistics {
    let mut usage: Vec<CategoryUsage> = Vec::new();

    for folder in folders.iter().filter(|f| f.is_dir()) {
        for category in Category::ALL {
            let dir = folder.join(category.folder_name());
            if !dir.is_dir() {
                continue;
            }
            let bytes = dir_size(&dir);
            match usage.iter_mut().find(|u| u.category == category) {
                Some(entry) => entry.bytes += bytes,
                None => usage.push(CategoryUsage {
                    category,
                    folder_name: category.folder_name(),
                    bytes,
                }),
            }
        }
    }

    usage.sort_by(|a, b| b.bytes.cmp(&a.bytes));
    Statistics {
        total_bytes: usage.iter().map(|u| u.bytes).sum(),
        categories: usage,
    }
}

/// Recursive size of regular files under `dir`. Unreadable entries count as 0.
fn dir_size(dir: &Path) -> u64 {
    let entries = match fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) => {
            log::warn!("Failed to read directory {}: {}", dir.display(), e);
            return 0;
        }
    };

    entries
        .flatten()
        .map(|entry| match entry.file_type() {
            Ok(ft) if ft.is_dir() => dir_size(&entry.path()),
            Ok(ft) if ft.is_file() => entry.metadata().map(|m| m.len()).unwrap_or(0),
            _ => 0,
        })
        .sum()
}

/// Human-readable megabytes, as shown by the status views.
pub fn format_mb(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / (1024.0 * 1024.0))
}
