use std::path::Path;

use serde::{Deserialize, Serialize};

/// A classification bucket. Each variant owns one destination folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Images,
    Documents,
    Videos,
    Audio,
    Compressed,
    Executables,
    Code,
    Others,
}

/// Extension set and folder name for one category.
#[derive(Debug)]
pub struct CategoryRule {
    pub category: Category,
    pub extensions: &'static [&'static str],
    pub folder_name: &'static str,
}

// ── Category table ──────────────────────────────────────────

/// Lookup order matters: the first rule listing an extension wins.
/// `Others` is last and has no extensions; it is the fallback.
pub const RULES: &[CategoryRule] = &[
    CategoryRule {
        category: Category::Images,
        extensions: &["jpg", "jpeg", "png", "gif", "bmp", "tiff", "webp"],
        folder_name: "Imagens",
    },
    CategoryRule {
        category: Category::Documents,
        extensions: &[
            "pdf", "doc", "docx", "txt", "rtf", "odt", "xls", "xlsx", "ppt", "pptx",
        ],
        folder_name: "Documentos",
    },
    CategoryRule {
        category: Category::Videos,
        extensions: &["mp4", "avi", "mkv", "mov", "wmv", "flv", "webm"],
        folder_name: "Vídeos",
    },
    CategoryRule {
        category: Category::Audio,
        extensions: &["mp3", "wav", "ogg", "flac", "aac", "wma"],
        folder_name: "Áudios",
    },
    CategoryRule {
        category: Category::Compressed,
        extensions: &["zip", "rar", "7z", "tar", "gz", "bz2"],
        folder_name: "Compactados",
    },
    CategoryRule {
        category: Category::Executables,
        extensions: &["exe", "msi", "bat", "cmd", "ps1"],
        folder_name: "Executáveis",
    },
    CategoryRule {
        category: Category::Code,
        extensions: &["py", "java", "js", "html", "css", "cpp", "c", "php", "sql"],
        folder_name: "Código",
    },
    CategoryRule {
        category: Category::Others,
        extensions: &[],
        folder_name: "Outros",
    },
];

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Images,
        Category::Documents,
        Category::Videos,
        Category::Audio,
        Category::Compressed,
        Category::Executables,
        Category::Code,
        Category::Others,
    ];

    pub fn rule(&self) -> &'static CategoryRule {
        // RULES lists every variant exactly once, in declaration order.
        &RULES[*self as usize]
    }

    /// Name of the subfolder files of this category are moved into.
    pub fn folder_name(&self) -> &'static str {
        self.rule().folder_name
    }
}

/// Map a file extension to its category.
/// Accepts `"JPG"`, `"jpg"` or `".jpg"`; anything unknown (including the empty
/// string) is `Category::Others`.
pub fn classify(extension: &str) -> Category {
    let ext = extension.trim_start_matches('.').to_lowercase();
    if ext.is_empty() {
        return Category::Others;
    }

    RULES
        .iter()
        .find(|rule| rule.extensions.contains(&ext.as_str()))
        .map(|rule| rule.category)
        .unwrap_or(Category::Others)
}

/// Classify by the extension of a path's file name.
pub fn classify_path(path: &Path) -> Category {
    path.extension()
        .map(|e| classify(&e.to_string_lossy()))
        .unwrap_or(Category::Others)
}

/// True if `name` is one of the category folder names.
pub fn is_category_folder(name: &str) -> bool {
    RULES.iter().any(|rule| rule.folder_name == name)
}

// ── Tests ───────────────────────────────────────────────────
