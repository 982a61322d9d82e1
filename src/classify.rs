//! Category classification of wordbook names and the difficulty tier each
//! category implies.

use std::fmt;

/// Exam or school-grade category of a wordbook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Gaokao,
    Kaoyan,
    Cet4,
    Cet6,
    Ielts,
    Toefl,
    Gre,
    Zhongkao,
    Tem4,
    Tem8,
    JuniorHigh,
    SeniorHigh,
    Primary,
    Bec,
    Pets,
    Sat,
    Gmat,
    Mba,
    Kaobo,
    Other,
}

/// Substrings tested in order; the first one contained in the name wins.
/// TOEFL and IELTS alias the Chinese exam names.
const PATTERNS: &[(&str, Category)] = &[
    ("高考", Category::Gaokao),
    ("考研", Category::Kaoyan),
    ("四级", Category::Cet4),
    ("六级", Category::Cet6),
    ("雅思", Category::Ielts),
    ("托福", Category::Toefl),
    ("TOEFL", Category::Toefl),
    ("GRE", Category::Gre),
    ("中考", Category::Zhongkao),
    ("专四", Category::Tem4),
    ("专八", Category::Tem8),
    ("初中", Category::JuniorHigh),
    ("高中", Category::SeniorHigh),
    ("小学", Category::Primary),
    ("BEC", Category::Bec),
    ("PETS", Category::Pets),
    ("SAT", Category::Sat),
    ("GMAT", Category::Gmat),
    ("IELTS", Category::Ielts),
    ("MBA", Category::Mba),
    ("考博", Category::Kaobo),
];

impl Category {
    pub const ALL: [Category; 20] = [
        Category::Gaokao,
        Category::Kaoyan,
        Category::Cet4,
        Category::Cet6,
        Category::Ielts,
        Category::Toefl,
        Category::Gre,
        Category::Zhongkao,
        Category::Tem4,
        Category::Tem8,
        Category::JuniorHigh,
        Category::SeniorHigh,
        Category::Primary,
        Category::Bec,
        Category::Pets,
        Category::Sat,
        Category::Gmat,
        Category::Mba,
        Category::Kaobo,
        Category::Other,
    ];

    /// The label stored on dictionaries and catalogue records.
    pub fn label(self) -> &'static str {
        match self {
            Category::Gaokao => "高考",
            Category::Kaoyan => "考研",
            Category::Cet4 => "四级",
            Category::Cet6 => "六级",
            Category::Ielts => "雅思",
            Category::Toefl => "托福",
            Category::Gre => "GRE",
            Category::Zhongkao => "中考",
            Category::Tem4 => "专四",
            Category::Tem8 => "专八",
            Category::JuniorHigh => "初中",
            Category::SeniorHigh => "高中",
            Category::Primary => "小学",
            Category::Bec => "BEC",
            Category::Pets => "PETS",
            Category::Sat => "SAT",
            Category::Gmat => "GMAT",
            Category::Mba => "MBA",
            Category::Kaobo => "考博",
            Category::Other => "其他",
        }
    }

    /// Inverse of [`Category::label`]. Unknown labels map to `Other`.
    pub fn from_label(label: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|c| c.label() == label)
            .unwrap_or(Category::Other)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Classify a file or dictionary name.
///
/// ```
/// use wordhoard::classify::{Category, classify};
///
/// assert_eq!(classify("2024高考词汇.csv"), Category::Gaokao);
/// assert_eq!(classify("IELTS core.json"), Category::Ielts);
/// assert_eq!(classify("holiday list"), Category::Other);
/// ```
pub fn classify(name: &str) -> Category {
    PATTERNS
        .iter()
        .find(|(needle, _)| name.contains(needle))
        .map(|&(_, category)| category)
        .unwrap_or(Category::Other)
}

/// Difficulty tier implied by a category, used when an imported entry
/// carries none.
pub fn estimate_difficulty(category: Category) -> u8 {
    match category {
        Category::Primary | Category::JuniorHigh | Category::Zhongkao => 1,
        Category::SeniorHigh | Category::Cet4 | Category::Gaokao => 2,
        Category::Cet6 | Category::Kaoyan | Category::Ielts | Category::Toefl => 3,
        Category::Gre | Category::Gmat | Category::Kaobo | Category::Sat => 4,
        _ => 2,
    }
}
