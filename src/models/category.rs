use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AppError;

/// Fixed reference lists that constrain a file record
pub trait Category: Copy + Sized + 'static {
    const KIND: CategoryKind;
    const ALL: &'static [Self];

    /// Machine name, as stored and as used in query filters
    fn as_str(&self) -> &'static str;

    /// Human readable label
    fn display_name(&self) -> &'static str;

    fn parse(s: &str) -> Result<Self, AppError> {
        let s = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| {
                AppError::validation(format!("Unknown {}: {:?}", Self::KIND.as_str(), s))
            })
    }

    fn entries() -> Vec<CategoryEntry> {
        Self::ALL
            .iter()
            .enumerate()
            .map(|(i, c)| CategoryEntry {
                id: i as i64 + 1,
                name: c.as_str(),
                display_name: c.display_name(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryKind {
    Subject,
    Grade,
    Semester,
}

impl CategoryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryKind::Subject => "subject",
            CategoryKind::Grade => "grade",
            CategoryKind::Semester => "semester",
        }
    }

    /// Ordered entries for this kind
    pub fn entries(&self) -> Vec<CategoryEntry> {
        match self {
            CategoryKind::Subject => Subject::entries(),
            CategoryKind::Grade => Grade::entries(),
            CategoryKind::Semester => Semester::entries(),
        }
    }
}

/// A single reference list item
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryEntry {
    pub id: i64,
    pub name: &'static str,
    pub display_name: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subject {
    Arabic,
    English,
    Math,
    Biology,
    Chemistry,
    Physics,
    Islamic,
}

impl Category for Subject {
    const KIND: CategoryKind = CategoryKind::Subject;
    const ALL: &'static [Self] = &[
        Subject::Arabic,
        Subject::English,
        Subject::Math,
        Subject::Biology,
        Subject::Chemistry,
        Subject::Physics,
        Subject::Islamic,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            Subject::Arabic => "arabic",
            Subject::English => "english",
            Subject::Math => "math",
            Subject::Biology => "biology",
            Subject::Chemistry => "chemistry",
            Subject::Physics => "physics",
            Subject::Islamic => "islamic",
        }
    }

    fn display_name(&self) -> &'static str {
        match self {
            Subject::Arabic => "اللغة العربية",
            Subject::English => "اللغة الإنجليزية",
            Subject::Math => "الرياضيات",
            Subject::Biology => "الأحياء",
            Subject::Chemistry => "الكيمياء",
            Subject::Physics => "الفيزياء",
            Subject::Islamic => "التربية الإسلامية",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Grade {
    #[serde(rename = "10")]
    Tenth,
    #[serde(rename = "11")]
    Eleventh,
    #[serde(rename = "12")]
    Twelfth,
}

impl Category for Grade {
    const KIND: CategoryKind = CategoryKind::Grade;
    const ALL: &'static [Self] = &[Grade::Tenth, Grade::Eleventh, Grade::Twelfth];

    fn as_str(&self) -> &'static str {
        match self {
            Grade::Tenth => "10",
            Grade::Eleventh => "11",
            Grade::Twelfth => "12",
        }
    }

    fn display_name(&self) -> &'static str {
        match self {
            Grade::Tenth => "الصف العاشر",
            Grade::Eleventh => "الصف الحادي عشر",
            Grade::Twelfth => "الصف الثاني عشر",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Semester {
    #[serde(rename = "1")]
    First,
    #[serde(rename = "2")]
    Second,
}

impl Category for Semester {
    const KIND: CategoryKind = CategoryKind::Semester;
    const ALL: &'static [Self] = &[Semester::First, Semester::Second];

    fn as_str(&self) -> &'static str {
        match self {
            Semester::First => "1",
            Semester::Second => "2",
        }
    }

    fn display_name(&self) -> &'static str {
        match self {
            Semester::First => "الفصل الأول",
            Semester::Second => "الفصل الثاني",
        }
    }
}

impl FromStr for Subject {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl FromStr for Grade {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl FromStr for Semester {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Semester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
