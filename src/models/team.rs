use serde::{Deserialize, Serialize};

use super::record::{optional, required, SheetRecord};

/// A team member row: name, role, then optional bio, photo, and email
/// columns. Team membership changes rarely, so this resource carries the
/// shortest TTL of the three and is the only one persisted to disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TeamMember {
    pub name: String,
    pub role: String,
    pub bio: Option<String>,
    pub photo_url: Option<String>,
    pub email: Option<String>,
}

impl SheetRecord for TeamMember {
    const RESOURCE_NAME: &'static str = "team";
    const TTL_MINUTES: i64 = 5;
    const TIMEOUT_SECS: u64 = 8;
    const RANGE: &'static str = "A2:E";

    fn from_row(row: &[String]) -> Option<Self> {
        Some(Self {
            name: required(row, 0)?,
            role: required(row, 1)?,
            bio: optional(row, 2),
            photo_url: optional(row, 3),
            email: optional(row, 4),
        })
    }
}

impl TeamMember {
    pub fn display_name(&self) -> String {
        format!("{} ({})", self.name, self.role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_from_row() {
        let member = TeamMember::from_row(&row(&[
            "Ada Lovelace",
            "Founder",
            "Wrote the first program",
            "https://example.com/ada.jpg",
        ]))
        .expect("valid row");
        assert_eq!(member.display_name(), "Ada Lovelace (Founder)");
        assert!(member.email.is_none());
    }

    #[test]
    fn test_from_row_requires_name_and_role() {
        assert!(TeamMember::from_row(&row(&["Ada Lovelace"])).is_none());
        assert!(TeamMember::from_row(&row(&["", "Founder"])).is_none());
    }
}
