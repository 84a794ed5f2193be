//! Entity categories and their command syntax

use serde::{Deserialize, Serialize};
use std::fmt;

/// The three kinds of LAN profile a controller can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Wireless LANs (`wlan`)
    Primary,
    /// Remote LANs (`remote-lan`)
    Remote,
    /// Guest LANs (`guest-lan`)
    Guest,
}

impl Category {
    /// Collection order
    pub const ALL: [Category; 3] = [Category::Primary, Category::Remote, Category::Guest];

    /// CLI keyword for this category
    pub fn keyword(self) -> &'static str {
        match self {
            Category::Primary => "wlan",
            Category::Remote => "remote-lan",
            Category::Guest => "guest-lan",
        }
    }

    pub fn summary_command(self) -> String {
        format!("show {} summary", self.keyword())
    }

    pub fn detail_command(self, identifier: &str) -> String {
        format!("show {} {}", self.keyword(), identifier.trim())
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commands() {
        assert_eq!(Category::Primary.summary_command(), "show wlan summary");
        assert_eq!(Category::Remote.summary_command(), "show remote-lan summary");
        assert_eq!(Category::Guest.detail_command("3"), "show guest-lan 3");
        assert_eq!(Category::Primary.detail_command(" 12 "), "show wlan 12");
    }

    #[test]
    fn test_order() {
        assert_eq!(
            Category::ALL,
            [Category::Primary, Category::Remote, Category::Guest]
        );
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&Category::Remote).unwrap();
        assert_eq!(json, "\"remote\"");
    }
}
