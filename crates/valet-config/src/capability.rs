//! Enumeration of the protected capabilities the daemon brokers.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// A protected resource the daemon may hold a user grant for.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Capability {
    /// The user's contact book.
    Contacts,
    /// The user's calendar events.
    Calendar,
    /// The user's reminder lists.
    Reminders,
    /// The daemon's settings store.
    Config,
    /// Skill/plugin installation.
    Skills,
}

impl Capability {
    /// All capabilities, in wire order.
    pub const ALL: [Self; 5] = [
        Self::Contacts,
        Self::Calendar,
        Self::Reminders,
        Self::Config,
        Self::Skills,
    ];
}

/// Errors encountered while parsing a [`Capability`] from text.
pub type CapabilityParseError = strum::ParseError;

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("contacts".parse::<Capability>(), Ok(Capability::Contacts));
        assert_eq!("Calendar".parse::<Capability>(), Ok(Capability::Calendar));
        assert!("mail".parse::<Capability>().is_err());
    }

    #[test]
    fn display_matches_wire_names() {
        let names: Vec<String> = Capability::iter().map(|c| c.to_string()).collect();
        assert_eq!(
            names,
            ["contacts", "calendar", "reminders", "config", "skills"]
        );
    }
}
