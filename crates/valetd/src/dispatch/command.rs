//! The static command table.
//!
//! Every command the protocol surface exposes is listed here, whether or not
//! a backend exists for it yet. Recognized-but-unimplemented commands answer
//! with an explicit not-implemented error so clients can distinguish them
//! from typos. The table is built at compile time and never mutated.

use valet_config::Capability;
use valet_protocol::ValueTag;

/// Required argument descriptor: a name and, optionally, the expected tag.
///
/// A `tag` of `None` accepts any value (used by `config.set`, whose value is
/// intentionally untyped).
#[derive(Debug, Clone, Copy)]
pub struct ArgSpec {
    /// Argument name as it appears in the request's `args` map.
    pub name: &'static str,
    /// Expected tag, or `None` for any.
    pub tag: Option<ValueTag>,
}

const fn arg(name: &'static str, tag: ValueTag) -> ArgSpec {
    ArgSpec {
        name,
        tag: Some(tag),
    }
}

const fn any_arg(name: &'static str) -> ArgSpec {
    ArgSpec { name, tag: None }
}

const QUERY: &[ArgSpec] = &[arg("query", ValueTag::Str)];
const ID: &[ArgSpec] = &[arg("id", ValueTag::Str)];
const NONE: &[ArgSpec] = &[];
const NAME: &[ArgSpec] = &[arg("name", ValueTag::Str)];
const TITLE: &[ArgSpec] = &[arg("title", ValueTag::Str)];
const TITLE_START: &[ArgSpec] = &[arg("title", ValueTag::Str), arg("start", ValueTag::Str)];
const KEY: &[ArgSpec] = &[arg("key", ValueTag::Str)];
const KEY_VALUE: &[ArgSpec] = &[arg("key", ValueTag::Str), any_arg("value")];

/// A recognized command name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Ping,
    Status,
    Permissions,
    ContactsSearch,
    ContactsGet,
    ContactsList,
    ContactsCreate,
    ContactsUpdate,
    ContactsDelete,
    CalendarSearch,
    CalendarGet,
    CalendarList,
    CalendarCreate,
    CalendarUpdate,
    CalendarDelete,
    RemindersSearch,
    RemindersGet,
    RemindersList,
    RemindersCreate,
    RemindersUpdate,
    RemindersDelete,
    ConfigGet,
    ConfigSet,
    SkillsList,
    SkillsInstall,
}

impl Command {
    /// Every command, in wire order.
    pub const ALL: &'static [Self] = &[
        Self::Ping,
        Self::Status,
        Self::Permissions,
        Self::ContactsSearch,
        Self::ContactsGet,
        Self::ContactsList,
        Self::ContactsCreate,
        Self::ContactsUpdate,
        Self::ContactsDelete,
        Self::CalendarSearch,
        Self::CalendarGet,
        Self::CalendarList,
        Self::CalendarCreate,
        Self::CalendarUpdate,
        Self::CalendarDelete,
        Self::RemindersSearch,
        Self::RemindersGet,
        Self::RemindersList,
        Self::RemindersCreate,
        Self::RemindersUpdate,
        Self::RemindersDelete,
        Self::ConfigGet,
        Self::ConfigSet,
        Self::SkillsList,
        Self::SkillsInstall,
    ];

    /// Looks a command up by its wire name.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|command| command.name() == name)
    }

    /// The command's wire name (`namespace.verb`).
    pub const fn name(self) -> &'static str {
        match self {
            Self::Ping => "ping",
            Self::Status => "status",
            Self::Permissions => "permissions",
            Self::ContactsSearch => "contacts.search",
            Self::ContactsGet => "contacts.get",
            Self::ContactsList => "contacts.list",
            Self::ContactsCreate => "contacts.create",
            Self::ContactsUpdate => "contacts.update",
            Self::ContactsDelete => "contacts.delete",
            Self::CalendarSearch => "calendar.search",
            Self::CalendarGet => "calendar.get",
            Self::CalendarList => "calendar.list",
            Self::CalendarCreate => "calendar.create",
            Self::CalendarUpdate => "calendar.update",
            Self::CalendarDelete => "calendar.delete",
            Self::RemindersSearch => "reminders.search",
            Self::RemindersGet => "reminders.get",
            Self::RemindersList => "reminders.list",
            Self::RemindersCreate => "reminders.create",
            Self::RemindersUpdate => "reminders.update",
            Self::RemindersDelete => "reminders.delete",
            Self::ConfigGet => "config.get",
            Self::ConfigSet => "config.set",
            Self::SkillsList => "skills.list",
            Self::SkillsInstall => "skills.install",
        }
    }

    /// Required arguments for the command.
    ///
    /// Optional arguments (for example `limit`, defaulting to 50) are
    /// validated by the handler that consumes them.
    pub const fn required_args(self) -> &'static [ArgSpec] {
        match self {
            Self::Ping | Self::Status | Self::Permissions | Self::SkillsList => NONE,
            Self::ContactsSearch | Self::CalendarSearch | Self::RemindersSearch => QUERY,
            Self::ContactsGet
            | Self::ContactsUpdate
            | Self::ContactsDelete
            | Self::CalendarGet
            | Self::CalendarUpdate
            | Self::CalendarDelete
            | Self::RemindersGet
            | Self::RemindersUpdate
            | Self::RemindersDelete => ID,
            Self::ContactsList | Self::CalendarList | Self::RemindersList => NONE,
            Self::ContactsCreate => NAME,
            Self::CalendarCreate => TITLE_START,
            Self::RemindersCreate => TITLE,
            Self::ConfigGet => KEY,
            Self::ConfigSet => KEY_VALUE,
            Self::SkillsInstall => NAME,
        }
    }

    /// The capability the command exercises, if any.
    pub const fn capability(self) -> Option<Capability> {
        match self {
            Self::Ping | Self::Status | Self::Permissions => None,
            Self::ContactsSearch
            | Self::ContactsGet
            | Self::ContactsList
            | Self::ContactsCreate
            | Self::ContactsUpdate
            | Self::ContactsDelete => Some(Capability::Contacts),
            Self::CalendarSearch
            | Self::CalendarGet
            | Self::CalendarList
            | Self::CalendarCreate
            | Self::CalendarUpdate
            | Self::CalendarDelete => Some(Capability::Calendar),
            Self::RemindersSearch
            | Self::RemindersGet
            | Self::RemindersList
            | Self::RemindersCreate
            | Self::RemindersUpdate
            | Self::RemindersDelete => Some(Capability::Reminders),
            Self::ConfigGet | Self::ConfigSet => Some(Capability::Config),
            Self::SkillsList | Self::SkillsInstall => Some(Capability::Skills),
        }
    }

    /// Whether a backend exists for the command.
    ///
    /// Unimplemented commands are still part of the protocol surface and
    /// answer with `Not implemented: <name>` instead of `Unknown command`.
    pub const fn is_implemented(self) -> bool {
        !matches!(self, Self::SkillsList | Self::SkillsInstall)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_table_entry_by_name() {
        for command in Command::ALL {
            assert_eq!(Command::parse(command.name()), Some(*command));
        }
    }

    #[test]
    fn rejects_unknown_names() {
        assert_eq!(Command::parse("contacts.explode"), None);
        assert_eq!(Command::parse(""), None);
        assert_eq!(Command::parse("PING"), None);
    }

    #[test]
    fn wire_names_are_unique() {
        let mut names: Vec<&str> = Command::ALL.iter().map(|c| c.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), Command::ALL.len());
    }

    #[test]
    fn skills_commands_are_recognized_but_unimplemented() {
        assert!(!Command::SkillsList.is_implemented());
        assert!(!Command::SkillsInstall.is_implemented());
        assert!(Command::Ping.is_implemented());
    }

    #[test]
    fn searches_require_a_query() {
        let specs = Command::ContactsSearch.required_args();
        assert_eq!(specs.len(), 1);
        let spec = specs.first().expect("query spec");
        assert_eq!(spec.name, "query");
        assert_eq!(spec.tag, Some(ValueTag::Str));
    }
}
