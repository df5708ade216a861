//! Maps validated requests onto capability backends.

use std::collections::BTreeMap;

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::debug;

use valet_protocol::{Request, Response, Value, ValueTag};

use crate::capability::{
    Backends, ContactDraft, ContactPatch, EventDraft, EventPatch, ReminderDraft, ReminderPatch,
};

use super::DISPATCH_TARGET;
use super::command::{ArgSpec, Command};
use super::errors::DispatchError;

/// Default page size for `*.list` commands when `limit` is absent.
const DEFAULT_LIST_LIMIT: usize = 50;

type Args = BTreeMap<String, Value>;

/// Stateless command router over the immutable backend registry.
///
/// [`Router::handle`] is total: every request produces exactly one response,
/// and no error escapes past it.
#[derive(Debug)]
pub struct Router {
    backends: Backends,
}

impl Router {
    /// Creates a router over the given registry.
    pub const fn new(backends: Backends) -> Self {
        Self { backends }
    }

    /// Answers one request.
    pub fn handle(&self, request: &Request) -> Response {
        let Some(command) = Command::parse(&request.command) else {
            debug!(target: DISPATCH_TARGET, command = %request.command, "unknown command");
            return Response::failure(
                &request.id,
                DispatchError::unknown_command(&request.command).to_string(),
            );
        };

        debug!(target: DISPATCH_TARGET, command = command.name(), "dispatching");
        match self.dispatch(command, &request.args) {
            Ok(data) => Response::ok(&request.id, data),
            Err(error) => Response::failure(&request.id, error.to_string()),
        }
    }

    fn dispatch(&self, command: Command, args: &Args) -> Result<Value, DispatchError> {
        if !command.is_implemented() {
            return Err(DispatchError::NotImplemented {
                command: command.name(),
            });
        }
        validate_required(command.required_args(), args)?;

        match command {
            Command::Ping => ping(),
            Command::Status => self.status(),
            Command::Permissions => Ok(self.permissions()),
            Command::ContactsSearch => {
                Ok(self.backends.contacts().search(str_arg(args, "query")?)?)
            }
            Command::ContactsGet => Ok(self.backends.contacts().get(str_arg(args, "id")?)?),
            Command::ContactsList => Ok(self.backends.contacts().list(limit_arg(args)?)?),
            Command::ContactsCreate => {
                let draft = ContactDraft {
                    name: str_arg(args, "name")?.to_owned(),
                    phones: opt_str_list(args, "phones")?.unwrap_or_default(),
                    emails: opt_str_list(args, "emails")?.unwrap_or_default(),
                };
                Ok(self.backends.contacts().create(draft)?)
            }
            Command::ContactsUpdate => {
                let patch = ContactPatch {
                    name: opt_str_arg(args, "name")?.map(str::to_owned),
                    add_phone: opt_str_arg(args, "add_phone")?.map(str::to_owned),
                    add_email: opt_str_arg(args, "add_email")?.map(str::to_owned),
                };
                Ok(self.backends.contacts().update(str_arg(args, "id")?, patch)?)
            }
            Command::ContactsDelete => Ok(self.backends.contacts().delete(str_arg(args, "id")?)?),
            Command::CalendarSearch => {
                Ok(self.backends.calendar().search(str_arg(args, "query")?)?)
            }
            Command::CalendarGet => Ok(self.backends.calendar().get(str_arg(args, "id")?)?),
            Command::CalendarList => Ok(self.backends.calendar().list(limit_arg(args)?)?),
            Command::CalendarCreate => {
                let draft = EventDraft {
                    title: str_arg(args, "title")?.to_owned(),
                    start: str_arg(args, "start")?.to_owned(),
                    end: opt_str_arg(args, "end")?.map(str::to_owned),
                    location: opt_str_arg(args, "location")?.map(str::to_owned),
                };
                Ok(self.backends.calendar().create(draft)?)
            }
            Command::CalendarUpdate => {
                let patch = EventPatch {
                    title: opt_str_arg(args, "title")?.map(str::to_owned),
                    start: opt_str_arg(args, "start")?.map(str::to_owned),
                    end: opt_str_arg(args, "end")?.map(str::to_owned),
                    location: opt_str_arg(args, "location")?.map(str::to_owned),
                };
                Ok(self.backends.calendar().update(str_arg(args, "id")?, patch)?)
            }
            Command::CalendarDelete => Ok(self.backends.calendar().delete(str_arg(args, "id")?)?),
            Command::RemindersSearch => {
                Ok(self.backends.reminders().search(str_arg(args, "query")?)?)
            }
            Command::RemindersGet => Ok(self.backends.reminders().get(str_arg(args, "id")?)?),
            Command::RemindersList => Ok(self.backends.reminders().list(limit_arg(args)?)?),
            Command::RemindersCreate => {
                let draft = ReminderDraft {
                    title: str_arg(args, "title")?.to_owned(),
                    due: opt_str_arg(args, "due")?.map(str::to_owned),
                    notes: opt_str_arg(args, "notes")?.map(str::to_owned),
                };
                Ok(self.backends.reminders().create(draft)?)
            }
            Command::RemindersUpdate => {
                let patch = ReminderPatch {
                    title: opt_str_arg(args, "title")?.map(str::to_owned),
                    due: opt_str_arg(args, "due")?.map(str::to_owned),
                    notes: opt_str_arg(args, "notes")?.map(str::to_owned),
                    completed: opt_bool_arg(args, "completed")?,
                };
                Ok(self
                    .backends
                    .reminders()
                    .update(str_arg(args, "id")?, patch)?)
            }
            Command::RemindersDelete => {
                Ok(self.backends.reminders().delete(str_arg(args, "id")?)?)
            }
            Command::ConfigGet => Ok(self.backends.settings().get(str_arg(args, "key")?)?),
            Command::ConfigSet => {
                let value = args.get("value").cloned().unwrap_or(Value::Null);
                Ok(self.backends.settings().set(str_arg(args, "key")?, value)?)
            }
            Command::SkillsList | Command::SkillsInstall => Err(DispatchError::NotImplemented {
                command: command.name(),
            }),
        }
    }

    fn status(&self) -> Result<Value, DispatchError> {
        Ok(Value::map([
            ("name", Value::str(env!("CARGO_PKG_NAME"))),
            ("version", Value::str(env!("CARGO_PKG_VERSION"))),
            ("permissions", self.permissions()),
        ]))
    }

    fn permissions(&self) -> Value {
        Value::map(
            self.backends
                .authorization_states()
                .into_iter()
                .map(|(capability, state)| {
                    (capability.to_string(), Value::str(state.as_str()))
                }),
        )
    }
}

fn ping() -> Result<Value, DispatchError> {
    let timestamp = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .map_err(|error| DispatchError::internal(format!("clock format: {error}")))?;
    Ok(Value::map([
        ("pong", Value::Bool(true)),
        ("timestamp", Value::Str(timestamp)),
    ]))
}

/// Checks required arguments for presence and tag, short-circuiting on the
/// first violation.
fn validate_required(specs: &[ArgSpec], args: &Args) -> Result<(), DispatchError> {
    for spec in specs {
        let Some(value) = args.get(spec.name) else {
            return Err(DispatchError::MissingArgument { name: spec.name });
        };
        if let Some(expected) = spec.tag
            && value.tag() != expected
        {
            return Err(DispatchError::InvalidArgument {
                name: spec.name,
                expected,
            });
        }
    }
    Ok(())
}

fn str_arg<'a>(args: &'a Args, name: &'static str) -> Result<&'a str, DispatchError> {
    match args.get(name) {
        Some(Value::Str(value)) => Ok(value),
        Some(_) => Err(DispatchError::InvalidArgument {
            name,
            expected: ValueTag::Str,
        }),
        None => Err(DispatchError::MissingArgument { name }),
    }
}

fn opt_str_arg<'a>(args: &'a Args, name: &'static str) -> Result<Option<&'a str>, DispatchError> {
    match args.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Str(value)) => Ok(Some(value)),
        Some(_) => Err(DispatchError::InvalidArgument {
            name,
            expected: ValueTag::Str,
        }),
    }
}

fn opt_bool_arg(args: &Args, name: &'static str) -> Result<Option<bool>, DispatchError> {
    match args.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(value)) => Ok(Some(*value)),
        Some(_) => Err(DispatchError::InvalidArgument {
            name,
            expected: ValueTag::Bool,
        }),
    }
}

fn opt_str_list(args: &Args, name: &'static str) -> Result<Option<Vec<String>>, DispatchError> {
    let items = match args.get(name) {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::List(items)) => items,
        Some(_) => {
            return Err(DispatchError::InvalidArgument {
                name,
                expected: ValueTag::List,
            });
        }
    };
    items
        .iter()
        .map(|item| {
            item.as_str().map(str::to_owned).ok_or(DispatchError::InvalidArgument {
                name,
                expected: ValueTag::Str,
            })
        })
        .collect::<Result<Vec<String>, DispatchError>>()
        .map(Some)
}

/// Reads the optional `limit` argument, defaulting to [`DEFAULT_LIST_LIMIT`].
fn limit_arg(args: &Args) -> Result<usize, DispatchError> {
    match args.get("limit") {
        None | Some(Value::Null) => Ok(DEFAULT_LIST_LIMIT),
        Some(Value::Int(value)) => {
            usize::try_from(*value).map_err(|_| DispatchError::InvalidArgument {
                name: "limit",
                expected: ValueTag::Int,
            })
        }
        Some(_) => Err(DispatchError::InvalidArgument {
            name: "limit",
            expected: ValueTag::Int,
        }),
    }
}
