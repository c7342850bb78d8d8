//! Command table and request line parsing
//!
//! Every command declares how the rest of its line is split, so free-text
//! fields may contain the delimiter without bespoke parsing per command.

use std::borrow::Cow;

use thiserror::Error;

pub const FIELD_DELIMITER: char = ':';

/// How the fields after the command name are split
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// No fields
    Bare,
    /// Exactly `n` fields
    Fixed(usize),
    /// `n` fields, then the unsplit remainder of the line as one more field
    /// (empty when absent)
    Trailing(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Login,
    GetRooms,
    AddRoom,
    UpdateRoom,
    DeleteRoom,
    CheckAvailability,
    GetRoomStatus,
    AddReservation,
    ReserveByType,
    PayAndReserve,
    ProcessPayment,
    GetMyReservations,
    UpdateReservationRequest,
    UpdateReservationStatus,
    DeleteReservation,
    CheckIn,
    CheckOut,
    ToggleCleaning,
    GetDashboard,
    GetRoomSales,
}

#[derive(Debug)]
pub struct CommandSpec {
    pub name: &'static str,
    pub kind: CommandKind,
    pub arity: Arity,
}

const fn spec(name: &'static str, kind: CommandKind, arity: Arity) -> CommandSpec {
    CommandSpec { name, kind, arity }
}

pub static COMMANDS: &[CommandSpec] = &[
    spec("LOGIN", CommandKind::Login, Arity::Fixed(2)),
    spec("GET_ROOMS", CommandKind::GetRooms, Arity::Bare),
    spec("ADD_ROOM", CommandKind::AddRoom, Arity::Trailing(4)),
    spec("UPDATE_ROOM", CommandKind::UpdateRoom, Arity::Trailing(4)),
    spec("DELETE_ROOM", CommandKind::DeleteRoom, Arity::Fixed(1)),
    spec("CHECK_AVAILABILITY", CommandKind::CheckAvailability, Arity::Fixed(2)),
    spec("GET_ROOM_STATUS", CommandKind::GetRoomStatus, Arity::Fixed(1)),
    spec("ADD_RESERVATION", CommandKind::AddReservation, Arity::Trailing(6)),
    spec("RESERVE_BY_TYPE", CommandKind::ReserveByType, Arity::Fixed(6)),
    spec("PAY_AND_RESERVE", CommandKind::PayAndReserve, Arity::Fixed(11)),
    spec("PROCESS_PAYMENT", CommandKind::ProcessPayment, Arity::Fixed(7)),
    spec("GET_MY_RESERVATIONS", CommandKind::GetMyReservations, Arity::Fixed(1)),
    spec(
        "UPDATE_RESERVATION_REQUEST",
        CommandKind::UpdateReservationRequest,
        Arity::Trailing(1),
    ),
    spec(
        "UPDATE_RESERVATION_STATUS",
        CommandKind::UpdateReservationStatus,
        Arity::Fixed(2),
    ),
    spec("DELETE_RESERVATION", CommandKind::DeleteReservation, Arity::Fixed(1)),
    spec("CHECK_IN", CommandKind::CheckIn, Arity::Fixed(1)),
    spec("CHECK_OUT", CommandKind::CheckOut, Arity::Fixed(1)),
    spec("TOGGLE_CLEANING", CommandKind::ToggleCleaning, Arity::Fixed(1)),
    spec("GET_DASHBOARD", CommandKind::GetDashboard, Arity::Fixed(1)),
    spec("GET_ROOM_SALES", CommandKind::GetRoomSales, Arity::Fixed(2)),
];

pub fn lookup(name: &str) -> Option<&'static CommandSpec> {
    COMMANDS.iter().find(|c| c.name == name)
}

/// Failures that never reach the reservation engine
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("{0}")]
    Format(String),

    #[error("Unknown command {0}")]
    UnknownCommand(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl CommandError {
    pub fn reply(&self) -> String {
        format!("ERROR:{}", self)
    }

    pub fn outcome(&self) -> &'static str {
        match self {
            Self::Format(_) | Self::UnknownCommand(_) => "invalid",
            Self::Internal(_) => "error",
        }
    }
}

/// One parsed request line
#[derive(Debug)]
pub struct Request<'a> {
    pub spec: &'static CommandSpec,
    pub fields: Vec<&'a str>,
}

impl<'a> Request<'a> {
    pub fn kind(&self) -> CommandKind {
        self.spec.kind
    }

    pub fn name(&self) -> &'static str {
        self.spec.name
    }

    /// Field `index`, never out of bounds after a successful parse.
    pub fn field(&self, index: usize) -> &'a str {
        self.fields.get(index).copied().unwrap_or_default()
    }
}

/// Split a request line according to its command's arity.
pub fn parse_request(line: &str) -> Result<Request<'_>, CommandError> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return Err(CommandError::Format("Empty request".into()));
    }

    let (name, rest) = match line.split_once(FIELD_DELIMITER) {
        Some((name, rest)) => (name.trim(), Some(rest)),
        None => (line.trim(), None),
    };
    let spec = lookup(name).ok_or_else(|| CommandError::UnknownCommand(name.to_string()))?;

    let fields: Vec<&str> = match (spec.arity, rest) {
        (Arity::Bare, None) | (Arity::Bare, Some("")) => Vec::new(),
        (Arity::Bare, Some(_)) => {
            return Err(CommandError::Format(format!(
                "Invalid {} format: expected no fields",
                spec.name
            )))
        }
        (Arity::Fixed(_), None) => Vec::new(),
        (Arity::Fixed(_), Some(rest)) => rest.split(FIELD_DELIMITER).collect(),
        (Arity::Trailing(_), None) => Vec::new(),
        (Arity::Trailing(n), Some(rest)) => {
            let mut fields: Vec<&str> = rest.splitn(n + 1, FIELD_DELIMITER).collect();
            if fields.len() == n {
                fields.push("");
            }
            fields
        }
    };

    let expected = match spec.arity {
        Arity::Bare => 0,
        Arity::Fixed(n) => n,
        Arity::Trailing(n) => n + 1,
    };
    if fields.len() != expected {
        return Err(CommandError::Format(format!(
            "Invalid {} format: expected {} fields, got {}",
            spec.name,
            expected,
            fields.len()
        )));
    }

    Ok(Request { spec, fields })
}

const REDACTED: &str = "***";

/// Field indices holding passwords or card data
fn secret_fields(kind: CommandKind) -> &'static [usize] {
    match kind {
        CommandKind::Login => &[1],
        CommandKind::PayAndReserve => &[7, 8, 9, 10],
        CommandKind::ProcessPayment => &[2, 3, 4, 5],
        _ => &[],
    }
}

/// A request line safe to write to the log: secrets are masked, and a line
/// that does not parse shows only its command name.
pub fn redact_line(line: &str) -> Cow<'_, str> {
    let req = match parse_request(line) {
        Ok(req) => req,
        Err(_) => {
            let line = line.trim_end_matches(['\r', '\n']);
            return match line.split_once(FIELD_DELIMITER) {
                Some((name, rest)) => {
                    Cow::Owned(format!("{}:<{} bytes withheld>", name.trim(), rest.len()))
                }
                None => Cow::Borrowed(line),
            };
        }
    };

    let secrets = secret_fields(req.kind());
    if secrets.is_empty() {
        return Cow::Borrowed(line.trim_end_matches(['\r', '\n']));
    }

    let mut out = String::from(req.name());
    for (i, field) in req.fields.iter().enumerate() {
        out.push(FIELD_DELIMITER);
        if secrets.contains(&i) && !field.is_empty() {
            out.push_str(REDACTED);
        } else {
            out.push_str(field);
        }
    }
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_command_name_is_unique() {
        let mut names: Vec<_> = COMMANDS.iter().map(|c| c.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), COMMANDS.len());
    }

    #[test]
    fn fixed_arity_must_match_exactly() {
        let req = parse_request("LOGIN:admin:1234").unwrap();
        assert_eq!(req.kind(), CommandKind::Login);
        assert_eq!(req.fields, vec!["admin", "1234"]);

        let err = parse_request("LOGIN:admin").unwrap_err();
        assert_eq!(
            err.reply(),
            "ERROR:Invalid LOGIN format: expected 2 fields, got 1"
        );
        assert!(parse_request("LOGIN:admin:12:34").is_err());
        assert!(parse_request("LOGIN").is_err());
    }

    #[test]
    fn trailing_field_keeps_delimiters() {
        let req = parse_request(
            "ADD_RESERVATION:101:Kim:2025-01-10:2025-01-12:2:010-1234-5678:arrive 21:30, quiet",
        )
        .unwrap();
        assert_eq!(req.fields.len(), 7);
        assert_eq!(req.field(6), "arrive 21:30, quiet");
    }

    #[test]
    fn trailing_field_may_be_absent() {
        let req = parse_request("ADD_RESERVATION:101:Kim:2025-01-10:2025-01-12:2:010").unwrap();
        assert_eq!(req.field(6), "");
        let req = parse_request("UPDATE_RESERVATION_REQUEST:R-1").unwrap();
        assert_eq!(req.fields, vec!["R-1", ""]);
        assert!(parse_request("ADD_RESERVATION:101:Kim").is_err());
    }

    #[test]
    fn bare_commands_take_nothing() {
        assert!(parse_request("GET_ROOMS").unwrap().fields.is_empty());
        assert!(parse_request("GET_ROOMS\r\n").is_ok());
        assert!(parse_request("GET_ROOMS:extra").is_err());
    }

    #[test]
    fn unknown_and_empty_lines() {
        assert_eq!(
            parse_request("HELLO:world").unwrap_err().reply(),
            "ERROR:Unknown command HELLO"
        );
        assert_eq!(parse_request("   ").unwrap_err().reply(), "ERROR:Empty request");
    }

    #[test]
    fn log_lines_hide_passwords_and_card_data() {
        assert_eq!(redact_line("LOGIN:admin:1234"), "LOGIN:admin:***");
        assert_eq!(
            redact_line(
                "PAY_AND_RESERVE:101:Kim:2025-01-10:2025-01-12:2:010:quiet:1234567812345678:123:12/27:12"
            ),
            "PAY_AND_RESERVE:101:Kim:2025-01-10:2025-01-12:2:010:quiet:***:***:***:***"
        );
        assert_eq!(
            redact_line("PROCESS_PAYMENT:R-1:CreditCard:1234567812345678:123:12/27:12:200000\r\n"),
            "PROCESS_PAYMENT:R-1:CreditCard:***:***:***:***:200000"
        );
    }

    #[test]
    fn log_lines_keep_ordinary_requests() {
        let line = "ADD_RESERVATION:101:Kim:2025-01-10:2025-01-12:2:010:late: after 21:00";
        assert_eq!(redact_line(line), line);
        assert_eq!(redact_line("GET_ROOMS\n"), "GET_ROOMS");
    }

    #[test]
    fn malformed_lines_do_not_echo_fields() {
        let logged = redact_line("LOGIN:admin:12:34");
        assert_eq!(logged, "LOGIN:<11 bytes withheld>");
        assert!(!logged.contains("12"));

        let logged = redact_line("PAY_AND_RESERVE:101:Kim:1234567812345678");
        assert!(!logged.contains("1234567812345678"));
        assert_eq!(redact_line("NOPE"), "NOPE");
    }
}
