//! Command descriptors: the static contract each supported AT command
//! offers the engine.
//!
//! A command is described by a [`CommandDescriptor`] holding up to four
//! operations, one per [`CommandKind`]. Each operation is a typed
//! [`Operation<P, R>`] static carrying its response policy, timeout and the
//! optional parser/formatter pair. The descriptor only sees operations
//! through the untyped [`OperationSpec`] view, which is all termination
//! detection needs.

use std::fmt;
use std::time::Duration;

use crate::error::{AtError, AtResult};
use crate::format::CommandBuffer;

/// The four AT command invocation forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    /// `AT+<NAME>=?`: query supported parameters.
    Test,
    /// `AT+<NAME>?`: query current values.
    Read,
    /// `AT+<NAME>=<params>`: set values or trigger an action.
    Write,
    /// `AT+<NAME>`: run the command without parameters.
    Execute,
}

impl CommandKind {
    /// All kinds, in descriptor slot order.
    pub const ALL: [CommandKind; 4] = [
        CommandKind::Test,
        CommandKind::Read,
        CommandKind::Write,
        CommandKind::Execute,
    ];

    /// Get the command line suffix for this kind.
    ///
    /// For [`CommandKind::Write`] this is only the `=` that precedes the
    /// formatted parameters.
    pub fn suffix(&self) -> &'static str {
        match self {
            CommandKind::Test => "=?",
            CommandKind::Read => "?",
            CommandKind::Write => "=",
            CommandKind::Execute => "",
        }
    }

    /// Get the upper-case kind name used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandKind::Test => "TEST",
            CommandKind::Read => "READ",
            CommandKind::Write => "WRITE",
            CommandKind::Execute => "EXECUTE",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<u8> for CommandKind {
    type Error = AtError;

    fn try_from(value: u8) -> AtResult<Self> {
        CommandKind::ALL
            .get(value as usize)
            .copied()
            .ok_or_else(|| AtError::invalid_argument(format!("invalid command kind {}", value)))
    }
}

/// What combination of final result code and data line completes a
/// response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponsePolicy {
    /// Only a final result code is expected.
    SimpleOnly,
    /// A final result code and a complete data line are both mandatory.
    DataRequired,
    /// A final result code is mandatory; a data line, if started, must be
    /// complete.
    DataOptional,
}

/// Parses the full raw response text into a structured result.
pub type Parser<R> = fn(&str) -> AtResult<R>;

/// Serializes parameters into the command buffer (after the `=`).
pub type Formatter<P> = fn(&P, &mut CommandBuffer) -> AtResult<()>;

/// One operation of one command, typed by its parameters `P` and its
/// structured result `R`.
pub struct Operation<P: 'static, R: 'static> {
    /// Command mnemonic without the `AT+` prefix.
    pub command: &'static str,
    /// Invocation form.
    pub kind: CommandKind,
    /// Completion rule for the response.
    pub policy: ResponsePolicy,
    /// Deadline for the whole response.
    pub timeout: Duration,
    /// Response parser.
    pub parser: Option<Parser<R>>,
    /// Parameter formatter (write operations).
    pub formatter: Option<Formatter<P>>,
}

/// Untyped view of an [`Operation`], as stored in a [`CommandDescriptor`].
pub trait OperationSpec: Sync {
    /// Command mnemonic.
    fn command(&self) -> &'static str;
    /// Invocation form.
    fn kind(&self) -> CommandKind;
    /// Completion rule for the response.
    fn policy(&self) -> ResponsePolicy;
    /// Deadline for the whole response.
    fn timeout(&self) -> Duration;
    /// Whether a response parser is registered.
    fn has_parser(&self) -> bool;
    /// Whether a parameter formatter is registered.
    fn has_formatter(&self) -> bool;
}

impl<P: 'static, R: 'static> OperationSpec for Operation<P, R> {
    fn command(&self) -> &'static str {
        self.command
    }

    fn kind(&self) -> CommandKind {
        self.kind
    }

    fn policy(&self) -> ResponsePolicy {
        self.policy
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn has_parser(&self) -> bool {
        self.parser.is_some()
    }

    fn has_formatter(&self) -> bool {
        self.formatter.is_some()
    }
}

impl<P: 'static, R: 'static> fmt::Debug for Operation<P, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self as &dyn OperationSpec, f)
    }
}

impl fmt::Debug for dyn OperationSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationSpec")
            .field("command", &self.command())
            .field("kind", &self.kind())
            .field("policy", &self.policy())
            .field("timeout", &self.timeout())
            .finish()
    }
}

/// Static description of one AT command.
#[derive(Debug, Clone, Copy)]
pub struct CommandDescriptor {
    /// Command mnemonic without the `AT+` prefix, e.g. `QMTOPEN`.
    pub name: &'static str,
    /// Human-readable description.
    pub description: &'static str,
    /// `AT+<NAME>=?`
    pub test: Option<&'static dyn OperationSpec>,
    /// `AT+<NAME>?`
    pub read: Option<&'static dyn OperationSpec>,
    /// `AT+<NAME>=<params>`
    pub write: Option<&'static dyn OperationSpec>,
    /// `AT+<NAME>`
    pub execute: Option<&'static dyn OperationSpec>,
}

impl CommandDescriptor {
    /// Look up the operation registered for a kind.
    pub fn operation(&self, kind: CommandKind) -> Option<&'static dyn OperationSpec> {
        match kind {
            CommandKind::Test => self.test,
            CommandKind::Read => self.read,
            CommandKind::Write => self.write,
            CommandKind::Execute => self.execute,
        }
    }

    /// Check whether the command supports a kind.
    pub fn supports(&self, kind: CommandKind) -> bool {
        self.operation(kind).is_some()
    }

    /// Get the response policy for a kind, if supported.
    pub fn policy(&self, kind: CommandKind) -> Option<ResponsePolicy> {
        self.operation(kind).map(|op| op.policy())
    }

    /// Get the response timeout for a kind, if supported.
    pub fn timeout(&self, kind: CommandKind) -> Option<Duration> {
        self.operation(kind).map(|op| op.timeout())
    }

    /// Check the descriptor for internal consistency.
    ///
    /// Every slot must hold an operation of its own kind for this command,
    /// and a `DataRequired` operation must have a parser.
    pub fn validate(&self) -> AtResult<()> {
        if self.name.is_empty() {
            return Err(AtError::InvalidState("command descriptor without a name".to_string()));
        }

        for kind in CommandKind::ALL {
            let Some(op) = self.operation(kind) else {
                continue;
            };

            if op.kind() != kind {
                return Err(AtError::InvalidState(format!(
                    "AT+{} {} slot holds a {} operation",
                    self.name,
                    kind,
                    op.kind()
                )));
            }

            if op.command() != self.name {
                return Err(AtError::InvalidState(format!(
                    "AT+{} {} slot holds an operation for AT+{}",
                    self.name,
                    kind,
                    op.command()
                )));
            }

            if op.policy() == ResponsePolicy::DataRequired && !op.has_parser() {
                return Err(AtError::InvalidState(format!(
                    "AT+{} {} requires data but has no parser",
                    self.name, kind
                )));
            }
        }

        Ok(())
    }
}
