// Dev server lifecycle
//
// Starting the booking site, recognising when it is ready, and tearing it
// down again.

mod command;
mod dev_server;
mod readiness;

pub use command::{DEFAULT_SERVER_COMMAND, ServerCommand};
pub use dev_server::{DEFAULT_PORT_GRACE, DEFAULT_READY_TIMEOUT, DevServer, ReadinessGate};
pub use readiness::{
    DEFAULT_PORT_PATTERN, DEFAULT_READY_MARKER, OutputTail, ReadinessOutcome, ReadinessProbe,
    ReadyInfo, extract_port, strip_ansi,
};
