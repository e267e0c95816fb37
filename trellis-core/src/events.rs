//! Well-known application event names

use std::fmt;
use std::str::FromStr;

/// Events published by the application itself while it moves through
/// its lifecycle.
///
/// Every phase event carries the [`Application`](crate::Application) as its
/// only argument. [`NewInstance`](ApplicationEvent::NewInstance) carries the
/// type name, the artifact type and the instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApplicationEvent {
    BootstrapStart,
    BootstrapEnd,
    StartupStart,
    StartupEnd,
    ReadyStart,
    ReadyEnd,
    ShutdownStart,
    StopStart,
    StopEnd,
    NewInstance,
}

impl ApplicationEvent {
    pub const ALL: [ApplicationEvent; 10] = [
        ApplicationEvent::BootstrapStart,
        ApplicationEvent::BootstrapEnd,
        ApplicationEvent::StartupStart,
        ApplicationEvent::StartupEnd,
        ApplicationEvent::ReadyStart,
        ApplicationEvent::ReadyEnd,
        ApplicationEvent::ShutdownStart,
        ApplicationEvent::StopStart,
        ApplicationEvent::StopEnd,
        ApplicationEvent::NewInstance,
    ];

    /// Event name as published on the router
    pub fn name(&self) -> &'static str {
        match self {
            ApplicationEvent::BootstrapStart => "BootstrapStart",
            ApplicationEvent::BootstrapEnd => "BootstrapEnd",
            ApplicationEvent::StartupStart => "StartupStart",
            ApplicationEvent::StartupEnd => "StartupEnd",
            ApplicationEvent::ReadyStart => "ReadyStart",
            ApplicationEvent::ReadyEnd => "ReadyEnd",
            ApplicationEvent::ShutdownStart => "ShutdownStart",
            ApplicationEvent::StopStart => "StopStart",
            ApplicationEvent::StopEnd => "StopEnd",
            ApplicationEvent::NewInstance => "NewInstance",
        }
    }
}

impl fmt::Display for ApplicationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ApplicationEvent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|event| event.name() == s)
            .ok_or_else(|| format!("Unknown application event: {}", s))
    }
}

impl AsRef<str> for ApplicationEvent {
    fn as_ref(&self) -> &str {
        self.name()
    }
}
