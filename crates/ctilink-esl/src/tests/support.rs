//! Test doubles for the collaborator ports and the command writer.

use mockall::mock;

use crate::connection::CommandWriter;
use crate::error::{ConnectionError, StoreError};
use crate::ports::{
    CommandId, CommandSource, OutboundCommand, RegistryProvider, StatusSink, SwitchId,
    SwitchTarget,
};

mock! {
    pub Store {}

    impl CommandSource for Store {
        fn list_pending(&self) -> Result<Vec<OutboundCommand>, StoreError>;
    }

    impl StatusSink for Store {
        fn mark_executing(&mut self, id: &CommandId) -> Result<(), StoreError>;
        fn mark_confirmed(&mut self, id: &CommandId, result: &str) -> Result<(), StoreError>;
    }
}

mock! {
    pub Registry {}

    impl RegistryProvider for Registry {
        fn active_target(&self) -> Result<Option<SwitchTarget>, StoreError>;
        fn update_last_seen(&mut self, id: &SwitchId) -> Result<(), StoreError>;
    }
}

/// Captures commands instead of writing them to a socket.
#[derive(Debug, Default)]
pub(crate) struct RecordingWriter {
    sent: Vec<String>,
}

impl RecordingWriter {
    pub(crate) fn commands(&self) -> Vec<&str> {
        self.sent.iter().map(String::as_str).collect()
    }
}

impl CommandWriter for RecordingWriter {
    fn send_command(&mut self, command: &str) -> Result<(), ConnectionError> {
        self.sent.push(command.to_owned());
        Ok(())
    }
}

pub(crate) fn sample_target() -> SwitchTarget {
    SwitchTarget {
        id: SwitchId::new("pbx-1"),
        host: String::from("127.0.0.1"),
        port: 8021,
        password: String::from("ClueCon"),
    }
}
