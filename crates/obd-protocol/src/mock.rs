//! Scripted ISO-TP channel for unit tests

use async_trait::async_trait;
use iso_tp::{IsoTpChannel, IsoTpError, IsoTpMessage};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone)]
enum Reply {
    Data(Vec<u8>),
    Fail(IsoTpError),
    Stall(Duration),
}

/// Answers each request payload with a canned reply.
///
/// Unscripted requests fail like a silent ECU.
#[derive(Debug, Default)]
pub(crate) struct MockChannel {
    script: Mutex<HashMap<Vec<u8>, Reply>>,
    sent: Mutex<Vec<Vec<u8>>>,
    pending: Mutex<Option<Reply>>,
}

impl MockChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, request: &[u8], response: &[u8]) {
        self.script
            .lock()
            .unwrap()
            .insert(request.to_vec(), Reply::Data(response.to_vec()));
    }

    pub fn fail(&self, request: &[u8], error: IsoTpError) {
        self.script
            .lock()
            .unwrap()
            .insert(request.to_vec(), Reply::Fail(error));
    }

    pub fn stall(&self, request: &[u8], delay: Duration) {
        self.script
            .lock()
            .unwrap()
            .insert(request.to_vec(), Reply::Stall(delay));
    }

    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl IsoTpChannel for MockChannel {
    async fn send(&self, msg: &IsoTpMessage) -> Result<(), IsoTpError> {
        self.sent.lock().unwrap().push(msg.data().to_vec());
        let reply = self.script.lock().unwrap().get(msg.data()).cloned();
        *self.pending.lock().unwrap() = reply;
        Ok(())
    }

    async fn receive(&self, msg: &mut IsoTpMessage) -> Result<usize, IsoTpError> {
        let reply = self.pending.lock().unwrap().take();
        match reply {
            Some(Reply::Data(data)) => msg.fill(&data),
            Some(Reply::Fail(error)) => Err(error),
            Some(Reply::Stall(delay)) => {
                tokio::time::sleep(delay).await;
                Err(IsoTpError::SessionTimeout(500))
            }
            None => Err(IsoTpError::SessionTimeout(500)),
        }
    }
}
