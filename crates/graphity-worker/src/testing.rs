//! Test support: a responder that records its terminal call.

use std::time::Duration;

use chrono::Utc;
use graphity_core::models::Operation;
use graphity_core::{ClientResponder, EntityId};
use tokio::sync::oneshot;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Outcome {
    Finished(Vec<String>),
    Error(u16, String),
}

pub(crate) struct Recorder {
    lines: Vec<String>,
    tx: oneshot::Sender<Outcome>,
}

pub(crate) struct OutcomeReceiver(oneshot::Receiver<Outcome>);

impl Recorder {
    pub(crate) fn new() -> (Box<dyn ClientResponder>, OutcomeReceiver) {
        let (tx, rx) = oneshot::channel();
        (
            Box::new(Recorder {
                lines: Vec::new(),
                tx,
            }),
            OutcomeReceiver(rx),
        )
    }
}

impl ClientResponder for Recorder {
    fn add_line(&mut self, line: &str) {
        self.lines.push(line.to_string());
    }

    fn finish(self: Box<Self>) {
        let _ = self.tx.send(Outcome::Finished(self.lines));
    }

    fn error(self: Box<Self>, code: u16, message: &str) {
        let _ = self.tx.send(Outcome::Error(code, message.to_string()));
    }
}

impl OutcomeReceiver {
    pub(crate) async fn wait(self) -> Outcome {
        tokio::time::timeout(Duration::from_secs(5), self.0)
            .await
            .expect("responder was not completed in time")
            .expect("responder dropped without a terminal call")
    }
}

pub(crate) fn friendship(actor: i64, target: i64, responder: Box<dyn ClientResponder>) -> Operation {
    Operation::create_friendship(
        EntityId::new(actor).unwrap(),
        EntityId::new(target).unwrap(),
        Utc::now(),
        responder,
    )
}
