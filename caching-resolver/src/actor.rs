use std::net::IpAddr;
use std::time::{Duration, SystemTime};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use dns::Message;
use crate::cache::ResponseCache;
use crate::failover::{Failover, FailureAction};

const MAILBOX_SIZE: usize = 1024;

#[derive(Debug, Error)]
#[error("resolver state actor has stopped")]
pub struct ActorGone;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ForwarderStatus {
    pub forwarder: IpAddr,
    pub consecutive_errors: u32,
}

enum ActorMessage {
    Lookup {
        name: String,
        responder: oneshot::Sender<Option<Message>>,
    },
    Store {
        name: String,
        message: Message,
    },
    Status {
        responder: oneshot::Sender<ForwarderStatus>,
    },
    Failure {
        responder: oneshot::Sender<FailureAction>,
    },
    Snapshot {
        responder: oneshot::Sender<ResponseCache>,
    },
}

// Owns everything request handlers share. Messages are handled one at a
// time, so no two handlers ever see a half-applied update.
struct Actor {
    receiver: mpsc::Receiver<ActorMessage>,

    cache: ResponseCache,
    cache_ttl: Duration,
    failover: Failover,
}

impl Actor {
    fn new(
        receiver: mpsc::Receiver<ActorMessage>,
        cache: ResponseCache,
        cache_ttl: Duration,
        forwarder: IpAddr,
    ) -> Self {
        Self {
            receiver,

            cache,
            cache_ttl,
            failover: Failover::new(forwarder),
        }
    }

    fn handle_message(&mut self, msg: ActorMessage) {
        match msg {
            ActorMessage::Lookup { name, responder } => {
                let ret = self.cache.fresh(&name, self.cache_ttl, SystemTime::now()).cloned();
                match ret {
                    Some(_) => tracing::debug!("{} found in cache", name),
                    None => tracing::debug!("{} is not cached or has gone stale", name),
                }
                let _ = responder.send(ret);
            }
            ActorMessage::Store { name, message } => {
                self.cache.store(&name, message, SystemTime::now());
            }
            ActorMessage::Status { responder } => {
                let _ = responder.send(self.status());
            }
            ActorMessage::Failure { responder } => {
                let action = self.failover.record_failure();
                match action {
                    FailureAction::Retry => {
                        let errors = self.failover.consecutive_errors();
                        tracing::warn!(errors, "forwarder not reached");
                    }
                    FailureAction::FailOver => {
                        tracing::warn!(
                            errors = self.failover.consecutive_errors(),
                            "forwarder not reached, switching to {}",
                            self.failover.forwarder()
                        );
                    }
                    FailureAction::Drop => {
                        tracing::warn!("forwarder not reached, dropping query");
                    }
                }
                let _ = responder.send(action);
            }
            ActorMessage::Snapshot { responder } => {
                let _ = responder.send(self.cache.clone());
            }
        }
    }

    fn status(&self) -> ForwarderStatus {
        ForwarderStatus {
            forwarder: self.failover.forwarder(),
            consecutive_errors: self.failover.consecutive_errors(),
        }
    }
}

async fn run_as_actor(mut actor: Actor) {
    while let Some(msg) = actor.receiver.recv().await {
        actor.handle_message(msg);
    }
}

#[derive(Clone)]
pub struct ActorHandle {
    sender: mpsc::Sender<ActorMessage>,
}

impl ActorHandle {
    /// Spawns the actor on the current tokio runtime.
    pub fn new(cache: ResponseCache, cache_ttl: Duration, forwarder: IpAddr) -> Self {
        let (sender, receiver) = mpsc::channel(MAILBOX_SIZE);
        let actor = Actor::new(receiver, cache, cache_ttl, forwarder);
        tokio::spawn(run_as_actor(actor));

        Self { sender }
    }

    // call
    pub async fn lookup(&self, name: &str) -> Result<Option<Message>, ActorGone> {
        self.call(|responder| ActorMessage::Lookup {
            name: name.to_string(),
            responder,
        })
        .await
    }

    // cast
    pub async fn store(&self, name: &str, message: Message) -> Result<(), ActorGone> {
        let msg = ActorMessage::Store {
            name: name.to_string(),
            message,
        };

        self.sender.send(msg).await.map_err(|_| ActorGone)
    }

    pub async fn status(&self) -> Result<ForwarderStatus, ActorGone> {
        self.call(|responder| ActorMessage::Status { responder }).await
    }

    pub async fn record_failure(&self) -> Result<FailureAction, ActorGone> {
        self.call(|responder| ActorMessage::Failure { responder }).await
    }

    pub async fn snapshot(&self) -> Result<ResponseCache, ActorGone> {
        self.call(|responder| ActorMessage::Snapshot { responder }).await
    }

    async fn call<T, F>(&self, make: F) -> Result<T, ActorGone>
    where
        F: FnOnce(oneshot::Sender<T>) -> ActorMessage,
    {
        let (sender, receiver) = oneshot::channel();
        self.sender.send(make(sender)).await.map_err(|_| ActorGone)?;
        receiver.await.map_err(|_| ActorGone)
    }
}
