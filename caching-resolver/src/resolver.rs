use std::net::SocketAddr;
use dns::{Message, Question, ResourceRecord};
use crate::actor::{ActorGone, ActorHandle};
use crate::failover::FailureAction;
use crate::upstream::{ForwardError, Upstream};

pub const DEFAULT_FORWARDER_PORT: u16 = 53;

enum Step {
    Answer(Vec<u8>),
    Retry,
    Drop,
}

/// Answers raw queries from the cache or through the forwarder.
pub struct Resolver<U> {
    state: ActorHandle,
    upstream: U,
    forwarder_port: u16,
}

impl<U: Upstream> Resolver<U> {
    pub fn new(state: ActorHandle, upstream: U) -> Self {
        Self::with_forwarder_port(state, upstream, DEFAULT_FORWARDER_PORT)
    }

    pub fn with_forwarder_port(state: ActorHandle, upstream: U, forwarder_port: u16) -> Self {
        Self {
            state,
            upstream,
            forwarder_port,
        }
    }

    pub fn state(&self) -> &ActorHandle {
        &self.state
    }

    /// Returns the bytes to send back, or `None` when the query is dropped.
    ///
    /// Failed exchanges are retried until the failure policy gives up.
    pub async fn handle(&self, raw_query: &[u8]) -> Option<Vec<u8>> {
        let query = match Message::parse(raw_query) {
            Ok(q) => q,
            Err(e) => {
                tracing::debug!("dropping undecodable query: {}", e);
                return None;
            }
        };

        // Only the first question is ever answered.
        let question = match query.first_question() {
            Some(q) => q.clone(),
            None => {
                let id = query.header().id();
                tracing::debug!("dropping query {} without a question", id);
                return None;
            }
        };

        loop {
            match self.resolve(&question, &query).await {
                Ok(Step::Answer(bytes)) => return Some(bytes),
                Ok(Step::Retry) => continue,
                Ok(Step::Drop) => return None,
                Err(e) => {
                    tracing::error!("dropping query for {}: {}", question.domain(), e);
                    return None;
                }
            }
        }
    }

    async fn resolve(&self, question: &Question, query: &Message) -> Result<Step, ActorGone> {
        if let Some(mut cached) = self.state.lookup(question.domain()).await? {
            // The cached answer belongs to whichever query fetched it.
            cached.header_mut().set_id(query.header().id());
            match cached.to_vec() {
                Ok(bytes) => return Ok(Step::Answer(bytes)),
                Err(e) => {
                    let name = question.domain();
                    tracing::warn!("cached answer for {} cannot be encoded: {}", name, e)
                }
            }
        }

        match self.forward(question, query).await {
            Ok(reply) => Ok(Step::Answer(reply)),
            Err(e) => {
                tracing::debug!("{}", e);
                match self.state.record_failure().await? {
                    FailureAction::Retry | FailureAction::FailOver => Ok(Step::Retry),
                    FailureAction::Drop => Ok(Step::Drop),
                }
            }
        }
    }

    /// Sends `question` to the forwarder under the id and flags of `original`,
    /// caches the decoded reply and returns the reply bytes untouched.
    ///
    /// A reply with a zero-TTL answer record is passed on but not cached.
    pub async fn forward(
        &self,
        question: &Question,
        original: &Message,
    ) -> Result<Vec<u8>, ForwardError> {
        let status = self
            .state
            .status()
            .await
            .map_err(|_| ForwardError::StateUnavailable)?;
        let server = SocketAddr::new(status.forwarder, self.forwarder_port);

        let header = original.header();
        let request = Message::query(header.id(), header.flags(), question.clone());
        let request_bytes = request.to_vec().map_err(ForwardError::InvalidQuery)?;

        tracing::debug!("forwarding {} to {}", question.domain(), server);
        let reply = self.upstream.exchange(server, &request_bytes).await?;

        let answer = Message::parse(&reply)
            .map_err(|source| ForwardError::MalformedReply { server, source })?;

        if answer.answers().iter().any(ResourceRecord::is_one_off) {
            tracing::debug!("not caching {}, the answer has a zero TTL", question.domain());
            return Ok(reply);
        }

        self.state
            .store(question.domain(), answer)
            .await
            .map_err(|_| ForwardError::StateUnavailable)?;

        Ok(reply)
    }
}
