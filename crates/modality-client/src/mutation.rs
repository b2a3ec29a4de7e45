//! Mutation client: announce mutators, poll for commands, report outcomes.
//!
//! ```text
//! Connected ─► Authenticated ─register_mutators─► Registered ─poll─► Polling
//!                                                                   │   ▲
//!                                                                   └───┘
//! ```
//!
//! Nothing runs in the background. Each `poll` is one round-trip: the request
//! carries every outcome queued since the last successful send, the reply
//! carries pending commands, which are dispatched in order through the
//! shared [`MutatorHost`]. Per-command failures become outcomes; they never
//! fail the poll.
//!
//! The client tracks which host mutators this session has announced. Any that
//! are not (registered through a shared host, left over from a failed
//! `register_mutators`, or dropped by a re-announce request) go out before the
//! next Poll, so the server never sees a poll for a mutator it does not know.

use std::collections::HashSet;
use std::sync::Arc;

use modality_types::{MutatorDescriptor, MutatorId, ParticipantId};

use crate::auth::AuthToken;
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::mutator::{CommandError, Mutator, MutatorHost};
use crate::protocol::{
    CommandResult, MutationProtocol, MutationRequest, MutationResponse, Outcome, PendingCommand,
    decode_named, encode_named,
};
use crate::session::{Session, SessionState, Transport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationState {
    Disconnected,
    Connected,
    Authenticated,
    Registered,
    Polling,
}

#[derive(Debug)]
pub struct MutationClient {
    session: Session<MutationProtocol>,
    host: Arc<MutatorHost>,
    outbox: Vec<CommandResult>,
    announced: HashSet<MutatorId>,
    /// Set once `register_mutators` commits; retiring every mutator keeps it.
    registered: bool,
    polled: bool,
}

impl MutationClient {
    pub async fn connect(config: &ClientConfig, participant: ParticipantId) -> Result<Self> {
        let endpoint = config.mutation_endpoint()?;
        let protocol = MutationProtocol::new(participant);
        let session = Session::connect(&endpoint, protocol, config).await?;
        Ok(Self::from_session(session))
    }

    pub fn from_stream<S: Transport + 'static>(
        stream: S,
        participant: ParticipantId,
        config: &ClientConfig,
    ) -> Self {
        Self::from_session(Session::from_stream(stream, MutationProtocol::new(participant), config))
    }

    pub fn from_session(session: Session<MutationProtocol>) -> Self {
        Self::with_host(session, Arc::new(MutatorHost::new()))
    }

    /// Share a host with another front end (the HTTP facade, say), or carry
    /// one over to a fresh session after a reconnect. Its mutators are
    /// announced before the first poll.
    pub fn with_host(session: Session<MutationProtocol>, host: Arc<MutatorHost>) -> Self {
        Self {
            session,
            host,
            outbox: Vec::new(),
            announced: HashSet::new(),
            registered: false,
            polled: false,
        }
    }

    pub async fn authenticate(&mut self, token: &AuthToken) -> Result<()> {
        self.session.authenticate(token).await
    }

    pub fn state(&self) -> MutationState {
        match self.session.state() {
            SessionState::Closed => MutationState::Disconnected,
            SessionState::Connected | SessionState::Rejected => MutationState::Connected,
            SessionState::Authenticated if !self.registered && self.host.is_empty() => {
                MutationState::Authenticated
            }
            SessionState::Authenticated if self.polled => MutationState::Polling,
            SessionState::Authenticated => MutationState::Registered,
        }
    }

    pub fn host(&self) -> &Arc<MutatorHost> {
        &self.host
    }

    pub fn participant_id(&self) -> ParticipantId {
        self.session.protocol().participant_id
    }

    /// Outcomes waiting to go out with the next poll or report.
    pub fn pending_results(&self) -> &[CommandResult] {
        &self.outbox
    }

    /// Host mutators this session has not announced yet.
    pub fn unannounced(&self) -> Vec<MutatorId> {
        self.host.ids().into_iter().filter(|id| !self.announced.contains(id)).collect()
    }

    /// Register and announce. Ids must be new to this call and to the client.
    ///
    /// Registration is kept even if an announcement fails; whatever was not
    /// announced goes out before the next poll.
    pub async fn register_mutators(
        &mut self,
        mutators: Vec<(MutatorId, Arc<dyn Mutator>)>,
    ) -> Result<()> {
        self.require_authenticated()?;
        let mut seen = HashSet::new();
        for (id, _) in &mutators {
            if !seen.insert(*id) || self.host.contains(*id) {
                return Err(Error::DuplicateMutatorId(*id));
            }
        }
        self.host.register_all(mutators)?;
        self.registered = true;
        self.announce_pending().await
    }

    /// Announce every host mutator this session has not announced yet.
    pub async fn announce_pending(&mut self) -> Result<()> {
        self.require_authenticated()?;
        for id in self.unannounced() {
            // Removed from a shared host since `unannounced` ran.
            let Some(descriptor) = self.host.descriptor(id) else { continue };
            self.announce(id, &descriptor).await?;
            self.announced.insert(id);
        }
        Ok(())
    }

    /// Unregister one mutator, resetting it first if a mutation is active.
    pub async fn retire_mutator(&mut self, id: MutatorId) -> Result<()> {
        self.require_authenticated()?;
        if !self.host.contains(id) {
            return Err(Error::UnknownMutator(id));
        }
        if self.host.active(id).await.is_some() {
            let (mutation_id, outcome) = match self.host.reset(id).await {
                Ok(previous) => (previous, Outcome::Reset),
                Err(e) => (None, e.to_outcome()),
            };
            self.outbox.push(CommandResult {
                mutator_id: id,
                mutation_id,
                outcome,
            });
        }
        self.host.remove(id);
        self.announced.remove(&id);
        self.session
            .send_fire_and_forget(&MutationRequest::RetireMutator { mutator_id: id })
            .await?;
        tracing::debug!(mutator = %id, "mutator retired");
        Ok(())
    }

    /// One poll round-trip plus dispatch. Returns this cycle's outcomes.
    pub async fn poll(&mut self) -> Result<Vec<CommandResult>> {
        match self.state() {
            MutationState::Registered | MutationState::Polling => {}
            MutationState::Authenticated => {
                return Err(Error::InvalidState {
                    op: "poll",
                    state: "no mutators are registered",
                });
            }
            MutationState::Connected => return Err(Error::NotAuthenticated),
            MutationState::Disconnected => return Err(Error::Disconnected),
        }

        self.announce_pending().await?;

        let req = MutationRequest::Poll {
            results: std::mem::take(&mut self.outbox),
        };
        let resp = match self.session.send_request(&req).await {
            Ok(resp) => resp,
            Err(e) => {
                // Not known to be delivered; keep for the next attempt.
                if let MutationRequest::Poll { results } = req {
                    self.outbox = results;
                }
                return Err(e);
            }
        };
        self.polled = true;

        let (commands, reannounce) = match resp {
            MutationResponse::Commands {
                commands,
                reannounce,
            } => (commands, reannounce),
            other => return Err(Error::Protocol(format!("expected Commands, got {other:?}"))),
        };

        let mut cycle = Vec::new();
        for cmd in commands {
            cycle.extend(self.dispatch(cmd).await);
        }
        self.outbox.extend(cycle.iter().cloned());

        // After dispatch: if this fails, the outcomes above are still queued.
        if reannounce {
            tracing::debug!("server asked for re-announcement");
            self.announced.clear();
            self.announce_pending().await?;
        }
        Ok(cycle)
    }

    /// Send queued outcomes now instead of with the next poll.
    pub async fn report_results(&mut self) -> Result<()> {
        self.require_authenticated()?;
        if self.outbox.is_empty() {
            return Ok(());
        }
        let results = std::mem::take(&mut self.outbox);
        let req = MutationRequest::Report { results };
        match self.session.send_fire_and_forget(&req).await {
            Ok(()) => Ok(()),
            Err(e) => {
                if let MutationRequest::Report { results } = req {
                    self.outbox = results;
                }
                Err(e)
            }
        }
    }

    pub async fn close(mut self) {
        self.session.close().await;
    }

    async fn dispatch(&self, cmd: PendingCommand) -> Vec<CommandResult> {
        match cmd {
            PendingCommand::Inject {
                mutator_id,
                mutation_id,
                params,
            } => {
                let outcome = match decode_named(&params) {
                    Err(e) => Outcome::InvalidParams(e.to_string()),
                    Ok(params) => match self.host.inject(mutator_id, mutation_id, params).await {
                        Ok(()) => Outcome::Injected,
                        Err(e) => outcome_for(mutator_id, e),
                    },
                };
                vec![CommandResult {
                    mutator_id,
                    mutation_id: Some(mutation_id),
                    outcome,
                }]
            }
            PendingCommand::Reset { mutator_id } => {
                let (mutation_id, outcome) = match self.host.reset(mutator_id).await {
                    Ok(previous) => (previous, Outcome::Reset),
                    Err(e) => (None, outcome_for(mutator_id, e)),
                };
                vec![CommandResult {
                    mutator_id,
                    mutation_id,
                    outcome,
                }]
            }
            PendingCommand::ResetAll => self
                .host
                .reset_all()
                .await
                .into_iter()
                .map(|(mutator_id, res)| match res {
                    Ok(previous) => CommandResult {
                        mutator_id,
                        mutation_id: previous,
                        outcome: Outcome::Reset,
                    },
                    Err(e) => CommandResult {
                        mutator_id,
                        mutation_id: None,
                        outcome: outcome_for(mutator_id, e),
                    },
                })
                .collect(),
        }
    }

    async fn announce(&mut self, id: MutatorId, descriptor: &MutatorDescriptor) -> Result<()> {
        let attrs = encode_named(&descriptor.to_attributes());
        self.session
            .send_fire_and_forget(&MutationRequest::AnnounceMutator {
                mutator_id: id,
                attrs,
            })
            .await?;
        tracing::debug!(mutator = %id, name = %descriptor.name, "mutator announced");
        Ok(())
    }

    fn require_authenticated(&self) -> Result<()> {
        match self.session.state() {
            SessionState::Authenticated => Ok(()),
            SessionState::Closed => Err(Error::Disconnected),
            SessionState::Connected | SessionState::Rejected => Err(Error::NotAuthenticated),
        }
    }
}

fn outcome_for(mutator: MutatorId, err: CommandError) -> Outcome {
    tracing::debug!(mutator = %mutator, error = %err, "command failed");
    err.to_outcome()
}
