//! Matchmaking queue and session registry.
//!
//! [`Matchmaker`] is the single owner of every piece of mutable match state:
//! the waiting queue, the disconnect registry, the player index and the
//! session table. All of it sits behind one mutex, and every timer is a
//! spawned task that takes the same mutex when it fires.
//!
//! Timers are cancelled by the transition that supersedes them. Each
//! callback still re-checks its precondition (a ticket for queue and
//! disconnect entries, the session state for bot moves) before acting.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use fourfold_board::{Color, heuristic};
use tokio::task::AbortHandle;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::config::{ServerConfig, Timings};
use crate::error::Rejection;
use crate::events::EventPublisher;
use crate::protocol::{PlayerHandle, ServerMessage, SessionId, notify};
use crate::recorder::{CompletedGame, GameRecorder};
use crate::session::{GameSession, Seat, SessionSnapshot};

/// A player waiting for a partner.
#[derive(Debug)]
struct WaitingEntry {
    name: String,
    handle: PlayerHandle,
    ticket: u64,
    timer: AbortHandle,
}

/// A seated player whose connection dropped.
#[derive(Debug)]
struct DisconnectEntry {
    session_id: SessionId,
    color: Color,
    ticket: u64,
    timer: AbortHandle,
}

/// Everything guarded by the registry lock.
#[derive(Debug, Default)]
struct Registry {
    waiting: VecDeque<WaitingEntry>,
    disconnected: HashMap<String, DisconnectEntry>,
    players: HashMap<String, SessionId>,
    sessions: HashMap<SessionId, GameSession>,
    next_ticket: u64,
}

impl Registry {
    fn issue_ticket(&mut self) -> u64 {
        self.next_ticket += 1;
        self.next_ticket
    }

    fn take_waiting(&mut self, name: &str) -> Option<WaitingEntry> {
        let pos = self.waiting.iter().position(|entry| entry.name == name)?;
        self.waiting.remove(pos)
    }
}

/// Rounds a duration up to whole seconds for player-facing countdowns.
fn whole_secs(duration: Duration) -> u64 {
    duration.as_millis().div_ceil(1000) as u64
}

/// Handle to the matchmaking engine. Cheap to clone; all clones share state.
#[derive(Clone)]
pub struct Matchmaker {
    registry: Arc<Mutex<Registry>>,
    timings: Timings,
    bot_name: Arc<str>,
    recorder: Arc<dyn GameRecorder>,
    publisher: Arc<dyn EventPublisher>,
}

impl fmt::Debug for Matchmaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Matchmaker")
            .field("timings", &self.timings)
            .field("bot_name", &self.bot_name)
            .finish_non_exhaustive()
    }
}

impl Matchmaker {
    /// Creates a matchmaker with explicit timings and collaborators.
    #[instrument(skip(recorder, publisher, bot_name))]
    pub fn new(
        timings: Timings,
        bot_name: impl Into<String>,
        recorder: Arc<dyn GameRecorder>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        let bot_name: String = bot_name.into();
        info!(bot = %bot_name, "Creating matchmaker");
        Self {
            registry: Arc::new(Mutex::new(Registry::default())),
            timings,
            bot_name: bot_name.into(),
            recorder,
            publisher,
        }
    }

    /// Creates a matchmaker from server configuration.
    pub fn from_config(
        config: &ServerConfig,
        recorder: Arc<dyn GameRecorder>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self::new(*config.timings(), config.bot_name().clone(), recorder, publisher)
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `f` against this matchmaker after `delay`.
    fn schedule<F>(&self, delay: Duration, f: F) -> AbortHandle
    where
        F: FnOnce(&Matchmaker) + Send + 'static,
    {
        let this = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            f(&this);
        })
        .abort_handle()
    }

    // ─────────────────────────────────────────────────────────────
    //  Queue
    // ─────────────────────────────────────────────────────────────

    /// Puts `name` in the matchmaking queue, or pairs it with the earliest
    /// waiting player.
    ///
    /// # Errors
    ///
    /// Returns [`Rejection`] if the name is blank or reserved, or the player
    /// is already queued or seated.
    #[instrument(skip(self, handle))]
    pub fn enqueue(&self, name: &str, handle: PlayerHandle) -> Result<(), Rejection> {
        if name.trim().is_empty() {
            return Err(Rejection::InvalidName);
        }
        if name == &*self.bot_name {
            return Err(Rejection::NameReserved(name.to_string()));
        }

        let mut reg = self.lock();
        if reg.players.contains_key(name) {
            warn!("Player already in a session");
            return Err(Rejection::AlreadyInSession);
        }
        if reg.waiting.iter().any(|entry| entry.name == name) {
            warn!("Player already queued");
            return Err(Rejection::AlreadyQueued);
        }

        if let Some(partner) = reg.waiting.pop_front() {
            partner.timer.abort();
            info!(partner = %partner.name, "Pairing with waiting player");
            self.start_session(
                &mut reg,
                Seat::human(partner.name, partner.handle, Color::Red),
                Seat::human(name, handle, Color::Yellow),
            );
            return Ok(());
        }

        let ticket = reg.issue_ticket();
        let timeout = self.timings.matchmaking_timeout();
        let waiting_name = name.to_string();
        let timer = self.schedule(timeout, move |mm| mm.matchmaking_expired(&waiting_name, ticket));

        notify(
            &handle,
            ServerMessage::Waiting {
                time_left_secs: whole_secs(timeout),
            },
        );
        reg.waiting.push_back(WaitingEntry {
            name: name.to_string(),
            handle,
            ticket,
            timer,
        });
        info!(queued = reg.waiting.len(), "Player waiting for a partner");
        Ok(())
    }

    /// Fallback timer: seat the bot opposite a player nobody paired with.
    #[instrument(skip(self))]
    fn matchmaking_expired(&self, name: &str, ticket: u64) {
        let mut reg = self.lock();
        let Some(pos) = reg
            .waiting
            .iter()
            .position(|entry| entry.name == name && entry.ticket == ticket)
        else {
            debug!("Stale matchmaking timer, player no longer waiting");
            return;
        };
        let Some(entry) = reg.waiting.remove(pos) else {
            return;
        };

        info!("No partner found in time, starting bot session");
        let bot = Seat::bot(&*self.bot_name, Color::Yellow);
        self.start_session(&mut reg, Seat::human(entry.name, entry.handle, Color::Red), bot);
    }

    // ─────────────────────────────────────────────────────────────
    //  Session lifecycle
    // ─────────────────────────────────────────────────────────────

    fn start_session(&self, reg: &mut Registry, red: Seat, yellow: Seat) -> SessionId {
        let id = Uuid::new_v4().to_string();
        let session = GameSession::new(id.clone(), red, yellow);

        for seat in session.seats() {
            if !seat.is_bot {
                reg.players.insert(seat.name.clone(), id.clone());
            }
        }

        for seat in session.seats() {
            if let Some(handle) = &seat.handle {
                notify(
                    handle,
                    ServerMessage::MatchStarted {
                        session_id: id.clone(),
                        your_color: seat.color,
                        turn: session.game().turn(),
                        board: *session.game().board(),
                        opponent_name: session.seat(seat.color.opponent()).name.clone(),
                    },
                );
            }
        }

        self.publish_started(&session);
        let bot_opens = session.seat_on_turn().is_bot;
        info!(
            session_id = %id,
            red = %session.seat(Color::Red).name,
            yellow = %session.seat(Color::Yellow).name,
            "Session started"
        );
        reg.sessions.insert(id.clone(), session);

        if bot_opens {
            self.schedule_bot_move(reg, &id, self.timings.bot_opening_delay());
        }
        id
    }

    fn schedule_bot_move(&self, reg: &mut Registry, session_id: &str, delay: Duration) {
        let id = session_id.to_string();
        let timer = self.schedule(delay, move |mm| mm.bot_move(&id));
        match reg.sessions.get_mut(session_id) {
            Some(session) => {
                if let Some(previous) = session.bot_timer.replace(timer) {
                    previous.abort();
                }
            }
            None => timer.abort(),
        }
    }

    /// Bot timer: let the heuristic play if the bot still holds the turn.
    #[instrument(skip(self))]
    fn bot_move(&self, session_id: &str) {
        let mut reg = self.lock();
        let Some(session) = reg.sessions.get_mut(session_id) else {
            debug!("Stale bot timer, session gone");
            return;
        };
        session.bot_timer = None;
        if !session.is_in_progress() || !session.seat_on_turn().is_bot {
            debug!("Stale bot timer, bot not on turn");
            return;
        }

        let color = session.game().turn();
        let Some(column) = heuristic::choose_column(session.game().board(), color) else {
            warn!("Bot has no playable column");
            return;
        };
        if let Err(e) = session.play(color, column) {
            error!(column, error = %e, "Bot chose an illegal column");
            return;
        }
        self.after_move(&mut reg, session_id);
    }

    /// Applies a move from `name` in `session_id`.
    ///
    /// # Errors
    ///
    /// Returns [`Rejection`] with nothing changed if the session does not
    /// exist, `name` has no seat in it, or the move is illegal.
    #[instrument(skip(self))]
    pub fn apply_move(&self, name: &str, session_id: &str, column: usize) -> Result<(), Rejection> {
        let mut reg = self.lock();
        let Some(session) = reg.sessions.get_mut(session_id) else {
            debug!("Move for unknown session");
            return Err(Rejection::SessionNotFound);
        };
        if session.seat_of(name).is_none_or(|seat| seat.is_bot) {
            return Err(Rejection::NotInSession);
        }

        session.make_move(name, column)?;
        self.after_move(&mut reg, session_id);
        Ok(())
    }

    /// Broadcasts the new board, then either completes the session or
    /// queues the bot's reply.
    fn after_move(&self, reg: &mut Registry, session_id: &str) {
        let Some(session) = reg.sessions.get(session_id) else {
            return;
        };

        let update = ServerMessage::BoardUpdated {
            board: *session.game().board(),
            turn: session.game().turn(),
            outcome: session.game().status(),
        };
        for seat in session.seats() {
            if let Some(handle) = &seat.handle {
                notify(handle, update.clone());
            }
        }

        let finished = !session.is_in_progress();
        let bot_to_move = session.seat_on_turn().is_bot;
        if finished {
            self.complete_session(reg, session_id);
        } else if bot_to_move {
            self.schedule_bot_move(reg, session_id, self.timings.bot_response_delay());
        }
    }

    fn complete_session(&self, reg: &mut Registry, session_id: &str) {
        let cleanup_delay = self.timings.completion_cleanup();
        let id = session_id.to_string();
        let cleanup_timer = self.schedule(cleanup_delay, move |mm| mm.cleanup(&id));

        let Some(session) = reg.sessions.get_mut(session_id) else {
            cleanup_timer.abort();
            return;
        };
        if let Some(timer) = session.bot_timer.take() {
            timer.abort();
        }
        if let Some(previous) = session.cleanup_timer.replace(cleanup_timer) {
            previous.abort();
        }

        let result = CompletedGame::new(
            session_id.to_string(),
            session.seat(Color::Red).name.clone(),
            session.seat(Color::Yellow).name.clone(),
            session.winner_name().map(str::to_string),
            session.game().move_count(),
            session.duration_seconds(),
        );
        info!(
            session_id,
            winner = result.winner.as_deref().unwrap_or("draw"),
            moves = result.move_count,
            duration_secs = result.duration_secs,
            "Session completed"
        );

        // Nobody can forfeit a finished game.
        let stale: Vec<String> = reg
            .disconnected
            .iter()
            .filter(|(_, entry)| entry.session_id == session_id)
            .map(|(name, _)| name.clone())
            .collect();
        for name in stale {
            if let Some(entry) = reg.disconnected.remove(&name) {
                entry.timer.abort();
            }
        }

        self.publish_ended(&result);
        self.persist(result);
    }

    /// Removes a session and every index entry that still points at it.
    ///
    /// Safe to call more than once.
    #[instrument(skip(self))]
    pub fn cleanup(&self, session_id: &str) {
        let mut reg = self.lock();
        self.cleanup_locked(&mut reg, session_id);
    }

    fn cleanup_locked(&self, reg: &mut Registry, session_id: &str) {
        let Some(mut session) = reg.sessions.remove(session_id) else {
            debug!(session_id, "Session already cleaned up");
            return;
        };
        session.cancel_timers();

        for seat in session.seats() {
            if reg.players.get(&seat.name).is_some_and(|id| id == session_id) {
                reg.players.remove(&seat.name);
            }
            if reg
                .disconnected
                .get(&seat.name)
                .is_some_and(|entry| entry.session_id == session_id)
                && let Some(entry) = reg.disconnected.remove(&seat.name)
            {
                entry.timer.abort();
            }
        }
        info!(session_id, remaining = reg.sessions.len(), "Session cleaned up");
    }

    // ─────────────────────────────────────────────────────────────
    //  Disconnects, rejoins and leaving
    // ─────────────────────────────────────────────────────────────

    /// Marks `name` as disconnected and opens the reconnection window.
    ///
    /// A queued player is simply dropped from the queue. Nothing about the
    /// game itself changes until the window closes.
    #[instrument(skip(self))]
    pub fn handle_disconnect(&self, name: &str) {
        let mut reg = self.lock();
        self.disconnect_locked(&mut reg, name);
    }

    /// Like [`handle_disconnect`](Self::handle_disconnect), but only if
    /// `handle` is still the channel bound to `name`.
    ///
    /// A socket that was superseded by a rejoin must not disconnect the
    /// player again when it finally closes.
    #[instrument(skip(self, handle))]
    pub fn handle_connection_closed(&self, name: &str, handle: &PlayerHandle) {
        let mut reg = self.lock();
        let queued = reg
            .waiting
            .iter()
            .any(|entry| entry.name == name && entry.handle.same_channel(handle));
        let seated = reg
            .players
            .get(name)
            .and_then(|id| reg.sessions.get(id))
            .and_then(|session| session.seat_of(name))
            .and_then(|seat| seat.handle.as_ref())
            .is_some_and(|bound| bound.same_channel(handle));

        if queued || seated {
            self.disconnect_locked(&mut reg, name);
        } else {
            debug!("Closed connection no longer bound to player");
        }
    }

    fn disconnect_locked(&self, reg: &mut Registry, name: &str) {
        if let Some(entry) = reg.take_waiting(name) {
            entry.timer.abort();
            info!("Queued player disconnected, removed from queue");
            return;
        }

        let Some(session_id) = reg.players.get(name).cloned() else {
            debug!("Disconnected player has no session");
            return;
        };
        if reg.disconnected.contains_key(name) {
            debug!("Player already marked disconnected");
            return;
        }

        let ticket = reg.issue_ticket();
        let grace = self.timings.reconnect_grace();
        let Some(session) = reg.sessions.get_mut(&session_id) else {
            reg.players.remove(name);
            return;
        };
        let Some(color) = session.seat_of(name).map(|seat| seat.color) else {
            return;
        };
        session.seat_mut(color).handle = None;

        if !session.is_in_progress() {
            debug!(%session_id, "Player left a finished session");
            return;
        }

        if let Some(handle) = &session.seat(color.opponent()).handle {
            notify(
                handle,
                ServerMessage::OpponentDisconnected {
                    grace_seconds_left: whole_secs(grace),
                },
            );
        }

        let disconnected_name = name.to_string();
        let timer = self.schedule(grace, move |mm| mm.grace_expired(&disconnected_name, ticket));
        reg.disconnected.insert(
            name.to_string(),
            DisconnectEntry {
                session_id: session_id.clone(),
                color,
                ticket,
                timer,
            },
        );
        info!(%session_id, %color, grace_secs = grace.as_secs_f64(), "Player disconnected, grace window open");
    }

    /// Grace timer: the player never came back.
    #[instrument(skip(self))]
    fn grace_expired(&self, name: &str, ticket: u64) {
        let mut reg = self.lock();
        let session_id = match reg.disconnected.get(name) {
            Some(entry) if entry.ticket == ticket => entry.session_id.clone(),
            _ => {
                debug!("Stale grace timer, player already rejoined or left");
                return;
            }
        };
        info!(%session_id, "Reconnection window closed");
        self.forfeit(&mut reg, &session_id, name);
    }

    /// Ends `session_id` in favour of the player facing `name`, then cleans up
    /// immediately.
    ///
    /// Forfeits are not persisted and do not produce an `ended` event; a
    /// separate `forfeited` event is published instead.
    fn forfeit(&self, reg: &mut Registry, session_id: &str, name: &str) {
        if let Some(entry) = reg.disconnected.remove(name) {
            entry.timer.abort();
        }

        let Some(session) = reg.sessions.get(session_id) else {
            debug!(session_id, "Forfeit for a session that is already gone");
            return;
        };
        let Some(leaver) = session.seat_of(name) else {
            return;
        };

        if session.is_in_progress() {
            let winner = session.seat(leaver.color.opponent());
            if let Some(handle) = &winner.handle {
                notify(
                    handle,
                    ServerMessage::WonByForfeit {
                        winning_color: winner.color,
                    },
                );
            }
            info!(session_id, forfeited_by = name, winner = %winner.name, "Session forfeited");
            self.publish_forfeited(session_id, name, &winner.name);
        }

        self.cleanup_locked(reg, session_id);
    }

    /// Reclaims the seat of a disconnected player.
    ///
    /// # Errors
    ///
    /// Returns [`Rejection::NoPendingRejoin`] unless `name` is disconnected
    /// from exactly `session_id`.
    #[instrument(skip(self, handle))]
    pub fn rejoin(&self, name: &str, session_id: &str, handle: PlayerHandle) -> Result<(), Rejection> {
        let mut reg = self.lock();
        let pending = reg
            .disconnected
            .get(name)
            .is_some_and(|entry| entry.session_id == session_id);
        if !pending {
            warn!("Rejoin without a pending disconnect");
            return Err(Rejection::NoPendingRejoin);
        }
        let Some(entry) = reg.disconnected.remove(name) else {
            return Err(Rejection::NoPendingRejoin);
        };
        entry.timer.abort();

        let Some(session) = reg.sessions.get_mut(session_id) else {
            return Err(Rejection::SessionNotFound);
        };
        session.seat_mut(entry.color).handle = Some(handle.clone());

        let opponent = session.seat(entry.color.opponent());
        notify(
            &handle,
            ServerMessage::RejoinSucceeded {
                session_id: session_id.to_string(),
                your_color: entry.color,
                turn: session.game().turn(),
                board: *session.game().board(),
                opponent_name: opponent.name.clone(),
            },
        );
        if let Some(opponent_handle) = &opponent.handle {
            notify(opponent_handle, ServerMessage::OpponentReconnected);
        }
        info!(color = %entry.color, "Player rejoined");
        Ok(())
    }

    /// Removes `name` from wherever it is: queue, grace window or session.
    ///
    /// Leaving an in-progress session forfeits it. Idempotent.
    #[instrument(skip(self))]
    pub fn remove_player(&self, name: &str) {
        let mut reg = self.lock();
        if let Some(entry) = reg.take_waiting(name) {
            entry.timer.abort();
            info!("Player left the queue");
        }
        if let Some(entry) = reg.disconnected.remove(name) {
            entry.timer.abort();
        }

        let Some(session_id) = reg.players.get(name).cloned() else {
            return;
        };
        let in_progress = reg
            .sessions
            .get(&session_id)
            .is_some_and(GameSession::is_in_progress);
        if in_progress {
            self.forfeit(&mut reg, &session_id, name);
            return;
        }

        reg.players.remove(name);
        if let Some(session) = reg.sessions.get_mut(&session_id)
            && let Some(color) = session.seat_of(name).map(|seat| seat.color)
        {
            session.seat_mut(color).handle = None;
        }
        debug!(%session_id, "Player released from finished session");
    }

    // ─────────────────────────────────────────────────────────────
    //  Collaborators
    // ─────────────────────────────────────────────────────────────

    fn publish_started(&self, session: &GameSession) {
        let publisher = Arc::clone(&self.publisher);
        let session_id = session.id().clone();
        let red = session.seat(Color::Red).name.clone();
        let yellow = session.seat(Color::Yellow).name.clone();
        tokio::spawn(async move {
            if let Err(e) = publisher.publish_started(&session_id, &red, &yellow).await {
                warn!(%session_id, error = %e, "Failed to publish start event");
            }
        });
    }

    fn publish_ended(&self, result: &CompletedGame) {
        let publisher = Arc::clone(&self.publisher);
        let result = result.clone();
        tokio::spawn(async move {
            if let Err(e) = publisher
                .publish_ended(
                    &result.session_id,
                    &result.first_mover,
                    &result.second_mover,
                    result.winner.as_deref(),
                    result.move_count,
                    result.duration_secs,
                )
                .await
            {
                warn!(session_id = %result.session_id, error = %e, "Failed to publish end event");
            }
        });
    }

    fn publish_forfeited(&self, session_id: &str, forfeited_by: &str, winner: &str) {
        let publisher = Arc::clone(&self.publisher);
        let session_id = session_id.to_string();
        let forfeited_by = forfeited_by.to_string();
        let winner = winner.to_string();
        tokio::spawn(async move {
            if let Err(e) = publisher
                .publish_forfeited(&session_id, &forfeited_by, &winner)
                .await
            {
                warn!(%session_id, error = %e, "Failed to publish forfeit event");
            }
        });
    }

    fn persist(&self, result: CompletedGame) {
        let recorder = Arc::clone(&self.recorder);
        tokio::spawn(async move {
            let session_id = result.session_id.clone();
            if let Err(e) = recorder.record_completed_game(result).await {
                error!(%session_id, error = %e, "Failed to persist completed game");
            }
        });
    }

    // ─────────────────────────────────────────────────────────────
    //  Introspection
    // ─────────────────────────────────────────────────────────────

    /// Whether `name` is in the matchmaking queue.
    pub fn is_waiting(&self, name: &str) -> bool {
        self.lock().waiting.iter().any(|entry| entry.name == name)
    }

    /// Session `name` is seated in, if any.
    pub fn session_of(&self, name: &str) -> Option<SessionId> {
        self.lock().players.get(name).cloned()
    }

    /// Whether `name` is inside a reconnection window.
    pub fn is_disconnected(&self, name: &str) -> bool {
        self.lock().disconnected.contains_key(name)
    }

    /// Point-in-time view of a session.
    pub fn session_snapshot(&self, session_id: &str) -> Option<SessionSnapshot> {
        self.lock().sessions.get(session_id).map(GameSession::snapshot)
    }

    /// Number of players in the queue.
    pub fn waiting_count(&self) -> usize {
        self.lock().waiting.len()
    }

    /// Number of sessions in the registry, finished ones included.
    pub fn session_count(&self) -> usize {
        self.lock().sessions.len()
    }

    /// Display name of the scripted opponent.
    pub fn bot_name(&self) -> &str {
        &self.bot_name
    }
}
