//! The send/receive cycle. One exchange may be outstanding across the whole
//! application; entry is an explicit check-and-set on [`App::in_flight`].

use tracing::{error, warn};

use crate::api::{flatten_transcript, ChatRequest};
use crate::core::app::{App, InFlightExchange};
use crate::core::constants::SEND_FAILURE_MESSAGE;
use crate::core::exchange::{ExchangeEvent, ExchangeParams};
use crate::core::message::Message;

impl App {
    /// Check-and-set entry into the sending state. Rejects (returning
    /// `None`, with no state change) when the trimmed input is empty or an
    /// exchange is already in flight. On acceptance the user message is
    /// appended and persisted before any network work, the input is locked,
    /// and the prepared request parameters are returned for dispatch.
    pub fn prepare_send(&mut self) -> Option<ExchangeParams> {
        if self.in_flight.is_some() {
            return None;
        }
        let text = self.ui.input_text();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return None;
        }

        self.store.ensure_active();
        let session = self.store.active_mut()?;
        session.push(Message::user(trimmed));
        let session_id = session.id.clone();
        let input = flatten_transcript(&session.history);
        if let Err(e) = self.store.persist() {
            warn!("failed to persist sessions before send: {e}");
        }

        self.ui.clear_input();
        self.ui.set_sending(true);
        self.ui.auto_scroll = true;

        self.next_exchange_id += 1;
        let exchange_id = self.next_exchange_id;
        self.in_flight = Some(InFlightExchange {
            exchange_id,
            session_id,
            buffer: String::new(),
            resolved: None,
            failed: false,
        });

        Some(ExchangeParams {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            request: ChatRequest {
                input,
                reasoning: self.reasoning,
            },
            exchange_id,
        })
    }

    /// Start an exchange for the current input, if one may start.
    pub fn begin_send(&mut self) -> bool {
        match self.prepare_send() {
            Some(params) => {
                self.service.spawn_exchange(params);
                true
            }
            None => false,
        }
    }

    /// Fold one event from the network task into the in-flight state.
    /// Events from an exchange that is no longer current are dropped.
    pub fn apply_event(&mut self, event: ExchangeEvent, exchange_id: u64) {
        let Some(in_flight) = self.in_flight.as_mut() else {
            return;
        };
        if in_flight.exchange_id != exchange_id {
            return;
        }
        match event {
            ExchangeEvent::Delta(text) => in_flight.buffer.push_str(&text),
            ExchangeEvent::Completed(text) => in_flight.resolved = Some(text),
            ExchangeEvent::Failed(detail) => {
                error!("exchange {exchange_id} failed: {detail}");
                in_flight.failed = true;
            }
            ExchangeEvent::End => self.finalize_exchange(),
        }
    }

    /// Terminal step of every exchange, success or failure: resolve the
    /// reply text, append it to the originating session, persist, and
    /// unlock input.
    fn finalize_exchange(&mut self) {
        let Some(in_flight) = self.in_flight.take() else {
            return;
        };

        let text = if in_flight.failed {
            SEND_FAILURE_MESSAGE.to_string()
        } else if let Some(resolved) = in_flight.resolved {
            resolved
        } else {
            in_flight.buffer
        };

        let appended = match self.store.get_mut(&in_flight.session_id) {
            Some(session) => {
                session.push(Message::assistant(text));
                true
            }
            None => {
                warn!(
                    "discarding reply for deleted session {}",
                    in_flight.session_id
                );
                false
            }
        };
        if appended {
            if let Err(e) = self.store.persist() {
                warn!("failed to persist sessions after reply: {e}");
            }
        }

        self.ui.set_sending(false);
        self.ui.auto_scroll = true;
    }

    pub fn new_session(&mut self) {
        self.store.create();
        self.ui.scroll_offset = 0;
        self.ui.auto_scroll = true;
    }

    /// Delete the visible session. The registry self-heals: the first
    /// remaining session becomes active, or a fresh one is created.
    pub fn delete_current(&mut self) {
        let Some(id) = self.store.active_id().map(str::to_string) else {
            return;
        };
        self.store.delete(&id);
        self.store.ensure_active();
        self.ui.scroll_offset = 0;
        self.ui.auto_scroll = true;
    }

    pub fn switch_next(&mut self) {
        self.switch_by(1);
    }

    pub fn switch_prev(&mut self) {
        self.switch_by(-1);
    }

    fn switch_by(&mut self, step: isize) {
        let sessions = self.store.sessions();
        if sessions.len() < 2 {
            return;
        }
        let Some(pos) = sessions
            .iter()
            .position(|s| Some(s.id.as_str()) == self.store.active_id())
        else {
            return;
        };
        let len = sessions.len() as isize;
        let next = (pos as isize + step).rem_euclid(len) as usize;
        let id = sessions[next].id.clone();
        self.store.switch_to(&id);
        self.ui.scroll_offset = 0;
        self.ui.auto_scroll = true;
    }
}
