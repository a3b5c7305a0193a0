//! Sans-IO link state machine.
//!
//! [`Core`] owns the sequence counters, the window and the timer deadline
//! table of one connection. It consumes received [`Apdu`]s, commands and
//! clock ticks, and produces APDUs to transmit plus [`Event`]s for the
//! owner. It never performs I/O; the async driver in the parent module
//! feeds it.

use std::collections::VecDeque;

use bytes::Bytes;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use super::SessionState;
use crate::codec::Apdu;
use crate::config::{Config, Params};
use crate::error::{AbortReason, CodecError, FrameError, Iec104Error, Result};
use crate::types::{seq_distance, seq_next, Apci, Asdu, UFunction, MAX_PAYLOAD_LENGTH};

/// Output of the state machine for the session owner.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Link state transition.
    StateChanged {
        /// Previous state
        old: SessionState,
        /// New state
        new: SessionState,
    },
    /// A received I-frame payload decoded successfully.
    Asdu(Asdu),
    /// A received I-frame payload failed to decode. The link stays up.
    DecodeError(CodecError),
    /// The session was torn down.
    Aborted(AbortReason),
}

/// Link state machine of one IEC 104 connection.
#[derive(Debug)]
pub struct Core {
    params: Params,
    config: Config,
    state: SessionState,
    send_seq: u16,
    recv_seq: u16,
    ack_seq: u16,
    unacked_recv: u16,
    /// Sent, unacknowledged I-frames with their t1 deadline, oldest first.
    pending: VecDeque<(u16, Instant)>,
    /// STARTDT or STOPDT activation awaiting its confirmation.
    control: Option<(UFunction, Instant)>,
    /// TESTFR activation awaiting its confirmation.
    test: Option<Instant>,
    t2: Option<Instant>,
    t3: Option<Instant>,
    outbox: VecDeque<Apdu>,
    events: VecDeque<Event>,
    abort: Option<AbortReason>,
}

impl Core {
    /// Create a state machine for a connection being established.
    pub fn new(params: Params, config: Config) -> Self {
        Self {
            params,
            config,
            state: SessionState::Connecting,
            send_seq: 0,
            recv_seq: 0,
            ack_seq: 0,
            unacked_recv: 0,
            pending: VecDeque::new(),
            control: None,
            test: None,
            t2: None,
            t3: None,
            outbox: VecDeque::new(),
            events: VecDeque::new(),
            abort: None,
        }
    }

    /// Current link state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Parameter set used to decode received payloads.
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Timer and window configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// N(S) of the next I-frame to send.
    pub fn send_seq(&self) -> u16 {
        self.send_seq
    }

    /// N(S) expected in the next received I-frame.
    pub fn recv_seq(&self) -> u16 {
        self.recv_seq
    }

    /// Oldest sequence number not yet acknowledged by the peer.
    pub fn ack_seq(&self) -> u16 {
        self.ack_seq
    }

    /// Sent I-frames awaiting acknowledgment.
    pub fn unacked_sent(&self) -> u16 {
        seq_distance(self.ack_seq, self.send_seq)
    }

    /// Received I-frames not yet acknowledged to the peer.
    pub fn unacked_received(&self) -> u16 {
        self.unacked_recv
    }

    /// Whether another I-frame fits in the send window.
    pub fn window_available(&self) -> bool {
        self.unacked_sent() < self.config.k
    }

    /// Closing or disconnected.
    pub fn is_closed(&self) -> bool {
        matches!(
            self.state,
            SessionState::Closing | SessionState::Disconnected
        )
    }

    /// Why the session was aborted, if it was.
    pub fn abort_reason(&self) -> Option<&AbortReason> {
        self.abort.as_ref()
    }

    /// The stream is up; start t3.
    pub fn connected(&mut self, now: Instant) {
        if self.state != SessionState::Connecting {
            return;
        }
        self.t3 = Some(now + self.config.t3);
        self.set_state(SessionState::ConnectedIdle);
    }

    /// Send STARTDT act and time its confirmation with t1.
    pub fn start_data_transfer(&mut self, now: Instant) -> Result<()> {
        if self.state != SessionState::ConnectedIdle || self.control.is_some() {
            return Err(Iec104Error::InvalidState {
                operation: "STARTDT",
                state: self.state,
            });
        }
        self.control = Some((UFunction::StartDtAct, now + self.config.t1));
        self.transmit(Apdu::u_frame(UFunction::StartDtAct));
        Ok(())
    }

    /// Send STOPDT act and time its confirmation with t1.
    pub fn stop_data_transfer(&mut self, now: Instant) -> Result<()> {
        if self.state != SessionState::DataTransfer || self.control.is_some() {
            return Err(Iec104Error::InvalidState {
                operation: "STOPDT",
                state: self.state,
            });
        }
        self.control = Some((UFunction::StopDtAct, now + self.config.t1));
        self.transmit(Apdu::u_frame(UFunction::StopDtAct));
        Ok(())
    }

    /// Wrap an encoded ASDU into the next I-frame.
    ///
    /// The frame carries the current N(R), which acknowledges everything
    /// received so far.
    pub fn send_asdu(&mut self, payload: Bytes, now: Instant) -> Result<()> {
        if self.state != SessionState::DataTransfer {
            return Err(Iec104Error::InvalidState {
                operation: "send ASDU",
                state: self.state,
            });
        }
        if payload.len() > MAX_PAYLOAD_LENGTH {
            return Err(FrameError::PayloadTooLarge(payload.len()).into());
        }
        if !self.window_available() {
            return Err(Iec104Error::WindowFull);
        }

        let seq = self.send_seq;
        self.transmit(Apdu::i_frame(seq, self.recv_seq, payload));
        self.pending.push_back((seq, now + self.config.t1));
        self.send_seq = seq_next(seq);
        self.unacked_recv = 0;
        self.t2 = None;
        Ok(())
    }

    /// Process one received frame.
    pub fn handle_apdu(&mut self, apdu: Apdu, now: Instant) {
        if self.is_closed() {
            return;
        }
        trace!(frame = %apdu, "rx");
        self.t3 = Some(now + self.config.t3);

        match apdu.apci {
            Apci::IFrame { send_seq, recv_seq } => {
                self.on_i_frame(send_seq, recv_seq, apdu.payload, now)
            }
            Apci::SFrame { recv_seq } => {
                self.acknowledge(recv_seq);
            }
            Apci::UFrame { function } => self.on_u_frame(function),
        }
    }

    /// Earliest armed deadline.
    pub fn poll_timeout(&self) -> Option<Instant> {
        [
            self.pending.front().map(|&(_, deadline)| deadline),
            self.control.map(|(_, deadline)| deadline),
            self.test,
            self.t2,
            self.t3,
        ]
        .into_iter()
        .flatten()
        .min()
    }

    /// Fire every deadline at or before `now`.
    pub fn handle_timeout(&mut self, now: Instant) {
        if self.is_closed() {
            return;
        }

        if let Some(&(seq, deadline)) = self.pending.front() {
            if deadline <= now {
                return self.abort(AbortReason::AckTimeout(seq));
            }
        }
        if let Some((function, deadline)) = self.control {
            if deadline <= now {
                let reason = match function {
                    UFunction::StartDtAct => AbortReason::ActivationTimeout,
                    _ => AbortReason::DeactivationTimeout,
                };
                return self.abort(reason);
            }
        }
        if self.test.is_some_and(|deadline| deadline <= now) {
            return self.abort(AbortReason::TestFrameTimeout);
        }

        if self.t2.is_some_and(|deadline| deadline <= now) {
            self.t2 = None;
            if self.unacked_recv > 0 {
                debug!(recv_seq = self.recv_seq, "t2 expired, acknowledging");
                self.send_ack();
            }
        }
        if self.t3.is_some_and(|deadline| deadline <= now) {
            self.t3 = None;
            if self.test.is_none() {
                debug!("t3 expired, testing link");
                self.test = Some(now + self.config.t1);
                self.transmit(Apdu::u_frame(UFunction::TestFrAct));
            }
        }
    }

    /// Tear the session down. Only the first call has an effect.
    pub fn abort(&mut self, reason: AbortReason) {
        if self.is_closed() {
            return;
        }
        warn!(%reason, state = ?self.state, "session aborted");
        self.abort = Some(reason.clone());
        self.stop_timers();
        self.outbox.clear();
        self.set_state(SessionState::Closing);
        self.events.push_back(Event::Aborted(reason));
    }

    /// Begin an orderly local close.
    pub fn close(&mut self) {
        if self.is_closed() {
            return;
        }
        debug!(state = ?self.state, "closing session");
        self.stop_timers();
        self.set_state(SessionState::Closing);
    }

    /// The stream has been released.
    pub fn finish(&mut self) {
        if self.state == SessionState::Closing {
            self.set_state(SessionState::Disconnected);
        }
    }

    /// Next frame to write to the stream.
    pub fn poll_transmit(&mut self) -> Option<Apdu> {
        self.outbox.pop_front()
    }

    /// Next event for the owner.
    pub fn poll_event(&mut self) -> Option<Event> {
        self.events.pop_front()
    }

    fn on_i_frame(&mut self, send_seq: u16, recv_seq: u16, payload: Bytes, now: Instant) {
        if self.state != SessionState::DataTransfer {
            return self.abort(AbortReason::UnexpectedIFrame(self.state));
        }
        if send_seq != self.recv_seq {
            return self.abort(AbortReason::SequenceError {
                expected: self.recv_seq,
                actual: send_seq,
            });
        }
        if !self.acknowledge(recv_seq) {
            return;
        }

        self.recv_seq = seq_next(self.recv_seq);
        self.unacked_recv += 1;
        if self.unacked_recv >= self.config.w {
            self.send_ack();
        } else if self.t2.is_none() {
            self.t2 = Some(now + self.config.t2);
        }

        match Asdu::decode(&payload, &self.params) {
            Ok(asdu) => self.events.push_back(Event::Asdu(asdu)),
            Err(e) => {
                debug!(error = %e, seq = send_seq, "undecodable ASDU");
                self.events.push_back(Event::DecodeError(e));
            }
        }
    }

    fn on_u_frame(&mut self, function: UFunction) {
        if let Some(confirmation) = function.confirmation() {
            return self.on_activation(function, confirmation);
        }
        match function {
            UFunction::TestFrCon => {
                if self.test.take().is_none() {
                    trace!("unsolicited TESTFR con ignored");
                }
            }
            UFunction::StartDtCon => match self.control {
                Some((UFunction::StartDtAct, _)) => {
                    self.control = None;
                    self.set_state(SessionState::DataTransfer);
                }
                _ if self.state == SessionState::DataTransfer => {
                    trace!("STARTDT con in data transfer ignored");
                }
                _ => self.abort(AbortReason::UnexpectedConfirmation(function, self.state)),
            },
            UFunction::StopDtCon => match self.control {
                Some((UFunction::StopDtAct, _)) => {
                    self.control = None;
                    self.set_state(SessionState::ConnectedIdle);
                }
                _ if self.state == SessionState::ConnectedIdle => {
                    trace!("STOPDT con while idle ignored");
                }
                _ => self.abort(AbortReason::UnexpectedConfirmation(function, self.state)),
            },
            UFunction::StartDtAct | UFunction::StopDtAct | UFunction::TestFrAct => {}
        }
    }

    /// Answer an activation from the peer.
    fn on_activation(&mut self, function: UFunction, confirmation: UFunction) {
        // Received I-frames are acknowledged before data transfer stops.
        if function == UFunction::StopDtAct && self.unacked_recv > 0 {
            self.send_ack();
        }
        self.transmit(Apdu::u_frame(confirmation));

        let next = match (function, self.state) {
            (UFunction::StartDtAct, SessionState::ConnectedIdle) => SessionState::DataTransfer,
            (UFunction::StopDtAct, SessionState::DataTransfer) => SessionState::ConnectedIdle,
            _ => return,
        };
        self.control = None;
        self.set_state(next);
    }

    /// Apply a received N(R). Returns false if the session was aborted.
    fn acknowledge(&mut self, ack: u16) -> bool {
        let acked = seq_distance(self.ack_seq, ack);
        if acked > self.unacked_sent() {
            self.abort(AbortReason::AckOutOfRange {
                ack,
                oldest: self.ack_seq,
                next: self.send_seq,
            });
            return false;
        }
        if acked > 0 {
            trace!(ack, acked, "peer acknowledged");
            self.pending.drain(..usize::from(acked));
            self.ack_seq = ack;
        }
        true
    }

    fn send_ack(&mut self) {
        self.transmit(Apdu::s_frame(self.recv_seq));
        self.unacked_recv = 0;
        self.t2 = None;
    }

    fn transmit(&mut self, apdu: Apdu) {
        trace!(frame = %apdu, "tx");
        self.outbox.push_back(apdu);
    }

    fn stop_timers(&mut self) {
        self.pending.clear();
        self.control = None;
        self.test = None;
        self.t2 = None;
        self.t3 = None;
    }

    fn set_state(&mut self, new: SessionState) {
        let old = self.state;
        if old == new {
            return;
        }
        info!(?old, ?new, "session state changed");
        self.state = new;
        self.events.push_back(Event::StateChanged { old, new });
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::types::{Cot, Element, InfoObject, TypeId};

    fn config() -> Config {
        Config::new()
            .t1(Duration::from_secs(4))
            .t2(Duration::from_secs(2))
            .t3(Duration::from_secs(8))
            .k(3)
            .w(2)
    }

    fn drain_tx(core: &mut Core) -> Vec<Apci> {
        std::iter::from_fn(|| core.poll_transmit())
            .map(|apdu| apdu.apci)
            .collect()
    }

    fn drain_events(core: &mut Core) -> Vec<Event> {
        std::iter::from_fn(|| core.poll_event()).collect()
    }

    fn active(now: Instant) -> Core {
        let mut core = Core::new(Params::WIDE, config());
        core.connected(now);
        core.start_data_transfer(now).unwrap();
        core.handle_apdu(Apdu::u_frame(UFunction::StartDtCon), now);
        drain_tx(&mut core);
        drain_events(&mut core);
        core
    }

    fn payload() -> Bytes {
        Asdu::interrogation_command(1, 20)
            .encode(&Params::WIDE)
            .unwrap()
    }

    fn i_frame(send_seq: u16, recv_seq: u16) -> Apdu {
        Apdu::i_frame(send_seq, recv_seq, payload())
    }

    #[test]
    fn test_connect_and_start() {
        let now = Instant::now();
        let mut core = Core::new(Params::WIDE, config());
        assert_eq!(core.state(), SessionState::Connecting);
        assert_eq!(core.poll_timeout(), None);

        core.connected(now);
        assert_eq!(core.state(), SessionState::ConnectedIdle);
        assert_eq!(core.poll_timeout(), Some(now + Duration::from_secs(8)));

        core.start_data_transfer(now).unwrap();
        assert_eq!(
            drain_tx(&mut core),
            vec![Apci::u_frame(UFunction::StartDtAct)]
        );
        assert_eq!(core.poll_timeout(), Some(now + Duration::from_secs(4)));

        core.handle_apdu(Apdu::u_frame(UFunction::StartDtCon), now);
        assert_eq!(core.state(), SessionState::DataTransfer);
        assert_eq!(
            drain_events(&mut core),
            vec![
                Event::StateChanged {
                    old: SessionState::Connecting,
                    new: SessionState::ConnectedIdle
                },
                Event::StateChanged {
                    old: SessionState::ConnectedIdle,
                    new: SessionState::DataTransfer
                },
            ]
        );
    }

    #[test]
    fn test_start_rejected_outside_idle() {
        let now = Instant::now();
        let mut core = Core::new(Params::WIDE, config());
        assert!(matches!(
            core.start_data_transfer(now),
            Err(Iec104Error::InvalidState {
                state: SessionState::Connecting,
                ..
            })
        ));

        core.abort(AbortReason::PeerClosed);
        core.finish();
        assert_eq!(core.state(), SessionState::Disconnected);
        assert!(matches!(
            core.start_data_transfer(now),
            Err(Iec104Error::InvalidState {
                state: SessionState::Disconnected,
                ..
            })
        ));
        assert!(drain_tx(&mut core).is_empty());

        let mut core = active(now);
        assert!(core.start_data_transfer(now).is_err());
    }

    #[test]
    fn test_startdt_con_in_transfer_ignored() {
        let now = Instant::now();
        let mut core = active(now);
        core.handle_apdu(Apdu::u_frame(UFunction::StartDtCon), now);
        assert_eq!(core.state(), SessionState::DataTransfer);
        assert!(drain_events(&mut core).is_empty());
        assert!(core.abort_reason().is_none());
    }

    #[test]
    fn test_activation_timeout() {
        let now = Instant::now();
        let mut core = Core::new(Params::WIDE, config());
        core.connected(now);
        core.start_data_transfer(now).unwrap();

        core.handle_timeout(now + Duration::from_secs(3));
        assert_eq!(core.state(), SessionState::ConnectedIdle);

        core.handle_timeout(now + Duration::from_secs(4));
        assert_eq!(core.state(), SessionState::Closing);
        assert_eq!(
            core.abort_reason(),
            Some(&AbortReason::ActivationTimeout)
        );
        assert_eq!(
            drain_events(&mut core).last(),
            Some(&Event::Aborted(AbortReason::ActivationTimeout))
        );
        assert_eq!(core.poll_timeout(), None);
    }

    #[test]
    fn test_peer_starts_data_transfer() {
        let now = Instant::now();
        let mut core = Core::new(Params::WIDE, config());
        core.connected(now);
        core.handle_apdu(Apdu::u_frame(UFunction::StartDtAct), now);
        assert_eq!(core.state(), SessionState::DataTransfer);
        assert_eq!(
            drain_tx(&mut core),
            vec![Apci::u_frame(UFunction::StartDtCon)]
        );
    }

    #[test]
    fn test_repeated_startdt_act_confirmed() {
        let now = Instant::now();
        let mut core = active(now);
        core.handle_apdu(Apdu::u_frame(UFunction::StartDtAct), now);
        assert_eq!(
            drain_tx(&mut core),
            vec![Apci::u_frame(UFunction::StartDtCon)]
        );
        assert_eq!(core.state(), SessionState::DataTransfer);
        assert!(drain_events(&mut core)
            .iter()
            .all(|e| !matches!(e, Event::StateChanged { .. })));
    }

    #[test]
    fn test_window_enforced() {
        let now = Instant::now();
        let mut core = active(now);

        for _ in 0..3 {
            core.send_asdu(payload(), now).unwrap();
        }
        assert_eq!(core.unacked_sent(), 3);
        assert!(!core.window_available());
        assert!(matches!(
            core.send_asdu(payload(), now),
            Err(Iec104Error::WindowFull)
        ));

        core.handle_apdu(Apdu::s_frame(1), now);
        assert_eq!(core.unacked_sent(), 2);
        assert_eq!(core.ack_seq(), 1);
        core.send_asdu(payload(), now).unwrap();
        assert_eq!(
            drain_tx(&mut core),
            vec![
                Apci::i_frame(0, 0),
                Apci::i_frame(1, 0),
                Apci::i_frame(2, 0),
                Apci::i_frame(3, 0),
            ]
        );
    }

    #[test]
    fn test_send_requires_data_transfer() {
        let now = Instant::now();
        let mut core = Core::new(Params::WIDE, config());
        core.connected(now);
        assert!(matches!(
            core.send_asdu(payload(), now),
            Err(Iec104Error::InvalidState {
                state: SessionState::ConnectedIdle,
                ..
            })
        ));
    }

    #[test]
    fn test_sequence_wraparound() {
        let now = Instant::now();
        let mut core = Core::new(Params::WIDE, config().k(12));
        core.connected(now);
        core.handle_apdu(Apdu::u_frame(UFunction::StartDtAct), now);
        core.send_seq = 32766;
        core.ack_seq = 32766;

        for _ in 0..4 {
            core.send_asdu(payload(), now).unwrap();
        }
        assert_eq!(core.send_seq(), 2);
        assert_eq!(core.unacked_sent(), 4);

        core.handle_apdu(Apdu::s_frame(0), now);
        assert_eq!(core.unacked_sent(), 2);

        core.handle_apdu(Apdu::s_frame(2), now);
        assert_eq!(core.unacked_sent(), 0);
        assert!(core.abort_reason().is_none());
    }

    #[test]
    fn test_ack_out_of_range() {
        let now = Instant::now();
        let mut core = active(now);
        core.send_asdu(payload(), now).unwrap();

        core.handle_apdu(Apdu::s_frame(5), now);
        assert_eq!(
            core.abort_reason(),
            Some(&AbortReason::AckOutOfRange {
                ack: 5,
                oldest: 0,
                next: 1
            })
        );
    }

    #[test]
    fn test_ack_timeout() {
        let now = Instant::now();
        let mut core = active(now);
        core.send_asdu(payload(), now).unwrap();
        core.send_asdu(payload(), now + Duration::from_secs(1)).unwrap();

        core.handle_apdu(Apdu::s_frame(1), now + Duration::from_secs(2));
        assert_eq!(core.poll_timeout(), Some(now + Duration::from_secs(5)));

        core.handle_timeout(now + Duration::from_secs(5));
        assert_eq!(core.abort_reason(), Some(&AbortReason::AckTimeout(1)));
    }

    #[test]
    fn test_receive_acknowledges_after_w() {
        let now = Instant::now();
        let mut core = active(now);

        core.handle_apdu(i_frame(0, 0), now);
        assert!(drain_tx(&mut core).is_empty());
        assert_eq!(core.unacked_received(), 1);

        core.handle_apdu(i_frame(1, 0), now);
        assert_eq!(drain_tx(&mut core), vec![Apci::s_frame(2)]);
        assert_eq!(core.unacked_received(), 0);

        let events = drain_events(&mut core);
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], Event::Asdu(asdu) if asdu.type_id() == TypeId::InterrogationCommand));
    }

    #[test]
    fn test_t2_sends_s_frame() {
        let now = Instant::now();
        let mut core = active(now);
        core.handle_apdu(i_frame(0, 0), now);
        assert_eq!(core.poll_timeout(), Some(now + Duration::from_secs(2)));

        core.handle_timeout(now + Duration::from_secs(2));
        assert_eq!(drain_tx(&mut core), vec![Apci::s_frame(1)]);
        assert!(core.abort_reason().is_none());
    }

    #[test]
    fn test_outbound_i_frame_piggybacks_ack() {
        let now = Instant::now();
        let mut core = active(now);
        core.handle_apdu(i_frame(0, 0), now);
        core.send_asdu(payload(), now).unwrap();

        assert_eq!(drain_tx(&mut core), vec![Apci::i_frame(0, 1)]);
        assert_eq!(core.unacked_received(), 0);
        core.handle_timeout(now + Duration::from_secs(2));
        assert!(drain_tx(&mut core).is_empty());
    }

    #[test]
    fn test_sequence_error_aborts() {
        let now = Instant::now();
        let mut core = active(now);
        core.handle_apdu(i_frame(1, 0), now);
        assert_eq!(
            core.abort_reason(),
            Some(&AbortReason::SequenceError {
                expected: 0,
                actual: 1
            })
        );
        assert!(drain_tx(&mut core).is_empty());
    }

    #[test]
    fn test_i_frame_while_idle_aborts() {
        let now = Instant::now();
        let mut core = Core::new(Params::WIDE, config());
        core.connected(now);
        core.handle_apdu(i_frame(0, 0), now);
        assert_eq!(
            core.abort_reason(),
            Some(&AbortReason::UnexpectedIFrame(SessionState::ConnectedIdle))
        );
    }

    #[test]
    fn test_decode_error_does_not_abort() {
        let now = Instant::now();
        let mut core = active(now);
        core.handle_apdu(Apdu::i_frame(0, 0, Bytes::from_static(&[0xFF, 0x01])), now);

        assert!(core.abort_reason().is_none());
        assert_eq!(core.recv_seq(), 1);
        assert!(matches!(
            drain_events(&mut core).as_slice(),
            [Event::DecodeError(_)]
        ));
    }

    #[test]
    fn test_idle_test_frame() {
        let now = Instant::now();
        let mut core = active(now);

        core.handle_timeout(now + Duration::from_secs(8));
        assert_eq!(
            drain_tx(&mut core),
            vec![Apci::u_frame(UFunction::TestFrAct)]
        );

        core.handle_apdu(
            Apdu::u_frame(UFunction::TestFrCon),
            now + Duration::from_secs(9),
        );
        assert_eq!(core.poll_timeout(), Some(now + Duration::from_secs(17)));
        core.handle_timeout(now + Duration::from_secs(12));
        assert!(core.abort_reason().is_none());
    }

    #[test]
    fn test_test_frame_timeout() {
        let now = Instant::now();
        let mut core = active(now);
        core.handle_timeout(now + Duration::from_secs(8));
        core.handle_timeout(now + Duration::from_secs(12));
        assert_eq!(core.abort_reason(), Some(&AbortReason::TestFrameTimeout));
    }

    #[test]
    fn test_answers_test_frame() {
        let now = Instant::now();
        let mut core = Core::new(Params::WIDE, config());
        core.connected(now);
        core.handle_apdu(Apdu::u_frame(UFunction::TestFrAct), now);
        assert_eq!(
            drain_tx(&mut core),
            vec![Apci::u_frame(UFunction::TestFrCon)]
        );

        core.handle_apdu(Apdu::u_frame(UFunction::TestFrCon), now);
        assert!(core.abort_reason().is_none());
    }

    #[test]
    fn test_peer_stopdt_acknowledges_first() {
        let now = Instant::now();
        let mut core = active(now);
        core.handle_apdu(i_frame(0, 0), now);

        core.handle_apdu(Apdu::u_frame(UFunction::StopDtAct), now);
        assert_eq!(
            drain_tx(&mut core),
            vec![Apci::s_frame(1), Apci::u_frame(UFunction::StopDtCon)]
        );
        assert_eq!(core.state(), SessionState::ConnectedIdle);
    }

    #[test]
    fn test_stop_data_transfer() {
        let now = Instant::now();
        let mut core = active(now);
        core.stop_data_transfer(now).unwrap();
        assert_eq!(
            drain_tx(&mut core),
            vec![Apci::u_frame(UFunction::StopDtAct)]
        );

        core.handle_apdu(Apdu::u_frame(UFunction::StopDtCon), now);
        assert_eq!(core.state(), SessionState::ConnectedIdle);

        core.handle_apdu(Apdu::u_frame(UFunction::StopDtCon), now);
        assert_eq!(core.state(), SessionState::ConnectedIdle);
        assert!(core.abort_reason().is_none());
    }

    #[test]
    fn test_deactivation_timeout() {
        let now = Instant::now();
        let mut core = active(now);
        core.stop_data_transfer(now).unwrap();
        core.handle_timeout(now + Duration::from_secs(4));
        assert_eq!(
            core.abort_reason(),
            Some(&AbortReason::DeactivationTimeout)
        );
    }

    #[test]
    fn test_unsolicited_stopdt_con_aborts() {
        let now = Instant::now();
        let mut core = active(now);
        core.handle_apdu(Apdu::u_frame(UFunction::StopDtCon), now);
        assert_eq!(
            core.abort_reason(),
            Some(&AbortReason::UnexpectedConfirmation(
                UFunction::StopDtCon,
                SessionState::DataTransfer
            ))
        );
    }

    #[test]
    fn test_abort_runs_once() {
        let now = Instant::now();
        let mut core = active(now);
        core.abort(AbortReason::PeerClosed);
        core.abort(AbortReason::TestFrameTimeout);
        core.close();

        let aborts = drain_events(&mut core)
            .into_iter()
            .filter(|e| matches!(e, Event::Aborted(_)))
            .count();
        assert_eq!(aborts, 1);
        assert_eq!(core.abort_reason(), Some(&AbortReason::PeerClosed));

        core.handle_apdu(i_frame(0, 0), now);
        assert!(drain_events(&mut core).is_empty());
    }

    #[test]
    fn test_close_is_not_abort() {
        let now = Instant::now();
        let mut core = active(now);
        core.close();
        core.finish();
        assert_eq!(core.state(), SessionState::Disconnected);
        assert!(core.abort_reason().is_none());
        assert_eq!(core.poll_timeout(), None);
    }

    #[test]
    fn test_received_asdu_is_delivered() {
        let now = Instant::now();
        let mut core = active(now);
        let asdu = Asdu::new(crate::types::Identifier::new(
            TypeId::SinglePoint,
            Cot::Spontaneous,
            1,
        ))
        .with_object(InfoObject::new(
            100u32,
            Element::SinglePoint {
                value: true,
                quality: Default::default(),
            },
        ));
        let payload = asdu.encode(&Params::WIDE).unwrap();
        core.handle_apdu(Apdu::i_frame(0, 0, payload), now);

        assert_eq!(drain_events(&mut core), vec![Event::Asdu(asdu)]);
    }
}
