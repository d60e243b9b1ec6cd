use pkttransfer_frame::{crc16_bytes, CodecState, DecodeEvent, FrameDecoder, FrameEncoder, CRC_SIZE};
use pkttransfer_link::{ByteLink, ChunkLink};
use tracing::{debug, info, trace};

use crate::config::{TransferConfig, TransferLimits};
use crate::error::{Result, TransferError, TxOverflow};
use crate::port::{BusPort, LinkIds, Port, SerialPort, TxProgress};
use crate::state::{TransferState, TransferStats};

/// Receives every payload that passed the CRC check.
///
/// The slice is only valid for the duration of the call; it points into the
/// instance's RX buffer, which is reused for the next frame.
pub trait Delivery {
    fn deliver(&mut self, payload: &[u8]);
}

impl<F> Delivery for F
where
    F: FnMut(&[u8]),
{
    fn deliver(&mut self, payload: &[u8]) {
        self(payload)
    }
}

/// What a single [`PacketTransfer::task`] call moved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskOutcome {
    /// Wire bytes handed to the link.
    pub tx_bytes: usize,
    /// Wire bytes read from the link.
    pub rx_bytes: usize,
    /// The closing delimiter of the queued frame went out.
    pub frame_sent: bool,
    /// Payloads handed to the delivery callback.
    pub frames_delivered: usize,
}

impl TaskOutcome {
    pub fn is_idle(&self) -> bool {
        self.tx_bytes == 0 && self.rx_bytes == 0
    }
}

/// Packet transfer over a byte-stream link.
pub type SerialTransfer<'buf, L, D> = PacketTransfer<'buf, SerialPort<L>, D>;

/// Packet transfer over a chunked bus link.
pub type BusTransfer<'buf, L, D> = PacketTransfer<'buf, BusPort<L>, D>;

/// One framed, CRC-checked, bidirectional packet channel.
///
/// All progress happens inside [`task`](Self::task): one TX step followed by
/// one RX step. `send` only copies the payload and its CRC into the TX
/// buffer. At most one outgoing frame is in flight at a time.
pub struct PacketTransfer<'buf, P, D> {
    port: P,
    delivery: D,
    config: TransferConfig<'buf>,
    encoder: FrameEncoder,
    decoder: FrameDecoder,
    tx_size: usize,
    stats: TransferStats,
    initialized: bool,
}

impl<'buf, L: ByteLink, D: Delivery> PacketTransfer<'buf, SerialPort<L>, D> {
    /// Bind a byte-stream link.
    pub fn serial(link: L, delivery: D, config: TransferConfig<'buf>) -> Self {
        Self::new(SerialPort::new(link), delivery, config)
    }
}

impl<'buf, L: ChunkLink, D: Delivery> PacketTransfer<'buf, BusPort<L>, D> {
    /// Bind a bus link with its outgoing and accepted identifiers.
    pub fn bus(link: L, ids: LinkIds, delivery: D, config: TransferConfig<'buf>) -> Self {
        Self::new(BusPort::new(link, ids), delivery, config)
    }

    /// Queue `payload` and stamp this and later frames with `link_id`.
    ///
    /// The identifier is only changed when the payload is accepted, so a
    /// frame in flight never switches identifiers halfway.
    pub fn send_to(&mut self, payload: &[u8], link_id: u32) -> Result<()> {
        self.send(payload)?;
        self.port.set_tx_id(link_id);
        Ok(())
    }

    /// Accept only chunks carrying `link_id` from now on.
    pub fn set_rx_link_id(&mut self, link_id: u32) {
        debug!(link_id, "rx link id changed");
        self.port.set_rx_id(link_id);
    }

    pub fn rx_link_id(&self) -> u32 {
        self.port.ids().rx
    }

    pub fn tx_link_id(&self) -> u32 {
        self.port.ids().tx
    }
}

impl<'buf, P: Port, D: Delivery> PacketTransfer<'buf, P, D> {
    /// Bind `port` and `delivery` to the buffers in `config`.
    ///
    /// Both directions start in the awaiting-delimiter state with empty
    /// buffers and zeroed counters.
    pub fn new(port: P, delivery: D, mut config: TransferConfig<'buf>) -> Self {
        config.clear_buffers();
        info!(
            link = port.kind().as_str(),
            max_payload = config.max_payload(),
            "packet transfer initialised"
        );
        Self {
            port,
            delivery,
            config,
            encoder: FrameEncoder::new(),
            decoder: FrameDecoder::new(),
            tx_size: 0,
            stats: TransferStats::default(),
            initialized: true,
        }
    }

    /// Queue one payload for transmission.
    ///
    /// Fails without touching any state when the payload is empty, larger
    /// than the configured maximum, or a previous frame is still pending.
    pub fn send(&mut self, payload: &[u8]) -> Result<()> {
        self.ensure_initialized()?;

        let max = self.config.max_payload();
        if payload.len() > max {
            return Err(TxOverflow::PayloadTooLarge {
                size: payload.len(),
                max,
            }
            .into());
        }
        if self.tx_size != 0 {
            return Err(TxOverflow::FramePending {
                remaining: self.tx_size - self.encoder.offset(),
            }
            .into());
        }
        if payload.is_empty() {
            return Err(TransferError::EmptyPayload);
        }

        let len = payload.len();
        let window = self.config.tx_window();
        window[..len].copy_from_slice(payload);
        window[len..len + CRC_SIZE].copy_from_slice(&crc16_bytes(payload));

        self.encoder.reset();
        self.tx_size = len + CRC_SIZE;
        debug!(size = len, "frame queued");
        Ok(())
    }

    /// Advance both directions by at most one hardware unit each.
    ///
    /// TX runs first; an idle or busy transmitter does not stop the receiver
    /// from running in the same call.
    pub fn task(&mut self) -> Result<TaskOutcome> {
        self.ensure_initialized()?;

        let mut outcome = TaskOutcome::default();

        if self.tx_size != 0 {
            let content = self.config.tx_content(self.tx_size);
            if let TxProgress::Sent { bytes, frame_done } =
                self.port.poll_tx(&mut self.encoder, content)
            {
                outcome.tx_bytes = bytes;
                if frame_done {
                    debug!(size = self.tx_size - CRC_SIZE, "frame sent");
                    self.tx_size = 0;
                    self.stats.frames_sent += 1;
                    outcome.frame_sent = true;
                }
            }
        }

        let rx_buf = self.config.rx_window();
        let decoder = &mut self.decoder;
        let stats = &mut self.stats;
        let delivery = &mut self.delivery;
        let mut delivered = 0;
        outcome.rx_bytes = self.port.poll_rx(|byte| match decoder.push(byte, &mut *rx_buf) {
            DecodeEvent::Pending => {}
            DecodeEvent::FrameStarted => stats.frames_started += 1,
            DecodeEvent::Frame(payload) => {
                stats.frames_received += 1;
                delivered += 1;
                debug!(size = payload.len(), "frame received");
                delivery.deliver(payload);
            }
            DecodeEvent::Dropped(reason) => {
                trace!(%reason, "dropped frame");
                stats.record_drop(reason);
            }
        });
        outcome.frames_delivered = delivered;

        Ok(outcome)
    }

    /// Mark the instance unusable and clear its buffers and counters.
    ///
    /// Later `send` and `task` calls return
    /// [`TransferError::NotInitialized`].
    pub fn deinit(&mut self) {
        if !self.initialized {
            return;
        }
        self.encoder.reset();
        self.decoder.reset();
        self.tx_size = 0;
        self.stats = TransferStats::default();
        self.config.clear_buffers();
        self.initialized = false;
        info!("packet transfer deinitialised");
    }

    pub fn is_init(&self) -> bool {
        self.initialized
    }

    pub fn config(&self) -> TransferLimits {
        self.config.limits()
    }

    pub fn stats(&self) -> &TransferStats {
        &self.stats
    }

    pub fn state(&self) -> TransferState {
        TransferState {
            initialized: self.initialized,
            tx_state: self.encoder.state(),
            tx_size: self.tx_size,
            sent_size: self.encoder.offset(),
            rx_state: self.decoder.state(),
            rx_size: self.decoder.len(),
            link_ids: self.port.link_ids(),
            stats: self.stats,
        }
    }

    /// `true` while a queued frame has not finished transmitting.
    pub fn tx_pending(&self) -> bool {
        self.tx_size != 0
    }

    pub fn tx_state(&self) -> CodecState {
        self.encoder.state()
    }

    pub fn rx_state(&self) -> CodecState {
        self.decoder.state()
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    pub fn delivery(&self) -> &D {
        &self.delivery
    }

    pub fn delivery_mut(&mut self) -> &mut D {
        &mut self.delivery
    }

    pub fn into_port(self) -> P {
        self.port
    }

    /// Release the link, the callback and the buffers.
    pub fn into_parts(self) -> (P, D, TransferConfig<'buf>) {
        (self.port, self.delivery, self.config)
    }

    fn ensure_initialized(&self) -> Result<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(TransferError::NotInitialized)
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;
    use pkttransfer_frame::encode_frame;
    use pkttransfer_link::{MemoryBus, MemoryBusNode, MemoryByteLink};

    use super::*;

    const MAX: usize = 32;

    #[derive(Debug, Default)]
    struct Inbox(Vec<Vec<u8>>);

    impl Delivery for Inbox {
        fn deliver(&mut self, payload: &[u8]) {
            self.0.push(payload.to_vec());
        }
    }

    fn wire_of(payload: &[u8]) -> Vec<u8> {
        let mut wire = BytesMut::new();
        encode_frame(payload, &mut wire).unwrap();
        wire.to_vec()
    }

    fn run_until<F: FnMut() -> bool>(mut step: F, limit: usize) {
        for _ in 0..limit {
            if step() {
                return;
            }
        }
        panic!("condition not reached in {limit} steps");
    }

    #[test]
    fn single_zero_byte_goes_out_one_byte_per_task() {
        let (link, peer) = MemoryByteLink::pair();
        let (mut tx, mut rx) = ([0u8; MAX + 2], [0u8; MAX + 2]);
        let config = TransferConfig::new(MAX, &mut tx, &mut rx).unwrap();
        let mut transfer = PacketTransfer::serial(link, Inbox::default(), config);

        transfer.send(&[0x00]).unwrap();
        assert_eq!(transfer.state().tx_size, 3);

        for expected_len in 1..=5 {
            let outcome = transfer.task().unwrap();
            assert_eq!(outcome.tx_bytes, 1);
            assert_eq!(peer.rx_len(), expected_len);
            assert_eq!(outcome.frame_sent, expected_len == 5);
        }
        assert_eq!(peer.take_rx(), vec![0x7E, 0x00, 0x78, 0xF0, 0x7E]);

        let state = transfer.state();
        assert!(state.tx_idle());
        assert_eq!(state.sent_size, 0);
        assert_eq!(state.tx_state, CodecState::AwaitingDelimiter);
        assert_eq!(transfer.stats().frames_sent, 1);

        assert!(transfer.task().unwrap().is_idle());
        assert_eq!(peer.rx_len(), 0);
    }

    #[test]
    fn reserved_bytes_are_stuffed_on_the_wire() {
        let (link, peer) = MemoryByteLink::pair();
        let (mut tx, mut rx) = ([0u8; MAX + 2], [0u8; MAX + 2]);
        let config = TransferConfig::new(MAX, &mut tx, &mut rx).unwrap();
        let mut transfer = PacketTransfer::serial(link, Inbox::default(), config);

        transfer.send(&[0x01, 0x7D, 0x02, 0x7E]).unwrap();
        run_until(|| transfer.task().unwrap().frame_sent, 20);

        assert_eq!(
            peer.take_rx(),
            vec![0x7E, 0x01, 0x7D, 0x5D, 0x02, 0x7D, 0x5E, 0x8B, 0x36, 0x7E]
        );
    }

    #[test]
    fn escape_holds_content_position() {
        let (link, _peer) = MemoryByteLink::pair();
        let (mut tx, mut rx) = ([0u8; MAX + 2], [0u8; MAX + 2]);
        let config = TransferConfig::new(MAX, &mut tx, &mut rx).unwrap();
        let mut transfer = PacketTransfer::serial(link, Inbox::default(), config);

        transfer.send(&[0x7E]).unwrap();
        transfer.task().unwrap(); // opening delimiter
        transfer.task().unwrap(); // escape prefix
        let state = transfer.state();
        assert_eq!(state.tx_state, CodecState::InEscape);
        assert_eq!(state.sent_size, 0);

        transfer.task().unwrap(); // substitute
        assert_eq!(transfer.state().sent_size, 1);
    }

    #[test]
    fn serial_roundtrip_between_two_instances() {
        let (link_a, link_b) = MemoryByteLink::pair();
        let (mut tx_a, mut rx_a) = ([0u8; MAX + 2], [0u8; MAX + 2]);
        let (mut tx_b, mut rx_b) = ([0u8; MAX + 2], [0u8; MAX + 2]);
        let mut a = PacketTransfer::serial(
            link_a,
            Inbox::default(),
            TransferConfig::new(MAX, &mut tx_a, &mut rx_a).unwrap(),
        );
        let mut b = PacketTransfer::serial(
            link_b,
            Inbox::default(),
            TransferConfig::new(MAX, &mut tx_b, &mut rx_b).unwrap(),
        );

        let payloads: [&[u8]; 3] = [b"hello", &[0x7E, 0x7D, 0x7E], &[0xFF; MAX]];
        for payload in payloads {
            a.send(payload).unwrap();
            run_until(
                || {
                    a.task().unwrap();
                    b.task().unwrap().frames_delivered == 1
                },
                4 * MAX,
            );
        }

        let expected: Vec<Vec<u8>> = payloads.iter().map(|p| p.to_vec()).collect();
        assert_eq!(b.delivery().0, expected);
        assert_eq!(b.stats().frames_received, 3);
        assert_eq!(b.stats().dropped_total(), 0);
        assert_eq!(a.stats().frames_sent, 3);
    }

    #[test]
    fn bus_roundtrip_with_id_filtering() {
        let bus = MemoryBus::new();
        let (mut tx_a, mut rx_a) = ([0u8; MAX + 2], [0u8; MAX + 2]);
        let (mut tx_b, mut rx_b) = ([0u8; MAX + 2], [0u8; MAX + 2]);
        let mut a = PacketTransfer::bus(
            bus.node(),
            LinkIds::new(0x101, 0x102),
            Inbox::default(),
            TransferConfig::new(MAX, &mut tx_a, &mut rx_a).unwrap(),
        );
        let mut b = PacketTransfer::bus(
            bus.node(),
            LinkIds::new(0x102, 0x101),
            Inbox::default(),
            TransferConfig::new(MAX, &mut tx_b, &mut rx_b).unwrap(),
        );

        let payload = [0x01, 0x7D, 0x02, 0x7E, 0x10, 0x20, 0x30, 0x40, 0x50];
        a.send(&payload).unwrap();

        let first = a.task().unwrap();
        assert_eq!(first.tx_bytes, 8);
        run_until(
            || {
                a.task().unwrap();
                b.task().unwrap().frames_delivered == 1
            },
            16,
        );

        assert_eq!(b.delivery().0, vec![payload.to_vec()]);
        assert_eq!(b.state().link_ids, Some(LinkIds::new(0x102, 0x101)));
    }

    #[test]
    fn bus_ignores_foreign_ids() {
        let bus = MemoryBus::new();
        let node = bus.node();
        let mut sender: MemoryBusNode = bus.node();
        let wire = wire_of(b"ping");
        for chunk in wire.chunks(8) {
            ChunkLink::send_chunk(&mut sender, 0x999, chunk);
        }

        let (mut tx, mut rx) = ([0u8; MAX + 2], [0u8; MAX + 2]);
        let mut transfer = PacketTransfer::bus(
            node,
            LinkIds::new(0x1, 0x2),
            Inbox::default(),
            TransferConfig::new(MAX, &mut tx, &mut rx).unwrap(),
        );
        for _ in 0..4 {
            transfer.task().unwrap();
        }

        assert!(transfer.delivery().0.is_empty());
        assert_eq!(transfer.stats().frames_started, 0);
    }

    #[test]
    fn send_to_switches_id_only_when_accepted() {
        let bus = MemoryBus::new();
        let observer = bus.node();
        let (mut tx, mut rx) = ([0u8; MAX + 2], [0u8; MAX + 2]);
        let mut transfer = PacketTransfer::bus(
            bus.node(),
            LinkIds::new(0x10, 0x20),
            Inbox::default(),
            TransferConfig::new(MAX, &mut tx, &mut rx).unwrap(),
        );

        transfer.send_to(b"a", 0x30).unwrap();
        assert_eq!(transfer.tx_link_id(), 0x30);

        let err = transfer.send_to(b"b", 0x40).unwrap_err();
        assert!(matches!(err, TransferError::TxOverflow(TxOverflow::FramePending { .. })));
        assert_eq!(transfer.tx_link_id(), 0x30);

        transfer.task().unwrap();
        assert!(observer.drain().iter().all(|(id, _)| *id == 0x30));

        transfer.set_rx_link_id(0x55);
        assert_eq!(transfer.rx_link_id(), 0x55);
    }

    #[test]
    fn oversized_payload_is_rejected_without_state_change() {
        let (link, peer) = MemoryByteLink::pair();
        let (mut tx, mut rx) = ([0u8; 6], [0u8; 6]);
        let config = TransferConfig::new(4, &mut tx, &mut rx).unwrap();
        let mut transfer = PacketTransfer::serial(link, Inbox::default(), config);

        let before = transfer.state();
        let err = transfer.send(b"12345").unwrap_err();
        assert_eq!(
            err,
            TransferError::TxOverflow(TxOverflow::PayloadTooLarge { size: 5, max: 4 })
        );
        assert_eq!(transfer.state(), before);

        transfer.send(b"1234").unwrap();
        run_until(|| transfer.task().unwrap().frame_sent, 32);
        assert!(!peer.take_rx().is_empty());
    }

    #[test]
    fn second_send_while_pending_is_rejected() {
        let (link, _peer) = MemoryByteLink::pair();
        let (mut tx, mut rx) = ([0u8; MAX + 2], [0u8; MAX + 2]);
        let config = TransferConfig::new(MAX, &mut tx, &mut rx).unwrap();
        let mut transfer = PacketTransfer::serial(link, Inbox::default(), config);

        transfer.send(b"abc").unwrap();
        transfer.task().unwrap();
        transfer.task().unwrap();

        let err = transfer.send(b"xyz").unwrap_err();
        assert_eq!(
            err,
            TransferError::TxOverflow(TxOverflow::FramePending { remaining: 4 })
        );
        assert!(transfer.tx_pending());

        run_until(|| transfer.task().unwrap().frame_sent, 16);
        transfer.send(b"xyz").unwrap();
    }

    #[test]
    fn empty_payload_is_rejected() {
        let (link, _peer) = MemoryByteLink::pair();
        let (mut tx, mut rx) = ([0u8; MAX + 2], [0u8; MAX + 2]);
        let config = TransferConfig::new(MAX, &mut tx, &mut rx).unwrap();
        let mut transfer = PacketTransfer::serial(link, Inbox::default(), config);

        assert_eq!(transfer.send(&[]), Err(TransferError::EmptyPayload));
        assert!(!transfer.tx_pending());
    }

    #[test]
    fn corrupted_frame_is_dropped_and_next_frame_delivered() {
        let (link, _peer) = MemoryByteLink::pair();
        let mut bad = wire_of(b"bad!");
        bad[2] ^= 0x01;
        link.push_rx(&bad);
        link.push_rx(&wire_of(b"good"));
        let total = link.rx_len();

        let (mut tx, mut rx) = ([0u8; MAX + 2], [0u8; MAX + 2]);
        let config = TransferConfig::new(MAX, &mut tx, &mut rx).unwrap();
        let mut transfer = PacketTransfer::serial(link, Inbox::default(), config);
        for _ in 0..total {
            assert_eq!(transfer.task().unwrap().rx_bytes, 1);
        }

        assert_eq!(transfer.delivery().0, vec![b"good".to_vec()]);
        assert_eq!(transfer.stats().dropped_crc, 1);
        assert_eq!(transfer.stats().frames_received, 1);
    }

    #[test]
    fn receiver_resyncs_after_garbage_and_overflow() {
        let (link, _peer) = MemoryByteLink::pair();
        link.push_rx(&[0x11, 0x22, 0x7D]);
        link.push_rx(&wire_of(&[0xAB; 10]));
        link.push_rx(&wire_of(b"ok"));
        let total = link.rx_len();

        let (mut tx, mut rx) = ([0u8; 6], [0u8; 6]);
        let config = TransferConfig::new(4, &mut tx, &mut rx).unwrap();
        let mut transfer = PacketTransfer::serial(link, Inbox::default(), config);
        for _ in 0..total {
            transfer.task().unwrap();
        }

        assert_eq!(transfer.delivery().0, vec![b"ok".to_vec()]);
        assert_eq!(transfer.stats().dropped_overflow, 1);
    }

    #[test]
    fn tx_runs_before_rx_in_the_same_task() {
        let link = MemoryByteLink::loopback();
        let (mut tx, mut rx) = ([0u8; MAX + 2], [0u8; MAX + 2]);
        let config = TransferConfig::new(MAX, &mut tx, &mut rx).unwrap();
        let mut transfer = PacketTransfer::serial(link, Inbox::default(), config);

        transfer.send(b"echo").unwrap();
        let outcome = transfer.task().unwrap();
        assert_eq!(outcome.tx_bytes, 1);
        assert_eq!(outcome.rx_bytes, 1);
        assert_eq!(transfer.rx_state(), CodecState::InFrame);
        assert_eq!(transfer.stats().frames_started, 1);

        run_until(|| transfer.task().unwrap().frames_delivered == 1, 16);
        assert_eq!(transfer.delivery().0, vec![b"echo".to_vec()]);
        assert_eq!(transfer.stats().frames_started, 1);
    }

    #[test]
    fn garbage_between_frames_counts_its_own_start() {
        let (link, _peer) = MemoryByteLink::pair();
        link.push_rx(&wire_of(&[0x00]));
        link.push_rx(&[0x11, 0x22]);
        link.push_rx(&wire_of(&[0x00]));
        let total = link.rx_len();

        let (mut tx, mut rx) = ([0u8; MAX + 2], [0u8; MAX + 2]);
        let config = TransferConfig::new(MAX, &mut tx, &mut rx).unwrap();
        let mut transfer = PacketTransfer::serial(link, Inbox::default(), config);
        for _ in 0..total {
            transfer.task().unwrap();
        }

        let stats = transfer.stats();
        assert_eq!(transfer.delivery().0, vec![vec![0x00], vec![0x00]]);
        assert_eq!(stats.frames_received, 2);
        assert_eq!(stats.dropped_runt, 1);
        assert_eq!(stats.frames_started, 3);
        assert!(stats.frames_started >= stats.frames_received + stats.dropped_total());
    }

    #[test]
    fn shared_delimiter_counts_one_start_per_frame() {
        let (link, _peer) = MemoryByteLink::pair();
        let second = wire_of(b"two");
        link.push_rx(&wire_of(b"one"));
        link.push_rx(&second[1..]);
        link.push_rx(&[0x7E, 0x7E]);
        let total = link.rx_len();

        let (mut tx, mut rx) = ([0u8; MAX + 2], [0u8; MAX + 2]);
        let config = TransferConfig::new(MAX, &mut tx, &mut rx).unwrap();
        let mut transfer = PacketTransfer::serial(link, Inbox::default(), config);
        for _ in 0..total {
            transfer.task().unwrap();
        }

        let stats = transfer.stats();
        assert_eq!(transfer.delivery().0, vec![b"one".to_vec(), b"two".to_vec()]);
        assert_eq!(stats.frames_started, 2);
        assert_eq!(stats.frames_received, 2);
        assert!(stats.frames_started >= stats.frames_received + stats.dropped_total());
    }

    #[test]
    fn blocked_transmitter_does_not_advance() {
        let (link, _peer) = MemoryByteLink::pair_with_capacity(0);
        let (mut tx, mut rx) = ([0u8; MAX + 2], [0u8; MAX + 2]);
        let config = TransferConfig::new(MAX, &mut tx, &mut rx).unwrap();
        let mut transfer = PacketTransfer::serial(link, Inbox::default(), config);

        transfer.send(b"stuck").unwrap();
        for _ in 0..3 {
            assert!(transfer.task().unwrap().is_idle());
        }
        let state = transfer.state();
        assert_eq!(state.tx_size, 7);
        assert_eq!(state.sent_size, 0);
        assert_eq!(state.tx_state, CodecState::AwaitingDelimiter);
    }

    #[test]
    fn closure_delivery() {
        let link = MemoryByteLink::loopback();
        let (mut tx, mut rx) = ([0u8; MAX + 2], [0u8; MAX + 2]);
        let config = TransferConfig::new(MAX, &mut tx, &mut rx).unwrap();
        let mut count = 0usize;
        {
            let mut transfer =
                PacketTransfer::serial(link, |_: &[u8]| count += 1, config);
            transfer.send(b"x").unwrap();
            run_until(|| transfer.task().unwrap().frames_delivered == 1, 16);
        }
        assert_eq!(count, 1);
    }

    #[test]
    fn deinit_refuses_further_work() {
        let (link, _peer) = MemoryByteLink::pair();
        let (mut tx, mut rx) = ([0u8; MAX + 2], [0u8; MAX + 2]);
        let config = TransferConfig::new(MAX, &mut tx, &mut rx).unwrap();
        let mut transfer = PacketTransfer::serial(link, Inbox::default(), config);

        transfer.send(b"abc").unwrap();
        transfer.task().unwrap();
        assert!(transfer.is_init());

        transfer.deinit();
        assert!(!transfer.is_init());
        assert_eq!(transfer.send(b"abc"), Err(TransferError::NotInitialized));
        assert_eq!(transfer.task(), Err(TransferError::NotInitialized));

        let state = transfer.state();
        assert_eq!(state.tx_size, 0);
        assert_eq!(state.stats, TransferStats::default());
    }

    #[test]
    fn deinit_clears_caller_buffers() {
        let (link, _peer) = MemoryByteLink::pair();
        let (mut tx, mut rx) = ([0u8; MAX + 2], [0u8; MAX + 2]);
        {
            let config = TransferConfig::new(MAX, &mut tx, &mut rx).unwrap();
            let mut transfer = PacketTransfer::serial(link, Inbox::default(), config);
            transfer.send(b"secret").unwrap();
            transfer.deinit();
        }
        assert!(tx.iter().all(|&b| b == 0));
    }

    #[test]
    fn config_reports_limits() {
        let (link, _peer) = MemoryByteLink::pair();
        let (mut tx, mut rx) = ([0u8; 40], [0u8; 20]);
        let config = TransferConfig::new(16, &mut tx, &mut rx).unwrap();
        let transfer = PacketTransfer::serial(link, Inbox::default(), config);

        let limits = transfer.config();
        assert_eq!(limits.max_payload, 16);
        assert_eq!(limits.tx_capacity, 40);
        assert_eq!(limits.rx_capacity, 20);
        assert_eq!(transfer.state().link_ids, None);
    }
}
