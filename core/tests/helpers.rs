#![allow(unused)]

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use log::{debug, trace};
use rand::rngs::OsRng;

use hwcoin_core::{
    channel::{Channel, Transport, TransportError},
    consts::Config,
    device::{Device, Poll},
    engine::Engine,
    pin::Pin,
    proto::frame::{unpack_packet, FrameHeader, Progress, Reassembler, DEFAULT_CHUNK_SIZE},
    storage::MemStorage,
    ui::{SystemClock, Ui},
};
use hwcoin_tests::{Exchange, Operator};

/// Maximum device polls per exchange
const MAX_POLLS: usize = 64;

/// Maximum response payload
const MAX_RESPONSE_LEN: usize = 8192;

/// Loopback transport, inbound packets queued by the host
#[derive(Default)]
pub struct LoopTransport {
    pub inbound: VecDeque<Vec<u8>>,
    pub outbound: Vec<Vec<u8>>,
}

impl Transport for LoopTransport {
    fn send(&mut self, packet: &[u8]) -> Result<(), TransportError> {
        self.outbound.push(packet.to_vec());
        Ok(())
    }

    fn recv(&mut self, buff: &mut [u8]) -> Result<Option<usize>, TransportError> {
        match self.inbound.pop_front() {
            Some(p) => {
                let n = p.len().min(buff.len());
                buff[..n].copy_from_slice(&p[..n]);
                Ok(Some(n))
            }
            None => Ok(None),
        }
    }
}

/// Operator state shared between the host and the device UI
#[derive(Debug)]
pub struct OperatorState {
    pub approve: bool,
    pub pins: VecDeque<Option<String>>,
    pub prompts: Vec<String>,
}

impl Default for OperatorState {
    fn default() -> Self {
        Self {
            approve: true,
            pins: VecDeque::new(),
            prompts: vec![],
        }
    }
}

/// [Ui] answering from shared operator state
#[derive(Clone, Default)]
pub struct SharedUi(pub Arc<Mutex<OperatorState>>);

impl Ui for SharedUi {
    fn confirm(&mut self, parts: &[&str]) -> bool {
        let mut s = self.0.lock().unwrap();
        s.prompts.push(parts.concat());

        debug!("confirm: {:?} ({})", parts.concat(), s.approve);

        s.approve
    }

    fn enter_pin(&mut self, _is_new: bool) -> Option<Pin> {
        let mut s = self.0.lock().unwrap();
        s.pins.pop_front().flatten().and_then(|p| Pin::new(&p))
    }

    fn show_progress(&mut self, label: &str, permille: u32) {
        trace!("progress: {} {}", label, permille);
    }

    fn show_public_key(&mut self, public_key: &[u8]) {
        trace!("public key: {}", hex::encode(public_key));
    }
}

pub type TestDeviceInner = Device<MemStorage, SharedUi, LoopTransport, SystemClock, OsRng>;

/// Simulated device driven through the framed transport
#[derive(Clone)]
pub struct TestDevice {
    pub device: Arc<Mutex<TestDeviceInner>>,
    pub ui: SharedUi,
}

impl TestDevice {
    pub fn new() -> Self {
        let config = Config::default();
        let ui = SharedUi::default();

        let engine = Engine::new(MemStorage::new(), ui.clone());
        let channel = Channel::new(LoopTransport::default(), SystemClock::new(), &config)
            .expect("channel setup failed");

        Self {
            device: Arc::new(Mutex::new(Device::new(engine, channel, &config))),
            ui,
        }
    }

    /// Prompts displayed so far
    pub fn prompts(&self) -> Vec<String> {
        self.ui.0.lock().unwrap().prompts.clone()
    }
}

/// Split a frame into report-id prefixed packets
pub fn packets(msg_type: u16, payload: &[u8]) -> Vec<Vec<u8>> {
    let h = FrameHeader::new(msg_type, payload.len() as u32)
        .to_bytes()
        .unwrap();
    let mut data = h.to_vec();
    data.extend_from_slice(payload);

    data.chunks(DEFAULT_CHUNK_SIZE)
        .map(|c| {
            let mut p = vec![0u8, DEFAULT_CHUNK_SIZE as u8];
            p.extend_from_slice(c);
            p.resize(DEFAULT_CHUNK_SIZE + 2, 0);
            p
        })
        .collect()
}

#[async_trait]
impl Exchange for TestDevice {
    async fn exchange(&self, msg_type: u16, payload: &[u8]) -> anyhow::Result<(u16, Vec<u8>)> {
        let mut d = self.device.lock().unwrap();

        let p = packets(msg_type, payload);
        trace!("tx {} packets", p.len());
        d.channel().transport().inbound.extend(p);

        // Poll until the request is handled
        let mut handled = false;
        for _ in 0..MAX_POLLS {
            match d.poll()? {
                Poll::Handled => {
                    handled = true;
                    break;
                }
                Poll::Idle => (),
                r => anyhow::bail!("unexpected poll result: {r:?}"),
            }
        }
        anyhow::ensure!(handled, "no response to message {msg_type}");

        // Reassemble the response
        let sent = std::mem::take(&mut d.channel().transport().outbound);
        trace!("rx {} packets", sent.len());

        let mut rx = Reassembler::<MAX_RESPONSE_LEN>::new();
        for s in &sent {
            let chunk = unpack_packet(s, DEFAULT_CHUNK_SIZE)
                .ok_or_else(|| anyhow::anyhow!("malformed packet: {s:02x?}"))?;

            if rx.push(chunk)? == Progress::Complete {
                break;
            }
        }

        let (t, p) = rx
            .frame()
            .ok_or_else(|| anyhow::anyhow!("incomplete response"))?;

        Ok((t, p.to_vec()))
    }
}

#[async_trait]
impl Operator for TestDevice {
    async fn set_approve(&self, approve: bool) {
        self.ui.0.lock().unwrap().approve = approve;
    }

    async fn push_pin(&self, pin: Option<&str>) {
        self.ui
            .0
            .lock()
            .unwrap()
            .pins
            .push_back(pin.map(String::from));
    }
}

/// Reset a fresh device, optionally PIN protected
pub async fn initialised(pin: Option<&str>) -> anyhow::Result<TestDevice> {
    let d = TestDevice::new();
    hwcoin_tests::init::reset(&d, &d, pin).await?;
    Ok(d)
}
