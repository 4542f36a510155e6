//! Shared harness for the scenario tests
//!
//! Runs the dispatcher next to the frame loader on one thread with
//! `block_on` + `select`, on a RAM store and a recording display.

#![allow(dead_code)]

use core::future::Future;

use embassy_futures::select::{select, Either};
use embassy_futures::{block_on, yield_now};
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embedded_hal_async::delay::DelayNs;
use modlink_core::{Module, ModuleConfig, Player, SharedStore, TickOutcome};
use modlink_hal::{DisplayError, FileStore, FrameSink, OpenFlags};
use modlink_hal_ram::{RamFile, RamStore};
use modlink_protocol::{CommandId, Packet, Reply, ReplySink, Status, FRAME_SIZE};

/// Frame size used by the scenarios (8 bytes keeps assets readable)
pub const FRAME: usize = 8;

pub type TestStore = SharedStore<NoopRawMutex, RamStore>;
pub type TestPlayer = Player<NoopRawMutex, RamFile, RecordingDisplay, FRAME>;
pub type TestModule<'a> = Module<'a, NoopRawMutex, RamStore, RecordingDisplay, FRAME>;

/// Display that remembers every presented frame
#[derive(Debug, Default)]
pub struct RecordingDisplay {
    pub frames: Vec<Vec<u8>>,
    pub releases: usize,
}

impl FrameSink for RecordingDisplay {
    fn present(&mut self, frame: &[u8]) -> Result<(), DisplayError> {
        if frame.len() != FRAME {
            return Err(DisplayError::Geometry);
        }
        self.frames.push(frame.to_vec());
        Ok(())
    }

    fn release(&mut self) {
        self.releases += 1;
    }
}

/// Delay that only yields, so sleeping tasks hand control back at once
pub struct YieldDelay;

impl DelayNs for YieldDelay {
    async fn delay_ns(&mut self, _ns: u32) {
        yield_now().await;
    }
}

/// Reply sink that keeps every frame
#[derive(Debug, Default)]
pub struct Transcript(pub Vec<Reply>);

impl ReplySink for Transcript {
    type Error = core::convert::Infallible;

    async fn send(&mut self, reply: &Reply) -> Result<(), Self::Error> {
        self.0.push(reply.clone());
        Ok(())
    }
}

/// Host side of the link: numbers packets and collects replies
pub struct Host<'a> {
    pub module: TestModule<'a>,
    pub next_id: u32,
}

impl<'a> Host<'a> {
    pub fn new(storage: &'a TestStore, player: &'a TestPlayer, config: ModuleConfig) -> Self {
        Self {
            module: Module::new(storage, player, config),
            next_id: 1,
        }
    }

    /// Send one request with the next packet id
    pub async fn call(&mut self, command: CommandId, payload: &[u8]) -> Vec<Reply> {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        self.call_with_id(command, id, payload).await
    }

    pub async fn call_with_id(
        &mut self,
        command: CommandId,
        id: u32,
        payload: &[u8],
    ) -> Vec<Reply> {
        let mut buffer = [0u8; FRAME_SIZE];
        let len = Packet::encode(command, id, payload, &mut buffer).unwrap();
        self.raw(&buffer[..len]).await
    }

    /// Send an arbitrary frame
    pub async fn raw(&mut self, frame: &[u8]) -> Vec<Reply> {
        let mut transcript = Transcript::default();
        let status = match self.module.dispatch(frame, &mut transcript).await {
            Ok(status) => status,
            Err(never) => match never {},
        };
        let last = transcript.0.last().expect("dispatch sent no final frame");
        assert_eq!(last.status(), Some(status));
        transcript.0
    }

    /// Final status of a request
    pub async fn status(&mut self, command: CommandId, payload: &[u8]) -> Status {
        final_status(&self.call(command, payload).await)
    }

    /// Write `data` to `path` through open/write/close
    pub async fn upload(&mut self, path: &str, data: &[u8]) {
        assert_eq!(self.status(CommandId::Open, path.as_bytes()).await, Status::Success);
        for chunk in data.chunks(26) {
            assert_eq!(self.status(CommandId::Write, chunk).await, Status::Success);
        }
        assert_eq!(self.status(CommandId::Close, &[]).await, Status::Success);
    }

    /// `cat` a file, returning the final status and the reassembled bytes
    pub async fn cat(&mut self, path: &str) -> (Status, Vec<u8>) {
        let replies = self.call(CommandId::Cat, path.as_bytes()).await;
        let mut data = Vec::new();
        for reply in &replies[..replies.len() - 1] {
            let payload = reply.payload();
            let n = payload[0] as usize;
            data.extend_from_slice(&payload[1..1 + n]);
        }
        (final_status(&replies), data)
    }

    /// Directory listing as text, concatenated over all frames
    pub async fn ls(&mut self) -> (Status, String) {
        let replies = self.call(CommandId::Ls, &[]).await;
        let text: Vec<u8> = replies.iter().flat_map(|r| r.payload().to_vec()).collect();
        (final_status(&replies), String::from_utf8(text).unwrap())
    }
}

pub fn final_status(replies: &[Reply]) -> Status {
    replies
        .last()
        .and_then(|r| r.status())
        .expect("no final frame")
}

/// Run `body` with the frame loader task alongside
pub fn run<F: Future>(storage: &TestStore, player: &TestPlayer, body: F) -> F::Output {
    block_on(async {
        match select(player.run_loader(storage, &mut YieldDelay, 1), body).await {
            Either::First(()) => unreachable!("loader task returned"),
            Either::Second(output) => output,
        }
    })
}

/// Tick the frame timer until a frame is presented
pub async fn next_frame(player: &TestPlayer) -> u32 {
    for _ in 0..1000 {
        if let TickOutcome::Presented { frame } = player.on_frame_tick() {
            return frame;
        }
        yield_now().await;
    }
    panic!("no frame presented");
}

/// Store a file directly, bypassing the command path
pub fn put_file(store: &mut RamStore, path: &str, data: &[u8]) {
    let mut file = store
        .open(path, OpenFlags::WRITE | OpenFlags::CREATE | OpenFlags::TRUNCATE)
        .unwrap();
    store.write(&mut file, data).unwrap();
    store.close(file).unwrap();
}

/// An animation asset whose frame `i` is filled with byte `i + 1`
pub fn animation(frames: usize) -> Vec<u8> {
    (0..frames)
        .flat_map(|i| std::iter::repeat((i + 1) as u8).take(FRAME))
        .collect()
}
