//! Playback state machine
//!
//! Plain data guarded by the player's state lock. Each method is one
//! atomic transition; nothing here touches storage or the display.
//!
//! ```text
//!          begin()                   first ready buffer
//!   Idle ──────────► Loading ──────────────────────────► Playing
//!    ▲                  │                                   │
//!    └──────────────────┴───── request_stop() + ack ◄───────┘
//! ```

/// Coarse playback phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    /// No animation
    Idle,
    /// Animation started, first frame not presented yet
    Loading,
    /// Frames are being presented
    Playing,
}

/// What the loader should do next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderJob {
    /// Stop requested or nothing to play; acknowledge and exit
    Exit,
    /// Next buffer still waiting for the timer
    Wait,
    /// Read `frame` into `buffer`
    Load {
        frame: u32,
        buffer: usize,
        session: u32,
    },
}

/// Shared animation state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackState {
    pub frame_count: u32,
    /// Frame currently on screen
    pub current_frame: u32,
    pub current_buffer: usize,
    pub next_buffer: usize,
    /// `next_buffer` holds the frame after `current_frame`
    pub buffer_ready: bool,
    pub playing: bool,
    pub stop: bool,
    /// Loader is inside its session loop
    pub loader_active: bool,
    /// Incremented on every start; stale loads are discarded
    pub session: u32,
    /// At least one frame has been presented this session
    pub started: bool,
}

impl PlaybackState {
    pub const fn new() -> Self {
        Self {
            frame_count: 0,
            current_frame: 0,
            current_buffer: 0,
            next_buffer: 1,
            buffer_ready: false,
            playing: false,
            stop: false,
            loader_active: false,
            session: 0,
            started: false,
        }
    }

    pub fn phase(&self) -> Phase {
        match (self.playing, self.started) {
            (false, _) => Phase::Idle,
            (true, false) => Phase::Loading,
            (true, true) => Phase::Playing,
        }
    }

    /// Reset indices for a new animation of `frame_count` frames
    ///
    /// Returns the new session number. The loader is marked active here so
    /// a stop issued before it wakes still waits for its acknowledgement.
    pub fn begin(&mut self, frame_count: u32) -> u32 {
        self.session = self.session.wrapping_add(1);
        self.frame_count = frame_count;
        // The first swap advances to frame 0
        self.current_frame = frame_count.saturating_sub(1);
        self.current_buffer = 0;
        self.next_buffer = 1;
        self.buffer_ready = false;
        self.playing = true;
        self.stop = false;
        self.loader_active = true;
        self.started = false;
        self.session
    }

    /// Decide the loader's next step
    ///
    /// On `Exit` the loader is marked inactive; it must then signal its
    /// acknowledgement.
    pub fn next_job(&mut self) -> LoaderJob {
        if self.stop || !self.playing || self.frame_count == 0 {
            self.loader_active = false;
            return LoaderJob::Exit;
        }
        if self.buffer_ready {
            return LoaderJob::Wait;
        }
        LoaderJob::Load {
            frame: (self.current_frame + 1) % self.frame_count,
            buffer: self.next_buffer,
            session: self.session,
        }
    }

    /// Record a finished load
    ///
    /// Loads from an older session, or after a stop, are discarded.
    pub fn publish(&mut self, session: u32, ok: bool) -> bool {
        if !ok || self.stop || !self.playing || session != self.session {
            return false;
        }
        self.buffer_ready = true;
        true
    }

    /// Buffer to present on the next tick, if one is ready
    pub fn ready_buffer(&self) -> Option<usize> {
        (self.playing && !self.stop && self.buffer_ready).then_some(self.next_buffer)
    }

    /// Make the ready buffer current and advance
    ///
    /// Returns the frame now on screen.
    pub fn swap_buffers(&mut self) -> u32 {
        core::mem::swap(&mut self.current_buffer, &mut self.next_buffer);
        self.buffer_ready = false;
        self.started = true;
        if self.frame_count > 0 {
            self.current_frame = (self.current_frame + 1) % self.frame_count;
        }
        self.current_frame
    }

    /// Ask everything to stop
    ///
    /// Returns `(was_playing, loader_active)`.
    pub fn request_stop(&mut self) -> (bool, bool) {
        let was_playing = self.playing;
        self.stop = true;
        self.playing = false;
        self.buffer_ready = false;
        self.started = false;
        (was_playing, self.loader_active)
    }
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self::new()
    }
}
