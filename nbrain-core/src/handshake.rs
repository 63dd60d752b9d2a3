//! Boot handshake
//!
//! Before the protocol starts the link is the companion's serial console.
//! The handshake watches the console output for known prompts, logs in
//! when asked to, and finally starts the companion application.
//!
//! # State Machine
//!
//! ```text
//!   send "\n"
//!       │
//!       ▼
//!  AwaitPrompt ──maintenance──► MaintenancePrompt (send Ctrl-D)
//!       │                              │
//!       ├──────────── login ◄──────────┤
//!       │               │              │
//!       │               ▼              │
//!       │     AwaitLoginConfirm        │
//!       │     (user, delay, password)  │
//!       │               │ shell        │
//!       ▼ shell         ▼              ▼ shell
//!  ─────────────────► Ready ◄──────────
//!
//!  a bounded wait expiring, or a link write error ──► Failed
//! ```

use embassy_futures::yield_now;
use embedded_hal_async::delay::DelayNs;
use nbrain_hal::{Clock, StreamRx, StreamTx};

use crate::config::HandshakeConfig;

/// Longest prompt that can be recognised
pub const MATCH_WINDOW: usize = 32;

/// Handshake progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HandshakeState {
    /// Waiting for the first console prompt
    AwaitPrompt,
    /// The companion booted into its maintenance shell prompt
    MaintenancePrompt,
    /// Credentials sent, waiting for the shell
    AwaitLoginConfirm,
    /// Logged in; the protocol can start
    Ready,
    /// A bounded wait expired or the link failed
    Failed,
}

/// Handshake failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HandshakeError {
    /// No candidate appeared before the deadline
    Timeout,
    /// A candidate is longer than [`MATCH_WINDOW`]
    CandidateTooLong,
    /// Writing to the link failed
    Link,
}

/// Trailing window over the most recent bytes
struct Window {
    bytes: [u8; MATCH_WINDOW],
    len: usize,
}

impl Window {
    const fn new() -> Self {
        Self {
            bytes: [0; MATCH_WINDOW],
            len: 0,
        }
    }

    fn push(&mut self, byte: u8) {
        if self.len == MATCH_WINDOW {
            self.bytes.copy_within(1.., 0);
            self.bytes[MATCH_WINDOW - 1] = byte;
        } else {
            self.bytes[self.len] = byte;
            self.len += 1;
        }
    }

    fn ends_with(&self, pattern: &[u8]) -> bool {
        !pattern.is_empty() && self.bytes[..self.len].ends_with(pattern)
    }
}

/// Wait until the link output ends with one of `candidates`
///
/// Returns the index of the candidate that matched; when several complete
/// on the same byte the first in declaration order wins. Empty candidates
/// never match. `timeout_ms` of `None` waits forever.
pub async fn wait_for_one_of<L, C>(
    link: &mut L,
    clock: &C,
    candidates: &[&[u8]],
    timeout_ms: Option<u32>,
) -> Result<usize, HandshakeError>
where
    L: StreamRx,
    C: Clock + ?Sized,
{
    if candidates.iter().any(|c| c.len() > MATCH_WINDOW) {
        return Err(HandshakeError::CandidateTooLong);
    }

    let start = clock.now_ms();
    let mut window = Window::new();

    loop {
        if let Some(limit) = timeout_ms {
            if clock.elapsed_ms(start) >= u64::from(limit) {
                return Err(HandshakeError::Timeout);
            }
        }

        match link.read_byte() {
            Ok(Some(byte)) => {
                window.push(byte);
                if let Some(index) = candidates.iter().position(|c| window.ends_with(c)) {
                    return Ok(index);
                }
            }
            Ok(None) => yield_now().await,
            Err(_) => {
                warn!("Console read failed");
                yield_now().await;
            }
        }
    }
}

/// Console login driver
pub struct Handshake<'c, L, C, D> {
    link: &'c mut L,
    clock: C,
    delay: D,
    config: &'c HandshakeConfig,
    state: HandshakeState,
}

impl<'c, L, C, D> Handshake<'c, L, C, D>
where
    L: StreamRx + StreamTx,
    C: Clock,
    D: DelayNs,
{
    pub fn new(link: &'c mut L, clock: C, delay: D, config: &'c HandshakeConfig) -> Self {
        Self {
            link,
            clock,
            delay,
            config,
            state: HandshakeState::AwaitPrompt,
        }
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// Drive the console to a logged-in shell and start the application
    ///
    /// On error the state is [`HandshakeState::Failed`] and the protocol
    /// must not be started.
    pub async fn run(&mut self) -> Result<(), HandshakeError> {
        let result = self.sequence().await;
        match result {
            Ok(()) => info!("Handshake complete"),
            Err(e) => {
                error!("Handshake failed in {:?}: {:?}", self.state, e);
                self.state = HandshakeState::Failed;
            }
        }
        result
    }

    async fn sequence(&mut self) -> Result<(), HandshakeError> {
        let config = self.config;
        let login = config.login_prompt.as_bytes();
        let shell = config.shell_marker.as_bytes();
        let maintenance = config.maintenance_marker.as_bytes();

        self.state = HandshakeState::AwaitPrompt;
        self.send(b"\n")?;
        let mut seen = self
            .wait(&[login, shell, maintenance], config.prompt_timeout_ms)
            .await?;

        if seen == 2 {
            info!("Maintenance prompt, continuing boot");
            self.state = HandshakeState::MaintenancePrompt;
            self.send(&[config.continue_byte])?;
            seen = self.wait(&[login, shell], config.prompt_timeout_ms).await?;
        }

        if seen == 0 {
            debug!("Login prompt, sending credentials");
            self.state = HandshakeState::AwaitLoginConfirm;
            self.send_line(config.username.as_bytes())?;
            self.delay.delay_ms(config.credential_delay_ms).await;
            self.send_line(config.password.as_bytes())?;
            self.wait(&[shell], Some(config.login_timeout_ms)).await?;
        }

        self.state = HandshakeState::Ready;
        if let Some(command) = &config.launch_command {
            self.send_line(command.as_bytes())?;
        }
        Ok(())
    }

    async fn wait(
        &mut self,
        candidates: &[&[u8]],
        timeout_ms: Option<u32>,
    ) -> Result<usize, HandshakeError> {
        wait_for_one_of(&mut *self.link, &self.clock, candidates, timeout_ms).await
    }

    fn send(&mut self, data: &[u8]) -> Result<(), HandshakeError> {
        self.link
            .write_all(data)
            .and_then(|()| self.link.flush())
            .map_err(|_| HandshakeError::Link)
    }

    fn send_line(&mut self, line: &[u8]) -> Result<(), HandshakeError> {
        self.send(line)?;
        self.send(b"\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockClock, MockDelay, MockLink};
    use embassy_futures::block_on;
    use heapless::String;
    use std::vec::Vec;

    struct Outcome {
        result: Result<(), HandshakeError>,
        state: HandshakeState,
        tx: Vec<u8>,
        delays: Vec<u32>,
    }

    fn run_with(console: &[u8], config: &HandshakeConfig) -> Outcome {
        let clock = MockClock::ticking(1);
        let mut delay = MockDelay::new(&clock);
        let mut link = MockLink::new();
        link.feed(console);

        let (result, state) = {
            let mut handshake = Handshake::new(&mut link, &clock, &mut delay, config);
            let result = block_on(handshake.run());
            (result, handshake.state())
        };
        Outcome {
            result,
            state,
            tx: link.take_tx(),
            delays: delay.calls,
        }
    }

    fn config_with_password(password: &str) -> HandshakeConfig {
        HandshakeConfig {
            password: String::try_from(password).unwrap(),
            ..HandshakeConfig::default()
        }
    }

    #[test]
    fn test_login_prompt_sends_credentials() {
        let out = run_with(
            b"\r\nDebian GNU/Linux 12 nbrain ttyS0\r\n\r\nnbrain login: Password: \r\nroot@nbrain:~# ",
            &config_with_password("hunter2"),
        );
        assert_eq!(out.result, Ok(()));
        assert_eq!(out.state, HandshakeState::Ready);
        assert_eq!(out.tx, b"\nroot\nhunter2\npython3 main.py\n");
        assert_eq!(out.delays, [100]);
    }

    #[test]
    fn test_already_logged_in_skips_credentials() {
        let out = run_with(b"root@nbrain:~# ", &HandshakeConfig::default());
        assert_eq!(out.result, Ok(()));
        assert_eq!(out.tx, b"\npython3 main.py\n");
        assert!(out.delays.is_empty());
    }

    #[test]
    fn test_maintenance_prompt_continues_boot() {
        let out = run_with(
            b"Give root password for maintenance\r\n(or press Control-D to continue): \
              ...\r\nnbrain login: \r\nroot@nbrain:~# ",
            &HandshakeConfig::default(),
        );
        assert_eq!(out.result, Ok(()));
        assert_eq!(out.tx, b"\n\x04root\n\npython3 main.py\n");
    }

    #[test]
    fn test_login_confirmation_times_out() {
        let out = run_with(b"login: Login incorrect\r\n", &config_with_password("x"));
        assert_eq!(out.result, Err(HandshakeError::Timeout));
        assert_eq!(out.state, HandshakeState::Failed);
        // Credentials went out; the application did not start
        assert_eq!(out.tx, b"\nroot\nx\n");
    }

    #[test]
    fn test_bounded_prompt_wait() {
        let config = HandshakeConfig {
            prompt_timeout_ms: Some(50),
            ..HandshakeConfig::default()
        };
        let out = run_with(b"", &config);
        assert_eq!(out.result, Err(HandshakeError::Timeout));
        assert_eq!(out.state, HandshakeState::Failed);
    }

    #[test]
    fn test_no_launch_command() {
        let config = HandshakeConfig {
            launch_command: None,
            ..HandshakeConfig::default()
        };
        let out = run_with(b":~# ", &config);
        assert_eq!(out.result, Ok(()));
        assert_eq!(out.tx, b"\n");
    }

    #[test]
    fn test_link_failure_reported() {
        let clock = MockClock::ticking(1);
        let mut link = MockLink::new();
        link.fail_writes = true;
        let config = HandshakeConfig::default();
        let mut handshake = Handshake::new(&mut link, &clock, MockDelay::new(&clock), &config);
        assert_eq!(block_on(handshake.run()), Err(HandshakeError::Link));
        assert_eq!(handshake.state(), HandshakeState::Failed);
    }

    #[test]
    fn test_wait_first_candidate_wins_on_same_byte() {
        let clock = MockClock::new();
        let mut link = MockLink::new();
        link.feed(b"login:");
        let found = block_on(wait_for_one_of(&mut link, &clock, &[b"in:", b"login:"], None));
        assert_eq!(found, Ok(0));
    }

    #[test]
    fn test_wait_matches_after_long_noise() {
        let clock = MockClock::new();
        let mut link = MockLink::new();
        link.feed(&[b'.'; 200]);
        link.feed(b"root@nbrain:~# trailing");
        let found = block_on(wait_for_one_of(&mut link, &clock, &[b"login:", b":~# "], None));
        assert_eq!(found, Ok(1));
        // Reading stops right after the match
        assert_eq!(link.available(), b"trailing".len());
    }

    #[test]
    fn test_wait_is_case_sensitive() {
        let clock = MockClock::ticking(1);
        let mut link = MockLink::new();
        link.feed(b"LOGIN:");
        let found = block_on(wait_for_one_of(&mut link, &clock, &[b"login:"], Some(20)));
        assert_eq!(found, Err(HandshakeError::Timeout));
    }

    #[test]
    fn test_wait_rejects_oversized_candidate() {
        let clock = MockClock::new();
        let mut link = MockLink::new();
        let long = [b'x'; MATCH_WINDOW + 1];
        let found = block_on(wait_for_one_of(&mut link, &clock, &[&long], None));
        assert_eq!(found, Err(HandshakeError::CandidateTooLong));
    }
}
