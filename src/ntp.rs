//! Minimal SNTP client.
//!
//! One exchange resolves the server, opens a socket, sends a single 48 byte request and waits a
//! bounded time for the reply. Only the transmit timestamp seconds are decoded. The socket is
//! owned by the exchange and dropped once it ends.

use byteorder::{BigEndian, ByteOrder};
use core::fmt::Debug;
use core::net::{IpAddr, SocketAddr};
use embedded_hal::delay::DelayNs;
use log::{debug, info, warn};

pub const NTP_PACKET_SIZE: usize = 48;

pub const NTP_PORT: u16 = 123;

/// Seconds between 1900-01-01 and 1970-01-01
pub const NTP_EPOCH_OFFSET: u32 = 2_208_988_800;

pub const NTP_TIMEOUT_MS: u32 = 1500;

pub const NTP_LOCAL_PORT: u16 = 12388;

pub const NTP_SERVER: &str = "ntp.se";

/// Offset of the transmit timestamp seconds in a reply
const TRANSMIT_SECONDS: usize = 40;

const POLL_INTERVAL_MS: u32 = 1;

/// Client request: LI unsynchronized, version 4, client mode, stratum 0, poll 6, precision -20
pub fn request_packet() -> [u8; NTP_PACKET_SIZE] {
    let mut packet = [0u8; NTP_PACKET_SIZE];
    packet[0] = 0b1110_0011;
    packet[1] = 0;
    packet[2] = 6;
    packet[3] = 0xEC;
    // root delay and dispersion stay zero
    packet[12..16].copy_from_slice(&[49, 0x4E, 49, 52]);
    packet
}

/// Unix seconds from a server reply, `None` if the reply is too short
pub fn parse_reply(reply: &[u8]) -> Option<u32> {
    if reply.len() < NTP_PACKET_SIZE {
        return None;
    }
    let since_1900 = BigEndian::read_u32(&reply[TRANSMIT_SECONDS..TRANSMIT_SECONDS + 4]);
    Some(since_1900.wrapping_sub(NTP_EPOCH_OFFSET))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NtpConfig<'a> {
    pub server: &'a str,
    pub port: u16,
    pub local_port: u16,
    pub timeout_ms: u32,
}

impl Default for NtpConfig<'static> {
    fn default() -> Self {
        NtpConfig {
            server: NTP_SERVER,
            port: NTP_PORT,
            local_port: NTP_LOCAL_PORT,
            timeout_ms: NTP_TIMEOUT_MS,
        }
    }
}

impl<'a> NtpConfig<'a> {
    pub fn with_server<'b>(self, server: &'b str) -> NtpConfig<'b> {
        NtpConfig {
            server,
            port: self.port,
            local_port: self.local_port,
            timeout_ms: self.timeout_ms,
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u32) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_local_port(mut self, local_port: u16) -> Self {
        self.local_port = local_port;
        self
    }
}

/// Free running millisecond counter, expected to wrap
pub trait Clock {
    fn now_ms(&mut self) -> u32;
}

/// Connectionless socket
pub trait Datagram {
    type Error: Debug;

    fn send_to(&mut self, remote: SocketAddr, data: &[u8]) -> Result<(), Self::Error>;

    /// Receives one queued datagram without blocking, `Ok(None)` if nothing is queued
    fn poll_recv(&mut self, buffer: &mut [u8]) -> Result<Option<usize>, Self::Error>;
}

/// Name resolution and socket factory
pub trait Network {
    type Error: Debug;
    type Socket: Datagram<Error = Self::Error>;

    fn resolve(&mut self, host: &str) -> Option<IpAddr>;

    fn bind(&mut self, local_port: u16) -> Result<Self::Socket, Self::Error>;
}

#[derive(Debug, PartialEq)]
pub enum NtpError<E: Debug> {
    /// Server name did not resolve
    Resolution,
    /// No usable reply within the timeout
    Timeout,
    Network(E),
}

impl<E: Debug> NtpError<E> {
    /// Resolution failures are reported like a missing reply
    pub fn is_timeout_like(&self) -> bool {
        matches!(self, NtpError::Resolution | NtpError::Timeout)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NtpState {
    AwaitingReply,
    /// Unix seconds
    Done(u32),
    TimedOut,
}

/// A request in flight
pub struct NtpExchange<S: Datagram> {
    socket: Option<S>,
    sent_at: u32,
    timeout_ms: u32,
    state: NtpState,
}

impl<S: Datagram> NtpExchange<S> {
    pub fn state(&self) -> NtpState {
        self.state
    }

    /// Drains queued datagrams and checks the deadline.
    ///
    /// `Ok(None)` while still waiting. Once the exchange has ended every further call repeats its
    /// outcome.
    pub fn poll(&mut self, clock: &mut impl Clock) -> Result<Option<u32>, NtpError<S::Error>> {
        match self.state {
            NtpState::Done(seconds) => return Ok(Some(seconds)),
            NtpState::TimedOut => return Err(NtpError::Timeout),
            NtpState::AwaitingReply => {}
        }
        let Some(socket) = self.socket.as_mut() else {
            self.state = NtpState::TimedOut;
            return Err(NtpError::Timeout);
        };

        let mut buffer = [0u8; NTP_PACKET_SIZE];
        loop {
            match socket.poll_recv(&mut buffer) {
                Ok(Some(size)) => match parse_reply(&buffer[..size.min(NTP_PACKET_SIZE)]) {
                    Some(seconds) => {
                        let elapsed = clock.now_ms().wrapping_sub(self.sent_at);
                        info!("NTP response after {} ms: {}", elapsed, seconds);
                        self.finish(NtpState::Done(seconds));
                        return Ok(Some(seconds));
                    }
                    None => debug!("NTP short reply of {} bytes ignored", size),
                },
                Ok(None) => break,
                Err(error) => {
                    warn!("NTP receive failed: {:?}", error);
                    self.finish(NtpState::TimedOut);
                    return Err(NtpError::Network(error));
                }
            }
        }

        if clock.now_ms().wrapping_sub(self.sent_at) >= self.timeout_ms {
            warn!("No NTP response within {} ms", self.timeout_ms);
            self.finish(NtpState::TimedOut);
            return Err(NtpError::Timeout);
        }
        Ok(None)
    }

    fn finish(&mut self, state: NtpState) {
        self.state = state;
        self.socket = None;
    }
}

#[derive(Debug, Clone)]
pub struct NtpClient<'a> {
    config: NtpConfig<'a>,
}

impl Default for NtpClient<'static> {
    fn default() -> Self {
        NtpClient {
            config: NtpConfig::default(),
        }
    }
}

impl NtpClient<'static> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<'a> NtpClient<'a> {
    pub fn with_config(config: NtpConfig<'a>) -> Self {
        NtpClient { config }
    }

    pub fn config(&self) -> &NtpConfig<'a> {
        &self.config
    }

    /// Resolves the server, discards stale datagrams and sends the request
    pub fn begin<N: Network>(
        &self,
        net: &mut N,
        clock: &mut impl Clock,
    ) -> Result<NtpExchange<N::Socket>, NtpError<N::Error>> {
        let Some(ip) = net.resolve(self.config.server) else {
            warn!("NTP server {} did not resolve", self.config.server);
            return Err(NtpError::Resolution);
        };
        let mut socket = net.bind(self.config.local_port).map_err(NtpError::Network)?;
        debug!("Local ntp port: {}", self.config.local_port);

        let mut buffer = [0u8; NTP_PACKET_SIZE];
        while socket
            .poll_recv(&mut buffer)
            .map_err(NtpError::Network)?
            .is_some()
        {}

        let remote = SocketAddr::new(ip, self.config.port);
        info!("NTP request {}: {}", self.config.server, remote);
        socket
            .send_to(remote, &request_packet())
            .map_err(NtpError::Network)?;

        Ok(NtpExchange {
            socket: Some(socket),
            sent_at: clock.now_ms(),
            timeout_ms: self.config.timeout_ms,
            state: NtpState::AwaitingReply,
        })
    }

    /// Runs one complete exchange, blocking until a reply or the timeout
    pub fn sync<N: Network>(
        &self,
        net: &mut N,
        clock: &mut impl Clock,
        delay: &mut impl DelayNs,
    ) -> Result<u32, NtpError<N::Error>> {
        let mut exchange = self.begin(net, clock)?;
        loop {
            if let Some(seconds) = exchange.poll(clock)? {
                return Ok(seconds);
            }
            delay.delay_ms(POLL_INTERVAL_MS);
        }
    }
}
