use onewire_node::ntp::{Clock, Datagram, Network};
use std::io::{self, ErrorKind};
use std::net::{IpAddr, Ipv4Addr, SocketAddr, ToSocketAddrs, UdpSocket};
use std::time::Instant;

/// UDP over the host network stack
pub struct StdNetwork;

impl Network for StdNetwork {
    type Error = io::Error;
    type Socket = StdSocket;

    fn resolve(&mut self, host: &str) -> Option<IpAddr> {
        let mut addrs = (host, 0).to_socket_addrs().ok()?;
        addrs.find(SocketAddr::is_ipv4).map(|addr| addr.ip())
    }

    fn bind(&mut self, local_port: u16) -> io::Result<StdSocket> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, local_port))?;
        socket.set_nonblocking(true)?;
        Ok(StdSocket(socket))
    }
}

pub struct StdSocket(UdpSocket);

impl Datagram for StdSocket {
    type Error = io::Error;

    fn send_to(&mut self, remote: SocketAddr, data: &[u8]) -> io::Result<()> {
        self.0.send_to(data, remote).map(drop)
    }

    fn poll_recv(&mut self, buffer: &mut [u8]) -> io::Result<Option<usize>> {
        match self.0.recv_from(buffer) {
            Ok((size, _)) => Ok(Some(size)),
            Err(e) if e.kind() == ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Milliseconds since startup, truncated to wrap like a firmware tick counter
pub struct MonotonicClock(Instant);

impl MonotonicClock {
    pub fn new() -> Self {
        MonotonicClock(Instant::now())
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&mut self) -> u32 {
        self.0.elapsed().as_millis() as u32
    }
}
