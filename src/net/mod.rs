// Connection enumeration module
// One call is one snapshot of the OS socket table, normalized into records
// the tracker can ingest. Read-only, no cross-call state.

use std::net::IpAddr;

use anyhow::{Context, Result};
use netstat2::{
    get_sockets_info, AddressFamilyFlags, ProtocolFlags, ProtocolSocketInfo, TcpState,
};

/// Transport protocol of an observed socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Tcp,
    Udp,
}

/// Which side initiated the connection, derived from the port numbers:
/// the lower port is assumed to be the service side. The socket table
/// carries no ground truth for who dialed, so this is a heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Inbound,
    Outbound,
}

/// One observed socket at one poll tick. Ephemeral; rebuilt every poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionRecord {
    pub local_addr: IpAddr,
    pub local_port: u16,
    pub remote_addr: IpAddr,
    pub remote_port: u16,
    pub protocol: Protocol,
    pub direction: Direction,
}

/// Snapshot the currently-open sockets.
///
/// Listening sockets (no peer), UDP entries (the socket table reports no
/// peer address for them) and loopback-to-loopback connections are
/// filtered out. A transient OS or permission error is returned to the
/// caller, which logs it and retries on the next poll tick; it is never
/// fatal.
pub fn enumerate(include_ipv6: bool) -> Result<Vec<ConnectionRecord>> {
    let mut af_flags = AddressFamilyFlags::IPV4;
    if include_ipv6 {
        af_flags |= AddressFamilyFlags::IPV6;
    }
    let proto_flags = ProtocolFlags::TCP | ProtocolFlags::UDP;

    let sockets =
        get_sockets_info(af_flags, proto_flags).context("cannot read the OS socket table")?;

    let mut records = Vec::new();
    for si in sockets {
        match si.protocol_socket_info {
            ProtocolSocketInfo::Tcp(tcp) => {
                if tcp.state == TcpState::Listen {
                    continue;
                }
                if let Some(rec) = normalize(
                    tcp.local_addr,
                    tcp.local_port,
                    tcp.remote_addr,
                    tcp.remote_port,
                    Protocol::Tcp,
                ) {
                    records.push(rec);
                }
            }
            // UDP socket-table entries carry no peer address, so there is
            // nothing to place on a map for them.
            ProtocolSocketInfo::Udp(_) => {}
        }
    }

    Ok(records)
}

/// Turn one socket-table row into a record, or drop it when it has no
/// usable peer.
fn normalize(
    local_addr: IpAddr,
    local_port: u16,
    remote_addr: IpAddr,
    remote_port: u16,
    protocol: Protocol,
) -> Option<ConnectionRecord> {
    // No peer: listening or half-set-up sockets.
    if remote_addr.is_unspecified() || remote_port == 0 {
        return None;
    }
    // Self-to-self traffic never leaves the host.
    if remote_addr.is_loopback() {
        return None;
    }

    Some(ConnectionRecord {
        local_addr,
        local_port,
        remote_addr,
        remote_port,
        protocol,
        direction: derive_direction(local_port, remote_port),
    })
}

/// Lower port wins as the presumed server side; a tie counts as outbound.
fn derive_direction(local_port: u16, remote_port: u16) -> Direction {
    if remote_port <= local_port {
        Direction::Outbound
    } else {
        Direction::Inbound
    }
}
