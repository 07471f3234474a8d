//! Peer credentials and role assignment

use punch_api::ClientRole;
use std::os::unix::io::AsFd;
use tokio::net::UnixStream;

/// Unix UID of the process on the other end of the socket
pub fn peer_uid(stream: &UnixStream) -> Option<u32> {
    let fd = stream.as_fd();

    nix::sys::socket::getsockopt(&fd, nix::sys::socket::sockopt::PeerCredentials)
        .ok()
        .map(|cred| cred.uid())
}

/// Root and the service's own user administer; everyone else is a bridge.
pub fn role_for_uid(uid: Option<u32>, service_uid: u32) -> ClientRole {
    match uid {
        Some(0) => ClientRole::Admin,
        Some(u) if u == service_uid => ClientRole::Admin,
        _ => ClientRole::Bridge,
    }
}
