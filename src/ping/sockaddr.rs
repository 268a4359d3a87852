use std::net::Ipv4Addr;

/// An IPv4 socket address in the layout expected by the socket calls.
#[derive(Clone, Copy)]
pub struct SockAddrV4 {
    sin: libc::sockaddr_in,
}

impl Default for SockAddrV4 {
    fn default() -> Self {
        SockAddrV4 {
            sin: unsafe { std::mem::zeroed() },
        }
    }
}

impl SockAddrV4 {
    pub fn as_ptr(&self) -> *const libc::sockaddr {
        &self.sin as *const libc::sockaddr_in as *const libc::sockaddr
    }

    pub fn as_mut_ptr(&mut self) -> *mut libc::sockaddr {
        &mut self.sin as *mut libc::sockaddr_in as *mut libc::sockaddr
    }

    pub fn socklen() -> libc::socklen_t {
        std::mem::size_of::<libc::sockaddr_in>() as libc::socklen_t
    }

    pub fn ip(&self) -> Option<Ipv4Addr> {
        if self.sin.sin_family as i32 != libc::AF_INET {
            return None;
        }
        Some(Ipv4Addr::from(u32::from_be(self.sin.sin_addr.s_addr)))
    }
}

impl From<Ipv4Addr> for SockAddrV4 {
    fn from(ip: Ipv4Addr) -> Self {
        let mut addr = SockAddrV4::default();
        addr.sin.sin_family = libc::AF_INET as libc::sa_family_t;
        // raw ICMP sockets ignore the port
        addr.sin.sin_port = 0;
        addr.sin.sin_addr = libc::in_addr {
            s_addr: u32::from(ip).to_be(),
        };
        addr
    }
}
