use std::net::Ipv4Addr;

use super::sockaddr::SockAddrV4;
use super::{Datagram, IcmpApi, IcmpResult};

/// Raw IPv4 ICMP socket bound to a single target.
///
/// Raw sockets hand every received datagram over with its IP header, which is
/// what the reply parser expects. Creating one requires CAP_NET_RAW.
pub struct IcmpSocket {
    socket: i32,
    epoll_fd: i32,
    target: SockAddrV4,
    buf: Vec<u8>,
}

impl IcmpSocket {
    pub fn new(target: Ipv4Addr) -> Result<IcmpSocket, std::io::Error> {
        let socket = unsafe { libc::socket(libc::AF_INET, libc::SOCK_RAW | libc::SOCK_NONBLOCK, libc::IPPROTO_ICMP) };
        if socket < 0 {
            return Err(std::io::Error::last_os_error());
        }

        let epoll_fd = unsafe { libc::epoll_create1(libc::EPOLL_CLOEXEC) };
        if epoll_fd < 0 {
            let error = std::io::Error::last_os_error();
            unsafe { libc::close(socket) };
            return Err(error);
        }

        // From here on Drop closes both descriptors
        let sock = IcmpSocket {
            socket,
            epoll_fd,
            target: SockAddrV4::from(target),
            buf: vec![0u8; 65536],
        };

        let mut ev = libc::epoll_event {
            events: libc::EPOLLIN as u32,
            u64: socket as u64,
        };
        if unsafe { libc::epoll_ctl(epoll_fd, libc::EPOLL_CTL_ADD, socket, &mut ev) } < 0 {
            return Err(std::io::Error::last_os_error());
        }

        Ok(sock)
    }

    fn recv_datagram(&mut self) -> Result<Option<Datagram>, std::io::Error> {
        let mut addr = SockAddrV4::default();
        let mut addr_len = SockAddrV4::socklen();
        let result = unsafe {
            libc::recvfrom(
                self.socket,
                self.buf.as_mut_ptr() as *mut libc::c_void,
                self.buf.len(),
                libc::MSG_DONTWAIT,
                addr.as_mut_ptr(),
                &mut addr_len,
            )
        };
        let time = std::time::Instant::now();

        if result < 0 {
            let last_error = std::io::Error::last_os_error();
            return match last_error.kind() {
                std::io::ErrorKind::WouldBlock | std::io::ErrorKind::Interrupted => Ok(None),
                _ => Err(last_error),
            };
        }

        Ok(Some(Datagram {
            addr: addr.ip().unwrap_or(Ipv4Addr::UNSPECIFIED),
            data: self.buf[..result as usize].to_vec(),
            time,
        }))
    }
}

impl IcmpApi for IcmpSocket {
    fn send(&mut self, packet: &[u8]) -> Result<(), std::io::Error> {
        let result = unsafe {
            libc::sendto(
                self.socket,
                packet.as_ptr() as *const libc::c_void,
                packet.len(),
                0,
                self.target.as_ptr(),
                SockAddrV4::socklen(),
            )
        };
        if result < 0 {
            Err(std::io::Error::last_os_error())
        } else {
            Ok(())
        }
    }

    fn recv(&mut self, timeout: std::time::Duration) -> Result<IcmpResult, std::io::Error> {
        let mut evs: [libc::epoll_event; 1] = unsafe { std::mem::zeroed() };

        // round up so a sub-millisecond remainder still waits instead of spinning
        let timeout_millis = timeout.as_micros().div_ceil(1000).min(i32::MAX as u128) as i32;
        let result = unsafe { libc::epoll_wait(self.epoll_fd, evs.as_mut_ptr(), evs.len() as i32, timeout_millis) };

        match result {
            -1 => {
                let last_error = std::io::Error::last_os_error();
                match last_error.kind() {
                    std::io::ErrorKind::Interrupted => Ok(IcmpResult::Interrupted),
                    _ => Err(last_error),
                }
            }
            0 => Ok(IcmpResult::Timeout),
            _ => match self.recv_datagram()? {
                Some(datagram) => Ok(IcmpResult::Datagram(datagram)),
                None => Ok(IcmpResult::Interrupted),
            },
        }
    }
}

impl Drop for IcmpSocket {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.epoll_fd);
            libc::close(self.socket);
        }
    }
}
