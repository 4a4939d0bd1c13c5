//! 连通性预检
//!
//! compare 前由调用方（而非编排器）做的一次同步布尔检查；
//! 实现为对配置地址的 TCP 连接探测，属于 UX 层面的前置判断，不进编排器的前置条件集。

use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::config::NetworkSection;

/// 同步连通性检查
pub trait ConnectivityChecker: Send + Sync {
    fn is_online_now(&self) -> bool;
}

/// TCP 探测实现：对 probe_addr 做带超时的连接尝试
pub struct TcpConnectivityChecker {
    probe_addr: String,
    timeout: Duration,
}

impl TcpConnectivityChecker {
    pub fn new(cfg: &NetworkSection) -> Self {
        Self {
            probe_addr: cfg.probe_addr.clone(),
            timeout: Duration::from_millis(cfg.probe_timeout_ms.max(1)),
        }
    }
}

impl ConnectivityChecker for TcpConnectivityChecker {
    fn is_online_now(&self) -> bool {
        let Ok(addrs) = self.probe_addr.to_socket_addrs() else {
            tracing::debug!("probe addr '{}' did not resolve", self.probe_addr);
            return false;
        };
        for addr in addrs {
            if TcpStream::connect_timeout(&addr, self.timeout).is_ok() {
                return true;
            }
        }
        false
    }
}

/// 始终在线（离线演示与测试用）
pub struct AlwaysOnline;

impl ConnectivityChecker for AlwaysOnline {
    fn is_online_now(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_always_online() {
        assert!(AlwaysOnline.is_online_now());
    }

    #[test]
    fn test_unroutable_probe_is_offline() {
        // TEST-NET-3 地址，短超时内必然失败
        let cfg = NetworkSection {
            probe_addr: "203.0.113.1:9".to_string(),
            probe_timeout_ms: 50,
        };
        assert!(!TcpConnectivityChecker::new(&cfg).is_online_now());
    }

    #[test]
    fn test_garbage_addr_is_offline() {
        let cfg = NetworkSection {
            probe_addr: "not an address".to_string(),
            probe_timeout_ms: 50,
        };
        assert!(!TcpConnectivityChecker::new(&cfg).is_online_now());
    }
}
