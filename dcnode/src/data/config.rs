use std::net::IpAddr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    // Local address, used for both F1-U and the DCX tunnel to the peer node.
    pub ip_addr: IpAddr,

    // The DU that terminates the local leg of every bearer.
    pub du_ip_addr: IpAddr,

    // Human readable node name, used in logs.
    pub name: Option<String>,

    // Reordering timer applied to every bearer.  None disables it.
    pub t_reordering: Option<Duration>,

    // Reordering window and buffer limit applied to every bearer.
    pub reordering_window: u16,
    pub max_buffered: usize,

    // Period of the stats log.
    pub stats_interval: Duration,
}

impl Config {
    pub fn new(ip_addr: IpAddr, du_ip_addr: IpAddr) -> Self {
        Config {
            ip_addr,
            du_ip_addr,
            name: None,
            t_reordering: Some(pdcp::DEFAULT_T_REORDERING),
            reordering_window: pdcp::PDCP_REORDERING_WINDOW,
            max_buffered: pdcp::DEFAULT_MAX_BUFFERED,
            stats_interval: Duration::from_secs(5),
        }
    }
}
